pub mod cleanup;
pub mod derivatives;
pub mod photo_store;
pub mod pipeline;
pub mod sniffer;
pub mod source;
pub mod upload_gate;
