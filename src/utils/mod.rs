pub mod image_processor;
pub mod naming;
