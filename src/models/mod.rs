pub mod photo;
pub mod settings;
