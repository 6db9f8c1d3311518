pub mod article;
pub mod photo;
