//! Protocol module containing the session state vocabulary and body validators.

pub mod image;
pub mod model;

pub use image::Base64Image;
pub use model::*;
