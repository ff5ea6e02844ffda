#![deny(missing_docs)]
//! Image types and pixel buffer operations for bilateral filtering

/// image representation for computer vision purposes.
pub mod image;

/// Error types for the image module.
pub mod error;

/// pixel buffer operations.
pub mod ops;

pub use crate::error::ImageError;
pub use crate::image::{Image, ImageDtype, ImageSize};
