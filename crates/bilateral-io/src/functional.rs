use std::path::Path;

use bilateral_image::{Image, ImageSize};

use crate::error::IoError;

/// Reads an image from the given file path.
///
/// The method tries to read from any image format supported by the image
/// crate and converts the result to an 8-bit RGB raster.
///
/// # Arguments
///
/// * `file_path` - The path to a valid image file.
///
/// # Returns
///
/// An image containing the decoded pixel data.
pub fn read_image_any(file_path: impl AsRef<Path>) -> Result<Image<u8, 3>, IoError> {
    let file_path = file_path.as_ref();

    // verify the file exists
    if !file_path.exists() {
        return Err(IoError::FileDoesNotExist(file_path.to_path_buf()));
    }

    let img = image::ImageReader::open(file_path)?.decode()?;
    let rgb = img.to_rgb8();

    let size = ImageSize {
        width: rgb.width() as usize,
        height: rgb.height() as usize,
    };

    Ok(Image::new(size, rgb.into_raw())?)
}
