use bilateral_image::ImageError;

/// Errors that can occur during bilateral filtering.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum FilterError {
    /// The sigma parameter must be strictly positive.
    #[error("sigma must be > 0, got {0}")]
    InvalidSigma(f32),

    /// The neighborhood radius does not fit the image.
    #[error("radius {0} is too large for a {1}x{2} image")]
    InvalidRadius(usize, usize, usize),

    /// Error coming from the image container.
    #[error(transparent)]
    Image(#[from] ImageError),
}
