use crate::parallel;
use bilateral_image::{Image, ImageError};

/// Define the RGB weights for the grayscale conversion.
const RW: f64 = 0.299;
const GW: f64 = 0.587;
const BW: f64 = 0.114;

/// Convert an RGB image to grayscale using the formula:
///
/// Y = 0.299 * R + 0.587 * G + 0.114 * B
///
/// # Arguments
///
/// * `src` - The input RGB image.
/// * `dst` - The output grayscale image.
///
/// Precondition: the input and output images must have the same size.
///
/// # Example
///
/// ```
/// use bilateral_image::{Image, ImageSize};
/// use bilateral_imgproc::color::gray_from_rgb;
///
/// let image = Image::<f32, 3>::new(
///     ImageSize {
///         width: 4,
///         height: 5,
///     },
///     vec![0f32; 4 * 5 * 3],
/// )
/// .unwrap();
///
/// let mut gray = Image::<f32, 1>::from_size_val(image.size(), 0.0).unwrap();
///
/// gray_from_rgb(&image, &mut gray).unwrap();
/// assert_eq!(gray.num_channels(), 1);
/// assert_eq!(gray.size().width, 4);
/// assert_eq!(gray.size().height, 5);
/// ```
pub fn gray_from_rgb<T>(src: &Image<T, 3>, dst: &mut Image<T, 1>) -> Result<(), ImageError>
where
    T: Send + Sync + num_traits::Float,
{
    if src.size() != dst.size() {
        return Err(ImageError::InvalidImageSize(
            src.cols(),
            src.rows(),
            dst.cols(),
            dst.rows(),
        ));
    }

    let rw = T::from(RW).ok_or(ImageError::CastError)?;
    let gw = T::from(GW).ok_or(ImageError::CastError)?;
    let bw = T::from(BW).ok_or(ImageError::CastError)?;

    // parallelize the grayscale conversion by rows
    parallel::par_iter_rows(src, dst, |src_pixel, dst_pixel| {
        let r = src_pixel[0];
        let g = src_pixel[1];
        let b = src_pixel[2];
        dst_pixel[0] = rw * r + gw * g + bw * b;
    });

    Ok(())
}

/// Convert a grayscale image to an RGB image by replicating the grayscale
/// value across all three channels.
///
/// # Arguments
///
/// * `src` - The input grayscale image.
/// * `dst` - The output RGB image.
///
/// Precondition: the input and output images must have the same size.
pub fn rgb_from_gray<T>(src: &Image<T, 1>, dst: &mut Image<T, 3>) -> Result<(), ImageError>
where
    T: Send + Sync + num_traits::Float,
{
    if src.size() != dst.size() {
        return Err(ImageError::InvalidImageSize(
            src.cols(),
            src.rows(),
            dst.cols(),
            dst.rows(),
        ));
    }

    parallel::par_iter_rows(src, dst, |src_pixel, dst_pixel| {
        dst_pixel.iter_mut().for_each(|dst| *dst = src_pixel[0]);
    });

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bilateral_image::ImageSize;

    #[test]
    fn gray_from_rgb_regression() -> Result<(), ImageError> {
        let image = Image::<f32, 3>::new(
            ImageSize {
                width: 1,
                height: 2,
            },
            vec![0.0, 128.0, 255.0, 128.0, 0.0, 255.0],
        )?;

        let mut gray = Image::<f32, 1>::from_size_val(image.size(), 0.0)?;
        gray_from_rgb(&image, &mut gray)?;

        let expected = [
            0.299 * 0.0 + 0.587 * 128.0 + 0.114 * 255.0,
            0.299 * 128.0 + 0.587 * 0.0 + 0.114 * 255.0,
        ];

        for (&got, &want) in gray.as_slice().iter().zip(expected.iter()) {
            assert!((got - want).abs() < 1e-4);
        }

        Ok(())
    }

    #[test]
    fn rgb_from_gray_replicates() -> Result<(), ImageError> {
        let gray = Image::<f32, 1>::new(
            ImageSize {
                width: 2,
                height: 1,
            },
            vec![0.25, 0.75],
        )?;

        let mut rgb = Image::<f32, 3>::from_size_val(gray.size(), 0.0)?;
        rgb_from_gray(&gray, &mut rgb)?;

        assert_eq!(rgb.as_slice(), &[0.25, 0.25, 0.25, 0.75, 0.75, 0.75]);

        Ok(())
    }

    #[test]
    fn gray_size_mismatch() {
        let image = Image::<f32, 3>::from_size_val(
            ImageSize {
                width: 2,
                height: 2,
            },
            0.0,
        )
        .unwrap();
        let mut gray = Image::<f32, 1>::from_size_val(
            ImageSize {
                width: 3,
                height: 2,
            },
            0.0,
        )
        .unwrap();

        assert!(gray_from_rgb(&image, &mut gray).is_err());
    }
}
