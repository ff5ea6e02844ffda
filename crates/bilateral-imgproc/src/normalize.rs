use bilateral_image::{Image, ImageError};

/// Find the minimum and maximum values in an image.
///
/// # Arguments
///
/// * `image` - The input image.
///
/// # Returns
///
/// A tuple containing the minimum and maximum values in the image.
///
/// # Errors
///
/// If the image is empty, an error is returned.
pub fn find_min_max<T, const C: usize>(image: &Image<T, C>) -> Result<(T, T), ImageError>
where
    T: Copy + PartialOrd,
{
    // get the first element in the image
    let first_element = match image.as_slice().iter().next() {
        Some(x) => x,
        None => return Err(ImageError::ImageDataNotInitialized),
    };

    let mut min = first_element;
    let mut max = first_element;

    for x in image.as_slice().iter() {
        if x < min {
            min = x;
        }
        if x > max {
            max = x;
        }
    }

    Ok((*min, *max))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bilateral_image::ImageSize;

    #[test]
    fn test_find_min_max() -> Result<(), ImageError> {
        let image = Image::<f32, 1>::new(
            ImageSize {
                width: 2,
                height: 2,
            },
            vec![0.5, -1.0, 2.0, 0.0],
        )?;

        let (min, max) = find_min_max(&image)?;
        assert_eq!(min, -1.0);
        assert_eq!(max, 2.0);

        Ok(())
    }

    #[test]
    fn test_find_min_max_constant() -> Result<(), ImageError> {
        let image = Image::<f32, 1>::from_size_val(
            ImageSize {
                width: 3,
                height: 3,
            },
            0.25,
        )?;

        let (min, max) = find_min_max(&image)?;
        assert_eq!(min, max);

        Ok(())
    }

    #[test]
    fn test_find_min_max_empty() {
        let image = Image::<f32, 1>::new(
            ImageSize {
                width: 0,
                height: 0,
            },
            vec![],
        )
        .unwrap();

        assert!(matches!(
            find_min_max(&image),
            Err(ImageError::ImageDataNotInitialized)
        ));
    }
}
