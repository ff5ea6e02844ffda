use rayon::prelude::*;

use bilateral_image::Image;

/// Controls how filtering operations are executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionStrategy {
    /// Pick serial or parallel execution based on the image size.
    #[default]
    Auto,

    /// Run sequentially on the current thread.
    ///
    /// Useful for small images, debugging, or when the overhead of
    /// parallelization outweighs the benefits.
    Serial,

    /// Use the global Rayon thread pool to process rows in parallel.
    Parallel,
}

impl ExecutionStrategy {
    /// Image size above which [`ExecutionStrategy::Auto`] goes parallel.
    pub const AUTO_PARALLEL_THRESHOLD: usize = 100_000;

    /// Whether the strategy resolves to parallel execution for an image with
    /// the given number of pixels.
    pub fn is_parallel(&self, num_pixels: usize) -> bool {
        match self {
            ExecutionStrategy::Serial => false,
            ExecutionStrategy::Parallel => true,
            ExecutionStrategy::Auto => num_pixels >= Self::AUTO_PARALLEL_THRESHOLD,
        }
    }
}

/// Apply a function to each pixel in the image in parallel by rows.
pub fn par_iter_rows<T1, const C1: usize, T2, const C2: usize>(
    src: &Image<T1, C1>,
    dst: &mut Image<T2, C2>,
    f: impl Fn(&[T1], &mut [T2]) + Send + Sync,
) where
    T1: Clone + Send + Sync,
    T2: Clone + Send + Sync,
{
    src.as_slice()
        .par_chunks_exact(C1 * src.cols())
        .zip(dst.as_slice_mut().par_chunks_exact_mut(C2 * src.cols()))
        .for_each(|(src_chunk, dst_chunk)| {
            src_chunk
                .chunks_exact(C1)
                .zip(dst_chunk.chunks_exact_mut(C2))
                .for_each(|(src_pixel, dst_pixel)| {
                    f(src_pixel, dst_pixel);
                });
        });
}

#[cfg(test)]
mod tests {
    use super::*;
    use bilateral_image::{ImageError, ImageSize};

    #[test]
    fn test_strategy_resolution() {
        assert!(!ExecutionStrategy::Serial.is_parallel(usize::MAX));
        assert!(ExecutionStrategy::Parallel.is_parallel(0));
        assert!(!ExecutionStrategy::Auto.is_parallel(64 * 64));
        assert!(ExecutionStrategy::Auto.is_parallel(1024 * 1024));
    }

    #[test]
    fn test_par_iter_rows() -> Result<(), ImageError> {
        let size = ImageSize {
            width: 2,
            height: 2,
        };
        let src = Image::<f32, 1>::new(size, vec![1.0, 2.0, 3.0, 4.0])?;
        let mut dst = Image::<f32, 1>::from_size_val(size, 0.0)?;

        par_iter_rows(&src, &mut dst, |src_pixel, dst_pixel| {
            dst_pixel[0] = src_pixel[0] * 2.0;
        });

        assert_eq!(dst.as_slice(), &[2.0, 4.0, 6.0, 8.0]);

        Ok(())
    }
}
