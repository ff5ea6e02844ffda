use bilateral_image::{Image, ImageError};
use rayon::prelude::*;

use super::error::FilterError;
use crate::interpolation::trilinear_sample;
use crate::normalize::find_min_max;

/// Padding margin on every grid axis.
///
/// The margin keeps all neighbor accesses during blurring and all corner
/// lookups during reconstruction inside the allocated buffer.
pub const GRID_PADDING: usize = 2;

/// Scalar type usable for grid accumulation.
///
/// Implemented for `f32` and `f64`; the 64-bit variant trades speed for
/// higher accumulation fidelity on large images.
pub trait GridScalar: num_traits::Float + Send + Sync {}

impl GridScalar for f32 {}
impl GridScalar for f64 {}

#[inline]
fn cast<T: GridScalar>(x: f64) -> T {
    T::from(x).unwrap_or_else(T::zero)
}

/// Dimensions of the downsampled accumulation grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GridDims {
    /// Number of cells along the downsampled row axis.
    pub rows: usize,
    /// Number of cells along the downsampled column axis.
    pub cols: usize,
    /// Number of cells along the downsampled value axis.
    pub depth: usize,
}

impl GridDims {
    /// Derive the grid dimensions from the image size, the observed value
    /// range and the filter sigmas, including the padding margin.
    pub fn from_image(
        rows: usize,
        cols: usize,
        value_range: f64,
        sigma_space: f32,
        sigma_color: f32,
    ) -> Self {
        let pad = 2 * GRID_PADDING;
        GridDims {
            rows: ((rows - 1) as f64 / sigma_space as f64).floor() as usize + 1 + pad,
            cols: ((cols - 1) as f64 / sigma_space as f64).floor() as usize + 1 + pad,
            depth: (value_range / sigma_color as f64).floor() as usize + 1 + pad,
        }
    }

    /// Total number of cells in the grid.
    pub fn num_cells(&self) -> usize {
        self.rows * self.cols * self.depth
    }

    #[inline]
    fn index(&self, r: usize, c: usize, d: usize) -> usize {
        (r * self.cols + c) * self.depth + d
    }
}

/// A 3-D accumulation grid for fast approximate bilateral filtering.
///
/// Two spatial axes plus one value axis; each cell holds a weighted sum and a
/// hit count, stored as two parallel planes so the blur stencil applies to
/// both fields jointly. The grid is built fresh per filter invocation and
/// discarded when the call returns.
pub struct BilateralGrid<T> {
    sum: Vec<T>,
    count: Vec<T>,
    dims: GridDims,
    value_min: T,
    sigma_space: f32,
    sigma_color: f32,
}

impl<T: GridScalar> BilateralGrid<T> {
    /// Build the grid from a single-channel image by scatter-accumulation.
    ///
    /// Every pixel maps to exactly one cell via rounded downsampled
    /// coordinates; multiple pixels landing in the same cell accumulate.
    /// Rounding at half-integer boundaries is round-half-away-from-zero.
    ///
    /// The downsample runs single-threaded: concurrent scatters into a
    /// shared cell would race.
    pub fn downsample(
        src: &Image<T, 1>,
        sigma_space: f32,
        sigma_color: f32,
    ) -> Result<Self, FilterError> {
        let (value_min, value_max) = find_min_max(src)?;
        let value_range = (value_max - value_min).to_f64().unwrap_or(0.0);

        let dims =
            GridDims::from_image(src.rows(), src.cols(), value_range, sigma_space, sigma_color);

        let mut sum = vec![T::zero(); dims.num_cells()];
        let mut count = vec![T::zero(); dims.num_cells()];

        let inv_ss = 1.0 / sigma_space as f64;
        let inv_sc = cast::<T>(1.0 / sigma_color as f64);

        let src_data = src.as_slice();
        let cols = src.cols();

        for (y, row) in src_data.chunks_exact(cols).enumerate() {
            let gy = (y as f64 * inv_ss).round() as usize + GRID_PADDING;
            for (x, &v) in row.iter().enumerate() {
                let gx = (x as f64 * inv_ss).round() as usize + GRID_PADDING;
                let gz =
                    ((v - value_min) * inv_sc).round().to_usize().unwrap_or(0) + GRID_PADDING;

                let idx = dims.index(gy, gx, gz);
                sum[idx] = sum[idx] + v;
                count[idx] = count[idx] + T::one();
            }
        }

        Ok(Self {
            sum,
            count,
            dims,
            value_min,
            sigma_space,
            sigma_color,
        })
    }

    /// Grid dimensions, padding included.
    pub fn dims(&self) -> GridDims {
        self.dims
    }

    /// Blur the grid with an iterated separable box filter.
    ///
    /// Each of the three axes is smoothed twice with the 3-point stencil
    /// `(prev + 2*cur + next) / 4`, applied to sum and count jointly. Every
    /// pass reads from one buffer and writes the other; the outermost cell
    /// ring is never a blur target, so the two buffers agree on it (both
    /// zero) and no bounds checks are needed for neighbor access.
    pub fn blur(&mut self) {
        let dims = self.dims;
        let mut sum_scratch = vec![T::zero(); self.sum.len()];
        let mut count_scratch = vec![T::zero(); self.count.len()];

        let strides = [dims.cols * dims.depth, dims.depth, 1];
        for stride in strides {
            for _ in 0..2 {
                blur_pass(
                    &self.sum,
                    &self.count,
                    &mut sum_scratch,
                    &mut count_scratch,
                    dims,
                    stride,
                );
                std::mem::swap(&mut self.sum, &mut sum_scratch);
                std::mem::swap(&mut self.count, &mut count_scratch);
            }
        }
    }

    /// Normalize every cell to the average of the values it accumulated.
    ///
    /// Empty cells keep a sum of zero instead of propagating a division by
    /// zero into the reconstruction.
    pub fn normalize(&mut self) {
        self.sum
            .par_iter_mut()
            .zip(self.count.par_iter())
            .for_each(|(sum, &count)| {
                if count != T::zero() {
                    *sum = *sum / count;
                } else {
                    *sum = T::zero();
                }
            });
    }

    /// Reconstruct the filtered image by trilinear resampling.
    ///
    /// Every output pixel reads the blurred grid at its continuous
    /// (row, col, value) coordinate; indices are clamped at the grid
    /// boundary, so extreme corner pixels stay in bounds.
    pub fn slice_into(&self, src: &Image<T, 1>, dst: &mut Image<T, 1>) {
        let dims = self.dims;
        let grid_dims = [dims.rows, dims.cols, dims.depth];

        let inv_ss = 1.0 / self.sigma_space as f64;
        let inv_sc = cast::<T>(1.0 / self.sigma_color as f64);
        let pad = cast::<T>(GRID_PADDING as f64);
        let value_min = self.value_min;

        let cols = src.cols();
        let src_data = src.as_slice();

        dst.as_slice_mut()
            .par_chunks_exact_mut(cols)
            .enumerate()
            .for_each(|(y, dst_row)| {
                let py = cast::<T>(y as f64 * inv_ss) + pad;
                for (x, dst_pixel) in dst_row.iter_mut().enumerate() {
                    let px = cast::<T>(x as f64 * inv_ss) + pad;
                    let pz = (src_data[y * cols + x] - value_min) * inv_sc + pad;
                    *dst_pixel = trilinear_sample(&self.sum, grid_dims, py, px, pz);
                }
            });
    }
}

/// One blur pass along a single axis, interior cells only.
fn blur_pass<T: GridScalar>(
    src_sum: &[T],
    src_count: &[T],
    dst_sum: &mut [T],
    dst_count: &mut [T],
    dims: GridDims,
    stride: usize,
) {
    let slab = dims.cols * dims.depth;
    let two = T::one() + T::one();
    let quarter = cast::<T>(0.25);

    dst_sum
        .par_chunks_exact_mut(slab)
        .zip(dst_count.par_chunks_exact_mut(slab))
        .enumerate()
        .for_each(|(r, (dst_sum_slab, dst_count_slab))| {
            if r == 0 || r == dims.rows - 1 {
                return;
            }
            let base = r * slab;
            for c in 1..dims.cols - 1 {
                for d in 1..dims.depth - 1 {
                    let off = c * dims.depth + d;
                    let idx = base + off;

                    dst_sum_slab[off] = (src_sum[idx - stride]
                        + two * src_sum[idx]
                        + src_sum[idx + stride])
                        * quarter;
                    dst_count_slab[off] = (src_count[idx - stride]
                        + two * src_count[idx]
                        + src_count[idx + stride])
                        * quarter;
                }
            }
        });
}

/// Apply the fast approximate bilateral filter through a bilateral grid.
///
/// The image is scattered into a coarse 3-D grid, the grid is blurred with an
/// iterated separable box filter, normalized, and resampled back at every
/// pixel. Unlike the direct engine, the output has the same dimensions as the
/// input: the grid path filters every pixel, borders included. The two
/// engines intentionally differ here.
///
/// The grid path is defined over a scalar value axis; color inputs must be
/// reduced to a single channel (see [`crate::color::gray_from_rgb`]) before
/// filtering.
///
/// # Arguments
///
/// * `src` - The source image with shape (H, W, 1).
/// * `dst` - The destination image with shape (H, W, 1).
/// * `sigma_space` - The spatial downsampling scale, in pixels.
/// * `sigma_color` - The value-axis downsampling scale.
pub fn bilateral_filter_grid<T: GridScalar>(
    src: &Image<T, 1>,
    dst: &mut Image<T, 1>,
    sigma_space: f32,
    sigma_color: f32,
) -> Result<(), FilterError> {
    if sigma_space <= 0.0 {
        return Err(FilterError::InvalidSigma(sigma_space));
    }
    if sigma_color <= 0.0 {
        return Err(FilterError::InvalidSigma(sigma_color));
    }
    if src.size() != dst.size() {
        return Err(
            ImageError::InvalidImageSize(dst.cols(), dst.rows(), src.cols(), src.rows()).into(),
        );
    }

    let mut grid = BilateralGrid::downsample(src, sigma_space, sigma_color)?;
    grid.blur();
    grid.normalize();
    grid.slice_into(src, dst);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use bilateral_image::ImageSize;

    #[test]
    fn grid_sizing_is_deterministic() {
        let a = GridDims::from_image(480, 640, 1.0, 8.0, 0.1);
        let b = GridDims::from_image(480, 640, 1.0, 8.0, 0.1);
        assert_eq!(a, b);

        assert_eq!(a.rows, (479.0f64 / 8.0).floor() as usize + 1 + 4);
        assert_eq!(a.cols, (639.0f64 / 8.0).floor() as usize + 1 + 4);
        assert_eq!(a.depth, (1.0f64 / 0.1).floor() as usize + 1 + 4);
    }

    #[test]
    fn downsample_conserves_pixel_count() -> Result<(), FilterError> {
        let size = ImageSize {
            width: 12,
            height: 9,
        };
        let data: Vec<f32> = (0..size.width * size.height)
            .map(|i| (i % 7) as f32 / 7.0)
            .collect();
        let src = Image::<f32, 1>::new(size, data)?;

        let grid = BilateralGrid::downsample(&src, 2.0, 0.2)?;
        assert_eq!(grid.dims().num_cells(), grid.count.len());

        let total: f32 = grid.count.iter().copied().sum();
        assert_eq!(total, (size.width * size.height) as f32);

        Ok(())
    }

    #[test]
    fn constant_image_stays_constant() -> Result<(), FilterError> {
        let size = ImageSize {
            width: 16,
            height: 10,
        };
        let src = Image::<f32, 1>::from_size_val(size, 0.75)?;
        let mut dst = Image::<f32, 1>::from_size_val(size, 0.0)?;

        bilateral_filter_grid(&src, &mut dst, 4.0, 0.1)?;

        for &v in dst.as_slice() {
            assert_relative_eq!(v, 0.75, max_relative = 1e-5);
        }

        Ok(())
    }

    #[test]
    fn constant_image_stays_constant_f64() -> Result<(), FilterError> {
        let size = ImageSize {
            width: 8,
            height: 8,
        };
        let src = Image::<f64, 1>::from_size_val(size, 0.25)?;
        let mut dst = Image::<f64, 1>::from_size_val(size, 0.0)?;

        bilateral_filter_grid(&src, &mut dst, 2.0, 0.5)?;

        for &v in dst.as_slice() {
            assert_relative_eq!(v, 0.25, max_relative = 1e-10);
        }

        Ok(())
    }

    #[test]
    fn single_pixel_image_does_not_crash() -> Result<(), FilterError> {
        let size = ImageSize {
            width: 1,
            height: 1,
        };
        let src = Image::<f32, 1>::from_size_val(size, 0.5)?;
        let mut dst = Image::<f32, 1>::from_size_val(size, 0.0)?;

        bilateral_filter_grid(&src, &mut dst, 1.0, 1.0)?;
        assert_relative_eq!(dst.as_slice()[0], 0.5, max_relative = 1e-5);

        Ok(())
    }

    #[test]
    fn rejects_invalid_parameters() {
        let size = ImageSize {
            width: 4,
            height: 4,
        };
        let src = Image::<f32, 1>::from_size_val(size, 0.0).unwrap();
        let mut dst = Image::<f32, 1>::from_size_val(size, 0.0).unwrap();

        assert_eq!(
            bilateral_filter_grid(&src, &mut dst, 0.0, 1.0),
            Err(FilterError::InvalidSigma(0.0))
        );
        assert_eq!(
            bilateral_filter_grid(&src, &mut dst, 1.0, -1.0),
            Err(FilterError::InvalidSigma(-1.0))
        );

        let mut dst_small = Image::<f32, 1>::from_size_val(
            ImageSize {
                width: 2,
                height: 2,
            },
            0.0,
        )
        .unwrap();
        assert!(matches!(
            bilateral_filter_grid(&src, &mut dst_small, 1.0, 1.0),
            Err(FilterError::Image(_))
        ));
    }

    #[test]
    fn output_preserves_input_size() -> Result<(), FilterError> {
        let size = ImageSize {
            width: 20,
            height: 15,
        };
        let data: Vec<f32> = (0..size.width * size.height)
            .map(|i| (i % 13) as f32 / 13.0)
            .collect();
        let src = Image::<f32, 1>::new(size, data)?;
        let mut dst = Image::<f32, 1>::from_size_val(size, 0.0)?;

        bilateral_filter_grid(&src, &mut dst, 3.0, 0.15)?;

        assert_eq!(dst.size(), src.size());
        for &v in dst.as_slice() {
            assert!(v.is_finite());
            assert!((0.0..=1.0).contains(&v), "output {v} escaped input range");
        }

        Ok(())
    }

    #[test]
    fn corner_pixels_reconstruct_in_bounds() -> Result<(), FilterError> {
        // extreme values at the corners exercise the clamped trilinear path
        let size = ImageSize {
            width: 5,
            height: 5,
        };
        let mut data = vec![0.5f32; 25];
        data[0] = 0.0;
        data[4] = 1.0;
        data[20] = 1.0;
        data[24] = 0.0;
        let src = Image::<f32, 1>::new(size, data)?;
        let mut dst = Image::<f32, 1>::from_size_val(size, 0.0)?;

        bilateral_filter_grid(&src, &mut dst, 1.0, 0.25)?;

        for &v in dst.as_slice() {
            assert!(v.is_finite());
        }

        Ok(())
    }

    #[test]
    fn blur_conserves_interior_mass_ratio() -> Result<(), FilterError> {
        // after blurring, cell averages remain between the input extremes
        let size = ImageSize {
            width: 10,
            height: 10,
        };
        let data: Vec<f32> = (0..100).map(|i| if i % 2 == 0 { 0.0 } else { 1.0 }).collect();
        let src = Image::<f32, 1>::new(size, data)?;

        let mut grid = BilateralGrid::downsample(&src, 2.0, 0.5)?;
        grid.blur();
        grid.normalize();

        for (&sum, &count) in grid.sum.iter().zip(grid.count.iter()) {
            if count != 0.0 {
                assert!((0.0..=1.0).contains(&sum), "cell average {sum} out of range");
            }
        }

        Ok(())
    }
}
