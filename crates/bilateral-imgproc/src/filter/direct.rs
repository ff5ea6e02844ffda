use bilateral_image::{Image, ImageError};
use rayon::prelude::*;

use super::error::FilterError;
use super::kernels;
use crate::parallel::ExecutionStrategy;

/// Compute one output pixel of the bilateral filter.
///
/// The output pixel `(y, x)` maps to the source center `(y + radius,
/// x + radius)`; the whole `(2r + 1)²` neighborhood is guaranteed to lie
/// inside the source image by the interior offset.
///
/// # Arguments
///
/// * `src_data` - The source image with full data.
/// * `src_cols` - Cols of source image.
/// * `y` - Current row idx in the output image.
/// * `x` - Current col idx in the output image.
/// * `radius` - The neighborhood half-width.
/// * `spatial_kernel` - The `(2r + 1)²` spatial Gaussian lookup.
/// * `inv_two_sigma_color_sq` - Precomputed `1 / (2 * sigma_color²)`.
/// * `dst_pixel` - The slice for the current output pixel, length C.
#[inline]
#[allow(clippy::too_many_arguments)]
fn filter_pixel<const C: usize>(
    src_data: &[f32],
    src_cols: usize,
    y: usize,
    x: usize,
    radius: usize,
    spatial_kernel: &[f32],
    inv_two_sigma_color_sq: f32,
    dst_pixel: &mut [f32],
) {
    let side = 2 * radius + 1;

    let center_off = ((y + radius) * src_cols + (x + radius)) * C;
    let center = &src_data[center_off..center_off + C];

    let mut sum = [0.0f32; C];
    let mut weight_total = 0.0f32;

    for ky in 0..side {
        let row_off = (y + ky) * src_cols;
        for kx in 0..side {
            let pix_off = (row_off + x + kx) * C;
            let neighbor = &src_data[pix_off..pix_off + C];

            let mut dist_sq = 0.0f32;
            for ch in 0..C {
                let diff = neighbor[ch] - center[ch];
                dist_sq += diff * diff;
            }

            let range_w = (-dist_sq * inv_two_sigma_color_sq).exp();
            let w = spatial_kernel[ky * side + kx] * range_w;

            for ch in 0..C {
                sum[ch] += w * neighbor[ch];
            }
            weight_total += w;
        }
    }

    // the center tap contributes weight 1, so weight_total >= 1
    for ch in 0..C {
        dst_pixel[ch] = sum[ch] / weight_total;
    }
}

/// Apply the exact bilateral filter with execution strategy control.
///
/// For each output pixel a square neighborhood of half-width `radius` is
/// scanned and accumulated with a spatial-Gaussian times range-Gaussian
/// weight, then normalized by the total weight. The range distance for
/// multi-channel pixels is Euclidean over the channel differences.
///
/// Only valid (non-border-clamped) outputs are produced: the destination is
/// smaller than the source by `2 * radius` in each dimension. Pixels within
/// `radius` of the border are excluded from the addressable output region.
///
/// # Arguments
///
/// * `src` - The source image with shape (H, W, C).
/// * `dst` - The destination image with shape (H - 2r, W - 2r, C).
/// * `radius` - The neighborhood half-width.
/// * `sigma_space` - The sigma of the spatial Gaussian.
/// * `sigma_color` - The sigma of the range Gaussian.
/// * `strategy` - Execution strategy: `Auto`, `Serial`, or `Parallel`.
pub fn bilateral_filter_direct_with_strategy<const C: usize>(
    src: &Image<f32, C>,
    dst: &mut Image<f32, C>,
    radius: usize,
    sigma_space: f32,
    sigma_color: f32,
    strategy: ExecutionStrategy,
) -> Result<(), FilterError> {
    if sigma_space <= 0.0 {
        return Err(FilterError::InvalidSigma(sigma_space));
    }
    if sigma_color <= 0.0 {
        return Err(FilterError::InvalidSigma(sigma_color));
    }
    if 2 * radius >= src.rows() || 2 * radius >= src.cols() {
        return Err(FilterError::InvalidRadius(radius, src.rows(), src.cols()));
    }

    let out_rows = src.rows() - 2 * radius;
    let out_cols = src.cols() - 2 * radius;
    if dst.rows() != out_rows || dst.cols() != out_cols {
        return Err(ImageError::InvalidImageSize(dst.cols(), dst.rows(), out_cols, out_rows).into());
    }

    let spatial_kernel = kernels::gaussian_kernel_2d(radius, sigma_space);
    let inv_two_sigma_color_sq = 1.0 / (2.0 * sigma_color * sigma_color);

    let src_data = src.as_slice();
    let src_cols = src.cols();
    let row_len = out_cols * C;

    if strategy.is_parallel(out_rows * out_cols) {
        dst.as_slice_mut()
            .par_chunks_exact_mut(row_len)
            .enumerate()
            .for_each(|(y, dst_row)| {
                dst_row
                    .chunks_exact_mut(C)
                    .enumerate()
                    .for_each(|(x, dst_pixel)| {
                        filter_pixel::<C>(
                            src_data,
                            src_cols,
                            y,
                            x,
                            radius,
                            &spatial_kernel,
                            inv_two_sigma_color_sq,
                            dst_pixel,
                        );
                    });
            });
    } else {
        dst.as_slice_mut()
            .chunks_exact_mut(row_len)
            .enumerate()
            .for_each(|(y, dst_row)| {
                dst_row
                    .chunks_exact_mut(C)
                    .enumerate()
                    .for_each(|(x, dst_pixel)| {
                        filter_pixel::<C>(
                            src_data,
                            src_cols,
                            y,
                            x,
                            radius,
                            &spatial_kernel,
                            inv_two_sigma_color_sq,
                            dst_pixel,
                        );
                    });
            });
    }

    Ok(())
}

/// Apply the exact bilateral filter to an image.
///
/// Uses `ExecutionStrategy::Auto` (parallel for outputs ≥100K pixels, serial
/// otherwise). For explicit control, use
/// [`bilateral_filter_direct_with_strategy`].
///
/// # Arguments
///
/// * `src` - The source image with shape (H, W, C).
/// * `dst` - The destination image with shape (H - 2r, W - 2r, C).
/// * `radius` - The neighborhood half-width.
/// * `sigma_space` - The sigma of the spatial Gaussian.
/// * `sigma_color` - The sigma of the range Gaussian.
pub fn bilateral_filter_direct<const C: usize>(
    src: &Image<f32, C>,
    dst: &mut Image<f32, C>,
    radius: usize,
    sigma_space: f32,
    sigma_color: f32,
) -> Result<(), FilterError> {
    bilateral_filter_direct_with_strategy(
        src,
        dst,
        radius,
        sigma_space,
        sigma_color,
        ExecutionStrategy::Auto,
    )
}
