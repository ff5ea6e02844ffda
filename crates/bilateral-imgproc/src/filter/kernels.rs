/// Create a 2-D spatial Gaussian kernel.
///
/// The kernel has side `2 * radius + 1` and is indexed by pixel offset within
/// the neighborhood. It is deliberately not normalized: the bilateral filter
/// divides by the accumulated total weight instead, so the center tap keeps
/// weight exactly 1.
///
/// # Arguments
///
/// * `radius` - The neighborhood half-width.
/// * `sigma` - The sigma of the gaussian kernel.
///
/// # Returns
///
/// A vector with the kernel weights in row-major order.
pub fn gaussian_kernel_2d(radius: usize, sigma: f32) -> Vec<f32> {
    let side = 2 * radius + 1;
    let mut kernel = Vec::with_capacity(side * side);

    let inv_two_sigma_sq = 1.0 / (2.0 * sigma * sigma);

    for ky in 0..side {
        let dy = ky as f32 - radius as f32;
        for kx in 0..side {
            let dx = kx as f32 - radius as f32;
            kernel.push((-(dy * dy + dx * dx) * inv_two_sigma_sq).exp());
        }
    }

    kernel
}
