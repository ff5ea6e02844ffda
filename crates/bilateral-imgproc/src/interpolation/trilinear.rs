/// Kernel for trilinear interpolation over a dense 3-D array.
///
/// The array is expected in row-major (rows, cols, depth) layout. The sample
/// coordinate is continuous; the eight surrounding cells are blended with
/// weights given by the fractional offsets along each axis. Coordinates are
/// clamped to the array bounds, so sampling at or beyond the boundary never
/// reads out of bounds.
///
/// # Arguments
///
/// * `data` - The array values, `dims[0] * dims[1] * dims[2]` elements.
/// * `dims` - The array dimensions as (rows, cols, depth).
/// * `py` - The continuous row coordinate.
/// * `px` - The continuous column coordinate.
/// * `pz` - The continuous depth coordinate.
#[inline]
pub fn trilinear_sample<T>(data: &[T], dims: [usize; 3], py: T, px: T, pz: T) -> T
where
    T: num_traits::Float,
{
    let (rows, cols, depth) = (dims[0], dims[1], dims[2]);

    let max_y = T::from(rows - 1).unwrap_or_else(T::zero);
    let max_x = T::from(cols - 1).unwrap_or_else(T::zero);
    let max_z = T::from(depth - 1).unwrap_or_else(T::zero);

    let py = py.max(T::zero()).min(max_y);
    let px = px.max(T::zero()).min(max_x);
    let pz = pz.max(T::zero()).min(max_z);

    let iy0 = py.floor().to_usize().unwrap_or(0);
    let ix0 = px.floor().to_usize().unwrap_or(0);
    let iz0 = pz.floor().to_usize().unwrap_or(0);

    let iy1 = (iy0 + 1).min(rows - 1);
    let ix1 = (ix0 + 1).min(cols - 1);
    let iz1 = (iz0 + 1).min(depth - 1);

    let fy = py - py.floor();
    let fx = px - px.floor();
    let fz = pz - pz.floor();

    let gy = T::one() - fy;
    let gx = T::one() - fx;
    let gz = T::one() - fz;

    let at = |y: usize, x: usize, z: usize| data[(y * cols + x) * depth + z];

    at(iy0, ix0, iz0) * gy * gx * gz
        + at(iy0, ix0, iz1) * gy * gx * fz
        + at(iy0, ix1, iz0) * gy * fx * gz
        + at(iy0, ix1, iz1) * gy * fx * fz
        + at(iy1, ix0, iz0) * fy * gx * gz
        + at(iy1, ix0, iz1) * fy * gx * fz
        + at(iy1, ix1, iz0) * fy * fx * gz
        + at(iy1, ix1, iz1) * fy * fx * fz
}
