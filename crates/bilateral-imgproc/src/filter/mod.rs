mod direct;
mod error;
mod grid;

/// weight kernel construction.
pub mod kernels;

pub use direct::{bilateral_filter_direct, bilateral_filter_direct_with_strategy};
pub use error::FilterError;
pub use grid::{bilateral_filter_grid, BilateralGrid, GridDims, GridScalar, GRID_PADDING};
