#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// color transformations module.
pub mod color;

/// bilateral filtering module.
pub mod filter;

/// utilities for interpolation.
pub mod interpolation;

/// image statistics module.
pub mod normalize;

/// module containing parallelization utilities.
pub mod parallel;
