mod trilinear;

pub use trilinear::trilinear_sample;
