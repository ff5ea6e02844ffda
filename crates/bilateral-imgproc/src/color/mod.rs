mod gray;

pub use gray::{gray_from_rgb, rgb_from_gray};
