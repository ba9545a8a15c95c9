pub mod buffer;
pub mod cdf;
pub mod color_converter;
pub mod histogram;
pub mod hsl_image;
pub mod normalizer;
pub mod pixel;
pub mod utils;
