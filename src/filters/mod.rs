/// CPU filters
///
/// Every stage writes its 8-bit samples through one saturating store, so
/// the buffers handed between stages always hold valid RGBA8 values.
///
/// - `convolve` - kernel convolution, box and 3x3 Gaussian blur
/// - `tone` - grayscale and gamma-corrected levels
/// - `posterize` - color-table posterization
/// - `edges` - edge-aware recolor (`replace_color`) and halftone (`replace_pattern`)
/// - `gradient` - four-corner test input

pub mod convolve;
pub mod edges;
pub mod gradient;
pub mod posterize;
pub mod tone;

pub use convolve::{box_blur, box_size_for_strength, convolve, gaussian_blur_3x3};
pub use edges::{replace_color, replace_pattern};
pub use gradient::{draw_gradient, GradientCorners};
pub use posterize::{posterize, posterize_levels};
pub use tone::{apply_levels, compute_gamma, grayscale, levels_exponent};
