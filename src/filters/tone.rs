/// Grayscale reduction and gamma-corrected levels

use crate::error::Result;
use crate::raster::{to_sample, LevelParameters, RasterBuffer};

/// Rec. 709 luma weights
const LUMA_R: f64 = 0.2126;
const LUMA_G: f64 = 0.7152;
const LUMA_B: f64 = 0.0722;

/// Replace R, G and B with luminance. Alpha is untouched. In place.
pub fn grayscale(image: &mut RasterBuffer) {
    for pixel in image.pixels_mut().chunks_exact_mut(4) {
        let luminance = LUMA_R * pixel[0] as f64 + LUMA_G * pixel[1] as f64 + LUMA_B * pixel[2] as f64;
        let value = to_sample(luminance);
        pixel[0] = value;
        pixel[1] = value;
        pixel[2] = value;
    }
}

/// Midtone response curve.
///
/// 1.0 at `mid == 128`. Below that it rises toward 9.99 as `mid` reaches 0,
/// above it falls toward 0.01 as `mid` reaches 255. Decreasing in `mid`
/// until it hits the 0.01 floor at 254.
pub fn compute_gamma(mid: u8) -> f64 {
    let normalized = mid as f64 / 255.0;
    if mid < 128 {
        let normalized = normalized * 2.0;
        (1.0 + 9.0 * (1.0 - normalized)).min(9.99)
    } else if mid > 128 {
        let normalized = normalized * 2.0 - 1.0;
        (1.0 - normalized).max(0.01)
    } else {
        1.0
    }
}

/// Exponent the levels pass raises normalized values to: `1 / compute_gamma(mid)`.
pub fn levels_exponent(mid: u8) -> f64 {
    1.0 / compute_gamma(mid)
}

/// Levels remap of R, G and B, in place.
///
/// Each channel becomes `255 * (v - low) / (high - low)`, then, unless
/// `mid == 128`, `255 * (rescaled / 255) ^ levels_exponent(mid)`. The
/// power step is skipped entirely at 128, so that case is bit-identical to
/// the linear rescale.
///
/// The float math is not clamped: values below `low` go negative (and to
/// NaN through a fractional power), values above `high` exceed 255. Only
/// the final 8-bit store saturates (NaN stores as 0). `high == low` is
/// rejected with `DegenerateRange` before any pixel is touched.
pub fn apply_levels(image: &mut RasterBuffer, levels: LevelParameters) -> Result<()> {
    levels.validate()?;

    let low = levels.low as f64;
    let range = levels.range();
    let exponent = levels_exponent(levels.mid);
    let apply_gamma = levels.mid != 128;

    for pixel in image.pixels_mut().chunks_exact_mut(4) {
        for channel in &mut pixel[..3] {
            let mut value = 255.0 * (*channel as f64 - low) / range;
            if apply_gamma {
                value = 255.0 * (value / 255.0).powf(exponent);
            }
            *channel = to_sample(value);
        }
    }

    Ok(())
}
