/// Edge-aware recoloring
///
/// Two independent filters with different shapes:
/// - `replace_color` blends a new color into the interior of a flat region,
///   fading out toward its edges
/// - `replace_pattern` keeps region edges and swaps flat interiors for a
///   line halftone whose density follows the gray level (less ink on paper)

use crate::raster::{to_sample, RasterBuffer};

const WHITE: [u8; 4] = [255, 255, 255, 255];

/// Distance from (x, y) to the nearest pixel that is not `target`, searched
/// in the `2 * radius` square around it and capped at `radius`. Zero when
/// (x, y) itself is not `target`. Samples outside the image are skipped.
fn matching_radius(image: &RasterBuffer, x: u32, y: u32, target: [u8; 4], radius: u32) -> f64 {
    if image.pixel(x, y) != target {
        return 0.0;
    }

    let radius = radius as i64;
    let (width, height) = (image.width() as i64, image.height() as i64);
    let mut nearest_sqr = radius * radius;

    for dx in -radius..radius {
        for dy in -radius..radius {
            let sx = x as i64 + dx;
            let sy = y as i64 + dy;
            if sx < 0 || sy < 0 || sx >= width || sy >= height {
                continue;
            }
            if image.pixel(sx as u32, sy as u32) != target {
                nearest_sqr = nearest_sqr.min(dx * dx + dy * dy);
            }
        }
    }

    (nearest_sqr as f64).sqrt()
}

/// Blend `replacement` into pixels that exactly match `target`, in
/// proportion to their distance from the region edge (`distance / radius`,
/// 0 when the distance is under 2). Other pixels are copied unchanged.
/// Returns a new buffer.
pub fn replace_color(
    image: &RasterBuffer,
    target: [u8; 4],
    replacement: [u8; 4],
    radius: u32,
) -> RasterBuffer {
    let mut output = RasterBuffer::new(image.width(), image.height());

    for y in 0..image.height() {
        for x in 0..image.width() {
            let distance = matching_radius(image, x, y, target, radius);
            let scale = if distance < 2.0 { 0.0 } else { distance / radius as f64 };

            let source = image.pixel(x, y);
            let mut blended = [0u8; 4];
            for channel in 0..4 {
                blended[channel] = to_sample(
                    replacement[channel] as f64 * scale + source[channel] as f64 * (1.0 - scale),
                );
            }
            output.set_pixel(x, y, blended);
        }
    }

    output
}

/// A pixel is an edge when any 4-connected neighbor differs in RGBA.
/// Neighbors outside the image count as different.
fn is_edge(image: &RasterBuffer, x: u32, y: u32) -> bool {
    let center = image.pixel(x, y);
    let differs = |nx: Option<u32>, ny: Option<u32>| match (nx, ny) {
        (Some(nx), Some(ny)) if nx < image.width() && ny < image.height() => {
            image.pixel(nx, ny) != center
        }
        _ => true,
    };

    differs(x.checked_sub(1), Some(y))
        || differs(x.checked_add(1), Some(y))
        || differs(Some(x), y.checked_sub(1))
        || differs(Some(x), y.checked_add(1))
}

/// Halftone for an interior pixel of gray level `gray`.
///
/// Keeps `gray` on every `size`-th row and column, white elsewhere, with
/// `size = floor(10 * (1 - gray / 510))`: 5 for near-white up to 10 for
/// black. Pure white stays white.
fn pattern_pixel(x: u32, y: u32, gray: u8) -> [u8; 4] {
    if gray == 255 {
        return WHITE;
    }

    let intensity = gray as f64 / 255.0;
    let size = (10.0 * (1.0 - intensity / 2.0)).floor() as u32;
    let value = if x % size == 0 || y % size == 0 { gray } else { 255 };
    [value, value, value, 255]
}

/// Keep edges, halftone interiors. Edge pixels keep their color with alpha
/// forced to 255. Interior pixels are treated as gray (the red channel) and
/// replaced by `pattern_pixel`. Returns a new buffer.
pub fn replace_pattern(image: &RasterBuffer) -> RasterBuffer {
    let mut output = RasterBuffer::new(image.width(), image.height());

    for y in 0..image.height() {
        for x in 0..image.width() {
            let [r, g, b, _] = image.pixel(x, y);
            let pixel = if is_edge(image, x, y) {
                [r, g, b, 255]
            } else {
                pattern_pixel(x, y, r)
            };
            output.set_pixel(x, y, pixel);
        }
    }

    output
}
