/// Source preparation
///
/// Turns a decoded photo into the buffer the layer pipeline starts from:
/// conversion from the `image` crate, rotation into a canvas large enough
/// for every corner, and resizing to the working width.

use image::imageops::{self, FilterType};
use image::RgbaImage;

use crate::geometry::{rotate_point, rotated_bounding_box, Point2D};
use crate::raster::{to_sample, RasterBuffer};

impl From<RgbaImage> for RasterBuffer {
    fn from(image: RgbaImage) -> Self {
        let (width, height) = image.dimensions();
        RasterBuffer::from_raw(width, height, image.into_raw())
    }
}

impl From<RasterBuffer> for RgbaImage {
    fn from(buffer: RasterBuffer) -> Self {
        let (width, height) = buffer.dimensions();
        let pixels = buffer.into_pixels();
        // Lengths always agree, RasterBuffer enforces width * height * 4
        RgbaImage::from_raw(width, height, pixels).unwrap_or_else(|| RgbaImage::new(width, height))
    }
}

/// Bounds below this are float noise from the rotation, not real coverage.
const EPSILON: f64 = 1e-6;

/// Rotate `image` about its center by `degrees` (clockwise on screen) into
/// a buffer sized to the rotated bounds, so no corner is clipped.
///
/// Sampling is bilinear on premultiplied alpha; everything outside the
/// source is transparent.
pub fn rotate_to_fit(image: &RasterBuffer, degrees: f32) -> RasterBuffer {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return image.clone();
    }

    let angle = (degrees as f64).to_radians();
    let bounds = rotated_bounding_box(width as f64, height as f64, angle);
    let out_width = (bounds.width - EPSILON).ceil().max(1.0) as u32;
    let out_height = (bounds.height - EPSILON).ceil().max(1.0) as u32;

    let (src_cx, src_cy) = (width as f64 / 2.0, height as f64 / 2.0);
    let (dst_cx, dst_cy) = (out_width as f64 / 2.0, out_height as f64 / 2.0);

    let mut output = RasterBuffer::new(out_width, out_height);
    for y in 0..out_height {
        for x in 0..out_width {
            let offset = Point2D::new(x as f64 + 0.5 - dst_cx, y as f64 + 0.5 - dst_cy);
            let source = rotate_point(offset, -angle);
            let pixel = sample_bilinear(image, source.x + src_cx - 0.5, source.y + src_cy - 0.5);
            output.set_pixel(x, y, pixel);
        }
    }

    output
}

/// Bilinear sample at pixel-center coordinates, transparent outside.
fn sample_bilinear(image: &RasterBuffer, x: f64, y: f64) -> [u8; 4] {
    let (x0, y0) = (x.floor(), y.floor());
    let (fx, fy) = (x - x0, y - y0);
    let (x0, y0) = (x0 as i64, y0 as i64);

    let mut premultiplied = [0.0f64; 3];
    let mut alpha = 0.0f64;

    for (dx, dy, weight) in [
        (0, 0, (1.0 - fx) * (1.0 - fy)),
        (1, 0, fx * (1.0 - fy)),
        (0, 1, (1.0 - fx) * fy),
        (1, 1, fx * fy),
    ] {
        let (sx, sy) = (x0 + dx, y0 + dy);
        if weight == 0.0 || sx < 0 || sy < 0 || sx >= image.width() as i64 || sy >= image.height() as i64 {
            continue;
        }
        let [r, g, b, a] = image.pixel(sx as u32, sy as u32);
        let a = a as f64 * weight;
        premultiplied[0] += r as f64 * a;
        premultiplied[1] += g as f64 * a;
        premultiplied[2] += b as f64 * a;
        alpha += a;
    }

    if alpha <= 0.0 {
        return [0, 0, 0, 0];
    }
    [
        to_sample(premultiplied[0] / alpha),
        to_sample(premultiplied[1] / alpha),
        to_sample(premultiplied[2] / alpha),
        to_sample(alpha),
    ]
}

/// Resize to `width` keeping the aspect ratio (Lanczos3).
///
/// Height is `round(h / w * width)`, at least 1.
pub fn fit_to_width(image: &RasterBuffer, width: u32) -> RasterBuffer {
    let (source_width, source_height) = image.dimensions();
    if width == 0 || source_width == 0 || source_height == 0 {
        return RasterBuffer::new(width, 0);
    }

    let height = ((source_height as f64 / source_width as f64) * width as f64)
        .round()
        .max(1.0) as u32;
    if (width, height) == (source_width, source_height) {
        return image.clone();
    }

    let rgba = RgbaImage::from(image.clone());
    let resized = imageops::resize(&rgba, width, height, FilterType::Lanczos3);
    tracing::debug!(
        from = ?(source_width, source_height),
        to = ?(width, height),
        "resized source"
    );
    RasterBuffer::from(resized)
}

/// Rotate then resize to the working width: the layer pipeline's input.
pub fn prepare_source(image: &RasterBuffer, degrees: f32, width: u32) -> RasterBuffer {
    let rotated = if degrees == 0.0 {
        image.clone()
    } else {
        rotate_to_fit(image, degrees)
    };
    fit_to_width(&rotated, width)
}
