/// Four-corner gradient, a predictable input for exercising the other filters

use crate::raster::{to_sample, RasterBuffer};

/// Corner colors of a gradient, clockwise from the top left
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GradientCorners {
    pub top_left: [u8; 4],
    pub top_right: [u8; 4],
    pub bottom_right: [u8; 4],
    pub bottom_left: [u8; 4],
}

/// Bilinear blend of the four corners over a `width x height` buffer.
///
/// Uses `x / width` and `y / height`, so the right column and bottom row
/// stop one step short of the right and bottom corner colors.
pub fn draw_gradient(width: u32, height: u32, corners: GradientCorners) -> RasterBuffer {
    let mut image = RasterBuffer::new(width, height);

    for y in 0..height {
        let y_norm = y as f64 / height as f64;
        for x in 0..width {
            let x_norm = x as f64 / width as f64;

            let top_left = (1.0 - y_norm) * (1.0 - x_norm);
            let top_right = x_norm * (1.0 - y_norm);
            let bottom_left = y_norm * (1.0 - x_norm);
            let bottom_right = y_norm * x_norm;

            let mut pixel = [0u8; 4];
            for (channel, value) in pixel.iter_mut().enumerate() {
                *value = to_sample(
                    corners.top_left[channel] as f64 * top_left
                        + corners.top_right[channel] as f64 * top_right
                        + corners.bottom_left[channel] as f64 * bottom_left
                        + corners.bottom_right[channel] as f64 * bottom_right,
                );
            }
            image.set_pixel(x, y, pixel);
        }
    }

    image
}
