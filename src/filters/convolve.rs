/// Kernel convolution and the blurs built on it
///
/// Border handling: taps that would sample outside the image are skipped.
/// The remaining weights are NOT renormalized, so for a unit-sum kernel the
/// pixels within `kernel / 2` of an edge come out darker (alpha included)
/// than interior pixels. Callers rely on this exact output, so keep it.

use crate::raster::{to_sample, Kernel, RasterBuffer};

/// Convolve every channel (alpha included) of `image` with `kernel`.
///
/// Output pixel (x, y) is `sum kernel[v][u] * image[x + u - kw/2, y + v - kh/2]`
/// over the taps that land inside the image. Returns a new buffer.
pub fn convolve(image: &RasterBuffer, kernel: &Kernel) -> RasterBuffer {
    let width = image.width() as isize;
    let height = image.height() as isize;
    let kernel_width = kernel.width() as isize;
    let kernel_height = kernel.height() as isize;
    let half_width = kernel_width / 2;
    let half_height = kernel_height / 2;
    let stride = image.width() as usize * 4;

    let source = image.pixels();
    let mut output = RasterBuffer::new(image.width(), image.height());
    let target = output.pixels_mut();

    for y in 0..height {
        // Kernel rows whose source row is inside the image
        let min_v = (half_height - y).max(0);
        let max_v = (height - y + half_height).min(kernel_height);

        for x in 0..width {
            let min_u = (half_width - x).max(0);
            let max_u = (width - x + half_width).min(kernel_width);

            let mut sum = [0.0f64; 4];
            for v in min_v..max_v {
                let row = (y + v - half_height) as usize * stride;
                for u in min_u..max_u {
                    let weight = kernel.weight(u as usize, v as usize);
                    let i = row + (x + u - half_width) as usize * 4;
                    sum[0] += source[i] as f64 * weight;
                    sum[1] += source[i + 1] as f64 * weight;
                    sum[2] += source[i + 2] as f64 * weight;
                    sum[3] += source[i + 3] as f64 * weight;
                }
            }

            let o = y as usize * stride + x as usize * 4;
            for (channel, value) in sum.iter().enumerate() {
                target[o + channel] = to_sample(*value);
            }
        }
    }

    output
}

/// Uniform `size x size` box blur.
pub fn box_blur(image: &RasterBuffer, size: usize) -> RasterBuffer {
    convolve(image, &Kernel::box_blur(size))
}

/// Fixed binomial 3x3 blur.
pub fn gaussian_blur_3x3(image: &RasterBuffer) -> RasterBuffer {
    convolve(image, &Kernel::gaussian_3x3())
}

/// Map a 0-100 blur strength to a box size: `floor(strength / 100 * 8 + 2)`,
/// i.e. 2x2 at 0 up to 10x10 at 100. Strength is clamped to 0..=100 first.
pub fn box_size_for_strength(strength: f32) -> usize {
    let strength = strength.clamp(0.0, 100.0) as f64;
    (strength / 100.0 * 8.0 + 2.0).floor() as usize
}
