/// CPU models of the fragment stages
///
/// Each function mirrors one WGSL program texel for texel (f32 math,
/// clamp-to-edge fetches, unorm store), using the same uniform blocks the
/// pipeline uploads. The tests below use them two ways: to pin down where
/// the GPU path deliberately differs from the CPU filters, and, when an
/// adapter is present, to check real GPU output within one step per channel.

use super::pipeline::{BlurUniforms, LevelsUniforms, PosterizeUniforms, BLUR_TAPS, PATTERN_GRID};
use crate::error::Result;
use crate::raster::{LevelParameters, RasterBuffer};

/// Rgba8Unorm store
fn store(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

fn store_rgba(rgba: [f32; 4]) -> [u8; 4] {
    rgba.map(store)
}

/// Clamp-to-edge fetch, normalized
fn load(image: &RasterBuffer, x: i64, y: i64) -> [f32; 4] {
    let x = x.clamp(0, image.width() as i64 - 1) as u32;
    let y = y.clamp(0, image.height() as i64 - 1) as u32;
    image.pixel(x, y).map(|c| c as f32 / 255.0)
}

fn map_pixels(image: &RasterBuffer, mut shade: impl FnMut(i64, i64) -> [f32; 4]) -> RasterBuffer {
    let mut output = RasterBuffer::new(image.width(), image.height());
    for y in 0..image.height() {
        for x in 0..image.width() {
            output.set_pixel(x, y, store_rgba(shade(x as i64, y as i64)));
        }
    }
    output
}

pub(crate) fn box_blur(image: &RasterBuffer, size: usize) -> RasterBuffer {
    let uniforms = BlurUniforms::for_size(size);
    map_pixels(image, |x, y| {
        let mut colour = [0.0f32; 4];
        for i in 0..BLUR_TAPS {
            let weight = uniforms.weight(i);
            let sample = load(image, x + (i % 10) as i64 - 5, y + (i / 10) as i64 - 5);
            for channel in 0..4 {
                colour[channel] += sample[channel] * weight;
            }
        }
        let total = uniforms.weight_total;
        [colour[0] / total, colour[1] / total, colour[2] / total, 1.0]
    })
}

pub(crate) fn levels(image: &RasterBuffer, levels: LevelParameters) -> RasterBuffer {
    let uniforms = LevelsUniforms::from(levels);
    map_pixels(image, |x, y| {
        let colour = load(image, x, y);
        let apply = |c: f32| ((c - uniforms.low) / uniforms.range).clamp(0.0, 1.0).powf(uniforms.exponent);
        [apply(colour[0]), apply(colour[1]), apply(colour[2]), 1.0]
    })
}

pub(crate) fn posterize(image: &RasterBuffer, colours: &[f32]) -> Result<RasterBuffer> {
    let uniforms = PosterizeUniforms::from_flat(colours)?;
    let last = uniforms.row_count as usize - 1;
    Ok(map_pixels(image, |x, y| {
        let colour = load(image, x, y);
        let average = (colour[0] + colour[1] + colour[2]) / 3.0;
        let index = ((average / uniforms.level_count).floor() as usize).min(last);
        let [r, g, b, _] = uniforms.colours[index];
        [r, g, b, 1.0]
    }))
}

pub(crate) fn replace_pattern(image: &RasterBuffer) -> RasterBuffer {
    let grid = PATTERN_GRID as i64;
    map_pixels(image, |x, y| {
        let center = load(image, x, y);
        let is_edge = [(0i64, -1i64), (0, 1), (-1, 0), (1, 0)]
            .iter()
            .any(|&(dx, dy)| load(image, x + dx, y + dy) != center);
        if is_edge {
            return center;
        }

        let average = (center[0] + center[1] + center[2]) / 3.0;
        let value = if x % grid == 0 || y % grid == 0 { average } else { 1.0 };
        [value, value, value, 1.0]
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::{self, GradientCorners};
    use crate::raster::ColorTable;

    fn gradient(width: u32, height: u32) -> RasterBuffer {
        filters::draw_gradient(
            width,
            height,
            GradientCorners {
                top_left: [10, 40, 200, 255],
                top_right: [250, 30, 20, 255],
                bottom_right: [90, 220, 60, 255],
                bottom_left: [0, 0, 0, 255],
            },
        )
    }

    fn gray(width: u32, height: u32, value: u8) -> RasterBuffer {
        RasterBuffer::filled(width, height, [value, value, value, 255])
    }

    fn assert_close(a: &RasterBuffer, b: &RasterBuffer, tolerance: u8) {
        assert_eq!(a.dimensions(), b.dimensions());
        for (i, (x, y)) in a.pixels().iter().zip(b.pixels()).enumerate() {
            assert!(x.abs_diff(*y) <= tolerance, "byte {i}: {x} vs {y}");
        }
    }

    // ---- CPU / GPU divergences ----

    #[test]
    fn test_gpu_blur_stops_growing_past_ten() {
        let image = gradient(40, 40);
        assert_eq!(box_blur(&image, 12), box_blur(&image, 30));
        assert_ne!(filters::box_blur(&image, 12), filters::box_blur(&image, 30));
    }

    #[test]
    fn test_odd_blur_sizes_agree_in_the_interior() {
        // Odd sizes cover the same centered window on both paths.
        let image = gradient(24, 24);
        let cpu = filters::box_blur(&image, 5);
        let gpu = box_blur(&image, 5);
        for y in 3..21 {
            for x in 3..21 {
                let (c, g) = (cpu.pixel(x, y), gpu.pixel(x, y));
                for channel in 0..4 {
                    assert!(c[channel].abs_diff(g[channel]) <= 1, "({x}, {y}): {c:?} vs {g:?}");
                }
            }
        }
    }

    #[test]
    fn test_gpu_blur_border_is_clamped_and_opaque() {
        // The CPU blur darkens borders (skipped taps); the GPU one clamps.
        let image = gray(12, 12, 100);
        assert_eq!(box_blur(&image, 6), image);
        assert_ne!(filters::box_blur(&image, 6).pixel(0, 0), image.pixel(0, 0));
    }

    #[test]
    fn test_levels_agree_on_color_and_gpu_alpha_is_opaque() {
        let mut image = gradient(16, 16);
        for pixel in image.pixels_mut().chunks_exact_mut(4) {
            pixel[3] = 90;
        }
        let params = LevelParameters::new(30, 100, 220);

        let gpu = levels(&image, params);
        let mut cpu = image.clone();
        filters::apply_levels(&mut cpu, params).unwrap();

        for (c, g) in cpu.pixels().chunks_exact(4).zip(gpu.pixels().chunks_exact(4)) {
            for channel in 0..3 {
                assert!(c[channel].abs_diff(g[channel]) <= 1, "{c:?} vs {g:?}");
            }
            assert_eq!(c[3], 90);
            assert_eq!(g[3], 255);
        }
    }

    #[test]
    fn test_posterize_bucketing_diverges_on_color() {
        let table = ColorTable::new(vec![[0, 0, 0], [255, 255, 255]]).unwrap();
        let image = RasterBuffer::filled(2, 2, [255, 0, 0, 255]);

        let gpu = posterize(&image, &table.to_flat_normalized()).unwrap();
        let mut cpu = image.clone();
        filters::posterize(&mut cpu, &table);

        // Per channel: red lands in the white row, green and blue in black.
        assert_eq!(cpu.pixel(0, 0), [255, 0, 0, 255]);
        // Average 1/3 lands in the black row for every channel.
        assert_eq!(gpu.pixel(0, 0), [0, 0, 0, 255]);
        assert_ne!(cpu, gpu);
    }

    #[test]
    fn test_posterize_agrees_on_gray() {
        let table = ColorTable::three_tones();
        let mut image = RasterBuffer::new(256, 1);
        for x in 0..256 {
            let v = x as u8;
            image.set_pixel(x, 0, [v, v, v, 255]);
        }

        let gpu = posterize(&image, &table.to_flat_normalized()).unwrap();
        let mut cpu = image.clone();
        filters::posterize(&mut cpu, &table);
        assert_close(&cpu, &gpu, 1);
    }

    #[test]
    fn test_pattern_grid_and_border_diverge() {
        let image = gray(20, 20, 150);
        let gpu = replace_pattern(&image);
        let cpu = filters::replace_pattern(&image);

        // GPU grid is every 5 pixels, CPU grid for 150 is every 7.
        assert_eq!(gpu.pixel(5, 3), [150, 150, 150, 255]);
        assert_eq!(cpu.pixel(5, 3), [255, 255, 255, 255]);
        // Clamped fetches make borders interior on the GPU path.
        assert_eq!(gpu.pixel(19, 3), [255, 255, 255, 255]);
        assert_eq!(cpu.pixel(19, 3), [150, 150, 150, 255]);
    }

    #[test]
    fn test_pattern_keeps_edges_with_their_alpha() {
        let mut image = gray(6, 6, 200);
        image.set_pixel(3, 3, [10, 10, 10, 77]);
        let gpu = replace_pattern(&image);
        assert_eq!(gpu.pixel(3, 3), [10, 10, 10, 77]);
        assert_eq!(gpu.pixel(3, 2), [200, 200, 200, 255]);
    }

    // ---- Real adapter ----

    mod adapter {
        use super::*;
        use crate::error::FilterError;
        use crate::gpu::{FilterKind, FilterPipeline, GpuContext, ShaderTable};

        fn pipeline() -> FilterPipeline {
            let context = GpuContext::shared().expect("GPU adapter required");
            FilterPipeline::new(context, ShaderTable::builtin())
        }

        #[test]
        #[ignore = "needs a GPU adapter"]
        fn test_gpu_matches_emulation() {
            let mut gpu = pipeline();
            let image = gradient(33, 21);
            let table = ColorTable::final_tones().to_flat_normalized();
            let params = LevelParameters::new(20, 150, 230);

            assert_close(&gpu.box_blur(&image, 6).unwrap(), &box_blur(&image, 6), 1);
            assert_close(&gpu.levels(&image, params).unwrap(), &levels(&image, params), 1);
            assert_close(
                &gpu.posterize(&image, &table).unwrap(),
                &posterize(&image, &table).unwrap(),
                1,
            );
            let stepped = gpu.posterize(&image, &table).unwrap();
            assert_close(&gpu.replace_pattern(&stepped).unwrap(), &replace_pattern(&stepped), 1);
        }

        #[test]
        #[ignore = "needs a GPU adapter"]
        fn test_programs_compile_lazily_and_surface_follows_input() {
            let mut gpu = pipeline();
            assert!(!gpu.is_compiled(FilterKind::Blur));
            assert_eq!(gpu.surface_size(), None);

            gpu.box_blur(&gray(8, 4, 50), 4).unwrap();
            assert!(gpu.is_compiled(FilterKind::Blur));
            assert!(!gpu.is_compiled(FilterKind::Levels));
            assert_eq!(gpu.surface_size(), Some((8, 4)));

            gpu.box_blur(&gray(3, 9, 50), 4).unwrap();
            assert_eq!(gpu.surface_size(), Some((3, 9)));
        }

        #[test]
        #[ignore = "needs a GPU adapter"]
        fn test_use_after_release_fails() {
            let mut gpu = pipeline();
            gpu.replace_pattern(&gray(4, 4, 9)).unwrap();
            gpu.release();
            assert!(gpu.is_released());
            assert!(matches!(
                gpu.replace_pattern(&gray(4, 4, 9)),
                Err(FilterError::UseAfterDispose)
            ));
            assert!(matches!(gpu.box_blur(&gray(4, 4, 9), 2), Err(FilterError::UseAfterDispose)));
            // Released state wins over argument validation.
            assert!(matches!(
                gpu.levels(&gray(4, 4, 9), LevelParameters::new(7, 128, 7)),
                Err(FilterError::UseAfterDispose)
            ));
            assert!(matches!(
                gpu.posterize(&gray(4, 4, 9), &[0.0, 1.0]),
                Err(FilterError::UseAfterDispose)
            ));
        }

        #[test]
        #[ignore = "needs a GPU adapter"]
        fn test_oversized_input_is_rejected() {
            let mut gpu = pipeline();
            let wide = RasterBuffer::filled(9000, 2, [10, 10, 10, 255]);
            let err = gpu.replace_pattern(&wide).unwrap_err();
            assert!(matches!(
                err,
                FilterError::TextureTooLarge { width: 9000, height: 2, .. }
            ));
            assert_eq!(gpu.surface_size(), None);
            assert!(gpu.replace_pattern(&gray(4, 4, 9)).is_ok());
        }

        #[test]
        #[ignore = "needs a GPU adapter"]
        fn test_broken_override_reports_compilation_error() {
            let context = GpuContext::shared().expect("GPU adapter required");
            let shaders = ShaderTable::builtin().with_override(FilterKind::Levels, "not wgsl");
            let mut gpu = FilterPipeline::new(context, shaders);
            let err = gpu.levels(&gray(2, 2, 1), LevelParameters::default()).unwrap_err();
            assert!(matches!(err, FilterError::ShaderCompilation { kind: FilterKind::Levels, .. }));
            // Other programs are unaffected.
            assert!(gpu.replace_pattern(&gray(2, 2, 1)).is_ok());
        }
    }
}
