// tests/test_gpu.rs - Integration tests for the GPU backend.
//
// These need a real adapter and are ignored by default:
//
//     cargo test -- --include-ignored
//
// Output is compared loosely here (shape, tone set, lifecycle). The
// texel-level comparison against the shader models lives next to the
// pipeline in src/gpu/emulation.rs.

use std::sync::Arc;

use pumpkin_stencil::{
    BackendKind, ColorTable, FilterBackend, FilterError, FilterPipeline, GpuContext,
    GpuFinalCompositor, Layer, LayerPipeline, LevelParameters, RasterBuffer, ShaderTable,
    StencilSettings,
};

fn context() -> Arc<GpuContext> {
    GpuContext::shared().expect("GPU adapter required")
}

fn striped(width: u32, height: u32) -> RasterBuffer {
    let mut image = RasterBuffer::new(width, height);
    for y in 0..height {
        for x in 0..width {
            let v = ((x / 4 + y / 3) * 37 % 256) as u8;
            image.set_pixel(x, y, [v, v, v, 255]);
        }
    }
    image
}

#[test]
#[ignore = "needs a GPU adapter"]
fn gpu_posterize_rejects_ragged_color_list() {
    let mut pipeline = FilterPipeline::new(context(), ShaderTable::builtin());
    let err = pipeline.posterize(&striped(4, 4), &[0.0, 1.0, 0.5, 0.25]).unwrap_err();
    assert!(matches!(err, FilterError::InvalidColorTable { len: 4 }));
}

#[test]
#[ignore = "needs a GPU adapter"]
fn gpu_levels_rejects_degenerate_range() {
    let mut pipeline = FilterPipeline::new(context(), ShaderTable::builtin());
    let err = pipeline.levels(&striped(4, 4), LevelParameters::new(7, 128, 7)).unwrap_err();
    assert!(matches!(err, FilterError::DegenerateRange { .. }));
}

#[test]
#[ignore = "needs a GPU adapter"]
fn gpu_posterize_outputs_table_rows() {
    let mut pipeline = FilterPipeline::new(context(), ShaderTable::builtin());
    let table = ColorTable::three_tones().to_flat_normalized();
    let output = pipeline.posterize(&striped(17, 9), &table).unwrap();
    for pixel in output.pixels().chunks_exact(4) {
        assert!([0, 127, 255].contains(&pixel[0]), "{pixel:?}");
        assert_eq!(pixel[3], 255);
    }
}

#[test]
#[ignore = "needs a GPU adapter"]
fn gpu_compositor_release_is_final() {
    let mut compositor = GpuFinalCompositor::new(context(), &ShaderTable::builtin());
    let output = compositor.process(&striped(12, 12)).unwrap();
    assert_eq!(output.dimensions(), (12, 12));

    compositor.release();
    assert!(compositor.is_released());
    assert!(matches!(
        compositor.process(&striped(12, 12)),
        Err(FilterError::UseAfterDispose)
    ));
}

#[test]
#[ignore = "needs a GPU adapter"]
fn gpu_layer_pipeline_runs_every_stage() {
    let settings = StencilSettings {
        backend: BackendKind::Gpu,
        ..StencilSettings::default()
    };
    let mut pipeline = LayerPipeline::new(settings.backend).unwrap();
    assert!(matches!(pipeline.backend(), FilterBackend::Gpu(_)));

    let source = striped(30, 20);
    let stack = pipeline.run(&source, &settings).unwrap();
    for layer in Layer::ALL {
        assert_eq!(stack.get(layer).dimensions(), (30, 20), "{layer:?}");
    }

    pipeline.release();
    assert!(matches!(
        pipeline.run(&source, &settings),
        Err(FilterError::UseAfterDispose)
    ));
}

#[test]
#[ignore = "needs a GPU adapter"]
fn gpu_compositor_reports_oversized_input() {
    let mut compositor = GpuFinalCompositor::new(context(), &ShaderTable::builtin());
    let tall = RasterBuffer::filled(2, 9000, [90, 90, 90, 255]);
    assert!(matches!(
        compositor.process(&tall),
        Err(FilterError::TextureTooLarge { width: 2, height: 9000, .. })
    ));
}
