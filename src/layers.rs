/// Layer pipeline
///
/// Runs the full stencil chain on a prepared source and keeps every
/// intermediate so a viewer can show any of them:
///
/// original -> grayscale -> blur -> levels -> posterize (3 tones) -> final
///
/// Grayscale always runs on the CPU. The remaining stages run on the
/// backend chosen when the pipeline is built.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::compositor::{self, GpuFinalCompositor};
use crate::error::{FilterError, Result};
use crate::filters;
use crate::gpu::{FilterPipeline, GpuContext, ShaderTable};
use crate::raster::{ColorTable, RasterBuffer};
use crate::settings::{BackendKind, StencilSettings};

/// Black, mid gray and white as the GPU posterize pass takes them
const THREE_TONES_NORMALIZED: [f32; 9] = [0.0, 0.0, 0.0, 0.5, 0.5, 0.5, 1.0, 1.0, 1.0];

/// One viewable stage of the chain
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Layer {
    Original,
    Grayscale,
    Blur,
    Levels,
    Posterize,
    #[default]
    Final,
}

impl Layer {
    pub const ALL: [Layer; 6] = [
        Layer::Original,
        Layer::Grayscale,
        Layer::Blur,
        Layer::Levels,
        Layer::Posterize,
        Layer::Final,
    ];
}

/// GPU state for every GPU stage of the chain
#[derive(Debug)]
pub struct GpuLayers {
    blur: FilterPipeline,
    levels: FilterPipeline,
    posterize: FilterPipeline,
    final_pass: GpuFinalCompositor,
}

impl GpuLayers {
    pub fn new(context: Arc<GpuContext>, shaders: &ShaderTable) -> Self {
        Self {
            blur: FilterPipeline::new(Arc::clone(&context), shaders.clone()),
            levels: FilterPipeline::new(Arc::clone(&context), shaders.clone()),
            posterize: FilterPipeline::new(Arc::clone(&context), shaders.clone()),
            final_pass: GpuFinalCompositor::new(context, shaders),
        }
    }

    pub fn release(&mut self) {
        self.blur.release();
        self.levels.release();
        self.posterize.release();
        self.final_pass.release();
    }
}

/// Where the blur, levels, posterize and final stages run
#[derive(Debug)]
pub enum FilterBackend {
    Cpu,
    Gpu(GpuLayers),
    /// GPU was requested but no rendering context exists; every GPU stage
    /// yields a blank buffer of the input size.
    Headless,
}

impl FilterBackend {
    /// Build the backend for `kind`. A missing adapter downgrades to
    /// `Headless`; any other device failure is returned.
    pub fn for_kind(kind: BackendKind) -> Result<Self> {
        match kind {
            BackendKind::Cpu => Ok(FilterBackend::Cpu),
            BackendKind::Gpu => match GpuContext::shared() {
                Ok(context) => Ok(FilterBackend::Gpu(GpuLayers::new(context, &ShaderTable::builtin()))),
                Err(FilterError::MissingRenderingContext) => {
                    tracing::warn!("no GPU adapter available, GPU layers will be blank");
                    Ok(FilterBackend::Headless)
                }
                Err(err) => Err(err),
            },
        }
    }
}

/// Every layer produced by one run
#[derive(Debug, Clone, PartialEq)]
pub struct LayerStack {
    pub original: RasterBuffer,
    pub grayscale: RasterBuffer,
    pub blur: RasterBuffer,
    pub levels: RasterBuffer,
    pub posterize: RasterBuffer,
    pub final_image: RasterBuffer,
}

impl LayerStack {
    pub fn get(&self, layer: Layer) -> &RasterBuffer {
        match layer {
            Layer::Original => &self.original,
            Layer::Grayscale => &self.grayscale,
            Layer::Blur => &self.blur,
            Layer::Levels => &self.levels,
            Layer::Posterize => &self.posterize,
            Layer::Final => &self.final_image,
        }
    }

    pub fn into_layer(self, layer: Layer) -> RasterBuffer {
        match layer {
            Layer::Original => self.original,
            Layer::Grayscale => self.grayscale,
            Layer::Blur => self.blur,
            Layer::Levels => self.levels,
            Layer::Posterize => self.posterize,
            Layer::Final => self.final_image,
        }
    }
}

#[derive(Debug)]
pub struct LayerPipeline {
    backend: FilterBackend,
}

impl LayerPipeline {
    pub fn new(kind: BackendKind) -> Result<Self> {
        Ok(Self::with_backend(FilterBackend::for_kind(kind)?))
    }

    pub fn with_backend(backend: FilterBackend) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &FilterBackend {
        &self.backend
    }

    /// Run the whole chain on `source`.
    ///
    /// Settings are validated first, so a degenerate level range fails
    /// before any stage runs.
    pub fn run(&mut self, source: &RasterBuffer, settings: &StencilSettings) -> Result<LayerStack> {
        settings.validate()?;

        let size = settings.box_blur_size();
        let levels = settings.level_parameters();

        let mut grayscale = source.clone();
        filters::grayscale(&mut grayscale);

        let (blur, levelled, posterized, final_image) = match &mut self.backend {
            FilterBackend::Cpu => {
                let blur = filters::box_blur(&grayscale, size);

                let mut levelled = blur.clone();
                filters::apply_levels(&mut levelled, levels)?;

                let mut posterized = levelled.clone();
                filters::posterize(&mut posterized, &ColorTable::three_tones());

                let final_image = compositor::process_final(&posterized);
                (blur, levelled, posterized, final_image)
            }
            FilterBackend::Gpu(layers) => {
                let blur = layers.blur.box_blur(&grayscale, size)?;
                let levelled = layers.levels.levels(&blur, levels)?;
                let posterized = layers.posterize.posterize(&levelled, &THREE_TONES_NORMALIZED)?;
                let final_image = layers.final_pass.process(&posterized)?;
                (blur, levelled, posterized, final_image)
            }
            FilterBackend::Headless => {
                let blank = grayscale.blank_like();
                (blank.clone(), blank.clone(), blank.clone(), blank)
            }
        };

        tracing::debug!(
            width = source.width(),
            height = source.height(),
            blur_size = size,
            "ran layer pipeline"
        );

        Ok(LayerStack {
            original: source.clone(),
            grayscale,
            blur,
            levels: levelled,
            posterize: posterized,
            final_image,
        })
    }

    /// Release GPU resources. A released GPU pipeline fails every later run
    /// with `UseAfterDispose`; CPU and headless pipelines are unaffected.
    pub fn release(&mut self) {
        if let FilterBackend::Gpu(layers) = &mut self.backend {
            layers.release();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> StencilSettings {
        StencilSettings {
            level_range: [0, 128, 255],
            blur_strength: 0.0,
            backend: BackendKind::Cpu,
            ..StencilSettings::default()
        }
    }

    #[test]
    fn test_cpu_stack_has_every_layer() {
        let source = RasterBuffer::filled(8, 6, [200, 40, 40, 255]);
        let stack = LayerPipeline::with_backend(FilterBackend::Cpu)
            .run(&source, &settings())
            .unwrap();

        for layer in Layer::ALL {
            assert_eq!(stack.get(layer).dimensions(), (8, 6), "{layer:?}");
        }
        assert_eq!(stack.get(Layer::Original), &source);
        let [r, g, b, _] = stack.get(Layer::Grayscale).pixel(3, 3);
        assert!(r == g && g == b);
    }

    #[test]
    fn test_headless_layers_are_blank() {
        let source = RasterBuffer::filled(5, 4, [90, 90, 90, 255]);
        let stack = LayerPipeline::with_backend(FilterBackend::Headless)
            .run(&source, &settings())
            .unwrap();

        assert_eq!(stack.get(Layer::Grayscale), &source);
        for layer in [Layer::Blur, Layer::Levels, Layer::Posterize, Layer::Final] {
            assert_eq!(stack.get(layer), &RasterBuffer::new(5, 4));
        }
    }

    #[test]
    fn test_invalid_settings_fail_before_running() {
        let mut bad = settings();
        bad.level_range = [40, 128, 40];
        let err = LayerPipeline::with_backend(FilterBackend::Cpu)
            .run(&RasterBuffer::new(2, 2), &bad)
            .unwrap_err();
        assert!(matches!(err, FilterError::DegenerateRange { low: 40, high: 40 }));
    }

    #[test]
    fn test_into_layer() {
        let source = RasterBuffer::filled(2, 2, [1, 2, 3, 4]);
        let stack = LayerPipeline::with_backend(FilterBackend::Cpu)
            .run(&source, &settings())
            .unwrap();
        let posterize = stack.get(Layer::Posterize).clone();
        assert_eq!(stack.into_layer(Layer::Posterize), posterize);
    }
}
