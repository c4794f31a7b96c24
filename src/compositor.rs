/// Finishing stage
///
/// Lightens the posterized image to the four print tones, then swaps flat
/// regions for the halftone pattern.

use std::sync::Arc;

use crate::error::Result;
use crate::filters;
use crate::gpu::{FilterPipeline, GpuContext, ShaderTable};
use crate::raster::{ColorTable, RasterBuffer};

/// CPU finishing pass: `posterize(final_tones)` then `replace_pattern`.
pub fn process_final(image: &RasterBuffer) -> RasterBuffer {
    let mut toned = image.clone();
    filters::posterize(&mut toned, &ColorTable::final_tones());
    filters::replace_pattern(&toned)
}

/// GPU finishing pass, one `FilterPipeline` per stage.
#[derive(Debug)]
pub struct GpuFinalCompositor {
    posterize: FilterPipeline,
    pattern: FilterPipeline,
    tones: Vec<f32>,
}

impl GpuFinalCompositor {
    pub fn new(context: Arc<GpuContext>, shaders: &ShaderTable) -> Self {
        Self {
            posterize: FilterPipeline::new(Arc::clone(&context), shaders.clone()),
            pattern: FilterPipeline::new(context, shaders.clone()),
            tones: ColorTable::final_tones().to_flat_normalized(),
        }
    }

    pub fn process(&mut self, image: &RasterBuffer) -> Result<RasterBuffer> {
        let toned = self.posterize.posterize(image, &self.tones)?;
        self.pattern.replace_pattern(&toned)
    }

    /// Release both stages. Later calls to `process` fail with `UseAfterDispose`.
    pub fn release(&mut self) {
        self.posterize.release();
        self.pattern.release();
    }

    pub fn is_released(&self) -> bool {
        self.posterize.is_released() && self.pattern.is_released()
    }
}
