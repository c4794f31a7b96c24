/// GPU filter backend
///
/// Re-implements blur, levels, posterize and pattern as fragment passes
/// over a full-screen triangle, rendering into a texture that is read back
/// into a `RasterBuffer` after every call.
///
/// Architecture:
/// - `context.rs` - wgpu device and queue, shared behind an `Arc`
/// - `shaders.rs` - WGSL sources and the immutable `ShaderTable`
/// - `pipeline.rs` - `FilterPipeline`, the per-instance textures and programs
///
/// The GPU passes intentionally do not match the CPU filters bit for bit;
/// see the tests in `emulation.rs` for where and how they differ.

pub mod context;
pub mod pipeline;
pub mod shaders;

#[cfg(test)]
mod emulation;

pub use context::GpuContext;
pub use pipeline::FilterPipeline;
pub use shaders::{FilterKind, ShaderTable};
