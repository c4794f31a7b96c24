/// Error type shared by the CPU filters, the GPU backend and the settings layer.

use iced_wgpu::wgpu;
use thiserror::Error;

use crate::gpu::shaders::FilterKind;

/// Everything that can go wrong while preparing a stencil.
#[derive(Debug, Error)]
pub enum FilterError {
    /// Flat GPU color list whose length is not a multiple of 3,
    /// or whose row count is outside what the shader can hold.
    #[error("invalid color table: {len} channel values (expected a multiple of 3, 2..=16 rows)")]
    InvalidColorTable { len: usize },

    /// A posterize table needs at least two rows to compute a bucket width.
    #[error("color table needs at least 2 rows, got {rows}")]
    ColorTableTooShort { rows: usize },

    /// `high == low` in level parameters (the rescale would divide by zero).
    #[error("degenerate level range: low {low} == high {high}")]
    DegenerateRange { low: u8, high: u8 },

    #[error("pixel buffer holds {actual} bytes, {width}x{height} RGBA needs {expected}")]
    BufferSizeMismatch {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },

    #[error("kernel {width}x{height} needs {expected} weights, got {actual}")]
    KernelSizeMismatch {
        width: usize,
        height: usize,
        expected: usize,
        actual: usize,
    },

    /// No adapter could give us a surface to render into.
    #[error("no rendering context available")]
    MissingRenderingContext,

    /// A GPU filter state was used after `release()`.
    #[error("GPU filter state used after its resources were released")]
    UseAfterDispose,

    /// Input larger than the device's 2D texture limit.
    #[error("{width}x{height} image exceeds the GPU texture limit of {max}")]
    TextureTooLarge { width: u32, height: u32, max: u32 },

    #[error("shader table has no program for {0:?}")]
    MissingShader(FilterKind),

    /// wgpu rejected a fragment stage (WGSL parse or validation error).
    #[error("{kind:?} shader failed to compile: {message}")]
    ShaderCompilation { kind: FilterKind, message: String },

    #[error("failed to create GPU device: {0}")]
    DeviceRequest(#[from] wgpu::RequestDeviceError),

    #[error("failed to read the rendered surface back: {0}")]
    Readback(String),

    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    #[error("settings JSON: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, FilterError>;
