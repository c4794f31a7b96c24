/// Shared wgpu device and queue
///
/// Creating a device is the expensive part of GPU setup, so one `GpuContext`
/// is built per process (or per test) and handed to every `FilterPipeline`
/// behind an `Arc`. Each pipeline still owns its own textures and programs.

use std::sync::Arc;

// Use wgpu from iced to stay on the same wgpu version
use iced_wgpu::wgpu;

use crate::error::{FilterError, Result};

pub struct GpuContext {
    device: wgpu::Device,
    queue: wgpu::Queue,
    adapter_info: wgpu::AdapterInfo,
}

// Manual Debug implementation (wgpu device and queue are opaque)
impl std::fmt::Debug for GpuContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GpuContext")
            .field("adapter", &self.adapter_info.name)
            .field("backend", &self.adapter_info.backend)
            .finish_non_exhaustive()
    }
}

impl GpuContext {
    /// Blocking device creation.
    ///
    /// Fails with `MissingRenderingContext` when no adapter is available
    /// (headless CI, no drivers).
    pub fn new() -> Result<Self> {
        pollster::block_on(Self::request())
    }

    /// `new()` wrapped for sharing between pipelines
    pub fn shared() -> Result<Arc<Self>> {
        Self::new().map(Arc::new)
    }

    async fn request() -> Result<Self> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .ok_or(FilterError::MissingRenderingContext)?;

        let adapter_info = adapter.get_info();

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Stencil Filter Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                },
                None,
            )
            .await?;

        tracing::info!(
            adapter = %adapter_info.name,
            backend = ?adapter_info.backend,
            "GPU context created"
        );

        Ok(Self {
            device,
            queue,
            adapter_info,
        })
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub fn adapter_info(&self) -> &wgpu::AdapterInfo {
        &self.adapter_info
    }
}
