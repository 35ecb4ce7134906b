use anyhow::Context as _;

use crate::data_structures::texture;

/// GPU device, queue and the formats every pipeline renders into.
///
/// Engines that already own a window surface build it with [`Context::new`];
/// tools and tests without a window use [`Context::new_headless`].
#[derive(Debug)]
pub struct Context {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub color_format: wgpu::TextureFormat,
    pub depth_format: Option<wgpu::TextureFormat>,
}

impl Context {
    pub fn new(
        device: wgpu::Device,
        queue: wgpu::Queue,
        color_format: wgpu::TextureFormat,
        depth_format: Option<wgpu::TextureFormat>,
    ) -> Self {
        Self {
            device,
            queue,
            color_format,
            depth_format,
        }
    }

    /// Request an adapter and device that are not tied to any surface.
    ///
    /// Renders into `color_format` with a depth attachment of
    /// [`texture::Texture::DEPTH_FORMAT`].
    pub async fn new_headless(color_format: wgpu::TextureFormat) -> anyhow::Result<Self> {
        log::debug!("WGPU headless setup");
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..wgpu::InstanceDescriptor::new_without_display_handle()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .context("no suitable GPU adapter found")?;
        log::debug!("adapter: {:?}", adapter.get_info());

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("flow-water device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::downlevel_defaults(),
                memory_hints: Default::default(),
                trace: wgpu::Trace::Off,
                ..Default::default()
            })
            .await
            .context("failed to create GPU device")?;

        Ok(Self::new(
            device,
            queue,
            color_format,
            Some(texture::Texture::DEPTH_FORMAT),
        ))
    }
}
