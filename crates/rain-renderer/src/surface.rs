// ABOUTME: Window presenter: uploads composited frames to a texture and draws them to the surface.
// ABOUTME: Maps wgpu surface errors onto transient or resource frame failures.

use std::sync::Arc;

use winit::window::Window;

use crate::frame::Frame;
use crate::gpu::{GpuError, GpuState};
use crate::present::{FrameError, Presenter};

struct FrameTexture {
    texture: wgpu::Texture,
    bind_group: wgpu::BindGroup,
    size: (u32, u32),
}

pub struct SurfacePresenter {
    gpu: Option<GpuState>,
    pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    texture_format: wgpu::TextureFormat,
    frame_texture: Option<FrameTexture>,
}

impl SurfacePresenter {
    pub async fn new(window: Arc<Window>) -> Result<Self, GpuError> {
        let gpu = GpuState::new(window).await?;
        let device = &gpu.device;

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Present Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../../../shaders/present.wgsl").into()),
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Present Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Present Bind Group Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Present Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Present Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: gpu.config.format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        // Frame bytes are display-encoded; match the surface so no double conversion happens
        let texture_format = if gpu.config.format.is_srgb() {
            wgpu::TextureFormat::Rgba8UnormSrgb
        } else {
            wgpu::TextureFormat::Rgba8Unorm
        };

        Ok(Self {
            gpu: Some(gpu),
            pipeline,
            bind_group_layout,
            sampler,
            texture_format,
            frame_texture: None,
        })
    }

    fn create_frame_texture(&self, gpu: &GpuState, width: u32, height: u32) -> FrameTexture {
        let texture = gpu.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Rain Frame Texture"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: self.texture_format,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let bind_group = gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Present Bind Group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
        });
        tracing::debug!("Allocated {}x{} frame texture", width, height);
        FrameTexture {
            texture,
            bind_group,
            size: (width, height),
        }
    }
}

fn disposed() -> FrameError {
    FrameError::Resource("surface presenter was disposed".to_string())
}

fn map_surface_error(e: wgpu::SurfaceError) -> FrameError {
    match e {
        wgpu::SurfaceError::OutOfMemory => FrameError::Resource(e.to_string()),
        other => FrameError::Transient(other.to_string()),
    }
}

impl Presenter for SurfacePresenter {
    fn present(&mut self, frame: &Frame) -> Result<(), FrameError> {
        let gpu = self.gpu.as_ref().ok_or_else(disposed)?;
        let (width, height) = (frame.width(), frame.height());

        if self
            .frame_texture
            .as_ref()
            .map_or(true, |t| t.size != (width, height))
        {
            let texture = self.create_frame_texture(gpu, width, height);
            self.frame_texture = Some(texture);
        }
        let texture = self.frame_texture.as_ref().ok_or_else(disposed)?;

        gpu.queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &texture.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &frame.to_rgba8(),
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(4 * width),
                rows_per_image: Some(height),
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );

        let output = gpu.surface.get_current_texture().map_err(map_surface_error)?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Present Encoder"),
            });
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Present Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            render_pass.set_pipeline(&self.pipeline);
            render_pass.set_bind_group(0, &texture.bind_group, &[]);
            render_pass.draw(0..3, 0..1);
        }

        gpu.queue.submit(std::iter::once(encoder.finish()));
        output.present();
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) {
        if let Some(gpu) = self.gpu.as_mut() {
            gpu.resize(width, height);
        }
    }

    fn rebuild(&mut self) -> Result<(), FrameError> {
        let gpu = self.gpu.as_ref().ok_or_else(disposed)?;
        gpu.reconfigure();
        self.frame_texture = None;
        tracing::info!("Surface reconfigured");
        Ok(())
    }

    fn dispose(&mut self) {
        self.frame_texture = None;
        if self.gpu.take().is_some() {
            tracing::info!("Surface presenter released");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn surface_errors_are_classified() {
        assert!(matches!(
            map_surface_error(wgpu::SurfaceError::Lost),
            FrameError::Transient(_)
        ));
        assert!(matches!(
            map_surface_error(wgpu::SurfaceError::Outdated),
            FrameError::Transient(_)
        ));
        assert!(matches!(
            map_surface_error(wgpu::SurfaceError::Timeout),
            FrameError::Transient(_)
        ));
        assert!(matches!(
            map_surface_error(wgpu::SurfaceError::OutOfMemory),
            FrameError::Resource(_)
        ));
    }
}
