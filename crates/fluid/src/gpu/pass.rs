use wgpu::util::{DeviceExt, TextureDataOrder};

use crate::error::SimulationError;

use super::program::{Program, ProgramLayouts, INPUT_SLOTS};
use super::quad::QuadBuffer;
use super::texture::InputView;
use super::uniforms::{PassUniforms, UniformStage};

/// Shared state needed to record any full-screen pass.
pub(crate) struct PassResources {
    pub layouts: ProgramLayouts,
    uniforms: UniformStage,
    quad: QuadBuffer,
    placeholder_view: wgpu::TextureView,
    placeholder_sampler: wgpu::Sampler,
}

impl PassResources {
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue) -> Result<Self, SimulationError> {
        let layouts = ProgramLayouts::new(device)?;
        let uniforms = UniformStage::new(device, &layouts.uniform_layout);
        let quad = QuadBuffer::new(device);
        let (placeholder_view, placeholder_sampler) = create_placeholder(device, queue);
        Ok(Self {
            layouts,
            uniforms,
            quad,
            placeholder_view,
            placeholder_sampler,
        })
    }

    /// Binds up to [`INPUT_SLOTS`] inputs; unused slots see a 1x1 zero texture.
    pub fn bind_inputs(
        &self,
        device: &wgpu::Device,
        label: &str,
        inputs: &[InputView<'_>],
    ) -> wgpu::BindGroup {
        let placeholder = InputView {
            view: &self.placeholder_view,
            sampler: &self.placeholder_sampler,
        };
        let mut entries = Vec::with_capacity(INPUT_SLOTS * 2);
        for index in 0..INPUT_SLOTS {
            let input = inputs.get(index).copied().unwrap_or(placeholder);
            entries.push(wgpu::BindGroupEntry {
                binding: (index as u32) * 2,
                resource: wgpu::BindingResource::TextureView(input.view),
            });
            entries.push(wgpu::BindGroupEntry {
                binding: (index as u32) * 2 + 1,
                resource: wgpu::BindingResource::Sampler(input.sampler),
            });
        }
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout: &self.layouts.input_layout,
            entries: &entries,
        })
    }

    /// Records one full-screen draw of `program` into `target`.
    pub fn draw(
        &self,
        device: &wgpu::Device,
        encoder: &mut wgpu::CommandEncoder,
        program: &Program,
        uniforms: &PassUniforms,
        inputs: &[InputView<'_>],
        target: &wgpu::TextureView,
    ) {
        self.uniforms.stage(device, encoder, uniforms);
        let input_group = self.bind_inputs(device, program.label(), inputs);

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(program.label()),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                depth_slice: None,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            occlusion_query_set: None,
            timestamp_writes: None,
        });
        pass.set_pipeline(program.pipeline());
        pass.set_bind_group(0, self.uniforms.bind_group(), &[]);
        pass.set_bind_group(1, &input_group, &[]);
        self.quad.draw(&mut pass);
    }
}

/// Recording context for one submission.
pub(crate) struct PassEncoder<'a> {
    pub device: &'a wgpu::Device,
    pub resources: &'a PassResources,
    pub encoder: &'a mut wgpu::CommandEncoder,
}

impl PassEncoder<'_> {
    pub fn draw(
        &mut self,
        program: &Program,
        uniforms: &PassUniforms,
        inputs: &[InputView<'_>],
        target: &wgpu::TextureView,
    ) {
        self.resources
            .draw(self.device, self.encoder, program, uniforms, inputs, target);
    }
}

fn create_placeholder(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
) -> (wgpu::TextureView, wgpu::Sampler) {
    let texture = device.create_texture_with_data(
        queue,
        &wgpu::TextureDescriptor {
            label: Some("placeholder input"),
            size: wgpu::Extent3d {
                width: 1,
                height: 1,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        },
        TextureDataOrder::LayerMajor,
        &[0u8, 0, 0, 0],
    );
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some("placeholder sampler"),
        ..Default::default()
    });
    (view, sampler)
}
