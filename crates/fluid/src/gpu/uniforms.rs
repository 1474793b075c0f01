use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

/// Mirrors the `PassParams` std140 block declared in every pass header.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub(crate) struct PassUniforms {
    /// width, height, cell size, aspect
    pub grid: [f32; 4],
    /// dt, dissipation, secondary dissipation, ambient temperature
    pub solver: [f32; 4],
    /// sigma, kappa, radius, strength
    pub forces: [f32; 4],
    /// position xy, previous position xy
    pub source: [f32; 4],
    /// vx, vy, temperature, drag scale
    pub impulse: [f32; 4],
    /// mode selector, option, unused, unused
    pub flags: [i32; 4],
}

impl PassUniforms {
    pub fn for_grid(width: u32, height: u32, cell_size: f32) -> Self {
        let width = width.max(1) as f32;
        let height = height.max(1) as f32;
        Self {
            grid: [width, height, cell_size, width / height],
            ..Self::default()
        }
    }
}

/// Single uniform buffer whose contents are replaced per pass by an encoder copy.
pub(crate) struct UniformStage {
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

impl UniformStage {
    pub fn new(device: &wgpu::Device, layout: &wgpu::BindGroupLayout) -> Self {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("pass uniforms"),
            size: std::mem::size_of::<PassUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("pass uniform bind group"),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
        });
        Self { buffer, bind_group }
    }

    pub fn bind_group(&self) -> &wgpu::BindGroup {
        &self.bind_group
    }

    /// Records a copy of `uniforms` ahead of the next pass so passes in the same
    /// submission each observe their own values.
    pub fn stage(
        &self,
        device: &wgpu::Device,
        encoder: &mut wgpu::CommandEncoder,
        uniforms: &PassUniforms,
    ) {
        let staging = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("uniform staging"),
            contents: bytemuck::bytes_of(uniforms),
            usage: wgpu::BufferUsages::COPY_SRC,
        });
        encoder.copy_buffer_to_buffer(
            &staging,
            0,
            &self.buffer,
            0,
            std::mem::size_of::<PassUniforms>() as u64,
        );
    }
}
