use anyhow::{anyhow, Context, Result};
use half::f16;

use crate::error::SimulationError;

/// Storage precision of a texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TexelFormat {
    Float32,
    Float16,
    Unorm8,
}

impl TexelFormat {
    pub fn to_wgpu(self) -> wgpu::TextureFormat {
        match self {
            TexelFormat::Float32 => wgpu::TextureFormat::Rgba32Float,
            TexelFormat::Float16 => wgpu::TextureFormat::Rgba16Float,
            TexelFormat::Unorm8 => wgpu::TextureFormat::Rgba8Unorm,
        }
    }

    pub fn bytes_per_texel(self) -> u32 {
        match self {
            TexelFormat::Float32 => 16,
            TexelFormat::Float16 => 8,
            TexelFormat::Unorm8 => 4,
        }
    }

    fn encode(self, texels: &[[f32; 4]]) -> Vec<u8> {
        match self {
            TexelFormat::Float32 => bytemuck::cast_slice(texels).to_vec(),
            TexelFormat::Float16 => texels
                .iter()
                .flat_map(|texel| texel.iter().map(|&value| f16::from_f32(value)))
                .flat_map(|value| value.to_le_bytes())
                .collect(),
            TexelFormat::Unorm8 => texels
                .iter()
                .flat_map(|texel| {
                    texel
                        .iter()
                        .map(|&value| (value.clamp(0.0, 1.0) * 255.0).round() as u8)
                })
                .collect(),
        }
    }

    fn decode(self, row: &[u8], out: &mut Vec<[f32; 4]>) {
        match self {
            TexelFormat::Float32 => {
                for chunk in row.chunks_exact(16) {
                    let mut texel = [0.0f32; 4];
                    for (slot, bytes) in texel.iter_mut().zip(chunk.chunks_exact(4)) {
                        *slot = f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
                    }
                    out.push(texel);
                }
            }
            TexelFormat::Float16 => {
                for chunk in row.chunks_exact(8) {
                    let mut texel = [0.0f32; 4];
                    for (slot, bytes) in texel.iter_mut().zip(chunk.chunks_exact(2)) {
                        *slot = f16::from_le_bytes([bytes[0], bytes[1]]).to_f32();
                    }
                    out.push(texel);
                }
            }
            TexelFormat::Unorm8 => {
                for chunk in row.chunks_exact(4) {
                    out.push([
                        chunk[0] as f32 / 255.0,
                        chunk[1] as f32 / 255.0,
                        chunk[2] as f32 / 255.0,
                        chunk[3] as f32 / 255.0,
                    ]);
                }
            }
        }
    }
}

/// Sampling and storage parameters for a [`FieldTexture`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextureSpec {
    pub min_filter: wgpu::FilterMode,
    pub mag_filter: wgpu::FilterMode,
    pub wrap_u: wgpu::AddressMode,
    pub wrap_v: wgpu::AddressMode,
    pub format: TexelFormat,
}

impl TextureSpec {
    /// Clamped, nearest-filtered float field.
    pub fn field(format: TexelFormat) -> Self {
        Self {
            min_filter: wgpu::FilterMode::Nearest,
            mag_filter: wgpu::FilterMode::Nearest,
            wrap_u: wgpu::AddressMode::ClampToEdge,
            wrap_v: wgpu::AddressMode::ClampToEdge,
            format,
        }
    }

    pub fn linear(format: TexelFormat) -> Self {
        Self {
            min_filter: wgpu::FilterMode::Linear,
            mag_filter: wgpu::FilterMode::Linear,
            ..Self::field(format)
        }
    }
}

/// A 2D texture with its default view and sampler.
pub struct FieldTexture {
    label: String,
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    sampler: wgpu::Sampler,
    width: u32,
    height: u32,
    format: TexelFormat,
}

impl FieldTexture {
    pub fn new(
        device: &wgpu::Device,
        label: &str,
        width: u32,
        height: u32,
        spec: &TextureSpec,
    ) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: spec.format.to_wgpu(),
            usage: wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::COPY_SRC
                | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(label),
            address_mode_u: spec.wrap_u,
            address_mode_v: spec.wrap_v,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: spec.mag_filter,
            min_filter: spec.min_filter,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        Self {
            label: label.to_string(),
            texture,
            view,
            sampler,
            width: width.max(1),
            height: height.max(1),
            format: spec.format,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> TexelFormat {
        self.format
    }

    pub fn texel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    pub(crate) fn input(&self) -> InputView<'_> {
        InputView {
            view: &self.view,
            sampler: &self.sampler,
        }
    }

    /// Replaces the whole texture with `texels`, row 0 first.
    pub fn upload(&self, queue: &wgpu::Queue, texels: &[[f32; 4]]) -> Result<(), SimulationError> {
        if texels.len() != self.texel_count() {
            return Err(SimulationError::SizeMismatch {
                label: self.label.clone(),
                expected: self.texel_count(),
                actual: texels.len(),
            });
        }
        self.write_bytes(queue, &self.format.encode(texels));
        Ok(())
    }

    /// Replaces the whole texture with raw bytes in the texture's own format.
    pub fn upload_bytes(&self, queue: &wgpu::Queue, bytes: &[u8]) -> Result<(), SimulationError> {
        let stride = self.format.bytes_per_texel() as usize;
        if bytes.len() != self.texel_count() * stride {
            return Err(SimulationError::SizeMismatch {
                label: self.label.clone(),
                expected: self.texel_count(),
                actual: bytes.len() / stride,
            });
        }
        self.write_bytes(queue, bytes);
        Ok(())
    }

    fn write_bytes(&self, queue: &wgpu::Queue, bytes: &[u8]) {
        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &self.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            bytes,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(self.width * self.format.bytes_per_texel()),
                rows_per_image: Some(self.height),
            },
            wgpu::Extent3d {
                width: self.width,
                height: self.height,
                depth_or_array_layers: 1,
            },
        );
    }

    /// Copies the texture back to the host, blocking until the GPU is done.
    pub fn read(&self, device: &wgpu::Device, queue: &wgpu::Queue) -> Result<Vec<[f32; 4]>> {
        let unpadded = self.width * self.format.bytes_per_texel();
        let padded = padded_bytes_per_row(unpadded);
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("texture readback"),
            size: u64::from(padded) * u64::from(self.height),
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("readback encoder"),
        });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &self.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded),
                    rows_per_image: Some(self.height),
                },
            },
            wgpu::Extent3d {
                width: self.width,
                height: self.height,
                depth_or_array_layers: 1,
            },
        );
        queue.submit(std::iter::once(encoder.finish()));

        let slice = buffer.slice(..);
        let (sender, receiver) = crossbeam_channel::bounded(1);
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = sender.send(result);
        });
        device
            .poll(wgpu::PollType::Wait)
            .map_err(|err| anyhow!("device poll failed: {err}"))?;
        receiver
            .recv()
            .context("readback callback dropped")?
            .with_context(|| format!("failed to map readback of {}", self.label))?;

        let mut texels = Vec::with_capacity(self.texel_count());
        {
            let data = slice.get_mapped_range();
            for row in data.chunks_exact(padded as usize) {
                self.format.decode(&row[..unpadded as usize], &mut texels);
            }
        }
        buffer.unmap();
        Ok(texels)
    }
}

/// Borrowed view and sampler bound into one input slot.
#[derive(Clone, Copy)]
pub(crate) struct InputView<'a> {
    pub view: &'a wgpu::TextureView,
    pub sampler: &'a wgpu::Sampler,
}

pub(crate) fn padded_bytes_per_row(unpadded: u32) -> u32 {
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    unpadded.div_ceil(align) * align
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_pad_to_copy_alignment() {
        assert_eq!(padded_bytes_per_row(256), 256);
        assert_eq!(padded_bytes_per_row(64 * 16), 1024);
        assert_eq!(padded_bytes_per_row(3 * 16), 256);
        assert_eq!(padded_bytes_per_row(257), 512);
    }

    #[test]
    fn half_float_encoding_decodes_back() {
        let texels = [[0.5, -1.0, 2.0, 0.0]];
        let bytes = TexelFormat::Float16.encode(&texels);
        assert_eq!(bytes.len(), 8);
        let mut decoded = Vec::new();
        TexelFormat::Float16.decode(&bytes, &mut decoded);
        assert_eq!(decoded, vec![[0.5, -1.0, 2.0, 0.0]]);
    }

    #[test]
    fn unorm_encoding_clamps() {
        let bytes = TexelFormat::Unorm8.encode(&[[1.5, -0.5, 1.0, 0.0]]);
        assert_eq!(bytes, vec![255, 0, 255, 0]);
    }
}
