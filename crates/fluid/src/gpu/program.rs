use std::borrow::Cow;

use wgpu::naga::ShaderStage;

use crate::error::SimulationError;

use super::quad::QuadBuffer;

/// Texture/sampler pairs available to every pass.
pub(crate) const INPUT_SLOTS: usize = 4;

/// GLSL prologue prepended to every full-screen fragment pass.
///
/// The uniform block layout must match [`super::uniforms::PassUniforms`]. Inputs
/// are exposed both as raw bindings and as `INPUTn` combined samplers so passes
/// can `texelFetch` exact cells or `texture` with the slot's filtering.
pub(crate) const PASS_HEADER: &str = r"#version 450
layout(location = 0) in vec2 v_uv;
layout(location = 0) out vec4 out_value;

layout(std140, set = 0, binding = 0) uniform PassParams {
    vec4 grid;
    vec4 solver;
    vec4 forces;
    vec4 source;
    vec4 impulse;
    ivec4 flags;
} params;

layout(set = 1, binding = 0) uniform texture2D u_input0;
layout(set = 1, binding = 1) uniform sampler u_sampler0;
layout(set = 1, binding = 2) uniform texture2D u_input1;
layout(set = 1, binding = 3) uniform sampler u_sampler1;
layout(set = 1, binding = 4) uniform texture2D u_input2;
layout(set = 1, binding = 5) uniform sampler u_sampler2;
layout(set = 1, binding = 6) uniform texture2D u_input3;
layout(set = 1, binding = 7) uniform sampler u_sampler3;

#define INPUT0 sampler2D(u_input0, u_sampler0)
#define INPUT1 sampler2D(u_input1, u_sampler1)
#define INPUT2 sampler2D(u_input2, u_sampler2)
#define INPUT3 sampler2D(u_input3, u_sampler3)

ivec2 grid_size() {
    return ivec2(params.grid.xy);
}

ivec2 current_cell() {
    return ivec2(gl_FragCoord.xy);
}

ivec2 clamp_cell(ivec2 cell) {
    return clamp(cell, ivec2(0), grid_size() - ivec2(1));
}

vec4 fetch0(ivec2 cell) { return texelFetch(INPUT0, clamp_cell(cell), 0); }
vec4 fetch1(ivec2 cell) { return texelFetch(INPUT1, clamp_cell(cell), 0); }
vec4 fetch2(ivec2 cell) { return texelFetch(INPUT2, clamp_cell(cell), 0); }
vec4 fetch3(ivec2 cell) { return texelFetch(INPUT3, clamp_cell(cell), 0); }

// Row 0 is the top of the grid; normalized space has y up.
vec2 cell_to_normalized(ivec2 cell) {
    vec2 size = params.grid.xy;
    vec2 centre = vec2(cell) + vec2(0.5);
    return vec2(centre.x / size.x * 2.0 - 1.0, 1.0 - centre.y / size.y * 2.0);
}
";

const QUAD_VERTEX_GLSL: &str = r"#version 450
layout(location = 0) in vec2 a_position;
layout(location = 1) in vec2 a_uv;
layout(location = 0) out vec2 v_uv;

void main() {
    v_uv = a_uv;
    gl_Position = vec4(a_position, 0.0, 1.0);
}
";

/// Joins a pass body with [`PASS_HEADER`], dropping any `#version` line the body carries.
pub(crate) fn wrap_pass_fragment(body: &str) -> String {
    let mut wrapped = String::with_capacity(PASS_HEADER.len() + body.len() + 16);
    wrapped.push_str(PASS_HEADER);
    wrapped.push('\n');
    for line in body.lines() {
        if line.trim_start().starts_with("#version") {
            continue;
        }
        wrapped.push_str(line);
        wrapped.push('\n');
    }
    wrapped
}

/// Compiles GLSL inside a validation scope so naga errors surface as values.
pub(crate) fn compile_module(
    device: &wgpu::Device,
    label: &str,
    source: &str,
    stage: ShaderStage,
) -> Result<wgpu::ShaderModule, SimulationError> {
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Glsl {
            shader: Cow::Owned(source.to_string()),
            stage,
            defines: &[],
        },
    });
    match pollster::block_on(device.pop_error_scope()) {
        Some(err) => Err(SimulationError::CompileFailure {
            label: label.to_string(),
            message: err.to_string(),
        }),
        None => Ok(module),
    }
}

/// Bind group layouts and the vertex stage shared by every full-screen program.
pub(crate) struct ProgramLayouts {
    pub uniform_layout: wgpu::BindGroupLayout,
    pub input_layout: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,
    vertex_module: wgpu::ShaderModule,
}

impl ProgramLayouts {
    pub fn new(device: &wgpu::Device) -> Result<Self, SimulationError> {
        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("pass uniform layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });
        let input_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("pass input layout"),
            entries: &build_input_layout_entries(),
        });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("pass pipeline layout"),
            bind_group_layouts: &[&uniform_layout, &input_layout],
            push_constant_ranges: &[],
        });
        let vertex_module =
            compile_module(device, "quad vertex", QUAD_VERTEX_GLSL, ShaderStage::Vertex)?;

        Ok(Self {
            uniform_layout,
            input_layout,
            pipeline_layout,
            vertex_module,
        })
    }
}

/// A compiled full-screen pass writing one render target format.
pub(crate) struct Program {
    label: String,
    pipeline: wgpu::RenderPipeline,
}

impl Program {
    pub fn compile(
        device: &wgpu::Device,
        layouts: &ProgramLayouts,
        label: &str,
        fragment_body: &str,
        target: wgpu::TextureFormat,
    ) -> Result<Self, SimulationError> {
        let fragment_module = compile_module(
            device,
            label,
            &wrap_pass_fragment(fragment_body),
            ShaderStage::Fragment,
        )?;

        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(label),
            layout: Some(&layouts.pipeline_layout),
            vertex: wgpu::VertexState {
                module: &layouts.vertex_module,
                entry_point: Some("main"),
                buffers: &[QuadBuffer::layout()],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
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
            fragment: Some(wgpu::FragmentState {
                module: &fragment_module,
                entry_point: Some("main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: target,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            multiview: None,
            cache: None,
        });
        if let Some(err) = pollster::block_on(device.pop_error_scope()) {
            return Err(SimulationError::CompileFailure {
                label: label.to_string(),
                message: err.to_string(),
            });
        }

        Ok(Self {
            label: label.to_string(),
            pipeline,
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn pipeline(&self) -> &wgpu::RenderPipeline {
        &self.pipeline
    }
}

fn build_input_layout_entries() -> Vec<wgpu::BindGroupLayoutEntry> {
    let mut entries = Vec::with_capacity(INPUT_SLOTS * 2);
    for index in 0..INPUT_SLOTS as u32 {
        entries.push(wgpu::BindGroupLayoutEntry {
            binding: index * 2,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        });
        entries.push(wgpu::BindGroupLayoutEntry {
            binding: index * 2 + 1,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
            count: None,
        });
    }
    entries
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_strips_version_and_prepends_header() {
        let body = "#version 450\nvoid main() { out_value = vec4(1.0); }\n";
        let wrapped = wrap_pass_fragment(body);
        assert!(wrapped.starts_with("#version 450"));
        assert_eq!(wrapped.matches("#version").count(), 1);
        assert!(wrapped.contains("uniform PassParams"));
        assert!(wrapped.ends_with("void main() { out_value = vec4(1.0); }\n"));
    }

    #[test]
    fn input_layout_pairs_textures_with_samplers() {
        let entries = build_input_layout_entries();
        assert_eq!(entries.len(), INPUT_SLOTS * 2);
        for (index, entry) in entries.iter().enumerate() {
            assert_eq!(entry.binding, index as u32);
            let is_sampler = matches!(entry.ty, wgpu::BindingType::Sampler(_));
            assert_eq!(is_sampler, index % 2 == 1);
        }
    }
}
