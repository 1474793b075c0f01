//! Static walls and the bouncing ball, both on the CPU and as rasterized geometry.
use bytemuck::{Pod, Zeroable};
use fluidconfig::ObstacleConfig;
use wgpu::naga::ShaderStage;

use crate::error::SimulationError;
use crate::gpu::compile_module;

const CIRCLE_SEGMENTS: usize = 48;
const WALL_VERTICES: usize = 4 * 6;
const MAX_VERTICES: usize = WALL_VERTICES + CIRCLE_SEGMENTS * 3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ball {
    /// Centre in normalized space.
    pub position: [f32; 2],
    /// Normalized units per unit of simulated time.
    pub velocity: [f32; 2],
    pub radius: f32,
}

/// Obstacle toggles and ball kinematics.
#[derive(Debug, Clone, PartialEq)]
pub struct ObstacleState {
    pub walls: bool,
    pub ball_enabled: bool,
    pub ball: Ball,
    pub border_offset: f32,
    pub gravity: f32,
    pub slingshot_gain: f32,
    initial_position: [f32; 2],
    initial_velocity: [f32; 2],
}

impl ObstacleState {
    pub fn from_config(config: &ObstacleConfig) -> Self {
        Self {
            walls: config.walls,
            ball_enabled: config.ball,
            ball: Ball {
                position: config.ball_position,
                velocity: config.ball_velocity,
                radius: config.ball_radius,
            },
            border_offset: config.border_offset,
            gravity: config.gravity,
            slingshot_gain: config.slingshot_gain,
            initial_position: config.ball_position,
            initial_velocity: config.ball_velocity,
        }
    }

    /// Range the ball centre may occupy while walls are on.
    pub fn bounds(&self) -> (f32, f32) {
        let inset = self.border_offset + self.ball.radius;
        (-1.0 + inset, 1.0 - inset)
    }

    /// Semi-implicit Euler step under gravity, reflecting off the walls when they are on.
    pub fn step(&mut self, dt: f32) {
        if !self.ball_enabled {
            return;
        }
        let ball = &mut self.ball;
        ball.velocity[1] += self.gravity * dt;
        ball.position[0] += ball.velocity[0] * dt;
        ball.position[1] += ball.velocity[1] * dt;

        if !self.walls {
            return;
        }
        let (low, high) = {
            let inset = self.border_offset + ball.radius;
            (-1.0 + inset, 1.0 - inset)
        };
        for axis in 0..2 {
            if ball.position[axis] < low {
                ball.position[axis] = low;
                ball.velocity[axis] = ball.velocity[axis].abs();
            } else if ball.position[axis] > high {
                ball.position[axis] = high;
                ball.velocity[axis] = -ball.velocity[axis].abs();
            }
        }
    }

    /// Returns the ball to its configured start.
    pub fn reset(&mut self) {
        self.ball.position = self.initial_position;
        self.ball.velocity = self.initial_velocity;
    }

    /// Moves the ball and restores its configured launch velocity.
    pub fn place_ball(&mut self, position: [f32; 2]) {
        self.ball.position = position;
        self.ball.velocity = self.initial_velocity;
    }

    /// Adds a slingshot pull, scaled by the configured gain, to the ball velocity.
    pub fn fling(&mut self, pull: [f32; 2]) {
        self.ball.velocity[0] += pull[0] * self.slingshot_gain;
        self.ball.velocity[1] += pull[1] * self.slingshot_gain;
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub(crate) struct ObstacleVertex {
    pub position: [f32; 2],
    pub value: [f32; 4],
}

const OBSTACLE_ATTRIBUTES: [wgpu::VertexAttribute; 2] =
    wgpu::vertex_attr_array![0 => Float32x2, 1 => Float32x4];

const OBSTACLE_VERTEX_GLSL: &str = r"#version 450
layout(location = 0) in vec2 a_position;
layout(location = 1) in vec4 a_value;
layout(location = 0) out vec4 v_value;

void main() {
    v_value = a_value;
    gl_Position = vec4(a_position, 0.0, 1.0);
}
";

const OBSTACLE_FRAGMENT_GLSL: &str = r"#version 450
layout(location = 0) in vec4 v_value;
layout(location = 0) out vec4 out_value;

void main() {
    out_value = v_value;
}
";

/// Geometry for the current obstacle state, in clip space.
///
/// Walls are at least one cell thick so they always cover a texel. The ball
/// writes its velocity converted to solver units: one normalized unit spans
/// half the grid, and one cell spans `cell_size`.
pub(crate) fn build_obstacle_vertices(
    state: &ObstacleState,
    width: u32,
    height: u32,
    cell_size: f32,
) -> Vec<ObstacleVertex> {
    let mut vertices = Vec::with_capacity(MAX_VERTICES);
    if state.walls {
        let wall = [0.0, 0.0, 0.0, 1.0];
        let tx = state.border_offset.max(2.0 / width.max(1) as f32);
        let ty = state.border_offset.max(2.0 / height.max(1) as f32);
        push_rect(&mut vertices, [-1.0, -1.0], [-1.0 + tx, 1.0], wall);
        push_rect(&mut vertices, [1.0 - tx, -1.0], [1.0, 1.0], wall);
        push_rect(&mut vertices, [-1.0, -1.0], [1.0, -1.0 + ty], wall);
        push_rect(&mut vertices, [-1.0, 1.0 - ty], [1.0, 1.0], wall);
    }

    if state.ball_enabled {
        let ball = &state.ball;
        let value = [
            ball.velocity[0] * width as f32 * 0.5 * cell_size,
            ball.velocity[1] * height as f32 * 0.5 * cell_size,
            0.0,
            1.0,
        ];
        let centre = ObstacleVertex {
            position: ball.position,
            value,
        };
        let rim = |index: usize| {
            let angle = index as f32 / CIRCLE_SEGMENTS as f32 * std::f32::consts::TAU;
            ObstacleVertex {
                position: [
                    ball.position[0] + ball.radius * angle.cos(),
                    ball.position[1] + ball.radius * angle.sin(),
                ],
                value,
            }
        };
        for index in 0..CIRCLE_SEGMENTS {
            vertices.push(centre);
            vertices.push(rim(index));
            vertices.push(rim(index + 1));
        }
    }
    vertices
}

fn push_rect(vertices: &mut Vec<ObstacleVertex>, min: [f32; 2], max: [f32; 2], value: [f32; 4]) {
    let corner = |x: f32, y: f32| ObstacleVertex {
        position: [x, y],
        value,
    };
    vertices.extend_from_slice(&[
        corner(min[0], min[1]),
        corner(max[0], min[1]),
        corner(max[0], max[1]),
        corner(min[0], min[1]),
        corner(max[0], max[1]),
        corner(min[0], max[1]),
    ]);
}

/// Clears the obstacle field and redraws walls and ball into it.
pub(crate) struct ObstacleRasterizer {
    pipeline: wgpu::RenderPipeline,
    vertices: wgpu::Buffer,
}

impl ObstacleRasterizer {
    pub fn new(device: &wgpu::Device, target: wgpu::TextureFormat) -> Result<Self, SimulationError> {
        let vertex = compile_module(
            device,
            "obstacle vertex",
            OBSTACLE_VERTEX_GLSL,
            ShaderStage::Vertex,
        )?;
        let fragment = compile_module(
            device,
            "obstacle fragment",
            OBSTACLE_FRAGMENT_GLSL,
            ShaderStage::Fragment,
        )?;
        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("obstacle pipeline layout"),
            bind_group_layouts: &[],
            push_constant_ranges: &[],
        });

        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("obstacle rasterizer"),
            layout: Some(&layout),
            vertex: wgpu::VertexState {
                module: &vertex,
                entry_point: Some("main"),
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<ObstacleVertex>() as wgpu::BufferAddress,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &OBSTACLE_ATTRIBUTES,
                }],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: None,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            fragment: Some(wgpu::FragmentState {
                module: &fragment,
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
                label: "obstacle rasterizer".into(),
                message: err.to_string(),
            });
        }

        let vertices = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("obstacle vertices"),
            size: (MAX_VERTICES * std::mem::size_of::<ObstacleVertex>()) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Ok(Self { pipeline, vertices })
    }

    /// Uploads geometry and records the clear-then-draw pass.
    ///
    /// The upload lands before the submission executes, so this must be encoded
    /// at most once per submission.
    pub fn encode(
        &self,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        geometry: &[ObstacleVertex],
        target: &wgpu::TextureView,
    ) {
        let count = geometry.len().min(MAX_VERTICES);
        if count > 0 {
            queue.write_buffer(&self.vertices, 0, bytemuck::cast_slice(&geometry[..count]));
        }

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("obstacle rasterizer"),
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
        if count > 0 {
            pass.set_pipeline(&self.pipeline);
            pass.set_vertex_buffer(0, self.vertices.slice(..));
            pass.draw(0..count as u32, 0..1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> ObstacleState {
        ObstacleState::from_config(&ObstacleConfig::default())
    }

    #[test]
    fn ball_reflects_off_lower_wall() {
        let mut obstacles = state();
        let (low, high) = obstacles.bounds();
        obstacles.ball.position = [0.0, low];
        obstacles.ball.velocity = [0.0, -0.5];

        obstacles.step(0.125);

        assert!(obstacles.ball.velocity[1] > 0.0);
        assert!(obstacles.ball.position[1] >= low);
        assert!(obstacles.ball.position[1] <= high);
    }

    #[test]
    fn ball_reflects_off_right_wall() {
        let mut obstacles = state();
        let (_, high) = obstacles.bounds();
        obstacles.ball.position = [high, 0.0];
        obstacles.ball.velocity = [1.0, 0.0];

        obstacles.step(0.125);

        assert!(obstacles.ball.velocity[0] < 0.0);
        assert_eq!(obstacles.ball.position[0], high);
    }

    #[test]
    fn ball_leaves_view_without_walls() {
        let mut obstacles = state();
        obstacles.walls = false;
        obstacles.ball.position = [0.0, -0.95];
        obstacles.ball.velocity = [0.0, -1.0];

        obstacles.step(0.125);

        assert!(obstacles.ball.position[1] < -1.0);
        assert!(obstacles.ball.velocity[1] < -1.0);
    }

    #[test]
    fn gravity_accelerates_before_moving() {
        let mut obstacles = state();
        obstacles.ball.position = [0.0, 0.0];
        obstacles.ball.velocity = [0.0, 0.0];
        obstacles.gravity = -1.0;

        obstacles.step(0.5);

        assert_eq!(obstacles.ball.velocity, [0.0, -0.5]);
        assert_eq!(obstacles.ball.position, [0.0, -0.25]);
    }

    #[test]
    fn disabled_ball_stays_put() {
        let mut obstacles = state();
        obstacles.ball_enabled = false;
        let before = obstacles.ball;
        obstacles.step(1.0);
        assert_eq!(obstacles.ball, before);
    }

    #[test]
    fn place_ball_restores_initial_velocity() {
        let mut obstacles = state();
        obstacles.ball.velocity = [3.0, 3.0];
        obstacles.place_ball([0.2, -0.2]);
        assert_eq!(obstacles.ball.position, [0.2, -0.2]);
        assert_eq!(obstacles.ball.velocity, [0.1, 0.0]);
    }

    #[test]
    fn fling_scales_by_gain() {
        let mut obstacles = state();
        obstacles.ball.velocity = [0.0, 0.0];
        obstacles.fling([0.5, -0.25]);
        assert_eq!(obstacles.ball.velocity, [2.0, -1.0]);
    }

    #[test]
    fn geometry_counts_follow_toggles() {
        let mut obstacles = state();
        assert_eq!(
            build_obstacle_vertices(&obstacles, 64, 64, 1.25).len(),
            MAX_VERTICES
        );
        obstacles.ball_enabled = false;
        assert_eq!(
            build_obstacle_vertices(&obstacles, 64, 64, 1.25).len(),
            WALL_VERTICES
        );
        obstacles.walls = false;
        assert!(build_obstacle_vertices(&obstacles, 64, 64, 1.25).is_empty());
    }

    #[test]
    fn walls_are_at_least_one_cell_thick() {
        let mut obstacles = state();
        obstacles.ball_enabled = false;
        obstacles.border_offset = 0.0;
        let vertices = build_obstacle_vertices(&obstacles, 64, 32, 1.0);
        let left_edge = vertices[1].position[0];
        assert!((left_edge - (-1.0 + 2.0 / 64.0)).abs() < 1e-6);
        let bottom_edge = vertices[14].position[1];
        assert!((bottom_edge - (-1.0 + 2.0 / 32.0)).abs() < 1e-6);
    }

    #[test]
    fn ball_value_carries_solver_velocity() {
        let mut obstacles = state();
        obstacles.walls = false;
        obstacles.ball.velocity = [0.5, -0.25];
        let vertices = build_obstacle_vertices(&obstacles, 64, 64, 2.0);
        assert_eq!(vertices[0].value, [32.0, -16.0, 0.0, 1.0]);
    }
}
