//! Solver passes over double-buffered fields.
//!
//! Every pass draws one full-screen quad into a slab's scratch surface and then
//! swaps that slab, so the next pass reads what was just written. A step is
//! recorded into a single encoder:
//!
//! ```text
//!   obstacles ─▶ advect velocity ─▶ advect density (+ image) ─▶ buoyancy
//!        ─▶ impulses (pointer, sources, or one inert pass)
//!        ─▶ jacobi × 2N ─▶ remove divergence
//! ```
mod impulse;
pub(crate) mod shaders;

use fluidconfig::SolverConfig;

use crate::error::SimulationError;
use crate::gpu::{
    InputView, PassEncoder, PassResources, PassUniforms, Program, TexelFormat, TextureSpec,
};
use crate::slab::{Slab, Surface};

pub use impulse::{Impulse, PointerSample};

/// Every solved field at one resolution.
pub struct Fields {
    pub velocity: Slab,
    pub density: Slab,
    pub image: Slab,
    pub obstacles: Surface,
}

impl Fields {
    pub fn new(device: &wgpu::Device, width: u32, height: u32) -> Self {
        let float_field = TextureSpec::field(TexelFormat::Float32);
        Self {
            velocity: Slab::new(device, "velocity", width, height, &float_field),
            density: Slab::new(device, "density", width, height, &float_field),
            image: Slab::new(
                device,
                "image",
                width,
                height,
                &TextureSpec::linear(TexelFormat::Float16),
            ),
            obstacles: Surface::new(device, "obstacles", width, height, &float_field),
        }
    }
}

struct SolverPrograms {
    advect: Program,
    advect_half: Program,
    buoyancy: Program,
    impulse: Program,
    jacobi: Program,
    remove_divergence: Program,
    fill: Program,
}

impl SolverPrograms {
    fn compile(device: &wgpu::Device, resources: &PassResources) -> Result<Self, SimulationError> {
        let layouts = &resources.layouts;
        let float = TexelFormat::Float32.to_wgpu();
        let half = TexelFormat::Float16.to_wgpu();
        Ok(Self {
            advect: Program::compile(device, layouts, "advect", shaders::ADVECT, float)?,
            advect_half: Program::compile(device, layouts, "advect image", shaders::ADVECT, half)?,
            buoyancy: Program::compile(device, layouts, "buoyancy", shaders::BUOYANCY, float)?,
            impulse: Program::compile(device, layouts, "impulse", shaders::IMPULSE, float)?,
            jacobi: Program::compile(device, layouts, "jacobi", shaders::JACOBI, float)?,
            remove_divergence: Program::compile(
                device,
                layouts,
                "remove divergence",
                shaders::REMOVE_DIVERGENCE,
                float,
            )?,
            fill: Program::compile(device, layouts, "fill image", shaders::FILL, half)?,
        })
    }
}

/// Which impulses a step issues and whether the image field is advected.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepPlan {
    pub advect_image: bool,
    pub impulses: Vec<Impulse>,
}

/// Solver parameters, compiled passes and the fields they operate on.
pub struct SolverState {
    config: SolverConfig,
    programs: SolverPrograms,
    pub fields: Fields,
}

impl SolverState {
    pub(crate) fn new(
        device: &wgpu::Device,
        resources: &PassResources,
        config: SolverConfig,
        width: u32,
        height: u32,
    ) -> Result<Self, SimulationError> {
        let programs = SolverPrograms::compile(device, resources)?;
        Ok(Self {
            config,
            programs,
            fields: Fields::new(device, width, height),
        })
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    pub fn width(&self) -> u32 {
        self.fields.velocity.width()
    }

    pub fn height(&self) -> u32 {
        self.fields.velocity.height()
    }

    /// Replaces every field with fresh textures at a new resolution.
    pub(crate) fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        self.fields = Fields::new(device, width, height);
    }

    fn base_uniforms(&self) -> PassUniforms {
        let mut uniforms =
            PassUniforms::for_grid(self.width(), self.height(), self.config.cell_size);
        uniforms.solver = [
            self.config.timestep,
            1.0,
            1.0,
            self.config.ambient_temperature,
        ];
        uniforms.forces = [self.config.sigma, self.config.kappa, 0.0, 0.0];
        uniforms
    }

    /// Records the solver part of one step. Obstacles must already be rasterized.
    pub(crate) fn encode_step(&mut self, pass: &mut PassEncoder<'_>, plan: &StepPlan) {
        self.advect_velocity(pass);
        self.advect_density(pass);
        if plan.advect_image {
            self.advect_image(pass);
        }
        self.buoyancy(pass);
        if plan.impulses.is_empty() {
            self.impulse(pass, &Impulse::Inert);
        } else {
            for impulse in &plan.impulses {
                self.impulse(pass, impulse);
            }
        }
        self.project(pass);
    }

    /// Pressure solve followed by divergence removal.
    pub(crate) fn project(&mut self, pass: &mut PassEncoder<'_>) {
        self.jacobi(pass, self.config.jacobi_iterations);
        self.remove_divergence(pass);
    }

    pub(crate) fn advect_velocity(&mut self, pass: &mut PassEncoder<'_>) {
        let mut uniforms = self.base_uniforms();
        uniforms.solver[1] = self.config.velocity_dissipation;
        uniforms.solver[2] = self.config.temperature_dissipation;
        uniforms.flags[0] = 1;
        let fields = &mut self.fields;
        pass.draw(
            &self.programs.advect,
            &uniforms,
            &[
                fields.velocity.read_input(),
                fields.velocity.read_input(),
                fields.obstacles.input(),
            ],
            fields.velocity.write_target(),
        );
        fields.velocity.swap();
    }

    pub(crate) fn advect_density(&mut self, pass: &mut PassEncoder<'_>) {
        let mut uniforms = self.base_uniforms();
        uniforms.solver[1] = self.config.density_dissipation;
        let fields = &mut self.fields;
        pass.draw(
            &self.programs.advect,
            &uniforms,
            &[
                fields.velocity.read_input(),
                fields.density.read_input(),
                fields.obstacles.input(),
            ],
            fields.density.write_target(),
        );
        fields.density.swap();
    }

    pub(crate) fn advect_image(&mut self, pass: &mut PassEncoder<'_>) {
        let mut uniforms = self.base_uniforms();
        uniforms.solver[1] = self.config.image_dissipation;
        let fields = &mut self.fields;
        pass.draw(
            &self.programs.advect_half,
            &uniforms,
            &[
                fields.velocity.read_input(),
                fields.image.read_input(),
                fields.obstacles.input(),
            ],
            fields.image.write_target(),
        );
        fields.image.swap();
    }

    pub(crate) fn buoyancy(&mut self, pass: &mut PassEncoder<'_>) {
        let uniforms = self.base_uniforms();
        let fields = &mut self.fields;
        pass.draw(
            &self.programs.buoyancy,
            &uniforms,
            &[
                fields.velocity.read_input(),
                fields.density.read_input(),
                fields.obstacles.input(),
            ],
            fields.velocity.write_target(),
        );
        fields.velocity.swap();
    }

    pub(crate) fn impulse(&mut self, pass: &mut PassEncoder<'_>, impulse: &Impulse) {
        let mut uniforms = self.base_uniforms();
        impulse.write_uniforms(&mut uniforms);
        let fields = &mut self.fields;
        pass.draw(
            &self.programs.impulse,
            &uniforms,
            &[fields.velocity.read_input(), fields.obstacles.input()],
            fields.velocity.write_target(),
        );
        fields.velocity.swap();
    }

    /// `iterations` logical iterations, each two sweeps with their own swap.
    pub(crate) fn jacobi(&mut self, pass: &mut PassEncoder<'_>, iterations: u32) {
        let uniforms = self.base_uniforms();
        let fields = &mut self.fields;
        for _ in 0..iterations * 2 {
            pass.draw(
                &self.programs.jacobi,
                &uniforms,
                &[fields.velocity.read_input(), fields.obstacles.input()],
                fields.velocity.write_target(),
            );
            fields.velocity.swap();
        }
    }

    pub(crate) fn remove_divergence(&mut self, pass: &mut PassEncoder<'_>) {
        let uniforms = self.base_uniforms();
        let fields = &mut self.fields;
        pass.draw(
            &self.programs.remove_divergence,
            &uniforms,
            &[fields.velocity.read_input(), fields.obstacles.input()],
            fields.velocity.write_target(),
        );
        fields.velocity.swap();
    }

    /// Resamples `source` into both halves of the image slab.
    pub(crate) fn fill_image(&mut self, pass: &mut PassEncoder<'_>, source: InputView<'_>) {
        let uniforms = self.base_uniforms();
        for _ in 0..2 {
            pass.draw(
                &self.programs.fill,
                &uniforms,
                &[source],
                self.fields.image.write_target(),
            );
            self.fields.image.swap();
        }
    }
}
