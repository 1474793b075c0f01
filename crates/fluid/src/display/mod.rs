//! Read-side visualisation of the solved fields.
//!
//! Each [`DisplayMode`] is its own fragment program reading velocity, density,
//! image and obstacles. Programs are cached per (mode, target format) so a host
//! swapchain and the owned display target can coexist.
mod shaders;

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use fluidconfig::{DisplayMode, IndexedMode};

use crate::error::SimulationError;
use crate::gpu::{
    FieldTexture, PassEncoder, PassResources, PassUniforms, Program, TexelFormat, TextureSpec,
};
use crate::solver::Fields;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct PipelineKey {
    mode: DisplayMode,
    format: wgpu::TextureFormat,
}

#[derive(Default)]
struct PipelineCache {
    entries: HashMap<PipelineKey, Program>,
}

impl PipelineCache {
    fn get_or_compile(
        &mut self,
        device: &wgpu::Device,
        resources: &PassResources,
        key: PipelineKey,
    ) -> Result<&Program, SimulationError> {
        let program = match self.entries.entry(key) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let label = format!("display {} ({:?})", key.mode, key.format);
                let program = Program::compile(
                    device,
                    &resources.layouts,
                    &label,
                    &shaders::fragment_source(key.mode),
                    key.format,
                )?;
                tracing::debug!(mode = %key.mode, format = ?key.format, "compiled display program");
                entry.insert(program)
            }
        };
        Ok(program)
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Selected display mode and the grid-sized target it renders into.
pub struct DisplayState {
    mode: DisplayMode,
    target: FieldTexture,
    pipelines: PipelineCache,
}

impl DisplayState {
    /// Compiles every mode for the owned target up front so a broken program
    /// fails initialization rather than a later frame.
    pub(crate) fn new(
        device: &wgpu::Device,
        resources: &PassResources,
        mode: DisplayMode,
        width: u32,
        height: u32,
    ) -> Result<Self, SimulationError> {
        let mut pipelines = PipelineCache::default();
        let format = TexelFormat::Unorm8.to_wgpu();
        for variant in DisplayMode::ALL {
            let key = PipelineKey {
                mode: *variant,
                format,
            };
            pipelines.get_or_compile(device, resources, key)?;
        }
        Ok(Self {
            mode,
            target: create_target(device, width, height),
            pipelines,
        })
    }

    pub fn mode(&self) -> DisplayMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: DisplayMode) {
        self.mode = mode;
    }

    pub fn target(&self) -> &FieldTexture {
        &self.target
    }

    pub fn cached_programs(&self) -> usize {
        self.pipelines.len()
    }

    pub(crate) fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        self.target = create_target(device, width, height);
    }

    /// Draws the current mode into the owned display target.
    pub(crate) fn encode(
        &mut self,
        pass: &mut PassEncoder<'_>,
        fields: &Fields,
    ) -> Result<(), SimulationError> {
        let key = PipelineKey {
            mode: self.mode,
            format: self.target.format().to_wgpu(),
        };
        let program = self.pipelines.get_or_compile(pass.device, pass.resources, key)?;
        let uniforms = PassUniforms::for_grid(self.target.width(), self.target.height(), 1.0);
        draw_fields(pass, program, &uniforms, fields, self.target.view());
        Ok(())
    }

    /// Draws the current mode into a host-owned view, compiling for `format` on first use.
    pub(crate) fn encode_to(
        &mut self,
        pass: &mut PassEncoder<'_>,
        fields: &Fields,
        view: &wgpu::TextureView,
        format: wgpu::TextureFormat,
    ) -> Result<(), SimulationError> {
        let key = PipelineKey {
            mode: self.mode,
            format,
        };
        let program = self.pipelines.get_or_compile(pass.device, pass.resources, key)?;
        let uniforms = PassUniforms::for_grid(self.target.width(), self.target.height(), 1.0);
        draw_fields(pass, program, &uniforms, fields, view);
        Ok(())
    }
}

fn draw_fields(
    pass: &mut PassEncoder<'_>,
    program: &Program,
    uniforms: &PassUniforms,
    fields: &Fields,
    view: &wgpu::TextureView,
) {
    pass.draw(
        program,
        uniforms,
        &[
            fields.velocity.read_input(),
            fields.density.read_input(),
            fields.image.read_input(),
            fields.obstacles.input(),
        ],
        view,
    );
}

fn create_target(device: &wgpu::Device, width: u32, height: u32) -> FieldTexture {
    FieldTexture::new(
        device,
        "display",
        width,
        height,
        &TextureSpec::linear(TexelFormat::Unorm8),
    )
}
