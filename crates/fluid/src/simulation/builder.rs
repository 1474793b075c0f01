use fluidconfig::{DisplayMode, FluidConfig};
use tracing::info;

use crate::display::DisplayState;
use crate::dye::DyeImage;
use crate::error::SimulationError;
use crate::gpu::{GpuContext, PassResources, TexelFormat};
use crate::obstacles::ObstacleRasterizer;
use crate::solver::SolverState;

use super::Simulation;

/// Every GPU object the simulation issues passes with. Rebuilt wholesale when
/// the context is restored.
pub(crate) struct GpuResources {
    pub passes: PassResources,
    pub solver: SolverState,
    pub display: DisplayState,
    pub rasterizer: ObstacleRasterizer,
}

impl GpuResources {
    pub fn build(
        context: &GpuContext,
        config: &FluidConfig,
        mode: DisplayMode,
    ) -> Result<Self, SimulationError> {
        let (width, height) = (config.grid.width, config.grid.height);
        let limit = context.max_texture_dimension();
        if width > limit || height > limit {
            return Err(SimulationError::ResourceAllocation(format!(
                "grid {width}x{height} exceeds the device limit of {limit}"
            )));
        }

        let device = context.device();
        let passes = PassResources::new(device, context.queue())?;
        let solver = SolverState::new(device, &passes, config.solver, width, height)?;
        let display = DisplayState::new(device, &passes, mode, width, height)?;
        let rasterizer = ObstacleRasterizer::new(device, TexelFormat::Float32.to_wgpu())?;
        Ok(Self {
            passes,
            solver,
            display,
            rasterizer,
        })
    }
}

/// Collects what a [`Simulation`] needs and yields it only once every GPU
/// resource has been created.
///
/// ```no_run
/// # fn main() -> anyhow::Result<()> {
/// use fluid::{GpuContext, GpuOptions, SimulationBuilder};
/// use fluidconfig::FluidConfig;
///
/// let context = GpuContext::headless(&GpuOptions::default())?;
/// let mut simulation = SimulationBuilder::new(FluidConfig::default())
///     .view_size(1024, 1024)
///     .build(context)?;
/// simulation.initialize()?;
/// simulation.tick();
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct SimulationBuilder {
    config: FluidConfig,
    dye: Option<DyeImage>,
    view_size: Option<(u32, u32)>,
}

impl SimulationBuilder {
    pub fn new(config: FluidConfig) -> Self {
        Self {
            config,
            dye: None,
            view_size: None,
        }
    }

    /// Picture advected by the image display mode; a checkerboard otherwise.
    pub fn dye_image(mut self, dye: DyeImage) -> Self {
        self.dye = Some(dye);
        self
    }

    /// Pixel size of the view pointer events are reported in. Defaults to the grid size.
    pub fn view_size(mut self, width: u32, height: u32) -> Self {
        self.view_size = Some((width, height));
        self
    }

    pub fn build(self, context: GpuContext) -> Result<Simulation, SimulationError> {
        self.config.validate()?;
        let mode = self.config.display.mode;
        let gpu = GpuResources::build(&context, &self.config, mode)?;
        let (view_width, view_height) = self
            .view_size
            .unwrap_or((self.config.grid.width, self.config.grid.height));
        info!(
            width = self.config.grid.width,
            height = self.config.grid.height,
            adapter = %context.adapter_profile().name,
            mode = %mode,
            "built fluid simulation"
        );
        Ok(Simulation::from_parts(
            context,
            gpu,
            self.config,
            self.dye,
            (view_width, view_height),
        ))
    }
}
