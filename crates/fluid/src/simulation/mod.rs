//! The per-frame state machine tying solver, display, obstacles and input together.
//!
//! ```text
//!   build ─▶ Uninitialized ─initialize─▶ Initialized ─tick─▶ Running ⇄ Paused
//!                                            ▲                  │
//!                                            └─restore_context── ContextLost
//! ```
//!
//! `needs_reset` is orthogonal to the phase and is honoured on the next tick.
mod builder;
mod clock;
mod input;

use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use fluidconfig::{
    DisplayMode, FluidConfig, InitialPreset, MouseImpulse, MouseMode, SourceImpulse,
};
use sources::{ImpulseSource, SourceList};
use tracing::{debug, info, warn};

use crate::dye::DyeImage;
use crate::error::SimulationError;
use crate::gpu::{FieldTexture, GpuContext, PassEncoder, TexelFormat, TextureSpec};
use crate::obstacles::{build_obstacle_vertices, ObstacleState};
use crate::presets;
use crate::solver::{Impulse, StepPlan};
use crate::types::{FieldKind, FrameStatus, PointerEvent};

pub use builder::SimulationBuilder;
pub use clock::FrameClock;
pub use input::InputState;

use builder::GpuResources;
use input::PointerAction;

const CHECKERBOARD_TILES: u32 = 8;

/// Lifecycle of a [`Simulation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// GPU resources exist but the fields have not been seeded.
    Uninitialized,
    /// Fields are seeded; no frame has run yet.
    Initialized,
    Running,
    Paused,
    /// No passes are issued until [`Simulation::restore_context`].
    ContextLost,
}

/// A fluid simulation bound to one graphics context.
pub struct Simulation {
    context: GpuContext,
    gpu: GpuResources,
    config: FluidConfig,
    obstacles: ObstacleState,
    input: InputState,
    sources: SourceList,
    clock: FrameClock,
    preset: InitialPreset,
    dye: Option<DyeImage>,
    phase: Phase,
    needs_reset: bool,
}

impl Simulation {
    /// Builds a simulation with default builder options.
    pub fn new(context: GpuContext, config: FluidConfig) -> Result<Self, SimulationError> {
        SimulationBuilder::new(config).build(context)
    }

    pub fn builder(config: FluidConfig) -> SimulationBuilder {
        SimulationBuilder::new(config)
    }

    fn from_parts(
        context: GpuContext,
        gpu: GpuResources,
        config: FluidConfig,
        dye: Option<DyeImage>,
        view_size: (u32, u32),
    ) -> Self {
        Self {
            obstacles: ObstacleState::from_config(&config.obstacles),
            input: InputState::from_config(&config.input, view_size.0, view_size.1),
            sources: SourceList::from_config(&config.input),
            clock: FrameClock::new(config.display.fps_sample_interval),
            preset: config.display.preset,
            context,
            gpu,
            config,
            dye,
            phase: Phase::Uninitialized,
            needs_reset: false,
        }
    }

    /// Seeds every field from the selected preset. Safe to call again to start over.
    pub fn initialize(&mut self) -> Result<()> {
        if self.phase == Phase::ContextLost {
            return Err(SimulationError::ContextLost.into());
        }
        self.reset_fields()?;
        self.phase = Phase::Initialized;
        info!(preset = %self.preset, "initialized fluid simulation");
        Ok(())
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn config(&self) -> &FluidConfig {
        &self.config
    }

    pub fn context(&self) -> &GpuContext {
        &self.context
    }

    pub fn width(&self) -> u32 {
        self.gpu.solver.width()
    }

    pub fn height(&self) -> u32 {
        self.gpu.solver.height()
    }

    pub fn obstacles(&self) -> &ObstacleState {
        &self.obstacles
    }

    pub fn input(&self) -> &InputState {
        &self.input
    }

    pub fn sources(&self) -> &SourceList {
        &self.sources
    }

    pub fn clock(&self) -> &FrameClock {
        &self.clock
    }

    pub fn display_mode(&self) -> DisplayMode {
        self.gpu.display.mode()
    }

    pub fn initial_preset(&self) -> InitialPreset {
        self.preset
    }

    pub fn is_paused(&self) -> bool {
        self.phase == Phase::Paused
    }

    pub fn needs_reset(&self) -> bool {
        self.needs_reset
    }

    /// Display target the last tick rendered into.
    pub fn display_target(&self) -> &FieldTexture {
        self.gpu.display.target()
    }

    /// Runs one frame at the current wall-clock time.
    pub fn tick(&mut self) -> FrameStatus {
        self.tick_at(Instant::now())
    }

    /// Runs one frame: step unless paused, honour a pending reset, then render.
    ///
    /// Pass failures are logged and abandon the frame; the next tick carries on
    /// from whatever the fields hold.
    pub fn tick_at(&mut self, now: Instant) -> FrameStatus {
        match self.phase {
            Phase::Uninitialized => return FrameStatus::NotInitialized,
            Phase::ContextLost => return FrameStatus::ContextLost,
            _ => {}
        }
        if let Some(reason) = self.context.take_lost_signal() {
            self.mark_context_lost(&reason);
            return FrameStatus::ContextLost;
        }

        self.clock.tick(now);
        let paused = self.phase == Phase::Paused;
        if !paused {
            if let Err(err) = self.step_unchecked() {
                warn!(
                    error = %format!("{err:#}"),
                    frame = self.clock.frame_count(),
                    "abandoned simulation step"
                );
                return FrameStatus::StepFailed;
            }
            self.phase = Phase::Running;
        }
        if self.needs_reset {
            if let Err(err) = self.reset_fields() {
                warn!(error = %format!("{err:#}"), "pending reset failed");
                return FrameStatus::StepFailed;
            }
        }
        if let Err(err) = self.render() {
            warn!(error = %format!("{err:#}"), "failed to render display");
            return FrameStatus::StepFailed;
        }

        if paused {
            FrameStatus::Paused
        } else {
            FrameStatus::Stepped
        }
    }

    /// Runs exactly one solver step and the obstacle update that follows it.
    pub fn advance_step(&mut self) -> Result<()> {
        self.ensure_ready()?;
        self.step_unchecked()
    }

    fn step_unchecked(&mut self) -> Result<()> {
        let plan = self.step_plan();
        let geometry = build_obstacle_vertices(
            &self.obstacles,
            self.width(),
            self.height(),
            self.config.solver.cell_size,
        );
        let device = self.context.device();
        let queue = self.context.queue();
        let gpu = &mut self.gpu;

        validation_scope(device, "solver step", || {
            let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("solver step"),
            });
            gpu.rasterizer.encode(
                queue,
                &mut encoder,
                &geometry,
                gpu.solver.fields.obstacles.view(),
            );
            let mut pass = PassEncoder {
                device,
                resources: &gpu.passes,
                encoder: &mut encoder,
            };
            gpu.solver.encode_step(&mut pass, &plan);
            queue.submit(std::iter::once(encoder.finish()));
        })?;

        let dt = self.config.solver.timestep;
        self.obstacles.step(dt);
        self.input.settle();
        self.clock.advance(dt);
        Ok(())
    }

    fn step_plan(&self) -> StepPlan {
        let mut impulses = Vec::with_capacity(self.sources.len() + 1);
        impulses.extend(self.input.pointer_impulse());
        impulses.extend(
            self.sources
                .iter()
                .filter_map(|source| Impulse::from_source(source, self.input.source_impulse)),
        );
        StepPlan {
            advect_image: self.display_mode().advects_image(),
            impulses,
        }
    }

    /// Pressure solve and divergence removal on the current velocity field.
    pub fn project(&mut self) -> Result<()> {
        self.ensure_ready()?;
        let device = self.context.device();
        let queue = self.context.queue();
        let gpu = &mut self.gpu;
        validation_scope(device, "projection", || {
            let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("projection"),
            });
            let mut pass = PassEncoder {
                device,
                resources: &gpu.passes,
                encoder: &mut encoder,
            };
            gpu.solver.project(&mut pass);
            queue.submit(std::iter::once(encoder.finish()));
        })
    }

    /// Resets fields, obstacles and sources right away.
    pub fn reset(&mut self) -> Result<()> {
        if self.phase == Phase::ContextLost {
            return Err(SimulationError::ContextLost.into());
        }
        self.reset_fields()
    }

    /// Defers a reset to the next tick.
    pub fn request_reset(&mut self) {
        self.needs_reset = true;
    }

    fn reset_fields(&mut self) -> Result<()> {
        self.obstacles.reset();
        self.sources.clear();
        self.clock.reset_time();
        self.seed_fields()?;
        self.needs_reset = false;
        debug!(
            preset = %self.preset,
            width = self.width(),
            height = self.height(),
            "reset simulation fields"
        );
        Ok(())
    }

    /// Writes the initial preset, dye image and obstacles into the GPU fields.
    /// Host-side state (sources, ball, clock) is left untouched.
    fn seed_fields(&mut self) -> Result<()> {
        let (width, height) = (self.width(), self.height());
        let initial = presets::generate(self.preset, width, height, self.config.display.seed);
        let queue = self.context.queue();
        let fields = &self.gpu.solver.fields;
        fields.velocity.fill(queue, &initial.velocity)?;
        fields.density.fill(queue, &initial.density)?;
        self.seed_image_and_obstacles()
            .context("failed to seed image and obstacle fields")
    }

    /// Resamples the dye image into the image slab and rasterizes the obstacles.
    fn seed_image_and_obstacles(&mut self) -> Result<()> {
        let (width, height) = (self.width(), self.height());
        let device = self.context.device();
        let queue = self.context.queue();
        let fallback;
        let dye = match &self.dye {
            Some(dye) => dye,
            None => {
                fallback = DyeImage::checkerboard(width, height, CHECKERBOARD_TILES);
                &fallback
            }
        };
        let limit = self.context.max_texture_dimension();
        if dye.width() > limit || dye.height() > limit {
            return Err(SimulationError::ResourceAllocation(format!(
                "dye image {}x{} exceeds the device limit of {limit}",
                dye.width(),
                dye.height()
            ))
            .into());
        }
        let source = FieldTexture::new(
            device,
            "dye image",
            dye.width(),
            dye.height(),
            &TextureSpec::linear(TexelFormat::Unorm8),
        );
        source.upload_bytes(queue, dye.pixels())?;

        let geometry = build_obstacle_vertices(
            &self.obstacles,
            width,
            height,
            self.config.solver.cell_size,
        );
        let gpu = &mut self.gpu;
        validation_scope(device, "seed fields", || {
            let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("seed fields"),
            });
            gpu.rasterizer.encode(
                queue,
                &mut encoder,
                &geometry,
                gpu.solver.fields.obstacles.view(),
            );
            let mut pass = PassEncoder {
                device,
                resources: &gpu.passes,
                encoder: &mut encoder,
            };
            gpu.solver.fill_image(&mut pass, source.input());
            queue.submit(std::iter::once(encoder.finish()));
        })
    }

    /// Recreates every field at a new grid size, then resets.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        if width == 0 || height == 0 {
            return Err(SimulationError::ResourceAllocation(format!(
                "cannot resize grid to {width}x{height}"
            ))
            .into());
        }
        let limit = self.context.max_texture_dimension();
        if width > limit || height > limit {
            return Err(SimulationError::ResourceAllocation(format!(
                "grid {width}x{height} exceeds the device limit of {limit}"
            ))
            .into());
        }
        let device = self.context.device();
        self.gpu.solver.resize(device, width, height);
        self.gpu.display.resize(device, width, height);
        self.config.grid.width = width;
        self.config.grid.height = height;
        info!(width, height, "resized simulation grid");
        if self.phase == Phase::Uninitialized || self.phase == Phase::ContextLost {
            return Ok(());
        }
        self.reset_fields()
    }

    /// Size of the view pointer events are reported in.
    pub fn set_view_size(&mut self, width: u32, height: u32) {
        self.input.set_view_size(width, height);
    }

    pub fn set_display_mode(&mut self, mode: DisplayMode) {
        debug!(%mode, "display mode changed");
        self.gpu.display.set_mode(mode);
    }

    pub fn set_mouse_impulse(&mut self, impulse: MouseImpulse) {
        self.input.mouse_impulse = impulse;
    }

    pub fn set_source_impulse(&mut self, impulse: SourceImpulse) {
        self.input.source_impulse = impulse;
    }

    pub fn set_mouse_mode(&mut self, mode: MouseMode) {
        self.input.mouse_mode = mode;
    }

    /// Takes effect on the next reset.
    pub fn set_initial_preset(&mut self, preset: InitialPreset) {
        self.preset = preset;
    }

    /// Returns whether the simulation is now paused.
    pub fn toggle_pause(&mut self) -> bool {
        self.phase = match self.phase {
            Phase::Running | Phase::Initialized => Phase::Paused,
            Phase::Paused => Phase::Running,
            other => other,
        };
        self.is_paused()
    }

    /// Returns whether the ball is now enabled.
    pub fn toggle_ball(&mut self) -> bool {
        self.obstacles.ball_enabled = !self.obstacles.ball_enabled;
        self.obstacles.ball_enabled
    }

    /// Returns whether the walls are now enabled.
    pub fn toggle_walls(&mut self) -> bool {
        self.obstacles.walls = !self.obstacles.walls;
        self.obstacles.walls
    }

    /// Adds a persistent source with the configured radius.
    pub fn add_source(
        &mut self,
        position: [f32; 2],
        impulse: [f32; 3],
    ) -> Result<(), SimulationError> {
        let source = ImpulseSource::new(position, impulse, self.input.source_radius());
        self.add_impulse_source(source)
    }

    pub fn add_impulse_source(&mut self, source: ImpulseSource) -> Result<(), SimulationError> {
        self.sources.try_add(source).map_err(|err| {
            warn!(
                error = %err,
                x = source.position[0],
                y = source.position[1],
                "rejected source"
            );
            SimulationError::from(err)
        })
    }

    /// Removes every source within `radius` of `position`; returns how many went.
    pub fn remove_sources_near(&mut self, position: [f32; 2], radius: f32) -> usize {
        self.sources.remove_in_radius(position, radius)
    }

    pub fn pop_source(&mut self) -> Result<ImpulseSource, SimulationError> {
        self.sources.pop().map_err(|err| {
            warn!(error = %err, "rejected source removal");
            SimulationError::from(err)
        })
    }

    pub fn on_pointer_down(&mut self, event: PointerEvent) {
        let action = self.input.press(event);
        self.apply_pointer(action);
    }

    pub fn on_pointer_move(&mut self, event: PointerEvent) {
        let action = self.input.move_to(event);
        self.apply_pointer(action);
    }

    pub fn on_pointer_up(&mut self, event: PointerEvent) {
        let action = self.input.release(event);
        self.apply_pointer(action);
    }

    fn apply_pointer(&mut self, action: PointerAction) {
        match action {
            PointerAction::None => {}
            PointerAction::PlaceBall(position) => self.obstacles.place_ball(position),
            PointerAction::AddSource(position) => {
                // Rejections are logged; pointer handlers have no caller to report to.
                self.add_source(position, self.input.impulse_value()).ok();
            }
            PointerAction::Fling(pull) => self.obstacles.fling(pull),
        }
    }

    /// Replaces both halves of a field with `texels`, row 0 first.
    pub fn upload_field(
        &mut self,
        kind: FieldKind,
        texels: &[[f32; 4]],
    ) -> Result<(), SimulationError> {
        if self.phase == Phase::ContextLost {
            return Err(SimulationError::ContextLost);
        }
        let queue = self.context.queue();
        let fields = &self.gpu.solver.fields;
        match kind {
            FieldKind::Velocity => fields.velocity.fill(queue, texels),
            FieldKind::Density => fields.density.fill(queue, texels),
            FieldKind::Image => fields.image.fill(queue, texels),
            FieldKind::Obstacles => fields.obstacles.upload(queue, texels),
        }
    }

    /// Reads the current contents of a field back to the host.
    pub fn read_field(&self, kind: FieldKind) -> Result<Vec<[f32; 4]>> {
        if self.phase == Phase::ContextLost {
            return Err(SimulationError::ContextLost.into());
        }
        let fields = &self.gpu.solver.fields;
        let texture = match kind {
            FieldKind::Velocity => fields.velocity.current(),
            FieldKind::Density => fields.density.current(),
            FieldKind::Image => fields.image.current(),
            FieldKind::Obstacles => &fields.obstacles,
        };
        texture
            .read(self.context.device(), self.context.queue())
            .with_context(|| format!("failed to read {kind} field"))
    }

    /// Reads the display target as RGBA in [0, 1].
    pub fn read_display(&self) -> Result<Vec<[f32; 4]>> {
        if self.phase == Phase::ContextLost {
            return Err(SimulationError::ContextLost.into());
        }
        self.gpu
            .display
            .target()
            .read(self.context.device(), self.context.queue())
            .context("failed to read display target")
    }

    /// Renders the current display mode into the owned display target.
    pub fn render(&mut self) -> Result<()> {
        self.ensure_ready()?;
        let device = self.context.device();
        let queue = self.context.queue();
        let gpu = &mut self.gpu;
        validation_scope(device, "display", || -> Result<()> {
            let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("display"),
            });
            let mut pass = PassEncoder {
                device,
                resources: &gpu.passes,
                encoder: &mut encoder,
            };
            gpu.display.encode(&mut pass, &gpu.solver.fields)?;
            queue.submit(std::iter::once(encoder.finish()));
            Ok(())
        })?
    }

    /// Renders the current display mode into a host-owned view such as a swapchain frame.
    pub fn render_to(
        &mut self,
        view: &wgpu::TextureView,
        format: wgpu::TextureFormat,
    ) -> Result<()> {
        self.ensure_ready()?;
        let device = self.context.device();
        let queue = self.context.queue();
        let gpu = &mut self.gpu;
        validation_scope(device, "present", || -> Result<()> {
            let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("present"),
            });
            let mut pass = PassEncoder {
                device,
                resources: &gpu.passes,
                encoder: &mut encoder,
            };
            gpu.display
                .encode_to(&mut pass, &gpu.solver.fields, view, format)?;
            queue.submit(std::iter::once(encoder.finish()));
            Ok(())
        })?
    }

    /// Replaces the dye picture and reseeds the image field if already running.
    ///
    /// A picture the running device rejects leaves the previous one in place.
    pub fn set_dye_image(&mut self, dye: DyeImage) -> Result<()> {
        let previous = self.dye.replace(dye);
        match self.phase {
            Phase::Uninitialized | Phase::ContextLost => Ok(()),
            _ => {
                let seeded = self.seed_image_and_obstacles();
                if seeded.is_err() {
                    self.dye = previous;
                }
                seeded
            }
        }
    }

    /// Stops issuing passes until a new context is supplied.
    pub fn mark_context_lost(&mut self, reason: &str) {
        if self.phase != Phase::ContextLost {
            warn!(reason, "graphics context lost; suspending simulation");
        }
        self.phase = Phase::ContextLost;
    }

    /// Rebuilds every GPU resource on `context` and re-seeds the fields.
    ///
    /// Configuration, sources, toggles and the display mode survive the restore.
    /// If seeding fails the simulation stays suspended and the restore can be retried.
    pub fn restore_context(&mut self, context: GpuContext) -> Result<()> {
        let mode = self.display_mode();
        let mut gpu = GpuResources::build(&context, &self.config, mode)?;
        gpu.display.set_mode(mode);
        self.context = context;
        self.gpu = gpu;

        if let Err(err) = self.seed_fields() {
            self.phase = Phase::ContextLost;
            return Err(err.context("failed to re-seed fields on the restored context"));
        }
        self.phase = Phase::Initialized;
        info!(adapter = %self.context.adapter_profile().name, "restored graphics context");
        Ok(())
    }

    fn ensure_ready(&self) -> Result<(), SimulationError> {
        match self.phase {
            Phase::Uninitialized => Err(SimulationError::NotInitialized),
            Phase::ContextLost => Err(SimulationError::ContextLost),
            _ => Ok(()),
        }
    }
}

/// Runs `record` inside a validation error scope and reports what it caught.
fn validation_scope<T>(
    device: &wgpu::Device,
    label: &str,
    record: impl FnOnce() -> T,
) -> Result<T> {
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let value = record();
    match pollster::block_on(device.pop_error_scope()) {
        Some(err) => Err(anyhow!("{label} failed validation: {err}")),
        None => Ok(value),
    }
}
