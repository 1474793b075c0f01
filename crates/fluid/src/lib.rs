//! GPU two-dimensional incompressible fluid simulation.
//!
//! Every field lives in a pair of float textures (a [`Slab`]) and every solver
//! stage is a full-screen fragment pass that reads one half and writes the
//! other. A [`Simulation`] owns the fields and drives one step per tick:
//!
//! ```text
//!   pointer / sources ─┐
//!                      ▼
//!   obstacles ─▶ advect ─▶ buoyancy ─▶ impulses ─▶ jacobi ─▶ remove divergence
//!                                                               │
//!                                                 display mode ◀┘
//! ```
//!
//! Hosts create a [`GpuContext`] (headless or from their own adapter), build the
//! simulation with [`SimulationBuilder`], call [`Simulation::initialize`] and then
//! [`Simulation::tick`] once per displayed frame. The owned display target can
//! be read back, or [`Simulation::render_to`] draws straight into a swapchain view.
pub mod display;
pub mod dye;
pub mod error;
pub mod gpu;
pub mod obstacles;
pub mod presets;
pub mod simulation;
pub mod slab;
pub mod solver;
pub mod types;

pub use display::DisplayState;
pub use dye::DyeImage;
pub use error::SimulationError;
pub use gpu::{FieldTexture, GpuContext, TexelFormat, TextureSpec};
pub use obstacles::{Ball, ObstacleState};
pub use simulation::{FrameClock, InputState, Phase, Simulation, SimulationBuilder};
pub use slab::{Slab, Surface};
pub use solver::{Impulse, SolverState, StepPlan};
pub use types::{
    AdapterProfile, Capability, FieldKind, FrameStatus, GpuMemoryMode, GpuOptions,
    GpuPowerPreference, PointerEvent,
};

pub use fluidconfig::{
    DisplayMode, FluidConfig, IndexedMode, InitialPreset, MouseImpulse, MouseMode, SourceImpulse,
};
pub use sources::{ImpulseSource, SourceError, SourceList};
