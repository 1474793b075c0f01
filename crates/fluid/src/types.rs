use std::fmt;

/// Adapter power preference forwarded to `wgpu`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GpuPowerPreference {
    Low,
    #[default]
    High,
}

/// Memory allocation strategy hint forwarded to `wgpu`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GpuMemoryMode {
    Balanced,
    #[default]
    Performance,
}

/// Knobs used when the simulation creates its own headless device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GpuOptions {
    pub power: GpuPowerPreference,
    pub memory: GpuMemoryMode,
    pub force_fallback_adapter: bool,
}

/// Summary of the adapter a context was created from.
#[derive(Debug, Clone)]
pub struct AdapterProfile {
    pub name: String,
    pub backend: wgpu::Backend,
    pub device_type: wgpu::DeviceType,
    pub driver: String,
}

impl AdapterProfile {
    pub fn from_wgpu(info: &wgpu::AdapterInfo) -> Self {
        Self {
            name: info.name.clone(),
            backend: info.backend,
            device_type: info.device_type,
            driver: info.driver.clone(),
        }
    }

    pub fn is_software(&self) -> bool {
        matches!(self.device_type, wgpu::DeviceType::Cpu)
    }
}

/// Graphics features the solver cannot run without.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Rgba32Float textures usable as render targets and copy sources.
    FloatTextures,
    /// Linear filtering of 32-bit float textures.
    FloatLinearFiltering,
    /// Renderable, filterable Rgba16Float textures.
    HalfFloatTextures,
    /// Fragment derivatives, unavailable on the lowest shader model tier.
    StandardDerivatives,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Capability::FloatTextures => "float textures",
            Capability::FloatLinearFiltering => "float linear filtering",
            Capability::HalfFloatTextures => "half-float textures",
            Capability::StandardDerivatives => "standard derivatives",
        };
        f.write_str(name)
    }
}

/// Solved fields that can be uploaded or read back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    /// `x, y` velocity, `z` temperature, `w` pressure.
    Velocity,
    /// Dye concentration.
    Density,
    /// Auxiliary dye image.
    Image,
    /// `x, y` surface velocity, `w` occupancy.
    Obstacles,
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldKind::Velocity => "velocity",
            FieldKind::Density => "density",
            FieldKind::Image => "image",
            FieldKind::Obstacles => "obstacles",
        };
        f.write_str(name)
    }
}

/// Pointer position in view pixels, origin at the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    pub x: f32,
    pub y: f32,
}

impl PointerEvent {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Outcome of a single [`crate::Simulation::tick`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStatus {
    /// One solver step ran and the display was refreshed.
    Stepped,
    /// The solver was paused; only the display was refreshed.
    Paused,
    /// `initialize` has not been called yet.
    NotInitialized,
    /// The graphics context is gone; nothing was issued.
    ContextLost,
    /// A pass failed; the frame was abandoned and the next tick retries.
    StepFailed,
}
