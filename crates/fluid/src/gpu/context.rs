use crossbeam_channel::{Receiver, Sender};
use wgpu::{TextureFormatFeatureFlags, TextureUsages};

use crate::error::SimulationError;
use crate::types::{AdapterProfile, Capability, GpuMemoryMode, GpuOptions, GpuPowerPreference};

/// Owned device/queue pair plus the signalling needed to notice context loss.
pub struct GpuContext {
    _instance: Option<wgpu::Instance>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    adapter_profile: AdapterProfile,
    lost: Receiver<String>,
}

impl GpuContext {
    /// Creates an instance and device without any presentation surface.
    pub fn headless(options: &GpuOptions) -> Result<Self, SimulationError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            flags: wgpu::InstanceFlags::default(),
            memory_budget_thresholds: wgpu::MemoryBudgetThresholds::default(),
            backend_options: wgpu::BackendOptions::default(),
        });

        let power_preference = match options.power {
            GpuPowerPreference::Low => wgpu::PowerPreference::LowPower,
            GpuPowerPreference::High => wgpu::PowerPreference::HighPerformance,
        };
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference,
            compatible_surface: None,
            force_fallback_adapter: options.force_fallback_adapter,
        }))
        .map_err(|err| SimulationError::NoAdapter(err.to_string()))?;

        let mut context = Self::from_adapter(&adapter, options)?;
        context._instance = Some(instance);
        Ok(context)
    }

    /// Creates a device on an adapter the host already selected, e.g. one
    /// compatible with its window surface.
    pub fn from_adapter(
        adapter: &wgpu::Adapter,
        options: &GpuOptions,
    ) -> Result<Self, SimulationError> {
        let info = adapter.get_info();
        let adapter_profile = AdapterProfile::from_wgpu(&info);
        tracing::debug!(
            name = %adapter_profile.name,
            backend = ?adapter_profile.backend,
            device_type = ?adapter_profile.device_type,
            is_software = adapter_profile.is_software(),
            "selected GPU adapter"
        );

        let required_features = probe_capabilities(adapter)?;

        let memory_hints = match options.memory {
            GpuMemoryMode::Balanced => wgpu::MemoryHints::MemoryUsage,
            GpuMemoryMode::Performance => wgpu::MemoryHints::Performance,
        };

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("fluid device"),
            required_features,
            required_limits: adapter.limits(),
            memory_hints,
            trace: wgpu::Trace::default(),
        }))
        .map_err(|err| SimulationError::ResourceAllocation(format!("GPU device: {err}")))?;

        let (sender, lost) = crossbeam_channel::unbounded();
        install_error_handlers(&device, sender);

        Ok(Self {
            _instance: None,
            device,
            queue,
            adapter_profile,
            lost,
        })
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub fn adapter_profile(&self) -> &AdapterProfile {
        &self.adapter_profile
    }

    /// Returns the device-lost message if the driver reported one since the last call.
    pub fn take_lost_signal(&self) -> Option<String> {
        self.lost.try_recv().ok()
    }

    /// Largest texture edge the device accepts.
    pub fn max_texture_dimension(&self) -> u32 {
        self.device.limits().max_texture_dimension_2d
    }
}

fn install_error_handlers(device: &wgpu::Device, sender: Sender<String>) {
    device.on_uncaptured_error(Box::new(|err| {
        tracing::warn!(error = %err, "uncaptured GPU error");
    }));
    device.set_device_lost_callback(move |reason, message| {
        tracing::warn!(?reason, %message, "GPU device lost");
        let _ = sender.send(format!("{reason:?}: {message}"));
    });
}

/// Checks every capability the solver relies on and returns the features to request.
pub(crate) fn probe_capabilities(
    adapter: &wgpu::Adapter,
) -> Result<wgpu::Features, SimulationError> {
    let float = adapter.get_texture_format_features(wgpu::TextureFormat::Rgba32Float);
    let float_usages =
        TextureUsages::RENDER_ATTACHMENT | TextureUsages::TEXTURE_BINDING | TextureUsages::COPY_SRC;
    if !float.allowed_usages.contains(float_usages) {
        return Err(SimulationError::MissingCapability(Capability::FloatTextures));
    }

    if !adapter
        .features()
        .contains(wgpu::Features::FLOAT32_FILTERABLE)
    {
        return Err(SimulationError::MissingCapability(
            Capability::FloatLinearFiltering,
        ));
    }

    let half = adapter.get_texture_format_features(wgpu::TextureFormat::Rgba16Float);
    if !half
        .allowed_usages
        .contains(TextureUsages::RENDER_ATTACHMENT | TextureUsages::TEXTURE_BINDING)
        || !half.flags.contains(TextureFormatFeatureFlags::FILTERABLE)
    {
        return Err(SimulationError::MissingCapability(
            Capability::HalfFloatTextures,
        ));
    }

    if adapter.get_downlevel_capabilities().shader_model == wgpu::ShaderModel::Sm2 {
        return Err(SimulationError::MissingCapability(
            Capability::StandardDerivatives,
        ));
    }

    Ok(wgpu::Features::FLOAT32_FILTERABLE)
}
