//! Typed configuration for the fluid simulator.
//!
//! A configuration document is TOML with a mandatory `version = 1` key and five optional
//! sections. Every field carries a default, so the smallest valid document is a single line:
//!
//! ```toml
//! version = 1
//!
//! [grid]
//! width = 256
//! height = 256
//!
//! [input]
//! mouse_impulse = "drag"      # or the legacy index, e.g. 3
//!
//! [display]
//! mode = "sepia-density"
//! fps_sample_interval = "500ms"
//! ```
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

mod modes;

pub use modes::{DisplayMode, IndexedMode, InitialPreset, MouseImpulse, MouseMode, SourceImpulse};

/// Largest grid edge accepted; keeps every slab inside common texture limits.
pub const MAX_GRID_EDGE: u32 = 8192;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
    #[error("failed to read configuration {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct FluidConfig {
    pub version: u32,
    #[serde(default)]
    pub grid: GridConfig,
    #[serde(default)]
    pub solver: SolverConfig,
    #[serde(default)]
    pub obstacles: ObstacleConfig,
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub display: DisplayConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct GridConfig {
    pub width: u32,
    pub height: u32,
}

/// Scalar solver parameters shared by every pass.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SolverConfig {
    pub timestep: f32,
    pub cell_size: f32,
    pub velocity_dissipation: f32,
    pub temperature_dissipation: f32,
    pub density_dissipation: f32,
    pub image_dissipation: f32,
    pub ambient_temperature: f32,
    /// Buoyancy coefficient applied to the temperature excess.
    pub sigma: f32,
    /// Weight coefficient applied to dye density.
    pub kappa: f32,
    pub jacobi_iterations: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ObstacleConfig {
    pub walls: bool,
    pub ball: bool,
    pub border_offset: f32,
    pub ball_radius: f32,
    pub gravity: f32,
    pub ball_position: [f32; 2],
    pub ball_velocity: [f32; 2],
    pub slingshot_gain: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct InputConfig {
    pub mouse_mode: MouseMode,
    pub mouse_impulse: MouseImpulse,
    pub source_impulse: SourceImpulse,
    /// Base splat radius in normalized units.
    pub epsilon: f32,
    pub small_scale: f32,
    pub big_scale: f32,
    pub drag_scale: f32,
    pub burst_strength: f32,
    pub max_sources: usize,
    pub source_radius: f32,
    /// `(vx, vy, temperature)` injected by sources and click impulses.
    pub impulse_value: [f32; 3],
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub mode: DisplayMode,
    pub preset: InitialPreset,
    #[serde(deserialize_with = "deserialize_duration")]
    pub fps_sample_interval: Duration,
    pub seed: u64,
}

impl Default for FluidConfig {
    fn default() -> Self {
        Self {
            version: 1,
            grid: GridConfig::default(),
            solver: SolverConfig::default(),
            obstacles: ObstacleConfig::default(),
            input: InputConfig::default(),
            display: DisplayConfig::default(),
        }
    }
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            width: 512,
            height: 512,
        }
    }
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            timestep: 0.125,
            cell_size: 1.25,
            velocity_dissipation: 0.99,
            temperature_dissipation: 0.99,
            density_dissipation: 0.999,
            image_dissipation: 0.999,
            ambient_temperature: 0.0,
            sigma: 1.0,
            kappa: 0.05,
            jacobi_iterations: 20,
        }
    }
}

impl Default for ObstacleConfig {
    fn default() -> Self {
        Self {
            walls: true,
            ball: true,
            border_offset: 0.025,
            ball_radius: 0.1,
            gravity: -0.2,
            ball_position: [0.0, 0.5],
            ball_velocity: [0.1, 0.0],
            slingshot_gain: 4.0,
        }
    }
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            mouse_mode: MouseMode::Impulse,
            mouse_impulse: MouseImpulse::VelocityTemperature,
            source_impulse: SourceImpulse::VelocityTemperature,
            epsilon: 0.05,
            small_scale: 1.0,
            big_scale: 2.0,
            drag_scale: 1.0,
            burst_strength: 2.0,
            max_sources: 5,
            source_radius: 0.1,
            impulse_value: [0.0, 1.0, 10.0],
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            mode: DisplayMode::Ink,
            preset: InitialPreset::HotAndColdRectangles,
            fps_sample_interval: Duration::from_secs(1),
            seed: 7,
        }
    }
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    struct Visitor;
    impl<'de> de::Visitor<'de> for Visitor {
        type Value = Duration;

        fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            formatter.write_str("a duration as number of seconds or human-readable string")
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            humantime::parse_duration(v)
                .map_err(|err| E::custom(format!("invalid duration '{v}': {err}")))
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Duration::from_secs(v))
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v < 0 {
                return Err(E::custom("duration must be non-negative"));
            }
            Ok(Duration::from_secs(v as u64))
        }

        fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v.is_nan() || v.is_sign_negative() {
                return Err(E::custom("duration must be non-negative"));
            }
            Ok(Duration::from_secs_f64(v))
        }
    }

    deserializer.deserialize_any(Visitor)
}

impl FluidConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let raw: FluidConfig = toml::from_str(input)?;
        raw.validate()?;
        Ok(raw)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    /// Grid aspect ratio, width over height.
    pub fn aspect(&self) -> f32 {
        self.grid.width as f32 / self.grid.height.max(1) as f32
    }

    /// Splat radius used for the live pointer under the current mouse impulse.
    pub fn pointer_radius(&self) -> f32 {
        let scale = if self.input.mouse_impulse.uses_big_scale() {
            self.input.big_scale
        } else {
            self.input.small_scale
        };
        self.input.epsilon * scale
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version != 1 {
            return Err(ConfigError::Invalid(format!(
                "unsupported config version {}; expected 1",
                self.version
            )));
        }

        let grid = &self.grid;
        if grid.width == 0 || grid.height == 0 {
            return Err(ConfigError::Invalid(format!(
                "grid must be non-empty, got {}x{}",
                grid.width, grid.height
            )));
        }
        if grid.width > MAX_GRID_EDGE || grid.height > MAX_GRID_EDGE {
            return Err(ConfigError::Invalid(format!(
                "grid {}x{} exceeds the {MAX_GRID_EDGE} texel limit",
                grid.width, grid.height
            )));
        }

        let solver = &self.solver;
        ensure_positive("solver.timestep", solver.timestep)?;
        ensure_positive("solver.cell_size", solver.cell_size)?;
        for (name, value) in [
            ("solver.velocity_dissipation", solver.velocity_dissipation),
            ("solver.temperature_dissipation", solver.temperature_dissipation),
            ("solver.density_dissipation", solver.density_dissipation),
            ("solver.image_dissipation", solver.image_dissipation),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Invalid(format!(
                    "{name} must lie in [0, 1], got {value}"
                )));
            }
        }
        ensure_finite("solver.ambient_temperature", solver.ambient_temperature)?;
        ensure_finite("solver.sigma", solver.sigma)?;
        ensure_finite("solver.kappa", solver.kappa)?;
        if solver.jacobi_iterations == 0 {
            return Err(ConfigError::Invalid(
                "solver.jacobi_iterations must be at least 1".into(),
            ));
        }

        let obstacles = &self.obstacles;
        if !(0.0..0.5).contains(&obstacles.border_offset) {
            return Err(ConfigError::Invalid(format!(
                "obstacles.border_offset must lie in [0, 0.5), got {}",
                obstacles.border_offset
            )));
        }
        ensure_positive("obstacles.ball_radius", obstacles.ball_radius)?;
        if obstacles.ball_radius >= 1.0 - obstacles.border_offset {
            return Err(ConfigError::Invalid(format!(
                "obstacles.ball_radius {} does not fit inside the walls",
                obstacles.ball_radius
            )));
        }
        ensure_finite("obstacles.gravity", obstacles.gravity)?;
        ensure_finite("obstacles.slingshot_gain", obstacles.slingshot_gain)?;

        let input = &self.input;
        ensure_positive("input.epsilon", input.epsilon)?;
        ensure_positive("input.small_scale", input.small_scale)?;
        ensure_positive("input.big_scale", input.big_scale)?;
        ensure_finite("input.drag_scale", input.drag_scale)?;
        ensure_finite("input.burst_strength", input.burst_strength)?;
        ensure_positive("input.source_radius", input.source_radius)?;
        if input.max_sources == 0 {
            return Err(ConfigError::Invalid(
                "input.max_sources must be at least 1".into(),
            ));
        }

        if self.display.fps_sample_interval.is_zero() {
            return Err(ConfigError::Invalid(
                "display.fps_sample_interval must be greater than zero".into(),
            ));
        }

        Ok(())
    }
}

fn ensure_finite(name: &str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::Invalid(format!("{name} must be finite")))
    }
}

fn ensure_positive(name: &str, value: f32) -> Result<(), ConfigError> {
    ensure_finite(name, value)?;
    if value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Invalid(format!(
            "{name} must be greater than zero, got {value}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"
version = 1

[grid]
width = 256
height = 128

[solver]
timestep = 0.1
jacobi_iterations = 40
kappa = 0.1

[obstacles]
ball = false
border_offset = 0.05

[input]
mouse_mode = "slingshot"
mouse_impulse = 3
source_impulse = "off"
max_sources = 8
impulse_value = [1.0, 0.0, 5.0]

[display]
mode = "sepia_density"
preset = 4
fps_sample_interval = "250ms"
seed = 42
"#;

    #[test]
    fn parses_sample_config() {
        let config = FluidConfig::from_toml_str(SAMPLE).expect("parse config");
        assert_eq!(config.grid.width, 256);
        assert_eq!(config.grid.height, 128);
        assert_eq!(config.solver.jacobi_iterations, 40);
        assert!((config.solver.kappa - 0.1).abs() < f32::EPSILON);
        assert!(!config.obstacles.ball);
        assert!(config.obstacles.walls);
        assert_eq!(config.input.mouse_mode, MouseMode::Slingshot);
        assert_eq!(config.input.mouse_impulse, MouseImpulse::Drag);
        assert_eq!(config.input.source_impulse, SourceImpulse::Off);
        assert_eq!(config.input.max_sources, 8);
        assert_eq!(config.display.mode, DisplayMode::SepiaDensity);
        assert_eq!(config.display.preset, InitialPreset::Empty);
        assert_eq!(config.display.fps_sample_interval, Duration::from_millis(250));
        assert_eq!(config.display.seed, 42);
        assert!((config.aspect() - 2.0).abs() < f32::EPSILON);
    }

    #[test]
    fn version_only_document_uses_defaults() {
        let config = FluidConfig::from_toml_str("version = 1").expect("parse config");
        assert_eq!(config, FluidConfig::default());
        assert_eq!(config.grid.width, 512);
        assert_eq!(config.solver.jacobi_iterations, 20);
        assert_eq!(config.input.max_sources, 5);
        assert_eq!(config.display.fps_sample_interval, Duration::from_secs(1));
    }

    #[test]
    fn numeric_durations_are_seconds() {
        let config = FluidConfig::from_toml_str(
            r#"
version = 1
[display]
fps_sample_interval = 2
"#,
        )
        .expect("parse config");
        assert_eq!(config.display.fps_sample_interval, Duration::from_secs(2));
    }

    #[test]
    fn rejects_unknown_version() {
        let err = FluidConfig::from_toml_str("version = 2").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_out_of_range_mode_index() {
        let err = FluidConfig::from_toml_str(
            r#"
version = 1
[display]
mode = 9
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn rejects_unknown_mode_name() {
        let err = FluidConfig::from_toml_str(
            r#"
version = 1
[input]
mouse_mode = "teleport"
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("teleport"));
    }

    #[test]
    fn rejects_dissipation_above_one() {
        let err = FluidConfig::from_toml_str(
            r#"
version = 1
[solver]
density_dissipation = 1.5
"#,
        )
        .unwrap_err();
        match err {
            ConfigError::Invalid(message) => assert!(message.contains("density_dissipation")),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn rejects_zero_jacobi_iterations() {
        let err = FluidConfig::from_toml_str(
            r#"
version = 1
[solver]
jacobi_iterations = 0
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_ball_larger_than_walls() {
        let err = FluidConfig::from_toml_str(
            r#"
version = 1
[obstacles]
ball_radius = 0.99
border_offset = 0.1
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn pointer_radius_follows_impulse_scale() {
        let mut config = FluidConfig::default();
        config.input.mouse_impulse = MouseImpulse::Velocity;
        assert!((config.pointer_radius() - 0.05).abs() < 1e-6);
        config.input.mouse_impulse = MouseImpulse::Drag;
        assert!((config.pointer_radius() - 0.1).abs() < 1e-6);
    }

    #[test]
    fn loads_from_path() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(SAMPLE.as_bytes()).expect("write sample");
        let config = FluidConfig::from_path(file.path()).expect("load config");
        assert_eq!(config.grid.width, 256);
    }

    #[test]
    fn missing_path_reports_io_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let err = FluidConfig::from_path(dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
