use std::fmt;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

/// Selector axes that can be written either by name or by their legacy integer index.
pub trait IndexedMode: Sized + Copy + 'static {
    /// Every variant in index order.
    const ALL: &'static [Self];

    /// Stable kebab-case name used in configuration files.
    fn name(self) -> &'static str;

    fn index(self) -> usize {
        Self::ALL
            .iter()
            .position(|candidate| candidate.name() == self.name())
            .unwrap_or(0)
    }

    fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    fn from_name(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_ascii_lowercase().replace('_', "-");
        Self::ALL
            .iter()
            .copied()
            .find(|candidate| candidate.name() == normalized)
    }
}

/// Visualisation selected for the display pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DisplayMode {
    Temperature,
    Ink,
    Velocity,
    VelocityDensity,
    TemperatureDensity,
    SepiaDensity,
    SignedDensity,
    DensityTest,
    Image,
}

impl DisplayMode {
    /// The auxiliary dye image only needs advecting while something other than
    /// the raw temperature view is on screen.
    pub fn advects_image(self) -> bool {
        !matches!(self, DisplayMode::Temperature)
    }
}

impl IndexedMode for DisplayMode {
    const ALL: &'static [Self] = &[
        DisplayMode::Temperature,
        DisplayMode::Ink,
        DisplayMode::Velocity,
        DisplayMode::VelocityDensity,
        DisplayMode::TemperatureDensity,
        DisplayMode::SepiaDensity,
        DisplayMode::SignedDensity,
        DisplayMode::DensityTest,
        DisplayMode::Image,
    ];

    fn name(self) -> &'static str {
        match self {
            DisplayMode::Temperature => "temperature",
            DisplayMode::Ink => "ink",
            DisplayMode::Velocity => "velocity",
            DisplayMode::VelocityDensity => "velocity-density",
            DisplayMode::TemperatureDensity => "temperature-density",
            DisplayMode::SepiaDensity => "sepia-density",
            DisplayMode::SignedDensity => "signed-density",
            DisplayMode::DensityTest => "density-test",
            DisplayMode::Image => "image",
        }
    }
}

/// What a held pointer injects while the mouse mode is `Impulse`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum MouseImpulse {
    Temperature,
    Velocity,
    VelocityTemperature,
    Drag,
    DragTemperature,
    Off,
    Burst,
}

impl MouseImpulse {
    /// Pointer-following impulses use the wide splat radius.
    pub fn uses_big_scale(self) -> bool {
        matches!(
            self,
            MouseImpulse::Drag | MouseImpulse::DragTemperature | MouseImpulse::Burst
        )
    }
}

impl IndexedMode for MouseImpulse {
    const ALL: &'static [Self] = &[
        MouseImpulse::Temperature,
        MouseImpulse::Velocity,
        MouseImpulse::VelocityTemperature,
        MouseImpulse::Drag,
        MouseImpulse::DragTemperature,
        MouseImpulse::Off,
        MouseImpulse::Burst,
    ];

    fn name(self) -> &'static str {
        match self {
            MouseImpulse::Temperature => "temperature",
            MouseImpulse::Velocity => "velocity",
            MouseImpulse::VelocityTemperature => "velocity-temperature",
            MouseImpulse::Drag => "drag",
            MouseImpulse::DragTemperature => "drag-temperature",
            MouseImpulse::Off => "off",
            MouseImpulse::Burst => "burst",
        }
    }
}

/// Which channels the persistent impulse sources feed every step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceImpulse {
    Temperature,
    Velocity,
    VelocityTemperature,
    Off,
}

impl IndexedMode for SourceImpulse {
    const ALL: &'static [Self] = &[
        SourceImpulse::Temperature,
        SourceImpulse::Velocity,
        SourceImpulse::VelocityTemperature,
        SourceImpulse::Off,
    ];

    fn name(self) -> &'static str {
        match self {
            SourceImpulse::Temperature => "temperature",
            SourceImpulse::Velocity => "velocity",
            SourceImpulse::VelocityTemperature => "velocity-temperature",
            SourceImpulse::Off => "off",
        }
    }
}

/// How pointer presses are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum MouseMode {
    Impulse,
    PlaceBall,
    AddSource,
    Slingshot,
}

impl IndexedMode for MouseMode {
    const ALL: &'static [Self] = &[
        MouseMode::Impulse,
        MouseMode::PlaceBall,
        MouseMode::AddSource,
        MouseMode::Slingshot,
    ];

    fn name(self) -> &'static str {
        match self {
            MouseMode::Impulse => "impulse",
            MouseMode::PlaceBall => "place-ball",
            MouseMode::AddSource => "add-source",
            MouseMode::Slingshot => "slingshot",
        }
    }
}

/// Procedural initial condition applied on reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum InitialPreset {
    HotAndColdRectangles,
    ColdInkBlot,
    Wavey,
    Random,
    Empty,
}

impl IndexedMode for InitialPreset {
    const ALL: &'static [Self] = &[
        InitialPreset::HotAndColdRectangles,
        InitialPreset::ColdInkBlot,
        InitialPreset::Wavey,
        InitialPreset::Random,
        InitialPreset::Empty,
    ];

    fn name(self) -> &'static str {
        match self {
            InitialPreset::HotAndColdRectangles => "hot-and-cold-rectangles",
            InitialPreset::ColdInkBlot => "cold-ink-blot",
            InitialPreset::Wavey => "wavey",
            InitialPreset::Random => "random",
            InitialPreset::Empty => "empty",
        }
    }
}

macro_rules! display_by_name {
    ($($ty:ty),*) => {
        $(
            impl fmt::Display for $ty {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(self.name())
                }
            }

            impl<'de> Deserialize<'de> for $ty {
                fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
                where
                    D: Deserializer<'de>,
                {
                    deserialize_mode(deserializer)
                }
            }
        )*
    };
}

display_by_name!(DisplayMode, MouseImpulse, SourceImpulse, MouseMode, InitialPreset);

fn deserialize_mode<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: IndexedMode,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Helper {
        Str(String),
        Num(i64),
    }

    match Helper::deserialize(deserializer)? {
        Helper::Str(raw) => T::from_name(&raw).ok_or_else(|| {
            let expected: Vec<&str> = T::ALL.iter().map(|mode| mode.name()).collect();
            de::Error::custom(format!(
                "invalid value '{raw}'; expected one of {}",
                expected.join(", ")
            ))
        }),
        Helper::Num(value) => {
            if value < 0 {
                return Err(de::Error::custom("mode index must be non-negative"));
            }
            T::from_index(value as usize).ok_or_else(|| {
                de::Error::custom(format!(
                    "mode index {value} out of range (0..{})",
                    T::ALL.len()
                ))
            })
        }
    }
}
