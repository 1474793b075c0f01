use fluidconfig::{MouseImpulse, SourceImpulse};
use sources::ImpulseSource;

use crate::gpu::PassUniforms;

/// A single injection issued by the impulse pass.
///
/// Positions and radii are in normalized space. Velocities are in solver
/// units, temperatures are added to the velocity field's `z` channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Impulse {
    /// Pass-through; keeps the pass count constant when nothing is injected.
    Inert,
    Temperature {
        position: [f32; 2],
        radius: f32,
        temperature: f32,
    },
    Velocity {
        position: [f32; 2],
        radius: f32,
        velocity: [f32; 2],
    },
    VelocityTemperature {
        position: [f32; 2],
        radius: f32,
        value: [f32; 3],
    },
    /// Pushes fluid along the pointer's motion since the previous frame.
    Drag {
        position: [f32; 2],
        previous: [f32; 2],
        radius: f32,
        scale: f32,
        temperature: f32,
    },
    /// Radial outward push that fades towards the rim.
    Divergence {
        position: [f32; 2],
        radius: f32,
        strength: f32,
        temperature: f32,
    },
}

/// Pointer state needed to lower a [`MouseImpulse`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerSample {
    pub position: [f32; 2],
    pub previous: [f32; 2],
    pub radius: f32,
    pub value: [f32; 3],
    pub drag_scale: f32,
    pub burst_strength: f32,
}

impl Impulse {
    /// Lowers a persistent source; `None` when sources are switched off.
    pub fn from_source(source: &ImpulseSource, mode: SourceImpulse) -> Option<Self> {
        let position = source.position;
        let radius = source.radius;
        let [vx, vy, temperature] = source.impulse;
        let impulse = match mode {
            SourceImpulse::Temperature => Impulse::Temperature {
                position,
                radius,
                temperature,
            },
            SourceImpulse::Velocity => Impulse::Velocity {
                position,
                radius,
                velocity: [vx, vy],
            },
            SourceImpulse::VelocityTemperature => Impulse::VelocityTemperature {
                position,
                radius,
                value: source.impulse,
            },
            SourceImpulse::Off => return None,
        };
        Some(impulse)
    }

    /// Lowers the live pointer; `None` when pointer impulses are switched off.
    pub fn from_pointer(mode: MouseImpulse, sample: &PointerSample) -> Option<Self> {
        let PointerSample {
            position,
            previous,
            radius,
            value,
            drag_scale,
            burst_strength,
        } = *sample;
        let impulse = match mode {
            MouseImpulse::Temperature => Impulse::Temperature {
                position,
                radius,
                temperature: value[2],
            },
            MouseImpulse::Velocity => Impulse::Velocity {
                position,
                radius,
                velocity: [value[0], value[1]],
            },
            MouseImpulse::VelocityTemperature => Impulse::VelocityTemperature {
                position,
                radius,
                value,
            },
            MouseImpulse::Drag => Impulse::Drag {
                position,
                previous,
                radius,
                scale: drag_scale,
                temperature: 0.0,
            },
            MouseImpulse::DragTemperature => Impulse::Drag {
                position,
                previous,
                radius,
                scale: drag_scale,
                temperature: value[2],
            },
            MouseImpulse::Burst => Impulse::Divergence {
                position,
                radius,
                strength: burst_strength,
                temperature: value[2],
            },
            MouseImpulse::Off => return None,
        };
        Some(impulse)
    }

    /// Selector understood by the impulse shader.
    pub(crate) fn mode_code(&self) -> i32 {
        match self {
            Impulse::Inert => -1,
            Impulse::Temperature { .. } => 0,
            Impulse::Velocity { .. } => 1,
            Impulse::VelocityTemperature { .. } => 2,
            Impulse::Drag { .. } => 3,
            Impulse::Divergence { .. } => 4,
        }
    }

    pub(crate) fn write_uniforms(&self, uniforms: &mut PassUniforms) {
        uniforms.flags[0] = self.mode_code();
        match *self {
            Impulse::Inert => {}
            Impulse::Temperature {
                position,
                radius,
                temperature,
            } => {
                uniforms.source = [position[0], position[1], position[0], position[1]];
                uniforms.forces[2] = radius;
                uniforms.impulse = [0.0, 0.0, temperature, 0.0];
            }
            Impulse::Velocity {
                position,
                radius,
                velocity,
            } => {
                uniforms.source = [position[0], position[1], position[0], position[1]];
                uniforms.forces[2] = radius;
                uniforms.impulse = [velocity[0], velocity[1], 0.0, 0.0];
            }
            Impulse::VelocityTemperature {
                position,
                radius,
                value,
            } => {
                uniforms.source = [position[0], position[1], position[0], position[1]];
                uniforms.forces[2] = radius;
                uniforms.impulse = [value[0], value[1], value[2], 0.0];
            }
            Impulse::Drag {
                position,
                previous,
                radius,
                scale,
                temperature,
            } => {
                uniforms.source = [position[0], position[1], previous[0], previous[1]];
                uniforms.forces[2] = radius;
                uniforms.impulse = [0.0, 0.0, temperature, scale];
            }
            Impulse::Divergence {
                position,
                radius,
                strength,
                temperature,
            } => {
                uniforms.source = [position[0], position[1], position[0], position[1]];
                uniforms.forces[2] = radius;
                uniforms.forces[3] = strength;
                uniforms.impulse = [0.0, 0.0, temperature, 0.0];
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PointerSample {
        PointerSample {
            position: [0.25, -0.5],
            previous: [0.0, -0.5],
            radius: 0.1,
            value: [0.0, 1.0, 10.0],
            drag_scale: 1.5,
            burst_strength: 2.0,
        }
    }

    #[test]
    fn sources_off_lowers_to_nothing() {
        let source = ImpulseSource::new([0.0, 0.0], [1.0, 0.0, 0.0], 0.1);
        assert_eq!(Impulse::from_source(&source, SourceImpulse::Off), None);
    }

    #[test]
    fn source_velocity_drops_temperature() {
        let source = ImpulseSource::new([0.5, 0.5], [1.0, 2.0, 3.0], 0.2);
        let impulse = Impulse::from_source(&source, SourceImpulse::Velocity).expect("impulse");
        assert_eq!(
            impulse,
            Impulse::Velocity {
                position: [0.5, 0.5],
                radius: 0.2,
                velocity: [1.0, 2.0],
            }
        );
    }

    #[test]
    fn pointer_modes_map_to_solver_impulses() {
        let sample = sample();
        assert_eq!(Impulse::from_pointer(MouseImpulse::Off, &sample), None);
        assert!(matches!(
            Impulse::from_pointer(MouseImpulse::Drag, &sample),
            Some(Impulse::Drag { temperature, .. }) if temperature == 0.0
        ));
        assert!(matches!(
            Impulse::from_pointer(MouseImpulse::DragTemperature, &sample),
            Some(Impulse::Drag { temperature, .. }) if temperature == 10.0
        ));
        assert!(matches!(
            Impulse::from_pointer(MouseImpulse::Burst, &sample),
            Some(Impulse::Divergence { strength, .. }) if strength == 2.0
        ));
    }

    #[test]
    fn mode_codes_are_distinct() {
        let sample = sample();
        let mut codes: Vec<i32> = [
            MouseImpulse::Temperature,
            MouseImpulse::Velocity,
            MouseImpulse::VelocityTemperature,
            MouseImpulse::Drag,
            MouseImpulse::Burst,
        ]
        .iter()
        .filter_map(|mode| Impulse::from_pointer(*mode, &sample))
        .map(|impulse| impulse.mode_code())
        .collect();
        codes.push(Impulse::Inert.mode_code());
        codes.sort_unstable();
        assert_eq!(codes, vec![-1, 0, 1, 2, 3, 4]);
    }

    #[test]
    fn drag_uniforms_carry_previous_position() {
        let impulse = Impulse::from_pointer(MouseImpulse::Drag, &sample()).expect("impulse");
        let mut uniforms = PassUniforms::default();
        impulse.write_uniforms(&mut uniforms);
        assert_eq!(uniforms.flags[0], 3);
        assert_eq!(uniforms.source, [0.25, -0.5, 0.0, -0.5]);
        assert_eq!(uniforms.forces[2], 0.1);
        assert_eq!(uniforms.impulse[3], 1.5);
    }

    #[test]
    fn inert_only_sets_mode() {
        let mut uniforms = PassUniforms::default();
        Impulse::Inert.write_uniforms(&mut uniforms);
        assert_eq!(uniforms.flags[0], -1);
        assert_eq!(uniforms.source, [0.0; 4]);
    }
}
