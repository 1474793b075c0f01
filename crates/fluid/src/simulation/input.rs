use fluidconfig::{FluidConfig, InputConfig, MouseImpulse, MouseMode, SourceImpulse};

use crate::solver::{Impulse, PointerSample};
use crate::types::PointerEvent;

/// What a pointer event asks the simulation to do beyond updating pointer state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum PointerAction {
    None,
    PlaceBall([f32; 2]),
    AddSource([f32; 2]),
    Fling([f32; 2]),
}

/// Pointer state, input modes and the view the pointer lives in.
#[derive(Debug, Clone, PartialEq)]
pub struct InputState {
    pub mouse_mode: MouseMode,
    pub mouse_impulse: MouseImpulse,
    pub source_impulse: SourceImpulse,
    config: InputConfig,
    view_size: [f32; 2],
    pressed: bool,
    position: [f32; 2],
    previous: [f32; 2],
    slingshot_anchor: Option<[f32; 2]>,
}

impl InputState {
    pub fn from_config(config: &InputConfig, view_width: u32, view_height: u32) -> Self {
        Self {
            mouse_mode: config.mouse_mode,
            mouse_impulse: config.mouse_impulse,
            source_impulse: config.source_impulse,
            config: *config,
            view_size: [view_width.max(1) as f32, view_height.max(1) as f32],
            pressed: false,
            position: [0.0; 2],
            previous: [0.0; 2],
            slingshot_anchor: None,
        }
    }

    pub fn set_view_size(&mut self, width: u32, height: u32) {
        self.view_size = [width.max(1) as f32, height.max(1) as f32];
    }

    pub fn view_size(&self) -> [f32; 2] {
        self.view_size
    }

    pub fn is_pressed(&self) -> bool {
        self.pressed
    }

    /// Pointer position in normalized space.
    pub fn position(&self) -> [f32; 2] {
        self.position
    }

    pub fn impulse_value(&self) -> [f32; 3] {
        self.config.impulse_value
    }

    pub fn source_radius(&self) -> f32 {
        self.config.source_radius
    }

    /// Maps view pixels (top-left origin) into normalized space (y up).
    pub fn normalize(&self, event: PointerEvent) -> [f32; 2] {
        let [width, height] = self.view_size;
        [event.x / width * 2.0 - 1.0, 1.0 - event.y / height * 2.0]
    }

    pub fn inside_view(&self, event: PointerEvent) -> bool {
        let [width, height] = self.view_size;
        (0.0..=width).contains(&event.x) && (0.0..=height).contains(&event.y)
    }

    pub(crate) fn press(&mut self, event: PointerEvent) -> PointerAction {
        let point = self.normalize(event);
        self.pressed = true;
        self.position = point;
        self.previous = point;
        let inside = self.inside_view(event);
        match self.mouse_mode {
            MouseMode::Impulse => PointerAction::None,
            MouseMode::PlaceBall if inside => PointerAction::PlaceBall(point),
            MouseMode::AddSource if inside => PointerAction::AddSource(point),
            MouseMode::Slingshot => {
                self.slingshot_anchor = inside.then_some(point);
                PointerAction::None
            }
            _ => PointerAction::None,
        }
    }

    /// Moves are ignored while the pointer is up.
    pub(crate) fn move_to(&mut self, event: PointerEvent) -> PointerAction {
        if !self.pressed {
            return PointerAction::None;
        }
        self.previous = self.position;
        self.position = self.normalize(event);
        match self.mouse_mode {
            MouseMode::PlaceBall => PointerAction::PlaceBall(self.position),
            _ => PointerAction::None,
        }
    }

    pub(crate) fn release(&mut self, event: PointerEvent) -> PointerAction {
        let point = self.normalize(event);
        self.position = point;
        self.previous = point;
        self.pressed = false;
        match (self.mouse_mode, self.slingshot_anchor.take()) {
            (MouseMode::Slingshot, Some(anchor)) => {
                PointerAction::Fling([anchor[0] - point[0], anchor[1] - point[1]])
            }
            _ => PointerAction::None,
        }
    }

    /// Splat radius for the live pointer; the wide scale applies to drag and burst.
    pub fn pointer_radius(&self) -> f32 {
        let scale = if self.mouse_impulse.uses_big_scale() {
            self.config.big_scale
        } else {
            self.config.small_scale
        };
        self.config.epsilon * scale
    }

    /// The live pointer impulse for this step, if the pointer is down in impulse mode.
    pub(crate) fn pointer_impulse(&self) -> Option<Impulse> {
        if !self.pressed || self.mouse_mode != MouseMode::Impulse {
            return None;
        }
        let sample = PointerSample {
            position: self.position,
            previous: self.previous,
            radius: self.pointer_radius(),
            value: self.config.impulse_value,
            drag_scale: self.config.drag_scale,
            burst_strength: self.config.burst_strength,
        };
        Impulse::from_pointer(self.mouse_impulse, &sample)
    }

    /// Called once a step has consumed the pointer motion.
    pub(crate) fn settle(&mut self) {
        self.previous = self.position;
    }
}

impl From<&FluidConfig> for InputState {
    fn from(config: &FluidConfig) -> Self {
        Self::from_config(&config.input, config.grid.width, config.grid.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(mode: MouseMode) -> InputState {
        let mut config = InputConfig::default();
        config.mouse_mode = mode;
        InputState::from_config(&config, 200, 100)
    }

    #[test]
    fn normalizes_with_y_up() {
        let state = input(MouseMode::Impulse);
        assert_eq!(state.normalize(PointerEvent::new(0.0, 0.0)), [-1.0, 1.0]);
        assert_eq!(state.normalize(PointerEvent::new(100.0, 50.0)), [0.0, 0.0]);
        assert_eq!(state.normalize(PointerEvent::new(200.0, 100.0)), [1.0, -1.0]);
    }

    #[test]
    fn impulse_only_while_pressed() {
        let mut state = input(MouseMode::Impulse);
        assert!(state.pointer_impulse().is_none());
        state.press(PointerEvent::new(100.0, 50.0));
        assert!(matches!(
            state.pointer_impulse(),
            Some(Impulse::VelocityTemperature { .. })
        ));
        state.release(PointerEvent::new(100.0, 50.0));
        assert!(state.pointer_impulse().is_none());
    }

    #[test]
    fn impulse_off_yields_nothing() {
        let mut state = input(MouseMode::Impulse);
        state.mouse_impulse = MouseImpulse::Off;
        state.press(PointerEvent::new(10.0, 10.0));
        assert!(state.pointer_impulse().is_none());
    }

    #[test]
    fn drag_tracks_previous_until_settled() {
        let mut state = input(MouseMode::Impulse);
        state.mouse_impulse = MouseImpulse::Drag;
        state.press(PointerEvent::new(100.0, 50.0));
        state.move_to(PointerEvent::new(150.0, 50.0));
        match state.pointer_impulse() {
            Some(Impulse::Drag {
                position, previous, ..
            }) => {
                assert_eq!(previous, [0.0, 0.0]);
                assert_eq!(position, [0.5, 0.0]);
            }
            other => panic!("expected drag, got {other:?}"),
        }
        state.settle();
        assert_eq!(state.previous, state.position);
    }

    #[test]
    fn moves_ignored_while_released() {
        let mut state = input(MouseMode::PlaceBall);
        assert_eq!(
            state.move_to(PointerEvent::new(20.0, 20.0)),
            PointerAction::None
        );
        assert_eq!(state.position(), [0.0, 0.0]);
    }

    #[test]
    fn place_ball_follows_pointer() {
        let mut state = input(MouseMode::PlaceBall);
        assert_eq!(
            state.press(PointerEvent::new(100.0, 50.0)),
            PointerAction::PlaceBall([0.0, 0.0])
        );
        assert_eq!(
            state.move_to(PointerEvent::new(200.0, 0.0)),
            PointerAction::PlaceBall([1.0, 1.0])
        );
    }

    #[test]
    fn presses_outside_view_are_ignored() {
        let mut state = input(MouseMode::AddSource);
        assert_eq!(
            state.press(PointerEvent::new(-5.0, 50.0)),
            PointerAction::None
        );
        assert_eq!(
            state.press(PointerEvent::new(50.0, 50.0)),
            PointerAction::AddSource([-0.5, 0.0])
        );
    }

    #[test]
    fn slingshot_pulls_from_anchor() {
        let mut state = input(MouseMode::Slingshot);
        state.press(PointerEvent::new(100.0, 50.0));
        assert_eq!(
            state.release(PointerEvent::new(50.0, 75.0)),
            PointerAction::Fling([0.5, 0.5])
        );
        // Anchor is consumed by the release.
        assert_eq!(
            state.release(PointerEvent::new(0.0, 0.0)),
            PointerAction::None
        );
    }

    #[test]
    fn slingshot_press_outside_clears_anchor() {
        let mut state = input(MouseMode::Slingshot);
        state.press(PointerEvent::new(100.0, 50.0));
        state.press(PointerEvent::new(500.0, 50.0));
        assert_eq!(
            state.release(PointerEvent::new(50.0, 50.0)),
            PointerAction::None
        );
    }

    #[test]
    fn pointer_radius_widens_for_drag() {
        let mut state = input(MouseMode::Impulse);
        let small = state.pointer_radius();
        state.mouse_impulse = MouseImpulse::Burst;
        assert!(state.pointer_radius() > small);
    }
}
