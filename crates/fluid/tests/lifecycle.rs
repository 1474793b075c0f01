mod common;

use common::{gpu_context, simulation, test_config, GRID};
use fluid::{
    DisplayMode, DyeImage, FieldKind, FrameStatus, InitialPreset, MouseMode, Phase,
    PointerEvent, Simulation, SimulationError, SourceError,
};

#[test]
fn tick_before_initialize_does_nothing() {
    let Some(context) = gpu_context() else {
        return;
    };
    let mut sim = match Simulation::new(context, test_config(InitialPreset::Empty, true)) {
        Ok(sim) => sim,
        Err(err) => {
            eprintln!("GPU cannot run the solver ({err}); skipping test.");
            return;
        }
    };
    assert_eq!(sim.phase(), Phase::Uninitialized);
    assert_eq!(sim.tick(), FrameStatus::NotInitialized);
    assert!(sim.advance_step().is_err());
}

#[test]
fn ticks_step_pause_and_render() {
    let Some(mut sim) = simulation(test_config(InitialPreset::HotAndColdRectangles, true)) else {
        return;
    };
    assert_eq!(sim.phase(), Phase::Initialized);
    assert_eq!(sim.tick(), FrameStatus::Stepped);
    assert_eq!(sim.phase(), Phase::Running);
    assert_eq!(sim.clock().steps(), 1);

    assert!(sim.toggle_pause());
    assert_eq!(sim.tick(), FrameStatus::Paused);
    assert_eq!(sim.clock().steps(), 1);
    assert_eq!(sim.clock().frame_count(), 2);

    let pixels = sim.read_display().expect("read display");
    assert_eq!(pixels.len(), (GRID * GRID) as usize);
    assert!(pixels.iter().all(|pixel| pixel[3] == 1.0));
}

#[test]
fn every_display_mode_renders() {
    let Some(mut sim) = simulation(test_config(InitialPreset::Wavey, true)) else {
        return;
    };
    for mode in <DisplayMode as fluid::IndexedMode>::ALL {
        sim.set_display_mode(*mode);
        assert_eq!(sim.tick(), FrameStatus::Stepped, "mode {mode}");
    }
}

#[test]
fn pending_reset_runs_on_next_tick() {
    let Some(mut sim) = simulation(test_config(InitialPreset::Empty, true)) else {
        return;
    };
    sim.add_source([0.0, 0.0], [1.0, 0.0, 5.0]).expect("add source");
    sim.request_reset();
    assert!(sim.needs_reset());
    sim.tick();
    assert!(!sim.needs_reset());
    assert!(sim.sources().is_empty());
    assert_eq!(sim.clock().steps(), 0);
}

#[test]
fn source_rejections_are_reported() {
    let mut config = test_config(InitialPreset::Empty, true);
    config.input.max_sources = 1;
    let Some(mut sim) = simulation(config) else {
        return;
    };
    assert!(matches!(
        sim.pop_source(),
        Err(SimulationError::SourceRejected(SourceError::Empty))
    ));
    sim.add_source([0.5, 0.5], [0.0, 1.0, 0.0]).expect("first source");
    assert!(matches!(
        sim.add_source([-0.5, 0.5], [0.0, 1.0, 0.0]),
        Err(SimulationError::SourceRejected(SourceError::AtCapacity { capacity: 1 }))
    ));
    assert_eq!(sim.remove_sources_near([0.5, 0.5], 0.01), 1);
}

#[test]
fn pointer_adds_sources_in_add_source_mode() {
    let Some(mut sim) = simulation(test_config(InitialPreset::Empty, true)) else {
        return;
    };
    sim.set_view_size(200, 100);
    sim.set_mouse_mode(MouseMode::AddSource);
    sim.on_pointer_down(PointerEvent::new(150.0, 25.0));
    sim.on_pointer_up(PointerEvent::new(150.0, 25.0));
    let source = sim.sources().get(0).expect("source added");
    assert_eq!(source.position, [0.5, 0.5]);
}

#[test]
fn pointer_presses_past_capacity_are_dropped() {
    let Some(mut sim) = simulation(test_config(InitialPreset::Empty, true)) else {
        return;
    };
    sim.set_mouse_mode(MouseMode::AddSource);
    let capacity = sim.sources().capacity();
    for step in 0..capacity + 2 {
        let x = 4.0 + step as f32 * 6.0;
        sim.on_pointer_down(PointerEvent::new(x, 32.0));
        sim.on_pointer_up(PointerEvent::new(x, 32.0));
    }
    assert_eq!(sim.sources().len(), capacity);
    assert_eq!(sim.tick(), FrameStatus::Stepped);
}

#[test]
fn context_loss_suspends_until_restored() {
    let Some(mut sim) = simulation(test_config(InitialPreset::Empty, true)) else {
        return;
    };
    sim.add_source([0.0, 0.0], [1.0, 0.0, 0.0]).expect("add source");
    sim.mark_context_lost("test");
    assert_eq!(sim.tick(), FrameStatus::ContextLost);
    assert!(sim.read_display().is_err());

    let Some(context) = gpu_context() else {
        return;
    };
    sim.restore_context(context).expect("restore");
    assert_eq!(sim.phase(), Phase::Initialized);
    assert_eq!(sim.sources().len(), 1);
    assert_eq!(sim.tick(), FrameStatus::Stepped);
}

#[test]
fn failed_restore_keeps_sources_and_can_be_retried() {
    let mut config = test_config(InitialPreset::Empty, true);
    config.obstacles.ball = true;
    let Some(mut sim) = simulation(config) else {
        return;
    };
    sim.add_source([0.0, 0.0], [1.0, 0.0, 0.0]).expect("add source");
    sim.add_source([0.5, -0.5], [0.0, 0.0, 2.0]).expect("add source");
    sim.set_mouse_mode(MouseMode::PlaceBall);
    sim.on_pointer_down(PointerEvent::new(16.0, 16.0));
    sim.on_pointer_up(PointerEvent::new(16.0, 16.0));
    let obstacles = sim.obstacles().clone();

    sim.mark_context_lost("test");
    let limit = sim.context().max_texture_dimension();
    let oversized = DyeImage::from_rgba8(limit + 1, 1, vec![255; (limit as usize + 1) * 4])
        .expect("dye image");
    sim.set_dye_image(oversized).expect("stored while suspended");

    let Some(context) = gpu_context() else {
        return;
    };
    assert!(sim.restore_context(context).is_err());
    assert_eq!(sim.phase(), Phase::ContextLost);
    assert_eq!(sim.sources().len(), 2);
    assert_eq!(sim.obstacles(), &obstacles);
    assert_eq!(sim.tick(), FrameStatus::ContextLost);

    sim.set_dye_image(DyeImage::checkerboard(GRID, GRID, 4))
        .expect("stored while suspended");
    let Some(context) = gpu_context() else {
        return;
    };
    sim.restore_context(context).expect("restore");
    assert_eq!(sim.phase(), Phase::Initialized);
    assert_eq!(sim.sources().len(), 2);
    assert_eq!(sim.obstacles(), &obstacles);
}

#[test]
fn rejected_dye_image_keeps_the_previous_one() {
    let Some(mut sim) = simulation(test_config(InitialPreset::Empty, true)) else {
        return;
    };
    let before = sim.read_field(FieldKind::Image).expect("read image");
    let limit = sim.context().max_texture_dimension();
    let oversized = DyeImage::from_rgba8(1, limit + 1, vec![0; (limit as usize + 1) * 4])
        .expect("dye image");
    assert!(sim.set_dye_image(oversized).is_err());
    sim.reset().expect("reset with the previous dye");
    let after = sim.read_field(FieldKind::Image).expect("read image");
    assert_eq!(before, after);
}
