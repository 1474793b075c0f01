#![allow(dead_code)]

use fluid::{FluidConfig, GpuContext, GpuOptions, InitialPreset, Simulation};
use tracing_subscriber::EnvFilter;

pub const GRID: u32 = 64;

/// A headless context, or `None` (with a note) when the machine has no usable GPU.
pub fn gpu_context() -> Option<GpuContext> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();

    match GpuContext::headless(&GpuOptions::default()) {
        Ok(context) => Some(context),
        Err(err) => {
            eprintln!("no usable GPU adapter ({err}); skipping test.");
            None
        }
    }
}

/// 64x64 grid, ball off, walls as given.
pub fn test_config(preset: InitialPreset, walls: bool) -> FluidConfig {
    let mut config = FluidConfig::default();
    config.grid.width = GRID;
    config.grid.height = GRID;
    config.display.preset = preset;
    config.obstacles.ball = false;
    config.obstacles.walls = walls;
    config
}

/// An initialized simulation, or `None` when the GPU harness is unavailable.
pub fn simulation(config: FluidConfig) -> Option<Simulation> {
    let context = gpu_context()?;
    let mut simulation = match Simulation::new(context, config) {
        Ok(simulation) => simulation,
        Err(err) if err.is_initialization_failure() => {
            eprintln!("GPU cannot run the solver ({err}); skipping test.");
            return None;
        }
        Err(err) => panic!("failed to build simulation: {err}"),
    };
    simulation.initialize().expect("initialize simulation");
    Some(simulation)
}

pub fn index(point: [f32; 2]) -> usize {
    fluid::presets::cell_index(GRID, GRID, point)
}

/// Mean absolute central-difference divergence over interior cells, row 0 at the top.
pub fn mean_abs_divergence(velocity: &[[f32; 4]], cell_size: f32) -> f32 {
    let size = GRID as usize;
    let at = |col: usize, row: usize| velocity[row * size + col];
    let mut total = 0.0;
    let mut count = 0;
    for row in 2..size - 2 {
        for col in 2..size - 2 {
            let east = at(col + 1, row)[0];
            let west = at(col - 1, row)[0];
            let north = at(col, row - 1)[1];
            let south = at(col, row + 1)[1];
            total += ((east - west + north - south) / (2.0 * cell_size)).abs();
            count += 1;
        }
    }
    total / count as f32
}
