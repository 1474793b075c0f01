//! Procedural initial conditions applied on reset.
use fluidconfig::InitialPreset;
use rand::prelude::*;

const HOT: f32 = 10.0;
const COLD: f32 = -10.0;

/// Host-side texels for the fields a preset initialises, row 0 first.
#[derive(Debug, Clone, PartialEq)]
pub struct PresetFields {
    pub velocity: Vec<[f32; 4]>,
    pub density: Vec<[f32; 4]>,
}

pub fn generate(preset: InitialPreset, width: u32, height: u32, seed: u64) -> PresetFields {
    let width = width.max(1);
    let height = height.max(1);
    let count = width as usize * height as usize;
    let mut fields = PresetFields {
        velocity: vec![[0.0; 4]; count],
        density: vec![[0.0; 4]; count],
    };

    match preset {
        InitialPreset::Empty => {}
        InitialPreset::HotAndColdRectangles => {
            for_each_cell(width, height, |index, [x, y]| {
                if (-0.6..=-0.2).contains(&x) && (-0.8..=-0.4).contains(&y) {
                    fields.velocity[index][2] = HOT;
                    fields.density[index] = [1.0, 0.45, 0.1, 1.0];
                } else if (0.2..=0.6).contains(&x) && (0.4..=0.8).contains(&y) {
                    fields.velocity[index][2] = COLD;
                    fields.density[index] = [0.1, 0.45, 1.0, 1.0];
                }
            });
        }
        InitialPreset::ColdInkBlot => {
            let centre = [0.0, 0.4];
            let radius = 0.25;
            for_each_cell(width, height, |index, [x, y]| {
                let dx = x - centre[0];
                let dy = y - centre[1];
                if dx * dx + dy * dy <= radius * radius {
                    fields.velocity[index][2] = COLD * 0.5;
                    fields.density[index] = [0.15, 0.2, 0.9, 1.0];
                }
            });
        }
        InitialPreset::Wavey => {
            for_each_cell(width, height, |index, [x, y]| {
                let r = (x * x + y * y).sqrt();
                let wave = (r * 18.0).cos() * (-3.0 * r).exp();
                fields.velocity[index][2] = wave * HOT * 0.5;
                let ink = 0.5 + 0.5 * wave;
                fields.density[index] = [ink, ink * 0.6, 1.0 - ink, 1.0];
            });
        }
        InitialPreset::Random => {
            let mut rng = StdRng::seed_from_u64(seed);
            for index in 0..count {
                fields.velocity[index] = [
                    rng.gen_range(-1.0..1.0),
                    rng.gen_range(-1.0..1.0),
                    rng.gen_range(-1.0..1.0),
                    0.0,
                ];
                fields.density[index] = [rng.gen(), rng.gen(), rng.gen(), 1.0];
            }
        }
    }

    tracing::debug!(%preset, width, height, seed, "generated initial fields");
    fields
}

/// Visits every cell with its row-major index and normalized centre.
fn for_each_cell(width: u32, height: u32, mut visit: impl FnMut(usize, [f32; 2])) {
    for row in 0..height {
        for col in 0..width {
            let x = (col as f32 + 0.5) / width as f32 * 2.0 - 1.0;
            let y = 1.0 - (row as f32 + 0.5) / height as f32 * 2.0;
            visit((row * width + col) as usize, [x, y]);
        }
    }
}

/// Row-major index of the cell containing a normalized point.
pub fn cell_index(width: u32, height: u32, point: [f32; 2]) -> usize {
    let col = (((point[0] + 1.0) * 0.5 * width as f32) as i64).clamp(0, width as i64 - 1);
    let row = (((1.0 - point[1]) * 0.5 * height as f32) as i64).clamp(0, height as i64 - 1);
    (row * width as i64 + col) as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use fluidconfig::IndexedMode;

    #[test]
    fn empty_is_exactly_zero() {
        let fields = generate(InitialPreset::Empty, 16, 8, 7);
        assert_eq!(fields.velocity.len(), 128);
        assert!(fields.velocity.iter().all(|texel| *texel == [0.0; 4]));
        assert!(fields.density.iter().all(|texel| *texel == [0.0; 4]));
    }

    #[test]
    fn every_preset_fills_the_grid() {
        for preset in InitialPreset::ALL {
            let fields = generate(*preset, 20, 10, 1);
            assert_eq!(fields.velocity.len(), 200);
            assert_eq!(fields.density.len(), 200);
            assert!(fields
                .velocity
                .iter()
                .flatten()
                .chain(fields.density.iter().flatten())
                .all(|value| value.is_finite()));
        }
    }

    #[test]
    fn random_is_seeded() {
        let a = generate(InitialPreset::Random, 8, 8, 42);
        let b = generate(InitialPreset::Random, 8, 8, 42);
        let c = generate(InitialPreset::Random, 8, 8, 43);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn rectangles_are_hot_low_and_cold_high() {
        let fields = generate(InitialPreset::HotAndColdRectangles, 64, 64, 0);
        let hot = cell_index(64, 64, [-0.4, -0.6]);
        let cold = cell_index(64, 64, [0.4, 0.6]);
        assert_eq!(fields.velocity[hot][2], HOT);
        assert_eq!(fields.velocity[cold][2], COLD);
        assert_eq!(fields.velocity[cell_index(64, 64, [0.0, 0.0])][2], 0.0);
    }

    #[test]
    fn cell_index_puts_row_zero_at_top() {
        assert_eq!(cell_index(4, 4, [-1.0, 1.0]), 0);
        assert_eq!(cell_index(4, 4, [0.99, -0.99]), 15);
        assert_eq!(cell_index(4, 4, [5.0, -5.0]), 15);
    }
}
