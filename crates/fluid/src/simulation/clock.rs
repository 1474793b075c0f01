use std::time::{Duration, Instant};

use tracing::debug;

/// Frame counter, simulated time and a rolling frames-per-second estimate.
#[derive(Debug, Clone)]
pub struct FrameClock {
    frame_count: u64,
    steps: u64,
    simulated_time: f32,
    sample_interval: Duration,
    frames_since_sample: u32,
    last_sample: Option<Instant>,
    frames_per_second: f32,
}

impl FrameClock {
    pub fn new(sample_interval: Duration) -> Self {
        Self {
            frame_count: 0,
            steps: 0,
            simulated_time: 0.0,
            sample_interval: sample_interval.max(Duration::from_millis(1)),
            frames_since_sample: 0,
            last_sample: None,
            frames_per_second: 0.0,
        }
    }

    /// Counts a frame at `now`; returns the fresh estimate when a sample window closes.
    pub fn tick(&mut self, now: Instant) -> Option<f32> {
        self.frame_count += 1;
        let Some(last_sample) = self.last_sample else {
            self.last_sample = Some(now);
            return None;
        };

        self.frames_since_sample += 1;
        let elapsed = now.saturating_duration_since(last_sample);
        if elapsed < self.sample_interval {
            return None;
        }
        self.frames_per_second = self.frames_since_sample as f32 / elapsed.as_secs_f32();
        self.frames_since_sample = 0;
        self.last_sample = Some(now);
        debug!(
            fps = self.frames_per_second.round(),
            frame_count = self.frame_count,
            steps = self.steps,
            time = self.simulated_time,
            "render stats"
        );
        Some(self.frames_per_second)
    }

    /// Records one solver step of length `dt`.
    pub fn advance(&mut self, dt: f32) {
        self.steps += 1;
        self.simulated_time += dt;
    }

    /// Restarts simulated time; frame counting and FPS sampling carry on.
    pub fn reset_time(&mut self) {
        self.steps = 0;
        self.simulated_time = 0.0;
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn simulated_time(&self) -> f32 {
        self.simulated_time
    }

    pub fn frames_per_second(&self) -> f32 {
        self.frames_per_second
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_frame_only_starts_the_window() {
        let mut clock = FrameClock::new(Duration::from_secs(1));
        assert_eq!(clock.tick(Instant::now()), None);
        assert_eq!(clock.frame_count(), 1);
        assert_eq!(clock.frames_per_second(), 0.0);
    }

    #[test]
    fn samples_once_per_interval() {
        let start = Instant::now();
        let mut clock = FrameClock::new(Duration::from_secs(1));
        clock.tick(start);
        let mut samples = Vec::new();
        for frame in 1..=60 {
            let now = start + Duration::from_millis(frame * 1000 / 30);
            if let Some(fps) = clock.tick(now) {
                samples.push(fps);
            }
        }
        assert_eq!(samples.len(), 2);
        assert!((samples[0] - 30.0).abs() < 0.5, "{samples:?}");
        assert_eq!(clock.frame_count(), 61);
    }

    #[test]
    fn advance_accumulates_simulated_time() {
        let mut clock = FrameClock::new(Duration::from_secs(1));
        clock.advance(0.125);
        clock.advance(0.125);
        assert_eq!(clock.steps(), 2);
        assert!((clock.simulated_time() - 0.25).abs() < 1e-6);
        clock.reset_time();
        assert_eq!(clock.steps(), 0);
        assert_eq!(clock.simulated_time(), 0.0);
    }
}
