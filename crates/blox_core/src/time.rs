//! Fixed-timestep frame clock.
//!
//! Movement constants are expressed per logical tick, so the simulation must
//! advance in whole ticks no matter how fast the display refreshes. Each frame
//! the host calls `begin_frame()`, then `while should_step()` runs one tick,
//! then `end_frame()`. Slow frames are caught up with extra ticks; a single
//! frame longer than `max_accumulator` is capped and reported.

use std::time::Instant;

const FPS_SAMPLE_COUNT: usize = 60;

pub struct FrameClock {
    pub fixed_dt: f64,
    pub max_accumulator: f64,
    accumulator: f64,
    pub total_time: f64,
    pub fixed_step_count: u64,
    pub frame_count: u64,
    pub steps_this_frame: u32,
    pub real_dt: f64,
    last_instant: Instant,
    pub interpolation_alpha: f64,

    fps_samples: [f64; FPS_SAMPLE_COUNT],
    fps_sample_index: usize,
    pub smoothed_fps: f64,
    pub smoothed_frame_time_ms: f64,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::with_tick_rate(60.0, 0.25)
    }

    pub fn with_tick_rate(tick_rate_hz: f64, max_accumulator: f64) -> Self {
        let fixed_dt = 1.0 / tick_rate_hz;
        Self {
            fixed_dt,
            max_accumulator,
            accumulator: 0.0,
            total_time: 0.0,
            fixed_step_count: 0,
            frame_count: 0,
            steps_this_frame: 0,
            real_dt: 0.0,
            last_instant: Instant::now(),
            interpolation_alpha: 0.0,
            fps_samples: [fixed_dt; FPS_SAMPLE_COUNT],
            fps_sample_index: 0,
            smoothed_fps: tick_rate_hz,
            smoothed_frame_time_ms: fixed_dt * 1000.0,
        }
    }

    /// Start a frame using the wall-clock time since the previous frame.
    pub fn begin_frame(&mut self) {
        let now = Instant::now();
        let real_dt = now.duration_since(self.last_instant).as_secs_f64();
        self.last_instant = now;
        self.begin_frame_with(real_dt);
    }

    /// Start a frame with an explicit delta. Headless hosts and tests use this
    /// to replay a simulated display rate deterministically.
    pub fn begin_frame_with(&mut self, real_dt: f64) {
        self.real_dt = real_dt.max(0.0);

        // Spiral-of-death cap
        if self.real_dt > self.max_accumulator {
            log::warn!(
                "Frame took {:.1}ms, capping accumulator to {}ms ({} ticks dropped)",
                self.real_dt * 1000.0,
                self.max_accumulator * 1000.0,
                ((self.real_dt - self.max_accumulator) / self.fixed_dt).floor()
            );
            self.real_dt = self.max_accumulator;
        }

        self.accumulator += self.real_dt;
        self.steps_this_frame = 0;
        self.frame_count += 1;

        // FPS smoothing
        self.fps_samples[self.fps_sample_index] = self.real_dt;
        self.fps_sample_index = (self.fps_sample_index + 1) % FPS_SAMPLE_COUNT;
        let avg_dt: f64 = self.fps_samples.iter().sum::<f64>() / FPS_SAMPLE_COUNT as f64;
        self.smoothed_frame_time_ms = avg_dt * 1000.0;
        self.smoothed_fps = if avg_dt > 0.0 { 1.0 / avg_dt } else { 0.0 };
    }

    pub fn should_step(&mut self) -> bool {
        if self.accumulator >= self.fixed_dt {
            self.accumulator -= self.fixed_dt;
            self.total_time += self.fixed_dt;
            self.fixed_step_count += 1;
            self.steps_this_frame += 1;
            true
        } else {
            false
        }
    }

    pub fn end_frame(&mut self) {
        self.interpolation_alpha = self.accumulator / self.fixed_dt;
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_frame(clock: &mut FrameClock, dt: f64) -> u32 {
        clock.begin_frame_with(dt);
        while clock.should_step() {}
        clock.end_frame();
        clock.steps_this_frame
    }

    #[test]
    fn matching_refresh_runs_one_tick_per_frame() {
        let mut clock = FrameClock::with_tick_rate(60.0, 0.25);
        let mut total = 0;
        for _ in 0..120 {
            total += run_frame(&mut clock, 1.0 / 60.0 + 1e-9);
        }
        assert_eq!(total, 120);
        assert_eq!(clock.fixed_step_count, 120);
    }

    #[test]
    fn slow_display_catches_up_with_extra_ticks() {
        let mut clock = FrameClock::with_tick_rate(60.0, 0.25);
        let steps = run_frame(&mut clock, 1.0 / 30.0 + 1e-9);
        assert_eq!(steps, 2);
    }

    #[test]
    fn fast_display_runs_zero_ticks_on_some_frames() {
        let mut clock = FrameClock::with_tick_rate(60.0, 0.25);
        let mut frames_without_tick = 0;
        let mut total = 0;
        for _ in 0..144 {
            let steps = run_frame(&mut clock, 1.0 / 144.0);
            if steps == 0 {
                frames_without_tick += 1;
            }
            total += steps;
        }
        assert!(frames_without_tick > 0);
        assert!((59..=60).contains(&total));
    }

    #[test]
    fn long_frame_is_capped() {
        let mut clock = FrameClock::with_tick_rate(60.0, 0.25);
        let steps = run_frame(&mut clock, 2.0);
        assert_eq!(clock.real_dt, 0.25);
        // 0.25s at 60Hz is 15 ticks, give or take float drift on the last one.
        assert!((14..=15).contains(&steps));
    }

    #[test]
    fn interpolation_alpha_reports_leftover_fraction() {
        let mut clock = FrameClock::with_tick_rate(10.0, 1.0);
        run_frame(&mut clock, 0.15);
        assert!((clock.interpolation_alpha - 0.5).abs() < 1e-6);
    }

    #[test]
    fn negative_delta_is_ignored() {
        let mut clock = FrameClock::new();
        assert_eq!(run_frame(&mut clock, -1.0), 0);
        assert_eq!(clock.real_dt, 0.0);
    }
}
