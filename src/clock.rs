use crate::config;
use crate::phase::{normalize_progress, TimeOfDay};

/// Client-side day/night clock. Progress is `[0, 1)`, 0.0 being the start of
/// dawn; the server's value can be pushed in with `set_progress`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DayNightClock {
    pub cycle_length_s: f32,
    progress: f32,
    pub paused: bool,
}

impl Default for DayNightClock {
    fn default() -> Self {
        Self::new(config::DAY_CYCLE_LENGTH, config::INITIAL_CYCLE_PROGRESS)
    }
}

impl DayNightClock {
    pub fn new(cycle_length_s: f32, progress: f32) -> Self {
        Self {
            cycle_length_s: cycle_length_s.max(f32::EPSILON),
            progress: normalize_progress(progress),
            paused: false,
        }
    }

    pub fn advance(&mut self, dt: f32) {
        if self.paused {
            return;
        }
        self.progress = normalize_progress(self.progress + dt / self.cycle_length_s);
    }

    pub fn progress(&self) -> f32 {
        self.progress
    }

    pub fn set_progress(&mut self, progress: f32) {
        self.progress = normalize_progress(progress);
    }

    pub fn time_of_day(&self) -> TimeOfDay {
        TimeOfDay::from_progress(self.progress)
    }

    /// Noon-centered daylight factor in `[0, 1]` for scene tinting.
    pub fn daylight(&self) -> f32 {
        let phase = (self.progress - 0.2) * std::f32::consts::TAU;
        (phase.sin() * 0.5 + 0.5).clamp(0.0, 1.0)
    }
}
