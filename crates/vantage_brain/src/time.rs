//! Frame timing
//!
//! [`FrameTime`] is what the host hands to every brain call. [`SimClock`]
//! builds those values from wall-clock deltas with a fixed-step
//! accumulator, for hosts that do not have a physics loop of their own.

use smallvec::SmallVec;

/// Default physics step, 50 Hz
pub const DEFAULT_FIXED_DELTA_TIME: f32 = 0.02;

/// Timing of the current host callback
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameTime {
    /// Rendered frame counter
    pub frame: u64,
    /// Scaled time since start, in seconds
    pub time: f32,
    pub delta_time: f32,
    pub unscaled_delta_time: f32,
    pub fixed_delta_time: f32,
    /// False when the simulation is paused or being edited
    pub is_playing: bool,
}

impl Default for FrameTime {
    fn default() -> Self {
        Self {
            frame: 0,
            time: 0.0,
            delta_time: 1.0 / 60.0,
            unscaled_delta_time: 1.0 / 60.0,
            fixed_delta_time: DEFAULT_FIXED_DELTA_TIME,
            is_playing: true,
        }
    }
}

impl FrameTime {
    pub fn new(frame: u64, time: f32, delta_time: f32) -> Self {
        Self {
            frame,
            time,
            delta_time,
            unscaled_delta_time: delta_time,
            ..Self::default()
        }
    }

    pub fn with_fixed_delta_time(mut self, fixed_delta_time: f32) -> Self {
        self.fixed_delta_time = fixed_delta_time;
        self
    }

    pub fn with_unscaled_delta_time(mut self, unscaled: f32) -> Self {
        self.unscaled_delta_time = unscaled;
        self
    }

    /// Same timing, outside of play mode
    pub fn paused(mut self) -> Self {
        self.is_playing = false;
        self
    }
}

/// Registry-wide time knobs for deterministic replay
///
/// Negative values mean unset.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TimeOverrides {
    /// Replaces every brain's delta time when set
    pub uniform_delta_time: f32,
    /// Replaces the host clock when set
    pub current_time: f32,
}

impl Default for TimeOverrides {
    fn default() -> Self {
        Self {
            uniform_delta_time: -1.0,
            current_time: -1.0,
        }
    }
}

impl TimeOverrides {
    pub fn uniform_delta_time(&self) -> Option<f32> {
        (self.uniform_delta_time >= 0.0).then_some(self.uniform_delta_time)
    }

    /// Delta time for this frame, honoring the override
    pub fn delta_time(&self, time: &FrameTime) -> f32 {
        self.uniform_delta_time().unwrap_or(time.delta_time)
    }

    /// Current time, honoring the override
    pub fn current_time(&self, time: &FrameTime) -> f32 {
        if self.current_time >= 0.0 {
            self.current_time
        } else {
            time.time
        }
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Timing for one rendered frame and the physics steps that precede it
#[derive(Clone, Debug)]
pub struct SimStep {
    pub fixed: SmallVec<[FrameTime; 4]>,
    pub frame: FrameTime,
}

/// Fixed-step accumulator for host loops
#[derive(Clone, Debug)]
pub struct SimClock {
    fixed_step: f32,
    time_scale: f32,
    max_steps: usize,
    accumulator: f32,
    frame: u64,
    time: f32,
    fixed_time: f32,
}

impl SimClock {
    pub fn new(fixed_step: f32) -> Self {
        Self {
            fixed_step: fixed_step.max(1e-4),
            time_scale: 1.0,
            max_steps: 8,
            accumulator: 0.0,
            frame: 0,
            time: 0.0,
            fixed_time: 0.0,
        }
    }

    pub fn with_time_scale(mut self, scale: f32) -> Self {
        self.time_scale = scale.max(0.0);
        self
    }

    /// Cap on physics steps per frame; excess accumulated time is dropped
    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps.max(1);
        self
    }

    pub fn set_time_scale(&mut self, scale: f32) {
        self.time_scale = scale.max(0.0);
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn time(&self) -> f32 {
        self.time
    }

    /// Advance by `real_dt` seconds of wall-clock time
    pub fn advance(&mut self, real_dt: f32) -> SimStep {
        let real_dt = real_dt.max(0.0);
        let scaled = real_dt * self.time_scale;
        self.frame += 1;
        self.time += scaled;
        self.accumulator += scaled;

        let mut fixed = SmallVec::new();
        while self.accumulator >= self.fixed_step && fixed.len() < self.max_steps {
            self.accumulator -= self.fixed_step;
            self.fixed_time += self.fixed_step;
            fixed.push(FrameTime {
                frame: self.frame,
                time: self.fixed_time,
                delta_time: self.fixed_step,
                unscaled_delta_time: real_dt,
                fixed_delta_time: self.fixed_step,
                is_playing: true,
            });
        }
        if fixed.len() == self.max_steps {
            self.accumulator = self.accumulator.min(self.fixed_step);
        }

        SimStep {
            fixed,
            frame: FrameTime {
                frame: self.frame,
                time: self.time,
                delta_time: scaled,
                unscaled_delta_time: real_dt,
                fixed_delta_time: self.fixed_step,
                is_playing: true,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_unset_by_default() {
        let overrides = TimeOverrides::default();
        let time = FrameTime::new(3, 1.5, 0.25);
        assert_eq!(overrides.uniform_delta_time(), None);
        assert_eq!(overrides.delta_time(&time), 0.25);
        assert_eq!(overrides.current_time(&time), 1.5);
    }

    #[test]
    fn test_overrides_take_precedence() {
        let overrides = TimeOverrides {
            uniform_delta_time: 0.0,
            current_time: 10.0,
        };
        let time = FrameTime::new(3, 1.5, 0.25);
        assert_eq!(overrides.delta_time(&time), 0.0);
        assert_eq!(overrides.current_time(&time), 10.0);
    }

    #[test]
    fn test_sim_clock_fixed_steps() {
        let mut clock = SimClock::new(0.5);
        let step = clock.advance(0.25);
        assert!(step.fixed.is_empty());
        assert_eq!(step.frame.frame, 1);

        let step = clock.advance(1.0);
        assert_eq!(step.fixed.len(), 2);
        assert_eq!(step.fixed[0].time, 0.5);
        assert_eq!(step.fixed[1].time, 1.0);
        assert_eq!(step.fixed[1].frame, 2);
        assert_eq!(step.frame.time, 1.25);
    }

    #[test]
    fn test_sim_clock_caps_steps() {
        let mut clock = SimClock::new(0.1).with_max_steps(2);
        let step = clock.advance(1.0);
        assert_eq!(step.fixed.len(), 2);
        // The backlog is dropped rather than replayed next frame
        let step = clock.advance(0.0);
        assert!(step.fixed.len() <= 1);
    }

    #[test]
    fn test_sim_clock_time_scale() {
        let mut clock = SimClock::new(0.5).with_time_scale(0.5);
        let step = clock.advance(1.0);
        assert_eq!(step.frame.delta_time, 0.5);
        assert_eq!(step.frame.unscaled_delta_time, 1.0);
        assert_eq!(step.fixed.len(), 1);
    }
}
