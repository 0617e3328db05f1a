use crate::config::ProgressConfig;

/// Converts the host's raw tick progress into the alpha shared by every interpolator this frame.
///
/// The accepted alpha only ever grows within a tick: a raw value that does not exceed the last accepted
/// one by more than the deadband is rejected, which also filters out non-monotonic host readings.
#[derive(Debug, Clone)]
pub struct ProgressClock {
    alpha: f32,
    last_accepted: f32,
    deadband: f32,
    delay: f32,
    accepted_this_tick: u32,
}

impl ProgressClock {
    pub fn new(config: &ProgressConfig) -> Self {
        Self {
            alpha: 0.0,
            last_accepted: 0.0,
            deadband: config.deadband.max(0.0),
            delay: config.delay.clamp(0.0, 1.0),
            accepted_this_tick: 0,
        }
    }

    pub fn tick_progress(&self) -> f32 {
        self.alpha
    }

    pub fn accepted_this_tick(&self) -> u32 {
        self.accepted_this_tick
    }

    pub fn deadband(&self) -> f32 {
        self.deadband
    }

    pub fn on_tick(&mut self) {
        self.alpha = 0.0;
        self.last_accepted = 0.0;
        self.accepted_this_tick = 0;
    }

    /// Returns the newly accepted alpha, or `None` when this frame should not interpolate.
    pub fn on_pre_frame(&mut self, raw_progress: f32, paused: bool) -> Option<f32> {
        if paused {
            return None;
        }
        let raw = if raw_progress.is_nan() { 0.0 } else { raw_progress };
        let candidate = (raw - self.delay).clamp(0.0, 1.0);
        if candidate - self.last_accepted <= self.deadband {
            return None;
        }
        self.alpha = candidate;
        self.last_accepted = candidate;
        self.accepted_this_tick += 1;
        Some(candidate)
    }

    pub fn clear(&mut self) {
        self.on_tick();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clock() -> ProgressClock {
        ProgressClock::new(&ProgressConfig::default())
    }

    #[test]
    fn raw_progress_is_clamped() {
        let mut clock = clock();
        assert_eq!(clock.on_pre_frame(1.7, false), Some(1.0));
        clock.on_tick();
        assert_eq!(clock.on_pre_frame(-0.3, false), None);
        assert_eq!(clock.tick_progress(), 0.0);
    }

    #[test]
    fn paused_clock_is_frozen() {
        let mut clock = clock();
        assert_eq!(clock.on_pre_frame(0.4, false), Some(0.4));
        assert_eq!(clock.on_pre_frame(0.8, true), None);
        assert_eq!(clock.tick_progress(), 0.4);
    }

    #[test]
    fn alpha_never_decreases_within_a_tick() {
        let mut clock = clock();
        let mut last = 0.0;
        for raw in [0.1, 0.3, 0.25, 0.5, 0.49, 0.9, 0.2, 1.0] {
            clock.on_pre_frame(raw, false);
            assert!(clock.tick_progress() >= last);
            last = clock.tick_progress();
        }
        assert_eq!(last, 1.0);
    }

    #[test]
    fn changes_inside_the_deadband_are_rejected() {
        let mut clock = clock();
        assert_eq!(clock.on_pre_frame(0.5, false), Some(0.5));
        assert_eq!(clock.on_pre_frame(0.50005, false), None);
        assert_eq!(clock.tick_progress(), 0.5);
        assert!(clock.on_pre_frame(0.51, false).is_some());
        assert_eq!(clock.accepted_this_tick(), 2);
    }

    #[test]
    fn tick_resets_progress() {
        let mut clock = clock();
        clock.on_pre_frame(0.9, false);
        clock.on_tick();
        assert_eq!(clock.tick_progress(), 0.0);
        assert_eq!(clock.on_pre_frame(0.2, false), Some(0.2));
    }

    #[test]
    fn nan_progress_is_treated_as_zero() {
        let mut clock = clock();
        assert_eq!(clock.on_pre_frame(f32::NAN, false), None);
        assert_eq!(clock.tick_progress(), 0.0);
    }

    #[test]
    fn delay_shifts_the_accepted_alpha() {
        let mut clock = ProgressClock::new(&ProgressConfig { deadband: 0.0001, delay: 0.25 });
        assert_eq!(clock.on_pre_frame(0.2, false), None);
        assert_eq!(clock.on_pre_frame(0.75, false), Some(0.5));
    }
}
