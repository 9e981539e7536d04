// Progress meters read by the HUD and the phase controller

pub const TOTAL_SCREWS: usize = 5;

/// Pointer movement at or below this many pixels is treated as jitter.
pub const CUT_NOISE_PX: f32 = 2.0;
/// Cut progress gained per pixel of sawing.
pub const CUT_RATE: f32 = 0.003;

/// Screws taken out so far. Only ever counts up.
#[derive(Debug, Default, Clone, Copy)]
pub struct ScrewCounter {
    removed: usize,
}

impl ScrewCounter {
    /// Count one removal. Returns true exactly once: on the removal that clears the last screw.
    pub fn record_removal(&mut self) -> bool {
        if self.removed >= TOTAL_SCREWS {
            return false;
        }
        self.removed += 1;
        self.removed == TOTAL_SCREWS
    }

    pub fn removed(&self) -> usize {
        self.removed
    }

    pub fn is_complete(&self) -> bool {
        self.removed >= TOTAL_SCREWS
    }
}

/// How far the adductor has been sawn through, in [0, 1].
#[derive(Debug, Default, Clone, Copy)]
pub struct CutMeter {
    progress: f32,
}

impl CutMeter {
    /// Feed one sawing sample of `distance` pixels.
    /// Returns true if the sample counted (it exceeded the noise threshold).
    pub fn saw(&mut self, distance: f32) -> bool {
        if distance.is_nan() || distance <= CUT_NOISE_PX {
            return false;
        }
        self.progress = (self.progress + distance * CUT_RATE).min(1.0);
        true
    }

    pub fn progress(&self) -> f32 {
        self.progress
    }

    pub fn percent(&self) -> f32 {
        (self.progress * 100.0).min(100.0)
    }

    pub fn is_full(&self) -> bool {
        self.progress >= 1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_screw_completes_exactly_once() {
        let mut screws = ScrewCounter::default();
        let completions: Vec<bool> = (0..8).map(|_| screws.record_removal()).collect();
        assert_eq!(completions, vec![false, false, false, false, true, false, false, false]);
        assert_eq!(screws.removed(), TOTAL_SCREWS);
        assert!(screws.is_complete());
    }

    #[test]
    fn jitter_does_not_cut() {
        let mut meter = CutMeter::default();
        assert!(!meter.saw(0.0));
        assert!(!meter.saw(2.0));
        assert!(!meter.saw(f32::NAN));
        assert_eq!(meter.progress(), 0.0);
        assert!(meter.saw(2.5));
        assert!((meter.progress() - 0.0075).abs() < 1e-6);
    }

    #[test]
    fn meter_is_monotonic_and_clamped() {
        let mut meter = CutMeter::default();
        let mut last = 0.0;
        for d in [3.0, 50.0, 1.0, 120.0, 0.5, 400.0, 10_000.0] {
            meter.saw(d);
            assert!(meter.progress() >= last);
            assert!(meter.progress() <= 1.0);
            last = meter.progress();
        }
        assert!(meter.is_full());
        assert_eq!(meter.percent(), 100.0);
    }
}
