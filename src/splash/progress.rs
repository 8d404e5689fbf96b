use serde::{Deserialize, Serialize};

/// Headroom kept below the maximum so a bar never reads as finished while
/// the splash is still up. Tiny maximums use a thousandth of `max` instead.
const FINISH_GAP: f64 = 0.001;

/// Marquee advance per indeterminate tick, as a fraction of the track.
const MARQUEE_STEP: f64 = 0.02;

/// How the progress bar behaves.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressMode {
    /// The bar shows `value / max`.
    #[default]
    Determinate,
    /// A block sweeps across the track until the splash closes.
    Indeterminate,
}

/// Progress bar configuration.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressSpec {
    /// Value that corresponds to a full bar. Non-positive values are replaced by 100.
    pub max: f64,
    /// Determinate or indeterminate.
    pub mode: ProgressMode,
}

impl Default for ProgressSpec {
    fn default() -> Self {
        Self {
            max: 100.0,
            mode: ProgressMode::Determinate,
        }
    }
}

/// What a toolkit needs to paint the bar.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ProgressView {
    /// Filled share of the track in `[0, 1)`.
    pub fraction: f64,
    /// Determinate or indeterminate.
    pub mode: ProgressMode,
    /// Marquee position in `[0, 1)`; only meaningful when indeterminate.
    pub phase: f64,
}

/// Live progress state, owned by the host thread.
#[derive(Clone, Debug)]
pub(crate) struct Progress {
    max: f64,
    mode: ProgressMode,
    value: f64,
    phase: f64,
}

impl Progress {
    pub(crate) fn new(spec: ProgressSpec) -> Self {
        let max = if spec.max.is_finite() && spec.max > 0.0 {
            spec.max
        } else {
            ProgressSpec::default().max
        };
        Self {
            max,
            mode: spec.mode,
            value: 0.0,
            phase: 0.0,
        }
    }

    pub(crate) fn is_indeterminate(&self) -> bool {
        self.mode == ProgressMode::Indeterminate
    }

    pub(crate) fn value(&self) -> f64 {
        self.value
    }

    /// Advance by `amount`, stopping just short of the maximum.
    pub(crate) fn step(&mut self, amount: f64) {
        if !amount.is_finite() {
            return;
        }
        if self.value + amount >= self.max {
            self.value = self.ceiling();
        } else {
            self.value = (self.value + amount).max(0.0);
        }
    }

    /// Jump to `value`, clamped to `[0, max)`.
    pub(crate) fn set(&mut self, value: f64) {
        if value.is_finite() {
            self.value = value.clamp(0.0, self.ceiling());
        }
    }

    /// Highest value the bar can hold; always in `(0, max)`.
    fn ceiling(&self) -> f64 {
        self.max - FINISH_GAP.min(self.max / 1000.0)
    }

    /// Move the indeterminate marquee one notch.
    pub(crate) fn tick(&mut self) {
        self.phase = (self.phase + MARQUEE_STEP) % 1.0;
    }

    pub(crate) fn view(&self) -> ProgressView {
        ProgressView {
            fraction: self.value / self.max,
            mode: self.mode,
            phase: self.phase,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(max: f64) -> Progress {
        Progress::new(ProgressSpec {
            max,
            ..Default::default()
        })
    }

    #[test]
    fn step_stops_short_of_max() {
        let mut p = bar(10.0);
        p.step(4.0);
        assert_eq!(p.value(), 4.0);
        p.step(6.0);
        assert!(p.value() < 10.0 && p.value() > 9.99);
        p.step(1.0);
        assert!(p.view().fraction < 1.0);
    }

    #[test]
    fn set_clamps() {
        let mut p = bar(50.0);
        p.set(-3.0);
        assert_eq!(p.value(), 0.0);
        p.set(25.0);
        assert_eq!(p.view().fraction, 0.5);
        p.set(500.0);
        assert!(p.value() < 50.0);
        p.set(f64::NAN);
        assert!(p.value() < 50.0 && p.value() > 49.0);
    }

    #[test]
    fn invalid_max_uses_default() {
        let mut p = bar(0.0);
        p.set(50.0);
        assert_eq!(p.view().fraction, 0.5);
    }

    #[test]
    fn tiny_max_still_clamps() {
        let mut p = bar(0.0005);
        p.set(0.0002);
        assert_eq!(p.value(), 0.0002);
        p.set(1.0);
        assert!(p.value() > 0.0 && p.value() < 0.0005);
        p.step(1.0);
        assert!(p.value() > 0.0 && p.view().fraction < 1.0);
    }

    #[test]
    fn marquee_wraps() {
        let mut p = Progress::new(ProgressSpec {
            mode: ProgressMode::Indeterminate,
            ..Default::default()
        });
        assert!(p.is_indeterminate());
        for _ in 0..75 {
            p.tick();
        }
        assert!(p.view().phase < 1.0);
    }
}
