//! Change Weighting Strategies

use state_history::StateHistory;

/// Turns a change history into a percentage in [0, 100]
pub trait ChangeWeighting: Send + Sync {
    fn percent(&self, history: &StateHistory) -> f64;
}

/// Linear recency curve.
///
/// The history is aligned on its newest sample; slot `i` of `N`
/// (0 = oldest) weighs `low + (high - low) * i / (N - 1)`, so recent
/// changes count more than old ones. Empty slots count as "no change".
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearRecencyCurve {
    pub low: f64,
    pub high: f64,
}

impl Default for LinearRecencyCurve {
    fn default() -> Self {
        Self {
            low: 0.75,
            high: 1.25,
        }
    }
}

impl LinearRecencyCurve {
    fn weight(&self, slot: usize, slots: usize) -> f64 {
        if slots <= 1 {
            return self.high;
        }
        self.low + (self.high - self.low) * slot as f64 / (slots - 1) as f64
    }
}

impl ChangeWeighting for LinearRecencyCurve {
    fn percent(&self, history: &StateHistory) -> f64 {
        let slots = history.capacity();
        let first_slot = slots - history.len();
        let weighted: f64 = history
            .iter()
            .enumerate()
            .filter(|(_, changed)| *changed)
            .map(|(j, _)| self.weight(first_slot + j, slots))
            .sum();
        weighted * 100.0 / slots as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn history_of(samples: &[bool]) -> StateHistory {
        let mut history = StateHistory::with_default_capacity();
        for &changed in samples {
            history.push(changed);
        }
        history
    }

    #[test]
    fn test_no_changes_is_zero() {
        let curve = LinearRecencyCurve::default();
        assert_eq!(curve.percent(&history_of(&[false; 21])), 0.0);
        assert_eq!(curve.percent(&StateHistory::default()), 0.0);
    }

    #[test]
    fn test_all_changes_is_hundred() {
        let curve = LinearRecencyCurve::default();
        let percent = curve.percent(&history_of(&[true; 21]));
        assert!((percent - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_recent_changes_weigh_more() {
        let curve = LinearRecencyCurve::default();
        let mut old = [false; 21];
        old[0] = true;
        let mut recent = [false; 21];
        recent[20] = true;

        let old_percent = curve.percent(&history_of(&old));
        let recent_percent = curve.percent(&history_of(&recent));
        assert!((old_percent - 0.75 * 100.0 / 21.0).abs() < 1e-9);
        assert!((recent_percent - 1.25 * 100.0 / 21.0).abs() < 1e-9);
    }

    #[test]
    fn test_partial_history_aligned_on_newest() {
        let curve = LinearRecencyCurve::default();
        // A single change pushed into an empty history is the newest slot
        let percent = curve.percent(&history_of(&[true]));
        assert!((percent - 1.25 * 100.0 / 21.0).abs() < 1e-9);
    }
}
