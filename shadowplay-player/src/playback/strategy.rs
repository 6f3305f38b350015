//! Intensive replay strategy
//!
//! An ordered, user-configurable sequence of passes over one segment.
//! Each step names a playback speed and whether the subtitle is visible
//! during that pass. The step index exhausts at the end of the sequence;
//! it never wraps.

use serde::{Deserialize, Serialize};
use shadowplay_common::{Error, Result};

/// One pass over the current segment
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IntensiveStep {
    /// Playback speed for this pass (must be positive)
    pub speed: f64,
    /// Whether the subtitle text is shown during this pass
    pub show_subtitle: bool,
}

/// Ordered, non-empty sequence of intensive steps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntensiveStrategy {
    steps: Vec<IntensiveStep>,
}

impl IntensiveStrategy {
    pub fn new(steps: Vec<IntensiveStep>) -> Result<Self> {
        if steps.is_empty() {
            return Err(Error::InvalidInput("intensive strategy must not be empty".into()));
        }
        if let Some(step) = steps.iter().find(|s| s.speed <= 0.0) {
            return Err(Error::InvalidInput(format!(
                "intensive step speed must be positive, got {}",
                step.speed
            )));
        }
        Ok(Self { steps })
    }

    pub fn step(&self, index: usize) -> &IntensiveStep {
        &self.steps[index.min(self.last_index())]
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        false // construction guarantees at least one step
    }

    pub fn last_index(&self) -> usize {
        self.steps.len() - 1
    }

    pub fn steps(&self) -> &[IntensiveStep] {
        &self.steps
    }
}

impl Default for IntensiveStrategy {
    /// Listen twice blind, once with text, once blind at reduced speed,
    /// then once more with text at full speed
    fn default() -> Self {
        Self {
            steps: vec![
                IntensiveStep { speed: 1.0, show_subtitle: false },
                IntensiveStep { speed: 1.0, show_subtitle: false },
                IntensiveStep { speed: 0.75, show_subtitle: true },
                IntensiveStep { speed: 0.75, show_subtitle: false },
                IntensiveStep { speed: 1.0, show_subtitle: true },
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_strategy_has_five_steps() {
        let strategy = IntensiveStrategy::default();
        assert_eq!(strategy.len(), 5);
        assert_eq!(strategy.step(0).speed, 1.0);
        assert!(!strategy.step(0).show_subtitle);
        assert_eq!(strategy.step(2).speed, 0.75);
        assert!(strategy.step(2).show_subtitle);
        assert_eq!(strategy.step(4).speed, 1.0);
        assert!(strategy.step(4).show_subtitle);
    }

    #[test]
    fn empty_or_nonpositive_strategies_are_rejected() {
        assert!(IntensiveStrategy::new(vec![]).is_err());
        assert!(IntensiveStrategy::new(vec![IntensiveStep { speed: 0.0, show_subtitle: true }]).is_err());
    }

    #[test]
    fn step_lookup_saturates_at_last_index() {
        let strategy = IntensiveStrategy::default();
        assert_eq!(strategy.step(99), strategy.step(strategy.last_index()));
    }
}
