//! Progressive lockout after failed PIN attempts
//!
//! The default policy never locks, so wrong PINs can be retried without
//! limit. Deployments that want brute-force protection pick a preset.

use std::time::Duration;

/// Lockout policy for failed PIN attempts
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LockoutPolicy {
    /// Format: (min_attempts, lockout_duration), ascending by attempts
    thresholds: Vec<(u32, Duration)>,
}

impl LockoutPolicy {
    /// Never lock out
    pub fn none() -> Self {
        Self::default()
    }

    /// 30 seconds after 4 failures, escalating to 24 hours after 10
    pub fn standard() -> Self {
        Self {
            thresholds: vec![
                (4, Duration::from_secs(30)),
                (6, Duration::from_secs(5 * 60)),
                (8, Duration::from_secs(30 * 60)),
                (10, Duration::from_secs(24 * 60 * 60)),
            ],
        }
    }

    /// Lock sooner and longer
    pub fn strict() -> Self {
        Self {
            thresholds: vec![
                (3, Duration::from_secs(60)),
                (5, Duration::from_secs(10 * 60)),
                (7, Duration::from_secs(60 * 60)),
                (9, Duration::from_secs(24 * 60 * 60)),
            ],
        }
    }

    /// Tolerate more typos before locking
    pub fn lenient() -> Self {
        Self {
            thresholds: vec![
                (5, Duration::from_secs(30)),
                (8, Duration::from_secs(5 * 60)),
                (12, Duration::from_secs(30 * 60)),
                (15, Duration::from_secs(24 * 60 * 60)),
            ],
        }
    }

    /// Custom thresholds
    pub fn custom(mut thresholds: Vec<(u32, Duration)>) -> Self {
        thresholds.sort_by_key(|(min, _)| *min);
        Self { thresholds }
    }

    /// Look up a preset by name
    pub fn preset(name: &str) -> Option<Self> {
        match name {
            "none" => Some(Self::none()),
            "standard" => Some(Self::standard()),
            "strict" => Some(Self::strict()),
            "lenient" => Some(Self::lenient()),
            _ => None,
        }
    }

    /// Lockout duration for a given number of consecutive failures
    pub fn lockout_duration(&self, failed_attempts: u32) -> Option<Duration> {
        self.thresholds
            .iter()
            .rev()
            .find(|(min, _)| failed_attempts >= *min)
            .map(|(_, duration)| *duration)
    }

    /// Failures allowed before the first lockout, `None` when unlimited
    pub fn max_attempts(&self) -> Option<u32> {
        self.thresholds.first().map(|(min, _)| *min)
    }

    /// Whether this policy ever locks
    pub fn is_enabled(&self) -> bool {
        !self.thresholds.is_empty()
    }

    /// Human-readable lockout length
    pub fn lockout_description(&self, failed_attempts: u32) -> Option<String> {
        self.lockout_duration(failed_attempts).map(|duration| {
            let secs = duration.as_secs();
            if secs < 60 {
                format!("{} seconds", secs)
            } else if secs < 3600 {
                format!("{} minutes", secs / 60)
            } else {
                format!("{} hours", secs / 3600)
            }
        })
    }
}
