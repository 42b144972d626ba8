use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::providers::Provider;

/// One recurring usage-limit period (5-hour, weekly, ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateWindow {
    /// Percentage of the rate limit that has been used (0.0 - 100.0)
    pub used_percent: f64,
    /// Duration of the rate window in minutes, when the provider reports it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window_minutes: Option<u64>,
    /// When the rate window resets
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resets_at: Option<DateTime<Utc>>,
    /// Free-text reset fallback scraped from CLI output (e.g. "resets 09:01")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reset_description: Option<String>,
}

impl RateWindow {
    /// Complement of `used_percent`; derived, never stored redundantly.
    pub fn percent_left(&self) -> f64 {
        (100.0 - self.used_percent).clamp(0.0, 100.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderIdentity {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan: Option<String>,
}

/// Immutable point-in-time result of parsing one provider's status.
/// Created once per poll and replaced wholesale on the next.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageSnapshot {
    pub provider: Provider,
    /// Where the data came from: "cli" or "api"
    pub source: String,
    /// Primary rate window (session/5-hour)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary: Option<RateWindow>,
    /// Secondary rate window (weekly/7-day)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secondary: Option<RateWindow>,
    /// Tertiary rate window (model-specific, e.g. Opus)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tertiary: Option<RateWindow>,
    /// Remaining credit balance, if the provider reports one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credits: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity: Option<ProviderIdentity>,
    pub updated_at: DateTime<Utc>,
    /// Cleaned source text the snapshot was derived from, kept for diagnostics
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub raw_text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_left_is_complement() {
        let window = RateWindow {
            used_percent: 12.0,
            window_minutes: None,
            resets_at: None,
            reset_description: None,
        };
        assert!((window.used_percent + window.percent_left() - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn percent_left_clamps_overuse() {
        let window = RateWindow {
            used_percent: 130.0,
            window_minutes: None,
            resets_at: None,
            reset_description: None,
        };
        assert_eq!(window.percent_left(), 0.0);
    }
}
