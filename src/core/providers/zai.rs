use std::collections::HashMap;

use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;

use crate::core::error::ProbeError;
use crate::core::models::usage::{ProviderIdentity, RateWindow, UsageSnapshot};
use crate::core::providers::Provider;

/// Environment variable holding the vendor API key.
pub const API_KEY_ENV: &str = "Z_AI_API_KEY";

// ── Raw envelope ──────────────────────────────────────────────────────

#[derive(Deserialize)]
struct Envelope {
    #[allow(dead_code)]
    code: i64,
    msg: String,
    success: bool,
    data: Option<Payload>,
}

#[derive(Deserialize)]
struct Payload {
    limits: Option<Vec<RawLimit>>,
    #[serde(rename = "planName")]
    plan_name: Option<String>,
}

#[derive(Deserialize)]
struct RawLimit {
    #[serde(rename = "type")]
    limit_type: Option<String>,
    unit: Option<i64>,
    number: Option<i64>,
    usage: Option<f64>,
    #[serde(rename = "currentValue")]
    current_value: Option<f64>,
    remaining: Option<f64>,
    percentage: Option<f64>,
    #[serde(rename = "usageDetails", default)]
    usage_details: Vec<RawModelUsage>,
    #[serde(rename = "nextResetTime")]
    next_reset_time: Option<i64>,
}

#[derive(Deserialize)]
struct RawModelUsage {
    #[serde(rename = "modelCode")]
    model_code: Option<String>,
    usage: Option<f64>,
}

// ── Normalized model ──────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitKind {
    TokensLimit,
    TimeLimit,
    Other,
}

impl LimitKind {
    fn from_tag(tag: Option<&str>) -> Self {
        match tag {
            Some("TOKENS_LIMIT") => Self::TokensLimit,
            Some("TIME_LIMIT") => Self::TimeLimit,
            _ => Self::Other,
        }
    }
}

/// Window-length unit, decoded from the vendor's numeric codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitUnit {
    Minutes,
    Hours,
    Days,
    Months,
    Other(i64),
}

impl LimitUnit {
    fn from_code(code: Option<i64>) -> Self {
        match code {
            Some(2) => Self::Minutes,
            Some(3) => Self::Hours,
            Some(4) => Self::Days,
            Some(5) => Self::Months,
            Some(other) => Self::Other(other),
            None => Self::Other(0),
        }
    }

    fn minutes(&self) -> Option<u64> {
        match self {
            Self::Minutes => Some(1),
            Self::Hours => Some(60),
            Self::Days => Some(24 * 60),
            // Calendar months vary; 30 days is close enough for a countdown.
            Self::Months => Some(30 * 24 * 60),
            Self::Other(_) => None,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Self::Minutes => "minute",
            Self::Hours => "hour",
            Self::Days => "day",
            Self::Months => "month",
            Self::Other(_) => "unit",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ModelUsage {
    pub model_code: String,
    pub usage: f64,
}

/// One normalized vendor limit record.
#[derive(Debug, Clone)]
pub struct ZaiLimitEntry {
    pub kind: LimitKind,
    pub unit: LimitUnit,
    /// Window length measured in `unit`
    pub number: i64,
    pub usage: f64,
    pub current_value: f64,
    pub remaining: f64,
    pub percentage: f64,
    pub usage_details: Vec<ModelUsage>,
    pub next_reset_time: Option<DateTime<Utc>>,
}

impl ZaiLimitEntry {
    fn from_raw(raw: RawLimit) -> Self {
        let next_reset_time = raw
            .next_reset_time
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single());
        Self {
            kind: LimitKind::from_tag(raw.limit_type.as_deref()),
            unit: LimitUnit::from_code(raw.unit),
            number: raw.number.unwrap_or(0),
            usage: raw.usage.unwrap_or(0.0),
            current_value: raw.current_value.unwrap_or(0.0),
            remaining: raw.remaining.unwrap_or(0.0),
            percentage: raw.percentage.unwrap_or(0.0),
            usage_details: raw
                .usage_details
                .into_iter()
                .filter_map(|d| {
                    d.model_code.map(|model_code| ModelUsage {
                        model_code,
                        usage: d.usage.unwrap_or(0.0),
                    })
                })
                .collect(),
            next_reset_time,
        }
    }

    fn used_percent(&self) -> f64 {
        if self.usage > 0.0 {
            self.current_value / self.usage * 100.0
        } else {
            self.percentage
        }
    }

    fn window_minutes(&self) -> Option<u64> {
        let per_unit = self.unit.minutes()?;
        (self.number > 0).then(|| self.number as u64 * per_unit)
    }

    fn reset_description(&self) -> String {
        let label = self.unit.label();
        if self.number == 1 {
            format!("1 {} window", label)
        } else {
            format!("{} {}s window", self.number, label)
        }
    }

    fn to_rate_window(&self) -> RateWindow {
        RateWindow {
            used_percent: self.used_percent(),
            window_minutes: self.window_minutes(),
            resets_at: self.next_reset_time,
            reset_description: Some(self.reset_description()),
        }
    }
}

/// Point-in-time vendor usage state: the latest token-bound and time-bound
/// limit entries plus the plan name.
#[derive(Debug, Clone)]
pub struct ZaiUsageSnapshot {
    pub token_limit: Option<ZaiLimitEntry>,
    pub time_limit: Option<ZaiLimitEntry>,
    pub plan_name: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl ZaiUsageSnapshot {
    /// Token-bound entry maps to the primary window, time-bound to the
    /// secondary. Plan name is carried through unchanged; display cleanup is
    /// the formatter's concern.
    pub fn to_usage_snapshot(&self) -> UsageSnapshot {
        let identity = self.plan_name.as_ref().map(|plan| ProviderIdentity {
            email: None,
            organization: None,
            plan: Some(plan.clone()),
        });

        UsageSnapshot {
            provider: Provider::Zai,
            source: "api".to_string(),
            primary: self.token_limit.as_ref().map(ZaiLimitEntry::to_rate_window),
            secondary: self.time_limit.as_ref().map(ZaiLimitEntry::to_rate_window),
            tertiary: None,
            credits: None,
            identity,
            updated_at: self.updated_at,
            raw_text: String::new(),
        }
    }
}

/// Decode raw JSON bytes from the vendor usage endpoint into a normalized
/// snapshot. A `success: false` envelope or missing `data` fails with the
/// vendor's message verbatim. When the vendor repeats a limit type the last
/// occurrence wins.
pub fn parse_usage_snapshot(bytes: &[u8]) -> Result<ZaiUsageSnapshot, ProbeError> {
    let envelope: Envelope = serde_json::from_slice(bytes)
        .map_err(|e| ProbeError::ApiError(format!("malformed usage response: {e}")))?;

    if !envelope.success {
        return Err(ProbeError::ApiError(envelope.msg));
    }
    let Some(data) = envelope.data else {
        return Err(ProbeError::ApiError(envelope.msg));
    };

    let mut token_limit = None;
    let mut time_limit = None;
    for raw in data.limits.unwrap_or_default() {
        let entry = ZaiLimitEntry::from_raw(raw);
        match entry.kind {
            LimitKind::TokensLimit => token_limit = Some(entry),
            LimitKind::TimeLimit => time_limit = Some(entry),
            LimitKind::Other => {}
        }
    }

    let plan_name = data.plan_name.filter(|name| !name.trim().is_empty());

    Ok(ZaiUsageSnapshot {
        token_limit,
        time_limit,
        plan_name,
        updated_at: Utc::now(),
    })
}

/// Read the vendor API key from an environment map, accepting quoted or
/// unquoted values.
pub fn api_token_from(environment: &HashMap<String, String>) -> Option<String> {
    let raw = environment.get(API_KEY_ENV)?.trim();
    let unquoted = raw
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .or_else(|| raw.strip_prefix('\'').and_then(|s| s.strip_suffix('\'')))
        .unwrap_or(raw);
    (!unquoted.is_empty()).then(|| unquoted.to_string())
}

/// Read the vendor API key from the process environment.
pub fn api_token() -> Option<String> {
    let environment: HashMap<String, String> = std::env::vars().collect();
    api_token_from(&environment)
}
