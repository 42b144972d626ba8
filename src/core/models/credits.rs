use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One historical usage ledger entry scanned from the JSON-lines log.
/// Read-only; this core never writes the log.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditEvent {
    pub date: DateTime<Utc>,
    /// Service label, e.g. "codex"
    pub service: String,
    pub credits_used: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_ledger_line() {
        let json = r#"{"date":"2025-11-21T10:30:00Z","service":"codex","creditsUsed":12.5}"#;
        let event: CreditEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.service, "codex");
        assert!((event.credits_used - 12.5).abs() < f64::EPSILON);
    }

    #[test]
    fn rejects_malformed_line() {
        let result: Result<CreditEvent, _> = serde_json::from_str(r#"{"service":"codex"}"#);
        assert!(result.is_err());
    }
}
