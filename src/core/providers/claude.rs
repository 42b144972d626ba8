use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::core::error::ProbeError;
use crate::core::models::usage::{ProviderIdentity, RateWindow, UsageSnapshot};
use crate::core::providers::{Provider, StatusParser};
use crate::core::pty::{CommandRunner, PtyOptions};
use crate::core::text::strip_ansi_codes;

const SESSION_MINUTES: u64 = 5 * 60;
const WEEKLY_MINUTES: u64 = 7 * 24 * 60;

const SESSION_HEADER: &str = "Current session";
const WEEKLY_HEADER: &str = "Current week (all models)";
const OPUS_HEADER: &str = "Current week (Opus)";

const SECTION_HEADERS: [&str; 3] = [SESSION_HEADER, WEEKLY_HEADER, OPUS_HEADER];

static ACCOUNT_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*Account:\s*(\S[^\n]*?)\s*$").expect("claude regex"));
static ORG_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*Org:\s*(\S[^\n]*?)\s*$").expect("claude regex"));

// Markers of the machine-readable auth failure payload the CLI prints when
// its OAuth token is no longer valid.
static AUTH_ERROR_MARKERS: &[&str] = &[
    "authentication_error",
    "token_expired",
    "oauth token has expired",
];

/// Fields recovered from `claude` `/usage` output. Percentages are stored as
/// "percent left" (complement of the displayed "used" values).
#[derive(Debug, Clone)]
pub struct ClaudeStatusSnapshot {
    pub session_percent_left: Option<i64>,
    pub weekly_percent_left: Option<i64>,
    pub opus_percent_left: Option<i64>,
    pub primary_reset_description: Option<String>,
    pub secondary_reset_description: Option<String>,
    pub opus_reset_description: Option<String>,
    pub account_email: Option<String>,
    pub account_organization: Option<String>,
    pub raw_text: String,
}

static PERCENT_USED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([0-9]{1,3})%\s*used\s*(?:\((Resets[^)]*)\))?").expect("claude regex")
});

/// Extract "<n>% used (Resets …)" from the section introduced by `header`,
/// scanning only up to the next section header. A section with no percent
/// line yields `None` rather than a neighbor's value; the first occurrence
/// wins when a label repeats.
fn section(clean: &str, header: &str) -> (Option<i64>, Option<String>) {
    let Some(start) = clean.find(header) else {
        return (None, None);
    };
    let body = &clean[start + header.len()..];
    let end = SECTION_HEADERS
        .iter()
        .filter(|h| **h != header)
        .filter_map(|h| body.find(h))
        .min()
        .unwrap_or(body.len());

    let Some(caps) = PERCENT_USED.captures(&body[..end]) else {
        return (None, None);
    };
    let used = caps
        .get(1)
        .and_then(|m| m.as_str().parse::<i64>().ok());
    let reset = caps.get(2).map(|m| m.as_str().trim().to_string());
    (used.map(|u| (100 - u).clamp(0, 100)), reset)
}

fn detect_auth_error(clean: &str) -> Option<ProbeError> {
    let lower = clean.to_lowercase();
    if AUTH_ERROR_MARKERS.iter().any(|m| lower.contains(m)) {
        return Some(ProbeError::AuthExpired(
            "Claude OAuth token is expired or invalid. Run `claude /login` to re-authenticate."
                .to_string(),
        ));
    }
    None
}

/// Parse captured `/usage` output. Strips ANSI internally. An embedded
/// authentication-error payload fails with `AuthExpired` rather than a
/// generic parse failure so the UI can show a call-to-action.
pub fn parse(text: &str) -> Result<ClaudeStatusSnapshot, ProbeError> {
    let clean = strip_ansi_codes(text);

    if let Some(err) = detect_auth_error(&clean) {
        return Err(err);
    }

    let (session_percent_left, primary_reset_description) = section(&clean, SESSION_HEADER);
    let (weekly_percent_left, secondary_reset_description) = section(&clean, WEEKLY_HEADER);
    let (opus_percent_left, opus_reset_description) = section(&clean, OPUS_HEADER);

    if session_percent_left.is_none() && weekly_percent_left.is_none() {
        return Err(ProbeError::parse_failed(&clean));
    }

    let account_email = ACCOUNT_LINE
        .captures(&clean)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string());
    let account_organization = ORG_LINE
        .captures(&clean)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string());

    Ok(ClaudeStatusSnapshot {
        session_percent_left,
        weekly_percent_left,
        opus_percent_left,
        primary_reset_description,
        secondary_reset_description,
        opus_reset_description,
        account_email,
        account_organization,
        raw_text: clean,
    })
}

fn window(percent_left: i64, window_minutes: u64, reset: Option<String>) -> RateWindow {
    RateWindow {
        used_percent: (100 - percent_left).clamp(0, 100) as f64,
        window_minutes: Some(window_minutes),
        resets_at: None,
        reset_description: reset,
    }
}

impl ClaudeStatusSnapshot {
    pub fn into_usage_snapshot(self) -> UsageSnapshot {
        let identity = if self.account_email.is_some() || self.account_organization.is_some() {
            Some(ProviderIdentity {
                email: self.account_email,
                organization: self.account_organization,
                plan: None,
            })
        } else {
            None
        };

        UsageSnapshot {
            provider: Provider::Claude,
            source: "cli".to_string(),
            primary: self
                .session_percent_left
                .map(|p| window(p, SESSION_MINUTES, self.primary_reset_description)),
            secondary: self
                .weekly_percent_left
                .map(|p| window(p, WEEKLY_MINUTES, self.secondary_reset_description)),
            tertiary: self
                .opus_percent_left
                .map(|p| window(p, WEEKLY_MINUTES, self.opus_reset_description)),
            credits: None,
            identity,
            updated_at: Utc::now(),
            raw_text: self.raw_text,
        }
    }
}

pub struct ClaudeStatusParser;

impl StatusParser for ClaudeStatusParser {
    fn parse(&self, text: &str) -> Result<UsageSnapshot, ProbeError> {
        parse(text).map(ClaudeStatusSnapshot::into_usage_snapshot)
    }
}

/// Drives the `claude` CLI over a PTY and parses its `/usage` screen.
pub struct ClaudeStatusProbe<'a> {
    runner: &'a dyn CommandRunner,
    options: PtyOptions,
}

impl<'a> ClaudeStatusProbe<'a> {
    pub fn new(runner: &'a dyn CommandRunner, options: PtyOptions) -> Self {
        Self { runner, options }
    }

    pub fn fetch(&self) -> Result<UsageSnapshot, ProbeError> {
        let capture = self.runner.run("claude", "/usage\n", &self.options)?;
        ClaudeStatusParser.parse(&capture.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "Current session\n\
                          12% used  (Resets 11am)\n\
                          Current week (all models)\n\
                          55% used  (Resets Nov 21)\n\
                          Current week (Opus)\n\
                          5% used (Resets Nov 21)\n\
                          Account: user@example.com\n\
                          Org: Example Org\n";

    #[test]
    fn parses_all_sections() {
        let snap = parse(SAMPLE).unwrap();
        assert_eq!(snap.session_percent_left, Some(88));
        assert_eq!(snap.weekly_percent_left, Some(45));
        assert_eq!(snap.opus_percent_left, Some(95));
        assert_eq!(snap.account_email.as_deref(), Some("user@example.com"));
        assert_eq!(snap.account_organization.as_deref(), Some("Example Org"));
        assert_eq!(snap.primary_reset_description.as_deref(), Some("Resets 11am"));
        assert_eq!(snap.secondary_reset_description.as_deref(), Some("Resets Nov 21"));
        assert_eq!(snap.opus_reset_description.as_deref(), Some("Resets Nov 21"));
    }

    #[test]
    fn used_plus_left_is_one_hundred() {
        let snap = parse(SAMPLE).unwrap();
        // Percentages came in as "used"; the snapshot holds the complement.
        assert_eq!(12 + snap.session_percent_left.unwrap(), 100);
        assert_eq!(55 + snap.weekly_percent_left.unwrap(), 100);
        assert_eq!(5 + snap.opus_percent_left.unwrap(), 100);
    }

    #[test]
    fn parses_ansi_colored_output() {
        let sample = "\u{1b}[35mCurrent session\u{1b}[0m\n\
                      40% used  (Resets 11am)\n\
                      Current week (all models)\n\
                      10% used  (Resets Nov 27)\n\
                      Current week (Opus)\n\
                      0% used (Resets Nov 27)\n\
                      Account: user@example.com\n\
                      Org: ACME\n\
                      \u{1b}[0m\n";
        let snap = parse(sample).unwrap();
        assert_eq!(snap.session_percent_left, Some(60));
        assert_eq!(snap.weekly_percent_left, Some(90));
        assert_eq!(snap.opus_percent_left, Some(100));
        assert_eq!(snap.primary_reset_description.as_deref(), Some("Resets 11am"));
        assert_eq!(snap.secondary_reset_description.as_deref(), Some("Resets Nov 27"));
        assert_eq!(snap.opus_reset_description.as_deref(), Some("Resets Nov 27"));
    }

    #[test]
    fn missing_optional_sections_are_absent() {
        let sample = "Current session\n30% used\nCurrent week (all models)\n70% used\n";
        let snap = parse(sample).unwrap();
        assert_eq!(snap.session_percent_left, Some(70));
        assert_eq!(snap.opus_percent_left, None);
        assert!(snap.primary_reset_description.is_none());
        assert!(snap.account_email.is_none());
        assert!(snap.account_organization.is_none());
    }

    #[test]
    fn empty_section_does_not_take_next_sections_percent() {
        let sample = "Current session\n\
                      (no data)\n\
                      Current week (all models)\n\
                      70% used  (Resets Nov 21)\n";
        let snap = parse(sample).unwrap();
        assert_eq!(snap.session_percent_left, None);
        assert!(snap.primary_reset_description.is_none());
        assert_eq!(snap.weekly_percent_left, Some(30));
    }

    #[test]
    fn surfaces_token_expired_as_auth_error() {
        let sample = concat!(
            "Settings:  Status   Config   Usage\n\n",
            "Error: Failed to load usage data: {\"type\":\"error\",\"error\":",
            "{\"type\":\"authentication_error\",\"message\":\"OAuth token has expired. ",
            "Please obtain a new token or refresh your existing token.\",",
            "\"details\":{\"error_visibility\":\"user_facing\",\"error_code\":\"token_expired\"}},",
            "\"request_id\":\"req_123\"}\n"
        );
        let err = parse(sample).unwrap_err();
        match err {
            ProbeError::AuthExpired(message) => {
                let lower = message.to_lowercase();
                assert!(lower.contains("token"));
                assert!(lower.contains("login"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn unrecognized_text_is_parse_failed() {
        let err = parse("Welcome back!\n").unwrap_err();
        assert!(matches!(err, ProbeError::ParseFailed { .. }));
    }

    #[test]
    fn maps_into_usage_snapshot() {
        let usage = parse(SAMPLE).unwrap().into_usage_snapshot();
        let primary = usage.primary.unwrap();
        assert!((primary.used_percent - 12.0).abs() < f64::EPSILON);
        assert_eq!(primary.reset_description.as_deref(), Some("Resets 11am"));
        assert!((usage.secondary.unwrap().used_percent - 55.0).abs() < f64::EPSILON);
        assert!((usage.tertiary.unwrap().used_percent - 5.0).abs() < f64::EPSILON);
        let identity = usage.identity.unwrap();
        assert_eq!(identity.email.as_deref(), Some("user@example.com"));
        assert_eq!(identity.organization.as_deref(), Some("Example Org"));
    }
}
