use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::core::error::ProbeError;
use crate::core::models::usage::{RateWindow, UsageSnapshot};
use crate::core::providers::{Provider, StatusParser};
use crate::core::pty::{CommandRunner, PtyOptions};
use crate::core::text::{first_int, first_number, strip_ansi_codes};

const FIVE_HOUR_MINUTES: u64 = 5 * 60;
const WEEKLY_MINUTES: u64 = 7 * 24 * 60;

static FIVE_HOUR_RESET: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*5h limit[^\n]*?\((resets [^)]+)\)").expect("codex regex"));
static WEEKLY_RESET: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^\s*Weekly limit[^\n]*?\((resets [^)]+)\)").expect("codex regex")
});
static MODEL_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*Model:\s*(\S[^\n]*?)\s*$").expect("codex regex"));

/// Fields recovered from `codex` `/status` output.
#[derive(Debug, Clone)]
pub struct CodexStatusSnapshot {
    pub model: Option<String>,
    pub credits: Option<f64>,
    pub five_hour_percent_left: Option<i64>,
    pub weekly_percent_left: Option<i64>,
    pub five_hour_reset: Option<String>,
    pub weekly_reset: Option<String>,
    pub raw_text: String,
}

/// Parse captured `/status` output. Strips ANSI internally so the caller can
/// hand over the raw PTY capture as-is. Percent-left values are read
/// directly; the first match per window wins.
pub fn parse(text: &str) -> Result<CodexStatusSnapshot, ProbeError> {
    let clean = strip_ansi_codes(text);

    let five_hour_percent_left = first_int(r"(?m)^\s*5h limit[^\n]*?([0-9]{1,3})%\s+left", &clean);
    let weekly_percent_left =
        first_int(r"(?m)^\s*Weekly limit[^\n]*?([0-9]{1,3})%\s+left", &clean);

    if five_hour_percent_left.is_none() && weekly_percent_left.is_none() {
        return Err(ProbeError::parse_failed(&clean));
    }

    let credits = first_number(r"Credits:\s*([0-9][0-9.,]*)\s*credits", &clean);
    let model = MODEL_LINE
        .captures(&clean)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string());
    let five_hour_reset = FIVE_HOUR_RESET
        .captures(&clean)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string());
    let weekly_reset = WEEKLY_RESET
        .captures(&clean)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string());

    Ok(CodexStatusSnapshot {
        model,
        credits,
        five_hour_percent_left,
        weekly_percent_left,
        five_hour_reset,
        weekly_reset,
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

impl CodexStatusSnapshot {
    pub fn into_usage_snapshot(self) -> UsageSnapshot {
        UsageSnapshot {
            provider: Provider::Codex,
            source: "cli".to_string(),
            primary: self
                .five_hour_percent_left
                .map(|p| window(p, FIVE_HOUR_MINUTES, self.five_hour_reset)),
            secondary: self
                .weekly_percent_left
                .map(|p| window(p, WEEKLY_MINUTES, self.weekly_reset)),
            tertiary: None,
            credits: self.credits,
            identity: None,
            updated_at: Utc::now(),
            raw_text: self.raw_text,
        }
    }
}

pub struct CodexStatusParser;

impl StatusParser for CodexStatusParser {
    fn parse(&self, text: &str) -> Result<UsageSnapshot, ProbeError> {
        parse(text).map(CodexStatusSnapshot::into_usage_snapshot)
    }
}

/// Drives the `codex` CLI over a PTY and parses its `/status` screen.
pub struct CodexStatusProbe<'a> {
    runner: &'a dyn CommandRunner,
    options: PtyOptions,
}

impl<'a> CodexStatusProbe<'a> {
    pub fn new(runner: &'a dyn CommandRunner, options: PtyOptions) -> Self {
        Self { runner, options }
    }

    pub fn fetch(&self) -> Result<UsageSnapshot, ProbeError> {
        let capture = self.runner.run("codex", "/status\n", &self.options)?;
        CodexStatusParser.parse(&capture.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_status() {
        let sample = "Model: gpt\n\
                      Credits: 980 credits\n\
                      5h limit: [#####] 75% left\n\
                      Weekly limit: [##] 25% left\n";
        let snap = parse(sample).unwrap();
        assert_eq!(snap.model.as_deref(), Some("gpt"));
        assert_eq!(snap.credits, Some(980.0));
        assert_eq!(snap.five_hour_percent_left, Some(75));
        assert_eq!(snap.weekly_percent_left, Some(25));
        assert!(snap.five_hour_reset.is_none());
    }

    #[test]
    fn parses_ansi_colored_status_with_resets() {
        let sample = "\u{1b}[38;5;245mCredits:\u{1b}[0m 557 credits\n\
                      5h limit: [█████     ] 50% left (resets 09:01)\n\
                      Weekly limit: [███████   ] 85% left (resets 04:01 on 27 Nov)\n";
        let snap = parse(sample).unwrap();
        assert_eq!(snap.credits, Some(557.0));
        assert_eq!(snap.five_hour_percent_left, Some(50));
        assert_eq!(snap.weekly_percent_left, Some(85));
        assert_eq!(snap.five_hour_reset.as_deref(), Some("resets 09:01"));
        assert_eq!(snap.weekly_reset.as_deref(), Some("resets 04:01 on 27 Nov"));
    }

    #[test]
    fn first_percent_wins_for_duplicate_labels() {
        let sample = "5h limit: 75% left\n5h limit: 10% left\nWeekly limit: 25% left\n";
        let snap = parse(sample).unwrap();
        assert_eq!(snap.five_hour_percent_left, Some(75));
    }

    #[test]
    fn unrecognized_text_is_parse_failed() {
        let err = parse("Welcome to codex!\nNothing to see here.\n").unwrap_err();
        match err {
            ProbeError::ParseFailed { snippet } => {
                assert!(snippet.contains("Welcome to codex!"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn thousands_separated_credits() {
        let sample = "Credits: 1,250 credits\n5h limit: 90% left\n";
        let snap = parse(sample).unwrap();
        assert_eq!(snap.credits, Some(1250.0));
    }

    #[test]
    fn maps_into_usage_snapshot() {
        let sample = "Credits: 980 credits\n\
                      5h limit: 75% left (resets 09:01)\n\
                      Weekly limit: 25% left\n";
        let usage = parse(sample).unwrap().into_usage_snapshot();
        let primary = usage.primary.unwrap();
        assert!((primary.used_percent - 25.0).abs() < f64::EPSILON);
        assert_eq!(primary.window_minutes, Some(300));
        assert_eq!(primary.reset_description.as_deref(), Some("resets 09:01"));
        let secondary = usage.secondary.unwrap();
        assert!((secondary.used_percent - 75.0).abs() < f64::EPSILON);
        assert_eq!(secondary.window_minutes, Some(10080));
        assert_eq!(usage.credits, Some(980.0));
        assert_eq!(usage.source, "cli");
    }
}
