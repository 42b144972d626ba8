//! Pure, deterministic display-string rendering.
//!
//! All output uses fixed en-US formats regardless of the runtime locale so
//! the same snapshot renders identically on every system.

use chrono::{DateTime, Datelike, Duration, Local, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::core::models::credits::CreditEvent;
use crate::core::models::usage::RateWindow;
use crate::core::text::strip_ansi_codes;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResetTimeDisplayStyle {
    Countdown,
    Absolute,
}

/// "75% left"
pub fn usage_line(remaining: f64) -> String {
    format!("{:.0}% left", remaining)
}

/// Countdown to a reset, bucketed into the two most significant non-zero
/// units: "in 1d 2h", "in 3h 31m", "in 11m", or "now" when already past.
/// Minutes are ceiling-rounded, so a delta that rounds up to exactly 60
/// minutes promotes to "in 1h".
pub fn reset_countdown_description(date: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let seconds = (date - now).num_milliseconds().max(0) as f64 / 1000.0;
    if seconds < 1.0 {
        return "now".to_string();
    }

    let total_minutes = ((seconds / 60.0).ceil() as i64).max(1);
    let days = total_minutes / (24 * 60);
    let hours = (total_minutes / 60) % 24;
    let minutes = total_minutes % 60;

    if days > 0 {
        if hours > 0 {
            return format!("in {}d {}h", days, hours);
        }
        return format!("in {}d", days);
    }
    if hours > 0 {
        if minutes > 0 {
            return format!("in {}h {}m", hours, minutes);
        }
        return format!("in {}h", hours);
    }
    format!("in {}m", total_minutes)
}

fn short_time(date: DateTime<Local>) -> String {
    date.format("%-I:%M %p").to_string()
}

/// Human-friendly absolute phrasing: time-only today, "tomorrow, <time>"
/// tomorrow, "<abbreviated date>, <time>" otherwise.
pub fn reset_description(date: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let local = date.with_timezone(&Local);
    let now_local = now.with_timezone(&Local);

    let day = local.date_naive();
    let today = now_local.date_naive();

    if day == today {
        return short_time(local);
    }
    if day == today + Duration::days(1) {
        return format!("tomorrow, {}", short_time(local));
    }
    format!(
        "{} {}, {}, {}",
        month_abbrev(local.month()),
        local.day(),
        local.year(),
        short_time(local)
    )
}

/// Full "Resets …" line for a window, or `None` when there is nothing to say.
/// Prefers the absolute timestamp over the free-text fallback; the fallback
/// only gains a "Resets " prefix when it does not already carry one.
pub fn reset_line(
    window: &RateWindow,
    style: ResetTimeDisplayStyle,
    now: DateTime<Utc>,
) -> Option<String> {
    if let Some(date) = window.resets_at {
        let text = match style {
            ResetTimeDisplayStyle::Countdown => reset_countdown_description(date, now),
            ResetTimeDisplayStyle::Absolute => reset_description(date, now),
        };
        return Some(format!("Resets {}", text));
    }

    if let Some(desc) = &window.reset_description {
        let trimmed = desc.trim();
        if trimmed.is_empty() {
            return None;
        }
        if trimmed.to_lowercase().starts_with("resets") {
            return Some(trimmed.to_string());
        }
        return Some(format!("Resets {}", trimmed));
    }
    None
}

/// "Updated just now" within a minute, "Updated 5h ago" within a day,
/// "Updated 9:41 AM" beyond that.
pub fn updated_string(date: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let delta_seconds = (now - date).num_seconds();
    if delta_seconds.abs() < 60 {
        return "Updated just now".to_string();
    }
    if delta_seconds < 24 * 3600 {
        let seconds = delta_seconds.max(0);
        if seconds < 3600 {
            return format!("Updated {}m ago", (seconds / 60).max(1));
        }
        return format!("Updated {}h ago", (seconds / 3600).max(1));
    }
    format!("Updated {}", short_time(date.with_timezone(&Local)))
}

fn month_abbrev(month: u32) -> &'static str {
    match month {
        1 => "Jan",
        2 => "Feb",
        3 => "Mar",
        4 => "Apr",
        5 => "May",
        6 => "Jun",
        7 => "Jul",
        8 => "Aug",
        9 => "Sep",
        10 => "Oct",
        11 => "Nov",
        _ => "Dec",
    }
}

/// Comma-group an unsigned integer string every 3 digits from the right.
fn group_digits(digits: &str) -> String {
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    let chars: Vec<char> = digits.chars().collect();
    for (i, ch) in chars.iter().enumerate() {
        if i > 0 && (chars.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(*ch);
    }
    grouped
}

/// Grouped decimal with at most two fraction digits and no trailing zeros.
fn decimal_string(value: f64) -> String {
    let negative = value < 0.0;
    let formatted = format!("{:.2}", value.abs());
    let (int_part, frac_part) = formatted.split_once('.').unwrap_or((&formatted, "00"));
    let frac = frac_part.trim_end_matches('0');
    let mut out = group_digits(int_part);
    if !frac.is_empty() {
        out.push('.');
        out.push_str(frac);
    }
    if negative {
        out.insert(0, '-');
    }
    out
}

/// "980 left" / "42.5 left" / "1,234.5 left"
pub fn credits_string(value: f64) -> String {
    format!("{} left", decimal_string(value))
}

/// USD formatted by direct digit manipulation: two fixed decimals, comma
/// thousands separators, and the sign before the symbol ("-$1,234.56",
/// never "$-1,234.56"). Locale-independent by construction.
pub fn usd_string(value: f64) -> String {
    let negative = value < 0.0;
    let formatted = format!("{:.2}", value.abs());
    let (int_part, frac_part) = formatted.split_once('.').unwrap_or((&formatted, "00"));
    let amount = format!("{}.{}", group_digits(int_part), frac_part);
    if negative {
        format!("-${}", amount)
    } else {
        format!("${}", amount)
    }
}

/// Currency with a known-symbol fast path and a plain "<code> <amount>"
/// fallback for everything else.
pub fn currency_string(value: f64, currency_code: &str) -> String {
    if currency_code == "USD" {
        return usd_string(value);
    }

    let symbol = match currency_code {
        "EUR" => Some("€"),
        "GBP" => Some("£"),
        "JPY" => Some("¥"),
        _ => None,
    };
    match symbol {
        Some(symbol) => {
            let negative = value < 0.0;
            let formatted = format!("{:.2}", value.abs());
            let (int_part, frac_part) = formatted.split_once('.').unwrap_or((&formatted, "00"));
            let amount = format!("{}.{}", group_digits(int_part), frac_part);
            if negative {
                format!("-{}{}", symbol, amount)
            } else {
                format!("{}{}", symbol, amount)
            }
        }
        None => format!("{} {:.2}", currency_code, value),
    }
}

/// Scale token counts into B/M/K suffixes. One decimal place only while the
/// scaled magnitude is below 10, with a trailing ".0" dropped; values below
/// 1000 render as grouped integers.
pub fn token_count_string(value: i64) -> String {
    let abs = value.unsigned_abs();
    let sign = if value < 0 { "-" } else { "" };

    const UNITS: [(u64, f64, &str); 3] = [
        (1_000_000_000, 1e9, "B"),
        (1_000_000, 1e6, "M"),
        (1_000, 1e3, "K"),
    ];

    for (threshold, divisor, suffix) in UNITS {
        if abs >= threshold {
            let scaled = abs as f64 / divisor;
            let formatted = if scaled >= 10.0 {
                format!("{:.0}", scaled)
            } else {
                let s = format!("{:.1}", scaled);
                s.strip_suffix(".0").map(str::to_string).unwrap_or(s)
            };
            return format!("{}{}{}", sign, formatted, suffix);
        }
    }

    format!("{}{}", sign, group_digits(&abs.to_string()))
}

/// "Nov 21, 2025 · codex · 12.5 credits"
pub fn credit_event_summary(event: &CreditEvent) -> String {
    let local = event.date.with_timezone(&Local);
    format!(
        "{} {}, {} · {} · {} credits",
        month_abbrev(local.month()),
        local.day(),
        local.year(),
        event.service,
        decimal_string(event.credits_used)
    )
}

/// "Nov 21 - codex: 12.5"
pub fn credit_event_compact(event: &CreditEvent) -> String {
    let local = event.date.with_timezone(&Local);
    format!(
        "{} {} - {}: {}",
        month_abbrev(local.month()),
        local.day(),
        event.service,
        decimal_string(event.credits_used)
    )
}

/// Compact credit magnitude for tight layouts: "980", "1.2k".
pub fn credit_short(value: f64) -> String {
    if value >= 1000.0 {
        return format!("{:.1}k", value / 1000.0);
    }
    format!("{:.0}", value)
}

/// Collapse to a single line and cap the length, appending an ellipsis when
/// anything was cut. Used for diagnostics snippets.
pub fn truncated_single_line(text: &str, max: usize) -> String {
    let single = text.replace('\n', " ").trim().to_string();
    if single.chars().count() <= max {
        return single;
    }
    let cut: String = single.chars().take(max).collect();
    format!("{}…", cut)
}

static MODEL_DATE_SUFFIXES: Lazy<[Regex; 3]> = Lazy::new(|| {
    [
        Regex::new(r"(?:-|\s)\d{8}$").expect("model date regex"),
        Regex::new(r"(?:-|\s)\d{4}-\d{2}-\d{2}$").expect("model date regex"),
        Regex::new(r"\s\d{4}\s\d{4}$").expect("model date regex"),
    ]
});

static TRAILING_SEPARATORS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[ \t-]+$").expect("trailing separators regex"));

/// Strip a trailing date-like suffix ("-20251101", "-2024-08-06",
/// " 2025 1101") plus any leftover separator. Idempotent on cleaned names;
/// returns the input unchanged if stripping would empty it.
pub fn model_display_name(raw: &str) -> String {
    let mut cleaned = raw.trim().to_string();
    if cleaned.is_empty() {
        return raw.to_string();
    }

    for pattern in MODEL_DATE_SUFFIXES.iter() {
        if let Some(found) = pattern.find(&cleaned) {
            cleaned.truncate(found.start());
            break;
        }
    }

    if let Some(found) = TRAILING_SEPARATORS.find(&cleaned) {
        cleaned.truncate(found.start());
    }

    if cleaned.is_empty() {
        raw.to_string()
    } else {
        cleaned
    }
}

static LEADING_SGR_REMNANTS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(?:\[\d{1,3}m\s*)+").expect("sgr remnant regex"));

static PLAN_BOILERPLATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(claude|codex|account|plan)\b").expect("boilerplate regex"));

static WHITESPACE_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("whitespace regex"));

/// Clean a provider plan string: strip ANSI and leftover bracketed SGR codes,
/// drop boilerplate words, collapse whitespace, and capitalize only when the
/// first character is lowercase (preserving acronym casing like "AI").
/// The literal token "oauth" maps to the display value "Ollama".
pub fn clean_plan_name(text: &str) -> String {
    let stripped = strip_ansi_codes(text);
    let without_codes = LEADING_SGR_REMNANTS.replace(&stripped, "");
    let without_boilerplate = PLAN_BOILERPLATE.replace_all(&without_codes, "");
    let mut cleaned = WHITESPACE_RUNS
        .replace_all(&without_boilerplate, " ")
        .trim()
        .to_string();
    if cleaned.is_empty() {
        cleaned = stripped.trim().to_string();
    }
    if cleaned.eq_ignore_ascii_case("oauth") {
        return "Ollama".to_string();
    }
    let mut chars = cleaned.chars();
    match chars.next() {
        Some(first) if first.is_lowercase() => {
            format!("{}{}", first.to_uppercase(), chars.as_str())
        }
        _ => cleaned,
    }
}
