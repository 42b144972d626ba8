use chrono::Utc;
use colored::{control, Colorize};

use crate::core::formatter::{
    credit_event_summary, credits_string, reset_line, updated_string, usage_line,
    ResetTimeDisplayStyle,
};
use crate::core::models::credits::CreditEvent;
use crate::core::models::usage::{RateWindow, UsageSnapshot};

/// Render a full provider block as a colored (or plain) string.
///
/// Layout:
/// ```text
///  Claude (cli)
///   Session   88% left
///             Resets in 2h 15m
///   Weekly    45% left
///             Resets Nov 21
///   Opus      95% left
///   Account   user@example.com
///   Org       Example Org
///   Credits   980 left
///   Updated just now
/// ```
pub fn render_provider(
    snapshot: &UsageSnapshot,
    style: ResetTimeDisplayStyle,
    use_color: bool,
) -> String {
    control::set_override(use_color);
    let now = Utc::now();

    let mut lines: Vec<String> = Vec::new();

    let header = format!(" {} ({})", snapshot.provider.display_name(), snapshot.source);
    lines.push(header.bold().to_string());

    let windows: [Option<(&str, &RateWindow)>; 3] = [
        snapshot
            .primary
            .as_ref()
            .map(|w| (snapshot.provider.session_label(), w)),
        snapshot
            .secondary
            .as_ref()
            .map(|w| (snapshot.provider.weekly_label(), w)),
        snapshot
            .tertiary
            .as_ref()
            .map(|w| (snapshot.provider.tertiary_label(), w)),
    ];

    // Pad before colorizing: escape bytes would otherwise count against the
    // column width.
    let label_cell = |label: &str| format!("{:<9}", label).cyan();

    for (label, window) in windows.into_iter().flatten() {
        lines.push(format!(
            "  {} {}",
            label_cell(label),
            usage_line(window.percent_left())
        ));
        if let Some(reset) = reset_line(window, style, now) {
            lines.push(format!("  {:<9} {}", "", reset.dimmed()));
        }
    }

    if let Some(identity) = &snapshot.identity {
        if let Some(email) = &identity.email {
            lines.push(format!("  {} {}", label_cell("Account"), email));
        }
        if let Some(org) = &identity.organization {
            lines.push(format!("  {} {}", label_cell("Org"), org));
        }
        if let Some(plan) = &identity.plan {
            lines.push(format!("  {} {}", label_cell("Plan"), plan));
        }
    }

    if let Some(credits) = snapshot.credits {
        lines.push(format!(
            "  {} {}",
            label_cell("Credits"),
            credits_string(credits)
        ));
    }

    lines.push(format!(
        "  {}",
        updated_string(snapshot.updated_at, now).dimmed()
    ));

    lines.join("\n")
}

/// Render one scanned ledger entry.
pub fn render_credit_event(event: &CreditEvent, use_color: bool) -> String {
    control::set_override(use_color);
    format!("  {}", credit_event_summary(event))
}
