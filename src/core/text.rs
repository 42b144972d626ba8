use once_cell::sync::Lazy;
use regex::Regex;

// CSI sequences (ESC [ ... final byte), OSC sequences (ESC ] ... BEL or ST),
// other two-byte escapes, and any stray ESC left over.
static ANSI_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\x1b\[[0-9;:?]*[ -/]*[@-~]|\x1b\][^\x07\x1b]*(?:\x07|\x1b\\)?|\x1b[@-Z\\^_]|\x1b",
    )
    .expect("ANSI regex")
});

// Remaining C0 controls and DEL, keeping newlines and tabs.
static CONTROL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\x00-\x08\x0b-\x1f\x7f]").expect("control regex"));

/// Remove ANSI escape/control sequences, leaving printable content and
/// newlines intact. Idempotent: stripping twice equals stripping once.
pub fn strip_ansi_codes(text: &str) -> String {
    let without_escapes = ANSI_RE.replace_all(text, "");
    CONTROL_RE.replace_all(&without_escapes, "").into_owned()
}

/// Apply a capture-group pattern and parse the first capture as a base-10
/// integer. Returns `None` for no match, a bad pattern, or a non-numeric
/// capture — never errors.
pub fn first_int(pattern: &str, text: &str) -> Option<i64> {
    let re = Regex::new(pattern).ok()?;
    let caps = re.captures(text)?;
    caps.get(1)?.as_str().parse::<i64>().ok()
}

/// Decimal-aware variant of [`first_int`]: accepts thousands separators and
/// a single decimal point, stripping separators before parsing.
pub fn first_number(pattern: &str, text: &str) -> Option<f64> {
    let re = Regex::new(pattern).ok()?;
    let caps = re.captures(text)?;
    let raw = caps.get(1)?.as_str().replace(',', "");
    raw.parse::<f64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_csi_sequences() {
        let input = "\u{1b}[38;5;245mCredits:\u{1b}[0m 557 credits";
        assert_eq!(strip_ansi_codes(input), "Credits: 557 credits");
    }

    #[test]
    fn strips_osc_sequences() {
        let input = "\u{1b}]0;window title\u{7}hello";
        assert_eq!(strip_ansi_codes(input), "hello");
    }

    #[test]
    fn strips_bare_escape() {
        let input = "a\u{1b}b";
        assert_eq!(strip_ansi_codes(input), "ab");
    }

    #[test]
    fn keeps_newlines() {
        let input = "\u{1b}[1mline one\u{1b}[0m\nline two\n";
        assert_eq!(strip_ansi_codes(input), "line one\nline two\n");
    }

    #[test]
    fn strips_carriage_returns() {
        assert_eq!(strip_ansi_codes("a\r\nb"), "a\nb");
    }

    #[test]
    fn strip_is_idempotent() {
        let input = "\u{1b}[35mCurrent session\u{1b}[0m\n12% used\r\n\u{1b}]2;t\u{7}";
        let once = strip_ansi_codes(input);
        let twice = strip_ansi_codes(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn first_int_extracts_capture() {
        let text = "5h limit: [#####] 75% left";
        assert_eq!(first_int(r"([0-9]{1,3})%\s+left", text), Some(75));
    }

    #[test]
    fn first_int_no_match() {
        assert_eq!(first_int(r"([0-9]+)%", "no percentages here"), None);
    }

    #[test]
    fn first_int_bad_pattern_is_none() {
        assert_eq!(first_int(r"([0-9]+", "42"), None);
    }

    #[test]
    fn first_number_strips_thousands_separators() {
        let text = "Credits: 1,234.5 credits";
        assert_eq!(
            first_number(r"Credits:\s*([0-9][0-9.,]*)", text),
            Some(1234.5)
        );
    }

    #[test]
    fn first_number_plain_integer() {
        assert_eq!(first_number(r"([0-9]+)", "980 credits"), Some(980.0));
    }
}
