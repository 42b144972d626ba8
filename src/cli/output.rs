use std::io::IsTerminal;

/// How command results are written to stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    /// Resolve the `--json` shorthand and the `--format` value; text wins
    /// when neither asks for JSON.
    pub fn from_flags(json: bool, format: Option<&str>) -> Self {
        if json || format.is_some_and(|f| f.eq_ignore_ascii_case("json")) {
            Self::Json
        } else {
            Self::Text
        }
    }
}

/// Resolved output settings shared by every subcommand.
#[derive(Debug, Clone)]
pub struct OutputOptions {
    pub format: OutputFormat,
    pub pretty: bool,
    pub use_color: bool,
    pub verbose: bool,
}

/// Whether to emit ANSI colors: the flag must allow it, `NO_COLOR` must be
/// unset, and stdout must be a terminal.
pub fn detect_color(color_flag: bool) -> bool {
    resolve_color(
        color_flag,
        std::env::var_os("NO_COLOR").is_some(),
        std::io::stdout().is_terminal(),
    )
}

fn resolve_color(color_flag: bool, no_color_set: bool, stdout_is_tty: bool) -> bool {
    color_flag && !no_color_set && stdout_is_tty
}
