use thiserror::Error;

/// Failures surfaced by the status extraction core.
///
/// Low-level components (PTY runner, log scanner) return the raw variants;
/// provider parsers classify and enrich them (e.g. spotting an expired OAuth
/// token inside otherwise-generic CLI output) before handing them back.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// The CLI binary could not be started at all.
    #[error("failed to spawn `{binary}`: {reason}")]
    SpawnFailed { binary: String, reason: String },

    /// The CLI produced no usable output within the time budget.
    /// Distinct from `SpawnFailed` so callers can retry with backoff
    /// instead of treating the tool as missing.
    #[error("`{binary}` produced no output within {seconds}s")]
    Timeout { binary: String, seconds: u64 },

    /// The provider grammar did not match. Carries a cleaned one-line
    /// snippet of the offending text for diagnostics.
    #[error("could not parse status output: {snippet}")]
    ParseFailed { snippet: String },

    /// A credential failure was detected in the output. The message is
    /// actionable (names the token and how to re-login).
    #[error("{0}")]
    AuthExpired(String),

    /// The vendor API reported a failure; message is verbatim from the vendor.
    #[error("{0}")]
    ApiError(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ProbeError {
    pub fn parse_failed(text: &str) -> Self {
        ProbeError::ParseFailed {
            snippet: crate::core::formatter::truncated_single_line(text, 80),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_failed_truncates_snippet() {
        let long = "x".repeat(300);
        let err = ProbeError::parse_failed(&long);
        match err {
            ProbeError::ParseFailed { snippet } => {
                assert!(snippet.chars().count() <= 81);
                assert!(snippet.ends_with('…'));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn timeout_message_names_binary() {
        let err = ProbeError::Timeout {
            binary: "codex".to_string(),
            seconds: 12,
        };
        let msg = err.to_string();
        assert!(msg.contains("codex"));
        assert!(msg.contains("12"));
    }
}
