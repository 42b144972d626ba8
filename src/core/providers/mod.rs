pub mod claude;
pub mod codex;
pub mod zai;

use std::sync::{Arc, Mutex};

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::core::error::ProbeError;
use crate::core::models::usage::UsageSnapshot;
use crate::core::pty::{CommandRunner, PtyOptions};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    Claude,
    Codex,
    Zai,
}

impl Provider {
    pub fn from_id(id: &str) -> Option<Self> {
        match id.to_lowercase().as_str() {
            "claude" => Some(Self::Claude),
            "codex" => Some(Self::Codex),
            "zai" | "z.ai" | "z-ai" => Some(Self::Zai),
            _ => None,
        }
    }

    pub fn id(&self) -> &'static str {
        match self {
            Self::Claude => "claude",
            Self::Codex => "codex",
            Self::Zai => "zai",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Claude => "Claude",
            Self::Codex => "Codex",
            Self::Zai => "Zai",
        }
    }

    pub fn session_label(&self) -> &'static str {
        "Session"
    }

    pub fn weekly_label(&self) -> &'static str {
        "Weekly"
    }

    pub fn tertiary_label(&self) -> &'static str {
        match self {
            Self::Claude => "Opus",
            _ => "Model",
        }
    }

    /// Interactive CLI binary polled over a PTY, when the provider has one.
    pub fn cli_binary(&self) -> Option<&'static str> {
        match self {
            Self::Claude => Some("claude"),
            Self::Codex => Some("codex"),
            Self::Zai => None,
        }
    }

    fn index(&self) -> usize {
        match self {
            Self::Claude => 0,
            Self::Codex => 1,
            Self::Zai => 2,
        }
    }
}

/// Common contract for turning captured CLI text into a snapshot, one
/// implementation per provider so each grammar can evolve independently.
pub trait StatusParser {
    fn parse(&self, text: &str) -> Result<UsageSnapshot, ProbeError>;
}

// The interactive CLIs do not tolerate concurrent invocations against the
// same binary, so polls are serialized per provider.
static PROVIDER_LOCKS: Lazy<[Mutex<()>; 3]> =
    Lazy::new(|| [Mutex::new(()), Mutex::new(()), Mutex::new(())]);

/// Run one blocking PTY poll for `provider`, holding its serialization lock.
pub fn poll_blocking(
    provider: Provider,
    runner: &dyn CommandRunner,
    options: &PtyOptions,
) -> Result<UsageSnapshot, ProbeError> {
    let _guard = PROVIDER_LOCKS[provider.index()]
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());

    match provider {
        Provider::Claude => claude::ClaudeStatusProbe::new(runner, options.clone()).fetch(),
        Provider::Codex => codex::CodexStatusProbe::new(runner, options.clone()).fetch(),
        Provider::Zai => Err(ProbeError::ApiError(
            "Zai has no interactive CLI; parse its usage JSON instead".to_string(),
        )),
    }
}

/// Async wrapper: the poll runs on a blocking worker so the caller's thread
/// (e.g. a UI loop) is never blocked on the PTY.
pub async fn poll(
    provider: Provider,
    runner: Arc<dyn CommandRunner>,
    options: PtyOptions,
) -> Result<UsageSnapshot, ProbeError> {
    tokio::task::spawn_blocking(move || poll_blocking(provider, runner.as_ref(), &options))
        .await
        .map_err(|e| {
            ProbeError::Io(std::io::Error::other(format!("poll task failed: {e}")))
        })?
}
