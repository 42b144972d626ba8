use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::cli::output::{OutputFormat, OutputOptions};
use crate::cli::renderer;
use crate::core::formatter::ResetTimeDisplayStyle;
use crate::core::models::usage::UsageSnapshot;
use crate::core::providers::{self, claude, codex, zai, Provider, StatusParser};
use crate::core::pty::{PtyOptions, TtyCommandRunner};

/// Parse a previously captured fixture (CLI text for Claude/Codex, raw JSON
/// for Zai) instead of running a live probe.
fn parse_capture(provider: Provider, path: &PathBuf) -> Result<UsageSnapshot> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("failed to read capture file {}", path.display()))?;

    let snapshot = match provider {
        Provider::Claude => {
            let text = String::from_utf8_lossy(&bytes);
            claude::ClaudeStatusParser.parse(&text)?
        }
        Provider::Codex => {
            let text = String::from_utf8_lossy(&bytes);
            codex::CodexStatusParser.parse(&text)?
        }
        Provider::Zai => zai::parse_usage_snapshot(&bytes)?.to_usage_snapshot(),
    };
    Ok(snapshot)
}

pub async fn run(
    provider_id: &str,
    from_file: Option<PathBuf>,
    style: ResetTimeDisplayStyle,
    timeout_seconds: u64,
    opts: &OutputOptions,
) -> Result<()> {
    let provider = Provider::from_id(provider_id)
        .with_context(|| format!("unknown provider: '{}'", provider_id))?;

    let snapshot = match from_file {
        Some(path) => parse_capture(provider, &path)?,
        None => {
            if provider.cli_binary().is_none() {
                anyhow::bail!(
                    "{} has no interactive CLI; pass --from-file with its usage JSON",
                    provider.display_name()
                );
            }
            let options = PtyOptions {
                timeout: std::time::Duration::from_secs(timeout_seconds),
                ..PtyOptions::default()
            };
            let runner = Arc::new(TtyCommandRunner::new());
            providers::poll(provider, runner, options).await?
        }
    };

    match opts.format {
        OutputFormat::Text => {
            println!(
                "{}",
                renderer::render_provider(&snapshot, style, opts.use_color)
            );
            if opts.verbose && !snapshot.raw_text.is_empty() {
                eprintln!("--- cleaned capture ---\n{}", snapshot.raw_text);
            }
        }
        OutputFormat::Json => {
            let json = if opts.pretty {
                serde_json::to_string_pretty(&snapshot)?
            } else {
                serde_json::to_string(&snapshot)?
            };
            println!("{}", json);
        }
    }

    Ok(())
}
