use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::cli::output::{OutputFormat, OutputOptions};
use crate::cli::renderer;
use crate::core::formatter::credit_short;
use crate::core::jsonl;
use crate::core::models::credits::CreditEvent;

// Line budgets mirror what the menu-bar poller uses for the same ledger.
const MAX_LINE_BYTES: usize = 1024 * 1024;
const PREFIX_BYTES: usize = 64 * 1024;

#[derive(Debug, Default)]
struct ScanStats {
    truncated: usize,
    undecodable: usize,
}

fn scan_ledger(path: &Path) -> Result<(Vec<CreditEvent>, ScanStats)> {
    let mut events = Vec::new();
    let mut stats = ScanStats::default();

    jsonl::scan_lines(path, MAX_LINE_BYTES, PREFIX_BYTES, |bytes, truncated| {
        if truncated {
            stats.truncated += 1;
            return;
        }
        match serde_json::from_slice::<CreditEvent>(bytes) {
            Ok(event) => events.push(event),
            Err(_) => stats.undecodable += 1,
        }
    })
    .with_context(|| format!("failed to read ledger {}", path.display()))?;

    Ok((events, stats))
}

fn default_ledger_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".usagebar").join("credits.jsonl"))
}

pub fn run(file: Option<PathBuf>, opts: &OutputOptions) -> Result<()> {
    let path = file
        .or_else(default_ledger_path)
        .context("no ledger file given and no home directory found")?;

    let (events, stats) = scan_ledger(&path)?;

    match opts.format {
        OutputFormat::Text => {
            if events.is_empty() {
                println!(" No credit events in {}", path.display());
            } else {
                println!(" Credit history ({})", path.display());
                for event in &events {
                    println!("{}", renderer::render_credit_event(event, opts.use_color));
                }
                let total: f64 = events.iter().map(|e| e.credits_used).sum();
                println!("  Total: {} credits", credit_short(total));
            }
            if opts.verbose && (stats.truncated > 0 || stats.undecodable > 0) {
                eprintln!(
                    "skipped {} truncated and {} undecodable lines",
                    stats.truncated, stats.undecodable
                );
            }
        }
        OutputFormat::Json => {
            let json = if opts.pretty {
                serde_json::to_string_pretty(&events)?
            } else {
                serde_json::to_string(&events)?
            };
            println!("{}", json);
        }
    }

    Ok(())
}
