mod cli;
mod core;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::core::formatter::ResetTimeDisplayStyle;

#[derive(Parser)]
#[command(name = "usagebar", about = "AI assistant usage status extraction", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(short, long, global = true)]
    format: Option<String>,

    /// Shorthand for --format json
    #[arg(short = 'j', long = "json", global = true)]
    json: bool,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pretty: bool,

    /// Disable ANSI colors
    #[arg(long, global = true)]
    no_color: bool,

    /// Verbose diagnostics to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll a provider and display its usage status
    Usage {
        /// Provider to query (claude|codex|zai)
        #[arg(short, long)]
        provider: String,

        /// Parse a captured fixture instead of running the live CLI
        /// (required for zai, whose JSON comes from an external client)
        #[arg(long)]
        from_file: Option<PathBuf>,

        /// Show reset times as absolute timestamps instead of countdowns
        #[arg(long)]
        absolute: bool,

        /// Overall PTY time budget in seconds
        #[arg(long, default_value_t = 12)]
        timeout: u64,
    },
    /// Scan a JSON-lines credit ledger and print its history
    Credits {
        /// Ledger path (defaults to ~/.usagebar/credits.jsonl)
        file: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let output_opts = cli::output::OutputOptions {
        format: cli::output::OutputFormat::from_flags(cli.json, cli.format.as_deref()),
        pretty: cli.pretty,
        use_color: cli::output::detect_color(!cli.no_color),
        verbose: cli.verbose,
    };

    match cli.command {
        Commands::Usage {
            provider,
            from_file,
            absolute,
            timeout,
        } => {
            let style = if absolute {
                ResetTimeDisplayStyle::Absolute
            } else {
                ResetTimeDisplayStyle::Countdown
            };
            cli::usage_cmd::run(&provider, from_file, style, timeout, &output_opts).await?;
        }
        Commands::Credits { file } => {
            cli::credits_cmd::run(file, &output_opts)?;
        }
    }

    Ok(())
}
