//! CLI parser and command dispatch.

mod backends;
mod collect;
mod passes;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use corpus::config::{load_settings, LoadOptions};
use corpus::OutputFormat;

pub use collect::CollectArgs;

#[derive(Parser)]
#[command(name = "corpus")]
#[command(about = "Collect and normalize text from scraping backends")]
#[command(version)]
pub struct Cli {
    /// Settings file path (overrides auto-discovery)
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Run every backend in a run configuration and save the results
    Collect {
        /// Run configuration (JSON, YAML or TOML)
        #[arg(short = 'c', long = "config")]
        config_path: PathBuf,
        /// Output directory (overrides settings)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Output format (overrides settings)
        #[arg(long, value_enum)]
        format: Option<OutputFormat>,
        /// Maximum backends running at once
        #[arg(short, long)]
        workers: Option<usize>,
        /// Per-backend timeout in seconds
        #[arg(long)]
        timeout: Option<u64>,
        /// Treat unknown backend identifiers as errors
        #[arg(long)]
        strict: bool,
        /// Stop when a backend fails to initialise
        #[arg(long)]
        abort_on_init_failure: bool,
    },

    /// List registered backend identifiers
    Backends,

    /// List the text passes available to pipelines
    Passes,
}

pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let options = LoadOptions {
        settings_path: cli.settings,
    };
    let settings = load_settings(&options).await?;

    match cli.command {
        Commands::Collect {
            config_path,
            output,
            format,
            workers,
            timeout,
            strict,
            abort_on_init_failure,
        } => {
            collect::cmd_collect(
                settings,
                CollectArgs {
                    config_path,
                    output,
                    format,
                    workers,
                    timeout,
                    strict,
                    abort_on_init_failure,
                },
            )
            .await
        }
        Commands::Backends => backends::cmd_backends(&settings),
        Commands::Passes => passes::cmd_passes(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_collect() {
        let cli = Cli::try_parse_from([
            "corpus", "collect", "-c", "run.json", "-o", "out", "--format", "json", "--strict",
        ])
        .unwrap();
        match cli.command {
            Commands::Collect {
                config_path,
                output,
                format,
                strict,
                abort_on_init_failure,
                ..
            } => {
                assert_eq!(config_path, PathBuf::from("run.json"));
                assert_eq!(output, Some(PathBuf::from("out")));
                assert_eq!(format, Some(OutputFormat::Json));
                assert!(strict);
                assert!(!abort_on_init_failure);
            }
            _ => panic!("expected collect"),
        }
    }

    #[test]
    fn test_collect_requires_run_config() {
        assert!(Cli::try_parse_from(["corpus", "collect"]).is_err());
    }
}
