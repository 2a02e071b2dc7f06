//! The collect command: build, execute and save.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::mpsc;

use corpus::output::{output_path, save_to_path};
use corpus::{
    BuildReport, CollectorEvent, ExecutionOutcome, InitFailurePolicy, OutputFormat,
    PipelineBuilder, PipelineExecutor, RunConfiguration, Settings,
};
use corpus_scrape::{default_registry, ScrapeOptions};

/// Flags that override resolved settings for one run.
#[derive(Debug, Clone, Default)]
pub struct CollectArgs {
    pub config_path: PathBuf,
    pub output: Option<PathBuf>,
    pub format: Option<OutputFormat>,
    pub workers: Option<usize>,
    pub timeout: Option<u64>,
    pub strict: bool,
    pub abort_on_init_failure: bool,
}

impl CollectArgs {
    fn apply_to(&self, settings: &mut Settings) {
        if let Some(ref dir) = self.output {
            settings.output_dir = dir.clone();
        }
        if let Some(format) = self.format {
            settings.output_format = format;
        }
        if let Some(workers) = self.workers {
            settings.workers = workers;
        }
        if let Some(secs) = self.timeout {
            settings.backend_timeout_secs = Some(secs);
        }
        if self.strict {
            settings.strict = true;
        }
        if self.abort_on_init_failure {
            settings.on_init_failure = InitFailurePolicy::Abort;
        }
    }
}

pub async fn cmd_collect(mut settings: Settings, args: CollectArgs) -> anyhow::Result<()> {
    args.apply_to(&mut settings);

    let run_config = RunConfiguration::load_from_path(&args.config_path)
        .await
        .with_context(|| {
            format!(
                "Failed to load run configuration {}",
                args.config_path.display()
            )
        })?;
    tracing::debug!(
        "Run configuration {} has {} entries",
        args.config_path.display(),
        run_config.len()
    );

    let registry = default_registry(&ScrapeOptions::from(&settings));
    let pipeline = PipelineBuilder::new(&registry)
        .init_failure(settings.on_init_failure)
        .strict(settings.strict)
        .build(&run_config)
        .context("Failed to build the collector pipeline")?;

    print_build_report(pipeline.report());
    if pipeline.is_empty() {
        println!("{} No backends to run", style("!").yellow());
    }

    let (tx, rx) = mpsc::channel(64);
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template("  {spinner:.cyan} {wide_msg}")?);
    spinner.enable_steady_tick(Duration::from_millis(100));
    let progress = tokio::spawn(show_progress(rx, spinner));

    let executor = PipelineExecutor::new(settings.executor_config());
    let (backends, _) = pipeline.into_parts();
    let outcome = executor.execute_with_events(backends, Some(tx)).await;
    let _ = progress.await;

    print_summary(&outcome);

    let path = output_path(
        &settings.output_dir,
        &settings.output_basename,
        settings.output_format,
    );
    save_to_path(&outcome.container, settings.output_format, &path)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    println!(
        "{} Wrote {} column(s) to {}",
        style("✓").green(),
        outcome.container.len(),
        path.display()
    );

    Ok(())
}

fn print_build_report(report: &BuildReport) {
    for identifier in &report.unresolved {
        println!(
            "{} No backend registered as '{}', skipped",
            style("!").yellow(),
            identifier
        );
    }
    for failure in &report.init_failures {
        println!(
            "{} Could not initialise '{}' ({}): {}",
            style("✗").red(),
            failure.display_name,
            failure.identifier,
            failure.error
        );
    }
    for name in &report.replaced {
        println!(
            "{} Display name '{}' used more than once; the last entry wins",
            style("!").yellow(),
            name
        );
    }
}

async fn show_progress(mut events: mpsc::Receiver<CollectorEvent>, spinner: ProgressBar) {
    let mut total = 0;
    let mut done = 0;
    let mut running = BTreeSet::new();

    while let Some(event) = events.recv().await {
        match event {
            CollectorEvent::Started { total_backends } => {
                total = total_backends;
            }
            CollectorEvent::BackendStarted { backend } => {
                running.insert(backend);
            }
            CollectorEvent::BackendCompleted { backend, items } => {
                done += 1;
                running.remove(&backend);
                spinner.println(format!(
                    "  {} {} ({} items)",
                    style("✓").green(),
                    backend,
                    items
                ));
            }
            CollectorEvent::BackendFailed { backend, error } => {
                done += 1;
                running.remove(&backend);
                spinner.println(format!("  {} {}: {}", style("✗").red(), backend, error));
            }
            CollectorEvent::Finished { .. } => break,
        }

        let names: Vec<&str> = running.iter().map(String::as_str).collect();
        spinner.set_message(format!("[{}/{}] {}", done, total, names.join(", ")));
    }

    spinner.finish_and_clear();
}

fn print_summary(outcome: &ExecutionOutcome) {
    println!("\n{}", style("Collection Summary").bold());
    println!("{}", "-".repeat(50));
    println!("{:<35} {:>10}", "Backend", "Items");
    println!("{}", "-".repeat(50));

    for (name, rows) in outcome.container.columns() {
        println!("{:<35} {:>10}", name, rows.len());
    }
    for failure in &outcome.failures {
        println!("{:<35} {:>10}", failure.backend_name, style("failed").red());
    }

    println!("{}", "-".repeat(50));
    println!(
        "{} succeeded, {} failed",
        style(outcome.succeeded()).green(),
        style(outcome.failed()).red()
    );
}
