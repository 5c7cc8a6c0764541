//! GMAT Automation - batch runs and report post-processing for GMAT
//!
//! # Usage
//!
//! ```bash
//! # Generate one script per row of a parameter table
//! gmat-automation modelgen cases.xlsx --out ./output
//!
//! # Run the generated scripts on all but two CPUs, 10 minutes each
//! gmat-automation run ./output/RunList_J009_053725.batch --timeout 600 --reserve 2
//!
//! # Format link reports, then correlate contact windows with them
//! gmat-automation contacts --links links.batch --visibility contacts.batch
//! ```
//!
//! # Environment Variables
//!
//! - `GMAT_AUTOMATION_CONFIG`: Path to the TOML configuration file
//! - `RUST_LOG`: Logging level (default: info)

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Mutex;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::prelude::*;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{fmt, EnvFilter, Layer};

use gmat_automation::batcher::{self, BatchRunner};
use gmat_automation::config::{self, AutomationConfig};
use gmat_automation::modelgen::{read_parameter_table, time_tag, ModelWriter};
use gmat_automation::report::{self, BatchSummary};

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "gmat-automation")]
#[command(about = "Batch execution and report post-processing for GMAT missions")]
#[command(version)]
struct CliArgs {
    /// Configuration file (overrides GMAT_AUTOMATION_CONFIG and ./gmat_automation.toml)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Print the final batch summary as JSON on stdout
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: SubCommand,
}

#[derive(clap::Subcommand, Debug)]
enum SubCommand {
    /// Run every script of a run list through GMAT on a bounded process pool
    Run {
        /// Run list: one `.script` path per line
        batch: PathBuf,
        /// Per-script timeout in seconds
        #[arg(long, value_name = "SECS")]
        timeout: Option<u64>,
        /// Logical CPUs to leave free
        #[arg(long, value_name = "N")]
        reserve: Option<usize>,
        /// Start every script immediately instead of staggering start-up
        #[arg(long)]
        no_jitter: bool,
    },

    /// Reduce generic GMAT text reports to `Report` workbooks
    Reduce {
        /// Report list: one report path per line
        batch: PathBuf,
    },

    /// Format link reports and print the correlation lookup
    Links {
        /// Link report list
        batch: PathBuf,
    },

    /// Build contact workbooks from contact locator and link reports
    Contacts {
        /// Link report list
        #[arg(long, value_name = "BATCH")]
        links: PathBuf,
        /// Contact locator report list
        #[arg(long, value_name = "BATCH")]
        visibility: PathBuf,
    },

    /// Generate per-case GMAT scripts from a parameter table
    Modelgen {
        /// Parameter workbook (.xlsx/.xls/.ods) or CSV file
        table: PathBuf,
        /// Output directory (default: configured or GMAT's OUTPUT_PATH)
        #[arg(long, value_name = "DIR")]
        out: Option<PathBuf>,
    },

    /// Print the effective configuration, or write it to a file
    Config {
        /// Write the configuration to this path instead of printing it
        #[arg(long, value_name = "PATH")]
        init: Option<PathBuf>,
    },
}

impl SubCommand {
    fn name(&self) -> &'static str {
        match self {
            Self::Run { .. } => "run",
            Self::Reduce { .. } => "reduce",
            Self::Links { .. } => "links",
            Self::Contacts { .. } => "contacts",
            Self::Modelgen { .. } => "modelgen",
            Self::Config { .. } => "config",
        }
    }
}

// ============================================================================
// Logging
// ============================================================================

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

fn file_layer<S>(file: File, json: bool) -> Box<dyn Layer<S> + Send + Sync>
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    let layer = fmt::layer()
        .with_ansi(false)
        .with_target(false)
        .with_writer(Mutex::new(file));
    if json {
        layer.json().boxed()
    } else {
        layer.boxed()
    }
}

/// Console logging plus, when configured, a copy appended to `log_file`.
fn init_logging(log_file: Option<&Path>, json: bool) {
    let (file, open_error) = match log_file {
        Some(path) => match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => (Some(file), None),
            Err(e) => (None, Some((path.to_path_buf(), e))),
        },
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter())
        .with(fmt::layer().with_target(false))
        .with(file.map(|f| file_layer(f, json)))
        .init();

    if let Some((path, e)) = open_error {
        warn!(path = %path.display(), error = %e, "Cannot open log file, logging to console only");
    }
}

fn log_banner(command: &str) {
    let user = std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string());
    let host = std::env::var("HOSTNAME")
        .or_else(|_| std::env::var("COMPUTERNAME"))
        .unwrap_or_else(|_| "unknown".to_string());
    let cpus = std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get);

    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    info!("  GMAT Automation v{} - {}", env!("CARGO_PKG_VERSION"), command);
    info!("  User: {} | Host: {} | OS: {} | CPUs: {}", user, host, std::env::consts::OS, cpus);
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
}

fn log_summary(what: &str, summary: &BatchSummary) {
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    info!(
        "  {}: {} succeeded, {} skipped, {} failed",
        what,
        summary.succeeded,
        summary.skipped,
        summary.failed()
    );
    for failure in &summary.failures {
        warn!("  ✗ {}: {}", failure.path.display(), failure.reason);
    }
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
}

// ============================================================================
// Configuration
// ============================================================================

fn load_config(explicit: Option<&Path>) -> Result<AutomationConfig> {
    match explicit {
        Some(path) => {
            let loaded = AutomationConfig::load_from_file(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?;
            info!(path = %path.display(), "Loaded automation config");
            Ok(loaded)
        }
        None => Ok(AutomationConfig::load()),
    }
}

// ============================================================================
// Commands
// ============================================================================

async fn run_batch(
    batch: &Path,
    timeout: Option<u64>,
    reserve: Option<usize>,
    no_jitter: bool,
    cancel: &CancellationToken,
) -> Result<BatchSummary> {
    let config = config::get();
    let mut batcher_config = config.batcher.clone();
    if let Some(secs) = timeout {
        if secs == 0 {
            bail!("--timeout must be positive");
        }
        batcher_config.timeout_secs = secs;
    }
    if let Some(reserved) = reserve {
        batcher_config.reserved_cpus = reserved;
    }
    if no_jitter {
        batcher_config.start_jitter = false;
    }

    let scripts = batcher::load_scripts(batch, &batcher_config.script_suffix)
        .with_context(|| format!("Cannot read run list {}", batch.display()))?;
    let executable = batcher::locate_executable(&config.gmat).context("Cannot locate GMAT")?;
    let runner = BatchRunner::new(executable, &config.gmat, &batcher_config);

    let (_reports, summary) = runner.run(&scripts, cancel).await;
    log_summary("GMAT batch", &summary);
    Ok(summary)
}

fn reduce_reports(batch: &Path) -> Result<BatchSummary> {
    let reports = &config::get().reports;
    // Generic reports are GMAT text, same suffixes as contact reports.
    let paths = report::read_batch_list(batch, &reports.visibility_suffixes)
        .with_context(|| format!("Cannot read report list {}", batch.display()))?;
    let summary = report::reduce_batch(&paths, reports.existing_output);
    log_summary("Report reduction", &summary);
    Ok(summary)
}

fn format_links(batch: &Path) -> Result<BatchSummary> {
    let reports = &config::get().reports;
    let paths = report::read_batch_list(batch, &reports.link_suffixes)
        .with_context(|| format!("Cannot read link list {}", batch.display()))?;
    let (lookup, summary) = report::build_link_lookup(&paths, reports);
    for (key, path) in lookup.iter() {
        println!("{key}\t{}", path.display());
    }
    log_summary("Link reports", &summary);
    Ok(summary)
}

fn build_contacts(links: &Path, visibility: &Path) -> Result<BatchSummary> {
    let reports = &config::get().reports;
    let link_paths = report::read_batch_list(links, &reports.link_suffixes)
        .with_context(|| format!("Cannot read link list {}", links.display()))?;
    let contact_paths = report::read_batch_list(visibility, &reports.visibility_suffixes)
        .with_context(|| format!("Cannot read contact list {}", visibility.display()))?;

    let (lookup, mut summary) = report::build_link_lookup(&link_paths, reports);
    log_summary("Link reports", &summary);

    let (contacts, contact_summary) = report::build_contact_reports(&contact_paths, &lookup, reports);
    for contact in &contacts {
        if contact.windows_skipped > 0 {
            warn!(
                input = %contact.input.display(),
                skipped = contact.windows_skipped,
                "Some contact windows had no usable link data"
            );
        }
    }
    log_summary("Contact reports", &contact_summary);

    summary.merge(contact_summary);
    Ok(summary)
}

fn generate_models(table: &Path, out: Option<PathBuf>) -> Result<BatchSummary> {
    let config = config::get();
    let output_dir = match out {
        Some(dir) => dir,
        None => {
            let executable = batcher::locate_executable(&config.gmat).ok();
            batcher::output_dir(&config.gmat, executable.as_deref())
                .context("No output directory: pass --out or set [gmat] output_path")?
        }
    };

    let parameters = read_parameter_table(table, config.modelgen.parameter_sheet.as_deref())
        .with_context(|| format!("Cannot read parameter table {}", table.display()))?;
    let writer = ModelWriter::new(&output_dir, &config.modelgen, time_tag(chrono::Utc::now()));
    let generation = writer.generate(&parameters).context("Model generation failed")?;

    let mut summary = BatchSummary::default();
    for _ in &generation.generated {
        summary.record_success();
    }
    for (case, reason) in &generation.failures {
        summary.record_failure(&parameters.source, format!("case {case}: {reason}"));
    }
    info!("Run list: {}", generation.run_list.display());
    info!("Report list: {}", generation.report_list.display());
    log_summary("Model generation", &summary);
    Ok(summary)
}

fn write_config(init: Option<&Path>) -> Result<()> {
    let config = config::get();
    match init {
        Some(path) => config.save_to_file(path)?,
        None => println!("{}", config.to_toml()?),
    }
    Ok(())
}

fn print_json(summary: &BatchSummary) {
    match serde_json::to_string_pretty(summary) {
        Ok(text) => println!("{text}"),
        Err(e) => warn!(error = %e, "Cannot serialize batch summary"),
    }
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() -> ExitCode {
    let args = CliArgs::parse();

    // Config decides where the log file goes; log its loading to the console only.
    let bootstrap = fmt().with_env_filter(env_filter()).with_target(false).finish();
    let loaded = tracing::subscriber::with_default(bootstrap, || {
        load_config(args.config.as_deref()).inspect_err(|e| error!("{e:#}"))
    });
    let Ok(automation_config) = loaded else {
        return ExitCode::from(1);
    };

    init_logging(
        automation_config.logging.file.as_deref(),
        automation_config.logging.json,
    );
    config::init(automation_config);
    log_banner(args.command.name());

    // Graceful shutdown via Ctrl+C
    let cancel_token = CancellationToken::new();
    let shutdown_token = cancel_token.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("🛑 Received Ctrl+C, cancelling outstanding work...");
        shutdown_token.cancel();
    });

    let outcome = match args.command {
        SubCommand::Run {
            batch,
            timeout,
            reserve,
            no_jitter,
        } => run_batch(&batch, timeout, reserve, no_jitter, &cancel_token)
            .await
            .map(Some),
        SubCommand::Reduce { batch } => reduce_reports(&batch).map(Some),
        SubCommand::Links { batch } => format_links(&batch).map(Some),
        SubCommand::Contacts { links, visibility } => build_contacts(&links, &visibility).map(Some),
        SubCommand::Modelgen { table, out } => generate_models(&table, out).map(Some),
        SubCommand::Config { init } => write_config(init.as_deref()).map(|()| None),
    };

    match outcome {
        Ok(Some(summary)) => {
            if args.json {
                print_json(&summary);
            }
            ExitCode::from(summary.exit_code())
        }
        Ok(None) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::from(1)
        }
    }
}
