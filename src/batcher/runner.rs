//! Bounded GMAT process pool
//!
//! One tokio task per script. A semaphore with `pool_size` permits bounds how
//! many GMAT children run at once. Each task sends exactly one [`RunReport`]
//! into an `mpsc` channel; the runner drops its own sender and receives until
//! the channel closes, so the last report can never be missed.

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use rand::Rng;
use regex::Regex;
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::sync::{mpsc, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::BatcherError;
use crate::config::defaults::{JITTER_DENOMINATOR, JITTER_NUMERATOR};
use crate::config::{BatcherConfig, GmatConfig};
use crate::report::{read_batch_list, BatchSummary};

/// How long to wait for a killed child's pipes to close.
const DRAIN_GRACE: Duration = Duration::from_secs(5);

// ============================================================================
// Reports
// ============================================================================

/// How one script run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    Succeeded,
    /// Non-zero exit; `None` when killed by a signal.
    Failed(Option<i32>),
    TimedOut,
    Cancelled,
    SpawnFailed,
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Succeeded => write!(f, "succeeded"),
            Self::Failed(Some(code)) => write!(f, "failed with exit code {code}"),
            Self::Failed(None) => write!(f, "terminated by signal"),
            Self::TimedOut => write!(f, "timed out"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::SpawnFailed => write!(f, "could not be started"),
        }
    }
}

impl From<ExitStatus> for RunOutcome {
    fn from(status: ExitStatus) -> Self {
        if status.success() {
            Self::Succeeded
        } else {
            Self::Failed(status.code())
        }
    }
}

/// Result of one script, sent back through the results channel.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub script: PathBuf,
    pub pid: Option<u32>,
    pub outcome: RunOutcome,
    /// Script name and the tail of GMAT's output.
    pub message: String,
    pub elapsed_secs: f64,
}

// ============================================================================
// Helpers
// ============================================================================

/// Worker count: logical CPUs minus `reserved`, at least one.
pub fn pool_size_for(reserved: usize) -> usize {
    std::thread::available_parallelism()
        .map_or(1, std::num::NonZeroUsize::get)
        .saturating_sub(reserved)
        .max(1)
}

/// Random start delay `n / d` seconds, `n` in 1..=5, `d` in 7..=11.
///
/// Staggers GMAT start-up so concurrent instances don't write their log at once.
pub fn start_jitter() -> Duration {
    let mut rng = rand::thread_rng();
    let n = rng.gen_range(JITTER_NUMERATOR.0..=JITTER_NUMERATOR.1);
    let d = rng.gen_range(JITTER_DENOMINATOR.0..=JITTER_DENOMINATOR.1);
    Duration::from_secs_f64(f64::from(n) / f64::from(d))
}

#[allow(clippy::expect_used)]
fn banner_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"={4,}").expect("static pattern"))
}

/// The script name, a newline, then the last `tail_words` words of `output`
/// with `====` banner runs removed.
pub fn filter_output(script: &Path, output: &str, tail_words: usize) -> String {
    let cleaned = banner_pattern().replace_all(output, " ");
    let words: Vec<&str> = cleaned.split_whitespace().collect();
    let tail = &words[words.len().saturating_sub(tail_words)..];
    let name = script
        .file_name()
        .map_or_else(|| script.display().to_string(), |n| n.to_string_lossy().into_owned());
    format!("{name}\n{}", tail.join(" "))
}

/// Scripts listed in a run list, or an error if there are none.
pub fn load_scripts(batch_list: &Path, suffix: &str) -> Result<Vec<PathBuf>, BatcherError> {
    let scripts = read_batch_list(batch_list, &[suffix])?;
    if scripts.is_empty() {
        return Err(BatcherError::EmptyBatch(batch_list.to_path_buf()));
    }
    Ok(scripts)
}

async fn drain<R: AsyncRead + Unpin>(pipe: Option<R>) -> Vec<u8> {
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        if let Err(e) = pipe.read_to_end(&mut buf).await {
            debug!(error = %e, "Child pipe closed with error");
        }
    }
    buf
}

// ============================================================================
// Runner
// ============================================================================

#[derive(Debug, Clone)]
struct RunSettings {
    executable: PathBuf,
    args: Vec<String>,
    timeout: Duration,
    jitter: bool,
    tail_words: usize,
}

/// Runs GMAT scripts concurrently on a bounded pool.
#[derive(Debug, Clone)]
pub struct BatchRunner {
    settings: Arc<RunSettings>,
    pool_size: usize,
}

enum Waited {
    Exited(std::io::Result<ExitStatus>),
    TimedOut,
    Cancelled,
}

impl BatchRunner {
    pub fn new(executable: PathBuf, gmat: &GmatConfig, batcher: &BatcherConfig) -> Self {
        Self {
            settings: Arc::new(RunSettings {
                executable,
                args: gmat.args.clone(),
                timeout: Duration::from_secs(batcher.timeout_secs),
                jitter: batcher.start_jitter,
                tail_words: batcher.tail_words,
            }),
            pool_size: pool_size_for(batcher.reserved_cpus),
        }
    }

    /// Override the computed pool size.
    #[must_use]
    pub fn with_pool_size(mut self, pool_size: usize) -> Self {
        self.pool_size = pool_size.max(1);
        self
    }

    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    pub fn timeout(&self) -> Duration {
        self.settings.timeout
    }

    /// Run every script and collect one report per script, in completion order.
    pub async fn run(&self, scripts: &[PathBuf], cancel: &CancellationToken) -> (Vec<RunReport>, BatchSummary) {
        let total = scripts.len();
        info!(
            scripts = total,
            pool_size = self.pool_size,
            timeout_secs = self.settings.timeout.as_secs(),
            "Starting GMAT batch"
        );

        let semaphore = Arc::new(Semaphore::new(self.pool_size));
        let (tx, mut rx) = mpsc::channel::<RunReport>(total.max(1));

        for script in scripts {
            let tx = tx.clone();
            let semaphore = Arc::clone(&semaphore);
            let settings = Arc::clone(&self.settings);
            let cancel = cancel.clone();
            let script = script.clone();
            tokio::spawn(async move {
                let report = match semaphore.acquire_owned().await {
                    Ok(_permit) if !cancel.is_cancelled() => run_script(&settings, script, &cancel).await,
                    _ => skipped_report(script),
                };
                if tx.send(report).await.is_err() {
                    warn!("Results channel closed before report was delivered");
                }
            });
        }
        drop(tx);

        let mut reports = Vec::with_capacity(total);
        let mut summary = BatchSummary::default();
        while let Some(report) = rx.recv().await {
            info!("GMAT reports: {}", report.message);
            match report.outcome {
                RunOutcome::Succeeded => summary.record_success(),
                RunOutcome::Cancelled => summary.record_skip(),
                outcome => {
                    warn!(script = %report.script.display(), pid = ?report.pid, %outcome, "GMAT run did not succeed");
                    summary.record_failure(&report.script, outcome.to_string());
                }
            }
            reports.push(report);
            info!("Completed {} of {} tasks", reports.len(), total);
        }
        (reports, summary)
    }
}

fn skipped_report(script: PathBuf) -> RunReport {
    let message = filter_output(&script, "not started", usize::MAX);
    RunReport {
        script,
        pid: None,
        outcome: RunOutcome::Cancelled,
        message,
        elapsed_secs: 0.0,
    }
}

async fn kill(child: &mut tokio::process::Child, script: &Path) {
    if let Err(e) = child.kill().await {
        warn!(script = %script.display(), pid = ?child.id(), error = %e, "Failed to kill GMAT");
    }
}

async fn run_script(settings: &RunSettings, script: PathBuf, cancel: &CancellationToken) -> RunReport {
    if settings.jitter {
        tokio::select! {
            () = cancel.cancelled() => return skipped_report(script),
            () = tokio::time::sleep(start_jitter()) => {}
        }
    }

    let started = Instant::now();
    let mut child = match Command::new(&settings.executable)
        .args(&settings.args)
        .arg(&script)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
    {
        Ok(child) => child,
        Err(e) => {
            let message = filter_output(&script, &format!("failed to start {}: {e}", settings.executable.display()), usize::MAX);
            return RunReport {
                script,
                pid: None,
                outcome: RunOutcome::SpawnFailed,
                message,
                elapsed_secs: 0.0,
            };
        }
    };
    let pid = child.id();
    debug!(script = %script.display(), pid = ?pid, "GMAT started");

    let stdout = tokio::spawn(drain(child.stdout.take()));
    let stderr = tokio::spawn(drain(child.stderr.take()));

    let waited = tokio::select! {
        status = tokio::time::timeout(settings.timeout, child.wait()) => match status {
            Ok(status) => Waited::Exited(status),
            Err(_) => Waited::TimedOut,
        },
        () = cancel.cancelled() => Waited::Cancelled,
    };

    let outcome = match waited {
        Waited::Exited(Ok(status)) => RunOutcome::from(status),
        Waited::Exited(Err(e)) => {
            warn!(script = %script.display(), error = %e, "Waiting on GMAT failed");
            RunOutcome::Failed(None)
        }
        Waited::TimedOut => {
            kill(&mut child, &script).await;
            RunOutcome::TimedOut
        }
        Waited::Cancelled => {
            kill(&mut child, &script).await;
            RunOutcome::Cancelled
        }
    };

    let mut output = Vec::new();
    for handle in [stdout, stderr] {
        match tokio::time::timeout(DRAIN_GRACE, handle).await {
            Ok(Ok(bytes)) => output.extend(bytes),
            Ok(Err(e)) => debug!(error = %e, "Output reader task failed"),
            Err(_) => debug!(script = %script.display(), "Output still open after kill, abandoning it"),
        }
    }
    let mut text = String::from_utf8_lossy(&output).into_owned();
    if outcome == RunOutcome::TimedOut {
        text = format!("{text} timed out after {} s", settings.timeout.as_secs());
    }

    RunReport {
        message: filter_output(&script, &text, settings.tail_words),
        script,
        pid,
        outcome,
        elapsed_secs: started.elapsed().as_secs_f64(),
    }
}
