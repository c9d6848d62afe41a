pub mod cli;
pub mod config;
pub mod error;
pub mod jobs;
pub mod ui;

// Public API re-exports
pub use cli::{Cli, OutputFormat};
pub use config::{CliOverrides, Config};
pub use error::{PreviewError, Result, UserFriendlyError};

// Core functionality re-exports
pub use jobs::{Discovery, Job, JobDiscovery, JobEnv, JobResult, JobRunner, JobStatus, SourceKind};
pub use ui::{GracefulShutdown, OutputFormatter, OutputMode, ProgressManager};

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::mpsc;

/// Resolved runtime settings that are not part of the persisted config:
/// output location, tool locations, worker count, folder excludes.
#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub output_root: PathBuf,
    pub dx_tool: PathBuf,
    pub ifs_tool: PathBuf,
    pub threads: usize,
    pub exclude: Vec<String>,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            output_root: std::env::current_dir()
                .unwrap_or_else(|_| PathBuf::from("."))
                .join("output"),
            dx_tool: cli::default_tool_path("2dx_extract"),
            ifs_tool: cli::default_tool_path("ifs_extract"),
            threads: num_cpus::get().max(1),
            exclude: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchSummary {
    pub jobs: usize,
    pub ok: usize,
    pub skipped: usize,
    pub errors: usize,
}

impl BatchSummary {
    pub fn record(&mut self, result: &JobResult) {
        self.jobs += 1;
        match result.status {
            JobStatus::Ok => self.ok += 1,
            JobStatus::Skip => self.skipped += 1,
            JobStatus::Error => self.errors += 1,
        }
    }

    pub fn has_errors(&self) -> bool {
        self.errors > 0
    }
}

/// Full outcome of one batch run, serializable for JSON output.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub generated_at: DateTime<Utc>,
    pub threads: usize,
    pub summary: BatchSummary,
    pub results: Vec<JobResult>,
}

/// Main library interface: wires configuration, terminal output, progress
/// and signal handling together and drives a whole batch.
pub struct PreviewGen {
    config: Config,
    options: BatchOptions,
    output_formatter: OutputFormatter,
    progress_manager: ProgressManager,
    shutdown: GracefulShutdown,
}

impl PreviewGen {
    pub fn new(
        config: Config,
        options: BatchOptions,
        output_mode: OutputMode,
        verbose: u8,
        quiet: bool,
    ) -> Result<Self> {
        let output_formatter = OutputFormatter::new(output_mode, verbose, quiet);
        let progress_manager =
            ProgressManager::new(matches!(output_mode, OutputMode::Human) && !quiet);
        let shutdown = GracefulShutdown::new()?;

        Ok(Self {
            config,
            options,
            output_formatter,
            progress_manager,
            shutdown,
        })
    }

    /// Create a PreviewGen instance for testing (no signal handler conflicts)
    pub fn new_for_test(
        config: Config,
        options: BatchOptions,
        output_mode: OutputMode,
        verbose: u8,
        quiet: bool,
    ) -> Self {
        let output_formatter = OutputFormatter::new(output_mode, verbose, quiet);
        let progress_manager = ProgressManager::new(false);
        let shutdown = GracefulShutdown::new_for_test();

        Self {
            config,
            options,
            output_formatter,
            progress_manager,
            shutdown,
        }
    }

    /// Create a PreviewGen instance from CLI arguments
    pub fn from_cli(cli_args: &Cli) -> Result<Self> {
        let config = cli_args.load_config()?;
        let options = cli_args.batch_options();
        let output_mode = match cli_args.output_format {
            OutputFormat::Human => OutputMode::Human,
            OutputFormat::Json => OutputMode::Json,
            OutputFormat::Plain => OutputMode::Plain,
        };

        Self::new(
            config,
            options,
            output_mode,
            cli_args.verbosity_level(),
            cli_args.quiet,
        )
    }

    /// Run the whole batch: discover jobs under `charts_root`, execute them
    /// on the worker pool, print results as they complete, and return the
    /// aggregate report. Blocks until every job has reported.
    pub fn run_batch(&self, charts_root: &Path) -> Result<BatchReport> {
        self.shutdown.check_shutdown()?;
        self.validate_inputs(charts_root)?;

        let discovery = self.discover_jobs(charts_root)?;
        if discovery.excluded > 0 {
            self.output_formatter
                .info(&format!("Excluded {} chart folder(s)", discovery.excluded));
        }
        self.shutdown.check_shutdown()?;

        self.output_formatter
            .print_banner(self.options.threads, discovery.jobs.len());

        let (summary, results) = self.execute_jobs(discovery.jobs)?;

        Ok(BatchReport {
            generated_at: Utc::now(),
            threads: self.options.threads,
            summary,
            results,
        })
    }

    /// Discovery only, shared by the dry-run path.
    pub fn discover_jobs(&self, charts_root: &Path) -> Result<Discovery> {
        JobDiscovery::new(self.job_env())
            .with_exclude_patterns(&self.options.exclude)?
            .discover(charts_root)
    }

    /// Fatal configuration problems are reported here, before any worker
    /// starts. Missing asset roots are only warnings: every job would then
    /// classify as SKIP, which can be what the user wants to see.
    fn validate_inputs(&self, charts_root: &Path) -> Result<()> {
        if !charts_root.is_dir() {
            return Err(PreviewError::ChartsDirNotFound {
                path: charts_root.to_path_buf(),
            });
        }

        for tool in [&self.options.dx_tool, &self.options.ifs_tool] {
            if !tool.is_file() {
                return Err(PreviewError::ToolMissing { path: tool.clone() });
            }
        }

        if !self.config.sound_path.is_dir() {
            self.output_formatter
                .warn_missing_asset_root("Primary sound path", &self.config.sound_path);
        }
        if !self.config.omnimix_sound_path.is_dir() {
            self.output_formatter
                .warn_missing_asset_root("Omnimix sound path", &self.config.omnimix_sound_path);
        }

        Ok(())
    }

    fn job_env(&self) -> JobEnv {
        JobEnv {
            sound_path: self.config.sound_path.clone(),
            omnimix_sound_path: self.config.omnimix_sound_path.clone(),
            dx_tool: self.options.dx_tool.clone(),
            ifs_tool: self.options.ifs_tool.clone(),
            output_root: self.options.output_root.clone(),
        }
    }

    /// Scatter/gather: one pool task per job, results drained off a channel
    /// in completion order. Every submitted job yields exactly one result;
    /// a panicking worker is converted to an ERROR result rather than lost.
    fn execute_jobs(&self, jobs: Vec<Job>) -> Result<(BatchSummary, Vec<JobResult>)> {
        let total = jobs.len();

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.options.threads)
            .build()
            .map_err(|e| PreviewError::Config {
                message: format!("Failed to build worker pool: {}", e),
            })?;

        let (tx, rx) = mpsc::channel();
        for job in jobs {
            let tx = tx.clone();
            pool.spawn(move || {
                let result = panic::catch_unwind(AssertUnwindSafe(|| JobRunner::execute(&job)))
                    .unwrap_or_else(|_| JobResult::fault(&job, "worker panicked"));
                let _ = tx.send(result);
            });
        }
        drop(tx);

        let progress = self.progress_manager.create_job_progress(total as u64);
        let mut summary = BatchSummary::default();
        let mut results = Vec::with_capacity(total);

        for result in rx {
            summary.record(&result);
            self.progress_manager
                .suspend(|| self.output_formatter.print_job_result(&result));
            progress.inc(1);
            results.push(result);
        }

        progress.finish_and_clear();
        self.progress_manager.clear();

        Ok((summary, results))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn options(&self) -> &BatchOptions {
        &self.options
    }

    pub fn output_formatter(&self) -> &OutputFormatter {
        &self.output_formatter
    }

    pub fn is_running(&self) -> bool {
        self.shutdown.is_running()
    }

    pub fn request_shutdown(&self) {
        self.shutdown.request_shutdown();
    }

    /// Handle error with user-friendly output
    pub fn handle_error(&self, error: &PreviewError) {
        self.output_formatter.print_user_friendly_error(error);
    }

    /// Generate sample configuration file
    pub fn generate_sample_config<P: AsRef<Path>>(output_path: P) -> Result<()> {
        let sample_config = Config::create_sample_config();
        std::fs::write(output_path.as_ref(), sample_config).map_err(PreviewError::Io)?;
        Ok(())
    }
}
