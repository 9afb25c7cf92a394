// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result, anyhow};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, info, warn};
use std::io::Write;
use std::path::PathBuf;
use tokio::sync::mpsc;

use novelforge::app_config::{self, Config};
use novelforge::jobs::JobReport;
use novelforge::token_cache::{MetricCache, TokenCount};
use novelforge::{Controller, FinishState, JobEvent, JobKind, JobOutcome};

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create the raw/, translated/ and archive/ directories
    Init,

    /// Show every unit with its status and token counts
    Status,

    /// Translate raw chapters that have no translation yet or failed last time
    Translate {
        /// Stop after this many newly translated chapters
        #[arg(short, long)]
        limit: Option<usize>,

        /// Flag the run for a system shutdown once it completes
        #[arg(long)]
        shutdown_when_done: bool,
    },

    /// Remove front matter before the first chapter marker
    Clean {
        /// Files to clean (default: every translated file)
        files: Vec<PathBuf>,
    },

    /// Add a placeholder heading to chapters without one
    CheckChapters {
        /// Files to check (default: every translated file)
        files: Vec<PathBuf>,
    },

    /// Merge chapters into one archive file, in the given order
    Merge {
        /// Files to merge (default: every translated file)
        files: Vec<PathBuf>,
    },

    /// Count tokens of every stage file, reusing cached counts
    Tokens,

    /// Generate shell completions for novelforge
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// novelforge - web fiction translation pipeline
///
/// Tracks chapters across the raw, translated and archive directories of a
/// project and runs the translation, cleaning, heading check, merge and
/// token counting jobs over them.
#[derive(Parser, Debug)]
#[command(name = "novelforge")]
#[command(version)]
#[command(about = "Web fiction translation pipeline")]
#[command(long_about = "novelforge tracks chapters across the stages of a translation project and runs pipeline jobs over them.

EXAMPLES:
    novelforge -p my-novel init                      # Create the project directories
    novelforge -p my-novel status                    # List chapters and their status
    novelforge -p my-novel translate --limit 10      # Translate at most 10 new chapters
    novelforge -p my-novel clean                     # Clean every translated chapter
    novelforge -p my-novel merge a.txt b.txt         # Merge two chapters in that order
    novelforge completions bash > novelforge.bash    # Generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. If the config file doesn't
    exist, a default one will be created automatically. The API key can also be
    given through the GEMINI_API_KEY environment variable.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,

    /// Project directory
    #[arg(short, long, default_value = ".")]
    project: PathBuf,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json")]
    config_path: PathBuf,

    /// Gemini API key, overriding the config file
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @creates: New logger with specified level
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        let logger = Box::new(CustomLogger::new(level));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: ANSI color for log level
    fn color_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "\x1B[1;31m",
            Level::Warn => "\x1B[1;33m",
            Level::Info => "\x1B[1;32m",
            Level::Debug => "\x1B[1;36m",
            Level::Trace => "\x1B[1;35m",
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let mut stderr = std::io::stderr();
            let _ = writeln!(
                stderr,
                "{}{} {:<5} {}\x1B[0m",
                Self::color_for_level(record.level()),
                now,
                record.level(),
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // The logger accepts everything; the effective level is set once the config is known
    CustomLogger::init(LevelFilter::Trace)?;
    log::set_max_level(LevelFilter::Info);

    let cli = CommandLineOptions::parse();

    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = CommandLineOptions::command();
        generate(*shell, &mut cmd, "novelforge", &mut std::io::stdout());
        return Ok(());
    }

    let mut config = Config::load_or_create(&cli.config_path)?;
    if let Some(api_key) = &cli.api_key {
        config.translation.api_key = api_key.clone();
    }
    if let Some(log_level) = &cli.log_level {
        config.log_level = log_level.clone().into();
    }
    if let Commands::Translate { limit: Some(limit), .. } = &cli.command {
        config.translation.file_limit = Some(*limit);
    }
    log::set_max_level(config.log_level.to_level_filter());

    let controller = Controller::from_config(&cli.project, config).context("Configuration validation failed")?;
    run_command(&controller, cli.command).await
}

async fn run_command(controller: &Controller, command: Commands) -> Result<()> {
    match command {
        Commands::Init => controller.init(),
        Commands::Status => {
            print_status(controller);
            Ok(())
        }
        Commands::Translate { shutdown_when_done, .. } => {
            let events = controller.start_translation(shutdown_when_done).await;
            finish_job(controller, JobKind::Translate, events).await
        }
        Commands::Clean { files } => {
            let files = or_translated_files(controller, files);
            let events = controller.start_clean(files).await;
            finish_job(controller, JobKind::Clean, events).await
        }
        Commands::CheckChapters { files } => {
            let files = or_translated_files(controller, files);
            let events = controller.start_chapter_check(files).await;
            finish_job(controller, JobKind::ChapterCheck, events).await
        }
        Commands::Merge { files } => {
            let files = or_translated_files(controller, files);
            let events = controller.start_merge(files).await;
            finish_job(controller, JobKind::Merge, events).await
        }
        Commands::Tokens => {
            let events = controller.start_token_sweep().await;
            finish_job(controller, JobKind::TokenSweep, events).await
        }
        Commands::Completions { .. } => Ok(()),
    }
}

fn or_translated_files(controller: &Controller, files: Vec<PathBuf>) -> Vec<PathBuf> {
    if files.is_empty() {
        controller.translated_files()
    } else {
        files
    }
}

/// Follow a started job to its end, stopping it on Ctrl-C
async fn finish_job(
    controller: &Controller,
    kind: JobKind,
    events: mpsc::UnboundedReceiver<JobEvent>,
) -> Result<()> {
    let follow = Controller::follow(events, true);
    tokio::pin!(follow);

    let outcome = tokio::select! {
        outcome = &mut follow => outcome,
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted, stopping {} job", kind);
            controller.stop(kind);
            follow.await
        }
    };
    controller.join(kind).await;

    let outcome = outcome.ok_or_else(|| anyhow!("{} job ended without a result", kind))?;
    print_outcome(&outcome);
    match outcome.state {
        FinishState::Failed => Err(anyhow!(
            "{} job failed: {}",
            kind,
            outcome.error.unwrap_or_else(|| "unknown error".to_string())
        )),
        FinishState::Completed | FinishState::Cancelled => Ok(()),
    }
}

fn print_outcome(outcome: &JobOutcome) {
    for (unit, message) in &outcome.unit_failures {
        warn!("{}: {}", unit, message);
    }

    match &outcome.report {
        Some(JobReport::Translation(report)) => {
            info!(
                "Translated {}, skipped {}, failed {} ({} API calls)",
                report.translated, report.skipped, report.failed, report.api_calls
            );
            if report.limit_reached {
                info!("File limit reached");
            }
            if report.shutdown_requested {
                info!("Shutdown was requested for the end of this run; power management is left to the system");
            }
        }
        Some(JobReport::Clean(report)) => {
            for (name, marker) in &report.cleaned {
                info!("{}: cleaned at {}", name, marker);
            }
            info!(
                "Cleaned {}, without marker {}, failed {}",
                report.cleaned.len(),
                report.unmarked.len(),
                report.failed
            );
        }
        Some(JobReport::ChapterCheck(report)) => info!(
            "Headings present {}, placeholder added {}, failed {}",
            report.present.len(),
            report.missing.len(),
            report.failed
        ),
        Some(JobReport::Merge(report)) => info!("Merged {} files into {:?}", report.merged, report.output),
        Some(JobReport::TokenSweep(report)) => info!(
            "Tokens: original {}, translated {}, combined {} ({} reused, {} recounted, {} unavailable)",
            report.totals.original,
            report.totals.translated,
            report.totals.combined,
            report.reused,
            report.recomputed,
            report.failed
        ),
        Some(JobReport::Download(report)) => info!("Downloaded {} pages", report.pages),
        None => {}
    }
}

fn token_display(count: Option<TokenCount>) -> String {
    count.map(|count| count.to_string()).unwrap_or_else(|| "-".to_string())
}

fn print_status(controller: &Controller) {
    let units = controller.reconcile();
    println!(
        "{:<28} {:<28} {:<34} {:<19} {:>10} {:>12} {:>12}  STATUS",
        "KEY", "ORIGINAL", "OUTPUT", "CREATED", "SIZE", "ORIG TOKENS", "TR TOKENS"
    );
    for unit in &units {
        println!(
            "{:<28} {:<28} {:<34} {:<19} {:>10} {:>12} {:>12}  {}",
            unit.key,
            unit.original_display(),
            unit.output_display(),
            unit.stamp.created_display(),
            unit.stamp.size_display(),
            token_display(unit.original_tokens),
            token_display(unit.translated_tokens),
            unit.status
        );
    }

    let totals = MetricCache::load(controller.layout().token_cache_path()).totals();
    println!(
        "\n{} units. Tokens: original {}, translated {}, combined {}",
        units.len(),
        totals.original,
        totals.translated,
        totals.combined
    );
}
