//! cloudsync - Main entry point

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use cloudsync::events::EventBus;
use cloudsync::report::{render_report_json, render_summary, render_summary_json, spawn_printer};
use cloudsync::session::{self, Mode, Outcome, RunOptions, Session, Target, TerminalApprover};
use cloudsync::{shutdown, utils, Settings};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Save local changes and deploy the affected classes
    Deploy(ApplyArgs),
    /// Save local changes without deploying
    Save(ApplyArgs),
    /// Show what would change
    Diff(DiffArgs),
}

#[derive(Args, Debug)]
struct TargetArgs {
    /// Project root directory
    #[arg(long, value_name = "DIR", default_value = ".")]
    root: PathBuf,

    /// Named endpoint profile from the configuration file
    #[arg(long)]
    profile: Option<String>,

    /// Project id (overrides profile and cloudobjects.json)
    #[arg(long)]
    project_id: Option<String>,

    /// Restrict to these classes (comma-separated or repeated)
    #[arg(long, value_delimiter = ',')]
    classes: Vec<String>,
}

#[derive(Args, Debug)]
struct ApplyArgs {
    #[command(flatten)]
    target: TargetArgs,

    /// Treat every local item as changed
    #[arg(long)]
    skip_diff_check: bool,

    /// Apply without asking for confirmation
    #[arg(long)]
    ignore_approval: bool,

    /// Re-send everything and redeploy every class in scope
    #[arg(long)]
    force: bool,

    /// Seconds to wait for each class deployment (0 waits forever)
    #[arg(long, value_name = "SECS")]
    status_timeout: Option<u64>,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug)]
struct DiffArgs {
    #[command(flatten)]
    target: TargetArgs,

    /// Print the comparison as JSON
    #[arg(long)]
    json: bool,
}

impl From<TargetArgs> for Target {
    fn from(args: TargetArgs) -> Self {
        Target {
            root: args.root,
            profile: args.profile,
            project_id: args.project_id,
            classes: args.classes,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let settings = Settings::load(cli.config.as_deref()).context("failed to load settings")?;

    // Initialize logging
    let log_level = cli.log_level.as_deref().unwrap_or(&settings.log.level);
    utils::logger::init(log_level)?;

    tracing::debug!("Starting cloudsync v{}", env!("CARGO_PKG_VERSION"));

    let cancel = CancellationToken::new();
    let signals = shutdown::cancel_on_signal(cancel.clone());

    let result = match cli.command {
        Command::Deploy(args) => apply(&settings, Mode::Deploy, args, cancel.clone()).await,
        Command::Save(args) => apply(&settings, Mode::Save, args, cancel.clone()).await,
        Command::Diff(args) => diff(&settings, args, cancel.clone()).await,
    };

    signals.abort();
    result
}

async fn apply(
    settings: &Settings,
    mode: Mode,
    args: ApplyArgs,
    cancel: CancellationToken,
) -> Result<()> {
    let target = Target::from(args.target);
    let options = RunOptions {
        skip_diff_check: args.skip_diff_check,
        ignore_approval: args.ignore_approval,
        force: args.force,
        status_timeout: match args.status_timeout {
            Some(0) => None,
            Some(secs) => Some(Duration::from_secs(secs)),
            None => settings.status_timeout(),
        },
    };

    let api = session::connect(settings, &target)
        .await
        .context("failed to set up the platform client")?;
    let limit = Arc::new(Semaphore::new(settings.performance.max_concurrency));
    let events = EventBus::new();
    let printer = (!args.json).then(|| spawn_printer(events.subscribe()));

    let outcome = Session::new(api, limit, events, cancel)
        .run(mode, &target, &options, &TerminalApprover)
        .await;

    // The session owned the last sender; the printer drains and exits.
    if let Some(printer) = printer {
        let _ = printer.await;
    }

    match outcome.context("deployment failed")? {
        Outcome::NoChanges => {
            if args.json {
                println!("{{}}");
            } else {
                println!("No changes detected.");
            }
        }
        Outcome::Compared(summary) => print!("{}", render_summary(&summary)),
        Outcome::Applied { summary, report } => {
            if args.json {
                println!("{}", render_report_json(&summary, &report)?);
            } else {
                println!(
                    "Applied {} change(s) in {:.1}s",
                    summary.entity_count(),
                    report.duration_secs
                );
            }
        }
    }
    Ok(())
}

async fn diff(settings: &Settings, args: DiffArgs, cancel: CancellationToken) -> Result<()> {
    let target = Target::from(args.target);
    let api = session::connect(settings, &target)
        .await
        .context("failed to set up the platform client")?;
    let limit = Arc::new(Semaphore::new(settings.performance.max_concurrency));

    let outcome = Session::new(api, limit, EventBus::new(), cancel)
        .run(Mode::Diff, &target, &RunOptions::default(), &TerminalApprover)
        .await
        .context("comparison failed")?;

    if let Outcome::Compared(summary) = outcome {
        if args.json {
            println!("{}", render_summary_json(&summary)?);
        } else {
            print!("{}", render_summary(&summary));
        }
    }
    Ok(())
}
