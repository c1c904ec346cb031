mod cmd;
mod config;
mod output;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use partplan_lib::consts::APP_NAME;
use partplan_lib::step::Step;

use crate::cmd::Context;

/// partplan - plan incremental parts lifecycles
#[derive(Parser)]
#[command(name = "partplan")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable verbose output
  #[arg(short, long, global = true)]
  verbose: bool,

  /// Parts file
  #[arg(short, long, global = true, default_value = "parts.yaml")]
  file: PathBuf,

  /// Directory holding the lifecycle data
  #[arg(long, global = true, default_value = ".")]
  work_dir: PathBuf,

  /// Application name, used to namespace persisted state
  #[arg(long, global = true, default_value = APP_NAME)]
  app_name: String,

  /// Target architecture (defaults to the host)
  #[arg(long, global = true)]
  arch: Option<String>,

  /// Maximum number of steps an executor may run at once
  #[arg(short, long, global = true, default_value_t = 1)]
  jobs: usize,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Show the steps needed to reach a target step
  Plan {
    /// Target step (pull, overlay, build, stage, prime)
    step: Step,

    /// Parts to plan for (default: all)
    parts: Vec<String>,

    /// Also show steps that are up to date
    #[arg(long)]
    trace: bool,

    /// Output as JSON
    #[arg(long)]
    json: bool,
  },

  /// Mark the planned steps as completed
  Record {
    /// Target step
    step: Step,

    /// Parts to record (default: all)
    parts: Vec<String>,
  },

  /// Show recorded step state
  Status {
    /// Output as JSON
    #[arg(long)]
    json: bool,
  },

  /// Forget recorded step state
  Clean {
    /// Parts to clean (default: all)
    parts: Vec<String>,
  },

  /// Group the plan into waves of independent steps
  Waves {
    /// Target step
    step: Step,

    /// Parts to plan for (default: all)
    parts: Vec<String>,

    /// Output as JSON
    #[arg(long)]
    json: bool,
  },
}

fn main() {
  let cli = Cli::parse();

  let default_level = if cli.verbose { "debug" } else { "warn" };
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
    .with_writer(std::io::stderr)
    .without_time()
    .init();

  if let Err(e) = run(cli) {
    output::print_error(&format!("{:#}", e));
    std::process::exit(1);
  }
}

fn run(cli: Cli) -> Result<()> {
  let ctx = Context {
    file: cli.file,
    work_dir: cli.work_dir,
    app_name: cli.app_name,
    arch: cli.arch,
    jobs: cli.jobs,
  };

  match cli.command {
    Commands::Plan {
      step,
      parts,
      trace,
      json,
    } => cmd::cmd_plan(&ctx, step, &parts, trace, json),
    Commands::Record { step, parts } => cmd::cmd_record(&ctx, step, &parts),
    Commands::Status { json } => cmd::cmd_status(&ctx, json),
    Commands::Clean { parts } => cmd::cmd_clean(&ctx, &parts),
    Commands::Waves { step, parts, json } => cmd::cmd_waves(&ctx, step, &parts, json),
  }
}
