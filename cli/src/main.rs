use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use metricset::{Check, MetricSet, ValidationPolicy};

mod frames;
mod sample;

use crate::frames::{write_frame, FrameReader};

#[derive(Parser, Debug)]
#[command(
    name = "metricset-cli",
    about = "Inspect and produce length-prefixed metric set frames"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Decode and validate metric set frames read from stdin
    Inspect(InspectArgs),

    /// Write sample metric set frames to stdout
    Sample {
        /// Number of frames to write
        #[arg(long, default_value_t = 1)]
        frames: usize,
    },
}

#[derive(Args, Debug)]
struct InspectArgs {
    /// YAML file with the validation policy
    #[arg(long)]
    policy: Option<PathBuf>,

    /// Overrides the policy's end time ordering check
    #[arg(long, value_enum)]
    end_time_order: Option<CheckArg>,

    /// Overrides the policy's epoch ordering check
    #[arg(long, value_enum)]
    epoch_order: Option<CheckArg>,

    /// Accept descriptors that repeat a label key
    #[arg(long)]
    allow_duplicate_label_keys: bool,

    /// Print every accepted metric set as a line of JSON
    #[arg(long)]
    json: bool,

    /// Log every violation of a rejected frame, not just the first
    #[arg(long)]
    collect_all: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum CheckArg {
    Enforce,
    Warn,
    Ignore,
}

impl From<CheckArg> for Check {
    fn from(arg: CheckArg) -> Self {
        match arg {
            CheckArg::Enforce => Check::Enforce,
            CheckArg::Warn => Check::Warn,
            CheckArg::Ignore => Check::Ignore,
        }
    }
}

fn init_logging() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    fmt()
        .with_writer(io::stderr)
        .with_env_filter(env_filter)
        .with_ansi(false)
        .with_thread_ids(true)
        .with_target(false)
        .with_file(true)
        .with_line_number(true)
        .with_level(true)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .init();
}

fn load_policy(args: &InspectArgs) -> Result<ValidationPolicy> {
    let mut policy = match &args.policy {
        Some(path) => {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read policy file: {}", path.display()))?;
            serde_yaml::from_str(&contents)
                .with_context(|| format!("Failed to parse policy file: {}", path.display()))?
        }
        None => ValidationPolicy::default(),
    };

    apply_overrides(&mut policy, args);
    Ok(policy)
}

/// Command line flags take precedence over the policy file.
fn apply_overrides(policy: &mut ValidationPolicy, args: &InspectArgs) {
    if let Some(check) = args.end_time_order {
        policy.end_time_order = check.into();
    }
    if let Some(check) = args.epoch_order {
        policy.epoch_order = check.into();
    }
    if args.allow_duplicate_label_keys {
        policy.unique_label_keys = false;
    }
}

fn inspect(args: InspectArgs) -> Result<()> {
    let policy = load_policy(&args)?;
    info!(?policy, "inspecting metric set frames from stdin");

    let stdin = io::stdin().lock();
    let mut stdout = io::stdout().lock();

    let mut num_frames = 0;
    let mut num_rejected = 0;

    for (idx, frame) in FrameReader::new(stdin).enumerate() {
        let frame = frame.with_context(|| format!("Failed to read frame {}", idx))?;
        num_frames += 1;

        match MetricSet::decode(frame.clone(), &policy) {
            Ok(set) => {
                info!(
                    frame = idx,
                    metrics = set.len(),
                    series = set.num_series(),
                    points = set.num_points(),
                    "accepted metric set"
                );

                if args.json {
                    serde_json::to_writer(&mut stdout, &set)
                        .context("Failed to write metric set as JSON")?;
                    writeln!(stdout)?;
                }
            }
            Err(e) => {
                num_rejected += 1;
                error!(frame = idx, error = %e, "rejected metric set");

                if args.collect_all {
                    let violations = MetricSet::diagnose(frame, &policy)
                        .with_context(|| format!("Failed to diagnose frame {}", idx))?;
                    for violation in violations {
                        warn!(frame = idx, %violation, "violation");
                    }
                }
            }
        }
    }

    info!(frames = num_frames, rejected = num_rejected, "done");

    if num_rejected > 0 {
        bail!("{} of {} frames rejected", num_rejected, num_frames);
    }
    Ok(())
}

fn write_samples(frames: usize) -> Result<()> {
    let mut stdout = io::stdout().lock();
    let epoch_start = Utc::now();

    for idx in 0..frames {
        let set = sample::metric_set(epoch_start, idx)
            .context("Failed to build sample metric set")?;
        write_frame(&mut stdout, &set.encode())?;
        info!(frame = idx, metrics = set.len(), "wrote sample metric set");
    }

    stdout.flush()?;
    Ok(())
}

fn main() -> Result<()> {
    init_logging();

    let cli = Cli::parse();
    match cli.command {
        Command::Inspect(args) => inspect(args),
        Command::Sample { frames } => write_samples(frames),
    }
}
