//! Coinflow CLI
//!
//! Replays a JSONL event file into a fresh engine and prints the requested
//! view as JSON.

use std::ffi::OsString;
use std::fs::File;
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use coinflow_engine::{
    Clock, DragEdit, Engine, EngineConfig, FixedClock, PartitionFilter, SystemClock,
};
use serde::Serialize;
use serde_json::json;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod replay;

pub use replay::{replay, EventRecord, ReplaySummary};

#[derive(Parser, Debug)]
#[command(name = "coinflow")]
#[command(about = "Coinflow - verified collaboration graph from monetary events", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Engine configuration file (TOML); defaults apply when missing
    #[arg(short, long, env = "COINFLOW_CONFIG", default_value = "coinflow.toml")]
    config: PathBuf,

    /// Log filter, e.g. `info` or `coinflow_engine=debug`
    #[arg(long, env = "COINFLOW_LOG", default_value = "info")]
    log_level: String,

    /// Reference instant (RFC 3339) for KPI windows and generated timestamps
    #[arg(long)]
    now: Option<DateTime<Utc>>,

    /// Fail on the first rejected record instead of skipping it
    #[arg(long)]
    strict: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug)]
struct EventsArg {
    /// JSONL event file
    events: PathBuf,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Replay only and print the replay summary
    Replay(EventsArg),

    /// Rolling-window KPI
    Kpi {
        #[command(flatten)]
        input: EventsArg,
        #[arg(short, long, default_value_t = 7)]
        window: u32,
        #[arg(long)]
        industry: Option<String>,
        #[arg(long)]
        customer: Option<String>,
        #[arg(long)]
        project: Option<String>,
    },

    /// Link energy and scale metrics
    Network(EventsArg),

    /// Highest-energy team of a given size
    Team {
        #[command(flatten)]
        input: EventsArg,
        #[arg(short = 'k', long, default_value_t = 3)]
        size: usize,
    },

    /// Forecast, optionally with what-if edits (JSON array file)
    Forecast {
        #[command(flatten)]
        input: EventsArg,
        #[arg(long, default_value_t = 7)]
        horizon: u32,
        #[arg(long)]
        edits: Option<PathBuf>,
    },

    /// Simulate one what-if edit
    #[command(alias = "drag")]
    Simulate {
        #[command(flatten)]
        input: EventsArg,
        /// reallocation | link_adjustment | team_swap (or allocation | link | swap)
        kind: String,
        /// Parameters as a JSON object
        #[arg(long, default_value = "{}")]
        params: String,
    },

    /// Structural auto-triggers for the current window
    Triggers(EventsArg),

    /// Full state export
    Export(EventsArg),

    /// Audit trail as JSONL
    Audit {
        #[command(flatten)]
        input: EventsArg,
        /// Print the chain verification instead of the entries
        #[arg(long)]
        verify: bool,
    },
}

/// Run using the current process arguments.
pub fn run() -> Result<()> {
    run_with_args(std::env::args_os())
}

/// Run using the provided argument iterator.
pub fn run_with_args<I, T>(args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = Cli::parse_from(args);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| cli.log_level.as_str().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let stdout = std::io::stdout();
    execute(cli, &mut stdout.lock())
}

/// Execute a parsed command, writing the result to `out`.
pub fn execute(cli: Cli, out: &mut impl Write) -> Result<()> {
    let config = EngineConfig::load(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    let clock: Arc<dyn Clock> = match cli.now {
        Some(now) => Arc::new(FixedClock::new(now)),
        None => Arc::new(SystemClock),
    };
    let mut engine = Engine::with_clock(config, clock)?;

    match cli.command {
        Commands::Replay(input) => {
            let summary = load(&mut engine, &input.events, cli.strict)?;
            print_json(out, &summary)
        }
        Commands::Kpi {
            input,
            window,
            industry,
            customer,
            project,
        } => {
            load(&mut engine, &input.events, cli.strict)?;
            let filter = PartitionFilter {
                industry,
                customer,
                project,
            };
            print_json(out, &engine.get_kpi_for(window, &filter))
        }
        Commands::Network(input) => {
            load(&mut engine, &input.events, cli.strict)?;
            print_json(out, &engine.get_network_value())
        }
        Commands::Team { input, size } => {
            load(&mut engine, &input.events, cli.strict)?;
            print_json(out, &engine.best_team(size))
        }
        Commands::Forecast {
            input,
            horizon,
            edits,
        } => {
            load(&mut engine, &input.events, cli.strict)?;
            let edits: Vec<DragEdit> = match edits {
                Some(path) => {
                    let file = File::open(&path)
                        .with_context(|| format!("opening {}", path.display()))?;
                    serde_json::from_reader(BufReader::new(file))
                        .with_context(|| format!("parsing edits in {}", path.display()))?
                }
                None => Vec::new(),
            };
            print_json(out, &engine.forecast(horizon, &edits)?)
        }
        Commands::Simulate {
            input,
            kind,
            params,
        } => {
            load(&mut engine, &input.events, cli.strict)?;
            let params: serde_json::Value =
                serde_json::from_str(&params).context("--params is not valid JSON")?;
            let delta = engine.simulate_drag(&kind, params)?;
            print_json(
                out,
                &json!({
                    "kind": kind,
                    "predicted_delta": delta.predicted_delta(),
                    "detail": delta,
                }),
            )
        }
        Commands::Triggers(input) => {
            load(&mut engine, &input.events, cli.strict)?;
            print_json(out, &engine.check_triggers())
        }
        Commands::Export(input) => {
            load(&mut engine, &input.events, cli.strict)?;
            writeln!(out, "{}", engine.export_state().to_json()?)?;
            Ok(())
        }
        Commands::Audit { input, verify } => {
            load(&mut engine, &input.events, cli.strict)?;
            if verify {
                print_json(out, &engine.audit_log().verify())
            } else {
                write!(out, "{}", engine.audit_log().to_jsonl()?)?;
                Ok(())
            }
        }
    }
}

fn load(engine: &mut Engine, path: &Path, strict: bool) -> Result<ReplaySummary> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    replay(engine, BufReader::new(file), strict)
}

fn print_json(out: &mut impl Write, value: &impl Serialize) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    fn events_file() -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"{{"event_id": "E1", "timestamp": "2025-04-01T08:00:00Z", "kind": "mint", "amount": 1000000, "minutes": 100, "participants": ["A"]}}"#
        )
        .unwrap();
        writeln!(
            file,
            r#"{{"event_id": "E2", "timestamp": "2025-04-01T09:00:00Z", "kind": "mint", "amount": 2500000, "minutes": 100, "participants": ["A", "B"]}}"#
        )
        .unwrap();
        file
    }

    fn run_capture(args: &[&str]) -> Result<serde_json::Value> {
        let cli = Cli::try_parse_from(args)?;
        let mut out = Vec::new();
        execute(cli, &mut out)?;
        Ok(serde_json::from_slice(&out)?)
    }

    #[test]
    fn parses_global_flags() {
        let cli = Cli::try_parse_from([
            "coinflow",
            "--now",
            "2025-04-02T00:00:00Z",
            "--strict",
            "kpi",
            "events.jsonl",
            "--window",
            "30",
        ])
        .unwrap();
        assert!(cli.strict);
        assert!(cli.now.is_some());
        assert!(matches!(cli.command, Commands::Kpi { window: 30, .. }));
    }

    #[test]
    fn network_command() {
        let file = events_file();
        let path = file.path().to_str().unwrap();
        let value = run_capture(&[
            "coinflow",
            "--config",
            "/nonexistent/coinflow.toml",
            "network",
            path,
        ])
        .unwrap();
        let total = value["total_phi"].as_f64().unwrap();
        assert!((total - 2_000_000.0).abs() < 1e-6);
        assert_eq!(value["verified_link_count"], 1);
    }

    #[test]
    fn kpi_command_uses_reference_instant() {
        let file = events_file();
        let path = file.path().to_str().unwrap();
        let value = run_capture(&[
            "coinflow",
            "--config",
            "/nonexistent/coinflow.toml",
            "--now",
            "2025-04-02T00:00:00Z",
            "kpi",
            path,
        ])
        .unwrap();
        assert_eq!(value["mint"].as_f64().unwrap(), 3_500_000.0);

        let later = run_capture(&[
            "coinflow",
            "--config",
            "/nonexistent/coinflow.toml",
            "--now",
            "2025-05-01T00:00:00Z",
            "kpi",
            path,
        ])
        .unwrap();
        assert_eq!(later["mint"].as_f64().unwrap(), 0.0);
    }

    #[test]
    fn simulate_command_reports_delta() {
        let file = events_file();
        let path = file.path().to_str().unwrap();
        let value = run_capture(&[
            "coinflow",
            "--config",
            "/nonexistent/coinflow.toml",
            "simulate",
            path,
            "link",
            "--params",
            r#"{"person_a": "A", "person_b": "B", "weight_delta": 0.5}"#,
        ])
        .unwrap();
        assert!((value["predicted_delta"].as_f64().unwrap() - 30_000.0).abs() < 1e-9);
        assert_eq!(value["detail"]["kind"], "expected_uplift");
    }

    #[test]
    fn unknown_drag_kind_is_an_error() {
        let file = events_file();
        let path = file.path().to_str().unwrap();
        let result = run_capture(&[
            "coinflow",
            "--config",
            "/nonexistent/coinflow.toml",
            "simulate",
            path,
            "merge",
        ]);
        assert!(result.is_err());
    }
}
