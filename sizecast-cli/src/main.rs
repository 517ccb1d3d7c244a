//! SizeCast CLI — replay, simulation, sweeps and live streaming.
//!
//! Commands:
//! - `replay` — replay a CSV of periods through a preset or config file
//! - `simulate` — replay a seeded synthetic stream
//! - `sweep` — replay every preset over the same CSV, ranked by hit rate
//! - `stream` — feed `period_id,raw_value` lines from stdin to a live engine
//! - `presets` — list the named presets
//! - `config` — print a preset as TOML

use std::io::BufRead;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use sizecast_core::engine::spawn_engine;
use sizecast_core::{Decision, EngineConfig, IngestStatus, Preset, RawObservation};
use sizecast_runner::report::{default_report_path, sweep_csv};
use sizecast_runner::synthetic::{generate, SyntheticConfig};
use sizecast_runner::{load_periods, replay, Report, ReplayResult, RunConfig, Sweep};

#[derive(Parser)]
#[command(name = "sizecast", about = "SizeCast CLI — next-period category prediction with risk control")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a CSV of `period_id,raw_value` rows.
    Replay {
        /// Input CSV.
        #[arg(long)]
        data: PathBuf,

        /// Named preset: balanced, perfect_x, apex, conservative.
        #[arg(long)]
        preset: Option<String>,

        /// Path to a TOML run config file.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Leading periods bulk-seeded without grading.
        #[arg(long)]
        seed_periods: Option<usize>,

        /// Write a JSON report to this file, or into this directory.
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Replay a seeded synthetic stream.
    Simulate {
        #[arg(long, default_value_t = 1000)]
        periods: usize,

        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Probability that a period repeats the previous category.
        #[arg(long)]
        repeat_bias: Option<f64>,

        #[arg(long, default_value = "balanced")]
        preset: String,

        #[arg(long, default_value_t = 0)]
        seed_periods: usize,

        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Replay every preset over the same CSV and rank them.
    Sweep {
        #[arg(long)]
        data: PathBuf,

        #[arg(long, default_value_t = 0)]
        seed_periods: usize,

        /// Run presets one at a time.
        #[arg(long, default_value_t = false)]
        sequential: bool,

        /// Also write the ranking as CSV.
        #[arg(long)]
        csv: Option<PathBuf>,

        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Read `period_id,raw_value` lines from stdin and print each decision.
    Stream {
        #[arg(long, default_value = "balanced")]
        preset: String,

        /// CSV of history to seed before reading stdin.
        #[arg(long)]
        seed_data: Option<PathBuf>,

        /// Print the final snapshot as JSON on exit.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// List the named presets.
    Presets,
    /// Print a preset's engine configuration as TOML.
    Config {
        #[arg(long, default_value = "balanced")]
        preset: String,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_thread_names(true),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Replay {
            data,
            preset,
            config,
            seed_periods,
            out,
        } => run_replay(data, preset, config, seed_periods, out),
        Commands::Simulate {
            periods,
            seed,
            repeat_bias,
            preset,
            seed_periods,
            out,
        } => run_simulate(periods, seed, repeat_bias, &preset, seed_periods, out),
        Commands::Sweep {
            data,
            seed_periods,
            sequential,
            csv,
            out,
        } => run_sweep(&data, seed_periods, sequential, csv, out),
        Commands::Stream {
            preset,
            seed_data,
            json,
        } => run_stream(&preset, seed_data, json),
        Commands::Presets => run_presets(),
        Commands::Config { preset } => {
            print!("{}", parse_preset(&preset)?.to_config().to_toml_string()?);
            Ok(())
        }
    }
}

fn parse_preset(name: &str) -> Result<Preset> {
    name.parse::<Preset>().with_context(|| {
        let valid: Vec<&str> = Preset::all().iter().map(|p| p.name()).collect();
        format!("valid presets: {}", valid.join(", "))
    })
}

fn run_replay(
    data: PathBuf,
    preset: Option<String>,
    config: Option<PathBuf>,
    seed_periods: Option<usize>,
    out: Option<PathBuf>,
) -> Result<()> {
    if config.is_some() && preset.is_some() {
        bail!("--config and --preset are mutually exclusive");
    }

    let mut run = match (config, preset) {
        (Some(path), _) => RunConfig::load(&path)
            .with_context(|| format!("failed to load run config {}", path.display()))?,
        (None, Some(name)) => RunConfig::from_preset(parse_preset(&name)?),
        (None, None) => RunConfig::default(),
    };
    if let Some(n) = seed_periods {
        run.seed_periods = n;
    }

    let loaded = load_periods(&data)?;
    if loaded.malformed_rows > 0 {
        eprintln!("Skipped {} malformed rows", loaded.malformed_rows);
    }
    let result = replay(&run, &loaded.observations)?;
    print_summary(&result);

    if let Some(out) = out {
        let path = write_report(Report::replay(result, Some(loaded.dataset_hash)), &out, "replay")?;
        println!("Report saved to: {}", path.display());
    }
    Ok(())
}

fn run_simulate(
    periods: usize,
    seed: u64,
    repeat_bias: Option<f64>,
    preset: &str,
    seed_periods: usize,
    out: Option<PathBuf>,
) -> Result<()> {
    if let Some(p) = repeat_bias {
        if !(0.0..=1.0).contains(&p) {
            bail!("--repeat-bias must be in [0, 1], got {p}");
        }
    }
    let run = RunConfig::from_preset(parse_preset(preset)?).with_seed_periods(seed_periods);
    let data = generate(&SyntheticConfig {
        periods,
        seed,
        repeat_bias,
        rule: run.engine.category,
        ..SyntheticConfig::default()
    });
    info!(periods, seed, "generated synthetic stream");

    let result = replay(&run, &data)?;
    print_summary(&result);

    if let Some(out) = out {
        let path = write_report(Report::replay(result, None), &out, "simulate")?;
        println!("Report saved to: {}", path.display());
    }
    Ok(())
}

fn run_sweep(
    data: &Path,
    seed_periods: usize,
    sequential: bool,
    csv: Option<PathBuf>,
    out: Option<PathBuf>,
) -> Result<()> {
    let loaded = load_periods(data)?;
    let sweep = Sweep::presets(seed_periods).with_parallelism(!sequential);
    let results = sweep.run_with_progress(&loaded.observations, |idx, total, r| {
        info!(run = idx + 1, total, name = %r.name, "replay done");
    })?;

    println!(
        "{:<4} {:<14} {:>8} {:>6} {:>6} {:>9} {:>9}",
        "#", "preset", "commits", "wins", "losses", "hit rate", "recovery"
    );
    for (i, r) in results.all().iter().enumerate() {
        println!(
            "{:<4} {:<14} {:>8} {:>6} {:>6} {:>9} {:>9}",
            i + 1,
            r.name,
            r.commits,
            r.wins,
            r.losses,
            format_rate(r.hit_rate),
            r.recovery_entries
        );
    }

    if let Some(path) = csv {
        std::fs::write(&path, sweep_csv(&results)?)
            .with_context(|| format!("failed to write {}", path.display()))?;
        println!("Ranking saved to: {}", path.display());
    }
    if let Some(out) = out {
        let path = write_report(Report::sweep(results, Some(loaded.dataset_hash)), &out, "sweep")?;
        println!("Report saved to: {}", path.display());
    }
    Ok(())
}

fn run_stream(preset: &str, seed_data: Option<PathBuf>, json: bool) -> Result<()> {
    let config: EngineConfig = parse_preset(preset)?.to_config();
    let handle = spawn_engine(config)?;
    let reader = handle.reader();

    if let Some(path) = seed_data {
        let loaded = load_periods(&path)?;
        let summary = handle.seed(loaded.observations)?;
        if let Some(d) = &summary.decision {
            print_decision(d);
        }
    }

    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((period, raw)) = line.split_once(',') else {
            eprintln!("expected `period_id,raw_value`, got {line:?}");
            continue;
        };
        let obs = match RawObservation::parse(period, raw) {
            Ok(obs) => obs,
            Err(e) => {
                eprintln!("rejected {line:?}: {e}");
                continue;
            }
        };
        match handle.ingest(obs.period_id, obs.raw_value) {
            Ok(IngestStatus::Accepted { graded, decision }) => {
                if let Some(entry) = graded {
                    println!("{} {} → {}", entry.period_id, entry.actual, entry.result);
                }
                print_decision(&decision);
            }
            Ok(IngestStatus::Ignored { reason }) => eprintln!("ignored {}: {reason:?}", obs.period_id),
            Err(e) => eprintln!("rejected {line:?}: {e}"),
        }
    }

    handle.shutdown()?;
    if json {
        println!("{}", serde_json::to_string_pretty(&*reader.load())?);
    }
    Ok(())
}

fn run_presets() -> Result<()> {
    for preset in Preset::all() {
        let config = preset.to_config();
        let signals: Vec<&str> = config.signals.iter().map(|s| s.component_type.as_str()).collect();
        println!(
            "{:<14} signals: {:<24} thresholds: {:?}",
            preset.name(),
            signals.join(","),
            config.risk.thresholds
        );
    }
    Ok(())
}

fn write_report(report: Report, out: &Path, prefix: &str) -> Result<PathBuf> {
    let path = if out.is_dir() {
        default_report_path(out, prefix)
    } else {
        out.to_path_buf()
    };
    report
        .write(&path)
        .with_context(|| format!("failed to write report {}", path.display()))?;
    Ok(path)
}

fn format_rate(rate: Option<f64>) -> String {
    rate.map(|r| format!("{:.2}%", r * 100.0)).unwrap_or_else(|| "-".into())
}

fn print_decision(d: &Decision) {
    let tier = d.tier.map(|t| format!(" [{t}]")).unwrap_or_default();
    match d.prediction.category() {
        Some(category) => println!(
            "next {}: {} @ {:.2} (level {}){}",
            d.period_id, category, d.strength, d.level, tier
        ),
        None => println!(
            "next {}: skip ({:?}, {}, level {})",
            d.period_id,
            d.skip_reason,
            d.mode,
            d.level
        ),
    }
}

fn print_summary(result: &ReplayResult) {
    println!();
    println!("=== Replay: {} ===", result.name);
    println!("Periods:        {} ({} seeded)", result.periods, result.seeded);
    println!("Decisions:      {}", result.decisions);
    println!("Commits:        {}", result.commits);
    println!("Skips:          {}", result.skips);
    println!("Observed:       {}", result.observations);
    println!("Wins/Losses:    {}/{}", result.wins, result.losses);
    println!("Hit rate:       {}", format_rate(result.hit_rate));
    println!("Max streaks:    W{} / L{}", result.max_win_streak, result.max_loss_streak);
    println!("Sessions:       {}", result.sessions_completed);
    println!("Recoveries:     {}", result.recovery_entries);
    if !result.tiers.is_empty() {
        let tiers: Vec<String> = result.tiers.iter().map(|(k, v)| format!("{k}={v}")).collect();
        println!("Tiers:          {}", tiers.join(", "));
    }
    if result.ignored + result.rejected > 0 {
        println!("Ignored/Rejected: {}/{}", result.ignored, result.rejected);
    }
    println!("Config hash:    {}", result.config_hash);
}
