use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use tracing::info;
use tracing_subscriber::EnvFilter;

use handicap_engine::config::{EngineConfig, parse_date};
use handicap_engine::engine::Engine;
use handicap_engine::fake_day;
use handicap_engine::snapshot::{self, MemorySink, RaceDaySnapshot};

const DEFAULT_FAKE_SEED: u64 = 42;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("handicap_engine=info,warn")),
        )
        .init();

    let mut config = EngineConfig::from_env()?;
    if let Some(raw) = arg_value("--date") {
        config.computation_date =
            parse_date(&raw).ok_or_else(|| anyhow!("invalid --date: {raw}"))?;
    }
    if let Some(path) = arg_value("--snapshot") {
        config.snapshot_path = Some(PathBuf::from(path));
    }
    let pretty = has_flag("--pretty");

    let day = load_day(&config)?;
    if arg_value("--date").is_none()
        && std::env::var("HANDICAP_DATE").is_err()
        && let Some(date) = day.date
    {
        config.computation_date = date;
    }

    info!(
        date = %config.computation_date,
        races = day.races.len(),
        horses = day.horse_count(),
        "race day loaded"
    );

    let engine = Engine::new(&config);
    let races = day.race_list();
    let mut sink = MemorySink::new();
    let summary = engine.run_day(&day, &races, &mut sink);

    let results = sink.into_results();
    let output = if pretty {
        serde_json::to_string_pretty(&results)?
    } else {
        serde_json::to_string(&results)?
    };
    println!("{output}");

    eprintln!(
        "Races: {}/{} computed, horses: {}",
        summary.races_computed, summary.races_total, summary.horses_computed
    );
    if !summary.errors.is_empty() {
        eprintln!("  errors: {}", summary.errors.len());
        for err in summary.errors.iter().take(6) {
            eprintln!("   - {err}");
        }
    }
    Ok(())
}

fn load_day(config: &EngineConfig) -> Result<RaceDaySnapshot> {
    if let Some(raw) = arg_value("--fake") {
        let races = raw
            .trim()
            .parse::<usize>()
            .with_context(|| format!("invalid --fake race count: {raw}"))?;
        let seed = arg_value("--seed")
            .and_then(|val| val.trim().parse::<u64>().ok())
            .unwrap_or(DEFAULT_FAKE_SEED);
        return Ok(fake_day::generate(config.computation_date, races, seed));
    }
    let path = config
        .snapshot_path
        .as_deref()
        .context("no race day given: pass --snapshot <file> or --fake <races>")?;
    snapshot::load_snapshot(path)
}

/// Value of `--name value` or `--name=value`.
fn arg_value(name: &str) -> Option<String> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let prefix = format!("{name}=");
    for (idx, arg) in args.iter().enumerate() {
        if let Some(raw) = arg.strip_prefix(&prefix) {
            let trimmed = raw.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
        if arg == name
            && let Some(next) = args.get(idx + 1)
            && !next.trim().is_empty()
        {
            return Some(next.trim().to_string());
        }
    }
    None
}

fn has_flag(name: &str) -> bool {
    std::env::args().skip(1).any(|arg| arg == name)
}
