#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Headless command-line host that drives the virtual world simulation.

mod ascii;
mod demo;

use std::{io, time::Duration};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use virtual_world_core::{EntityKind, Point, WELCOME_BANNER};
use virtual_world_rendering::{RenderingBackend, Scene, Viewport};
use virtual_world_system_bootstrap::{Config, Simulation};
use virtual_world_system_scheduler::TimeScale;

use crate::ascii::AsciiBackend;

/// Resolution of the simulated wall clock.
const CLOCK_STEP: Duration = Duration::from_millis(10);

/// Command-line arguments accepted by the host.
#[derive(Debug, Parser)]
#[command(name = "virtual-world", version, about = "Runs the virtual world simulation headless")]
struct CliArgs {
    /// Run at half speed.
    #[arg(long)]
    fast: bool,
    /// Run at a quarter of real speed.
    #[arg(long)]
    faster: bool,
    /// Run at a tenth of real speed.
    #[arg(long)]
    fastest: bool,
    /// Number of grid columns.
    #[arg(long, default_value_t = Config::DEFAULT_COLUMNS)]
    columns: u32,
    /// Number of grid rows.
    #[arg(long, default_value_t = Config::DEFAULT_ROWS)]
    rows: u32,
    /// Number of driver ticks to simulate.
    #[arg(long, default_value_t = 50)]
    ticks: u32,
    /// Seed of the random source used by wandering entities.
    #[arg(long, default_value_t = 0)]
    seed: u64,
    /// Spawns a wandering entity at `COL,ROW`.
    #[arg(long = "spawn", value_name = "COL,ROW", value_parser = parse_point, allow_hyphen_values = true)]
    spawns: Vec<Point>,
    /// Ignites spreading hazards around `COL,ROW`.
    #[arg(long = "ignite", value_name = "COL,ROW", value_parser = parse_point, allow_hyphen_values = true)]
    ignitions: Vec<Point>,
    /// Only print the final summary.
    #[arg(long)]
    quiet: bool,
}

impl CliArgs {
    /// Combines the speed flags, keeping the slowest one requested.
    fn time_scale(&self) -> TimeScale {
        [
            (self.fast, TimeScale::FAST),
            (self.faster, TimeScale::FASTER),
            (self.fastest, TimeScale::FASTEST),
        ]
        .into_iter()
        .filter(|(requested, _)| *requested)
        .fold(TimeScale::NORMAL, |scale, (_, preset)| scale.min(preset))
    }
}

fn parse_point(value: &str) -> Result<Point, String> {
    let (col, row) = value
        .split_once(',')
        .ok_or_else(|| format!("expected COL,ROW but received `{value}`"))?;
    let col = col
        .trim()
        .parse::<i32>()
        .map_err(|error| format!("invalid column `{col}`: {error}"))?;
    let row = row
        .trim()
        .parse::<i32>()
        .map_err(|error| format!("invalid row `{row}`: {error}"))?;
    Ok(Point::new(col, row))
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .compact()
        .init();
}

/// Entry point for the virtual world command-line interface.
fn main() -> Result<()> {
    let args = CliArgs::parse();
    init_tracing();
    info!("{}", WELCOME_BANNER);

    let config = Config::new(args.rows, args.columns)
        .with_time_scale(args.time_scale())
        .with_rng_seed(args.seed);
    let mut simulation = Simulation::new(config, demo::images(), 0);
    let placed = simulation
        .populate(demo::placements(args.columns, args.rows))
        .context("failed to populate the demo world")?;
    let scheduled = simulation.schedule_all();
    info!(placed, scheduled, "demo world ready");

    for at in &args.spawns {
        if simulation.spawn(EntityKind::Goomab.key(), *at).is_none() {
            warn!(%at, "spawn request did not place an entity");
        }
    }
    for at in &args.ignitions {
        let ignited = simulation.ignite_around(*at);
        info!(%at, ignited = ignited.len(), "ignition requested");
    }

    let viewport =
        Viewport::covering(simulation.world()).context("world is too small to display")?;
    let mut backend = AsciiBackend::new(io::stdout().lock());
    let mut driver = simulation.tick_driver(0);
    let step = u64::try_from(CLOCK_STEP.as_millis()).unwrap_or(u64::MAX);
    let mut now = 0_u64;
    let mut ticks = 0;

    while ticks < args.ticks {
        now = now.saturating_add(step);
        if !driver.poll(now) {
            continue;
        }
        ticks += 1;
        let _ = simulation.update_on_time(now);
        if !args.quiet {
            backend
                .present(&Scene::capture(simulation.world(), viewport))
                .with_context(|| format!("failed to present tick {ticks}"))?;
        }
    }

    info!(
        ticks,
        entities = simulation.world().len(),
        virtual_time = ?simulation.now(),
        pending = simulation.scheduler().pending_len(),
        "simulation finished"
    );
    Ok(())
}
