//! Inkwake host simulator
//!
//! Runs the duty cycle against sockets and files:
//!
//! ```text
//! inkwake-sim [--config device.toml] [--state DIR] [--cycles N]
//! ```
//!
//! The record lives in `DIR`, the panel image in `DIR/frame.pbm`.
//! Logging follows `RUST_LOG` (default `info`).

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use embassy_executor::Spawner;
use inkwake_core::scheduler::{DutyCycle, Peripherals};
use inkwake_sim::{
    DirMedium, LogIndicator, PbmPanel, SimConfig, SimPower, SimThermometer, SimWakeTimer, TcpRadio,
};
use log::{error, info};

struct Args {
    config: Option<PathBuf>,
    state: PathBuf,
    cycles: u32,
}

impl Args {
    fn parse() -> Result<Self> {
        let mut args = Args {
            config: None,
            state: PathBuf::from("inkwake-state"),
            cycles: 1,
        };

        let mut iter = std::env::args().skip(1);
        while let Some(flag) = iter.next() {
            let mut value = || iter.next().with_context(|| format!("{} needs a value", flag));
            match flag.as_str() {
                "--config" => args.config = Some(PathBuf::from(value()?)),
                "--state" => args.state = PathBuf::from(value()?),
                "--cycles" => args.cycles = value()?.parse().context("--cycles must be a number")?,
                other => bail!("unknown argument '{}'", other),
            }
        }
        Ok(args)
    }
}

async fn run() -> Result<()> {
    let args = Args::parse()?;
    let config = match &args.config {
        Some(path) => SimConfig::load(path)?,
        None => {
            info!("no --config given, using defaults");
            SimConfig::default()
        }
    };
    let sim = &config.sim;
    let timeouts = config.device.timeouts;

    let hw = Peripherals {
        radio: TcpRadio::new(Duration::from_millis(timeouts.request_ms as u64), sim.offline),
        panel: PbmPanel::new(args.state.join("frame.pbm"), sim.panel_width, sim.panel_height),
        storage: DirMedium::new(&args.state),
        power: SimPower::new(sim.battery_percent, sim.battery_drain),
        wake: SimWakeTimer::new(sim.real_sleep),
        indicator: LogIndicator::default(),
        thermometer: SimThermometer::new(sim.room_temperature),
    };
    std::fs::create_dir_all(&args.state).with_context(|| format!("creating {}", args.state.display()))?;

    let mut duty = DutyCycle::new(hw, Some(config.device.clone()));
    for cycle in 1..=args.cycles {
        info!("--- cycle {} of {} ---", cycle, args.cycles);
        let report = duty.run().await;
        info!(
            "{:?} data, battery {:?}, {} failures, next wake in {} s",
            report.freshness, report.battery.state, report.consecutive_failures, report.next_wake_s
        );
        if let Some(room) = report.room_temperature {
            info!("room temperature {:.1} C", room as f32 / 10.0);
        }
        if let Some(err) = report.fetch_error {
            info!("fetch error: {:?}", err);
        }
        if let Some(err) = report.display_error {
            error!("display error: {:?}", err);
        }
    }
    Ok(())
}

#[embassy_executor::main]
async fn main(_spawner: Spawner) {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(err) = run().await {
        error!("{:#}", err);
        std::process::exit(1);
    }
}
