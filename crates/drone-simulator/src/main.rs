//! Drone Fleet Simulator CLI
//!
//! Registers a random fleet through the REST API, then fires concurrent
//! load transactions at it round after round.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use rand::seq::SliceRandom;
use tokio::task::JoinSet;
use tokio::time::sleep;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use drone_simulator::{DroneRegistration, FleetClient, ManifestGenerator, Outcome, Tally};

#[derive(Parser, Debug)]
#[command(name = "drone-simulator")]
#[command(about = "Generate load against the medical drone fleet API")]
struct Args {
    /// Number of drones to register
    #[arg(short, long, default_value = "10")]
    drones: usize,

    /// Number of load rounds
    #[arg(short, long, default_value = "5")]
    rounds: u32,

    /// API base URL
    #[arg(long, default_value = "http://localhost:8080")]
    api_url: String,

    /// Maximum items per manifest
    #[arg(long, default_value = "4")]
    max_items: usize,

    /// Mean item weight in grams
    #[arg(long, default_value = "80")]
    mean_weight: f64,

    /// Extra loads per round aimed at drones that already get one
    #[arg(long, default_value = "3")]
    contention: usize,

    /// Pause between rounds in milliseconds
    #[arg(long, default_value = "1000")]
    round_delay_ms: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("drone_simulator=info".parse()?))
        .init();

    let args = Args::parse();
    info!(
        "Starting fleet simulation: {} drones, {} rounds against {}",
        args.drones, args.rounds, args.api_url
    );

    let client = Arc::new(FleetClient::new(&args.api_url));

    let mut fleet = Vec::with_capacity(args.drones);
    for _ in 0..args.drones {
        let registration = DroneRegistration::random();
        match client.register(&registration).await {
            Ok(drone) => {
                debug!(
                    serial_number = %drone.serial_number,
                    model = %drone.model,
                    battery_level = drone.battery_level,
                    "Drone registered"
                );
                fleet.push(drone.serial_number);
            }
            Err(err) => warn!("Failed to register drone: {}", err),
        }
    }
    info!("Registered {}/{} drones", fleet.len(), args.drones);
    if fleet.is_empty() {
        anyhow::bail!("no drones registered, is the API running at {}?", args.api_url);
    }

    let mut manifests = ManifestGenerator::new(args.mean_weight, args.mean_weight / 2.0, args.max_items)?;
    let mut total = Tally::default();

    for round in 1..=args.rounds {
        let available = client.available_for_loading().await?.len();

        // Every drone gets one load; a few get a second, concurrent one
        let mut targets = fleet.clone();
        targets.extend(
            fleet
                .choose_multiple(&mut rand::thread_rng(), args.contention)
                .cloned(),
        );

        let mut tasks = JoinSet::new();
        for serial_number in targets {
            let client = Arc::clone(&client);
            let items = manifests.next_manifest();
            tasks.spawn(async move {
                let result = client.load(&serial_number, &items).await;
                if let Err(err) = &result {
                    debug!(%serial_number, "Load failed: {}", err);
                }
                Outcome::from_result(&result)
            });
        }

        let mut tally = Tally::default();
        while let Some(outcome) = tasks.join_next().await {
            tally.record(outcome?);
        }

        info!("Round {}/{} | available before: {} | {}", round, args.rounds, available, tally);
        total.merge(&tally);

        if round < args.rounds {
            sleep(Duration::from_millis(args.round_delay_ms)).await;
        }
    }

    info!("Simulation complete: {}", total);
    if total.count(Outcome::Failed) > 0 {
        warn!("{} loads failed at transport or server level", total.count(Outcome::Failed));
    }

    Ok(())
}
