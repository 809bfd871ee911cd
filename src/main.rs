//! Lane Runner Server
//!
//! Leaderboard HTTP server. Optionally plays headless autopilot runs
//! through the simulation first, so a fresh store has data to serve.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use lane_runner::{
    JsonFileStore, MemoryStore, RankingService, RunStore, TICK_RATE, VERSION,
    game::{Autopilot, Button, RunConfig, RunController},
    network::{
        server::{GameServer, ServerConfig},
        submit::{RunSubmitter, DEFAULT_SUBMIT_QUEUE},
    },
};

#[derive(Parser, Debug)]
#[command(name = "lane-runner-server", about = "Lane Runner leaderboard server", version)]
struct Args {
    /// Interface to bind
    #[arg(long, env = "RUNNER_HOST", default_value = "0.0.0.0")]
    host: String,

    /// Port to bind
    #[arg(long, env = "RUNNER_PORT", default_value_t = 8080)]
    port: u16,

    /// JSON data file; in-memory store when absent
    #[arg(long, env = "RUNNER_DATA_PATH")]
    data_path: Option<PathBuf>,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, env = "RUNNER_LOG", default_value = "info")]
    log_level: String,

    /// Headless autopilot runs to play before serving
    #[arg(long, env = "RUNNER_DEMO_RUNS", default_value_t = 0)]
    demo_runs: u32,

    /// Seed for demo runs (random when absent)
    #[arg(long, env = "RUNNER_SEED")]
    seed: Option<u64>,

    /// Tick cap per demo run
    #[arg(long, default_value_t = 5 * 60 * TICK_RATE as u64)]
    max_demo_ticks: u64,

    /// Scroll speed at the start of a run
    #[arg(
        long,
        env = "RUNNER_GAME_SPEED",
        default_value_t = 5.0,
        value_parser = parse_speed
    )]
    game_speed: f64,

    /// Obstacle spawn chance per tick
    #[arg(
        long,
        env = "RUNNER_OBSTACLE_SPAWN_RATE",
        default_value_t = 0.02,
        value_parser = parse_rate
    )]
    obstacle_spawn_rate: f64,

    /// Coin spawn chance per tick
    #[arg(
        long,
        env = "RUNNER_COIN_SPAWN_RATE",
        default_value_t = 0.03,
        value_parser = parse_rate
    )]
    coin_spawn_rate: f64,

    /// Power-up spawn chance per tick
    #[arg(
        long,
        env = "RUNNER_POWERUP_SPAWN_RATE",
        default_value_t = 0.005,
        value_parser = parse_rate
    )]
    powerup_spawn_rate: f64,
}

impl Args {
    /// Simulation settings with the command-line overrides applied.
    fn run_config(&self) -> RunConfig {
        let mut config = RunConfig {
            base_speed: self.game_speed,
            ..RunConfig::default()
        };
        config.spawn.obstacle.probability = self.obstacle_spawn_rate;
        config.spawn.coin.probability = self.coin_spawn_rate;
        config.spawn.powerup.probability = self.powerup_spawn_rate;
        config
    }
}

fn parse_speed(raw: &str) -> Result<f64, String> {
    let speed: f64 = raw.parse().map_err(|e| format!("{e}"))?;
    if !speed.is_finite() || speed <= 0.0 {
        return Err(format!("speed must be a positive number (got {raw})"));
    }
    Ok(speed)
}

fn parse_rate(raw: &str) -> Result<f64, String> {
    let rate: f64 = raw.parse().map_err(|e| format!("{e}"))?;
    if !(0.0..=1.0).contains(&rate) {
        return Err(format!("spawn rate must be within [0, 1] (got {raw})"));
    }
    Ok(rate)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&args.log_level))
        .context("invalid log filter")?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Lane Runner Server v{}", VERSION);
    info!("Tick Rate: {} Hz", TICK_RATE);

    let store: Arc<dyn RunStore> = match &args.data_path {
        Some(path) => Arc::new(
            JsonFileStore::open(path)
                .with_context(|| format!("failed to open run store at {}", path.display()))?,
        ),
        None => {
            warn!("No data path given, runs are kept in memory only");
            Arc::new(MemoryStore::new())
        }
    };
    let service = RankingService::new(store);

    if args.demo_runs > 0 {
        let config = args.run_config();
        info!(
            speed = config.base_speed,
            obstacles = config.spawn.obstacle.probability,
            coins = config.spawn.coin.probability,
            powerups = config.spawn.powerup.probability,
            "Simulation settings"
        );
        play_demo_runs(&service, config, args.demo_runs, args.seed, args.max_demo_ticks).await?;
    }

    let bind_addr: SocketAddr = format!("{}:{}", args.host, args.port)
        .parse()
        .with_context(|| format!("invalid bind address {}:{}", args.host, args.port))?;
    let config = ServerConfig {
        bind_addr,
        ..Default::default()
    };

    let server = GameServer::new(config, service);
    let shutdown = server.shutdown_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = shutdown.send(());
        }
    });

    server.run().await?;
    Ok(())
}

/// Play autopilot runs and wait until every result is persisted.
async fn play_demo_runs(
    service: &RankingService,
    config: RunConfig,
    runs: u32,
    seed: Option<u64>,
    max_ticks: u64,
) -> Result<()> {
    info!("=== Playing {} demo runs ===", runs);

    let (submitter, worker) = RunSubmitter::spawn(service.clone(), DEFAULT_SUBMIT_QUEUE);
    tokio::task::spawn_blocking(move || autopilot_runs(submitter, config, runs, seed, max_ticks))
        .await
        .context("demo runs panicked")?;
    // All submitter clones are gone; the worker drains and exits
    worker.await.context("submit worker panicked")?;

    let stats = service.aggregate_stats()?;
    info!(
        games = stats.total_games,
        best = stats.best_score,
        average = stats.average_score,
        "Demo runs recorded"
    );
    for (rank, entry) in service.top_high_scores(service.slots())?.iter().enumerate() {
        info!("#{}: {} - Score: {}", rank + 1, entry.player_name, entry.score);
    }
    Ok(())
}

fn autopilot_runs(
    submitter: RunSubmitter,
    config: RunConfig,
    runs: u32,
    seed: Option<u64>,
    max_ticks: u64,
) {
    let bot = Autopilot::default();
    let mut controller = match seed {
        Some(seed) => RunController::new("autopilot", seed, config, submitter),
        None => RunController::with_random_seed("autopilot", config, submitter),
    };

    for run in 1..=runs {
        controller.set_player_name(format!("autopilot-{}", run));
        controller.press(Button::Start);

        let mut ended = false;
        for _ in 0..max_ticks {
            if let Some(intent) = bot.decide(controller.state()) {
                controller.push_intent(intent);
            }
            if controller.frame().run_ended {
                ended = true;
                break;
            }
        }

        if !ended {
            info!(run, "Tick cap reached, ending run");
            controller.finish();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_simulation_defaults() {
        let args = Args::try_parse_from(["lane-runner-server"]).unwrap();
        assert_eq!(args.port, 8080);
        assert_eq!(args.run_config(), RunConfig::default());
    }

    #[test]
    fn test_simulation_overrides() {
        let args = Args::try_parse_from([
            "lane-runner-server",
            "--game-speed",
            "7.5",
            "--obstacle-spawn-rate",
            "0.1",
            "--coin-spawn-rate",
            "0",
            "--powerup-spawn-rate",
            "1",
        ])
        .unwrap();

        let config = args.run_config();
        assert_eq!(config.base_speed, 7.5);
        assert_eq!(config.spawn.obstacle.probability, 0.1);
        assert_eq!(config.spawn.coin.probability, 0.0);
        assert_eq!(config.spawn.powerup.probability, 1.0);
        // Caps and physics keep their defaults
        assert_eq!(config.spawn.obstacle.max_live, RunConfig::default().spawn.obstacle.max_live);
        assert_eq!(config.gravity, RunConfig::default().gravity);
    }

    #[test]
    fn test_out_of_range_settings_rejected() {
        for bad in [
            "--obstacle-spawn-rate=1.5",
            "--coin-spawn-rate=-0.1",
            "--powerup-spawn-rate=NaN",
            "--game-speed=0",
            "--game-speed=inf",
        ] {
            let parsed = Args::try_parse_from(["lane-runner-server", bad]);
            assert!(parsed.is_err(), "{} accepted", bad);
        }
    }
}
