use std::path::PathBuf;

use mob_ai_throttler::config::TICKS_PER_SECOND;
use mob_ai_throttler::sim::SimWorld;
use mob_ai_throttler::Optimizer;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Simulation parameters from the environment
struct SimSettings {
    config_dir: PathBuf,
    mobs: usize,
    players: usize,
    ticks: u64,
    seed: u64,
}

impl SimSettings {
    fn load_or_default() -> Self {
        let mut settings = Self {
            config_dir: PathBuf::from("config/mob-ai-throttler"),
            mobs: 2000,
            players: 10,
            ticks: 60 * TICKS_PER_SECOND,
            seed: 42,
        };

        if let Ok(dir) = std::env::var("MOB_AI_CONFIG_DIR") {
            settings.config_dir = PathBuf::from(dir);
        }
        settings.mobs = env_or("SIM_MOBS", settings.mobs);
        settings.players = env_or("SIM_PLAYERS", settings.players);
        settings.ticks = env_or("SIM_TICKS", settings.ticks);
        settings.seed = env_or("SIM_SEED", settings.seed);

        settings
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(value) => match value.parse() {
            Ok(parsed) => parsed,
            Err(_) => {
                warn!("Invalid {} '{}', using default", key, value);
                default
            }
        },
        Err(_) => default,
    }
}

fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Mob AI Throttler simulation v{}", env!("CARGO_PKG_VERSION"));

    let settings = SimSettings::load_or_default();
    info!(
        "Simulating {} mobs and {} players for {} ticks, config at {}",
        settings.mobs,
        settings.players,
        settings.ticks,
        settings.config_dir.display()
    );

    let mut optimizer = Optimizer::load(&settings.config_dir);
    optimizer.enable();

    let mut world = SimWorld::new(settings.mobs, settings.players, settings.seed);
    let mut total_runs = 0u64;
    let mut total_skipped = 0u64;

    for _ in 0..settings.ticks {
        let report = world.step(&mut optimizer);
        total_runs += u64::from(report.ai_runs);
        total_skipped += u64::from(report.ai_skipped);

        if report.tick % (10 * TICKS_PER_SECOND) == 0 {
            info!(
                "tick={} aiRuns={} aiSkipped={} pushesDropped={} cacheSize={}",
                report.tick,
                report.ai_runs,
                report.ai_skipped,
                report.pushes_dropped,
                optimizer.cache_size()
            );
        }
    }

    let starved = world
        .entities()
        .iter()
        .filter(|e| !e.player && e.ai_runs == 0)
        .count();
    info!(
        "Simulation done: aiRuns={} aiSkipped={} neverRan={}",
        total_runs, total_skipped, starved
    );
    info!("\n{}", optimizer.stats().to_prometheus(optimizer.cache_size()));

    optimizer.disable();

    Ok(())
}
