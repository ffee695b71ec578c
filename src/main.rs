//! UPDOWN — price direction guessing game
//!
//! Entry point. Loads configuration, initialises structured logging,
//! wires the price source, session store, engine, and high-score
//! service together (explicit dependency injection — the engine is
//! owned here, not ambient), then runs until shutdown.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use sqlx::sqlite::SqlitePoolOptions;
use tracing::{info, warn};

use updown::config::AppConfig;
use updown::engine::{GameConfig, GameEngine};
use updown::highscore::repo::HighScoreRepo;
use updown::highscore::routes::{self, ServiceState};
use updown::source::coingecko::CoinGeckoSource;
use updown::storage::{FileSessionStore, SessionStore};
use updown::types::GameState;

const BANNER: &str = r#"
 _   _ ____  ____   _____        ___   _
| | | |  _ \|  _ \ / _ \ \      / / \ | |
| | | | |_) | | | | | | \ \ /\ / /|  \| |
| |_| |  __/| |_| | |_| |\ V  V / | |\  |
 \___/|_|   |____/ \___/  \_/\_/  |_| \_|

  Will it go up or down? Guess before the next tick.
  v0.1.0
"#;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    init_logging();

    let cfg = AppConfig::load_or_default("config.toml")?;

    println!("{BANNER}");
    info!(
        symbol = %cfg.game.symbol,
        poll_interval_ms = cfg.game.poll_interval_ms,
        "UPDOWN starting up"
    );

    // -- High-score service ----------------------------------------------

    if cfg.highscore.enabled {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&cfg.highscore.database_url)
            .await
            .context("Failed to open high-score database")?;
        let repo = HighScoreRepo::new(pool, cfg.game.symbol.clone()).await?;
        routes::spawn_server(Arc::new(ServiceState { repo }), cfg.highscore.port)?;
    }

    // -- Engine wiring -----------------------------------------------------

    let source = Arc::new(CoinGeckoSource::new(cfg.source_api_key())?);
    let store = FileSessionStore::new(&cfg.session.file);

    let resume = store.load();
    if let Some(session) = &resume {
        info!(
            records = session.price_guess_history.len(),
            score = session.score(),
            "Resuming previous session"
        );
    }

    let engine = GameEngine::new(
        source,
        GameConfig::new(
            cfg.game.symbol.clone(),
            Duration::from_millis(cfg.game.poll_interval_ms),
        )
        .with_resume(resume),
    );
    store.watch(&engine);

    engine.start(false);

    // -- Main loop ---------------------------------------------------------

    let mut rx = engine.subscribe();
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    info!("Game running. Press Ctrl+C to stop.");

    loop {
        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = rx.borrow_and_update().clone();
                info!(
                    state = %snapshot.state,
                    score = snapshot.score,
                    price = snapshot.current_price.as_ref().map(|p| p.amount),
                    "Game update"
                );
                if snapshot.state == GameState::Error {
                    warn!("Price source unavailable; restart required to continue");
                }
            }
            _ = &mut shutdown => {
                info!("Shutdown signal received.");
                break;
            }
        }
    }

    engine.stop();
    info!(score = engine.score(), "UPDOWN shut down cleanly.");

    Ok(())
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("updown=info"));

    let json_logging = std::env::var("UPDOWN_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}
