//! Session persistence.
//!
//! Saves and loads the game session (the guess history) to/from a JSON
//! file so an interrupted game can be resumed. Storage is an observer
//! of the engine, never a controller: read and write failures are
//! logged and swallowed, and nothing here ever reaches engine state.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::engine::GameEngine;
use crate::types::{GameSession, GameState};

/// Default session file path.
const DEFAULT_SESSION_FILE: &str = "updown_session.json";

/// Where an in-progress game is kept between runs.
pub trait SessionStore {
    /// Load a previously persisted session, if any. Called once, before
    /// engine construction.
    fn load(&self) -> Option<GameSession>;

    /// Observe the engine: persist the history on every change and
    /// clear the stored session when the game ends. Call once per
    /// engine.
    fn watch(&self, engine: &GameEngine);
}

/// JSON-file-backed session store.
pub struct FileSessionStore {
    path: PathBuf,
}

impl Default for FileSessionStore {
    fn default() -> Self {
        FileSessionStore::new(DEFAULT_SESSION_FILE)
    }
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileSessionStore { path: path.into() }
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> Option<GameSession> {
        match read_session(&self.path) {
            Ok(session) => session,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Failed to load game session");
                None
            }
        }
    }

    fn watch(&self, engine: &GameEngine) {
        let mut rx = engine.subscribe();
        let path = self.path.clone();

        tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                let snapshot = rx.borrow_and_update().clone();

                if snapshot.state == GameState::GameOver {
                    if let Err(e) = clear_session(&path) {
                        warn!(path = %path.display(), error = %e, "Failed to clear game session");
                    }
                    continue;
                }

                if let Err(e) = write_session(&path, &snapshot.session()) {
                    warn!(path = %path.display(), error = %e, "Failed to save game session");
                }
            }
        });
    }
}

/// Read a session file. `Ok(None)` when no file exists (fresh start).
fn read_session(path: &Path) -> Result<Option<GameSession>> {
    if !path.exists() {
        info!(path = %path.display(), "No saved session found, starting fresh");
        return Ok(None);
    }

    let json = std::fs::read_to_string(path)
        .context(format!("Failed to read session from {}", path.display()))?;

    let session: GameSession = serde_json::from_str(&json)
        .context(format!("Failed to parse session from {}", path.display()))?;

    info!(
        path = %path.display(),
        records = session.price_guess_history.len(),
        score = session.score(),
        "Session loaded from disk"
    );

    Ok(Some(session))
}

fn write_session(path: &Path, session: &GameSession) -> Result<()> {
    let json = serde_json::to_string_pretty(session)
        .context("Failed to serialise game session")?;

    std::fs::write(path, &json)
        .context(format!("Failed to write session to {}", path.display()))?;

    debug!(path = %path.display(), records = session.price_guess_history.len(), "Session saved");
    Ok(())
}

fn clear_session(path: &Path) -> Result<()> {
    if path.exists() {
        std::fs::remove_file(path)
            .context(format!("Failed to delete session file {}", path.display()))?;
        debug!(path = %path.display(), "Session cleared");
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
