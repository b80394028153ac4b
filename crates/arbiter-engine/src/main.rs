//! Arbiter game-master engine binary.
//!
//! This is the main entry point that wires together the authoritative
//! game master, the fixed-timestep simulation loop, the JSON-lines
//! stdio transport, and the best-effort persistence mirror. It loads
//! configuration, initializes all subsystems, and runs the
//! single-writer loop until stdin closes.
//!
//! # Startup Sequence
//!
//! 1. Load configuration (argv path, or `arbiter-config.yaml`)
//! 2. Initialize structured logging (tracing)
//! 3. Load the rulebook (combat table, recipes, starting inventory)
//! 4. Start the persistence mirror (Postgres, or discard when unset)
//! 5. Build the game master
//! 6. Spawn the stdin reader and stdout writer tasks
//! 7. Run the single-writer runtime loop
//! 8. Flush the mirror and log the result

mod error;
mod runtime;

use std::path::Path;

use arbiter_core::{EngineConfig, GameMaster, MirrorHandle, Tuning, mirror};
use arbiter_types::{ActorId, Inbound, OutboundMessage, Rulebook};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;
use crate::runtime::{Inlet, LoopTuning};

/// Default configuration file path, relative to the working directory.
const CONFIG_PATH: &str = "arbiter-config.yaml";

/// Application entry point for the Arbiter engine.
///
/// Initializes all subsystems and runs the single-writer loop until
/// stdin closes.
///
/// # Errors
///
/// Returns an error if any initialization step fails.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration.
    let config = load_config()?;

    // 2. Initialize structured logging.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.filter));
    if config.logging.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    }

    info!("arbiter-engine starting");
    info!(
        map_width = config.world.width,
        map_height = config.world.height,
        proximity_radius = config.world.proximity_radius,
        offer_ttl_ms = config.timing.offer_ttl_ms,
        broadcast_interval_ms = config.runtime.broadcast_interval_ms,
        "Configuration loaded"
    );

    // 3. Load the rulebook.
    let rulebook = Rulebook::load(&config.rules.rulebook_path).map_err(EngineError::from)?;
    info!(
        item_count = rulebook.combat.items.len(),
        recipe_count = rulebook.recipes.len(),
        path = %config.rules.rulebook_path.display(),
        "Rulebook loaded"
    );

    // 4. Start the persistence mirror.
    let (mirror, mirror_rx) = MirrorHandle::channel();
    if let Some(url) = config.infrastructure.database_url.as_deref() {
        let pool = arbiter_db::PostgresPool::connect_url(url)
            .await
            .map_err(EngineError::from)?;
        pool.run_migrations().await.map_err(EngineError::from)?;
        info!("Persistence mirror connected, migrations applied");
        tokio::spawn(arbiter_db::run_mirror(pool, mirror_rx));
    } else {
        info!("No database configured, persistence mirror disabled");
        tokio::spawn(mirror::run_discard(mirror_rx));
    }

    // 5. Build the game master.
    let tuning = Tuning {
        proximity_radius: config.world.proximity_radius,
        offer_ttl_ms: config.timing.offer_ttl_ms,
        defense_window_ms: config.timing.defense_window_ms,
    };
    let gm = GameMaster::new(rulebook, config.world.bounds(), tuning, mirror.clone());
    info!("Game master initialized");

    // 6. Spawn the stdio transport tasks.
    let (inlet_tx, inlet_rx) = mpsc::unbounded_channel();
    let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
    tokio::spawn(read_stdin(inlet_tx));
    tokio::spawn(write_stdout(outbound_rx));

    // 7. Run the single-writer runtime loop.
    let loop_tuning = LoopTuning {
        broadcast_interval_ms: config.runtime.broadcast_interval_ms,
        sim_poll_ms: config.runtime.sim_poll_ms,
        outbox_cap: config.runtime.outbox_cap,
        outbox_batch: config.runtime.outbox_batch,
    };
    runtime::run(gm, loop_tuning, inlet_rx, outbound_tx).await;

    // 8. Let the mirror catch up before exiting.
    mirror.flush().await;
    info!("arbiter-engine stopped");
    Ok(())
}

/// Load configuration from the first argv argument, or [`CONFIG_PATH`],
/// falling back to defaults when no file exists.
fn load_config() -> Result<EngineConfig, EngineError> {
    let arg = std::env::args().nth(1);
    let path_str = arg.as_deref().unwrap_or(CONFIG_PATH);
    let path = Path::new(path_str);
    if path.exists() {
        Ok(EngineConfig::from_file(path)?)
    } else {
        let mut config = EngineConfig::default();
        config.infrastructure.apply_env_overrides();
        Ok(config)
    }
}

/// Read JSON lines from stdin and feed the runtime loop.
///
/// Parsing is two-stage: the actor id is pulled from the raw value
/// first, so payloads that name an actor but fail to parse into a
/// known message shape still get an addressed error reply. Lines with
/// no actor id at all are dropped with a warning.
async fn read_stdin(inlet_tx: mpsc::UnboundedSender<Inlet>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => {
                info!("stdin closed");
                break;
            }
            Err(e) => {
                warn!(error = %e, "stdin read failed");
                break;
            }
        };
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let Some(inlet) = parse_line(trimmed) else {
            continue;
        };
        if inlet_tx.send(inlet).is_err() {
            break;
        }
    }
}

/// Parse one input line into an [`Inlet`], or `None` when the line is
/// unaddressable.
fn parse_line(line: &str) -> Option<Inlet> {
    let value: serde_json::Value = match serde_json::from_str(line) {
        Ok(value) => value,
        Err(e) => {
            warn!(error = %e, "dropping non-JSON input line");
            return None;
        }
    };
    let actor_id = value
        .get("actor_id")
        .and_then(serde_json::Value::as_str)
        .map(ActorId::from);
    match serde_json::from_value::<Inbound>(value) {
        Ok(message) => Some(Inlet::Message(message)),
        Err(e) => actor_id.map_or_else(
            || {
                warn!(error = %e, "dropping unaddressable input line");
                None
            },
            |actor_id| {
                Some(Inlet::Malformed {
                    actor_id,
                    detail: e.to_string(),
                })
            },
        ),
    }
}

/// Serialize outbound messages as JSON lines on stdout.
async fn write_stdout(mut outbound_rx: mpsc::UnboundedReceiver<OutboundMessage>) {
    let mut stdout = tokio::io::stdout();
    while let Some(message) = outbound_rx.recv().await {
        let json = match serde_json::to_string(&message) {
            Ok(json) => json,
            Err(e) => {
                warn!(error = %e, "failed to serialize outbound message");
                continue;
            }
        };
        if stdout.write_all(json.as_bytes()).await.is_err() {
            break;
        }
        if stdout.write_all(b"\n").await.is_err() {
            break;
        }
        if stdout.flush().await.is_err() {
            break;
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn well_formed_overlay_line_parses_to_a_message() {
        let line = r#"{"type":"overlay","actor_id":"alice","seq":1,"chat":"hi"}"#;
        match parse_line(line) {
            Some(Inlet::Message(Inbound::Overlay(overlay))) => {
                assert_eq!(overlay.actor_id.as_str(), "alice");
                assert_eq!(overlay.chat.as_deref(), Some("hi"));
            }
            other => panic!("wrong inlet: {other:?}"),
        }
    }

    #[test]
    fn bare_command_envelope_line_parses_to_a_message() {
        let line = r#"{"type":"command","actor_id":"alice","seq":2,"command":{"kind":"craft","item":"plank"}}"#;
        match parse_line(line) {
            Some(Inlet::Message(Inbound::Command(envelope))) => {
                assert_eq!(envelope.actor_id.as_str(), "alice");
                assert_eq!(envelope.seq, 2);
            }
            other => panic!("wrong inlet: {other:?}"),
        }
    }

    #[test]
    fn addressed_garbage_becomes_a_malformed_inlet() {
        let line = r#"{"type":"frobnicate","actor_id":"alice"}"#;
        match parse_line(line) {
            Some(Inlet::Malformed { actor_id, .. }) => {
                assert_eq!(actor_id.as_str(), "alice");
            }
            other => panic!("wrong inlet: {other:?}"),
        }
    }

    #[test]
    fn unaddressable_garbage_is_dropped() {
        assert!(parse_line("not json at all").is_none());
        assert!(parse_line(r#"{"type":"frobnicate"}"#).is_none());
    }
}
