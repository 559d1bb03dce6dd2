// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

//! Durable snapshots of the endpoint registry.
//!
//! A background task serializes the registry to `analyzer.json` on a timer;
//! on startup the snapshot is loaded back when its version matches. Failures
//! on this path are logged and swallowed: persistence is best-effort and the
//! next tick retries.

use crate::analyzer::{Analyzer, EndpointSnapshot};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};

/// Bumped whenever the snapshot layout changes; mismatching snapshots are
/// discarded, never migrated.
pub const SCHEMA_VERSION: &str = "1.0";

/// Fixed snapshot filename under the configured storage directory.
pub const SNAPSHOT_FILE: &str = "analyzer.json";

#[derive(Debug, Serialize, Deserialize)]
pub struct PersistedState {
    pub version: String,
    pub endpoints: BTreeMap<String, EndpointSnapshot>,
}

/// Serialize the full registry to `<dir>/analyzer.json`.
pub async fn save_state(analyzer: &Analyzer, dir: &Path) -> anyhow::Result<()> {
    let state = PersistedState {
        version: SCHEMA_VERSION.to_string(),
        endpoints: analyzer.snapshot(),
    };
    let json = serde_json::to_vec_pretty(&state)?;

    tokio::fs::create_dir_all(dir).await?;
    tokio::fs::write(dir.join(SNAPSHOT_FILE), json).await?;
    Ok(())
}

/// Load `<dir>/analyzer.json` into the analyzer, replacing its registry
/// wholesale.
///
/// A missing file, malformed JSON, or a version mismatch all leave the
/// analyzer empty; the latter two are logged.
pub async fn load_state(analyzer: &Analyzer, dir: &Path) {
    let path = dir.join(SNAPSHOT_FILE);

    let data = match tokio::fs::read(&path).await {
        Ok(data) => data,
        Err(_) => return,
    };

    let state: PersistedState = match serde_json::from_slice(&data) {
        Ok(state) => state,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "ignoring malformed analyzer snapshot");
            return;
        }
    };

    if state.version != SCHEMA_VERSION {
        warn!(
            found = %state.version,
            expected = SCHEMA_VERSION,
            "ignoring analyzer snapshot with mismatched version"
        );
        return;
    }

    let count = state.endpoints.len();
    analyzer.restore(state.endpoints);
    info!(endpoints = count, path = %path.display(), "restored analyzer snapshot");
}

/// Periodic snapshot task. Saves every `every`, stops when the shutdown
/// channel signals.
pub async fn run_persistor(
    analyzer: Arc<Analyzer>,
    dir: PathBuf,
    every: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(every);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(e) = save_state(&analyzer, &dir).await {
                    warn!(error = %e, "failed to save analyzer snapshot");
                }
            }
            _ = shutdown.changed() => {
                info!("snapshot persistor stopping");
                break;
            }
        }
    }
}
