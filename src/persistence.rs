use anyhow::{Context, Result};
use compact_str::CompactString;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::path::Path;
use std::sync::Arc;
use stopdle::{Game, Round};
use tracing::{info, warn};

pub const SNAPSHOT_FILE: &str = "round.bin";

/// The level counter and the secret of the running round.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RoundSnapshot {
    pub level_number: u32,
    pub secret_stop_id: CompactString,
}

impl From<&Round> for RoundSnapshot {
    fn from(round: &Round) -> Self {
        Self {
            level_number: round.level_number(),
            secret_stop_id: round.secret().stop_id.clone(),
        }
    }
}

pub fn save_round(round: &Round, dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
    let path = dir.join(SNAPSHOT_FILE);
    // Write aside and rename so a crash never leaves half a snapshot.
    let tmp_path = dir.join(format!("{}.tmp", SNAPSHOT_FILE));
    let f = File::create(&tmp_path)
        .with_context(|| format!("Failed to create {}", tmp_path.display()))?;
    bincode::serialize_into(f, &RoundSnapshot::from(round))?;
    fs::rename(&tmp_path, &path)
        .with_context(|| format!("Failed to replace {}", path.display()))?;
    Ok(())
}

pub fn load_round(dir: &Path) -> Result<Option<RoundSnapshot>> {
    let path = dir.join(SNAPSHOT_FILE);
    if !path.exists() {
        return Ok(None);
    }
    let f = File::open(&path).with_context(|| format!("Failed to open {}", path.display()))?;
    let snapshot: RoundSnapshot = bincode::deserialize_from(f)
        .with_context(|| format!("Failed to decode {}", path.display()))?;
    Ok(Some(snapshot))
}

/// Puts the game back where it was before a restart, or starts the first
/// round. A saved secret that left the catalog is replaced by a fresh one
/// on the next level.
pub fn resume<R: Rng + ?Sized>(game: &Game, dir: &Path, rng: &mut R) -> Result<Arc<Round>> {
    let snapshot = match load_round(dir) {
        Ok(snapshot) => snapshot,
        Err(e) => {
            warn!("Failed to load previous round: {:#}", e);
            None
        }
    };

    let round = match snapshot {
        Some(snapshot) => match game.restore(snapshot.level_number, &snapshot.secret_stop_id) {
            Ok(round) => round,
            Err(e) => {
                warn!(level_number = snapshot.level_number, "Saved secret is gone: {}", e);
                let stop = game
                    .catalog()
                    .random_stop(rng)
                    .context("No stops to pick a secret from")?;
                game.restore(snapshot.level_number.saturating_add(1), &stop.stop_id)?
            }
        },
        None => game.start(rng).context("No stops to pick a secret from")?,
    };

    save_round(&round, dir)?;
    info!(level_number = round.level_number(), "Round ready");
    Ok(round)
}
