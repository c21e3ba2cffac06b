// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Mirrored user profile: load/save to JSON file with atomic writes.
//!
//! The mirror is a display fallback for cross-reload continuity only. The
//! access token is never written here.

use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::auth::UserProfile;

/// On-disk shape of the mirrored profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MirroredProfile {
    pub user: UserProfile,
    /// Save time as epoch seconds, so consumers can age out stale mirrors.
    #[serde(default)]
    pub saved_at: u64,
}

impl MirroredProfile {
    pub fn new(user: UserProfile) -> Self {
        Self { user, saved_at: epoch_secs() }
    }
}

/// Load the mirrored profile from a JSON file.
pub fn load(path: &Path) -> anyhow::Result<MirroredProfile> {
    let contents = std::fs::read_to_string(path)?;
    let mirror: MirroredProfile = serde_json::from_str(&contents)?;
    Ok(mirror)
}

/// Save the mirrored profile atomically (write tmp + rename).
pub fn save(path: &Path, mirror: &MirroredProfile) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(mirror)?;
    write_atomic(path, &json)
}

/// Atomically write a state file: tmp + rename, creating the parent dir.
///
/// Uses a unique temp filename (PID + counter) to avoid corruption when
/// concurrent writes race on the same `.tmp` file.
pub(crate) fn write_atomic(path: &Path, contents: &str) -> anyhow::Result<()> {
    use std::sync::atomic::{AtomicU32, Ordering};
    static COUNTER: AtomicU32 = AtomicU32::new(0);

    if let Some(dir) = path.parent() {
        if !dir.exists() {
            std::fs::create_dir_all(dir)?;
        }
    }

    let seq = COUNTER.fetch_add(1, Ordering::Relaxed);
    let tmp_name = format!(
        "{}.{}.{}.tmp",
        path.file_name().unwrap_or_default().to_string_lossy(),
        std::process::id(),
        seq,
    );
    let tmp_path = path.with_file_name(tmp_name);
    std::fs::write(&tmp_path, contents)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

/// Remove the mirrored profile. Missing file is not an error.
pub fn clear(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!(err = %e, "failed to remove mirrored profile");
        }
    }
}

fn epoch_secs() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs()
}

#[cfg(test)]
#[path = "persist_tests.rs"]
mod tests;
