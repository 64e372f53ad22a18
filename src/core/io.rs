//! JSON files for designs, move feeds and command output

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::debug;

use crate::error::Result;
use crate::types::{Design, DialogueMove};

/// Save a design as `<dir>/<id>.json`; `/` in ids becomes `_`
pub fn save_design(design: &Design, dir: impl AsRef<Path>) -> Result<PathBuf> {
    let dir = dir.as_ref();
    let filename = dir.join(format!("{}.json", file_stem(design.id())));
    save_json(design, &filename)?;
    debug!(design = %design.id(), path = %filename.display(), "saved design");
    Ok(filename)
}

/// Load a design, replaying its insertion rules
pub fn load_design(path: impl AsRef<Path>) -> Result<Design> {
    let json = std::fs::read_to_string(path.as_ref())?;
    Ok(serde_json::from_str(&json)?)
}

/// Load a move feed: a JSON array of moves
pub fn load_moves(path: impl AsRef<Path>) -> Result<Vec<DialogueMove>> {
    let json = std::fs::read_to_string(path.as_ref())?;
    Ok(serde_json::from_str(&json)?)
}

/// Pretty JSON to `path`, creating parent directories
pub fn save_json<T: Serialize>(value: &T, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let json = serde_json::to_string_pretty(value)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, json)?;
    Ok(())
}

fn file_stem(id: &str) -> String {
    id.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '.' { c } else { '_' })
        .collect()
}

// =============================================================================
// TESTS
// =============================================================================
