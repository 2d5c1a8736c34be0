//! Persisted favorite model ids
//!
//! Stored as a small JSON document in the state directory. Only the user's
//! favorites are kept; installed or online status is always rebuilt from live
//! discovery.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum FavoritesError {
    #[error("Failed to write favorites to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to serialize favorites: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Serialize, Deserialize)]
struct FavoritesFile {
    version: u32,
    favorites: BTreeSet<String>,
}

#[derive(Debug, Clone, Default)]
pub struct FavoritesStore {
    path: Option<PathBuf>,
    ids: BTreeSet<String>,
}

impl FavoritesStore {
    /// Store that never touches the disk
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Loads favorites from `path`. A missing or unreadable file yields an
    /// empty set; the file is rewritten on the next change.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let ids = match fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str::<FavoritesFile>(&content) {
                Ok(file) => {
                    debug!(path = %path.display(), count = file.favorites.len(), "Loaded favorites");
                    file.favorites
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Ignoring corrupt favorites file");
                    BTreeSet::new()
                }
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => BTreeSet::new(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Could not read favorites file");
                BTreeSet::new()
            }
        };

        Self {
            path: Some(path),
            ids,
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(String::as_str)
    }

    /// Flips `id` and persists the result. Returns the new state.
    ///
    /// On a write failure the in-memory set is rolled back.
    pub fn toggle(&mut self, id: &str) -> Result<bool, FavoritesError> {
        let now_favorite = if self.ids.remove(id) {
            false
        } else {
            self.ids.insert(id.to_string());
            true
        };

        if let Err(e) = self.save() {
            if now_favorite {
                self.ids.remove(id);
            } else {
                self.ids.insert(id.to_string());
            }
            return Err(e);
        }
        Ok(now_favorite)
    }

    fn save(&self) -> Result<(), FavoritesError> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let body = serde_json::to_string_pretty(&FavoritesFile {
            version: FORMAT_VERSION,
            favorites: self.ids.clone(),
        })?;

        let write_err = |source| FavoritesError::Write {
            path: path.clone(),
            source,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        // Write then rename so a crash never leaves a half-written file
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, body).map_err(write_err)?;
        fs::rename(&tmp, path).map_err(write_err)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_toggle_persists_across_loads() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state").join("favorites.json");

        let mut store = FavoritesStore::load(&path);
        assert!(store.toggle("llama3.1:8b").unwrap());
        assert!(store.contains("llama3.1:8b"));

        let reloaded = FavoritesStore::load(&path);
        assert!(reloaded.contains("llama3.1:8b"));

        let mut store = reloaded;
        assert!(!store.toggle("llama3.1:8b").unwrap());
        assert!(!FavoritesStore::load(&path).contains("llama3.1:8b"));
    }

    #[test]
    fn test_corrupt_file_loads_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("favorites.json");
        fs::write(&path, "{not json").unwrap();

        let store = FavoritesStore::load(&path);
        assert_eq!(store.ids().count(), 0);
    }

    #[test]
    fn test_in_memory_store_never_writes() {
        let mut store = FavoritesStore::in_memory();
        assert!(store.toggle("gpt-4o").unwrap());
        assert!(store.path().is_none());
    }
}
