//! Indicator type catalog
//!
//! Maps the numeric indicator type ids used on the wire to the model
//! names the simulation host knows how to spawn. Backed by a
//! line-oriented `key=value` file (`#` starts a comment), read relative
//! to the working directory:
//!
//! ```text
//! # id = model title
//! 1=VFR_Marker_Cone
//! 2=Windsock
//! ```
//!
//! The file is loaded lazily on the first resolve and cached until
//! [`IndicatorCatalog::reset`] ends the epoch. A malformed line is a
//! warning and is skipped; a missing or unreadable file is an error and
//! yields an empty catalog for the epoch.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Lazy, cached indicator type table
pub struct IndicatorCatalog {
    path: PathBuf,
    /// `None` until the first resolve of an epoch
    cache: Mutex<Option<HashMap<u32, String>>>,
}

impl IndicatorCatalog {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            cache: Mutex::new(None),
        }
    }

    /// Resolve a type id to its model name, loading the file on first
    /// use.
    pub fn resolve(&self, type_id: u32) -> Option<String> {
        let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        let entries = cache.get_or_insert_with(|| load_entries(&self.path));
        entries.get(&type_id).cloned()
    }

    /// Drop the cached entries; the next resolve reloads the file.
    pub fn reset(&self) {
        let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        if cache.take().is_some() {
            log::debug!("Indicator catalog reset, will reload {}", self.path.display());
        }
    }
}

fn load_entries(path: &Path) -> HashMap<u32, String> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) => {
            log::error!("Failed to read indicator catalog {}: {}", path.display(), e);
            return HashMap::new();
        }
    };

    let mut entries = HashMap::new();
    for (index, raw_line) in contents.lines().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            log::warn!(
                "{}:{}: skipping malformed catalog line (expected key=value)",
                path.display(),
                index + 1
            );
            continue;
        };
        match key.trim().parse::<u32>() {
            Ok(type_id) => {
                entries.insert(type_id, value.trim().to_string());
            }
            Err(_) => {
                log::warn!(
                    "{}:{}: indicator type id is not a number: {:?}",
                    path.display(),
                    index + 1,
                    key.trim()
                );
            }
        }
    }

    log::info!(
        "Loaded {} indicator types from {}",
        entries.len(),
        path.display()
    );
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_catalog(dir: &TempDir, contents: &str) -> PathBuf {
        let path = dir.path().join("indicator_types.cfg");
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_resolve_known_and_unknown() {
        let dir = TempDir::new().unwrap();
        let path = write_catalog(&dir, "1=VFR_Marker_Cone\n2=Windsock\n");
        let catalog = IndicatorCatalog::new(&path);

        assert_eq!(catalog.resolve(1), Some("VFR_Marker_Cone".to_string()));
        assert_eq!(catalog.resolve(2), Some("Windsock".to_string()));
        assert_eq!(catalog.resolve(3), None);
    }

    #[test]
    fn test_comments_whitespace_and_malformed_lines() {
        let dir = TempDir::new().unwrap();
        let path = write_catalog(
            &dir,
            "# indicator models\n\n  5 = Marker_Pylon  \nnot-a-line\nx=Ghost\n6=Checked_Flag\n",
        );
        let catalog = IndicatorCatalog::new(&path);

        // Malformed lines are skipped, valid ones survive
        assert_eq!(catalog.resolve(5), Some("Marker_Pylon".to_string()));
        assert_eq!(catalog.resolve(6), Some("Checked_Flag".to_string()));
        assert_eq!(catalog.resolve(0), None);
    }

    #[test]
    fn test_missing_file_yields_empty_catalog() {
        let dir = TempDir::new().unwrap();
        let catalog = IndicatorCatalog::new(dir.path().join("nope.cfg"));
        assert_eq!(catalog.resolve(1), None);
    }

    #[test]
    fn test_cache_is_stable_until_reset() {
        let dir = TempDir::new().unwrap();
        let path = write_catalog(&dir, "1=Old_Model\n");
        let catalog = IndicatorCatalog::new(&path);
        assert_eq!(catalog.resolve(1), Some("Old_Model".to_string()));

        // Rewriting the file must not show through within the epoch
        fs::write(&path, "1=New_Model\n").unwrap();
        assert_eq!(catalog.resolve(1), Some("Old_Model".to_string()));

        catalog.reset();
        assert_eq!(catalog.resolve(1), Some("New_Model".to_string()));
    }

    #[test]
    fn test_duplicate_key_last_wins() {
        let dir = TempDir::new().unwrap();
        let path = write_catalog(&dir, "4=First\n4=Second\n");
        let catalog = IndicatorCatalog::new(&path);
        assert_eq!(catalog.resolve(4), Some("Second".to_string()));
    }
}
