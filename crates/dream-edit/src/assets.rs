//! Whole-file asset storage under a single root directory.
//!
//! Assets are addressed by bare file name. Reads and writes are bounded by a
//! byte ceiling; oversized files fail rather than being truncated.

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::EditorConfig;

/// Errors from asset I/O.
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    /// The asset exceeds the configured size ceiling.
    #[error("asset '{name}' is {size} bytes, over the {limit} byte limit")]
    TooLarge {
        name: String,
        size: u64,
        limit: usize,
    },

    /// The underlying filesystem operation failed.
    #[error("asset '{name}': {source}")]
    Io {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

/// Reads and writes named assets under `root`.
#[derive(Debug, Clone)]
pub struct AssetStore {
    root: PathBuf,
    max_bytes: usize,
}

impl AssetStore {
    pub fn new(root: impl Into<PathBuf>, max_bytes: usize) -> Self {
        Self {
            root: root.into(),
            max_bytes,
        }
    }

    pub fn from_config(config: &EditorConfig) -> Self {
        Self::new(&config.asset_root, config.max_asset_bytes)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// Location a UI can use to display the asset.
    pub fn url(&self, name: &str) -> String {
        format!("file://{}", self.path(name).display())
    }

    /// Read an asset as UTF-8 text.
    pub fn read(&self, name: &str) -> Result<String, AssetError> {
        let path = self.path(name);
        let io = |source| AssetError::Io {
            name: name.to_owned(),
            source,
        };
        let size = fs::metadata(&path).map_err(io)?.len();
        if size > self.max_bytes as u64 {
            return Err(AssetError::TooLarge {
                name: name.to_owned(),
                size,
                limit: self.max_bytes,
            });
        }
        fs::read_to_string(&path).map_err(io)
    }

    /// Replace an asset's contents, creating the root if needed.
    pub fn write(&self, name: &str, contents: &str) -> Result<(), AssetError> {
        if contents.len() > self.max_bytes {
            return Err(AssetError::TooLarge {
                name: name.to_owned(),
                size: contents.len() as u64,
                limit: self.max_bytes,
            });
        }
        let io = |source| AssetError::Io {
            name: name.to_owned(),
            source,
        };
        fs::create_dir_all(&self.root).map_err(io)?;
        fs::write(self.path(name), contents).map_err(io)
    }

    /// [`read`](Self::read), logging failures and returning an empty string.
    pub fn contents(&self, name: &str) -> String {
        match self.read(name) {
            Ok(text) => text,
            Err(err) => {
                tracing::warn!(asset = %name, error = %err, "failed to read asset");
                String::new()
            }
        }
    }

    /// [`write`](Self::write), logging failures and returning whether the
    /// asset was written.
    pub fn write_contents(&self, name: &str, contents: &str) -> bool {
        match self.write(name, contents) {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(asset = %name, error = %err, "failed to write asset");
                false
            }
        }
    }

    /// Names of the files in the root ending with `suffix`, sorted.
    pub fn list(&self, suffix: &str) -> Vec<String> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(err) => {
                tracing::warn!(root = %self.root.display(), error = %err, "failed to list assets");
                return Vec::new();
            }
        };
        let mut names: Vec<String> = entries
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_ok_and(|t| t.is_file()))
            .filter_map(|entry| entry.file_name().into_string().ok())
            .filter(|name| name.ends_with(suffix))
            .collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let store = AssetStore::new(dir.path().join("nested"), 1024);
        assert!(store.write_contents("a.scn", "{}"));
        assert_eq!(store.contents("a.scn"), "{}");
    }

    #[test]
    fn missing_asset_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = AssetStore::new(dir.path(), 1024);
        assert!(matches!(store.read("nope.bp"), Err(AssetError::Io { .. })));
        assert_eq!(store.contents("nope.bp"), "");
    }

    #[test]
    fn oversized_assets_fail_both_ways() {
        let dir = tempfile::tempdir().unwrap();
        let store = AssetStore::new(dir.path(), 8);
        assert!(matches!(
            store.write("big.txt", "0123456789"),
            Err(AssetError::TooLarge { size: 10, limit: 8, .. })
        ));
        assert!(!store.write_contents("big.txt", "0123456789"));

        std::fs::write(dir.path().join("big.txt"), "0123456789").unwrap();
        assert!(matches!(store.read("big.txt"), Err(AssetError::TooLarge { .. })));
        assert_eq!(store.contents("big.txt"), "");
    }

    #[test]
    fn list_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        let store = AssetStore::new(dir.path(), 1024);
        for name in ["b.bp", "a.bp", "level.scn", "hero.png"] {
            store.write(name, "x").unwrap();
        }
        std::fs::create_dir(dir.path().join("sub.bp")).unwrap();
        assert_eq!(store.list(".bp"), vec!["a.bp", "b.bp"]);
        assert_eq!(store.list("").len(), 4);
    }
}
