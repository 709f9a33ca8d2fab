//! Local like counters, one JSON file per client.
//!
//! Single writer, no merging: the in-memory map is written back whole on every
//! like, so the last write wins.

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};

pub const DEFAULT_LIKES_FILE: &str = "paidcaster_likes.json";

fn key(boost_id: u64) -> String {
    format!("boost_{}", boost_id)
}

#[derive(Debug)]
pub struct LikesStore {
    path: PathBuf,
    counts: BTreeMap<String, u64>,
}

impl LikesStore {
    /// Load counters from `path`. A missing or unreadable file starts empty.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let counts = match fs::read(&path) {
            Ok(raw) => serde_json::from_slice(&raw).unwrap_or_else(|e| {
                tracing::warn!(error = %e, path = %path.display(), "ignoring corrupt likes file");
                BTreeMap::new()
            }),
            Err(_) => BTreeMap::new(),
        };
        Self { path, counts }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn count(&self, boost_id: u64) -> u64 {
        self.counts.get(&key(boost_id)).copied().unwrap_or(0)
    }

    pub fn all(&self) -> &BTreeMap<String, u64> {
        &self.counts
    }

    /// Increment the counter for `boost_id`, persist, and return the new count.
    pub fn like(&mut self, boost_id: u64) -> Result<u64> {
        let count = self.counts.entry(key(boost_id)).or_insert(0);
        *count += 1;
        let count = *count;
        self.save()?;
        Ok(count)
    }

    fn save(&self) -> Result<()> {
        let contents =
            serde_json::to_string_pretty(&self.counts).context("failed to serialize likes")?;
        fs::write(&self.path, contents)
            .with_context(|| format!("failed to write {}", self.path.display()))
    }
}
