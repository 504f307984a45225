//! Persistence for the manual - save/load JSON snapshots.
//!
//! The snapshot holds the items alone (plus store timestamps); the metadata
//! index and the id counter are rebuilt from the items on load, so the item
//! list stays the single source of truth.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ManualError, Result};

use super::item::Item;
use super::store::{ManualStore, MANUAL_VERSION};

/// Serialized form of a [`ManualStore`].
#[derive(Debug, Serialize, Deserialize)]
struct ManualSnapshot {
    /// Version of the manual snapshot format.
    manual_version: String,
    /// When the store was created.
    created_at: DateTime<Utc>,
    /// When the store last committed a mutation.
    updated_at: DateTime<Utc>,
    /// Every item, retired ones included, in insertion order.
    items: Vec<Item>,
}

impl ManualStore {
    /// Serialize the full store state to a JSON string.
    pub fn to_json(&self) -> Result<String> {
        let snapshot = ManualSnapshot {
            manual_version: MANUAL_VERSION.to_string(),
            created_at: self.created_at(),
            updated_at: self.updated_at(),
            items: self.snapshot_items(),
        };
        Ok(serde_json::to_string_pretty(&snapshot)?)
    }

    /// Reconstruct a store from a JSON snapshot string.
    pub fn from_json(json: &str) -> Result<Self> {
        let snapshot: ManualSnapshot = serde_json::from_str(json)?;
        if snapshot.manual_version != MANUAL_VERSION {
            return Err(ManualError::Persistence(format!(
                "unsupported manual version '{}' (expected '{}')",
                snapshot.manual_version, MANUAL_VERSION
            )));
        }
        Self::from_parts(snapshot.created_at, snapshot.updated_at, snapshot.items)
    }

    /// Save the store to a JSON file.
    ///
    /// # Example
    ///
    /// ```no_run
    /// # use vademecum::ManualStore;
    /// # fn example(store: &ManualStore) -> vademecum::Result<()> {
    /// store.save("project.manual.json")?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            fs::create_dir_all(parent).map_err(|e| {
                ManualError::Persistence(format!(
                    "Failed to create directory '{}': {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let file = File::create(path).map_err(|e| {
            ManualError::Persistence(format!("Failed to create file '{}': {}", path.display(), e))
        })?;

        let writer = BufWriter::new(file);
        let snapshot = ManualSnapshot {
            manual_version: MANUAL_VERSION.to_string(),
            created_at: self.created_at(),
            updated_at: self.updated_at(),
            items: self.snapshot_items(),
        };
        serde_json::to_writer_pretty(writer, &snapshot)
            .map_err(|e| ManualError::Persistence(format!("Failed to serialize manual: {}", e)))?;

        Ok(())
    }

    /// Load a store from a JSON file, rebuilding the index from items.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let file = File::open(path).map_err(|e| {
            ManualError::Persistence(format!("Failed to open file '{}': {}", path.display(), e))
        })?;

        let reader = BufReader::new(file);
        let snapshot: ManualSnapshot = serde_json::from_reader(reader).map_err(|e| {
            ManualError::Persistence(format!("Failed to parse manual '{}': {}", path.display(), e))
        })?;

        if snapshot.manual_version != MANUAL_VERSION {
            return Err(ManualError::Persistence(format!(
                "unsupported manual version '{}' (expected '{}')",
                snapshot.manual_version, MANUAL_VERSION
            )));
        }

        Self::from_parts(snapshot.created_at, snapshot.updated_at, snapshot.items)
    }
}
