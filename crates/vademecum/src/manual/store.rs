//! The manual store - authoritative mapping of item ids to current state.

use chrono::{DateTime, Utc};
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

use crate::error::{ManualError, Result};

use super::index::{IndexFilter, MetadataIndex};
use super::item::{Item, ItemStatus, ItemType};

/// Current version of the persisted manual format.
pub const MANUAL_VERSION: &str = "1.0.0";

/// Aggregate statistics over the store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ManualStats {
    /// Total number of items, including retired ones.
    pub total_items: usize,
    /// Items still active.
    pub active: usize,
    /// Items deprecated without a successor.
    pub deprecated: usize,
    /// Items replaced by a merge.
    pub superseded: usize,
    /// Item counts by type.
    pub by_type: IndexMap<ItemType, usize>,
    /// Sum of usage counts across all items.
    pub total_usage: u64,
    /// Mean confidence score (0.0 when empty).
    pub average_confidence: f64,
    /// Rough token estimate for all content.
    pub estimated_tokens: usize,
}

/// The authoritative item store.
///
/// Owns every [`Item`] and the [`MetadataIndex`]; all mutation goes through
/// the narrow operations below, which validate before committing so a failed
/// call leaves the store untouched. Mutating operations take `&mut self` -
/// callers needing shared access serialize writers externally (a `Mutex` or a
/// single owner task).
#[derive(Debug, Clone)]
pub struct ManualStore {
    items: IndexMap<String, Item>,
    index: MetadataIndex,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    next_id: u64,
}

impl ManualStore {
    /// Create an empty store.
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            items: IndexMap::new(),
            index: MetadataIndex::new(),
            created_at: now,
            updated_at: now,
            next_id: 1,
        }
    }

    /// Mint a fresh item id. Ids only ever grow and are never reused, even
    /// when an id in the sequence was inserted by hand.
    pub(crate) fn mint_id(&mut self) -> String {
        loop {
            let id = format!("itm_{:04}", self.next_id);
            self.next_id += 1;
            if !self.items.contains_key(&id) {
                return id;
            }
        }
    }

    /// Insert a new item, registering it in the index.
    ///
    /// Fails with `DuplicateId` if the id is already present, and validates
    /// that every dependency exists and introduces no cycle.
    pub fn insert(&mut self, item: Item) -> Result<String> {
        if self.items.contains_key(&item.id) {
            return Err(ManualError::DuplicateId(item.id));
        }
        self.check_dependencies(&item.id, &item.metadata.dependencies)?;

        let id = item.id.clone();
        self.index.register(&item);
        self.items.insert(id.clone(), item);
        self.touch();
        Ok(id)
    }

    /// Get an item by id.
    pub fn get(&self, id: &str) -> Result<&Item> {
        self.items
            .get(id)
            .ok_or_else(|| ManualError::NotFound(id.to_string()))
    }

    /// Check if an id is present.
    pub fn contains(&self, id: &str) -> bool {
        self.items.contains_key(id)
    }

    /// Replace an active item's content, creating a new version.
    ///
    /// `new_tags` and `new_dependencies`, when given, replace the existing
    /// sets wholesale; dependency changes are validated for existence and
    /// acyclicity before anything is mutated. Preserves `id` and
    /// `created_at`, increments `version` by exactly 1, and returns the new
    /// version.
    pub fn replace_version(
        &mut self,
        id: &str,
        new_content: impl Into<String>,
        new_tags: Option<Vec<String>>,
        new_dependencies: Option<Vec<String>>,
    ) -> Result<u32> {
        let item = self.get(id)?;
        if !item.is_active() {
            return Err(ManualError::InvalidState {
                id: id.to_string(),
                message: format!(
                    "cannot modify a {} item",
                    item.metadata.status.label().to_lowercase()
                ),
            });
        }
        let old_tags = item.metadata.tags.clone();

        let new_dependencies: Option<IndexSet<String>> =
            new_dependencies.map(|deps| deps.into_iter().collect());
        if let Some(ref deps) = new_dependencies {
            self.check_dependencies(id, deps)?;
        }

        let deduped_tags = new_tags.map(|tags| {
            let mut deduped: Vec<String> = Vec::new();
            for tag in tags {
                if !deduped.contains(&tag) {
                    deduped.push(tag);
                }
            }
            deduped
        });

        // Validated above; the entry cannot be missing here.
        let item = self.items.get_mut(id).unwrap();
        item.content = new_content.into();
        item.metadata.version += 1;
        item.metadata.updated_at = Utc::now();
        if let Some(deps) = new_dependencies {
            item.metadata.dependencies = deps;
        }
        let version = item.metadata.version;
        if let Some(tags) = deduped_tags {
            item.metadata.tags = tags.clone();
            self.index.retag(id, &old_tags, &tags);
        }
        self.touch();
        Ok(version)
    }

    /// Transition an item out of the active state.
    ///
    /// The only legal transitions are `active -> deprecated` and
    /// `active -> superseded`; both are one-way. Superseding requires a link
    /// to exactly one existing successor item.
    pub fn set_status(
        &mut self,
        id: &str,
        status: ItemStatus,
        superseded_by: Option<&str>,
    ) -> Result<()> {
        let item = self.get(id)?;
        let current = item.metadata.status;
        if current.is_terminal() {
            return Err(ManualError::InvalidState {
                id: id.to_string(),
                message: format!("already {}", current.label().to_lowercase()),
            });
        }

        let link = match status {
            ItemStatus::Active => {
                return Err(ManualError::InvalidState {
                    id: id.to_string(),
                    message: "cannot transition to active".to_string(),
                });
            }
            ItemStatus::Deprecated => {
                if superseded_by.is_some() {
                    return Err(ManualError::Validation(
                        "deprecate does not take a superseded_by link".to_string(),
                    ));
                }
                None
            }
            ItemStatus::Superseded => {
                let link = superseded_by.ok_or_else(|| {
                    ManualError::Validation("supersede requires a superseded_by link".to_string())
                })?;
                if link == id {
                    return Err(ManualError::Validation(
                        "an item cannot supersede itself".to_string(),
                    ));
                }
                if !self.items.contains_key(link) {
                    return Err(ManualError::NotFound(link.to_string()));
                }
                Some(link.to_string())
            }
        };

        let item = self.items.get_mut(id).unwrap();
        item.metadata.status = status;
        item.metadata.superseded_by = link;
        item.metadata.updated_at = Utc::now();
        self.index.restatus(id, current, status);
        self.touch();
        Ok(())
    }

    /// Record an explicit retrieval event against an item.
    ///
    /// Bumps `usage_count` and `last_used` only; content version and
    /// `updated_at` are untouched so usage never masquerades as recency.
    pub fn record_usage(&mut self, id: &str) -> Result<()> {
        let item = self
            .items
            .get_mut(id)
            .ok_or_else(|| ManualError::NotFound(id.to_string()))?;
        item.metadata.usage_count += 1;
        item.metadata.last_used = Some(Utc::now());
        Ok(())
    }

    /// Raise an item's confidence to the offered score if it is higher.
    pub fn raise_confidence(&mut self, id: &str, confidence: f64) -> Result<()> {
        if !(0.0..=1.0).contains(&confidence) {
            return Err(ManualError::Validation(format!(
                "confidence {} outside [0, 1]",
                confidence
            )));
        }
        let item = self
            .items
            .get_mut(id)
            .ok_or_else(|| ManualError::NotFound(id.to_string()))?;
        if confidence > item.metadata.confidence_score {
            item.metadata.confidence_score = confidence;
        }
        Ok(())
    }

    /// Items matching a filter, in insertion order.
    pub fn query(&self, filter: &IndexFilter) -> Vec<&Item> {
        self.index
            .query(filter)
            .iter()
            .filter_map(|id| self.items.get(id))
            .collect()
    }

    /// Ids matching a filter, in insertion order.
    pub fn query_ids(&self, filter: &IndexFilter) -> Vec<String> {
        self.index.query(filter)
    }

    /// Read-only view of the secondary indices.
    pub fn index(&self) -> &MetadataIndex {
        &self.index
    }

    /// Iterate all items in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Item> {
        self.items.values()
    }

    /// All active items, in insertion order.
    pub fn active_items(&self) -> Vec<&Item> {
        self.items.values().filter(|item| item.is_active()).collect()
    }

    /// Number of items, including retired ones.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if the store holds no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// When the store was created.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// When the store last committed a mutation.
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Rough token estimate across all content.
    pub fn estimate_total_tokens(&self) -> usize {
        self.items.values().map(Item::estimate_tokens).sum()
    }

    /// Aggregate statistics.
    pub fn stats(&self) -> ManualStats {
        let mut stats = ManualStats {
            total_items: self.items.len(),
            estimated_tokens: self.estimate_total_tokens(),
            ..ManualStats::default()
        };
        let mut confidence_sum = 0.0;
        for item in self.items.values() {
            match item.metadata.status {
                ItemStatus::Active => stats.active += 1,
                ItemStatus::Deprecated => stats.deprecated += 1,
                ItemStatus::Superseded => stats.superseded += 1,
            }
            *stats.by_type.entry(item.item_type).or_insert(0) += 1;
            stats.total_usage += item.metadata.usage_count;
            confidence_sum += item.metadata.confidence_score;
        }
        if !self.items.is_empty() {
            stats.average_confidence = confidence_sum / self.items.len() as f64;
        }
        stats
    }

    /// Validate a proposed dependency set for `owner`.
    ///
    /// Every dependency must exist, and following dependency edges from the
    /// proposed set must never lead back to `owner` (acyclicity holds over
    /// the whole graph, retired items included).
    fn check_dependencies(&self, owner: &str, deps: &IndexSet<String>) -> Result<()> {
        for dep in deps {
            if dep == owner {
                return Err(ManualError::CycleDetected(format!(
                    "'{}' cannot depend on itself",
                    owner
                )));
            }
            if !self.items.contains_key(dep) {
                return Err(ManualError::DanglingDependency(dep.clone()));
            }
        }

        let mut stack: Vec<&str> = deps.iter().map(String::as_str).collect();
        let mut seen: IndexSet<&str> = IndexSet::new();
        while let Some(id) = stack.pop() {
            if id == owner {
                return Err(ManualError::CycleDetected(format!(
                    "path through dependencies leads back to '{}'",
                    owner
                )));
            }
            if !seen.insert(id) {
                continue;
            }
            if let Some(item) = self.items.get(id) {
                stack.extend(item.metadata.dependencies.iter().map(String::as_str));
            }
        }
        Ok(())
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    // Snapshot plumbing used by the persistence layer.

    pub(crate) fn snapshot_items(&self) -> Vec<Item> {
        self.items.values().cloned().collect()
    }

    pub(crate) fn from_parts(
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
        items: Vec<Item>,
    ) -> Result<Self> {
        let mut next_id = 1;
        let mut table: IndexMap<String, Item> = IndexMap::new();
        let mut index = MetadataIndex::new();

        for item in items {
            if table.contains_key(&item.id) {
                return Err(ManualError::DuplicateId(item.id));
            }
            if let Some(n) = item.id.strip_prefix("itm_").and_then(|s| s.parse::<u64>().ok()) {
                next_id = next_id.max(n + 1);
            }
            index.register(&item);
            table.insert(item.id.clone(), item);
        }

        Ok(Self {
            items: table,
            index,
            created_at,
            updated_at,
            next_id,
        })
    }
}

impl Default for ManualStore {
    fn default() -> Self {
        Self::new()
    }
}
