//! Secondary indices over manual items.
//!
//! The index is owned by the store and updated inside the same call as every
//! item mutation, so a committed mutation is visible to the next query with
//! no stale window. It is always rebuildable from the items alone and is
//! never persisted independently.

use indexmap::{IndexMap, IndexSet};

use super::item::{Item, ItemStatus, ItemType};

/// Conjunctive filter over the secondary indices.
///
/// All supplied fields must match. An empty filter matches every item.
#[derive(Debug, Clone, Default)]
pub struct IndexFilter {
    item_type: Option<ItemType>,
    tags: Vec<String>,
    status: Option<ItemStatus>,
}

impl IndexFilter {
    /// Create an empty filter matching all items.
    pub fn new() -> Self {
        Self::default()
    }

    /// Require a specific item type.
    pub fn with_type(mut self, item_type: ItemType) -> Self {
        self.item_type = Some(item_type);
        self
    }

    /// Require a tag. May be called repeatedly; all tags must be present.
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Require a specific status.
    pub fn with_status(mut self, status: ItemStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Check if no fields are set.
    pub fn is_empty(&self) -> bool {
        self.item_type.is_none() && self.tags.is_empty() && self.status.is_none()
    }
}

/// Secondary indices by type, tag, and status.
#[derive(Debug, Clone, Default)]
pub struct MetadataIndex {
    by_type: IndexMap<ItemType, IndexSet<String>>,
    by_tag: IndexMap<String, IndexSet<String>>,
    by_status: IndexMap<ItemStatus, IndexSet<String>>,
    all: IndexSet<String>,
}

impl MetadataIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a newly inserted item under all applicable indices.
    pub(crate) fn register(&mut self, item: &Item) {
        self.all.insert(item.id.clone());
        self.by_type
            .entry(item.item_type)
            .or_default()
            .insert(item.id.clone());
        self.by_status
            .entry(item.metadata.status)
            .or_default()
            .insert(item.id.clone());
        for tag in &item.metadata.tags {
            self.by_tag
                .entry(tag.clone())
                .or_default()
                .insert(item.id.clone());
        }
    }

    /// Move an item's tag entries from `old_tags` to `new_tags`.
    pub(crate) fn retag(&mut self, id: &str, old_tags: &[String], new_tags: &[String]) {
        for tag in old_tags {
            if let Some(set) = self.by_tag.get_mut(tag) {
                set.shift_remove(id);
            }
        }
        for tag in new_tags {
            self.by_tag
                .entry(tag.clone())
                .or_default()
                .insert(id.to_string());
        }
    }

    /// Move an item between status buckets.
    pub(crate) fn restatus(&mut self, id: &str, old: ItemStatus, new: ItemStatus) {
        if let Some(set) = self.by_status.get_mut(&old) {
            set.shift_remove(id);
        }
        self.by_status
            .entry(new)
            .or_default()
            .insert(id.to_string());
    }

    /// Ids matching all supplied filter fields, in item insertion order.
    pub fn query(&self, filter: &IndexFilter) -> Vec<String> {
        self.all
            .iter()
            .filter(|id| self.matches(id.as_str(), filter))
            .cloned()
            .collect()
    }

    fn matches(&self, id: &str, filter: &IndexFilter) -> bool {
        if let Some(item_type) = filter.item_type
            && !self
                .by_type
                .get(&item_type)
                .is_some_and(|set| set.contains(id))
        {
            return false;
        }
        if let Some(status) = filter.status
            && !self
                .by_status
                .get(&status)
                .is_some_and(|set| set.contains(id))
        {
            return false;
        }
        filter
            .tags
            .iter()
            .all(|tag| self.by_tag.get(tag).is_some_and(|set| set.contains(id)))
    }

    /// Number of indexed items.
    pub fn len(&self) -> usize {
        self.all.len()
    }

    /// Check if the index is empty.
    pub fn is_empty(&self) -> bool {
        self.all.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manual::item::Item;

    fn sample_index() -> MetadataIndex {
        let mut index = MetadataIndex::new();
        index.register(
            &Item::new("itm_0001", ItemType::Instruction, "a").with_tags(["io", "retry"]),
        );
        index.register(&Item::new("itm_0002", ItemType::Insight, "b").with_tags(["io"]));
        index.register(&Item::new("itm_0003", ItemType::Instruction, "c"));
        index
    }

    #[test]
    fn test_empty_filter_returns_all_in_insertion_order() {
        let index = sample_index();
        let ids = index.query(&IndexFilter::new());
        assert_eq!(ids, vec!["itm_0001", "itm_0002", "itm_0003"]);
    }

    #[test]
    fn test_filter_by_type() {
        let index = sample_index();
        let ids = index.query(&IndexFilter::new().with_type(ItemType::Instruction));
        assert_eq!(ids, vec!["itm_0001", "itm_0003"]);
    }

    #[test]
    fn test_conjunctive_type_and_tag() {
        let index = sample_index();
        let ids = index.query(
            &IndexFilter::new()
                .with_type(ItemType::Instruction)
                .with_tag("io"),
        );
        assert_eq!(ids, vec!["itm_0001"]);
    }

    #[test]
    fn test_unknown_tag_matches_nothing() {
        let index = sample_index();
        assert!(index.query(&IndexFilter::new().with_tag("missing")).is_empty());
    }

    #[test]
    fn test_retag_and_restatus() {
        let mut index = sample_index();
        index.retag("itm_0001", &["io".to_string()], &["net".to_string()]);
        index.restatus("itm_0001", ItemStatus::Active, ItemStatus::Deprecated);

        assert_eq!(index.query(&IndexFilter::new().with_tag("io")), vec!["itm_0002"]);
        assert_eq!(index.query(&IndexFilter::new().with_tag("net")), vec!["itm_0001"]);
        assert_eq!(
            index.query(&IndexFilter::new().with_status(ItemStatus::Deprecated)),
            vec!["itm_0001"]
        );
    }
}
