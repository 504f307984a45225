//! Item types for the manual - one unit of knowledge plus its metadata.

use chrono::{DateTime, Utc};
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

/// Kind of knowledge an item carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemType {
    /// Directive the consumer should follow.
    Instruction,
    /// Observation distilled from past cycles.
    Insight,
    /// Recurring structure worth recognizing.
    Pattern,
    /// Concrete worked example.
    Example,
    /// Hard limit or requirement.
    Constraint,
    /// Improvement over an earlier item.
    Refinement,
}

impl ItemType {
    /// Get a human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            ItemType::Instruction => "Instruction",
            ItemType::Insight => "Insight",
            ItemType::Pattern => "Pattern",
            ItemType::Example => "Example",
            ItemType::Constraint => "Constraint",
            ItemType::Refinement => "Refinement",
        }
    }

    /// All recognized types, in declaration order.
    pub fn all() -> &'static [ItemType] {
        &[
            ItemType::Instruction,
            ItemType::Insight,
            ItemType::Pattern,
            ItemType::Example,
            ItemType::Constraint,
            ItemType::Refinement,
        ]
    }
}

/// Lifecycle status of an item.
///
/// `Active` is the only state that accepts further mutation. Both other
/// states are terminal: deprecate and supersede transitions are one-way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    /// In use and mutable.
    Active,
    /// Retired without a successor.
    Deprecated,
    /// Replaced by another item (carries a `superseded_by` link).
    Superseded,
}

impl ItemStatus {
    /// Get a human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            ItemStatus::Active => "Active",
            ItemStatus::Deprecated => "Deprecated",
            ItemStatus::Superseded => "Superseded",
        }
    }

    /// Check if this status admits no further transitions.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ItemStatus::Active)
    }
}

/// Scalar value kinds allowed in the metadata extension point.
///
/// A closed set rather than an open JSON bag, so extra fields stay
/// statically checkable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExtraValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

/// Metadata attached to every item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemMetadata {
    /// When the item was created. Never changes after insert.
    pub created_at: DateTime<Utc>,

    /// When the item was last mutated. Always >= `created_at`.
    pub updated_at: DateTime<Utc>,

    /// Provenance tag naming the external role that produced the item
    /// (generator/reflector/curator). Opaque to this crate.
    pub created_by: String,

    /// Content version, starting at 1. Incremented exactly once per
    /// accepted modify.
    pub version: u32,

    /// Lifecycle status.
    pub status: ItemStatus,

    /// Number of explicit retrieval events recorded against this item.
    pub usage_count: u64,

    /// When usage was last recorded.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub last_used: Option<DateTime<Utc>>,

    /// Confidence in this item (0.0-1.0).
    pub confidence_score: f64,

    /// Tags, duplicate-free, in insertion order.
    #[serde(default)]
    pub tags: Vec<String>,

    /// Ids of items this one logically relies on.
    #[serde(default)]
    pub dependencies: IndexSet<String>,

    /// Successor item id. Set exactly when status is `Superseded`.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub superseded_by: Option<String>,

    /// Extension point for collaborator-specific scalar fields.
    #[serde(skip_serializing_if = "IndexMap::is_empty", default)]
    pub extra: IndexMap<String, ExtraValue>,
}

impl ItemMetadata {
    /// Create metadata for a freshly added item.
    pub fn new(created_by: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            created_at: now,
            updated_at: now,
            created_by: created_by.into(),
            version: 1,
            status: ItemStatus::Active,
            usage_count: 0,
            last_used: None,
            confidence_score: 1.0,
            tags: Vec::new(),
            dependencies: IndexSet::new(),
            superseded_by: None,
            extra: IndexMap::new(),
        }
    }

    /// Add a tag, preserving insertion order and skipping duplicates.
    pub fn add_tag(&mut self, tag: impl Into<String>) {
        let tag = tag.into();
        if !self.tags.contains(&tag) {
            self.tags.push(tag);
        }
    }
}

/// A single item in the manual.
///
/// Content is immutable except through an accepted modify delta, which bumps
/// the version; metadata mutates through the store's narrow operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// Stable unique identifier, assigned at creation, never reused.
    pub id: String,

    /// Opaque text payload.
    pub content: String,

    /// Kind of knowledge this item carries.
    pub item_type: ItemType,

    /// Provenance, versioning, and usage metadata.
    pub metadata: ItemMetadata,
}

impl Item {
    /// Create a new active item with default metadata.
    pub fn new(id: impl Into<String>, item_type: ItemType, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            item_type,
            metadata: ItemMetadata::new("system"),
        }
    }

    /// Set the provenance tag.
    pub fn with_created_by(mut self, created_by: impl Into<String>) -> Self {
        self.metadata.created_by = created_by.into();
        self
    }

    /// Set the confidence score.
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.metadata.confidence_score = confidence;
        self
    }

    /// Set tags, deduplicating while preserving first-seen order.
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.metadata.tags.clear();
        for tag in tags {
            self.metadata.add_tag(tag);
        }
        self
    }

    /// Set the dependency set.
    pub fn with_dependencies<I, S>(mut self, dependencies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.metadata.dependencies = dependencies.into_iter().map(Into::into).collect();
        self
    }

    /// Check if the item is still active.
    pub fn is_active(&self) -> bool {
        self.metadata.status == ItemStatus::Active
    }

    /// Rough token estimate (4 characters per token).
    pub fn estimate_tokens(&self) -> usize {
        self.content.len() / 4
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_labels() {
        assert_eq!(ItemType::Instruction.label(), "Instruction");
        assert_eq!(ItemType::Insight.label(), "Insight");
        assert_eq!(ItemType::all().len(), 6);
    }

    #[test]
    fn test_status_terminal() {
        assert!(!ItemStatus::Active.is_terminal());
        assert!(ItemStatus::Deprecated.is_terminal());
        assert!(ItemStatus::Superseded.is_terminal());
    }

    #[test]
    fn test_new_item_defaults() {
        let item = Item::new("itm_0001", ItemType::Instruction, "Prefer batch updates");

        assert_eq!(item.metadata.version, 1);
        assert_eq!(item.metadata.status, ItemStatus::Active);
        assert_eq!(item.metadata.usage_count, 0);
        assert_eq!(item.metadata.created_at, item.metadata.updated_at);
        assert!(item.is_active());
    }

    #[test]
    fn test_tags_deduplicate_preserving_order() {
        let item = Item::new("itm_0001", ItemType::Insight, "x")
            .with_tags(["retry", "io", "retry", "network"]);

        assert_eq!(item.metadata.tags, vec!["retry", "io", "network"]);
    }

    #[test]
    fn test_estimate_tokens() {
        let item = Item::new("itm_0001", ItemType::Example, "a".repeat(40));
        assert_eq!(item.estimate_tokens(), 10);
    }

    #[test]
    fn test_extra_value_roundtrip() {
        let mut item = Item::new("itm_0001", ItemType::Pattern, "x");
        item.metadata
            .extra
            .insert("reviewed".to_string(), ExtraValue::Bool(true));
        item.metadata
            .extra
            .insert("cycle".to_string(), ExtraValue::Int(7));

        let json = serde_json::to_string(&item).unwrap();
        let back: Item = serde_json::from_str(&json).unwrap();
        assert_eq!(back.metadata.extra["reviewed"], ExtraValue::Bool(true));
        assert_eq!(back.metadata.extra["cycle"], ExtraValue::Int(7));
    }
}
