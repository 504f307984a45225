//! Delta updates - proposed, not-yet-applied changes to the manual.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::manual::ItemType;

/// What a delta asks the engine to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeltaAction {
    /// Create a new item.
    Add,
    /// Replace an active item's content, bumping its version.
    Modify,
    /// Retire an item without a successor.
    Deprecate,
    /// Combine two or more items into a new one, superseding the sources.
    Merge,
}

impl DeltaAction {
    /// Get a human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            DeltaAction::Add => "Add",
            DeltaAction::Modify => "Modify",
            DeltaAction::Deprecate => "Deprecate",
            DeltaAction::Merge => "Merge",
        }
    }
}

/// A proposed change to the manual.
///
/// Deltas are built by external collaborators, handed to
/// [`MergeEngine::apply_batch`](crate::MergeEngine::apply_batch) by value,
/// and discarded after processing; only the resulting item history is
/// retained.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeltaUpdate {
    /// Unique identifier for this delta (ephemeral, not persisted).
    pub id: String,

    /// Requested action.
    pub action: DeltaAction,

    /// Target item for modify/deprecate.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub target_id: Option<String>,

    /// Source items for merge (two or more).
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub merge_targets: Vec<String>,

    /// Proposed content (required for add/modify).
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub content: Option<String>,

    /// Proposed type (required for add; optional override for merge).
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub item_type: Option<ItemType>,

    /// Proposed tags. Additive for modify; initial set for add.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub tags: Vec<String>,

    /// Proposed dependency ids.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub dependencies: Vec<String>,

    /// Collaborator confidence in this change (0.0-1.0).
    pub confidence: f64,

    /// Provenance tag for the external role submitting the delta.
    pub created_by: String,

    /// When the delta was built.
    pub created_at: DateTime<Utc>,
}

impl DeltaUpdate {
    fn base(action: DeltaAction) -> Self {
        Self {
            id: generate_delta_id(),
            action,
            target_id: None,
            merge_targets: Vec::new(),
            content: None,
            item_type: None,
            tags: Vec::new(),
            dependencies: Vec::new(),
            confidence: 1.0,
            created_by: "system".to_string(),
            created_at: Utc::now(),
        }
    }

    /// Propose a new item.
    pub fn add(item_type: ItemType, content: impl Into<String>) -> Self {
        let mut delta = Self::base(DeltaAction::Add);
        delta.item_type = Some(item_type);
        delta.content = Some(content.into());
        delta
    }

    /// Propose replacing an active item's content.
    pub fn modify(target_id: impl Into<String>, content: impl Into<String>) -> Self {
        let mut delta = Self::base(DeltaAction::Modify);
        delta.target_id = Some(target_id.into());
        delta.content = Some(content.into());
        delta
    }

    /// Propose retiring an item.
    pub fn deprecate(target_id: impl Into<String>) -> Self {
        let mut delta = Self::base(DeltaAction::Deprecate);
        delta.target_id = Some(target_id.into());
        delta
    }

    /// Propose merging two or more items into a new one.
    pub fn merge<I, S>(targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut delta = Self::base(DeltaAction::Merge);
        delta.merge_targets = targets.into_iter().map(Into::into).collect();
        delta
    }

    /// Set the proposed type (merge result override).
    pub fn with_type(mut self, item_type: ItemType) -> Self {
        self.item_type = Some(item_type);
        self
    }

    /// Add a proposed tag.
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Set the proposed tags.
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Set the proposed dependencies.
    pub fn with_dependencies<I, S>(mut self, dependencies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies = dependencies.into_iter().map(Into::into).collect();
        self
    }

    /// Set the confidence score.
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }

    /// Set the provenance tag.
    pub fn with_created_by(mut self, created_by: impl Into<String>) -> Self {
        self.created_by = created_by.into();
        self
    }
}

/// Generate a unique delta ID.
fn generate_delta_id() -> String {
    static COUNTER: AtomicU64 = AtomicU64::new(1);
    format!("dlt_{:03}", COUNTER.fetch_add(1, Ordering::SeqCst))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_builder() {
        let delta = DeltaUpdate::add(ItemType::Insight, "Retries mask the real failure")
            .with_tags(["retry", "io"])
            .with_confidence(0.8)
            .with_created_by("reflector");

        assert!(delta.id.starts_with("dlt_"));
        assert_eq!(delta.action, DeltaAction::Add);
        assert_eq!(delta.item_type, Some(ItemType::Insight));
        assert_eq!(delta.tags, vec!["retry", "io"]);
        assert_eq!(delta.confidence, 0.8);
        assert_eq!(delta.created_by, "reflector");
    }

    #[test]
    fn test_modify_and_deprecate_carry_target() {
        let modify = DeltaUpdate::modify("itm_0001", "new text");
        assert_eq!(modify.target_id.as_deref(), Some("itm_0001"));
        assert_eq!(modify.content.as_deref(), Some("new text"));

        let deprecate = DeltaUpdate::deprecate("itm_0002");
        assert_eq!(deprecate.action, DeltaAction::Deprecate);
        assert_eq!(deprecate.target_id.as_deref(), Some("itm_0002"));
    }

    #[test]
    fn test_merge_carries_targets() {
        let delta = DeltaUpdate::merge(["itm_0002", "itm_0001"]);
        assert_eq!(delta.action, DeltaAction::Merge);
        assert_eq!(delta.merge_targets, vec!["itm_0002", "itm_0001"]);
        assert!(delta.target_id.is_none());
    }

    #[test]
    fn test_delta_ids_unique() {
        let a = DeltaUpdate::deprecate("itm_0001");
        let b = DeltaUpdate::deprecate("itm_0001");
        assert_ne!(a.id, b.id);
    }
}
