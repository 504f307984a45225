//! The merge engine - applies delta batches to a store deterministically.

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use crate::error::{ManualError, Result};
use crate::manual::{Item, ItemType, ManualStore};

use super::delta::{DeltaAction, DeltaUpdate};

/// Why a delta was rejected. Mirrors the recoverable error taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    /// Referenced item id absent.
    NotFound,
    /// Insert collided with an existing id.
    DuplicateId,
    /// Operation illegal for the item's current status.
    InvalidState,
    /// Dependency edge would close a cycle.
    CycleDetected,
    /// Referenced dependency does not exist.
    DanglingDependency,
    /// Malformed delta.
    Validation,
}

impl From<&ManualError> for RejectReason {
    fn from(err: &ManualError) -> Self {
        match err {
            ManualError::NotFound(_) => RejectReason::NotFound,
            ManualError::DuplicateId(_) => RejectReason::DuplicateId,
            ManualError::InvalidState { .. } => RejectReason::InvalidState,
            ManualError::CycleDetected(_) => RejectReason::CycleDetected,
            ManualError::DanglingDependency(_) => RejectReason::DanglingDependency,
            ManualError::Validation(_) | ManualError::Json(_) | ManualError::Persistence(_) => {
                RejectReason::Validation
            }
        }
    }
}

/// Outcome of one delta.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DeltaOutcome {
    /// The delta mutated the store.
    Applied {
        /// Item created or modified.
        item_id: String,
        /// Item version after the delta.
        version: u32,
    },
    /// The delta was rejected; the store is untouched.
    Rejected {
        /// Taxonomy bucket for the rejection.
        reason: RejectReason,
        /// Human-readable detail.
        message: String,
    },
}

/// Per-delta entry in the batch report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeltaReport {
    /// Id of the delta this entry describes.
    pub delta_id: String,
    /// Action the delta requested.
    pub action: DeltaAction,
    /// What happened.
    pub outcome: DeltaOutcome,
}

impl DeltaReport {
    /// Check if the delta was applied.
    pub fn is_applied(&self) -> bool {
        matches!(self.outcome, DeltaOutcome::Applied { .. })
    }

    /// Item id produced or mutated, if applied.
    pub fn item_id(&self) -> Option<&str> {
        match &self.outcome {
            DeltaOutcome::Applied { item_id, .. } => Some(item_id),
            DeltaOutcome::Rejected { .. } => None,
        }
    }

    /// Rejection reason, if rejected.
    pub fn reject_reason(&self) -> Option<RejectReason> {
        match &self.outcome {
            DeltaOutcome::Applied { .. } => None,
            DeltaOutcome::Rejected { reason, .. } => Some(*reason),
        }
    }
}

/// Aggregate result of applying a batch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MergeReport {
    /// Number of applied deltas.
    pub applied: usize,
    /// Number of rejected deltas.
    pub rejected: usize,
    /// Per-delta outcomes, in submission order.
    pub details: Vec<DeltaReport>,
}

impl MergeReport {
    /// Create an empty report.
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of deltas processed.
    pub fn total(&self) -> usize {
        self.applied + self.rejected
    }

    /// Check if every delta in the batch was applied.
    pub fn all_applied(&self) -> bool {
        self.rejected == 0
    }

    fn push(&mut self, detail: DeltaReport) {
        if detail.is_applied() {
            self.applied += 1;
        } else {
            self.rejected += 1;
        }
        self.details.push(detail);
    }
}

/// Applies batches of [`DeltaUpdate`]s to a [`ManualStore`].
///
/// Conflict resolution is entirely deterministic: merge concatenates in id
/// order, modify is last-writer-wins per accepted delta, and nothing here
/// consults a model. Every delta is validated in full before any mutation,
/// so a rejected delta leaves the store's serialized state byte-identical;
/// a failed delta never aborts the rest of the batch.
pub struct MergeEngine;

impl MergeEngine {
    /// Create a new merge engine.
    pub fn new() -> Self {
        Self
    }

    /// Apply a batch of deltas in submission order.
    ///
    /// Later deltas see the effects of earlier ones. The batch is consumed;
    /// deltas are not retained after processing.
    pub fn apply_batch(&self, store: &mut ManualStore, deltas: Vec<DeltaUpdate>) -> MergeReport {
        let mut report = MergeReport::new();
        for delta in deltas {
            let outcome = match self.apply_delta(store, &delta) {
                Ok((item_id, version)) => DeltaOutcome::Applied { item_id, version },
                Err(err) => DeltaOutcome::Rejected {
                    reason: RejectReason::from(&err),
                    message: err.to_string(),
                },
            };
            report.push(DeltaReport {
                delta_id: delta.id,
                action: delta.action,
                outcome,
            });
        }
        report
    }

    fn apply_delta(&self, store: &mut ManualStore, delta: &DeltaUpdate) -> Result<(String, u32)> {
        if !(0.0..=1.0).contains(&delta.confidence) {
            return Err(ManualError::Validation(format!(
                "confidence {} outside [0, 1]",
                delta.confidence
            )));
        }
        match delta.action {
            DeltaAction::Add => self.apply_add(store, delta),
            DeltaAction::Modify => self.apply_modify(store, delta),
            DeltaAction::Deprecate => self.apply_deprecate(store, delta),
            DeltaAction::Merge => self.apply_merge(store, delta),
        }
    }

    fn apply_add(&self, store: &mut ManualStore, delta: &DeltaUpdate) -> Result<(String, u32)> {
        let content = delta
            .content
            .clone()
            .ok_or_else(|| ManualError::Validation("add requires content".to_string()))?;
        let item_type = delta
            .item_type
            .ok_or_else(|| ManualError::Validation("add requires an item type".to_string()))?;

        let id = store.mint_id();
        let item = Item::new(id, item_type, content)
            .with_created_by(&delta.created_by)
            .with_confidence(delta.confidence)
            .with_tags(delta.tags.iter().cloned())
            .with_dependencies(delta.dependencies.iter().cloned());

        let id = store.insert(item)?;
        Ok((id, 1))
    }

    fn apply_modify(&self, store: &mut ManualStore, delta: &DeltaUpdate) -> Result<(String, u32)> {
        let target = delta
            .target_id
            .as_deref()
            .ok_or_else(|| ManualError::Validation("modify requires a target id".to_string()))?;
        let content = delta
            .content
            .clone()
            .ok_or_else(|| ManualError::Validation("modify requires content".to_string()))?;

        let existing = store.get(target)?;

        // Delta tags and dependencies are additive at the engine level; the
        // store-level replace_version takes the full replacement sets.
        let merged_tags = if delta.tags.is_empty() {
            None
        } else {
            let mut tags = existing.metadata.tags.clone();
            for tag in &delta.tags {
                if !tags.contains(tag) {
                    tags.push(tag.clone());
                }
            }
            Some(tags)
        };
        let merged_deps = if delta.dependencies.is_empty() {
            None
        } else {
            let mut deps: IndexSet<String> = existing.metadata.dependencies.clone();
            deps.extend(delta.dependencies.iter().cloned());
            Some(deps.into_iter().collect())
        };

        let version = store.replace_version(target, content, merged_tags, merged_deps)?;
        store.raise_confidence(target, delta.confidence)?;
        Ok((target.to_string(), version))
    }

    fn apply_deprecate(
        &self,
        store: &mut ManualStore,
        delta: &DeltaUpdate,
    ) -> Result<(String, u32)> {
        let target = delta
            .target_id
            .as_deref()
            .ok_or_else(|| ManualError::Validation("deprecate requires a target id".to_string()))?;

        store.set_status(target, crate::manual::ItemStatus::Deprecated, None)?;
        let version = store.get(target)?.metadata.version;
        Ok((target.to_string(), version))
    }

    fn apply_merge(&self, store: &mut ManualStore, delta: &DeltaUpdate) -> Result<(String, u32)> {
        // Normalize target order up front: content concatenation, tag union,
        // and the default result type all follow ascending id order.
        let mut targets = delta.merge_targets.clone();
        targets.sort();
        if targets.len() < 2 {
            return Err(ManualError::Validation(
                "merge requires at least two targets".to_string(),
            ));
        }
        for pair in targets.windows(2) {
            if pair[0] == pair[1] {
                return Err(ManualError::Validation(format!(
                    "duplicate merge target '{}'",
                    pair[0]
                )));
            }
        }

        let mut contents: Vec<&str> = Vec::with_capacity(targets.len());
        let mut tags: Vec<String> = Vec::new();
        let mut dependencies: IndexSet<String> = IndexSet::new();
        let mut confidence = delta.confidence;
        let mut result_type: Option<ItemType> = delta.item_type;

        for target in &targets {
            let item = store.get(target)?;
            if !item.is_active() {
                return Err(ManualError::InvalidState {
                    id: target.clone(),
                    message: format!(
                        "cannot merge a {} item",
                        item.metadata.status.label().to_lowercase()
                    ),
                });
            }
            contents.push(&item.content);
            for tag in &item.metadata.tags {
                if !tags.contains(tag) {
                    tags.push(tag.clone());
                }
            }
            dependencies.extend(item.metadata.dependencies.iter().cloned());
            confidence = confidence.max(item.metadata.confidence_score);
            result_type.get_or_insert(item.item_type);
        }
        for tag in &delta.tags {
            if !tags.contains(tag) {
                tags.push(tag.clone());
            }
        }
        // The merged item must not depend on the items it replaces.
        for target in &targets {
            dependencies.shift_remove(target);
        }
        let content = contents.join("\n\n");

        // Everything validated; mutations from here on cannot fail.
        let new_id = store.mint_id();
        let item = Item::new(&new_id, result_type.unwrap(), content)
            .with_created_by(&delta.created_by)
            .with_confidence(confidence)
            .with_tags(tags)
            .with_dependencies(dependencies);

        store.insert(item)?;
        for target in &targets {
            store.set_status(target, crate::manual::ItemStatus::Superseded, Some(&new_id))?;
        }
        Ok((new_id, 1))
    }
}

impl Default for MergeEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manual::ItemStatus;
    use crate::merge::delta::DeltaUpdate;

    #[test]
    fn test_add_applies() {
        let engine = MergeEngine::new();
        let mut store = ManualStore::new();

        let report = engine.apply_batch(
            &mut store,
            vec![DeltaUpdate::add(ItemType::Instruction, "x")],
        );

        assert_eq!(report.applied, 1);
        assert!(report.all_applied());
        let id = report.details[0].item_id().unwrap();
        assert_eq!(store.get(id).unwrap().metadata.version, 1);
    }

    #[test]
    fn test_add_without_content_rejected() {
        let engine = MergeEngine::new();
        let mut store = ManualStore::new();

        let mut delta = DeltaUpdate::add(ItemType::Instruction, "x");
        delta.content = None;
        let report = engine.apply_batch(&mut store, vec![delta]);

        assert_eq!(report.rejected, 1);
        assert_eq!(
            report.details[0].reject_reason(),
            Some(RejectReason::Validation)
        );
        assert!(store.is_empty());
    }

    #[test]
    fn test_out_of_range_confidence_rejected() {
        let engine = MergeEngine::new();
        let mut store = ManualStore::new();

        let delta = DeltaUpdate::add(ItemType::Insight, "x").with_confidence(1.5);
        let report = engine.apply_batch(&mut store, vec![delta]);

        assert_eq!(report.rejected, 1);
        assert!(store.is_empty());
    }

    #[test]
    fn test_modify_is_additive_for_tags() {
        let engine = MergeEngine::new();
        let mut store = ManualStore::new();

        let report = engine.apply_batch(
            &mut store,
            vec![DeltaUpdate::add(ItemType::Pattern, "x").with_tags(["io"])],
        );
        let id = report.details[0].item_id().unwrap().to_string();

        engine.apply_batch(
            &mut store,
            vec![DeltaUpdate::modify(&id, "y").with_tags(["retry"])],
        );

        let item = store.get(&id).unwrap();
        assert_eq!(item.metadata.tags, vec!["io", "retry"]);
        assert_eq!(item.metadata.version, 2);
    }

    #[test]
    fn test_merge_requires_two_distinct_targets() {
        let engine = MergeEngine::new();
        let mut store = ManualStore::new();
        let report = engine.apply_batch(
            &mut store,
            vec![DeltaUpdate::add(ItemType::Insight, "only one")],
        );
        let id = report.details[0].item_id().unwrap().to_string();

        let short = engine.apply_batch(&mut store, vec![DeltaUpdate::merge([id.clone()])]);
        assert_eq!(
            short.details[0].reject_reason(),
            Some(RejectReason::Validation)
        );

        let dup = engine.apply_batch(&mut store, vec![DeltaUpdate::merge([id.clone(), id])]);
        assert_eq!(
            dup.details[0].reject_reason(),
            Some(RejectReason::Validation)
        );
    }

    #[test]
    fn test_deprecate_reports_current_version() {
        let engine = MergeEngine::new();
        let mut store = ManualStore::new();
        let report =
            engine.apply_batch(&mut store, vec![DeltaUpdate::add(ItemType::Constraint, "x")]);
        let id = report.details[0].item_id().unwrap().to_string();

        let report = engine.apply_batch(&mut store, vec![DeltaUpdate::deprecate(&id)]);
        assert!(report.all_applied());
        assert_eq!(store.get(&id).unwrap().metadata.status, ItemStatus::Deprecated);
    }
}
