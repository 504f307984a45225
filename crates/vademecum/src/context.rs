//! Context selection - ranked, bounded extraction of active items.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::manual::{Item, ManualStore};

/// Ranking key for context selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrioritizeBy {
    /// Most-retrieved items first.
    Usage,
    /// Highest confidence first.
    Confidence,
    /// Most recently updated first.
    Recency,
}

/// Selects a bounded, ordered subset of active items for external
/// consumption.
///
/// Selection is read-only and fully deterministic: descending by the chosen
/// key, ties broken by ascending `created_at` then id. Recording usage for
/// the selected items is a separate, explicit caller action
/// ([`ManualStore::record_usage`]), never a side effect of selecting.
#[derive(Debug, Clone)]
pub struct ContextSelector {
    max_items: Option<usize>,
    prioritize_by: PrioritizeBy,
}

impl ContextSelector {
    /// Create a selector ranking by usage with no size bound.
    pub fn new() -> Self {
        Self {
            max_items: None,
            prioritize_by: PrioritizeBy::Usage,
        }
    }

    /// Bound the number of selected items.
    pub fn with_max_items(mut self, max_items: usize) -> Self {
        self.max_items = Some(max_items);
        self
    }

    /// Set the ranking key.
    pub fn with_priority(mut self, prioritize_by: PrioritizeBy) -> Self {
        self.prioritize_by = prioritize_by;
        self
    }

    /// Select active items in ranked order, truncated to the bound.
    pub fn select<'a>(&self, store: &'a ManualStore) -> Vec<&'a Item> {
        let mut items = store.active_items();
        items.sort_by(|a, b| self.compare(a, b));
        if let Some(max) = self.max_items {
            items.truncate(max);
        }
        items
    }

    /// Serialize the selection as a plain text block.
    ///
    /// Each item renders as a `[TYPE] id` header line followed by its
    /// content; items are separated by blank lines.
    pub fn render(&self, store: &ManualStore) -> String {
        self.select(store)
            .iter()
            .map(|item| {
                format!(
                    "[{}] {}\n{}",
                    item.item_type.label().to_uppercase(),
                    item.id,
                    item.content
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    fn compare(&self, a: &Item, b: &Item) -> Ordering {
        let key = match self.prioritize_by {
            PrioritizeBy::Usage => b.metadata.usage_count.cmp(&a.metadata.usage_count),
            PrioritizeBy::Confidence => b
                .metadata
                .confidence_score
                .total_cmp(&a.metadata.confidence_score),
            PrioritizeBy::Recency => b.metadata.updated_at.cmp(&a.metadata.updated_at),
        };
        key.then_with(|| a.metadata.created_at.cmp(&b.metadata.created_at))
            .then_with(|| a.id.cmp(&b.id))
    }
}

impl Default for ContextSelector {
    fn default() -> Self {
        Self::new()
    }
}
