//! Vademecum: a versioned knowledge manual with deterministic delta merging.
//!
//! The manual is a small, in-process knowledge store mutated only through
//! structured delta updates, so an external reasoning process can accumulate
//! instructions, insights, and constraints over many cycles without losing or
//! silently corrupting prior knowledge.
//!
//! # Core Principles
//!
//! - **Incremental**: items are added and versioned, never bulk-rewritten
//! - **Deterministic**: conflicts resolve by fixed rules, never by a model
//! - **Auditable**: retired items are kept; every change bumps a version
//!
//! # Example
//!
//! ```
//! use vademecum::{ContextSelector, DeltaUpdate, ItemType, ManualStore, MergeEngine};
//!
//! let mut store = ManualStore::new();
//! let engine = MergeEngine::new();
//!
//! let report = engine.apply_batch(
//!     &mut store,
//!     vec![
//!         DeltaUpdate::add(ItemType::Instruction, "Prefer batched writes"),
//!         DeltaUpdate::add(ItemType::Constraint, "Never retry non-idempotent calls"),
//!     ],
//! );
//! assert_eq!(report.applied, 2);
//!
//! let context = ContextSelector::new().with_max_items(10).render(&store);
//! assert!(context.contains("[INSTRUCTION]"));
//! ```

pub mod context;
pub mod error;
pub mod manual;
pub mod merge;

pub use context::{ContextSelector, PrioritizeBy};
pub use error::{ManualError, Result};
pub use manual::{
    ExtraValue, IndexFilter, Item, ItemMetadata, ItemStatus, ItemType, ManualStats, ManualStore,
    MetadataIndex, MANUAL_VERSION,
};
pub use merge::{
    DeltaAction, DeltaOutcome, DeltaReport, DeltaUpdate, MergeEngine, MergeReport, RejectReason,
};
