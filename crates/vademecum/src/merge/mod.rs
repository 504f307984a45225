//! Delta updates and the deterministic merge engine.
//!
//! External collaborators propose changes as [`DeltaUpdate`] values; the
//! [`MergeEngine`] validates and applies each one against a
//! [`ManualStore`](crate::ManualStore), producing a structured
//! [`MergeReport`]. No semantic reconciliation happens here - conflicts are
//! resolved by fixed, auditable rules.
//!
//! # Usage
//!
//! ```
//! use vademecum::{DeltaUpdate, ItemType, ManualStore, MergeEngine};
//!
//! let mut store = ManualStore::new();
//! let engine = MergeEngine::new();
//!
//! let report = engine.apply_batch(
//!     &mut store,
//!     vec![
//!         DeltaUpdate::add(ItemType::Instruction, "Validate inputs first")
//!             .with_created_by("curator"),
//!         DeltaUpdate::deprecate("itm_9999"), // unknown target, rejected
//!     ],
//! );
//!
//! assert_eq!(report.applied, 1);
//! assert_eq!(report.rejected, 1);
//! ```

mod delta;
mod engine;

pub use delta::{DeltaAction, DeltaUpdate};
pub use engine::{DeltaOutcome, DeltaReport, MergeEngine, MergeReport, RejectReason};
