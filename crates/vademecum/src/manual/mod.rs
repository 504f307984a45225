//! The manual - a versioned knowledge store mutated only through the store's
//! narrow operations (typically driven by the merge engine).
//!
//! # Overview
//!
//! ```text
//! project.manual.json        # Persisted snapshot (items only;
//!                            # indices rebuilt on load)
//! ```
//!
//! # Usage
//!
//! ```
//! use vademecum::{Item, ItemType, IndexFilter, ManualStore};
//!
//! let mut store = ManualStore::new();
//! let id = store
//!     .insert(Item::new("itm_0001", ItemType::Instruction, "Batch writes").with_tags(["io"]))
//!     .unwrap();
//!
//! let hits = store.query(&IndexFilter::new().with_tag("io"));
//! assert_eq!(hits[0].id, id);
//! ```

mod index;
mod item;
mod persistence;
mod store;

pub use index::{IndexFilter, MetadataIndex};
pub use item::{ExtraValue, Item, ItemMetadata, ItemStatus, ItemType};
pub use store::{ManualStats, ManualStore, MANUAL_VERSION};
