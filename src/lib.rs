//! Nested-set (modified preorder tree traversal) hierarchies.
//!
//! Every node stores a `left`/`right` interval and a `level`; containment of
//! intervals encodes ancestry, so ancestor, descendant and whole-tree reads are
//! single queries instead of recursive walks. Bounds are recomputed from parent
//! references by a full rebuild after each mutation.
//!
//! The engine talks to storage through [`NodeStore`]. [`NestedSetRepository`]
//! drives it over SeaORM with PostgreSQL advisory locking, and [`NestedSet`]
//! drives any other store behind an in-process lock.

pub mod config;
pub mod error;
pub mod hooks;
pub mod integrity;
pub mod lock;
pub mod materialize;
pub mod memory;
pub mod node;
pub mod options;
pub mod query;
pub mod rebuild;
pub mod repository;
pub mod sea_store;
pub mod store;
pub mod traits;
pub mod tree;

pub mod prelude {
    //! Convenient re-exports for consumers.
    pub use crate::config::{
        AdvisoryLockStrategy, NestedSetConfig, NestedSetOptions, OrderStrategy,
    };
    pub use crate::hooks::{MutationHooks, NoHooks};
    pub use crate::node::{TreeFields, TreeNode, TreeRow};
    pub use crate::store::NodeStore;
    pub use crate::traits::NestedSetModel;
}

pub use config::{
    AdvisoryLockKey, AdvisoryLockStrategy, NestedSetConfig, NestedSetOptions, OrderStrategy,
};
pub use error::{ErrorKind, HierarchyFault, NestedSetError};
pub use hooks::{MutationHooks, NoHooks};
pub use materialize::TreeBranch;
pub use memory::MemoryNodeStore;
pub use nested_set_macros::NestedSetModel as NestedSetModelDerive;
#[doc(hidden)]
pub use nested_set_macros::NestedSetModel;
pub use node::{NodeKey, TreeFields, TreeNode, TreeRow};
pub use options::SelectOption;
pub use rebuild::{RebuildOutcome, RebuildPlan};
pub use repository::NestedSetRepository;
pub use sea_store::SeaOrmNodeStore;
pub use store::{BoundsFilter, NodeOrder, NodeStore};
pub use traits::NestedSetModel;
pub use tree::NestedSet;

#[doc(hidden)]
pub mod __private {
    pub use once_cell::sync::Lazy;
}
