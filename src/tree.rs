use tokio::sync::RwLock;

use crate::config::NestedSetConfig;
use crate::error::NestedSetError;
use crate::integrity::check_ordered_by;
use crate::materialize::{materialize, TreeBranch};
use crate::node::TreeRow;
use crate::options::{build_options, SelectOption};
use crate::query;
use crate::rebuild::{self, RebuildOutcome};
use crate::store::NodeStore;

type IdOf<S> = <<S as NodeStore>::Row as TreeRow>::Id;

/// Nested-set operations over any [`NodeStore`].
///
/// Rebuilds hold the write half of an in-process gate and every read holds
/// the read half, so readers sharing this value never see a tree halfway
/// through renumbering and two rebuilds never interleave. Writers that
/// bypass this value must serialize themselves.
#[derive(Debug)]
pub struct NestedSet<S> {
    store: S,
    config: NestedSetConfig,
    gate: RwLock<()>,
}

impl<S: NodeStore> NestedSet<S> {
    pub fn new(store: S, config: NestedSetConfig) -> Self {
        Self {
            store,
            config,
            gate: RwLock::new(()),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &NestedSetConfig {
        &self.config
    }

    /// Renumber the whole tree from the root.
    pub async fn rebuild(&self) -> Result<RebuildOutcome, NestedSetError> {
        self.rebuild_from(None, 0, 0).await
    }

    /// Renumber everything below `parent`, starting at `left` and `level`.
    pub async fn rebuild_from(
        &self,
        parent: Option<&IdOf<S>>,
        left: i32,
        level: i32,
    ) -> Result<RebuildOutcome, NestedSetError> {
        let _guard = self.gate.write().await;
        tracing::debug!(
            table = self.config.table_name(),
            ?parent,
            left,
            level,
            "rebuilding nested set"
        );
        rebuild::rebuild(&self.store, parent, left, level, self.config.max_depth()).await
    }

    pub async fn ancestors(
        &self,
        id: &IdOf<S>,
        include_self: bool,
    ) -> Result<Vec<S::Row>, NestedSetError> {
        let _guard = self.gate.read().await;
        query::ancestors(&self.store, id, include_self).await
    }

    pub async fn descendants(&self, root: Option<&IdOf<S>>) -> Result<Vec<S::Row>, NestedSetError> {
        let _guard = self.gate.read().await;
        query::descendants(&self.store, root).await
    }

    /// Materialized tree below `top`, or the whole forest.
    pub async fn tree(
        &self,
        top: Option<&IdOf<S>>,
    ) -> Result<Vec<TreeBranch<IdOf<S>>>, NestedSetError> {
        let rows = self.descendants(top).await?;
        Ok(materialize(&rows, top))
    }

    /// Indented parent-picker entries with `current` and its subtree disabled.
    pub async fn select_options(
        &self,
        current: Option<&IdOf<S>>,
    ) -> Result<Vec<SelectOption<IdOf<S>>>, NestedSetError> {
        let rows = {
            let _guard = self.gate.read().await;
            query::all_by_left(&self.store).await?
        };
        Ok(build_options(&rows, current, self.config.indent()))
    }

    pub async fn orphans(&self) -> Result<Vec<S::Row>, NestedSetError> {
        let _guard = self.gate.read().await;
        query::orphans(&self.store).await
    }

    /// Check the stored bounds against parent references.
    pub async fn verify(&self) -> Result<(), NestedSetError> {
        let rows = {
            let _guard = self.gate.read().await;
            query::all_by_left(&self.store).await?
        };
        check_ordered_by(&rows, self.config.order_strategy())
    }
}
