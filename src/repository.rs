use std::marker::PhantomData;

use sea_orm::{ActiveModelTrait, ConnectionTrait, DatabaseConnection};

use crate::config::NestedSetConfig;
use crate::error::NestedSetError;
use crate::hooks::MutationHooks;
use crate::integrity::check_ordered_by;
use crate::lock::LockedTransaction;
use crate::materialize::{materialize, TreeBranch};
use crate::node::TreeFields;
use crate::options::{build_options, SelectOption};
use crate::query;
use crate::rebuild::{self, RebuildOutcome};
use crate::sea_store::SeaOrmNodeStore;
use crate::store::NodeStore;
use crate::traits::NestedSetModel;

/// Repository exposing the nested-set operations for a given SeaORM model.
///
/// Every rebuild, and every insert or update together with the rebuild it
/// triggers, runs in one [`LockedTransaction`]. Reads go straight to the
/// connection and only ever see committed bounds.
#[derive(Debug, Default)]
pub struct NestedSetRepository<M>
where
    M: NestedSetModel,
{
    _marker: PhantomData<M>,
}

impl<M> NestedSetRepository<M>
where
    M: NestedSetModel,
{
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }

    fn config(&self) -> &'static NestedSetConfig {
        M::nested_set_config()
    }

    fn store<C: ConnectionTrait>(conn: &C) -> SeaOrmNodeStore<'_, M, C> {
        SeaOrmNodeStore::new(conn)
    }

    async fn lock(&self, conn: &DatabaseConnection) -> Result<LockedTransaction, NestedSetError> {
        LockedTransaction::acquire(self.config().advisory_lock_strategy(), conn).await
    }

    async fn finish<T>(
        &self,
        guard: LockedTransaction,
        result: Result<T, NestedSetError>,
    ) -> Result<T, NestedSetError> {
        match result {
            Ok(value) => {
                guard.commit().await?;
                Ok(value)
            }
            Err(err) => {
                tracing::warn!(
                    table = self.config().table_name(),
                    error = %err,
                    "rolling back nested-set transaction"
                );
                let _ = guard.rollback().await;
                Err(err)
            }
        }
    }

    /// Renumber the whole tree.
    pub async fn rebuild(
        &self,
        conn: &DatabaseConnection,
    ) -> Result<RebuildOutcome, NestedSetError> {
        let guard = self.lock(conn).await?;
        let result = self.rebuild_on(guard.connection()).await;
        self.finish(guard, result).await
    }

    async fn rebuild_on<C: ConnectionTrait + Send + Sync>(
        &self,
        conn: &C,
    ) -> Result<RebuildOutcome, NestedSetError> {
        rebuild::rebuild(&Self::store(conn), None, 0, 0, self.config().max_depth()).await
    }

    pub async fn ancestors(
        &self,
        conn: &DatabaseConnection,
        id: &M::Id,
        include_self: bool,
    ) -> Result<Vec<M>, NestedSetError> {
        query::ancestors(&Self::store(conn), id, include_self).await
    }

    pub async fn descendants(
        &self,
        conn: &DatabaseConnection,
        root: Option<&M::Id>,
    ) -> Result<Vec<M>, NestedSetError> {
        query::descendants(&Self::store(conn), root).await
    }

    pub async fn tree(
        &self,
        conn: &DatabaseConnection,
        top: Option<&M::Id>,
    ) -> Result<Vec<TreeBranch<M::Id>>, NestedSetError> {
        let rows = self.descendants(conn, top).await?;
        Ok(materialize(&rows, top))
    }

    pub async fn select_options(
        &self,
        conn: &DatabaseConnection,
        current: Option<&M::Id>,
    ) -> Result<Vec<SelectOption<M::Id>>, NestedSetError> {
        let rows = query::all_by_left(&Self::store(conn)).await?;
        Ok(build_options(&rows, current, self.config().indent()))
    }

    pub async fn orphans(&self, conn: &DatabaseConnection) -> Result<Vec<M>, NestedSetError> {
        query::orphans(&Self::store(conn)).await
    }

    pub async fn verify(&self, conn: &DatabaseConnection) -> Result<(), NestedSetError> {
        let rows = query::all_by_left(&Self::store(conn)).await?;
        check_ordered_by(&rows, self.config().order_strategy())
    }

    /// Insert a row with placeholder bounds, then rebuild.
    pub async fn insert<H: MutationHooks<M>>(
        &self,
        conn: &DatabaseConnection,
        active: M::ActiveModel,
        hooks: &H,
    ) -> Result<M, NestedSetError> {
        let guard = self.lock(conn).await?;
        let result = self.insert_on(guard.connection(), active, hooks).await;
        self.finish(guard, result).await
    }

    /// Persist changes to a row, then rebuild.
    pub async fn update<H: MutationHooks<M>>(
        &self,
        conn: &DatabaseConnection,
        active: M::ActiveModel,
        hooks: &H,
    ) -> Result<M, NestedSetError> {
        let guard = self.lock(conn).await?;
        let result = self.update_on(guard.connection(), active, hooks).await;
        self.finish(guard, result).await
    }

    async fn insert_on<C: ConnectionTrait + Send + Sync, H: MutationHooks<M>>(
        &self,
        conn: &C,
        mut active: M::ActiveModel,
        hooks: &H,
    ) -> Result<M, NestedSetError> {
        hooks.before_add(&mut active)?;
        M::set_tree_fields(&mut active, TreeFields::PLACEHOLDER);

        let model = active.insert(conn).await?;
        let model = self.rebuild_and_reload(conn, &model).await?;
        hooks.after_add(&model)?;
        Ok(model)
    }

    async fn update_on<C: ConnectionTrait + Send + Sync, H: MutationHooks<M>>(
        &self,
        conn: &C,
        mut active: M::ActiveModel,
        hooks: &H,
    ) -> Result<M, NestedSetError> {
        hooks.before_update(&mut active)?;

        let model = active.update(conn).await?;
        let model = self.rebuild_and_reload(conn, &model).await?;
        hooks.after_update(&model)?;
        Ok(model)
    }

    async fn rebuild_and_reload<C: ConnectionTrait + Send + Sync>(
        &self,
        conn: &C,
        model: &M,
    ) -> Result<M, NestedSetError> {
        self.rebuild_on(conn).await?;
        let id = model.node_id();
        Self::store(conn)
            .select_by_id(&id)
            .await?
            .ok_or_else(|| NestedSetError::not_found(&id))
    }
}
