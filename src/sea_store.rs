use std::marker::PhantomData;

use async_trait::async_trait;
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, Condition, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder};

use crate::config::OrderStrategy;
use crate::error::NestedSetError;
use crate::node::TreeFields;
use crate::store::{BoundsFilter, NodeOrder, NodeStore};
use crate::traits::NestedSetModel;

/// [`NodeStore`] over a SeaORM connection or transaction.
#[derive(Debug)]
pub struct SeaOrmNodeStore<'c, M, C> {
    conn: &'c C,
    _marker: PhantomData<M>,
}

impl<'c, M, C> SeaOrmNodeStore<'c, M, C>
where
    M: NestedSetModel,
    C: ConnectionTrait,
{
    pub fn new(conn: &'c C) -> Self {
        Self {
            conn,
            _marker: PhantomData,
        }
    }
}

fn bounds_condition<M: NestedSetModel>(filter: BoundsFilter) -> Condition {
    match filter {
        BoundsFilter::Enclosing { fields, inclusive: true } => Condition::all()
            .add(M::left_column().lte(fields.left))
            .add(M::right_column().gte(fields.right)),
        BoundsFilter::Enclosing { fields, inclusive: false } => Condition::all()
            .add(M::left_column().lt(fields.left))
            .add(M::right_column().gt(fields.right)),
        BoundsFilter::Within { fields, inclusive: true } => Condition::all()
            .add(M::left_column().gte(fields.left))
            .add(M::right_column().lte(fields.right)),
        BoundsFilter::Within { fields, inclusive: false } => Condition::all()
            .add(M::left_column().gt(fields.left))
            .add(M::right_column().lt(fields.right)),
    }
}

#[async_trait]
impl<'c, M, C> NodeStore for SeaOrmNodeStore<'c, M, C>
where
    M: NestedSetModel,
    C: ConnectionTrait + Send + Sync,
{
    type Row = M;

    async fn select_children(&self, parent: Option<&M::Id>) -> Result<Vec<M>, NestedSetError> {
        let condition = match parent {
            Some(parent) => M::parent_column().eq(M::id_to_value(parent)),
            None => M::parent_column().is_null(),
        };

        let mut query = M::Entity::find().filter(condition);
        if let OrderStrategy::NumericColumn { column } = M::nested_set_config().order_strategy() {
            query = query.order_by_asc(Expr::cust(column.clone()));
        }
        query = query
            .order_by_asc(M::order_column())
            .order_by_asc(M::id_column());

        let rows = query.all(self.conn).await?;
        Ok(rows)
    }

    async fn select_by_id(&self, id: &M::Id) -> Result<Option<M>, NestedSetError> {
        let row = M::Entity::find()
            .filter(M::id_column().eq(M::id_to_value(id)))
            .one(self.conn)
            .await?;
        Ok(row)
    }

    async fn select_all(
        &self,
        filter: Option<BoundsFilter>,
        order: NodeOrder,
    ) -> Result<Vec<M>, NestedSetError> {
        let mut query = M::Entity::find();
        if let Some(filter) = filter {
            query = query.filter(bounds_condition::<M>(filter));
        }
        query = match order {
            NodeOrder::LevelThenLeft => query
                .order_by_asc(M::level_column())
                .order_by_asc(M::left_column()),
            NodeOrder::Left => query.order_by_asc(M::left_column()),
        };

        let rows = query.all(self.conn).await?;
        Ok(rows)
    }

    async fn update_fields(&self, id: &M::Id, fields: TreeFields) -> Result<(), NestedSetError> {
        let result = M::Entity::update_many()
            .col_expr(M::left_column(), Expr::value(fields.left))
            .col_expr(M::right_column(), Expr::value(fields.right))
            .col_expr(M::level_column(), Expr::value(fields.level))
            .filter(M::id_column().eq(M::id_to_value(id)))
            .exec(self.conn)
            .await?;

        if result.rows_affected == 0 {
            return Err(NestedSetError::not_found(id));
        }
        Ok(())
    }
}
