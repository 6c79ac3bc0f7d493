use sea_orm::{
    ActiveModelBehavior, ActiveModelTrait, EntityTrait, FromQueryResult, IntoActiveModel, Value,
};

use crate::config::NestedSetConfig;
use crate::node::{TreeFields, TreeRow};

/// Trait implemented by SeaORM `Model` types indexed as a nested set.
///
/// Implementations are normally provided by the `#[derive(NestedSetModel)]` macro,
/// which also implements [`TreeRow`] for the model.
pub trait NestedSetModel: TreeRow + IntoActiveModel<Self::ActiveModel> + FromQueryResult {
    type Entity: EntityTrait<Model = Self>;
    type ActiveModel: ActiveModelTrait<Entity = Self::Entity> + ActiveModelBehavior + Send;

    fn nested_set_config() -> &'static NestedSetConfig;

    fn set_tree_fields(active: &mut Self::ActiveModel, fields: TreeFields);
    fn id_to_value(id: &Self::Id) -> Value;

    fn id_column() -> <Self::Entity as EntityTrait>::Column;
    fn parent_column() -> <Self::Entity as EntityTrait>::Column;
    fn order_column() -> <Self::Entity as EntityTrait>::Column;
    fn left_column() -> <Self::Entity as EntityTrait>::Column;
    fn right_column() -> <Self::Entity as EntityTrait>::Column;
    fn level_column() -> <Self::Entity as EntityTrait>::Column;
}
