use crate::error::NestedSetError;
use crate::traits::NestedSetModel;

/// Callbacks run around [`NestedSetRepository`](crate::NestedSetRepository)
/// inserts and updates, inside the same transaction as the write and the
/// rebuild that follows it. Returning an error rolls everything back.
pub trait MutationHooks<M: NestedSetModel>: Send + Sync {
    fn before_add(&self, _active: &mut M::ActiveModel) -> Result<(), NestedSetError> {
        Ok(())
    }

    /// Runs after the rebuild; `model` carries its new bounds.
    fn after_add(&self, _model: &M) -> Result<(), NestedSetError> {
        Ok(())
    }

    fn before_update(&self, _active: &mut M::ActiveModel) -> Result<(), NestedSetError> {
        Ok(())
    }

    fn after_update(&self, _model: &M) -> Result<(), NestedSetError> {
        Ok(())
    }
}

/// Hooks that do nothing.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoHooks;

impl<M: NestedSetModel> MutationHooks<M> for NoHooks {}
