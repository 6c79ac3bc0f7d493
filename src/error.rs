use std::fmt;

use thiserror::Error;

/// Errors returned by the nested-set engine, queries and repository.
#[derive(Debug, Error)]
pub enum NestedSetError {
    #[error("node {id} does not exist")]
    NotFound { id: String },

    #[error("database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("node store error: {0}")]
    Store(String),

    #[error(
        "tree index is incomplete after {written} of {planned} writes, rerun the rebuild: {source}"
    )]
    RebuildIncomplete {
        written: usize,
        planned: usize,
        #[source]
        source: Box<NestedSetError>,
    },

    #[error("hierarchy at node {id} is {fault}")]
    CyclicOrUnboundedHierarchy { id: String, fault: HierarchyFault },

    #[error("advisory locking is supported on PostgreSQL connections only")]
    UnsupportedBackend,

    #[error("nested-set invariant violation: {0}")]
    Invariant(String),
}

/// Reason a traversal refused to continue.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum HierarchyFault {
    /// A node was reached a second time through parent references.
    Cycle,
    /// The traversal went deeper than the configured maximum.
    DepthExceeded { max_depth: usize },
}

impl fmt::Display for HierarchyFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HierarchyFault::Cycle => f.write_str("part of a parent cycle"),
            HierarchyFault::DepthExceeded { max_depth } => {
                write!(f, "deeper than the maximum of {max_depth} levels")
            }
        }
    }
}

/// Coarse classification callers can branch on.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    NotFound,
    StoreFailure,
    RebuildIncomplete,
    CyclicOrUnboundedHierarchy,
    Other,
}

impl NestedSetError {
    pub fn not_found(id: &impl fmt::Debug) -> Self {
        Self::NotFound {
            id: format!("{id:?}"),
        }
    }

    pub fn store(detail: impl Into<String>) -> Self {
        Self::Store(detail.into())
    }

    pub fn invariant(detail: impl Into<String>) -> Self {
        Self::Invariant(detail.into())
    }

    pub fn hierarchy(id: &impl fmt::Debug, fault: HierarchyFault) -> Self {
        Self::CyclicOrUnboundedHierarchy {
            id: format!("{id:?}"),
            fault,
        }
    }

    pub(crate) fn incomplete(written: usize, planned: usize, source: NestedSetError) -> Self {
        Self::RebuildIncomplete {
            written,
            planned,
            source: Box::new(source),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            NestedSetError::NotFound { .. } => ErrorKind::NotFound,
            NestedSetError::Database(_) | NestedSetError::Store(_) => ErrorKind::StoreFailure,
            NestedSetError::RebuildIncomplete { .. } => ErrorKind::RebuildIncomplete,
            NestedSetError::CyclicOrUnboundedHierarchy { .. } => {
                ErrorKind::CyclicOrUnboundedHierarchy
            }
            NestedSetError::UnsupportedBackend | NestedSetError::Invariant(_) => ErrorKind::Other,
        }
    }
}
