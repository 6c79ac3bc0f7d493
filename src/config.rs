use crc32fast::Hasher;

/// Default bound on how many levels a rebuild descends below its start.
pub const DEFAULT_MAX_DEPTH: usize = 512;

/// Default marker repeated once per level in select option labels.
pub const DEFAULT_INDENT: &str = "- ";

/// Static configuration describing how a model is indexed as a nested set.
#[derive(Clone, Debug)]
pub struct NestedSetConfig {
    entity_name: String,
    table_name: String,
    max_depth: usize,
    indent: String,
    order_strategy: OrderStrategy,
    advisory_lock_strategy: AdvisoryLockStrategy,
}

impl NestedSetConfig {
    /// Create a new configuration from the logical entity name and its table.
    pub fn new(entity_name: impl Into<String>, table_name: impl Into<String>) -> Self {
        let entity_name = entity_name.into();
        let table_name = table_name.into();

        let default_lock = AdvisoryLockStrategy::Namespaced(AdvisoryLockKey::derived_from(
            &entity_name,
            &table_name,
        ));

        Self {
            entity_name,
            table_name,
            max_depth: DEFAULT_MAX_DEPTH,
            indent: DEFAULT_INDENT.to_string(),
            order_strategy: OrderStrategy::default(),
            advisory_lock_strategy: default_lock,
        }
    }

    /// Merge options produced by [`NestedSetOptions`].
    pub(crate) fn apply_options(mut self, options: NestedSetOptions) -> Self {
        if let Some(max_depth) = options.max_depth {
            self.max_depth = max_depth;
        }
        if let Some(indent) = options.indent {
            self.indent = indent;
        }
        if let Some(order_strategy) = options.order_strategy {
            self.order_strategy = order_strategy;
        }
        if let Some(strategy) = options.advisory_lock_strategy {
            self.advisory_lock_strategy = strategy;
        }
        self
    }

    pub fn entity_name(&self) -> &str {
        &self.entity_name
    }

    /// Table holding the node rows.
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Deepest level a rebuild may reach below its starting parent.
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn indent(&self) -> &str {
        &self.indent
    }

    /// How siblings are ordered when children are fetched.
    pub fn order_strategy(&self) -> &OrderStrategy {
        &self.order_strategy
    }

    /// Advisory lock strategy (PostgreSQL only).
    pub fn advisory_lock_strategy(&self) -> &AdvisoryLockStrategy {
        &self.advisory_lock_strategy
    }
}

/// Builder-style options consumed by the derive macro.
#[derive(Clone, Debug, Default)]
pub struct NestedSetOptions {
    max_depth: Option<usize>,
    indent: Option<String>,
    order_strategy: Option<OrderStrategy>,
    advisory_lock_strategy: Option<AdvisoryLockStrategy>,
}

impl NestedSetOptions {
    pub fn max_depth(mut self, value: usize) -> Self {
        self.max_depth = Some(value);
        self
    }

    pub fn indent(mut self, value: impl Into<String>) -> Self {
        self.indent = Some(value.into());
        self
    }

    pub fn order_strategy(mut self, strategy: OrderStrategy) -> Self {
        self.order_strategy = Some(strategy);
        self
    }

    pub fn advisory_lock_strategy(mut self, strategy: AdvisoryLockStrategy) -> Self {
        self.advisory_lock_strategy = Some(strategy);
        self
    }

    pub fn apply(self, base: NestedSetConfig) -> NestedSetConfig {
        base.apply_options(self)
    }
}

/// Sibling ordering used when children are selected for a rebuild.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub enum OrderStrategy {
    /// Ascending by the order key column alone.
    #[default]
    OrderKey,
    /// Ascending by a numeric position expression, then by the order key.
    NumericColumn { column: String },
}

impl OrderStrategy {
    pub fn numeric_column(column: impl Into<String>) -> Self {
        Self::NumericColumn {
            column: column.into(),
        }
    }
}

/// Key used for PostgreSQL advisory locks.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct AdvisoryLockKey(String);

impl AdvisoryLockKey {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    fn derived_from(entity: &str, table: &str) -> Self {
        let mut hasher = Hasher::new();
        hasher.update(entity.as_bytes());
        hasher.update(b"/");
        hasher.update(table.as_bytes());
        let crc = hasher.finalize();
        Self(format!("nested-set::{entity}::{table}::{crc:x}"))
    }
}

/// Configuration describing how rebuilds are serialized across connections.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum AdvisoryLockStrategy {
    /// Rely on the enclosing transaction only.
    Disabled,
    Namespaced(AdvisoryLockKey),
}

impl AdvisoryLockStrategy {
    pub fn key(&self) -> Option<&AdvisoryLockKey> {
        match self {
            AdvisoryLockStrategy::Disabled => None,
            AdvisoryLockStrategy::Namespaced(key) => Some(key),
        }
    }
}
