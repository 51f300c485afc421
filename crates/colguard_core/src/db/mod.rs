//! Connection-handle contract, connection registry and store adapters.
//!
//! # Responsibility
//! - Define what the query core needs from a data store connection.
//! - Map logical connection names onto caller-owned handles.
//! - Provide a SQLite-backed handle implementation.
//!
//! # Invariants
//! - The core never creates or closes handles registered by callers.
//! - A handle must report ready before any accessor query runs.

use crate::error::BoxError;
use crate::model::target::Target;
use crate::model::value::FieldValue;
use std::collections::BTreeMap;

pub mod query;
pub mod registry;
pub mod sqlite;

use query::SelectQuery;

/// Live or lazily-initializable link to a relational store.
///
/// `initialize` may be called redundantly and from several threads at once;
/// implementations must tolerate that.
pub trait ConnectionHandle: Send + Sync {
    fn is_ready(&self) -> bool;

    fn initialize(&self) -> Result<(), BoxError>;

    /// Returns a query accessor bound to `target`.
    fn accessor<'a>(&'a self, target: &Target) -> Result<Box<dyn Accessor + 'a>, BoxError>;
}

/// Query accessor for one table or entity.
pub trait Accessor {
    /// Table this accessor queries.
    fn table(&self) -> &str;

    /// Runs `query` and returns its first row, if any.
    fn fetch_one(&self, query: &SelectQuery) -> Result<Option<Row>, BoxError>;

    /// Starts a query builder scoped to this accessor's table.
    fn select(&self) -> SelectQuery {
        SelectQuery::new(self.table())
    }
}

/// One raw result row keyed by column alias.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    columns: BTreeMap<String, FieldValue>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, column: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.insert(column, value);
        self
    }

    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<FieldValue>) {
        self.columns.insert(column.into(), value.into());
    }

    pub fn get(&self, column: &str) -> Option<&FieldValue> {
        self.columns.get(column)
    }

    /// Integer view of `column`; `None` when absent or not numeric.
    pub fn get_i64(&self, column: &str) -> Option<i64> {
        self.get(column).and_then(FieldValue::as_i64)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::Row;

    #[test]
    fn get_i64_reads_numeric_and_text_counts() {
        let row = Row::new().with("count", 2).with("label", "3");
        assert_eq!(row.get_i64("count"), Some(2));
        assert_eq!(row.get_i64("label"), Some(3));
        assert_eq!(row.get_i64("missing"), None);
        assert_eq!(row.len(), 2);
    }
}
