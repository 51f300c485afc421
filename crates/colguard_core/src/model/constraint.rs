//! Per-field constraint tuple and declaration options.

use crate::model::target::Target;
use serde::{Deserialize, Serialize};

/// Immutable `(target, column, connection, each)` tuple captured when a rule
/// is declared and replayed on every validation call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constraints {
    target: Target,
    column: String,
    connection: Option<String>,
    each: bool,
}

impl Constraints {
    pub fn new(target: impl Into<Target>, column: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            column: column.into(),
            connection: None,
            each: false,
        }
    }

    /// Sets the connection name; `None` or blank resolves to `"default"`.
    pub fn with_connection(mut self, connection: Option<&str>) -> Self {
        self.connection = connection.map(str::to_string);
        self
    }

    /// Switches to batch mode: the value is a comma-separated list.
    pub fn with_each(mut self, each: bool) -> Self {
        self.each = each;
        self
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    pub fn connection(&self) -> Option<&str> {
        self.connection.as_deref()
    }

    pub fn each(&self) -> bool {
        self.each
    }

    /// Returns true when the target or column is empty. Whitespace-only names
    /// are left for the store to reject.
    pub fn is_incomplete(&self) -> bool {
        self.target.is_missing() || self.column.is_empty()
    }

    /// Raw tuple rendering used in diagnostics.
    pub fn describe(&self) -> String {
        format!(
            "[{:?}, {:?}, {:?}, each={}]",
            self.target.table(),
            self.column,
            self.connection,
            self.each
        )
    }
}

/// Options accepted by the rule factories.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationOptions {
    /// Treat the value as a comma-separated batch.
    pub each: bool,
    /// Replaces the validator's default failure message.
    pub message: Option<String>,
}

impl ValidationOptions {
    pub fn each() -> Self {
        Self {
            each: true,
            ..Self::default()
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::{Constraints, ValidationOptions};

    #[test]
    fn empty_column_or_table_is_incomplete() {
        assert!(Constraints::new("users", "").is_incomplete());
        assert!(Constraints::new("", "id").is_incomplete());
        assert!(!Constraints::new("users", "id").is_incomplete());
        assert!(!Constraints::new("users", " ").is_incomplete());
    }

    #[test]
    fn describe_includes_every_tuple_slot() {
        let constraints = Constraints::new("users", "email")
            .with_connection(Some("replica"))
            .with_each(true);
        let described = constraints.describe();
        assert!(described.contains("\"users\""));
        assert!(described.contains("\"email\""));
        assert!(described.contains("replica"));
        assert!(described.contains("each=true"));
    }

    #[test]
    fn options_default_to_scalar_mode() {
        let options = ValidationOptions::default();
        assert!(!options.each);
        assert!(options.message.is_none());
        assert!(ValidationOptions::each().each);
    }
}
