//! Minimal SELECT builder for existence and distinct-count checks.

use crate::model::value::FieldValue;

/// Alias of the sentinel column selected by scalar checks.
pub const FOUND_ALIAS: &str = "found";
/// Alias of the distinct-count column selected by batch checks.
pub const COUNT_ALIAS: &str = "count";

#[derive(Debug, Clone, PartialEq)]
pub enum Projection {
    /// `SELECT <value> AS <alias>`
    Literal { value: i64, alias: String },
    /// `SELECT COUNT(DISTINCT <column>) AS <alias>`
    CountDistinct { column: String, alias: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Eq { column: String, value: FieldValue },
    In { column: String, values: Vec<FieldValue> },
}

/// Single-table SELECT with one projection, one predicate and a limit.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectQuery {
    table: String,
    projection: Projection,
    predicate: Option<Predicate>,
    limit: Option<u32>,
}

impl SelectQuery {
    /// Starts a query selecting `1 AS found` from `table`.
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            projection: Projection::Literal {
                value: 1,
                alias: FOUND_ALIAS.to_string(),
            },
            predicate: None,
            limit: None,
        }
    }

    pub fn select_literal(mut self, value: i64, alias: impl Into<String>) -> Self {
        self.projection = Projection::Literal {
            value,
            alias: alias.into(),
        };
        self
    }

    pub fn select_count_distinct(
        mut self,
        column: impl Into<String>,
        alias: impl Into<String>,
    ) -> Self {
        self.projection = Projection::CountDistinct {
            column: column.into(),
            alias: alias.into(),
        };
        self
    }

    pub fn where_eq(mut self, column: impl Into<String>, value: FieldValue) -> Self {
        self.predicate = Some(Predicate::Eq {
            column: column.into(),
            value,
        });
        self
    }

    pub fn where_in(mut self, column: impl Into<String>, values: Vec<FieldValue>) -> Self {
        self.predicate = Some(Predicate::In {
            column: column.into(),
            values,
        });
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn projection(&self) -> &Projection {
        &self.projection
    }

    pub fn predicate(&self) -> Option<&Predicate> {
        self.predicate.as_ref()
    }

    pub fn limit_value(&self) -> Option<u32> {
        self.limit
    }

    /// Renders SQL with `?` placeholders and returns the bound values in order.
    pub fn to_sql(&self) -> (String, Vec<FieldValue>) {
        let mut bind_values = Vec::new();
        let projection = match &self.projection {
            Projection::Literal { value, alias } => format!("{value} AS {}", quote_ident(alias)),
            Projection::CountDistinct { column, alias } => format!(
                "COUNT(DISTINCT {}) AS {}",
                quote_ident(column),
                quote_ident(alias)
            ),
        };

        let mut sql = format!("SELECT {projection} FROM {}", quote_ident(&self.table));

        match &self.predicate {
            Some(Predicate::Eq { column, value }) => {
                sql.push_str(&format!(" WHERE {} = ?", quote_ident(column)));
                bind_values.push(value.clone());
            }
            Some(Predicate::In { values, .. }) if values.is_empty() => {
                // An empty IN-list matches nothing.
                sql.push_str(" WHERE 1 = 0");
            }
            Some(Predicate::In { column, values }) => {
                let placeholders = vec!["?"; values.len()].join(", ");
                sql.push_str(&format!(
                    " WHERE {} IN ({placeholders})",
                    quote_ident(column)
                ));
                bind_values.extend(values.iter().cloned());
            }
            None => {}
        }

        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }

        (sql, bind_values)
    }
}

/// Backtick quoting never degrades to a string literal when the name is
/// unknown, unlike double quotes under SQLite's legacy DQS mode.
fn quote_ident(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}
