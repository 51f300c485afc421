//! Typed failures raised by the connection registry, query core and validators.
//!
//! # Responsibility
//! - Distinguish misconfiguration from infrastructure failures.
//! - Keep the original store error reachable through `Error::source`.
//!
//! # Invariants
//! - Already-typed errors are never reclassified on their way up.
//! - Every other failure is wrapped exactly once, at the query core boundary.

use std::any::Any;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Boxed error produced by connection handles and accessors.
pub type BoxError = Box<dyn Error + Send + Sync + 'static>;

pub type ValidatorResult<T> = Result<T, ValidatorError>;

/// Stable tag for each `ValidatorError` variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValidatorErrorKind {
    Configuration,
    NotRegistered,
    Initialization,
    InvalidHandle,
    QueryExecution,
    Connection,
}

impl ValidatorErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Configuration => "configuration",
            Self::NotRegistered => "not_registered",
            Self::Initialization => "initialization",
            Self::InvalidHandle => "invalid_handle",
            Self::QueryExecution => "query_execution",
            Self::Connection => "connection",
        }
    }
}

/// Target or column is missing, or does not match the store schema.
#[derive(Debug)]
pub struct ConfigurationError {
    pub message: String,
    pub validator: String,
    pub property: Option<String>,
    /// Raw constraint tuple, when the tuple itself is incomplete.
    pub constraints: Option<String>,
    /// Entity display name, when the store rejected the target.
    pub entity: Option<String>,
    pub cause: Option<BoxError>,
}

/// Query failure that is not a schema mismatch.
#[derive(Debug)]
pub struct QueryExecutionError {
    pub message: String,
    pub property: String,
    /// String form of the attempted value.
    pub value: String,
    pub entity: String,
    pub column: String,
    pub cause: BoxError,
}

/// Root error for column-check validation.
#[derive(Debug)]
pub enum ValidatorError {
    Configuration(ConfigurationError),
    /// No handle is registered under the resolved name.
    NotRegistered { name: String },
    /// `initialize` returned but the handle still reports not ready.
    Initialization { name: String },
    /// Registration input was rejected.
    InvalidHandle { message: String },
    QueryExecution(QueryExecutionError),
    /// Error returned by a handle's own `initialize`, surfaced verbatim.
    ///
    /// `Display` and `source` forward to the inner error.
    Connection(BoxError),
}

impl ValidatorError {
    /// Target or column missing from the constraint tuple.
    pub fn incomplete_constraints(validator: &str, property: &str, constraints: String) -> Self {
        Self::Configuration(ConfigurationError {
            message: format!(
                "{validator}: entity/table and column must both be set for property `{property}` (constraints {constraints})"
            ),
            validator: validator.to_string(),
            property: Some(property.to_string()),
            constraints: Some(constraints),
            entity: None,
            cause: None,
        })
    }

    /// Store reported that the target or column is unknown.
    pub fn schema_mismatch(
        validator: &str,
        property: &str,
        entity: &str,
        cause: BoxError,
    ) -> Self {
        Self::Configuration(ConfigurationError {
            message: format!(
                "{validator}: entity `{entity}` is not mapped or does not match the schema"
            ),
            validator: validator.to_string(),
            property: Some(property.to_string()),
            constraints: None,
            entity: Some(entity.to_string()),
            cause: Some(cause),
        })
    }

    pub fn not_registered(name: impl Into<String>) -> Self {
        Self::NotRegistered { name: name.into() }
    }

    pub fn initialization(name: impl Into<String>) -> Self {
        Self::Initialization { name: name.into() }
    }

    pub fn invalid_handle(message: impl Into<String>) -> Self {
        Self::InvalidHandle {
            message: message.into(),
        }
    }

    pub fn query_execution(
        property: &str,
        value: String,
        entity: &str,
        column: &str,
        cause: BoxError,
    ) -> Self {
        Self::QueryExecution(QueryExecutionError {
            message: format!("Failed to validate {entity}.{column} for property `{property}`"),
            property: property.to_string(),
            value,
            entity: entity.to_string(),
            column: column.to_string(),
            cause,
        })
    }

    /// Keeps typed errors as they are; everything else becomes `Connection`.
    pub fn from_initialize(err: BoxError) -> Self {
        match err.downcast::<ValidatorError>() {
            Ok(typed) => *typed,
            Err(other) => Self::Connection(other),
        }
    }

    pub fn kind(&self) -> ValidatorErrorKind {
        match self {
            Self::Configuration(_) => ValidatorErrorKind::Configuration,
            Self::NotRegistered { .. } => ValidatorErrorKind::NotRegistered,
            Self::Initialization { .. } => ValidatorErrorKind::Initialization,
            Self::InvalidHandle { .. } => ValidatorErrorKind::InvalidHandle,
            Self::QueryExecution(_) => ValidatorErrorKind::QueryExecution,
            Self::Connection(_) => ValidatorErrorKind::Connection,
        }
    }

    /// Wrapped cause, if this error carries one.
    pub fn cause(&self) -> Option<&(dyn Error + Send + Sync + 'static)> {
        match self {
            Self::Configuration(err) => err.cause.as_deref(),
            Self::QueryExecution(err) => Some(err.cause.as_ref()),
            Self::Connection(err) => Some(err.as_ref()),
            Self::NotRegistered { .. } | Self::Initialization { .. } | Self::InvalidHandle { .. } => {
                None
            }
        }
    }

    /// Renders this error followed by its whole source chain.
    pub fn report(&self) -> String {
        let mut rendered = self.to_string();
        let mut next = self.source();
        while let Some(err) = next {
            rendered.push_str("\nCaused by: ");
            rendered.push_str(&err.to_string());
            next = err.source();
        }
        rendered
    }
}

impl Display for ValidatorError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Configuration(err) => write!(f, "{}", err.message),
            Self::NotRegistered { name } => {
                write!(f, "no connection registered under name `{name}`")
            }
            Self::Initialization { name } => {
                write!(f, "connection `{name}` is still not ready after initialize")
            }
            Self::InvalidHandle { message } => write!(f, "invalid connection handle: {message}"),
            Self::QueryExecution(err) => write!(f, "{}", err.message),
            Self::Connection(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ValidatorError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Connection(err) => err.source(),
            other => other.cause().map(|err| err as &(dyn Error + 'static)),
        }
    }
}

/// Error-shaped stand-in for a panic raised inside a store call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThrownValue {
    message: String,
}

impl ThrownValue {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Coerces a panic payload into an error carrying its string form.
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(message) = payload.downcast_ref::<&str>() {
            (*message).to_string()
        } else if let Some(message) = payload.downcast_ref::<String>() {
            message.clone()
        } else {
            "non-string panic payload".to_string()
        };
        Self::new(message)
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for ThrownValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl Error for ThrownValue {}

#[cfg(test)]
mod tests {
    use super::{BoxError, ThrownValue, ValidatorError, ValidatorErrorKind};
    use std::error::Error;

    #[test]
    fn query_execution_keeps_cause_and_context() {
        let cause: BoxError = "connection reset".into();
        let err = ValidatorError::query_execution("email", "a@b.c".to_string(), "users", "email", cause);

        assert_eq!(err.kind(), ValidatorErrorKind::QueryExecution);
        assert!(err.to_string().contains("Failed to validate"));
        assert!(err.to_string().contains("users.email"));
        assert_eq!(
            err.source().expect("cause should be exposed").to_string(),
            "connection reset"
        );
        match err {
            ValidatorError::QueryExecution(inner) => {
                assert_eq!(inner.property, "email");
                assert_eq!(inner.value, "a@b.c");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn report_appends_cause_chain() {
        let cause: BoxError = "no such table: users".into();
        let err = ValidatorError::schema_mismatch("existsIn", "author_id", "users", cause);
        let report = err.report();
        assert!(report.starts_with("existsIn: entity `users`"));
        assert!(report.contains("\nCaused by: no such table: users"));
    }

    #[test]
    fn from_initialize_unwraps_typed_errors_and_keeps_others() {
        let typed: BoxError = Box::new(ValidatorError::initialization("replica"));
        assert_eq!(
            ValidatorError::from_initialize(typed).kind(),
            ValidatorErrorKind::Initialization
        );

        let foreign: BoxError = "disk full".into();
        let err = ValidatorError::from_initialize(foreign);
        assert_eq!(err.kind(), ValidatorErrorKind::Connection);
        assert_eq!(err.to_string(), "disk full");
    }

    #[test]
    fn not_registered_message_names_connection() {
        let err = ValidatorError::not_registered("analytics");
        assert!(err.to_string().contains("analytics"));
        assert!(err.source().is_none());
    }

    #[test]
    fn thrown_value_uses_panic_payload_text() {
        let from_str = ThrownValue::from_panic(Box::new("boom"));
        assert_eq!(from_str.message(), "boom");
        let from_string = ThrownValue::from_panic(Box::new(String::from("kaboom")));
        assert_eq!(from_string.to_string(), "kaboom");
        let opaque = ThrownValue::from_panic(Box::new(7_u8));
        assert_eq!(opaque.message(), "non-string panic payload");
    }
}
