//! Column-backed `existsIn` / `uniqueIn` validators.
//!
//! Field values are checked against a column of a relational store reached
//! through a named connection registry. The query core lives in [`check`];
//! validators and rule factories wrap it for validation pipelines.

pub mod check;
pub mod db;
pub mod error;
pub mod logging;
pub mod model;
pub mod rule;
pub mod validator;

pub use check::{check_value, Verdict};
pub use db::query::SelectQuery;
pub use db::registry::{
    clear_connections, global_registry, register_connection, resolve_connection,
    ConnectionRegistry, DEFAULT_CONNECTION_NAME,
};
pub use db::sqlite::{ConnectionOptions, SqliteConnection};
pub use db::{Accessor, ConnectionHandle, Row};
pub use error::{BoxError, ThrownValue, ValidatorError, ValidatorErrorKind, ValidatorResult};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::constraint::{Constraints, ValidationOptions};
pub use model::target::{Entity, EntityRef, Target};
pub use model::value::FieldValue;
pub use rule::{
    exists_in, unique_in, ConstraintRegistrar, ConstraintRegistration, PropertyRule, Record,
    RuleSet, ValidationFailure,
};
pub use validator::{
    ConstraintValidator, ExistsInValidator, UniqueInValidator, ValidationArguments,
};
