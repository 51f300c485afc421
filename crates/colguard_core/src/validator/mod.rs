//! `existsIn` / `uniqueIn` validators.
//!
//! # Responsibility
//! - Interpret query core verdicts as pass/fail.
//! - Produce human-readable failure messages.
//!
//! # Invariants
//! - Validators hold no state between calls beyond their registry reference.
//! - Missing values short-circuit before configuration checks or I/O.

use crate::error::ValidatorResult;
use crate::model::constraint::Constraints;
use crate::model::value::FieldValue;

pub mod exists_in;
pub mod unique_in;

pub use exists_in::ExistsInValidator;
pub use unique_in::UniqueInValidator;

/// Context handed to a validator for one property of one object.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationArguments {
    /// Value being validated; `None` when the property is absent.
    pub value: Option<FieldValue>,
    pub constraints: Constraints,
    /// Name of the validated object's type.
    pub target_name: String,
    pub property: String,
}

impl ValidationArguments {
    pub fn new(
        target_name: impl Into<String>,
        property: impl Into<String>,
        value: Option<FieldValue>,
        constraints: Constraints,
    ) -> Self {
        Self {
            value,
            constraints,
            target_name: target_name.into(),
            property: property.into(),
        }
    }

    /// String form of the value used in messages; absent values read `null`.
    pub fn value_text(&self) -> String {
        self.value
            .as_ref()
            .map_or_else(|| FieldValue::Null.to_string(), ToString::to_string)
    }
}

/// Contract the host validation pipeline invokes per property.
pub trait ConstraintValidator: Send + Sync {
    /// Constraint name, e.g. `"existsIn"`.
    fn name(&self) -> &'static str;

    /// Returns whether `value` passes.
    ///
    /// Errors indicate misconfiguration or infrastructure failure and must
    /// abort the surrounding validation run.
    fn validate(&self, value: Option<&FieldValue>, args: &ValidationArguments)
        -> ValidatorResult<bool>;

    fn default_message(&self, args: &ValidationArguments) -> String;
}

/// Treats explicit nulls like absent values.
fn present(value: Option<&FieldValue>) -> Option<&FieldValue> {
    value.filter(|value| !value.is_null())
}
