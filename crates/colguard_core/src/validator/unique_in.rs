//! Passes when the value is absent from the configured column.

use crate::check::check_value;
use crate::db::registry::{global_registry, ConnectionRegistry};
use crate::error::ValidatorResult;
use crate::model::value::FieldValue;
use crate::validator::{present, ConstraintValidator, ValidationArguments};
use std::sync::Arc;

pub const UNIQUE_IN: &str = "uniqueIn";

/// Passes open: a missing value has nothing to conflict with.
///
/// In batch mode no candidate may exist yet.
pub struct UniqueInValidator {
    registry: Arc<ConnectionRegistry>,
}

impl UniqueInValidator {
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }
}

impl Default for UniqueInValidator {
    fn default() -> Self {
        Self::new(global_registry())
    }
}

impl ConstraintValidator for UniqueInValidator {
    fn name(&self) -> &'static str {
        UNIQUE_IN
    }

    fn validate(
        &self,
        value: Option<&FieldValue>,
        args: &ValidationArguments,
    ) -> ValidatorResult<bool> {
        let Some(value) = present(value) else {
            return Ok(true);
        };

        let verdict = check_value(
            &self.registry,
            self.name(),
            &args.property,
            value,
            &args.constraints,
        )?;
        Ok(!verdict.any_exists)
    }

    fn default_message(&self, args: &ValidationArguments) -> String {
        let constraints = &args.constraints;
        if constraints.each() {
            format!(
                "{} with values [{}] are not all unique in {}.{}",
                args.property,
                args.value_text(),
                constraints.target().display_name(),
                constraints.column()
            )
        } else {
            format!(
                "{} with value \"{}\" is not unique in {}.{}",
                args.property,
                args.value_text(),
                constraints.target().display_name(),
                constraints.column()
            )
        }
    }
}
