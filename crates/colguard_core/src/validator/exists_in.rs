//! Passes when the value is present in the configured column.

use crate::check::check_value;
use crate::db::registry::{global_registry, ConnectionRegistry};
use crate::error::ValidatorResult;
use crate::model::value::FieldValue;
use crate::validator::{present, ConstraintValidator, ValidationArguments};
use std::sync::Arc;

pub const EXISTS_IN: &str = "existsIn";

/// Fails closed: a missing value cannot exist.
///
/// In batch mode every candidate must exist.
pub struct ExistsInValidator {
    registry: Arc<ConnectionRegistry>,
}

impl ExistsInValidator {
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }
}

impl Default for ExistsInValidator {
    fn default() -> Self {
        Self::new(global_registry())
    }
}

impl ConstraintValidator for ExistsInValidator {
    fn name(&self) -> &'static str {
        EXISTS_IN
    }

    fn validate(
        &self,
        value: Option<&FieldValue>,
        args: &ValidationArguments,
    ) -> ValidatorResult<bool> {
        let Some(value) = present(value) else {
            return Ok(false);
        };

        let verdict = check_value(
            &self.registry,
            self.name(),
            &args.property,
            value,
            &args.constraints,
        )?;
        Ok(verdict.all_exists)
    }

    fn default_message(&self, args: &ValidationArguments) -> String {
        let constraints = &args.constraints;
        if constraints.each() {
            format!(
                "{} with values [{}] do not all exist in {}.{}",
                args.property,
                args.value_text(),
                constraints.target().display_name(),
                constraints.column()
            )
        } else {
            format!(
                "{} with value \"{}\" does not exist in {}.{}",
                args.property,
                args.value_text(),
                constraints.target().display_name(),
                constraints.column()
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ExistsInValidator;
    use crate::db::registry::ConnectionRegistry;
    use crate::model::constraint::Constraints;
    use crate::validator::{ConstraintValidator, ValidationArguments};
    use std::sync::Arc;

    fn validator() -> ExistsInValidator {
        ExistsInValidator::new(Arc::new(ConnectionRegistry::new()))
    }

    #[test]
    fn missing_value_fails_without_touching_registry() {
        let args = ValidationArguments::new("Post", "author_id", None, Constraints::new("", ""));
        assert!(!validator().validate(None, &args).expect("should short-circuit"));
        assert!(!validator()
            .validate(Some(&crate::FieldValue::Null), &args)
            .expect("null should short-circuit"));
    }

    #[test]
    fn messages_cover_scalar_and_batch_forms() {
        let scalar = ValidationArguments::new(
            "Post",
            "author_id",
            Some(42.into()),
            Constraints::new("users", "id"),
        );
        assert_eq!(
            validator().default_message(&scalar),
            "author_id with value \"42\" does not exist in users.id"
        );

        let batch = ValidationArguments::new(
            "Post",
            "tags",
            Some("a,b".into()),
            Constraints::new("tags", "slug").with_each(true),
        );
        assert_eq!(
            validator().default_message(&batch),
            "tags with values [a,b] do not all exist in tags.slug"
        );
    }
}
