//! Declarative `exists_in` / `unique_in` rules and a minimal host to run them.
//!
//! # Responsibility
//! - Capture `(target, column, connection, each)` once at declaration time.
//! - Hand constraint registrations to whatever pipeline hosts the validators.
//!
//! # Invariants
//! - A rule's constraint tuple never changes after construction.
//! - Thrown validator errors abort `RuleSet::validate`; `false` verdicts do not.

use crate::db::registry::ConnectionRegistry;
use crate::error::ValidatorResult;
use crate::model::constraint::{Constraints, ValidationOptions};
use crate::model::target::Target;
use crate::model::value::FieldValue;
use crate::validator::{
    ConstraintValidator, ExistsInValidator, UniqueInValidator, ValidationArguments,
};
use log::debug;
use std::collections::BTreeMap;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

/// Property values of one object under validation.
pub type Record = BTreeMap<String, FieldValue>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RuleKind {
    ExistsIn,
    UniqueIn,
}

impl RuleKind {
    fn validator(self, registry: Option<Arc<ConnectionRegistry>>) -> Arc<dyn ConstraintValidator> {
        match (self, registry) {
            (Self::ExistsIn, Some(registry)) => Arc::new(ExistsInValidator::new(registry)),
            (Self::ExistsIn, None) => Arc::new(ExistsInValidator::default()),
            (Self::UniqueIn, Some(registry)) => Arc::new(UniqueInValidator::new(registry)),
            (Self::UniqueIn, None) => Arc::new(UniqueInValidator::default()),
        }
    }
}

/// One constraint attached to one property of one type.
#[derive(Clone)]
pub struct ConstraintRegistration {
    pub name: &'static str,
    pub target_class: String,
    pub property: String,
    pub options: ValidationOptions,
    pub constraints: Constraints,
    pub validator: Arc<dyn ConstraintValidator>,
}

impl Debug for ConstraintRegistration {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConstraintRegistration")
            .field("name", &self.name)
            .field("target_class", &self.target_class)
            .field("property", &self.property)
            .field("options", &self.options)
            .field("constraints", &self.constraints)
            .finish_non_exhaustive()
    }
}

/// Capability of a validation pipeline to accept constraint registrations.
pub trait ConstraintRegistrar {
    fn register_constraint(&mut self, registration: ConstraintRegistration);
}

/// Rule produced by `exists_in` / `unique_in`, ready to attach to a property.
#[derive(Clone)]
pub struct PropertyRule {
    kind: RuleKind,
    constraints: Constraints,
    options: ValidationOptions,
    validator: Arc<dyn ConstraintValidator>,
}

impl PropertyRule {
    fn new(
        kind: RuleKind,
        target: Target,
        column: String,
        connection: Option<&str>,
        options: ValidationOptions,
    ) -> Self {
        let constraints = Constraints::new(target, column)
            .with_connection(connection)
            .with_each(options.each);
        Self {
            kind,
            constraints,
            options,
            validator: kind.validator(None),
        }
    }

    /// Binds the rule to `registry` instead of the process-wide one.
    pub fn using_registry(mut self, registry: Arc<ConnectionRegistry>) -> Self {
        self.validator = self.kind.validator(Some(registry));
        self
    }

    pub fn name(&self) -> &'static str {
        self.validator.name()
    }

    pub fn constraints(&self) -> &Constraints {
        &self.constraints
    }

    pub fn options(&self) -> &ValidationOptions {
        &self.options
    }

    /// Registers this rule for `property` of `target_class`.
    pub fn apply(
        &self,
        target_class: &str,
        property: &str,
        registrar: &mut dyn ConstraintRegistrar,
    ) {
        registrar.register_constraint(ConstraintRegistration {
            name: self.name(),
            target_class: target_class.to_string(),
            property: property.to_string(),
            options: self.options.clone(),
            constraints: self.constraints.clone(),
            validator: Arc::clone(&self.validator),
        });
    }
}

/// Rule requiring the value to exist in `target.column`.
pub fn exists_in(
    target: impl Into<Target>,
    column: impl Into<String>,
    connection: Option<&str>,
    options: ValidationOptions,
) -> PropertyRule {
    PropertyRule::new(RuleKind::ExistsIn, target.into(), column.into(), connection, options)
}

/// Rule requiring the value to be absent from `target.column`.
pub fn unique_in(
    target: impl Into<Target>,
    column: impl Into<String>,
    connection: Option<&str>,
    options: ValidationOptions,
) -> PropertyRule {
    PropertyRule::new(RuleKind::UniqueIn, target.into(), column.into(), connection, options)
}

/// One failed (returned `false`) constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationFailure {
    pub property: String,
    pub constraint: &'static str,
    pub message: String,
}

/// In-process registrar that replays registrations against records.
#[derive(Debug, Default)]
pub struct RuleSet {
    registrations: Vec<ConstraintRegistration>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn registrations(&self) -> &[ConstraintRegistration] {
        &self.registrations
    }

    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    /// Runs every registration for `target_class` against `record`.
    ///
    /// Absent properties are passed to validators as `None`.
    ///
    /// # Errors
    /// - The first validator error; remaining registrations are skipped.
    pub fn validate(
        &self,
        target_class: &str,
        record: &Record,
    ) -> ValidatorResult<Vec<ValidationFailure>> {
        let mut failures = Vec::new();
        for registration in self
            .registrations
            .iter()
            .filter(|registration| registration.target_class == target_class)
        {
            let value = record.get(registration.property.as_str());
            let args = ValidationArguments::new(
                target_class,
                registration.property.as_str(),
                value.cloned(),
                registration.constraints.clone(),
            );
            if registration.validator.validate(value, &args)? {
                continue;
            }

            let message = registration
                .options
                .message
                .clone()
                .unwrap_or_else(|| registration.validator.default_message(&args));
            failures.push(ValidationFailure {
                property: registration.property.clone(),
                constraint: registration.name,
                message,
            });
        }

        debug!(
            "event=rule_set_validate module=rule status=ok target={} failures={}",
            target_class,
            failures.len()
        );
        Ok(failures)
    }
}

impl ConstraintRegistrar for RuleSet {
    fn register_constraint(&mut self, registration: ConstraintRegistration) {
        self.registrations.push(registration);
    }
}

#[cfg(test)]
mod tests {
    use super::{exists_in, unique_in, RuleSet};
    use crate::model::constraint::ValidationOptions;
    use crate::validator::exists_in::EXISTS_IN;
    use crate::validator::unique_in::UNIQUE_IN;

    #[test]
    fn factories_capture_constraint_tuple() {
        let rule = exists_in("tags", "slug", Some("catalog"), ValidationOptions::each());
        assert_eq!(rule.name(), EXISTS_IN);
        assert_eq!(rule.constraints().target().table(), "tags");
        assert_eq!(rule.constraints().column(), "slug");
        assert_eq!(rule.constraints().connection(), Some("catalog"));
        assert!(rule.constraints().each());

        let rule = unique_in("users", "email", None, ValidationOptions::default());
        assert_eq!(rule.name(), UNIQUE_IN);
        assert_eq!(rule.constraints().connection(), None);
        assert!(!rule.constraints().each());
    }

    #[test]
    fn apply_registers_with_target_and_property() {
        let mut rules = RuleSet::new();
        unique_in("users", "email", None, ValidationOptions::default())
            .apply("SignUp", "email", &mut rules);

        assert_eq!(rules.len(), 1);
        let registration = &rules.registrations()[0];
        assert_eq!(registration.name, UNIQUE_IN);
        assert_eq!(registration.target_class, "SignUp");
        assert_eq!(registration.property, "email");
    }
}
