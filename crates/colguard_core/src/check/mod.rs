//! Column existence checks shared by the `existsIn` and `uniqueIn` validators.
//!
//! # Responsibility
//! - Validate the constraint tuple before any I/O.
//! - Resolve a ready connection and run the scalar query or the chunked batch queries.
//! - Translate store failures into the typed error taxonomy.
//!
//! # Invariants
//! - Registry errors propagate unchanged.
//! - A blank batch resolves to `Verdict::NONE` without a store round-trip.
//! - Store failures are wrapped exactly once.
//!
//! # Known limitation
//! Batch mode splits the value on commas, so a single candidate that itself
//! contains a comma cannot be expressed. Candidates in canonical integer form
//! (`7`, `-3`, not `007` or `+7`) bind as integers, everything else as text.

use crate::db::query::{COUNT_ALIAS, FOUND_ALIAS};
use crate::db::registry::ConnectionRegistry;
use crate::db::ConnectionHandle;
use crate::error::{BoxError, ThrownValue, ValidatorError, ValidatorResult};
use crate::logging::sanitize_message;
use crate::model::constraint::Constraints;
use crate::model::value::FieldValue;
use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;
use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;

const MAX_LOGGED_ERROR_CHARS: usize = 200;
/// Upper bound on IN-list bind values per query; larger batches are chunked.
pub const MAX_CANDIDATES_PER_QUERY: usize = 999;

static SCHEMA_MISMATCH_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)no metadata (for .+ )?(was )?found|does(n't| not) exist|no such (table|column)",
    )
    .expect("valid schema mismatch regex")
});

/// Outcome of one column check.
///
/// Scalar checks always report `any_exists == all_exists`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verdict {
    /// At least one candidate exists.
    pub any_exists: bool,
    /// Every candidate exists.
    pub all_exists: bool,
}

impl Verdict {
    pub const NONE: Self = Self {
        any_exists: false,
        all_exists: false,
    };

    pub fn single(exists: bool) -> Self {
        Self {
            any_exists: exists,
            all_exists: exists,
        }
    }
}

/// Fails with a configuration error when target or column is blank.
pub fn ensure_configured(
    validator: &str,
    property: &str,
    constraints: &Constraints,
) -> ValidatorResult<()> {
    if constraints.is_incomplete() {
        return Err(ValidatorError::incomplete_constraints(
            validator,
            property,
            constraints.describe(),
        ));
    }
    Ok(())
}

/// Splits a batch value on commas, trimming pieces and dropping empty ones.
pub fn batch_candidates(value: &FieldValue) -> Vec<String> {
    value
        .to_string()
        .split(',')
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
        .map(str::to_string)
        .collect()
}

/// Typed bind value for one batch candidate.
///
/// Only canonical integers become `Integer`, so text like `007` still
/// compares as text.
pub fn candidate_value(candidate: &str) -> FieldValue {
    match candidate.parse::<i64>() {
        Ok(number) if number.to_string() == candidate => FieldValue::Integer(number),
        _ => FieldValue::Text(candidate.to_string()),
    }
}

/// Checks `value` against the column described by `constraints`.
///
/// # Errors
/// - `Configuration` when the tuple is incomplete or the store rejects the
///   target/column as unknown.
/// - Registry errors from resolving the connection, unchanged.
/// - `QueryExecution` for every other store failure, including panics.
pub fn check_value(
    registry: &ConnectionRegistry,
    validator: &str,
    property: &str,
    value: &FieldValue,
    constraints: &Constraints,
) -> ValidatorResult<Verdict> {
    ensure_configured(validator, property, constraints)?;

    let handle = registry.resolve(constraints.connection())?;
    let started_at = Instant::now();

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        run_check(handle.as_ref(), value, constraints)
    }))
    .unwrap_or_else(|payload| Err(Box::new(ThrownValue::from_panic(payload)) as BoxError));

    match outcome {
        Ok(verdict) => {
            debug!(
                "event=column_check module=check status=ok validator={} entity={} column={} each={} any={} all={} duration_ms={}",
                validator,
                constraints.target().display_name(),
                constraints.column(),
                constraints.each(),
                verdict.any_exists,
                verdict.all_exists,
                started_at.elapsed().as_millis()
            );
            Ok(verdict)
        }
        Err(err) => Err(translate_error(err, validator, property, value, constraints)),
    }
}

fn run_check(
    handle: &dyn ConnectionHandle,
    value: &FieldValue,
    constraints: &Constraints,
) -> Result<Verdict, BoxError> {
    let accessor = handle.accessor(constraints.target())?;
    let column = constraints.column();

    if constraints.each() {
        let candidates = batch_candidates(value);
        if candidates.is_empty() {
            return Ok(Verdict::NONE);
        }

        let unique: BTreeSet<String> = candidates.into_iter().collect();
        let expected = unique.len();
        let values: Vec<FieldValue> = unique.iter().map(|piece| candidate_value(piece)).collect();

        // Chunks are disjoint, so their distinct counts add up.
        let mut found: i64 = 0;
        for chunk in values.chunks(MAX_CANDIDATES_PER_QUERY) {
            let query = accessor
                .select()
                .select_count_distinct(column, COUNT_ALIAS)
                .where_in(column, chunk.to_vec());
            found += accessor
                .fetch_one(&query)?
                .and_then(|row| row.get_i64(COUNT_ALIAS))
                .unwrap_or(0);
        }

        return Ok(Verdict {
            any_exists: found > 0,
            all_exists: usize::try_from(found).is_ok_and(|found| found == expected),
        });
    }

    let query = accessor
        .select()
        .select_literal(1, FOUND_ALIAS)
        .where_eq(column, value.clone())
        .limit(1);
    let exists = accessor.fetch_one(&query)?.is_some();
    Ok(Verdict::single(exists))
}

fn translate_error(
    err: BoxError,
    validator: &str,
    property: &str,
    value: &FieldValue,
    constraints: &Constraints,
) -> ValidatorError {
    let err = match err.downcast::<ValidatorError>() {
        Ok(typed) => return *typed,
        Err(other) => other,
    };

    let entity = constraints.target().display_name();
    let message = err.to_string();
    let logged = sanitize_message(&message, MAX_LOGGED_ERROR_CHARS);

    if SCHEMA_MISMATCH_RE.is_match(&message) {
        warn!(
            "event=column_check module=check status=error error_code=schema_mismatch validator={} entity={} column={} error={}",
            validator,
            entity,
            constraints.column(),
            logged
        );
        return ValidatorError::schema_mismatch(validator, property, entity, err);
    }

    warn!(
        "event=column_check module=check status=error error_code=query_failed validator={} entity={} column={} error={}",
        validator,
        entity,
        constraints.column(),
        logged
    );
    ValidatorError::query_execution(property, value.to_string(), entity, constraints.column(), err)
}
