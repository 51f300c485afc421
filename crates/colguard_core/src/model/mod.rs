//! Value model shared by validators, the query core and store adapters.
//!
//! # Responsibility
//! - Describe what a validator checks against (`Target`, `Constraints`).
//! - Carry field values independently from any store client's value types.
//!
//! # Invariants
//! - Constraint tuples are immutable once built.
//! - Entity display names are never empty (`"entity"` fallback).

pub mod constraint;
pub mod target;
pub mod value;
