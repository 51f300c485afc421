//! Named connection registry with lazy initialization.
//!
//! # Responsibility
//! - Map logical connection names onto caller-supplied handles.
//! - Initialize not-ready handles on first resolve.
//! - Offer one process-wide instance for callers that do not inject a registry.
//!
//! # Invariants
//! - Names are trimmed; blank or missing names map to `"default"`.
//! - Re-registering a name replaces the previous handle without closing it.
//! - A resolved handle always reports ready.

use crate::db::ConnectionHandle;
use crate::error::{ValidatorError, ValidatorResult};
use log::{debug, info, warn};
use once_cell::sync::Lazy;
use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Instant;

/// Name used when no connection name is supplied.
pub const DEFAULT_CONNECTION_NAME: &str = "default";

static GLOBAL_REGISTRY: Lazy<Arc<ConnectionRegistry>> =
    Lazy::new(|| Arc::new(ConnectionRegistry::new()));

/// Registry of connection handles keyed by normalized name.
#[derive(Default)]
pub struct ConnectionRegistry {
    handles: RwLock<BTreeMap<String, Arc<dyn ConnectionHandle>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handle` under `name`, replacing any previous handle.
    ///
    /// # Errors
    /// - `InvalidHandle` when the name contains control characters.
    pub fn register(
        &self,
        handle: Arc<dyn ConnectionHandle>,
        name: Option<&str>,
    ) -> ValidatorResult<()> {
        let name = normalize_connection_name(name);
        if name.chars().any(char::is_control) {
            return Err(ValidatorError::invalid_handle(format!(
                "connection name {name:?} contains control characters"
            )));
        }

        let replaced = self
            .handles
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.clone(), handle)
            .is_some();
        info!(
            "event=connection_register module=registry status=ok name={} replaced={}",
            name, replaced
        );
        Ok(())
    }

    /// Returns a ready handle for `name`, initializing it when needed.
    ///
    /// # Errors
    /// - `NotRegistered` when no handle exists for the resolved name.
    /// - The handle's own `initialize` error, surfaced without reclassification.
    /// - `Initialization` when `initialize` returns but the handle is still not ready.
    pub fn resolve(&self, name: Option<&str>) -> ValidatorResult<Arc<dyn ConnectionHandle>> {
        let name = normalize_connection_name(name);
        let handle = self
            .handles
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name.as_str())
            .cloned()
            .ok_or_else(|| ValidatorError::not_registered(name.as_str()))?;

        if handle.is_ready() {
            return Ok(handle);
        }

        let started_at = Instant::now();
        if let Err(err) = handle.initialize() {
            warn!(
                "event=connection_init module=registry status=error name={} duration_ms={} error={}",
                name,
                started_at.elapsed().as_millis(),
                err
            );
            return Err(ValidatorError::from_initialize(err));
        }

        if !handle.is_ready() {
            warn!(
                "event=connection_init module=registry status=error name={} error_code=still_not_ready",
                name
            );
            return Err(ValidatorError::initialization(name));
        }

        debug!(
            "event=connection_init module=registry status=ok name={} duration_ms={}",
            name,
            started_at.elapsed().as_millis()
        );
        Ok(handle)
    }

    /// Removes every registration. Handles are dropped, never closed.
    pub fn clear(&self) {
        self.handles
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        debug!("event=connection_clear module=registry status=ok");
    }

    pub fn contains(&self, name: Option<&str>) -> bool {
        self.handles
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(normalize_connection_name(name).as_str())
    }

    /// Returns registered names in sorted order.
    pub fn names(&self) -> Vec<String> {
        self.handles
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.handles
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Trims `name` and maps missing or blank input to `"default"`.
pub fn normalize_connection_name(name: Option<&str>) -> String {
    match name.map(str::trim) {
        Some(trimmed) if !trimmed.is_empty() => trimmed.to_string(),
        _ => DEFAULT_CONNECTION_NAME.to_string(),
    }
}

/// Process-wide registry shared by validators built with `Default`.
pub fn global_registry() -> Arc<ConnectionRegistry> {
    Arc::clone(&GLOBAL_REGISTRY)
}

/// Registers `handle` in the process-wide registry.
pub fn register_connection(
    handle: Arc<dyn ConnectionHandle>,
    name: Option<&str>,
) -> ValidatorResult<()> {
    GLOBAL_REGISTRY.register(handle, name)
}

/// Resolves a ready handle from the process-wide registry.
pub fn resolve_connection(name: Option<&str>) -> ValidatorResult<Arc<dyn ConnectionHandle>> {
    GLOBAL_REGISTRY.resolve(name)
}

/// Empties the process-wide registry. Used for test isolation and reset.
pub fn clear_connections() {
    GLOBAL_REGISTRY.clear();
}
