//! Check targets: a plain table name or a typed entity descriptor.

use std::any::type_name;
use std::fmt::{Display, Formatter};

/// Display name used when an entity descriptor has no usable name.
pub const FALLBACK_ENTITY_NAME: &str = "entity";

/// Typed entity mapped onto one table.
///
/// Implemented by application record types so validators can be declared
/// against the type instead of a table string.
pub trait Entity {
    const TABLE: &'static str;
}

/// Descriptor of a typed entity: display name plus backing table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityRef {
    name: String,
    table: String,
}

impl EntityRef {
    pub fn new(name: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table: table.into(),
        }
    }

    /// Builds a descriptor for `E`, deriving the name from its type path.
    pub fn of<E: Entity>() -> Self {
        Self::new(short_type_name(type_name::<E>()), E::TABLE)
    }

    /// Name shown in messages; falls back to `"entity"` when blank.
    pub fn display_name(&self) -> &str {
        let trimmed = self.name.trim();
        if trimmed.is_empty() {
            FALLBACK_ENTITY_NAME
        } else {
            trimmed
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }
}

/// What a column check runs against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Table(String),
    Entity(EntityRef),
}

impl Target {
    /// Shorthand for `Target::Entity(EntityRef::of::<E>())`.
    pub fn entity<E: Entity>() -> Self {
        Self::Entity(EntityRef::of::<E>())
    }

    pub fn display_name(&self) -> &str {
        match self {
            Self::Table(name) => name.as_str(),
            Self::Entity(entity) => entity.display_name(),
        }
    }

    /// Table that store adapters should query.
    pub fn table(&self) -> &str {
        match self {
            Self::Table(name) => name.as_str(),
            Self::Entity(entity) => entity.table(),
        }
    }

    /// A target is missing when it is an empty table name.
    pub fn is_missing(&self) -> bool {
        match self {
            Self::Table(name) => name.is_empty(),
            Self::Entity(_) => false,
        }
    }
}

impl Display for Target {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

impl From<&str> for Target {
    fn from(value: &str) -> Self {
        Self::Table(value.to_string())
    }
}

impl From<String> for Target {
    fn from(value: String) -> Self {
        Self::Table(value)
    }
}

impl From<EntityRef> for Target {
    fn from(value: EntityRef) -> Self {
        Self::Entity(value)
    }
}

fn short_type_name(path: &str) -> &str {
    let without_generics = path.split('<').next().unwrap_or(path);
    without_generics
        .rsplit("::")
        .next()
        .unwrap_or(without_generics)
}
