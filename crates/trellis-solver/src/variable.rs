//! Caller-facing layout variables.
//!
//! A [`Variable`] names one property of one scene entity, for example
//! "the width of entity 7". Identity is the `(entity, property)` pair;
//! two values built from the same pair are the same variable everywhere
//! in the solver, with no interning or registration step. The `proxy`
//! flag rides along for callers that mirror another entity's geometry,
//! and is deliberately excluded from identity.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Identifier of a scene entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityId(u64);

impl EntityId {
    #[must_use]
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    #[must_use]
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{}", self.0)
    }
}

/// The geometric property of an entity a variable refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Property {
    Left,
    Right,
    Top,
    Bottom,
    Width,
    Height,
    CenterX,
    CenterY,
}

impl Property {
    fn label(self) -> &'static str {
        match self {
            Property::Left => "left",
            Property::Right => "right",
            Property::Top => "top",
            Property::Bottom => "bottom",
            Property::Width => "width",
            Property::Height => "height",
            Property::CenterX => "center_x",
            Property::CenterY => "center_y",
        }
    }
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One solvable property of one entity.
#[derive(Debug, Clone, Copy)]
pub struct Variable {
    entity: EntityId,
    property: Property,
    proxy: bool,
}

impl Variable {
    #[must_use]
    pub fn new(entity: EntityId, property: Property) -> Self {
        Self { entity, property, proxy: false }
    }

    /// A variable that mirrors geometry owned by another entity.
    /// Proxies compare equal to the plain variable for the same pair.
    #[must_use]
    pub fn proxy(entity: EntityId, property: Property) -> Self {
        Self { entity, property, proxy: true }
    }

    #[must_use]
    pub fn entity(self) -> EntityId {
        self.entity
    }

    #[must_use]
    pub fn property(self) -> Property {
        self.property
    }

    #[must_use]
    pub fn is_proxy(self) -> bool {
        self.proxy
    }
}

// Identity is (entity, property) only. The proxy flag never participates.

impl PartialEq for Variable {
    fn eq(&self, other: &Self) -> bool {
        self.entity == other.entity && self.property == other.property
    }
}

impl Eq for Variable {}

impl Hash for Variable {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.entity.hash(state);
        self.property.hash(state);
    }
}

impl PartialOrd for Variable {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Variable {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.entity, self.property).cmp(&(other.entity, other.property))
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.proxy {
            write!(f, "~{}.{}", self.entity, self.property)
        } else {
            write!(f, "{}.{}", self.entity, self.property)
        }
    }
}
