//! Constraints over linear expressions.
//!
//! A [`Constraint`] states that an expression relates to zero, at some
//! strength. The payload is shared behind an `Arc` and identity is the
//! allocation, not the contents: two constraints built from identical
//! expressions are still distinct, so the same rule can be added twice as
//! two separate constraints, and cloning a handle refers to the same one.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::expr::Expression;
use crate::strength;

/// How a constraint's expression relates to zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Relation {
    LessOrEqual,
    Equal,
    GreaterOrEqual,
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Relation::LessOrEqual => "<=",
            Relation::Equal => "==",
            Relation::GreaterOrEqual => ">=",
        })
    }
}

#[derive(Debug)]
struct ConstraintData {
    expression: Expression,
    relation: Relation,
    strength: f64,
}

/// A shared handle to one constraint.
///
/// Cheap to clone; equality and hashing follow the underlying allocation.
#[derive(Debug, Clone)]
pub struct Constraint(Arc<ConstraintData>);

impl Constraint {
    /// Build a constraint stating `expression relation 0`.
    ///
    /// The strength is clipped onto the legal range, so a stored strength
    /// is always within `[0, REQUIRED]`.
    #[must_use]
    pub fn new(expression: impl Into<Expression>, relation: Relation, strength: f64) -> Self {
        Self(Arc::new(ConstraintData {
            expression: expression.into(),
            relation,
            strength: strength::clip(strength),
        }))
    }

    #[must_use]
    pub fn expression(&self) -> &Expression {
        &self.0.expression
    }

    #[must_use]
    pub fn relation(&self) -> Relation {
        self.0.relation
    }

    #[must_use]
    pub fn strength(&self) -> f64 {
        self.0.strength
    }
}

impl PartialEq for Constraint {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Constraint {}

impl Hash for Constraint {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_usize(Arc::as_ptr(&self.0) as usize);
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} 0 ", self.0.expression, self.0.relation)?;
        if self.0.strength == strength::REQUIRED {
            f.write_str("[required]")
        } else if self.0.strength == strength::STRONG {
            f.write_str("[strong]")
        } else if self.0.strength == strength::MEDIUM {
            f.write_str("[medium]")
        } else if self.0.strength == strength::WEAK {
            f.write_str("[weak]")
        } else {
            write!(f, "[{}]", self.0.strength)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variable::{EntityId, Property, Variable};

    fn width() -> Variable {
        Variable::new(EntityId::from_raw(1), Property::Width)
    }

    #[test]
    fn identity_is_the_allocation() {
        let a = Constraint::new(width() - 10.0, Relation::Equal, strength::REQUIRED);
        let b = Constraint::new(width() - 10.0, Relation::Equal, strength::REQUIRED);
        let a2 = a.clone();
        assert_ne!(a, b, "identical contents are still two constraints");
        assert_eq!(a, a2, "clones share identity");
    }

    #[test]
    fn hashing_follows_identity() {
        use std::collections::HashSet;
        let a = Constraint::new(width() - 10.0, Relation::Equal, strength::STRONG);
        let b = Constraint::new(width() - 10.0, Relation::Equal, strength::STRONG);
        let mut set = HashSet::new();
        set.insert(a.clone());
        assert!(set.contains(&a));
        assert!(set.contains(&a.clone()));
        assert!(!set.contains(&b));
    }

    #[test]
    fn strength_is_clipped_on_construction() {
        let c = Constraint::new(width(), Relation::GreaterOrEqual, strength::REQUIRED * 7.0);
        assert_eq!(c.strength(), strength::REQUIRED);
        let d = Constraint::new(width(), Relation::GreaterOrEqual, -1.0);
        assert_eq!(d.strength(), 0.0);
    }

    #[test]
    fn display_names_the_band() {
        let c = Constraint::new(width() - 10.0, Relation::LessOrEqual, strength::WEAK);
        assert_eq!(c.to_string(), "E1.width + -10 <= 0 [weak]");
    }
}
