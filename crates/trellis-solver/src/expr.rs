//! Linear expression building blocks.
//!
//! A [`Term`] is a coefficient applied to a variable and an [`Expression`]
//! is a sum of terms plus a constant. The arithmetic operators below let
//! callers write constraints the way they would on paper:
//!
//! ```
//! use trellis_solver::{EntityId, Property, Variable};
//!
//! let left = Variable::new(EntityId::from_raw(1), Property::Left);
//! let width = Variable::new(EntityId::from_raw(1), Property::Width);
//! let right = left + width; // an Expression
//! let padded = 2.0 * width + 16.0;
//! assert_eq!(right.terms.len(), 2);
//! assert_eq!(padded.constant, 16.0);
//! ```
//!
//! Constant-only contributions fold straight into `constant`; an
//! expression never stores a term without a variable.

use std::fmt;
use std::ops::{Add, Div, Mul, Neg, Sub};

use crate::variable::Variable;

/// A coefficient applied to a variable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Term {
    pub variable: Variable,
    pub coefficient: f64,
}

impl Term {
    #[must_use]
    pub fn new(variable: Variable, coefficient: f64) -> Self {
        Self { variable, coefficient }
    }
}

/// A linear combination of variables plus a constant.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Expression {
    pub terms: Vec<Term>,
    pub constant: f64,
}

impl Expression {
    #[must_use]
    pub fn new(terms: Vec<Term>, constant: f64) -> Self {
        Self { terms, constant }
    }

    #[must_use]
    pub fn from_constant(constant: f64) -> Self {
        Self { terms: Vec::new(), constant }
    }

    #[must_use]
    pub fn from_term(term: Term) -> Self {
        Self { terms: vec![term], constant: 0.0 }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.coefficient == 1.0 {
            write!(f, "{}", self.variable)
        } else if self.coefficient == -1.0 {
            write!(f, "-{}", self.variable)
        } else {
            write!(f, "{}*{}", self.coefficient, self.variable)
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.terms.is_empty() {
            return write!(f, "{}", self.constant);
        }
        for (i, term) in self.terms.iter().enumerate() {
            if i > 0 {
                f.write_str(" + ")?;
            }
            write!(f, "{term}")?;
        }
        if self.constant != 0.0 {
            write!(f, " + {}", self.constant)?;
        }
        Ok(())
    }
}

impl From<f64> for Expression {
    fn from(constant: f64) -> Self {
        Expression::from_constant(constant)
    }
}

impl From<Variable> for Term {
    fn from(variable: Variable) -> Self {
        Term::new(variable, 1.0)
    }
}

impl From<Variable> for Expression {
    fn from(variable: Variable) -> Self {
        Expression::from_term(variable.into())
    }
}

impl From<Term> for Expression {
    fn from(term: Term) -> Self {
        Expression::from_term(term)
    }
}

// ============================================================================
// Scaling and negation
// ============================================================================

impl Mul<f64> for Variable {
    type Output = Term;
    fn mul(self, rhs: f64) -> Term {
        Term::new(self, rhs)
    }
}

impl Mul<Variable> for f64 {
    type Output = Term;
    fn mul(self, rhs: Variable) -> Term {
        Term::new(rhs, self)
    }
}

impl Div<f64> for Variable {
    type Output = Term;
    fn div(self, rhs: f64) -> Term {
        Term::new(self, 1.0 / rhs)
    }
}

impl Neg for Variable {
    type Output = Term;
    fn neg(self) -> Term {
        Term::new(self, -1.0)
    }
}

impl Mul<f64> for Term {
    type Output = Term;
    fn mul(self, rhs: f64) -> Term {
        Term::new(self.variable, self.coefficient * rhs)
    }
}

impl Mul<Term> for f64 {
    type Output = Term;
    fn mul(self, rhs: Term) -> Term {
        rhs * self
    }
}

impl Div<f64> for Term {
    type Output = Term;
    fn div(self, rhs: f64) -> Term {
        Term::new(self.variable, self.coefficient / rhs)
    }
}

impl Neg for Term {
    type Output = Term;
    fn neg(self) -> Term {
        Term::new(self.variable, -self.coefficient)
    }
}

impl Mul<f64> for Expression {
    type Output = Expression;
    fn mul(mut self, rhs: f64) -> Expression {
        self.constant *= rhs;
        for term in &mut self.terms {
            term.coefficient *= rhs;
        }
        self
    }
}

impl Mul<Expression> for f64 {
    type Output = Expression;
    fn mul(self, rhs: Expression) -> Expression {
        rhs * self
    }
}

impl Div<f64> for Expression {
    type Output = Expression;
    fn div(self, rhs: f64) -> Expression {
        self * (1.0 / rhs)
    }
}

impl Neg for Expression {
    type Output = Expression;
    fn neg(self) -> Expression {
        self * -1.0
    }
}

// ============================================================================
// Addition
// ============================================================================

impl Add for Expression {
    type Output = Expression;
    fn add(mut self, rhs: Expression) -> Expression {
        self.constant += rhs.constant;
        self.terms.extend(rhs.terms);
        self
    }
}

impl Add<Term> for Expression {
    type Output = Expression;
    fn add(mut self, rhs: Term) -> Expression {
        self.terms.push(rhs);
        self
    }
}

impl Add<Variable> for Expression {
    type Output = Expression;
    fn add(self, rhs: Variable) -> Expression {
        self + Term::from(rhs)
    }
}

impl Add<f64> for Expression {
    type Output = Expression;
    fn add(mut self, rhs: f64) -> Expression {
        self.constant += rhs;
        self
    }
}

impl Add<Expression> for Term {
    type Output = Expression;
    fn add(self, mut rhs: Expression) -> Expression {
        rhs.terms.insert(0, self);
        rhs
    }
}

impl Add for Term {
    type Output = Expression;
    fn add(self, rhs: Term) -> Expression {
        Expression::new(vec![self, rhs], 0.0)
    }
}

impl Add<Variable> for Term {
    type Output = Expression;
    fn add(self, rhs: Variable) -> Expression {
        self + Term::from(rhs)
    }
}

impl Add<f64> for Term {
    type Output = Expression;
    fn add(self, rhs: f64) -> Expression {
        Expression::new(vec![self], rhs)
    }
}

impl Add<Expression> for Variable {
    type Output = Expression;
    fn add(self, rhs: Expression) -> Expression {
        Term::from(self) + rhs
    }
}

impl Add<Term> for Variable {
    type Output = Expression;
    fn add(self, rhs: Term) -> Expression {
        Term::from(self) + rhs
    }
}

impl Add for Variable {
    type Output = Expression;
    fn add(self, rhs: Variable) -> Expression {
        Term::from(self) + Term::from(rhs)
    }
}

impl Add<f64> for Variable {
    type Output = Expression;
    fn add(self, rhs: f64) -> Expression {
        Term::from(self) + rhs
    }
}

impl Add<Expression> for f64 {
    type Output = Expression;
    fn add(self, rhs: Expression) -> Expression {
        rhs + self
    }
}

impl Add<Term> for f64 {
    type Output = Expression;
    fn add(self, rhs: Term) -> Expression {
        rhs + self
    }
}

impl Add<Variable> for f64 {
    type Output = Expression;
    fn add(self, rhs: Variable) -> Expression {
        rhs + self
    }
}

// ============================================================================
// Subtraction, via negation of the right-hand side
// ============================================================================

impl Sub for Expression {
    type Output = Expression;
    fn sub(self, rhs: Expression) -> Expression {
        self + -rhs
    }
}

impl Sub<Term> for Expression {
    type Output = Expression;
    fn sub(self, rhs: Term) -> Expression {
        self + -rhs
    }
}

impl Sub<Variable> for Expression {
    type Output = Expression;
    fn sub(self, rhs: Variable) -> Expression {
        self + -rhs
    }
}

impl Sub<f64> for Expression {
    type Output = Expression;
    fn sub(self, rhs: f64) -> Expression {
        self + -rhs
    }
}

impl Sub<Expression> for Term {
    type Output = Expression;
    fn sub(self, rhs: Expression) -> Expression {
        self + -rhs
    }
}

impl Sub for Term {
    type Output = Expression;
    fn sub(self, rhs: Term) -> Expression {
        self + -rhs
    }
}

impl Sub<Variable> for Term {
    type Output = Expression;
    fn sub(self, rhs: Variable) -> Expression {
        self + -rhs
    }
}

impl Sub<f64> for Term {
    type Output = Expression;
    fn sub(self, rhs: f64) -> Expression {
        self + -rhs
    }
}

impl Sub<Expression> for Variable {
    type Output = Expression;
    fn sub(self, rhs: Expression) -> Expression {
        Term::from(self) + -rhs
    }
}

impl Sub<Term> for Variable {
    type Output = Expression;
    fn sub(self, rhs: Term) -> Expression {
        Term::from(self) + -rhs
    }
}

impl Sub for Variable {
    type Output = Expression;
    fn sub(self, rhs: Variable) -> Expression {
        Term::from(self) + -rhs
    }
}

impl Sub<f64> for Variable {
    type Output = Expression;
    fn sub(self, rhs: f64) -> Expression {
        Term::from(self) + -rhs
    }
}

impl Sub<Expression> for f64 {
    type Output = Expression;
    fn sub(self, rhs: Expression) -> Expression {
        self + -rhs
    }
}

impl Sub<Term> for f64 {
    type Output = Expression;
    fn sub(self, rhs: Term) -> Expression {
        self + -rhs
    }
}

impl Sub<Variable> for f64 {
    type Output = Expression;
    fn sub(self, rhs: Variable) -> Expression {
        self + -rhs
    }
}
