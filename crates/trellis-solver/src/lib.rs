//! Incremental linear constraint solving for Trellis layout.
//!
//! This crate keeps a Cassowary-style simplex tableau alive across frames
//! so that layout edits cost pivots proportional to what changed, not to
//! the size of the scene. Constraints relate entity properties through
//! linear expressions at four strength bands; required constraints must
//! hold exactly and weaker ones are satisfied as nearly as the weighted
//! error objective allows.
//!
//! Interactive edits go through edit variables: register a variable once
//! with [`Solver::add_edit_variable`], then feed it values with
//! [`Solver::suggest_value`]. Suggestions only shift row constants; the
//! pivoting debt they accumulate is repaid by
//! [`Solver::flush_updates`], which restores feasibility and reports
//! exactly the variables whose resolved values changed. Nothing is
//! published between flushes, so a frame sees one consistent snapshot.
//!
//! Pivot selection breaks every tie toward the lowest symbol, so solving
//! the same system twice produces the same tableau and the same values.
//!
//! ```
//! use trellis_solver::{Constraint, EntityId, Property, Relation, Solver, Variable, strength};
//!
//! let container = EntityId::from_raw(0);
//! let item = EntityId::from_raw(1);
//! let total = Variable::new(container, Property::Width);
//! let width = Variable::new(item, Property::Width);
//!
//! let mut solver = Solver::new();
//! solver.add_constraint(Constraint::new(
//!     width - 0.5 * total,
//!     Relation::Equal,
//!     strength::REQUIRED,
//! ))?;
//! solver.add_edit_variable(total, strength::STRONG)?;
//! solver.suggest_value(total, 640.0)?;
//!
//! let updates = solver.flush_updates()?;
//! assert_eq!(updates.get(width), Some(320.0));
//! # Ok::<(), trellis_solver::SolveError>(())
//! ```

#![forbid(unsafe_code)]

pub mod constraint;
pub mod expr;
mod row;
pub mod solver;
pub mod strength;
mod symbol;
pub mod variable;

pub use constraint::{Constraint, Relation};
pub use expr::{Expression, Term};
pub use solver::{FlushResult, SolveError, SolveStats, Solver};
pub use variable::{EntityId, Property, Variable};
