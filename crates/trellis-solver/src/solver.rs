//! The incremental constraint solver.
//!
//! [`Solver`] keeps a simplex tableau in solved form across edits. Adding
//! or removing a constraint compiles it into a row, patches the tableau,
//! and re-optimizes the weighted error objective. Edit variables move
//! through cheap constant shifts instead of recompilation, and a batch of
//! suggestions becomes visible in one step through [`Solver::flush_updates`],
//! which restores feasibility with a dual optimization pass and then
//! reports every variable whose resolved value changed.
//!
//! # Key Invariant
//!
//! Between operations the tableau is always in solved form: each row is
//! keyed by its basic symbol and no basic symbol appears inside any row's
//! cells or the objective. Rows queued in the infeasible list may carry a
//! negative constant until the next dual pass; nothing is published while
//! they do.
//!
//! # Usage
//!
//! ```ignore
//! let mut solver = Solver::new();
//! solver.add_constraint(Constraint::new(
//!     width - 200.0,
//!     Relation::Equal,
//!     strength::REQUIRED,
//! ))?;
//! solver.add_edit_variable(width, strength::STRONG)?;
//! solver.suggest_value(width, 320.0)?;
//! for (variable, value) in solver.flush_updates()? {
//!     scene.apply(variable, value);
//! }
//! ```

use std::fmt;
use std::mem;

use rustc_hash::FxHashMap;

use crate::constraint::{Constraint, Relation};
use crate::expr::{Expression, Term};
use crate::row::{EPSILON, Row, near_zero};
use crate::strength;
use crate::symbol::{Symbol, SymbolKind, Tag};
use crate::variable::Variable;

// ============================================================================
// Errors
// ============================================================================

/// Everything that can go wrong while editing the constraint system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveError {
    /// Reserved for operations the solver does not support.
    Unimplemented,
    /// The exact constraint object is already in the solver.
    DuplicateConstraint,
    /// The constraint cannot hold at required strength together with the
    /// required constraints already present.
    UnsatisfiableConstraint,
    /// The constraint was never added, or was already removed.
    UnknownConstraint,
    /// The variable is already registered for editing.
    DuplicateEditVariable,
    /// Edit variables must stay below required strength.
    BadRequiredStrength,
    /// The variable is not registered for editing.
    UnknownEditVariable,
    /// An internal invariant failed; the solver can no longer be trusted.
    InternalSolverError(&'static str),
}

impl fmt::Display for SolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolveError::Unimplemented => f.write_str("operation is not implemented"),
            SolveError::DuplicateConstraint => {
                f.write_str("constraint is already present in the solver")
            }
            SolveError::UnsatisfiableConstraint => {
                f.write_str("constraint cannot be satisfied at required strength")
            }
            SolveError::UnknownConstraint => {
                f.write_str("constraint is not present in the solver")
            }
            SolveError::DuplicateEditVariable => {
                f.write_str("variable is already registered for editing")
            }
            SolveError::BadRequiredStrength => {
                f.write_str("edit variables may not use the required strength")
            }
            SolveError::UnknownEditVariable => {
                f.write_str("variable is not registered for editing")
            }
            SolveError::InternalSolverError(detail) => {
                write!(f, "internal solver error: {detail}")
            }
        }
    }
}

impl std::error::Error for SolveError {}

// ============================================================================
// Bookkeeping records
// ============================================================================

/// Per-variable tableau state.
#[derive(Debug)]
struct VarData {
    /// Value reported by the last flush. Starts as NaN so the first flush
    /// always publishes.
    value: f64,
    symbol: Symbol,
    /// Number of live constraint terms referring to this variable.
    refs: usize,
}

/// Per-edit-variable state.
#[derive(Debug)]
struct EditInfo {
    tag: Tag,
    constraint: Constraint,
    /// The most recently suggested value; deltas are computed against it.
    constant: f64,
}

/// Counters describing the work the solver has done.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SolveStats {
    pub constraints_added: u64,
    pub constraints_removed: u64,
    pub primal_pivots: u64,
    pub dual_pivots: u64,
    pub suggestions: u64,
    pub flushes: u64,
}

/// The set of variables whose resolved values changed in one flush.
///
/// Entries are sorted by variable, so the application order is
/// deterministic.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlushResult {
    changes: Vec<(Variable, f64)>,
}

impl FlushResult {
    #[must_use]
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[(Variable, f64)] {
        &self.changes
    }

    pub fn iter(&self) -> std::slice::Iter<'_, (Variable, f64)> {
        self.changes.iter()
    }

    /// The new value for `variable`, if it changed in this flush.
    #[must_use]
    pub fn get(&self, variable: Variable) -> Option<f64> {
        self.changes
            .binary_search_by(|probe| probe.0.cmp(&variable))
            .ok()
            .map(|index| self.changes[index].1)
    }
}

impl IntoIterator for FlushResult {
    type Item = (Variable, f64);
    type IntoIter = std::vec::IntoIter<(Variable, f64)>;

    fn into_iter(self) -> Self::IntoIter {
        self.changes.into_iter()
    }
}

impl<'a> IntoIterator for &'a FlushResult {
    type Item = &'a (Variable, f64);
    type IntoIter = std::slice::Iter<'a, (Variable, f64)>;

    fn into_iter(self) -> Self::IntoIter {
        self.changes.iter()
    }
}

// ============================================================================
// Solver
// ============================================================================

pub struct Solver {
    constraints: FxHashMap<Constraint, Tag>,
    var_data: FxHashMap<Variable, VarData>,
    var_for_symbol: FxHashMap<Symbol, Variable>,
    rows: FxHashMap<Symbol, Row>,
    edits: FxHashMap<Variable, EditInfo>,
    /// Basic symbols whose rows went negative and await the next dual pass.
    infeasible_rows: Vec<Symbol>,
    objective: Row,
    id_tick: u64,
    stats: SolveStats,
    /// When set, every mutation re-verifies the tableau invariants.
    paranoid: bool,
}

impl Solver {
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Pre-size the internal tables for roughly `constraints` constraints.
    #[must_use]
    pub fn with_capacity(constraints: usize) -> Self {
        Self {
            constraints: FxHashMap::with_capacity_and_hasher(constraints, Default::default()),
            var_data: FxHashMap::with_capacity_and_hasher(constraints, Default::default()),
            var_for_symbol: FxHashMap::with_capacity_and_hasher(constraints, Default::default()),
            rows: FxHashMap::with_capacity_and_hasher(constraints, Default::default()),
            edits: FxHashMap::default(),
            infeasible_rows: Vec::new(),
            objective: Row::default(),
            id_tick: 1,
            stats: SolveStats::default(),
            paranoid: false,
        }
    }

    /// Build a solver configured from the environment.
    ///
    /// `TRELLIS_PARANOID_SOLVER=1|true|yes` enables invariant checking
    /// after every mutation.
    #[must_use]
    pub fn from_env() -> Self {
        let mut solver = Self::new();
        if let Ok(value) = std::env::var("TRELLIS_PARANOID_SOLVER") {
            solver.paranoid = matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "yes");
        }
        solver
    }

    pub fn set_paranoid(&mut self, paranoid: bool) {
        self.paranoid = paranoid;
    }

    #[must_use]
    pub fn is_paranoid(&self) -> bool {
        self.paranoid
    }

    #[must_use]
    pub fn stats(&self) -> &SolveStats {
        &self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats = SolveStats::default();
    }

    // ── Constraint lifecycle ────────────────────────────────────────────

    /// Add a constraint to the system.
    ///
    /// On failure nothing is added: the tableau represents exactly the
    /// constraints it held before the call.
    pub fn add_constraint(&mut self, constraint: Constraint) -> Result<(), SolveError> {
        if self.constraints.contains_key(&constraint) {
            return Err(SolveError::DuplicateConstraint);
        }
        // The pivot selections below assume a feasible tableau; settle
        // suggestion debt still queued for the next flush before any
        // structural change.
        self.dual_optimize()?;

        // Compiling the constraint reserves variable references and, for
        // non-required strengths, weights error symbols into the
        // objective. The failure paths below unwind exactly that much;
        // both of them are only reachable for required constraints, which
        // never touch the objective.
        let (mut row, tag) = self.create_row(&constraint);
        let mut subject = Self::choose_subject(&row, &tag);

        if subject.is_none() && row.all_dummies() {
            if near_zero(row.constant()) {
                // Redundant with existing constraints; keep the marker as
                // a basic zero row so removal still works.
                subject = Some(tag.marker);
            } else {
                self.release_constraint_variables(&constraint);
                tracing::debug!(constraint = %constraint, "rejected: conflicts with required constraints");
                return Err(SolveError::UnsatisfiableConstraint);
            }
        }

        match subject {
            Some(subject) => {
                row.solve_for_symbol(subject);
                self.substitute(subject, &row);
                self.rows.insert(subject, row);
            }
            None => {
                if !self.add_with_artificial_variable(&row)? {
                    self.release_constraint_variables(&constraint);
                    // Pivots made while probing may have moved the basis;
                    // settle back onto a feasible optimum before reporting.
                    self.optimize_objective()?;
                    self.dual_optimize()?;
                    tracing::debug!(constraint = %constraint, "rejected: no feasible basis");
                    return Err(SolveError::UnsatisfiableConstraint);
                }
            }
        }

        self.constraints.insert(constraint.clone(), tag);
        self.optimize_objective()?;
        // Substituting the subject can push other restricted rows
        // negative; the tableau must be feasible again before returning.
        self.dual_optimize()?;
        self.stats.constraints_added += 1;
        tracing::debug!(constraint = %constraint, rows = self.rows.len(), "constraint added");
        self.after_mutation()
    }

    /// Remove a previously added constraint.
    pub fn remove_constraint(&mut self, constraint: &Constraint) -> Result<(), SolveError> {
        if !self.constraints.contains_key(constraint) {
            return Err(SolveError::UnknownConstraint);
        }
        // The pivot selections below assume a feasible tableau; settle
        // suggestion debt still queued for the next flush before any
        // structural change.
        self.dual_optimize()?;
        let Some(tag) = self.constraints.remove(constraint) else {
            return Err(SolveError::UnknownConstraint);
        };

        // Withdraw the error weights this constraint contributed to the
        // objective before the tableau changes shape.
        self.remove_constraint_effects(constraint, &tag);

        if self.rows.remove(&tag.marker).is_none() {
            // The marker is parametric; pivot it into the basis so its
            // row can be dropped.
            let Some((leaving, mut row)) = self.marker_leaving_row(tag.marker) else {
                return Err(SolveError::InternalSolverError(
                    "marker for a live constraint has no leaving row",
                ));
            };
            row.solve_for_symbols(leaving, tag.marker);
            self.substitute(tag.marker, &row);
        }

        self.optimize_objective()?;
        self.dual_optimize()?;
        self.release_constraint_variables(constraint);
        self.stats.constraints_removed += 1;
        tracing::debug!(constraint = %constraint, rows = self.rows.len(), "constraint removed");
        self.after_mutation()
    }

    /// Add every constraint, or none of them.
    ///
    /// On failure the already-applied prefix is removed again and the
    /// first error is returned.
    pub fn add_constraints<I>(&mut self, constraints: I) -> Result<(), SolveError>
    where
        I: IntoIterator<Item = Constraint>,
    {
        let pending: Vec<Constraint> = constraints.into_iter().collect();
        self.apply_all(
            &pending,
            |solver, constraint| solver.add_constraint(constraint.clone()),
            |solver, constraint| solver.remove_constraint(constraint),
        )
    }

    /// Remove every constraint, or none of them.
    pub fn remove_constraints(&mut self, constraints: &[Constraint]) -> Result<(), SolveError> {
        self.apply_all(
            constraints,
            |solver, constraint| solver.remove_constraint(constraint),
            |solver, constraint| solver.add_constraint(constraint.clone()),
        )
    }

    #[must_use]
    pub fn has_constraint(&self, constraint: &Constraint) -> bool {
        self.constraints.contains_key(constraint)
    }

    #[must_use]
    pub fn constraint_count(&self) -> usize {
        self.constraints.len()
    }

    // ── Edit variables ──────────────────────────────────────────────────

    /// Register `variable` for direct value suggestions.
    ///
    /// The backing edit constraint is seeded with the variable's current
    /// resolved value, so registering an already-placed variable does not
    /// move it.
    pub fn add_edit_variable(
        &mut self,
        variable: Variable,
        strength: f64,
    ) -> Result<(), SolveError> {
        if self.edits.contains_key(&variable) {
            return Err(SolveError::DuplicateEditVariable);
        }
        let strength = strength::clip(strength);
        if strength == strength::REQUIRED {
            return Err(SolveError::BadRequiredStrength);
        }

        // Settle queued suggestion work so the seed below reads the
        // variable's settled value, not a mid-batch snapshot.
        self.dual_optimize()?;
        let current = self.value_of(variable);
        let constraint = Constraint::new(
            Expression::from_term(Term::new(variable, 1.0)) - current,
            Relation::Equal,
            strength,
        );
        match self.add_constraint(constraint.clone()) {
            Ok(()) => {}
            Err(SolveError::InternalSolverError(detail)) => {
                return Err(SolveError::InternalSolverError(detail));
            }
            // Edit constraints are fresh objects below required strength;
            // the ordinary rejections cannot apply to them.
            Err(_) => {
                return Err(SolveError::InternalSolverError(
                    "edit constraint was rejected",
                ));
            }
        }
        let Some(&tag) = self.constraints.get(&constraint) else {
            return Err(SolveError::InternalSolverError(
                "edit constraint vanished after insertion",
            ));
        };
        self.edits.insert(
            variable,
            EditInfo { tag, constraint, constant: current },
        );
        Ok(())
    }

    /// Unregister an edit variable and drop its backing constraint.
    pub fn remove_edit_variable(&mut self, variable: Variable) -> Result<(), SolveError> {
        let Some(info) = self.edits.remove(&variable) else {
            return Err(SolveError::UnknownEditVariable);
        };
        match self.remove_constraint(&info.constraint) {
            Ok(()) => Ok(()),
            Err(SolveError::InternalSolverError(detail)) => {
                Err(SolveError::InternalSolverError(detail))
            }
            Err(_) => Err(SolveError::InternalSolverError(
                "edit constraint was already gone",
            )),
        }
    }

    #[must_use]
    pub fn has_edit_variable(&self, variable: Variable) -> bool {
        self.edits.contains_key(&variable)
    }

    /// Suggest a new value for an edit variable.
    ///
    /// The delta against the previous suggestion is folded into the
    /// affected row constants without any pivoting. Rows driven negative
    /// wait in the infeasible queue for the next dual pass;
    /// [`flush_updates`](Self::flush_updates) runs one before publishing,
    /// so resolved values observed before that flush may be stale.
    pub fn suggest_value(&mut self, variable: Variable, value: f64) -> Result<(), SolveError> {
        let (marker, other, delta) = {
            let info = self
                .edits
                .get_mut(&variable)
                .ok_or(SolveError::UnknownEditVariable)?;
            let delta = value - info.constant;
            info.constant = value;
            (info.tag.marker, info.tag.other, delta)
        };

        // Fast paths: the marker or its paired symbol is basic and the
        // whole delta lands on one constant.
        if let Some(row) = self.rows.get_mut(&marker) {
            if row.add(-delta) < 0.0 {
                self.infeasible_rows.push(marker);
            }
        } else if let Some(other) = other
            && let Some(row) = self.rows.get_mut(&other)
        {
            if row.add(delta) < 0.0 {
                self.infeasible_rows.push(other);
            }
        } else {
            // Otherwise the delta flows through every row that mentions
            // the marker.
            for (&basic, row) in self.rows.iter_mut() {
                let coefficient = row.coefficient_for(marker);
                if coefficient == 0.0 {
                    continue;
                }
                if row.add(delta * coefficient) < 0.0
                    && basic.kind() != SymbolKind::External
                {
                    self.infeasible_rows.push(basic);
                }
            }
        }

        self.stats.suggestions += 1;
        tracing::trace!(variable = %variable, value, "value suggested");
        self.after_mutation()
    }

    /// Restore feasibility and report every variable whose resolved value
    /// changed since the last flush.
    pub fn flush_updates(&mut self) -> Result<FlushResult, SolveError> {
        let dual_before = self.stats.dual_pivots;
        self.dual_optimize()?;

        let mut changes = Vec::new();
        for (&variable, data) in self.var_data.iter_mut() {
            let value = self.rows.get(&data.symbol).map_or(0.0, Row::constant);
            // NaN sentinel compares unequal to everything, so fresh
            // variables always publish once.
            if data.value != value {
                data.value = value;
                changes.push((variable, value));
            }
        }
        changes.sort_by_key(|change| change.0);

        self.stats.flushes += 1;
        tracing::trace!(
            changed = changes.len(),
            dual_pivots = self.stats.dual_pivots - dual_before,
            "updates flushed"
        );
        self.after_mutation()?;
        Ok(FlushResult { changes })
    }

    // ── Introspection ───────────────────────────────────────────────────

    /// The current resolved value of `variable`.
    ///
    /// Unknown and parametric variables both resolve to zero. Between a
    /// suggestion and its flush this may expose intermediate state.
    #[must_use]
    pub fn value_of(&self, variable: Variable) -> f64 {
        self.var_data
            .get(&variable)
            .and_then(|data| self.rows.get(&data.symbol))
            .map_or(0.0, Row::constant)
    }

    /// Number of registered edit variables.
    #[must_use]
    pub fn edit_count(&self) -> usize {
        self.edits.len()
    }

    /// Number of basic rows in the tableau, a proxy for solver size.
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Forget all constraints, edits, and variables.
    pub fn reset(&mut self) {
        self.constraints.clear();
        self.var_data.clear();
        self.var_for_symbol.clear();
        self.rows.clear();
        self.edits.clear();
        self.infeasible_rows.clear();
        self.objective = Row::default();
        self.id_tick = 1;
        self.stats = SolveStats::default();
        tracing::debug!("solver reset");
    }

    /// Verify the tableau invariants, returning the first violation.
    ///
    /// Cheap enough for tests and paranoid mode, not meant for hot paths.
    pub fn check_invariants(&self) -> Result<(), SolveError> {
        for row in self.rows.values() {
            for cell in row.cells().keys() {
                if self.rows.contains_key(cell) {
                    return Err(SolveError::InternalSolverError(
                        "a basic symbol appears inside a row",
                    ));
                }
            }
        }
        for cell in self.objective.cells().keys() {
            if self.rows.contains_key(cell) {
                return Err(SolveError::InternalSolverError(
                    "a basic symbol appears inside the objective",
                ));
            }
        }
        for (symbol, row) in &self.rows {
            if symbol.kind() != SymbolKind::External
                && row.constant() < -EPSILON
                && !self.infeasible_rows.contains(symbol)
            {
                return Err(SolveError::InternalSolverError(
                    "a negative restricted row is not queued for the dual pass",
                ));
            }
            // Dummies only enter the basis as subjects of redundant
            // constraints, whose rows carry no real value.
            if symbol.kind() == SymbolKind::Dummy && !near_zero(row.constant()) {
                return Err(SolveError::InternalSolverError(
                    "a dummy-basic row drifted from zero",
                ));
            }
        }

        let mut expected: FxHashMap<Variable, usize> = FxHashMap::default();
        for constraint in self.constraints.keys() {
            for term in &constraint.expression().terms {
                if !near_zero(term.coefficient) {
                    *expected.entry(term.variable).or_insert(0) += 1;
                }
            }
        }
        if expected.len() != self.var_data.len() {
            return Err(SolveError::InternalSolverError(
                "variable table does not match the live constraints",
            ));
        }
        for (variable, data) in &self.var_data {
            if expected.get(variable).copied().unwrap_or(0) != data.refs {
                return Err(SolveError::InternalSolverError(
                    "a variable reference count is out of sync",
                ));
            }
            if data.symbol.kind() != SymbolKind::External {
                return Err(SolveError::InternalSolverError(
                    "a variable is bound to a non-external symbol",
                ));
            }
            if self.var_for_symbol.get(&data.symbol) != Some(variable) {
                return Err(SolveError::InternalSolverError(
                    "symbol and variable tables disagree",
                ));
            }
        }
        Ok(())
    }

    // ── Compilation ─────────────────────────────────────────────────────

    /// Compile a constraint into a tableau row.
    ///
    /// Terms over basic variables are expanded through their defining
    /// rows so the result only mentions parametric symbols. The returned
    /// row always has a non-negative constant.
    fn create_row(&mut self, constraint: &Constraint) -> (Row, Tag) {
        let expression = constraint.expression();
        let mut row = Row::new(expression.constant);
        for term in &expression.terms {
            if near_zero(term.coefficient) {
                continue;
            }
            let symbol = self.symbol_for_variable(term.variable);
            if let Some(basic) = self.rows.get(&symbol) {
                row.insert_row(basic, term.coefficient);
            } else {
                row.insert_symbol(symbol, term.coefficient);
            }
        }

        let tag = match constraint.relation() {
            Relation::LessOrEqual | Relation::GreaterOrEqual => {
                let coefficient = if constraint.relation() == Relation::LessOrEqual {
                    1.0
                } else {
                    -1.0
                };
                let slack = self.fresh_symbol(SymbolKind::Slack);
                row.insert_symbol(slack, coefficient);
                if constraint.strength() < strength::REQUIRED {
                    let error = self.fresh_symbol(SymbolKind::Error);
                    row.insert_symbol(error, -coefficient);
                    self.objective.insert_symbol(error, constraint.strength());
                    Tag { marker: slack, other: Some(error) }
                } else {
                    Tag { marker: slack, other: None }
                }
            }
            Relation::Equal => {
                if constraint.strength() < strength::REQUIRED {
                    // One error pulls the expression up, the other down.
                    let errplus = self.fresh_symbol(SymbolKind::Error);
                    let errminus = self.fresh_symbol(SymbolKind::Error);
                    row.insert_symbol(errplus, -1.0);
                    row.insert_symbol(errminus, 1.0);
                    self.objective.insert_symbol(errplus, constraint.strength());
                    self.objective.insert_symbol(errminus, constraint.strength());
                    Tag { marker: errplus, other: Some(errminus) }
                } else {
                    let dummy = self.fresh_symbol(SymbolKind::Dummy);
                    row.insert_symbol(dummy, 1.0);
                    Tag { marker: dummy, other: None }
                }
            }
        };

        if row.constant() < 0.0 {
            row.reverse_sign();
        }
        (row, tag)
    }

    /// Pick which symbol of a fresh row becomes basic.
    ///
    /// External symbols win outright; the row's cells iterate in symbol
    /// order, so the lowest external is taken. Failing that, the marker
    /// or its pair may serve if pivotable with a negative coefficient.
    fn choose_subject(row: &Row, tag: &Tag) -> Option<Symbol> {
        for &symbol in row.cells().keys() {
            if symbol.kind() == SymbolKind::External {
                return Some(symbol);
            }
        }
        if tag.marker.is_pivotable() && row.coefficient_for(tag.marker) < 0.0 {
            return Some(tag.marker);
        }
        if let Some(other) = tag.other
            && other.is_pivotable()
            && row.coefficient_for(other) < 0.0
        {
            return Some(other);
        }
        None
    }

    /// Introduce a row that offers no direct subject.
    ///
    /// A temporary artificial symbol holds the row while an auxiliary
    /// objective drives its constant to zero. On success the artificial
    /// symbol is pivoted out (its value is zero, so asserting it away is
    /// sound) and scrubbed. On failure the row leaves the tableau whole
    /// rather than being asserted into it, so a rejected constraint
    /// cannot bend the surviving system. Either way no trace of the
    /// artificial symbol survives.
    fn add_with_artificial_variable(&mut self, row: &Row) -> Result<bool, SolveError> {
        let art = self.fresh_symbol(SymbolKind::Slack);
        self.rows.insert(art, row.clone());
        let mut artificial = row.clone();
        self.optimize(&mut artificial)?;
        let success = near_zero(artificial.constant());

        if success {
            if let Some(mut art_row) = self.rows.remove(&art) {
                if art_row.cells().is_empty() {
                    return Ok(true);
                }
                let Some(entering) = art_row.any_pivotable_symbol() else {
                    return Ok(false);
                };
                art_row.solve_for_symbols(art, entering);
                self.substitute(entering, &art_row);
                self.rows.insert(entering, art_row);
            }
            for target in self.rows.values_mut() {
                target.remove_symbol(art);
            }
            self.objective.remove_symbol(art);
            return Ok(true);
        }

        // If an optimize pivot moved the artificial symbol out of the basis,
        // pivot it back in through a feasibility-preserving leaving row,
        // exactly as if its pseudo-constraint were being removed. The row
        // is then dropped whole.
        if self.rows.remove(&art).is_none()
            && let Some((leaving, mut held)) = self.marker_leaving_row(art)
        {
            held.solve_for_symbols(leaving, art);
            self.substitute(art, &held);
        }
        self.objective.remove_symbol(art);
        Ok(false)
    }

    // ── Pivoting ────────────────────────────────────────────────────────

    /// Replace `symbol` with its defining row everywhere it appears.
    ///
    /// Restricted rows driven negative are queued for the next dual pass.
    fn substitute(&mut self, symbol: Symbol, row: &Row) {
        for (&basic, target) in self.rows.iter_mut() {
            target.substitute(symbol, row);
            if basic.kind() != SymbolKind::External && target.constant() < 0.0 {
                self.infeasible_rows.push(basic);
            }
        }
        self.objective.substitute(symbol, row);
    }

    /// Run the primal simplex on the stored objective.
    fn optimize_objective(&mut self) -> Result<(), SolveError> {
        let mut objective = mem::take(&mut self.objective);
        let result = self.optimize(&mut objective);
        self.objective = objective;
        result
    }

    /// Run the primal simplex until `objective` is optimal.
    ///
    /// `objective` may be the stored objective (taken out of `self`) or an
    /// auxiliary one; `self.objective` is kept substituted either way.
    fn optimize(&mut self, objective: &mut Row) -> Result<(), SolveError> {
        loop {
            let Some(entering) = objective.entering_symbol() else {
                return Ok(());
            };
            let Some((leaving, mut row)) = self.leaving_row(entering) else {
                return Err(SolveError::InternalSolverError("the objective is unbounded"));
            };
            row.solve_for_symbols(leaving, entering);
            self.substitute(entering, &row);
            objective.substitute(entering, &row);
            // A pivot taken while rows are queued infeasible can re-key a
            // still-negative row; it must stay tracked for the dual pass.
            if entering.kind() != SymbolKind::External && row.constant() < 0.0 {
                self.infeasible_rows.push(entering);
            }
            self.rows.insert(entering, row);
            self.stats.primal_pivots += 1;
        }
    }

    /// Minimum-ratio leaving row for a primal step, removed from the
    /// tableau.
    fn leaving_row(&mut self, entering: Symbol) -> Option<(Symbol, Row)> {
        let mut ratio = f64::INFINITY;
        let mut leaving: Option<Symbol> = None;
        for (&symbol, row) in &self.rows {
            if symbol.kind() == SymbolKind::External {
                continue;
            }
            let coefficient = row.coefficient_for(entering);
            if coefficient >= 0.0 {
                continue;
            }
            let r = -row.constant() / coefficient;
            // Rows iterate in hash order, so ties break toward the
            // lowest symbol explicitly.
            if r < ratio || (r == ratio && leaving.is_none_or(|current| symbol < current)) {
                ratio = r;
                leaving = Some(symbol);
            }
        }
        let symbol = leaving?;
        let row = self.rows.remove(&symbol)?;
        Some((symbol, row))
    }

    /// Re-establish feasibility after constants have been perturbed.
    ///
    /// Queued rows are processed lowest symbol first; entries that
    /// recovered or re-pivoted in the meantime are skipped.
    fn dual_optimize(&mut self) -> Result<(), SolveError> {
        while !self.infeasible_rows.is_empty() {
            let mut pick = 0;
            for index in 1..self.infeasible_rows.len() {
                if self.infeasible_rows[index] < self.infeasible_rows[pick] {
                    pick = index;
                }
            }
            let leaving = self.infeasible_rows.swap_remove(pick);

            let stale = self
                .rows
                .get(&leaving)
                .is_none_or(|row| row.constant() >= 0.0);
            if stale {
                continue;
            }
            let Some(mut row) = self.rows.remove(&leaving) else {
                continue;
            };
            let Some(entering) = self.dual_entering_symbol(&row) else {
                return Err(SolveError::InternalSolverError(
                    "dual optimization found no entering symbol",
                ));
            };
            row.solve_for_symbols(leaving, entering);
            self.substitute(entering, &row);
            self.rows.insert(entering, row);
            self.stats.dual_pivots += 1;
        }
        Ok(())
    }

    /// Entering symbol for a dual step: the positive non-dummy cell
    /// minimizing objective coefficient over row coefficient.
    fn dual_entering_symbol(&self, row: &Row) -> Option<Symbol> {
        let mut entering = None;
        let mut ratio = f64::INFINITY;
        for (&symbol, &value) in row.cells() {
            if value <= 0.0 || symbol.kind() == SymbolKind::Dummy {
                continue;
            }
            let r = self.objective.coefficient_for(symbol) / value;
            // Cells iterate in symbol order; strict comparison keeps the
            // lowest symbol on ties.
            if r < ratio {
                ratio = r;
                entering = Some(symbol);
            }
        }
        entering
    }

    // ── Removal support ─────────────────────────────────────────────────

    /// Withdraw the objective weights contributed by a constraint's error
    /// symbols.
    fn remove_constraint_effects(&mut self, constraint: &Constraint, tag: &Tag) {
        if tag.marker.kind() == SymbolKind::Error {
            self.remove_marker_effects(tag.marker, constraint.strength());
        }
        if let Some(other) = tag.other
            && other.kind() == SymbolKind::Error
        {
            self.remove_marker_effects(other, constraint.strength());
        }
    }

    fn remove_marker_effects(&mut self, marker: Symbol, strength: f64) {
        if let Some(row) = self.rows.get(&marker) {
            self.objective.insert_row(row, -strength);
        } else {
            self.objective.insert_symbol(marker, -strength);
        }
    }

    /// Pick the row a parametric marker leaves through, removed from the
    /// tableau.
    ///
    /// Preference order: restricted rows with a negative coefficient by
    /// minimum exit ratio, then restricted rows with a positive
    /// coefficient, then any external row. Every tier breaks ties toward
    /// the lowest symbol.
    fn marker_leaving_row(&mut self, marker: Symbol) -> Option<(Symbol, Row)> {
        let mut first: Option<Symbol> = None;
        let mut second: Option<Symbol> = None;
        let mut third: Option<Symbol> = None;
        let mut r1 = f64::INFINITY;
        let mut r2 = f64::INFINITY;

        for (&symbol, row) in &self.rows {
            let coefficient = row.coefficient_for(marker);
            if coefficient == 0.0 {
                continue;
            }
            if symbol.kind() == SymbolKind::External {
                if third.is_none_or(|current| symbol < current) {
                    third = Some(symbol);
                }
            } else if coefficient < 0.0 {
                let r = -row.constant() / coefficient;
                if r < r1 || (r == r1 && first.is_none_or(|current| symbol < current)) {
                    r1 = r;
                    first = Some(symbol);
                }
            } else {
                let r = row.constant() / coefficient;
                if r < r2 || (r == r2 && second.is_none_or(|current| symbol < current)) {
                    r2 = r;
                    second = Some(symbol);
                }
            }
        }

        let leaving = first.or(second).or(third)?;
        let row = self.rows.remove(&leaving)?;
        Some((leaving, row))
    }

    // ── Variable bookkeeping ────────────────────────────────────────────

    /// The external symbol for `variable`, created on first use. Each
    /// call accounts for one constraint term holding the variable.
    fn symbol_for_variable(&mut self, variable: Variable) -> Symbol {
        let id_tick = &mut self.id_tick;
        let var_for_symbol = &mut self.var_for_symbol;
        let data = self.var_data.entry(variable).or_insert_with(|| {
            let symbol = Symbol::new(SymbolKind::External, *id_tick);
            *id_tick += 1;
            var_for_symbol.insert(symbol, variable);
            VarData { value: f64::NAN, symbol, refs: 0 }
        });
        data.refs += 1;
        data.symbol
    }

    /// Drop one reference per term of `constraint`; variables with no
    /// remaining references leave the tables immediately.
    fn release_constraint_variables(&mut self, constraint: &Constraint) {
        for term in &constraint.expression().terms {
            if near_zero(term.coefficient) {
                continue;
            }
            let mut drop_entry = false;
            if let Some(data) = self.var_data.get_mut(&term.variable) {
                data.refs = data.refs.saturating_sub(1);
                if data.refs == 0 {
                    self.var_for_symbol.remove(&data.symbol);
                    drop_entry = true;
                }
            }
            if drop_entry {
                self.var_data.remove(&term.variable);
            }
        }
    }

    fn fresh_symbol(&mut self, kind: SymbolKind) -> Symbol {
        let symbol = Symbol::new(kind, self.id_tick);
        self.id_tick += 1;
        symbol
    }

    // ── Batching and checking helpers ───────────────────────────────────

    /// Apply `step` to every item; on failure undo the applied prefix in
    /// reverse order so the batch is all-or-nothing.
    fn apply_all<F, U>(&mut self, items: &[Constraint], step: F, undo: U) -> Result<(), SolveError>
    where
        F: Fn(&mut Self, &Constraint) -> Result<(), SolveError>,
        U: Fn(&mut Self, &Constraint) -> Result<(), SolveError>,
    {
        for (index, item) in items.iter().enumerate() {
            if let Err(error) = step(self, item) {
                for applied in items[..index].iter().rev() {
                    if undo(self, applied).is_err() {
                        return Err(SolveError::InternalSolverError(
                            "failed to roll back a partially applied batch",
                        ));
                    }
                }
                return Err(error);
            }
        }
        Ok(())
    }

    fn after_mutation(&self) -> Result<(), SolveError> {
        if self.paranoid { self.check_invariants() } else { Ok(()) }
    }
}

impl Default for Solver {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Solver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Solver")
            .field("constraints", &self.constraints.len())
            .field("edits", &self.edits.len())
            .field("rows", &self.rows.len())
            .field("infeasible", &self.infeasible_rows.len())
            .field("paranoid", &self.paranoid)
            .finish()
    }
}
