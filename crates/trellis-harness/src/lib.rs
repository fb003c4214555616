//! Shared fixtures for exercising the Trellis solver.
//!
//! The scenarios here are small but realistic constraint systems used by
//! integration tests and benchmarks across the workspace. They are kept
//! deliberately plain: build a fixture, install it into a solver, then
//! drive it through edits and assert on the resolved geometry.

#![forbid(unsafe_code)]

use trellis_solver::{
    Constraint, EntityId, Property, Relation, SolveError, Solver, Variable, strength,
};

/// Assert two resolved values agree to solver precision.
pub fn assert_near(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-6,
        "expected {expected}, got {actual}"
    );
}

/// A horizontal strip of panes inside a container.
///
/// Pane lefts chain off each other with a fixed gap; each pane prefers
/// its own width at a weak strength whose weight grows with the pane
/// index, and the last pane's right edge must meet the container width.
/// Because the weights are distinct, any slack the container forces onto
/// the strip lands entirely on pane 0, which keeps the resolved geometry
/// easy to assert on.
pub struct StripLayout {
    container: EntityId,
    panes: Vec<EntityId>,
    gap: f64,
    preferred: Vec<f64>,
}

impl StripLayout {
    /// A strip of `pane_count` panes with preferred widths
    /// `80, 100, 120, ...`.
    #[must_use]
    pub fn new(pane_count: usize, gap: f64) -> Self {
        let preferred = (0..pane_count).map(|i| 80.0 + 20.0 * i as f64).collect();
        Self::with_preferred(gap, preferred)
    }

    #[must_use]
    pub fn with_preferred(gap: f64, preferred: Vec<f64>) -> Self {
        assert!(!preferred.is_empty(), "a strip needs at least one pane");
        Self {
            container: EntityId::from_raw(0),
            panes: (0..preferred.len() as u64)
                .map(|i| EntityId::from_raw(i + 1))
                .collect(),
            gap,
            preferred,
        }
    }

    #[must_use]
    pub fn pane_count(&self) -> usize {
        self.panes.len()
    }

    /// The container width, the usual edit variable for this fixture.
    #[must_use]
    pub fn total(&self) -> Variable {
        Variable::new(self.container, Property::Width)
    }

    #[must_use]
    pub fn left(&self, index: usize) -> Variable {
        Variable::new(self.panes[index], Property::Left)
    }

    #[must_use]
    pub fn width(&self, index: usize) -> Variable {
        Variable::new(self.panes[index], Property::Width)
    }

    #[must_use]
    pub fn preferred_width(&self, index: usize) -> f64 {
        self.preferred[index]
    }

    /// Total width the strip settles on when nothing constrains the
    /// container.
    #[must_use]
    pub fn natural_total(&self) -> f64 {
        let widths: f64 = self.preferred.iter().sum();
        widths + self.gap * (self.pane_count() as f64 - 1.0)
    }

    /// The full constraint set for the strip.
    #[must_use]
    pub fn constraints(&self) -> Vec<Constraint> {
        let mut constraints = Vec::with_capacity(self.pane_count() * 2 + 1);
        constraints.push(Constraint::new(
            self.left(0),
            Relation::Equal,
            strength::REQUIRED,
        ));
        for i in 1..self.pane_count() {
            constraints.push(Constraint::new(
                self.left(i) - self.left(i - 1) - self.width(i - 1) - self.gap,
                Relation::Equal,
                strength::REQUIRED,
            ));
        }
        for i in 0..self.pane_count() {
            // Distinct weights make the slack distribution unambiguous.
            constraints.push(Constraint::new(
                self.width(i) - self.preferred[i],
                Relation::Equal,
                strength::create(0.0, 0.0, 1.0, (i + 1) as f64),
            ));
        }
        let last = self.pane_count() - 1;
        constraints.push(Constraint::new(
            self.left(last) + self.width(last) - self.total(),
            Relation::Equal,
            strength::REQUIRED,
        ));
        constraints
    }

    /// Add the whole strip to `solver` as one atomic batch.
    pub fn install(&self, solver: &mut Solver) -> Result<(), SolveError> {
        solver.add_constraints(self.constraints())
    }
}

/// A box whose right edge is derived from its left edge and width.
///
/// Small fixture for tests that need a dependent variable without the
/// bulk of a strip.
pub struct AnchoredBox {
    entity: EntityId,
}

impl AnchoredBox {
    #[must_use]
    pub fn new(entity: EntityId) -> Self {
        Self { entity }
    }

    #[must_use]
    pub fn left(&self) -> Variable {
        Variable::new(self.entity, Property::Left)
    }

    #[must_use]
    pub fn width(&self) -> Variable {
        Variable::new(self.entity, Property::Width)
    }

    #[must_use]
    pub fn right(&self) -> Variable {
        Variable::new(self.entity, Property::Right)
    }

    /// `right == left + width`, plus a minimum width bound.
    #[must_use]
    pub fn constraints(&self, min_width: f64) -> Vec<Constraint> {
        vec![
            Constraint::new(
                self.right() - self.left() - self.width(),
                Relation::Equal,
                strength::REQUIRED,
            ),
            Constraint::new(
                self.width() - min_width,
                Relation::GreaterOrEqual,
                strength::REQUIRED,
            ),
        ]
    }

    pub fn install(&self, solver: &mut Solver, min_width: f64) -> Result<(), SolveError> {
        solver.add_constraints(self.constraints(min_width))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_settles_at_its_natural_size() {
        let strip = StripLayout::new(3, 8.0);
        let mut solver = Solver::new();
        strip.install(&mut solver).unwrap();
        solver.flush_updates().unwrap();

        for i in 0..strip.pane_count() {
            assert_near(solver.value_of(strip.width(i)), strip.preferred_width(i));
        }
        assert_near(solver.value_of(strip.total()), strip.natural_total());
        assert_near(solver.value_of(strip.left(1)), 88.0);
        assert_near(solver.value_of(strip.left(2)), 196.0);
    }

    #[test]
    fn container_slack_lands_on_the_first_pane() {
        let strip = StripLayout::new(3, 8.0);
        let mut solver = Solver::new();
        strip.install(&mut solver).unwrap();
        solver
            .add_edit_variable(strip.total(), strength::STRONG)
            .unwrap();
        solver
            .suggest_value(strip.total(), strip.natural_total() + 30.0)
            .unwrap();
        solver.flush_updates().unwrap();

        assert_near(
            solver.value_of(strip.width(0)),
            strip.preferred_width(0) + 30.0,
        );
        assert_near(solver.value_of(strip.width(1)), strip.preferred_width(1));
        assert_near(solver.value_of(strip.width(2)), strip.preferred_width(2));
    }

    #[test]
    fn anchored_box_derives_its_right_edge() {
        let boxed = AnchoredBox::new(EntityId::from_raw(7));
        let mut solver = Solver::new();
        boxed.install(&mut solver, 50.0).unwrap();
        solver
            .add_edit_variable(boxed.left(), strength::STRONG)
            .unwrap();
        solver
            .add_edit_variable(boxed.width(), strength::STRONG)
            .unwrap();
        solver.suggest_value(boxed.left(), 10.0).unwrap();
        solver.suggest_value(boxed.width(), 120.0).unwrap();
        solver.flush_updates().unwrap();

        assert_near(solver.value_of(boxed.right()), 130.0);
    }
}
