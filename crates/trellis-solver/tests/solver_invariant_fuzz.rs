//! Randomized churn against the solver's structural invariants.
//!
//! Each session drives a fresh solver through a seeded stream of adds,
//! removals, edits, suggestions, and flushes, checking `check_invariants`
//! after every step. Sessions also produce a fingerprint of everything
//! observable (operation results and flushed values), which lets the
//! proptest below assert that identical histories replay identically.

use proptest::prelude::*;
use trellis_solver::{
    Constraint, EntityId, Expression, Property, Relation, SolveError, Solver, Term, Variable,
    strength,
};

// ── Seeded generator ────────────────────────────────────────────────────

struct Lcg {
    state: u64,
}

impl Lcg {
    fn new(seed: u64) -> Self {
        Self {
            state: seed ^ 0x9E37_79B9_7F4A_7C15,
        }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1);
        self.state
    }

    fn below(&mut self, bound: u64) -> u64 {
        self.next_u64() % bound
    }
}

const PROPERTIES: [Property; 4] = [
    Property::Left,
    Property::Top,
    Property::Width,
    Property::Height,
];
const COEFFICIENTS: [f64; 6] = [-3.0, -2.0, -1.0, 1.0, 2.0, 3.0];
const STRENGTHS: [f64; 4] = [
    strength::WEAK,
    strength::MEDIUM,
    strength::STRONG,
    strength::REQUIRED,
];
const RELATIONS: [Relation; 3] = [
    Relation::LessOrEqual,
    Relation::Equal,
    Relation::GreaterOrEqual,
];

fn pick_variable(lcg: &mut Lcg) -> Variable {
    let index = lcg.below(16);
    Variable::new(
        EntityId::from_raw(1 + index / 4),
        PROPERTIES[(index % 4) as usize],
    )
}

fn pick_constraint(lcg: &mut Lcg) -> Constraint {
    let term_count = 1 + lcg.below(3);
    let mut expression = Expression::from_constant(lcg.below(101) as f64 - 50.0);
    for _ in 0..term_count {
        expression.terms.push(Term {
            variable: pick_variable(lcg),
            coefficient: COEFFICIENTS[lcg.below(6) as usize],
        });
    }
    Constraint::new(
        expression,
        RELATIONS[lcg.below(3) as usize],
        STRENGTHS[lcg.below(4) as usize],
    )
}

// ── Session driver ──────────────────────────────────────────────────────

fn run_session(seed: u64, steps: usize, paranoid: bool) -> Vec<String> {
    let mut lcg = Lcg::new(seed);
    let mut solver = Solver::new();
    solver.set_paranoid(paranoid);
    let mut live: Vec<Constraint> = Vec::new();
    let mut edits: Vec<Variable> = Vec::new();
    let mut trace = Vec::new();

    for step in 0..steps {
        let roll = lcg.below(100);
        if roll < 30 {
            // Add one constraint; required ones may legitimately conflict.
            let constraint = pick_constraint(&mut lcg);
            match solver.add_constraint(constraint.clone()) {
                Ok(()) => {
                    live.push(constraint);
                    trace.push(format!("{step}: add ok"));
                }
                Err(SolveError::UnsatisfiableConstraint) => {
                    trace.push(format!("{step}: add unsat"));
                }
                Err(err) => panic!("unexpected add failure at step {step}: {err}"),
            }
        } else if roll < 36 {
            // Re-adding a live constraint must be rejected and change nothing.
            if let Some(existing) = live.first() {
                let count = solver.constraint_count();
                assert_eq!(
                    solver.add_constraint(existing.clone()),
                    Err(SolveError::DuplicateConstraint)
                );
                assert_eq!(solver.constraint_count(), count);
                trace.push(format!("{step}: duplicate rejected"));
            }
        } else if roll < 44 {
            // Bulk add is all-or-nothing.
            let batch: Vec<Constraint> = (0..2 + lcg.below(3))
                .map(|_| pick_constraint(&mut lcg))
                .collect();
            let count = solver.constraint_count();
            match solver.add_constraints(batch.clone()) {
                Ok(()) => {
                    assert_eq!(solver.constraint_count(), count + batch.len());
                    live.extend(batch);
                    trace.push(format!("{step}: batch ok"));
                }
                Err(SolveError::UnsatisfiableConstraint) => {
                    assert_eq!(solver.constraint_count(), count);
                    trace.push(format!("{step}: batch unsat"));
                }
                Err(err) => panic!("unexpected batch failure at step {step}: {err}"),
            }
        } else if roll < 58 {
            if !live.is_empty() {
                let index = lcg.below(live.len() as u64) as usize;
                let constraint = live.swap_remove(index);
                solver.remove_constraint(&constraint).unwrap();
                trace.push(format!("{step}: remove"));
            }
        } else if roll < 66 {
            let variable = pick_variable(&mut lcg);
            match solver.add_edit_variable(variable, STRENGTHS[lcg.below(3) as usize]) {
                Ok(()) => {
                    edits.push(variable);
                    trace.push(format!("{step}: edit {variable}"));
                }
                Err(SolveError::DuplicateEditVariable) => {
                    trace.push(format!("{step}: edit duplicate"));
                }
                Err(err) => panic!("unexpected edit failure at step {step}: {err}"),
            }
        } else if roll < 72 {
            if !edits.is_empty() {
                let index = lcg.below(edits.len() as u64) as usize;
                let variable = edits.swap_remove(index);
                solver.remove_edit_variable(variable).unwrap();
                trace.push(format!("{step}: unedit {variable}"));
            }
        } else if roll < 88 {
            if !edits.is_empty() {
                let index = lcg.below(edits.len() as u64) as usize;
                let value = lcg.below(201) as f64 - 100.0;
                solver.suggest_value(edits[index], value).unwrap();
                trace.push(format!("{step}: suggest {value}"));
            }
        } else {
            for (variable, value) in solver.flush_updates().unwrap() {
                trace.push(format!("{step}: {variable} = {value}"));
            }
        }
        solver.check_invariants().unwrap();
    }

    for (variable, value) in solver.flush_updates().unwrap() {
        trace.push(format!("end: {variable} = {value}"));
    }
    solver.check_invariants().unwrap();
    trace
}

// ── Tests ───────────────────────────────────────────────────────────────

#[test]
fn seed_corpus_stays_clean() {
    for seed in [1, 2, 3, 42, 99, 0x5EED, 123_456_789, 0xDEAD_BEEF] {
        run_session(seed, 120, false);
    }
}

#[test]
fn paranoid_mode_agrees_with_explicit_checks() {
    for seed in [7, 11, 0xFEED] {
        assert_eq!(run_session(seed, 80, true), run_session(seed, 80, false));
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn identical_histories_replay_identically(seed in any::<u64>(), steps in 20usize..80) {
        let first = run_session(seed, steps, false);
        let second = run_session(seed, steps, false);
        prop_assert_eq!(first, second);
    }
}
