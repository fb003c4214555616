//! Tableau rows.
//!
//! A [`Row`] stores one linear equation in solved form: the basic symbol
//! it is keyed under (held by the solver, not the row) equals `constant`
//! plus the weighted sum of the non-basic symbols in `cells`. Cells live
//! in a `BTreeMap` keyed by symbol so every scan over a row visits
//! symbols in their total order, which is what makes pivot tie-breaks
//! deterministic.
//!
//! # Key Invariant
//!
//! A cell with a near-zero coefficient is removed at the moment it is
//! produced. Code elsewhere may therefore treat "present in `cells`" as
//! "has a meaningful coefficient".

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use crate::symbol::{Symbol, SymbolKind};

/// Coefficients and constants below this magnitude are treated as zero.
pub(crate) const EPSILON: f64 = 1e-8;

pub(crate) fn near_zero(value: f64) -> bool {
    value.abs() < EPSILON
}

#[derive(Debug, Clone, Default)]
pub(crate) struct Row {
    constant: f64,
    cells: BTreeMap<Symbol, f64>,
}

impl Row {
    pub(crate) fn new(constant: f64) -> Self {
        Self { constant, cells: BTreeMap::new() }
    }

    #[must_use]
    pub(crate) fn constant(&self) -> f64 {
        self.constant
    }

    #[must_use]
    pub(crate) fn cells(&self) -> &BTreeMap<Symbol, f64> {
        &self.cells
    }

    #[must_use]
    pub(crate) fn coefficient_for(&self, symbol: Symbol) -> f64 {
        self.cells.get(&symbol).copied().unwrap_or(0.0)
    }

    /// Shift the constant, returning the new value.
    pub(crate) fn add(&mut self, value: f64) -> f64 {
        self.constant += value;
        self.constant
    }

    /// Merge `coefficient * symbol` into the row.
    pub(crate) fn insert_symbol(&mut self, symbol: Symbol, coefficient: f64) {
        match self.cells.entry(symbol) {
            Entry::Vacant(entry) => {
                if !near_zero(coefficient) {
                    entry.insert(coefficient);
                }
            }
            Entry::Occupied(mut entry) => {
                *entry.get_mut() += coefficient;
                if near_zero(*entry.get()) {
                    entry.remove();
                }
            }
        }
    }

    /// Merge `coefficient * other` into the row, cell by cell.
    pub(crate) fn insert_row(&mut self, other: &Row, coefficient: f64) {
        self.constant += other.constant * coefficient;
        for (&symbol, &value) in &other.cells {
            self.insert_symbol(symbol, value * coefficient);
        }
    }

    pub(crate) fn remove_symbol(&mut self, symbol: Symbol) {
        self.cells.remove(&symbol);
    }

    pub(crate) fn reverse_sign(&mut self) {
        self.constant = -self.constant;
        for value in self.cells.values_mut() {
            *value = -*value;
        }
    }

    /// Rearrange the row so `symbol` becomes its basic symbol.
    ///
    /// The row currently reads `0 = constant + ... + coefficient * symbol`;
    /// afterwards it reads `symbol = constant' + ...` with `symbol` removed
    /// from the cells. The caller must ensure `symbol` has a non-zero
    /// coefficient; a zero here is an internal logic error.
    pub(crate) fn solve_for_symbol(&mut self, symbol: Symbol) {
        let coefficient = self.cells.remove(&symbol).unwrap_or(0.0);
        debug_assert!(
            !near_zero(coefficient),
            "solve_for_symbol requires a live cell for {symbol}"
        );
        let factor = -1.0 / coefficient;
        self.constant *= factor;
        for value in self.cells.values_mut() {
            *value *= factor;
        }
    }

    /// Pivot: the row currently defines `lhs`; rewrite it to define `rhs`.
    ///
    /// `lhs` re-enters the cells with coefficient -1 and the row is then
    /// solved for `rhs`.
    pub(crate) fn solve_for_symbols(&mut self, lhs: Symbol, rhs: Symbol) {
        self.insert_symbol(lhs, -1.0);
        self.solve_for_symbol(rhs);
    }

    /// Replace `symbol` with the row that now defines it.
    pub(crate) fn substitute(&mut self, symbol: Symbol, row: &Row) {
        if let Some(coefficient) = self.cells.remove(&symbol) {
            self.insert_row(row, coefficient);
        }
    }

    // ── Scans used by pivot selection ───────────────────────────────────

    /// True when every cell is a dummy symbol.
    #[must_use]
    pub(crate) fn all_dummies(&self) -> bool {
        self.cells.keys().all(|s| s.kind() == SymbolKind::Dummy)
    }

    /// The lowest slack or error symbol in the row, if any.
    #[must_use]
    pub(crate) fn any_pivotable_symbol(&self) -> Option<Symbol> {
        self.cells.keys().copied().find(|s| s.is_pivotable())
    }

    /// Entering symbol for a primal step on this objective row.
    ///
    /// Picks the most negative non-dummy coefficient. Cells iterate in
    /// symbol order and the comparison is strict, so equal coefficients
    /// keep the lowest symbol.
    #[must_use]
    pub(crate) fn entering_symbol(&self) -> Option<Symbol> {
        let mut best: Option<(Symbol, f64)> = None;
        for (&symbol, &value) in &self.cells {
            if symbol.kind() == SymbolKind::Dummy || value >= 0.0 {
                continue;
            }
            match best {
                Some((_, best_value)) if value >= best_value => {}
                _ => best = Some((symbol, value)),
            }
        }
        best.map(|(symbol, _)| symbol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn external(id: u64) -> Symbol {
        Symbol::new(SymbolKind::External, id)
    }

    fn slack(id: u64) -> Symbol {
        Symbol::new(SymbolKind::Slack, id)
    }

    fn error(id: u64) -> Symbol {
        Symbol::new(SymbolKind::Error, id)
    }

    fn dummy(id: u64) -> Symbol {
        Symbol::new(SymbolKind::Dummy, id)
    }

    // ── Cell maintenance ────────────────────────────────────────────────

    #[test]
    fn insert_symbol_accumulates_and_cancels() {
        let mut row = Row::new(0.0);
        row.insert_symbol(external(1), 2.0);
        row.insert_symbol(external(1), 3.0);
        assert_eq!(row.coefficient_for(external(1)), 5.0);

        row.insert_symbol(external(1), -5.0);
        assert!(row.cells().is_empty(), "cancelled cells are dropped");
    }

    #[test]
    fn insert_symbol_ignores_near_zero_fresh_cells() {
        let mut row = Row::new(0.0);
        row.insert_symbol(external(1), 1e-12);
        assert!(row.cells().is_empty());
        assert_eq!(row.coefficient_for(external(1)), 0.0);
    }

    #[test]
    fn insert_row_scales_everything() {
        let mut a = Row::new(4.0);
        a.insert_symbol(external(1), 1.0);
        let mut b = Row::new(10.0);
        b.insert_symbol(external(1), 2.0);
        b.insert_symbol(slack(2), -1.0);

        a.insert_row(&b, 0.5);
        assert_eq!(a.constant(), 9.0);
        assert_eq!(a.coefficient_for(external(1)), 2.0);
        assert_eq!(a.coefficient_for(slack(2)), -0.5);
    }

    #[test]
    fn reverse_sign_flips_constant_and_cells() {
        let mut row = Row::new(-3.0);
        row.insert_symbol(external(1), 2.0);
        row.reverse_sign();
        assert_eq!(row.constant(), 3.0);
        assert_eq!(row.coefficient_for(external(1)), -2.0);
    }

    // ── Solving and substitution ────────────────────────────────────────

    #[test]
    fn solve_for_symbol_rearranges_the_equation() {
        // 0 = 10 - 2x + s  becomes  x = 5 + s/2
        let mut row = Row::new(10.0);
        row.insert_symbol(external(1), -2.0);
        row.insert_symbol(slack(2), 1.0);

        row.solve_for_symbol(external(1));
        assert_eq!(row.constant(), 5.0);
        assert_eq!(row.coefficient_for(slack(2)), 0.5);
        assert_eq!(row.coefficient_for(external(1)), 0.0);
    }

    #[test]
    fn solve_for_symbols_pivots_between_bases() {
        // x = 8 - s  pivoted so s becomes basic: s = 8 - x
        let mut row = Row::new(8.0);
        row.insert_symbol(slack(2), -1.0);

        row.solve_for_symbols(external(1), slack(2));
        assert_eq!(row.constant(), 8.0);
        assert_eq!(row.coefficient_for(external(1)), -1.0);
        assert_eq!(row.coefficient_for(slack(2)), 0.0);
    }

    #[test]
    fn substitute_replaces_a_cell_with_a_row() {
        // y = 2 + 3x, with x = 4 + s, gives y = 14 + 3s
        let mut target = Row::new(2.0);
        target.insert_symbol(external(1), 3.0);
        let mut def = Row::new(4.0);
        def.insert_symbol(slack(2), 1.0);

        target.substitute(external(1), &def);
        assert_eq!(target.constant(), 14.0);
        assert_eq!(target.coefficient_for(slack(2)), 3.0);
        assert_eq!(target.coefficient_for(external(1)), 0.0);
    }

    #[test]
    fn substitute_without_the_cell_is_a_no_op() {
        let mut target = Row::new(2.0);
        target.insert_symbol(external(1), 3.0);
        let def = Row::new(4.0);

        target.substitute(external(9), &def);
        assert_eq!(target.constant(), 2.0);
        assert_eq!(target.coefficient_for(external(1)), 3.0);
    }

    #[test]
    fn substitution_that_cancels_drops_the_cell() {
        // y = 1 + x + s, with x = -s, gives y = 1
        let mut target = Row::new(1.0);
        target.insert_symbol(external(1), 1.0);
        target.insert_symbol(slack(2), 1.0);
        let mut def = Row::new(0.0);
        def.insert_symbol(slack(2), -1.0);

        target.substitute(external(1), &def);
        assert_eq!(target.constant(), 1.0);
        assert!(target.cells().is_empty());
    }

    // ── Pivot scans ─────────────────────────────────────────────────────

    #[test]
    fn all_dummies_and_pivotable() {
        let mut row = Row::new(0.0);
        row.insert_symbol(dummy(1), 1.0);
        assert!(row.all_dummies());
        assert_eq!(row.any_pivotable_symbol(), None);

        row.insert_symbol(error(2), 1.0);
        assert!(!row.all_dummies());
        assert_eq!(row.any_pivotable_symbol(), Some(error(2)));
    }

    #[test]
    fn any_pivotable_prefers_the_lowest_symbol() {
        let mut row = Row::new(0.0);
        row.insert_symbol(error(9), 1.0);
        row.insert_symbol(slack(3), 1.0);
        row.insert_symbol(slack(7), 1.0);
        assert_eq!(row.any_pivotable_symbol(), Some(slack(3)));
    }

    #[test]
    fn entering_symbol_takes_most_negative_non_dummy() {
        let mut row = Row::new(0.0);
        row.insert_symbol(dummy(0), -9.0);
        row.insert_symbol(slack(1), -2.0);
        row.insert_symbol(error(2), -5.0);
        row.insert_symbol(slack(3), 4.0);
        assert_eq!(row.entering_symbol(), Some(error(2)));
    }

    #[test]
    fn entering_symbol_breaks_ties_toward_lower_symbols() {
        let mut row = Row::new(0.0);
        row.insert_symbol(slack(5), -2.0);
        row.insert_symbol(slack(2), -2.0);
        assert_eq!(row.entering_symbol(), Some(slack(2)));
    }

    #[test]
    fn entering_symbol_none_when_optimal() {
        let mut row = Row::new(3.0);
        row.insert_symbol(slack(1), 2.0);
        row.insert_symbol(dummy(2), -1.0);
        assert_eq!(row.entering_symbol(), None);
    }
}
