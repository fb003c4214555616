//! Tableau symbols.
//!
//! Every unknown the solver manipulates is a [`Symbol`]: either an external
//! variable the caller can observe, or one of the synthetic unknowns
//! (slack, error, dummy) introduced while compiling constraints into rows.
//! Symbols are ordered by `(kind, id)`; that total order is the tie-break
//! used by every pivot-selection rule, so it must be stable.

use std::fmt;

/// The role a symbol plays in the tableau.
///
/// Declaration order defines the tie-break order between kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) enum SymbolKind {
    /// A caller-visible variable.
    External,
    /// Margin of an inequality constraint.
    Slack,
    /// Weighted violation of a non-required constraint.
    Error,
    /// Placeholder marker for a required equality. Never pivoted into the
    /// basis by optimization.
    Dummy,
}

/// An opaque tableau unknown.
///
/// Fresh symbols come only from the solver's own monotonic counter; ids are
/// never reused across roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) struct Symbol {
    kind: SymbolKind,
    id: u64,
}

impl Symbol {
    pub(crate) fn new(kind: SymbolKind, id: u64) -> Self {
        Self { kind, id }
    }

    #[must_use]
    pub(crate) fn kind(self) -> SymbolKind {
        self.kind
    }

    #[must_use]
    pub(crate) fn id(self) -> u64 {
        self.id
    }

    /// Whether the symbol may be pivoted into the basis during
    /// optimization.
    #[must_use]
    pub(crate) fn is_pivotable(self) -> bool {
        matches!(self.kind, SymbolKind::Slack | SymbolKind::Error)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = match self.kind {
            SymbolKind::External => 'v',
            SymbolKind::Slack => 's',
            SymbolKind::Error => 'e',
            SymbolKind::Dummy => 'd',
        };
        write!(f, "{prefix}{}", self.id)
    }
}

/// Marker bookkeeping for a compiled constraint.
///
/// `marker` identifies the constraint's row in the tableau so the
/// constraint can later be removed; `other` is the paired slack or error
/// symbol, when the compilation produced one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Tag {
    pub(crate) marker: Symbol,
    pub(crate) other: Option<Symbol>,
}
