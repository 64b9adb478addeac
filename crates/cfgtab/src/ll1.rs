//! Construction of LL(1) parse tables from predict sets.

pub mod driver;

use crate::{
    grammar::{Grammar, Production, ProductionID, Symbol},
    types::{Map, Set},
    util::display_fn,
};
use std::fmt;

/// Two productions of the same nonterminal are predicted by the same lookahead.
#[derive(Debug, thiserror::Error)]
#[error(
    "the grammar is not LL(1): conflict at ({}, {}) between `{}' and `{}'",
    nonterminal,
    lookahead,
    existing,
    rejected
)]
pub struct LL1Conflict {
    pub nonterminal: Symbol,
    pub lookahead: Symbol,
    pub existing: Production,
    pub rejected: Production,
}

/// The LL(1) parse table, mapping `(nonterminal, lookahead)` to a production.
#[derive(Debug, Default)]
pub struct LL1Table {
    table: Map<Symbol, Map<Symbol, ProductionID>>,
}

impl LL1Table {
    pub fn has_entry(&self, nonterminal: &Symbol, lookahead: &Symbol) -> bool {
        self.entry_for(nonterminal, lookahead).is_some()
    }

    pub fn entry_for(&self, nonterminal: &Symbol, lookahead: &Symbol) -> Option<ProductionID> {
        self.table.get(nonterminal)?.get(lookahead).copied()
    }

    /// All entries, row by row.
    pub fn entries(&self) -> impl Iterator<Item = (&Symbol, &Symbol, ProductionID)> + '_ {
        self.table
            .iter()
            .flat_map(|(n, row)| row.iter().map(move |(t, p)| (n, t, *p)))
    }

    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| {
            for (n, row) in &self.table {
                writeln!(f, "## {}", n)?;
                let mut row: Vec<_> = row.iter().collect();
                row.sort_by(|a, b| a.0.cmp(b.0));
                for (t, p) in row {
                    writeln!(f, "- {} => {}", t, g.production(*p))?;
                }
            }
            Ok(())
        })
    }
}

/// Build the LL(1) table, failing at the first conflicting cell.
#[tracing::instrument(skip_all)]
pub fn generate(g: &Grammar) -> Result<LL1Table, LL1Conflict> {
    let mut table = LL1Table::default();
    for n in g.nonterminals() {
        for production in g.productions_of(n) {
            for t in g.predict_set_of(production) {
                let row = table.table.entry(n.clone()).or_default();
                match row.get(&t) {
                    Some(&existing) if existing != production.id() => {
                        return Err(LL1Conflict {
                            nonterminal: n.clone(),
                            lookahead: t,
                            existing: g.production(existing).clone(),
                            rejected: production.clone(),
                        });
                    }
                    Some(_) => (),
                    None => {
                        tracing::trace!("({}, {}) => {}", n, t, production);
                        row.insert(t, production.id());
                    }
                }
            }
        }
    }
    tracing::debug!("{} LL(1) entries", table.entries().count());
    Ok(table)
}

/// Whether the predict sets of each nonterminal's productions are pairwise disjoint.
pub fn predict_sets_disjoint(g: &Grammar) -> Map<Symbol, bool> {
    g.nonterminals()
        .map(|n| {
            let mut seen = Set::default();
            let disjoint = g
                .productions_of(n)
                .flat_map(|p| g.predict_set_of(p))
                .all(|t| seen.insert(t));
            (n.clone(), disjoint)
        })
        .collect()
}
