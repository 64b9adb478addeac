//! Calculation of SLR(1) action tables from the LR(0) automaton.

use crate::{
    grammar::{Grammar, Production, ProductionID, Symbol},
    lr0::{LR0Automaton, StateID},
    types::Map,
    util::display_fn,
};
use std::fmt;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum SLRAction {
    /// Consume the lookahead and go to the specified state.
    ShiftAndGoTo(StateID),
    /// Reduce with the specified production.
    ReduceWith(ProductionID),
    /// Reduce with a production of the start symbol and accept the input.
    ReduceWithAndAccept(ProductionID),
}

impl SLRAction {
    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| match self {
            Self::ShiftAndGoTo(n) => write!(f, "shift({:?})", n),
            Self::ReduceWith(p) => write!(f, "reduce({})", g.production(*p)),
            Self::ReduceWithAndAccept(p) => write!(f, "accept({})", g.production(*p)),
        })
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ConflictKind {
    ShiftReduce,
    ReduceReduce,
}

impl fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ShiftReduce => f.write_str("shift/reduce"),
            Self::ReduceReduce => f.write_str("reduce/reduce"),
        }
    }
}

/// A reduction collides with another action in the same cell.
#[derive(Debug, thiserror::Error)]
#[error(
    "the grammar is not SLR(1): {} conflict in state {:?} on `{}' ({:?} vs. reduce by `{}')",
    kind,
    state,
    symbol,
    existing,
    rejected
)]
pub struct SLRConflict {
    pub kind: ConflictKind,
    pub state: StateID,
    pub symbol: Symbol,
    pub existing: SLRAction,
    pub rejected: Production,
}

/// The SLR(1) action table, one row per LR(0) state.
#[derive(Debug)]
pub struct SLRActionTable {
    rows: Vec<Map<Symbol, SLRAction>>,
}

impl SLRActionTable {
    pub fn action_for(&self, state: StateID, symbol: &Symbol) -> Option<&SLRAction> {
        self.rows.get(state.into_raw())?.get(symbol)
    }

    pub fn row(&self, state: StateID) -> impl Iterator<Item = (&Symbol, &SLRAction)> + '_ {
        self.rows.get(state.into_raw()).into_iter().flatten()
    }

    pub fn num_states(&self) -> usize {
        self.rows.len()
    }

    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| {
            for (i, row) in self.rows.iter().enumerate() {
                if i > 0 {
                    writeln!(f)?;
                }
                writeln!(f, "#### State {:?}", StateID::from_raw(i))?;
                for (symbol, action) in row {
                    writeln!(f, "- {} => {}", symbol, action.display(g))?;
                }
            }
            Ok(())
        })
    }
}

/// Fill the action table for each state of `lr0`.
///
/// A state holding a completed production of the start symbol accepts on
/// every grammar symbol. Otherwise, the transitions become shifts and each
/// reducible item reduces on the FOLLOW set of its left-hand side.
#[tracing::instrument(skip_all)]
pub fn generate(g: &Grammar, lr0: &LR0Automaton) -> Result<SLRActionTable, SLRConflict> {
    let start = g.start_symbol();
    let symbols = g.all_grammar_symbols();
    let mut rows = Vec::with_capacity(lr0.states().len());

    for (i, state) in lr0.states().iter().enumerate() {
        let id = StateID::from_raw(i);
        let mut row = Map::default();

        let accept = state
            .items
            .iter()
            .find(|item| g.production(item.production).left() == start && item.is_complete(g));
        if let Some(item) = accept {
            tracing::trace!("{:?}: accept by {}", id, g.production(item.production));
            for symbol in &symbols {
                row.insert(symbol.clone(), SLRAction::ReduceWithAndAccept(item.production));
            }
            rows.push(row);
            continue;
        }

        for (symbol, next) in &state.transitions {
            row.insert(symbol.clone(), SLRAction::ShiftAndGoTo(*next));
        }

        for item in state.items.iter().filter(|item| item.is_reducible(g)) {
            let production = g.production(item.production);
            for symbol in g.follow_set_of(production.left()) {
                match row.get(&symbol) {
                    Some(SLRAction::ReduceWith(p)) if *p == production.id() => (),
                    Some(existing) => {
                        let kind = match existing {
                            SLRAction::ShiftAndGoTo(..) => ConflictKind::ShiftReduce,
                            _ => ConflictKind::ReduceReduce,
                        };
                        return Err(SLRConflict {
                            kind,
                            state: id,
                            symbol,
                            existing: *existing,
                            rejected: production.clone(),
                        });
                    }
                    None => {
                        row.insert(symbol, SLRAction::ReduceWith(production.id()));
                    }
                }
            }
        }

        rows.push(row);
    }

    Ok(SLRActionTable { rows })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lr0::lr0;

    fn s(label: &str) -> Symbol {
        Symbol::new(label).unwrap()
    }

    fn build(source: &str) -> (Grammar, LR0Automaton) {
        let g = Grammar::from_str(source).unwrap();
        let lr0 = lr0(&g);
        (g, lr0)
    }

    fn production_id(g: &Grammar, rule: &str) -> ProductionID {
        g.productions()
            .find(|p| p.to_string() == rule)
            .map(|p| p.id())
            .unwrap()
    }

    #[test]
    fn postfix_actions() {
        let (g, lr0) = build("START -> E $\nE -> plus E E | num");
        let table = generate(&g, &lr0).unwrap();
        assert_eq!(table.num_states(), 7);

        let s0 = StateID::from_raw(0);
        let s_e = lr0.goto(s0, &s("E")).unwrap();
        let s_num = lr0.goto(s0, &s("num")).unwrap();
        let s_plus = lr0.goto(s0, &s("plus")).unwrap();
        let s_accept = lr0.goto(s_e, &s("$")).unwrap();

        assert_eq!(
            table.action_for(s0, &s("num")),
            Some(&SLRAction::ShiftAndGoTo(s_num))
        );
        assert_eq!(
            table.action_for(s0, &s("plus")),
            Some(&SLRAction::ShiftAndGoTo(s_plus))
        );
        assert_eq!(
            table.action_for(s0, &s("E")),
            Some(&SLRAction::ShiftAndGoTo(s_e))
        );
        assert_eq!(table.action_for(s0, &s("$")), None);

        // FOLLOW(E) = { $, num, plus }
        let reduce_num = SLRAction::ReduceWith(production_id(&g, "E -> num"));
        for t in ["$", "num", "plus"] {
            assert_eq!(table.action_for(s_num, &s(t)), Some(&reduce_num));
        }
        assert_eq!(table.row(s_num).count(), 3);

        let accept = SLRAction::ReduceWithAndAccept(production_id(&g, "START -> E $"));
        for symbol in g.all_grammar_symbols() {
            assert_eq!(table.action_for(s_accept, &symbol), Some(&accept));
        }
        assert_eq!(table.row(s_accept).count(), 5);
    }

    #[test]
    fn expression_grammar_is_slr() {
        let (g, lr0) = build(
            "\
S -> E $
E -> E plus T | T
T -> T times F | F
F -> lp E rp | id
",
        );
        let table = generate(&g, &lr0).unwrap();

        let s_id = lr0.goto(StateID::from_raw(0), &s("id")).unwrap();
        let reduce_id = SLRAction::ReduceWith(production_id(&g, "F -> id"));
        for t in ["plus", "times", "rp", "$"] {
            assert_eq!(table.action_for(s_id, &s(t)), Some(&reduce_id));
        }
        assert_eq!(table.action_for(s_id, &s("lp")), None);

        // E -> T . and T -> T . times F share a state: shift on `times'.
        let s_t = lr0.goto(StateID::from_raw(0), &s("T")).unwrap();
        assert!(matches!(
            table.action_for(s_t, &s("times")),
            Some(SLRAction::ShiftAndGoTo(..))
        ));
        assert_eq!(
            table.action_for(s_t, &s("plus")),
            Some(&SLRAction::ReduceWith(production_id(&g, "E -> T")))
        );
    }

    #[test]
    fn empty_production_reduces_on_follow() {
        let (g, lr0) = build("S -> A $\nA -> a A | lambda");
        let table = generate(&g, &lr0).unwrap();
        let s0 = StateID::from_raw(0);
        assert_eq!(
            table.action_for(s0, &s("$")),
            Some(&SLRAction::ReduceWith(production_id(&g, "A -> lambda")))
        );
        assert!(matches!(
            table.action_for(s0, &s("a")),
            Some(SLRAction::ShiftAndGoTo(..))
        ));
        assert_eq!(table.action_for(s0, &Symbol::empty_marker()), None);
    }

    #[test]
    fn shift_reduce_conflict() {
        let (g, lr0) = build(
            "\
START -> S $
S -> L eq R | R
L -> star R | id
R -> L
",
        );
        let err = generate(&g, &lr0).unwrap_err();
        assert_eq!(err.kind, ConflictKind::ShiftReduce);
        assert_eq!(err.symbol, s("eq"));
        assert_eq!(err.rejected.to_string(), "R -> L");
        assert!(matches!(err.existing, SLRAction::ShiftAndGoTo(..)));
    }

    #[test]
    fn reduce_reduce_conflict() {
        let (g, lr0) = build(
            "\
START -> S $
S -> A a | B a
A -> x
B -> x
",
        );
        let err = generate(&g, &lr0).unwrap_err();
        assert_eq!(err.kind, ConflictKind::ReduceReduce);
        assert_eq!(err.symbol, s("a"));
        assert_eq!(
            err.existing,
            SLRAction::ReduceWith(production_id(&g, "A -> x"))
        );
        assert_eq!(err.rejected.to_string(), "B -> x");
    }
}
