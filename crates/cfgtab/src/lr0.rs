//! The canonical collection of LR(0) item sets.

use crate::{
    grammar::{Grammar, ProductionID, Symbol},
    types::{Map, Set},
    util::display_fn,
};
use std::{collections::VecDeque, fmt};

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateID(usize);
impl fmt::Debug for StateID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S#{:03}", self.0)
    }
}
impl StateID {
    pub const fn from_raw(raw: usize) -> Self {
        Self(raw)
    }

    pub const fn into_raw(self) -> usize {
        self.0
    }
}

/// The LR(0) item, a production with a progress marker.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LR0Item {
    pub production: ProductionID,
    pub index: u16,
}

impl LR0Item {
    /// `A -> . X1 X2 ... Xn`
    pub const fn fresh(production: ProductionID) -> Self {
        Self {
            production,
            index: 0,
        }
    }

    /// The symbol immediately after the progress marker.
    pub fn next_symbol<'g>(&self, g: &'g Grammar) -> Option<&'g Symbol> {
        g.production(self.production)
            .right()
            .get(usize::from(self.index))
    }

    /// Whether the progress marker is at the end of the production.
    pub fn is_complete(&self, g: &Grammar) -> bool {
        usize::from(self.index) == g.production(self.production).right().len()
    }

    /// Whether this item calls for a reduction: either complete, or an empty production.
    pub fn is_reducible(&self, g: &Grammar) -> bool {
        self.is_complete(g) || g.production(self.production).is_empty()
    }

    fn advance(self) -> Self {
        Self {
            index: self.index + 1,
            ..self
        }
    }

    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| {
            let production = g.production(self.production);
            write!(f, "{} -> [", production.left())?;
            for (i, r) in production.right().iter().enumerate() {
                if i == usize::from(self.index) {
                    f.write_str(" .")?;
                }
                write!(f, " {}", r)?;
            }
            if self.is_complete(g) {
                f.write_str(" .")?;
            }
            f.write_str(" ]")
        })
    }
}

/// A set of LR(0) items, compared by content.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ItemSet {
    // sorted, without duplicates
    items: Vec<LR0Item>,
}

impl ItemSet {
    pub fn iter(&self) -> impl Iterator<Item = &LR0Item> + '_ {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains(&self, item: &LR0Item) -> bool {
        self.items.binary_search(item).is_ok()
    }

    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| {
            for item in &self.items {
                writeln!(f, "- {}", item.display(g))?;
            }
            Ok(())
        })
    }
}

impl FromIterator<LR0Item> for ItemSet {
    fn from_iter<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = LR0Item>,
    {
        let mut items: Vec<_> = iter.into_iter().collect();
        items.sort_unstable();
        items.dedup();
        Self { items }
    }
}

/// `Closure(I)`: add a fresh item for every production of each nonterminal
/// that appears right after a progress marker, until nothing changes.
pub fn closure(g: &Grammar, set: &ItemSet) -> ItemSet {
    let mut items: Set<LR0Item> = set.iter().copied().collect();
    let mut i = 0;
    while i < items.len() {
        let item = items[i];
        if let Some(n) = item.next_symbol(g).filter(|s| s.is_nonterminal()) {
            for production in g.productions_of(n) {
                items.insert(LR0Item::fresh(production.id()));
            }
        }
        i += 1;
    }
    items.into_iter().collect()
}

/// `Goto(I, X)`: advance every item of `I` expecting `X`, then take the closure.
pub fn goto(g: &Grammar, set: &ItemSet, symbol: &Symbol) -> ItemSet {
    let kernel: ItemSet = set
        .iter()
        .filter(|item| item.next_symbol(g) == Some(symbol))
        .map(|item| item.advance())
        .collect();
    if kernel.is_empty() {
        return kernel;
    }
    closure(g, &kernel)
}

#[derive(Debug, Clone)]
pub struct LR0State {
    pub items: ItemSet,
    pub transitions: Map<Symbol, StateID>,
}

impl LR0State {
    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| {
            writeln!(f, "## items:")?;
            write!(f, "{}", self.items.display(g))?;
            if !self.transitions.is_empty() {
                writeln!(f, "## transitions:")?;
                for (symbol, next) in &self.transitions {
                    writeln!(f, "- {} => {:?}", symbol, next)?;
                }
            }
            Ok(())
        })
    }
}

/// The LR(0) automaton. States are numbered in order of discovery.
#[derive(Debug)]
pub struct LR0Automaton {
    states: Vec<LR0State>,
}

impl LR0Automaton {
    /// The canonical collection, indexed by `StateID`.
    pub fn states(&self) -> &[LR0State] {
        &self.states[..]
    }

    pub fn state(&self, id: StateID) -> &LR0State {
        &self.states[id.0]
    }

    /// The state reached from `state` on `symbol`, if any.
    pub fn goto(&self, state: StateID, symbol: &Symbol) -> Option<StateID> {
        self.states.get(state.0)?.transitions.get(symbol).copied()
    }

    /// The state whose item set equals `set`.
    pub fn find(&self, set: &ItemSet) -> Option<StateID> {
        self.states
            .iter()
            .position(|state| state.items == *set)
            .map(StateID)
    }

    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| {
            for (i, state) in self.states.iter().enumerate() {
                if i > 0 {
                    writeln!(f)?;
                }
                writeln!(f, "#### State {:?}", StateID(i))?;
                write!(f, "{}", state.display(g))?;
            }
            Ok(())
        })
    }
}

/// Calculate the LR(0) automaton based on the specified grammar.
///
/// State 0 is the closure of the first production of the start symbol.
#[tracing::instrument(skip_all)]
pub fn lr0(g: &Grammar) -> LR0Automaton {
    let start = g.start_symbol();
    let mut start_productions = g.productions_of(start);
    let Some(seed) = start_productions.next() else {
        return LR0Automaton { states: vec![] };
    };
    if start_productions.next().is_some() {
        tracing::warn!(
            "the start symbol `{}' has multiple productions; only `{}' seeds the automaton",
            start,
            seed
        );
    }

    let symbols = g.all_grammar_symbols();
    let initial = closure(g, &Some(LR0Item::fresh(seed.id())).into_iter().collect());

    let mut states = vec![LR0State {
        items: initial.clone(),
        transitions: Map::default(),
    }];
    let mut isocores = Map::<ItemSet, StateID>::default();
    isocores.insert(initial, StateID(0));

    let mut pending_states = VecDeque::from([StateID(0)]);
    while let Some(current) = pending_states.pop_front() {
        let mut transitions = Map::default();
        for symbol in &symbols {
            let next_items = goto(g, &states[current.0].items, symbol);
            if next_items.is_empty() {
                continue;
            }
            let next = match isocores.get(&next_items) {
                Some(id) => *id,
                None => {
                    let id = StateID(states.len());
                    tracing::trace!("{:?} --({})--> {:?} (new)", current, symbol, id);
                    isocores.insert(next_items.clone(), id);
                    states.push(LR0State {
                        items: next_items,
                        transitions: Map::default(),
                    });
                    pending_states.push_back(id);
                    id
                }
            };
            transitions.insert(symbol.clone(), next);
        }
        states[current.0].transitions = transitions;
    }
    tracing::debug!("{} LR(0) state(s)", states.len());

    LR0Automaton { states }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(label: &str) -> Symbol {
        Symbol::new(label).unwrap()
    }

    fn postfix() -> Grammar {
        Grammar::from_str(
            "\
START -> E $
E -> plus E E
   | num
",
        )
        .unwrap()
    }

    fn item(g: &Grammar, left: &str, alt: usize, index: u16) -> LR0Item {
        let production = g.productions_of(&s(left)).nth(alt).unwrap();
        LR0Item {
            production: production.id(),
            index,
        }
    }

    #[test]
    fn canonical_collection() {
        let g = postfix();
        let lr0 = lr0(&g);
        assert_eq!(lr0.states().len(), 7);

        let state0: ItemSet = [
            item(&g, "START", 0, 0),
            item(&g, "E", 0, 0),
            item(&g, "E", 1, 0),
        ]
        .into_iter()
        .collect();
        assert_eq!(lr0.states()[0].items, state0);

        let expected: Vec<ItemSet> = vec![
            [item(&g, "E", 1, 1)].into_iter().collect(),
            [item(&g, "E", 0, 0), item(&g, "E", 0, 1), item(&g, "E", 1, 0)]
                .into_iter()
                .collect(),
            [item(&g, "START", 0, 1)].into_iter().collect(),
            [item(&g, "E", 0, 0), item(&g, "E", 0, 2), item(&g, "E", 1, 0)]
                .into_iter()
                .collect(),
            [item(&g, "START", 0, 2)].into_iter().collect(),
            [item(&g, "E", 0, 3)].into_iter().collect(),
        ];
        for set in &expected {
            assert!(lr0.find(set).is_some(), "missing state:\n{}", set.display(&g));
        }
    }

    #[test]
    fn goto_from_initial_state() {
        let g = postfix();
        let lr0 = lr0(&g);
        let state0 = &lr0.states()[0].items;

        let goto_e = goto(&g, state0, &s("E"));
        assert_eq!(goto_e, [item(&g, "START", 0, 1)].into_iter().collect());
        let goto_num = goto(&g, state0, &s("num"));
        assert_eq!(goto_num, [item(&g, "E", 1, 1)].into_iter().collect());
        assert!(goto(&g, state0, &s("$")).is_empty());

        let s0 = StateID::from_raw(0);
        assert_eq!(lr0.goto(s0, &s("E")), lr0.find(&goto_e));
        assert_eq!(lr0.goto(s0, &s("num")), lr0.find(&goto_num));
        assert_eq!(lr0.goto(s0, &s("$")), None);

        // Structure: `plus` loops back from both `plus` states.
        let s_plus = lr0.goto(s0, &s("plus")).unwrap();
        assert_eq!(lr0.goto(s_plus, &s("plus")), Some(s_plus));
        let s_plus_e = lr0.goto(s_plus, &s("E")).unwrap();
        assert_eq!(lr0.goto(s_plus_e, &s("plus")), Some(s_plus));
        assert_eq!(lr0.goto(s_plus_e, &s("num")), lr0.goto(s0, &s("num")));
    }

    #[test]
    fn closure_is_idempotent() {
        let g = postfix();
        let lr0 = lr0(&g);
        for state in lr0.states() {
            let once = closure(&g, &state.items);
            assert_eq!(closure(&g, &once), once);
            assert_eq!(once, state.items);
        }
        let kernel: ItemSet = [item(&g, "E", 0, 2)].into_iter().collect();
        let once = closure(&g, &kernel);
        assert_eq!(once.len(), 3);
        assert_eq!(closure(&g, &once), once);
    }

    #[test]
    fn goto_ignores_item_order() {
        let g = postfix();
        let items = [item(&g, "E", 0, 0), item(&g, "E", 0, 1), item(&g, "E", 1, 0)];
        let forward: ItemSet = items.iter().copied().collect();
        let backward: ItemSet = items.iter().rev().copied().collect();
        for symbol in g.all_grammar_symbols() {
            assert_eq!(goto(&g, &forward, &symbol), goto(&g, &backward, &symbol));
        }
    }

    #[test]
    fn empty_production_items() {
        let g = Grammar::from_str("S -> A $\nA -> a A | lambda").unwrap();
        let lr0 = lr0(&g);
        let state0 = &lr0.states()[0].items;
        let lambda = item(&g, "A", 1, 0);
        assert!(state0.contains(&lambda));
        assert!(lambda.is_reducible(&g));
        assert!(!lambda.is_complete(&g));
        assert_eq!(lambda.next_symbol(&g), Some(&Symbol::empty_marker()));
        assert_eq!(lr0.goto(StateID::from_raw(0), &Symbol::empty_marker()), None);
        assert_eq!(lambda.display(&g).to_string(), "A -> [ . lambda ]");
    }

    #[test]
    fn longest_right_hand_side() {
        let len = usize::from(u16::MAX);
        let g = Grammar::define(|g| {
            g.rule("S", vec!["a"; len])?;
            Ok(())
        })
        .unwrap();
        let lr0 = lr0(&g);
        assert_eq!(lr0.states().len(), len + 1);
        let last = &lr0.states()[len].items;
        assert!(last.iter().all(|item| item.is_complete(&g)));
    }

    #[test]
    fn seeds_from_first_production_only() {
        let g = Grammar::from_str("S -> a | b").unwrap();
        let lr0 = lr0(&g);
        assert_eq!(lr0.states().len(), 2);
        assert_eq!(lr0.states()[0].items.len(), 1);
        assert_eq!(lr0.goto(StateID::from_raw(0), &s("b")), None);
    }
}
