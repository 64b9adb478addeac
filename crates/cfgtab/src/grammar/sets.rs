//! Calculation of nullable, FIRST and FOLLOW sets.

use super::{Grammar, Production, ProductionID, Symbol};
use crate::types::{Map, Set};
use std::collections::VecDeque;

/// Calculate the set of nonterminals deriving the empty string.
#[tracing::instrument(skip_all)]
pub(super) fn nullables(g: &Grammar) -> Set<Symbol> {
    let nulls: Set<Symbol> = g
        .nonterminals()
        .filter(|n| derives_to_empty(g, n))
        .cloned()
        .collect();
    tracing::debug!("{} nullable symbol(s)", nulls.len());
    nulls
}

/// A pending `derives_to_empty` query on one nonterminal.
struct Frame<'g> {
    /// The `(production, symbol)` occurrence this query was entered through.
    via: Option<(ProductionID, Symbol)>,
    productions: Vec<&'g Production>,
    current: usize,
    position: usize,
}

impl<'g> Frame<'g> {
    fn enter(g: &'g Grammar, symbol: &Symbol, via: Option<(ProductionID, Symbol)>) -> Self {
        Self {
            via,
            productions: g.productions_of(symbol).collect(),
            current: 0,
            position: 0,
        }
    }

    fn next_production(&mut self) {
        self.current += 1;
        self.position = 0;
    }
}

/// Whether `symbol` derives the empty string, searched depth-first over an
/// explicit stack of frames.
///
/// An occurrence `(production, symbol)` that is already being expanded on the
/// current path is taken as deriving the empty string, so cycles of
/// nonterminal-only productions such as `A -> B`, `B -> A` count as nullable.
fn derives_to_empty(g: &Grammar, symbol: &Symbol) -> bool {
    let mut in_progress: Set<(ProductionID, Symbol)> = Set::default();
    let mut frames = vec![Frame::enter(g, symbol, None)];
    let mut returned: Option<bool> = None;

    while let Some(frame) = frames.last_mut() {
        match returned.take() {
            Some(true) => frame.position += 1,
            Some(false) => frame.next_production(),
            None => (),
        }

        // `Some(result)` finishes this frame, `None` descends into the symbol at `position`.
        let result = loop {
            let Some(production) = frame.productions.get(frame.current).copied() else {
                break Some(false);
            };
            if production.is_empty() {
                break Some(true);
            }
            if frame.position == 0 && production.contains_terminal() {
                frame.next_production();
                continue;
            }
            match production.right().get(frame.position) {
                None => break Some(true),
                Some(x) if in_progress.contains(&(production.id(), x.clone())) => {
                    frame.position += 1;
                }
                Some(_) => break None,
            }
        };

        match result {
            Some(result) => {
                if let Some(via) = frames.pop().and_then(|frame| frame.via) {
                    in_progress.swap_remove(&via);
                }
                returned = Some(result);
            }
            None => {
                let production = frame.productions[frame.current];
                let x = &production.right()[frame.position];
                let via = (production.id(), x.clone());
                tracing::trace!("{} -> ... {} ...: descend", production.left(), x);
                in_progress.insert(via.clone());
                frames.push(Frame::enter(g, x, Some(via)));
            }
        }
    }

    returned.unwrap_or(false)
}

/// An inclusion `sup ⊇ sub` between two sets of the same family.
#[derive(Debug)]
struct Constraint {
    sup: Symbol,
    sub: Symbol,
}

/// Constraint indices waiting to be revisited, each queued at most once at a time.
struct Worklist {
    queue: VecDeque<usize>,
    queued: Vec<bool>,
}

impl Worklist {
    fn full(len: usize) -> Self {
        Self {
            queue: (0..len).collect(),
            queued: vec![true; len],
        }
    }

    fn push(&mut self, i: usize) {
        if !self.queued[i] {
            self.queued[i] = true;
            self.queue.push_back(i);
        }
    }

    fn pop(&mut self) -> Option<usize> {
        let i = self.queue.pop_front()?;
        self.queued[i] = false;
        Some(i)
    }
}

/// Propagate the set elements along the constraints until nothing changes.
///
/// A constraint is revisited only when the set on its `sub` side has grown.
fn solve(map: &mut Map<Symbol, Set<Symbol>>, constraints: &[Constraint]) {
    let mut dependents: Map<&Symbol, Vec<usize>> = Map::default();
    for (i, c) in constraints.iter().enumerate() {
        dependents.entry(&c.sub).or_default().push(i);
    }

    let mut queue = Worklist::full(constraints.len());
    let mut steps = 0;
    while let Some(i) = queue.pop() {
        steps += 1;
        let Constraint { sup, sub } = &constraints[i];
        let added: Vec<Symbol> = match (map.get(sub), map.get(sup)) {
            (Some(subset), Some(superset)) => subset
                .iter()
                .filter(|s| !superset.contains(*s))
                .cloned()
                .collect(),
            (Some(subset), None) => subset.iter().cloned().collect(),
            (None, _) => continue,
        };
        if added.is_empty() {
            continue;
        }
        tracing::trace!("{:?} += {:?} (from {:?})", sup, added, sub);
        map.entry(sup.clone()).or_default().extend(added);
        for &j in dependents.get(sup).into_iter().flatten() {
            queue.push(j);
        }
    }
    tracing::debug!("solved {} constraint(s) in {} step(s)", constraints.len(), steps);
}

/// Constructs the FIRST set of every symbol in this grammar.
#[tracing::instrument(skip_all)]
pub(super) fn first_sets(g: &Grammar, nulls: &Set<Symbol>) -> Map<Symbol, Set<Symbol>> {
    let mut map: Map<Symbol, Set<Symbol>> = Map::default();

    // First(t) = {t} for terminals and the end marker.
    for t in g.terminals().cloned().chain(Some(Symbol::end_marker())) {
        map.insert(t.clone(), Some(t).into_iter().collect());
    }

    // First(N) = {} for nonterminals until the constraints say otherwise.
    for n in g.nonterminals() {
        map.insert(n.clone(), Set::default());
    }

    // For X -> Y1 Y2 ... Yn, let Yk be the first non-nullable symbol.
    // Then First(X) ⊇ First(Yi) for every i = 1, ..., k.
    let mut constraints = vec![];
    for production in g.productions() {
        if production.is_empty() {
            continue;
        }
        for symbol in production.right() {
            if production.left() != symbol {
                constraints.push(Constraint {
                    sup: production.left().clone(),
                    sub: symbol.clone(),
                });
            }
            if !nulls.contains(symbol) {
                break;
            }
        }
    }

    solve(&mut map, &constraints);
    map
}

/// `First(X1 X2 ... Xk)` based on precomputed tables.
pub(super) fn first_of(
    symbols: &[Symbol],
    nulls: &Set<Symbol>,
    first_sets: &Map<Symbol, Set<Symbol>>,
) -> Set<Symbol> {
    let mut res = Set::default();
    for symbol in symbols {
        if symbol.is_empty_marker() {
            continue;
        }
        if let Some(first) = first_sets.get(symbol) {
            res.extend(first.iter().cloned());
        }
        if !nulls.contains(symbol) {
            break;
        }
    }
    res
}

/// Constructs the FOLLOW set of every nonterminal in this grammar.
///
/// The end marker is never added implicitly; it only appears where the
/// grammar itself places `$` after a nonterminal.
#[tracing::instrument(skip_all)]
pub(super) fn follow_sets(
    g: &Grammar,
    nulls: &Set<Symbol>,
    first_sets: &Map<Symbol, Set<Symbol>>,
) -> Map<Symbol, Set<Symbol>> {
    let mut map: Map<Symbol, Set<Symbol>> = g
        .nonterminals()
        .map(|n| (n.clone(), Set::default()))
        .collect();

    // For A -> α B β:
    //  1. Follow(B) ⊇ First(β)
    //  2. Follow(B) ⊇ Follow(A) if β derives the empty string
    let mut constraints = vec![];
    for production in g.productions() {
        let right = production.right();
        for (i, symbol) in right.iter().enumerate() {
            if !symbol.is_nonterminal() {
                continue;
            }
            let beta = &right[i + 1..];
            let first = first_of(beta, nulls, first_sets);
            map.entry(symbol.clone()).or_default().extend(first);

            let beta_nullable = beta.iter().all(|s| nulls.contains(s));
            if beta_nullable && production.left() != symbol {
                constraints.push(Constraint {
                    sup: symbol.clone(),
                    sub: production.left().clone(),
                });
            }
        }
    }

    solve(&mut map, &constraints);
    map
}
