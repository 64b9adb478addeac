//! Grammar types.

mod sets;

use crate::{
    syntax,
    types::{Map, Set},
    util::display_fn,
};
use std::{cell::OnceCell, fmt, fs, io, path::Path, sync::Arc};

/// The reserved label of the end-of-input marker.
pub const END_MARKER: &str = "$";

/// The reserved label of the empty-string marker.
pub const EMPTY_MARKER: &str = "lambda";

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    Terminal,
    Nonterminal,
    /// `lambda`, the right-hand side of an empty production.
    Empty,
    /// `$`, the end of input.
    EndMarker,
}

/// A grammar symbol.
///
/// The kind of a symbol is determined by its spelling alone: `$` is the end
/// marker, `lambda` is the empty marker, a label without any uppercase
/// character is a terminal and anything else is a nonterminal.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol {
    label: Arc<str>,
}

impl Symbol {
    pub fn new(label: &str) -> Result<Self, GrammarDefError> {
        let label = label.trim();
        if label.is_empty() {
            return Err(GrammarDefError::EmptyLabel);
        }
        Ok(Self {
            label: label.into(),
        })
    }

    pub fn end_marker() -> Self {
        Self {
            label: END_MARKER.into(),
        }
    }

    pub fn empty_marker() -> Self {
        Self {
            label: EMPTY_MARKER.into(),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn kind(&self) -> SymbolKind {
        match &*self.label {
            END_MARKER => SymbolKind::EndMarker,
            EMPTY_MARKER => SymbolKind::Empty,
            label if !label.chars().any(char::is_uppercase) => SymbolKind::Terminal,
            _ => SymbolKind::Nonterminal,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.kind() == SymbolKind::Terminal
    }

    pub fn is_nonterminal(&self) -> bool {
        self.kind() == SymbolKind::Nonterminal
    }

    pub fn is_empty_marker(&self) -> bool {
        self.kind() == SymbolKind::Empty
    }

    pub fn is_end_marker(&self) -> bool {
        self.kind() == SymbolKind::EndMarker
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct ProductionID {
    raw: u16,
}

impl ProductionID {
    #[inline]
    pub const fn from_raw(raw: u16) -> Self {
        Self { raw }
    }

    #[inline]
    pub const fn into_raw(self) -> u16 {
        self.raw
    }
}

impl fmt::Debug for ProductionID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P#{:03}", self.raw)
    }
}

/// The type that represents a production rule in grammar.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Production {
    id: ProductionID,
    left: Symbol,
    right: Vec<Symbol>,
}

impl Production {
    pub fn id(&self) -> ProductionID {
        self.id
    }

    /// Return the left-hand side of this production.
    pub fn left(&self) -> &Symbol {
        &self.left
    }

    /// Return the right-hand side of this production.
    pub fn right(&self) -> &[Symbol] {
        &self.right[..]
    }

    /// Whether this is the empty production `A -> lambda`.
    pub fn is_empty(&self) -> bool {
        matches!(&self.right[..], [s] if s.is_empty_marker())
    }

    /// Whether the right-hand side contains a terminal or the end marker.
    pub fn contains_terminal(&self) -> bool {
        self.right
            .iter()
            .any(|s| s.is_terminal() || s.is_end_marker())
    }
}

// `"LHS -> R1 R2 R3"`
impl fmt::Display for Production {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ->", self.left)?;
        for symbol in &self.right {
            write!(f, " {}", symbol)?;
        }
        Ok(())
    }
}

/// A context-free grammar, immutable once defined.
///
/// The derived sets (nullable symbols, FIRST and FOLLOW) are computed on
/// first access and cached for the lifetime of the grammar.
pub struct Grammar {
    productions: Map<ProductionID, Production>,
    rules: Map<Symbol, Vec<ProductionID>>,
    nonterminals: Set<Symbol>,
    terminals: Set<Symbol>,
    start_symbol: Symbol,
    nullables: OnceCell<Set<Symbol>>,
    first_sets: OnceCell<Map<Symbol, Set<Symbol>>>,
    follow_sets: OnceCell<Map<Symbol, Set<Symbol>>>,
}

impl fmt::Debug for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Grammar")
            .field("productions", &self.productions)
            .field("nonterminals", &self.nonterminals)
            .field("terminals", &self.terminals)
            .field("start_symbol", &self.start_symbol)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "## terminals:")?;
        for terminal in &self.terminals {
            writeln!(f, "{}", terminal)?;
        }

        writeln!(f, "\n## nonterminals:")?;
        for nonterminal in &self.nonterminals {
            write!(f, "{}", nonterminal)?;
            if *nonterminal == self.start_symbol {
                write!(f, " (start)")?;
            }
            writeln!(f)?;
        }

        writeln!(f, "\n## productions:")?;
        for (i, production) in self.productions.values().enumerate() {
            writeln!(f, "{}) {}", i + 1, production)?;
        }

        Ok(())
    }
}

impl Grammar {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Grammar, GrammarDefError> {
        let source = fs::read_to_string(path).map_err(GrammarDefError::IO)?;
        Self::from_str(&source)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(source: &str) -> Result<Grammar, GrammarDefError> {
        let rules = syntax::parse(source)?;
        Grammar::define(|g| {
            for rule in &rules {
                g.rule(&rule.left, &rule.right)
                    .map_err(|err| GrammarDefError::InvalidRule {
                        line: rule.line,
                        source: Box::new(err),
                    })?;
            }
            Ok(())
        })
    }

    /// Define a grammar using the specified function.
    pub fn define<F>(f: F) -> Result<Self, GrammarDefError>
    where
        F: FnOnce(&mut GrammarDef) -> Result<(), GrammarDefError>,
    {
        let mut def = GrammarDef {
            productions: Map::default(),
            next_production_id: 0,
        };
        f(&mut def)?;
        def.end()
    }

    /// The left-hand side of the first production.
    pub fn start_symbol(&self) -> &Symbol {
        &self.start_symbol
    }

    /// Every nonterminal appearing in the grammar, in order of first appearance.
    pub fn nonterminals(&self) -> impl Iterator<Item = &Symbol> + '_ {
        self.nonterminals.iter()
    }

    /// Every terminal appearing in the grammar, in order of first appearance.
    pub fn terminals(&self) -> impl Iterator<Item = &Symbol> + '_ {
        self.terminals.iter()
    }

    /// Nonterminals, then terminals, then the end marker.
    pub fn all_grammar_symbols(&self) -> Vec<Symbol> {
        self.nonterminals
            .iter()
            .chain(&self.terminals)
            .cloned()
            .chain(Some(Symbol::end_marker()))
            .collect()
    }

    pub fn productions(&self) -> impl Iterator<Item = &Production> + '_ {
        self.productions.values()
    }

    pub fn production(&self, id: ProductionID) -> &Production {
        &self.productions[&id]
    }

    /// The productions of `nonterminal` in the order they were defined.
    pub fn productions_of<'g>(
        &'g self,
        nonterminal: &Symbol,
    ) -> impl Iterator<Item = &'g Production> + 'g {
        self.rules
            .get(nonterminal)
            .into_iter()
            .flatten()
            .map(|id| &self.productions[id])
    }

    /// The set of nonterminals that derive the empty string.
    pub fn derives_to_empty_set(&self) -> &Set<Symbol> {
        self.nullables.get_or_init(|| sets::nullables(self))
    }

    pub fn derives_to_empty(&self, symbol: &Symbol) -> bool {
        match symbol.kind() {
            SymbolKind::Empty => true,
            SymbolKind::Nonterminal => self.derives_to_empty_set().contains(symbol),
            SymbolKind::Terminal | SymbolKind::EndMarker => false,
        }
    }

    /// Whether every symbol of `symbols` derives the empty string.
    pub fn sequence_derives_to_empty(&self, symbols: &[Symbol]) -> bool {
        symbols.iter().all(|s| self.derives_to_empty(s))
    }

    fn first_sets(&self) -> &Map<Symbol, Set<Symbol>> {
        self.first_sets
            .get_or_init(|| sets::first_sets(self, self.derives_to_empty_set()))
    }

    /// `First(X1 X2 ... Xk)`
    pub fn first_of(&self, symbols: &[Symbol]) -> Set<Symbol> {
        sets::first_of(symbols, self.derives_to_empty_set(), self.first_sets())
    }

    pub fn first_set_of(&self, symbol: &Symbol) -> Set<Symbol> {
        self.first_of(std::slice::from_ref(symbol))
    }

    pub fn follow_set_of(&self, nonterminal: &Symbol) -> Set<Symbol> {
        let follow_sets = self.follow_sets.get_or_init(|| {
            sets::follow_sets(self, self.derives_to_empty_set(), self.first_sets())
        });
        follow_sets.get(nonterminal).cloned().unwrap_or_default()
    }

    /// The lookaheads that select `production` when expanding its left-hand side.
    pub fn predict_set_of(&self, production: &Production) -> Set<Symbol> {
        let mut predict = self.first_of(production.right());
        let derives_to_empty = !production.contains_terminal()
            && self.sequence_derives_to_empty(production.right());
        if production.is_empty() || derives_to_empty {
            predict.extend(self.follow_set_of(production.left()));
        }
        predict
    }

    /// Dump the derived sets of every nonterminal, then the predict set of every production.
    pub fn display_sets(&self) -> impl fmt::Display + '_ {
        display_fn(move |f| {
            writeln!(
                f,
                "Derives to lambda: {}",
                crate::util::display_set(self.derives_to_empty_set())
            )?;
            for n in &self.nonterminals {
                writeln!(
                    f,
                    "First({}) = {}",
                    n,
                    crate::util::display_set(&self.first_set_of(n))
                )?;
            }
            for n in &self.nonterminals {
                writeln!(
                    f,
                    "Follow({}) = {}",
                    n,
                    crate::util::display_set(&self.follow_set_of(n))
                )?;
            }
            for production in self.productions.values() {
                writeln!(
                    f,
                    "Predict({}) = {}",
                    production,
                    crate::util::display_set(&self.predict_set_of(production))
                )?;
            }
            Ok(())
        })
    }
}

/// The contextural values for building a `Grammar`.
#[derive(Debug)]
pub struct GrammarDef {
    productions: Map<ProductionID, Production>,
    next_production_id: u16,
}

impl GrammarDef {
    /// Specify a production rule into this grammar.
    pub fn rule<I, S>(&mut self, left: &str, right: I) -> Result<ProductionID, GrammarDefError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let left = Symbol::new(left)?;
        if !left.is_nonterminal() {
            return Err(GrammarDefError::NotNonterminal {
                label: left.label().to_owned(),
            });
        }

        let right = right
            .into_iter()
            .map(|s| Symbol::new(s.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        if right.is_empty() {
            return Err(GrammarDefError::EmptyRightHandSide {
                left: left.label().to_owned(),
            });
        }
        // Item positions range over `0..=right.len()` and are stored as `u16`.
        if right.len() > usize::from(u16::MAX) {
            return Err(GrammarDefError::TooLongRightHandSide {
                left: left.label().to_owned(),
                len: right.len(),
            });
        }
        if right.len() > 1 && right.iter().any(|s| s.is_empty_marker()) {
            return Err(GrammarDefError::MisplacedEmptyMarker {
                left: left.label().to_owned(),
            });
        }

        for production in self.productions.values() {
            if production.left == left && production.right == right {
                return Err(GrammarDefError::DuplicateProduction {
                    production: production.to_string(),
                });
            }
        }

        let id = ProductionID::from_raw(self.next_production_id);
        self.next_production_id = self
            .next_production_id
            .checked_add(1)
            .ok_or(GrammarDefError::TooManyProductions)?;
        self.productions.insert(id, Production { id, left, right });

        Ok(id)
    }

    fn end(self) -> Result<Grammar, GrammarDefError> {
        let start_symbol = self
            .productions
            .values()
            .next()
            .map(|p| p.left.clone())
            .ok_or(GrammarDefError::NoProductions)?;

        let mut rules: Map<Symbol, Vec<ProductionID>> = Map::default();
        let mut nonterminals = Set::default();
        let mut terminals = Set::default();
        for (&id, production) in &self.productions {
            rules.entry(production.left.clone()).or_default().push(id);
            nonterminals.insert(production.left.clone());
            for symbol in &production.right {
                match symbol.kind() {
                    SymbolKind::Nonterminal => {
                        nonterminals.insert(symbol.clone());
                    }
                    SymbolKind::Terminal => {
                        terminals.insert(symbol.clone());
                    }
                    SymbolKind::Empty | SymbolKind::EndMarker => (),
                }
            }
        }

        for n in &nonterminals {
            if !rules.contains_key(n) {
                tracing::debug!("nonterminal `{}' has no production rule", n);
            }
        }

        Ok(Grammar {
            productions: self.productions,
            rules,
            nonterminals,
            terminals,
            start_symbol,
            nullables: OnceCell::new(),
            first_sets: OnceCell::new(),
            follow_sets: OnceCell::new(),
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GrammarDefError {
    #[error("IO error: {}", _0)]
    IO(io::Error),

    #[error("Syntax error: {}", _0)]
    Syntax(
        #[from]
        #[source]
        syntax::SyntaxError,
    ),

    #[error("line {}: {}", line, source)]
    InvalidRule {
        line: usize,
        #[source]
        source: Box<GrammarDefError>,
    },

    #[error("symbol label must not be empty")]
    EmptyLabel,

    #[error("the left-hand side `{}' is not a nonterminal", label)]
    NotNonterminal { label: String },

    #[error("the production of `{}' has no right-hand side (use `lambda' for the empty string)", left)]
    EmptyRightHandSide { left: String },

    #[error("`lambda' must be the only symbol on the right-hand side of `{}'", left)]
    MisplacedEmptyMarker { left: String },

    #[error("duplicate production rule detected: {}", production)]
    DuplicateProduction { production: String },

    #[error("the right-hand side of `{}' has too many symbols ({})", left, len)]
    TooLongRightHandSide { left: String, len: usize },

    #[error("too many production rules")]
    TooManyProductions,

    #[error("the grammar has no production rules")]
    NoProductions,
}
