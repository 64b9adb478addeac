//! Table-driven LL(1) parsing.

use super::LL1Table;
use crate::{
    grammar::{Grammar, Symbol, SymbolKind},
    parse_tree::{ParseTree, ParseTreeBuilder},
};

#[derive(Debug, thiserror::Error)]
pub enum LLParseError {
    #[error("unexpected `{}': not in the predict set of any production of `{}'", lookahead, nonterminal)]
    NoPredictEntry {
        nonterminal: Symbol,
        lookahead: Symbol,
    },

    #[error("unexpected `{}': expected `{}'", actual, expected)]
    TerminalMismatch { expected: Symbol, actual: Symbol },

    #[error("unexpected `{}' after the end of the parse", token)]
    TrailingInput { token: Symbol },
}

/// An entry of the parse stack.
#[derive(Debug)]
enum StackItem {
    Symbol(Symbol),
    /// Marks the end of a nonterminal's expansion.
    Return,
}

/// Drives an LL(1) table over a token stream, building the parse tree.
#[derive(Debug)]
pub struct LL1Driver<'g> {
    grammar: &'g Grammar,
    table: &'g LL1Table,
}

impl<'g> LL1Driver<'g> {
    pub fn new(grammar: &'g Grammar, table: &'g LL1Table) -> Self {
        Self { grammar, table }
    }

    /// Parse the token stream, starting from the grammar's start symbol.
    ///
    /// The lookahead is `$` once the stream is exhausted, so the trailing
    /// `$` token may be omitted. Every token must be consumed.
    pub fn parse<I>(&self, tokens: I) -> Result<ParseTree, LLParseError>
    where
        I: IntoIterator<Item = Symbol>,
    {
        let span = tracing::trace_span!("parse");
        let _entered = span.enter();

        let eoi = Symbol::end_marker();
        let mut input = tokens.into_iter().peekable();
        let start = self.grammar.start_symbol();
        let mut tree = ParseTreeBuilder::new(start.clone());
        let mut stack = vec![];
        self.expand(start, input.peek().unwrap_or(&eoi), &mut stack)?;

        while let Some(item) = stack.pop() {
            let x = match item {
                StackItem::Return => {
                    tree.ascend();
                    continue;
                }
                StackItem::Symbol(x) => x,
            };
            let lookahead = input.peek().unwrap_or(&eoi);
            tracing::trace!("pop {} (lookahead = {})", x, lookahead);

            match x.kind() {
                SymbolKind::Nonterminal => {
                    self.expand(&x, lookahead, &mut stack)?;
                    tree.descend(x);
                }

                SymbolKind::Terminal | SymbolKind::EndMarker => {
                    if x != *lookahead {
                        return Err(LLParseError::TerminalMismatch {
                            expected: x,
                            actual: lookahead.clone(),
                        });
                    }
                    input.next();
                    tree.attach(x);
                }

                SymbolKind::Empty => {
                    tree.attach(x);
                }
            }
        }

        if let Some(token) = input.next() {
            return Err(LLParseError::TrailingInput { token });
        }

        Ok(tree.finish())
    }

    /// Push the right-hand side predicted for `(nonterminal, lookahead)`,
    /// followed by the marker returning from its expansion.
    fn expand(
        &self,
        nonterminal: &Symbol,
        lookahead: &Symbol,
        stack: &mut Vec<StackItem>,
    ) -> Result<(), LLParseError> {
        let id = self
            .table
            .entry_for(nonterminal, lookahead)
            .ok_or_else(|| LLParseError::NoPredictEntry {
                nonterminal: nonterminal.clone(),
                lookahead: lookahead.clone(),
            })?;
        let production = self.grammar.production(id);
        tracing::trace!("expand {}", production);
        stack.push(StackItem::Return);
        stack.extend(
            production
                .right()
                .iter()
                .rev()
                .cloned()
                .map(StackItem::Symbol),
        );
        Ok(())
    }
}
