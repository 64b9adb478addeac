//! Scanner for the textual grammar description and token streams.
//!
//! ```text
//! # comment
//! S -> A C $
//! C -> c | lambda
//! A -> a B C d
//!    | B Q
//! ```

use crate::grammar::{Symbol, SymbolKind};

const ARROW: &str = "->";
const BAR: &str = "|";

/// A production as written in the source, before any validation by the grammar builder.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleDesc {
    pub left: String,
    pub right: Vec<String>,
    pub line: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum SyntaxError {
    #[error("line {}: expected `LHS -> RHS' or `| RHS'", line)]
    MissingArrow { line: usize },

    #[error("line {}: the left-hand side must be a single symbol", line)]
    MalformedLeft { line: usize },

    #[error("line {}: alternative given before any rule", line)]
    OrphanAlternative { line: usize },

    #[error("line {}: empty alternative (use `lambda' for the empty string)", line)]
    EmptyAlternative { line: usize },

    #[error("token {}: `{}' is neither a terminal nor `$'", index, token)]
    InvalidToken { index: usize, token: String },
}

/// Split the source into production rules, in order of appearance.
pub fn parse(source: &str) -> Result<Vec<RuleDesc>, SyntaxError> {
    let span = tracing::trace_span!("parse");
    let _entered = span.enter();

    let mut rules = vec![];
    let mut current_left: Option<String> = None;

    for (i, line) in source.lines().enumerate() {
        let line_no = i + 1;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let tokens: Vec<&str> = trimmed.split_whitespace().collect();
        let (left, alternatives) = match tokens.iter().position(|t| *t == ARROW) {
            Some(arrow) => match &tokens[..arrow] {
                [left] => (left.to_string(), &tokens[arrow + 1..]),
                _ => return Err(SyntaxError::MalformedLeft { line: line_no }),
            },
            None => match tokens.split_first() {
                Some((&BAR, rest)) => match &current_left {
                    Some(left) => (left.clone(), rest),
                    None => return Err(SyntaxError::OrphanAlternative { line: line_no }),
                },
                _ => return Err(SyntaxError::MissingArrow { line: line_no }),
            },
        };

        for alternative in alternatives.split(|t| *t == BAR) {
            if alternative.is_empty() {
                return Err(SyntaxError::EmptyAlternative { line: line_no });
            }
            let rule = RuleDesc {
                left: left.clone(),
                right: alternative.iter().map(|t| t.to_string()).collect(),
                line: line_no,
            };
            tracing::trace!("rule {:?}", rule);
            rules.push(rule);
        }
        current_left = Some(left);
    }

    Ok(rules)
}

/// Split a whitespace-separated token stream into symbols.
pub fn parse_tokens(source: &str) -> Result<Vec<Symbol>, SyntaxError> {
    source
        .split_whitespace()
        .enumerate()
        .map(|(index, token)| {
            let invalid = || SyntaxError::InvalidToken {
                index,
                token: token.to_owned(),
            };
            let symbol = Symbol::new(token).map_err(|_| invalid())?;
            match symbol.kind() {
                SymbolKind::Terminal | SymbolKind::EndMarker => Ok(symbol),
                SymbolKind::Nonterminal | SymbolKind::Empty => Err(invalid()),
            }
        })
        .collect()
}
