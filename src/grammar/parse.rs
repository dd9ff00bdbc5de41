use indexmap::IndexSet;

use super::{
    grammar::{Production, Symbol},
    Grammar, EPSILON,
};
use crate::error::GrammarError;

const EPSILON_WORDS: [&str; 2] = [EPSILON, "epsilon"];

impl Grammar {
    /// Reads a grammar written as `A -> x y | z` lines.
    ///
    /// A line starting with `|` continues the previous head. Blank lines and
    /// lines starting with `#` are skipped. Every symbol that never appears on
    /// a left side is a terminal, and the first left side is the start symbol.
    pub fn parse(grammar: &str) -> Result<Self, GrammarError> {
        let mut heads: IndexSet<&str> = IndexSet::new();
        let mut raw_productions: Vec<(&str, &str)> = Vec::new();

        let mut previous_left: Option<&str> = None;
        for (i, line) in grammar.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let syntax = |message: &str| GrammarError::Syntax {
                line: i + 1,
                message: message.to_string(),
            };

            let parts: Vec<&str> = trimmed.split("->").collect();
            if parts.len() > 2 {
                return Err(syntax("too many \"->\""));
            }
            let (left, rights) = if parts.len() == 2 {
                let left = parts[0].trim();
                if left.is_empty() {
                    return Err(syntax("empty left side"));
                } else if left.split_whitespace().count() != 1 {
                    return Err(syntax("left side contains whitespace"));
                }
                heads.insert(left);
                (left, parts[1].trim())
            } else if let Some(rest) = trimmed.strip_prefix('|') {
                match previous_left {
                    Some(left) => (left, rest.trim()),
                    None => return Err(syntax("cannot find left side")),
                }
            } else {
                return Err(syntax("missing \"->\""));
            };

            previous_left = Some(left);
            raw_productions.push((left, rights));
        }

        let start = match heads.first() {
            Some(start) => start.to_string(),
            None => return Err(GrammarError::Empty),
        };

        let mut terminals: IndexSet<&str> = IndexSet::new();
        let mut productions: Vec<Production> = Vec::new();
        for (left, rights) in raw_productions {
            for right in rights.split('|') {
                let body = right
                    .split_whitespace()
                    .map(|s| {
                        if EPSILON_WORDS.contains(&s) {
                            Symbol::Epsilon
                        } else if heads.contains(s) {
                            Symbol::non_terminal(s)
                        } else {
                            terminals.insert(s);
                            Symbol::terminal(s)
                        }
                    })
                    .collect();
                productions.push(Production::new(left, body));
            }
        }

        Grammar::new(start, heads, terminals, productions)
    }
}
