use serde::Serialize;
use tracing::{debug, trace};

use super::{
    grammar::{Lookahead, Production, ProductionId, Symbol},
    ll1_parsing_table::LL1Table,
};
use crate::error::ParseError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Action {
    Apply {
        id: ProductionId,
        production: Production,
    },
    Match(String),
    Accept,
    Error(ParseError),
}

/// One automaton transition: the stack (top first) and the remaining input
/// as they were before the transition, and what was done.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParseStep {
    pub stack: Vec<Symbol>,
    pub input: Vec<Lookahead>,
    pub action: Action,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParseTrace {
    pub steps: Vec<ParseStep>,
    pub outcome: Result<(), ParseError>,
}

impl ParseTrace {
    pub fn accepted(&self) -> bool {
        self.outcome.is_ok()
    }

    pub fn error(&self) -> Option<&ParseError> {
        self.outcome.as_ref().err()
    }

    pub fn applied_productions(&self) -> impl Iterator<Item = &Production> {
        self.steps.iter().filter_map(|step| match &step.action {
            Action::Apply { production, .. } => Some(production),
            _ => None,
        })
    }

    /// Replays the applied productions as a leftmost derivation, starting from
    /// `start`. Each entry is one sentential form; the first is `start` itself.
    pub fn derivation(&self, start: &str) -> Vec<Vec<Symbol>> {
        let mut form = vec![Symbol::non_terminal(start)];
        let mut forms = vec![form.clone()];
        for production in self.applied_productions() {
            let leftmost = form.iter().position(Symbol::is_non_terminal);
            match leftmost {
                Some(i) if form[i].name() == production.head => {
                    form.splice(i..=i, production.body.iter().cloned());
                    forms.push(form.clone());
                }
                _ => break,
            }
        }
        forms
    }
}

impl LL1Table {
    /// Runs the predictive parsing automaton over `tokens`, which are
    /// terminal names. The input is implicitly terminated by the end marker.
    pub fn parse<T: AsRef<str>>(&self, tokens: &[T]) -> ParseTrace {
        let input: Vec<Lookahead> = tokens
            .iter()
            .map(|t| Lookahead::terminal(t.as_ref()))
            .chain(std::iter::once(Lookahead::EndOfInput))
            .collect();
        let last = input.len() - 1;

        let mut stack: Vec<Symbol> = vec![Symbol::EndOfInput, Symbol::non_terminal(self.start())];
        let mut cursor = 0;
        let mut steps: Vec<ParseStep> = Vec::new();

        let outcome = loop {
            let step = steps.len();
            // The end marker at the bottom is never popped.
            let top = stack.last().cloned().unwrap_or(Symbol::EndOfInput);
            let current = &input[cursor.min(last)];
            let snapshot: Vec<Symbol> = stack.iter().rev().cloned().collect();
            let remaining = input[cursor.min(last)..].to_vec();
            trace!(step, top = %top, lookahead = %current, "ll(1) step");

            let action = match (&top, current) {
                (Symbol::EndOfInput, Lookahead::EndOfInput) => Action::Accept,
                (Symbol::Terminal(expected), Lookahead::Terminal(found)) if expected == found => {
                    stack.pop();
                    cursor += 1;
                    Action::Match(found.clone())
                }
                (Symbol::NonTerminal(nt), lookahead) => {
                    match self.get_id(nt, lookahead).and_then(|id| {
                        self.production(id).map(|p| (id, p.clone()))
                    }) {
                        Some((id, production)) => {
                            stack.pop();
                            stack.extend(production.body.iter().rev().cloned());
                            Action::Apply { id, production }
                        }
                        None => Action::Error(ParseError::NoProduction {
                            step,
                            position: cursor,
                            non_terminal: nt.clone(),
                            lookahead: lookahead.clone(),
                        }),
                    }
                }
                (expected, found) => Action::Error(ParseError::UnexpectedToken {
                    step,
                    position: cursor,
                    expected: expected.clone(),
                    found: found.clone(),
                }),
            };

            let halt = match &action {
                Action::Accept => Some(Ok(())),
                Action::Error(e) => Some(Err(e.clone())),
                _ => None,
            };
            steps.push(ParseStep {
                stack: snapshot,
                input: remaining,
                action,
            });
            if let Some(outcome) = halt {
                break outcome;
            }
        };

        debug!(steps = steps.len(), accepted = outcome.is_ok(), "parse finished");
        ParseTrace { steps, outcome }
    }
}
