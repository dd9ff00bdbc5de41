use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use indexmap::IndexMap;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use super::{
    grammar::{Lookahead, Production, ProductionId},
    nullable_first_follow::FirstFollow,
    Grammar,
};

/// A predictive parsing table with exactly one production per filled cell.
///
/// The table carries its own copy of the productions and the start symbol so
/// that the parsing automaton needs nothing else.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LL1Table {
    start: String,
    terminals: Vec<String>,
    productions: Vec<Production>,
    rows: IndexMap<String, BTreeMap<Lookahead, ProductionId>>,
}

/// One table cell claimed by two or more productions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Conflict {
    pub non_terminal: String,
    pub lookahead: Lookahead,
    pub productions: Vec<(ProductionId, Production)>,
}

impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let productions = self
            .productions
            .iter()
            .map(|(_, p)| p.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        write!(
            f,
            "M[{}, {}] = {{ {} }}",
            self.non_terminal, self.lookahead, productions
        )
    }
}

/// Every conflicting cell of a grammar that is not LL(1).
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("grammar is not LL(1): {} conflicting cell(s)", .conflicts.len())]
pub struct ConflictReport {
    pub conflicts: Vec<Conflict>,
}

impl LL1Table {
    /// Fills `M[A, t]` for every `A -> α` with `t` in FIRST(α), and with every
    /// lookahead in FOLLOW(A) when α is nullable. Any cell that ends up with
    /// more than one production is reported and no table is returned.
    pub fn build(grammar: &Grammar, sets: &FirstFollow) -> Result<Self, ConflictReport> {
        let mut cells: IndexMap<String, BTreeMap<Lookahead, BTreeSet<ProductionId>>> = grammar
            .non_terminal_iter()
            .map(|nt| (nt.to_string(), BTreeMap::new()))
            .collect();

        for (id, production) in grammar.production_iter() {
            let first = sets.first_of_sequence(&production.body);
            let mut lookaheads: BTreeSet<Lookahead> = first
                .terminals
                .into_iter()
                .map(Lookahead::Terminal)
                .collect();
            if first.nullable {
                if let Some(follow) = sets.follow(&production.head) {
                    lookaheads.extend(follow.iter().cloned());
                }
            }

            let row = cells.entry(production.head.clone()).or_default();
            for lookahead in lookaheads {
                row.entry(lookahead).or_default().insert(id);
            }
        }

        let mut conflicts: Vec<Conflict> = Vec::new();
        let mut rows: IndexMap<String, BTreeMap<Lookahead, ProductionId>> = IndexMap::new();
        for (non_terminal, row) in cells {
            let mut resolved = BTreeMap::new();
            for (lookahead, ids) in row {
                if ids.len() > 1 {
                    conflicts.push(Conflict {
                        non_terminal: non_terminal.clone(),
                        lookahead,
                        productions: ids
                            .iter()
                            .filter_map(|id| grammar.production(*id).map(|p| (*id, p.clone())))
                            .collect(),
                    });
                } else if let Some(id) = ids.into_iter().next() {
                    resolved.insert(lookahead, id);
                }
            }
            rows.insert(non_terminal, resolved);
        }

        debug!(
            cells = rows.values().map(|r| r.len()).sum::<usize>(),
            conflicts = conflicts.len(),
            "ll(1) table built"
        );

        if !conflicts.is_empty() {
            return Err(ConflictReport { conflicts });
        }

        Ok(Self {
            start: grammar.start().to_string(),
            terminals: grammar.terminal_iter().map(|t| t.to_string()).collect(),
            productions: grammar.productions().to_vec(),
            rows,
        })
    }

    pub fn start(&self) -> &str {
        &self.start
    }

    pub fn terminals(&self) -> &[String] {
        &self.terminals
    }

    /// Column order: the grammar's terminals followed by the end marker.
    pub fn lookaheads(&self) -> impl Iterator<Item = Lookahead> + '_ {
        self.terminals
            .iter()
            .map(|t| Lookahead::Terminal(t.clone()))
            .chain(std::iter::once(Lookahead::EndOfInput))
    }

    pub fn non_terminals(&self) -> impl Iterator<Item = &str> {
        self.rows.keys().map(|nt| nt.as_str())
    }

    pub fn production(&self, id: ProductionId) -> Option<&Production> {
        self.productions.get(id.0)
    }

    pub fn get_id(&self, non_terminal: &str, lookahead: &Lookahead) -> Option<ProductionId> {
        self.rows.get(non_terminal)?.get(lookahead).copied()
    }

    pub fn get(&self, non_terminal: &str, lookahead: &Lookahead) -> Option<&Production> {
        self.get_id(non_terminal, lookahead)
            .and_then(|id| self.production(id))
    }

    /// Number of filled cells.
    pub fn len(&self) -> usize {
        self.rows.values().map(|r| r.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Grammar {
    pub fn generate_ll1_parsing_table(&self, sets: &FirstFollow) -> Result<LL1Table, ConflictReport> {
        LL1Table::build(self, sets)
    }
}
