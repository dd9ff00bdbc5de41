use std::collections::BTreeSet;

use indexmap::IndexMap;
use serde::Serialize;
use tracing::{debug, warn};

use super::{
    grammar::{Lookahead, Symbol},
    Grammar,
};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NonTerminalSets {
    pub nullable: bool,
    pub first: BTreeSet<String>,
    pub follow: BTreeSet<Lookahead>,
}

/// FIRST of a symbol sequence. Emptiness is carried by `nullable` rather than
/// by an epsilon member.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SequenceFirst {
    pub terminals: BTreeSet<String>,
    pub nullable: bool,
}

/// Number of full passes each fixpoint needed, the last one being the pass
/// that changed nothing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Passes {
    pub nullable: usize,
    pub first: usize,
    pub follow: usize,
}

/// Converged nullable/FIRST/FOLLOW sets of every non-terminal, in declaration
/// order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FirstFollow {
    sets: IndexMap<String, NonTerminalSets>,
    #[serde(skip)]
    passes: Passes,
}

type Sets = IndexMap<String, NonTerminalSets>;

fn run_to_fixpoint(mut pass: impl FnMut() -> bool) -> usize {
    let mut passes = 0;
    loop {
        passes += 1;
        if !pass() {
            return passes;
        }
    }
}

fn sequence_first(sets: &Sets, sequence: &[Symbol]) -> SequenceFirst {
    let mut terminals = BTreeSet::new();
    for symbol in sequence {
        match symbol {
            Symbol::Terminal(t) => {
                terminals.insert(t.clone());
                return SequenceFirst {
                    terminals,
                    nullable: false,
                };
            }
            Symbol::NonTerminal(nt) => match sets.get(nt) {
                Some(s) => {
                    terminals.extend(s.first.iter().cloned());
                    if !s.nullable {
                        return SequenceFirst {
                            terminals,
                            nullable: false,
                        };
                    }
                }
                None => {
                    return SequenceFirst {
                        terminals,
                        nullable: false,
                    }
                }
            },
            Symbol::Epsilon => {}
            // Nothing can follow the end marker.
            Symbol::EndOfInput => {
                return SequenceFirst {
                    terminals,
                    nullable: false,
                }
            }
        }
    }
    SequenceFirst {
        terminals,
        nullable: true,
    }
}

fn nullable_pass(grammar: &Grammar, sets: &mut Sets) -> bool {
    let mut changed = false;
    for production in grammar.productions() {
        if sets[&production.head].nullable {
            continue;
        }
        let nullable = production.body.iter().all(|s| match s {
            Symbol::NonTerminal(nt) => sets[nt].nullable,
            Symbol::Epsilon => true,
            _ => false,
        });
        if nullable {
            sets[&production.head].nullable = true;
            changed = true;
        }
    }
    changed
}

fn first_pass(grammar: &Grammar, sets: &mut Sets) -> bool {
    let mut changed = false;
    for production in grammar.productions() {
        let first = sequence_first(sets, &production.body);
        let target = &mut sets[&production.head].first;
        let before = target.len();
        target.extend(first.terminals);
        changed |= target.len() != before;
    }
    changed
}

fn follow_pass(grammar: &Grammar, sets: &mut Sets) -> bool {
    let mut changed = false;
    for production in grammar.productions() {
        for (i, symbol) in production.body.iter().enumerate() {
            let Symbol::NonTerminal(nt) = symbol else {
                continue;
            };

            let rest = sequence_first(sets, &production.body[i + 1..]);
            let mut additions: BTreeSet<Lookahead> =
                rest.terminals.into_iter().map(Lookahead::Terminal).collect();
            if rest.nullable {
                additions.extend(sets[&production.head].follow.iter().cloned());
            }

            let target = &mut sets[nt].follow;
            let before = target.len();
            target.extend(additions);
            changed |= target.len() != before;
        }
    }
    changed
}

impl FirstFollow {
    pub fn compute(grammar: &Grammar) -> Self {
        for nt in grammar.unreachable_non_terminals() {
            warn!(non_terminal = nt, "non-terminal is unreachable from the start symbol");
        }
        for nt in grammar.unproductive_non_terminals() {
            warn!(non_terminal = nt, "non-terminal derives no terminal string");
        }

        let mut sets: Sets = grammar
            .non_terminal_iter()
            .map(|nt| (nt.to_string(), NonTerminalSets::default()))
            .collect();

        let nullable = run_to_fixpoint(|| nullable_pass(grammar, &mut sets));
        debug!(passes = nullable, "nullable converged");

        let first = run_to_fixpoint(|| first_pass(grammar, &mut sets));
        debug!(passes = first, "first converged");

        if let Some(start) = sets.get_mut(grammar.start()) {
            start.follow.insert(Lookahead::EndOfInput);
        }
        let follow = run_to_fixpoint(|| follow_pass(grammar, &mut sets));
        debug!(passes = follow, "follow converged");

        Self {
            sets,
            passes: Passes {
                nullable,
                first,
                follow,
            },
        }
    }

    /// Runs one more pass of every rule over a copy of the sets and reports
    /// whether nothing would change.
    pub fn is_fixpoint(&self, grammar: &Grammar) -> bool {
        let mut sets = self.sets.clone();
        let changed = nullable_pass(grammar, &mut sets)
            | first_pass(grammar, &mut sets)
            | follow_pass(grammar, &mut sets);
        !changed && sets == self.sets
    }

    pub fn passes(&self) -> Passes {
        self.passes
    }

    pub fn get(&self, non_terminal: &str) -> Option<&NonTerminalSets> {
        self.sets.get(non_terminal)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &NonTerminalSets)> {
        self.sets.iter().map(|(nt, s)| (nt.as_str(), s))
    }

    pub fn nullable(&self, non_terminal: &str) -> bool {
        self.get(non_terminal).map_or(false, |s| s.nullable)
    }

    pub fn first(&self, non_terminal: &str) -> Option<&BTreeSet<String>> {
        self.get(non_terminal).map(|s| &s.first)
    }

    pub fn follow(&self, non_terminal: &str) -> Option<&BTreeSet<Lookahead>> {
        self.get(non_terminal).map(|s| &s.follow)
    }

    pub fn first_of_sequence(&self, sequence: &[Symbol]) -> SequenceFirst {
        sequence_first(&self.sets, sequence)
    }

    pub fn first_of_symbol(&self, symbol: &Symbol) -> SequenceFirst {
        sequence_first(&self.sets, std::slice::from_ref(symbol))
    }
}

impl Grammar {
    pub fn calculate_nullable_first_follow(&self) -> FirstFollow {
        FirstFollow::compute(self)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use crate::grammar::{Grammar, Lookahead, Symbol};

    fn strings(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn lookaheads(items: &[&str]) -> BTreeSet<Lookahead> {
        items
            .iter()
            .map(|s| match *s {
                "$" => Lookahead::EndOfInput,
                t => Lookahead::terminal(t),
            })
            .collect()
    }

    #[test]
    fn expression_grammar() {
        let g = Grammar::parse("E -> T E'\nE' -> + T E' | ε\nT -> id").unwrap();
        let sets = g.calculate_nullable_first_follow();

        assert!(!sets.nullable("E"));
        assert!(sets.nullable("E'"));
        assert!(!sets.nullable("T"));

        assert_eq!(sets.first("T"), Some(&strings(&["id"])));
        assert_eq!(sets.first("E"), Some(&strings(&["id"])));
        assert_eq!(sets.first("E'"), Some(&strings(&["+"])));

        assert_eq!(sets.follow("E"), Some(&lookaheads(&["$"])));
        assert_eq!(sets.follow("E'"), Some(&lookaheads(&["$"])));
        assert_eq!(sets.follow("T"), Some(&lookaheads(&["+", "$"])));
    }

    #[test]
    fn dragon_book_grammar() {
        let g = Grammar::parse(
            "E -> T E'
             E' -> + T E' | ε
             T -> F T'
             T' -> * F T' | ε
             F -> ( E ) | id",
        )
        .unwrap();
        let sets = g.calculate_nullable_first_follow();

        for nt in ["E", "T", "F"] {
            assert_eq!(sets.first(nt), Some(&strings(&["(", "id"])));
        }
        assert_eq!(sets.follow("E"), Some(&lookaheads(&[")", "$"])));
        assert_eq!(sets.follow("E'"), Some(&lookaheads(&[")", "$"])));
        assert_eq!(sets.follow("T"), Some(&lookaheads(&["+", ")", "$"])));
        assert_eq!(sets.follow("T'"), Some(&lookaheads(&["+", ")", "$"])));
        assert_eq!(sets.follow("F"), Some(&lookaheads(&["+", "*", ")", "$"])));
        assert!(sets.is_fixpoint(&g));
    }

    #[test]
    fn nullable_through_chain() {
        let g = Grammar::parse("S -> A B c\nA -> B\nB -> b | ε").unwrap();
        let sets = g.calculate_nullable_first_follow();

        assert!(sets.nullable("A"));
        assert!(sets.nullable("B"));
        assert!(!sets.nullable("S"));
        assert_eq!(sets.first("S"), Some(&strings(&["b", "c"])));
        assert_eq!(sets.follow("A"), Some(&lookaheads(&["b", "c"])));
        assert_eq!(sets.follow("B"), Some(&lookaheads(&["b", "c"])));
    }

    #[test]
    fn nullable_first_is_union_of_bodies() {
        let g = Grammar::parse("S -> A x\nA -> a | B | ε\nB -> b").unwrap();
        let sets = g.calculate_nullable_first_follow();

        let union: BTreeSet<String> = g
            .productions_of("A")
            .flat_map(|(_, p)| sets.first_of_sequence(&p.body).terminals)
            .collect();
        assert!(sets.nullable("A"));
        assert_eq!(sets.first("A"), Some(&union));
    }

    #[test]
    fn sequence_rule() {
        let g = Grammar::parse("S -> A B\nA -> a | ε\nB -> b | ε").unwrap();
        let sets = g.calculate_nullable_first_follow();

        let both = sets.first_of_sequence(&[Symbol::non_terminal("A"), Symbol::non_terminal("B")]);
        assert_eq!(both.terminals, strings(&["a", "b"]));
        assert!(both.nullable);

        let stopped = sets.first_of_sequence(&[
            Symbol::non_terminal("A"),
            Symbol::terminal("x"),
            Symbol::non_terminal("B"),
        ]);
        assert_eq!(stopped.terminals, strings(&["a", "x"]));
        assert!(!stopped.nullable);

        let empty = sets.first_of_sequence(&[]);
        assert!(empty.terminals.is_empty());
        assert!(empty.nullable);

        assert_eq!(
            sets.first_of_symbol(&Symbol::terminal("b")).terminals,
            strings(&["b"])
        );
    }

    #[test]
    fn left_recursion_converges() {
        let g = Grammar::parse("E -> E + T | T\nT -> id").unwrap();
        let sets = g.calculate_nullable_first_follow();

        assert_eq!(sets.first("E"), Some(&strings(&["id"])));
        assert_eq!(sets.follow("E"), Some(&lookaheads(&["+", "$"])));
        assert_eq!(sets.follow("T"), Some(&lookaheads(&["+", "$"])));
        assert!(sets.is_fixpoint(&g));
    }

    #[test]
    fn unproductive_cycle_converges_to_empty_sets() {
        let g = Grammar::parse("S -> A x | y\nA -> B\nB -> A").unwrap();
        let sets = g.calculate_nullable_first_follow();

        assert!(!sets.nullable("A"));
        assert!(!sets.nullable("B"));
        assert_eq!(sets.first("A"), Some(&BTreeSet::new()));
        assert_eq!(sets.first("S"), Some(&strings(&["y"])));
        assert_eq!(sets.follow("B"), Some(&lookaheads(&["x"])));
        assert!(sets.is_fixpoint(&g));
    }

    #[test]
    fn recomputation_is_identical() {
        let g = Grammar::parse("S -> a S b | ε").unwrap();
        let first = g.calculate_nullable_first_follow();
        let second = g.calculate_nullable_first_follow();

        assert_eq!(first, second);
        assert!(first.is_fixpoint(&g));
        assert!(first.passes().nullable >= 1);
    }
}
