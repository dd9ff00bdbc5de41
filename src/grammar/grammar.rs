use std::collections::{HashSet, VecDeque};
use std::fmt;

use indexmap::{IndexMap, IndexSet};
use serde::{Serialize, Serializer};

use super::{END_MARK, EPSILON};
use crate::error::GrammarError;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Symbol {
    Terminal(String),
    NonTerminal(String),
    Epsilon,
    EndOfInput,
}

impl Symbol {
    pub fn terminal(name: impl Into<String>) -> Self {
        Symbol::Terminal(name.into())
    }

    pub fn non_terminal(name: impl Into<String>) -> Self {
        Symbol::NonTerminal(name.into())
    }

    pub fn name(&self) -> &str {
        match self {
            Symbol::Terminal(name) | Symbol::NonTerminal(name) => name.as_str(),
            Symbol::Epsilon => EPSILON,
            Symbol::EndOfInput => END_MARK,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Symbol::Terminal(_))
    }

    pub fn is_non_terminal(&self) -> bool {
        matches!(self, Symbol::NonTerminal(_))
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// Terminal and non-terminal names are disjoint, so the bare name identifies
// a symbol inside one grammar.
impl Serialize for Symbol {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

/// What the automaton can see in the input: a terminal token or the
/// end-of-input marker.
///
/// Terminals order before the marker, so sorted sets list `$` last.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Lookahead {
    Terminal(String),
    EndOfInput,
}

impl Lookahead {
    pub fn terminal(name: impl Into<String>) -> Self {
        Lookahead::Terminal(name.into())
    }

    pub fn name(&self) -> &str {
        match self {
            Lookahead::Terminal(name) => name.as_str(),
            Lookahead::EndOfInput => END_MARK,
        }
    }
}

impl fmt::Display for Lookahead {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for Lookahead {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl From<Lookahead> for Symbol {
    fn from(lookahead: Lookahead) -> Self {
        match lookahead {
            Lookahead::Terminal(name) => Symbol::Terminal(name),
            Lookahead::EndOfInput => Symbol::EndOfInput,
        }
    }
}

/// Stable index of a production in the grammar's production arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ProductionId(pub usize);

impl fmt::Display for ProductionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({})", self.0 + 1)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Production {
    pub head: String,
    pub body: Vec<Symbol>,
}

impl Production {
    pub fn new(head: impl Into<String>, body: Vec<Symbol>) -> Self {
        Self {
            head: head.into(),
            body,
        }
    }

    pub fn is_epsilon(&self) -> bool {
        self.body.is_empty()
    }

    pub fn body_to_vec_str(&self) -> Vec<&str> {
        if self.body.is_empty() {
            vec![EPSILON]
        } else {
            self.body.iter().map(|s| s.name()).collect()
        }
    }
}

impl fmt::Display for Production {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.head, self.body_to_vec_str().join(" "))
    }
}

/// A validated context-free grammar. Productions live in one arena and are
/// referred to by [`ProductionId`]; heads map to their production ids by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grammar {
    start: String,
    non_terminals: IndexSet<String>,
    terminals: IndexSet<String>,
    productions: Vec<Production>,
    by_head: IndexMap<String, Vec<ProductionId>>,
}

impl Grammar {
    /// Assembles a grammar from its parts and checks its structural
    /// invariants. `Epsilon` symbols are stripped from bodies, so `A -> ε`
    /// is stored as an empty body.
    pub fn new<N, T, P>(
        start: impl Into<String>,
        non_terminals: N,
        terminals: T,
        productions: P,
    ) -> Result<Self, GrammarError>
    where
        N: IntoIterator,
        N::Item: Into<String>,
        T: IntoIterator,
        T::Item: Into<String>,
        P: IntoIterator<Item = Production>,
    {
        let start = start.into();
        let non_terminals: IndexSet<String> = non_terminals.into_iter().map(Into::into).collect();
        let terminals: IndexSet<String> = terminals.into_iter().map(Into::into).collect();

        for name in non_terminals.iter().chain(terminals.iter()) {
            if name == EPSILON || name == END_MARK || name.is_empty() {
                return Err(GrammarError::ReservedName(name.clone()));
            }
        }
        if let Some(name) = terminals.iter().find(|t| non_terminals.contains(*t)) {
            return Err(GrammarError::AmbiguousSymbol(name.clone()));
        }
        if !non_terminals.contains(&start) {
            return Err(GrammarError::UndeclaredStart(start));
        }

        let mut by_head: IndexMap<String, Vec<ProductionId>> = non_terminals
            .iter()
            .map(|nt| (nt.clone(), Vec::new()))
            .collect();
        let mut arena: Vec<Production> = Vec::new();

        for mut production in productions {
            if !non_terminals.contains(&production.head) {
                return Err(GrammarError::UndeclaredHead(production.head));
            }
            production.body.retain(|s| *s != Symbol::Epsilon);
            for symbol in &production.body {
                let declared = match symbol {
                    Symbol::Terminal(name) => terminals.contains(name),
                    Symbol::NonTerminal(name) => non_terminals.contains(name),
                    Symbol::EndOfInput => {
                        return Err(GrammarError::EndMarkerInBody(production.head.clone()))
                    }
                    _ => true,
                };
                if !declared {
                    return Err(GrammarError::UndeclaredSymbol {
                        symbol: symbol.name().to_string(),
                        production: production.to_string(),
                    });
                }
            }

            let id = ProductionId(arena.len());
            if let Some(ids) = by_head.get_mut(&production.head) {
                ids.push(id);
            }
            arena.push(production);
        }

        if let Some((name, _)) = by_head.iter().find(|(_, ids)| ids.is_empty()) {
            return Err(GrammarError::NoProductions(name.clone()));
        }

        Ok(Self {
            start,
            non_terminals,
            terminals,
            productions: arena,
            by_head,
        })
    }

    pub fn start(&self) -> &str {
        &self.start
    }

    pub fn start_symbol(&self) -> Symbol {
        Symbol::NonTerminal(self.start.clone())
    }

    pub fn terminal_iter(&self) -> impl Iterator<Item = &str> {
        self.terminals.iter().map(|t| t.as_str())
    }

    pub fn non_terminal_iter(&self) -> impl Iterator<Item = &str> {
        self.non_terminals.iter().map(|nt| nt.as_str())
    }

    pub fn is_terminal(&self, name: &str) -> bool {
        self.terminals.contains(name)
    }

    pub fn is_non_terminal(&self, name: &str) -> bool {
        self.non_terminals.contains(name)
    }

    /// Classifies a bare name as one of this grammar's symbols.
    pub fn get_symbol(&self, name: &str) -> Option<Symbol> {
        if self.is_non_terminal(name) {
            Some(Symbol::non_terminal(name))
        } else if self.is_terminal(name) {
            Some(Symbol::terminal(name))
        } else {
            None
        }
    }

    pub fn productions(&self) -> &[Production] {
        &self.productions
    }

    pub fn production(&self, id: ProductionId) -> Option<&Production> {
        self.productions.get(id.0)
    }

    pub fn production_iter(&self) -> impl Iterator<Item = (ProductionId, &Production)> {
        self.productions
            .iter()
            .enumerate()
            .map(|(i, p)| (ProductionId(i), p))
    }

    /// Productions of `head` in declaration order; empty for unknown names.
    pub fn productions_of<'a>(
        &'a self,
        head: &str,
    ) -> impl Iterator<Item = (ProductionId, &'a Production)> + 'a {
        self.by_head
            .get(head)
            .into_iter()
            .flatten()
            .map(move |id| (*id, &self.productions[id.0]))
    }

    /// Non-terminals that no derivation from the start symbol ever mentions.
    pub fn unreachable_non_terminals(&self) -> Vec<&str> {
        let mut reached: HashSet<&str> = HashSet::new();
        let mut queue: VecDeque<&str> = VecDeque::new();
        reached.insert(self.start.as_str());
        queue.push_back(self.start.as_str());

        while let Some(head) = queue.pop_front() {
            for (_, production) in self.productions_of(head) {
                for symbol in &production.body {
                    if let Symbol::NonTerminal(name) = symbol {
                        if reached.insert(name.as_str()) {
                            queue.push_back(name.as_str());
                        }
                    }
                }
            }
        }

        self.non_terminal_iter()
            .filter(|nt| !reached.contains(nt))
            .collect()
    }

    /// Non-terminals that cannot derive any string of terminals, such as
    /// `A -> B`, `B -> A`.
    pub fn unproductive_non_terminals(&self) -> Vec<&str> {
        let mut productive: HashSet<&str> = HashSet::new();
        let mut changed = true;
        while changed {
            changed = false;
            for production in &self.productions {
                if productive.contains(production.head.as_str()) {
                    continue;
                }
                let ok = production.body.iter().all(|s| match s {
                    Symbol::NonTerminal(name) => productive.contains(name.as_str()),
                    _ => true,
                });
                if ok {
                    productive.insert(production.head.as_str());
                    changed = true;
                }
            }
        }

        self.non_terminal_iter()
            .filter(|nt| !productive.contains(nt))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(name: &str) -> Symbol {
        Symbol::terminal(name)
    }

    fn n(name: &str) -> Symbol {
        Symbol::non_terminal(name)
    }

    #[test]
    fn build_expression_grammar() {
        let g = Grammar::new(
            "E",
            ["E", "E'", "T"],
            ["+", "id"],
            vec![
                Production::new("E", vec![n("T"), n("E'")]),
                Production::new("E'", vec![t("+"), n("T"), n("E'")]),
                Production::new("E'", vec![Symbol::Epsilon]),
                Production::new("T", vec![t("id")]),
            ],
        )
        .unwrap();

        assert_eq!(g.start(), "E");
        assert_eq!(g.productions().len(), 4);
        assert!(g.production(ProductionId(2)).unwrap().is_epsilon());
        assert_eq!(
            g.productions_of("E'").map(|(id, _)| id).collect::<Vec<_>>(),
            vec![ProductionId(1), ProductionId(2)]
        );
        assert_eq!(g.get_symbol("id"), Some(t("id")));
        assert_eq!(g.get_symbol("T"), Some(n("T")));
        assert_eq!(g.get_symbol("x"), None);
    }

    #[test]
    fn undeclared_body_symbol() {
        let err = Grammar::new(
            "S",
            ["S"],
            ["a"],
            vec![Production::new("S", vec![t("a"), t("b")])],
        )
        .unwrap_err();
        assert!(matches!(err, GrammarError::UndeclaredSymbol { ref symbol, .. } if symbol == "b"));
    }

    #[test]
    fn terminal_tag_on_non_terminal_name() {
        let err = Grammar::new(
            "S",
            ["S"],
            ["a"],
            vec![Production::new("S", vec![t("S")])],
        )
        .unwrap_err();
        assert!(matches!(err, GrammarError::UndeclaredSymbol { .. }));
    }

    #[test]
    fn non_terminal_without_productions() {
        let err = Grammar::new(
            "S",
            ["S", "A"],
            ["a"],
            vec![Production::new("S", vec![t("a")])],
        )
        .unwrap_err();
        assert_eq!(err, GrammarError::NoProductions("A".to_string()));
    }

    #[test]
    fn undeclared_head() {
        let err = Grammar::new(
            "S",
            ["S"],
            ["a"],
            vec![
                Production::new("S", vec![t("a")]),
                Production::new("X", vec![t("a")]),
            ],
        )
        .unwrap_err();
        assert_eq!(err, GrammarError::UndeclaredHead("X".to_string()));
    }

    #[test]
    fn epsilon_is_stripped_from_bodies() {
        let g = Grammar::new(
            "S",
            ["S"],
            ["a"],
            vec![
                Production::new("S", vec![Symbol::Epsilon, t("a"), Symbol::Epsilon]),
                Production::new("S", vec![Symbol::Epsilon]),
            ],
        )
        .unwrap();
        assert_eq!(g.productions()[0].body, vec![t("a")]);
        assert!(g.productions()[1].is_epsilon());
    }

    #[test]
    fn undeclared_start() {
        let err = Grammar::new(
            "X",
            ["S"],
            ["a"],
            vec![Production::new("S", vec![t("a")])],
        )
        .unwrap_err();
        assert_eq!(err, GrammarError::UndeclaredStart("X".to_string()));
    }

    #[test]
    fn overlapping_and_reserved_names() {
        let err = Grammar::new("S", ["S"], ["S"], Vec::new()).unwrap_err();
        assert_eq!(err, GrammarError::AmbiguousSymbol("S".to_string()));

        let err = Grammar::new("S", ["S"], [END_MARK], Vec::new()).unwrap_err();
        assert_eq!(err, GrammarError::ReservedName(END_MARK.to_string()));
    }

    #[test]
    fn end_marker_in_body() {
        let err = Grammar::new(
            "S",
            ["S"],
            ["a"],
            vec![Production::new("S", vec![t("a"), Symbol::EndOfInput])],
        )
        .unwrap_err();
        assert_eq!(err, GrammarError::EndMarkerInBody("S".to_string()));
    }

    #[test]
    fn reachability_and_productivity() {
        let g = Grammar::new(
            "S",
            ["S", "A", "B", "C"],
            ["a", "c"],
            vec![
                Production::new("S", vec![t("a")]),
                Production::new("S", vec![n("A")]),
                Production::new("A", vec![n("B")]),
                Production::new("B", vec![n("A")]),
                Production::new("C", vec![t("c")]),
            ],
        )
        .unwrap();

        assert_eq!(g.unreachable_non_terminals(), vec!["C"]);
        assert_eq!(g.unproductive_non_terminals(), vec!["A", "B"]);
    }
}
