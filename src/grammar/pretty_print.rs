use std::collections::HashSet;

use crowbook_text_processing::escape;
use serde::Serialize;

use super::{
    ll1_parser::{Action, ParseTrace},
    ll1_parsing_table::{ConflictReport, LL1Table},
    nullable_first_follow::FirstFollow,
    Grammar, END_MARK, EPSILON,
};

fn align_columns(output: &[Vec<String>]) -> String {
    let columns = output.first().map_or(0, |line| line.len());
    let width: Vec<usize> = (0..columns)
        .map(|j| {
            output
                .iter()
                .map(|line| line[j].chars().count())
                .max()
                .unwrap_or(0)
        })
        .collect();

    output
        .iter()
        .map(|line| {
            line.iter()
                .enumerate()
                .map(|(i, s)| format!("{:>width$}", s, width = width[i]))
                .collect::<Vec<_>>()
                .join(" | ")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn symbol_to_latex(s: &str, terminals: &HashSet<&str>) -> String {
    if s == EPSILON {
        "\\epsilon".to_string()
    } else if s == END_MARK {
        "\\$".to_string()
    } else if terminals.contains(s) {
        format!("\\text{{{}}}", escape::tex(s))
    } else {
        escape::tex(s).to_string()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProductionOutput<'a> {
    pub left: &'a str,
    pub rights: Vec<Vec<&'a str>>,
}

impl ProductionOutput<'_> {
    pub fn to_plaintext(&self, left_width: usize, multiline: bool) -> String {
        self.rights
            .iter()
            .map(|right| right.join(" "))
            .enumerate()
            .map(|(i, right)| {
                if i == 0 {
                    format!("{:>width$} -> {}", self.left, right, width = left_width)
                } else if multiline {
                    format!("{:>width$}  | {}", "", right, width = left_width)
                } else {
                    format!(" | {}", right)
                }
            })
            .collect::<Vec<_>>()
            .join(if multiline { "\n" } else { "" })
    }

    pub fn to_latex(&self, and_sign: bool, terminals: &HashSet<&str>) -> String {
        if self.rights.is_empty() {
            return String::new();
        }

        let left = if and_sign {
            format!("{} & \\rightarrow & ", escape::tex(self.left))
        } else {
            format!("{} \\rightarrow ", escape::tex(self.left))
        };
        let right = self
            .rights
            .iter()
            .map(|right| {
                right
                    .iter()
                    .map(|s| symbol_to_latex(s, terminals))
                    .collect::<Vec<_>>()
                    .join(" \\ ")
            })
            .collect::<Vec<_>>()
            .join(" \\mid ");

        left + &right
    }
}

#[derive(Serialize)]
pub struct ProductionOutputVec<'a> {
    productions: Vec<ProductionOutput<'a>>,
    #[serde(skip)]
    terminals: HashSet<&'a str>,
}

impl ProductionOutputVec<'_> {
    pub fn to_plaintext(&self) -> String {
        let left_max_len = self
            .productions
            .iter()
            .map(|p| p.left.chars().count())
            .max()
            .unwrap_or(0);
        self.productions
            .iter()
            .map(|s| s.to_plaintext(left_max_len, true))
            .collect::<Vec<String>>()
            .join("\n")
    }

    pub fn to_latex(&self) -> String {
        std::iter::once("\\[\\begin{array}{cll}".to_string())
            .chain(
                self.productions
                    .iter()
                    .map(|s| s.to_latex(true, &self.terminals)),
            )
            .chain(std::iter::once("\\end{array}\\]".to_string()))
            .collect::<Vec<String>>()
            .join("\\\\\n")
    }
}

impl Grammar {
    pub fn to_production_output_vec(&self) -> ProductionOutputVec {
        let productions = self
            .non_terminal_iter()
            .map(|nt| ProductionOutput {
                left: nt,
                rights: self
                    .productions_of(nt)
                    .map(|(_, p)| p.body_to_vec_str())
                    .collect(),
            })
            .collect();
        ProductionOutputVec {
            productions,
            terminals: self.terminal_iter().collect(),
        }
    }
}

#[derive(Serialize)]
struct NonTerminalOutput<'a> {
    name: &'a str,
    nullable: bool,
    first: Vec<&'a str>,
    follow: Vec<&'a str>,
}

impl NonTerminalOutput<'_> {
    fn to_plaintext(&self) -> String {
        format!(
            "{} | {} | {} | {}",
            self.name,
            self.nullable,
            self.first.join(", "),
            self.follow.join(", ")
        )
    }

    fn to_latex(&self) -> String {
        fn f(a: &[&str]) -> String {
            a.iter()
                .map(|s| match *s {
                    EPSILON => "$\\epsilon$".to_string(),
                    END_MARK => "\\$".to_string(),
                    s => escape::tex(s).to_string(),
                })
                .collect::<Vec<_>>()
                .join(r"\ ")
        }

        format!(
            "{} & {} & {} & {}",
            escape::tex(self.name),
            self.nullable,
            f(&self.first),
            f(&self.follow)
        )
    }
}

#[derive(Serialize)]
pub struct NonTerminalOutputVec<'a> {
    data: Vec<NonTerminalOutput<'a>>,
}

impl NonTerminalOutputVec<'_> {
    pub fn to_plaintext(&self) -> String {
        self.data
            .iter()
            .map(|s| s.to_plaintext())
            .collect::<Vec<String>>()
            .join("\n")
    }

    pub fn to_latex(&self) -> String {
        let content = self
            .data
            .iter()
            .map(|e| e.to_latex())
            .collect::<Vec<_>>()
            .join("\\\\\n");

        "\\begin{tabular}{c|c|c|c}\n".to_string()
            + "Symbol & Nullable & First & Follow\\\\\\hline\n"
            + &content
            + "\\\\\n\\end{tabular}"
    }
}

impl FirstFollow {
    /// FIRST lists `ε` last for nullable non-terminals, the way the sets are
    /// usually written by hand.
    pub fn to_non_terminal_output_vec(&self) -> NonTerminalOutputVec {
        let data = self
            .iter()
            .map(|(name, sets)| {
                let mut first: Vec<&str> = sets.first.iter().map(|t| t.as_str()).collect();
                if sets.nullable {
                    first.push(EPSILON);
                }
                NonTerminalOutput {
                    name,
                    nullable: sets.nullable,
                    first,
                    follow: sets.follow.iter().map(|la| la.name()).collect(),
                }
            })
            .collect();
        NonTerminalOutputVec { data }
    }
}

#[derive(Serialize)]
pub struct LL1ParsingTableOutput<'a> {
    terminals: Vec<&'a str>,
    rows: Vec<(&'a str, Vec<ProductionOutput<'a>>)>,
}

impl LL1ParsingTableOutput<'_> {
    pub fn to_plaintext(&self) -> String {
        let mut header: Vec<String> = vec![String::new()];
        header.extend(self.terminals.iter().map(|&t| t.to_string()));
        let mut output: Vec<Vec<String>> = vec![header];
        for (left, row) in &self.rows {
            let mut line: Vec<String> = vec![left.to_string()];
            line.extend(row.iter().map(|p| p.to_plaintext(left.chars().count(), false)));
            output.push(line);
        }
        align_columns(&output)
    }

    pub fn to_latex(&self) -> String {
        let terminal_set: HashSet<&str> = self.terminals.iter().cloned().collect();

        let mut header: Vec<String> = vec![format!(
            "\\[\\begin{{array}}{{c{}}}\n",
            "|l".repeat(self.terminals.len()),
        )];
        header.extend(
            self.terminals
                .iter()
                .map(|t| symbol_to_latex(t, &terminal_set)),
        );
        let header = header.join(" & ");

        let output = self
            .rows
            .iter()
            .map(|(left, row)| {
                std::iter::once(escape::tex(*left).to_string())
                    .chain(row.iter().map(|p| p.to_latex(false, &terminal_set)))
                    .collect::<Vec<_>>()
                    .join(" & ")
            })
            .collect::<Vec<_>>()
            .join("\\\\\n");

        header + "\\\\\\hline\n" + &output + "\n\\end{array}\\]"
    }
}

impl LL1Table {
    pub fn to_output(&self) -> LL1ParsingTableOutput {
        let lookaheads: Vec<_> = self.lookaheads().collect();
        let rows = self
            .non_terminals()
            .map(|nt| {
                let row = lookaheads
                    .iter()
                    .map(|la| ProductionOutput {
                        left: nt,
                        rights: self
                            .get(nt, la)
                            .map(|p| vec![p.body_to_vec_str()])
                            .unwrap_or_default(),
                    })
                    .collect();
                (nt, row)
            })
            .collect();

        LL1ParsingTableOutput {
            terminals: self
                .terminals()
                .iter()
                .map(|t| t.as_str())
                .chain(std::iter::once(END_MARK))
                .collect(),
            rows,
        }
    }
}

impl ConflictReport {
    pub fn to_plaintext(&self) -> String {
        std::iter::once(self.to_string())
            .chain(self.conflicts.iter().map(|c| c.to_string()))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn to_latex(&self) -> String {
        let empty = HashSet::new();
        let content = self
            .conflicts
            .iter()
            .map(|c| {
                let productions = c
                    .productions
                    .iter()
                    .map(|(_, p)| {
                        ProductionOutput {
                            left: &p.head,
                            rights: vec![p.body_to_vec_str()],
                        }
                        .to_latex(false, &empty)
                    })
                    .collect::<Vec<_>>()
                    .join(";\\ ");
                format!(
                    "M[{}, {}] & {{\\color{{red}}{}}}",
                    escape::tex(&c.non_terminal),
                    symbol_to_latex(c.lookahead.name(), &empty),
                    productions
                )
            })
            .collect::<Vec<_>>()
            .join("\\\\\n");

        "\\[\\begin{array}{c|l}\n".to_string() + &content + "\n\\end{array}\\]"
    }
}

impl Action {
    pub fn to_plaintext(&self) -> String {
        match self {
            Action::Apply { production, .. } => production.to_string(),
            Action::Match(t) => format!("match {}", t),
            Action::Accept => "accept".to_string(),
            Action::Error(e) => format!("error: {}", e),
        }
    }

    pub fn to_latex(&self) -> String {
        let empty = HashSet::new();
        match self {
            Action::Apply { production, .. } => format!(
                "${}$",
                ProductionOutput {
                    left: &production.head,
                    rights: vec![production.body_to_vec_str()],
                }
                .to_latex(false, &empty)
            ),
            Action::Match(t) => format!("match {}", escape::tex(t.as_str())),
            Action::Accept => "accept".to_string(),
            Action::Error(e) => format!("{{\\color{{red}}error: {}}}", escape::tex(e.to_string())),
        }
    }
}

impl ParseTrace {
    fn verdict(&self) -> String {
        match &self.outcome {
            Ok(()) => "Result: input accepted".to_string(),
            Err(e) => format!("Result: input rejected ({})", e),
        }
    }

    /// Stack columns are written bottom first, so the top is the rightmost
    /// symbol.
    pub fn to_plaintext(&self) -> String {
        let mut output: Vec<Vec<String>> = vec![vec![
            "Step".to_string(),
            "Stack".to_string(),
            "Input".to_string(),
            "Action".to_string(),
        ]];
        for (i, step) in self.steps.iter().enumerate() {
            output.push(vec![
                i.to_string(),
                step.stack
                    .iter()
                    .rev()
                    .map(|s| s.name())
                    .collect::<Vec<_>>()
                    .join(" "),
                step.input
                    .iter()
                    .map(|la| la.name())
                    .collect::<Vec<_>>()
                    .join(" "),
                step.action.to_plaintext(),
            ]);
        }
        align_columns(&output) + "\n" + &self.verdict()
    }

    pub fn to_latex(&self) -> String {
        let empty = HashSet::new();
        let content = self
            .steps
            .iter()
            .enumerate()
            .map(|(i, step)| {
                format!(
                    "{} & ${}$ & ${}$ & {}",
                    i,
                    step.stack
                        .iter()
                        .rev()
                        .map(|s| symbol_to_latex(s.name(), &empty))
                        .collect::<Vec<_>>()
                        .join("\\ "),
                    step.input
                        .iter()
                        .map(|la| symbol_to_latex(la.name(), &empty))
                        .collect::<Vec<_>>()
                        .join("\\ "),
                    step.action.to_latex()
                )
            })
            .collect::<Vec<_>>()
            .join("\\\\\n");

        "\\begin{tabular}{c|l|l|l}\n".to_string()
            + "Step & Stack & Input & Action\\\\\\hline\n"
            + &content
            + "\n\\end{tabular}\n\n"
            + &escape::tex(self.verdict())
    }
}

#[cfg(test)]
mod tests {
    use crate::grammar::Grammar;

    const EXPR: &str = "E -> T E'\nE' -> + T E' | ε\nT -> id";

    #[test]
    fn productions_plaintext() {
        let g = Grammar::parse(EXPR).unwrap();
        assert_eq!(
            g.to_production_output_vec().to_plaintext(),
            " E -> T E'\nE' -> + T E'\n    | ε\n T -> id"
        );
    }

    #[test]
    fn nullable_first_follow_plaintext() {
        let g = Grammar::parse(EXPR).unwrap();
        let sets = g.calculate_nullable_first_follow();
        assert_eq!(
            sets.to_non_terminal_output_vec().to_plaintext(),
            "E | false | id | $\nE' | true | +, ε | $\nT | false | id | +, $"
        );
    }

    #[test]
    fn table_plaintext() {
        let g = Grammar::parse(EXPR).unwrap();
        let sets = g.calculate_nullable_first_follow();
        let table = g.generate_ll1_parsing_table(&sets).unwrap();
        let text = table.to_output().to_plaintext();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 4);
        assert!(lines[0].ends_with("$"));
        assert!(lines[2].contains("E' -> + T E'"));
        assert!(lines[2].contains("E' -> ε"));
    }

    #[test]
    fn trace_plaintext_ends_with_verdict() {
        let g = Grammar::parse(EXPR).unwrap();
        let sets = g.calculate_nullable_first_follow();
        let table = g.generate_ll1_parsing_table(&sets).unwrap();

        let accepted = table.parse(&["id"]).to_plaintext();
        assert!(accepted.ends_with("Result: input accepted"));
        assert!(accepted.contains("$ E' T"));

        let rejected = table.parse(&["+"]).to_plaintext();
        assert!(rejected.contains("error: step 0"));
        assert!(rejected.lines().last().unwrap().starts_with("Result: input rejected"));
    }

    #[test]
    fn conflict_report_plaintext() {
        let g = Grammar::parse("A -> a B | a C\nB -> b\nC -> c").unwrap();
        let sets = g.calculate_nullable_first_follow();
        let report = g.generate_ll1_parsing_table(&sets).unwrap_err();
        assert_eq!(
            report.to_plaintext(),
            "grammar is not LL(1): 1 conflicting cell(s)\nM[A, a] = { A -> a B, A -> a C }"
        );
        assert!(report.to_latex().contains("\\color{red}"));
    }

    #[test]
    fn table_plaintext_pads_by_characters() {
        let g = Grammar::parse("Σ -> a").unwrap();
        let sets = g.calculate_nullable_first_follow();
        let table = g.generate_ll1_parsing_table(&sets).unwrap();
        let text = table.to_output().to_plaintext();

        assert_eq!(text.lines().nth(1), Some("Σ | Σ -> a |  "));
    }
}
