//! Test strings for the parsing automaton.

/// One tokenized string per non-blank line; lines starting with `#` are
/// comments. Tokens are separated by whitespace.
pub fn read_inputs(text: &str) -> Vec<Vec<String>> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(tokenize)
        .collect()
}

pub fn tokenize(line: &str) -> Vec<String> {
    line.split_whitespace().map(|t| t.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skips_blank_and_comment_lines() {
        let inputs = read_inputs("id + id\n\n# bad one\n  id + + id  \n");
        assert_eq!(
            inputs,
            vec![vec!["id", "+", "id"], vec!["id", "+", "+", "id"]]
        );
    }

    #[test]
    fn tokenize_collapses_whitespace() {
        assert_eq!(tokenize(" ( id\t) "), vec!["(", "id", ")"]);
        assert!(tokenize("   ").is_empty());
    }
}
