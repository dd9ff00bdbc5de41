extern crate wasm_bindgen;

use serde::Serialize;
use wasm_bindgen::prelude::*;

pub mod error;
pub mod grammar;
pub mod input;

pub use error::{Error, GrammarError, ParseError, Result};
pub use grammar::{FirstFollow, Grammar, LL1Table, ParseTrace};

fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|e| error_json(&e))
}

fn error_json(e: &dyn std::fmt::Display) -> String {
    serde_json::json!({ "error": e.to_string() }).to_string()
}

/// Reads `grammar` and builds its LL(1) table, failing on malformed or
/// conflicting grammars.
pub fn analyze(grammar: &str) -> Result<(Grammar, FirstFollow, LL1Table)> {
    let g = Grammar::parse(grammar)?;
    let sets = g.calculate_nullable_first_follow();
    let table = g.generate_ll1_parsing_table(&sets)?;
    Ok((g, sets, table))
}

#[wasm_bindgen]
pub fn nullable_first_follow_to_json(grammar: &str) -> String {
    match Grammar::parse(grammar) {
        Ok(g) => to_json(&g.calculate_nullable_first_follow().to_non_terminal_output_vec()),
        Err(e) => error_json(&e),
    }
}

#[wasm_bindgen]
pub fn ll1_table_to_json(grammar: &str) -> String {
    match Grammar::parse(grammar) {
        Ok(g) => {
            let sets = g.calculate_nullable_first_follow();
            match g.generate_ll1_parsing_table(&sets) {
                Ok(table) => to_json(&table.to_output()),
                Err(report) => to_json(&report),
            }
        }
        Err(e) => error_json(&e),
    }
}

/// `input` holds one whitespace-separated test string.
#[wasm_bindgen]
pub fn parse_to_json(grammar: &str, input: &str) -> String {
    match analyze(grammar) {
        Ok((_, _, table)) => to_json(&table.parse(&crate::input::tokenize(input))),
        Err(Error::GrammarNotLL1(report)) => to_json(&report),
        Err(e) => error_json(&e),
    }
}
