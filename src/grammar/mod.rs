pub mod grammar;
pub mod ll1_parser;
pub mod ll1_parsing_table;
pub mod nullable_first_follow;
pub mod parse;
pub mod pretty_print;
pub use grammar::{Grammar, Lookahead, Production, ProductionId, Symbol};
pub use ll1_parser::{Action, ParseStep, ParseTrace};
pub use ll1_parsing_table::{Conflict, ConflictReport, LL1Table};
pub use nullable_first_follow::{FirstFollow, NonTerminalSets, SequenceFirst};

pub const EPSILON: &str = "ε";
pub const END_MARK: &str = "$";
