use std::{fs, io::Read, process::ExitCode};

use ll1_helper::{input::read_inputs, Error, Grammar, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

const OUTPUTS: [&str; 4] = ["prod", "nff", "ll1", "parse"];

fn print_help() {
    println!("Usage: ll1-helper outputs [options] [grammar file]");
    println!("outputs:");
    println!("  prod: Productions");
    println!("  nff: Nullable first and follow");
    println!("  ll1: LL(1) parsing table");
    println!("  parse: Parse every string of the input file");
    println!("options:");
    println!("  -h: Print this help");
    println!("  -l: Print in LaTeX format");
    println!("  -j: Print in JSON format");
    println!("  -i <file>: Input strings for parse, one per line");
    println!("The grammar is read from stdin when no file is given.");
    println!("Set RUST_LOG=debug to see the analysis log on stderr.");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Plain,
    LaTeX,
    JSON,
}

#[derive(Debug)]
struct Options {
    outputs: Vec<String>,
    format: OutputFormat,
    inputs: Option<String>,
    grammar: Option<String>,
}

/// `None` means help was requested or the arguments were unusable.
fn parse_args(args: &[String]) -> Option<Options> {
    let mut i: usize = 0;
    let mut outputs: Vec<String> = Vec::new();
    while i < args.len() && OUTPUTS.contains(&args[i].as_str()) {
        outputs.push(args[i].clone());
        i += 1;
    }

    let mut format = OutputFormat::Plain;
    let mut inputs: Option<String> = None;
    while i < args.len() && ["-h", "--help", "-l", "-j", "-i"].contains(&args[i].as_str()) {
        match args[i].as_str() {
            "-l" => format = OutputFormat::LaTeX,
            "-j" => format = OutputFormat::JSON,
            "-i" => {
                i += 1;
                inputs = Some(args.get(i)?.clone());
            }
            _ => return None,
        }
        i += 1;
    }

    if i + 1 < args.len() || outputs.is_empty() {
        return None;
    }

    Some(Options {
        outputs,
        format,
        inputs,
        grammar: args.get(i).cloned(),
    })
}

fn read_file(path: &str) -> Result<String> {
    fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.to_string(),
        source,
    })
}

fn read_stdin() -> Result<String> {
    let mut text = String::new();
    std::io::stdin()
        .lock()
        .read_to_string(&mut text)
        .map_err(|source| Error::Io {
            path: "<stdin>".to_string(),
            source,
        })?;
    Ok(text)
}

fn render<T: serde::Serialize>(
    format: OutputFormat,
    value: &T,
    plain: impl FnOnce() -> String,
    latex: impl FnOnce() -> String,
) -> String {
    match format {
        OutputFormat::Plain => plain(),
        OutputFormat::LaTeX => latex(),
        OutputFormat::JSON => serde_json::to_string(value)
            .unwrap_or_else(|e| serde_json::json!({ "error": e.to_string() }).to_string()),
    }
}

fn run(options: &Options) -> Result<()> {
    let text = match &options.grammar {
        Some(path) => read_file(path)?,
        None => read_stdin()?,
    };
    let g = Grammar::parse(&text)?;
    info!(
        non_terminals = g.non_terminal_iter().count(),
        terminals = g.terminal_iter().count(),
        productions = g.productions().len(),
        "grammar loaded"
    );
    let sets = g.calculate_nullable_first_follow();
    let format = options.format;

    for output in &options.outputs {
        match output.as_str() {
            "prod" => {
                let t = g.to_production_output_vec();
                println!("{}", render(format, &t, || t.to_plaintext(), || t.to_latex()));
            }
            "nff" => {
                let t = sets.to_non_terminal_output_vec();
                println!("{}", render(format, &t, || t.to_plaintext(), || t.to_latex()));
            }
            "ll1" => match g.generate_ll1_parsing_table(&sets) {
                Ok(table) => {
                    let t = table.to_output();
                    println!("{}", render(format, &t, || t.to_plaintext(), || t.to_latex()));
                }
                Err(report) => {
                    println!(
                        "{}",
                        render(format, &report, || report.to_plaintext(), || report.to_latex())
                    );
                }
            },
            "parse" => {
                let table = match g.generate_ll1_parsing_table(&sets) {
                    Ok(table) => table,
                    Err(report) => {
                        println!(
                            "{}",
                            render(format, &report, || report.to_plaintext(), || report.to_latex())
                        );
                        return Err(report.into());
                    }
                };
                let inputs = match &options.inputs {
                    Some(path) => read_inputs(&read_file(path)?),
                    None => Vec::new(),
                };
                for tokens in inputs {
                    let trace = table.parse(&tokens);
                    println!(
                        "{}",
                        render(format, &trace, || trace.to_plaintext(), || trace.to_latex())
                    );
                }
            }
            _ => {}
        }
    }

    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = std::env::args().skip(1).collect::<Vec<String>>();
    let Some(options) = parse_args(&args) else {
        print_help();
        return ExitCode::SUCCESS;
    };

    match run(&options) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn outputs_options_and_file() {
        let options = parse_args(&args(&["nff", "ll1", "-j", "g.txt"])).unwrap();
        assert_eq!(options.outputs, vec!["nff", "ll1"]);
        assert_eq!(options.format, OutputFormat::JSON);
        assert_eq!(options.grammar.as_deref(), Some("g.txt"));
        assert_eq!(options.inputs, None);
    }

    #[test]
    fn input_file_option() {
        let options = parse_args(&args(&["parse", "-i", "strings.txt"])).unwrap();
        assert_eq!(options.inputs.as_deref(), Some("strings.txt"));
        assert_eq!(options.grammar, None);

        assert!(parse_args(&args(&["parse", "-i"])).is_none());
    }

    #[test]
    fn help_and_missing_outputs() {
        assert!(parse_args(&args(&["-h"])).is_none());
        assert!(parse_args(&args(&["ll1", "-h"])).is_none());
        assert!(parse_args(&args(&["g.txt"])).is_none());
        assert!(parse_args(&args(&["ll1", "a.txt", "b.txt"])).is_none());
    }

    #[test]
    fn parse_output_stops_on_conflicting_grammar() {
        let path = std::env::temp_dir()
            .join(format!("ll1-helper-conflict-{}.txt", std::process::id()));
        fs::write(&path, "S -> a | a b\n").unwrap();
        let options = Options {
            outputs: vec!["parse".to_string()],
            format: OutputFormat::JSON,
            inputs: None,
            grammar: Some(path.to_string_lossy().into_owned()),
        };

        let result = run(&options);
        fs::remove_file(&path).unwrap();
        match result {
            Err(Error::GrammarNotLL1(report)) => {
                assert_eq!(report.conflicts.len(), 1);
                assert_eq!(report.conflicts[0].lookahead.name(), "a");
            }
            other => panic!("unexpected result {:?}", other),
        }
    }
}
