use clap::Parser;
use mimalloc::MiMalloc;
use semantic_prover_rs::parser::parse;
use semantic_prover_rs::prover::{Prover, Verdict};
use semantic_prover_rs::Context;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

/// Semantic-tableau theorem prover over s-expression sentences.
#[derive(Parser)]
#[command(name = "semantic-prover-rs", version)]
struct Cli {
    /// Goal sentence to prove
    goal: String,
    /// Premise sentence; may be given multiple times
    #[arg(short, long = "premise")]
    premises: Vec<String>,
    /// File of premises, one per line; blank lines and # comments are skipped
    #[arg(short, long)]
    file: Option<PathBuf>,
    /// Reject undeclared predicates, functions and constants
    #[arg(long)]
    strict: bool,
    /// Print the final tableau
    #[arg(long)]
    tree: bool,
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let mut texts = vec![];
    if let Some(path) = &cli.file {
        match fs::read_to_string(path) {
            Ok(s) => texts.extend(
                s.lines()
                    .filter(|s| !s.is_empty() && !s.starts_with('#'))
                    .map(str::to_owned),
            ),
            Err(e) => {
                eprintln!("cannot read {}: {e}", path.display());
                return ExitCode::FAILURE;
            }
        }
    }
    texts.extend(cli.premises.iter().cloned());

    let mut ctx = Context::new();
    let mut premises = vec![];
    for text in &texts {
        match parse(text, &mut ctx, cli.strict) {
            Ok(id) => premises.push(id),
            Err(e) => {
                eprintln!("cannot parse premise {text}: {e}");
                return ExitCode::FAILURE;
            }
        }
    }
    let goal = match parse(&cli.goal, &mut ctx, cli.strict) {
        Ok(id) => id,
        Err(e) => {
            eprintln!("cannot parse goal {}: {e}", cli.goal);
            return ExitCode::FAILURE;
        }
    };

    let mut prover = Prover::new(&mut ctx.sentences, &ctx.sorts, &premises, goal);
    let verdict = prover.run();
    if cli.tree {
        println!("{}", prover.render());
        println!();
    }
    drop(prover);

    match verdict {
        Verdict::Valid => println!("The argument is valid."),
        Verdict::Invalid(witness) => {
            println!("The argument is not valid. Counter-model:");
            println!("{}", witness.display(&ctx.sentences));
        }
    }
    ExitCode::SUCCESS
}
