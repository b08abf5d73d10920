use std::io::Read;

use clap::Parser;
use colored::Colorize;

use civicc::ast::{printer, wire, Ast};
use civicc::{CompilerError, Pipeline};

#[derive(Parser)]
#[command(name = "civicc")]
#[command(version = civicc::VERSION)]
#[command(long_version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("GIT_HASH"), ")"))]
#[command(about = "CiviC middle-end driver", long_about = None)]
struct Cli {
    /// Parsed input tree (JSON), or `-` for standard input
    input: String,

    /// Print the decoded tree before any phase runs
    #[arg(long)]
    show_input: bool,

    /// Dump the tree after each phase
    #[arg(short, long)]
    dump: bool,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,
}

fn main() {
    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }

    if let Err(err) = run(&cli) {
        eprintln!("{} {}", "error:".bright_red().bold(), err);
        std::process::exit(err.exit_code());
    }
}

fn run(cli: &Cli) -> Result<(), CompilerError> {
    let source = if cli.input == "-" {
        let mut buffer = String::new();
        std::io::stdin().read_to_string(&mut buffer)?;
        buffer
    } else {
        std::fs::read_to_string(&cli.input)?
    };

    let mut ast = Ast::new();
    let root = wire::from_json(&source, &mut ast).map_err(CompilerError::Parse)?;

    if cli.show_input {
        eprint!("{}", printer::dump(&ast, root));
    }

    Pipeline::run_with(&mut ast, root, |phase, ast| {
        if cli.dump {
            eprintln!("=== after {} ===", phase);
            eprint!("{}", printer::dump(ast, root));
        }
    })?;

    // The lowered tree goes to stdout for the code generator.
    println!("{}", wire::to_json(&ast, root).map_err(CompilerError::Parse)?);

    Ok(())
}
