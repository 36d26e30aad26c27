use std::fs::File;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser as ClapParser;
use clap::Subcommand;
use env_logger::Builder;
use log::{debug, info};
use memmap2::Mmap;

use rlox::ast_printer::AstPrinter;
use rlox::error::Diagnostics;
use rlox::lox::Lox;
use rlox::parser::Parser;
use rlox::scanner::Scanner;
use rlox::token::Token;

#[derive(ClapParser, Debug)]
#[command(version, about = "Lox language interpreter", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Enable logging to app.log
    #[arg(long, global = true)]
    log: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Tokenizes a file, printing each token
    Tokenize {
        filename: PathBuf,

        /// Emit the token stream as JSON instead of the line format
        #[arg(long)]
        json: bool,
    },

    /// Parses a file and prints its AST in parenthesized prefix form
    Parse { filename: PathBuf },

    /// Runs a file as a Lox program
    Run { filename: PathBuf },
}

/// Memory-map a script file; the scanner borrows the mapped bytes.
fn map_file(filename: &PathBuf) -> Result<Mmap> {
    info!("Mapping file: {:?}", filename);

    let file = File::open(filename).context(format!("Failed to open file {:?}", filename))?;
    let mmap = unsafe { Mmap::map(&file) }.context(format!("Failed to map file {:?}", filename))?;

    info!("Mapped {} bytes from {:?}", mmap.len(), filename);

    Ok(mmap)
}

fn init_logger() -> Result<()> {
    let log_file = File::create("app.log").context("Failed to create app.log")?;

    // Compact `[module:line] - message` records, default Debug, override
    // with RUST_LOG.
    Builder::new()
        .format(|buf, record| {
            let module = record
                .module_path()
                .unwrap_or("<unnamed>")
                .strip_prefix("rlox::")
                .unwrap_or(record.module_path().unwrap_or("<unnamed>"));

            writeln!(
                buf,
                "[{}:{}] - {}",
                module,
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .filter(None, log::LevelFilter::Debug)
        .init();

    info!("Logger initialized, writing to app.log");

    Ok(())
}

fn tokenize(filename: PathBuf, json: bool) -> Result<()> {
    let mmap = map_file(&filename)?;
    let mut had_error = false;

    if json {
        let mut tokens: Vec<Token> = Vec::new();

        for item in Scanner::new(&mmap) {
            match item {
                Ok(token) => tokens.push(token),
                Err(e) => {
                    had_error = true;
                    eprintln!("{}", e);
                }
            }
        }

        println!("{}", serde_json::to_string_pretty(&tokens)?);
    } else {
        for item in Scanner::new(&mmap) {
            match item {
                Ok(token) => println!("{}", token),
                Err(e) => {
                    had_error = true;
                    eprintln!("{}", e);
                }
            }
        }
    }

    if had_error {
        debug!("Tokenization failed, exiting with code 65");

        std::process::exit(65);
    }

    Ok(())
}

fn parse(filename: PathBuf) -> Result<()> {
    let mmap = map_file(&filename)?;
    let mut diagnostics = Diagnostics::new();

    let mut tokens: Vec<Token> = Vec::new();

    for item in Scanner::new(&mmap) {
        match item {
            Ok(token) => tokens.push(token),
            Err(err) => diagnostics.report(err),
        }
    }

    let mut parser = Parser::new(&tokens, 0);
    let statements = parser.parse();

    for err in parser.take_errors() {
        diagnostics.report(err);
    }

    if diagnostics.had_error() {
        for err in diagnostics.errors() {
            eprintln!("{}", err);
        }

        std::process::exit(65);
    }

    println!("{}", AstPrinter::print_program(&statements));

    Ok(())
}

fn run(filename: PathBuf) -> Result<()> {
    let mmap = map_file(&filename)?;

    let mut lox = Lox::new();
    let mut diagnostics = Diagnostics::new();

    lox.run(&mmap, &mut diagnostics);

    for err in diagnostics.errors() {
        eprintln!("{}", err);
    }

    // Static and runtime failures get distinct exit codes.
    if diagnostics.had_error() {
        std::process::exit(65);
    }
    if diagnostics.had_runtime_error() {
        std::process::exit(70);
    }

    Ok(())
}

/// Interactive prompt.  One persistent engine for the session, so
/// definitions carry across lines; diagnostics are printed and cleared
/// per line.
fn repl() -> Result<()> {
    let mut lox = Lox::new();
    let mut diagnostics = Diagnostics::new();

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("> ");
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break; // EOF
        }

        let input = line.trim_end();
        if input == "exit" {
            break;
        }

        lox.run(input.as_bytes(), &mut diagnostics);

        for err in diagnostics.errors() {
            eprintln!("{}", err);
        }

        diagnostics.clear();
    }

    Ok(())
}

fn main() -> Result<()> {
    let args: Cli = Cli::parse();

    if args.log {
        init_logger()?;
    } else {
        // Minimal logger so log macros never hit an absent backend.
        env_logger::Builder::new()
            .filter_level(log::LevelFilter::Off)
            .init();
    }

    info!("CLI arguments: {:?}", args);

    match args.command {
        Some(Commands::Tokenize { filename, json }) => tokenize(filename, json),
        Some(Commands::Parse { filename }) => parse(filename),
        Some(Commands::Run { filename }) => run(filename),
        None => repl(),
    }
}
