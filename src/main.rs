use std::fs;
use std::io::{self, BufRead, Write};

use anyhow::{Context, Result, bail};

use strux::interpreter::Interpreter;
use strux::parser;
use strux::symbols::SymbolTable;

fn main() -> Result<()> {
    let mut args = std::env::args().skip(1);
    match (args.next(), args.next()) {
        (None, None) => repl(),
        (Some(path), None) => run_file(&path),
        _ => bail!("Usage: strux [script]"),
    }
}

fn run_file(path: &str) -> Result<()> {
    let source = fs::read_to_string(path).with_context(|| format!("Reading {path}"))?;
    let mut symbols = SymbolTable::new();
    let program =
        parser::parse(&source, &mut symbols).with_context(|| format!("Parsing {path}"))?;

    let mut interpreter = Interpreter::new();
    let result = interpreter.run(&symbols, &program);
    // Output produced before a failure still belongs on stdout.
    for line in interpreter.take_output() {
        println!("{line}");
    }
    result?;
    Ok(())
}

fn repl() -> Result<()> {
    let stdin = io::stdin();
    let mut symbols = SymbolTable::new();
    let mut interpreter = Interpreter::new();

    loop {
        print!("(strux)> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            return Ok(()); // EOF
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if let Some(command) = line.strip_prefix(':') {
            if run_command(command, &interpreter) {
                return Ok(());
            }
            continue;
        }

        let program = match parser::parse(line, &mut symbols) {
            Ok(program) => program,
            Err(error) => {
                println!("Parse error: {error}");
                continue;
            }
        };
        let result = interpreter.run(&symbols, &program);
        for output in interpreter.take_output() {
            println!("{output}");
        }
        match result {
            Ok(results) => {
                for value in results {
                    if !value.is_absent() {
                        println!("{}", value.to_output());
                    }
                }
            }
            Err(error) => println!("Runtime error: {error}"),
        }
    }
}

/// Handles a `:`-prefixed REPL command; returns true to exit.
fn run_command(command: &str, interpreter: &Interpreter) -> bool {
    match command {
        "globals" => {
            for (name, value) in interpreter.globals().bindings() {
                println!("{name} = {}", value.to_output());
            }
            false
        }
        "quit" | "exit" | "q" => true,
        _ => {
            println!("Unrecognised command '{command}'");
            false
        }
    }
}
