// marmoset - A bytecode-compiled scripting language written in Rust
// Copyright (c) 2025 Tom Waddington. MIT licensed.

use std::env;
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::process;

use marmoset_parser::Parser;
use marmoset_vm::{Compiler, SymbolTable, Value, GLOBALS_SIZE, VM};

fn main() {
    let args: Vec<String> = env::args().collect();

    // Handle --version flag
    if args.len() == 2 && (args[1] == "--version" || args[1] == "-v") {
        println!("Marmoset v0.1.0");
        return;
    }

    // If files provided, run them; otherwise start REPL
    if args.len() > 1 {
        run_files(&args[1..]);
    } else {
        run_repl();
    }
}

/// Run a sequence of source files
fn run_files(files: &[String]) {
    for file_path in files {
        if let Err(e) = run_file(file_path) {
            eprintln!("{}", e);
            process::exit(1);
        }
    }
}

/// Compile and execute a single source file
fn run_file(file_path: &str) -> Result<(), String> {
    let path = Path::new(file_path);

    // Validate file extension
    match path.extension().and_then(|e| e.to_str()) {
        Some("mar") => {}
        Some(ext) => {
            return Err(format!(
                "Error: unsupported file extension '.{}' for '{}'",
                ext, file_path
            ));
        }
        None => {
            return Err(format!(
                "Error: file '{}' has no extension (expected .mar)",
                file_path
            ));
        }
    }

    let source =
        fs::read_to_string(path).map_err(|e| format!("Error reading '{}': {}", file_path, e))?;

    let program = Parser::parse_str(&source)
        .map_err(|e| format!("Parse error in '{}': {}", file_path, e))?;

    let mut compiler = Compiler::new();
    compiler
        .compile(&program)
        .map_err(|e| format!("Compile error in '{}': {}", file_path, e))?;

    let mut vm = VM::new(compiler.bytecode());
    vm.execute()
        .map_err(|e| format!("Runtime error in '{}': {}", file_path, e))
}

/// Run the interactive REPL
fn run_repl() {
    println!("Marmoset v0.1.0");

    // Compilation and execution state persists across lines
    let (mut constants, mut symbols): (Vec<Value>, SymbolTable) = Compiler::new().into_state();
    let mut globals: Vec<Value> = vec![Value::Null; GLOBALS_SIZE];

    loop {
        print!(">> ");
        io::stdout().flush().unwrap();

        let mut input = String::new();
        match io::stdin().read_line(&mut input) {
            Ok(0) => {
                println!();
                break;
            }
            Ok(_) => {
                let input = input.trim();
                if input.is_empty() {
                    continue;
                }

                let program = match Parser::parse_str(input) {
                    Ok(program) => program,
                    Err(e) => {
                        eprintln!("{}", e);
                        continue;
                    }
                };

                let mut compiler = Compiler::new_with_state(constants, symbols);
                let compiled = compiler.compile(&program);
                let bytecode = compiler.bytecode();
                let state = compiler.into_state();
                constants = state.0;
                symbols = state.1;

                if let Err(e) = compiled {
                    eprintln!("Compile error: {}", e);
                    continue;
                }

                let mut vm = VM::new_with_state(bytecode, globals);
                match vm.execute() {
                    Ok(()) => println!("{}", vm.last_popped()),
                    Err(e) => eprintln!("Runtime error: {}", e),
                }
                globals = vm.into_globals();
            }
            Err(e) => {
                eprintln!("Read error: {}", e);
                break;
            }
        }
    }
}
