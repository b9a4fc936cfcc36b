// theta - A mixin-based experimental language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

use std::env;
use std::fs;
use std::process;

use theta_parser::Parser;
use theta_vm::{VM, compile, dump_object};

fn main() {
    let args: Vec<String> = env::args().collect();

    let path = match args.len() {
        1 => "test.theta",
        2 => args[1].as_str(),
        _ => {
            eprintln!("usage: theta [source-file]");
            process::exit(1);
        }
    };

    if let Err(e) = run_file(path) {
        eprintln!("{}", e);
        process::exit(1);
    }
}

/// Run the whole pipeline over one source file, dumping the bytecode and the
/// final object graph to stdout.
fn run_file(path: &str) -> Result<(), String> {
    let source =
        fs::read_to_string(path).map_err(|e| format!("Error reading '{}': {}", path, e))?;

    let program = Parser::parse_program_str(&source)
        .map_err(|e| format!("Error in '{}': {}", path, e))?;

    let bc_program = compile(&program).map_err(|e| format!("Error in '{}': {}", path, e))?;

    print!("{}", bc_program.dump());

    let mut vm = VM::new();
    let object = vm
        .run_program(&bc_program)
        .map_err(|e| format!("Error in '{}': {}", path, e))?;

    println!("{}", dump_object(vm.heap(), object));

    Ok(())
}
