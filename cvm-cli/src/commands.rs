//! CLI command implementations.
//!
//! Each command reports its own errors on stderr and returns the process
//! exit code on failure.

use std::fs;
use std::path::Path;

use cvm_common::Program;
use cvm_vm::{Config, VM};
use tracing::debug;

/// Unreadable input file or assembly error.
pub const EXIT_INPUT: i32 = 1;
/// Runtime error while executing.
pub const EXIT_RUNTIME: i32 = 3;

/// Read and assemble a program file.
pub fn load(input: &Path) -> Result<Program, i32> {
    let text = fs::read_to_string(input).map_err(|e| {
        eprintln!("error: cannot read '{}': {e}", input.display());
        EXIT_INPUT
    })?;

    let program = cvm_assembler::assemble(&text).map_err(|e| {
        eprintln!("error: {}: {e}", input.display());
        EXIT_INPUT
    })?;

    debug!(
        path = %input.display(),
        instructions = program.len(),
        entry = program.entry(),
        "loaded program"
    );
    Ok(program)
}

/// Execute a program and return its printed lines.
pub fn execute(program: &Program, config: &Config) -> Result<Vec<String>, i32> {
    let mut vm = VM::new(config.clone());
    vm.execute(&program.instructions, program.entry())
        .map_err(|e| {
            eprintln!("runtime error: {e}");
            EXIT_RUNTIME
        })
}

/// Assemble and run a program, printing one output line per `print`.
pub fn run(input: &Path, config: &Config) -> Result<(), i32> {
    let program = load(input)?;
    for line in execute(&program, config)? {
        println!("{line}");
    }
    Ok(())
}

/// Print the numbered, resolved instruction listing.
pub fn assemble(input: &Path) -> Result<(), i32> {
    let program = load(input)?;
    print!("{program}");
    eprintln!(
        "assembled {} instructions, entry {}",
        program.len(),
        program.entry()
    );
    Ok(())
}

/// Print canonical assembly text that reassembles to the same program.
pub fn disassemble(input: &Path) -> Result<(), i32> {
    let program = load(input)?;
    print!("{}", cvm_assembler::disassemble(&program));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn program_file(text: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(text.as_bytes()).unwrap();
        file
    }

    #[test]
    fn load_valid_program() {
        let file = program_file("MAIN:\n  push 1\n  print\n  return\n");
        let program = load(file.path()).unwrap();
        assert_eq!(program.len(), 3);
    }

    #[test]
    fn load_missing_file() {
        assert_eq!(
            load(Path::new("/nonexistent/program.asm")).unwrap_err(),
            EXIT_INPUT
        );
    }

    #[test]
    fn load_assembly_error() {
        let file = program_file("MAIN:\n  frob\n");
        assert_eq!(load(file.path()).unwrap_err(), EXIT_INPUT);
    }

    #[test]
    fn execute_collects_output() {
        let file = program_file("MAIN:\n  push 6\n  push 7\n  mul\n  print\n  return\n");
        let program = load(file.path()).unwrap();
        assert_eq!(execute(&program, &Config::default()).unwrap(), vec!["42"]);
    }

    #[test]
    fn execute_runtime_error_code() {
        let file = program_file("MAIN:\n  push 1\n  push 0\n  div\n");
        let program = load(file.path()).unwrap();
        assert_eq!(
            execute(&program, &Config::default()).unwrap_err(),
            EXIT_RUNTIME
        );
    }
}
