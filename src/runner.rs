use std::{fs::read_to_string, io::Write, path::Path};

use crate::{vm::Vm, YplError};

/// Runner drives the compile-then-run cycle for script files and the REPL.
///
/// It owns a single virtual machine, so successive prompt entries share one
/// global environment.
#[derive(Default)]
pub struct Runner {
	vm: Vm,
}

impl Runner {
	pub fn new() -> Self { Self { vm: Vm::new() } }

	/// Run a script file and return the process exit code: 0 on success, 65
	/// for compile errors, 70 for runtime errors, 74 when the file cannot be
	/// read.
	pub fn run_file<P: AsRef<Path>>(&mut self, path: P) -> i32 {
		let source = match read_to_string(&path) {
			Ok(source) => source,
			Err(error) => {
				eprintln!("Failed to open file {}: {error}", path.as_ref().display());
				return 74;
			}
		};

		match self.interpret(&source) {
			Ok(()) => 0,
			Err(error) => {
				report(&error);
				error.exit_code()
			}
		}
	}

	/// Run the interactive prompt until end of input. Errors are reported and
	/// the prompt continues.
	pub fn run_prompt(&mut self) {
		let mut input = String::new();
		let stdin = std::io::stdin();
		loop {
			input.clear();
			print!("ypl> ");
			if let Err(error) = std::io::stdout().flush() {
				eprintln!("Failed flush: {error}");
			}
			match stdin.read_line(&mut input) {
				Ok(0) => {
					println!("\nExited rypl repl");
					break;
				}
				Ok(_) => {}
				Err(error) => {
					eprintln!("Failed read line: {error}");
					continue;
				}
			}
			if let Err(error) = self.interpret(input.trim()) {
				report(&error);
			}
		}
	}

	/// Compile and execute one source buffer on the shared machine.
	pub fn interpret(&mut self, source: &str) -> Result<(), YplError> { self.vm.interpret(source) }
}

/// Compile diagnostics reach stderr as the compiler emits them, so only the
/// other failures are printed here.
fn report(error: &YplError) {
	match error {
		YplError::CompileErrors(_) => {}
		YplError::Runtime(_) | YplError::Internal(_) => eprintln!("{error}"),
	}
}
