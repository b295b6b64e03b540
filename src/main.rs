use palc::Parser;
use rypl::cli::*;

fn main() {
	let mut runner = rypl::Runner::new();

	match Cli::parse().mode {
		Mode::File { path } => std::process::exit(runner.run_file(&path)),
		Mode::Repl => runner.run_prompt(),
	}
}
