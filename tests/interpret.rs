use rypl::{Chunk, Compiler, RuntimeErrorKind, Vm, YplError};

fn run(source: &str) -> (Result<(), YplError>, String) {
	let mut vm = Vm::with_output(Vec::new());
	let result = vm.interpret(source);
	let output = String::from_utf8(vm.output().clone()).expect("print output is UTF-8");
	(result, output)
}

fn run_ok(source: &str) -> String {
	let (result, output) = run(source);
	assert!(result.is_ok(), "unexpected failure: {result:?}");
	output
}

#[test]
fn literal_round_trip() {
	assert_eq!(run_ok("print 1.2;"), "1.2\n");
	assert_eq!(run_ok("print true;"), "true\n");
	assert_eq!(run_ok("print false;"), "false\n");
	assert_eq!(run_ok("print null;"), "NULL\n");
	assert_eq!(run_ok(r#"print "abc";"#), "abc\n");
}

#[test]
fn numeric_literals_scan_like_they_parse() {
	// Printing a numeric literal reproduces the value a direct parse of the
	// same text yields.
	for text in ["0", "7", "42", "0.5", "3.14", "123.456", "1000000"] {
		let direct: f64 = text.parse().unwrap();
		assert_eq!(run_ok(&format!("print {text};")), format!("{direct}\n"), "literal {text}");
	}
}

#[test]
fn division_binds_before_addition() {
	assert_eq!(run_ok("print 3.4 + 5.6 / 1.2 - 2;"), format!("{}\n", 3.4 + 5.6 / 1.2 - 2.0));
}

#[test]
fn global_mutation() {
	assert_eq!(run_ok("let x = 1; x = 2; print x;"), "2\n");
}

#[test]
fn constant_reassignment_fails_and_preserves_value() {
	let mut vm = Vm::with_output(Vec::new());
	vm.interpret("const y = 1;").unwrap();
	match vm.interpret("y = 2;") {
		Err(YplError::Runtime(error)) => {
			assert_eq!(*error.kind(), RuntimeErrorKind::ConstantNotReassignable("y".into()));
		}
		other => panic!("expected runtime error, got {other:?}"),
	}
	vm.interpret("print y;").unwrap();
	assert_eq!(String::from_utf8(vm.output().clone()).unwrap(), "1\n");
}

#[test]
fn assignment_cannot_change_a_global_kind() {
	let mut vm = Vm::with_output(Vec::new());
	vm.interpret("let z = 1;").unwrap();
	match vm.interpret(r#"z = "s";"#) {
		Err(YplError::Runtime(error)) => {
			assert_eq!(*error.kind(), RuntimeErrorKind::TypeMismatch("z".into()));
		}
		other => panic!("expected runtime error, got {other:?}"),
	}
	vm.interpret("print z;").unwrap();
	assert_eq!(String::from_utf8(vm.output().clone()).unwrap(), "1\n");
}

#[test]
fn undefined_global_read_prints_nothing() {
	let (result, output) = run("print undefinedName;");
	assert!(matches!(result, Err(YplError::Runtime(_))));
	assert_eq!(output, "");
}

#[test]
fn type_confusion_is_a_runtime_error() {
	for source in [r#"1 + "s";"#, r#""s" - "t";"#, "true + 1;"] {
		let (result, _) = run(source);
		assert!(matches!(result, Err(YplError::Runtime(_))), "source {source}");
	}
}

#[test]
fn constant_pool_overflow_is_a_compile_error() {
	let source: String = (0..257).map(|i| format!("print {i};")).collect::<Vec<_>>().join("\n");
	let (result, output) = run(&source);
	assert!(matches!(result, Err(YplError::CompileErrors(_))));
	// Nothing executed.
	assert_eq!(output, "");
}

#[test]
fn two_malformed_statements_yield_two_diagnostics() {
	let (result, _) = run("let 1; print ;");
	assert!(matches!(result, Err(YplError::CompileErrors(2))));
}

#[test]
fn exit_codes() {
	assert_eq!(YplError::CompileErrors(1).exit_code(), 65);
	let (runtime, _) = run("print -true;");
	assert_eq!(runtime.unwrap_err().exit_code(), 70);
}

#[test]
fn disassembly_is_a_pure_function_of_the_chunk() {
	let mut chunk = Chunk::new();
	let mut compiler = Compiler::new("let x = 1;\nprint x + 2;", &mut chunk);
	compiler.compile().unwrap();
	drop(compiler);

	let first = chunk.disassemble("code");
	let second = chunk.disassemble("code");
	assert_eq!(first, second);
	assert!(first.contains("OP_DEFINE_GLOBAL"));
	assert!(first.contains("OP_GET_GLOBAL"));
}

#[test]
fn file_driver_runs_a_script() {
	let path = std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests").join("test.ypl");
	let mut runner = rypl::Runner::new();
	assert_eq!(runner.run_file(&path), 0);
}

#[test]
fn file_driver_reports_missing_files() {
	let mut runner = rypl::Runner::new();
	assert_eq!(runner.run_file("definitely/not/a/file.ypl"), 74);
}
