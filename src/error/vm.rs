use std::fmt;

/// Errors produced while running a chunk.
#[derive(thiserror::Error, Debug)]
pub enum VmError {
	/// Internal error, should never happen on bytecode the compiler emitted
	#[error("{0}")]
	Internal(#[from] anyhow::Error),
	/// A failed runtime check
	#[error(transparent)]
	Runtime(#[from] RuntimeError),
}

/// A runtime failure plus the source line of the faulting instruction.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind}\n[line {line}] in script")]
pub struct RuntimeError {
	line: usize,
	kind: RuntimeErrorKind,
}

impl RuntimeError {
	pub fn new(line: usize, kind: RuntimeErrorKind) -> Self { Self { line, kind } }

	pub fn line(&self) -> usize { self.line }

	pub fn kind(&self) -> &RuntimeErrorKind { &self.kind }
}

/// The individual runtime checks that can fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeErrorKind {
	/// Unary numeric opcode applied to a non-number.
	OperandNotNumber,
	/// Binary numeric opcode applied to non-numbers.
	OperandsNotNumbers,
	/// String opcode applied to non-strings.
	OperandsNotStrings,
	/// Addition of a mix the language does not define.
	OperandsNotAddable,
	/// Modulo with a zero right-hand side.
	ModuloByZero,
	/// Read of a global that was never declared.
	UndefinedVariable(String),
	/// Declaration of a name that already exists.
	AlreadyDefined(String),
	/// Assignment to a global declared constant.
	ConstantNotReassignable(String),
	/// Assignment changing the kind a global was first bound to.
	TypeMismatch(String),
	/// Push past the operand stack capacity.
	StackOverflow,
}

impl fmt::Display for RuntimeErrorKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		use RuntimeErrorKind::*;
		match self {
			OperandNotNumber => write!(f, "Operand must be a number."),
			OperandsNotNumbers => write!(f, "Operands must be numbers."),
			OperandsNotStrings => write!(f, "Operands must be strings."),
			OperandsNotAddable => write!(f, "Operands must be two numbers or two strings."),
			ModuloByZero => write!(f, "Modulo by zero."),
			UndefinedVariable(name) => write!(f, "Undefined variable '{name}'."),
			AlreadyDefined(name) => write!(f, "Variable '{name}' is already defined."),
			ConstantNotReassignable(name) => write!(f, "Cannot reassign constant '{name}'."),
			TypeMismatch(name) => write!(f, "Cannot assign a value of a different type to '{name}'."),
			StackOverflow => write!(f, "Stack overflow."),
		}
	}
}
