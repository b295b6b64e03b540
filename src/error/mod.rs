pub mod compiler;
pub mod vm;

/// YplError is the top-level error type for the rypl compiler and virtual machine.
#[derive(thiserror::Error, Debug)]
pub enum YplError {
	/// Internal error, should never happen
	#[error("InternalError: {0}")]
	Internal(#[from] anyhow::Error),
	/// Compile diagnostics were reported; the chunk must not be executed
	#[error("Generated {0} compile errors")]
	CompileErrors(usize),
	/// Runtime error encountered while executing a chunk
	#[error(transparent)]
	Runtime(#[from] vm::RuntimeError),
}

impl YplError {
	/// Conventional interpreter exit code for this failure.
	pub fn exit_code(&self) -> i32 {
		match self {
			YplError::CompileErrors(_) => 65,
			YplError::Runtime(_) | YplError::Internal(_) => 70,
		}
	}
}
