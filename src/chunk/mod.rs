//! Bytecode chunks.
//!
//! A chunk owns three parallel pieces of state: the instruction bytes, one
//! source line per instruction byte for diagnostics, and the constant pool
//! its `Constant`-style opcodes index into. Code and line buffers are only
//! ever grown through [`Chunk::write`], which keeps them the same length.

use std::fmt::Write;

use crate::value::Value;

/// A single-byte instruction tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OpCode {
	Return = 0,
	Constant,
	Null,
	True,
	False,
	Pop,
	Print,
	DefineGlobal,
	DefineConstant,
	GetGlobal,
	SetGlobal,
	Equal,
	Greater,
	Less,
	Add,
	Subtract,
	Multiply,
	Divide,
	Modulo,
	Exponent,
	Lshift,
	Rshift,
	Not,
	Negate,
}

impl OpCode {
	/// Decode an instruction byte. Returns `None` for bytes outside the
	/// opcode range, which only happens on corrupt code.
	pub fn from_u8(byte: u8) -> Option<Self> {
		use OpCode::*;
		const OPCODES: [OpCode; 24] = [
			Return,
			Constant,
			Null,
			True,
			False,
			Pop,
			Print,
			DefineGlobal,
			DefineConstant,
			GetGlobal,
			SetGlobal,
			Equal,
			Greater,
			Less,
			Add,
			Subtract,
			Multiply,
			Divide,
			Modulo,
			Exponent,
			Lshift,
			Rshift,
			Not,
			Negate,
		];
		OPCODES.get(byte as usize).copied()
	}

	pub fn mnemonic(self) -> &'static str {
		use OpCode::*;
		match self {
			Return => "OP_RETURN",
			Constant => "OP_CONSTANT",
			Null => "OP_NULL",
			True => "OP_TRUE",
			False => "OP_FALSE",
			Pop => "OP_POP",
			Print => "OP_PRINT",
			DefineGlobal => "OP_DEFINE_GLOBAL",
			DefineConstant => "OP_DEFINE_CONSTANT",
			GetGlobal => "OP_GET_GLOBAL",
			SetGlobal => "OP_SET_GLOBAL",
			Equal => "OP_EQUAL",
			Greater => "OP_GREATER",
			Less => "OP_LESS",
			Add => "OP_ADD",
			Subtract => "OP_SUBTRACT",
			Multiply => "OP_MULTIPLY",
			Divide => "OP_DIVIDE",
			Modulo => "OP_MODULO",
			Exponent => "OP_EXPONENT",
			Lshift => "OP_LSHIFT",
			Rshift => "OP_RSHIFT",
			Not => "OP_NOT",
			Negate => "OP_NEGATE",
		}
	}

	/// Whether this opcode carries a one-byte constant pool index.
	fn has_constant_operand(self) -> bool {
		use OpCode::*;
		matches!(self, Constant | DefineGlobal | DefineConstant | GetGlobal | SetGlobal)
	}
}

/// A compiled unit of bytecode.
#[derive(Debug, Default)]
pub struct Chunk {
	pub(crate) code:      Vec<u8>,
	pub(crate) lines:     Vec<usize>,
	pub(crate) constants: Vec<Value>,
}

impl Chunk {
	pub fn new() -> Self { Self::default() }

	/// Append one instruction byte together with its source line.
	pub fn write(&mut self, byte: u8, line: usize) {
		self.code.push(byte);
		self.lines.push(line);
	}

	pub fn write_op(&mut self, op: OpCode, line: usize) { self.write(op as u8, line); }

	/// Append a value to the constant pool and return its index. The pool is
	/// append-only, so indices stay stable for the chunk's lifetime. The
	/// one-byte operand ceiling is the caller's to enforce.
	pub fn add_constant(&mut self, value: Value) -> usize {
		self.constants.push(value);
		self.constants.len() - 1
	}

	/// Source line of the instruction byte at `offset`.
	pub(crate) fn line_at(&self, offset: usize) -> usize {
		self.lines.get(offset).copied().unwrap_or_default()
	}

	/// Render the whole chunk as a human-readable listing.
	pub fn disassemble(&self, name: &str) -> String {
		let mut text = format!("======== {name} ========\n");
		let mut offset = 0;
		while offset < self.code.len() {
			let (line, next) = self.disassemble_instruction(offset);
			text.push_str(&line);
			text.push('\n');
			offset = next;
		}
		text
	}

	/// Render the instruction at `offset`; returns the text and the offset of
	/// the next instruction.
	pub fn disassemble_instruction(&self, offset: usize) -> (String, usize) {
		let mut text = format!("{offset:04} ");

		if offset > 0 && self.lines.get(offset) == self.lines.get(offset - 1) {
			text.push_str("   | ");
		} else {
			let _ = write!(text, "{:04} ", self.line_at(offset));
		}

		let Some(&byte) = self.code.get(offset) else {
			text.push_str("<past end of code>");
			return (text, offset + 1);
		};
		let Some(op) = OpCode::from_u8(byte) else {
			let _ = write!(text, "Unknown opcode {byte}");
			return (text, offset + 1);
		};

		text.push_str(op.mnemonic());
		if !op.has_constant_operand() {
			return (text, offset + 1);
		}

		match self.code.get(offset + 1) {
			Some(&index) => {
				let _ = write!(text, "({index:04})");
				match self.constants.get(index as usize) {
					Some(value) => {
						let _ = write!(text, " {value}");
					}
					None => text.push_str(" <missing constant>"),
				}
				(text, offset + 2)
			}
			None => {
				text.push_str(" <missing operand>");
				(text, offset + 1)
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn write_keeps_code_and_lines_parallel() {
		let mut chunk = Chunk::new();
		chunk.write_op(OpCode::Null, 1);
		chunk.write_op(OpCode::Pop, 1);
		chunk.write_op(OpCode::Return, 2);
		assert_eq!(chunk.code.len(), chunk.lines.len());
		assert_eq!(chunk.lines, vec![1, 1, 2]);
	}

	#[test]
	fn add_constant_returns_stable_indices() {
		let mut chunk = Chunk::new();
		assert_eq!(chunk.add_constant(Value::Number(1.0)), 0);
		assert_eq!(chunk.add_constant(Value::Number(2.0)), 1);
		assert_eq!(chunk.constants[0], Value::Number(1.0));
	}

	#[test]
	fn opcode_byte_round_trip() {
		for byte in 0..=u8::MAX {
			if let Some(op) = OpCode::from_u8(byte) {
				assert_eq!(op as u8, byte);
			}
		}
		assert_eq!(OpCode::from_u8(OpCode::Negate as u8 + 1), None);
	}

	#[test]
	fn disassemble_marks_line_continuations() {
		let mut chunk = Chunk::new();
		let index = chunk.add_constant(Value::Number(1.2)) as u8;
		chunk.write_op(OpCode::Constant, 1);
		chunk.write(index, 1);
		chunk.write_op(OpCode::Print, 1);
		chunk.write_op(OpCode::Return, 2);

		let text = chunk.disassemble("test");
		let lines: Vec<&str> = text.lines().collect();
		assert_eq!(lines[0], "======== test ========");
		assert_eq!(lines[1], "0000 0001 OP_CONSTANT(0000) 1.2");
		assert_eq!(lines[2], "0002    | OP_PRINT");
		assert_eq!(lines[3], "0003 0002 OP_RETURN");
	}

	#[test]
	fn disassemble_is_idempotent() {
		let mut chunk = Chunk::new();
		let index = chunk.add_constant(Value::Str("abc".into())) as u8;
		chunk.write_op(OpCode::Constant, 3);
		chunk.write(index, 3);
		chunk.write_op(OpCode::Return, 3);
		assert_eq!(chunk.disassemble("code"), chunk.disassemble("code"));
	}
}
