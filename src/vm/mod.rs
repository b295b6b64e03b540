//! The stack-based virtual machine.
//!
//! `interpret` compiles a source buffer into a fresh chunk and, when that
//! succeeds, executes it instruction by instruction over a bounds-checked
//! read cursor. The operand stack has a fixed capacity; overflowing it is a
//! detected runtime error rather than a silent write past the end. The
//! global environment lives on the machine itself and survives across
//! `interpret` calls, which is what gives the prompt its memory.

use std::io::{self, Stdout, Write};

use anyhow::{anyhow, Context};

use crate::{
	chunk::{Chunk, OpCode},
	compiler::Compiler,
	environment::{Environment, SetError},
	error::vm::{RuntimeError, RuntimeErrorKind, VmError},
	value::Value,
	YplError,
};

/// Operand stack capacity, in values.
const STACK_MAX: usize = 256;

/// A ypl virtual machine, generic over where `print` writes.
pub struct Vm<W: Write = Stdout> {
	stack:   Vec<Value>,
	globals: Environment,
	out:     W,
}

impl Vm<Stdout> {
	/// A machine printing to standard output.
	pub fn new() -> Self { Self::with_output(io::stdout()) }
}

impl Default for Vm<Stdout> {
	fn default() -> Self { Self::new() }
}

impl<W: Write> Vm<W> {
	/// A machine printing to the given sink.
	pub fn with_output(out: W) -> Self {
		Self { stack: Vec::with_capacity(STACK_MAX), globals: Environment::new(), out }
	}

	/// Everything `print` has written so far.
	pub fn output(&self) -> &W { &self.out }

	/// Compile `source` into a fresh chunk and run it.
	///
	/// Compile failures return before any instruction executes. The first
	/// runtime failure aborts the run and empties the operand stack; global
	/// definitions made before the failing instruction stay in place.
	pub fn interpret(&mut self, source: &str) -> Result<(), YplError> {
		let mut chunk = Chunk::new();
		Compiler::new(source, &mut chunk).compile()?;

		self.run(&chunk).map_err(|error| match error {
			VmError::Internal(error) => YplError::Internal(error),
			VmError::Runtime(error) => YplError::Runtime(error),
		})
	}

	fn run(&mut self, chunk: &Chunk) -> Result<(), VmError> {
		let result = self.execute(chunk);
		if result.is_err() {
			self.stack.clear();
		}
		result
	}

	fn execute(&mut self, chunk: &Chunk) -> Result<(), VmError> {
		let mut ip = 0usize;

		loop {
			#[cfg(feature = "trace-execution")]
			{
				let mut trace = String::from("          ");
				for slot in &self.stack {
					trace.push_str(&format!("[ {slot} ]"));
				}
				println!("{trace}");
				println!("{}", chunk.disassemble_instruction(ip).0);
			}

			let offset = ip;
			let op = self.read_op(chunk, &mut ip)?;

			match op {
				OpCode::Constant => {
					let value = self.read_constant(chunk, &mut ip)?;
					self.push(chunk, offset, value)?;
				}
				OpCode::Null => self.push(chunk, offset, Value::Null)?,
				OpCode::True => self.push(chunk, offset, Value::Bool(true))?,
				OpCode::False => self.push(chunk, offset, Value::Bool(false))?,
				OpCode::Not => {
					let value = self.pop()?;
					self.push(chunk, offset, Value::Bool(value.is_falsey()))?;
				}
				OpCode::Negate => {
					let value = self.pop()?;
					let Value::Number(n) = value else {
						return Err(fault(chunk, offset, RuntimeErrorKind::OperandNotNumber));
					};
					self.push(chunk, offset, Value::Number(-n))?;
				}
				// Addition is the one polymorphic operator: numeric addition
				// or string concatenation, nothing mixed.
				OpCode::Add => {
					let both_numbers = matches!(
						(self.peek(1), self.peek(0)),
						(Some(Value::Number(_)), Some(Value::Number(_)))
					);
					let both_strings =
						matches!((self.peek(1), self.peek(0)), (Some(Value::Str(_)), Some(Value::Str(_))));

					if both_numbers {
						self.binary_number_op(chunk, offset, |a, b| Ok(Value::Number(a + b)))?;
					} else if both_strings {
						self.binary_op(chunk, offset, Value::into_str, RuntimeErrorKind::OperandsNotStrings, |a, b| {
							Ok(Value::Str(a + &b))
						})?;
					} else {
						return Err(fault(chunk, offset, RuntimeErrorKind::OperandsNotAddable));
					}
				}
				OpCode::Subtract => self.binary_number_op(chunk, offset, |a, b| Ok(Value::Number(a - b)))?,
				OpCode::Multiply => self.binary_number_op(chunk, offset, |a, b| Ok(Value::Number(a * b)))?,
				OpCode::Divide => self.binary_number_op(chunk, offset, |a, b| Ok(Value::Number(a / b)))?,
				OpCode::Exponent => {
					self.binary_number_op(chunk, offset, |a, b| Ok(Value::Number(a.powf(b))))?;
				}
				// The bitwise family truncates both operands to integers and
				// converts the result back to a number.
				OpCode::Lshift => self.binary_number_op(chunk, offset, |a, b| {
					Ok(Value::Number(((a as i64).wrapping_shl(b as i64 as u32)) as f64))
				})?,
				OpCode::Rshift => self.binary_number_op(chunk, offset, |a, b| {
					Ok(Value::Number(((a as i64).wrapping_shr(b as i64 as u32)) as f64))
				})?,
				OpCode::Modulo => self.binary_number_op(chunk, offset, |a, b| {
					if b as i64 == 0 {
						return Err(RuntimeErrorKind::ModuloByZero);
					}
					Ok(Value::Number((a as i64 % b as i64) as f64))
				})?,
				OpCode::Equal => {
					let b = self.pop()?;
					let a = self.pop()?;
					self.push(chunk, offset, Value::Bool(a == b))?;
				}
				OpCode::Greater => self.binary_number_op(chunk, offset, |a, b| Ok(Value::Bool(a > b)))?,
				OpCode::Less => self.binary_number_op(chunk, offset, |a, b| Ok(Value::Bool(a < b)))?,
				OpCode::Print => {
					let value = self.pop()?;
					writeln!(self.out, "{value}").context("Failed to write print output")?;
				}
				OpCode::Pop => {
					self.pop()?;
				}
				OpCode::DefineGlobal => self.define_global(chunk, &mut ip, offset, false)?,
				OpCode::DefineConstant => self.define_global(chunk, &mut ip, offset, true)?,
				OpCode::GetGlobal => {
					let name = self.read_global_name(chunk, &mut ip)?;
					let Some(value) = self.globals.get(&name) else {
						return Err(fault(chunk, offset, RuntimeErrorKind::UndefinedVariable(name)));
					};
					let value = value.clone();
					self.push(chunk, offset, value)?;
				}
				OpCode::SetGlobal => {
					let name = self.read_global_name(chunk, &mut ip)?;
					// Assignment is an expression; the value stays on the
					// stack for the surrounding expression to consume.
					let value = self
						.peek(0)
						.cloned()
						.ok_or_else(|| anyhow!("assignment with an empty operand stack"))?;
					if let Err(error) = self.globals.set(&name, value) {
						let kind = match error {
							SetError::NotDefined => RuntimeErrorKind::UndefinedVariable(name),
							SetError::ConstantNotReassignable => {
								RuntimeErrorKind::ConstantNotReassignable(name)
							}
							SetError::TypeMismatch => RuntimeErrorKind::TypeMismatch(name),
						};
						return Err(fault(chunk, offset, kind));
					}
				}
				OpCode::Return => {
					// Top-level terminator; a leftover value is discarded.
					self.stack.pop();
					return Ok(());
				}
			}
		}
	}

	fn define_global(
		&mut self,
		chunk: &Chunk,
		ip: &mut usize,
		offset: usize,
		constant: bool,
	) -> Result<(), VmError> {
		let name = self.read_global_name(chunk, ip)?;
		let value = self.pop()?;
		if self.globals.declare(&name, value, constant).is_err() {
			return Err(fault(chunk, offset, RuntimeErrorKind::AlreadyDefined(name)));
		}
		Ok(())
	}

	/// The shared machinery behind every checked binary opcode: pops both
	/// operands, verifies they carry the kind `extract` asks for, applies
	/// `op` and pushes its result.
	fn binary_op<T>(
		&mut self,
		chunk: &Chunk,
		offset: usize,
		extract: fn(Value) -> Option<T>,
		mismatch: RuntimeErrorKind,
		op: impl FnOnce(T, T) -> Result<Value, RuntimeErrorKind>,
	) -> Result<(), VmError> {
		let b = self.pop()?;
		let a = self.pop()?;

		match (extract(a), extract(b)) {
			(Some(a), Some(b)) => {
				let value = op(a, b).map_err(|kind| fault(chunk, offset, kind))?;
				self.push(chunk, offset, value)
			}
			_ => Err(fault(chunk, offset, mismatch)),
		}
	}

	fn binary_number_op(
		&mut self,
		chunk: &Chunk,
		offset: usize,
		op: impl FnOnce(f64, f64) -> Result<Value, RuntimeErrorKind>,
	) -> Result<(), VmError> {
		self.binary_op(chunk, offset, Value::into_number, RuntimeErrorKind::OperandsNotNumbers, op)
	}

	// --- Stack and code plumbing ---

	fn push(&mut self, chunk: &Chunk, offset: usize, value: Value) -> Result<(), VmError> {
		if self.stack.len() >= STACK_MAX {
			return Err(fault(chunk, offset, RuntimeErrorKind::StackOverflow));
		}
		self.stack.push(value);
		Ok(())
	}

	fn pop(&mut self) -> Result<Value, VmError> {
		self.stack.pop().ok_or_else(|| VmError::Internal(anyhow!("operand stack underflow")))
	}

	fn peek(&self, distance: usize) -> Option<&Value> {
		self.stack.len().checked_sub(1 + distance).and_then(|index| self.stack.get(index))
	}

	fn read_byte(&self, chunk: &Chunk, ip: &mut usize) -> Result<u8, VmError> {
		let byte = chunk
			.code
			.get(*ip)
			.copied()
			.ok_or_else(|| anyhow!("instruction cursor ran past the end of the chunk"))?;
		*ip += 1;
		Ok(byte)
	}

	fn read_op(&self, chunk: &Chunk, ip: &mut usize) -> Result<OpCode, VmError> {
		let byte = self.read_byte(chunk, ip)?;
		OpCode::from_u8(byte).ok_or_else(|| VmError::Internal(anyhow!("unknown opcode {byte}")))
	}

	fn read_constant(&self, chunk: &Chunk, ip: &mut usize) -> Result<Value, VmError> {
		let index = self.read_byte(chunk, ip)? as usize;
		chunk
			.constants
			.get(index)
			.cloned()
			.ok_or_else(|| VmError::Internal(anyhow!("constant index {index} out of range")))
	}

	fn read_global_name(&self, chunk: &Chunk, ip: &mut usize) -> Result<String, VmError> {
		match self.read_constant(chunk, ip)? {
			Value::Str(name) => Ok(name),
			value => Err(VmError::Internal(anyhow!("global name constant holds {value:?}"))),
		}
	}
}

fn fault(chunk: &Chunk, offset: usize, kind: RuntimeErrorKind) -> VmError {
	VmError::Runtime(RuntimeError::new(chunk.line_at(offset), kind))
}
