use std::collections::HashMap;

use crate::value::Value;

/// A failed declaration.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclareError {
	#[error("already defined")]
	AlreadyDefined,
}

/// A failed assignment.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetError {
	#[error("not defined")]
	NotDefined,
	#[error("constant not reassignable")]
	ConstantNotReassignable,
	#[error("type mismatch")]
	TypeMismatch,
}

/// One global binding: its current value and whether it is reassignable.
#[derive(Debug)]
struct Binding {
	value:    Value,
	constant: bool,
}

/// The global environment.
///
/// Globals are dynamically typed per slot, but each name is fixed to the kind
/// of its first assignment; the environment outlives any single chunk, which
/// is what lets successive prompt entries build on each other.
#[derive(Debug, Default)]
pub struct Environment {
	bindings: HashMap<String, Binding>,
}

impl Environment {
	pub fn new() -> Self { Self::default() }

	/// Declare a new binding. Declaring a name twice is rejected, never
	/// overwritten.
	pub fn declare(&mut self, name: &str, value: Value, constant: bool) -> Result<(), DeclareError> {
		if self.bindings.contains_key(name) {
			return Err(DeclareError::AlreadyDefined);
		}

		self.bindings.insert(name.to_string(), Binding { value, constant });
		Ok(())
	}

	/// Assign to an existing binding. On any failure the stored value is left
	/// untouched.
	pub fn set(&mut self, name: &str, value: Value) -> Result<(), SetError> {
		let Some(binding) = self.bindings.get_mut(name) else {
			return Err(SetError::NotDefined);
		};

		if binding.constant {
			return Err(SetError::ConstantNotReassignable);
		}

		if !binding.value.is_same_kind(&value) {
			return Err(SetError::TypeMismatch);
		}

		binding.value = value;
		Ok(())
	}

	pub fn get(&self, name: &str) -> Option<&Value> {
		self.bindings.get(name).map(|binding| &binding.value)
	}
}
