//! Single-pass compilation of ypl source text into bytecode.
//!
//! There is no syntax tree. The compiler pulls tokens from the scanner one at
//! a time and emits instructions into the chunk as it recognizes grammar, the
//! classic Pratt arrangement: each token kind owns a prefix rule, an infix
//! rule, and a binding power, and `parse_precedence` climbs them.
//!
//! Errors never abort the pass. A diagnostic flips the compiler into panic
//! mode, which swallows further diagnostics until `synchronize` skips ahead
//! to a statement boundary, so one broken statement yields one message.

mod rules;

use rules::{rule_for, Handler, Precedence};

use crate::{
	chunk::{Chunk, OpCode},
	error::compiler::{Diagnostic, DiagnosticTarget},
	scanner::{Scanner, Token, TokenKind},
	value::Value,
	YplError,
};

/// Compiles one source buffer into a caller-supplied chunk.
pub struct Compiler<'src, 'c> {
	scanner:     Scanner<'src>,
	chunk:       &'c mut Chunk,
	previous:    Token<'src>,
	current:     Token<'src>,
	had_error:   bool,
	panic_mode:  bool,
	diagnostics: Vec<Diagnostic>,
}

impl<'src, 'c> Compiler<'src, 'c> {
	pub fn new(source: &'src str, chunk: &'c mut Chunk) -> Self {
		let placeholder = Token::new(TokenKind::FileEof, "", 1);
		Self {
			scanner: Scanner::new(source),
			chunk,
			previous: placeholder,
			current: placeholder,
			had_error: false,
			panic_mode: false,
			diagnostics: Vec::new(),
		}
	}

	/// Run the pass. On failure the error carries the diagnostic count; the
	/// individual messages have already been written to stderr.
	pub fn compile(&mut self) -> Result<(), YplError> {
		self.advance();
		while !self.match_token(TokenKind::FileEof) {
			self.declaration();
		}
		self.end_compiler();

		if self.had_error {
			return Err(YplError::CompileErrors(self.diagnostics.len()));
		}
		Ok(())
	}

	/// The diagnostics reported so far, in source order.
	pub fn diagnostics(&self) -> &[Diagnostic] { &self.diagnostics }

	// --- Token plumbing ---

	/// Step to the next real token, reporting and skipping scan errors.
	fn advance(&mut self) {
		self.previous = self.current;
		loop {
			self.current = self.scanner.scan_token();
			if self.current.kind != TokenKind::Error {
				break;
			}

			self.error_at_current(self.current.lexeme);
		}
	}

	fn consume(&mut self, kind: TokenKind, message: &str) {
		if self.current.kind == kind {
			self.advance();
			return;
		}

		self.error_at_current(message);
	}

	fn check(&self, kind: TokenKind) -> bool { self.current.kind == kind }

	fn match_token(&mut self, kind: TokenKind) -> bool {
		if !self.check(kind) {
			return false;
		}
		self.advance();
		true
	}

	// --- Declarations and statements ---

	fn declaration(&mut self) {
		if self.match_token(TokenKind::Let) {
			self.variable_declaration();
		} else if self.match_token(TokenKind::Const) {
			self.constant_declaration();
		} else {
			self.statement();
		}

		if self.panic_mode {
			self.synchronize();
		}
	}

	fn variable_declaration(&mut self) {
		let global = self.parse_variable_name("Expected variable name.");

		if self.match_token(TokenKind::Equal) {
			self.expression();
		} else {
			// An uninitialized variable starts out null.
			self.emit_op(OpCode::Null);
		}

		self.consume(TokenKind::Semicolon, "Expected ';' after variable declaration.");
		self.emit_with_operand(OpCode::DefineGlobal, global);
	}

	fn constant_declaration(&mut self) {
		let global = self.parse_variable_name("Expected constant name.");
		self.consume(TokenKind::Equal, "Expected '=' after constant name.");
		self.expression();
		self.consume(TokenKind::Semicolon, "Expected ';' after constant declaration.");
		self.emit_with_operand(OpCode::DefineConstant, global);
	}

	fn parse_variable_name(&mut self, message: &str) -> u8 {
		self.consume(TokenKind::Identifier, message);
		self.identifier_constant(self.previous)
	}

	fn statement(&mut self) {
		if self.match_token(TokenKind::Print) {
			self.print_statement();
		} else {
			self.expression_statement();
		}
	}

	fn print_statement(&mut self) {
		self.expression();
		self.consume(TokenKind::Semicolon, "Expected ';' after value.");
		self.emit_op(OpCode::Print);
	}

	fn expression_statement(&mut self) {
		self.expression();
		self.consume(TokenKind::Semicolon, "Expected ';' after expression.");
		self.emit_op(OpCode::Pop);
	}

	/// Skip ahead to the next statement boundary, leaving panic mode.
	fn synchronize(&mut self) {
		self.panic_mode = false;

		while self.current.kind != TokenKind::FileEof {
			if self.previous.kind == TokenKind::Semicolon {
				return;
			}

			match self.current.kind {
				TokenKind::Class
				| TokenKind::Fun
				| TokenKind::Let
				| TokenKind::Const
				| TokenKind::For
				| TokenKind::If
				| TokenKind::While
				| TokenKind::Print
				| TokenKind::Return => return,
				_ => self.advance(),
			}
		}
	}

	// --- Expressions ---

	fn expression(&mut self) { self.parse_precedence(Precedence::Assignment); }

	fn parse_precedence(&mut self, precedence: Precedence) {
		self.advance();
		let Some(prefix) = rule_for(self.previous.kind).prefix else {
			self.error("Expected expression.");
			return;
		};

		// Assignment may only be consumed by a target parsed at the lowest
		// binding power; anything deeper reports the bad target instead.
		let can_assign = precedence <= Precedence::Assignment;
		self.dispatch(prefix, can_assign);

		while precedence <= rule_for(self.current.kind).precedence {
			self.advance();
			let Some(infix) = rule_for(self.previous.kind).infix else {
				break;
			};
			self.dispatch(infix, can_assign);
		}

		if can_assign && self.match_token(TokenKind::Equal) {
			self.error("Invalid assignment target.");
		}
	}

	fn dispatch(&mut self, handler: Handler, can_assign: bool) {
		match handler {
			Handler::Grouping => self.grouping(),
			Handler::Unary => self.unary(),
			Handler::Binary => self.binary(),
			Handler::Number => self.number(),
			Handler::Str => self.string(),
			Handler::Literal => self.literal(),
			Handler::Variable => self.variable(can_assign),
		}
	}

	fn grouping(&mut self) {
		self.expression();
		self.consume(TokenKind::RightParen, "Expected ')' after expression.");
	}

	fn unary(&mut self) {
		let operator = self.previous.kind;
		self.parse_precedence(Precedence::Unary);

		match operator {
			TokenKind::Minus => self.emit_op(OpCode::Negate),
			TokenKind::Bang => self.emit_op(OpCode::Not),
			_ => {}
		}
	}

	fn binary(&mut self) {
		let operator = self.previous.kind;
		let rule = rule_for(operator);
		self.parse_precedence(rule.precedence.stronger());

		match operator {
			TokenKind::Plus => self.emit_op(OpCode::Add),
			TokenKind::Minus => self.emit_op(OpCode::Subtract),
			TokenKind::Star => self.emit_op(OpCode::Multiply),
			TokenKind::Slash => self.emit_op(OpCode::Divide),
			TokenKind::Modulo => self.emit_op(OpCode::Modulo),
			TokenKind::Exponent => self.emit_op(OpCode::Exponent),
			TokenKind::Lshift => self.emit_op(OpCode::Lshift),
			TokenKind::Rshift => self.emit_op(OpCode::Rshift),
			TokenKind::EqualEqual => self.emit_op(OpCode::Equal),
			TokenKind::Greater => self.emit_op(OpCode::Greater),
			TokenKind::Less => self.emit_op(OpCode::Less),
			// The remaining comparisons compile to a canonical pair.
			TokenKind::BangEqual => {
				self.emit_op(OpCode::Equal);
				self.emit_op(OpCode::Not);
			}
			TokenKind::GreaterEqual => {
				self.emit_op(OpCode::Less);
				self.emit_op(OpCode::Not);
			}
			TokenKind::LessEqual => {
				self.emit_op(OpCode::Greater);
				self.emit_op(OpCode::Not);
			}
			_ => {}
		}
	}

	fn number(&mut self) {
		let value: f64 = match self.previous.lexeme.parse() {
			Ok(value) => value,
			Err(_) => {
				self.error("Invalid number literal.");
				return;
			}
		};
		self.emit_constant(Value::Number(value));
	}

	fn string(&mut self) {
		// Drop the surrounding quotes from the lexeme.
		let lexeme = self.previous.lexeme;
		let text = &lexeme[1..lexeme.len() - 1];
		self.emit_constant(Value::Str(text.to_string()));
	}

	fn literal(&mut self) {
		match self.previous.kind {
			TokenKind::False => self.emit_op(OpCode::False),
			TokenKind::True => self.emit_op(OpCode::True),
			TokenKind::Null => self.emit_op(OpCode::Null),
			_ => {}
		}
	}

	fn variable(&mut self, can_assign: bool) { self.named_variable(self.previous, can_assign); }

	fn named_variable(&mut self, token: Token<'src>, can_assign: bool) {
		let global = self.identifier_constant(token);

		if can_assign && self.match_token(TokenKind::Equal) {
			self.expression();
			self.emit_with_operand(OpCode::SetGlobal, global);
		} else {
			self.emit_with_operand(OpCode::GetGlobal, global);
		}
	}

	fn identifier_constant(&mut self, token: Token<'src>) -> u8 {
		self.make_constant(Value::Str(token.lexeme.to_string()))
	}

	// --- Emission ---

	fn emit_byte(&mut self, byte: u8) { self.chunk.write(byte, self.previous.line); }

	fn emit_op(&mut self, op: OpCode) { self.emit_byte(op as u8); }

	fn emit_with_operand(&mut self, op: OpCode, operand: u8) {
		self.emit_op(op);
		self.emit_byte(operand);
	}

	fn emit_constant(&mut self, value: Value) {
		let index = self.make_constant(value);
		self.emit_with_operand(OpCode::Constant, index);
	}

	fn make_constant(&mut self, value: Value) -> u8 {
		let index = self.chunk.add_constant(value);
		if index > u8::MAX as usize {
			self.error("Too many constants in one chunk.");
			return 0;
		}

		index as u8
	}

	fn end_compiler(&mut self) {
		self.emit_op(OpCode::Return);

		#[cfg(feature = "print-code")]
		if !self.had_error {
			print!("{}", self.chunk.disassemble("code"));
		}
	}

	// --- Diagnostics ---

	fn error_at_current(&mut self, message: &str) {
		let token = self.current;
		self.error_at(token, message);
	}

	fn error(&mut self, message: &str) {
		let token = self.current;
		self.error_at(token, message);
	}

	fn error_at(&mut self, token: Token<'src>, message: &str) {
		if self.panic_mode {
			return;
		}
		self.panic_mode = true;
		self.had_error = true;

		let at = match token.kind {
			TokenKind::FileEof => DiagnosticTarget::End,
			TokenKind::Error => DiagnosticTarget::Unlocated,
			kind => DiagnosticTarget::Token(kind),
		};
		let diagnostic = Diagnostic::new(token.line, at, message);
		eprintln!("{diagnostic}");
		self.diagnostics.push(diagnostic);
	}
}
