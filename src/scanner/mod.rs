//! Lexical analysis for ypl source code.
//!
//! The scanner is lazy: `scan_token` produces exactly one token per call and
//! keeps no lookahead beyond a single character. The compiler pulls tokens on
//! demand, so a full token buffer never exists. A scanner cannot be rewound;
//! restart by constructing a fresh one over the text.

mod token;

use TokenKind::*;
pub use token::*;

/// A scanner for ypl source code.
pub struct Scanner<'src> {
	/// User input source code
	source: &'src str,
	/// Offset of the first byte of the current lexeme
	start:  usize,
	/// Offset of the byte currently being considered
	cursor: usize,
	/// Line `cursor` is on, so tokens know their location
	line:   usize,
}

impl<'src> Scanner<'src> {
	pub fn new(source: &'src str) -> Self { Self { source, start: 0, cursor: 0, line: 1 } }

	/// Scan the next token, skipping any whitespace and comments before it.
	///
	/// Returns a `FileEof` token at the end of input, and keeps returning it
	/// on further calls.
	pub fn scan_token(&mut self) -> Token<'src> {
		self.skip_whitespace_and_comments();
		self.start = self.cursor;

		let Some(c) = self.advance() else {
			return self.make_token(FileEof);
		};

		if c == b'_' || c.is_ascii_alphabetic() {
			return self.identifier();
		}
		if c.is_ascii_digit() {
			return self.number();
		}

		match c {
			b'(' => self.make_token(LeftParen),
			b')' => self.make_token(RightParen),
			b'{' => self.make_token(LeftBrace),
			b'}' => self.make_token(RightBrace),
			b':' => self.make_token(Colon),
			b',' => self.make_token(Comma),
			b'.' => self.make_token(Dot),
			b'-' => self.make_token(Minus),
			b'+' => self.make_token(Plus),
			b';' => self.make_token(Semicolon),
			b'*' => self.make_token(Star),
			b'%' => self.make_token(Modulo),
			b'^' => self.make_token(Exponent),
			b'/' => self.make_token(Slash),
			b'!' => {
				let kind = if self.match_next(b'=') { BangEqual } else { Bang };
				self.make_token(kind)
			}
			b'=' => {
				let kind = if self.match_next(b'=') { EqualEqual } else { Equal };
				self.make_token(kind)
			}
			b'>' => {
				let kind = if self.match_next(b'>') {
					Rshift
				} else if self.match_next(b'=') {
					GreaterEqual
				} else {
					Greater
				};
				self.make_token(kind)
			}
			b'<' => {
				let kind = if self.match_next(b'<') {
					Lshift
				} else if self.match_next(b'=') {
					LessEqual
				} else {
					Less
				};
				self.make_token(kind)
			}
			b'"' => self.string(),
			_ => self.error_token("Unexpected character."),
		}
	}

	fn make_token(&self, kind: TokenKind) -> Token<'src> {
		Token::new(kind, &self.source[self.start..self.cursor], self.line)
	}

	fn error_token(&self, message: &'static str) -> Token<'src> {
		Token::new(Error, message, self.line)
	}

	/// Peek the current byte.
	fn peek(&self) -> Option<u8> { self.source.as_bytes().get(self.cursor).copied() }

	/// Peek the byte after the current one.
	fn peek_next(&self) -> Option<u8> { self.source.as_bytes().get(self.cursor + 1).copied() }

	/// Advance past the current byte.
	fn advance(&mut self) -> Option<u8> {
		let c = self.peek()?;
		self.cursor += 1;
		Some(c)
	}

	/// Consume the current byte if it is the expected one.
	fn match_next(&mut self, expected: u8) -> bool {
		matches!(self.peek(), Some(c) if c == expected && { self.cursor += 1; true })
	}

	/// Scan a string literal; the closing quote is consumed and part of the lexeme.
	fn string(&mut self) -> Token<'src> {
		while let Some(c) = self.peek() {
			if c == b'"' {
				break;
			}
			if c == b'\n' {
				self.line += 1;
			}
			self.advance();
		}

		if self.peek().is_none() {
			return self.error_token("Unterminated string.");
		}

		self.advance(); // The closing quote
		self.make_token(Str)
	}

	/// Scan a number literal: a digit run with an optional `.` and second digit run.
	fn number(&mut self) -> Token<'src> {
		while self.peek().is_some_and(|c| c.is_ascii_digit()) {
			self.advance();
		}

		// A fractional part only counts when a digit follows the dot.
		if self.peek() == Some(b'.') && self.peek_next().is_some_and(|c| c.is_ascii_digit()) {
			self.advance(); // consume '.'
			while self.peek().is_some_and(|c| c.is_ascii_digit()) {
				self.advance();
			}
		}

		self.make_token(Number)
	}

	/// Scan an identifier or keyword.
	fn identifier(&mut self) -> Token<'src> {
		while self.peek().is_some_and(|c| c == b'_' || c.is_ascii_alphanumeric()) {
			self.advance();
		}
		let kind = TokenKind::keyword_or_identifier(&self.source[self.start..self.cursor]);
		self.make_token(kind)
	}

	fn skip_whitespace_and_comments(&mut self) {
		loop {
			match self.peek() {
				Some(b' ' | b'\r' | b'\t') => {
					self.advance();
				}
				Some(b'\n') => {
					self.line += 1;
					self.advance();
				}
				Some(b'/') if self.peek_next() == Some(b'/') => {
					while self.peek().is_some_and(|c| c != b'\n') {
						self.advance();
					}
				}
				Some(b'/') if self.peek_next() == Some(b'*') => {
					self.advance(); // consume '/'
					self.advance(); // consume '*'
					while let Some(c) = self.peek() {
						if c == b'*' && self.peek_next() == Some(b'/') {
							self.advance(); // consume '*'
							self.advance(); // consume '/'
							break;
						}
						if c == b'\n' {
							self.line += 1;
						}
						self.advance();
					}
				}
				_ => return,
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn kinds(input: &str) -> Vec<TokenKind> {
		let mut scanner = Scanner::new(input);
		let mut kinds = Vec::new();
		loop {
			let token = scanner.scan_token();
			let done = token.kind == FileEof;
			kinds.push(token.kind);
			if done {
				break;
			}
		}
		kinds
	}

	fn single(input: &str) -> Token<'_> { Scanner::new(input).scan_token() }

	#[test]
	fn scan_punctuation() {
		assert_eq!(kinds("(){}:,.;"), vec![
			LeftParen, RightParen, LeftBrace, RightBrace, Colon, Comma, Dot, Semicolon, FileEof
		]);
	}

	#[test]
	fn scan_operators_maximal_munch() {
		assert_eq!(kinds("+ - * / % ^"), vec![Plus, Minus, Star, Slash, Modulo, Exponent, FileEof]);
		assert_eq!(kinds("! != = == < <= << > >= >>"), vec![
			Bang, BangEqual, Equal, EqualEqual, Less, LessEqual, Lshift, Greater, GreaterEqual, Rshift,
			FileEof
		]);
		// No space: the two-char forms win.
		assert_eq!(kinds("<<="), vec![Lshift, Equal, FileEof]);
		assert_eq!(kinds(">>="), vec![Rshift, Equal, FileEof]);
	}

	#[test]
	fn scan_numbers() {
		assert_eq!(single("42").lexeme, "42");
		assert_eq!(single("3.14").lexeme, "3.14");
		assert_eq!(single("123.456").lexeme, "123.456");
		// A trailing dot is not part of the number.
		assert_eq!(kinds("1."), vec![Number, Dot, FileEof]);
		// Nor is a leading dot.
		assert_eq!(kinds(".5"), vec![Dot, Number, FileEof]);
	}

	#[test]
	fn scan_strings() {
		let token = single(r#""hello""#);
		assert_eq!(token.kind, Str);
		assert_eq!(token.lexeme, r#""hello""#);

		let token = single(r#""unterminated"#);
		assert_eq!(token.kind, Error);
		assert_eq!(token.lexeme, "Unterminated string.");
	}

	#[test]
	fn scan_string_with_newlines_counts_lines() {
		let mut scanner = Scanner::new("\"a\nb\" x");
		assert_eq!(scanner.scan_token().kind, Str);
		let x = scanner.scan_token();
		assert_eq!(x.kind, Identifier);
		assert_eq!(x.line, 2);
	}

	#[test]
	fn scan_keywords() {
		for (input, kind) in [
			("and", And),
			("break", Break),
			("class", Class),
			("const", Const),
			("continue", Continue),
			("do", Do),
			("else", Else),
			("false", False),
			("for", For),
			("fun", Fun),
			("if", If),
			("import", Import),
			("let", Let),
			("nand", Nand),
			("nor", Nor),
			("null", Null),
			("or", Or),
			("print", Print),
			("return", Return),
			("static", Static),
			("super", Super),
			("this", This),
			("true", True),
			("while", While),
			("xor", Xor),
		] {
			assert_eq!(single(input).kind, kind, "keyword {input}");
		}
	}

	#[test]
	fn scan_identifiers() {
		for input in ["x", "_name", "myVariable123", "snake_case", "and123", "nulls"] {
			assert_eq!(single(input).kind, Identifier, "identifier {input}");
		}
	}

	#[test]
	fn scan_comments() {
		assert_eq!(kinds("// whole line"), vec![FileEof]);
		assert_eq!(kinds("1 // trailing\n2"), vec![Number, Number, FileEof]);
		assert_eq!(kinds("/* block */ 1"), vec![Number, FileEof]);
		assert_eq!(kinds("/* multi\nline */ 1"), vec![Number, FileEof]);
		// Block comments do not nest.
		assert_eq!(kinds("/* a /* b */ 1"), vec![Number, FileEof]);
	}

	#[test]
	fn scan_block_comment_counts_lines() {
		let mut scanner = Scanner::new("/* a\nb\nc */ x");
		assert_eq!(scanner.scan_token().line, 3);
	}

	#[test]
	fn scan_unexpected_character() {
		let token = single("@");
		assert_eq!(token.kind, Error);
		assert_eq!(token.lexeme, "Unexpected character.");
	}

	#[test]
	fn scan_eof_is_sticky() {
		let mut scanner = Scanner::new("");
		assert_eq!(scanner.scan_token().kind, FileEof);
		assert_eq!(scanner.scan_token().kind, FileEof);
	}
}
