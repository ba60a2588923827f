//! The include stack (`spec.md` §3 "Include frame", §4.F).
//!
//! Each [`IncludeFrame`] owns the raw bytes of one translation unit and
//! drives its own lexing cursor; `Preprocessor` (in `preprocessor.rs`) is the
//! only thing that ever has more than one frame borrowed at a time, and only
//! ever the top one.

use crate::conditional::CondHandle;
use crate::intern::FilenameId;
use crate::lexer::{self, Lexeme, Tag};

pub struct IncludeFrame {
	pub filename: Option<FilenameId>,
	/// True iff this frame was obtained via `IncludeResolver::open` and must
	/// be returned via `close` when popped.
	pub included: bool,
	source: Vec<u8>,
	cursor: usize,
	pub token_start: usize,
	pub line: u32,
	bol: bool,
	pub conditional_stack: Vec<CondHandle>,
	/// One token of pushback, used by the directive dispatcher's
	/// peek-and-rewind when validating end-of-directive (`spec.md` §4.F).
	pending: Option<Lexeme>,
}

impl IncludeFrame {
	pub fn new(filename: Option<FilenameId>, included: bool, source: Vec<u8>) -> Self {
		IncludeFrame {
			filename,
			included,
			source,
			cursor: 0,
			token_start: 0,
			line: 1,
			bol: true,
			conditional_stack: Vec::new(),
			pending: None,
		}
	}

	pub fn lexeme_bytes(&self, lexeme: &Lexeme) -> &[u8] {
		lexeme.bytes(&self.source)
	}

	/// Pulls the next raw lexeme, honoring any pushed-back token first.
	pub fn raw_next(&mut self) -> Lexeme {
		if let Some(lexeme) = self.pending.take() {
			return lexeme;
		}

		self.token_start = self.cursor;
		lexer::scan(&self.source, &mut self.cursor, &mut self.line, &mut self.bol)
	}

	/// Pushes a lexeme back so the next `raw_next` returns it again.
	pub fn push_back(&mut self, lexeme: Lexeme) {
		debug_assert!(self.pending.is_none(), "at most one token of lookahead is ever pending");
		self.pending = Some(lexeme);
	}

	/// Reads a raw byte sequence up to (and consuming) `terminator`, used by
	/// `#include <...>` and `#error` argument scanning, both of which bypass
	/// normal tokenization per `spec.md` §4.F / §9.
	///
	/// Returns `None` if `terminator` is not found before a newline or
	/// end-of-input.
	pub fn read_raw_until(&mut self, terminator: u8) -> Option<Vec<u8>> {
		let start = self.cursor;
		while let Some(&b) = self.source.get(self.cursor) {
			if b == terminator {
				let text = self.source[start..self.cursor].to_vec();
				self.cursor += 1;
				return Some(text);
			}
			if b == b'\n' {
				return None;
			}
			self.cursor += 1;
		}
		None
	}

	/// Reads the raw byte range from the cursor to (but not including) the
	/// next newline or end-of-input, without advancing past the terminator.
	/// Used by `#error` (`spec.md` §9: it "does not use the lexer to consume
	/// the message").
	pub fn read_raw_line(&mut self) -> Vec<u8> {
		let start = self.cursor;
		while let Some(&b) = self.source.get(self.cursor) {
			if b == b'\n' {
				break;
			}
			self.cursor += 1;
		}
		self.source[start..self.cursor].to_vec()
	}

	/// Sets the frame's reported line (used by `#line`).
	pub fn set_line(&mut self, line: u32) {
		self.line = line;
	}

	/// Skips exactly one horizontal-whitespace run at the cursor, if present
	/// — used by directive argument parsing between the keyword and its
	/// first argument.
	pub fn skip_horizontal_whitespace(&mut self) {
		while matches!(self.source.get(self.cursor), Some(b' ') | Some(b'\t')) {
			self.cursor += 1;
		}
	}

	pub fn peek_byte(&self) -> Option<u8> {
		self.source.get(self.cursor).copied()
	}

	/// Advances the cursor by exactly one byte, bypassing the lexer. Used
	/// for the `<` of a `#include <...>` system header, which is not itself
	/// meant to be tokenized as an operator.
	pub fn consume_one_byte(&mut self) {
		if self.cursor < self.source.len() {
			self.cursor += 1;
		}
	}

	/// Consumes the frame and returns its owned source bytes, handed back to
	/// `IncludeResolver::close` when an `included` frame is torn down.
	pub fn into_source(self) -> Vec<u8> {
		self.source
	}
}

/// Distinguishes directive-reported tags from the ones the dispatcher hands
/// back to the caller, purely to make call sites in `preprocessor.rs` read
/// naturally.
pub fn is_directive_tag(tag: Tag) -> bool {
	matches!(
		tag,
		Tag::PpInclude
			| Tag::PpLine | Tag::PpDefine
			| Tag::PpUndef | Tag::PpIf
			| Tag::PpIfdef | Tag::PpIfndef
			| Tag::PpElse | Tag::PpElif
			| Tag::PpEndif | Tag::PpError
	)
}
