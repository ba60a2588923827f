//! The flattening / reformatting pass (`spec.md` §4.H): pulls a [`Preprocessor`]
//! dry and reduces its token stream to a single reformatted byte buffer plus
//! a list of collected errors.
//!
//! This is the one place in the crate that owns formatting *policy*
//! (indentation, brace placement, line endings); `preprocessor.rs` never
//! makes a layout decision, only a lexical/directive one.

use crate::capabilities::Allocator;
use crate::error::ErrorRecord;
use crate::lexer::Tag;
use crate::preprocessor::Preprocessor;

#[cfg(windows)]
const LINE_ENDING: &[u8] = b"\r\n";
#[cfg(not(windows))]
const LINE_ENDING: &[u8] = b"\n";

const INDENT_UNIT: &[u8] = b"\t";

/// The result of a [`flatten`] run.
///
/// `spec.md` §4.H specifies a single shared, statically allocated "out of
/// memory" sentinel object returned on any allocation failure during this
/// pass. Rust has no ergonomic equivalent to a shared static that owns heap
/// data without reaching for `OnceLock`/`lazy_static!` for what is really
/// just a constant-shaped error value, so [`PreprocessResult::out_of_memory`]
/// constructs a fresh, cheap value with the same observable shape (empty
/// output, one error) on every call instead; see `DESIGN.md`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreprocessResult {
	pub output_bytes: Vec<u8>,
	pub errors: Vec<ErrorRecord>,
}

impl PreprocessResult {
	fn out_of_memory() -> Self {
		PreprocessResult {
			output_bytes: Vec::new(),
			errors: vec![ErrorRecord { error: b"out of memory".to_vec(), filename: None, error_position: 0 }],
		}
	}
}

fn push_indent(buffer: &mut Vec<u8>, indent: usize) {
	for _ in 0..indent {
		buffer.extend_from_slice(INDENT_UNIT);
	}
}

/// Drains `pp` and reformats its token stream, per the formatting contract of
/// `spec.md` §4.H:
///
/// - raw `\n` tokens are suppressed;
/// - `{` forces a fresh indented line, then a newline, and increments indent;
/// - `}` decrements indent (floored at zero) before being placed on its own
///   fresh indented line, then a newline;
/// - `;` follows the normal leading-whitespace rule below, then forces a
///   newline;
/// - every other token is preceded by the current indent if the output is at
///   the start of a line, or a single space otherwise;
/// - `PREPROCESSING_ERROR` tokens are diverted into the error list, in
///   arrival order, and never appear in the output buffer.
///
/// `allocator` gates every growth of the output buffer; a single refusal
/// aborts the whole pass and returns the out-of-memory sentinel, matching
/// the "one allocation error, no output" contract.
pub fn flatten(pp: &mut Preprocessor, allocator: &dyn Allocator) -> PreprocessResult {
	let mut buffer = Vec::new();
	let mut errors = Vec::new();
	let mut indent: usize = 0;
	let mut at_line_start = true;

	loop {
		if pp.out_of_memory() {
			return PreprocessResult::out_of_memory();
		}

		let token = pp.next_token();

		match token.tag {
			Tag::Eoi => break,
			Tag::Newline => continue,

			Tag::PreprocessingError => {
				let (filename, line) = pp.source_position();
				errors.push(ErrorRecord { error: token.bytes, filename, error_position: line });
			}

			Tag::Char(b'{') => {
				if !allocator.try_reserve(token.bytes.len() + indent + 2) {
					return PreprocessResult::out_of_memory();
				}
				if !at_line_start {
					buffer.extend_from_slice(LINE_ENDING);
				}
				push_indent(&mut buffer, indent);
				buffer.push(b'{');
				buffer.extend_from_slice(LINE_ENDING);
				indent += 1;
				at_line_start = true;
			}

			Tag::Char(b'}') => {
				indent = indent.saturating_sub(1);
				if !allocator.try_reserve(token.bytes.len() + indent + 2) {
					return PreprocessResult::out_of_memory();
				}
				if !at_line_start {
					buffer.extend_from_slice(LINE_ENDING);
				}
				push_indent(&mut buffer, indent);
				buffer.push(b'}');
				buffer.extend_from_slice(LINE_ENDING);
				at_line_start = true;
			}

			Tag::Char(b';') => {
				if !allocator.try_reserve(token.bytes.len() + indent + 2) {
					return PreprocessResult::out_of_memory();
				}
				// Unlike every other token, `;` is emitted at the current
				// position with no leading indent or space (`spec.md` §4.H):
				// it always follows directly on whatever token preceded it.
				if at_line_start {
					push_indent(&mut buffer, indent);
				}
				buffer.push(b';');
				buffer.extend_from_slice(LINE_ENDING);
				at_line_start = true;
			}

			_ => {
				if !allocator.try_reserve(token.bytes.len() + indent + 1) {
					return PreprocessResult::out_of_memory();
				}
				if at_line_start {
					push_indent(&mut buffer, indent);
				} else {
					buffer.push(b' ');
				}
				buffer.extend_from_slice(&token.bytes);
				at_line_start = false;
			}
		}
	}

	// Trailing zero terminator, matching the C-string-compatible shape of
	// `spec.md` §4.H's chunked-buffer concatenation.
	buffer.push(0);

	PreprocessResult { output_bytes: buffer, errors }
}
