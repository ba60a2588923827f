//! The preprocessing error taxonomy (see `spec.md` §7).
//!
//! These are not `Result`-propagated failures: a [`PreprocessorError`] is data
//! that travels through the token stream as a `PREPROCESSING_ERROR` lexeme.
//! Exactly one is latched at a time on a [`crate::preprocessor::Preprocessor`];
//! the next call to `next_token` flushes it and clears the latch.

use crate::conditional::CondKind;

/// A single preprocessing error, convertible to the human-readable string
/// that is carried as the bytes of a `PREPROCESSING_ERROR` lexeme.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PreprocessorError {
	#[error("'{0}' already defined")]
	AlreadyDefined(String),

	#[error("invalid #{0} directive")]
	InvalidDirective(String),

	#[error("Include callback failed")]
	IncludeCallbackFailed,

	#[error("Incomplete multiline comment")]
	IncompleteComment,

	#[error("Unmatched #endif")]
	UnmatchedEndif,

	#[error("#else without #if")]
	ElseWithoutIf,

	#[error("#else after #else")]
	ElseAfterElse,

	#[error("Unterminated #{0}")]
	Unterminated(CondKind),

	#[error("#error {0}")]
	UserError(String),
}

/// The maximum number of bytes retained for a latched error's rendered
/// message, mirroring the fixed 256-byte failure buffer of `spec.md` §7.
pub const FAILURE_BUFFER_LEN: usize = 256;

impl PreprocessorError {
	/// Renders the error to its `PREPROCESSING_ERROR` lexeme bytes, truncated
	/// to [`FAILURE_BUFFER_LEN`] bytes exactly as the fixed failure buffer
	/// would.
	pub fn to_latched_bytes(&self) -> Vec<u8> {
		let text = self.to_string();
		let mut bytes = text.into_bytes();
		bytes.truncate(FAILURE_BUFFER_LEN);
		bytes
	}
}

/// An error record surfaced by the flatten pass (`spec.md` §6, "Error record").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorRecord {
	pub error: Vec<u8>,
	pub filename: Option<std::rc::Rc<str>>,
	pub error_position: u32,
}
