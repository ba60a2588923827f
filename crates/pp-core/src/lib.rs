//! A C-style source preprocessor for an HLSL-like shader language.
//!
//! The crate is organized leaf-first, mirroring the component map this was
//! built against:
//!
//! - [`capabilities`] — the allocator and include-resolver traits a
//!   [`preprocessor::Preprocessor`] is constructed with.
//! - [`intern`] — the filename intern cache.
//! - [`define_table`] — the `#define`/`#undef` symbol table.
//! - [`conditional`] — the `#if…`/`#else`/`#endif` frame pool and stack.
//! - [`lexer`] — the byte-at-a-time scanner.
//! - [`include_stack`] — per-translation-unit cursor state built on the lexer.
//! - [`preprocessor`] — the directive dispatcher and pull-based token stream.
//! - [`flatten`] — the reformatting pass over that token stream.
//! - [`error`] — the preprocessing error taxonomy.

pub mod capabilities;
pub mod conditional;
pub mod define_table;
pub mod error;
pub mod flatten;
pub mod include_stack;
pub mod intern;
pub mod lexer;
pub mod preprocessor;

pub use capabilities::{Allocator, IncludeKind, IncludeResolver, NullIncludeResolver, SystemAllocator};
pub use error::{ErrorRecord, PreprocessorError};
pub use flatten::{flatten, PreprocessResult};
pub use lexer::Tag;
pub use preprocessor::{Preprocessor, Token};
