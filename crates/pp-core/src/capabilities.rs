//! The two capability sets a [`crate::preprocessor::Preprocessor`] is
//! constructed with (`spec.md` §4.A).
//!
//! Both are collaborators, not part of the core: the default implementations
//! here exist only so unit tests and doctests have something to pass, the
//! same way the teacher's `analyzer-abstractions::fs::EnumerableFileSystem`
//! is a trait whose real implementation lives in a separate, file-system
//! touching crate (here: `pp-cli`).

/// `"..."` vs `<...>` includes, per `spec.md` §4.A.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IncludeKind {
	Local,
	System,
}

/// The include-resolver capability.
///
/// Unlike the teacher's LSP-facing file-system traits (`EnumerableFileSystem`,
/// necessarily `async` because it crosses an RPC boundary), this is a plain
/// synchronous trait: `spec.md` §5 specifies the core has no suspension
/// points, and blocking, if any, happens opaquely inside `open`.
pub trait IncludeResolver {
	/// Resolves `filename` relative to `parent_filename` (the enclosing
	/// translation unit's interned name, or `None` for the root), returning
	/// the included file's raw bytes on success.
	///
	/// This stands in for the C API's `parent_source_base` pointer, which
	/// exists solely so a resolver can disambiguate relative includes; a
	/// filename serves that purpose at least as well in Rust and needs no
	/// unsafe pointer arithmetic.
	fn open(&mut self, kind: IncludeKind, filename: &str, parent_filename: Option<&str>) -> Option<Vec<u8>>;

	/// Releases bytes previously returned by `open`. The default no-op is
	/// correct for any resolver that doesn't need to track outstanding
	/// buffers; a resolver backed by a reference-counted cache can override
	/// this to release its hold.
	fn close(&mut self, _bytes: Vec<u8>) {}
}

/// A resolver that never finds anything, useful for preprocessing a single
/// translation unit that is known not to `#include`.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullIncludeResolver;

impl IncludeResolver for NullIncludeResolver {
	fn open(&mut self, _kind: IncludeKind, _filename: &str, _parent_filename: Option<&str>) -> Option<Vec<u8>> {
		None
	}
}

/// The allocator capability.
///
/// Idiomatic, stable Rust has no way to observe a real allocation failure:
/// the global allocator aborts the process rather than returning an error,
/// and the fallible `allocator_api` is nightly-only. `Allocator` is kept as a
/// shape-compatible extension point (see `DESIGN.md`, Open Question 4) so a
/// caller embedding this crate in a bounded-memory environment (e.g. behind a
/// fixed-size arena) has somewhere to plug in a real limit; the default
/// implementation below never refuses.
pub trait Allocator {
	/// Called before growing an internal buffer by roughly `additional_bytes`.
	/// Returning `false` latches `out_of_memory` on the preprocessor and
	/// short-circuits all subsequent operations to `EOI`.
	fn try_reserve(&self, additional_bytes: usize) -> bool;
}

/// The default [`Allocator`]: delegates to the global allocator and never
/// reports failure.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemAllocator;

impl Allocator for SystemAllocator {
	fn try_reserve(&self, _additional_bytes: usize) -> bool {
		true
	}
}
