//! The only filesystem-touching code in the workspace (`SPEC_FULL.md`,
//! "`pp-cli` default filesystem resolver"): a [`pp_core::IncludeResolver`]
//! backed by `std::fs`, the way the teacher's `native_fs::NativeFs` is the
//! only piece of `p4-analyzer` that touches real files on behalf of
//! `analyzer-core`.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use pp_core::{IncludeKind, IncludeResolver};

/// Resolves `LOCAL` (`"..."`) includes relative to the including file's own
/// directory, and `SYSTEM` (`<...>`) includes by searching `include_paths` in
/// order, first match wins.
///
/// Because `pp-core` interns includes by the literal text written after
/// `#include`, not by a resolved path, this resolver remembers the directory
/// each such name was found in so a later nested `#include` can be resolved
/// relative to it. Two distinct files included under the same literal name
/// from different directories will shadow one another in that cache; this is
/// an accepted simplification for a single-pass CLI tool, not a general
/// build-system include resolver.
pub struct FsIncludeResolver {
	root_dir: PathBuf,
	include_paths: Vec<PathBuf>,
	resolved_dirs: HashMap<String, PathBuf>,
}

impl FsIncludeResolver {
	pub fn new(root_dir: PathBuf, include_paths: Vec<PathBuf>) -> Self {
		FsIncludeResolver { root_dir, include_paths, resolved_dirs: HashMap::new() }
	}

	fn resolve_local(&self, filename: &str, parent_filename: Option<&str>) -> PathBuf {
		let base_dir = parent_filename
			.and_then(|name| self.resolved_dirs.get(name))
			.map(PathBuf::as_path)
			.unwrap_or(self.root_dir.as_path());

		base_dir.join(filename)
	}

	fn resolve_system(&self, filename: &str) -> Option<PathBuf> {
		self.include_paths.iter().map(|root| root.join(filename)).find(|candidate| candidate.is_file())
	}
}

impl IncludeResolver for FsIncludeResolver {
	fn open(&mut self, kind: IncludeKind, filename: &str, parent_filename: Option<&str>) -> Option<Vec<u8>> {
		let path = match kind {
			IncludeKind::Local => self.resolve_local(filename, parent_filename),
			IncludeKind::System => self.resolve_system(filename)?,
		};

		let bytes = fs::read(&path).ok()?;

		if let Some(dir) = Path::new(&path).parent() {
			self.resolved_dirs.insert(filename.to_string(), dir.to_path_buf());
		}

		Some(bytes)
	}
}
