//! The conditional pool and per-translation-unit conditional stack
//! (`spec.md` §4.D).
//!
//! The pool is an arena (`Vec<CondFrame>`) with an explicit free list of
//! indices, the direct translation of "pointer-heavy linked structures →
//! arenas with indices" from `spec.md` §9. A [`CondHandle`] is the arena
//! index; it is `Copy` and cheap to stack onto an [`crate::include_stack::IncludeFrame`]'s
//! conditional stack.

/// Which directive opened this conditional frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CondKind {
	If,
	Ifdef,
	Ifndef,
	Else,
	Elif,
}

impl std::fmt::Display for CondKind {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let name = match self {
			CondKind::If => "if",
			CondKind::Ifdef => "ifdef",
			CondKind::Ifndef => "ifndef",
			CondKind::Else => "else",
			CondKind::Elif => "elif",
		};
		write!(f, "{name}")
	}
}

#[derive(Debug, Clone, Copy)]
pub struct CondFrame {
	pub kind: CondKind,
	pub line_of_opening: u32,
	pub skipping: bool,
	pub chosen: bool,
}

/// An index into the [`CondPool`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CondHandle(usize);

#[derive(Default)]
pub struct CondPool {
	frames: Vec<CondFrame>,
	free: Vec<usize>,
}

impl CondPool {
	pub fn new() -> Self {
		Self::default()
	}

	/// Issues a fresh (zeroed-then-initialized) frame, recycling a pool slot
	/// if one is free.
	pub fn get(&mut self, frame: CondFrame) -> CondHandle {
		if let Some(index) = self.free.pop() {
			self.frames[index] = frame;
			CondHandle(index)
		} else {
			self.frames.push(frame);
			CondHandle(self.frames.len() - 1)
		}
	}

	pub fn frame(&self, handle: CondHandle) -> &CondFrame {
		&self.frames[handle.0]
	}

	pub fn frame_mut(&mut self, handle: CondHandle) -> &mut CondFrame {
		&mut self.frames[handle.0]
	}

	/// Returns a single handle to the pool.
	pub fn put(&mut self, handle: CondHandle) {
		self.free.push(handle.0);
	}

	/// Returns a whole chain of handles to the pool at once, used when an
	/// include frame with unclosed conditionals is torn down.
	pub fn put_chain(&mut self, handles: impl IntoIterator<Item = CondHandle>) {
		self.free.extend(handles.into_iter().map(|h| h.0));
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use pretty_assertions::assert_eq;

	fn frame(kind: CondKind) -> CondFrame {
		CondFrame { kind, line_of_opening: 1, skipping: false, chosen: true }
	}

	#[test]
	fn reuses_freed_slots() {
		let mut pool = CondPool::new();
		let a = pool.get(frame(CondKind::Ifdef));
		pool.put(a);
		let b = pool.get(frame(CondKind::Ifndef));

		// Same slot recycled; pool never grows beyond what's concurrently live.
		assert_eq!(pool.frame(b).kind, CondKind::Ifndef);
	}

	#[test]
	fn put_chain_frees_many_at_once() {
		let mut pool = CondPool::new();
		let a = pool.get(frame(CondKind::Ifdef));
		let b = pool.get(frame(CondKind::Ifdef));
		pool.put_chain([a, b]);

		let c = pool.get(frame(CondKind::Else));
		let d = pool.get(frame(CondKind::Else));
		assert_eq!(pool.frame(c).kind, CondKind::Else);
		assert_eq!(pool.frame(d).kind, CondKind::Else);
	}
}
