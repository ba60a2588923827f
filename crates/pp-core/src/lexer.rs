//! The byte-at-a-time scanner (`spec.md` §4.E).
//!
//! A single pulling function, [`scan`], operates on a caller-owned cursor
//! into a byte buffer. It never owns the buffer itself — the include stack
//! (`spec.md` §4.F) owns the bytes of each translation unit and lends a
//! mutable cursor into them for every call — so this module has no
//! dependency on the include stack at all, mirroring how the teacher keeps
//! its `Token`/`Logos` definitions free of any `Db`/`Jar` dependency.

use lazy_static::lazy_static;
use regex::Regex;

/// The lexeme classification (`spec.md` §4.E's tag set).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag {
	Unknown,
	Identifier,
	IntLiteral,
	FloatLiteral,
	StringLiteral,

	AddAssign,
	SubAssign,
	MulAssign,
	DivAssign,
	ModAssign,
	XorAssign,
	AndAssign,
	OrAssign,

	Increment,
	Decrement,
	RShift,
	LShift,
	AndAnd,
	OrOr,
	Leq,
	Geq,
	Eql,
	Neq,
	HashHash,

	PpInclude,
	PpLine,
	PpDefine,
	PpUndef,
	PpIf,
	PpIfdef,
	PpIfndef,
	PpElse,
	PpElif,
	PpEndif,
	PpError,

	IncompleteComment,
	BadChars,
	Eoi,
	PreprocessingError,
	Newline,

	/// Any other single byte of punctuation, carrying the byte itself.
	Char(u8),
}

/// A scanned lexeme: its classification and the byte range (within whatever
/// buffer the caller's cursor refers to) it occupies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lexeme {
	pub tag: Tag,
	pub start: usize,
	pub end: usize,
}

impl Lexeme {
	pub fn len(&self) -> usize {
		self.end - self.start
	}

	pub fn is_empty(&self) -> bool {
		self.start == self.end
	}

	pub fn bytes<'a>(&self, buf: &'a [u8]) -> &'a [u8] {
		&buf[self.start..self.end]
	}
}

fn is_ident_start(b: u8) -> bool {
	b.is_ascii_alphabetic() || b == b'_'
}

fn is_ident_continue(b: u8) -> bool {
	b.is_ascii_alphanumeric() || b == b'_'
}

lazy_static! {
	static ref DIRECTIVE_NAME: Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*").unwrap();
}

/// Maps a directive keyword (without the leading `#`) to its tag, if
/// recognized.
fn directive_tag(name: &str) -> Option<Tag> {
	Some(match name {
		"include" => Tag::PpInclude,
		"line" => Tag::PpLine,
		"define" => Tag::PpDefine,
		"undef" => Tag::PpUndef,
		"if" => Tag::PpIf,
		"ifdef" => Tag::PpIfdef,
		"ifndef" => Tag::PpIfndef,
		"else" => Tag::PpElse,
		"elif" => Tag::PpElif,
		"endif" => Tag::PpEndif,
		"error" => Tag::PpError,
		_ => return None,
	})
}

/// Pulls the next lexeme starting at `*pos` in `buf`.
///
/// `*pos` is advanced to just past the lexeme. `*line` is incremented once
/// per `\n` actually consumed. `*bol` ("beginning of line", ignoring
/// intervening horizontal whitespace) gates whether a leading `#` is read as
/// a directive keyword, per `spec.md` §4.E: "When the current line begins
/// (whitespace only preceding) with `#` …".
pub fn scan(buf: &[u8], pos: &mut usize, line: &mut u32, bol: &mut bool) -> Lexeme {
	loop {
		if *pos >= buf.len() {
			return Lexeme { tag: Tag::Eoi, start: buf.len(), end: buf.len() };
		}

		let b = buf[*pos];

		// Horizontal whitespace: skipped silently, does not affect `bol`.
		if b == b' ' || b == b'\t' || b == b'\r' {
			*pos += 1;
			continue;
		}

		if b == b'\n' {
			let start = *pos;
			*pos += 1;
			*line += 1;
			*bol = true;
			return Lexeme { tag: Tag::Newline, start, end: *pos };
		}

		// Comments behave like extended whitespace: `//` runs to (but not
		// past) the next newline, `/* … */` may span lines.
		if b == b'/' && buf.get(*pos + 1) == Some(&b'/') {
			*pos += 2;
			while *pos < buf.len() && buf[*pos] != b'\n' {
				*pos += 1;
			}
			continue;
		}

		if b == b'/' && buf.get(*pos + 1) == Some(&b'*') {
			let start = *pos;
			*pos += 2;
			loop {
				if *pos >= buf.len() {
					return Lexeme { tag: Tag::IncompleteComment, start, end: *pos };
				}
				if buf[*pos] == b'\n' {
					*line += 1;
					*pos += 1;
					continue;
				}
				if buf[*pos] == b'*' && buf.get(*pos + 1) == Some(&b'/') {
					*pos += 2;
					break;
				}
				*pos += 1;
			}
			continue;
		}

		let was_bol = *bol;
		*bol = false;

		if b == b'#' && was_bol {
			return scan_directive(buf, pos);
		}

		if is_ident_start(b) {
			return scan_identifier(buf, pos);
		}

		if b.is_ascii_digit() {
			return scan_number(buf, pos);
		}

		if b == b'"' {
			return scan_string(buf, pos);
		}

		return scan_operator(buf, pos);
	}
}

fn scan_directive(buf: &[u8], pos: &mut usize) -> Lexeme {
	let start = *pos;
	*pos += 1; // consume '#'

	while matches!(buf.get(*pos), Some(b' ') | Some(b'\t')) {
		*pos += 1;
	}

	// The rest of the line may not be valid UTF-8 in pathological inputs;
	// fall back to an empty (and therefore unrecognized) name in that case
	// rather than panicking.
	let rest = std::str::from_utf8(&buf[*pos..]).unwrap_or("");
	let name = DIRECTIVE_NAME.find(rest).map(|m| m.as_str()).unwrap_or("");
	*pos += name.len();

	match directive_tag(name) {
		Some(tag) => Lexeme { tag, start, end: *pos },
		None => Lexeme { tag: Tag::Unknown, start, end: *pos },
	}
}

fn scan_identifier(buf: &[u8], pos: &mut usize) -> Lexeme {
	let start = *pos;
	*pos += 1;
	while matches!(buf.get(*pos), Some(&c) if is_ident_continue(c)) {
		*pos += 1;
	}
	Lexeme { tag: Tag::Identifier, start, end: *pos }
}

fn scan_number(buf: &[u8], pos: &mut usize) -> Lexeme {
	let start = *pos;
	let mut is_float = false;

	if buf[*pos] == b'0' && matches!(buf.get(*pos + 1), Some(b'x') | Some(b'X')) {
		*pos += 2;
		while matches!(buf.get(*pos), Some(&c) if c.is_ascii_hexdigit()) {
			*pos += 1;
		}
	} else {
		while matches!(buf.get(*pos), Some(&c) if c.is_ascii_digit()) {
			*pos += 1;
		}

		if buf.get(*pos) == Some(&b'.') {
			is_float = true;
			*pos += 1;
			while matches!(buf.get(*pos), Some(&c) if c.is_ascii_digit()) {
				*pos += 1;
			}
		}

		if matches!(buf.get(*pos), Some(b'e') | Some(b'E')) {
			let mut lookahead = *pos + 1;
			if matches!(buf.get(lookahead), Some(b'+') | Some(b'-')) {
				lookahead += 1;
			}
			if matches!(buf.get(lookahead), Some(&c) if c.is_ascii_digit()) {
				is_float = true;
				*pos = lookahead;
				while matches!(buf.get(*pos), Some(&c) if c.is_ascii_digit()) {
					*pos += 1;
				}
			}
		}
	}

	if is_float {
		if matches!(buf.get(*pos), Some(b'f') | Some(b'F')) {
			*pos += 1;
		}
	} else {
		while matches!(buf.get(*pos), Some(b'u') | Some(b'U') | Some(b'l') | Some(b'L')) {
			*pos += 1;
		}
	}

	Lexeme { tag: if is_float { Tag::FloatLiteral } else { Tag::IntLiteral }, start, end: *pos }
}

fn scan_string(buf: &[u8], pos: &mut usize) -> Lexeme {
	let start = *pos;
	*pos += 1; // opening quote

	loop {
		match buf.get(*pos) {
			None | Some(b'\n') => return Lexeme { tag: Tag::BadChars, start, end: *pos },
			Some(b'"') => {
				*pos += 1;
				return Lexeme { tag: Tag::StringLiteral, start, end: *pos };
			}
			Some(b'\\') => {
				*pos += 1;
				match buf.get(*pos) {
					None | Some(b'\n') => return Lexeme { tag: Tag::BadChars, start, end: *pos },
					Some(_) => *pos += 1,
				}
			}
			Some(_) => *pos += 1,
		}
	}
}

macro_rules! two_char {
	($buf:expr, $pos:expr, $a:expr, $b:expr, $tag:expr) => {
		if $buf[*$pos] == $a && $buf.get(*$pos + 1) == Some(&$b) {
			*$pos += 2;
			return Lexeme { tag: $tag, start: *$pos - 2, end: *$pos };
		}
	};
}

fn scan_operator(buf: &[u8], pos: &mut usize) -> Lexeme {
	let start = *pos;

	two_char!(buf, pos, b'+', b'=', Tag::AddAssign);
	two_char!(buf, pos, b'-', b'=', Tag::SubAssign);
	two_char!(buf, pos, b'*', b'=', Tag::MulAssign);
	two_char!(buf, pos, b'/', b'=', Tag::DivAssign);
	two_char!(buf, pos, b'%', b'=', Tag::ModAssign);
	two_char!(buf, pos, b'^', b'=', Tag::XorAssign);
	two_char!(buf, pos, b'&', b'=', Tag::AndAssign);
	two_char!(buf, pos, b'|', b'=', Tag::OrAssign);
	two_char!(buf, pos, b'+', b'+', Tag::Increment);
	two_char!(buf, pos, b'-', b'-', Tag::Decrement);
	two_char!(buf, pos, b'>', b'>', Tag::RShift);
	two_char!(buf, pos, b'<', b'<', Tag::LShift);
	two_char!(buf, pos, b'&', b'&', Tag::AndAnd);
	two_char!(buf, pos, b'|', b'|', Tag::OrOr);
	two_char!(buf, pos, b'<', b'=', Tag::Leq);
	two_char!(buf, pos, b'>', b'=', Tag::Geq);
	two_char!(buf, pos, b'=', b'=', Tag::Eql);
	two_char!(buf, pos, b'!', b'=', Tag::Neq);
	two_char!(buf, pos, b'#', b'#', Tag::HashHash);

	let c = buf[start];
	*pos += 1;
	Lexeme { tag: Tag::Char(c), start, end: *pos }
}
