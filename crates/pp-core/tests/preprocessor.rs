extern crate pp_core;

use std::collections::HashMap;

use pp_core::capabilities::{IncludeKind, IncludeResolver, SystemAllocator};
use pp_core::lexer::Tag;
use pp_core::Preprocessor;
use pretty_assertions::assert_eq;

struct MapResolver {
	files: HashMap<&'static str, &'static [u8]>,
}

impl IncludeResolver for MapResolver {
	fn open(&mut self, _kind: IncludeKind, filename: &str, _parent_filename: Option<&str>) -> Option<Vec<u8>> {
		self.files.get(filename).map(|bytes| bytes.to_vec())
	}
}

fn tokens(src: &[u8], predefines: &[(&str, &[u8])]) -> Vec<(Tag, String)> {
	let mut pp = Preprocessor::simple(None, src.to_vec(), predefines);
	let mut out = Vec::new();
	loop {
		let token = pp.next_token();
		if token.tag == Tag::Eoi {
			break;
		}
		out.push((token.tag, String::from_utf8_lossy(&token.bytes).into_owned()));
	}
	out
}

#[test]
fn line_directive_rewrites_reported_position() {
	let mut pp = Preprocessor::simple(None, b"#line 41 \"shader.hlsl\"\nA\n".to_vec(), &[]);
	let token = pp.next_token();
	assert_eq!(token.tag, Tag::Identifier);
	let (filename, line) = pp.source_position();
	assert_eq!(filename.as_deref(), Some("shader.hlsl"));
	assert_eq!(line, 41);
}

#[test]
fn undef_removes_a_predefine() {
	let src = b"#ifdef FOO\nA\n#endif\n#undef FOO\n#ifdef FOO\nB\n#endif\n".to_vec();
	let toks = tokens(&src, &[("FOO", b"1")]);
	let idents: Vec<_> = toks.into_iter().filter(|(tag, _)| *tag == Tag::Identifier).map(|(_, t)| t).collect();
	assert_eq!(idents, vec!["A".to_string()]);
}

#[test]
fn nested_include_reports_correct_source_position() {
	let mut files = HashMap::new();
	files.insert("inner.hlsl", b"P\n".as_slice());
	let mut pp = Preprocessor::new(
		Some("root.hlsl"),
		b"#include \"inner.hlsl\"\nQ\n".to_vec(),
		&[],
		Box::new(MapResolver { files }),
		Box::new(SystemAllocator),
	);

	let first = pp.next_token();
	assert_eq!(first.bytes, b"P");
	let (filename, line) = pp.source_position();
	assert_eq!(filename.as_deref(), Some("inner.hlsl"));
	assert_eq!(line, 1);

	// The `\n` after `P` in `inner.hlsl` is its own token; only `flatten`
	// suppresses it.
	let newline = pp.next_token();
	assert_eq!(newline.tag, Tag::Newline);

	let third = pp.next_token();
	assert_eq!(third.bytes, b"Q");
	let (filename, line) = pp.source_position();
	assert_eq!(filename.as_deref(), Some("root.hlsl"));
	assert_eq!(line, 2);
}

#[test]
fn include_callback_failure_is_reported() {
	let mut pp = Preprocessor::simple(None, b"#include \"missing.hlsl\"\n".to_vec(), &[]);
	let token = pp.next_token();
	assert_eq!(token.tag, Tag::PreprocessingError);
	assert!(String::from_utf8_lossy(&token.bytes).contains("Include callback failed"));
}

#[test]
fn else_exclusivity_holds_for_both_predicate_values() {
	let taken = tokens(b"#ifdef X\nA\n#else\nB\n#endif\n", &[("X", b"")]);
	let not_taken = tokens(b"#ifdef X\nA\n#else\nB\n#endif\n", &[]);

	let idents = |toks: &[(Tag, String)]| {
		toks.iter().filter(|(tag, _)| *tag == Tag::Identifier).map(|(_, t)| t.clone()).collect::<Vec<_>>()
	};

	assert_eq!(idents(&taken), vec!["A".to_string()]);
	assert_eq!(idents(&not_taken), vec!["B".to_string()]);
}

#[test]
fn if_and_elif_are_rejected_without_inventing_evaluation() {
	for src in [b"#if 1\nA\n#endif\n".as_slice(), b"#ifdef X\nA\n#elif Y\nB\n#endif\n".as_slice()] {
		let toks = tokens(src, &[("X", b"")]);
		assert!(toks.iter().any(|(tag, _)| *tag == Tag::PreprocessingError));
	}
}

#[test]
fn define_directive_in_source_is_rejected() {
	let toks = tokens(b"#define FOO 1\nA\n", &[]);
	let errors: Vec<_> = toks.iter().filter(|(tag, _)| *tag == Tag::PreprocessingError).collect();
	assert_eq!(errors.len(), 1);
	// The identifier still comes through afterward; tokenization resumes.
	assert!(toks.iter().any(|(tag, text)| *tag == Tag::Identifier && text == "A"));
}
