extern crate pp_core;

use pp_core::lexer::{scan, Tag};
use pretty_assertions::assert_eq;

fn lex_all(src: &str) -> Vec<Tag> {
	let buf = src.as_bytes();
	let mut pos = 0;
	let mut line = 1;
	let mut bol = true;
	let mut out = Vec::new();

	loop {
		let lexeme = scan(buf, &mut pos, &mut line, &mut bol);
		let done = lexeme.tag == Tag::Eoi;
		out.push(lexeme.tag);
		if done {
			break;
		}
	}

	out
}

#[test]
fn shader_like_source() {
	let src = "float4 main(float2 uv : TEXCOORD0) : SV_Target {\n\treturn float4(uv, 0.0, 1.0);\n}\n";
	let tags = lex_all(src);

	assert_eq!(tags.first(), Some(&Tag::Identifier));
	assert!(tags.contains(&Tag::FloatLiteral));
	assert!(tags.contains(&Tag::Char(b'{')));
	assert!(tags.contains(&Tag::Char(b'}')));
	assert_eq!(tags.last(), Some(&Tag::Eoi));
}

#[test]
fn line_numbers_advance_once_per_newline() {
	let buf = b"a\nb\nc\n";
	let mut pos = 0;
	let mut line = 1;
	let mut bol = true;
	let mut lines_seen = Vec::new();

	loop {
		let lexeme = scan(buf, &mut pos, &mut line, &mut bol);
		if lexeme.tag == Tag::Eoi {
			break;
		}
		if lexeme.tag == Tag::Identifier {
			lines_seen.push(line);
		}
	}

	assert_eq!(lines_seen, vec![1, 2, 3]);
}

#[test]
fn hex_and_octal_integers() {
	assert_eq!(lex_all("0xFF 010 42"), vec![Tag::IntLiteral, Tag::IntLiteral, Tag::IntLiteral, Tag::Eoi]);
}

#[test]
fn directive_keywords_recognized() {
	assert_eq!(
		lex_all("#include\n#line\n#undef\n#ifdef\n#ifndef\n#else\n#elif\n#endif\n#error\n#if\n"),
		vec![
			Tag::PpInclude,
			Tag::Newline,
			Tag::PpLine,
			Tag::Newline,
			Tag::PpUndef,
			Tag::Newline,
			Tag::PpIfdef,
			Tag::Newline,
			Tag::PpIfndef,
			Tag::Newline,
			Tag::PpElse,
			Tag::Newline,
			Tag::PpElif,
			Tag::Newline,
			Tag::PpEndif,
			Tag::Newline,
			Tag::PpError,
			Tag::Newline,
			Tag::PpIf,
			Tag::Newline,
			Tag::Eoi,
		]
	);
}
