mod cli;
mod fs_resolver;

use std::io::Write;
use std::path::PathBuf;
use std::{fs, process};

use anyhow::{Context, Result};
use cli::flags::PpCli;
use fs_resolver::FsIncludeResolver;
use pp_core::{flatten, Preprocessor, SystemAllocator, Tag};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Entry point for the shader source preprocessor CLI.
fn main() {
	match PpCli::from_env() {
		Ok(cmd) => {
			if let Err(err) = run(cmd) {
				eprintln!("{err:?}");
				process::exit(1);
			}
		}
		Err(err) => {
			println!();
			println!("{}", err);
			println!();
			process::exit(2);
		}
	}
}

fn run(cmd: PpCli) -> Result<()> {
	install_logging(cmd.log_level.as_deref());

	let source = fs::read(&cmd.path).with_context(|| format!("reading {}", cmd.path.display()))?;
	let root_dir = cmd
		.path
		.parent()
		.filter(|dir| !dir.as_os_str().is_empty())
		.map(PathBuf::from)
		.unwrap_or_else(|| PathBuf::from("."));
	let filename = cmd.path.to_string_lossy().into_owned();

	let predefines = parse_defines(&cmd.define);
	let predefine_refs: Vec<(&str, &[u8])> = predefines.iter().map(|(name, text)| (name.as_str(), text.as_slice())).collect();

	let resolver = FsIncludeResolver::new(root_dir, cmd.include_path.clone());
	let mut pp =
		Preprocessor::new(Some(&filename), source, &predefine_refs, Box::new(resolver), Box::new(SystemAllocator));

	if cmd.flatten {
		run_flatten(&mut pp)
	} else {
		run_token_stream(&mut pp)
	}
}

/// Reformats the whole translation unit and writes it to stdout, diverting
/// collected errors to stderr, matching `spec.md` §6's "errors never appear
/// in the output buffer" contract.
fn run_flatten(pp: &mut Preprocessor) -> Result<()> {
	let result = flatten(pp, &SystemAllocator);

	let mut output = result.output_bytes;
	if output.last() == Some(&0) {
		output.pop();
	}
	std::io::stdout().write_all(&output).context("writing preprocessed output")?;

	for error in &result.errors {
		let filename = error.filename.as_deref().unwrap_or("<unknown>");
		eprintln!("{}:{}: {}", filename, error.error_position, String::from_utf8_lossy(&error.error));
	}

	if result.errors.is_empty() {
		Ok(())
	} else {
		process::exit(1);
	}
}

/// Pulls the raw token stream and prints one token per line, the way a
/// caller embedding `pp-core` directly (rather than through `flatten`) would
/// observe it.
fn run_token_stream(pp: &mut Preprocessor) -> Result<()> {
	let mut had_errors = false;

	loop {
		let token = pp.next_token();
		match token.tag {
			Tag::Eoi => break,
			Tag::PreprocessingError => {
				had_errors = true;
				let (filename, line) = pp.source_position();
				let filename = filename.as_deref().unwrap_or("<unknown>");
				eprintln!("{}:{}: {}", filename, line, String::from_utf8_lossy(&token.bytes));
			}
			_ => println!("{:?} {}", token.tag, String::from_utf8_lossy(&token.bytes)),
		}
	}

	if had_errors {
		process::exit(1);
	}
	Ok(())
}

fn parse_defines(defs: &[String]) -> Vec<(String, Vec<u8>)> {
	defs
		.iter()
		.map(|def| match def.split_once('=') {
			Some((name, text)) => (name.to_string(), text.as_bytes().to_vec()),
			None => (def.clone(), Vec::new()),
		})
		.collect()
}

/// Installs a `tracing-subscriber` layer writing to stderr at `log_level`
/// (defaulting to `WARN`), the way `p4-analyzer`'s `main.rs` builds its
/// logging layer from `--loglevel`.
fn install_logging(log_level: Option<&str>) {
	let level = log_level.and_then(|level| level.parse::<Level>().ok()).unwrap_or(Level::WARN);
	let subscriber = FmtSubscriber::builder().with_max_level(level).with_writer(std::io::stderr).finish();

	if tracing::subscriber::set_global_default(subscriber).is_err() {
		eprintln!("tracing subscriber already installed; ignoring");
	}
}
