use std::path::PathBuf;

xflags::xflags! {
	src "./src/cli/flags.rs"

	/// Runs the shader source preprocessor over a single translation unit.
	cmd pp-cli {
		/// Path to the root source file to preprocess.
		required path: PathBuf

		/// Defines a preprocessor symbol as NAME or NAME=TEXT. Repeatable.
		repeated -D,--define def: String

		/// Adds a search root for SYSTEM (`<...>`) includes. Repeatable.
		repeated -I,--include-path path: PathBuf

		/// Emits the reformatted, brace-indented output instead of the raw token stream.
		optional --flatten

		/// Log level for diagnostics written to stderr. Defaults to 'warn'.
		optional --log-level level: String
	}
}
// generated start
// The following code is generated by `xflags` macro.
// Run `env UPDATE_XFLAGS=1 cargo build` to regenerate.
#[derive(Debug)]
pub struct PpCli {
    pub path: PathBuf,

    pub define: Vec<String>,
    pub include_path: Vec<PathBuf>,
    pub flatten: bool,
    pub log_level: Option<String>,
}

impl PpCli {
    #[allow(dead_code)]
    pub fn from_env_or_exit() -> Self {
        Self::from_env_or_exit_()
    }

    #[allow(dead_code)]
    pub fn from_env() -> xflags::Result<Self> {
        Self::from_env_()
    }

    #[allow(dead_code)]
    pub fn from_vec(args: Vec<std::ffi::OsString>) -> xflags::Result<Self> {
        Self::from_vec_(args)
    }
}
// generated end
