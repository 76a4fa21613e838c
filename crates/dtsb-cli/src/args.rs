use clap::Parser;
use std::path::PathBuf;

/// CLI arguments for the dtsb binary.
#[derive(Parser, Debug)]
#[command(
    name = "dtsb",
    version,
    about = "Bundle TypeScript declaration files into one tree-shaken declaration file per entry"
)]
pub struct CliArgs {
    /// Entry declaration files. Overrides `entries` from the config file.
    pub entries: Vec<PathBuf>,

    /// Path to dtsb.json or a directory containing it.
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Inline the declarations of every package that can be resolved.
    #[arg(long = "respect-external", alias = "respectExternal")]
    pub respect_external: bool,

    /// Packages whose declarations are inlined instead of imported.
    #[arg(long = "include-external", alias = "includeExternal", value_delimiter = ',')]
    pub include_external: Option<Vec<String>>,

    /// Extra folders searched like './node_modules/@types'.
    #[arg(long = "type-roots", alias = "typeRoots", value_delimiter = ',')]
    pub type_roots: Option<Vec<PathBuf>>,

    /// Write the bundle of a single entry to this file.
    #[arg(short = 'o', long = "out-file", alias = "outFile")]
    pub out_file: Option<PathBuf>,

    /// Write one bundle per entry into this directory.
    #[arg(long = "out-dir", alias = "outDir")]
    pub out_dir: Option<PathBuf>,

    /// Enable color and formatting in diagnostics.
    #[arg(long)]
    pub pretty: Option<bool>,

    /// Print the final configuration instead of bundling.
    #[arg(long = "show-config", alias = "showConfig")]
    pub show_config: bool,

    /// Print every file folded into each bundle.
    #[arg(long = "list-files", alias = "listFiles")]
    pub list_files: bool,
}
