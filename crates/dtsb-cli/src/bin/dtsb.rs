#![allow(clippy::print_stderr)]

use anyhow::{Context, Result};
use clap::Parser;
use std::io::{IsTerminal, Write};

use dtsb_cli::args::CliArgs;
use dtsb_cli::config::resolve_config;
use dtsb_cli::driver;
use dtsb_cli::reporter::Reporter;

#[cfg(not(target_arch = "wasm32"))]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

const EXIT_SUCCESS: i32 = 0;
const EXIT_DIAGNOSTICS: i32 = 1;
const EXIT_USAGE: i32 = 2;

fn main() -> Result<()> {
    // DTSB_LOG / RUST_LOG, DTSB_LOG_FORMAT=text|tree|json
    dtsb_cli::tracing_config::init_tracing();

    let args = CliArgs::parse();
    let cwd = std::env::current_dir().context("failed to resolve current directory")?;

    let config = match resolve_config(&args, &cwd) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("error: {err:#}");
            std::process::exit(EXIT_USAGE);
        }
    };

    if args.show_config {
        let json = serde_json::to_string_pretty(&config.to_json()).context("failed to serialize config")?;
        println!("{json}");
        std::process::exit(EXIT_SUCCESS);
    }

    let result = driver::run(&config);

    if let Some(code) = &result.stdout {
        let mut stdout = std::io::stdout().lock();
        stdout
            .write_all(code.as_bytes())
            .context("failed to write bundle to stdout")?;
    }

    if args.list_files {
        for emitted in &result.emitted {
            for file in &emitted.files {
                eprintln!("{}", file.display());
            }
        }
    }

    if result.has_errors() {
        let pretty = args.pretty.unwrap_or_else(|| std::io::stderr().is_terminal());
        let reporter = Reporter::new(pretty);
        eprint!("{}", reporter.render(&result.errors));
        std::process::exit(EXIT_DIAGNOSTICS);
    }

    std::process::exit(EXIT_SUCCESS);
}
