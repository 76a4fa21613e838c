use anyhow::{Context, Result, bail};
use dtsb_bundler::BundleOptions;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::args::CliArgs;

pub const CONFIG_FILE_NAME: &str = "dtsb.json";

/// Contents of `dtsb.json`. Comments and trailing commas are accepted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DtsbConfig {
    #[serde(default)]
    pub entries: Vec<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub out_dir: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub out_file: Option<PathBuf>,
    #[serde(flatten)]
    pub options: BundleOptions,
}

/// Where finished bundles go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Output {
    Stdout,
    File(PathBuf),
    /// One file per entry, named after the entry.
    Dir(PathBuf),
}

/// Config file and flags merged, every path absolute.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub config_path: Option<PathBuf>,
    pub entries: Vec<PathBuf>,
    pub output: Output,
    pub options: BundleOptions,
}

impl ResolvedConfig {
    /// The merged configuration in `dtsb.json` shape.
    pub fn to_json(&self) -> serde_json::Value {
        let (out_dir, out_file) = match &self.output {
            Output::Stdout => (None, None),
            Output::File(path) => (None, Some(path.clone())),
            Output::Dir(path) => (Some(path.clone()), None),
        };
        let config = DtsbConfig {
            entries: self.entries.clone(),
            out_dir,
            out_file,
            options: self.options.clone(),
        };
        serde_json::to_value(config).unwrap_or_default()
    }
}

pub fn parse_config(source: &str) -> Result<DtsbConfig> {
    let stripped = strip_jsonc(source);
    let normalized = remove_trailing_commas(&stripped);
    let config = serde_json::from_str(&normalized).context("failed to parse dtsb.json")?;
    Ok(config)
}

pub fn load_config(path: &Path) -> Result<DtsbConfig> {
    let source =
        std::fs::read_to_string(path).with_context(|| format!("failed to read config: {}", path.display()))?;
    parse_config(&source).with_context(|| format!("invalid config: {}", path.display()))
}

/// `--config` (a file, or a directory holding `dtsb.json`), else `dtsb.json` in `cwd`.
pub fn find_config(args: &CliArgs, cwd: &Path) -> Option<PathBuf> {
    match &args.config {
        Some(path) => {
            let path = cwd.join(path);
            Some(if path.is_dir() { path.join(CONFIG_FILE_NAME) } else { path })
        }
        None => Some(cwd.join(CONFIG_FILE_NAME)).filter(|path| path.is_file()),
    }
}

/// Merge the config file (if any) with flags; flags win.
///
/// Paths in the config file are relative to the file, paths on the command line to `cwd`.
pub fn resolve_config(args: &CliArgs, cwd: &Path) -> Result<ResolvedConfig> {
    let config_path = find_config(args, cwd);
    let (file, base) = match &config_path {
        Some(path) => {
            let base = path.parent().unwrap_or(cwd).to_path_buf();
            (load_config(path)?, base)
        }
        None => (DtsbConfig::default(), cwd.to_path_buf()),
    };

    let entries: Vec<PathBuf> = if args.entries.is_empty() {
        file.entries.iter().map(|entry| base.join(entry)).collect()
    } else {
        args.entries.iter().map(|entry| cwd.join(entry)).collect()
    };
    if entries.is_empty() {
        bail!("no entry files: pass them as arguments or list them under `entries` in {CONFIG_FILE_NAME}");
    }

    let out_file = args
        .out_file
        .as_ref()
        .map(|path| cwd.join(path))
        .or_else(|| file.out_file.as_ref().map(|path| base.join(path)));
    let out_dir = args
        .out_dir
        .as_ref()
        .map(|path| cwd.join(path))
        .or_else(|| file.out_dir.as_ref().map(|path| base.join(path)));
    let output = match (out_file, out_dir) {
        (Some(_), Some(_)) => bail!("outFile and outDir cannot be used together"),
        (Some(file), None) if entries.len() == 1 => Output::File(file),
        (Some(_), None) => bail!("outFile needs exactly one entry, got {}", entries.len()),
        (None, Some(dir)) => Output::Dir(dir),
        (None, None) if entries.len() == 1 => Output::Stdout,
        (None, None) => bail!("bundling {} entries needs outDir", entries.len()),
    };

    let mut options = file.options;
    options.type_roots = options.type_roots.iter().map(|root| base.join(root)).collect();
    if args.respect_external {
        options.respect_external = true;
    }
    if let Some(packages) = &args.include_external {
        options.include_external = packages.clone();
    }
    if let Some(roots) = &args.type_roots {
        options.type_roots = roots.iter().map(|root| cwd.join(root)).collect();
    }

    Ok(ResolvedConfig {
        config_path,
        entries,
        output,
        options,
    })
}

fn strip_jsonc(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    let mut in_string = false;
    let mut escape = false;

    while let Some(ch) = chars.next() {
        if in_string {
            out.push(ch);
            if escape {
                escape = false;
            } else if ch == '\\' {
                escape = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }

        match (ch, chars.peek().copied()) {
            ('"', _) => {
                in_string = true;
                out.push(ch);
            }
            ('/', Some('/')) => {
                for next in chars.by_ref() {
                    if next == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            }
            ('/', Some('*')) => {
                chars.next();
                let mut prev = '\0';
                for next in chars.by_ref() {
                    if prev == '*' && next == '/' {
                        break;
                    }
                    if next == '\n' {
                        out.push('\n');
                    }
                    prev = next;
                }
            }
            _ => out.push(ch),
        }
    }
    out
}

fn remove_trailing_commas(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    let mut in_string = false;
    let mut escape = false;

    while let Some(ch) = chars.next() {
        if in_string {
            out.push(ch);
            if escape {
                escape = false;
            } else if ch == '\\' {
                escape = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        if ch == '"' {
            in_string = true;
        } else if ch == ',' {
            let mut lookahead = chars.clone();
            let next = lookahead.find(|c| !c.is_whitespace());
            if matches!(next, Some('}' | ']')) {
                continue;
            }
        }
        out.push(ch);
    }
    out
}
