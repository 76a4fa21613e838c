use dtsb_bundler::{BundleError, bundle_entries};
use std::path::{Path, PathBuf};
use tracing::{debug, info_span};

use crate::config::{Output, ResolvedConfig};

/// One entry that bundled successfully.
#[derive(Debug, Clone)]
pub struct EmittedBundle {
    pub entry: PathBuf,
    /// `None` when the bundle went to stdout.
    pub out_path: Option<PathBuf>,
    pub files: Vec<PathBuf>,
}

#[derive(Debug, Default)]
pub struct RunResult {
    pub emitted: Vec<EmittedBundle>,
    /// Bundle text for [`Output::Stdout`].
    pub stdout: Option<String>,
    pub errors: Vec<BundleError>,
}

impl RunResult {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Bundle every entry and write the results. Failed entries write nothing.
pub fn run(config: &ResolvedConfig) -> RunResult {
    let _span = info_span!("run", entries = config.entries.len()).entered();
    let mut result = RunResult::default();

    let bundles = bundle_entries(&config.entries, &config.options);
    for (entry, bundle) in config.entries.iter().zip(bundles) {
        let bundle = match bundle {
            Ok(bundle) => bundle,
            Err(error) => {
                result.errors.push(error);
                continue;
            }
        };

        let out_path = match &config.output {
            Output::Stdout => {
                result.stdout = Some(bundle.code.clone());
                None
            }
            Output::File(path) => Some(path.clone()),
            Output::Dir(dir) => Some(dir.join(output_file_name(entry))),
        };
        if let Some(path) = &out_path
            && let Err(error) = write_bundle(path, &bundle.code)
        {
            result.errors.push(error);
            continue;
        }

        debug!(entry = %entry.display(), files = bundle.files.len(), kept = bundle.kept_nodes, "emitted bundle");
        result.emitted.push(EmittedBundle {
            entry: entry.clone(),
            out_path,
            files: bundle.files,
        });
    }
    result
}

fn write_bundle(path: &Path, code: &str) -> Result<(), BundleError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| BundleError::io(parent, e))?;
    }
    std::fs::write(path, code).map_err(|e| BundleError::io(path, e))
}

/// Name of the bundle written for `entry` under an output directory.
///
/// Declaration entries keep their name; `a.ts` becomes `a.d.ts`, `a.mts` becomes `a.d.mts`.
pub fn output_file_name(entry: &Path) -> String {
    let name = entry
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "index.d.ts".to_string());
    if [".d.ts", ".d.mts", ".d.cts"].iter().any(|ext| name.ends_with(ext)) {
        return name;
    }
    for (ext, declaration) in [(".tsx", ".d.ts"), (".mts", ".d.mts"), (".cts", ".d.cts"), (".ts", ".d.ts")] {
        if let Some(stem) = name.strip_suffix(ext) {
            return format!("{stem}{declaration}");
        }
    }
    format!("{name}.d.ts")
}
