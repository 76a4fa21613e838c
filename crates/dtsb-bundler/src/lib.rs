//! Host bundler for declaration units.
//!
//! Drives the transformer over every unit reachable from an entry and folds the
//! results into one declaration chunk:
//!
//! ```text
//! load (resolve + transform) -> link -> shake -> deconflict -> render -> reconstruct
//! ```

pub mod config;
pub mod error;
pub mod link;
pub mod loader;
pub mod rename;
pub mod render;
pub mod resolver;
pub mod shake;

pub use config::BundleOptions;
pub use error::BundleError;
pub use loader::{ModuleId, UnitGraph};
pub use resolver::{ModuleResolver, Resolution, ResolutionFailure};

use rayon::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info_span};

/// One finished chunk.
#[derive(Clone, Debug)]
pub struct Bundle {
    pub entry: PathBuf,
    pub code: String,
    /// Files folded into the chunk, entry first.
    pub files: Vec<PathBuf>,
    pub kept_nodes: usize,
}

/// Bundle the declarations reachable from `entry` into one chunk.
pub fn bundle(entry: &Path, options: &BundleOptions) -> error::Result<Bundle> {
    let _span = info_span!("bundle", entry = %entry.display()).entered();
    let mut resolver = ModuleResolver::new(options);
    let graph = UnitGraph::load(entry, &mut resolver)?;

    let linker = link::Linker::new(&graph);
    let links = linker.link()?;
    let entry_exports = linker.module_exports(graph.entry())?;
    let reach = shake::shake(&graph, &linker, &links, &entry_exports)?;
    let names = rename::deconflict(&graph, &reach);
    let code = render::render_chunk(&graph, &links, &reach, &names, &entry_exports)?;

    debug!(units = graph.len(), kept = reach.nodes.len(), "bundled entry");
    Ok(Bundle {
        entry: graph.unit(graph.entry()).path.clone(),
        code,
        files: graph.units().iter().map(|unit| unit.path.clone()).collect(),
        kept_nodes: reach.nodes.len(),
    })
}

/// Bundle several entries independently, one chunk each, in parallel.
pub fn bundle_entries(entries: &[PathBuf], options: &BundleOptions) -> Vec<error::Result<Bundle>> {
    entries.par_iter().map(|entry| bundle(entry, options)).collect()
}
