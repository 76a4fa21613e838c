//! dtsb: bundles TypeScript declaration files into one tree-shaken declaration file.
//!
//! The work is split across the workspace crates, re-exported here:
//!
//! - [`common`]: spans, line maps and diagnostics
//! - [`transform`]: the per-unit declaration transformer and namespace reconstruction
//! - [`bundler`]: resolution, linking, tree-shaking, renaming and chunk rendering
//!
//! ```no_run
//! use dtsb::{BundleOptions, bundle};
//!
//! let chunk = bundle("types/index.d.ts".as_ref(), &BundleOptions::default())?;
//! println!("{}", chunk.code);
//! # Ok::<(), dtsb::BundleError>(())
//! ```

pub use dtsb_bundler as bundler;
pub use dtsb_common as common;
pub use dtsb_transform as transform;

pub use dtsb_bundler::{Bundle, BundleError, BundleOptions, bundle, bundle_entries};
pub use dtsb_transform::{TransformOutput, UnitError, transform_unit};
