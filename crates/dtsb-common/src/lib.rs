//! Common types and utilities for the dtsb declaration bundler.
//!
//! This crate provides foundational types used across all dtsb crates:
//! - Source spans (`Span`) as byte offsets into a unit's text
//! - Line/column lookup (`LineMap`, `Position`)
//! - Diagnostics with rendered source excerpts (`Diagnostic`, `DiagnosticSeverity`)

// Span - Source location tracking (byte offsets)
pub mod span;
pub use span::Span;

// Position types for line/column source locations
pub mod position;
pub use position::{LineMap, Position};

// Diagnostics - codes, severities and excerpt rendering
pub mod diagnostics;
pub use diagnostics::{Diagnostic, DiagnosticSeverity, codes};
