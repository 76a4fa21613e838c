//! Module resolution oracle.
//!
//! Decides for every module specifier whether it names a declaration file that is
//! folded into the bundle or an external module that stays an import:
//! - Relative and absolute specifiers (`./foo`, `../bar`, `/abs/baz`) must resolve to a
//!   file, otherwise resolution fails with TS2307.
//! - `.js`/`.mjs`/`.cjs` specifiers are mapped to their declaration counterparts.
//! - Bare specifiers (`lodash`, `@scope/pkg/sub`) are external unless the package is
//!   inlined by [`BundleOptions`]; inlined packages are looked up in `node_modules`,
//!   `node_modules/@types` and the configured type roots.

use crate::config::BundleOptions;
use dtsb_common::{Diagnostic, Span, codes};
use rustc_hash::FxHashMap;
use serde::Deserialize;
use std::fmt;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, trace};

/// Declaration and source extensions that can hold a declaration unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleExtension {
    Dts,
    DMts,
    DCts,
    Ts,
    Tsx,
    Mts,
    Cts,
    Unknown,
}

impl ModuleExtension {
    /// Parse extension from file path
    pub fn from_path(path: &Path) -> Self {
        let path_str = path.to_string_lossy();

        // Compound extensions first
        if path_str.ends_with(".d.ts") {
            return ModuleExtension::Dts;
        }
        if path_str.ends_with(".d.mts") {
            return ModuleExtension::DMts;
        }
        if path_str.ends_with(".d.cts") {
            return ModuleExtension::DCts;
        }

        match path.extension().and_then(|e| e.to_str()) {
            Some("ts") => ModuleExtension::Ts,
            Some("tsx") => ModuleExtension::Tsx,
            Some("mts") => ModuleExtension::Mts,
            Some("cts") => ModuleExtension::Cts,
            _ => ModuleExtension::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ModuleExtension::Dts => ".d.ts",
            ModuleExtension::DMts => ".d.mts",
            ModuleExtension::DCts => ".d.cts",
            ModuleExtension::Ts => ".ts",
            ModuleExtension::Tsx => ".tsx",
            ModuleExtension::Mts => ".mts",
            ModuleExtension::Cts => ".cts",
            ModuleExtension::Unknown => "",
        }
    }

    pub fn is_declaration(&self) -> bool {
        matches!(self, ModuleExtension::Dts | ModuleExtension::DMts | ModuleExtension::DCts)
    }
}

/// A specifier that resolved to a file on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedModule {
    pub resolved_path: PathBuf,
    /// Package name if resolved from `node_modules` or a type root
    pub package_name: Option<String>,
    pub original_specifier: String,
    pub extension: ModuleExtension,
}

/// Outcome of resolving one specifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Folded into the bundle.
    Internal(ResolvedModule),
    /// Left as an import of the original specifier.
    External { specifier: String },
}

/// Reason why module resolution failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionFailure {
    NotFound {
        specifier: String,
        containing_file: String,
        /// Span of the statement naming the specifier
        span: Span,
    },
    /// An inlined package whose package.json could not be read
    PackageJsonError {
        message: String,
        specifier: String,
        containing_file: String,
        span: Span,
    },
}

impl ResolutionFailure {
    /// Both variants report TS2307 with TypeScript's wording.
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            ResolutionFailure::NotFound {
                specifier,
                containing_file,
                span,
            } => Diagnostic::error(
                containing_file,
                *span,
                format!("Cannot find module '{specifier}' or its corresponding type declarations."),
                codes::CANNOT_FIND_MODULE,
            ),
            ResolutionFailure::PackageJsonError {
                message,
                specifier,
                containing_file,
                span,
            } => Diagnostic::error(
                containing_file,
                *span,
                format!("Cannot find module '{specifier}' or its corresponding type declarations. {message}"),
                codes::CANNOT_FIND_MODULE,
            ),
        }
    }

    pub fn containing_file(&self) -> &str {
        match self {
            ResolutionFailure::NotFound { containing_file, .. }
            | ResolutionFailure::PackageJsonError { containing_file, .. } => containing_file,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            ResolutionFailure::NotFound { span, .. } | ResolutionFailure::PackageJsonError { span, .. } => *span,
        }
    }

    fn relocated(mut self, file: &str, at: Span) -> Self {
        match &mut self {
            ResolutionFailure::NotFound {
                containing_file, span, ..
            }
            | ResolutionFailure::PackageJsonError {
                containing_file, span, ..
            } => {
                *containing_file = file.to_string();
                *span = at;
            }
        }
        self
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ResolutionFailure::NotFound { .. })
    }
}

impl fmt::Display for ResolutionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let diagnostic = self.to_diagnostic();
        write!(f, "{}: {}", diagnostic.file_name, diagnostic.format_simple())
    }
}

impl std::error::Error for ResolutionFailure {}

/// Resolves specifiers relative to their containing file, with a per-directory cache.
#[derive(Debug)]
pub struct ModuleResolver {
    options: BundleOptions,
    resolution_cache: FxHashMap<(PathBuf, String), Result<Resolution, ResolutionFailure>>,
}

impl ModuleResolver {
    pub fn new(options: &BundleOptions) -> Self {
        ModuleResolver {
            options: options.clone(),
            resolution_cache: FxHashMap::default(),
        }
    }

    /// Resolve a module specifier from a containing file
    pub fn resolve(
        &mut self,
        specifier: &str,
        containing_file: &Path,
        specifier_span: Span,
    ) -> Result<Resolution, ResolutionFailure> {
        let containing_dir = containing_file.parent().unwrap_or(Path::new(".")).to_path_buf();

        let cache_key = (containing_dir.clone(), specifier.to_string());
        let containing_file_str = containing_file.display().to_string();
        if let Some(cached) = self.resolution_cache.get(&cache_key) {
            trace!(specifier, "resolution cache hit");
            // Failures are shared by every file in the directory; report this one.
            return cached
                .clone()
                .map_err(|failure| failure.relocated(&containing_file_str, specifier_span));
        }

        let result = self.resolve_uncached(specifier, &containing_dir, &containing_file_str, specifier_span);
        match &result {
            Ok(Resolution::Internal(module)) => {
                debug!(specifier, path = %module.resolved_path.display(), "resolved module");
            }
            Ok(Resolution::External { .. }) => debug!(specifier, "external module"),
            Err(_) => debug!(specifier, from = %containing_file_str, "module not found"),
        }
        self.resolution_cache.insert(cache_key, result.clone());
        result
    }

    fn resolve_uncached(
        &self,
        specifier: &str,
        containing_dir: &Path,
        containing_file: &str,
        specifier_span: Span,
    ) -> Result<Resolution, ResolutionFailure> {
        let not_found = || ResolutionFailure::NotFound {
            specifier: specifier.to_string(),
            containing_file: containing_file.to_string(),
            span: specifier_span,
        };

        if is_relative(specifier) || Path::new(specifier).is_absolute() {
            let candidate = normalize_path(&containing_dir.join(specifier));
            return match try_file_or_directory(&candidate) {
                Some(resolved) => Ok(Resolution::Internal(ResolvedModule {
                    extension: ModuleExtension::from_path(&resolved),
                    resolved_path: resolved,
                    package_name: None,
                    original_specifier: specifier.to_string(),
                })),
                None => Err(not_found()),
            };
        }

        let Some((package_name, subpath)) = parse_package_specifier(specifier) else {
            return Err(not_found());
        };
        if !self.options.inlines_package(&package_name) {
            return Ok(Resolution::External {
                specifier: specifier.to_string(),
            });
        }

        let found = self.resolve_bare_specifier(
            &package_name,
            subpath.as_deref(),
            specifier,
            containing_dir,
            containing_file,
            specifier_span,
        )?;
        match found {
            Some(resolved) => Ok(Resolution::Internal(ResolvedModule {
                extension: ModuleExtension::from_path(&resolved),
                resolved_path: resolved,
                package_name: Some(package_name),
                original_specifier: specifier.to_string(),
            })),
            None => {
                debug!(specifier, "inlined package has no declarations, keeping it external");
                Ok(Resolution::External {
                    specifier: specifier.to_string(),
                })
            }
        }
    }

    /// Walk up from `containing_dir` through `node_modules` and `node_modules/@types`,
    /// then the configured type roots.
    fn resolve_bare_specifier(
        &self,
        package_name: &str,
        subpath: Option<&str>,
        specifier: &str,
        containing_dir: &Path,
        containing_file: &str,
        specifier_span: Span,
    ) -> Result<Option<PathBuf>, ResolutionFailure> {
        let types_name = types_package_name(package_name);
        let mut package_dirs = Vec::new();
        let mut current = Some(containing_dir);
        while let Some(dir) = current {
            let node_modules = dir.join("node_modules");
            if node_modules.is_dir() {
                package_dirs.push(node_modules.join(package_name));
                package_dirs.push(node_modules.join("@types").join(&types_name));
            }
            current = dir.parent();
        }
        for root in &self.options.type_roots {
            let root = normalize_path(&containing_dir.join(root));
            package_dirs.push(root.join(&types_name));
            package_dirs.push(root.join("@types").join(&types_name));
        }

        for package_dir in package_dirs {
            if !package_dir.is_dir() {
                continue;
            }
            let resolved = self.resolve_package(&package_dir, subpath).map_err(|message| {
                ResolutionFailure::PackageJsonError {
                    message,
                    specifier: specifier.to_string(),
                    containing_file: containing_file.to_string(),
                    span: specifier_span,
                }
            })?;
            if resolved.is_some() {
                return Ok(resolved);
            }
        }
        Ok(None)
    }

    fn resolve_package(&self, package_dir: &Path, subpath: Option<&str>) -> Result<Option<PathBuf>, String> {
        let package_json_path = package_dir.join("package.json");
        let package_json = if package_json_path.is_file() {
            read_package_json(&package_json_path)?
        } else {
            PackageJson::default()
        };

        let export_key = match subpath {
            Some(subpath) => format!("./{subpath}"),
            None => ".".to_string(),
        };
        if let Some(exports) = &package_json.exports
            && let Some(target) = export_target(exports, &export_key)
            && let Some(resolved) = try_file_or_directory(&normalize_path(&package_dir.join(target)))
        {
            return Ok(Some(resolved));
        }

        if let Some(subpath) = subpath {
            return Ok(try_file_or_directory(&package_dir.join(subpath)));
        }

        if let Some(types) = package_json.types.as_ref().or(package_json.typings.as_ref())
            && let Some(resolved) = try_file_or_directory(&normalize_path(&package_dir.join(types)))
        {
            return Ok(Some(resolved));
        }
        Ok(try_file(&package_dir.join("index")))
    }

    /// Clear the resolution cache
    pub fn clear_cache(&mut self) {
        self.resolution_cache.clear();
    }

    pub fn options(&self) -> &BundleOptions {
        &self.options
    }
}

fn is_relative(specifier: &str) -> bool {
    specifier == "." || specifier == ".." || specifier.starts_with("./") || specifier.starts_with("../")
}

/// Split a bare specifier into package name and subpath.
pub fn parse_package_specifier(specifier: &str) -> Option<(String, Option<String>)> {
    let mut parts = specifier.splitn(if specifier.starts_with('@') { 3 } else { 2 }, '/');
    let name = if specifier.starts_with('@') {
        let scope = parts.next()?;
        let package = parts.next().filter(|p| !p.is_empty())?;
        format!("{scope}/{package}")
    } else {
        parts.next().filter(|p| !p.is_empty())?.to_string()
    };
    let subpath = parts.next().filter(|s| !s.is_empty()).map(str::to_string);
    Some((name, subpath))
}

/// `@scope/pkg` lives in `@types/scope__pkg`.
fn types_package_name(package_name: &str) -> String {
    match package_name.strip_prefix('@') {
        Some(scoped) => scoped.replace('/', "__"),
        None => package_name.to_string(),
    }
}

const DECLARATION_EXTENSION_CANDIDATES: [&str; 7] = ["d.ts", "ts", "tsx", "d.mts", "d.cts", "mts", "cts"];

/// `.js`-family specifiers name the emitted file; look for the declaration beside it.
fn js_extension_substitution(path: &Path, extension: &str) -> Option<Vec<PathBuf>> {
    let replacements: &[&str] = match extension {
        "js" => &["d.ts", "ts", "tsx"],
        "jsx" => &["d.ts", "tsx"],
        "mjs" => &["d.mts", "mts"],
        "cjs" => &["d.cts", "cts"],
        _ => return None,
    };
    Some(replacements.iter().map(|ext| path.with_extension(ext)).collect())
}

/// Try to resolve a file with various extensions
fn try_file(path: &Path) -> Option<PathBuf> {
    if ModuleExtension::from_path(path) != ModuleExtension::Unknown {
        return path.is_file().then(|| path.to_path_buf());
    }
    if let Some(extension) = path.extension().and_then(|ext| ext.to_str())
        && let Some(candidates) = js_extension_substitution(path, extension)
    {
        return candidates.into_iter().find(|candidate| candidate.is_file());
    }

    // Append rather than replace, so `./foo.config` finds `foo.config.d.ts`.
    DECLARATION_EXTENSION_CANDIDATES.iter().find_map(|ext| {
        let mut with_ext = path.as_os_str().to_os_string();
        with_ext.push(".");
        with_ext.push(ext);
        let with_ext = PathBuf::from(with_ext);
        with_ext.is_file().then_some(with_ext)
    })
}

/// Try to resolve a path as a file or directory
fn try_file_or_directory(path: &Path) -> Option<PathBuf> {
    if let Some(resolved) = try_file(path) {
        return Some(resolved);
    }
    if path.is_dir() {
        let package_json_path = path.join("package.json");
        if let Ok(package_json) = read_package_json(&package_json_path)
            && let Some(types) = package_json.types.or(package_json.typings)
            && let Some(resolved) = try_file(&normalize_path(&path.join(types)))
        {
            return Some(resolved);
        }
        return try_file(&path.join("index"));
    }
    None
}

/// Lexically resolve `.` and `..` components.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            Component::RootDir | Component::Normal(_) | Component::Prefix(_) => {
                normalized.push(component.as_os_str());
            }
        }
    }
    normalized
}

#[derive(Debug, Default, Deserialize)]
struct PackageJson {
    #[serde(default)]
    types: Option<String>,
    #[serde(default)]
    typings: Option<String>,
    #[serde(default)]
    exports: Option<serde_json::Value>,
}

fn read_package_json(path: &Path) -> Result<PackageJson, String> {
    let content =
        std::fs::read_to_string(path).map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
    serde_json::from_str(&content).map_err(|e| format!("Failed to parse {}: {}", path.display(), e))
}

/// Look up `key` in an `exports` field, preferring the `types` condition.
fn export_target<'a>(exports: &'a serde_json::Value, key: &str) -> Option<&'a str> {
    match exports {
        serde_json::Value::String(target) if key == "." => Some(target.as_str()),
        serde_json::Value::Object(map) if map.keys().any(|k| k.starts_with('.')) => {
            conditional_target(map.get(key)?)
        }
        serde_json::Value::Object(_) if key == "." => conditional_target(exports),
        _ => None,
    }
}

fn conditional_target(value: &serde_json::Value) -> Option<&str> {
    match value {
        serde_json::Value::String(target) => Some(target.as_str()),
        serde_json::Value::Object(conditions) => ["types", "import", "require", "default"]
            .iter()
            .find_map(|condition| conditions.get(*condition).and_then(conditional_target)),
        serde_json::Value::Array(targets) => targets.iter().find_map(conditional_target),
        _ => None,
    }
}
