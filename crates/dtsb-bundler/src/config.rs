//! Bundle options.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Options that change how bare module specifiers are treated.
///
/// Deserialized from the `dtsb.json` config file, which uses camelCase keys:
///
/// ```json
/// { "respectExternal": false, "includeExternal": ["some-lib"], "typeRoots": ["./types"] }
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BundleOptions {
    /// Inline declarations of every resolvable package instead of importing them.
    pub respect_external: bool,
    /// Packages whose declarations are inlined even without `respect_external`.
    pub include_external: Vec<String>,
    /// Extra roots searched for `@types/<name>` packages.
    pub type_roots: Vec<PathBuf>,
}

impl BundleOptions {
    /// Whether declarations of `package_name` are pulled into the bundle.
    pub fn inlines_package(&self, package_name: &str) -> bool {
        self.respect_external || self.include_external.iter().any(|name| name == package_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_camel_case() {
        let options: BundleOptions =
            serde_json::from_str(r#"{ "includeExternal": ["a", "@scope/b"], "typeRoots": ["./types"] }"#).unwrap();
        assert!(!options.respect_external);
        assert_eq!(options.include_external, ["a", "@scope/b"]);
        assert_eq!(options.type_roots, [PathBuf::from("./types")]);
    }

    #[test]
    fn test_inlines_package() {
        let mut options = BundleOptions {
            include_external: vec!["a".into()],
            ..Default::default()
        };
        assert!(options.inlines_package("a"));
        assert!(!options.inlines_package("b"));
        options.respect_external = true;
        assert!(options.inlines_package("b"));
    }
}
