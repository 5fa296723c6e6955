//! Dialect-specific import resolution.
//!
//! Node-dialect specifiers get extension inference and `node_modules`
//! lookups; deno-dialect specifiers require explicit extensions and resolve
//! remote URLs through a local `vendor/` directory (the `deno vendor`
//! layout). Nothing here touches the network.

use std::path::{Path, PathBuf};

use machinery_core::Dialect;

use crate::error::{BuildError, Result};

const KNOWN_EXTENSIONS: [&str; 2] = ["js", "mjs"];

#[derive(Debug, Clone)]
pub struct SpecifierResolver {
    dialect: Dialect,
    root: PathBuf,
}

impl SpecifierResolver {
    pub fn new(dialect: Dialect, root: PathBuf) -> Self {
        Self { dialect, root }
    }

    pub fn resolve(&self, specifier: &str, importer: &Path) -> Result<PathBuf> {
        if specifier.starts_with("./") || specifier.starts_with("../") {
            return self.resolve_relative(specifier, importer);
        }

        if specifier.starts_with("https://") || specifier.starts_with("http://") {
            return match self.dialect {
                Dialect::Node => Err(BuildError::unresolved(
                    specifier,
                    importer,
                    "remote imports are a deno-dialect feature",
                )),
                Dialect::Deno => self.resolve_vendored(specifier, importer),
            };
        }

        match self.dialect {
            Dialect::Node => self.resolve_node_modules(specifier, importer),
            Dialect::Deno => Err(BuildError::unresolved(
                specifier,
                importer,
                "bare specifiers are not supported in deno-dialect modules",
            )),
        }
    }

    fn resolve_relative(&self, specifier: &str, importer: &Path) -> Result<PathBuf> {
        let base = importer.parent().unwrap_or_else(|| Path::new("."));
        let candidate = base.join(specifier);

        match self.dialect {
            Dialect::Node => self.with_inference(candidate, specifier, importer),
            Dialect::Deno => {
                if !has_known_extension(specifier) {
                    return Err(BuildError::unresolved(
                        specifier,
                        importer,
                        "deno-dialect imports require an explicit file extension",
                    ));
                }
                if candidate.is_file() {
                    Ok(candidate)
                } else {
                    Err(BuildError::unresolved(specifier, importer, "no such file"))
                }
            }
        }
    }

    /// Node-style candidate expansion: exact path, appended extensions, then
    /// a directory index.
    fn with_inference(
        &self,
        candidate: PathBuf,
        specifier: &str,
        importer: &Path,
    ) -> Result<PathBuf> {
        if candidate.is_file() {
            return Ok(candidate);
        }
        for ext in KNOWN_EXTENSIONS {
            let with_ext = PathBuf::from(format!("{}.{}", candidate.display(), ext));
            if with_ext.is_file() {
                return Ok(with_ext);
            }
        }
        if candidate.is_dir() {
            for ext in KNOWN_EXTENSIONS {
                let index = candidate.join(format!("index.{ext}"));
                if index.is_file() {
                    return Ok(index);
                }
            }
        }
        Err(BuildError::unresolved(
            specifier,
            importer,
            "no matching file",
        ))
    }

    fn resolve_vendored(&self, specifier: &str, importer: &Path) -> Result<PathBuf> {
        let without_scheme = specifier
            .trim_start_matches("https://")
            .trim_start_matches("http://");
        let without_query = without_scheme
            .split(['?', '#'])
            .next()
            .unwrap_or(without_scheme);

        let mut vendored = self.root.join("vendor");
        for segment in without_query.split('/') {
            vendored.push(segment);
        }

        if vendored.is_file() {
            Ok(vendored)
        } else {
            Err(BuildError::unresolved(
                specifier,
                importer,
                "not found under vendor/ (run `deno vendor` on the entrypoint first)",
            ))
        }
    }

    fn resolve_node_modules(&self, specifier: &str, importer: &Path) -> Result<PathBuf> {
        let (package, subpath) = split_package_specifier(specifier);
        let start = importer.parent().unwrap_or_else(|| Path::new("."));

        for dir in start.ancestors() {
            let mut pkg_dir = dir.join("node_modules");
            for segment in package.split('/') {
                pkg_dir.push(segment);
            }
            if !pkg_dir.is_dir() {
                continue;
            }
            return match subpath {
                Some(sub) => self.with_inference(pkg_dir.join(sub), specifier, importer),
                None => self.resolve_package_entry(pkg_dir, specifier, importer),
            };
        }

        Err(BuildError::unresolved(
            specifier,
            importer,
            "not found in any node_modules directory",
        ))
    }

    fn resolve_package_entry(
        &self,
        pkg_dir: PathBuf,
        specifier: &str,
        importer: &Path,
    ) -> Result<PathBuf> {
        let manifest = pkg_dir.join("package.json");
        if manifest.is_file() {
            let text = std::fs::read_to_string(&manifest)?;
            let value: serde_json::Value = serde_json::from_str(&text).map_err(|e| {
                BuildError::syntax(&manifest, format!("invalid package.json: {e}"))
            })?;
            for field in ["module", "main"] {
                if let Some(entry) = value.get(field).and_then(|v| v.as_str()) {
                    return self.with_inference(pkg_dir.join(entry), specifier, importer);
                }
            }
        }
        self.with_inference(pkg_dir, specifier, importer)
    }
}

fn has_known_extension(specifier: &str) -> bool {
    KNOWN_EXTENSIONS
        .iter()
        .any(|ext| specifier.ends_with(&format!(".{ext}")))
}

/// Splits a bare specifier into the package name (respecting `@scope/name`)
/// and an optional subpath.
fn split_package_specifier(specifier: &str) -> (String, Option<&str>) {
    let segments: Vec<&str> = specifier.splitn(3, '/').collect();
    if specifier.starts_with('@') {
        match segments.as_slice() {
            [scope, name] => (format!("{scope}/{name}"), None),
            [scope, name, rest] => (format!("{scope}/{name}"), Some(rest)),
            _ => (specifier.to_string(), None),
        }
    } else {
        match specifier.split_once('/') {
            Some((name, rest)) => (name.to_string(), Some(rest)),
            None => (specifier.to_string(), None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(path: &Path, contents: &str) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, contents).unwrap();
    }

    #[test]
    fn test_node_extension_inference() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_path_buf();
        write(&root.join("guards.js"), "export const g = 1;");
        let importer = root.join("machine.js");
        write(&importer, "");

        let resolver = SpecifierResolver::new(Dialect::Node, root.clone());
        let resolved = resolver.resolve("./guards", &importer).unwrap();
        assert_eq!(resolved, root.join("guards.js"));
    }

    #[test]
    fn test_node_directory_index() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_path_buf();
        write(&root.join("lib/index.mjs"), "export const g = 1;");
        let importer = root.join("machine.js");
        write(&importer, "");

        let resolver = SpecifierResolver::new(Dialect::Node, root.clone());
        let resolved = resolver.resolve("./lib", &importer).unwrap();
        assert_eq!(resolved, root.join("lib/index.mjs"));
    }

    #[test]
    fn test_deno_requires_extension() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_path_buf();
        write(&root.join("guards.js"), "export const g = 1;");
        let importer = root.join("machine.mjs");
        write(&importer, "");

        let resolver = SpecifierResolver::new(Dialect::Deno, root);
        let err = resolver.resolve("./guards", &importer).unwrap_err();
        assert!(err.to_string().contains("explicit file extension"));
    }

    #[test]
    fn test_deno_vendor_lookup() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_path_buf();
        let vendored = root.join("vendor/cdn.machinery.dev/machine@1/mod.mjs");
        write(&vendored, "export const m = 1;");
        let importer = root.join("machine.mjs");
        write(&importer, "");

        let resolver = SpecifierResolver::new(Dialect::Deno, root);
        let resolved = resolver
            .resolve("https://cdn.machinery.dev/machine@1/mod.mjs", &importer)
            .unwrap();
        assert_eq!(resolved, vendored);
    }

    #[test]
    fn test_node_modules_scoped_package() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_path_buf();
        write(
            &root.join("node_modules/@machinery/machine/package.json"),
            r#"{"name": "@machinery/machine", "main": "lib/machine.js"}"#,
        );
        write(
            &root.join("node_modules/@machinery/machine/lib/machine.js"),
            "export const createMachine = () => {};",
        );
        let importer = root.join("src/machine.js");
        write(&importer, "");

        let resolver = SpecifierResolver::new(Dialect::Node, root.clone());
        let resolved = resolver.resolve("@machinery/machine", &importer).unwrap();
        assert_eq!(
            resolved,
            root.join("node_modules/@machinery/machine/lib/machine.js")
        );
    }

    #[test]
    fn test_remote_rejected_for_node() {
        let dir = tempfile::tempdir().unwrap();
        let importer = dir.path().join("machine.js");
        write(&importer, "");

        let resolver = SpecifierResolver::new(Dialect::Node, dir.path().to_path_buf());
        assert!(resolver
            .resolve("https://cdn.machinery.dev/machine@1/mod.mjs", &importer)
            .is_err());
    }

    #[test]
    fn test_split_package_specifier() {
        assert_eq!(
            split_package_specifier("@machinery/machine"),
            ("@machinery/machine".to_string(), None)
        );
        assert_eq!(
            split_package_specifier("@machinery/machine/guards"),
            ("@machinery/machine".to_string(), Some("guards"))
        );
        assert_eq!(
            split_package_specifier("lodash/merge"),
            ("lodash".to_string(), Some("merge"))
        );
    }
}
