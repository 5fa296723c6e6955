//! Single-file bundling for machine definition entrypoints.
//!
//! The bundler resolves the static import graph reachable from an
//! entrypoint and emits one self-contained ECMAScript module with no
//! dialect-specific globals. Exported names on the entry module are
//! preserved verbatim so the sandbox can assert the artifact's contract
//! after bundling.

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use tracing::debug;

use machinery_core::Dialect;

mod error;
mod parse;
mod resolver;

pub use error::{BuildError, Result};

use parse::{apply_edits, Edit, ImportClause};
use resolver::SpecifierResolver;

/// The state-machine runtime library. When externalized it is left as a bare
/// import so the backend can substitute its own optimized copy.
pub const RUNTIME_PACKAGE: &str = "@machinery/machine";

/// Hosted copies of the runtime carry this marker in their URL.
const RUNTIME_URL_MARKER: &str = "machinery.dev/machine";

/// The externalized/fully-inlined pairing produced by one logical build.
#[derive(Debug, Clone)]
pub struct BundleVariants {
    pub externalized: String,
    pub inlined: String,
}

#[derive(Debug, Clone)]
pub struct Bundler {
    dialect: Dialect,
}

struct ModuleInfo {
    /// Exported name -> top-level binding in the emitted bundle.
    exports: HashMap<String, String>,
    default_var: Option<String>,
}

struct EmitCtx {
    resolver: SpecifierResolver,
    externalize: bool,
    root: PathBuf,
    done: HashMap<PathBuf, ModuleInfo>,
    /// Top-level lexical name -> file that first declared it.
    bindings: HashMap<String, PathBuf>,
    stack: Vec<PathBuf>,
    sections: Vec<String>,
    runtime_imports: BTreeSet<String>,
    next_id: usize,
    has_content: bool,
}

impl Bundler {
    pub fn new(dialect: Dialect) -> Self {
        Self { dialect }
    }

    /// Bundles `entry` into a single module. With `externalize_runtime` the
    /// runtime library import is preserved instead of inlined; the output
    /// otherwise behaves identically.
    pub fn bundle(&self, entry: &Path, externalize_runtime: bool) -> Result<String> {
        let entry = entry
            .canonicalize()
            .map_err(|_| BuildError::MissingEntry(entry.to_path_buf()))?;
        if !entry.is_file() {
            return Err(BuildError::MissingEntry(entry));
        }

        debug!(
            entry = %entry.display(),
            dialect = self.dialect.as_str(),
            externalize = externalize_runtime,
            "bundling entrypoint"
        );

        let root = entry
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .to_path_buf();
        let mut ctx = EmitCtx {
            resolver: SpecifierResolver::new(self.dialect, root.clone()),
            externalize: externalize_runtime,
            root,
            done: HashMap::new(),
            bindings: HashMap::new(),
            stack: Vec::new(),
            sections: Vec::new(),
            runtime_imports: BTreeSet::new(),
            next_id: 0,
            has_content: false,
        };

        self.emit(&entry, true, &mut ctx)?;

        if !ctx.has_content {
            return Err(BuildError::EmptyOutput(entry));
        }

        let mut out = String::new();
        for stmt in &ctx.runtime_imports {
            out.push_str(stmt);
            out.push('\n');
        }
        if !ctx.runtime_imports.is_empty() {
            out.push('\n');
        }
        for section in &ctx.sections {
            out.push_str(section);
        }
        Ok(out)
    }

    /// Builds both variants from one logical call. The two emissions share no
    /// state and run concurrently; both must complete before the result is
    /// returned.
    pub async fn build_variants(&self, entry: &Path) -> Result<BundleVariants> {
        let externalized = {
            let bundler = self.clone();
            let entry = entry.to_path_buf();
            tokio::task::spawn_blocking(move || bundler.bundle(&entry, true))
        };
        let inlined = {
            let bundler = self.clone();
            let entry = entry.to_path_buf();
            tokio::task::spawn_blocking(move || bundler.bundle(&entry, false))
        };

        let (externalized, inlined) = tokio::try_join!(externalized, inlined)
            .map_err(|e| BuildError::Io(std::io::Error::other(e)))?;
        Ok(BundleVariants {
            externalized: externalized?,
            inlined: inlined?,
        })
    }

    fn is_runtime(&self, specifier: &str) -> bool {
        specifier == RUNTIME_PACKAGE
            || specifier.starts_with(&format!("{RUNTIME_PACKAGE}/"))
            || ((specifier.starts_with("https://") || specifier.starts_with("http://"))
                && specifier.contains(RUNTIME_URL_MARKER))
    }

    /// Emits `path` and everything it imports, dependencies first, each
    /// module exactly once.
    fn emit(&self, path: &Path, is_entry: bool, ctx: &mut EmitCtx) -> Result<()> {
        if ctx.done.contains_key(path) {
            return Ok(());
        }
        if ctx.stack.iter().any(|p| p == path) {
            return Err(BuildError::CircularImport(path.to_path_buf()));
        }
        ctx.stack.push(path.to_path_buf());

        let source = std::fs::read_to_string(path)?;
        let parsed = parse::scan(&source, path)?;

        for name in &parsed.declared {
            claim_binding(ctx, name, path)?;
        }

        let id = ctx.next_id;
        ctx.next_id += 1;
        let default_var = (parsed.has_default && !is_entry)
            .then(|| format!("__bundle_default_{id}"));

        let mut edits: Vec<Edit> = Vec::new();

        for import in &parsed.imports {
            if ctx.externalize && self.is_runtime(&import.specifier) {
                ctx.runtime_imports
                    .insert(runtime_import_stmt(&import.clause));
                edits.push(Edit {
                    span: import.span.clone(),
                    replacement: String::new(),
                });
                continue;
            }

            let target = ctx.resolver.resolve(&import.specifier, path)?;
            let target = target.canonicalize()?;
            self.emit(&target, false, ctx)?;

            let (binding, introduced) = match ctx.done.get(&target) {
                Some(dep) => binding_for(&import.clause, dep, path, &import.specifier)?,
                None => (String::new(), Vec::new()),
            };
            for name in &introduced {
                claim_binding(ctx, name, path)?;
            }
            edits.push(Edit {
                span: import.span.clone(),
                replacement: binding,
            });
        }

        if !is_entry {
            for span in &parsed.export_keyword_spans {
                edits.push(Edit {
                    span: span.clone(),
                    replacement: String::new(),
                });
            }
            for span in &parsed.export_list_spans {
                edits.push(Edit {
                    span: span.clone(),
                    replacement: String::new(),
                });
            }
            if let Some(var) = &default_var {
                for span in &parsed.export_default_spans {
                    edits.push(Edit {
                        span: span.clone(),
                        replacement: format!("const {var} = "),
                    });
                }
            }
        }

        let rewritten = apply_edits(&source, edits);
        if !rewritten.trim().is_empty() {
            ctx.has_content = true;
        }

        let label = path
            .strip_prefix(&ctx.root)
            .unwrap_or(path)
            .display()
            .to_string();
        ctx.sections
            .push(format!("// {}\n{}\n\n", label, rewritten.trim_end()));

        ctx.stack.pop();

        let exports = parsed
            .exports
            .iter()
            .map(|b| (b.exported.clone(), b.local.clone()))
            .collect();
        ctx.done.insert(
            path.to_path_buf(),
            ModuleInfo {
                exports,
                default_var,
            },
        );
        Ok(())
    }
}

/// Two inlined modules may not declare the same top-level lexical name; the
/// concatenated output would throw at load time instead of at build time.
fn claim_binding(ctx: &mut EmitCtx, name: &str, file: &Path) -> Result<()> {
    match ctx.bindings.get(name) {
        Some(first) if first != file => Err(BuildError::syntax(
            file,
            format!(
                "top-level binding `{name}` collides with a declaration in {}",
                first.display()
            ),
        )),
        Some(_) => Ok(()),
        None => {
            ctx.bindings.insert(name.to_string(), file.to_path_buf());
            Ok(())
        }
    }
}

/// Alias bindings replacing an import of an inlined module, plus the new
/// top-level names those bindings declare. Imports whose local name already
/// matches the inlined binding need no code at all.
fn binding_for(
    clause: &ImportClause,
    dep: &ModuleInfo,
    importer: &Path,
    specifier: &str,
) -> Result<(String, Vec<String>)> {
    let mut lines = Vec::new();
    let mut introduced = Vec::new();

    if let Some(local) = &clause.default {
        let var = dep.default_var.as_ref().ok_or_else(|| {
            BuildError::syntax(importer, format!("\"{specifier}\" has no default export"))
        })?;
        lines.push(format!("const {local} = {var};"));
        introduced.push(local.clone());
    }

    if let Some(ns) = &clause.namespace {
        let mut fields: Vec<String> = dep
            .exports
            .iter()
            .map(|(exported, local)| {
                if exported == local {
                    exported.clone()
                } else {
                    format!("{exported}: {local}")
                }
            })
            .collect();
        if let Some(var) = &dep.default_var {
            fields.push(format!("default: {var}"));
        }
        fields.sort();
        lines.push(format!("const {ns} = {{ {} }};", fields.join(", ")));
        introduced.push(ns.clone());
    }

    for named in &clause.named {
        let target = if named.imported == "default" {
            dep.default_var.as_ref().ok_or_else(|| {
                BuildError::syntax(importer, format!("\"{specifier}\" has no default export"))
            })?
        } else {
            dep.exports.get(&named.imported).ok_or_else(|| {
                BuildError::syntax(
                    importer,
                    format!("\"{specifier}\" has no export named `{}`", named.imported),
                )
            })?
        };
        if target != &named.local {
            lines.push(format!("const {} = {target};", named.local));
            introduced.push(named.local.clone());
        }
    }

    Ok((lines.join("\n"), introduced))
}

/// Normalized form of a preserved runtime import, hoisted to the top of the
/// bundle and deduplicated.
fn runtime_import_stmt(clause: &ImportClause) -> String {
    if clause.is_side_effect() {
        return format!("import \"{RUNTIME_PACKAGE}\";");
    }

    let mut parts = Vec::new();
    if let Some(default) = &clause.default {
        parts.push(default.clone());
    }
    if let Some(ns) = &clause.namespace {
        parts.push(format!("* as {ns}"));
    }
    if !clause.named.is_empty() {
        let items: Vec<String> = clause
            .named
            .iter()
            .map(|n| {
                if n.imported == n.local {
                    n.imported.clone()
                } else {
                    format!("{} as {}", n.imported, n.local)
                }
            })
            .collect();
        parts.push(format!("{{ {} }}", items.join(", ")));
    }
    format!("import {} from \"{RUNTIME_PACKAGE}\";", parts.join(", "))
}
