//! ESM statement scanning.
//!
//! The bundler understands the static subset of module syntax that machine
//! definitions use: `import` declarations, exported declarations, local
//! export lists and `export default`. Re-export forms (`export ... from`,
//! `export *`) are rejected rather than silently mangled.

use std::ops::Range;
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{BuildError, Result};

static IMPORT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?m)^[ \t]*import\s*(?:([^'"]+?)\s*from\s*)?["']([^"']+)["'][ \t]*;?"#)
        .expect("import regex")
});

static EXPORT_DECL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?m)^[ \t]*(export[ \t]+)(?:async[ \t]+function|function|class|const|let|var)[ \t]*\*?[ \t]*([A-Za-z_$][A-Za-z0-9_$]*)",
    )
    .expect("export decl regex")
});

static EXPORT_DEFAULT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^[ \t]*export[ \t]+default[ \t]+").expect("export default regex"));

static EXPORT_LIST_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?m)^[ \t]*export[ \t]*\{([^}]*)\}[ \t]*(?:from[ \t]*["']([^"']+)["'])?[ \t]*;?"#)
        .expect("export list regex")
});

static EXPORT_STAR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^[ \t]*export[ \t]*\*").expect("export star regex"));

static LEXICAL_DECL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^[ \t]*(?:export[ \t]+)?(?:const|let|class)[ \t]+([A-Za-z_$][A-Za-z0-9_$]*)")
        .expect("lexical decl regex")
});

/// One parsed `import` statement, with the byte range of the whole statement
/// so it can be rewritten in place.
#[derive(Debug, Clone)]
pub struct ImportStmt {
    pub span: Range<usize>,
    pub clause: ImportClause,
    pub specifier: String,
}

#[derive(Debug, Clone, Default)]
pub struct ImportClause {
    pub default: Option<String>,
    pub namespace: Option<String>,
    pub named: Vec<NamedImport>,
}

impl ImportClause {
    pub fn is_side_effect(&self) -> bool {
        self.default.is_none() && self.namespace.is_none() && self.named.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct NamedImport {
    pub imported: String,
    pub local: String,
}

/// `exported` is the public name, `local` the top-level binding behind it.
#[derive(Debug, Clone)]
pub struct ExportBinding {
    pub exported: String,
    pub local: String,
}

#[derive(Debug, Default)]
pub struct ParsedModule {
    pub imports: Vec<ImportStmt>,
    pub exports: Vec<ExportBinding>,
    pub has_default: bool,
    /// Spans of the `export ` keyword in front of declarations.
    pub export_keyword_spans: Vec<Range<usize>>,
    /// Spans of whole `export { ... };` statements.
    pub export_list_spans: Vec<Range<usize>>,
    /// Spans of `export default ` prefixes.
    pub export_default_spans: Vec<Range<usize>>,
    /// Top-level `const`/`let`/`class` names, deduplicated. Function and
    /// `var` declarations merge under concatenation; these throw.
    pub declared: Vec<String>,
}

pub fn scan(source: &str, file: &Path) -> Result<ParsedModule> {
    let mut parsed = ParsedModule::default();

    if EXPORT_STAR_RE.is_match(source) {
        return Err(BuildError::syntax(
            file,
            "`export *` re-exports are not supported; export names explicitly",
        ));
    }

    for caps in EXPORT_LIST_RE.captures_iter(source) {
        if caps.get(2).is_some() {
            return Err(BuildError::syntax(
                file,
                "`export { ... } from` re-exports are not supported; import first, then export",
            ));
        }
        let whole = caps.get(0).map(|m| m.range()).unwrap_or_default();
        let list = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
        for item in list.split(',') {
            let item = item.trim();
            if item.is_empty() {
                continue;
            }
            let (local, exported) = parse_alias(item, file)?;
            parsed.exports.push(ExportBinding { exported, local });
        }
        parsed.export_list_spans.push(whole);
    }

    for caps in EXPORT_DECL_RE.captures_iter(source) {
        let keyword = caps.get(1).map(|m| m.range()).unwrap_or_default();
        let name = caps.get(2).map(|m| m.as_str()).unwrap_or_default().to_string();
        parsed.exports.push(ExportBinding {
            exported: name.clone(),
            local: name,
        });
        parsed.export_keyword_spans.push(keyword);
    }

    for m in EXPORT_DEFAULT_RE.find_iter(source) {
        parsed.has_default = true;
        parsed.export_default_spans.push(m.range());
    }

    let mut seen = std::collections::HashSet::new();
    for caps in LEXICAL_DECL_RE.captures_iter(source) {
        let name = caps.get(1).map(|m| m.as_str()).unwrap_or_default().to_string();
        if seen.insert(name.clone()) {
            parsed.declared.push(name);
        }
    }

    for caps in IMPORT_RE.captures_iter(source) {
        let whole = caps.get(0).map(|m| m.range()).unwrap_or_default();
        let clause_text = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
        let specifier = caps.get(2).map(|m| m.as_str()).unwrap_or_default().to_string();
        let clause = parse_clause(clause_text, file)?;
        parsed.imports.push(ImportStmt {
            span: whole,
            clause,
            specifier,
        });
    }

    Ok(parsed)
}

fn parse_clause(clause: &str, file: &Path) -> Result<ImportClause> {
    let mut out = ImportClause::default();
    let mut rest = clause.trim();
    if rest.is_empty() {
        return Ok(out);
    }

    if !rest.starts_with('{') && !rest.starts_with('*') {
        let (head, tail) = match rest.find(',') {
            Some(i) => (rest[..i].trim(), rest[i + 1..].trim()),
            None => (rest, ""),
        };
        if !is_ident(head) {
            return Err(unsupported_clause(clause, file));
        }
        out.default = Some(head.to_string());
        rest = tail;
    }

    if rest.is_empty() {
        return Ok(out);
    }

    if let Some(ns) = rest.strip_prefix('*') {
        let ns = ns
            .trim_start()
            .strip_prefix("as")
            .map(str::trim)
            .filter(|n| is_ident(n))
            .ok_or_else(|| unsupported_clause(clause, file))?;
        out.namespace = Some(ns.to_string());
        return Ok(out);
    }

    if let Some(inner) = rest.strip_prefix('{') {
        let inner = inner
            .trim_end()
            .strip_suffix('}')
            .ok_or_else(|| unsupported_clause(clause, file))?;
        for item in inner.split(',') {
            let item = item.trim();
            if item.is_empty() {
                continue;
            }
            let (imported, local) = parse_alias(item, file)?;
            out.named.push(NamedImport { imported, local });
        }
        return Ok(out);
    }

    Err(unsupported_clause(clause, file))
}

/// Parses `name` or `name as alias`, returning `(name, alias)`.
fn parse_alias(item: &str, file: &Path) -> Result<(String, String)> {
    let parts: Vec<&str> = item.split_whitespace().collect();
    match parts.as_slice() {
        [name] if is_ident_or_default(name) => Ok((name.to_string(), name.to_string())),
        [name, "as", alias] if is_ident_or_default(name) && is_ident(alias) => {
            Ok((name.to_string(), alias.to_string()))
        }
        _ => Err(BuildError::syntax(
            file,
            format!("unsupported binding `{item}` in import/export list"),
        )),
    }
}

fn unsupported_clause(clause: &str, file: &Path) -> BuildError {
    let compact = clause.split_whitespace().collect::<Vec<_>>().join(" ");
    BuildError::syntax(file, format!("unsupported import clause `{compact}`"))
}

fn is_ident(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

fn is_ident_or_default(s: &str) -> bool {
    s == "default" || is_ident(s)
}

/// A single in-place rewrite of a scanned statement.
#[derive(Debug)]
pub struct Edit {
    pub span: Range<usize>,
    pub replacement: String,
}

/// Applies non-overlapping edits to `source` in one pass.
pub fn apply_edits(source: &str, mut edits: Vec<Edit>) -> String {
    edits.sort_by_key(|e| e.span.start);
    let mut out = String::with_capacity(source.len());
    let mut pos = 0;
    for edit in edits {
        if edit.span.start < pos {
            continue;
        }
        out.push_str(&source[pos..edit.span.start]);
        out.push_str(&edit.replacement);
        pos = edit.span.end;
    }
    out.push_str(&source[pos..]);
    out
}
