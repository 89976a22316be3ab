//! Module unit source format.
//!
//! A unit is a line-oriented list of statements executed top to bottom:
//!
//! ```text
//! # comment
//! let version = "2.1.0"
//! use http.client            # binds `http`
//! use http.client as client  # binds `client` to the leaf module
//! use .sibling               # package-relative, binds `sibling`
//! from ..util use log, fmt as format
//! fail "unsupported platform"
//! ```
//!
//! Every `use` and `from` is a load request issued with the unit's own file
//! as the innermost caller frame.

use std::path::Path;
use std::sync::Arc;

use crate::error::{ImportError, ImportResult};

/// Target of a `use` or `from` statement.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImportTarget {
    /// Number of leading dots (0 for absolute).
    pub level: u32,
    /// Dotted name after the dots; empty for `from . use x`.
    pub name: String,
}

impl ImportTarget {
    pub fn is_relative(&self) -> bool {
        self.level > 0
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Statement {
    Use {
        target: ImportTarget,
        alias: Option<Arc<str>>,
    },
    From {
        target: ImportTarget,
        /// `(item, alias)` pairs.
        items: Vec<(Arc<str>, Option<Arc<str>>)>,
    },
    Let {
        name: Arc<str>,
        value: Arc<str>,
    },
    Fail {
        message: Arc<str>,
    },
}

/// A statement with its 1-based line number.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceLine {
    pub line: usize,
    pub statement: Statement,
}

/// A parsed unit.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UnitSource {
    lines: Vec<SourceLine>,
}

impl UnitSource {
    pub fn lines(&self) -> &[SourceLine] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Parse unit text. `path` is only used in error messages.
pub fn parse_unit(text: &str, path: &Path) -> ImportResult<UnitSource> {
    let mut lines = Vec::new();
    for (index, raw) in text.lines().enumerate() {
        let line = index + 1;
        let syntax = |message: String| ImportError::Syntax {
            path: path.to_path_buf(),
            line,
            message,
        };

        let content = strip_comment(raw).trim();
        if content.is_empty() {
            continue;
        }

        let (keyword, rest) = split_word(content);
        let statement = match keyword {
            "use" => parse_use(rest).map_err(syntax)?,
            "from" => parse_from(rest).map_err(syntax)?,
            "let" => parse_let(rest).map_err(syntax)?,
            "fail" => Statement::Fail {
                message: parse_string(rest).map_err(syntax)?,
            },
            other => return Err(syntax(format!("unknown statement '{other}'"))),
        };
        lines.push(SourceLine { line, statement });
    }
    Ok(UnitSource { lines })
}

/// Drop a trailing `#` comment, ignoring `#` inside string literals.
fn strip_comment(line: &str) -> &str {
    let mut in_string = false;
    let mut escaped = false;
    for (i, c) in line.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            '#' if !in_string => return &line[..i],
            _ => {}
        }
    }
    line
}

fn split_word(s: &str) -> (&str, &str) {
    match s.find(char::is_whitespace) {
        Some(i) => (&s[..i], s[i..].trim_start()),
        None => (s, ""),
    }
}

fn parse_target(s: &str) -> Result<ImportTarget, String> {
    if s.is_empty() {
        return Err("expected a module name".to_string());
    }
    let name = s.trim_start_matches('.');
    let level = u32::try_from(s.len() - name.len()).map_err(|_| "too many leading dots".to_string())?;
    if level == 0 && name.is_empty() {
        return Err("expected a module name".to_string());
    }
    if !name.is_empty() && !name.split('.').all(is_identifier) {
        return Err(format!("invalid module name '{s}'"));
    }
    Ok(ImportTarget {
        level,
        name: name.to_string(),
    })
}

fn parse_alias(s: &str) -> Result<Option<Arc<str>>, String> {
    if s.is_empty() {
        return Ok(None);
    }
    let (keyword, alias) = split_word(s);
    if keyword != "as" {
        return Err(format!("unexpected '{s}'"));
    }
    if !is_identifier(alias) {
        return Err(format!("invalid alias '{alias}'"));
    }
    Ok(Some(Arc::from(alias)))
}

fn parse_use(rest: &str) -> Result<Statement, String> {
    let (target, tail) = split_word(rest);
    let target = parse_target(target)?;
    if target.name.is_empty() {
        return Err("`use` needs a module name; use `from . use name`".to_string());
    }
    let alias = parse_alias(tail)?;
    Ok(Statement::Use { target, alias })
}

fn parse_from(rest: &str) -> Result<Statement, String> {
    let (target, tail) = split_word(rest);
    let target = parse_target(target)?;
    let (keyword, list) = split_word(tail);
    if keyword != "use" {
        return Err("expected `use` after the module name".to_string());
    }
    let mut items = Vec::new();
    for entry in list.split(',') {
        let entry = entry.trim();
        let (item, tail) = split_word(entry);
        if !is_identifier(item) {
            return Err(format!("invalid import item '{entry}'"));
        }
        items.push((Arc::from(item), parse_alias(tail)?));
    }
    Ok(Statement::From { target, items })
}

fn parse_let(rest: &str) -> Result<Statement, String> {
    let Some((name, value)) = rest.split_once('=') else {
        return Err("expected `let name = \"value\"`".to_string());
    };
    let name = name.trim();
    if !is_identifier(name) {
        return Err(format!("invalid attribute name '{name}'"));
    }
    Ok(Statement::Let {
        name: Arc::from(name),
        value: parse_string(value.trim())?,
    })
}

fn parse_string(s: &str) -> Result<Arc<str>, String> {
    let inner = s
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .ok_or_else(|| format!("expected a string literal, found '{s}'"))?;

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some(c @ ('"' | '\\')) => out.push(c),
                Some(other) => return Err(format!("unknown escape '\\{other}'")),
                None => return Err("dangling escape".to_string()),
            },
            '"' => return Err("unescaped quote inside string".to_string()),
            c => out.push(c),
        }
    }
    Ok(Arc::from(out))
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
