//! Hierarchical module names.
//!
//! ```text
//! "http.client.pool"
//!   ├── top_level() → "http"
//!   ├── parent()    → "http.client"
//!   └── leaf()      → "pool"
//! ```

use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;

use crate::error::{ImportError, ImportResult};

/// A validated dotted module name.
///
/// Cheap to clone (`Arc<str>`). Hashes and compares like its string form, so
/// tables keyed by `ModuleName` can be queried with a plain `&str`.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleName(Arc<str>);

impl ModuleName {
    /// Parse and validate a dotted name.
    ///
    /// Each segment must be an identifier: an ASCII letter or `_` followed by
    /// ASCII letters, digits, or `_`. Empty segments (`".a"`, `"a..b"`) are
    /// rejected.
    pub fn parse(name: &str) -> ImportResult<Self> {
        if name.is_empty() || !name.split('.').all(is_identifier) {
            return Err(ImportError::InvalidName(name.to_string()));
        }
        Ok(ModuleName(Arc::from(name)))
    }

    /// The full dotted name.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The first segment.
    #[inline]
    pub fn top_level(&self) -> &str {
        self.0.split('.').next().unwrap_or(&self.0)
    }

    /// The last segment.
    #[inline]
    pub fn leaf(&self) -> &str {
        self.0.rsplit('.').next().unwrap_or(&self.0)
    }

    #[inline]
    pub fn is_top_level(&self) -> bool {
        !self.0.contains('.')
    }

    /// The enclosing package, or `None` for a top-level name.
    pub fn parent(&self) -> Option<ModuleName> {
        self.0
            .rsplit_once('.')
            .map(|(parent, _)| ModuleName(Arc::from(parent)))
    }

    /// The top-level name as its own `ModuleName`.
    pub fn top_level_name(&self) -> ModuleName {
        if self.is_top_level() {
            self.clone()
        } else {
            ModuleName(Arc::from(self.top_level()))
        }
    }

    /// Iterate the segments in order.
    pub fn parts(&self) -> impl Iterator<Item = &str> {
        self.0.split('.')
    }

    /// Append one segment.
    pub fn child(&self, leaf: &str) -> ImportResult<ModuleName> {
        if !is_identifier(leaf) {
            return Err(ImportError::InvalidName(format!("{}.{leaf}", self.0)));
        }
        Ok(ModuleName(Arc::from(format!("{}.{leaf}", self.0))))
    }
}

fn is_identifier(segment: &str) -> bool {
    let mut chars = segment.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl Borrow<str> for ModuleName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModuleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for ModuleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ModuleName({:?})", &*self.0)
    }
}

/// Resolve a package-relative import to an absolute name.
///
/// `level` counts leading dots: 1 is the importing package itself, 2 its
/// parent, and so on. `package` is the package of the importing module
/// (`None` for a top-level plain module or synthetic code).
///
/// ```text
/// resolve_relative("", 1, "a.b.c")    → "a.b.c"
/// resolve_relative("d", 1, "a.b.c")   → "a.b.c.d"
/// resolve_relative("d", 2, "a.b.c")   → "a.b.d"
/// resolve_relative("", 3, "a.b.c")    → "a"
/// ```
pub fn resolve_relative(
    name: &str,
    level: u32,
    package: Option<&ModuleName>,
) -> ImportResult<ModuleName> {
    if level == 0 {
        return ModuleName::parse(name);
    }

    let Some(package) = package else {
        return Err(ImportError::RelativeWithoutPackage {
            name: name.to_string(),
        });
    };

    let depth = package.parts().count();
    let level = level as usize;
    if level > depth {
        return Err(ImportError::RelativeBeyondTopLevel {
            level: u32::try_from(level).unwrap_or(u32::MAX),
            package: package.to_string(),
        });
    }

    let base = package
        .parts()
        .take(depth - level + 1)
        .collect::<Vec<_>>()
        .join(".");

    if name.is_empty() {
        ModuleName::parse(&base)
    } else {
        ModuleName::parse(&format!("{base}.{name}"))
    }
}
