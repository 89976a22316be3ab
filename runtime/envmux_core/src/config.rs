//! Startup configuration: the explicit import map.
//!
//! `import_map.json` lives in the runtime's install directory and maps
//! top-level module names to environment roots:
//!
//! ```text
//! {
//!   "bar": "/opt/app/envs/bar/lib/v1/site-modules",
//!   "baz": "/opt/app/envs/baz/lib/v1/site-modules"
//! }
//! ```
//!
//! The map is read once and never changes afterwards. A missing or malformed
//! file is fatal.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::de::{self, Deserialize, Deserializer, MapAccess, Visitor};

use crate::name::ModuleName;

/// File name of the import map inside the install directory.
pub const IMPORT_MAP_FILE: &str = "import_map.json";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("import map not found at '{}'", .path.display())]
    Missing { path: PathBuf },

    #[error("failed to read import map '{}': {source}", .path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed import map '{}': {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("import map '{}': '{name}' is not a top-level module name", .path.display())]
    InvalidName { path: PathBuf, name: String },

    #[error("import map '{}': root for '{name}' is not absolute: '{}'", .path.display(), .root.display())]
    RelativeRoot {
        path: PathBuf,
        name: String,
        root: PathBuf,
    },
}

/// Top-level module name → environment root.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ImportMap {
    entries: BTreeMap<String, PathBuf>,
}

impl ImportMap {
    /// Load `install_dir/import_map.json`.
    pub fn load(install_dir: &Path) -> Result<Self, ConfigError> {
        Self::load_file(&install_dir.join(IMPORT_MAP_FILE))
    }

    pub fn load_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                ConfigError::Missing {
                    path: path.to_path_buf(),
                }
            } else {
                ConfigError::Unreadable {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;
        Self::from_json(&text, path)
    }

    /// Parse map text. `path` is only used in errors.
    pub fn from_json(text: &str, path: &Path) -> Result<Self, ConfigError> {
        let UniqueEntries(entries) =
            serde_json::from_str(text).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        for (name, root) in &entries {
            let is_top_level = ModuleName::parse(name).is_ok_and(|n| n.is_top_level());
            if !is_top_level {
                return Err(ConfigError::InvalidName {
                    path: path.to_path_buf(),
                    name: name.clone(),
                });
            }
            if !root.is_absolute() {
                return Err(ConfigError::RelativeRoot {
                    path: path.to_path_buf(),
                    name: name.clone(),
                    root: root.clone(),
                });
            }
        }
        Ok(ImportMap { entries })
    }

    /// Build a map in code. Entries are not validated.
    pub fn from_entries<K, P>(entries: impl IntoIterator<Item = (K, P)>) -> Self
    where
        K: Into<String>,
        P: Into<PathBuf>,
    {
        ImportMap {
            entries: entries
                .into_iter()
                .map(|(k, p)| (k.into(), p.into()))
                .collect(),
        }
    }

    /// Environment root explicitly assigned to a top-level module.
    pub fn root_for(&self, top_level: &str) -> Option<&Path> {
        self.entries.get(top_level).map(PathBuf::as_path)
    }

    /// Entries in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Path)> {
        self.entries.iter().map(|(k, p)| (k.as_str(), p.as_path()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A JSON object whose keys must be unique.
struct UniqueEntries(BTreeMap<String, PathBuf>);

impl<'de> Deserialize<'de> for UniqueEntries {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(UniqueEntriesVisitor)
    }
}

struct UniqueEntriesVisitor;

impl<'de> Visitor<'de> for UniqueEntriesVisitor {
    type Value = UniqueEntries;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an object mapping module names to environment roots")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut entries = BTreeMap::new();
        while let Some((name, root)) = access.next_entry::<String, PathBuf>()? {
            if entries.contains_key(&name) {
                return Err(de::Error::custom(format_args!(
                    "duplicate module name '{name}'"
                )));
            }
            entries.insert(name, root);
        }
        Ok(UniqueEntries(entries))
    }
}
