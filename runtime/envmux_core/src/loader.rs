//! Name-to-module resolution and unit execution.
//!
//! This is the machinery the interceptor delegates to. It never decides an
//! environment itself: whatever state is live when it runs is where modules
//! are looked up and published. Requests that reach it without going through
//! [`Runtime::import`] are seen only by the resolution-chain probe.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::cache::ModuleRef;
use crate::caller::Frame;
use crate::error::{ImportError, ImportResult};
use crate::finder::{FindRequest, ModuleSpec};
use crate::interceptor::ImportRequest;
use crate::module::{Module, ModuleOrigin, Value};
use crate::name::ModuleName;
use crate::runtime::Runtime;
use crate::source::{parse_unit, Statement, UnitSource};
use crate::stack::ensure_sufficient_stack;

impl Runtime {
    /// Load `name` through the resolution machinery directly, bypassing the
    /// interceptor.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn import_module(&mut self, name: &str) -> ImportResult<ModuleRef> {
        let name = ModuleName::parse(name)?;
        self.find_and_load(&name)
    }

    /// Ask the finder chain for a spec, without loading anything.
    pub fn find_spec(
        &mut self,
        name: &ModuleName,
        search_locations: Option<&[PathBuf]>,
    ) -> ImportResult<Option<ModuleSpec>> {
        self.find_spec_from(0, name, search_locations)
    }

    /// Run the finder chain starting at index `start`.
    pub(crate) fn find_spec_from(
        &mut self,
        start: usize,
        name: &ModuleName,
        search_locations: Option<&[PathBuf]>,
    ) -> ImportResult<Option<ModuleSpec>> {
        let finders = self.finders.clone();
        for (position, finder) in finders.iter().enumerate().skip(start) {
            let request = FindRequest {
                name,
                search_locations,
                position,
            };
            if let Some(spec) = finder.find_spec(self, &request)? {
                return Ok(Some(spec));
            }
        }
        Ok(None)
    }

    /// Return `name` from the live table, or find, create and execute it.
    ///
    /// Parent packages are loaded first and the new module is bound into its
    /// parent under its leaf name.
    pub(crate) fn find_and_load(&mut self, name: &ModuleName) -> ImportResult<ModuleRef> {
        ensure_sufficient_stack(|| {
            if let Some(module) = self.cache.table().get(name.as_str()) {
                return Ok(module);
            }

            let parent = match name.parent() {
                Some(parent_name) => {
                    let parent = self.find_and_load(&parent_name)?;
                    // Loading the parent may have loaded us as a side effect.
                    if let Some(module) = self.cache.table().get(name.as_str()) {
                        return Ok(module);
                    }
                    if !parent.is_package() {
                        return Err(ImportError::NotAPackage {
                            name: name.clone(),
                            parent: parent_name,
                        });
                    }
                    Some(parent)
                }
                None => None,
            };

            let locations = parent
                .as_ref()
                .and_then(|p| p.search_locations().map(<[_]>::to_vec));
            let Some(spec) = self.find_spec(name, locations.as_deref())? else {
                return Err(ImportError::NotFound { name: name.clone() });
            };

            let module = self.load_spec(&spec)?;
            if let Some(parent) = parent {
                parent.set_attr(name.leaf(), Value::Module(Arc::clone(&module)));
            }
            Ok(module)
        })
    }

    /// Create the module described by `spec`, publish it and run its body.
    ///
    /// The module is visible in the table while its body executes; if the
    /// body fails it is removed again.
    fn load_spec(&mut self, spec: &ModuleSpec) -> ImportResult<ModuleRef> {
        let module = Arc::new(Module::from_spec(spec, self.cache.active()));
        tracing::debug!(
            name = %spec.name,
            origin = %spec.origin,
            finder = spec.finder,
            env = ?self.cache.active(),
            "loading module"
        );

        match &spec.origin {
            ModuleOrigin::Builtin => {
                if let Some(attrs) = self.builtin_attrs(&spec.name) {
                    for (key, value) in attrs {
                        module.set_attr(key, Value::Str(Arc::clone(value)));
                    }
                }
                self.cache.table().insert(spec.name.clone(), Arc::clone(&module));
            }
            ModuleOrigin::File(path) => {
                let unit = read_unit(path)?;
                self.cache.table().insert(spec.name.clone(), Arc::clone(&module));
                if let Err(error) = self.exec_unit(&module, &unit, Frame::file(path.clone())) {
                    self.cache.table().remove(spec.name.as_str());
                    return Err(error);
                }
            }
            ModuleOrigin::Synthetic(_) => {
                self.cache.table().insert(spec.name.clone(), Arc::clone(&module));
            }
        }
        Ok(module)
    }

    /// Execute a unit file as a main module.
    ///
    /// The module is named after the file stem and is not published to the
    /// module table. Its file is the caller frame for everything it loads.
    #[tracing::instrument(level = "debug", skip(self), fields(path = %path.display()))]
    pub fn run_path(&mut self, path: &Path) -> ImportResult<ModuleRef> {
        let stem = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .ok_or_else(|| ImportError::InvalidName(path.display().to_string()))?;
        let name = ModuleName::parse(stem)?;
        let unit = read_unit(path)?;

        let module = Arc::new(Module::new(
            name,
            ModuleOrigin::File(path.to_path_buf()),
            None,
            self.cache.active(),
        ));
        self.exec_unit(&module, &unit, Frame::file(path))?;
        Ok(module)
    }

    /// Execute source text with no file location.
    ///
    /// Caller inference cannot see synthetic code, so its loads resolve
    /// from the environment of the enclosing frames (the host, at top level).
    pub fn run_source(&mut self, name: &str, text: &str) -> ImportResult<ModuleRef> {
        let name = ModuleName::parse(name)?;
        let label = format!("<{name}>");
        let unit = parse_unit(text, Path::new(&label))?;

        let module = Arc::new(Module::new(
            name.clone(),
            ModuleOrigin::Synthetic(Arc::from(name.as_str())),
            None,
            self.cache.active(),
        ));
        self.exec_unit(&module, &unit, Frame::synthetic(name.as_str()))?;
        Ok(module)
    }

    fn exec_unit(&mut self, module: &ModuleRef, unit: &UnitSource, frame: Frame) -> ImportResult<()> {
        self.with_frame(frame, |rt| {
            unit.lines()
                .iter()
                .try_for_each(|line| rt.exec_statement(module, &line.statement))
        })
    }

    fn exec_statement(&mut self, module: &ModuleRef, statement: &Statement) -> ImportResult<()> {
        match statement {
            Statement::Let { name, value } => {
                module.set_attr(name, Value::Str(Arc::clone(value)));
            }
            Statement::Fail { message } => {
                return Err(ImportError::Failed {
                    name: module.name().clone(),
                    message: message.to_string(),
                });
            }
            Statement::Use { target, alias } => {
                let request =
                    ImportRequest::new(target.name.clone()).relative(target.level, module.package());
                let imported = self.import(request)?;
                let (binding, value) = match alias {
                    Some(alias) => (alias.to_string(), imported.module),
                    None if target.is_relative() => {
                        (imported.module.name().leaf().to_string(), imported.module)
                    }
                    None => (
                        imported.top_level.name().as_str().to_string(),
                        imported.top_level,
                    ),
                };
                module.set_attr(&binding, Value::Module(value));
            }
            Statement::From { target, items } => {
                let request =
                    ImportRequest::new(target.name.clone()).relative(target.level, module.package());
                let source = self.import(request)?.module;
                for (item, alias) in items {
                    let value = self.from_item(&source, item)?;
                    module.set_attr(alias.as_deref().unwrap_or(&**item), value);
                }
            }
        }
        Ok(())
    }

    /// `item` of `source`: an attribute, else a submodule of a package.
    fn from_item(&mut self, source: &ModuleRef, item: &str) -> ImportResult<Value> {
        if let Some(value) = source.get_attr(item) {
            return Ok(value);
        }
        let missing = || ImportError::MissingAttribute {
            module: source.name().clone(),
            attr: item.to_string(),
        };
        if !source.is_package() {
            return Err(missing());
        }

        let request = ImportRequest::new(item).relative(1, Some(source.name().clone()));
        match self.import(request) {
            Ok(imported) => Ok(Value::Module(imported.module)),
            Err(error) if error.is_not_found() => Err(missing()),
            Err(error) => Err(error),
        }
    }
}

fn read_unit(path: &Path) -> ImportResult<UnitSource> {
    let text = fs::read_to_string(path).map_err(|source| ImportError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_unit(&text, path)
}
