//! Template-unit storage and resolution
//!
//! A template unit is a callable content producer: either a closure
//! registered on the store, or a file found on the search path and
//! dispatched to a [`FileHandler`] by content type. Logical names go
//! through alias and directory resolution before execution.

mod handlers;
mod resolver;

pub use handlers::{FileHandler, RawFileHandler};

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::engine::RenderContext;
use crate::error::EngineError;
use crate::value::Params;

/// A registered template unit: emits literal text and directive calls
/// through the render context it is handed
pub type UnitFn =
    dyn Fn(&mut RenderContext<'_>, &Params) -> Result<(), EngineError> + Send + Sync;

/// Stores registered units, aliases, search directories and file handlers
pub struct TemplateStore {
    units: HashMap<String, Arc<UnitFn>>,
    aliases: HashMap<String, String>,
    directories: Vec<PathBuf>,
    handlers: Vec<(String, Arc<dyn FileHandler>)>,
}

impl TemplateStore {
    /// Creates a store with the built-in raw-text handlers for `.html`
    /// and `.txt`
    pub fn new() -> Self {
        Self {
            units: HashMap::new(),
            aliases: HashMap::new(),
            directories: Vec::new(),
            handlers: vec![
                ("html".to_string(), Arc::new(RawFileHandler) as Arc<dyn FileHandler>),
                ("txt".to_string(), Arc::new(RawFileHandler) as Arc<dyn FileHandler>),
            ],
        }
    }

    /// Registers a unit under a logical name, replacing any previous one
    pub fn register(
        &mut self,
        name: impl Into<String>,
        unit: impl Fn(&mut RenderContext<'_>, &Params) -> Result<(), EngineError>
            + Send
            + Sync
            + 'static,
    ) {
        self.units.insert(name.into(), Arc::new(unit));
    }

    /// Maps an alias to another logical name
    pub fn set_alias(&mut self, alias: impl Into<String>, target: impl Into<String>) {
        self.aliases.insert(alias.into(), target.into());
    }

    /// Adds a search directory for file-backed units
    pub fn add_directory(&mut self, directory: impl Into<PathBuf>) {
        let directory = directory.into();
        if !self.directories.contains(&directory) {
            self.directories.push(directory);
        }
    }

    /// Registers a handler for a file extension, replacing any previous one
    pub fn set_handler(&mut self, extension: impl Into<String>, handler: Arc<dyn FileHandler>) {
        let extension = extension.into();
        self.handlers.retain(|(ext, _)| *ext != extension);
        self.handlers.push((extension, handler));
    }

    pub(crate) fn handler_extensions(&self) -> impl Iterator<Item = &str> {
        self.handlers.iter().map(|(ext, _)| ext.as_str())
    }

    pub(crate) fn directories(&self) -> &[PathBuf] {
        &self.directories
    }

    pub(crate) fn registered(&self, name: &str) -> Option<Arc<UnitFn>> {
        self.units.get(name).cloned()
    }

    pub(crate) fn alias_target(&self, name: &str) -> Option<&str> {
        self.aliases.get(name).map(|s| s.as_str())
    }

    /// Picks the handler accepting a resolved file's extension
    pub(crate) fn handler_for(&self, path: &Path) -> Result<Arc<dyn FileHandler>, EngineError> {
        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        self.handlers
            .iter()
            .find(|(ext, _)| ext == extension)
            .map(|(_, handler)| handler.clone())
            .ok_or_else(|| EngineError::NoLoaderForUnit {
                path: path.to_path_buf(),
            })
    }

    /// Resolves a logical name to an executable unit
    pub fn resolve(&self, name: &str) -> Result<ResolvedUnit, EngineError> {
        resolver::resolve(self, name)
    }
}

impl Default for TemplateStore {
    fn default() -> Self {
        Self::new()
    }
}

/// A unit ready to execute against a render context
pub enum ResolvedUnit {
    /// Closure registered on the store
    Registered(Arc<UnitFn>),
    /// File on the search path with its content-type handler
    File {
        path: PathBuf,
        handler: Arc<dyn FileHandler>,
    },
}

impl ResolvedUnit {
    /// Runs the unit; its output and directives flow through the context
    pub fn execute(
        &self,
        ctx: &mut RenderContext<'_>,
        params: &Params,
    ) -> Result<(), EngineError> {
        match self {
            ResolvedUnit::Registered(unit) => unit(ctx, params),
            ResolvedUnit::File { path, handler } => handler.execute(path, ctx, params),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_resolve_unit() {
        let mut store = TemplateStore::new();
        store.register("page", |_ctx, _params| Ok(()));
        assert!(matches!(
            store.resolve("page").unwrap(),
            ResolvedUnit::Registered(_)
        ));
    }

    #[test]
    fn test_alias_resolves_to_target() {
        let mut store = TemplateStore::new();
        store.register("page_component", |_ctx, _params| Ok(()));
        store.set_alias("page", "page_component");
        assert!(matches!(
            store.resolve("page").unwrap(),
            ResolvedUnit::Registered(_)
        ));
    }

    #[test]
    fn test_unknown_name_reports_checked_candidates() {
        let mut store = TemplateStore::new();
        store.add_directory("templates");
        match store.resolve("missing") {
            Err(EngineError::TemplateUnitNotFound { name, checked }) => {
                assert_eq!(name, "missing");
                assert!(checked.iter().any(|c| c.contains("missing")));
                assert!(checked.iter().any(|c| c.contains("templates")));
            }
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("resolution should fail"),
        }
    }

    #[test]
    fn test_handler_dispatch_by_extension() {
        let store = TemplateStore::new();
        assert!(store.handler_for(Path::new("a/page.html")).is_ok());
        assert!(matches!(
            store.handler_for(Path::new("a/page.bin")),
            Err(EngineError::NoLoaderForUnit { .. })
        ));
    }

    #[test]
    fn test_duplicate_directories_are_deduplicated() {
        let mut store = TemplateStore::new();
        store.add_directory("t");
        store.add_directory("t");
        assert_eq!(store.directories().len(), 1);
    }
}
