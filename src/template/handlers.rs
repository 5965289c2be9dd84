//! File handlers for file-backed template units

use std::fs;
use std::path::Path;

use crate::engine::RenderContext;
use crate::error::EngineError;
use crate::value::Params;

/// Turns a file on the search path into rendered content
pub trait FileHandler: Send + Sync {
    fn execute(
        &self,
        path: &Path,
        ctx: &mut RenderContext<'_>,
        params: &Params,
    ) -> Result<(), EngineError>;
}

/// Emits the file's bytes verbatim, without escaping
pub struct RawFileHandler;

impl FileHandler for RawFileHandler {
    fn execute(
        &self,
        path: &Path,
        ctx: &mut RenderContext<'_>,
        _params: &Params,
    ) -> Result<(), EngineError> {
        let content = fs::read_to_string(path).map_err(|source| EngineError::UnitRead {
            path: path.to_path_buf(),
            source,
        })?;
        ctx.write(&content)
    }
}
