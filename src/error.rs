//! Error types for the composition engine

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while driving a render
#[derive(Debug, Error)]
pub enum EngineError {
    /// A directive was invoked with no render context currently open
    #[error("no active render: {message}")]
    NoActiveRender { message: String },

    /// A close directive mismatched the open node, the tree finished with
    /// unclosed directives, or a context-dependent directive was used
    /// outside its required enclosing context
    #[error("invalid tree structure: {message}")]
    InvalidTreeStructure { message: String },

    /// The capture faculty was entered or exited out of order
    #[error("illegal capture action: {message}")]
    IllegalCaptureAction { message: String },

    /// A slot or use-slot name collided where uniqueness is required
    #[error("duplicate directive name '{name}': {message}")]
    DuplicateDirectiveName { name: String, message: String },

    /// The loader could not resolve a logical template-unit name
    #[error("template unit not found: '{name}' (checked {})", checked.join(", "))]
    TemplateUnitNotFound { name: String, checked: Vec<String> },

    /// A file-backed unit resolved but no handler accepts its content type
    #[error("no loader for unit: {}", path.display())]
    NoLoaderForUnit { path: PathBuf },

    /// A file-backed unit could not be read
    #[error("error reading template unit {}: {source}", path.display())]
    UnitRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl EngineError {
    /// Create a no-active-render error
    pub fn no_active_render(message: impl Into<String>) -> Self {
        Self::NoActiveRender {
            message: message.into(),
        }
    }

    /// Create an invalid tree structure error
    pub fn invalid_tree(message: impl Into<String>) -> Self {
        Self::InvalidTreeStructure {
            message: message.into(),
        }
    }

    /// Create an illegal capture action error
    pub fn illegal_capture(message: impl Into<String>) -> Self {
        Self::IllegalCaptureAction {
            message: message.into(),
        }
    }

    /// Create a duplicate directive name error
    pub fn duplicate_name(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::DuplicateDirectiveName {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Create a unit-not-found error listing every checked candidate
    pub fn unit_not_found(name: impl Into<String>, checked: Vec<String>) -> Self {
        Self::TemplateUnitNotFound {
            name: name.into(),
            checked,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_tree_display() {
        let err = EngineError::invalid_tree("component node was left open");
        assert_eq!(
            err.to_string(),
            "invalid tree structure: component node was left open"
        );
    }

    #[test]
    fn test_not_found_lists_candidates() {
        let err = EngineError::unit_not_found(
            "page",
            vec![
                "\"page\"".to_string(),
                "\"templates/page.html\"".to_string(),
            ],
        );
        let msg = err.to_string();
        assert!(msg.contains("'page'"));
        assert!(msg.contains("templates/page.html"));
    }

    #[test]
    fn test_duplicate_name_display() {
        let err = EngineError::duplicate_name("title", "every 'title' slot is already overridden");
        assert!(err.to_string().contains("duplicate directive name 'title'"));
    }
}
