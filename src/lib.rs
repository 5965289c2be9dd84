//! slotweave: server-side content composition with components and slots
//!
//! Templates are plain Rust closures (or files on a search path) that
//! emit text and call composition directives on a [`RenderContext`].
//! A component declares named slots; a call site overrides them with
//! use-slots, and content written directly at the call site becomes the
//! override for the `default` slot. An override can splice the slot's
//! original content back in with `parent_slot`.
//!
//! Rendering is two-phase: directive calls build a node tree in a
//! single pass, then the tree is rendered to a string with every slot
//! resolved to its override or its fallback content.
//!
//! # Example
//!
//! ```
//! use slotweave::{params, Engine};
//!
//! let engine = Engine::new()
//!     .with_template("card", |ctx, params| {
//!         ctx.write("<div class=\"card\"><h2>")?;
//!         ctx.text(params.get("title").cloned().unwrap_or_default())?;
//!         ctx.write("</h2>")?;
//!         let slot = ctx.slot("body", Default::default())?;
//!         ctx.write("no content")?;
//!         slot.end(ctx)?;
//!         ctx.write("</div>")
//!     })
//!     .with_template("page", |ctx, _params| {
//!         let card = ctx.component("card", params! { "title" => "Hi" })?;
//!         let body = ctx.use_slot("body")?;
//!         ctx.write("<p>Hello!</p>")?;
//!         body.end(ctx)?;
//!         card.end(ctx)
//!     });
//!
//! let html = engine.render("page", Default::default())?;
//! assert_eq!(
//!     html,
//!     "<div class=\"card\"><h2>Hi</h2><p>Hello!</p></div>"
//! );
//! # Ok::<(), slotweave::EngineError>(())
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod escape;
pub mod template;
pub mod value;

use std::path::PathBuf;
use std::sync::Arc;

pub use config::{ConfigError, EngineConfig};
pub use engine::{
    ComponentHandle, DefaultSlotPromotion, RenderContext, RepeatSlots, SlotHandle, UseSlotHandle,
};
pub use error::EngineError;
pub use template::{FileHandler, RawFileHandler, TemplateStore};
pub use value::{Bindings, Params, Value};

/// Entry point: holds the template store, global params and policy
/// knobs, and spawns a fresh render context per render call
pub struct Engine {
    store: TemplateStore,
    global_params: Params,
    promotion: DefaultSlotPromotion,
}

impl Engine {
    /// Creates an engine with no templates and default policies
    pub fn new() -> Self {
        Self {
            store: TemplateStore::new(),
            global_params: Params::new(),
            promotion: DefaultSlotPromotion::default(),
        }
    }

    /// Creates an engine pre-seeded from a parsed configuration
    pub fn from_config(config: &EngineConfig) -> Self {
        let mut engine = Self::new();
        for directory in &config.directories {
            engine.store.add_directory(directory);
        }
        for (alias, target) in &config.aliases {
            engine.store.set_alias(alias, target);
        }
        engine.global_params = config.params();
        engine.promotion = config.default_slot_promotion;
        engine
    }

    /// Registers a template unit under a logical name
    pub fn with_template(
        mut self,
        name: impl Into<String>,
        unit: impl Fn(&mut RenderContext<'_>, &Params) -> Result<(), EngineError>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        self.store.register(name, unit);
        self
    }

    /// Maps an alias to another template name
    pub fn with_alias(mut self, alias: impl Into<String>, target: impl Into<String>) -> Self {
        self.store.set_alias(alias, target);
        self
    }

    /// Adds a search directory for file-backed templates
    pub fn with_directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.store.add_directory(directory);
        self
    }

    /// Sets a param visible to every component call
    pub fn with_global_param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.global_params.insert(name.into(), value.into());
        self
    }

    /// Registers a file handler for an extension
    pub fn with_file_handler(
        mut self,
        extension: impl Into<String>,
        handler: Arc<dyn FileHandler>,
    ) -> Self {
        self.store.set_handler(extension, handler);
        self
    }

    /// Sets when call-site content is promoted to the default slot
    pub fn with_promotion(mut self, promotion: DefaultSlotPromotion) -> Self {
        self.promotion = promotion;
        self
    }

    /// Renders a template unit to a string
    pub fn render(&self, name: &str, params: Params) -> Result<String, EngineError> {
        let mut ctx = RenderContext::new(&self.store, &self.global_params, self.promotion);
        ctx.render(name, params)
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}
