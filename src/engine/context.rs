//! Render context: the directive surface that drives one tree end to end
//!
//! A context owns at most one [`NodeTreeBuilder`] at a time. `render` opens
//! the tree, executes the named template unit as root content, requires the
//! cursor back at the root, and renders the finished tree. Any failure
//! force-closes every pending capture, deepest first, and truncates the
//! bindings scope stack to its pre-render depth before propagating.

use crate::engine::builder::NodeTreeBuilder;
use crate::engine::node::{DefaultSlotPromotion, NodeId, NodeKind, NodeTag, DEFAULT_SLOT};
use crate::error::EngineError;
use crate::template::TemplateStore;
use crate::value::{merge_params, Bindings, Params, Value};

/// Drives one render at a time against a template store
pub struct RenderContext<'e> {
    store: &'e TemplateStore,
    global_params: &'e Params,
    promotion: DefaultSlotPromotion,
    builder: Option<NodeTreeBuilder>,
    bindings_stack: Vec<Bindings>,
}

/// Closes the component directive that produced it
#[derive(Debug)]
#[must_use = "an unclosed component leaves the tree invalid"]
pub struct ComponentHandle {
    node: NodeId,
}

impl ComponentHandle {
    /// Equivalent to calling `component_end` at the matching point
    pub fn end(self, ctx: &mut RenderContext) -> Result<(), EngineError> {
        ctx.builder_mut()?.exit_node(self.node)
    }
}

/// Closes the slot declaration that produced it
#[derive(Debug)]
#[must_use = "an unclosed slot leaves the tree invalid"]
pub struct SlotHandle {
    node: NodeId,
}

impl SlotHandle {
    /// Equivalent to calling `slot_end` at the matching point
    pub fn end(self, ctx: &mut RenderContext) -> Result<(), EngineError> {
        ctx.builder_mut()?.exit_node(self.node)
    }
}

/// Closes the use-slot that produced it and carries the matched slot's
/// bindings, valid until the matching end
#[derive(Debug)]
#[must_use = "an unclosed use-slot leaves the tree invalid"]
pub struct UseSlotHandle {
    node: NodeId,
    bindings: Bindings,
}

impl UseSlotHandle {
    /// Contextual data exposed by the slot this use-slot overrides
    pub fn bindings(&self) -> &Bindings {
        &self.bindings
    }

    /// Equivalent to calling `use_slot_end` at the matching point
    pub fn end(self, ctx: &mut RenderContext) -> Result<(), EngineError> {
        ctx.end_use_slot_node(self.node)
    }
}

impl<'e> RenderContext<'e> {
    pub fn new(
        store: &'e TemplateStore,
        global_params: &'e Params,
        promotion: DefaultSlotPromotion,
    ) -> Self {
        Self {
            store,
            global_params,
            promotion,
            builder: None,
            bindings_stack: Vec::new(),
        }
    }

    /// Renders a template unit to its final output string
    ///
    /// Entry point of one render; non-reentrant per context.
    pub fn render(&mut self, name: &str, params: Params) -> Result<String, EngineError> {
        if self.builder.is_some() {
            return Err(EngineError::no_active_render(
                "a render is already active on this context",
            ));
        }
        self.builder = Some(NodeTreeBuilder::new(self.promotion));
        let scope_depth = self.bindings_stack.len();

        let result = self.render_tree(name, params);
        if result.is_err() {
            if let Some(builder) = self.builder.as_mut() {
                builder.force_unwind();
            }
            self.builder = None;
            self.bindings_stack.truncate(scope_depth);
        }
        result
    }

    fn render_tree(&mut self, name: &str, params: Params) -> Result<String, EngineError> {
        self.builder_mut()?.start_capture();
        let handle = self.component(name, params)?;
        handle.end(self)?;

        let builder = self.builder.as_mut().expect("render owns a builder");
        let root = builder.build_tree()?;
        let arena = self
            .builder
            .take()
            .expect("render owns a builder")
            .into_arena();
        Ok(arena.render(root))
    }

    /// Opens a component: runs the named unit as the declaration, then opens
    /// the call-site customization context around it
    pub fn component(&mut self, name: &str, params: Params) -> Result<ComponentHandle, EngineError> {
        self.builder_mut()?;
        let unit = self.store.resolve(name)?;
        let merged = merge_params(self.global_params, &params);

        let builder = self.builder_mut()?;
        let comp = builder.add_node(NodeKind::Component { slots: Vec::new() })?;
        let was_closed = !builder.is_capturing();
        if was_closed {
            builder.start_capture();
        }
        unit.execute(self, &merged)?;
        let builder = self.builder_mut()?;
        if was_closed {
            builder.stop_capture(false)?;
        }
        builder.exit_node(comp)?;

        let node = builder.add_node(NodeKind::UseComponent {
            component: comp,
            default_use_slot: None,
        })?;
        Ok(ComponentHandle { node })
    }

    /// Closes the innermost open component
    pub fn component_end(&mut self) -> Result<(), EngineError> {
        self.builder_mut()?.exit_kind(NodeTag::UseComponent)
    }

    /// Declares a named extension point with default content
    pub fn slot(&mut self, name: &str, bindings: Bindings) -> Result<SlotHandle, EngineError> {
        let node = self.builder_mut()?.add_node(NodeKind::Slot {
            name: name.to_string(),
            bindings,
            assigned: None,
        })?;
        Ok(SlotHandle { node })
    }

    /// Closes the innermost open slot declaration
    pub fn slot_end(&mut self) -> Result<(), EngineError> {
        self.builder_mut()?.exit_kind(NodeTag::Slot)
    }

    /// Opens an override for the next unmatched slot of `name`
    ///
    /// The returned handle carries the matched slot's bindings; they are
    /// also the innermost scope reported by [`bindings`](Self::bindings)
    /// until the matching end.
    pub fn use_slot(&mut self, name: &str) -> Result<UseSlotHandle, EngineError> {
        let builder = self.builder_mut()?;
        let node = builder.add_node(NodeKind::UseSlot {
            slot_name: name.to_string(),
            matched: None,
            implicit: false,
        })?;
        let bindings = builder.arena().matched_bindings(node);
        self.bindings_stack.push(bindings.clone());
        Ok(UseSlotHandle { node, bindings })
    }

    /// Convenience for overriding the component's default slot
    pub fn use_default_slot(&mut self) -> Result<UseSlotHandle, EngineError> {
        self.use_slot(DEFAULT_SLOT)
    }

    /// Closes the innermost open use-slot, restoring the prior bindings scope
    pub fn use_slot_end(&mut self) -> Result<(), EngineError> {
        self.builder_mut()?.exit_kind(NodeTag::UseSlot)?;
        self.bindings_stack.pop();
        Ok(())
    }

    /// Emits the original (pre-override) content of the enclosing use-slot's
    /// slot, inline
    pub fn parent_slot(&mut self) -> Result<(), EngineError> {
        self.builder_mut()?
            .add_node(NodeKind::ParentSlot { use_slot: None })?;
        Ok(())
    }

    /// True while the enclosing component still has at least one unmatched
    /// slot of `name`; false outside any component call site
    pub fn has_slot(&self, name: &str) -> Result<bool, EngineError> {
        let builder = self.builder_ref()?;
        let arena = builder.arena();
        let component = arena
            .enclosing_use_component(builder.cursor())
            .and_then(|use_comp| match arena.kind(use_comp) {
                NodeKind::UseComponent { component, .. } => Some(*component),
                _ => None,
            });
        Ok(component
            .map(|comp| arena.next_unassigned_slot(comp, name).is_some())
            .unwrap_or(false))
    }

    /// Opens a lazy, non-restartable pass over the remaining unmatched
    /// slots of `name`, one use-slot per step
    pub fn use_repeat_slots(&mut self, name: &str) -> Result<RepeatSlots, EngineError> {
        self.builder_ref()?;
        Ok(RepeatSlots {
            name: name.to_string(),
            open: None,
            done: false,
        })
    }

    /// The innermost active use-slot's bindings; empty outside any use-slot
    pub fn bindings(&self) -> Bindings {
        self.bindings_stack.last().cloned().unwrap_or_default()
    }

    /// Emits literal text into the tree under construction
    pub fn write(&mut self, text: &str) -> Result<(), EngineError> {
        self.builder_mut()?.write(text)
    }

    /// Emits a value HTML-escaped; non-scalar values emit nothing
    pub fn text(&mut self, value: impl Into<Value>) -> Result<(), EngineError> {
        let builder = self.builder_mut()?;
        let node = builder.add_node(NodeKind::Text {
            value: value.into(),
        })?;
        builder.exit_node(node)
    }

    /// Starts capturing emitted text into a detached fragment
    pub fn begin_fragment(&mut self) -> Result<(), EngineError> {
        self.builder_mut()?.begin_fragment()
    }

    /// Stops the innermost fragment capture and returns its content
    pub fn end_fragment(&mut self) -> Result<String, EngineError> {
        self.builder_mut()?.end_fragment()
    }

    fn builder_mut(&mut self) -> Result<&mut NodeTreeBuilder, EngineError> {
        self.builder
            .as_mut()
            .ok_or_else(|| EngineError::no_active_render("no render is currently open"))
    }

    fn builder_ref(&self) -> Result<&NodeTreeBuilder, EngineError> {
        self.builder
            .as_ref()
            .ok_or_else(|| EngineError::no_active_render("no render is currently open"))
    }

    fn end_use_slot_node(&mut self, node: NodeId) -> Result<(), EngineError> {
        self.builder_mut()?.exit_node(node)?;
        self.bindings_stack.pop();
        Ok(())
    }
}

/// Lazy iteration over a component's remaining unmatched slots of one name
///
/// Each step opens one use-slot against the next unmatched slot in
/// declaration order and yields its bindings; the previous step is closed
/// before the next opens. Exhaustion closes the final step automatically;
/// terminating early requires an explicit [`close`](Self::close).
#[derive(Debug)]
pub struct RepeatSlots {
    name: String,
    open: Option<NodeId>,
    done: bool,
}

impl RepeatSlots {
    /// Closes the previous step and opens the next, yielding its bindings
    pub fn next(&mut self, ctx: &mut RenderContext) -> Result<Option<Bindings>, EngineError> {
        self.close(ctx)?;
        if self.done {
            return Ok(None);
        }
        if !ctx.has_slot(&self.name)? {
            self.done = true;
            return Ok(None);
        }
        let handle = ctx.use_slot(&self.name)?;
        self.open = Some(handle.node);
        let bindings = handle.bindings;
        Ok(Some(bindings))
    }

    /// Closes the currently open step, if any; idempotent
    pub fn close(&mut self, ctx: &mut RenderContext) -> Result<(), EngineError> {
        if let Some(node) = self.open.take() {
            ctx.end_use_slot_node(node)?;
        }
        Ok(())
    }
}
