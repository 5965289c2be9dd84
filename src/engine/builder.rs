//! Single-pass tree builder driven by an imperative trace of directive calls
//!
//! One mutable cursor tracks the currently open parent node; literal text is
//! intercepted by an explicit stack of string sinks (the capture faculty)
//! and flushed into raw-content nodes before any structural mutation.
//! Fragment sinks stack above the builder's own capture and must be closed
//! before the tree can change again.

use crate::engine::node::{NodeArena, NodeId, NodeKind, NodeTag};
use crate::engine::DefaultSlotPromotion;
use crate::error::EngineError;

#[derive(Debug)]
pub struct NodeTreeBuilder {
    arena: NodeArena,
    cursor: NodeId,
    sinks: Vec<String>,
    /// Sink-stack depth of the builder's own capture, when active
    level: Option<usize>,
}

impl NodeTreeBuilder {
    pub fn new(promotion: DefaultSlotPromotion) -> Self {
        let arena = NodeArena::new(promotion);
        let cursor = arena.root();
        Self {
            arena,
            cursor,
            sinks: Vec::new(),
            level: None,
        }
    }

    /// The currently open parent node
    pub fn cursor(&self) -> NodeId {
        self.cursor
    }

    pub fn arena(&self) -> &NodeArena {
        &self.arena
    }

    pub fn is_capturing(&self) -> bool {
        self.level.is_some()
    }

    /// Current nesting depth of the capture faculty (fragments included)
    pub fn capture_depth(&self) -> usize {
        self.sinks.len()
    }

    /// Begins intercepting literal text; idempotent while already active
    pub fn start_capture(&mut self) {
        if self.level.is_none() {
            self.sinks.push(String::new());
            self.level = Some(self.sinks.len());
        }
    }

    /// Flushes pending literal text and stops intercepting
    ///
    /// Unforced calls fail if a fragment was left open past this boundary;
    /// `force` unwinds best-effort, deepest sink first.
    pub fn stop_capture(&mut self, force: bool) -> Result<(), EngineError> {
        let level = match self.level {
            Some(level) => level,
            None => return Ok(()),
        };

        if !force && self.sinks.len() > level {
            return Err(EngineError::illegal_capture(
                "a fragment capture was left open past the builder's boundary",
            ));
        }

        while self.sinks.len() > level {
            self.sinks.pop();
        }
        let pending = self.sinks.pop().unwrap_or_default();
        self.level = None;
        if !pending.is_empty() {
            self.arena
                .attach(self.cursor, NodeKind::RawContent { content: pending })?;
        }
        Ok(())
    }

    /// Runs `f` with capturing guaranteed active, restoring the prior
    /// capture state afterward
    pub fn capture(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<(), EngineError>,
    ) -> Result<(), EngineError> {
        let was_closed = !self.is_capturing();
        if was_closed {
            self.start_capture();
        }
        f(self)?;
        if was_closed {
            self.stop_capture(false)?;
        }
        Ok(())
    }

    /// Appends literal text to the innermost active sink
    pub fn write(&mut self, text: &str) -> Result<(), EngineError> {
        match self.sinks.last_mut() {
            Some(sink) => {
                sink.push_str(text);
                Ok(())
            }
            None => Err(EngineError::illegal_capture(
                "no active capture to write literal content to",
            )),
        }
    }

    /// Opens a fragment sink above the builder's own capture
    pub fn begin_fragment(&mut self) -> Result<(), EngineError> {
        if self.level.is_none() {
            return Err(EngineError::illegal_capture(
                "cannot open a fragment outside an active capture",
            ));
        }
        self.sinks.push(String::new());
        Ok(())
    }

    /// Closes the innermost fragment sink and returns its content
    pub fn end_fragment(&mut self) -> Result<String, EngineError> {
        let open = self
            .level
            .map(|level| self.sinks.len() > level)
            .unwrap_or(false);
        if !open {
            return Err(EngineError::illegal_capture("no open fragment to close"));
        }
        Ok(self.sinks.pop().expect("fragment sink exists"))
    }

    /// Attaches a node under the cursor; parent-kind nodes take the cursor
    pub fn add_node(&mut self, kind: NodeKind) -> Result<NodeId, EngineError> {
        self.ensure_no_open_fragment()?;
        self.flush_pending();
        let id = self.arena.attach(self.cursor, kind)?;
        if NodeArena::is_parent_tag(self.arena.tag(id)) {
            self.cursor = id;
        }
        Ok(id)
    }

    /// Closes the cursor node, which must be exactly `expect`
    pub fn exit_node(&mut self, expect: NodeId) -> Result<(), EngineError> {
        if self.cursor != expect {
            return Err(EngineError::invalid_tree(format!(
                "cannot end {} node, {} node was left open",
                self.arena.tag(expect),
                self.arena.tag(self.cursor)
            )));
        }
        self.do_exit()
    }

    /// Closes the cursor node, which must be of kind `expect`
    pub fn exit_kind(&mut self, expect: NodeTag) -> Result<(), EngineError> {
        if self.arena.tag(self.cursor) != expect {
            return Err(EngineError::invalid_tree(format!(
                "cannot end {} node, {} node was left open",
                expect,
                self.arena.tag(self.cursor)
            )));
        }
        self.do_exit()
    }

    fn do_exit(&mut self) -> Result<(), EngineError> {
        self.ensure_no_open_fragment()?;
        self.flush_pending();
        self.arena.on_close(self.cursor);
        let mut parent = self
            .arena
            .parent(self.cursor)
            .ok_or_else(|| EngineError::invalid_tree("the root node cannot be ended"))?;
        // The cursor never rests on the implicit default use-slot; content
        // is routed into it, so ascend through it to the use-component
        if matches!(
            self.arena.kind(parent),
            NodeKind::UseSlot { implicit: true, .. }
        ) {
            parent = self.arena.parent(parent).expect("use-slot has a parent");
        }
        self.cursor = parent;
        Ok(())
    }

    /// Finishes the build; valid only when the cursor returned to the root
    pub fn build_tree(&mut self) -> Result<NodeId, EngineError> {
        if self.is_capturing() {
            self.stop_capture(false)?;
        }
        if self.cursor != self.arena.root() {
            return Err(EngineError::invalid_tree(format!(
                "{} node was left open",
                self.arena.tag(self.cursor)
            )));
        }
        Ok(self.arena.root())
    }

    /// Surrenders the finished tree for rendering
    pub fn into_arena(self) -> NodeArena {
        self.arena
    }

    /// Failure cleanup: force-closes every pending sink, deepest first
    pub fn force_unwind(&mut self) {
        let _ = self.stop_capture(true);
    }

    fn ensure_no_open_fragment(&self) -> Result<(), EngineError> {
        let open = self
            .level
            .map(|level| self.sinks.len() > level)
            .unwrap_or(false);
        if open {
            return Err(EngineError::illegal_capture(
                "cannot modify the tree while a fragment capture is open",
            ));
        }
        Ok(())
    }

    /// Moves pending literal text into a raw-content child of the cursor
    fn flush_pending(&mut self) {
        if let Some(level) = self.level {
            let content = std::mem::take(&mut self.sinks[level - 1]);
            if !content.is_empty() {
                self.arena
                    .attach(self.cursor, NodeKind::RawContent { content })
                    .expect("raw content is attachable anywhere");
            }
        }
    }
}
