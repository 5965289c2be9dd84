//! Arena-backed node tree and the recursive render algorithm
//!
//! Nodes live in a single `Vec`; parents, children and all cross-links
//! (component to use-component, slot to use-slot, parent-slot to use-slot)
//! are indices, so the logical back-references of the model never become
//! ownership cycles. A finished tree is immutable: rendering walks it
//! post-order and resolves slot overrides through the links recorded while
//! the tree was built.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::escape;
use crate::value::{Bindings, Value};

/// Name used for the slot a component exposes by default
pub const DEFAULT_SLOT: &str = "default";

/// Index of a node inside its arena
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeId(usize);

/// Discriminant of a node kind, used for structural expectations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeTag {
    Root,
    RawContent,
    Text,
    Component,
    UseComponent,
    Slot,
    UseSlot,
    ParentSlot,
}

impl fmt::Display for NodeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NodeTag::Root => "root",
            NodeTag::RawContent => "raw-content",
            NodeTag::Text => "text",
            NodeTag::Component => "component",
            NodeTag::UseComponent => "use-component",
            NodeTag::Slot => "slot",
            NodeTag::UseSlot => "use-slot",
            NodeTag::ParentSlot => "parent-slot",
        };
        f.write_str(name)
    }
}

/// Controls when the implicit default use-slot becomes a real override
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DefaultSlotPromotion {
    /// Promote only if the captured call-site content contains something
    /// other than whitespace (any non-raw child counts)
    #[default]
    NonBlank,
    /// Promote whenever a default slot is still unassigned
    Always,
}

/// Node payload
#[derive(Debug)]
pub enum NodeKind {
    Root,
    /// Literal text captured from a template unit
    RawContent { content: String },
    /// Escaped scalar value, children escaped after rendering
    Text { value: Value },
    /// A template unit's declared content, slots in declaration order
    Component { slots: Vec<NodeId> },
    /// Call-site customization context wrapping one component; the implicit
    /// default use-slot is wired on attach
    UseComponent {
        component: NodeId,
        default_use_slot: Option<NodeId>,
    },
    /// Named extension point with default content and optional override
    Slot {
        name: String,
        bindings: Bindings,
        assigned: Option<NodeId>,
    },
    /// Call-site override intending to replace one slot
    UseSlot {
        slot_name: String,
        matched: Option<NodeId>,
        implicit: bool,
    },
    /// Inline reference to the overridden slot's original content; the
    /// owning use-slot is wired on attach
    ParentSlot { use_slot: Option<NodeId> },
}

#[derive(Debug)]
struct Node {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Owns every node of one tree under construction or render
#[derive(Debug)]
pub struct NodeArena {
    nodes: Vec<Node>,
    promotion: DefaultSlotPromotion,
}

impl NodeArena {
    /// Creates an arena holding only the root node
    pub fn new(promotion: DefaultSlotPromotion) -> Self {
        Self {
            nodes: vec![Node {
                kind: NodeKind::Root,
                parent: None,
                children: Vec::new(),
            }],
            promotion,
        }
    }

    /// The tree's sole entry point
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.0].kind
    }

    pub fn tag(&self, id: NodeId) -> NodeTag {
        match self.nodes[id.0].kind {
            NodeKind::Root => NodeTag::Root,
            NodeKind::RawContent { .. } => NodeTag::RawContent,
            NodeKind::Text { .. } => NodeTag::Text,
            NodeKind::Component { .. } => NodeTag::Component,
            NodeKind::UseComponent { .. } => NodeTag::UseComponent,
            NodeKind::Slot { .. } => NodeTag::Slot,
            NodeKind::UseSlot { .. } => NodeTag::UseSlot,
            NodeKind::ParentSlot { .. } => NodeTag::ParentSlot,
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    /// Whether nodes of this tag own children and take the cursor on attach
    pub fn is_parent_tag(tag: NodeTag) -> bool {
        !matches!(tag, NodeTag::RawContent | NodeTag::ParentSlot)
    }

    /// Climbs from `start` (inclusive) towards the root until `pred` matches
    fn climb_until(&self, start: NodeId, pred: impl Fn(&NodeKind) -> bool) -> Option<NodeId> {
        let mut current = Some(start);
        while let Some(id) = current {
            if pred(self.kind(id)) {
                return Some(id);
            }
            current = self.parent(id);
        }
        None
    }

    /// Attaches a new node under `cursor` and wires kind-specific links
    ///
    /// Direct call-site content of a use-component is routed into its
    /// implicit default use-slot; explicit use-slots stay direct children
    /// of the use-component itself.
    pub fn attach(&mut self, cursor: NodeId, kind: NodeKind) -> Result<NodeId, EngineError> {
        let parent = self.route_parent(cursor, &kind);
        self.check_attachable(parent, &kind)?;

        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            kind,
            parent: Some(parent),
            children: Vec::new(),
        });
        self.nodes[parent.0].children.push(id);

        match self.tag(id) {
            NodeTag::Slot => self.register_slot(id),
            NodeTag::UseSlot => self.match_use_slot(id)?,
            NodeTag::UseComponent => self.create_default_use_slot(id),
            NodeTag::ParentSlot => self.resolve_parent_slot(id),
            _ => {}
        }

        Ok(id)
    }

    /// Routes direct use-component content into the implicit default use-slot
    fn route_parent(&self, cursor: NodeId, kind: &NodeKind) -> NodeId {
        if let NodeKind::UseComponent {
            default_use_slot: Some(default_use_slot),
            ..
        } = self.nodes[cursor.0].kind
        {
            if !matches!(kind, NodeKind::UseSlot { .. }) {
                return default_use_slot;
            }
        }
        cursor
    }

    fn check_attachable(&self, parent: NodeId, kind: &NodeKind) -> Result<(), EngineError> {
        match kind {
            NodeKind::UseSlot { implicit: false, .. } => {
                if self.tag(parent) != NodeTag::UseComponent {
                    return Err(EngineError::invalid_tree(format!(
                        "use-slot node can only be added to a use-component node, not a {} node",
                        self.tag(parent)
                    )));
                }
            }
            NodeKind::ParentSlot { .. } => {
                // Valid only at a call site: the nearest component-ish
                // ancestor must be a use-component, not a declaring component
                let scope = self.climb_until(parent, |k| {
                    matches!(k, NodeKind::Component { .. } | NodeKind::UseComponent { .. })
                });
                let in_use = scope
                    .map(|id| self.tag(id) == NodeTag::UseComponent)
                    .unwrap_or(false);
                if !in_use {
                    return Err(EngineError::invalid_tree(
                        "parent-slot node cannot be created outside of a use-component node",
                    ));
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// Registers a slot with the nearest enclosing declaring component
    ///
    /// A slot declared outside any component declaration stays unregistered
    /// and always renders its default content.
    fn register_slot(&mut self, slot: NodeId) {
        let start = self.parent(slot).expect("slot has a parent");
        let scope = self.climb_until(start, |k| {
            matches!(k, NodeKind::Component { .. } | NodeKind::UseComponent { .. })
        });
        if let Some(comp) = scope {
            if let NodeKind::Component { slots } = &mut self.nodes[comp.0].kind {
                slots.push(slot);
            }
        }
    }

    /// Eagerly matches an explicit use-slot against the next unassigned slot
    /// of the same name, in declaration order
    fn match_use_slot(&mut self, use_slot: NodeId) -> Result<(), EngineError> {
        let use_comp = self.parent(use_slot).expect("use-slot has a parent");
        let name = match self.kind(use_slot) {
            NodeKind::UseSlot { slot_name, .. } => slot_name.clone(),
            _ => unreachable!("match_use_slot called on a non-use-slot node"),
        };

        let component = match self.kind(use_comp) {
            NodeKind::UseComponent { component, .. } => *component,
            _ => unreachable!("use-slot attached outside a use-component"),
        };

        match self.next_unassigned_slot(component, &name) {
            Some(slot) => {
                self.assign(slot, use_slot);
                Ok(())
            }
            None if self.slot_name_declared(component, &name) => Err(EngineError::duplicate_name(
                &name,
                format!("every '{}' slot of the component is already overridden", name),
            )),
            // Never-declared names are tolerated; the content renders nowhere
            None => Ok(()),
        }
    }

    fn create_default_use_slot(&mut self, use_comp: NodeId) {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            kind: NodeKind::UseSlot {
                slot_name: DEFAULT_SLOT.to_string(),
                matched: None,
                implicit: true,
            },
            parent: Some(use_comp),
            children: Vec::new(),
        });
        self.nodes[use_comp.0].children.push(id);
        if let NodeKind::UseComponent {
            default_use_slot, ..
        } = &mut self.nodes[use_comp.0].kind
        {
            *default_use_slot = Some(id);
        }
    }

    /// Records which use-slot context a parent-slot reference belongs to
    fn resolve_parent_slot(&mut self, parent_slot: NodeId) {
        let start = self.parent(parent_slot).expect("parent-slot has a parent");
        let use_slot = self
            .climb_until(start, |k| matches!(k, NodeKind::UseSlot { .. }))
            .expect("checked by check_attachable: routing guarantees a use-slot ancestor");
        if let NodeKind::ParentSlot { use_slot: target } = &mut self.nodes[parent_slot.0].kind {
            *target = Some(use_slot);
        }
    }

    fn assign(&mut self, slot: NodeId, use_slot: NodeId) {
        if let NodeKind::Slot { assigned, .. } = &mut self.nodes[slot.0].kind {
            *assigned = Some(use_slot);
        }
        if let NodeKind::UseSlot { matched, .. } = &mut self.nodes[use_slot.0].kind {
            *matched = Some(slot);
        }
    }

    /// Nearest enclosing use-component, stopping at a declaring component
    ///
    /// Inside a component declaration there is no call-site context yet, so
    /// the climb yields nothing rather than escaping to an outer call site.
    pub fn enclosing_use_component(&self, from: NodeId) -> Option<NodeId> {
        self.climb_until(from, |k| {
            matches!(k, NodeKind::Component { .. } | NodeKind::UseComponent { .. })
        })
        .filter(|&id| self.tag(id) == NodeTag::UseComponent)
    }

    /// First slot of `name` in declaration order without an override
    pub fn next_unassigned_slot(&self, component: NodeId, name: &str) -> Option<NodeId> {
        let slots = match self.kind(component) {
            NodeKind::Component { slots } => slots,
            _ => return None,
        };
        slots.iter().copied().find(|&slot| match self.kind(slot) {
            NodeKind::Slot {
                name: slot_name,
                assigned,
                ..
            } => slot_name == name && assigned.is_none(),
            _ => false,
        })
    }

    fn slot_name_declared(&self, component: NodeId, name: &str) -> bool {
        let slots = match self.kind(component) {
            NodeKind::Component { slots } => slots,
            _ => return false,
        };
        slots.iter().any(|&slot| {
            matches!(self.kind(slot), NodeKind::Slot { name: n, .. } if n == name)
        })
    }

    /// Bindings declared by the slot a use-slot was matched to
    pub fn matched_bindings(&self, use_slot: NodeId) -> Bindings {
        let matched = match self.kind(use_slot) {
            NodeKind::UseSlot { matched, .. } => *matched,
            _ => None,
        };
        match matched.map(|slot| self.kind(slot)) {
            Some(NodeKind::Slot { bindings, .. }) => bindings.clone(),
            _ => Bindings::new(),
        }
    }

    /// Close hook fired by the builder when the cursor leaves a node
    pub fn on_close(&mut self, id: NodeId) {
        if self.tag(id) == NodeTag::UseComponent {
            self.promote_default_use_slot(id);
        }
    }

    /// Promotes the implicit default use-slot to a real override if its
    /// content qualifies under the promotion policy and a default slot is
    /// still unassigned
    fn promote_default_use_slot(&mut self, use_comp: NodeId) {
        let (component, default_use_slot) = match self.kind(use_comp) {
            NodeKind::UseComponent {
                component,
                default_use_slot: Some(default_use_slot),
            } => (*component, *default_use_slot),
            _ => return,
        };

        if let NodeKind::UseSlot { matched: Some(_), .. } = self.kind(default_use_slot) {
            return;
        }
        if self.promotion == DefaultSlotPromotion::NonBlank && !self.is_non_blank(default_use_slot)
        {
            return;
        }
        if let Some(slot) = self.next_unassigned_slot(component, DEFAULT_SLOT) {
            self.assign(slot, default_use_slot);
        }
    }

    /// Blankness check for promotion: any non-raw child, or raw text with a
    /// non-whitespace character
    fn is_non_blank(&self, id: NodeId) -> bool {
        self.nodes[id.0]
            .children
            .iter()
            .any(|&child| match self.kind(child) {
                NodeKind::RawContent { content } => content.chars().any(|c| !c.is_whitespace()),
                _ => true,
            })
    }

    /// Renders the finished tree to its final output string
    ///
    /// Side-effect free; the tree is not mutated.
    pub fn render(&self, id: NodeId) -> String {
        match self.kind(id) {
            NodeKind::Root
            | NodeKind::Component { .. }
            | NodeKind::UseSlot { .. } => self.render_children(id),
            NodeKind::RawContent { content } => content.clone(),
            NodeKind::Text { value } => {
                let mut out = escape::html(value);
                out.push_str(&escape::html_str(&self.render_children(id)));
                out
            }
            // The call site's own output comes back through the slots it
            // overrides, never directly
            NodeKind::UseComponent { .. } => String::new(),
            NodeKind::Slot { assigned, .. } => match assigned {
                Some(use_slot) => self.render_children(*use_slot),
                None => self.render_children(id),
            },
            NodeKind::ParentSlot { use_slot } => match use_slot {
                Some(use_slot) => self.render_parent_content(*use_slot),
                None => String::new(),
            },
        }
    }

    fn render_children(&self, id: NodeId) -> String {
        let mut out = String::new();
        for &child in &self.nodes[id.0].children {
            out.push_str(&self.render(child));
        }
        out
    }

    /// The pre-override ("as-is") content of the slot a use-slot replaces
    ///
    /// An unmatched use-slot falls back to the first declared slot of its
    /// name in the enclosing component, so a parent-slot inside the implicit
    /// default content resolves even when promotion did not happen.
    fn render_parent_content(&self, use_slot: NodeId) -> String {
        let (slot_name, matched) = match self.kind(use_slot) {
            NodeKind::UseSlot {
                slot_name, matched, ..
            } => (slot_name, *matched),
            _ => return String::new(),
        };

        if let Some(slot) = matched {
            return self.render_children(slot);
        }

        let component = self
            .parent(use_slot)
            .and_then(|use_comp| match self.kind(use_comp) {
                NodeKind::UseComponent { component, .. } => Some(*component),
                _ => None,
            });
        let slot = component.and_then(|comp| match self.kind(comp) {
            NodeKind::Component { slots } => slots.iter().copied().find(|&slot| {
                matches!(self.kind(slot), NodeKind::Slot { name, .. } if name == slot_name)
            }),
            _ => None,
        });

        match slot {
            Some(slot) => self.render_children(slot),
            None => String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params;

    fn raw(content: &str) -> NodeKind {
        NodeKind::RawContent {
            content: content.to_string(),
        }
    }

    fn slot(name: &str) -> NodeKind {
        NodeKind::Slot {
            name: name.to_string(),
            bindings: Bindings::new(),
            assigned: None,
        }
    }

    fn use_slot(name: &str) -> NodeKind {
        NodeKind::UseSlot {
            slot_name: name.to_string(),
            matched: None,
            implicit: false,
        }
    }

    /// Builds component + use-component under the root, returns both ids
    fn component_pair(arena: &mut NodeArena, declare: &[&str]) -> (NodeId, NodeId) {
        let comp = arena
            .attach(arena.root(), NodeKind::Component { slots: Vec::new() })
            .unwrap();
        for name in declare {
            let s = arena.attach(comp, slot(name)).unwrap();
            arena.attach(s, raw(&format!("[{}]", name))).unwrap();
        }
        let use_comp = arena
            .attach(
                arena.root(),
                NodeKind::UseComponent {
                    component: comp,
                    default_use_slot: None,
                },
            )
            .unwrap();
        (comp, use_comp)
    }

    #[test]
    fn test_raw_content_renders_verbatim() {
        let mut arena = NodeArena::new(DefaultSlotPromotion::NonBlank);
        arena.attach(arena.root(), raw("a<b>c")).unwrap();
        assert_eq!(arena.render(arena.root()), "a<b>c");
    }

    #[test]
    fn test_text_node_escapes_value_and_children() {
        let mut arena = NodeArena::new(DefaultSlotPromotion::NonBlank);
        let text = arena
            .attach(
                arena.root(),
                NodeKind::Text {
                    value: Value::String("<t>".into()),
                },
            )
            .unwrap();
        arena.attach(text, raw("<c>")).unwrap();
        assert_eq!(arena.render(arena.root()), "&lt;t&gt;&lt;c&gt;");
    }

    #[test]
    fn test_unoverridden_slots_render_defaults_in_order() {
        let mut arena = NodeArena::new(DefaultSlotPromotion::NonBlank);
        let (comp, use_comp) = component_pair(&mut arena, &["one", "two"]);
        arena.on_close(use_comp);
        let _ = comp;
        assert_eq!(arena.render(arena.root()), "[one][two]");
    }

    #[test]
    fn test_explicit_override_replaces_default() {
        let mut arena = NodeArena::new(DefaultSlotPromotion::NonBlank);
        let (_, use_comp) = component_pair(&mut arena, &["title"]);
        let us = arena.attach(use_comp, use_slot("title")).unwrap();
        arena.attach(us, raw("T1")).unwrap();
        arena.on_close(use_comp);
        let out = arena.render(arena.root());
        assert_eq!(out, "T1");
        assert!(!out.contains("[title]"));
    }

    #[test]
    fn test_repeated_slots_match_in_declaration_order() {
        let mut arena = NodeArena::new(DefaultSlotPromotion::NonBlank);
        let (_, use_comp) = component_pair(&mut arena, &["row", "row", "row"]);
        let first = arena.attach(use_comp, use_slot("row")).unwrap();
        arena.attach(first, raw("A")).unwrap();
        let second = arena.attach(use_comp, use_slot("row")).unwrap();
        arena.attach(second, raw("B")).unwrap();
        arena.on_close(use_comp);
        assert_eq!(arena.render(arena.root()), "AB[row]");
    }

    #[test]
    fn test_exhausted_slot_name_is_duplicate_error() {
        let mut arena = NodeArena::new(DefaultSlotPromotion::NonBlank);
        let (_, use_comp) = component_pair(&mut arena, &["title"]);
        arena.attach(use_comp, use_slot("title")).unwrap();
        let err = arena.attach(use_comp, use_slot("title")).unwrap_err();
        assert!(matches!(err, EngineError::DuplicateDirectiveName { .. }));
    }

    #[test]
    fn test_undeclared_use_slot_renders_nowhere() {
        let mut arena = NodeArena::new(DefaultSlotPromotion::NonBlank);
        let (_, use_comp) = component_pair(&mut arena, &["title"]);
        let us = arena.attach(use_comp, use_slot("missing")).unwrap();
        arena.attach(us, raw("GONE")).unwrap();
        arena.on_close(use_comp);
        let out = arena.render(arena.root());
        assert_eq!(out, "[title]");
    }

    #[test]
    fn test_default_content_promotes_when_non_blank() {
        let mut arena = NodeArena::new(DefaultSlotPromotion::NonBlank);
        let (_, use_comp) = component_pair(&mut arena, &["default"]);
        arena.attach(use_comp, raw("call site")).unwrap();
        arena.on_close(use_comp);
        assert_eq!(arena.render(arena.root()), "call site");
    }

    #[test]
    fn test_blank_default_content_keeps_slot_default() {
        let mut arena = NodeArena::new(DefaultSlotPromotion::NonBlank);
        let (_, use_comp) = component_pair(&mut arena, &["default"]);
        arena.attach(use_comp, raw("  \n\t ")).unwrap();
        arena.on_close(use_comp);
        assert_eq!(arena.render(arena.root()), "[default]");
    }

    #[test]
    fn test_always_policy_promotes_blank_content() {
        let mut arena = NodeArena::new(DefaultSlotPromotion::Always);
        let (_, use_comp) = component_pair(&mut arena, &["default"]);
        arena.attach(use_comp, raw("   ")).unwrap();
        arena.on_close(use_comp);
        assert_eq!(arena.render(arena.root()), "   ");
    }

    #[test]
    fn test_explicit_default_override_beats_promotion() {
        let mut arena = NodeArena::new(DefaultSlotPromotion::NonBlank);
        let (_, use_comp) = component_pair(&mut arena, &["default"]);
        arena.attach(use_comp, raw("dropped direct content")).unwrap();
        let us = arena.attach(use_comp, use_slot("default")).unwrap();
        arena.attach(us, raw("explicit")).unwrap();
        arena.on_close(use_comp);
        assert_eq!(arena.render(arena.root()), "explicit");
    }

    #[test]
    fn test_parent_slot_renders_original_content() {
        let mut arena = NodeArena::new(DefaultSlotPromotion::NonBlank);
        let (_, use_comp) = component_pair(&mut arena, &["title"]);
        let us = arena.attach(use_comp, use_slot("title")).unwrap();
        arena.attach(us, raw("before|")).unwrap();
        arena
            .attach(us, NodeKind::ParentSlot { use_slot: None })
            .unwrap();
        arena.attach(us, raw("|after")).unwrap();
        arena.on_close(use_comp);
        assert_eq!(arena.render(arena.root()), "before|[title]|after");
    }

    #[test]
    fn test_parent_slot_outside_use_component_rejected() {
        let mut arena = NodeArena::new(DefaultSlotPromotion::NonBlank);
        let comp = arena
            .attach(arena.root(), NodeKind::Component { slots: Vec::new() })
            .unwrap();
        let err = arena
            .attach(comp, NodeKind::ParentSlot { use_slot: None })
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidTreeStructure { .. }));
    }

    #[test]
    fn test_explicit_use_slot_requires_use_component_parent() {
        let mut arena = NodeArena::new(DefaultSlotPromotion::NonBlank);
        let err = arena.attach(arena.root(), use_slot("x")).unwrap_err();
        assert!(matches!(err, EngineError::InvalidTreeStructure { .. }));
    }

    #[test]
    fn test_matched_bindings_come_from_slot() {
        let mut arena = NodeArena::new(DefaultSlotPromotion::NonBlank);
        let comp = arena
            .attach(arena.root(), NodeKind::Component { slots: Vec::new() })
            .unwrap();
        arena
            .attach(
                comp,
                NodeKind::Slot {
                    name: "item".into(),
                    bindings: params! { "id" => 9 },
                    assigned: None,
                },
            )
            .unwrap();
        let use_comp = arena
            .attach(
                arena.root(),
                NodeKind::UseComponent {
                    component: comp,
                    default_use_slot: None,
                },
            )
            .unwrap();
        let us = arena.attach(use_comp, use_slot("item")).unwrap();
        assert_eq!(arena.matched_bindings(us), params! { "id" => 9 });
    }

    #[test]
    fn test_use_component_itself_renders_empty() {
        let mut arena = NodeArena::new(DefaultSlotPromotion::NonBlank);
        let (_, use_comp) = component_pair(&mut arena, &[]);
        arena.attach(use_comp, raw("ignored")).unwrap();
        arena.on_close(use_comp);
        assert_eq!(arena.render(use_comp), "");
    }
}
