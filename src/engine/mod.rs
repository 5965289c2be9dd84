//! Tree-building and slot-resolution engine
//!
//! The engine turns an imperative trace of directive calls into a node tree
//! ([`builder`]), resolves slot overrides while the tree is built
//! ([`node`]), and drives one render end to end ([`context`]).

pub mod builder;
pub mod context;
pub mod node;

pub use builder::NodeTreeBuilder;
pub use context::{ComponentHandle, RenderContext, RepeatSlots, SlotHandle, UseSlotHandle};
pub use node::{DefaultSlotPromotion, NodeArena, NodeId, NodeKind, NodeTag, DEFAULT_SLOT};
