//! Scopes and bindings for one compilation unit
//!
//! The builder walks a unit once, nesting scopes the way Java nests
//! declarations, and leaves a [`SymbolTable`] holding a resolution for every
//! identifier node. Collect and rewrite both consume that table.

pub mod builder;
pub mod graph;
pub mod table;

pub use builder::ScopeBuilder;
pub use graph::{Binding, Namespace, ScopeGraph, ScopeId, ScopeKind};
pub use table::{BindingState, Resolution, SymbolTable};
