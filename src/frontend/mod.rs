//! Front end - parsing and cross-file bindings
//!
//! `parser` turns text into a [`CompilationUnit`], `syntax` gives passes a
//! tagged view over its nodes, and `index` answers type and member lookups
//! across every unit of a run.

pub mod index;
pub mod parser;
pub mod syntax;

pub use index::{MethodLookup, ProjectIndex, StaticType, TypeRef};
pub use parser::{CompilationUnit, FrontEnd, JavaParser};
pub use syntax::{classify, Syntax};
