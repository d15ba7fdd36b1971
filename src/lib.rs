//! # javafix - readable Java from machine-generated source
//!
//! javafix takes the output of a decompiler or obfuscator and rewrites it:
//! - normalized brace/indent layout and a configurable line ending
//! - identifiers renamed through a persisted symbol dictionary
//! - an inventory ("dump") mode that fills that dictionary from a source tree
//!
//! Parsing is delegated to tree-sitter; everything after the syntax tree
//! (scopes, bindings, the store and the emitter) lives in this crate.

pub mod symbol;
pub mod store;
pub mod frontend;
pub mod scope;
pub mod naming;
pub mod collect;
pub mod rewrite;
pub mod discover;
pub mod pipeline;
pub mod config;
pub mod ui;

// Re-exports for convenient access
pub use symbol::{Symbol, SymbolId, SymbolKind};
pub use store::{SymbolState, SymbolStore};
pub use config::{LineEnding, RunMode, Settings};
pub use pipeline::{Orchestrator, RunSummary};

use std::path::{Path, PathBuf};

/// Result type alias for javafix operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for javafix operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{}:{line}:{column}: syntax error near `{snippet}`", path.display())]
    Syntax {
        path: PathBuf,
        line: usize,
        column: usize,
        snippet: String,
    },

    #[error("Malformed symbol store {}: {message}", path.display())]
    StoreFormat { path: PathBuf, message: String },

    #[error("Parser error: {0}")]
    Parser(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Invalid UTF-8 in source: {0}")]
    Utf8(#[from] std::str::Utf8Error),
}

impl Error {
    /// Attach a path to an I/O error
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}
