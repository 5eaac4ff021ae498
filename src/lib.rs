//! # ahk-deobfuscate-rs
//!
//! Best-effort recovery of readable names from obfuscated AutoHotkey-style
//! macro scripts.
//!
//! Every `%var%` reference and every quoted run of obfuscation-alphabet
//! characters is collected together with the lines it appears on, voted into
//! a [`Category`] from those lines, and replaced by a generated name. Update
//! and network-check sections are stripped on the way out. The guesses are
//! frequently wrong; the [`Report`] produced alongside the output lists every
//! decision so the result can be reviewed by hand.
//!
//! ## Example
//!
//! ```rust
//! use ahk_deobfuscate_rs::{deobfuscate, Options};
//!
//! let script = "%kf@#k%(1)\nMouseClick, Left, 520, 150\n";
//! let result = deobfuscate(script, &Options::default()).expect("deobfuscation failed");
//! assert!(result.output.contains("Function_"));
//! ```

pub mod deobfuscate;
pub mod document;
pub mod mapping;
pub mod options;
pub mod pipeline;
pub mod report;
pub mod streaming;
pub mod token;

use std::path::PathBuf;

pub use deobfuscate::DeobfuscateContext;
pub use document::Document;
pub use mapping::{Mapping, MappingEntry};
pub use options::{Mode, Options, ReportFormat};
pub use pipeline::{Deobfuscation, deobfuscate, deobfuscate_file};
pub use report::Report;
pub use token::{Category, Occurrence, Tally, Token, TokenForm};

#[derive(Debug, thiserror::Error)]
pub enum DeobfuscateError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {path}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize report: {0}")]
    ReportSerialization(#[source] serde_json::Error),

    #[error("invalid option: {0}")]
    InvalidOption(String),

    #[error("pattern compilation failed: {0}")]
    Pattern(#[from] regex::Error),
}

impl DeobfuscateError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, DeobfuscateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_deobfuscate() {
        let script = "%kf@#k%(1)\n%kf@#k%(2)\n";
        let result = deobfuscate(script, &Options::default()).expect("deobfuscation failed");

        assert!(result.output.contains("Function_001(1)"));
        assert!(!result.output.contains("%kf@#k%"));
    }

    #[test]
    fn test_io_error_display_names_path() {
        let err = DeobfuscateError::io(
            "missing.ahk",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert!(err.to_string().contains("missing.ahk"));
    }
}
