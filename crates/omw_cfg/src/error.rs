//! Error types that can be emitted from this library

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Error type for library
#[derive(Error, Diagnostic, Debug)]
pub enum Error {
    /// Transparent wrapper for [`std::io::Error`]
    #[error(transparent)]
    IOError(#[from] std::io::Error),

    /// Transparent wrapper for [`tes3_bsa::error::Error`]
    #[error(transparent)]
    #[diagnostic(transparent)]
    BsaError(#[from] tes3_bsa::error::Error),

    /// no openmw.cfg in any of the searched locations
    #[error("unable to find openmw.cfg, searched {}", display_paths(.searched))]
    #[diagnostic(help("pass the path to openmw.cfg or the directory containing it"))]
    ConfigNotFound { searched: Vec<PathBuf> },

    /// a line that is not `key=value`
    #[error("invalid line {line} in {}: {content}", .path.display())]
    InvalidConfigLine {
        path: PathBuf,
        line: usize,
        content: String,
    },

    /// a `?token?` that has no expansion
    #[error("unknown token {token} in {}", .path.display())]
    UnknownToken { path: PathBuf, token: String },

    /// unable to find requested file in any data directory or archive
    #[error("unable to find {0} in any data directory or archive")]
    FileNotFound(String),
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|path| path.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Generic result type with crate's Error as its error variant
pub type Result<T> = core::result::Result<T, Error>;
