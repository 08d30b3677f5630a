//! Error types that can be emitted from this library

use miette::Diagnostic;
use thiserror::Error;

use crate::tag::Tag;

/// Error type for library
#[derive(Error, Diagnostic, Debug)]
pub enum Error {
    /// Transparent wrapper for [`std::io::Error`]
    #[error(transparent)]
    IOError(#[from] std::io::Error),

    /// Transparent wrapper for [`binrw::Error`]
    #[error(transparent)]
    BinRWError(#[from] binrw::Error),

    /// Transparent wrapper for [`std::string::FromUtf8Error`]
    #[error(transparent)]
    UTF8Error(#[from] std::string::FromUtf8Error),

    /// Wrapper for errors raised by the subrecord parser
    #[error("{0}")]
    WinnowError(winnow::error::ErrMode<winnow::error::ContextError>),

    /// fewer bytes remain than a declared length requires
    #[error("truncated {context}: needed {needed} bytes, {available} available")]
    Truncated {
        context: &'static str,
        needed: usize,
        available: usize,
    },

    /// a subrecord reads past the end of its record
    #[error("subrecord {tag} in {record} declares {declared} bytes but only {remaining} remain")]
    StructuralOverrun {
        record: Tag,
        tag: Tag,
        declared: u32,
        remaining: usize,
    },

    /// a typed decoder was handed the wrong subrecord or record
    #[error("expected {expected}, found {actual}")]
    TagMismatch { expected: Tag, actual: Tag },

    /// a record contains a subrecord it has no decoder for
    #[error("unknown subrecord {tag} in {record}")]
    UnknownSubrecord { record: Tag, tag: Tag },

    /// a required subrecord is absent
    #[error("{record} is missing required subrecord {tag}")]
    MissingField { record: Tag, tag: Tag },

    /// a fixed size field has too little data
    #[error("{tag} needs at least {required} bytes, found {actual}")]
    FieldTooShort {
        tag: Tag,
        required: usize,
        actual: usize,
    },

    /// a field payload has a length that cannot be decoded
    #[error("{tag} has an invalid length of {actual} bytes, expected {expected}")]
    InvalidLength {
        tag: Tag,
        expected: usize,
        actual: usize,
    },

    /// a string does not fit its fixed width
    #[error("value too long: {len} bytes does not fit in {width}")]
    ValueTooLong { width: usize, len: usize },

    /// a grid has the wrong number of rows or columns
    #[error("dimension mismatch: expected {expected_width}x{expected_height}, found {width}x{height}")]
    DimensionMismatch {
        expected_width: usize,
        expected_height: usize,
        width: usize,
        height: usize,
    },

    /// a grid row differs in width from the first row
    #[error("ragged grid: row {row} has {width} columns, expected {expected}")]
    RaggedGrid {
        row: usize,
        width: usize,
        expected: usize,
    },

    /// a tag is not exactly four bytes
    #[error("invalid tag {0:?}: tags are exactly four bytes")]
    InvalidTag(String),

    /// an omwscripts key that maps to neither a flag nor a record type
    #[error("unknown attach key {key} on line {line}")]
    UnknownAttachKey { line: usize, key: String },

    /// an omwscripts line that is not `KEYS: path`
    #[error("invalid script line {line}: {content}")]
    InvalidScriptLine { line: usize, content: String },

    /// {0}
    #[error("{0}")]
    CustomError(String),
}

impl From<winnow::error::ErrMode<winnow::error::ContextError>> for Error {
    fn from(value: winnow::error::ErrMode<winnow::error::ContextError>) -> Self {
        Error::WinnowError(value)
    }
}

/// Generic result type with crate's Error as its error variant
pub type Result<T> = core::result::Result<T, Error>;
