// Error types for script parsing, literal extraction and directory fingerprinting.

use std::path::PathBuf;
use thiserror::Error;

/// Failure to build a parsed script. Fatal to the parser instance.
#[derive(Error, Debug)]
pub enum ScriptParseError {
    /// The script file could not be read
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Tree-sitter could not load the grammar or produce a tree
    #[error("{source_id}: parser failure: {message}")]
    Parser { source_id: String, message: String },

    /// The source text is not valid Python
    #[error("{source_id}: invalid syntax at line {line}, column {column}: {message}")]
    Syntax {
        source_id: String,
        line: usize,
        column: usize,
        message: String,
    },
}

/// Why a right-hand side could not be evaluated as a literal.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LiteralError {
    /// Node kind outside the literal subset (call, name, operator, ...)
    #[error("malformed node or string: {kind}")]
    NotLiteral { kind: String },

    #[error("invalid number literal '{text}'")]
    InvalidNumber { text: String },

    /// Valid in Python, but beyond the signed 64-bit range `LiteralValue::Int` holds
    #[error("integer literal '{text}' is outside the supported 64-bit range")]
    IntegerOutOfRange { text: String },

    #[error("unsupported string literal: {reason}")]
    UnsupportedString { reason: String },

    /// Implicit concatenation of `str` and `bytes` literals
    #[error("cannot mix bytes and nonbytes literals")]
    MixedStringKinds,

    #[error("invalid escape sequence '{escape}'")]
    InvalidEscape { escape: String },

    /// A list, set or dict used as a set member or dict key
    #[error("unhashable type: '{kind}'")]
    Unhashable { kind: String },
}

/// A named top-level assignment exists but its value is not a literal.
///
/// Reported per query; the parsed script stays usable for other names.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{name} in {source_id}: {cause}")]
pub struct ExtractionError {
    pub name: String,
    pub source_id: String,
    #[source]
    pub cause: LiteralError,
}

/// Failure while computing a directory fingerprint. No partial digest is produced.
#[derive(Error, Debug)]
pub enum FingerprintError {
    /// One of the name filters is not a valid regular expression
    #[error("invalid {which} pattern '{pattern}': {source}")]
    Pattern {
        which: &'static str,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// Listing a directory failed mid-walk
    #[error("failed to walk {}: {source}", path.display())]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    /// Reading the metadata of an entry failed
    #[error("failed to stat {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
