use std::fmt;

use crate::ObjectId;

pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error facade. Sub-enums carry the detail for one layer of the pipeline;
/// this type composes them so callers can match broadly or drill into `source()`.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid file header")]
    InvalidFileHeader,

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Xref(#[from] XrefError),

    #[error(transparent)]
    Decryption(#[from] DecryptionError),

    #[error("incorrect password")]
    InvalidPassword,

    #[error("unsupported filter: {0}")]
    UnsupportedFilter(String),

    #[error("reference cycle detected resolving {0:?}")]
    ReferenceCycle(ObjectId),

    #[error("xref entry missing for object")]
    MissingXrefEntry,

    #[error("object {0} {1} R not found at its xref offset")]
    ObjectIdMismatch(u32, u16),

    #[error("indirect object header malformed at offset {offset}")]
    IndirectObject { offset: usize },

    #[error("offset {0} is outside the document")]
    InvalidOffset(usize),

    #[error("stream is invalid: {0}")]
    InvalidStream(String),

    #[error("numeric conversion failed: {0}")]
    NumericCast(String),

    #[error("type error: expected {expected}, found {found}")]
    ObjectType { expected: &'static str, found: &'static str },

    #[error("operation not implemented: {0}")]
    Unimplemented(&'static str),

    #[error(transparent)]
    CMap(#[from] crate::cmap::CMapParseError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("array is not terminated")]
    ArrayNotTerminated,
    #[error("dictionary is not terminated")]
    DictNotTerminated,
    #[error("dictionary has a duplicate key")]
    DictDuplicateKey,
    #[error("dictionary key is not a name")]
    DictCorrupt,
    #[error("command encountered outside content-stream mode")]
    UnexpectedCommand,
    #[error("unexpected end of input")]
    BufEmpty,
    #[error("unexpected end of input")]
    EndOfInput,
    #[error("trailer dictionary is invalid")]
    InvalidTrailer,
    #[error("xref table is invalid")]
    InvalidXref,
    #[error("unterminated literal string")]
    UnterminatedLiteralString,
    #[error("unterminated hex string")]
    UnterminatedHexString,
    #[error("malformed hex digit")]
    MalformedHexDigit,
}

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum XrefError {
    #[error("could not locate startxref/xref table")]
    Start,
    #[error("could not locate xref table referenced by /Prev")]
    PrevStart,
    #[error("could not locate xref stream referenced by /XRefStm")]
    StreamStart,
    #[error("no xref could be parsed for this document")]
    NoXref,
    #[error("object stream referenced by a compressed entry is malformed")]
    MalformedObjectStream,
    #[error("stream length could not be determined")]
    InvalidStreamLength,
}

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum DecryptionError {
    #[error("unsupported encryption algorithm (V={0})")]
    UnsupportedAlgorithm(i64),
    #[error("incorrect password")]
    IncorrectPassword,
    #[error("encrypt dictionary is missing required entry {0}")]
    MissingEntry(&'static str),
    #[error("ciphertext is too short to contain an IV")]
    CiphertextTooShort,
    #[error("padding is invalid after AES-CBC decryption")]
    InvalidPadding,
}

/// A non-fatal recovery the loader performed. Mirrors what gets logged via `log::warn!`
/// so embedders without a logger configured can still inspect what happened (:
/// "non-fatal recoveries must be observable").
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub object: Option<ObjectId>,
    pub offset: Option<usize>,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.object, self.offset) {
            (Some(id), _) => write!(f, "{} {} R: {}", id.0, id.1, self.message),
            (None, Some(off)) => write!(f, "at offset {off}: {}", self.message),
            (None, None) => write!(f, "{}", self.message),
        }
    }
}
