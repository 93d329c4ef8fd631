//! `lopdf`-style core for PDF 1.7 lexing, object parsing, cross-reference resolution,
//! stream filter decoding, encryption, and CMap interpretation.
//!
//! This crate stops at a deliberate line: no page-tree walking,
//! no content-stream *interpretation* (only the operator/operand grammar itself, via
//! [`content`]), no font subsetting, no PDF writing. Everything below that line is
//! built out in full — see `DESIGN.md` for the grounding ledger.

pub mod cmap;
pub mod content;
pub mod dictionary;
pub mod document;
pub mod encodings;
pub mod encryption;
pub mod error;
pub mod fdf;
pub mod filters;
pub mod object;
pub mod object_stream;
pub mod parser;
pub mod reader;
pub mod xref;

pub use dictionary::Dictionary;
pub use document::Document;
pub use error::{Diagnostic, Error, Result};
pub use fdf::{open_fdf, FdfFile};
pub use object::{Object, ObjectId, Stream, StringFormat};
pub use reader::{LoadOptions, PdfMetadata};
pub use xref::{Xref, XrefEntry, XrefType};
