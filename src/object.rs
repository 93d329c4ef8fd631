use crate::dictionary::Dictionary;
use crate::error::{Error, ParseError};
use crate::Result;

/// A unique key for an indirect object: (object number, generation number).
pub type ObjectId = (u32, u16);

/// Whether a `Object::String` was written with `( ... )` or `< ... >` syntax.
/// Round-tripping this matters for writers further up the stack; the parser
/// always records it even though this crate never re-serializes a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringFormat {
    Literal,
    Hexadecimal,
}

/// A raw stream object: header dictionary plus encoded (still filtered,
/// still encrypted) bytes. Decoding is the caller's responsibility — see
/// `crate::filters::decode`. Decoding is deferred to the caller by design.
#[derive(Debug, Clone, PartialEq)]
pub struct Stream {
    pub dict: Dictionary,
    pub content: Vec<u8>,
    /// Byte offset of `content` within the document buffer, before the length
    /// of the stream was known (used when `/Length` is itself an indirect
    /// reference and must be resolved after the fact).
    pub start_position: Option<usize>,
}

impl Stream {
    pub fn new(dict: Dictionary, content: Vec<u8>) -> Self {
        Stream { dict, content, start_position: None }
    }

    pub fn with_position(dict: Dictionary, position: usize) -> Self {
        Stream { dict, content: Vec::new(), start_position: Some(position) }
    }

    pub fn set_content(&mut self, content: Vec<u8>) {
        self.content = content;
        self.start_position = None;
    }

    /// Decode the stream through its `/Filter` chain. Pure and cache-free: callers that
    /// need the bytes repeatedly should cache the result themselves.
    pub fn decompressed_content(&self) -> Result<Vec<u8>> {
        crate::filters::decode_stream(&self.dict, &self.content)
    }
}

/// The PDF object sum type. Strings are opaque byte arrays at this layer;
/// higher layers apply PDFDocEncoding or UTF-16BE-with-BOM decoding (see `crate::encodings`).
#[derive(Debug, Clone, PartialEq)]
pub enum Object {
    Null,
    Boolean(bool),
    Integer(i64),
    Real(f64),
    Name(Vec<u8>),
    String(Vec<u8>, StringFormat),
    Array(Vec<Object>),
    Dictionary(Dictionary),
    Stream(Stream),
    Reference(ObjectId),
}

impl Object {
    pub fn string_literal<S: Into<Vec<u8>>>(s: S) -> Self {
        Object::String(s.into(), StringFormat::Literal)
    }

    pub fn enum_variant(&self) -> &'static str {
        match self {
            Object::Null => "Null",
            Object::Boolean(_) => "Boolean",
            Object::Integer(_) => "Integer",
            Object::Real(_) => "Real",
            Object::Name(_) => "Name",
            Object::String(..) => "String",
            Object::Array(_) => "Array",
            Object::Dictionary(_) => "Dictionary",
            Object::Stream(_) => "Stream",
            Object::Reference(_) => "Reference",
        }
    }

    pub fn as_bool(&self) -> Result<bool> {
        match self {
            Object::Boolean(b) => Ok(*b),
            _ => Err(Error::ObjectType { expected: "Boolean", found: self.enum_variant() }),
        }
    }

    pub fn as_i64(&self) -> Result<i64> {
        match self {
            Object::Integer(i) => Ok(*i),
            Object::Real(f) => Ok(*f as i64),
            _ => Err(Error::ObjectType { expected: "Integer", found: self.enum_variant() }),
        }
    }

    pub fn as_f64(&self) -> Result<f64> {
        match self {
            Object::Integer(i) => Ok(*i as f64),
            Object::Real(f) => Ok(*f),
            _ => Err(Error::ObjectType { expected: "Real", found: self.enum_variant() }),
        }
    }

    pub fn as_name(&self) -> Result<&[u8]> {
        match self {
            Object::Name(n) => Ok(n),
            _ => Err(Error::ObjectType { expected: "Name", found: self.enum_variant() }),
        }
    }

    pub fn as_str(&self) -> Result<&[u8]> {
        match self {
            Object::Name(n) => Ok(n),
            Object::String(s, _) => Ok(s),
            _ => Err(Error::ObjectType { expected: "Name or String", found: self.enum_variant() }),
        }
    }

    pub fn as_string_bytes(&self) -> Result<&[u8]> {
        match self {
            Object::String(s, _) => Ok(s),
            _ => Err(Error::ObjectType { expected: "String", found: self.enum_variant() }),
        }
    }

    pub fn as_array(&self) -> Result<&Vec<Object>> {
        match self {
            Object::Array(a) => Ok(a),
            _ => Err(Error::ObjectType { expected: "Array", found: self.enum_variant() }),
        }
    }

    pub fn as_array_mut(&mut self) -> Result<&mut Vec<Object>> {
        match self {
            Object::Array(a) => Ok(a),
            _ => Err(Error::ObjectType { expected: "Array", found: self.enum_variant() }),
        }
    }

    pub fn as_dict(&self) -> Result<&Dictionary> {
        match self {
            Object::Dictionary(d) => Ok(d),
            Object::Stream(s) => Ok(&s.dict),
            _ => Err(Error::ObjectType { expected: "Dictionary", found: self.enum_variant() }),
        }
    }

    pub fn as_dict_mut(&mut self) -> Result<&mut Dictionary> {
        match self {
            Object::Dictionary(d) => Ok(d),
            Object::Stream(s) => Ok(&mut s.dict),
            _ => Err(Error::ObjectType { expected: "Dictionary", found: self.enum_variant() }),
        }
    }

    pub fn as_stream(&self) -> Result<&Stream> {
        match self {
            Object::Stream(s) => Ok(s),
            _ => Err(Error::ObjectType { expected: "Stream", found: self.enum_variant() }),
        }
    }

    pub fn as_stream_mut(&mut self) -> Result<&mut Stream> {
        match self {
            Object::Stream(s) => Ok(s),
            _ => Err(Error::ObjectType { expected: "Stream", found: self.enum_variant() }),
        }
    }

    pub fn as_reference(&self) -> Result<ObjectId> {
        match self {
            Object::Reference(id) => Ok(*id),
            _ => Err(Error::ObjectType { expected: "Reference", found: self.enum_variant() }),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Object::Null)
    }
}

impl From<bool> for Object {
    fn from(v: bool) -> Self {
        Object::Boolean(v)
    }
}
impl From<i64> for Object {
    fn from(v: i64) -> Self {
        Object::Integer(v)
    }
}
impl From<f64> for Object {
    fn from(v: f64) -> Self {
        Object::Real(v)
    }
}
impl From<Vec<Object>> for Object {
    fn from(v: Vec<Object>) -> Self {
        Object::Array(v)
    }
}
impl From<Dictionary> for Object {
    fn from(v: Dictionary) -> Self {
        Object::Dictionary(v)
    }
}
impl From<ObjectId> for Object {
    fn from(v: ObjectId) -> Self {
        Object::Reference(v)
    }
}

/// Helper used by the strict-vs-relaxed dictionary parser to surface the
/// right typed error for a malformed `<< ... >>`.
pub(crate) fn dict_parse_error(duplicate: bool) -> Error {
    if duplicate {
        Error::Parse(ParseError::DictDuplicateKey)
    } else {
        Error::Parse(ParseError::DictCorrupt)
    }
}
