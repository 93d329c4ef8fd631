use std::collections::BTreeMap;

use crate::error::XrefError;
use crate::object::{Object, ObjectId};
use crate::parser::{self, ParserInput};
use crate::Result;
use crate::Stream;

/// A decoded `/Type /ObjStm` object stream: the packed `(object_number, offset)` header
/// plus every object it contains, parsed eagerly.
pub struct ObjectStream {
    pub objects: BTreeMap<ObjectId, Object>,
}

impl ObjectStream {
    pub fn new(stream: &mut Stream) -> Result<Self> {
        let n = stream.dict.get(b"N").and_then(Object::as_i64)? as usize;
        let first = stream.dict.get(b"First").and_then(Object::as_i64)? as usize;

        let data = stream.decompressed_content()?;
        if first > data.len() {
            return Err(XrefError::MalformedObjectStream.into());
        }

        // The header is `N` pairs of `(object_number, relative_offset)`. Some writers
        // use 0x00 as a separator instead of whitespace; normalize it to a space so the
        // ASCII-number tokenizer below doesn't need two code paths.
        let header: Vec<u8> = data[..first]
            .iter()
            .map(|&b| if b == 0 { b' ' } else { b })
            .collect();

        let mut numbers = header.split(|&b| b.is_ascii_whitespace()).filter(|s| !s.is_empty());
        let mut pairs = Vec::with_capacity(n);
        for _ in 0..n {
            let obj_num: u32 = parse_ascii_uint(numbers.next().ok_or(XrefError::MalformedObjectStream)?)?;
            let rel_offset: usize = parse_ascii_uint(numbers.next().ok_or(XrefError::MalformedObjectStream)?)?;
            pairs.push((obj_num, rel_offset));
        }
        // Objects must be parsed in ascending offset order so that each one's nom
        // parse can run to the natural end of its value without an explicit length.
        pairs.sort_by_key(|&(_, offset)| offset);

        let mut objects = BTreeMap::new();
        for (i, &(obj_num, rel_offset)) in pairs.iter().enumerate() {
            let start = first + rel_offset;
            if start > data.len() {
                return Err(XrefError::MalformedObjectStream.into());
            }
            let end = pairs.get(i + 1).map(|&(_, next)| first + next).unwrap_or(data.len()).min(data.len());
            let slice = &data[start..end];
            let object = parser::direct_object(ParserInput::new_extra(slice, "objstm"))
                .ok_or(XrefError::MalformedObjectStream)?;
            // Objects inside an object stream must not themselves be streams or be
            // independently encrypted; a nested Stream here indicates
            // a malformed writer, not a value worth propagating.
            if matches!(object, Object::Stream(_)) {
                return Err(XrefError::MalformedObjectStream.into());
            }
            objects.insert((obj_num, 0), object);
        }

        Ok(ObjectStream { objects })
    }
}

fn parse_ascii_uint<T: std::str::FromStr>(bytes: &[u8]) -> Result<T> {
    std::str::from_utf8(bytes)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| XrefError::MalformedObjectStream.into())
}
