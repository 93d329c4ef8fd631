//! `open_fdf`: FDF (Forms Data Format) files carry form field values as a
//! small PDF-grammar body, and in practice are often handed to tools with no xref table
//! and no trailer at all — just a run of `N G obj ... endobj` bodies. Rather than fail,
//! this scans the buffer byte-by-byte for object headers, the same manual-walk technique
//! `reader::encrypted::extract_raw_object` uses to recover object boundaries without a
//! working xref, generalized here to a from-scratch, documentless scan instead of one
//! anchored at a known offset.

use std::collections::{BTreeMap, HashSet};

use crate::dictionary::Dictionary;
use crate::object::{Object, ObjectId};
use crate::parser::{self, stream_recovery, ParserInput};
use crate::reader::Reader;
use crate::{Document, Error, Result};

/// An FDF file loaded without relying on a cross-reference table: every object found by
/// scanning the buffer for `N G obj` headers, plus a trailer dictionary if one is present.
#[derive(Debug, Clone)]
pub struct FdfFile {
    pub version: Option<String>,
    pub trailer: Dictionary,
    pub objects: BTreeMap<ObjectId, Object>,
}

impl FdfFile {
    pub fn get_object(&self, id: ObjectId) -> Result<&Object> {
        self.objects.get(&id).ok_or(Error::MissingXrefEntry)
    }

    pub fn resolve(&self, object: &Object) -> Result<Object> {
        match object.as_reference() {
            Ok(id) => self.get_object(id).cloned(),
            Err(_) => Ok(object.clone()),
        }
    }

    /// The root FDF dictionary: either the trailer's `/Root`, or — since a true
    /// documentless FDF has no trailer — the first scanned object whose own dictionary
    /// carries an `/FDF` entry (every FDF's root dictionary is `<< /FDF << ... >> >>`).
    pub fn root_ref(&self) -> Option<ObjectId> {
        if let Ok(root) = self.trailer.get(b"Root").and_then(Object::as_reference) {
            return Some(root);
        }
        self.objects
            .iter()
            .find(|(_, object)| object.as_dict().map(|dict| dict.has(b"FDF")).unwrap_or(false))
            .map(|(id, _)| *id)
    }
}

/// Scan `buffer` for every `N G obj` header, parse each as an indirect object, and
/// recover any stream whose `/Length` cannot be trusted by scanning
/// forward for `endstream`. No xref or trailer is required to exist.
pub fn open_fdf(buffer: &[u8]) -> Result<FdfFile> {
    let version = parser::header(ParserInput::new_extra(buffer, "header"));

    let reader = Reader {
        buffer,
        document: Document::new(),
        encryption_state: None,
        password: None,
        raw_objects: std::collections::HashMap::new(),
    };

    let mut objects = BTreeMap::new();
    for (offset, expected_id) in find_object_headers(buffer) {
        let mut already_seen = HashSet::new();
        match parser::indirect_object(
            ParserInput::new_extra(buffer, "indirect object"),
            offset,
            Some(expected_id),
            &reader,
            &mut already_seen,
        ) {
            Ok((id, object)) => {
                objects.insert(id, object);
            }
            Err(_) => continue,
        }
    }

    for object in objects.values_mut() {
        if let Ok(stream) = object.as_stream_mut() {
            if stream.content.is_empty() {
                if let Some(start) = stream.start_position {
                    if let Ok(content) = recover_stream_content(stream.dict.get(b"Length").ok(), buffer, start) {
                        stream.set_content(content);
                    }
                }
            }
        }
    }

    let trailer = find_trailer(buffer).unwrap_or_default();

    Ok(FdfFile { version, trailer, objects })
}

fn recover_stream_content(length: Option<&Object>, buffer: &[u8], start: usize) -> Result<Vec<u8>> {
    if let Some(length) = length.and_then(|v| v.as_i64().ok()).filter(|&n| n >= 0) {
        let end = start + length as usize;
        if end <= buffer.len() && stream_recovery::endstream_follows(&buffer[end..]) {
            return Ok(buffer[start..end].to_vec());
        }
    }
    stream_recovery::scan_for_endstream(buffer, start)
}

/// Walks `buffer` looking for the literal `obj` keyword at a token boundary (so
/// `endobj` is never mistaken for one), then backtracks over `generation SP number`
/// to recover the header's start offset and declared id — the reverse of how
/// `extract_raw_object` walks forward from a known offset.
fn find_object_headers(buffer: &[u8]) -> Vec<(usize, ObjectId)> {
    let mut headers = Vec::new();
    let mut i = 0;
    while i + 3 <= buffer.len() {
        if &buffer[i..i + 3] == b"obj" && (i == 0 || buffer[i - 1].is_ascii_whitespace()) {
            if let Some((start, id)) = parse_header_before(buffer, i) {
                headers.push((start, id));
            }
        }
        i += 1;
    }
    headers
}

fn parse_header_before(buffer: &[u8], obj_pos: usize) -> Option<(usize, ObjectId)> {
    let mut pos = obj_pos;

    pos = skip_whitespace_backward(buffer, pos)?;
    let gen_end = pos;
    let gen_start = skip_digits_backward(buffer, pos);
    if gen_start == gen_end {
        return None;
    }
    let generation: u16 = std::str::from_utf8(&buffer[gen_start..gen_end]).ok()?.parse().ok()?;

    pos = skip_whitespace_backward(buffer, gen_start)?;
    let num_end = pos;
    let num_start = skip_digits_backward(buffer, pos);
    if num_start == num_end {
        return None;
    }
    let number: u32 = std::str::from_utf8(&buffer[num_start..num_end]).ok()?.parse().ok()?;

    Some((num_start, (number, generation)))
}

fn skip_whitespace_backward(buffer: &[u8], mut pos: usize) -> Option<usize> {
    if pos == 0 || !buffer[pos - 1].is_ascii_whitespace() {
        return None;
    }
    while pos > 0 && buffer[pos - 1].is_ascii_whitespace() {
        pos -= 1;
    }
    Some(pos)
}

fn skip_digits_backward(buffer: &[u8], mut pos: usize) -> usize {
    while pos > 0 && buffer[pos - 1].is_ascii_digit() {
        pos -= 1;
    }
    pos
}

/// Looks for a `trailer\n<< ... >>` section, present in some FDF files even without a
/// full xref table.
fn find_trailer(buffer: &[u8]) -> Option<Dictionary> {
    let pos = buffer.windows(7).position(|w| w == b"trailer")?;
    let mut rest = &buffer[pos + 7..];
    while rest.first().is_some_and(|b| b.is_ascii_whitespace()) {
        rest = &rest[1..];
    }
    let (_, dict) = parser::dictionary(ParserInput::new_extra(rest, "trailer")).ok()?;
    Some(dict)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fdf_bytes() -> Vec<u8> {
        b"%FDF-1.2\n\
          1 0 obj\n\
          << /FDF << /Fields 2 0 R >> >>\n\
          endobj\n\
          2 0 obj\n\
          [ << /T (Name) /V (Alice) >> ]\n\
          endobj\n\
          trailer\n\
          << /Root 1 0 R >>\n\
          %%EOF"
            .to_vec()
    }

    #[test]
    fn scans_objects_without_xref() {
        let fdf = open_fdf(&fdf_bytes()).unwrap();
        assert_eq!(fdf.objects.len(), 2);
        assert!(fdf.get_object((1, 0)).is_ok());
        assert!(fdf.get_object((2, 0)).is_ok());
    }

    #[test]
    fn finds_root_via_trailer() {
        let fdf = open_fdf(&fdf_bytes()).unwrap();
        assert_eq!(fdf.root_ref(), Some((1, 0)));
    }

    #[test]
    fn finds_root_without_trailer_via_fdf_key() {
        let mut bytes = fdf_bytes();
        let trailer_pos = bytes.windows(7).position(|w| w == b"trailer").unwrap();
        bytes.truncate(trailer_pos);
        let fdf = open_fdf(&bytes).unwrap();
        assert_eq!(fdf.root_ref(), Some((1, 0)));
    }

    #[test]
    fn recovers_stream_with_bad_length() {
        let body = b"form field payload";
        let pdf = format!(
            "%FDF-1.2\n1 0 obj<</Length 999999>>stream\n{}\nendstream endobj\n",
            String::from_utf8_lossy(body)
        );
        let fdf = open_fdf(pdf.as_bytes()).unwrap();
        let stream = fdf.get_object((1, 0)).unwrap().as_stream().unwrap();
        assert_eq!(stream.content, body);
    }
}
