//! The cross-reference resolver's public face: a `Document` owns
//! the fully materialized object table, trailer, and xref for one PDF, and exposes the
//! `resolve`/`resolve_all`/`dereference` contract higher layers consume. Grounded in the
//! teacher's own `reader/*.rs` call sites, which already assume exactly this field and
//! method surface (`document.trailer`, `document.objects`, `document.reference_table`,
//! `document.get_object`, `document.dereference`, `document.authenticate_password`).

use std::collections::BTreeMap;

use crate::dictionary::Dictionary;
use crate::encryption::EncryptionState;
use crate::error::{Diagnostic, Error};
use crate::object::{Object, ObjectId};
use crate::xref::{Xref, XrefType};
use crate::Result;

/// A loaded PDF document: header version, trailer, cross-reference table, and the
/// (eagerly materialized) object table 's `resolve_all` produces.
#[derive(Debug, Clone)]
pub struct Document {
    pub version: String,
    pub max_id: u32,
    pub xref_start: usize,
    pub binary_mark: Vec<u8>,
    pub trailer: Dictionary,
    pub reference_table: Xref,
    pub objects: BTreeMap<ObjectId, Object>,
    pub encryption_state: Option<EncryptionState>,
    /// Non-fatal recoveries accumulated during load, queryable even without
    /// a configured `log` subscriber.
    pub diagnostics: Vec<Diagnostic>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        Document {
            version: String::new(),
            max_id: 0,
            xref_start: 0,
            binary_mark: Vec::new(),
            trailer: Dictionary::new(),
            reference_table: Xref::new(0, XrefType::CrossReferenceTable),
            objects: BTreeMap::new(),
            encryption_state: None,
            diagnostics: Vec::new(),
        }
    }

    pub(crate) fn push_diagnostic(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    /// `%PDF-X.Y`'s `X.Y`.
    pub fn header_version(&self) -> &str {
        &self.version
    }

    /// `root_ref`.
    pub fn root_ref(&self) -> Result<ObjectId> {
        self.trailer.get(b"Root").and_then(Object::as_reference)
    }

    /// `info_ref` (optional — not every PDF carries an Info dictionary).
    pub fn info_ref(&self) -> Option<ObjectId> {
        self.trailer.get(b"Info").ok().and_then(|o| o.as_reference().ok())
    }

    /// `trailer_id`: the `/ID` array's two byte strings, if present.
    pub fn trailer_id(&self) -> Option<(Vec<u8>, Vec<u8>)> {
        let arr = self.trailer.get(b"ID").and_then(Object::as_array).ok()?;
        let first = arr.first()?.as_string_bytes().ok()?.to_vec();
        let second = arr.get(1)?.as_string_bytes().ok()?.to_vec();
        Some((first, second))
    }

    /// `encrypt_info`.
    pub fn encrypt_info(&self) -> Option<&EncryptionState> {
        self.encryption_state.as_ref()
    }

    /// Authenticate `password` against this document's `/Encrypt` dictionary, deriving
    /// (but not installing) the resulting `EncryptionState`.
    pub fn authenticate_password(&self, password: &str) -> Result<EncryptionState> {
        EncryptionState::decode(self, password)
    }

    /// Look up an already-materialized object by id. A missing or Free entry is not an
    /// error at this layer — callers that want 's "Free → Null" semantics
    /// should use `resolve` instead.
    pub fn get_object(&self, id: ObjectId) -> Result<&Object> {
        self.objects.get(&id).ok_or(Error::MissingXrefEntry)
    }

    pub fn get_object_mut(&mut self, id: ObjectId) -> Result<&mut Object> {
        self.objects.get_mut(&id).ok_or(Error::MissingXrefEntry)
    }

    pub fn get_dictionary(&self, id: ObjectId) -> Result<&Dictionary> {
        self.get_object(id).and_then(Object::as_dict)
    }

    /// `resolve`: expand a single indirect reference to its direct object.
    /// A dangling reference resolves to `Null`, per spec — not an error.
    pub fn resolve(&self, object: &Object) -> Result<Object> {
        match object {
            Object::Reference(id) => Ok(self.objects.get(id).cloned().unwrap_or(Object::Null)),
            other => Ok(other.clone()),
        }
    }

    /// Like `resolve`, but also returns the id that was dereferenced (,
    /// used by stream-length resolution when `/Length` is itself indirect). Non-reference
    /// input is returned unchanged, paired with `id` unchanged — there is no "its own id"
    /// concept for a direct value embedded inline.
    pub fn dereference<'a>(&'a self, object: &'a Object) -> Result<(ObjectId, &'a Object)> {
        match object {
            Object::Reference(id) => self.objects.get(id).map(|o| (*id, o)).ok_or(Error::MissingXrefEntry),
            other => Ok(((0, 0), other)),
        }
    }

    /// `resolve_all`: the full materialized object table. Since loading is
    /// eager (see `reader::load_objects_raw`), this is simply the stored map.
    pub fn resolve_all(&self) -> &BTreeMap<ObjectId, Object> {
        &self.objects
    }

    /// `decode_all_streams`: run every stream's filter chain once at
    /// load time, purely to surface `UnsupportedFilter`/`InvalidStream` failures as
    /// diagnostics immediately rather than leaving them to whenever a caller happens
    /// to ask for decoded bytes (lazy decoding remains the default; this
    /// is an opt-in eager pass, and the result is discarded — decoding stays pure and
    /// cache-free).
    pub(crate) fn decode_all_streams_eagerly(&mut self) {
        let mut failures = Vec::new();
        for (&id, object) in self.objects.iter() {
            if let Object::Stream(stream) = object {
                if let Err(e) = stream.decompressed_content() {
                    failures.push((id, e.to_string()));
                }
            }
        }
        for (id, message) in failures {
            self.push_diagnostic(Diagnostic { object: Some(id), offset: None, message });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_returns_null_for_dangling_reference() {
        let doc = Document::new();
        let resolved = doc.resolve(&Object::Reference((7, 0))).unwrap();
        assert_eq!(resolved, Object::Null);
    }

    #[test]
    fn resolve_passes_through_direct_values() {
        let doc = Document::new();
        let resolved = doc.resolve(&Object::Integer(42)).unwrap();
        assert_eq!(resolved, Object::Integer(42));
    }

    #[test]
    fn root_ref_reads_trailer() {
        let mut doc = Document::new();
        doc.trailer.set(b"Root".to_vec(), Object::Reference((3, 0)));
        assert_eq!(doc.root_ref().unwrap(), (3, 0));
    }

    #[test]
    fn trailer_id_reads_both_halves() {
        let mut doc = Document::new();
        doc.trailer.set(
            b"ID".to_vec(),
            Object::Array(vec![Object::string_literal(b"abc".to_vec()), Object::string_literal(b"xyz".to_vec())]),
        );
        let (a, b) = doc.trailer_id().unwrap();
        assert_eq!(a, b"abc");
        assert_eq!(b, b"xyz");
    }
}
