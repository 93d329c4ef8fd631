use std::collections::BTreeMap;

/// Where an object's xref type came from — a classic `xref` table section or an
/// `/Type /XRef` stream. Kept mainly for diagnostics; resolution
/// logic does not branch on it once the table is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XrefType {
    CrossReferenceTable,
    CrossReferenceStream,
}

/// One row of the cross-reference table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XrefEntry {
    /// Not present in the document.
    Free { next_free: u32 },
    /// Resolvable at `offset` in the source, generation `generation`.
    Normal { offset: u32, generation: u16 },
    /// Packed inside the object stream `container`, at index `index`.
    Compressed { container: u32, index: u16 },
    /// A free entry with no well-formed "next free" chain (e.g. an xref-stream
    /// type-0 record with field2/field3 both zero after the head-of-list sentinel).
    UnusableFree,
}

/// The full cross-reference table for one document, after chasing every `/Prev`
/// revision.
#[derive(Debug, Clone)]
pub struct Xref {
    pub entries: BTreeMap<u32, XrefEntry>,
    pub size: u32,
    pub xref_type: XrefType,
}

impl Xref {
    pub fn new(size: u32, xref_type: XrefType) -> Self {
        Xref { entries: BTreeMap::new(), size, xref_type }
    }

    pub fn insert(&mut self, id: u32, entry: XrefEntry) {
        self.entries.entry(id).or_insert(entry);
    }

    /// Force-set an entry, overwriting whatever was there. Used only by the main
    /// (newest) xref section before `merge` folds in older revisions, since within
    /// one section later duplicate records are not expected but are still handled
    /// last-wins per the PDF writer's own section.
    pub fn set(&mut self, id: u32, entry: XrefEntry) {
        self.entries.insert(id, entry);
    }

    pub fn get(&self, id: u32) -> Option<&XrefEntry> {
        self.entries.get(&id)
    }

    /// Fold an older xref revision into this (newer) one. Entries already present in
    /// `self` win — `self` is the newer table walking backwards via `/Prev`.
    pub fn merge(&mut self, prev: Xref) {
        for (id, entry) in prev.entries {
            self.entries.entry(id).or_insert(entry);
        }
        if prev.size > self.size {
            self.size = prev.size;
        }
    }

    pub fn max_id(&self) -> u32 {
        self.entries.keys().next_back().copied().unwrap_or(0)
    }
}
