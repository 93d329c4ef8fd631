//! CMap interpreter: parses a PostScript-flavored CMap stream into
//! codespace ranges, CID ranges, and bfchar/bfrange Unicode mappings, then decodes
//! glyph-code byte sequences into Unicode. The grammar (`parser` submodule) is a nom
//! grammar built out of the same `dictionary`/`dict_dup`/`name`/`hex_char`/`comment`/
//! `eol` primitives the object parser uses, extended to also carry CID ranges and
//! `usecmap` inheritance for full CID CMaps, not just ToUnicode maps.

mod parser;

use std::collections::{HashMap, HashSet};

use thiserror::Error;

/// CMap parse errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CMapParseError {
    #[error("cmap stream is structurally malformed")]
    BadCMap,
    #[error("cmap resource dictionary is malformed")]
    BadCMapDict,
    #[error("cmap comment block is malformed")]
    BadCMapComment,
    #[error("cmap declares no codespace ranges")]
    MissingCodespaces,
    #[error("usecmap inheritance cycle detected")]
    CircularUseCMap,
}

/// A codespace: `(low, high, byte_length)`, `low <= high`, both representable in
/// `byte_length` bytes (1..4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Codespace {
    pub low: u32,
    pub high: u32,
    pub byte_length: u8,
}

/// A CID range: every code in `[low, high]` maps to `first_cid + (code - low)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CidRange {
    pub low: u32,
    pub high: u32,
    pub first_cid: u32,
}

/// A CIDFont's identity: `(Registry, Ordering, Supplement)`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CidSystemInfo {
    pub registry: String,
    pub ordering: String,
    pub supplement: i64,
}

/// A CMap: ordered codespaces, CID ranges, a code->Unicode map, an optional
/// base CMap name, and CIDSystemInfo. Constructed by [`CMap::parse`]; `usecmap`
/// inheritance is resolved by the caller via [`CMap::inherit_from`], since the base
/// CMap's bytes live wherever the caller's font-resource lookup keeps them — this
/// module has no notion of a CMap registry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CMap {
    /// Sorted by `low`.
    pub codespaces: Vec<Codespace>,
    pub cid_ranges: Vec<CidRange>,
    pub code_to_unicode: HashMap<u32, Vec<u16>>,
    pub use_cmap: Option<String>,
    pub cid_system_info: Option<CidSystemInfo>,
    pub cmap_name: Option<String>,
}

/// Result of [`CMap::bytes_to_charcodes`]: the codes recognized so far, and whether
/// matching consumed the entire input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharCodeMatch {
    pub codes: Vec<u32>,
    pub matched: bool,
}

impl CMap {
    /// Parse a complete `/CIDInit /ProcSet findresource begin ...
    /// end end` CMap stream, then resolve its `usecmap` directive (if any) against the
    /// predefined Identity-H/Identity-V CMaps — the only base CMaps resolvable without
    /// a font-resource lookup. A CMap embedded in a font resource whose `usecmap` names
    /// something else (another embedded CMap stream) must go through
    /// [`CMap::parse_with_base`] instead, passing a resolver that can find it.
    pub fn parse(stream_content: &[u8]) -> Result<CMap, CMapParseError> {
        let cmap = parser::parse(stream_content)?;
        cmap.resolve_use_cmap(&|_name| None)
    }

    /// Parse a CMap stream and resolve its `usecmap` chain against `resolver`, a
    /// lookup from base CMap name to an already-parsed `CMap` (e.g. a font resource's
    /// sibling CMaps). Falls back to the predefined Identity-H/Identity-V CMaps when
    /// `resolver` doesn't recognize a name.
    pub fn parse_with_base(
        stream_content: &[u8], resolver: &dyn Fn(&str) -> Option<CMap>,
    ) -> Result<CMap, CMapParseError> {
        let cmap = parser::parse(stream_content)?;
        cmap.resolve_use_cmap(resolver)
    }

    /// Walk this CMap's `usecmap` chain, folding each base's tables in with
    /// [`CMap::inherit_from`] ("the preceding Name identifies a base CMap whose tables
    /// are inherited; the inheritance relation must be acyclic"). A name already seen
    /// earlier in the chain is a cycle and is reported as `CircularUseCMap` rather than
    /// silently dropped, since by this point it can only have arisen from a genuine
    /// loop in the resource graph `resolver` was built from.
    pub fn resolve_use_cmap(mut self, resolver: &dyn Fn(&str) -> Option<CMap>) -> Result<CMap, CMapParseError> {
        let mut seen = HashSet::new();
        if let Some(name) = &self.cmap_name {
            seen.insert(name.clone());
        }
        let mut next = self.use_cmap.clone();
        while let Some(name) = next {
            if !seen.insert(name.clone()) {
                return Err(CMapParseError::CircularUseCMap);
            }
            let Some(base) = resolver(&name).or_else(|| predefined_cmap(&name)) else {
                break;
            };
            next = base.use_cmap.clone();
            self.inherit_from(&base);
        }
        Ok(self)
    }

    /// Fold `base`'s tables into `self` wherever `self` doesn't already define an
    /// entry `usecmap` semantics ("the preceding Name identifies a
    /// base CMap whose tables are inherited"). Call sites are responsible for cycle
    /// detection across the whole resource graph; a self-referential `use_cmap`
    /// collapses to a no-op here rather than erroring, matching "a cycle collapses to
    /// no-base".
    pub fn inherit_from(&mut self, base: &CMap) {
        let mut merged_codespaces = base.codespaces.clone();
        merged_codespaces.extend(self.codespaces.iter().copied());
        merged_codespaces.sort_by_key(|c| c.low);
        self.codespaces = merged_codespaces;

        let mut merged_ranges = base.cid_ranges.clone();
        merged_ranges.extend(self.cid_ranges.iter().copied());
        self.cid_ranges = merged_ranges;

        for (&code, unicode) in &base.code_to_unicode {
            self.code_to_unicode.entry(code).or_insert_with(|| unicode.clone());
        }
        if self.cid_system_info.is_none() {
            self.cid_system_info = base.cid_system_info.clone();
        }
    }

    /// Code matching: walk `data` left-to-right, at each position try
    /// codespaces in ascending `low` order, taking the first whose `byte_length` bytes
    /// form a value in `[low, high]`. Stops (with `matched = false`) at the first
    /// position nothing matches, returning the prefix decoded so far.
    pub fn bytes_to_charcodes(&self, data: &[u8]) -> CharCodeMatch {
        let mut codes = Vec::new();
        let mut pos = 0;
        while pos < data.len() {
            match self.match_one_code(&data[pos..]) {
                Some((code, consumed)) => {
                    codes.push(code);
                    pos += consumed;
                }
                None => return CharCodeMatch { codes, matched: false },
            }
        }
        CharCodeMatch { codes, matched: true }
    }

    fn match_one_code(&self, data: &[u8]) -> Option<(u32, usize)> {
        for cs in &self.codespaces {
            let len = cs.byte_length as usize;
            if len == 0 || len > data.len() || len > 4 {
                continue;
            }
            let value = data[..len].iter().fold(0u32, |acc, &b| (acc << 8) | b as u32);
            if value >= cs.low && value <= cs.high {
                return Some((value, len));
            }
        }
        None
    }

    /// Unicode decoding: match codes, then look each up in
    /// `code_to_unicode`. Unknown codes decode to `U+FFFD` and bump `missing_count`.
    pub fn decode_bytes(&self, data: &[u8]) -> (String, usize) {
        let CharCodeMatch { codes, .. } = self.bytes_to_charcodes(data);
        let mut missing_count = 0;
        let mut units = Vec::with_capacity(codes.len());
        for code in codes {
            match self.code_to_unicode.get(&code) {
                Some(runes) => units.extend_from_slice(runes),
                None => {
                    missing_count += 1;
                    units.push(0xFFFD);
                }
            }
        }
        (String::from_utf16_lossy(&units), missing_count)
    }

    /// CID range lookup: the first range containing `code`, or `None`.
    pub fn cid_for_code(&self, code: u32) -> Option<u32> {
        self.cid_ranges
            .iter()
            .find(|r| code >= r.low && code <= r.high)
            .map(|r| r.first_cid + (code - r.low))
    }

    /// Serialize `code_to_unicode` back into PDF-readable
    /// bfrange/bfchar text, grouping runs of contiguous codes with identical-length
    /// Unicode images into `bfrange` blocks and leaving everything else as `bfchar`
    /// entries, both capped at 100 entries per block.
    pub fn to_cmap_stream(&self) -> Vec<u8> {
        let mut entries: Vec<(u32, &[u16])> =
            self.code_to_unicode.iter().map(|(&code, runes)| (code, runes.as_slice())).collect();
        entries.sort_by_key(|(code, _)| *code);

        let (ranges, chars) = group_into_ranges(&entries);

        let mut out = Vec::new();
        out.extend_from_slice(b"/CIDInit /ProcSet findresource begin\n12 dict begin\nbegincmap\n");
        if let Some(info) = &self.cid_system_info {
            out.extend_from_slice(
                format!(
                    "/CIDSystemInfo << /Registry ({}) /Ordering ({}) /Supplement {} >> def\n",
                    info.registry, info.ordering, info.supplement
                )
                .as_bytes(),
            );
        }
        if let Some(name) = &self.cmap_name {
            out.extend_from_slice(format!("/CMapName /{name} def\n").as_bytes());
        }
        out.extend_from_slice(b"/CMapType 2 def\n");

        if !self.codespaces.is_empty() {
            out.extend_from_slice(format!("{} begincodespacerange\n", self.codespaces.len()).as_bytes());
            for cs in &self.codespaces {
                out.extend_from_slice(
                    format!("<{}> <{}>\n", hex_code(cs.low, cs.byte_length), hex_code(cs.high, cs.byte_length))
                        .as_bytes(),
                );
            }
            out.extend_from_slice(b"endcodespacerange\n");
        }

        for chunk in chars.chunks(100) {
            out.extend_from_slice(format!("{} beginbfchar\n", chunk.len()).as_bytes());
            for (code, runes) in chunk {
                out.extend_from_slice(format!("<{}> <{}>\n", hex_code(*code, 2), hex_runes(runes)).as_bytes());
            }
            out.extend_from_slice(b"endbfchar\n");
        }
        for chunk in ranges.chunks(100) {
            out.extend_from_slice(format!("{} beginbfrange\n", chunk.len()).as_bytes());
            for (low, high, runes) in chunk {
                out.extend_from_slice(
                    format!("<{}> <{}> <{}>\n", hex_code(*low, 2), hex_code(*high, 2), hex_runes(runes)).as_bytes(),
                );
            }
            out.extend_from_slice(b"endbfrange\n");
        }

        out.extend_from_slice(b"endcmap\nCMapName currentdict /CMap defineresource pop\nend\nend");
        out
    }
}

/// Groups contiguous-code, identical-length-image entries into bfrange triples,
/// leaving everything left over as bfchar pairs.
fn group_into_ranges(entries: &[(u32, &[u16])]) -> (Vec<(u32, u32, Vec<u16>)>, Vec<(u32, Vec<u16>)>) {
    let mut ranges = Vec::new();
    let mut chars = Vec::new();
    let mut i = 0;
    while i < entries.len() {
        let (start_code, start_runes) = entries[i];
        let mut end = i;
        while end + 1 < entries.len() {
            let (next_code, next_runes) = entries[end + 1];
            let offset = next_code - start_code;
            if next_code == entries[end].0 + 1 && expected_image(start_runes, offset) == Some(next_runes.to_vec()) {
                end += 1;
            } else {
                break;
            }
        }
        if end > i {
            ranges.push((start_code, entries[end].0, start_runes.to_vec()));
            i = end + 1;
        } else {
            chars.push((start_code, start_runes.to_vec()));
            i += 1;
        }
    }
    (ranges, chars)
}

/// The Unicode image a bfrange entry at `start + offset` must have
/// "mappings are `code -> unicode + (code-LOW)` by incrementing the last rune" — or
/// `None` if incrementing by `offset` would overflow the last rune.
fn expected_image(start: &[u16], offset: u32) -> Option<Vec<u16>> {
    let (last, prefix) = start.split_last()?;
    let incremented = u32::from(*last).checked_add(offset)?;
    if incremented > u32::from(u16::MAX) {
        return None;
    }
    let mut image = prefix.to_vec();
    image.push(incremented as u16);
    Some(image)
}

/// The two predefined identity CMaps every PDF processor recognizes without an
/// embedded stream (ISO 32000-1 §9.7.5.2): every 2-byte code maps directly to the
/// identical CID, so they can be synthesized instead of requiring a font resource
/// lookup for a base CMap name that never has its own stream.
fn predefined_cmap(name: &str) -> Option<CMap> {
    match name {
        "Identity-H" | "Identity-V" => Some(CMap {
            codespaces: vec![Codespace { low: 0x0000, high: 0xFFFF, byte_length: 2 }],
            cid_ranges: vec![CidRange { low: 0x0000, high: 0xFFFF, first_cid: 0x0000 }],
            code_to_unicode: HashMap::new(),
            use_cmap: None,
            cid_system_info: Some(CidSystemInfo {
                registry: "Adobe".to_string(),
                ordering: "Identity".to_string(),
                supplement: 0,
            }),
            cmap_name: Some(name.to_string()),
        }),
        _ => None,
    }
}

fn hex_code(value: u32, byte_length: u8) -> String {
    format!("{:0width$X}", value, width = (byte_length as usize) * 2)
}

fn hex_runes(runes: &[u16]) -> String {
    runes.iter().map(|r| format!("{r:04X}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn simple_cmap() -> CMap {
        CMap {
            codespaces: vec![Codespace { low: 0x0000, high: 0xFFFF, byte_length: 2 }],
            cid_ranges: vec![],
            code_to_unicode: HashMap::from([(0x0041, vec![0x0041]), (0x0042, vec![0x0042])]),
            use_cmap: None,
            cid_system_info: None,
            cmap_name: None,
        }
    }

    #[test]
    fn bytes_to_charcodes_matches_two_byte_codes() {
        let cmap = simple_cmap();
        let result = cmap.bytes_to_charcodes(&[0x00, 0x41, 0x00, 0x42]);
        assert_eq!(result, CharCodeMatch { codes: vec![0x0041, 0x0042], matched: true });
    }

    #[test]
    fn bytes_to_charcodes_stops_at_unmatched_position() {
        let cmap = CMap {
            codespaces: vec![Codespace { low: 0x00, high: 0x7F, byte_length: 1 }],
            ..CMap::default()
        };
        let result = cmap.bytes_to_charcodes(&[0x41, 0xFF]);
        assert_eq!(result, CharCodeMatch { codes: vec![0x41], matched: false });
    }

    #[test]
    fn decode_bytes_reports_missing_as_replacement_char() {
        let cmap = simple_cmap();
        let (text, missing) = cmap.decode_bytes(&[0x00, 0x41, 0x00, 0x99]);
        assert_eq!(text, "A\u{FFFD}");
        assert_eq!(missing, 1);
    }

    #[test]
    fn cid_for_code_applies_offset() {
        let cmap = CMap { cid_ranges: vec![CidRange { low: 0x20, high: 0x7E, first_cid: 1 }], ..CMap::default() };
        assert_eq!(cmap.cid_for_code(0x21), Some(2));
        assert_eq!(cmap.cid_for_code(0x7F), None);
    }

    #[test]
    fn inherit_from_fills_in_missing_entries_only() {
        let base = simple_cmap();
        let mut derived = CMap {
            codespaces: vec![],
            code_to_unicode: HashMap::from([(0x0041, vec![0x0058])]),
            ..CMap::default()
        };
        derived.inherit_from(&base);
        assert_eq!(derived.code_to_unicode[&0x0041], vec![0x0058]);
        assert_eq!(derived.code_to_unicode[&0x0042], vec![0x0042]);
        assert_eq!(derived.codespaces, base.codespaces);
    }

    /// End-to-end: a CMap stream that `usecmap`s a base whose tables the top-level
    /// stream never defines must still resolve a Unicode lookup through
    /// `CMap::parse_with_base`, proving `inherit_from` runs on the real parse path and
    /// not just in isolation.
    #[test]
    fn parse_with_base_inherits_unicode_lookup_from_named_base_cmap() {
        let derived = b"/CIDInit /ProcSet findresource begin
12 dict begin
begincmap
/CMapName /Derived-UCS def
/CMapType 2 def
/Base-UCS usecmap
1 begincodespacerange
<0000> <FFFF>
endcodespacerange
1 beginbfchar
<0099> <0058>
endbfchar
endcmap
CMapName currentdict /CMap defineresource pop
end
end";

        let base = simple_cmap();
        let cmap = CMap::parse_with_base(derived, &|name| (name == "Base-UCS").then(|| base.clone())).unwrap();

        // 0x0041 only exists in the inherited base table; 0x0099 is this CMap's own.
        let (text, missing) = cmap.decode_bytes(&[0x00, 0x41, 0x00, 0x99]);
        assert_eq!(text, "A\u{0058}");
        assert_eq!(missing, 0);
    }

    #[test]
    fn parse_resolves_usecmap_against_predefined_identity_h() {
        let derived = b"/CIDInit /ProcSet findresource begin
12 dict begin
begincmap
/CMapName /Custom-Identity def
/CMapType 2 def
/Identity-H usecmap
1 begincodespacerange
<0000> <FFFF>
endcodespacerange
1 beginbfchar
<0001> <0041>
endbfchar
endcmap
CMapName currentdict /CMap defineresource pop
end
end";

        let cmap = CMap::parse(derived).unwrap();
        assert_eq!(cmap.cid_for_code(0x1234), Some(0x1234));
        assert_eq!(cmap.decode_bytes(&[0x00, 0x01]).0, "A");
    }

    #[test]
    fn resolve_use_cmap_reports_cycle() {
        let mut a = simple_cmap();
        a.cmap_name = Some("A".to_string());
        a.use_cmap = Some("B".to_string());
        let mut b = simple_cmap();
        b.cmap_name = Some("B".to_string());
        b.use_cmap = Some("A".to_string());

        let resolver = move |name: &str| match name {
            "A" => Some(a.clone()),
            "B" => Some(b.clone()),
            _ => None,
        };

        let mut start = simple_cmap();
        start.cmap_name = Some("A".to_string());
        start.use_cmap = Some("B".to_string());
        assert_eq!(start.resolve_use_cmap(&resolver), Err(CMapParseError::CircularUseCMap));
    }

    #[test]
    fn round_trips_through_encoding_writer() {
        let cmap = simple_cmap();
        let stream = cmap.to_cmap_stream();
        let reparsed = CMap::parse(&stream).unwrap();
        assert_eq!(reparsed.code_to_unicode, cmap.code_to_unicode);
        assert_eq!(reparsed.codespaces, cmap.codespaces);
    }

    #[test]
    fn group_into_ranges_groups_contiguous_incrementing_codes() {
        let entries: Vec<(u32, &[u16])> =
            vec![(0x20, &[0x0020]), (0x21, &[0x0021]), (0x22, &[0x0022]), (0x30, &[0x0030])];
        let (ranges, chars) = group_into_ranges(&entries);
        assert_eq!(ranges, vec![(0x20, 0x22, vec![0x0020])]);
        assert_eq!(chars, vec![(0x30, vec![0x0030])]);
    }
}
