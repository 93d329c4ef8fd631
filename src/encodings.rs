//! Shared encodings layer: the static Type1 simple-font encodings plus PDFDocEncoding,
//! and the text-string/date decoding rules that let higher layers turn a raw byte
//! string into Unicode. `encoding_rs` covers input byte decoding only, not output
//! Type1 encoding tables, so these are plain static arrays plus a
//! `std::sync::LazyLock` inverse map.

use std::sync::LazyLock;

/// One of the four Type1 simple-font encodings PDF viewers must support natively,
/// plus the ISO 32000-1 Annex D text-string encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Standard,
    WinAnsi,
    MacRoman,
    MacExpert,
    PdfDoc,
}

fn build_table(overrides: &[(u8, u32)]) -> [u32; 256] {
    let mut table = [0u32; 256];
    for (byte, slot) in table.iter_mut().enumerate() {
        if byte < 0x80 {
            *slot = byte as u32;
        }
    }
    for &(byte, codepoint) in overrides {
        table[byte as usize] = codepoint;
    }
    table
}

// StandardEncoding (Adobe Standard Encoding, PDF 1.7 Annex D.2). ASCII printable range
// matches except for the two quote glyphs, which StandardEncoding gives curly forms.
static STANDARD_OVERRIDES: &[(u8, u32)] = &[
    (0x27, 0x2019), // quoteright
    (0x60, 0x2018), // quoteleft
    (0xA1, 0x00A1), // exclamdown
    (0xA2, 0x00A2), // cent
    (0xA3, 0x00A3), // sterling
    (0xA4, 0x2044), // fraction
    (0xA5, 0x00A5), // yen
    (0xA6, 0x0192), // florin
    (0xA7, 0x00A7), // section
    (0xA8, 0x00A4), // currency
    (0xA9, 0x0027), // quotesingle
    (0xAA, 0x201C), // quotedblleft
    (0xAB, 0x00AB), // guillemotleft
    (0xAC, 0x2039), // guilsinglleft
    (0xAD, 0x203A), // guilsinglright
    (0xAE, 0xFB01), // fi
    (0xAF, 0xFB02), // fl
    (0xB1, 0x2013), // endash
    (0xB2, 0x2020), // dagger
    (0xB3, 0x2021), // daggerdbl
    (0xB4, 0x00B7), // periodcentered
    (0xB6, 0x00B6), // paragraph
    (0xB7, 0x2022), // bullet
    (0xB8, 0x201A), // quotesinglbase
    (0xB9, 0x201E), // quotedblbase
    (0xBA, 0x201D), // quotedblright
    (0xBB, 0x00BB), // guillemotright
    (0xBC, 0x2026), // ellipsis
    (0xBD, 0x2030), // perthousand
    (0xBF, 0x00BF), // questiondown
    (0xC1, 0x0060), // grave
    (0xC2, 0x00B4), // acute
    (0xC3, 0x02C6), // circumflex
    (0xC4, 0x02DC), // tilde
    (0xC5, 0x00AF), // macron
    (0xC6, 0x02D8), // breve
    (0xC7, 0x02D9), // dotaccent
    (0xC8, 0x00A8), // dieresis
    (0xCA, 0x02DA), // ring
    (0xCB, 0x00B8), // cedilla
    (0xCD, 0x02DD), // hungarumlaut
    (0xCE, 0x02DB), // ogonek
    (0xCF, 0x02C7), // caron
    (0xD0, 0x2014), // emdash
    (0xE1, 0x00C6), // AE
    (0xE3, 0x00AA), // ordfeminine
    (0xE8, 0x0141), // Lslash
    (0xE9, 0x00D8), // Oslash
    (0xEA, 0x0152), // OE
    (0xEB, 0x00BA), // ordmasculine
    (0xF1, 0x00E6), // ae
    (0xF5, 0x0131), // dotlessi
    (0xF8, 0x0142), // lslash
    (0xF9, 0x00F8), // oslash
    (0xFA, 0x0153), // oe
    (0xFB, 0x00DF), // germandbls
];

// WinAnsiEncoding: Windows code page 1252, upper 128 only (0x00-0x7F already ASCII-transparent).
static WINANSI_OVERRIDES: &[(u8, u32)] = &[
    (0x80, 0x20AC),
    (0x82, 0x201A),
    (0x83, 0x0192),
    (0x84, 0x201E),
    (0x85, 0x2026),
    (0x86, 0x2020),
    (0x87, 0x2021),
    (0x88, 0x02C6),
    (0x89, 0x2030),
    (0x8A, 0x0160),
    (0x8B, 0x2039),
    (0x8C, 0x0152),
    (0x8E, 0x017D),
    (0x91, 0x2018),
    (0x92, 0x2019),
    (0x93, 0x201C),
    (0x94, 0x201D),
    (0x95, 0x2022),
    (0x96, 0x2013),
    (0x97, 0x2014),
    (0x98, 0x02DC),
    (0x99, 0x2122),
    (0x9A, 0x0161),
    (0x9B, 0x203A),
    (0x9C, 0x0153),
    (0x9E, 0x017E),
    (0x9F, 0x0178),
    (0xA0, 0x00A0),
    (0xA1, 0x00A1),
    (0xA2, 0x00A2),
    (0xA3, 0x00A3),
    (0xA4, 0x00A4),
    (0xA5, 0x00A5),
    (0xA6, 0x00A6),
    (0xA7, 0x00A7),
    (0xA8, 0x00A8),
    (0xA9, 0x00A9),
    (0xAA, 0x00AA),
    (0xAB, 0x00AB),
    (0xAC, 0x00AC),
    (0xAD, 0x00AD),
    (0xAE, 0x00AE),
    (0xAF, 0x00AF),
    (0xB0, 0x00B0),
    (0xB1, 0x00B1),
    (0xB2, 0x00B2),
    (0xB3, 0x00B3),
    (0xB4, 0x00B4),
    (0xB5, 0x00B5),
    (0xB6, 0x00B6),
    (0xB7, 0x00B7),
    (0xB8, 0x00B8),
    (0xB9, 0x00B9),
    (0xBA, 0x00BA),
    (0xBB, 0x00BB),
    (0xBC, 0x00BC),
    (0xBD, 0x00BD),
    (0xBE, 0x00BE),
    (0xBF, 0x00BF),
];

// MacRomanEncoding, upper 128.
static MACROMAN_OVERRIDES: &[(u8, u32)] = &[
    (0x80, 0x00C4),
    (0x81, 0x00C5),
    (0x82, 0x00C7),
    (0x83, 0x00C9),
    (0x84, 0x00D1),
    (0x85, 0x00D6),
    (0x86, 0x00DC),
    (0x87, 0x00E1),
    (0x88, 0x00E0),
    (0x89, 0x00E2),
    (0x8A, 0x00E4),
    (0x8B, 0x00E3),
    (0x8C, 0x00E5),
    (0x8D, 0x00E7),
    (0x8E, 0x00E9),
    (0x8F, 0x00E8),
    (0x90, 0x00EA),
    (0x91, 0x00EB),
    (0x92, 0x00ED),
    (0x93, 0x00EC),
    (0x94, 0x00EE),
    (0x95, 0x00EF),
    (0x96, 0x00F1),
    (0x97, 0x00F3),
    (0x98, 0x00F2),
    (0x99, 0x00F4),
    (0x9A, 0x00F6),
    (0x9B, 0x00F5),
    (0x9C, 0x00FA),
    (0x9D, 0x00F9),
    (0x9E, 0x00FB),
    (0x9F, 0x00FC),
    (0xA0, 0x2020),
    (0xA1, 0x00B0),
    (0xA2, 0x00A2),
    (0xA3, 0x00A3),
    (0xA4, 0x00A7),
    (0xA5, 0x2022),
    (0xA6, 0x00B6),
    (0xA7, 0x00DF),
    (0xA8, 0x00AE),
    (0xA9, 0x00A9),
    (0xAA, 0x2122),
    (0xAB, 0x00B4),
    (0xAC, 0x00A8),
    (0xAD, 0x2260),
    (0xAE, 0x00C6),
    (0xAF, 0x00D8),
    (0xB0, 0x221E),
    (0xB1, 0x00B1),
    (0xB2, 0x2264),
    (0xB3, 0x2265),
    (0xB4, 0x00A5),
    (0xB5, 0x00B5),
    (0xB6, 0x2202),
    (0xB7, 0x2211),
    (0xB8, 0x220F),
    (0xB9, 0x03C0),
    (0xBA, 0x222B),
    (0xBB, 0x00AA),
    (0xBC, 0x00BA),
    (0xBD, 0x03A9),
    (0xBE, 0x00E6),
    (0xBF, 0x00F8),
    (0xC0, 0x00BF),
    (0xC1, 0x00A1),
    (0xC2, 0x00AC),
    (0xC3, 0x221A),
    (0xC4, 0x0192),
    (0xC5, 0x2248),
    (0xC6, 0x2206),
    (0xC7, 0x00AB),
    (0xC8, 0x00BB),
    (0xC9, 0x2026),
    (0xCA, 0x00A0),
    (0xCB, 0x00C0),
    (0xCC, 0x00C3),
    (0xCD, 0x00D5),
    (0xCE, 0x0152),
    (0xCF, 0x0153),
    (0xD0, 0x2013),
    (0xD1, 0x2014),
    (0xD2, 0x201C),
    (0xD3, 0x201D),
    (0xD4, 0x2018),
    (0xD5, 0x2019),
    (0xD6, 0x00F7),
    (0xD7, 0x25CA),
    (0xD8, 0x00FF),
    (0xD9, 0x0178),
    (0xDA, 0x2044),
    (0xDB, 0x20AC),
    (0xDC, 0x2039),
    (0xDD, 0x203A),
    (0xDE, 0xFB01),
    (0xDF, 0xFB02),
    (0xE0, 0x2021),
    (0xE1, 0x00B7),
    (0xE2, 0x201A),
    (0xE3, 0x201E),
    (0xE4, 0x2030),
    (0xE5, 0x00C2),
    (0xE6, 0x00CA),
    (0xE7, 0x00C1),
    (0xE8, 0x00CB),
    (0xE9, 0x00C8),
    (0xEA, 0x00CD),
    (0xEB, 0x00CE),
    (0xEC, 0x00CF),
    (0xED, 0x00CC),
    (0xEE, 0x00D3),
    (0xEF, 0x00D4),
    (0xF0, 0xF8FF),
    (0xF1, 0x00D2),
    (0xF2, 0x00DA),
    (0xF3, 0x00DB),
    (0xF4, 0x00D9),
    (0xF5, 0x0131),
    (0xF6, 0x02C6),
    (0xF7, 0x02DC),
    (0xF8, 0x00AF),
    (0xF9, 0x02D8),
    (0xFA, 0x02D9),
    (0xFB, 0x02DA),
    (0xFC, 0x00B8),
    (0xFD, 0x02DD),
    (0xFE, 0x02DB),
    (0xFF, 0x02C7),
];

// MacExpertEncoding: a narrow, rarely-used small-caps/old-style-figures encoding.
// Most slots genuinely have no sensible Unicode target; left undefined (0) rather
// than guessed "opaque byte arrays" note for anything the higher
// layers can't confidently decode.
static MACEXPERT_OVERRIDES: &[(u8, u32)] = &[
    (0xA1, 0x2026), // ellipsis
    (0xA9, 0x2044), // fraction
    (0xBF, 0x2013), // endash (old-style variant position)
];

// PDFDocEncoding, ISO 32000-1 Annex D.3. Matches WinAnsi above 0x9F; below that it
// carries its own 0x18-0x1F and 0x80-0x9F blocks.
static PDFDOC_OVERRIDES: &[(u8, u32)] = &[
    (0x18, 0x02D8),
    (0x19, 0x02C7),
    (0x1A, 0x02C6),
    (0x1B, 0x02D9),
    (0x1C, 0x02DD),
    (0x1D, 0x02DB),
    (0x1E, 0x02DA),
    (0x1F, 0x02DC),
    (0x80, 0x2022),
    (0x81, 0x2020),
    (0x82, 0x2021),
    (0x83, 0x2026),
    (0x84, 0x2014),
    (0x85, 0x2013),
    (0x86, 0x0192),
    (0x87, 0x2044),
    (0x88, 0x2039),
    (0x89, 0x203A),
    (0x8A, 0x2212),
    (0x8B, 0x2030),
    (0x8C, 0x201E),
    (0x8D, 0x201C),
    (0x8E, 0x201D),
    (0x8F, 0x2018),
    (0x90, 0x2019),
    (0x91, 0x201A),
    (0x92, 0x2122),
    (0x93, 0xFB01),
    (0x94, 0xFB02),
    (0x95, 0x0141),
    (0x96, 0x0152),
    (0x97, 0x0160),
    (0x98, 0x0178),
    (0x99, 0x017D),
    (0x9A, 0x0131),
    (0x9B, 0x0142),
    (0x9C, 0x0153),
    (0x9D, 0x0161),
    (0x9E, 0x017E),
    (0xA0, 0x20AC),
    (0xA1, 0x00A1),
    (0xA2, 0x00A2),
    (0xA3, 0x00A3),
    (0xA4, 0x00A4),
    (0xA5, 0x00A5),
    (0xA6, 0x00A6),
    (0xA7, 0x00A7),
    (0xA8, 0x00A8),
    (0xA9, 0x00A9),
    (0xAA, 0x00AA),
    (0xAB, 0x00AB),
    (0xAC, 0x00AC),
    (0xAD, 0x00AD),
    (0xAE, 0x00AE),
    (0xAF, 0x00AF),
    (0xB0, 0x00B0),
    (0xB1, 0x00B1),
    (0xB2, 0x00B2),
    (0xB3, 0x00B3),
    (0xB4, 0x00B4),
    (0xB5, 0x00B5),
    (0xB6, 0x00B6),
    (0xB7, 0x00B7),
    (0xB8, 0x00B8),
    (0xB9, 0x00B9),
    (0xBA, 0x00BA),
    (0xBB, 0x00BB),
    (0xBC, 0x00BC),
    (0xBD, 0x00BD),
    (0xBE, 0x00BE),
    (0xBF, 0x00BF),
];

static STANDARD_TABLE: LazyLock<[u32; 256]> = LazyLock::new(|| build_table(STANDARD_OVERRIDES));
static WINANSI_TABLE: LazyLock<[u32; 256]> = LazyLock::new(|| build_table(WINANSI_OVERRIDES));
static MACROMAN_TABLE: LazyLock<[u32; 256]> = LazyLock::new(|| build_table(MACROMAN_OVERRIDES));
static MACEXPERT_TABLE: LazyLock<[u32; 256]> = LazyLock::new(|| {
    let mut table = build_table(MACEXPERT_OVERRIDES);
    // Outside ASCII and the handful of overrides above, MacExpertEncoding has no
    // reasonable Unicode target; blank the rest of the upper range.
    for slot in table.iter_mut().skip(0x80) {
        if MACEXPERT_OVERRIDES.iter().all(|&(_, cp)| cp != *slot) {
            *slot = 0;
        }
    }
    table
});
static PDFDOC_TABLE: LazyLock<[u32; 256]> = LazyLock::new(|| build_table(PDFDOC_OVERRIDES));

fn table_for(encoding: Encoding) -> &'static [u32; 256] {
    match encoding {
        Encoding::Standard => &STANDARD_TABLE,
        Encoding::WinAnsi => &WINANSI_TABLE,
        Encoding::MacRoman => &MACROMAN_TABLE,
        Encoding::MacExpert => &MACEXPERT_TABLE,
        Encoding::PdfDoc => &PDFDOC_TABLE,
    }
}

fn inverse_for(encoding: Encoding) -> &'static LazyLock<std::collections::HashMap<u32, u8>> {
    static STANDARD_INV: LazyLock<std::collections::HashMap<u32, u8>> = LazyLock::new(|| invert(Encoding::Standard));
    static WINANSI_INV: LazyLock<std::collections::HashMap<u32, u8>> = LazyLock::new(|| invert(Encoding::WinAnsi));
    static MACROMAN_INV: LazyLock<std::collections::HashMap<u32, u8>> = LazyLock::new(|| invert(Encoding::MacRoman));
    static MACEXPERT_INV: LazyLock<std::collections::HashMap<u32, u8>> = LazyLock::new(|| invert(Encoding::MacExpert));
    static PDFDOC_INV: LazyLock<std::collections::HashMap<u32, u8>> = LazyLock::new(|| invert(Encoding::PdfDoc));
    match encoding {
        Encoding::Standard => &STANDARD_INV,
        Encoding::WinAnsi => &WINANSI_INV,
        Encoding::MacRoman => &MACROMAN_INV,
        Encoding::MacExpert => &MACEXPERT_INV,
        Encoding::PdfDoc => &PDFDOC_INV,
    }
}

fn invert(encoding: Encoding) -> std::collections::HashMap<u32, u8> {
    let table = table_for(encoding);
    let mut map = std::collections::HashMap::with_capacity(256);
    for (byte, &codepoint) in table.iter().enumerate() {
        if codepoint != 0 {
            map.entry(codepoint).or_insert(byte as u8);
        }
    }
    map
}

/// Decode one byte of `encoding` to its Unicode scalar value, or `None` if the byte
/// has no assigned glyph in that encoding.
pub fn decode_byte(encoding: Encoding, byte: u8) -> Option<char> {
    let codepoint = table_for(encoding)[byte as usize];
    if codepoint == 0 && byte != 0 {
        None
    } else {
        char::from_u32(codepoint)
    }
}

/// Decode a full byte string under one simple-font encoding.
pub fn decode_string(encoding: Encoding, bytes: &[u8]) -> String {
    bytes.iter().map(|&b| decode_byte(encoding, b).unwrap_or('\u{FFFD}')).collect()
}

/// Encode `ch` to its byte in `encoding`, if representable.
pub fn encode_char(encoding: Encoding, ch: char) -> Option<u8> {
    inverse_for(encoding).get(&(ch as u32)).copied()
}

/// Decode a PDF text string, choosing UTF-16BE when the bytes start with the `FE FF`
/// byte-order mark, PDFDocEncoding otherwise.
pub fn decode_text_string(bytes: &[u8]) -> String {
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let units: Vec<u16> =
            bytes[2..].chunks_exact(2).map(|pair| u16::from_be_bytes([pair[0], pair[1]])).collect();
        String::from_utf16_lossy(&units)
    } else {
        decode_string(Encoding::PdfDoc, bytes)
    }
}

/// A parsed PDF date: `D:YYYY[MM[DD[HH[mm[SS[OHH'mm']]]]]]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PdfDate {
    pub year: i32,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    /// Offset from UTC in minutes; `0` for both `Z` and the omitted-offset case.
    pub offset_minutes: i32,
}

impl Default for PdfDate {
    fn default() -> Self {
        PdfDate { year: 0, month: 1, day: 1, hour: 0, minute: 0, second: 0, offset_minutes: 0 }
    }
}

/// Parse a PDF date string. Accepts both `Z00'00'` and the trailing-apostrophe-less
/// variant, and any truncation point after the 4-digit year.
pub fn parse_pdf_date(bytes: &[u8]) -> Option<PdfDate> {
    let s = std::str::from_utf8(bytes).ok()?;
    let s = s.strip_prefix("D:").unwrap_or(s);
    if s.len() < 4 {
        return None;
    }

    let mut date = PdfDate::default();
    date.year = s.get(0..4)?.parse().ok()?;
    let mut rest = &s[4..];

    let mut take_field = |rest: &mut &str, width: usize| -> Option<u8> {
        if rest.len() < width || !rest.as_bytes()[..width].iter().all(u8::is_ascii_digit) {
            return None;
        }
        let (field, tail) = rest.split_at(width);
        *rest = tail;
        field.parse().ok()
    };

    if let Some(month) = take_field(&mut rest, 2) {
        date.month = month;
    } else {
        return Some(date);
    }
    if let Some(day) = take_field(&mut rest, 2) {
        date.day = day;
    } else {
        return Some(date);
    }
    if let Some(hour) = take_field(&mut rest, 2) {
        date.hour = hour;
    } else {
        return Some(date);
    }
    if let Some(minute) = take_field(&mut rest, 2) {
        date.minute = minute;
    } else {
        return Some(date);
    }
    if let Some(second) = take_field(&mut rest, 2) {
        date.second = second;
    } else {
        return Some(date);
    }

    match rest.chars().next() {
        Some('Z') | None => {}
        Some(sign @ ('+' | '-')) => {
            rest = &rest[1..];
            let oh: i32 = take_field(&mut rest, 2)? as i32;
            let om = if let Some(tail) = rest.strip_prefix('\'') {
                rest = tail;
                take_field(&mut rest, 2).unwrap_or(0) as i32
            } else {
                0
            };
            let magnitude = oh * 60 + om;
            date.offset_minutes = if sign == '-' { -magnitude } else { magnitude };
        }
        _ => {}
    }

    Some(date)
}

/// Serialize a [`PdfDate`] back to `D:YYYYMMDDHHmmSSOHH'mm'` form, the inverse of
/// [`parse_pdf_date`].
pub fn format_pdf_date(date: &PdfDate) -> String {
    let (sign, magnitude) =
        if date.offset_minutes < 0 { ('-', -date.offset_minutes) } else { ('+', date.offset_minutes) };
    format!(
        "D:{:04}{:02}{:02}{:02}{:02}{:02}{}{:02}'{:02}'",
        date.year, date.month, date.day, date.hour, date.minute, date.second, sign, magnitude / 60, magnitude % 60
    )
}

#[cfg(feature = "chrono")]
impl TryFrom<PdfDate> for chrono::DateTime<chrono::FixedOffset> {
    type Error = ();

    fn try_from(date: PdfDate) -> Result<Self, ()> {
        use chrono::{FixedOffset, TimeZone};
        let offset = FixedOffset::east_opt(date.offset_minutes * 60).ok_or(())?;
        offset
            .with_ymd_and_hms(date.year, date.month as u32, date.day as u32, date.hour as u32, date.minute as u32, date.second as u32)
            .single()
            .ok_or(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_range_is_identity_across_all_encodings() {
        for &enc in &[Encoding::Standard, Encoding::WinAnsi, Encoding::MacRoman, Encoding::PdfDoc] {
            assert_eq!(decode_byte(enc, b'A'), Some('A'));
            assert_eq!(decode_byte(enc, b'0'), Some('0'));
        }
    }

    #[test]
    fn winansi_euro_sign() {
        assert_eq!(decode_byte(Encoding::WinAnsi, 0x80), Some('\u{20AC}'));
    }

    #[test]
    fn macroman_adieresis() {
        assert_eq!(decode_byte(Encoding::MacRoman, 0x80), Some('Ä'));
    }

    #[test]
    fn encode_char_round_trips_winansi() {
        let byte = encode_char(Encoding::WinAnsi, '\u{20AC}').unwrap();
        assert_eq!(byte, 0x80);
    }

    #[test]
    fn decode_text_string_detects_utf16_bom() {
        let mut bytes = vec![0xFE, 0xFF];
        for unit in "Hi".encode_utf16() {
            bytes.extend_from_slice(&unit.to_be_bytes());
        }
        assert_eq!(decode_text_string(&bytes), "Hi");
    }

    #[test]
    fn decode_text_string_falls_back_to_pdfdoc() {
        assert_eq!(decode_text_string(b"Hi"), "Hi");
    }

    #[test]
    fn parse_pdf_date_full_with_offset() {
        let date = parse_pdf_date(b"D:19990101120000-05'00'").unwrap();
        assert_eq!(date, PdfDate { year: 1999, month: 1, day: 1, hour: 12, minute: 0, second: 0, offset_minutes: -300 });
    }

    #[test]
    fn parse_pdf_date_z_offset_without_apostrophes() {
        let date = parse_pdf_date(b"D:20230615103000Z").unwrap();
        assert_eq!(date.offset_minutes, 0);
        assert_eq!(date.year, 2023);
    }

    #[test]
    fn parse_pdf_date_year_only() {
        let date = parse_pdf_date(b"D:2005").unwrap();
        assert_eq!(date, PdfDate { year: 2005, ..PdfDate::default() });
    }

    #[test]
    fn format_pdf_date_round_trips_fields() {
        let date = PdfDate { year: 2024, month: 3, day: 9, hour: 8, minute: 15, second: 0, offset_minutes: 120 };
        let formatted = format_pdf_date(&date);
        assert_eq!(parse_pdf_date(formatted.as_bytes()).unwrap(), date);
    }
}
