//! nom grammar for the PostScript-flavored CMap syntax. Reuses the object parser's
//! `dictionary`/`dict_dup`/`name`/`hex_char`/`comment`/`eol` primitives directly,
//! building the CMap grammar on top of the PDF object grammar rather than standing up
//! a separate lexer. Extended here with `begincidrange`/`endcidrange` and `usecmap`,
//! which a ToUnicode-only CMap never needs but a full CID CMap does.

use std::collections::HashMap;

use nom::branch::alt;
use nom::bytes::complete::tag;
use nom::character::complete::digit1;
use nom::combinator::{map, opt};
use nom::multi::{fold_many0, fold_many1, fold_many_m_n, many0, many1, many_m_n, separated_list1};
use nom::sequence::{delimited, pair, preceded, separated_pair, terminated};
use nom::Parser;

use super::{CMap, CMapParseError, CidRange, CidSystemInfo, Codespace};
use crate::parser::{comment, dict_dup, dictionary, eol, hex_char, name, NomResult, ParserInput};
use crate::Dictionary;

type SourceCode = (u32, u8);
type SourceRangeMapping = ((u32, u32, u8), Vec<Vec<u16>>);
type SourceCharMapping = ((u32, u8), Vec<u16>);

enum CMapSection {
    CsRange(Vec<(u32, u32, u8)>),
    BfChar(Vec<SourceCharMapping>),
    BfRange(Vec<SourceRangeMapping>),
    CidRange(Vec<(u32, u32, u32)>),
    UseCMap(String),
    Name(String),
    SystemInfo(CidSystemInfo),
}

impl<E> From<nom::Err<E>> for CMapParseError {
    fn from(err: nom::Err<E>) -> Self {
        match err {
            nom::Err::Incomplete(_) => CMapParseError::BadCMap,
            nom::Err::Failure(_) | nom::Err::Error(_) => CMapParseError::BadCMap,
        }
    }
}

pub(crate) fn parse(stream_content: &[u8]) -> Result<CMap, CMapParseError> {
    let input = ParserInput::new_extra(stream_content, "cmap");
    let (_, sections) = cmap_stream(input).map_err(CMapParseError::from)?;

    let mut cmap = CMap::default();
    for section in sections {
        match section {
            CMapSection::CsRange(ranges) => {
                cmap.codespaces
                    .extend(ranges.into_iter().map(|(low, high, len)| Codespace { low, high, byte_length: len }));
            }
            CMapSection::CidRange(ranges) => {
                cmap.cid_ranges
                    .extend(ranges.into_iter().map(|(low, high, first_cid)| CidRange { low, high, first_cid }));
            }
            CMapSection::BfChar(mappings) => {
                for ((code, _), unicode) in mappings {
                    cmap.code_to_unicode.insert(code, unicode);
                }
            }
            CMapSection::BfRange(mappings) => fold_bf_range(&mut cmap.code_to_unicode, mappings),
            CMapSection::UseCMap(name) => cmap.use_cmap = Some(name),
            CMapSection::Name(name) => cmap.cmap_name = Some(name),
            CMapSection::SystemInfo(info) => cmap.cid_system_info = Some(info),
        }
    }
    cmap.codespaces.sort_by_key(|c| c.low);
    if cmap.codespaces.is_empty() {
        return Err(CMapParseError::MissingCodespaces);
    }
    Ok(cmap)
}

fn fold_bf_range(map: &mut HashMap<u32, Vec<u16>>, mappings: Vec<SourceRangeMapping>) {
    for ((low, high, _), targets) in mappings {
        if targets.len() > 1 {
            // array form: one target string per code, positionally.
            for (offset, target) in targets.into_iter().enumerate() {
                map.insert(low + offset as u32, target);
            }
        } else if let Some(base) = targets.into_iter().next() {
            for code in low..=high {
                let mut unicode = base.clone();
                if let Some(last) = unicode.last_mut() {
                    *last = last.wrapping_add((code - low) as u16);
                }
                map.insert(code, unicode);
            }
        }
    }
}

fn space0(input: ParserInput) -> NomResult<()> {
    fold_many0(alt((tag(&b" "[..]), tag("\t"))), || {}, |_, _| ()).parse(input)
}

fn space1(input: ParserInput) -> NomResult<()> {
    fold_many1(alt((tag(&b" "[..]), tag("\t"))), || {}, |_, _| ()).parse(input)
}

fn multispace0(input: ParserInput) -> NomResult<()> {
    let space = tag(&b" "[..]).map(|_| ());
    let tab = tag("\t").map(|_| ());
    let eol_p = eol.map(|_| ());
    fold_many0(alt((space, tab, eol_p, comment)), || {}, |_, _| ()).parse(input)
}

fn multispace1(input: ParserInput) -> NomResult<()> {
    let space = tag(&b" "[..]).map(|_| ());
    let tab = tag("\t").map(|_| ());
    let eol_p = eol.map(|_| ());
    fold_many1(alt((space, tab, eol_p, comment)), || {}, |_, _| ()).parse(input)
}

fn cidinit_procset(input: ParserInput) -> NomResult<()> {
    (
        opt(tag("\u{FEFF}".as_bytes())),
        multispace0,
        tag(&b"/CIDInit"[..]),
        space0,
        alt((tag(&b"/ProcSet"[..]), tag(&b"/Procset"[..]))),
        space1,
        tag(&b"findresource"[..]),
        space1,
        tag(&b"begin"[..]),
        multispace1,
    )
        .parse(input)
        .map(|(i, _)| (i, ()))
}

fn cmap_stream(input: ParserInput) -> NomResult<Vec<CMapSection>> {
    delimited(cidinit_procset, cmap_resource_dictionary, (tag(&b"end"[..]), multispace0)).parse(input)
}

fn cmap_resource_dictionary(input: ParserInput) -> NomResult<Vec<CMapSection>> {
    let begin_parser = (digit1, space1, tag(&b"dict"[..]), space1, tag(&b"begin"[..]), multispace1);
    let end_parser = (tag(&b"end"[..]), multispace1);
    delimited(begin_parser, cmap_data, end_parser).parse(input)
}

fn cmap_data(input: ParserInput) -> NomResult<Vec<CMapSection>> {
    let cmap_end = (
        tag(&b"endcmap"[..]),
        multispace1,
        tag(&b"CMapName"[..]),
        space1,
        tag(&b"currentdict"[..]),
        space1,
        tag(&b"/CMap"[..]),
        space1,
        tag(&b"defineresource"[..]),
        space1,
        tag(&b"pop"[..]),
        multispace1,
    );
    delimited(
        (tag(&b"begincmap"[..]), multispace1),
        cmap_body,
        cmap_end,
    )
    .parse(input)
}

fn cmap_body(input: ParserInput) -> NomResult<Vec<CMapSection>> {
    map((cmap_metadata, cmap_codespace_and_mappings), |(mut metadata, mut body)| {
        metadata.append(&mut body);
        metadata
    })
    .parse(input)
}

fn cmap_metadata(input: ParserInput) -> NomResult<Vec<CMapSection>> {
    let metadata_parser = alt((cid_system_info, cmap_name, cmap_type));
    fold_many_m_n(0, 4, metadata_parser, Vec::new, |mut acc, section| {
        if let Some(section) = section {
            acc.push(section);
        }
        acc
    })
    .parse(input)
}

fn cid_system_info(input: ParserInput) -> NomResult<Option<CMapSection>> {
    let (rest, (_, _, dict, _, _, _)) = (
        tag(&b"/CIDSystemInfo"[..]),
        multispace0,
        alt((dictionary, dict_dup)),
        multispace1,
        tag(&b"def"[..]),
        multispace1,
    )
        .parse(input)?;
    Ok((rest, cid_system_info_value(&dict).map(CMapSection::SystemInfo)))
}

fn cmap_name(input: ParserInput) -> NomResult<Option<CMapSection>> {
    let (rest, (_, _, raw_name, _, _, _)) =
        (tag(&b"/CMapName"[..]), space0, name, space1, tag(&b"def"[..]), multispace1).parse(input)?;
    Ok((rest, Some(CMapSection::Name(String::from_utf8_lossy(&raw_name).into_owned()))))
}

fn cmap_type(input: ParserInput) -> NomResult<Option<CMapSection>> {
    (tag(&b"/CMapType"[..]), space1, digit1, space1, tag(&b"def"[..]), multispace1).parse(input).map(|(i, _)| (i, None))
}

fn cmap_codespace_and_mappings(input: ParserInput) -> NomResult<Vec<CMapSection>> {
    many1(alt((
        codespace_range_section,
        bf_char_section,
        bf_range_section,
        cid_range_section,
        use_cmap_section,
    )))
    .parse(input)
}

fn codespace_range_section(input: ParserInput) -> NomResult<CMapSection> {
    let begin_section = (digit1, space1, tag(&b"begincodespacerange"[..]), multispace1);
    let end_section = (tag(&b"endcodespacerange"[..]), multispace1);
    let parse_range = delimited(space0, code_range_pair, multispace1);
    let (rest, ranges) = delimited(begin_section, many1(parse_range), end_section).parse(input)?;
    Ok((rest, CMapSection::CsRange(ranges)))
}

fn code_range_pair(input: ParserInput) -> NomResult<(u32, u32, u8)> {
    let (rest, ((code_begin, len_beg), (code_end, len_end))) =
        separated_pair(source_code, space0, source_code).parse(input)?;
    if len_beg != len_end {
        Err(nom::Err::Failure(nom::error::make_error(rest, nom::error::ErrorKind::LengthValue)))
    } else {
        Ok((rest, (code_begin, code_end, len_beg)))
    }
}

fn source_code(input: ParserInput) -> NomResult<SourceCode> {
    let (rest, bytes) = delimited(tag(&b"<"[..]), many_m_n(1, 4, hex_char), tag(&b">"[..])).parse(input)?;
    let code_len = bytes.len();
    let value = bytes.into_iter().fold(0u32, |acc, b| (acc << 8) | b as u32);
    Ok((rest, (value, code_len as u8)))
}

fn hex_u16(input: ParserInput) -> NomResult<u16> {
    map(pair(hex_char, hex_char), |(h1, h2)| h1 as u16 * 256 + h2 as u16).parse(input)
}

fn bf_char_section(input: ParserInput) -> NomResult<CMapSection> {
    let begin_section = (digit1, space1, tag(&b"beginbfchar"[..]), multispace1);
    let end_section = (tag(&b"endbfchar"[..]), multispace1);
    let bf_char_line = delimited(space0, separated_pair(source_code, space0, target_string), multispace1);
    let (rest, mappings) = delimited(begin_section, many0(bf_char_line), end_section).parse(input)?;
    Ok((rest, CMapSection::BfChar(mappings)))
}

fn target_string(input: ParserInput) -> NomResult<Vec<u16>> {
    delimited(tag(&b"<"[..]), many_m_n(1, 256, terminated(hex_u16, multispace0)), tag(&b">"[..])).parse(input)
}

fn bf_range_section(input: ParserInput) -> NomResult<CMapSection> {
    let begin_section = (digit1, space1, tag(&b"beginbfrange"[..]), multispace1);
    let end_section = (tag(&b"endbfrange"[..]), multispace1);
    let (rest, mappings) = delimited(begin_section, many0(bf_range_line), end_section).parse(input)?;
    Ok((rest, CMapSection::BfRange(mappings)))
}

fn bf_range_line(input: ParserInput) -> NomResult<SourceRangeMapping> {
    let bf_range_parser =
        separated_pair(code_range_pair, space0, alt((target_string.map(|res| vec![res]), range_target_array)));
    delimited(space0, bf_range_parser, multispace1).parse(input)
}

fn range_target_array(input: ParserInput) -> NomResult<Vec<Vec<u16>>> {
    delimited((tag(&b"["[..]), space0), separated_list1(space1, target_string), (space0, tag(&b"]"[..]))).parse(input)
}

fn cid_range_section(input: ParserInput) -> NomResult<CMapSection> {
    let begin_section = (digit1, space1, tag(&b"begincidrange"[..]), multispace1);
    let end_section = (tag(&b"endcidrange"[..]), multispace1);
    let cid_line = delimited(space0, cid_range_line, multispace1);
    let (rest, ranges) = delimited(begin_section, many1(cid_line), end_section).parse(input)?;
    Ok((rest, CMapSection::CidRange(ranges)))
}

fn cid_range_line(input: ParserInput) -> NomResult<(u32, u32, u32)> {
    let (rest, ((low, high, _), cid)) =
        separated_pair(code_range_pair, space1, nom::character::complete::digit1).parse(input)?;
    let cid: u32 = std::str::from_utf8(&cid).unwrap_or("0").parse().unwrap_or(0);
    Ok((rest, (low, high, cid)))
}

fn use_cmap_section(input: ParserInput) -> NomResult<CMapSection> {
    let (rest, (base_name, _, _, _)) =
        (name, space1, tag(&b"usecmap"[..]), multispace1).parse(input)?;
    Ok((rest, CMapSection::UseCMap(String::from_utf8_lossy(&base_name).into_owned())))
}

fn cid_system_info_value(dict: &Dictionary) -> Option<CidSystemInfo> {
    let registry = dict.get(b"Registry").ok()?.as_string_bytes().ok()?.to_vec();
    let ordering = dict.get(b"Ordering").ok()?.as_string_bytes().ok()?.to_vec();
    let supplement = dict.get(b"Supplement").ok()?.as_i64().ok()?;
    Some(CidSystemInfo {
        registry: String::from_utf8_lossy(&registry).into_owned(),
        ordering: String::from_utf8_lossy(&ordering).into_owned(),
        supplement,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_span(s: &'_ [u8]) -> ParserInput<'_> {
        ParserInput::new_extra(s, "")
    }

    #[test]
    fn parse_source_code() {
        let data = b"<080F>";
        let (rem, res) = source_code(test_span(data)).unwrap();
        assert_eq!(*rem, b"");
        assert_eq!(res, (0x080f, 2));
    }

    #[test]
    fn parse_code_range_pair_with_not_matching_len() {
        let data = b"<080F> <08>";
        assert!(code_range_pair(test_span(data)).is_err());
    }

    #[test]
    fn parse_codespace_range_section() {
        let data = b"1 begincodespacerange\n<0000> <FFFF> \nendcodespacerange\n";
        let (rem, res) = codespace_range_section(test_span(data)).unwrap();
        assert_eq!(*rem, b"");
        match res {
            CMapSection::CsRange(ranges) => assert_eq!(ranges, vec![(0x0000, 0xffff, 2)]),
            _ => panic!("expected CsRange"),
        }
    }

    #[test]
    fn parse_cid_range_section() {
        let data = b"2 begincidrange\n<0000> <005E> 1\n<005F> <0061> 95\nendcidrange\n";
        let (rem, res) = cid_range_section(test_span(data)).unwrap();
        assert_eq!(*rem, b"");
        match res {
            CMapSection::CidRange(ranges) => assert_eq!(ranges, vec![(0, 0x5E, 1), (0x5F, 0x61, 95)]),
            _ => panic!("expected CidRange"),
        }
    }

    #[test]
    fn parse_use_cmap() {
        let data = b"/Adobe-Identity-UCS usecmap\n";
        let (rem, res) = use_cmap_section(test_span(data)).unwrap();
        assert_eq!(*rem, b"");
        match res {
            CMapSection::UseCMap(name) => assert_eq!(name, "Adobe-Identity-UCS"),
            _ => panic!("expected UseCMap"),
        }
    }

    #[test]
    fn parse_full_tounicode_cmap() {
        let data = b"/CIDInit /ProcSet findresource begin
12 dict begin
begincmap
/CIDSystemInfo << /Registry (Adobe) /Ordering (UCS) /Supplement 0 >> def
/CMapName /Adobe-Identity-UCS def
/CMapType 2 def
1 begincodespacerange
<0000> <FFFF>
endcodespacerange
4 beginbfchar
<0000> <0000>
<0001> <004C>
<0002> <0069>
<0003> <0073>
endbfchar
endcmap
CMapName currentdict /CMap defineresource pop
end
end";
        let cmap = super::parse(data).unwrap();
        assert_eq!(cmap.codespaces, vec![Codespace { low: 0, high: 0xFFFF, byte_length: 2 }]);
        assert_eq!(cmap.code_to_unicode[&1], vec![0x004C]);
    }

    #[test]
    fn parse_bfrange_with_array_target() {
        let data = b"/CIDInit /ProcSet findresource begin
12 dict begin
begincmap
/CMapType 2 def
1 begincodespacerange
<0000> <FFFF>
endcodespacerange
1 beginbfrange
<005F> <0061> [<0041> <0042> <0043>]
endbfrange
endcmap
CMapName currentdict /CMap defineresource pop
end
end";
        let cmap = super::parse(data).unwrap();
        assert_eq!(cmap.code_to_unicode[&0x5F], vec![0x0041]);
        assert_eq!(cmap.code_to_unicode[&0x60], vec![0x0042]);
        assert_eq!(cmap.code_to_unicode[&0x61], vec![0x0043]);
    }

    #[test]
    fn missing_codespaces_is_an_error() {
        let data = b"/CIDInit /ProcSet findresource begin
12 dict begin
begincmap
/CMapType 2 def
1 beginbfchar
<00> <0041>
endbfchar
endcmap
CMapName currentdict /CMap defineresource pop
end
end";
        assert!(super::parse(data).is_err());
    }
}
