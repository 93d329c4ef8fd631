//! The L1 object parser: nom combinators over the byte grammar for
//! direct objects, indirect objects, the classic xref table, the trailer, and content
//! streams, built on `nom` + `nom_locate` for byte-offset-tracked error reporting.
//!
//! The stateful `Tokenizer` in `parser::tokenizer` covers the same lexical ground for
//! call sites that need genuine lookahead/rewind (dict relaxed-mode recovery, the CMap
//! interpreter) — see that module's doc comment for why both exist.

pub(crate) mod charclass;
pub(crate) mod stream_recovery;
pub mod tokenizer;

use std::collections::HashSet;
use std::str::{self, FromStr};

use nom::branch::alt;
use nom::bytes::complete::{tag, take, take_while, take_while1, take_while_m_n};
use nom::character::complete::multispace1;
use nom::character::complete::{digit0, digit1, one_of};
use nom::character::complete::{space0, space1};
use nom::combinator::cut;
use nom::combinator::{map, map_opt, map_res, opt, verify};
use nom::error::{ErrorKind, ParseError as NomParseError};
use nom::multi::{fold_many0, fold_many1, many0, many0_count};
use nom::sequence::{delimited, pair, preceded, separated_pair, terminated};
use nom::{AsBytes, AsChar, Input, IResult, Parser};
use nom_locate::LocatedSpan;

use crate::content::{Content, Operation};
use crate::dictionary::Dictionary;
use crate::error::{Error, ParseError, XrefError};
use crate::object::{Object, ObjectId, Stream, StringFormat};
use crate::reader::{Reader, MAX_BRACKET};
use crate::xref::{Xref, XrefEntry, XrefType};

pub type ParserInput<'a> = LocatedSpan<&'a [u8], &'a str>;
pub(crate) type NomError<'a> = nom::error::Error<ParserInput<'a>>;
pub(crate) type NomResult<'a, O, E = NomError<'a>> = IResult<ParserInput<'a>, O, E>;

#[inline]
fn strip_nom<O>(r: NomResult<O>) -> Option<O> {
    r.ok().map(|(_, o)| o)
}

#[inline]
fn convert_result<O, E>(result: std::result::Result<O, E>, input: ParserInput, error_kind: ErrorKind) -> NomResult<O> {
    result.map(|o| (input, o)).map_err(|_| {
        let err: NomError = nom::error::Error::from_error_kind(input, error_kind);
        nom::Err::Error(err)
    })
}

#[inline]
fn offset_stream(object: &mut Object, offset: usize) {
    if let Object::Stream(stream) = object {
        stream.start_position = stream.start_position.and_then(|sp| sp.checked_add(offset));
    }
}

pub(crate) fn eol(input: ParserInput) -> NomResult<ParserInput> {
    alt((tag(&b"\r\n"[..]), tag(&b"\n"[..]), tag(&b"\r"[..]))).parse(input)
}

pub(crate) fn comment(input: ParserInput) -> NomResult<()> {
    map((tag(&b"%"[..]), take_while(|c: u8| !b"\r\n".contains(&c)), eol), |_| ()).parse(input)
}

use self::charclass::{is_delimiter as cc_is_delimiter, is_regular as cc_is_regular, is_whitespace as cc_is_whitespace};

#[inline]
fn is_whitespace(c: u8) -> bool {
    cc_is_whitespace(c)
}

#[inline]
fn is_delimiter(c: u8) -> bool {
    cc_is_delimiter(c)
}

#[inline]
fn is_regular(c: u8) -> bool {
    cc_is_regular(c)
}

#[inline]
fn is_direct_literal_string(c: u8) -> bool {
    !b"()\\\r\n".contains(&c)
}

fn white_space(input: ParserInput) -> NomResult<()> {
    map(take_while(is_whitespace), |_| ()).parse(input)
}

fn space(input: ParserInput) -> NomResult<()> {
    fold_many0(alt((map(take_while1(is_whitespace), |_| ()), comment)), || {}, |_, _| ()).parse(input)
}

fn integer(input: ParserInput) -> NomResult<i64> {
    let (i, _) = pair(opt(one_of("+-")), digit1).parse(input)?;

    let int_input = &input[..input.len() - i.len()];
    convert_result(i64::from_str(str::from_utf8(int_input).unwrap()), i, ErrorKind::Digit)
}

fn real(input: ParserInput) -> NomResult<f64> {
    let (i, _) = pair(
        opt(one_of("+-")),
        alt((map((digit1, tag(&b"."[..]), digit0), |_| ()), map(pair(tag(&b"."[..]), digit1), |_| ()))),
    )
    .parse(input)?;

    let float_input = &input[..input.len() - i.len()];
    convert_result(f64::from_str(str::from_utf8(float_input).unwrap()), i, ErrorKind::Digit)
}

fn oct_char(input: ParserInput) -> NomResult<u8> {
    map_res(take_while_m_n(1, 3, AsChar::is_oct_digit), |x: ParserInput| {
        // Overflowing octal escapes are truncated to one byte
        u16::from_str_radix(str::from_utf8(&x).unwrap(), 8).map(|o| o as u8)
    })
    .parse(input)
}

pub(crate) fn name(input: ParserInput) -> NomResult<Vec<u8>> {
    preceded(
        tag(&b"/"[..]),
        many0(alt((
            preceded(tag(&b"#"[..]), hex_char),
            map_opt(take(1usize), |c: ParserInput| if c[0] != b'#' && is_regular(c[0]) { Some(c[0]) } else { None }),
        ))),
    )
    .parse(input)
}

pub(crate) fn hex_char(input: ParserInput) -> NomResult<u8> {
    map_res(
        verify(take(2usize), |h: &ParserInput| h.as_bytes().iter().copied().all(AsChar::is_hex_digit)),
        |x: ParserInput| u8::from_str_radix(str::from_utf8(&x).unwrap(), 16),
    )
    .parse(input)
}

fn escape_sequence(input: ParserInput) -> NomResult<Option<u8>> {
    preceded(
        tag(&b"\\"[..]),
        alt((
            map(oct_char, Some),
            map(eol, |_| None),
            map(tag(&b"n"[..]), |_| Some(b'\n')),
            map(tag(&b"r"[..]), |_| Some(b'\r')),
            map(tag(&b"t"[..]), |_| Some(b'\t')),
            map(tag(&b"b"[..]), |_| Some(b'\x08')),
            map(tag(&b"f"[..]), |_| Some(b'\x0C')),
            map(take(1usize), |c: ParserInput| Some(c[0])),
        )),
    )
    .parse(input)
}

enum InnerLiteralString<'a> {
    Direct(ParserInput<'a>),
    Escape(Option<u8>),
    Eol(ParserInput<'a>),
    Nested(Vec<u8>),
}

impl InnerLiteralString<'_> {
    fn push(&self, output: &mut Vec<u8>) {
        match self {
            InnerLiteralString::Direct(s) | InnerLiteralString::Eol(s) => output.extend_from_slice(s),
            InnerLiteralString::Escape(e) => output.extend(e),
            InnerLiteralString::Nested(n) => output.extend_from_slice(n),
        }
    }
}

fn inner_literal_string(depth: usize) -> impl Fn(ParserInput) -> NomResult<Vec<u8>> {
    move |input| {
        fold_many0(
            alt((
                map(take_while1(is_direct_literal_string), InnerLiteralString::Direct),
                map(escape_sequence, InnerLiteralString::Escape),
                map(eol, InnerLiteralString::Eol),
                map(nested_literal_string(depth), InnerLiteralString::Nested),
            )),
            Vec::new,
            |mut out: Vec<u8>, value| {
                value.push(&mut out);
                out
            },
        )
        .parse(input)
    }
}

fn nested_literal_string(depth: usize) -> impl Fn(ParserInput) -> NomResult<Vec<u8>> {
    move |input| {
        if depth == 0 {
            map(verify(tag(&b"too deep"[..]), |_| false), |_| vec![]).parse(input)
        } else {
            map(delimited(tag(&b"("[..]), inner_literal_string(depth - 1), tag(&b")"[..])), |mut content| {
                content.insert(0, b'(');
                content.push(b')');
                content
            })
            .parse(input)
        }
    }
}

fn literal_string(input: ParserInput) -> NomResult<Vec<u8>> {
    delimited(tag(&b"("[..]), inner_literal_string(MAX_BRACKET), tag(&b")"[..])).parse(input)
}

fn hexadecimal_string(input: ParserInput) -> NomResult<Object> {
    map(
        delimited(
            tag(&b"<"[..]),
            terminated(
                fold_many0(
                    preceded(white_space, hex_digit),
                    || -> (Vec<u8>, bool) { (Vec::new(), false) },
                    |state, c| match state {
                        (mut out, false) => {
                            out.push(c << 4);
                            (out, true)
                        }
                        (mut out, true) => {
                            *out.last_mut().unwrap() |= c;
                            (out, false)
                        }
                    },
                ),
                white_space,
            ),
            tag(&b">"[..]),
        ),
        |(bytes, _)| Object::String(bytes, StringFormat::Hexadecimal),
    )
    .parse(input)
}

#[inline]
fn hex_digit(input: ParserInput) -> NomResult<u8> {
    map_opt(take(1usize), |c: ParserInput| str::from_utf8(&c).ok().and_then(|c| u8::from_str_radix(c, 16).ok()))
        .parse(input)
}

fn boolean(input: ParserInput) -> NomResult<Object> {
    alt((map(tag(&b"true"[..]), |_| Object::Boolean(true)), map(tag(&b"false"[..]), |_| Object::Boolean(false))))
        .parse(input)
}

fn null(input: ParserInput) -> NomResult<Object> {
    map(tag(&b"null"[..]), |_| Object::Null).parse(input)
}

fn array(input: ParserInput) -> NomResult<Vec<Object>> {
    delimited(pair(tag(&b"["[..]), space), many0(_direct_object), tag(&b"]"[..])).parse(input)
}

pub(crate) fn dictionary(input: ParserInput) -> NomResult<Dictionary> {
    delimited(pair(tag(&b"<<"[..]), space), inner_dictionary, tag(&b">>"[..])).parse(input)
}

/// §4.2's "Dictionary relaxed mode": a strict pass first (duplicate keys are a parse
/// error, via `Dictionary::insert_checked`); on a `DictDuplicateKey` failure, retry the
/// whole dictionary permissively (last-wins). Independently of that, every key/value
/// pair is checked for a missing value via `parser::tokenizer::Tokenizer::
/// has_eol_before_token` — when an EOL separates a key from what looks like another
/// key, the parser first tries the strict reading (the lookahead Name *is* this key's
/// value) and only falls back to treating the value as an empty string literal (not
/// consuming the lookahead token) if that reading wouldn't let the dictionary continue.
fn inner_dictionary(input: ParserInput) -> NomResult<Dictionary> {
    match inner_dictionary_body(input, true) {
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) if e.code == ErrorKind::Verify => {
            inner_dictionary_body(input, false)
        }
        result => result,
    }
}

fn inner_dictionary_body(input: ParserInput, strict: bool) -> NomResult<Dictionary> {
    let mut dict = Dictionary::new();
    let mut cur = input;
    loop {
        if cur.as_bytes().is_empty() || cur.as_bytes().starts_with(b">>") {
            return Ok((cur, dict));
        }

        let (after_key, key) = match terminated(name, space).parse(cur) {
            Ok(ok) => ok,
            Err(_) => return Ok((cur, dict)), // leave it for the enclosing `>>` tag to reject
        };

        let eol_before_value = {
            let mut t = tokenizer::Tokenizer::new(cur.as_bytes());
            let _ = t.next(); // the key token just parsed above
            t.has_eol_before_token().unwrap_or(false)
        };

        let (next_input, value) = match _direct_object.parse(after_key) {
            Ok((after_value, Object::Name(name_value))) if eol_before_value => {
                // Ambiguous: the lookahead Name could be this key's value, or it could
                // be the *next* key with this one missing a value entirely. Strict
                // reading first: accept it as the value only if the dictionary can
                // still continue (another key follows, or the dict closes) from there.
                let continues = after_value.as_bytes().is_empty()
                    || after_value.as_bytes().starts_with(b">>")
                    || terminated(name, space).parse(after_value).is_ok();
                if continues {
                    (after_value, Object::Name(name_value))
                } else {
                    (after_key, Object::string_literal(Vec::new()))
                }
            }
            Ok((after_value, value)) => (after_value, value),
            Err(_) if eol_before_value => (after_key, Object::string_literal(Vec::new())),
            Err(e) => return Err(e),
        };

        if dict.insert_checked(key, value, strict).is_err() {
            let err: NomError = nom::error::Error::from_error_kind(cur, ErrorKind::Verify);
            return Err(nom::Err::Error(err));
        }

        cur = next_input;
    }
}

/// The PostScript `dict dup begin ... end` idiom used by CMap resources (
/// §4.6/§6.3) to fill in a pre-sized dictionary one `def` at a time.
pub(crate) fn dict_dup(input: ParserInput) -> NomResult<Dictionary> {
    delimited(
        (digit1, space1, tag(&b"dict"[..]), space1, tag(&b"dup"[..]), space1, tag(&b"begin"[..]), multispace1),
        fold_many0(
            terminated(pair(terminated(name, space), _direct_object), pair(tag(&b"def"[..]), multispace1)),
            Dictionary::new,
            |mut dict, (key, value)| {
                dict.set(key, value);
                dict
            },
        ),
        tag(&b"end"[..]),
    )
    .parse(input)
}

fn stream<'a>(input: ParserInput<'a>, reader: &Reader, already_seen: &mut HashSet<ObjectId>) -> NomResult<'a, Object> {
    let (i, dict) = terminated(dictionary, (space, tag(&b"stream"[..]), space0, eol)).parse(input)?;

    let length = dict.get(b"Length").and_then(|value| {
        if let Ok(id) = value.as_reference() {
            reader.get_object(id, already_seen).and_then(|value| value.as_i64())
        } else {
            value.as_i64()
        }
    });

    if let Ok(length) = length {
        if length >= 0 {
            if let Ok((rest, data)) =
                terminated(take(length as usize), pair(opt(eol), tag(&b"endstream"[..]))).parse(i)
            {
                return Ok((rest, Object::Stream(Stream::new(dict, data.to_vec()))));
            }
        }
    }
    // Length is missing, negative, an unresolvable indirect reference, or simply
    // wrong (the trusted-length take-then-`endstream` match above failed): record
    // where the stream body starts so a later pass can recover it by scanning
    // forward for `endstream` rather
    // than failing the whole enclosing indirect object.
    Ok((i, Object::Stream(Stream::with_position(dict, input.len() - i.len()))))
}

fn unsigned_int<I: FromStr>(input: ParserInput) -> NomResult<I> {
    map_res(digit1, |digits: ParserInput| I::from_str(str::from_utf8(&digits).unwrap())).parse(input)
}

fn object_id(input: ParserInput) -> NomResult<ObjectId> {
    pair(terminated(unsigned_int, space), terminated(unsigned_int, space)).parse(input)
}

fn reference(input: ParserInput) -> NomResult<Object> {
    map(terminated(object_id, tag(&b"R"[..])), Object::Reference).parse(input)
}

fn _direct_objects(input: ParserInput) -> NomResult<Object> {
    alt((
        null,
        boolean,
        reference,
        map(real, Object::Real),
        map(integer, Object::Integer),
        map(name, Object::Name),
        map(literal_string, Object::string_literal),
        hexadecimal_string,
        map(array, Object::Array),
        map(dictionary, Object::Dictionary),
    ))
    .parse(input)
}

fn _direct_object(input: ParserInput) -> NomResult<Object> {
    terminated(_direct_objects, space).parse(input)
}

/// Parse a single direct object (no `obj`/`endobj` wrapper, no indirect reference
/// resolution). Used for object-stream members and any other context where the
/// caller already has a self-contained byte slice.
pub fn direct_object(input: ParserInput) -> Option<Object> {
    strip_nom(_direct_object.parse(input))
}

fn object<'a>(input: ParserInput<'a>, reader: &Reader, already_seen: &mut HashSet<ObjectId>) -> NomResult<'a, Object> {
    terminated(alt((|input| stream(input, reader, already_seen), _direct_objects)), space).parse(input)
}

pub fn indirect_object(
    input: ParserInput, offset: usize, expected_id: Option<ObjectId>, reader: &Reader,
    already_seen: &mut HashSet<ObjectId>,
) -> crate::Result<(ObjectId, Object)> {
    let (id, mut object) = _indirect_object(input.take_from(offset), offset, expected_id, reader, already_seen)?;

    offset_stream(&mut object, offset);

    Ok((id, object))
}

fn _indirect_object<'a>(
    input: ParserInput<'a>, offset: usize, expected_id: Option<ObjectId>, reader: &Reader,
    already_seen: &mut HashSet<ObjectId>,
) -> crate::Result<(ObjectId, Object)> {
    let (i, (_, object_id)) =
        terminated((space, object_id), pair(tag(&b"obj"[..]), space)).parse(input).map_err(|_| Error::IndirectObject { offset })?;
    if let Some(expected_id) = expected_id {
        if object_id != expected_id {
            return Err(Error::ObjectIdMismatch(object_id.0, object_id.1));
        }
    }

    let object_offset = input.len() - i.len();
    let (_, mut object) = terminated(|i: ParserInput<'a>| object(i, reader, already_seen), (space, opt(tag(&b"endobj"[..])), space))
        .parse(i)
        .map_err(|_| Error::IndirectObject { offset })?;

    offset_stream(&mut object, object_offset);

    Ok((object_id, object))
}

pub fn header(input: ParserInput) -> Option<String> {
    strip_nom(
        map_res(
            delimited(tag(&b"%PDF-"[..]), take_while(|c: u8| !b"\r\n".contains(&c)), pair(eol, many0_count(comment))),
            |v: ParserInput| str::from_utf8(&v).map(Into::into),
        )
        .parse(input),
    )
}

pub fn binary_mark(input: ParserInput) -> Option<Vec<u8>> {
    strip_nom(
        map_res(
            delimited(tag(&b"%"[..]), take_while(|c: u8| !b"\r\n".contains(&c)), pair(eol, many0_count(comment))),
            |v: ParserInput| Ok::<Vec<u8>, ()>(v.to_vec()),
        )
        .parse(input),
    )
}

/// Decode a classic cross-reference table section.
fn xref(input: ParserInput) -> NomResult<Xref> {
    let xref_eol = map(alt((tag(&b" \r"[..]), tag(&b" \n"[..]), tag(&b"\r\n"[..]))), |_| ());
    let xref_entry = pair(
        separated_pair(unsigned_int, tag(&b" "[..]), unsigned_int::<u32>),
        delimited(tag(&b" "[..]), map(one_of("nf"), |k| k == 'n'), xref_eol),
    );

    let xref_section = pair(
        separated_pair(unsigned_int::<usize>, tag(&b" "[..]), unsigned_int::<u32>),
        preceded(pair(opt(tag(&b" "[..])), eol), many0(xref_entry)),
    );

    let (input, sections) = delimited(
        pair(tag(&b"xref"[..]), eol),
        fold_many1(xref_section, Vec::new, |mut acc, section| {
            acc.push(section);
            acc
        }),
        space,
    )
    .parse(input)?;

    // Workaround for a known buggy xref writer: when the whole
    // classic table consists of exactly one subsection that doesn't start at object
    // 0, shift every entry down by one so the table starts at 0.
    let shift = sections.len() == 1 && (sections[0].0).0 != 0;

    let mut xref = Xref::new(0, XrefType::CrossReferenceTable);
    for ((start, _count), entries) in sections {
        let start = if shift { start - 1 } else { start };
        for (index, ((offset, generation), is_normal)) in entries.into_iter().enumerate() {
            if is_normal {
                if let Ok(generation) = generation.try_into() {
                    xref.insert((start + index) as u32, XrefEntry::Normal { offset, generation });
                }
            } else {
                xref.insert((start + index) as u32, XrefEntry::Free { next_free: offset });
            }
        }
    }
    Ok((input, xref))
}

fn trailer(input: ParserInput) -> NomResult<Dictionary> {
    delimited(pair(tag(&b"trailer"[..]), space), dictionary, space).parse(input)
}

/// Decode an `/Type /XRef` cross-reference stream into a [`Xref`]:
/// `/W` gives each field's byte width, `/Index` the subsections covered (defaulting
/// to `[0 Size]`), and each row's type byte selects Free/Normal/Compressed.
fn decode_xref_stream(mut stream: Stream) -> crate::Result<(Xref, Dictionary)> {
    let dict = stream.dict.clone();
    let data = stream.decompressed_content()?;
    stream.set_content(Vec::new());

    let w = dict.get(b"W").and_then(Object::as_array)?;
    if w.len() != 3 {
        return Err(XrefError::NoXref.into());
    }
    let widths: Vec<usize> = w.iter().map(|o| o.as_i64().unwrap_or(0) as usize).collect();
    let row_len = widths.iter().sum::<usize>();
    if row_len == 0 {
        return Err(XrefError::NoXref.into());
    }

    let size = dict.get(b"Size").and_then(Object::as_i64)? as u32;
    let index: Vec<(u32, u32)> = match dict.get(b"Index").and_then(Object::as_array) {
        Ok(arr) => arr
            .chunks_exact(2)
            .filter_map(|pair| Some((pair[0].as_i64().ok()? as u32, pair[1].as_i64().ok()? as u32)))
            .collect(),
        Err(_) => vec![(0, size)],
    };

    let mut xref = Xref::new(size, XrefType::CrossReferenceStream);
    let mut pos = 0usize;
    for (start, count) in index {
        for i in 0..count {
            if pos + row_len > data.len() {
                break;
            }
            let row = &data[pos..pos + row_len];
            pos += row_len;

            let mut offset = 0usize;
            let fields: Vec<u64> = {
                let mut fields = Vec::with_capacity(3);
                for &width in &widths {
                    let field = be_bytes_to_u64(&row[offset..offset + width]);
                    fields.push(field);
                    offset += width;
                }
                fields
            };

            // Field 1 defaults to type 1 (Normal) when /W gives it zero width.
            let kind = if widths[0] == 0 { 1 } else { fields[0] };
            let id = start + i;
            let entry = match kind {
                0 => XrefEntry::Free { next_free: fields[1] as u32 },
                1 => XrefEntry::Normal { offset: fields[1] as u32, generation: fields[2] as u16 },
                2 => XrefEntry::Compressed { container: fields[1] as u32, index: fields[2] as u16 },
                _ => XrefEntry::UnusableFree,
            };
            xref.insert(id, entry);
        }
    }

    Ok((xref, dict))
}

fn be_bytes_to_u64(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0u64, |acc, &b| (acc << 8) | b as u64)
}

pub fn xref_and_trailer(input: ParserInput, reader: &Reader) -> crate::Result<(Xref, Dictionary)> {
    let xref_trailer = map(pair(xref, trailer), |(mut xref, trailer)| {
        xref.size = trailer.get(b"Size").and_then(Object::as_i64).map_err(|_| ParseError::InvalidTrailer)? as u32;
        Ok((xref, trailer))
    });
    alt((
        xref_trailer,
        (|input| {
            _indirect_object(input, 0, None, reader, &mut HashSet::new())
                .map(|(_, obj)| {
                    let res = match obj {
                        Object::Stream(stream) => decode_xref_stream(stream),
                        _ => Err(ParseError::InvalidXref.into()),
                    };
                    (input, res)
                })
                .map_err(|_| nom::Err::Error(NomError::from_error_kind(input, ErrorKind::Fail)))
        }),
    ))
    .parse(input)
    .map(|(_, o)| o)
    .map_err(|_| ParseError::InvalidTrailer)?
}

pub fn xref_start(input: ParserInput) -> Option<i64> {
    strip_nom(
        delimited(pair(tag(&b"startxref"[..]), eol), trim_spaces(integer), (eol, tag(&b"%%EOF"[..]), space)).parse(input),
    )
}

fn trim_spaces<'a, O>(
    p: impl Parser<ParserInput<'a>, Output = O, Error = nom::error::Error<LocatedSpan<&'a [u8], &'a str>>>,
) -> impl Parser<ParserInput<'a>, Output = O, Error = nom::error::Error<LocatedSpan<&'a [u8], &'a str>>> {
    delimited(many0(tag(" ")), p, many0(tag(" ")))
}

// --- Content-stream grammar ---

fn content_space(input: ParserInput) -> NomResult<()> {
    map(take_while(|c| b" \t\r\n".contains(&c)), |_| ()).parse(input)
}

fn operator(input: ParserInput) -> NomResult<String> {
    map_res(take_while1(|c: u8| c.is_ascii_alphabetic() || b"*'\"".contains(&c)), |op: ParserInput| {
        str::from_utf8(&op).map(Into::into)
    })
    .parse(input)
}

fn operand(input: ParserInput) -> NomResult<Object> {
    terminated(
        alt((
            null,
            boolean,
            map(real, Object::Real),
            map(integer, Object::Integer),
            map(name, Object::Name),
            map(literal_string, Object::string_literal),
            hexadecimal_string,
            map(array, Object::Array),
            map(dictionary, Object::Dictionary),
        )),
        content_space,
    )
    .parse(input)
}

fn operation(input: ParserInput) -> NomResult<Operation> {
    map(preceded(many0(comment), alt((inline_image, terminated(pair(many0(operand), operator), content_space)))), |(operands, operator)| {
        Operation::new(operator, operands)
    })
    .parse(input)
}

fn inline_image(input: ParserInput) -> NomResult<(Vec<Object>, String)> {
    preceded(pair(tag(&b"BI"[..]), content_space), cut(inline_image_impl)).parse(input)
}

fn inline_image_impl(input: ParserInput) -> NomResult<(Vec<Object>, String)> {
    let (input, stream_dict) = inner_dictionary.parse(input)?;
    let (input, _) = pair(tag(&b"ID"[..]), content_space).parse(input)?;
    let (_, (input, stream)) = convert_result(image_data_stream(input, stream_dict), input, ErrorKind::Fail)?;
    let (input, _) = (content_space, tag(&b"EI"[..]), content_space).parse(input)?;
    Ok((input, (vec![Object::Stream(stream)], String::from("BI"))))
}

fn image_data_stream(input: ParserInput, stream_dict: Dictionary) -> crate::Result<(ParserInput, Stream)> {
    let get_abbr = |key_abbr: &[u8], key: &[u8]| stream_dict.get(key_abbr).or_else(|_| stream_dict.get(key));
    let width = get_abbr(b"W", b"Width")?.as_i64()? as usize;
    let height = get_abbr(b"H", b"Height")?.as_i64()? as usize;
    let bpc = get_abbr(b"BPC", b"BitsPerComponent")?.as_i64()? as usize;
    let im = get_abbr(b"IM", b"ImageMask").and_then(|x| x.as_bool());
    let num_colors = match im {
        Ok(true) => 1,
        _ => {
            let colorspace = get_abbr(b"CS", b"ColorSpace")?.as_name()?;
            match colorspace {
                b"DeviceGray" | b"Gray" | b"CalGray" | b"Indexed" | b"I" => 1,
                b"DeviceRGB" | b"RGB" | b"CalRGB" => 3,
                b"DeviceCMYK" | b"CMYK" => 4,
                _ => return Err(Error::Unimplemented("inline image colorspace")),
            }
        }
    };

    let stride = (width * (num_colors * bpc)).div_ceil(8);
    let length = height * stride;

    let (input, content) = match get_abbr(b"F", b"Filter") {
        Err(_) => take(length).parse(input).map_err(|_: nom::Err<()>| ParseError::EndOfInput)?,
        Ok(Object::Name(_)) | Ok(Object::Array(_)) => return Err(Error::Unimplemented("filters for inline images")),
        Ok(obj) => return Err(Error::ObjectType { expected: "Name or Array", found: obj.enum_variant() }),
    };
    Ok((input, Stream::new(stream_dict, content.to_vec())))
}

fn _content(input: ParserInput) -> NomResult<Content> {
    preceded(content_space, map(many0(operation), |operations| Content { operations })).parse(input)
}

pub fn content(input: ParserInput) -> Option<Content> {
    strip_nom(_content.parse(input))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_span(s: &'_ [u8]) -> ParserInput<'_> {
        LocatedSpan::new_extra(s, "test")
    }

    fn tstrip<O>(r: NomResult<O>) -> Option<O> {
        r.ok().and_then(|(i, o)| if !i.is_empty() { None } else { Some(o) })
    }

    #[test]
    fn parse_real_number() {
        let real = |i| tstrip(real(i));

        assert_eq!(real(test_span(b"0.12")), Some(0.12));
        assert_eq!(real(test_span(b"-.12")), Some(-0.12));
        assert_eq!(real(test_span(b"10.")), Some(10.0));
    }

    #[test]
    fn parse_string() {
        let literal_string = |i| tstrip(literal_string(i));

        let data = vec![
            ("()", ""),
            ("(text())", "text()"),
            ("(text\r\n\\\\(nested\\t\\b\\f))", "text\r\n\\(nested\t\x08\x0C)"),
            ("(text\\0\\53\\053\\0053)", "text\0++\x053"),
            ("(text line\\\n())", "text line()"),
        ];

        for (input, expected) in data {
            assert_eq!(
                literal_string(test_span(input.as_bytes())),
                Some(expected.as_bytes().to_vec()),
                "input: {:?} output: {:?}",
                input,
                expected,
            );
        }
    }

    #[test]
    fn parse_name() {
        let (text, expected) = (b"/ABC#5f", b"ABC\x5F");
        let result = tstrip(name(test_span(text)));
        assert_eq!(result, Some(expected.to_vec()));

        let (text, expected) = (b"/#cb#ce#cc#e5", b"\xcb\xce\xcc\xe5");
        let result = tstrip(name(test_span(text)));
        assert_eq!(result, Some(expected.to_vec()));
    }

    #[test]
    fn dictionary_recovers_from_missing_value_before_eol() {
        // A broken-writer dict: /Key1 has no value before the newline, so /Key2's
        // name would otherwise be greedily swallowed as Key1's value.
        let input = test_span(b"<</Key1\n/Key2 (val2)>>");
        let (rest, dict) = dictionary(input).unwrap();
        assert!(rest.as_bytes().is_empty());
        assert_eq!(dict.get(b"Key1").unwrap(), &Object::string_literal(Vec::new()));
        assert_eq!(dict.get(b"Key2").unwrap(), &Object::string_literal(b"val2".to_vec()));
    }

    #[test]
    fn dictionary_keeps_legitimate_multiline_name_value() {
        // A normal multi-line dict where a Name value legitimately follows an EOL —
        // must NOT be mistaken for a missing-value recovery case.
        let input = test_span(b"<<\n/Type\n/Catalog\n>>");
        let (rest, dict) = dictionary(input).unwrap();
        assert!(rest.as_bytes().is_empty());
        assert_eq!(dict.get(b"Type").unwrap(), &Object::Name(b"Catalog".to_vec()));
    }

    #[test]
    fn dictionary_strict_mode_rejects_duplicate_keys_then_last_wins() {
        let input = test_span(b"<</Key (first)/Key (second)>>");
        let (rest, dict) = dictionary(input).unwrap();
        assert!(rest.as_bytes().is_empty());
        // Strict parse hit DictDuplicateKey and fell back to relaxed last-wins.
        assert_eq!(dict.get(b"Key").unwrap(), &Object::string_literal(b"second".to_vec()));
    }

    #[test]
    fn insert_checked_reports_duplicate_key_in_strict_mode() {
        let mut dict = Dictionary::new();
        dict.insert_checked(b"Key".to_vec(), Object::Integer(1), true).unwrap();
        let err = dict.insert_checked(b"Key".to_vec(), Object::Integer(2), true);
        assert!(matches!(err, Err(Error::Parse(ParseError::DictDuplicateKey))));
    }

    #[test]
    fn parse_content_with_comments() {
        let input = b"0.5 0.5 0.5 setrgbcolor
% comment
100 100 moveto
(Hello, world!) show
";
        let out = content(test_span(input)).unwrap();
        assert_eq!(out.operations.len(), 3);
    }

    #[test]
    fn hex_partial() {
        let out = tstrip(hexadecimal_string(test_span(b"<901FA>")));
        match out {
            Some(Object::String(s, _)) => assert_eq!(s, b"\x90\x1F\xA0".to_vec()),
            _ => panic!("unexpected {:?}", out),
        }
    }

    #[test]
    fn hex_separated() {
        let out = tstrip(hexadecimal_string(test_span(b"<9 01F A>")));
        match out {
            Some(Object::String(s, _)) => assert_eq!(s, b"\x90\x1F\xA0".to_vec()),
            _ => panic!("unexpected {:?}", out),
        }
    }

    #[test]
    fn big_generation_value() {
        let input = b"xref
0 1
0000000000 65536 f \n0 16
0000000000 65535 f \n0000153238 00000 n \n0000000019 00000 n \n0000000313 00000 n \n0000000333 00000 n \n0000145531 00000 n \n0000153407 00000 n \n0000145554 00000 n \n0000152303 00000 n \n0000152324 00000 n \n0000152514 00000 n \n0000152880 00000 n \n0000153106 00000 n \n0000153139 00000 n \n0000153532 00000 n \n0000153629 00000 n \ntrailer
<</Size 16/Root 14 0 R
/Info 15 0 R
/ID [ <9DDC4B621B3F485FF5ED0F57D00A028F>
<9DDC4B621B3F485FF5ED0F57D00A028F> ]
>>
startxref
153804
%%EOF
";
        match xref(test_span(input)) {
            Ok((_, re)) => assert_eq!(re.entries.len(), 16),
            Err(err) => panic!("unexpected {:?}", err),
        }
    }

    #[test]
    fn space_in_startxref_number() {
        let input = b"startxref
153804
%%EOF
";
        match xref_start(test_span(input)) {
            Some(num) => assert_eq!(num, 153804),
            None => panic!("could not parse number in startxref"),
        }
    }

    #[test]
    fn direct_object_parses_dictionary() {
        let obj = direct_object(test_span(b"<< /Type /Catalog /Pages 1 0 R >>")).unwrap();
        let dict = obj.as_dict().unwrap();
        assert_eq!(dict.get_type().unwrap(), b"Catalog");
        assert_eq!(dict.get(b"Pages").unwrap().as_reference().unwrap(), (1, 0));
    }
}
