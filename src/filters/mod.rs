//! The L2 filter pipeline: decode a stream's `/Filter` chain (one name
//! or an array of names, each with a matching `/DecodeParms` entry) into the stream's
//! logical bytes. Decoding is lazy and on demand (`Stream::decompressed_content`);
//! nothing here mutates the stored, still-encoded `content`.
//!
//! Built on `flate2` for FlateDecode and `weezl` for LZWDecode. The remaining filters
//! (ASCII85, ASCIIHex, RunLength) have no widely-used standalone crate, so they're
//! hand-rolled the way any PDF library would — each is a few dozen lines of
//! byte-level translation, not an ecosystem gap.

mod ascii85;
mod asciihex;
mod ccitt_skip;
mod lzw;
mod predictor;
mod runlength;

use std::io::Read;

use flate2::read::ZlibDecoder;

use crate::dictionary::Dictionary;
use crate::object::Object;
use crate::Result;

/// Image-only codecs the filter chain recognizes but does not decode (
/// "skipper-only"): the caller gets the still-encoded bytes back along with the
/// colorspace metadata needed to interpret them, rather than a decode error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageCodec {
    Dct,
    CcittFax,
    Jpx,
}

pub fn image_codec_of(name: &[u8]) -> Option<ImageCodec> {
    match name {
        b"DCTDecode" | b"DCT" => Some(ImageCodec::Dct),
        b"CCITTFaxDecode" | b"CCF" => Some(ImageCodec::CcittFax),
        b"JPXDecode" => Some(ImageCodec::Jpx),
        _ => None,
    }
}

/// Resolve a filter name, including the standard PDF abbreviations used in inline
/// images.
fn canonical_filter_name(name: &[u8]) -> &[u8] {
    match name {
        b"Fl" => b"FlateDecode",
        b"LZW" => b"LZWDecode",
        b"A85" => b"ASCII85Decode",
        b"AHx" => b"ASCIIHexDecode",
        b"RL" => b"RunLengthDecode",
        b"CCF" => b"CCITTFaxDecode",
        b"DCT" => b"DCTDecode",
        other => other,
    }
}

fn decode_one(name: &[u8], params: Option<&Dictionary>, data: &[u8]) -> Result<Vec<u8>> {
    match canonical_filter_name(name) {
        b"FlateDecode" => {
            let mut out = Vec::new();
            let mut decoder = ZlibDecoder::new(data);
            decoder
                .read_to_end(&mut out)
                .map_err(|e| crate::Error::InvalidStream(format!("FlateDecode: {e}")))?;
            predictor::apply(params, out)
        }
        b"LZWDecode" => {
            let early_change = params
                .and_then(|p| p.get(b"EarlyChange").ok())
                .and_then(Object::as_i64)
                .unwrap_or(1);
            let out = lzw::decode(data, early_change != 0)?;
            predictor::apply(params, out)
        }
        b"ASCII85Decode" => ascii85::decode(data),
        b"ASCIIHexDecode" => asciihex::decode(data),
        b"RunLengthDecode" => runlength::decode(data),
        b"Crypt" => Ok(data.to_vec()), // handled upstream by the encryption engine
        other => Err(crate::Error::UnsupportedFilter(String::from_utf8_lossy(other).into_owned())),
    }
}

/// Priority-1 stream-length heuristic (spec.md §4.4.5): try to locate the end of the
/// OUTERMOST filter's encoded payload without decoding it, by scanning for that
/// filter's own end-of-data marker in `data` (the stream content onward to the end of
/// the document buffer — the true length isn't known yet). Returns `None` when the
/// outermost filter has no such marker to scan for (Flate, LZW, DCT, JPX, or no filter
/// at all), in which case the caller falls back to trusting `/Length` or scanning
/// forward for the literal `endstream` keyword.
pub fn skip_to_end_of_data(dict: &Dictionary, data: &[u8]) -> Option<usize> {
    let filter_name = match dict.get(b"Filter") {
        Ok(Object::Name(name)) => name.clone(),
        Ok(Object::Array(arr)) => arr.first()?.as_name().ok()?.to_vec(),
        _ => return None,
    };

    let parms = match dict.get(b"DecodeParms").or_else(|_| dict.get(b"DP")) {
        Ok(Object::Dictionary(d)) => Some(d.clone()),
        Ok(Object::Array(arr)) => arr.first().and_then(|o| o.as_dict().ok().cloned()),
        _ => None,
    };

    match canonical_filter_name(&filter_name) {
        b"ASCII85Decode" => Some(ascii85::skip(data)),
        b"ASCIIHexDecode" => Some(asciihex::skip(data)),
        b"RunLengthDecode" => runlength::skip(data),
        b"CCITTFaxDecode" => ccitt_skip::skip(data, parms.as_ref()),
        _ => None,
    }
}

/// Decode `content` through `dict`'s `/Filter` chain. A stream
/// whose filter list names an image codec this layer cannot decode (DCT, CCITTFax,
/// JPX) is returned unchanged rather than erroring — the caller is expected to check
/// `image_codec_of` first if it cares.
pub fn decode_stream(dict: &Dictionary, content: &[u8]) -> Result<Vec<u8>> {
    let filters = match dict.get(b"Filter") {
        Ok(Object::Name(name)) => vec![name.clone()],
        Ok(Object::Array(arr)) => arr.iter().filter_map(|o| o.as_name().ok().map(|n| n.to_vec())).collect(),
        _ => return Ok(content.to_vec()),
    };

    let params: Vec<Option<Dictionary>> = match dict.get(b"DecodeParms").or_else(|_| dict.get(b"DP")) {
        Ok(Object::Dictionary(d)) => vec![Some(d.clone())],
        Ok(Object::Array(arr)) => arr.iter().map(|o| o.as_dict().ok().cloned()).collect(),
        _ => Vec::new(),
    };

    let mut data = content.to_vec();
    for (i, name) in filters.iter().enumerate() {
        if let Some(codec) = image_codec_of(name) {
            let _ = codec;
            return Ok(data);
        }
        let parm = params.get(i).and_then(|p| p.as_ref());
        data = decode_one(name, parm, &data)?;
    }
    Ok(data)
}
