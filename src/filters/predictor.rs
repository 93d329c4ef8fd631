//! TIFF and PNG-family predictors, applied after FlateDecode/LZWDecode
//! when `/DecodeParms` names `/Predictor` 2 (TIFF) or >=10 (PNG). No crate in the
//! dependency stack implements these — they're a dozen lines of row-differencing
//! arithmetic, not an ecosystem gap.

use crate::dictionary::Dictionary;
use crate::object::Object;
use crate::Result;

pub fn apply(params: Option<&Dictionary>, data: Vec<u8>) -> Result<Vec<u8>> {
    let Some(params) = params else { return Ok(data) };
    let predictor = params.get(b"Predictor").and_then(Object::as_i64).unwrap_or(1);
    if predictor <= 1 {
        return Ok(data);
    }

    let colors = params.get(b"Colors").and_then(Object::as_i64).unwrap_or(1).max(1) as usize;
    let bpc = params.get(b"BitsPerComponent").and_then(Object::as_i64).unwrap_or(8).max(1) as usize;
    let columns = params.get(b"Columns").and_then(Object::as_i64).unwrap_or(1).max(1) as usize;

    let bytes_per_pixel = (colors * bpc).div_ceil(8).max(1);
    let row_bytes = (colors * bpc * columns).div_ceil(8);
    if row_bytes == 0 {
        return Ok(data);
    }

    if predictor == 2 {
        Ok(undo_tiff_predictor(data, row_bytes, bytes_per_pixel, bpc, colors))
    } else {
        undo_png_predictor(&data, row_bytes, bytes_per_pixel)
    }
}

fn undo_tiff_predictor(mut data: Vec<u8>, row_bytes: usize, bytes_per_pixel: usize, bpc: usize, colors: usize) -> Vec<u8> {
    if bpc != 8 {
        // Sub-byte TIFF prediction is rare in practice; pass through unmodified
        // rather than guess at ambiguous bit-level arithmetic.
        return data;
    }
    for row in data.chunks_mut(row_bytes) {
        for i in bytes_per_pixel..row.len() {
            row[i] = row[i].wrapping_add(row[i - bytes_per_pixel]);
        }
    }
    let _ = colors;
    data
}

fn undo_png_predictor(data: &[u8], row_bytes: usize, bytes_per_pixel: usize) -> Result<Vec<u8>> {
    let stride = row_bytes + 1;
    let mut out = Vec::with_capacity((data.len() / stride.max(1)) * row_bytes);
    let mut prior = vec![0u8; row_bytes];

    for chunk in data.chunks(stride) {
        if chunk.len() < 2 {
            break;
        }
        let filter_type = chunk[0];
        let mut row = chunk[1..].to_vec();
        row.resize(row_bytes, 0);

        for i in 0..row.len() {
            let a = if i >= bytes_per_pixel { row[i - bytes_per_pixel] } else { 0 };
            let b = prior[i];
            let c = if i >= bytes_per_pixel { prior[i - bytes_per_pixel] } else { 0 };
            row[i] = match filter_type {
                0 => row[i],
                1 => row[i].wrapping_add(a),
                2 => row[i].wrapping_add(b),
                3 => row[i].wrapping_add(((a as u16 + b as u16) / 2) as u8),
                4 => row[i].wrapping_add(paeth(a, b, c)),
                _ => return Err(crate::Error::InvalidStream(format!("unknown PNG predictor filter type {filter_type}"))),
            };
        }

        out.extend_from_slice(&row);
        prior = row;
    }

    Ok(out)
}

fn paeth(a: u8, b: u8, c: u8) -> u8 {
    let (a, b, c) = (a as i32, b as i32, c as i32);
    let p = a + b - c;
    let pa = (p - a).abs();
    let pb = (p - b).abs();
    let pc = (p - c).abs();
    if pa <= pb && pa <= pc {
        a as u8
    } else if pb <= pc {
        b as u8
    } else {
        c as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn png_sub_filter_round_trip() {
        // Row: 1, 2, 3, 4 with "sub" filtering against bytes_per_pixel=1.
        let raw_row = [1u8, 2, 3, 4];
        let mut filtered = vec![1u8]; // filter type 1 = Sub
        filtered.push(raw_row[0]);
        for i in 1..raw_row.len() {
            filtered.push(raw_row[i].wrapping_sub(raw_row[i - 1]));
        }

        let mut dict = Dictionary::new();
        dict.set(b"Predictor".to_vec(), Object::Integer(15));
        dict.set(b"Colors".to_vec(), Object::Integer(1));
        dict.set(b"BitsPerComponent".to_vec(), Object::Integer(8));
        dict.set(b"Columns".to_vec(), Object::Integer(4));

        let decoded = apply(Some(&dict), filtered).unwrap();
        assert_eq!(decoded, raw_row);
    }
}
