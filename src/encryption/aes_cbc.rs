//! AES-CBC decryption for `/CFM /AESV2` (AES-128) and `/AESV3` (AES-256) crypt
//! filters. PDF prefixes each encrypted stream/string with a 16-byte
//! IV and pads the plaintext with PKCS#5 (RFC 2898) to a block boundary; `cbc` plus
//! the crate's own `Pkcs5` padding (see `pkcs5.rs`) decode that directly.

use aes::cipher::{BlockDecryptMut, KeyIvInit};

use crate::encryption::pkcs5::Pkcs5;
use crate::error::DecryptionError;
use crate::Result;

type Aes128CbcDec = cbc::Decryptor<aes::Aes128>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

const IV_LEN: usize = 16;

pub fn decrypt_aes128(key: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    if data.len() < IV_LEN {
        return Err(DecryptionError::CiphertextTooShort.into());
    }
    let (iv, ciphertext) = data.split_at(IV_LEN);
    if ciphertext.is_empty() {
        return Ok(Vec::new());
    }
    let mut buf = ciphertext.to_vec();
    let decryptor =
        Aes128CbcDec::new_from_slices(key, iv).map_err(|_| DecryptionError::MissingEntry("key/iv length"))?;
    let plain = decryptor
        .decrypt_padded_mut::<Pkcs5>(&mut buf)
        .map_err(|_| DecryptionError::InvalidPadding)?;
    Ok(plain.to_vec())
}

pub fn decrypt_aes256(key: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    if data.len() < IV_LEN {
        return Err(DecryptionError::CiphertextTooShort.into());
    }
    let (iv, ciphertext) = data.split_at(IV_LEN);
    if ciphertext.is_empty() {
        return Ok(Vec::new());
    }
    let mut buf = ciphertext.to_vec();
    let decryptor =
        Aes256CbcDec::new_from_slices(key, iv).map_err(|_| DecryptionError::MissingEntry("key/iv length"))?;
    let plain = decryptor
        .decrypt_padded_mut::<Pkcs5>(&mut buf)
        .map_err(|_| DecryptionError::InvalidPadding)?;
    Ok(plain.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use aes::cipher::{BlockEncryptMut, KeyIvInit as _};

    #[test]
    fn aes128_round_trips() {
        let key = [0x11u8; 16];
        let iv = [0x22u8; 16];
        let plaintext = b"the quick brown fox";

        let mut buf = plaintext.to_vec();
        let pad_len = 16 - (buf.len() % 16);
        buf.resize(buf.len() + pad_len, 0);
        let enc = cbc::Encryptor::<aes::Aes128>::new_from_slices(&key, &iv).unwrap();
        let n = plaintext.len();
        let ct = enc.encrypt_padded_mut::<Pkcs5>(&mut buf, n).unwrap();

        let mut packet = iv.to_vec();
        packet.extend_from_slice(ct);

        let decoded = decrypt_aes128(&key, &packet).unwrap();
        assert_eq!(decoded, plaintext);
    }
}
