//! GCM (Galois/Counter Mode) authenticated encryption.
//!
//! Implements GCM as defined in NIST SP 800-38D on top of the
//! [`BlockCipher`](crate::provider::BlockCipher) trait, with SM4 as the
//! block cipher ([`Sm4Gcm`]). Decryption authenticates the ciphertext
//! in full before any plaintext is produced.

use gmcore_types::CryptoError;
use subtle::ConstantTimeEq;
use zeroize::Zeroize;

use crate::provider::{Aead, BlockCipher};
use crate::sm4::{Sm4Key, SM4_KEY_SIZE};

/// GCM authentication tag size in bytes.
pub const GCM_TAG_SIZE: usize = 16;

// ---------------------------------------------------------------------------
// GF(2^128) kernel and GHASH
// ---------------------------------------------------------------------------

/// Multiply two elements of GF(2^128) under x^128 + x^7 + x^2 + x + 1,
/// treating each value as a big-endian bit string.
///
/// Bit-serial schoolbook multiply: it branches on the bits of `x`, so
/// it is not constant-time. A carry-less-multiply kernel is the known
/// hardening follow-up.
pub(crate) fn gf128_mul(x: &[u8; 16], y: &[u8; 16]) -> [u8; 16] {
    let mut z = [0u8; 16];
    let mut v = *y;

    for i in 0..128 {
        if (x[i / 8] >> (7 - (i % 8))) & 1 == 1 {
            for j in 0..16 {
                z[j] ^= v[j];
            }
        }
        // V = V * x mod P(x): shift right one bit, reduce on carry-out.
        let carry = v[15] & 1;
        for j in (1..16).rev() {
            v[j] = (v[j] >> 1) | ((v[j - 1] & 1) << 7);
        }
        v[0] >>= 1;
        if carry == 1 {
            v[0] ^= 0xe1;
        }
    }
    z
}

/// Fold `data` into the running GHASH state `y`.
///
/// The final partial block is zero-padded; the padding is never
/// reflected in the length fields hashed by the caller.
fn ghash_update(h: &[u8; 16], y: &mut [u8; 16], data: &[u8]) {
    for chunk in data.chunks(16) {
        let mut block = [0u8; 16];
        block[..chunk.len()].copy_from_slice(chunk);
        for j in 0..16 {
            y[j] ^= block[j];
        }
        *y = gf128_mul(y, h);
    }
}

/// Increment the last 4 bytes of a 16-byte counter (big-endian INC32).
///
/// The upper 96 bits are never carried into.
fn inc32(counter: &mut [u8; 16]) {
    let ctr =
        u32::from_be_bytes([counter[12], counter[13], counter[14], counter[15]]).wrapping_add(1);
    counter[12..16].copy_from_slice(&ctr.to_be_bytes());
}

/// Derive the base counter block J0 from the IV.
///
/// A 96-bit IV is used directly with the counter field set to 1; any
/// other length goes through GHASH with a trailing bit-length block.
pub(crate) fn derive_j0(h: &[u8; 16], iv: &[u8]) -> [u8; 16] {
    let mut j0 = [0u8; 16];
    if iv.len() == 12 {
        j0[..12].copy_from_slice(iv);
        j0[15] = 1;
    } else {
        let mut y = [0u8; 16];
        ghash_update(h, &mut y, iv);
        let mut len_block = [0u8; 16];
        len_block[8..].copy_from_slice(&((iv.len() as u64) * 8).to_be_bytes());
        for j in 0..16 {
            y[j] ^= len_block[j];
        }
        j0 = gf128_mul(&y, h);
    }
    j0
}

// ---------------------------------------------------------------------------
// Generic GCM core
// ---------------------------------------------------------------------------

/// XOR the CTR keystream starting at inc32(J0) into `data`.
fn ctr_xor(cipher: &dyn BlockCipher, j0: &[u8; 16], data: &mut [u8]) -> Result<(), CryptoError> {
    let block_size = cipher.block_size();
    let mut counter = *j0;
    inc32(&mut counter);

    for chunk in data.chunks_mut(block_size) {
        let mut keystream = counter;
        cipher.encrypt_block(&mut keystream)?;
        for (d, &k) in chunk.iter_mut().zip(keystream.iter()) {
            *d ^= k;
        }
        inc32(&mut counter);
    }
    Ok(())
}

/// Compute the authentication tag over AAD and ciphertext.
///
/// S = GHASH(AAD || C || [len(AAD)]64 || [len(C)]64); tag = E(J0) ^ S.
fn compute_tag(
    cipher: &dyn BlockCipher,
    h: &[u8; 16],
    j0: &[u8; 16],
    aad: &[u8],
    ciphertext: &[u8],
) -> Result<[u8; GCM_TAG_SIZE], CryptoError> {
    let mut s = [0u8; 16];
    ghash_update(h, &mut s, aad);
    ghash_update(h, &mut s, ciphertext);

    let mut len_block = [0u8; 16];
    len_block[..8].copy_from_slice(&((aad.len() as u64) * 8).to_be_bytes());
    len_block[8..].copy_from_slice(&((ciphertext.len() as u64) * 8).to_be_bytes());
    for j in 0..16 {
        s[j] ^= len_block[j];
    }
    s = gf128_mul(&s, h);

    let mut tag = *j0;
    cipher.encrypt_block(&mut tag)?;
    for (t, &b) in tag.iter_mut().zip(s.iter()) {
        *t ^= b;
    }
    Ok(tag)
}

// ---------------------------------------------------------------------------
// SM4-GCM
// ---------------------------------------------------------------------------

/// SM4-GCM authenticated encryption context.
///
/// Holds the expanded round keys and the GHASH subkey H = E(K, 0^128),
/// so repeated operations under one key pay the schedule cost once.
pub struct Sm4Gcm {
    key: Sm4Key,
    h: [u8; 16],
}

impl Drop for Sm4Gcm {
    fn drop(&mut self) {
        // The subkey is key material too; Sm4Key zeroizes itself.
        self.h.zeroize();
    }
}

impl Sm4Gcm {
    /// Create a new SM4-GCM context from a 16-byte key.
    pub fn new(key: &[u8]) -> Result<Self, CryptoError> {
        let key = Sm4Key::new(key)?;
        let mut h = [0u8; 16];
        key.encrypt_block(&mut h)?;
        Ok(Self { key, h })
    }

    /// Encrypt and authenticate `plaintext` with associated data `aad`.
    ///
    /// The IV may have any length; 12 bytes is the standard-preferred
    /// size. Returns the ciphertext (same length as the plaintext) and
    /// the 16-byte tag.
    pub fn seal(
        &self,
        iv: &[u8],
        aad: &[u8],
        plaintext: &[u8],
    ) -> Result<(Vec<u8>, [u8; GCM_TAG_SIZE]), CryptoError> {
        let j0 = derive_j0(&self.h, iv);

        let mut ciphertext = plaintext.to_vec();
        ctr_xor(&self.key, &j0, &mut ciphertext)?;

        let tag = compute_tag(&self.key, &self.h, &j0, aad, &ciphertext)?;
        Ok((ciphertext, tag))
    }

    /// Verify the tag and decrypt `ciphertext`.
    ///
    /// The expected tag is recomputed from the received ciphertext and
    /// compared in constant time. Authentication strictly precedes
    /// decryption: on mismatch this returns
    /// [`CryptoError::AeadTagVerifyFail`] and no plaintext is produced.
    pub fn open(
        &self,
        iv: &[u8],
        aad: &[u8],
        ciphertext: &[u8],
        tag: &[u8; GCM_TAG_SIZE],
    ) -> Result<Vec<u8>, CryptoError> {
        let j0 = derive_j0(&self.h, iv);

        let expected = compute_tag(&self.key, &self.h, &j0, aad, ciphertext)?;
        if expected.ct_eq(tag).unwrap_u8() != 1 {
            return Err(CryptoError::AeadTagVerifyFail);
        }

        let mut plaintext = ciphertext.to_vec();
        ctr_xor(&self.key, &j0, &mut plaintext)?;
        Ok(plaintext)
    }
}

impl Aead for Sm4Gcm {
    fn tag_size(&self) -> usize {
        GCM_TAG_SIZE
    }

    fn nonce_size(&self) -> usize {
        12
    }

    fn key_size(&self) -> usize {
        SM4_KEY_SIZE
    }

    fn set_key(&mut self, key: &[u8]) -> Result<(), CryptoError> {
        *self = Sm4Gcm::new(key)?;
        Ok(())
    }

    fn encrypt(&self, nonce: &[u8], aad: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let (mut ct, tag) = self.seal(nonce, aad, plaintext)?;
        ct.extend_from_slice(&tag);
        Ok(ct)
    }

    fn decrypt(&self, nonce: &[u8], aad: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        if ciphertext.len() < GCM_TAG_SIZE {
            return Err(CryptoError::InvalidArg);
        }
        let ct_len = ciphertext.len() - GCM_TAG_SIZE;
        let (ct_data, tag) = ciphertext.split_at(ct_len);
        self.open(nonce, aad, ct_data, tag.try_into().unwrap())
    }
}

/// Encrypt and authenticate data using SM4-GCM.
/// Returns ciphertext || 16-byte tag.
pub fn sm4_gcm_encrypt(
    key: &[u8],
    nonce: &[u8],
    aad: &[u8],
    plaintext: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    Sm4Gcm::new(key)?.encrypt(nonce, aad, plaintext)
}

/// Decrypt and verify data using SM4-GCM.
/// `ciphertext` includes the appended 16-byte tag.
/// Returns plaintext on success, or an error if authentication fails.
pub fn sm4_gcm_decrypt(
    key: &[u8],
    nonce: &[u8],
    aad: &[u8],
    ciphertext: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    Sm4Gcm::new(key)?.decrypt(nonce, aad, ciphertext)
}
