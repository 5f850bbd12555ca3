//! Optional authenticated encryption stage.
//!
//! Encryption runs last on the write path, so the stored payload is
//! `nonce || ciphertext || tag`. Decryption runs first on the read path,
//! which bounds what the decompressor is ever fed.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Key, Nonce,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use rand::{rngs::OsRng, RngCore};

use chronik_core::{Result, StoreError};

/// Nonce length prefixed to every ciphertext.
pub const NONCE_LEN: usize = 12;
/// Authentication tag length appended to every ciphertext.
pub const TAG_LEN: usize = 16;

/// Authenticated encryption over record payloads.
pub trait Cipher: Send + Sync {
    /// Encrypt, producing `nonce || ciphertext || tag`.
    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>>;

    /// Verify the tag and recover the plaintext.
    fn decrypt(&self, data: &[u8]) -> Result<Vec<u8>>;
}

/// Return a fresh random key of the requested byte length.
pub fn random_key(len: usize) -> Vec<u8> {
    let mut key = vec![0u8; len];
    OsRng.fill_bytes(&mut key);
    key
}

/// AES-256-GCM cipher with a random nonce per record.
pub struct Aes256GcmCipher {
    cipher: Aes256Gcm,
}

impl Aes256GcmCipher {
    /// Cipher from a raw 32-byte key.
    pub fn new(key: &[u8; 32]) -> Self {
        Self {
            cipher: Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key)),
        }
    }

    /// Cipher from a base64-encoded 32-byte key, the form carried in
    /// configuration.
    pub fn from_base64(key: &str) -> Result<Self> {
        let bytes = BASE64
            .decode(key)
            .map_err(|e| StoreError::Integrity(format!("cipher key is not valid base64: {e}")))?;
        let key: [u8; 32] = bytes.try_into().map_err(|bytes: Vec<u8>| {
            StoreError::Integrity(format!(
                "cipher key must be 32 bytes, got {}",
                bytes.len()
            ))
        })?;
        Ok(Self::new(&key))
    }

    /// Generate a fresh random 32-byte key.
    pub fn generate_key() -> [u8; 32] {
        let mut key = [0u8; 32];
        OsRng.fill_bytes(&mut key);
        key
    }

    /// Base64 form of a key, for provisioning configuration.
    pub fn export_key_base64(key: &[u8; 32]) -> String {
        BASE64.encode(key)
    }
}

impl Cipher for Aes256GcmCipher {
    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);
        let ciphertext = self
            .cipher
            .encrypt(nonce, plaintext)
            .map_err(|_| StoreError::Integrity("encryption failed".into()))?;
        let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        out.extend_from_slice(&nonce_bytes);
        out.extend_from_slice(&ciphertext);
        Ok(out)
    }

    fn decrypt(&self, data: &[u8]) -> Result<Vec<u8>> {
        if data.len() < NONCE_LEN + TAG_LEN {
            return Err(StoreError::Integrity("ciphertext is truncated".into()));
        }
        let (nonce_bytes, ciphertext) = data.split_at(NONCE_LEN);
        let nonce = Nonce::from_slice(nonce_bytes);
        self.cipher
            .decrypt(nonce, ciphertext)
            .map_err(|_| StoreError::Integrity("cipher tag verification failed".into()))
    }
}
