// # Secret Store
//
// Encrypts provider credentials before they reach the state store.
//
// The process-wide master secret is hashed with SHA-256 into a 256-bit
// AES-GCM key, so secrets of any length are accepted. Ciphertext layout is
// base64(nonce || ciphertext || tag) with a fresh 96-bit nonce per call.
//
// Changing the master secret makes every stored ciphertext undecryptable;
// callers treat that as "credentials not configured".

use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use sha2::{Digest, Sha256};
use std::fmt;

use crate::error::{Error, Result};

const NONCE_LENGTH: usize = 12;

/// Symmetric secret store keyed by the master secret
pub struct SecretStore {
    cipher: Aes256Gcm,
}

impl SecretStore {
    /// Derive the cipher key from the master secret
    pub fn new(master_secret: &str) -> Self {
        let digest = Sha256::digest(master_secret.as_bytes());
        let key = Key::<Aes256Gcm>::from_slice(digest.as_slice());
        Self {
            cipher: Aes256Gcm::new(key),
        }
    }

    /// Encrypt a plaintext value
    ///
    /// The empty string encrypts to the empty string so unset credentials
    /// round-trip unchanged.
    pub fn encrypt(&self, plaintext: &str) -> Result<String> {
        if plaintext.is_empty() {
            return Ok(String::new());
        }

        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|_| Error::Other("encryption failed".to_string()))?;

        let mut combined = nonce.to_vec();
        combined.extend(ciphertext);
        Ok(BASE64.encode(combined))
    }

    /// Decrypt a value produced by [`SecretStore::encrypt`]
    ///
    /// The empty string decrypts to the empty string. Anything that fails
    /// authentication (tampering, different master secret, truncation) is a
    /// [`Error::Decryption`].
    pub fn decrypt(&self, encoded: &str) -> Result<String> {
        if encoded.is_empty() {
            return Ok(String::new());
        }

        let data = BASE64
            .decode(encoded.trim())
            .map_err(|_| Error::decryption("ciphertext is not valid base64"))?;

        if data.len() <= NONCE_LENGTH {
            return Err(Error::decryption("ciphertext is truncated"));
        }

        let (nonce_bytes, ciphertext) = data.split_at(NONCE_LENGTH);
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
            .map_err(|_| Error::decryption("authentication tag mismatch"))?;

        String::from_utf8(plaintext).map_err(|_| Error::decryption("plaintext is not UTF-8"))
    }
}

impl fmt::Debug for SecretStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretStore")
            .field("key", &"<REDACTED>")
            .finish()
    }
}
