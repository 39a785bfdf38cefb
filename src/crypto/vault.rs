//! Credential encryption at rest.
//!
//! Every record gets its own salt and IV. The AES-256-GCM key is derived
//! from the master key with PBKDF2-HMAC-SHA512. Stored form is
//! `hex(salt):hex(iv):hex(ciphertext):hex(tag)`.

use std::sync::Arc;

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use pbkdf2::pbkdf2_hmac;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Sha512;
use tracing::{debug, warn};

use crate::error::{GateError, Result};

/// PBKDF2 iteration count for stored records
pub const DEFAULT_ITERATIONS: u32 = 100_000;

const SALT_LEN: usize = 64;
const IV_LEN: usize = 12;
const TAG_LEN: usize = 16;
const KEY_LEN: usize = 32;

/// Encrypts and decrypts exchange credentials
#[derive(Clone)]
pub struct Vault {
    master_key: Arc<Vec<u8>>,
    iterations: u32,
}

impl Vault {
    /// Create a vault from the master key.
    ///
    /// An empty key is replaced by a random one; records written with it
    /// cannot be read after a restart.
    pub fn new(master_key: &str) -> Self {
        Self::with_iterations(master_key, DEFAULT_ITERATIONS)
    }

    pub fn with_iterations(master_key: &str, iterations: u32) -> Self {
        let key = if master_key.is_empty() {
            warn!("ENCRYPTION_KEY is not set, using an ephemeral vault key");
            let mut key_bytes = [0u8; KEY_LEN];
            OsRng.fill_bytes(&mut key_bytes);
            key_bytes.to_vec()
        } else {
            master_key.as_bytes().to_vec()
        };

        Self {
            master_key: Arc::new(key),
            iterations: iterations.max(1),
        }
    }

    fn derive_key(&self, salt: &[u8]) -> [u8; KEY_LEN] {
        let mut key = [0u8; KEY_LEN];
        pbkdf2_hmac::<Sha512>(&self.master_key, salt, self.iterations, &mut key);
        key
    }

    /// Encrypt a secret into the stored format
    pub fn encrypt(&self, plaintext: &str) -> Result<String> {
        let mut salt = [0u8; SALT_LEN];
        OsRng.fill_bytes(&mut salt);
        let mut iv = [0u8; IV_LEN];
        OsRng.fill_bytes(&mut iv);

        let key = self.derive_key(&salt);
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key));

        let sealed = cipher
            .encrypt(Nonce::from_slice(&iv), plaintext.as_bytes())
            .map_err(|_| GateError::Encryption)?;

        // aes-gcm appends the tag to the ciphertext
        let (ciphertext, tag) = sealed.split_at(sealed.len() - TAG_LEN);

        Ok(format!(
            "{}:{}:{}:{}",
            hex::encode(salt),
            hex::encode(iv),
            hex::encode(ciphertext),
            hex::encode(tag)
        ))
    }

    /// Decrypt a value produced by [`Vault::encrypt`]
    pub fn decrypt(&self, stored: &str) -> Result<String> {
        let parts: Vec<&str> = stored.split(':').collect();
        let [salt, iv, ciphertext, tag] = parts.as_slice() else {
            debug!(parts = parts.len(), "Stored credential has wrong number of parts");
            return Err(GateError::Decryption);
        };

        let salt = hex::decode(salt).map_err(|_| GateError::Decryption)?;
        let iv = hex::decode(iv).map_err(|_| GateError::Decryption)?;
        let ciphertext = hex::decode(ciphertext).map_err(|_| GateError::Decryption)?;
        let tag = hex::decode(tag).map_err(|_| GateError::Decryption)?;

        if salt.len() != SALT_LEN || iv.len() != IV_LEN || tag.len() != TAG_LEN {
            return Err(GateError::Decryption);
        }

        let key = self.derive_key(&salt);
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key));

        let mut sealed = ciphertext;
        sealed.extend_from_slice(&tag);

        let plaintext = cipher
            .decrypt(Nonce::from_slice(&iv), sealed.as_slice())
            .map_err(|_| GateError::Decryption)?;

        String::from_utf8(plaintext).map_err(|_| GateError::Decryption)
    }
}

/// Show only the first and last four characters of a secret
pub fn mask(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 8 {
        return "*".repeat(chars.len());
    }

    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}{}{}", head, "*".repeat(chars.len() - 8), tail)
}
