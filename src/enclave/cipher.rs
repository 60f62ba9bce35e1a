// Unraid BFF — Record Cipher
//
// AES-256-GCM with a 16-byte nonce and a 16-byte tag. A sealed record is three
// lowercase hex fields joined by dots: `<nonce>.<tag>.<ciphertext>`.

use std::path::Path;

use aes_gcm::aead::consts::U16;
use aes_gcm::aead::generic_array::GenericArray;
use aes_gcm::aead::{AeadInPlace, KeyInit};
use aes_gcm::aes::Aes256;
use aes_gcm::AesGcm;
use rand::RngCore;
use zeroize::Zeroizing;

use super::provider::{resolve_key, ConfiguredSecret, DerivedKey, GeneratedKeyFile};
use super::EnclaveError;

type RecordCipher = AesGcm<Aes256, U16>;

const NONCE_LEN: usize = 16;
const TAG_LEN: usize = 16;

/// Result of opening a sealed record.
pub struct Opened {
    pub plaintext: Zeroizing<String>,
    /// The record was sealed with the legacy key and should be re-sealed.
    pub needs_reseal: bool,
}

/// The current store key plus the legacy key accepted for decryption only.
#[derive(Debug)]
pub struct KeyRing {
    current: DerivedKey,
    legacy: DerivedKey,
}

impl KeyRing {
    pub fn new(current: DerivedKey) -> Self {
        Self {
            current,
            legacy: DerivedKey::legacy(),
        }
    }

    /// Resolve the current key from the configured secret, falling back to the
    /// generated key file in `data_dir`.
    pub fn resolve(configured_secret: Option<&str>, data_dir: &Path) -> Result<Self, EnclaveError> {
        let configured = ConfiguredSecret::new(configured_secret);
        let key_file = GeneratedKeyFile::in_dir(data_dir);
        let current = resolve_key(&[&configured, &key_file])?;
        Ok(Self::new(current))
    }

    /// Encrypt `plaintext` under the current key with a fresh random nonce.
    pub fn seal(&self, plaintext: &str) -> Result<String, EnclaveError> {
        let cipher = cipher_for(&self.current)?;

        let mut nonce = [0u8; NONCE_LEN];
        rand::rng().fill_bytes(&mut nonce);

        let mut buffer = Zeroizing::new(plaintext.as_bytes().to_vec());
        let tag = cipher
            .encrypt_in_place_detached(GenericArray::from_slice(&nonce), b"", buffer.as_mut_slice())
            .map_err(|_| EnclaveError::EncryptionFailed)?;

        Ok(format!(
            "{}.{}.{}",
            hex::encode(nonce),
            hex::encode(tag),
            hex::encode(buffer.as_slice())
        ))
    }

    /// Decrypt a sealed record, trying the current key then the legacy key.
    pub fn open(&self, record: &str) -> Result<Opened, EnclaveError> {
        let parsed = ParsedRecord::parse(record)?;

        if let Some(plaintext) = parsed.decrypt(&self.current)? {
            return Ok(Opened {
                plaintext,
                needs_reseal: false,
            });
        }

        if let Some(plaintext) = parsed.decrypt(&self.legacy)? {
            tracing::info!("Store record sealed with the legacy key, scheduling re-encryption");
            return Ok(Opened {
                plaintext,
                needs_reseal: true,
            });
        }

        Err(EnclaveError::DecryptionFailed)
    }
}

fn cipher_for(key: &DerivedKey) -> Result<RecordCipher, EnclaveError> {
    RecordCipher::new_from_slice(key.as_bytes()).map_err(|_| EnclaveError::EncryptionFailed)
}

// ─── Record Parsing ──────────────────────────────────────────────────────────

struct ParsedRecord {
    nonce: [u8; NONCE_LEN],
    tag: [u8; TAG_LEN],
    ciphertext: Vec<u8>,
}

impl ParsedRecord {
    fn parse(record: &str) -> Result<Self, EnclaveError> {
        let fields: Vec<&str> = record.trim().split('.').collect();
        if fields.len() != 3 {
            return Err(EnclaveError::CorruptPayload(format!(
                "expected 3 fields, found {}",
                fields.len()
            )));
        }

        let nonce = decode_fixed::<NONCE_LEN>(fields[0], "nonce")?;
        let tag = decode_fixed::<TAG_LEN>(fields[1], "tag")?;
        let ciphertext = hex::decode(fields[2])
            .map_err(|e| EnclaveError::CorruptPayload(format!("ciphertext: {}", e)))?;

        Ok(Self {
            nonce,
            tag,
            ciphertext,
        })
    }

    /// `Ok(None)` when authentication fails under `key`.
    fn decrypt(&self, key: &DerivedKey) -> Result<Option<Zeroizing<String>>, EnclaveError> {
        let cipher = cipher_for(key)?;
        let mut buffer = Zeroizing::new(self.ciphertext.clone());

        let authenticated = cipher
            .decrypt_in_place_detached(
                GenericArray::from_slice(&self.nonce),
                b"",
                buffer.as_mut_slice(),
                GenericArray::from_slice(&self.tag),
            )
            .is_ok();
        if !authenticated {
            return Ok(None);
        }

        let text = String::from_utf8(buffer.to_vec())
            .map_err(|_| EnclaveError::CorruptPayload("plaintext is not UTF-8".to_string()))?;
        Ok(Some(Zeroizing::new(text)))
    }
}

fn decode_fixed<const N: usize>(field: &str, label: &str) -> Result<[u8; N], EnclaveError> {
    let bytes =
        hex::decode(field).map_err(|e| EnclaveError::CorruptPayload(format!("{}: {}", label, e)))?;
    bytes.try_into().map_err(|bytes: Vec<u8>| {
        EnclaveError::CorruptPayload(format!("{} must be {} bytes, got {}", label, N, bytes.len()))
    })
}

// ─── Tests ───────────────────────────────────────────────────────────────────
