//! Password-based encryption of serializable values.
//!
//! # Responsibility
//! - Serialize a value to JSON and seal it under a password.
//! - Open a sealed blob back into a typed value.
//!
//! # Invariants
//! - `open(seal(v, p), p) == v` for every serializable `v` and non-empty `p`.
//! - Every decode failure (wrong password, truncation, tampering, malformed
//!   JSON) collapses to [`VaultError::Mismatch`].
//! - The codec holds no state besides its KDF parameters.
//!
//! # Wire format
//! Standard base64 of:
//! `b"NVLT" | version:u8 | m_cost:u32le | t_cost:u32le | p_cost:u32le |
//!  salt[16] | nonce[24] | XChaCha20-Poly1305 ciphertext+tag`.

use crate::vault::VaultError;
use argon2::{Algorithm, Argon2, Params, Version};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chacha20poly1305::aead::{Aead, AeadCore, KeyInit, OsRng};
use chacha20poly1305::{Key, XChaCha20Poly1305, XNonce};
use rand::RngCore;
use serde::de::DeserializeOwned;
use serde::Serialize;
use zeroize::Zeroizing;

const MAGIC: &[u8; 4] = b"NVLT";
const FORMAT_VERSION: u8 = 1;
const SALT_LEN: usize = 16;
const NONCE_LEN: usize = 24;
const KEY_LEN: usize = 32;
const HEADER_LEN: usize = MAGIC.len() + 1 + 4 * 3 + SALT_LEN + NONCE_LEN;

/// Upper bound accepted from a blob header, in KiB (256 MiB).
const MAX_M_COST_KIB: u32 = 256 * 1024;
const MAX_T_COST: u32 = 16;
const MAX_P_COST: u32 = 8;

/// Argon2id cost parameters recorded in every sealed blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KdfParams {
    /// Memory cost in KiB.
    pub m_cost: u32,
    pub t_cost: u32,
    pub p_cost: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            m_cost: Params::DEFAULT_M_COST,
            t_cost: Params::DEFAULT_T_COST,
            p_cost: Params::DEFAULT_P_COST,
        }
    }
}

impl KdfParams {
    /// Cheapest parameters Argon2 accepts. Meant for tests only.
    pub fn insecure_fast() -> Self {
        Self {
            m_cost: Params::MIN_M_COST.max(8),
            t_cost: 1,
            p_cost: 1,
        }
    }

    /// Whether the parameters are accepted for sealing and opening.
    pub fn within_bounds(&self) -> bool {
        (1..=MAX_P_COST).contains(&self.p_cost)
            && (1..=MAX_T_COST).contains(&self.t_cost)
            && (8 * self.p_cost..=MAX_M_COST_KIB).contains(&self.m_cost)
    }
}

/// Stateless vault encoder/decoder.
#[derive(Debug, Clone, Copy, Default)]
pub struct VaultCodec {
    params: KdfParams,
}

impl VaultCodec {
    pub fn new(params: KdfParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> KdfParams {
        self.params
    }

    /// Serializes `value` and seals it under `password`.
    ///
    /// # Errors
    /// - [`VaultError::Encode`] when `value` cannot be serialized to JSON or
    ///   the configured KDF parameters are rejected. Neither happens for
    ///   document state with default parameters.
    pub fn encrypt<T: Serialize + ?Sized>(
        &self,
        value: &T,
        password: &str,
    ) -> Result<String, VaultError> {
        let plaintext = Zeroizing::new(
            serde_json::to_vec(value)
                .map_err(|err| VaultError::Encode(format!("serialize failed: {err}")))?,
        );

        let mut salt = [0u8; SALT_LEN];
        OsRng.fill_bytes(&mut salt);
        let key = derive_key(password, &salt, self.params)
            .ok_or_else(|| VaultError::Encode("key derivation rejected parameters".to_string()))?;

        let cipher = XChaCha20Poly1305::new(Key::from_slice(key.as_slice()));
        let nonce = XChaCha20Poly1305::generate_nonce(&mut OsRng);
        let sealed = cipher
            .encrypt(&nonce, plaintext.as_slice())
            .map_err(|_| VaultError::Encode("cipher rejected plaintext".to_string()))?;

        let mut blob = Vec::with_capacity(HEADER_LEN + sealed.len());
        blob.extend_from_slice(MAGIC);
        blob.push(FORMAT_VERSION);
        blob.extend_from_slice(&self.params.m_cost.to_le_bytes());
        blob.extend_from_slice(&self.params.t_cost.to_le_bytes());
        blob.extend_from_slice(&self.params.p_cost.to_le_bytes());
        blob.extend_from_slice(&salt);
        blob.extend_from_slice(nonce.as_slice());
        blob.extend_from_slice(&sealed);

        Ok(STANDARD.encode(blob))
    }

    /// Opens a sealed blob and deserializes it as `T`.
    ///
    /// Uses the KDF parameters recorded in the blob, not the codec's own.
    pub fn decrypt<T: DeserializeOwned>(
        &self,
        ciphertext: &str,
        password: &str,
    ) -> Result<T, VaultError> {
        let plaintext = open_blob(ciphertext.trim(), password).ok_or(VaultError::Mismatch)?;
        serde_json::from_slice(plaintext.as_slice()).map_err(|_| VaultError::Mismatch)
    }
}

fn open_blob(encoded: &str, password: &str) -> Option<Zeroizing<Vec<u8>>> {
    let blob = STANDARD.decode(encoded).ok()?;
    if blob.len() <= HEADER_LEN || &blob[..MAGIC.len()] != MAGIC {
        return None;
    }

    let mut cursor = MAGIC.len();
    if blob[cursor] != FORMAT_VERSION {
        return None;
    }
    cursor += 1;

    let mut next_u32 = || {
        let bytes: [u8; 4] = blob[cursor..cursor + 4].try_into().ok()?;
        cursor += 4;
        Some(u32::from_le_bytes(bytes))
    };
    let params = KdfParams {
        m_cost: next_u32()?,
        t_cost: next_u32()?,
        p_cost: next_u32()?,
    };
    if !params.within_bounds() {
        return None;
    }

    let salt = &blob[cursor..cursor + SALT_LEN];
    cursor += SALT_LEN;
    let nonce = XNonce::from_slice(&blob[cursor..cursor + NONCE_LEN]);
    cursor += NONCE_LEN;

    let key = derive_key(password, salt, params)?;
    let cipher = XChaCha20Poly1305::new(Key::from_slice(key.as_slice()));
    cipher
        .decrypt(nonce, &blob[cursor..])
        .ok()
        .map(Zeroizing::new)
}

fn derive_key(password: &str, salt: &[u8], params: KdfParams) -> Option<Zeroizing<[u8; KEY_LEN]>> {
    let params = Params::new(params.m_cost, params.t_cost, params.p_cost, Some(KEY_LEN)).ok()?;
    let argon = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);
    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    argon
        .hash_password_into(password.as_bytes(), salt, key.as_mut_slice())
        .ok()?;
    Some(key)
}
