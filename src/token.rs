//! # Token codec (C1)
//!
//! AEAD-sealed bearer tokens. A process-wide symmetric key is generated once
//! and persisted to disk; tokens are opened with it and never raise across
//! the module boundary — callers get a tagged [`DecodedToken`] back instead.
//!
//! Wire format: URL-safe base64 of `nonce(12) || aes-gcm-ciphertext || tag`.
//! Plaintext is `part_1 ** part_2 ** ... ** uuid4 ** iso8601_seconds`.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::{AeadCore, Aes256Gcm, Key, Nonce};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Separator joining token parts in the AEAD plaintext.
pub const SEPARATOR: &str = "**";

/// Sentinel id returned when decoding fails.
pub const NONE_ID: &str = "00000000-0000-0000-0000-000000000001";

/// A token is rejected once it is this many days old.
pub const MAX_TOKEN_AGE_DAYS: i64 = 365;

/// Token codec errors. These only occur at key-file setup time; decode
/// failures are represented as a `DecodedToken` with `success = false`
/// rather than an `Err`, per the component's "never raise" contract.
#[derive(Error, Debug)]
pub enum TokenError {
    /// The key file could not be read or written.
    #[error("key file I/O error: {0}")]
    Io(#[from] io::Error),
    /// The key file existed but did not contain valid JSON / a valid key.
    #[error("malformed key file at {0}")]
    MalformedKeyFile(PathBuf),
}

/// Result of decoding a token blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedToken {
    /// Whether the blob decrypted and parsed successfully.
    pub success: bool,
    /// The ordered list of tagged strings carried by the token (principal
    /// id, capability tags, ...). Empty when `success` is false.
    pub parts: Vec<String>,
    /// Age of the token in whole days.
    pub days_old: i64,
    /// The UUIDv4 request-binding id embedded in the token, or
    /// [`NONE_ID`] on failure.
    pub id: String,
}

impl DecodedToken {
    fn failure() -> Self {
        Self {
            success: false,
            parts: Vec::new(),
            days_old: 0,
            id: NONE_ID.to_string(),
        }
    }

    /// Whether this token is accepted: decrypted successfully, not expired,
    /// carries a well-formed UUIDv4 id, and contains no part present in
    /// `blacklist`.
    pub fn is_authorized(&self, is_blacklisted: impl Fn(&str) -> bool) -> bool {
        self.success
            && self.days_old < MAX_TOKEN_AGE_DAYS
            && Uuid::parse_str(&self.id)
                .map(|u| u.get_version_num() == 4)
                .unwrap_or(false)
            && !self.parts.iter().any(|p| is_blacklisted(p))
    }
}

#[derive(Serialize, Deserialize)]
struct KeyFile {
    key: String,
}

/// AEAD bearer-token codec bound to one symmetric key.
pub struct TokenCodec {
    key: [u8; 32],
}

impl TokenCodec {
    /// Load the key from `path`, generating and atomically persisting a
    /// fresh CSPRNG key if the file does not exist.
    pub fn load_or_generate(path: &Path) -> Result<Self, TokenError> {
        if path.exists() {
            let raw = fs::read_to_string(path)?;
            let parsed: KeyFile = serde_json::from_str(&raw)
                .map_err(|_| TokenError::MalformedKeyFile(path.to_path_buf()))?;
            let key_bytes = base64::engine::general_purpose::STANDARD
                .decode(&parsed.key)
                .map_err(|_| TokenError::MalformedKeyFile(path.to_path_buf()))?;
            let key: [u8; 32] = key_bytes
                .try_into()
                .map_err(|_| TokenError::MalformedKeyFile(path.to_path_buf()))?;
            Ok(Self { key })
        } else {
            let mut key = [0u8; 32];
            use rand::RngCore;
            rand::rngs::OsRng.fill_bytes(&mut key);
            Self::persist(path, &key)?;
            Ok(Self { key })
        }
    }

    fn persist(path: &Path, key: &[u8; 32]) -> Result<(), TokenError> {
        let encoded = base64::engine::general_purpose::STANDARD.encode(key);
        let body = serde_json::to_string_pretty(&KeyFile { key: encoded })
            .expect("KeyFile serialization is infallible");
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, body)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }

    /// Encode an ordered list of parts into a sealed bearer token.
    pub fn encode<S: AsRef<str>>(&self, parts: &[S]) -> String {
        let id = Uuid::new_v4().to_string();
        let issued_at = Utc::now().format("%Y-%m-%dT%H:%M:%S").to_string();

        let mut joined = String::new();
        for part in parts {
            joined.push_str(part.as_ref());
            joined.push_str(SEPARATOR);
        }
        joined.push_str(&id);
        joined.push_str(SEPARATOR);
        joined.push_str(&issued_at);

        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&self.key));
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = cipher
            .encrypt(&nonce, joined.as_bytes())
            .expect("AES-GCM encryption over a bounded in-memory buffer cannot fail");

        let mut blob = Vec::with_capacity(nonce.len() + ciphertext.len());
        blob.extend_from_slice(&nonce);
        blob.extend_from_slice(&ciphertext);
        URL_SAFE_NO_PAD.encode(blob)
    }

    /// Issue a token for an operator out-of-band (e.g. minting a new API
    /// key for a principal). Thin wrapper over [`Self::encode`] kept as a
    /// distinct, named entry point for that use.
    pub fn issue<S: AsRef<str>>(&self, parts: &[S]) -> String {
        self.encode(parts)
    }

    /// Attempt to open and parse a sealed bearer token. Never fails; a
    /// malformed or forged blob yields `DecodedToken { success: false, .. }`.
    pub fn decode(&self, blob: &str) -> DecodedToken {
        self.try_decode(blob).unwrap_or_else(DecodedToken::failure)
    }

    fn try_decode(&self, blob: &str) -> Option<DecodedToken> {
        let raw = URL_SAFE_NO_PAD.decode(blob).ok()?;
        if raw.len() < 12 {
            return None;
        }
        let (nonce_bytes, ciphertext) = raw.split_at(12);
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&self.key));
        let nonce = Nonce::<Aes256Gcm>::from_slice(nonce_bytes);
        let plaintext = cipher.decrypt(nonce, ciphertext).ok()?;
        let text = String::from_utf8(plaintext).ok()?;

        let mut segments: Vec<String> = text.split(SEPARATOR).map(str::to_string).collect();
        if segments.len() < 2 {
            return None;
        }
        let issued_at_raw = segments.pop()?;
        let id = segments.pop()?;

        let issued_at = parse_issued_at(&issued_at_raw)?;
        let days_old = (Utc::now() - issued_at).num_days();

        Some(DecodedToken {
            success: true,
            parts: segments,
            days_old,
            id,
        })
    }
}

fn parse_issued_at(raw: &str) -> Option<DateTime<Utc>> {
    chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S")
        .map(|naive| DateTime::from_naive_utc_and_offset(naive, Utc))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_codec() -> TokenCodec {
        TokenCodec { key: [7u8; 32] }
    }

    #[test]
    fn round_trips_parts_without_separator() {
        let codec = test_codec();
        let parts = vec!["user:alice".to_string(), "isLevel:1".to_string()];
        let token = codec.encode(&parts);
        let decoded = codec.decode(&token);

        assert!(decoded.success);
        assert_eq!(decoded.parts, parts);
        assert_eq!(decoded.days_old, 0);
        assert!(Uuid::parse_str(&decoded.id).is_ok());
    }

    #[test]
    fn garbage_blob_fails_closed() {
        let codec = test_codec();
        let decoded = codec.decode("not-a-real-token");
        assert!(!decoded.success);
        assert!(decoded.parts.is_empty());
        assert_eq!(decoded.days_old, 0);
        assert_eq!(decoded.id, NONE_ID);
    }

    #[test]
    fn wrong_key_fails_closed() {
        let codec_a = test_codec();
        let codec_b = TokenCodec { key: [9u8; 32] };
        let token = codec_a.encode(&["x"]);
        let decoded = codec_b.decode(&token);
        assert!(!decoded.success);
    }

    #[test]
    fn expired_token_is_not_authorized() {
        let codec = test_codec();
        let old_ts = (Utc::now() - chrono::Duration::days(366))
            .format("%Y-%m-%dT%H:%M:%S")
            .to_string();
        let id = Uuid::new_v4().to_string();
        let plaintext = format!("user:alice**{id}**{old_ts}");

        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&codec.key));
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = cipher.encrypt(&nonce, plaintext.as_bytes()).unwrap();
        let mut blob = Vec::new();
        blob.extend_from_slice(&nonce);
        blob.extend_from_slice(&ciphertext);
        let token = URL_SAFE_NO_PAD.encode(blob);

        let decoded = codec.decode(&token);
        assert!(decoded.success);
        assert!(decoded.days_old >= 365);
        assert!(!decoded.is_authorized(|_| false));
    }

    #[test]
    fn blacklisted_part_is_not_authorized() {
        let codec = test_codec();
        let token = codec.encode(&["user:banned"]);
        let decoded = codec.decode(&token);
        assert!(decoded.is_authorized(|_| false));
        assert!(!decoded.is_authorized(|p| p == "user:banned"));
    }
}
