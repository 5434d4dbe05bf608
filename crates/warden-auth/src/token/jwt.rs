//! Compact JWT codec with HMAC signatures.
//!
//! Tokens are `base64url(header).base64url(payload).base64url(mac)` with no
//! padding. The MAC is computed over the first two segments exactly as they
//! appear on the wire.
//!
//! ## Supported Algorithms
//!
//! | Tag              | Digest       |
//! |------------------|--------------|
//! | `HmacMD5`        | MD5          |
//! | `HmacSHA1`       | SHA-1        |
//! | `HmacSHA224`     | SHA-224      |
//! | `HmacSHA256`     | SHA-256      |
//! | `HmacSHA384`     | SHA-384      |
//! | `HmacSHA512`     | SHA-512      |
//! | `HmacSHA512/224` | SHA-512/224  |
//! | `HmacSHA512/256` | SHA-512/256  |
//!
//! Tags are matched case-insensitively; `HS256`, `HS384` and `HS512` are
//! accepted as aliases.
//!
//! ## Example
//!
//! ```ignore
//! use warden_auth::token::jwt::{JwtCodec, SigningAlgorithm, SigningKey};
//!
//! let codec = JwtCodec::new(SigningKey::new(SigningAlgorithm::HmacSha256, "s3cret"));
//! let token = codec.sign(payload)?;
//! assert_eq!(codec.decode(token.as_str()), Some(token));
//! ```

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use hmac::{Hmac, Mac};
use md5::Md5;
use sha1::Sha1;
use sha2::{Sha224, Sha256, Sha384, Sha512, Sha512_224, Sha512_256};
use subtle::ConstantTimeEq;

use super::model::{Header, Payload, Token};
use crate::error::AuthError;

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur while signing a token.
///
/// Decoding has no error type: a token that fails to decode is absent.
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    /// The header names an algorithm this codec does not implement.
    #[error("Unsupported signing algorithm: '{name}'")]
    UnsupportedAlgorithm {
        /// The unrecognized tag.
        name: String,
    },

    /// The algorithm is refused by the configured signing policy.
    #[error("Signing algorithm {algorithm} is rejected by policy")]
    RejectedAlgorithm {
        /// The refused algorithm.
        algorithm: SigningAlgorithm,
    },

    /// The MAC primitive could not be keyed.
    #[error("Invalid signing key for {algorithm}")]
    InvalidKey {
        /// Algorithm the key was meant for.
        algorithm: SigningAlgorithm,
    },

    /// The header or payload could not be serialized.
    #[error("Failed to serialize token: {message}")]
    Serialization {
        /// Description of the serialization error.
        message: String,
    },
}

impl From<JwtError> for AuthError {
    fn from(err: JwtError) -> Self {
        AuthError::signing(err.to_string())
    }
}

// ============================================================================
// Signing Algorithm
// ============================================================================

/// HMAC variants a token can be signed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SigningAlgorithm {
    /// HMAC with MD5.
    HmacMd5,
    /// HMAC with SHA-1.
    HmacSha1,
    /// HMAC with SHA-224.
    HmacSha224,
    /// HMAC with SHA-256.
    HmacSha256,
    /// HMAC with SHA-384.
    HmacSha384,
    /// HMAC with SHA-512.
    HmacSha512,
    /// HMAC with SHA-512/224.
    HmacSha512_224,
    /// HMAC with SHA-512/256.
    HmacSha512_256,
}

impl SigningAlgorithm {
    /// Every supported algorithm, weakest digest first.
    pub const ALL: [Self; 8] = [
        Self::HmacMd5,
        Self::HmacSha1,
        Self::HmacSha224,
        Self::HmacSha256,
        Self::HmacSha384,
        Self::HmacSha512,
        Self::HmacSha512_224,
        Self::HmacSha512_256,
    ];

    /// Returns the canonical tag written into token headers.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HmacMd5 => "HmacMD5",
            Self::HmacSha1 => "HmacSHA1",
            Self::HmacSha224 => "HmacSHA224",
            Self::HmacSha256 => "HmacSHA256",
            Self::HmacSha384 => "HmacSHA384",
            Self::HmacSha512 => "HmacSHA512",
            Self::HmacSha512_224 => "HmacSHA512/224",
            Self::HmacSha512_256 => "HmacSHA512/256",
        }
    }

    /// Parses a tag case-insensitively, accepting the `HSxxx` aliases.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        if let Some(alg) = Self::ALL
            .into_iter()
            .find(|alg| alg.as_str().eq_ignore_ascii_case(name))
        {
            return Some(alg);
        }

        match name.to_ascii_uppercase().as_str() {
            "HS256" => Some(Self::HmacSha256),
            "HS384" => Some(Self::HmacSha384),
            "HS512" => Some(Self::HmacSha512),
            _ => None,
        }
    }

    /// Returns `true` for digests with known collision attacks.
    #[must_use]
    pub fn is_weak(&self) -> bool {
        matches!(self, Self::HmacMd5 | Self::HmacSha1)
    }

    /// Computes the raw MAC of `input` under `secret`.
    fn mac(self, secret: &[u8], input: &[u8]) -> Result<Vec<u8>, JwtError> {
        macro_rules! hmac_with {
            ($digest:ty) => {{
                let mut mac = <Hmac<$digest> as Mac>::new_from_slice(secret)
                    .map_err(|_| JwtError::InvalidKey { algorithm: self })?;
                mac.update(input);
                Ok(mac.finalize().into_bytes().to_vec())
            }};
        }

        match self {
            Self::HmacMd5 => hmac_with!(Md5),
            Self::HmacSha1 => hmac_with!(Sha1),
            Self::HmacSha224 => hmac_with!(Sha224),
            Self::HmacSha256 => hmac_with!(Sha256),
            Self::HmacSha384 => hmac_with!(Sha384),
            Self::HmacSha512 => hmac_with!(Sha512),
            Self::HmacSha512_224 => hmac_with!(Sha512_224),
            Self::HmacSha512_256 => hmac_with!(Sha512_256),
        }
    }
}

impl fmt::Display for SigningAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SigningAlgorithm {
    type Err = JwtError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| JwtError::UnsupportedAlgorithm {
            name: s.to_string(),
        })
    }
}

// ============================================================================
// Signing Key
// ============================================================================

/// Shared secret plus the algorithm it signs with.
///
/// `Debug` never prints the secret.
#[derive(Clone)]
pub struct SigningKey {
    algorithm: SigningAlgorithm,
    secret: Vec<u8>,
}

impl SigningKey {
    /// Creates a key from raw secret bytes.
    #[must_use]
    pub fn new(algorithm: SigningAlgorithm, secret: impl AsRef<[u8]>) -> Self {
        Self {
            algorithm,
            secret: secret.as_ref().to_vec(),
        }
    }

    /// The algorithm new tokens are signed with.
    #[must_use]
    pub fn algorithm(&self) -> SigningAlgorithm {
        self.algorithm
    }

    pub(crate) fn secret(&self) -> &[u8] {
        &self.secret
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKey")
            .field("algorithm", &self.algorithm)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

// ============================================================================
// Free-standing encode / decode
// ============================================================================

/// Signs `header` and `payload` with `secret` and returns the compact token.
///
/// # Errors
///
/// Returns `JwtError::UnsupportedAlgorithm` if `header.alg` is unknown and
/// `JwtError::InvalidKey` if the MAC cannot be keyed.
pub fn encode(header: &Header, payload: &Payload, secret: &[u8]) -> Result<Token, JwtError> {
    let algorithm = header
        .algorithm()
        .ok_or_else(|| JwtError::UnsupportedAlgorithm {
            name: header.alg.clone(),
        })?;

    let header_json =
        serde_json::to_vec(header).map_err(|e| JwtError::Serialization {
            message: e.to_string(),
        })?;
    let payload_json =
        serde_json::to_vec(payload).map_err(|e| JwtError::Serialization {
            message: e.to_string(),
        })?;

    let signing_input = format!(
        "{}.{}",
        URL_SAFE_NO_PAD.encode(header_json),
        URL_SAFE_NO_PAD.encode(payload_json)
    );
    let signature = URL_SAFE_NO_PAD.encode(algorithm.mac(secret, signing_input.as_bytes())?);
    let encoded = format!("{signing_input}.{signature}");

    Ok(Token::from_parts(
        header.clone(),
        payload.clone(),
        signature,
        encoded,
    ))
}

/// Verifies and decodes a compact token.
///
/// Returns `None` when the input is empty, does not have exactly three
/// segments, a segment is not base64url JSON, the header names an unknown
/// algorithm, or the signature does not match.
#[must_use]
pub fn decode(token: &str, secret: &[u8]) -> Option<Token> {
    if token.is_empty() {
        return None;
    }

    let mut segments = token.split('.');
    let (header_b64, payload_b64, signature_b64) =
        match (segments.next(), segments.next(), segments.next(), segments.next()) {
            (Some(h), Some(p), Some(s), None) => (h, p, s),
            _ => return None,
        };

    let header: Header = serde_json::from_slice(&URL_SAFE_NO_PAD.decode(header_b64).ok()?).ok()?;
    let algorithm = header.algorithm()?;

    let signing_input = &token[..header_b64.len() + 1 + payload_b64.len()];
    let expected = URL_SAFE_NO_PAD.encode(algorithm.mac(secret, signing_input.as_bytes()).ok()?);
    if !bool::from(expected.as_bytes().ct_eq(signature_b64.as_bytes())) {
        return None;
    }

    let payload: Payload =
        serde_json::from_slice(&URL_SAFE_NO_PAD.decode(payload_b64).ok()?).ok()?;

    Some(Token::from_parts(
        header,
        payload,
        signature_b64.to_string(),
        token.to_string(),
    ))
}

// ============================================================================
// Codec
// ============================================================================

/// Codec bound to one signing key and a signing policy.
#[derive(Debug, Clone)]
pub struct JwtCodec {
    key: SigningKey,
    rejected: HashSet<SigningAlgorithm>,
}

impl JwtCodec {
    /// Creates a codec that accepts every supported algorithm.
    #[must_use]
    pub fn new(key: SigningKey) -> Self {
        Self {
            key,
            rejected: HashSet::new(),
        }
    }

    /// Refuses tokens whose header names one of `algorithms`.
    #[must_use]
    pub fn with_rejected_algorithms(
        mut self,
        algorithms: impl IntoIterator<Item = SigningAlgorithm>,
    ) -> Self {
        self.rejected.extend(algorithms);
        self
    }

    /// The algorithm new tokens are signed with.
    #[must_use]
    pub fn algorithm(&self) -> SigningAlgorithm {
        self.key.algorithm()
    }

    /// Returns `true` if tokens signed with `algorithm` are refused.
    #[must_use]
    pub fn is_rejected(&self, algorithm: SigningAlgorithm) -> bool {
        self.rejected.contains(&algorithm)
    }

    /// Signs `payload` under a fresh header for the configured algorithm.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured algorithm is rejected by policy or
    /// the MAC cannot be keyed.
    pub fn sign(&self, payload: &Payload) -> Result<Token, JwtError> {
        self.encode(&Header::new(self.key.algorithm()), payload)
    }

    /// Signs an explicit header and payload with the configured secret.
    ///
    /// # Errors
    ///
    /// Returns an error if the header's algorithm is unknown or rejected, or
    /// the MAC cannot be keyed.
    pub fn encode(&self, header: &Header, payload: &Payload) -> Result<Token, JwtError> {
        if let Some(algorithm) = header.algorithm()
            && self.is_rejected(algorithm)
        {
            return Err(JwtError::RejectedAlgorithm { algorithm });
        }
        encode(header, payload, self.key.secret())
    }

    /// Verifies and decodes a token, applying the signing policy.
    #[must_use]
    pub fn decode(&self, token: &str) -> Option<Token> {
        let decoded = decode(token, self.key.secret())?;
        let algorithm = decoded.header().algorithm()?;
        if self.is_rejected(algorithm) {
            return None;
        }
        Some(decoded)
    }
}
