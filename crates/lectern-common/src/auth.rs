//! Authentication primitives for the Lectern platform.
//!
//! The web application issues Ed25519-signed JWTs at login; the live relay
//! only ever verifies them. Both sides share this module so the claims
//! layout cannot drift.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use ed25519_dalek::SigningKey;
use rand_core::OsRng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ── Errors ──────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum AuthError {
    /// Token signature, issuer, or shape is wrong.
    #[error("invalid token: {0}")]
    Invalid(jsonwebtoken::errors::Error),
    /// Token was valid once but its `exp` has passed. Kept separate from
    /// [`AuthError::Invalid`] because the connection gate reports expiry
    /// with a distinct close reason.
    #[error("token expired")]
    Expired,
    #[error("invalid signing key")]
    InvalidKey,
}

// ── Roles ───────────────────────────────────────────────────────────

/// Platform roles carried in the JWT.
///
/// [`Role::Student`] is the restricted viewer role: students are only
/// admitted to the live endpoint while a live session is in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Instructor,
    Student,
}

impl Role {
    /// Whether live access for this role requires an active live session.
    pub fn requires_active_live(self) -> bool {
        matches!(self, Role::Student)
    }
}

// ── JWT (Ed25519-signed) ────────────────────────────────────────────

/// Claims embedded in a JWT token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject — user ID.
    pub sub: String,
    /// Issuer — always "lectern".
    pub iss: String,
    /// Expiration time (Unix timestamp).
    pub exp: i64,
    /// Issued-at time (Unix timestamp).
    pub iat: i64,
    /// Platform role of the subject.
    pub role: Role,
}

impl Claims {
    /// Claims for `user_id`/`role` valid for `ttl_secs` from `now`.
    pub fn new(user_id: impl Into<String>, role: Role, now: i64, ttl_secs: i64) -> Self {
        Self {
            sub: user_id.into(),
            iss: ISSUER.into(),
            exp: now + ttl_secs,
            iat: now,
            role,
        }
    }
}

/// Issuer string checked during validation.
pub const ISSUER: &str = "lectern";

/// JWT signing/verification context.
pub struct JwtContext {
    encoding_key: jsonwebtoken::EncodingKey,
    decoding_key: jsonwebtoken::DecodingKey,
}

impl JwtContext {
    /// Create a JWT context from an Ed25519 private key (32 bytes, base64-encoded).
    pub fn from_ed25519_seed(seed_b64: &str) -> Result<Self, AuthError> {
        let seed_bytes = BASE64.decode(seed_b64).map_err(|_| AuthError::InvalidKey)?;
        if seed_bytes.len() != 32 {
            return Err(AuthError::InvalidKey);
        }

        let signing_key = SigningKey::from_bytes(
            seed_bytes
                .as_slice()
                .try_into()
                .map_err(|_| AuthError::InvalidKey)?,
        );
        let verifying_key = signing_key.verifying_key();

        // jsonwebtoken expects PKCS8v2 DER encoding for Ed25519.
        // PKCS8v2 wraps the 32-byte seed as:
        //   SEQUENCE {
        //     INTEGER 0  (version)
        //     SEQUENCE { OID 1.3.101.112 }  (Ed25519 algorithm)
        //     OCTET STRING { OCTET STRING { <32 seed bytes> } }
        //   }
        let pkcs8_prefix: &[u8] = &[
            0x30, 0x2e, // SEQUENCE, 46 bytes
            0x02, 0x01, 0x00, // INTEGER 0 (version)
            0x30, 0x05, // SEQUENCE, 5 bytes
            0x06, 0x03, 0x2b, 0x65, 0x70, // OID 1.3.101.112 (Ed25519)
            0x04, 0x22, // OCTET STRING, 34 bytes
            0x04, 0x20, // OCTET STRING, 32 bytes (the seed)
        ];
        let mut pkcs8_der = Vec::with_capacity(48);
        pkcs8_der.extend_from_slice(pkcs8_prefix);
        pkcs8_der.extend_from_slice(&seed_bytes);

        let encoding_key = jsonwebtoken::EncodingKey::from_ed_der(&pkcs8_der);

        // For the public key, jsonwebtoken expects raw 32-byte Ed25519 public key
        let decoding_key = jsonwebtoken::DecodingKey::from_ed_der(verifying_key.as_bytes());

        Ok(Self {
            encoding_key,
            decoding_key,
        })
    }

    /// Generate a new random Ed25519 seed and create a JWT context.
    /// Returns `(context, seed_b64)` — store the seed securely.
    pub fn generate() -> (Self, String) {
        let signing_key = SigningKey::generate(&mut OsRng);
        let seed_b64 = BASE64.encode(signing_key.to_bytes());
        let ctx =
            Self::from_ed25519_seed(&seed_b64).expect("freshly generated key should be valid");
        (ctx, seed_b64)
    }

    /// Create and sign a JWT token.
    pub fn create_token(&self, claims: &Claims) -> Result<String, AuthError> {
        let header = jsonwebtoken::Header::new(jsonwebtoken::Algorithm::EdDSA);
        let token = jsonwebtoken::encode(&header, claims, &self.encoding_key)
            .map_err(AuthError::Invalid)?;
        Ok(token)
    }

    /// Validate and decode a JWT token.
    ///
    /// Expiry is reported as [`AuthError::Expired`]; every other failure
    /// (bad signature, wrong issuer, malformed) as [`AuthError::Invalid`].
    pub fn verify_token(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = jsonwebtoken::Validation::new(jsonwebtoken::Algorithm::EdDSA);
        validation.set_issuer(&[ISSUER]);
        validation.validate_exp = true;

        match jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &validation) {
            Ok(data) => Ok(data.claims),
            Err(e) => match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => Err(AuthError::Expired),
                _ => Err(AuthError::Invalid(e)),
            },
        }
    }
}
