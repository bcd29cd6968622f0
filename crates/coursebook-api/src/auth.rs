// crates/coursebook-api/src/auth.rs
// ============================================================================
// Module: API Authentication
// Description: Bearer token minting/verification and password hashing.
// Purpose: Provide strict, fail-closed authentication for API requests.
// Dependencies: coursebook-core, base64, ed25519-dalek, rand, serde, sha2
// ============================================================================

//! ## Overview
//! Bearer tokens are ed25519-signed claim sets. The signing key is derived
//! deterministically from the configured secret, so every server instance
//! sharing a secret verifies the same tokens without key distribution.
//! A token is `base64url(claims_json).base64url(signature)`; verification
//! checks the signature before reading any claim and fails closed on expiry,
//! malformed structure, or unknown roles.
//!
//! Password hashing is a salted digest behind [`PasswordHasher`]; the stored
//! form is versioned (`v1$salt$digest`) so the scheme can be swapped without
//! a data migration.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use coursebook_core::ApiError;
use coursebook_core::Principal;
use coursebook_core::Role;
use coursebook_core::User;
use coursebook_core::UserId;
use ed25519_dalek::Signature;
use ed25519_dalek::Signer;
use ed25519_dalek::SigningKey;
use ed25519_dalek::VerifyingKey;
use rand::Rng;
use serde::Deserialize;
use serde::Serialize;
use sha2::Digest;
use sha2::Sha256;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum accepted authorization header length.
const MAX_AUTH_HEADER_BYTES: usize = 8 * 1024;
/// Password salt length in bytes.
const SALT_BYTES: usize = 16;
/// Version label for the current password hash scheme.
const HASH_VERSION: &str = "v1";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Authentication errors.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Missing, malformed, or unverifiable credentials.
    #[error("unauthenticated: {0}")]
    Unauthenticated(String),
}

impl From<AuthError> for ApiError {
    fn from(error: AuthError) -> Self {
        match error {
            AuthError::Unauthenticated(message) => Self::Authentication(message),
        }
    }
}

// ============================================================================
// SECTION: Token Claims
// ============================================================================

/// Signed claim set carried inside a bearer token.
#[derive(Debug, Serialize, Deserialize)]
struct TokenClaims {
    /// Subject user id.
    sub: i64,
    /// Role label at mint time.
    role: String,
    /// Issued-at time (unix seconds).
    iat: u64,
    /// Expiry time (unix seconds).
    exp: u64,
}

// ============================================================================
// SECTION: Token Signer
// ============================================================================

/// Mints and verifies ed25519-signed bearer tokens.
///
/// # Invariants
/// - The signature covers the encoded claims exactly as transmitted.
/// - Verification rejects tokens whose expiry has passed.
pub struct TokenSigner {
    /// Signing key derived from the configured secret.
    signing_key: SigningKey,
    /// Public half used for verification.
    verifying_key: VerifyingKey,
    /// Token lifetime in seconds.
    ttl_seconds: u64,
}

impl TokenSigner {
    /// Derives a signer from the configured secret.
    #[must_use]
    pub fn from_secret(secret: &str, ttl_seconds: u64) -> Self {
        let digest = Sha256::digest(secret.as_bytes());
        let seed: [u8; 32] = digest.into();
        let signing_key = SigningKey::from_bytes(&seed);
        let verifying_key = signing_key.verifying_key();
        Self {
            signing_key,
            verifying_key,
            ttl_seconds,
        }
    }

    /// Mints a bearer token for an authenticated user.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError`] when claim serialization fails.
    pub fn mint(&self, user: &User) -> Result<String, AuthError> {
        let now = unix_now_secs();
        let claims = TokenClaims {
            sub: user.id.get(),
            role: user.role.as_str().to_string(),
            iat: now,
            exp: now.saturating_add(self.ttl_seconds),
        };
        let payload = serde_json::to_vec(&claims)
            .map_err(|err| AuthError::Unauthenticated(err.to_string()))?;
        let encoded = URL_SAFE_NO_PAD.encode(payload);
        let signature = self.signing_key.sign(encoded.as_bytes());
        let signature_encoded = URL_SAFE_NO_PAD.encode(signature.to_bytes());
        Ok(format!("{encoded}.{signature_encoded}"))
    }

    /// Verifies a bearer token and returns the authenticated principal.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError`] on any structural, signature, expiry, or role
    /// failure. Error detail never distinguishes which check failed beyond
    /// the broad category.
    pub fn verify(&self, token: &str) -> Result<Principal, AuthError> {
        let (payload, signature) = token
            .split_once('.')
            .ok_or_else(|| AuthError::Unauthenticated("malformed token".to_string()))?;
        let signature_bytes = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| AuthError::Unauthenticated("malformed token".to_string()))?;
        let signature = Signature::from_slice(&signature_bytes)
            .map_err(|_| AuthError::Unauthenticated("malformed token".to_string()))?;
        self.verifying_key
            .verify_strict(payload.as_bytes(), &signature)
            .map_err(|_| AuthError::Unauthenticated("invalid token signature".to_string()))?;
        let claims_bytes = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|_| AuthError::Unauthenticated("malformed token".to_string()))?;
        let claims: TokenClaims = serde_json::from_slice(&claims_bytes)
            .map_err(|_| AuthError::Unauthenticated("malformed token claims".to_string()))?;
        if claims.exp <= unix_now_secs() {
            return Err(AuthError::Unauthenticated("token expired".to_string()));
        }
        let role = Role::parse(&claims.role)
            .ok_or_else(|| AuthError::Unauthenticated("unknown role".to_string()))?;
        Ok(Principal {
            id: UserId::new(claims.sub),
            role,
        })
    }
}

// ============================================================================
// SECTION: Password Hashing
// ============================================================================

/// Salted-digest password hasher.
///
/// The stored form is `v1$base64url(salt)$base64url(sha256(salt || password))`.
/// The versioned prefix is the swap-in point for a stronger scheme.
#[derive(Debug, Clone, Copy, Default)]
pub struct PasswordHasher;

impl PasswordHasher {
    /// Hashes a plaintext password with a fresh random salt.
    #[must_use]
    pub fn hash(self, password: &str) -> String {
        let mut salt = [0u8; SALT_BYTES];
        rand::thread_rng().fill(&mut salt);
        let digest = salted_digest(&salt, password);
        format!(
            "{HASH_VERSION}${}${}",
            URL_SAFE_NO_PAD.encode(salt),
            URL_SAFE_NO_PAD.encode(digest)
        )
    }

    /// Verifies a plaintext password against a stored hash.
    ///
    /// Unknown versions and malformed stored values verify as false.
    #[must_use]
    pub fn verify(self, password: &str, stored: &str) -> bool {
        let mut parts = stored.splitn(3, '$');
        let (Some(version), Some(salt), Some(digest)) =
            (parts.next(), parts.next(), parts.next())
        else {
            return false;
        };
        if version != HASH_VERSION {
            return false;
        }
        let (Ok(salt), Ok(expected)) =
            (URL_SAFE_NO_PAD.decode(salt), URL_SAFE_NO_PAD.decode(digest))
        else {
            return false;
        };
        let actual = salted_digest(&salt, password);
        constant_time_eq(&actual, &expected)
    }
}

/// Computes the salted password digest.
fn salted_digest(salt: &[u8], password: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(password.as_bytes());
    hasher.finalize().into()
}

/// Compares two digests without early exit on mismatch.
fn constant_time_eq(left: &[u8], right: &[u8]) -> bool {
    if left.len() != right.len() {
        return false;
    }
    let mut diff = 0u8;
    for (a, b) in left.iter().zip(right.iter()) {
        diff |= a ^ b;
    }
    diff == 0
}

// ============================================================================
// SECTION: Header Parsing
// ============================================================================

/// Extracts the bearer token from an authorization header value.
///
/// # Errors
///
/// Returns [`AuthError`] when the header is missing, oversized, or not a
/// bearer credential.
pub fn parse_bearer_token(auth_header: Option<&str>) -> Result<String, AuthError> {
    let header = auth_header
        .ok_or_else(|| AuthError::Unauthenticated("missing authorization".to_string()))?;
    if header.len() > MAX_AUTH_HEADER_BYTES {
        return Err(AuthError::Unauthenticated("authorization header too large".to_string()));
    }
    let mut parts = header.trim().splitn(2, ' ');
    let scheme = parts.next().unwrap_or_default();
    let token = parts.next().unwrap_or_default().trim();
    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return Err(AuthError::Unauthenticated("invalid authorization header".to_string()));
    }
    Ok(token.to_string())
}

// ============================================================================
// SECTION: Time
// ============================================================================

/// Returns the current unix time in seconds.
fn unix_now_secs() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0)
}

// ============================================================================
// SECTION: Tests
// ============================================================================
