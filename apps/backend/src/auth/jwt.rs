use std::time::{SystemTime, UNIX_EPOCH};

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use super::{AuthError, Identity, IdentityVerifier};

/// Claims carried by a participant access token.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Unique participant identifier.
    pub sub: String,
    /// Display name.
    pub name: String,
    /// Issued-at (seconds since epoch)
    pub iat: i64,
    /// Expiry (seconds since epoch)
    pub exp: i64,
}

/// HS256 token verifier.
pub struct JwtVerifier {
    secret: Vec<u8>,
    algorithm: Algorithm,
}

impl JwtVerifier {
    pub fn new(secret: &[u8]) -> Self {
        Self {
            secret: secret.to_vec(),
            algorithm: Algorithm::HS256,
        }
    }
}

impl IdentityVerifier for JwtVerifier {
    fn verify(&self, token: &str) -> Result<Identity, AuthError> {
        if token.trim().is_empty() {
            return Err(AuthError::Empty);
        }
        // Default Validation already checks exp; pin the algorithm.
        let validation = Validation::new(self.algorithm);
        decode::<Claims>(token, &DecodingKey::from_secret(&self.secret), &validation)
            .map(|data| Identity {
                id: data.claims.sub,
                name: data.claims.name,
            })
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::Expired,
                _ => AuthError::Invalid,
            })
    }
}

/// Mint an HS256 access token with a 12-hour TTL. Used by the token
/// issuing tooling and by tests.
pub fn mint_access_token(
    sub: &str,
    name: &str,
    now: SystemTime,
    secret: &[u8],
) -> Result<String, jsonwebtoken::errors::Error> {
    let iat = now
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0);
    let claims = Claims {
        sub: sub.to_string(),
        name: name.to_string(),
        iat,
        exp: iat + 12 * 60 * 60,
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret),
    )
}
