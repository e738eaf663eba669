//! Bearer token validation
//!
//! Tokens are issued by an external identity provider and validated here
//! against the provider's JWKS: RS256 signature, expiry, and issuer are
//! all checked before the identity is trusted. Agora never issues tokens.
//!
//! Dev mode runs without a provider: claims are parsed but the signature
//! is not verified.

use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::auth::jwks::JwksKeyStore;
use crate::config::Args;
use crate::types::{FeedError, Result};

/// Claims carried by identity-provider tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Stable subject ID issued by the provider
    pub sub: String,

    /// Email address, if the provider shares one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Preferred username, if present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    /// Given name, if present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub given_name: Option<String>,

    /// Family name, if present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family_name: Option<String>,

    /// Token issuer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,

    /// Issued at (Unix timestamp)
    #[serde(default)]
    pub iat: u64,

    /// Expiration time (Unix timestamp)
    pub exp: u64,
}

/// Validates bearer tokens against the identity provider's key set
pub struct TokenVerifier {
    jwks: Option<JwksKeyStore>,
    issuer: Option<String>,
    dev_mode: bool,
}

impl TokenVerifier {
    /// Build a verifier from configuration.
    ///
    /// Production requires both the JWKS URL and the expected issuer;
    /// `Args::validate` enforces that before this is called.
    pub fn from_args(args: &Args) -> Result<Self> {
        if !args.dev_mode && (args.jwks_url.is_none() || args.jwt_issuer.is_none()) {
            return Err(FeedError::Config(
                "JWKS_URL and JWT_ISSUER are required in production mode".into(),
            ));
        }

        Ok(Self {
            jwks: args.jwks_url.clone().map(JwksKeyStore::new),
            issuer: args.jwt_issuer.clone(),
            dev_mode: args.dev_mode,
        })
    }

    /// Verify a bearer token and return its claims
    pub async fn verify(&self, token: &str) -> Result<Claims> {
        match &self.jwks {
            Some(jwks) => self.verify_against_jwks(token, jwks).await,
            None if self.dev_mode => self.decode_unverified(token),
            None => Err(FeedError::Config("Token verification not configured".into())),
        }
    }

    async fn verify_against_jwks(&self, token: &str, jwks: &JwksKeyStore) -> Result<Claims> {
        let header =
            decode_header(token).map_err(|_| FeedError::Unauthorized("Invalid token".into()))?;
        let kid = header
            .kid
            .ok_or_else(|| FeedError::Unauthorized("Token missing key ID".into()))?;

        let key = jwks.decoding_key(&kid).await?;

        let mut validation = Validation::new(Algorithm::RS256);
        if let Some(ref issuer) = self.issuer {
            validation.set_issuer(&[issuer]);
        }

        match decode::<Claims>(token, &key, &validation) {
            Ok(data) => Ok(data.claims),
            Err(err) => Err(FeedError::Unauthorized(classify(&err).into())),
        }
    }

    /// Dev mode only: parse claims without signature verification
    fn decode_unverified(&self, token: &str) -> Result<Claims> {
        let header =
            decode_header(token).map_err(|_| FeedError::Unauthorized("Invalid token".into()))?;

        let mut validation = Validation::new(header.alg);
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        let data = decode::<Claims>(token, &DecodingKey::from_secret(&[]), &validation)
            .map_err(|_| FeedError::Unauthorized("Invalid token".into()))?;

        // Issuer is still checked when configured
        if let Some(ref issuer) = self.issuer {
            if data.claims.iss.as_deref() != Some(issuer.as_str()) {
                return Err(FeedError::Unauthorized("Invalid token issuer".into()));
            }
        }

        Ok(data.claims)
    }
}

fn classify(err: &jsonwebtoken::errors::Error) -> &'static str {
    use jsonwebtoken::errors::ErrorKind;

    match err.kind() {
        ErrorKind::ExpiredSignature => "Token expired",
        ErrorKind::InvalidSignature => "Invalid signature",
        ErrorKind::InvalidIssuer => "Invalid token issuer",
        ErrorKind::InvalidToken => "Invalid token",
        _ => "Token validation failed",
    }
}

/// Extract token from Authorization header.
/// Supports "Bearer <token>" format and raw tokens.
pub fn extract_token_from_header(auth_header: Option<&str>) -> Option<&str> {
    let header = auth_header?;

    if let Some(token) = header.strip_prefix("Bearer ") {
        let token = token.trim();
        if !token.is_empty() {
            return Some(token);
        }
    }

    // Also support raw token (for flexibility)
    if !header.contains(' ') {
        let token = header.trim();
        if !token.is_empty() {
            return Some(token);
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use std::time::{SystemTime, UNIX_EPOCH};

    fn dev_verifier(issuer: Option<&str>) -> TokenVerifier {
        TokenVerifier {
            jwks: None,
            issuer: issuer.map(|s| s.to_string()),
            dev_mode: true,
        }
    }

    fn test_claims(issuer: Option<&str>) -> Claims {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs();

        Claims {
            sub: "user_2abc".into(),
            email: Some("alice@example.com".into()),
            username: Some("alice".into()),
            given_name: Some("Alice".into()),
            family_name: None,
            iss: issuer.map(|s| s.to_string()),
            iat: now,
            exp: now + 3600,
        }
    }

    fn sign(claims: &Claims) -> String {
        encode(
            &Header::default(),
            claims,
            &EncodingKey::from_secret(b"test-only-secret"),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_dev_mode_parses_claims() {
        let verifier = dev_verifier(None);
        let token = sign(&test_claims(None));

        let claims = verifier.verify(&token).await.unwrap();
        assert_eq!(claims.sub, "user_2abc");
        assert_eq!(claims.email.as_deref(), Some("alice@example.com"));
    }

    #[tokio::test]
    async fn test_dev_mode_still_checks_issuer_when_configured() {
        let verifier = dev_verifier(Some("https://idp.example"));

        let good = sign(&test_claims(Some("https://idp.example")));
        assert!(verifier.verify(&good).await.is_ok());

        let bad = sign(&test_claims(Some("https://evil.example")));
        let err = verifier.verify(&bad).await.unwrap_err();
        assert!(matches!(err, FeedError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_garbage_token_is_rejected() {
        let verifier = dev_verifier(None);
        let err = verifier.verify("not-a-jwt").await.unwrap_err();
        assert!(matches!(err, FeedError::Unauthorized(_)));
    }

    #[test]
    fn test_extract_token_from_header() {
        // Bearer format
        assert_eq!(
            extract_token_from_header(Some("Bearer abc123")),
            Some("abc123")
        );

        // Raw token
        assert_eq!(extract_token_from_header(Some("abc123")), Some("abc123"));

        // Empty cases
        assert_eq!(extract_token_from_header(None), None);
        assert_eq!(extract_token_from_header(Some("")), None);
        assert_eq!(extract_token_from_header(Some("Bearer ")), None);

        // Invalid format
        assert_eq!(extract_token_from_header(Some("Basic abc123")), None);
    }
}
