//! Authentication boundary for Agora
//!
//! Validates bearer tokens issued by an external identity provider
//! (signature against the provider's JWKS, expiry, issuer) and exposes the
//! result as an authenticated principal. Agora never issues credentials.

pub mod jwks;
pub mod jwt;
pub mod principal;

pub use jwks::JwksKeyStore;
pub use jwt::{extract_token_from_header, Claims, TokenVerifier};
pub use principal::Principal;
