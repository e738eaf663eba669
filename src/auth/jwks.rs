//! JWKS key cache
//!
//! The identity provider rotates its signing keys asynchronously, so keys
//! are cached by `kid` and the set is refetched whenever a token arrives
//! with an unknown key ID. A lookup that still misses after a refresh is
//! an authentication failure, not a retry loop.

use dashmap::DashMap;
use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::DecodingKey;
use tracing::{debug, warn};

use crate::types::{FeedError, Result};

/// Cached decoding keys for the provider's JWKS endpoint
pub struct JwksKeyStore {
    url: String,
    http: reqwest::Client,
    keys: DashMap<String, DecodingKey>,
}

impl JwksKeyStore {
    /// Create a key store for a JWKS URL. No fetch happens until a key is
    /// needed.
    pub fn new(url: String) -> Self {
        Self {
            url,
            http: reqwest::Client::new(),
            keys: DashMap::new(),
        }
    }

    /// Get the decoding key for a token's `kid`, refreshing the set once
    /// on a miss to absorb key rotation.
    pub async fn decoding_key(&self, kid: &str) -> Result<DecodingKey> {
        if let Some(key) = self.keys.get(kid) {
            return Ok(key.clone());
        }

        debug!("Unknown signing key '{}', refreshing JWKS", kid);
        self.refresh().await?;

        self.keys
            .get(kid)
            .map(|key| key.clone())
            .ok_or_else(|| FeedError::Unauthorized("Unknown signing key".into()))
    }

    /// Fetch the key set and cache every usable key
    async fn refresh(&self) -> Result<()> {
        let set: JwkSet = self
            .http
            .get(&self.url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        for jwk in &set.keys {
            let Some(kid) = jwk.common.key_id.clone() else {
                continue;
            };
            match DecodingKey::from_jwk(jwk) {
                Ok(key) => {
                    self.keys.insert(kid, key);
                }
                Err(e) => warn!("Skipping unusable JWK '{}': {}", kid, e),
            }
        }

        debug!("JWKS refreshed: {} cached keys", self.keys.len());
        Ok(())
    }
}
