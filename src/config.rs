//! Configuration for Agora
//!
//! CLI arguments and environment variable handling using clap.

use clap::Parser;
use std::net::SocketAddr;

/// Agora - community feed API
#[derive(Parser, Debug, Clone)]
#[command(name = "agora")]
#[command(about = "Community feed API with karma and leaderboards")]
pub struct Args {
    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:8080")]
    pub listen: SocketAddr,

    /// MongoDB connection URI
    #[arg(long, env = "MONGODB_URI", default_value = "mongodb://localhost:27017")]
    pub mongodb_uri: String,

    /// MongoDB database name
    #[arg(long, env = "MONGODB_DB", default_value = "agora")]
    pub mongodb_db: String,

    /// JWKS endpoint of the identity provider (required in production)
    #[arg(long, env = "JWKS_URL")]
    pub jwks_url: Option<String>,

    /// Expected `iss` claim on bearer tokens (required in production)
    #[arg(long, env = "JWT_ISSUER")]
    pub jwt_issuer: Option<String>,

    /// Enable development mode (unverified tokens, in-memory store fallback)
    #[arg(long, env = "DEV_MODE", default_value = "false")]
    pub dev_mode: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Args {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if !self.dev_mode {
            if self.jwks_url.is_none() {
                return Err("JWKS_URL is required in production mode".to_string());
            }
            if self.jwt_issuer.is_none() {
                return Err("JWT_ISSUER is required in production mode".to_string());
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_args() -> Args {
        Args {
            listen: "127.0.0.1:8080".parse().unwrap(),
            mongodb_uri: "mongodb://localhost:27017".into(),
            mongodb_db: "agora".into(),
            jwks_url: None,
            jwt_issuer: None,
            dev_mode: false,
            log_level: "info".into(),
        }
    }

    #[test]
    fn test_production_requires_identity_provider() {
        let args = base_args();
        assert!(args.validate().is_err());

        let mut with_jwks = base_args();
        with_jwks.jwks_url = Some("https://idp.example/.well-known/jwks.json".into());
        assert!(with_jwks.validate().is_err());

        with_jwks.jwt_issuer = Some("https://idp.example".into());
        assert!(with_jwks.validate().is_ok());
    }

    #[test]
    fn test_dev_mode_allows_missing_provider() {
        let mut args = base_args();
        args.dev_mode = true;
        assert!(args.validate().is_ok());
    }
}
