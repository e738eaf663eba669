//! Authenticated principal
//!
//! What the auth boundary hands the rest of the service: a stable external
//! identity ID plus whatever profile claims the provider shared. The first
//! successful authentication provisions a local user record from it.

use crate::auth::jwt::Claims;
use crate::db::schemas::UserDoc;

/// An authenticated caller, as established by token validation
#[derive(Debug, Clone)]
pub struct Principal {
    /// Stable subject ID from the identity provider
    pub external_id: String,
    pub email: Option<String>,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl Principal {
    /// Minimal principal with a subject and email (dev and test helper)
    pub fn with_email(external_id: &str, email: &str) -> Self {
        Self {
            external_id: external_id.to_string(),
            email: Some(email.to_string()),
            username: None,
            first_name: None,
            last_name: None,
        }
    }

    /// Build the user record provisioned on first login.
    ///
    /// Providers don't always share an email; a placeholder keeps the
    /// unique email index satisfied until a profile edit supplies one.
    pub fn provision(&self) -> UserDoc {
        let email = self
            .email
            .clone()
            .unwrap_or_else(|| format!("{}@unknown.invalid", self.external_id));
        let username = self
            .username
            .clone()
            .or_else(|| email.split('@').next().map(|s| s.to_string()))
            .unwrap_or_else(|| self.external_id.clone());

        let mut user = UserDoc::new(self.external_id.clone(), email, username);
        user.first_name = self.first_name.clone().unwrap_or_default();
        user.last_name = self.last_name.clone().unwrap_or_default();
        user
    }
}

impl From<Claims> for Principal {
    fn from(claims: Claims) -> Self {
        Self {
            external_id: claims.sub,
            email: claims.email,
            username: claims.username,
            first_name: claims.given_name,
            last_name: claims.family_name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provision_fills_username_from_email() {
        let principal = Principal::with_email("user_123", "carol@example.com");
        let user = principal.provision();

        assert_eq!(user.external_id, "user_123");
        assert_eq!(user.email, "carol@example.com");
        assert_eq!(user.username, "carol");
        assert_eq!(user.total_karma, 0);
    }

    #[test]
    fn test_provision_without_email_uses_placeholder() {
        let principal = Principal {
            external_id: "user_456".into(),
            email: None,
            username: None,
            first_name: None,
            last_name: None,
        };
        let user = principal.provision();

        assert_eq!(user.email, "user_456@unknown.invalid");
        assert_eq!(user.username, "user_456");
    }
}
