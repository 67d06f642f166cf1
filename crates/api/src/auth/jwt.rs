//! JWT access-token validation.
//!
//! Access tokens are HS256-signed JWTs issued by the identity provider
//! with a secret shared with this service. The subject claim is the
//! provider's stable user identifier; the local users row is keyed on it.

use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

/// JWT claims expected in every access token.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject -- the identity provider's stable user identifier.
    pub sub: String,
    /// The user's email address.
    pub email: String,
    /// Optional display name.
    #[serde(default)]
    pub name: Option<String>,
    /// Expiration time (UTC Unix timestamp).
    pub exp: i64,
    /// Issued-at time (UTC Unix timestamp).
    pub iat: i64,
}

/// Configuration for JWT validation.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// HMAC-SHA256 secret shared with the identity provider.
    pub secret: String,
}

impl JwtConfig {
    /// Load JWT configuration from the environment.
    ///
    /// # Panics
    ///
    /// Panics if `JWT_SECRET` is not set or is empty.
    pub fn from_env() -> Self {
        let secret =
            std::env::var("JWT_SECRET").expect("JWT_SECRET must be set in the environment");
        assert!(!secret.is_empty(), "JWT_SECRET must not be empty");
        Self { secret }
    }
}

/// Validate and decode an access token, returning the embedded [`Claims`].
///
/// Validates the signature and expiration automatically.
pub fn validate_token(
    token: &str,
    config: &JwtConfig,
) -> Result<Claims, jsonwebtoken::errors::Error> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &Validation::default(), // HS256, validates exp
    )?;
    Ok(token_data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    fn test_config() -> JwtConfig {
        JwtConfig {
            secret: "test-secret-that-is-long-enough-for-hmac".to_string(),
        }
    }

    fn sign(claims: &Claims, secret: &str) -> String {
        encode(
            &Header::default(),
            claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .expect("encoding should succeed")
    }

    #[test]
    fn valid_token_round_trips() {
        let config = test_config();
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            sub: "auth0|abc123".to_string(),
            email: "owner@example.com".to_string(),
            name: Some("Site Owner".to_string()),
            exp: now + 3600,
            iat: now,
        };

        let decoded = validate_token(&sign(&claims, &config.secret), &config)
            .expect("validation should succeed");
        assert_eq!(decoded.sub, "auth0|abc123");
        assert_eq!(decoded.email, "owner@example.com");
    }

    #[test]
    fn expired_token_fails() {
        let config = test_config();
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            sub: "auth0|abc123".to_string(),
            email: "owner@example.com".to_string(),
            name: None,
            exp: now - 300, // well past the default 60-second leeway
            iat: now - 600,
        };

        assert!(validate_token(&sign(&claims, &config.secret), &config).is_err());
    }

    #[test]
    fn wrong_secret_fails() {
        let config = test_config();
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            sub: "auth0|abc123".to_string(),
            email: "owner@example.com".to_string(),
            name: None,
            exp: now + 3600,
            iat: now,
        };

        assert!(validate_token(&sign(&claims, "another-secret"), &config).is_err());
    }
}
