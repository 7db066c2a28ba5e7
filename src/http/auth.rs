//! JWT authentication for the admin API surface.
//!
//! Public search routes require no authentication. Notification routes
//! require a bearer token whose `role` claim grants editor access.
//!
//! # Configuration
//!
//! Set these environment variables for JWT validation:
//!
//! - `LECTERN_JWT_SECRET`: Required. The secret key for HS256 validation.
//! - `LECTERN_JWT_ISSUER`: Optional. Expected issuer claim.
//! - `LECTERN_JWT_AUDIENCE`: Optional. Expected audience claim.
//!
//! # Example
//!
//! ```bash
//! export LECTERN_JWT_SECRET="your-secret-key-min-32-chars-long"
//! lectern serve --port 8080
//! ```

use crate::{Error, Result};
use jsonwebtoken::{Algorithm, DecodingKey, TokenData, Validation, decode};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Minimum secret key length for security.
const MIN_SECRET_LENGTH: usize = 32;

/// Minimum number of unique characters for entropy validation.
/// A 32+ character secret with fewer than 8 unique chars is likely weak.
const MIN_UNIQUE_CHARS: usize = 8;

/// Validates that a secret has sufficient entropy (not just length).
fn validate_secret_entropy(secret: &str) -> std::result::Result<(), String> {
    let unique_chars: std::collections::HashSet<char> = secret.chars().collect();
    if unique_chars.len() < MIN_UNIQUE_CHARS {
        return Err(format!(
            "JWT secret has insufficient entropy: only {} unique characters (minimum: {})",
            unique_chars.len(),
            MIN_UNIQUE_CHARS
        ));
    }

    let lowercase = secret.to_lowercase();
    let weak_patterns = [
        "password", "secret", "123456", "abcdef", "qwerty", "000000", "111111", "aaaaaa",
    ];

    for pattern in weak_patterns {
        if lowercase.contains(pattern) {
            return Err(format!("JWT secret contains weak pattern '{pattern}'"));
        }
    }

    Ok(())
}

/// JWT claims structure.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user identifier).
    pub sub: String,
    /// Expiration time (Unix timestamp).
    pub exp: usize,
    /// Issued at time (Unix timestamp).
    #[serde(default)]
    pub iat: usize,
    /// Issuer.
    #[serde(default)]
    pub iss: Option<String>,
    /// Audience.
    #[serde(default)]
    pub aud: Option<String>,
    /// Role carried by the token, e.g. "admin" or "editor".
    #[serde(default)]
    pub role: String,
}

impl Claims {
    /// Whether this token may trigger notifications and other editor
    /// operations.
    #[must_use]
    pub fn can_manage_content(&self) -> bool {
        matches!(self.role.as_str(), "admin" | "editor")
    }
}

/// JWT authentication configuration.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// Secret key for HS256 validation.
    secret: String,
    /// Expected issuer (optional).
    issuer: Option<String>,
    /// Expected audience (optional).
    audience: Option<String>,
}

impl JwtConfig {
    /// Creates a new JWT configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if `LECTERN_JWT_SECRET` is not set, too short, or
    /// has insufficient entropy.
    pub fn from_env() -> Result<Self> {
        let secret = std::env::var("LECTERN_JWT_SECRET").map_err(|_| Error::OperationFailed {
            operation: "jwt_config".to_string(),
            cause: "LECTERN_JWT_SECRET environment variable not set".to_string(),
        })?;

        if secret.len() < MIN_SECRET_LENGTH {
            return Err(Error::OperationFailed {
                operation: "jwt_config".to_string(),
                cause: format!(
                    "JWT secret must be at least {MIN_SECRET_LENGTH} characters (got {})",
                    secret.len()
                ),
            });
        }

        validate_secret_entropy(&secret).map_err(|cause| Error::OperationFailed {
            operation: "jwt_config".to_string(),
            cause,
        })?;

        let issuer = std::env::var("LECTERN_JWT_ISSUER").ok();
        let audience = std::env::var("LECTERN_JWT_AUDIENCE").ok();

        Ok(Self {
            secret,
            issuer,
            audience,
        })
    }

    /// Creates a JWT configuration with explicit values (for testing).
    #[must_use]
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            issuer: None,
            audience: None,
        }
    }

    /// Sets the expected issuer.
    #[must_use]
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    /// Sets the expected audience.
    #[must_use]
    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.audience = Some(audience.into());
        self
    }
}

/// JWT authenticator for validating bearer tokens.
#[derive(Clone)]
pub struct JwtAuthenticator {
    /// Decoding key.
    decoding_key: Arc<DecodingKey>,
    /// Validation settings.
    validation: Validation,
}

impl fmt::Debug for JwtAuthenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtAuthenticator")
            .field("validation", &self.validation)
            .finish_non_exhaustive()
    }
}

impl JwtAuthenticator {
    /// Creates a new JWT authenticator from configuration.
    #[must_use]
    pub fn new(config: &JwtConfig) -> Self {
        let decoding_key = Arc::new(DecodingKey::from_secret(config.secret.as_bytes()));

        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;

        if let Some(issuer) = &config.issuer {
            validation.set_issuer(&[issuer]);
        }

        if let Some(audience) = &config.audience {
            validation.set_audience(&[audience]);
        }

        Self {
            decoding_key,
            validation,
        }
    }

    /// Validates a bearer token and returns the claims.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is invalid, expired, or fails
    /// validation.
    pub fn validate(&self, token: &str) -> Result<Claims> {
        let token_data: TokenData<Claims> = decode(token, &self.decoding_key, &self.validation)
            .map_err(|e| {
                tracing::warn!(error = %e, "JWT validation failed");
                Error::Unauthorized(format!("Invalid token: {e}"))
            })?;

        tracing::debug!(
            sub = %token_data.claims.sub,
            role = %token_data.claims.role,
            "JWT validated successfully"
        );

        Ok(token_data.claims)
    }

    /// Extracts and validates a bearer token from an Authorization header.
    ///
    /// # Errors
    ///
    /// Returns an error if the header format is invalid or token validation
    /// fails.
    pub fn validate_header(&self, auth_header: &str) -> Result<Claims> {
        let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
            Error::Unauthorized("Invalid Authorization header format".to_string())
        })?;

        self.validate(token)
    }
}
