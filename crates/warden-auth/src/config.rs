//! Authentication and authorization configuration.
//!
//! Covers token lifetimes, the enabled grant types, the signing key and
//! policy, and the statically registered clients and users.

use std::collections::HashSet;
use std::fmt;
use std::time::Duration;

use argon2::PasswordHash;
use serde::{Deserialize, Serialize};

use crate::token::jwt::{JwtCodec, SigningAlgorithm, SigningKey};
use crate::types::{Client, GrantType};

/// Root authentication and authorization configuration.
///
/// # Example (TOML)
///
/// ```toml
/// [auth]
/// issuer = "https://auth.example.com"
///
/// [auth.oauth]
/// access_token_lifetime = "15m"
/// refresh_token_lifetime = "7d"
///
/// [auth.signing]
/// algorithm = "HmacSHA512"
/// secret = "change-me"
///
/// [[auth.clients]]
/// client_id = "web"
/// secret = "web-secret"
/// redirect_uris = ["https://app.example.com/callback"]
/// grant_types = ["authorization_code", "refresh_token"]
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Value of the `iss` claim.
    pub issuer: String,

    /// Value of the `aud` claim, omitted when unset.
    pub audience: Option<String>,

    /// OAuth 2.0 configuration.
    pub oauth: OAuthConfig,

    /// Token signing configuration.
    pub signing: SigningConfig,

    /// Registered clients.
    pub clients: Vec<ClientConfig>,

    /// Users accepted by the password grant.
    pub users: Vec<UserConfig>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            issuer: "http://localhost:8080".to_string(),
            audience: None,
            oauth: OAuthConfig::default(),
            signing: SigningConfig::default(),
            clients: Vec::new(),
            users: Vec::new(),
        }
    }
}

/// OAuth 2.0 configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OAuthConfig {
    /// Authorization code lifetime.
    #[serde(with = "humantime_serde")]
    pub authorization_code_lifetime: Duration,

    /// Access token lifetime.
    #[serde(with = "humantime_serde")]
    pub access_token_lifetime: Duration,

    /// Refresh token lifetime. Also bounds how long a pair stays in storage.
    #[serde(with = "humantime_serde")]
    pub refresh_token_lifetime: Duration,

    /// Enabled grant types. Requests for any other grant answer 501.
    pub grant_types: Vec<String>,
}

impl Default for OAuthConfig {
    fn default() -> Self {
        Self {
            authorization_code_lifetime: Duration::from_secs(600), // 10 minutes
            access_token_lifetime: Duration::from_secs(3600),      // 1 hour
            refresh_token_lifetime: Duration::from_secs(30 * 24 * 3600), // 30 days
            grant_types: GrantType::supported()
                .iter()
                .map(|g| g.as_str().to_string())
                .collect(),
        }
    }
}

/// Token signing configuration.
#[derive(Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SigningConfig {
    /// HMAC variant new tokens are signed with.
    pub algorithm: String,

    /// Shared secret. Never serialized or printed.
    #[serde(skip_serializing)]
    pub secret: String,

    /// Algorithms refused both for signing and for presented tokens.
    pub rejected_algorithms: Vec<String>,
}

impl Default for SigningConfig {
    fn default() -> Self {
        Self {
            algorithm: SigningAlgorithm::HmacSha256.as_str().to_string(),
            secret: String::new(),
            rejected_algorithms: Vec::new(),
        }
    }
}

impl fmt::Debug for SigningConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningConfig")
            .field("algorithm", &self.algorithm)
            .field("secret", &"[REDACTED]")
            .field("rejected_algorithms", &self.rejected_algorithms)
            .finish()
    }
}

/// A statically registered client.
#[derive(Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Client identifier.
    pub client_id: String,

    /// Client secret.
    #[serde(skip_serializing)]
    pub secret: String,

    /// Allowed redirect URI prefixes.
    pub redirect_uris: Vec<String>,

    /// Grants this client may use. Empty means every implemented grant
    /// except `implicit`.
    pub grant_types: Vec<String>,
}

impl ClientConfig {
    /// Builds the runtime client.
    #[must_use]
    pub fn to_client(&self) -> Client {
        let grant_types = if self.grant_types.is_empty() {
            GrantType::client_defaults()
        } else {
            self.grant_types.iter().map(|g| GrantType::parse(g)).collect()
        };

        Client {
            client_id: self.client_id.clone(),
            secret: self.secret.clone(),
            redirect_uris: self.redirect_uris.clone(),
            grant_types,
        }
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("client_id", &self.client_id)
            .field("secret", &"[REDACTED]")
            .field("redirect_uris", &self.redirect_uris)
            .field("grant_types", &self.grant_types)
            .finish()
    }
}

/// A user accepted by the password grant.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct UserConfig {
    /// Login name, used as the token subject.
    pub username: String,

    /// Argon2 password hash in PHC string format.
    pub password_hash: String,
}

/// Upper bound for every configured lifetime (100 years).
pub const MAX_LIFETIME: Duration = Duration::from_secs(100 * 365 * 24 * 3600);

/// Configuration validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An invalid configuration value was provided.
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),

    /// A required configuration value is missing.
    #[error("Missing required configuration: {0}")]
    Missing(String),
}

impl AuthConfig {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if the issuer or signing secret is
    /// empty, and `ConfigError::InvalidValue` if:
    /// - The signing algorithm or a rejected algorithm is unknown
    /// - The signing algorithm is itself rejected
    /// - A lifetime is zero or longer than [`MAX_LIFETIME`]
    /// - A grant type is not implemented
    /// - A client or user entry is malformed or duplicated
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.issuer.is_empty() {
            return Err(ConfigError::Missing("issuer".to_string()));
        }

        if self.signing.secret.is_empty() {
            return Err(ConfigError::Missing("signing.secret".to_string()));
        }

        let algorithm = self.signing_algorithm()?;
        if self.rejected_algorithms()?.contains(&algorithm) {
            return Err(ConfigError::InvalidValue(format!(
                "signing algorithm {algorithm} is listed in signing.rejected_algorithms"
            )));
        }

        for (name, lifetime) in [
            (
                "authorization_code_lifetime",
                self.oauth.authorization_code_lifetime,
            ),
            ("access_token_lifetime", self.oauth.access_token_lifetime),
            ("refresh_token_lifetime", self.oauth.refresh_token_lifetime),
        ] {
            if lifetime.as_secs() == 0 {
                return Err(ConfigError::InvalidValue(format!(
                    "oauth.{name} must be at least one second"
                )));
            }
            if lifetime > MAX_LIFETIME {
                return Err(ConfigError::InvalidValue(format!(
                    "oauth.{name} must not exceed 100 years"
                )));
            }
        }

        for grant in &self.oauth.grant_types {
            validate_grant_type(grant)?;
        }

        let mut client_ids = HashSet::new();
        for client in &self.clients {
            if client.client_id.is_empty() {
                return Err(ConfigError::InvalidValue(
                    "client_id cannot be empty".to_string(),
                ));
            }
            if !client_ids.insert(client.client_id.as_str()) {
                return Err(ConfigError::InvalidValue(format!(
                    "duplicate client_id '{}'",
                    client.client_id
                )));
            }
            if client.secret.is_empty() {
                return Err(ConfigError::Missing(format!(
                    "secret for client '{}'",
                    client.client_id
                )));
            }
            for grant in &client.grant_types {
                validate_grant_type(grant)?;
            }
        }

        let mut usernames = HashSet::new();
        for user in &self.users {
            if user.username.is_empty() {
                return Err(ConfigError::InvalidValue(
                    "username cannot be empty".to_string(),
                ));
            }
            if !usernames.insert(user.username.as_str()) {
                return Err(ConfigError::InvalidValue(format!(
                    "duplicate username '{}'",
                    user.username
                )));
            }
            if PasswordHash::new(&user.password_hash).is_err() {
                return Err(ConfigError::InvalidValue(format!(
                    "password_hash for user '{}' is not a PHC string",
                    user.username
                )));
            }
        }

        Ok(())
    }

    /// Parses `signing.algorithm`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if the tag is unknown.
    pub fn signing_algorithm(&self) -> Result<SigningAlgorithm, ConfigError> {
        parse_algorithm(&self.signing.algorithm)
    }

    /// Parses `signing.rejected_algorithms`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any tag is unknown.
    pub fn rejected_algorithms(&self) -> Result<Vec<SigningAlgorithm>, ConfigError> {
        self.signing
            .rejected_algorithms
            .iter()
            .map(|name| parse_algorithm(name))
            .collect()
    }

    /// Builds the codec for the configured key and policy.
    ///
    /// # Errors
    ///
    /// Returns an error if an algorithm tag is unknown.
    pub fn codec(&self) -> Result<JwtCodec, ConfigError> {
        let key = SigningKey::new(self.signing_algorithm()?, self.signing.secret.as_bytes());
        Ok(JwtCodec::new(key).with_rejected_algorithms(self.rejected_algorithms()?))
    }

    /// The grants enabled in `oauth.grant_types`.
    #[must_use]
    pub fn enabled_grants(&self) -> Vec<GrantType> {
        self.oauth
            .grant_types
            .iter()
            .map(|g| GrantType::parse(g))
            .filter(GrantType::is_supported)
            .collect()
    }
}

fn parse_algorithm(name: &str) -> Result<SigningAlgorithm, ConfigError> {
    SigningAlgorithm::parse(name).ok_or_else(|| {
        ConfigError::InvalidValue(format!(
            "Invalid signing algorithm: '{name}'. Must be one of HmacMD5, HmacSHA1, \
             HmacSHA224, HmacSHA256, HmacSHA384, HmacSHA512, HmacSHA512/224, HmacSHA512/256"
        ))
    })
}

fn validate_grant_type(grant: &str) -> Result<(), ConfigError> {
    if GrantType::parse(grant).is_supported() {
        Ok(())
    } else {
        Err(ConfigError::InvalidValue(format!(
            "Invalid grant type: '{grant}'. Must be authorization_code, implicit, \
             password, client_credentials, or refresh_token"
        )))
    }
}
