//! Protocol surface: grant dispatch for `/authorize`, `/token`,
//! `/introspection` and `/revoke`.
//!
//! Grant and response types are parsed into closed enums first. Values that
//! are unknown, or known but disabled in configuration, fail with
//! `UnsupportedGrantType` / `UnsupportedResponseType` (501) before any other
//! parameter is looked at.

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::authorize::{
    AuthorizationRequest, AuthorizationResponse, AuthorizeOutcome, implicit_redirect_url,
};
use super::client_auth::{ClientCredentials, authenticate_client};
use super::token::{TokenRequest, TokenResponse};
use crate::AuthResult;
use crate::error::AuthError;
use crate::storage::{AuthorizationCodeStore, ClientRegistry};
use crate::token::{
    IntrospectionResponse, RevocationRequest, TokenService, TokenTypeHint,
};
use crate::types::{Client, GrantType, ResponseType, TokenPair};

/// OAuth 2.0 protocol service.
pub struct OAuthService {
    tokens: Arc<TokenService>,
    clients: Arc<dyn ClientRegistry>,
    codes: Arc<dyn AuthorizationCodeStore>,
    enabled_grants: Vec<GrantType>,
}

impl OAuthService {
    /// Creates the service.
    ///
    /// # Arguments
    ///
    /// * `tokens` - Token lifecycle manager
    /// * `clients` - Registered clients
    /// * `codes` - Authorization code issuer
    /// * `enabled_grants` - Grants this server answers; the rest get 501
    #[must_use]
    pub fn new(
        tokens: Arc<TokenService>,
        clients: Arc<dyn ClientRegistry>,
        codes: Arc<dyn AuthorizationCodeStore>,
        enabled_grants: Vec<GrantType>,
    ) -> Self {
        Self {
            tokens,
            clients,
            codes,
            enabled_grants,
        }
    }

    /// The token lifecycle manager.
    #[must_use]
    pub fn tokens(&self) -> &Arc<TokenService> {
        &self.tokens
    }

    /// The authorization code store.
    #[must_use]
    pub fn codes(&self) -> &Arc<dyn AuthorizationCodeStore> {
        &self.codes
    }

    fn issuer(&self) -> &str {
        &self.tokens.config().issuer
    }

    fn is_enabled(&self, grant: &GrantType) -> bool {
        grant.is_supported() && self.enabled_grants.contains(grant)
    }

    // ------------------------------------------------------------------------
    // /authorize
    // ------------------------------------------------------------------------

    /// Handles an authorization request.
    ///
    /// # Errors
    ///
    /// - `UnsupportedResponseType` for unknown or disabled response types
    /// - `InvalidClient` for unknown clients
    /// - `Forbidden` if the client may not use the flow or the redirect URI
    ///   is outside its allow-list
    /// - `InvalidRequest` if the redirect URI is not an absolute URL, or is
    ///   missing for `response_type=token`
    pub async fn authorize(&self, request: &AuthorizationRequest) -> AuthResult<AuthorizeOutcome> {
        // 1. Dispatch on response type
        let response_type = ResponseType::parse(&request.response_type);
        let grant = match response_type.grant_type() {
            Some(grant) if self.is_enabled(&grant) => grant,
            _ => {
                return Err(AuthError::unsupported_response_type(
                    response_type.as_str(),
                ));
            }
        };

        // 2. Resolve the client and check what it may do
        let client = self.find_client(&request.client_id).await?;
        ensure_grant_allowed(&client, &grant)?;

        // 3. Redirect URI allow-list, before anything is issued
        let redirect_uri = request.redirect_uri.as_deref();
        if let Some(uri) = redirect_uri {
            ensure_redirect_allowed(&client, uri)?;
        }

        // 4. Issue
        match response_type {
            ResponseType::Code => {
                let code = self
                    .codes
                    .issue(
                        &client.client_id,
                        &client.client_id,
                        request.scope.as_deref(),
                        redirect_uri,
                    )
                    .await?;
                info!(client_id = %client.client_id, "Issued authorization code");

                let response = AuthorizationResponse::new(code.code, request.state.clone());
                match redirect_uri {
                    Some(uri) => response
                        .to_redirect_url(uri)
                        .map(AuthorizeOutcome::Redirect)
                        .map_err(|e| AuthError::invalid_request(format!("Invalid redirect_uri: {e}"))),
                    None => Ok(AuthorizeOutcome::Code(response)),
                }
            }
            ResponseType::Token => {
                // Implicit tokens only ever travel through an allowed redirect
                let Some(uri) = redirect_uri else {
                    return Err(AuthError::invalid_request(
                        "redirect_uri is required for response_type=token",
                    ));
                };
                // Parse before issuing so a bad URI leaves nothing behind
                url::Url::parse(uri)
                    .map_err(|e| AuthError::invalid_request(format!("Invalid redirect_uri: {e}")))?;

                let pair = self
                    .tokens
                    .issue_for_client(
                        self.issuer(),
                        &client.client_id,
                        &client.client_id,
                        request.scope.as_deref(),
                    )
                    .await?;
                let response = self.token_response(&pair);

                implicit_redirect_url(uri, &response, request.state.as_deref())
                    .map(AuthorizeOutcome::Redirect)
                    .map_err(|e| AuthError::invalid_request(format!("Invalid redirect_uri: {e}")))
            }
            ResponseType::Unsupported(value) => Err(AuthError::unsupported_response_type(value)),
        }
    }

    // ------------------------------------------------------------------------
    // /token
    // ------------------------------------------------------------------------

    /// Handles a token request.
    ///
    /// # Errors
    ///
    /// - `UnsupportedGrantType` for unknown or disabled grants
    /// - `InvalidRequest` for missing parameters
    /// - `InvalidClient` if client authentication fails
    /// - `InvalidGrant` for bad codes, credentials or refresh tokens
    /// - `Forbidden` if the client may not use the grant or redirect URI
    pub async fn token(
        &self,
        request: &TokenRequest,
        credentials: &ClientCredentials,
    ) -> AuthResult<TokenResponse> {
        // 1. Dispatch on grant type; the implicit grant has no token-endpoint form
        let grant = GrantType::parse(&request.grant_type);
        if grant == GrantType::Implicit || !self.is_enabled(&grant) {
            return Err(AuthError::unsupported_grant_type(grant.as_str()));
        }

        // 2. Run the grant
        let result = match &grant {
            GrantType::AuthorizationCode => self.authorization_code_grant(request, credentials).await,
            GrantType::Password => self.password_grant(request, credentials).await,
            GrantType::ClientCredentials => {
                self.client_credentials_grant(request, credentials).await
            }
            GrantType::RefreshToken => self.refresh_token_grant(request, credentials).await,
            GrantType::Implicit | GrantType::Unsupported(_) => {
                Err(AuthError::unsupported_grant_type(grant.as_str()))
            }
        };

        match result {
            Ok(pair) => Ok(self.token_response(&pair)),
            Err(e) => {
                warn!(
                    grant_type = %grant,
                    client_id = ?credentials.client_id(),
                    error = %e,
                    "Token request failed"
                );
                Err(e)
            }
        }
    }

    async fn authorization_code_grant(
        &self,
        request: &TokenRequest,
        credentials: &ClientCredentials,
    ) -> AuthResult<TokenPair> {
        let client = authenticate_client(credentials, self.clients.as_ref()).await?;
        ensure_grant_allowed(&client, &GrantType::AuthorizationCode)?;

        let code = request
            .code
            .as_deref()
            .ok_or_else(|| AuthError::invalid_request("Missing code parameter"))?;

        let Some(issued) = self.codes.consume(code).await? else {
            return Err(AuthError::invalid_grant(
                "Authorization code is invalid or expired",
            ));
        };

        if issued.client_id != client.client_id {
            return Err(AuthError::invalid_grant(
                "Authorization code was issued to another client",
            ));
        }

        if let Some(uri) = request.redirect_uri.as_deref() {
            ensure_redirect_allowed(&client, uri)?;
            if issued.redirect_uri.as_deref().is_some_and(|bound| bound != uri) {
                return Err(AuthError::invalid_grant("redirect_uri mismatch"));
            }
        }

        self.tokens
            .issue_for_client(
                self.issuer(),
                &client.client_id,
                &issued.subject,
                issued.scope.as_deref(),
            )
            .await
    }

    async fn password_grant(
        &self,
        request: &TokenRequest,
        credentials: &ClientCredentials,
    ) -> AuthResult<TokenPair> {
        let client = self
            .authenticate_if_presented(credentials, &GrantType::Password)
            .await?;

        let username = request
            .username
            .as_deref()
            .ok_or_else(|| AuthError::invalid_request("Missing username parameter"))?;
        let password = request
            .password
            .as_deref()
            .ok_or_else(|| AuthError::invalid_request("Missing password parameter"))?;

        self.tokens
            .issue_with_credentials(
                self.issuer(),
                client.as_ref().map(|c| c.client_id.as_str()),
                username,
                password,
                request.scope.as_deref(),
            )
            .await?
            .ok_or_else(|| AuthError::invalid_grant("Invalid username or password"))
    }

    async fn client_credentials_grant(
        &self,
        request: &TokenRequest,
        credentials: &ClientCredentials,
    ) -> AuthResult<TokenPair> {
        let client = authenticate_client(credentials, self.clients.as_ref()).await?;
        ensure_grant_allowed(&client, &GrantType::ClientCredentials)?;

        self.tokens
            .issue_for_client(
                self.issuer(),
                &client.client_id,
                &client.client_id,
                request.scope.as_deref(),
            )
            .await
    }

    async fn refresh_token_grant(
        &self,
        request: &TokenRequest,
        credentials: &ClientCredentials,
    ) -> AuthResult<TokenPair> {
        self.authenticate_if_presented(credentials, &GrantType::RefreshToken)
            .await?;

        let refresh_token = request
            .refresh_token
            .as_deref()
            .ok_or_else(|| AuthError::invalid_request("Missing refresh_token parameter"))?;

        self.tokens
            .refresh(refresh_token)
            .await?
            .ok_or_else(|| AuthError::invalid_grant("Refresh token is invalid or expired"))
    }

    // ------------------------------------------------------------------------
    // /introspection and /revoke
    // ------------------------------------------------------------------------

    /// Introspects a token.
    ///
    /// # Errors
    ///
    /// Returns `Unauthorized` if the token does not validate.
    pub async fn introspect(
        &self,
        token: &str,
        token_type_hint: Option<&str>,
    ) -> AuthResult<IntrospectionResponse> {
        let hint = TokenTypeHint::kind_of(token_type_hint);
        match self.tokens.introspect(token, hint).await? {
            Some(validated) => Ok(IntrospectionResponse::from_validated(&validated)),
            None => Err(AuthError::unauthorized("Token is not active")),
        }
    }

    /// Revokes the pair a presented token belongs to.
    ///
    /// Only the client a pair was issued to may revoke it. Unknown or
    /// already invalid tokens, and tokens issued to anyone else, succeed
    /// silently without revoking anything.
    ///
    /// # Errors
    ///
    /// Returns `InvalidClient` if client authentication fails.
    pub async fn revoke(
        &self,
        request: &RevocationRequest,
        credentials: &ClientCredentials,
    ) -> AuthResult<()> {
        let client = authenticate_client(credentials, self.clients.as_ref()).await?;

        let hint = TokenTypeHint::kind_of(request.token_type_hint.as_deref());
        match self.tokens.introspect(&request.token, hint).await? {
            Some(validated) if validated.client_id.as_deref() == Some(client.client_id.as_str()) => {
                self.tokens.revoke(validated.token.jti()).await
            }
            Some(validated) => {
                warn!(
                    client_id = %client.client_id,
                    jti = %validated.token.jti(),
                    "Revocation of a token issued to another client ignored"
                );
                Ok(())
            }
            None => {
                debug!(client_id = %client.client_id, "Revocation of unknown token ignored");
                Ok(())
            }
        }
    }

    /// Prunes expired token pairs and authorization codes.
    ///
    /// # Returns
    ///
    /// The number of entries removed.
    ///
    /// # Errors
    ///
    /// Returns an error if either store fails.
    pub async fn sweep_expired(&self) -> AuthResult<u64> {
        let now = self.tokens.now();
        let tokens = self.tokens.sweep_expired(now).await?;
        let codes = self.codes.sweep_expired(now).await?;
        if tokens + codes > 0 {
            info!(tokens, codes, "Swept expired entries");
        }
        Ok(tokens + codes)
    }

    // ------------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------------

    async fn find_client(&self, client_id: &str) -> AuthResult<Client> {
        self.clients
            .find_by_client_id(client_id)
            .await?
            .ok_or_else(|| AuthError::invalid_client(format!("Unknown client '{client_id}'")))
    }

    async fn authenticate_if_presented(
        &self,
        credentials: &ClientCredentials,
        grant: &GrantType,
    ) -> AuthResult<Option<Client>> {
        if credentials.client_id().is_none() {
            return Ok(None);
        }
        let client = authenticate_client(credentials, self.clients.as_ref()).await?;
        ensure_grant_allowed(&client, grant)?;
        Ok(Some(client))
    }

    fn token_response(&self, pair: &TokenPair) -> TokenResponse {
        TokenResponse::from_pair(pair, self.tokens.now())
    }
}

fn ensure_grant_allowed(client: &Client, grant: &GrantType) -> AuthResult<()> {
    if client.is_grant_allowed(grant) {
        Ok(())
    } else {
        Err(AuthError::forbidden(format!(
            "Client '{}' may not use the {grant} grant",
            client.client_id
        )))
    }
}

fn ensure_redirect_allowed(client: &Client, uri: &str) -> AuthResult<()> {
    if client.is_redirect_uri_allowed(uri) {
        Ok(())
    } else {
        warn!(client_id = %client.client_id, redirect_uri = %uri, "Redirect URI not allowed");
        Err(AuthError::forbidden("redirect_uri is not allowed for this client"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::{ClientConfig, UserConfig};
    use crate::storage::{
        ConfigCredentialVerifier, MemoryAuthorizationCodes, MemoryTokenStore,
        StaticClientRegistry,
    };
    use crate::token::jwt::{JwtCodec, SigningAlgorithm, SigningKey};
    use crate::token::TokenConfig;
    use argon2::password_hash::SaltString;
    use argon2::{Argon2, PasswordHasher};
    use time::macros::datetime;

    fn service_with(enabled: Vec<GrantType>) -> OAuthService {
        let clock = Arc::new(ManualClock::new(datetime!(2021-07-01 12:00:00 UTC)));
        let salt = SaltString::from_b64("c29tZXNhbHRzb21lc2FsdA").unwrap();
        let hash = Argon2::default()
            .hash_password(b"wonderland", &salt)
            .unwrap()
            .to_string();

        let tokens = Arc::new(TokenService::new(
            Arc::new(JwtCodec::new(SigningKey::new(
                SigningAlgorithm::HmacSha256,
                "oauth-test-secret",
            ))),
            Arc::new(MemoryTokenStore::new()),
            Arc::new(ConfigCredentialVerifier::new(&[UserConfig {
                username: "alice".to_string(),
                password_hash: hash,
            }])),
            clock.clone(),
            TokenConfig::new("https://warden.test"),
        ));

        let clients = StaticClientRegistry::new([
            Client {
                client_id: "web".to_string(),
                secret: "web-secret".to_string(),
                redirect_uris: vec!["https://app.example.com/callback".to_string()],
                grant_types: vec![
                    GrantType::AuthorizationCode,
                    GrantType::Implicit,
                    GrantType::RefreshToken,
                ],
            },
            Client {
                client_id: "svc".to_string(),
                secret: "svc-secret".to_string(),
                redirect_uris: vec![],
                grant_types: vec![GrantType::ClientCredentials],
            },
        ]);

        OAuthService::new(
            tokens,
            Arc::new(clients),
            Arc::new(MemoryAuthorizationCodes::new(
                std::time::Duration::from_secs(600),
                clock,
            )),
            enabled,
        )
    }

    fn service() -> OAuthService {
        service_with(GrantType::supported())
    }

    fn token_request(grant_type: &str) -> TokenRequest {
        serde_json::from_value(serde_json::json!({ "grant_type": grant_type })).unwrap()
    }

    fn authorize_request(response_type: &str, redirect_uri: Option<&str>) -> AuthorizationRequest {
        AuthorizationRequest {
            response_type: response_type.to_string(),
            client_id: "web".to_string(),
            redirect_uri: redirect_uri.map(str::to_string),
            scope: Some("read".to_string()),
            state: Some("xyz".to_string()),
        }
    }

    fn post_credentials(id: &str, secret: &str) -> ClientCredentials {
        ClientCredentials {
            basic: None,
            client_id: Some(id.to_string()),
            client_secret: Some(secret.to_string()),
        }
    }

    #[tokio::test]
    async fn test_code_flow_end_to_end() {
        let service = service();
        let outcome = service
            .authorize(&authorize_request("code", None))
            .await
            .unwrap();
        let AuthorizeOutcome::Code(response) = outcome else {
            panic!("expected code response");
        };
        assert_eq!(response.state.as_deref(), Some("xyz"));

        let mut request = token_request("authorization_code");
        request.code = Some(response.code.clone());
        let tokens = service
            .token(&request, &post_credentials("web", "web-secret"))
            .await
            .unwrap();
        assert_eq!(tokens.token_type, "bearer");
        assert_eq!(tokens.scope.as_deref(), Some("read"));

        let introspection = service.introspect(&tokens.access_token, None).await.unwrap();
        assert_eq!(introspection.sub.as_deref(), Some("web"));
        assert_eq!(introspection.client_id.as_deref(), Some("web"));

        // Codes are single-use
        let err = service
            .token(&request, &post_credentials("web", "web-secret"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidGrant { .. }));
    }

    #[tokio::test]
    async fn test_code_redirect() {
        let outcome = service()
            .authorize(&authorize_request(
                "code",
                Some("HTTPS://APP.example.com/callback/x"),
            ))
            .await
            .unwrap();
        let AuthorizeOutcome::Redirect(url) = outcome else {
            panic!("expected redirect");
        };
        assert!(url.starts_with("https://app.example.com/callback/x?code="));
        assert!(url.ends_with("&state=xyz"));
    }

    #[tokio::test]
    async fn test_disallowed_redirect_is_forbidden_and_issues_nothing() {
        let service = service();
        let err = service
            .authorize(&authorize_request("token", Some("https://evil.example.com/")))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Forbidden { .. }));
        assert_eq!(err.http_status(), 403);
    }

    #[tokio::test]
    async fn test_implicit_redirect_carries_fragment() {
        let service = service();
        let outcome = service
            .authorize(&authorize_request(
                "token",
                Some("https://app.example.com/callback"),
            ))
            .await
            .unwrap();
        let AuthorizeOutcome::Redirect(url) = outcome else {
            panic!("expected redirect");
        };
        let (base, fragment) = url.split_once('#').unwrap();
        assert_eq!(base, "https://app.example.com/callback");
        assert!(fragment.contains("token_type=bearer"));
        assert!(fragment.ends_with("state=xyz"));
    }

    #[tokio::test]
    async fn test_implicit_requires_redirect_uri() {
        let service = service();
        let err = service
            .authorize(&authorize_request("token", None))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidRequest { .. }));
        assert_eq!(err.http_status(), 400);

        let err = service
            .authorize(&authorize_request("token", Some("not a url")))
            .await
            .unwrap_err();
        assert_eq!(err.http_status(), 403);
    }

    #[tokio::test]
    async fn test_implicit_is_opt_in_for_clients_without_grant_list() {
        let clock = Arc::new(ManualClock::new(datetime!(2021-07-01 12:00:00 UTC)));
        let store = Arc::new(MemoryTokenStore::new());
        let tokens = Arc::new(TokenService::new(
            Arc::new(JwtCodec::new(SigningKey::new(
                SigningAlgorithm::HmacSha256,
                "oauth-test-secret",
            ))),
            store.clone(),
            Arc::new(ConfigCredentialVerifier::new(&[])),
            clock.clone(),
            TokenConfig::new("https://warden.test"),
        ));
        let svc = ClientConfig {
            client_id: "svc".to_string(),
            secret: "svc-secret".to_string(),
            redirect_uris: vec!["https://svc.example.com/".to_string()],
            grant_types: vec![],
        };
        let service = OAuthService::new(
            tokens,
            Arc::new(StaticClientRegistry::new([svc.to_client()])),
            Arc::new(MemoryAuthorizationCodes::new(
                std::time::Duration::from_secs(600),
                clock,
            )),
            GrantType::supported(),
        );

        for redirect_uri in [None, Some("https://svc.example.com/cb".to_string())] {
            let request = AuthorizationRequest {
                response_type: "token".to_string(),
                client_id: "svc".to_string(),
                redirect_uri,
                scope: Some("admin".to_string()),
                state: None,
            };
            let err = service.authorize(&request).await.unwrap_err();
            assert!(matches!(err, AuthError::Forbidden { .. }));
        }
        assert!(store.is_empty());

        // The secret still gets a token through client_credentials
        service
            .token(
                &token_request("client_credentials"),
                &post_credentials("svc", "svc-secret"),
            )
            .await
            .unwrap();
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_unsupported_response_type() {
        let err = service()
            .authorize(&authorize_request("id_token", None))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::UnsupportedResponseType { .. }));
        assert_eq!(err.http_status(), 501);
    }

    #[tokio::test]
    async fn test_unsupported_and_disabled_grants_are_501() {
        let service = service_with(vec![GrantType::Password]);
        for grant in ["device_code", "implicit", "client_credentials", ""] {
            let err = service
                .token(&token_request(grant), &ClientCredentials::default())
                .await
                .unwrap_err();
            assert!(
                matches!(err, AuthError::UnsupportedGrantType { .. }),
                "{grant}"
            );
            assert_eq!(err.http_status(), 501);
        }

        let err = service
            .authorize(&authorize_request("code", None))
            .await
            .unwrap_err();
        assert_eq!(err.http_status(), 501);
    }

    #[tokio::test]
    async fn test_password_grant() {
        let service = service();
        let mut request = token_request("password");
        request.username = Some("alice".to_string());
        request.password = Some("wonderland".to_string());
        request.scope = Some("read|Write".to_string());

        let response = service
            .token(&request, &ClientCredentials::default())
            .await
            .unwrap();
        assert_eq!(response.scope.as_deref(), Some("read write"));
        assert_eq!(response.expires_in, 3600);

        request.password = Some("nope".to_string());
        let err = service
            .token(&request, &ClientCredentials::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidGrant { .. }));

        request.password = None;
        let err = service
            .token(&request, &ClientCredentials::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidRequest { .. }));
    }

    #[tokio::test]
    async fn test_client_credentials_grant() {
        let service = service();
        let request = token_request("client_credentials");

        let response = service
            .token(&request, &post_credentials("svc", "svc-secret"))
            .await
            .unwrap();
        let introspection = service.introspect(&response.access_token, None).await.unwrap();
        assert_eq!(introspection.sub.as_deref(), Some("svc"));
        assert_eq!(introspection.token_type.as_deref(), Some("bearer"));

        let err = service
            .token(&request, &post_credentials("svc", "bad"))
            .await
            .unwrap_err();
        assert_eq!(err.http_status(), 401);

        // "web" is not registered for client_credentials
        let err = service
            .token(&request, &post_credentials("web", "web-secret"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Forbidden { .. }));
    }

    #[tokio::test]
    async fn test_refresh_grant() {
        let service = service();
        let first = service
            .token(
                &token_request("client_credentials"),
                &post_credentials("svc", "svc-secret"),
            )
            .await
            .unwrap();

        let mut request = token_request("refresh_token");
        request.refresh_token = Some(first.refresh_token.clone());
        let second = service
            .token(&request, &ClientCredentials::default())
            .await
            .unwrap();
        assert_ne!(second.access_token, first.access_token);
        assert_eq!(second.scope, first.scope);

        let err = service
            .token(&request, &ClientCredentials::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidGrant { .. }));
    }

    #[tokio::test]
    async fn test_introspection_of_invalid_token_is_unauthorized() {
        let err = service().introspect("bad.bad.bad", None).await.unwrap_err();
        assert!(matches!(err, AuthError::Unauthorized { .. }));
        assert_eq!(err.http_status(), 401);
    }

    #[tokio::test]
    async fn test_revoke() {
        let service = service();
        let response = service
            .token(
                &token_request("client_credentials"),
                &post_credentials("svc", "svc-secret"),
            )
            .await
            .unwrap();

        let request = RevocationRequest {
            token: response.refresh_token.clone(),
            token_type_hint: Some("refresh_token".to_string()),
            client_id: None,
            client_secret: None,
        };
        let credentials = post_credentials("svc", "svc-secret");
        service.revoke(&request, &credentials).await.unwrap();
        // Revoking the refresh half revokes the access half too
        assert!(service.introspect(&response.access_token, None).await.is_err());
        // Unknown tokens are fine
        service.revoke(&request, &credentials).await.unwrap();
        assert_eq!(service.sweep_expired().await.unwrap(), 0);

        let err = service
            .revoke(&request, &ClientCredentials::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidClient { .. }));
    }

    #[tokio::test]
    async fn test_revoke_ignores_tokens_of_other_clients() {
        let service = service();
        let svc_tokens = service
            .token(
                &token_request("client_credentials"),
                &post_credentials("svc", "svc-secret"),
            )
            .await
            .unwrap();

        let request = RevocationRequest {
            token: svc_tokens.access_token.clone(),
            token_type_hint: None,
            client_id: None,
            client_secret: None,
        };
        service
            .revoke(&request, &post_credentials("web", "web-secret"))
            .await
            .unwrap();
        let introspection = service
            .introspect(&svc_tokens.access_token, None)
            .await
            .unwrap();
        assert!(introspection.active);

        // Pairs issued without an authenticated client are not revocable here
        let mut password = token_request("password");
        password.username = Some("alice".to_string());
        password.password = Some("wonderland".to_string());
        let alice = service
            .token(&password, &ClientCredentials::default())
            .await
            .unwrap();
        let request = RevocationRequest {
            token: alice.access_token.clone(),
            ..request
        };
        service
            .revoke(&request, &post_credentials("svc", "svc-secret"))
            .await
            .unwrap();
        assert!(service.introspect(&alice.access_token, None).await.is_ok());
    }
}
