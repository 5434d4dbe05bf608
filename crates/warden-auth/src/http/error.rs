//! OAuth error responses.
//!
//! `AuthError` renders as `{"error": ..., "error_description": ...}` with
//! `Cache-Control: no-store`. Server-side failures get a generic description;
//! their detail only goes to the log.

use axum::{
    Json,
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::error::AuthError;

/// OAuth error response body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorBody {
    /// OAuth error code.
    pub error: String,
    /// Human-readable description.
    pub error_description: String,
}

impl ErrorBody {
    /// Builds the body for an error.
    #[must_use]
    pub fn from_error(error: &AuthError) -> Self {
        let error_description = if error.is_internal() {
            "The server encountered an internal error".to_string()
        } else {
            error.to_string()
        };
        Self {
            error: error.oauth_error_code().to_string(),
            error_description,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if self.is_internal() {
            error!(category = %self.category(), error = %self, "Request failed");
        }

        let mut headers = no_store_headers();

        // WWW-Authenticate for 401 responses
        if status == StatusCode::UNAUTHORIZED {
            let value = format!(
                "Basic realm=\"warden\", error=\"{}\"",
                self.oauth_error_code()
            );
            if let Ok(value) = HeaderValue::from_str(&value) {
                headers.insert(header::WWW_AUTHENTICATE, value);
            }
        }

        (status, headers, Json(ErrorBody::from_error(&self))).into_response()
    }
}

/// `Cache-Control: no-store` and `Pragma: no-cache`.
pub(crate) fn no_store_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
    headers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_error_body() {
        let body = ErrorBody::from_error(&AuthError::invalid_grant("code expired"));
        assert_eq!(body.error, "invalid_grant");
        assert_eq!(body.error_description, "Invalid grant: code expired");
    }

    #[test]
    fn test_server_error_body_is_generic() {
        let body = ErrorBody::from_error(&AuthError::storage("connection refused to db:5432"));
        assert_eq!(body.error, "server_error");
        assert!(!body.error_description.contains("db:5432"));
    }

    #[test]
    fn test_response_status_and_headers() {
        let response = AuthError::unsupported_grant_type("device_code").into_response();
        assert_eq!(response.status(), StatusCode::NOT_IMPLEMENTED);
        assert_eq!(response.headers()[header::CACHE_CONTROL], "no-store");

        let response = AuthError::invalid_client("nope").into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().contains_key(header::WWW_AUTHENTICATE));

        let response = AuthError::forbidden("redirect").into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert!(!response.headers().contains_key(header::LOCATION));
    }
}
