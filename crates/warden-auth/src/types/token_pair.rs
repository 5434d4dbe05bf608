//! Access/refresh token bundle and scope handling.

use std::collections::BTreeSet;

use time::OffsetDateTime;

use crate::token::model::{Token, TokenKind};

/// Access and refresh token issued together under one `jti`.
///
/// The pair is the unit of storage: it is persisted under [`TokenPair::id`],
/// replaced wholesale on refresh and removed on revocation or expiry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    /// Storage key, equal to the `jti` of both halves.
    pub id: String,

    /// Expiry of the refresh half; the pair may be pruned after this instant.
    pub expires_at_least: OffsetDateTime,

    /// Access token.
    pub token: Token,

    /// Refresh token.
    pub refresh_token: Token,

    /// Granted scopes, lowercase.
    pub scopes: BTreeSet<String>,

    /// Client the pair was issued to, if one authenticated.
    pub client_id: Option<String>,
}

impl TokenPair {
    /// Returns the half selected by `kind`.
    #[must_use]
    pub fn get(&self, kind: TokenKind) -> &Token {
        match kind {
            TokenKind::Access => &self.token,
            TokenKind::Refresh => &self.refresh_token,
        }
    }

    /// Returns `true` if `requested` is absent or every scope it names was
    /// granted, compared case-insensitively. A requested string naming no
    /// scope at all is never contained.
    #[must_use]
    pub fn contains_scope(&self, requested: Option<&str>) -> bool {
        if requested.is_none() {
            return true;
        }
        let requested = parse_scopes(requested);
        !requested.is_empty() && requested.iter().all(|scope| self.scopes.contains(scope))
    }

    /// Space-separated scope string, or `None` when no scope was granted.
    #[must_use]
    pub fn scope(&self) -> Option<String> {
        format_scopes(&self.scopes)
    }

    /// Subject both halves were issued for.
    #[must_use]
    pub fn subject(&self) -> &str {
        &self.token.payload().sub
    }
}

/// Splits a requested scope string on `|` and ASCII whitespace, dropping
/// empty fragments and lowercasing the rest.
#[must_use]
pub fn parse_scopes(requested: Option<&str>) -> BTreeSet<String> {
    requested
        .unwrap_or_default()
        .split(|c: char| c == '|' || c.is_ascii_whitespace())
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Renders scopes space-separated in sorted order.
#[must_use]
pub fn format_scopes(scopes: &BTreeSet<String>) -> Option<String> {
    if scopes.is_empty() {
        None
    } else {
        Some(scopes.iter().map(String::as_str).collect::<Vec<_>>().join(" "))
    }
}
