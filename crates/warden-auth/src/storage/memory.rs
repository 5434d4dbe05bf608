//! In-process token store.

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use time::OffsetDateTime;
use uuid::Uuid;

use super::token::TokenStore;
use crate::AuthResult;
use crate::types::TokenPair;

#[derive(Debug, Clone)]
enum Slot {
    Reserved,
    Issued(TokenPair),
}

/// Token store backed by a sharded concurrent map.
///
/// Contents are lost on restart.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    pairs: DashMap<String, Slot>,
}

impl MemoryTokenStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries, reservations included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Returns `true` if the store holds nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn reserve_id(&self) -> AuthResult<String> {
        loop {
            let id = Uuid::new_v4().to_string();
            if let Entry::Vacant(slot) = self.pairs.entry(id.clone()) {
                slot.insert(Slot::Reserved);
                return Ok(id);
            }
        }
    }

    async fn find(&self, id: &str) -> AuthResult<Option<TokenPair>> {
        Ok(self.pairs.get(id).and_then(|slot| match slot.value() {
            Slot::Issued(pair) => Some(pair.clone()),
            Slot::Reserved => None,
        }))
    }

    async fn put(&self, pair: &TokenPair) -> AuthResult<()> {
        self.pairs
            .insert(pair.id.clone(), Slot::Issued(pair.clone()));
        Ok(())
    }

    async fn take(&self, id: &str) -> AuthResult<Option<TokenPair>> {
        Ok(self
            .pairs
            .remove_if(id, |_, slot| matches!(slot, Slot::Issued(_)))
            .and_then(|(_, slot)| match slot {
                Slot::Issued(pair) => Some(pair),
                Slot::Reserved => None,
            }))
    }

    async fn remove(&self, id: &str) -> AuthResult<()> {
        self.pairs.remove(id);
        Ok(())
    }

    async fn remove_all(&self) -> AuthResult<()> {
        self.pairs.clear();
        Ok(())
    }

    async fn sweep_expired(&self, now: OffsetDateTime) -> AuthResult<u64> {
        let mut removed = 0;
        self.pairs.retain(|_, slot| {
            let keep = match slot {
                Slot::Issued(pair) => pair.expires_at_least >= now,
                Slot::Reserved => false,
            };
            if !keep {
                removed += 1;
            }
            keep
        });
        Ok(removed)
    }

    fn is_stateful(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::sync::Arc;

    use time::macros::datetime;

    use super::*;
    use crate::token::jwt::{JwtCodec, SigningAlgorithm, SigningKey};
    use crate::token::model::Payload;

    fn pair(id: &str, exp: OffsetDateTime) -> TokenPair {
        let codec = JwtCodec::new(SigningKey::new(SigningAlgorithm::HmacSha256, "k"));
        let token = codec
            .sign(&Payload {
                iss: "warden".to_string(),
                sub: "alice".to_string(),
                aud: None,
                exp,
                nbf: datetime!(2021-07-01 12:00:00 UTC),
                iat: datetime!(2021-07-01 12:00:00 UTC),
                jti: id.to_string(),
            })
            .unwrap();
        TokenPair {
            id: id.to_string(),
            expires_at_least: exp,
            token: token.clone(),
            refresh_token: token,
            scopes: BTreeSet::new(),
            client_id: None,
        }
    }

    #[tokio::test]
    async fn test_reserved_id_does_not_resolve() {
        let store = MemoryTokenStore::new();
        let id = store.reserve_id().await.unwrap();
        assert_eq!(store.len(), 1);
        assert!(store.find(&id).await.unwrap().is_none());
        assert!(store.take(&id).await.unwrap().is_none());
        // take leaves the reservation in place
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_put_find_take() {
        let store = MemoryTokenStore::new();
        let id = store.reserve_id().await.unwrap();
        let p = pair(&id, datetime!(2021-07-01 12:02:00 UTC));

        store.put(&p).await.unwrap();
        assert_eq!(store.find(&id).await.unwrap(), Some(p.clone()));

        assert_eq!(store.take(&id).await.unwrap(), Some(p));
        assert!(store.take(&id).await.unwrap().is_none());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_remove_is_idempotent() {
        let store = MemoryTokenStore::new();
        let p = pair("a", datetime!(2021-07-01 12:02:00 UTC));
        store.put(&p).await.unwrap();
        store.remove("a").await.unwrap();
        store.remove("a").await.unwrap();
        assert!(store.find("a").await.unwrap().is_none());

        store.put(&p).await.unwrap();
        store.remove_all().await.unwrap();
        store.remove_all().await.unwrap();
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_sweep_expired() {
        let store = MemoryTokenStore::new();
        store
            .put(&pair("old", datetime!(2021-07-01 12:01:00 UTC)))
            .await
            .unwrap();
        store
            .put(&pair("new", datetime!(2021-07-01 13:00:00 UTC)))
            .await
            .unwrap();
        store.reserve_id().await.unwrap();

        let removed = store
            .sweep_expired(datetime!(2021-07-01 12:30:00 UTC))
            .await
            .unwrap();
        assert_eq!(removed, 2);
        assert!(store.find("old").await.unwrap().is_none());
        assert!(store.find("new").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_concurrent_take_single_winner() {
        let store = Arc::new(MemoryTokenStore::new());
        store
            .put(&pair("x", datetime!(2021-07-01 13:00:00 UTC)))
            .await
            .unwrap();

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let store = Arc::clone(&store);
                tokio::spawn(async move { store.take("x").await.unwrap().is_some() })
            })
            .collect();

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }

    #[tokio::test]
    async fn test_reserved_ids_are_unique() {
        let store = MemoryTokenStore::new();
        let mut ids = std::collections::HashSet::new();
        for _ in 0..100 {
            assert!(ids.insert(store.reserve_id().await.unwrap()));
        }
        assert!(store.is_stateful());
    }
}
