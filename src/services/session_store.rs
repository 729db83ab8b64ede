//! In-memory session table mapping opaque tokens to identities.
//!
//! Sessions live for the lifetime of the process.

use crate::models::user::Identity;
use std::{collections::HashMap, sync::Arc};
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Clone, Default)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<Uuid, Identity>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a session for `identity` and return its token.
    pub async fn open(&self, identity: Identity) -> Uuid {
        let token = Uuid::new_v4();
        tracing::debug!(user_id = identity.id, "session opened");
        self.sessions.write().await.insert(token, identity);
        token
    }

    pub async fn lookup(&self, token: &Uuid) -> Option<Identity> {
        self.sessions.read().await.get(token).cloned()
    }

    /// Drop a session. Returns the identity it belonged to, if any.
    pub async fn close(&self, token: &Uuid) -> Option<Identity> {
        self.sessions.write().await.remove(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::Role;

    #[tokio::test]
    async fn open_lookup_close() {
        let store = SessionStore::new();
        let identity = Identity {
            id: 1,
            name: "Jane".into(),
            email: "jane@example.com".into(),
            role: Role::Customer,
        };

        let token = store.open(identity.clone()).await;
        assert_eq!(store.lookup(&token).await, Some(identity.clone()));
        assert_eq!(store.lookup(&Uuid::new_v4()).await, None);

        assert_eq!(store.close(&token).await, Some(identity));
        assert_eq!(store.lookup(&token).await, None);
        assert_eq!(store.close(&token).await, None);
    }
}
