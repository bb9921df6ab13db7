//! Ephemeral account-selection challenges.
//!
//! Challenges live in an in-process expiring map, never the durable token
//! store. Consumption removes the entry before the TTL check, so a challenge
//! is single-use regardless of outcome and two concurrent redemptions cannot
//! both win.

use anyhow::Context;
use base64::Engine;
use rand::{rngs::OsRng, RngCore};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::Error;

struct Challenge {
    user_id: Uuid,
    account_ids: Vec<Uuid>,
    created_at: Instant,
}

pub struct SelectionChallenges {
    ttl: Duration,
    entries: Mutex<HashMap<String, Challenge>>,
}

impl SelectionChallenges {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Store a challenge for the verified-but-unresolved user and return the
    /// random selection token. Expired entries are swept on insert.
    pub async fn create(&self, user_id: Uuid, account_ids: Vec<Uuid>) -> Result<String, Error> {
        let mut bytes = [0u8; 32];
        OsRng
            .try_fill_bytes(&mut bytes)
            .context("failed to generate selection token")?;
        let token = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes);

        let mut entries = self.entries.lock().await;
        entries.retain(|_, entry| entry.created_at.elapsed() < self.ttl);
        entries.insert(
            token.clone(),
            Challenge {
                user_id,
                account_ids,
                created_at: Instant::now(),
            },
        );
        Ok(token)
    }

    /// Take the challenge if it exists and is unexpired. The entry is removed
    /// either way; a second call for the same token always returns `None`.
    pub async fn consume(&self, token: &str) -> Option<(Uuid, Vec<Uuid>)> {
        let mut entries = self.entries.lock().await;
        let entry = entries.remove(token)?;
        if entry.created_at.elapsed() < self.ttl {
            Some((entry.user_id, entry.account_ids))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::SelectionChallenges;
    use anyhow::Result;
    use std::time::Duration;
    use uuid::Uuid;

    #[tokio::test]
    async fn consume_is_single_use() -> Result<()> {
        let challenges = SelectionChallenges::new(Duration::from_secs(60));
        let user = Uuid::new_v4();
        let accounts = vec![Uuid::new_v4(), Uuid::new_v4()];
        let token = challenges.create(user, accounts.clone()).await?;

        let first = challenges.consume(&token).await;
        assert_eq!(first, Some((user, accounts)));
        assert_eq!(challenges.consume(&token).await, None);
        Ok(())
    }

    #[tokio::test]
    async fn expired_challenges_are_rejected() -> Result<()> {
        let challenges = SelectionChallenges::new(Duration::from_millis(0));
        let token = challenges.create(Uuid::new_v4(), vec![]).await?;
        assert_eq!(challenges.consume(&token).await, None);
        Ok(())
    }

    #[tokio::test]
    async fn unknown_tokens_resolve_to_none() {
        let challenges = SelectionChallenges::new(Duration::from_secs(60));
        assert_eq!(challenges.consume("never-issued").await, None);
    }
}
