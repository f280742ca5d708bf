//! Email verification tokens, hashed at rest.

use chrono::{DateTime, Duration, Utc};
use sqlx::FromRow;

use crate::db::DbPool;

#[derive(Debug, Clone, FromRow)]
pub struct VerificationToken {
    pub user_id: String,
    pub secret_hash: String,
    pub created_at: String,
    pub expires_at: String,
}

impl VerificationToken {
    /// Store a new token for the user, superseding any previous one. A single
    /// upsert keyed by user_id keeps "at most one live token per user" atomic.
    pub async fn upsert(
        pool: &DbPool,
        user_id: &str,
        secret_hash: &str,
        ttl: Duration,
    ) -> Result<(), sqlx::Error> {
        let now = Utc::now();
        let expires_at = now + ttl;
        sqlx::query(
            "INSERT INTO verification_tokens (user_id, secret_hash, created_at, expires_at) \
             VALUES (?, ?, ?, ?) \
             ON CONFLICT(user_id) DO UPDATE SET \
                 secret_hash = excluded.secret_hash, \
                 created_at = excluded.created_at, \
                 expires_at = excluded.expires_at",
        )
        .bind(user_id)
        .bind(secret_hash)
        .bind(now.to_rfc3339())
        .bind(expires_at.to_rfc3339())
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn find(pool: &DbPool, user_id: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM verification_tokens WHERE user_id = ?")
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    pub async fn delete(pool: &DbPool, user_id: &str) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM verification_tokens WHERE user_id = ?")
            .bind(user_id)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Expiry is passive: rows are not swept, just checked when the link is used.
    pub fn is_expired(&self) -> bool {
        match DateTime::parse_from_rfc3339(&self.expires_at) {
            Ok(expires_at) => expires_at < Utc::now(),
            Err(_) => true,
        }
    }
}
