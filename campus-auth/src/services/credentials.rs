//! Credential lifecycle: token revocation, one-time codes, rate-limit
//! counters, and server-side sessions, all backed by the expiring store.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use thiserror::Error;
use uuid::Uuid;

use campus_core::error::AppError;

use super::store::KeyValueStore;

const BLACKLIST_PREFIX: &str = "blacklist:";
const OTP_PREFIX: &str = "otp:";
const RATE_PREFIX: &str = "rate:";
const SESSION_PREFIX: &str = "session:";

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("no verification code found")]
    OtpNotFound,

    #[error("verification code expired")]
    OtpExpired,

    #[error("verification code already used")]
    OtpAlreadyUsed,

    #[error("verification code mismatch")]
    OtpMismatch,

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

impl From<CredentialError> for AppError {
    fn from(err: CredentialError) -> Self {
        match err {
            CredentialError::Store(e) => AppError::InternalError(e),
            other => AppError::AuthError(anyhow::anyhow!(other.to_string())),
        }
    }
}

/// A one-time code at rest. Only the hash of the code is stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OtpEntry {
    pub code_hash: String,
    pub expires_at: DateTime<Utc>,
    pub used: bool,
}

impl OtpEntry {
    pub fn new(code: &str, ttl_seconds: i64, now: DateTime<Utc>) -> Self {
        Self {
            code_hash: hash_code(code),
            expires_at: now + Duration::seconds(ttl_seconds),
            used: false,
        }
    }

    /// Check a supplied code against this entry at time `now`.
    ///
    /// Checked in order: expiry, prior use, then a constant-time hash
    /// comparison.
    pub fn check(&self, supplied: &str, now: DateTime<Utc>) -> Result<(), CredentialError> {
        if now > self.expires_at {
            return Err(CredentialError::OtpExpired);
        }
        if self.used {
            return Err(CredentialError::OtpAlreadyUsed);
        }

        let supplied_hash = hash_code(supplied);
        let matches: bool = supplied_hash
            .as_bytes()
            .ct_eq(self.code_hash.as_bytes())
            .into();
        if !matches {
            return Err(CredentialError::OtpMismatch);
        }

        Ok(())
    }
}

pub fn hash_code(code: &str) -> String {
    hex::encode(Sha256::digest(code.as_bytes()))
}

/// Domain operations over the expiring store. Stateless between requests;
/// safe to clone into handlers.
#[derive(Clone)]
pub struct CredentialService {
    store: Arc<dyn KeyValueStore>,
}

impl CredentialService {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Mark `token` revoked for `ttl_seconds`. Idempotent; re-blacklisting
    /// resets the TTL.
    pub async fn blacklist_token(&self, token: &str, ttl_seconds: i64) -> Result<(), CredentialError> {
        let key = format!("{}{}", BLACKLIST_PREFIX, token);
        self.store.set_ex(&key, "revoked", ttl_seconds).await?;
        Ok(())
    }

    pub async fn is_token_blacklisted(&self, token: &str) -> Result<bool, CredentialError> {
        let key = format!("{}{}", BLACKLIST_PREFIX, token);
        Ok(self.store.exists(&key).await?)
    }

    /// Store a fresh code for `email`, superseding any outstanding entry.
    pub async fn issue_otp(
        &self,
        email: &str,
        code: &str,
        ttl_seconds: i64,
    ) -> Result<(), CredentialError> {
        let entry = OtpEntry::new(code, ttl_seconds, Utc::now());
        let payload = serde_json::to_string(&entry)
            .map_err(|e| anyhow::anyhow!("Failed to serialize OTP entry: {}", e))?;
        let key = format!("{}{}", OTP_PREFIX, email);
        self.store
            .set_ex(&key, &payload, ttl_seconds.max(1))
            .await?;
        Ok(())
    }

    /// Verify a supplied code for `email` and consume it. Single-use: a
    /// second verification with the same code fails.
    pub async fn verify_otp(&self, email: &str, supplied: &str) -> Result<(), CredentialError> {
        let key = format!("{}{}", OTP_PREFIX, email);
        let payload = self
            .store
            .get(&key)
            .await?
            .ok_or(CredentialError::OtpNotFound)?;

        let mut entry: OtpEntry = serde_json::from_str(&payload)
            .map_err(|e| anyhow::anyhow!("Corrupt OTP entry for {}: {}", email, e))?;

        let now = Utc::now();
        entry.check(supplied, now)?;

        // Consume the code, preserving the remaining expiry window.
        entry.used = true;
        let remaining = (entry.expires_at - now).num_seconds().max(1);
        let payload = serde_json::to_string(&entry)
            .map_err(|e| anyhow::anyhow!("Failed to serialize OTP entry: {}", e))?;
        self.store.set_ex(&key, &payload, remaining).await?;

        Ok(())
    }

    /// Atomically bump the counter for `key` within its window and return
    /// the post-increment count. Thresholds belong to the caller.
    pub async fn increment_rate_limit(
        &self,
        key: &str,
        window_seconds: i64,
    ) -> Result<i64, CredentialError> {
        let key = format!("{}{}", RATE_PREFIX, key);
        Ok(self.store.incr_window(&key, window_seconds).await?)
    }

    pub async fn create_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        ttl_seconds: i64,
    ) -> Result<(), CredentialError> {
        let key = format!("{}{}", SESSION_PREFIX, session_id);
        self.store
            .set_ex(&key, &user_id.to_string(), ttl_seconds)
            .await?;
        Ok(())
    }

    pub async fn get_session(&self, session_id: &str) -> Result<Option<Uuid>, CredentialError> {
        let key = format!("{}{}", SESSION_PREFIX, session_id);
        let value = match self.store.get(&key).await? {
            Some(value) => value,
            None => return Ok(None),
        };
        let user_id = Uuid::parse_str(&value)
            .map_err(|e| anyhow::anyhow!("Corrupt session entry {}: {}", session_id, e))?;
        Ok(Some(user_id))
    }

    pub async fn delete_session(&self, session_id: &str) -> Result<(), CredentialError> {
        let key = format!("{}{}", SESSION_PREFIX, session_id);
        self.store.delete(&key).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::store::MemoryStore;
    use std::time::Duration as StdDuration;

    fn service_with_store() -> (CredentialService, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (CredentialService::new(store.clone()), store)
    }

    #[test]
    fn otp_entry_check_ordering() {
        let t0 = Utc::now();
        let entry = OtpEntry::new("123456", 300, t0);

        // Valid within the window.
        assert!(entry.check("123456", t0 + Duration::seconds(100)).is_ok());

        // Expiry wins over mismatch.
        assert!(matches!(
            entry.check("000000", t0 + Duration::seconds(301)),
            Err(CredentialError::OtpExpired)
        ));

        // Mismatch inside the window.
        assert!(matches!(
            entry.check("000000", t0 + Duration::seconds(100)),
            Err(CredentialError::OtpMismatch)
        ));

        // A used entry is rejected even with the right code.
        let mut used = entry.clone();
        used.used = true;
        assert!(matches!(
            used.check("123456", t0 + Duration::seconds(150)),
            Err(CredentialError::OtpAlreadyUsed)
        ));
    }

    #[tokio::test]
    async fn otp_round_trip_is_single_use() {
        let (service, _store) = service_with_store();

        service.issue_otp("a@x.com", "123456", 300).await.unwrap();
        service.verify_otp("a@x.com", "123456").await.unwrap();

        // Second attempt with the correct code fails.
        assert!(matches!(
            service.verify_otp("a@x.com", "123456").await,
            Err(CredentialError::OtpAlreadyUsed)
        ));
    }

    #[tokio::test]
    async fn fresh_code_supersedes_outstanding_one() {
        let (service, _store) = service_with_store();

        service.issue_otp("a@x.com", "111111", 300).await.unwrap();
        service.issue_otp("a@x.com", "222222", 300).await.unwrap();

        assert!(matches!(
            service.verify_otp("a@x.com", "111111").await,
            Err(CredentialError::OtpMismatch)
        ));
        service.verify_otp("a@x.com", "222222").await.unwrap();
    }

    #[tokio::test]
    async fn unknown_email_is_not_found() {
        let (service, _store) = service_with_store();
        assert!(matches!(
            service.verify_otp("nobody@x.com", "123456").await,
            Err(CredentialError::OtpNotFound)
        ));
    }

    #[tokio::test]
    async fn mismatched_code_is_rejected() {
        let (service, _store) = service_with_store();
        service.issue_otp("a@x.com", "123456", 300).await.unwrap();
        assert!(matches!(
            service.verify_otp("a@x.com", "654321").await,
            Err(CredentialError::OtpMismatch)
        ));
        // A mismatch does not consume the code.
        service.verify_otp("a@x.com", "123456").await.unwrap();
    }

    #[tokio::test]
    async fn blacklist_round_trip() {
        let (service, store) = service_with_store();

        assert!(!service.is_token_blacklisted("tok").await.unwrap());
        service.blacklist_token("tok", 2).await.unwrap();
        assert!(service.is_token_blacklisted("tok").await.unwrap());

        // Re-blacklisting resets the TTL rather than erroring.
        store.advance(StdDuration::from_secs(1));
        service.blacklist_token("tok", 2).await.unwrap();
        store.advance(StdDuration::from_millis(1500));
        assert!(service.is_token_blacklisted("tok").await.unwrap());

        store.advance(StdDuration::from_secs(2));
        assert!(!service.is_token_blacklisted("tok").await.unwrap());
    }

    #[tokio::test]
    async fn rate_limit_counts_within_window() {
        let (service, store) = service_with_store();

        assert_eq!(service.increment_rate_limit("k", 60).await.unwrap(), 1);
        assert_eq!(service.increment_rate_limit("k", 60).await.unwrap(), 2);
        assert_eq!(service.increment_rate_limit("k", 60).await.unwrap(), 3);
        assert_eq!(service.increment_rate_limit("k", 60).await.unwrap(), 4);

        // A fresh window begins once the old one elapses.
        store.advance(StdDuration::from_secs(61));
        assert_eq!(service.increment_rate_limit("k", 60).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn session_lifecycle() {
        let (service, _store) = service_with_store();
        let user_id = Uuid::new_v4();

        service.create_session("sid", user_id, 60).await.unwrap();
        assert_eq!(service.get_session("sid").await.unwrap(), Some(user_id));

        service.delete_session("sid").await.unwrap();
        assert_eq!(service.get_session("sid").await.unwrap(), None);
    }
}
