// Copyright (c) 2025 ADBC Drivers Contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Access token caching and lazy refresh.

use crate::auth::{Credential, CredentialStore};
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Owns the current [`Credential`] and refreshes it through a
/// [`CredentialStore`] when it is missing or expired.
///
/// Refresh only happens on a caller path (`get_valid_token`/`refresh`);
/// there is no background renewal. The manager does not retry: one login
/// attempt and one token fetch per refresh.
#[derive(Debug)]
pub struct TokenManager {
    store: Arc<dyn CredentialStore>,
    credential: Option<Credential>,
}

impl TokenManager {
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self {
            store,
            credential: None,
        }
    }

    pub fn credential(&self) -> Option<&Credential> {
        self.credential.as_ref()
    }

    /// Replaces the cached credential.
    pub fn set_credential(&mut self, credential: Credential) {
        self.credential = Some(credential);
    }

    /// Forgets the cached credential.
    pub fn clear(&mut self) {
        self.credential = None;
    }

    /// True if no credential has been obtained yet, or `now > expiry`.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.credential
            .as_ref()
            .map_or(true, |credential| credential.is_expired_at(now))
    }

    /// Returns a non-expired access token, refreshing first if needed.
    pub async fn get_valid_token(&mut self, host: &str) -> Result<String> {
        Ok(self.valid_credential(host).await?.access_token().to_string())
    }

    /// Like [`get_valid_token`](Self::get_valid_token), returning the whole credential.
    pub async fn valid_credential(&mut self, host: &str) -> Result<Credential> {
        match self.credential {
            Some(ref credential) if !self.is_expired() => Ok(credential.clone()),
            _ => self.refresh_credential(host).await,
        }
    }

    /// Logs in (idempotently) and fetches a fresh token.
    pub async fn refresh(&mut self, host: &str) -> Result<String> {
        Ok(self
            .refresh_credential(host)
            .await?
            .access_token()
            .to_string())
    }

    async fn refresh_credential(&mut self, host: &str) -> Result<Credential> {
        info!("Refreshing Databricks authentication token");

        let fetched = match self.store.login(host).await {
            Ok(()) => self.store.fetch_token(host).await,
            Err(e) => Err(e),
        };

        // The cached credential is only replaced once both steps succeed.
        let credential = fetched.map_err(|e| {
            error!("Failed to refresh token: {}", e);
            normalize(e)
        })?;

        if credential.is_expired() {
            warn!(
                "Credential helper returned a token that expired at {}",
                credential.expiry()
            );
            return Err(Error::authentication(format!(
                "credential helper returned an expired token (expiry {})",
                credential.expiry()
            )));
        }

        self.credential = Some(credential.clone());
        info!("Token refreshed, expires at {}", credential.expiry());
        Ok(credential)
    }
}

fn normalize(e: Error) -> Error {
    match e {
        Error::Authentication { .. } => e,
        other => Error::authentication_with_source("token refresh failed", other),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Duration;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Credential store that hands out scripted credentials and counts calls.
    #[derive(Debug, Default)]
    pub(crate) struct MockCredentialStore {
        pub(crate) logins: AtomicUsize,
        pub(crate) fetches: AtomicUsize,
        pub(crate) fail_login: bool,
        tokens: Mutex<Vec<Result<Credential>>>,
    }

    impl MockCredentialStore {
        pub(crate) fn with_tokens(tokens: Vec<Result<Credential>>) -> Self {
            Self {
                tokens: Mutex::new(tokens),
                ..Default::default()
            }
        }

        pub(crate) fn valid_for(lifetime: Duration) -> Self {
            Self::with_tokens(vec![Ok(Credential::new("token-1", Utc::now() + lifetime))])
        }

        pub(crate) fn calls(&self) -> (usize, usize) {
            (
                self.logins.load(Ordering::SeqCst),
                self.fetches.load(Ordering::SeqCst),
            )
        }
    }

    #[async_trait]
    impl CredentialStore for MockCredentialStore {
        async fn login(&self, _host: &str) -> Result<()> {
            self.logins.fetch_add(1, Ordering::SeqCst);
            if self.fail_login {
                Err(Error::authentication("login exited with status 1"))
            } else {
                Ok(())
            }
        }

        async fn fetch_token(&self, _host: &str) -> Result<Credential> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            let mut tokens = self.tokens.lock().unwrap();
            if tokens.is_empty() {
                Err(Error::api(None, "no more mock tokens"))
            } else {
                tokens.remove(0)
            }
        }
    }

    const HOST: &str = "https://example.cloud.databricks.com";

    #[test]
    fn test_expired_without_credential() {
        let manager = TokenManager::new(Arc::new(MockCredentialStore::default()));
        assert!(manager.is_expired());
        assert!(manager.credential().is_none());
    }

    #[tokio::test]
    async fn test_expiry_window() {
        let mut manager = TokenManager::new(Arc::new(MockCredentialStore::default()));
        manager.set_credential(Credential::new("t", Utc::now() + Duration::seconds(1)));
        assert!(!manager.is_expired());

        tokio::time::sleep(std::time::Duration::from_millis(1100)).await;
        assert!(manager.is_expired());
    }

    #[tokio::test]
    async fn test_get_valid_token_refreshes_once() {
        let store = Arc::new(MockCredentialStore::valid_for(Duration::hours(1)));
        let mut manager = TokenManager::new(store.clone());

        assert_eq!(manager.get_valid_token(HOST).await.unwrap(), "token-1");
        assert_eq!(manager.get_valid_token(HOST).await.unwrap(), "token-1");
        assert_eq!(store.calls(), (1, 1));
    }

    #[tokio::test]
    async fn test_expired_credential_is_replaced() {
        let store = Arc::new(MockCredentialStore::with_tokens(vec![Ok(Credential::new(
            "fresh",
            Utc::now() + Duration::hours(1),
        ))]));
        let mut manager = TokenManager::new(store.clone());
        manager.set_credential(Credential::new("stale", Utc::now() - Duration::seconds(5)));

        assert_eq!(manager.get_valid_token(HOST).await.unwrap(), "fresh");
        assert_eq!(manager.credential().unwrap().access_token(), "fresh");
        assert_eq!(store.calls(), (1, 1));
    }

    #[tokio::test]
    async fn test_failed_fetch_keeps_previous_credential() {
        let store = Arc::new(MockCredentialStore::with_tokens(vec![Err(Error::api(
            None,
            "connection reset",
        ))]));
        let mut manager = TokenManager::new(store.clone());
        let previous = Credential::new("old", Utc::now() - Duration::seconds(5));
        manager.set_credential(previous.clone());

        let err = manager.refresh(HOST).await.unwrap_err();
        assert!(matches!(err, Error::Authentication { .. }));
        assert_eq!(manager.credential(), Some(&previous));
        assert_eq!(store.calls(), (1, 1));
    }

    #[tokio::test]
    async fn test_expired_fetch_is_rejected() {
        let store = Arc::new(MockCredentialStore::with_tokens(vec![Ok(Credential::new(
            "already-expired",
            Utc::now() - Duration::seconds(1),
        ))]));
        let mut manager = TokenManager::new(store.clone());
        let previous = Credential::new("old", Utc::now() - Duration::seconds(5));
        manager.set_credential(previous.clone());

        let err = manager.get_valid_token(HOST).await.unwrap_err();
        assert!(matches!(err, Error::Authentication { .. }));
        assert!(err.to_string().contains("expired token"));
        assert_eq!(manager.credential(), Some(&previous));
        assert_eq!(store.calls(), (1, 1));
    }

    #[tokio::test]
    async fn test_failed_login_skips_fetch() {
        let store = Arc::new(MockCredentialStore {
            fail_login: true,
            ..Default::default()
        });
        let mut manager = TokenManager::new(store.clone());

        let err = manager.get_valid_token(HOST).await.unwrap_err();
        assert!(err.to_string().contains("login exited"));
        assert!(manager.credential().is_none());
        assert_eq!(store.calls(), (1, 0));
    }
}
