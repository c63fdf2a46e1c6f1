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

//! Authentication for the Databricks workspace.
//!
//! - [`CredentialStore`]: obtains credentials (the CLI-backed
//!   [`CliCredentialStore`] in production)
//! - [`TokenManager`]: caches the current [`Credential`] and refreshes it lazily
//! - [`AuthProvider`]: produces the `Authorization` header for HTTP requests

pub mod cli;
pub mod token;

use crate::error::Result;
use chrono::{DateTime, Utc};

pub use cli::{parse_token_output, CliCredentialStore, CredentialStore};
pub use token::TokenManager;

/// An OAuth access token and the instant it stops being valid.
///
/// Credentials are replaced wholesale on refresh, never mutated.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    access_token: String,
    expiry: DateTime<Utc>,
}

impl Credential {
    pub fn new(access_token: impl Into<String>, expiry: DateTime<Utc>) -> Self {
        Self {
            access_token: access_token.into(),
            expiry,
        }
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    pub fn expiry(&self) -> DateTime<Utc> {
        self.expiry
    }

    /// A credential is expired strictly after its expiry instant.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expiry
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &"<redacted>")
            .field("expiry", &self.expiry)
            .finish()
    }
}

/// Source of the `Authorization` header for workspace requests.
pub trait AuthProvider: Send + Sync + std::fmt::Debug {
    fn get_auth_header(&self) -> Result<String>;
}

/// Bearer authentication with a fixed access token.
///
/// The HTTP client is rebuilt whenever the token changes, so this provider
/// never refreshes on its own.
pub struct BearerToken {
    token: String,
}

impl BearerToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

impl From<&Credential> for BearerToken {
    fn from(credential: &Credential) -> Self {
        Self::new(credential.access_token())
    }
}

impl std::fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BearerToken")
            .field("token", &"<redacted>")
            .finish()
    }
}

impl AuthProvider for BearerToken {
    fn get_auth_header(&self) -> Result<String> {
        Ok(format!("Bearer {}", self.token))
    }
}
