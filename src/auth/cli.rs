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

//! Credential store backed by the `databricks` CLI.
//!
//! The CLI owns the OAuth flow and its token cache. This module only runs
//!
//! ```text
//! databricks auth token --host <url> --profile <name>
//! databricks auth login --host <url> --profile <name>
//! ```
//!
//! and turns the JSON printed by `auth token` into a [`Credential`].

use crate::auth::Credential;
use crate::config::DEFAULT_PROFILE;
use crate::error::{Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;
use std::path::PathBuf;
use std::process::{Output, Stdio};
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, error, info, warn};

/// Timeout for the "already authenticated?" check.
pub const STATUS_CHECK_TIMEOUT: Duration = Duration::from_secs(15);
/// Timeout for the interactive `auth login` flow.
pub const LOGIN_TIMEOUT: Duration = Duration::from_secs(30);
/// Timeout for fetching the token itself.
pub const TOKEN_TIMEOUT: Duration = Duration::from_secs(30);

/// Obtains credentials for a workspace host.
#[async_trait]
pub trait CredentialStore: Send + Sync + std::fmt::Debug {
    /// Ensures an authenticated session exists for `host`.
    ///
    /// Must be idempotent: calling it while already authenticated returns
    /// quickly without starting a new login.
    async fn login(&self, host: &str) -> Result<()>;

    /// Returns the current access token and its expiry.
    async fn fetch_token(&self, host: &str) -> Result<Credential>;
}

/// [`CredentialStore`] that shells out to the `databricks` CLI.
#[derive(Debug, Clone)]
pub struct CliCredentialStore {
    program: PathBuf,
    profile: String,
    status_timeout: Duration,
    login_timeout: Duration,
    token_timeout: Duration,
}

impl Default for CliCredentialStore {
    fn default() -> Self {
        Self::new(DEFAULT_PROFILE)
    }
}

impl CliCredentialStore {
    pub fn new(profile: impl Into<String>) -> Self {
        Self {
            program: PathBuf::from("databricks"),
            profile: profile.into(),
            status_timeout: STATUS_CHECK_TIMEOUT,
            login_timeout: LOGIN_TIMEOUT,
            token_timeout: TOKEN_TIMEOUT,
        }
    }

    /// Uses a different CLI executable (e.g. an absolute path).
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    pub fn with_timeouts(mut self, status: Duration, login: Duration, token: Duration) -> Self {
        self.status_timeout = status;
        self.login_timeout = login;
        self.token_timeout = token;
        self
    }

    pub fn profile(&self) -> &str {
        &self.profile
    }

    /// Runs `databricks auth <subcommand> --host <host> --profile <profile>`.
    async fn run_auth(&self, subcommand: &str, host: &str, limit: Duration) -> Result<Output> {
        debug!(
            "Running {} auth {} --host {} --profile {}",
            self.program.display(),
            subcommand,
            host,
            self.profile
        );

        let child = Command::new(&self.program)
            .args(["auth", subcommand, "--host", host, "--profile", self.profile.as_str()])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        match tokio::time::timeout(limit, child).await {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(e)) => Err(Error::authentication_with_source(
                format!(
                    "failed to run '{} auth {}'",
                    self.program.display(),
                    subcommand
                ),
                e,
            )),
            Err(_) => Err(Error::authentication(format!(
                "'{} auth {}' timed out after {}s",
                self.program.display(),
                subcommand,
                limit.as_secs()
            ))),
        }
    }
}

#[async_trait]
impl CredentialStore for CliCredentialStore {
    async fn login(&self, host: &str) -> Result<()> {
        info!(
            "Checking Databricks authentication status for {} (profile {})",
            host, self.profile
        );

        match self.run_auth("token", host, self.status_timeout).await {
            Ok(output) if output.status.success() => {
                info!("Already authenticated with profile {}", self.profile);
                return Ok(());
            }
            Ok(output) => debug!(
                "Auth status check exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ),
            Err(e) => warn!("Auth status check failed: {}", e),
        }

        info!("Starting Databricks login flow with profile {}", self.profile);
        let output = self.run_auth("login", host, self.login_timeout).await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            error!("Databricks login exited with {}: {}", output.status, stderr.trim());
            return Err(Error::authentication(format!(
                "databricks auth login exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        info!("Logged in to Databricks with profile {}", self.profile);
        Ok(())
    }

    async fn fetch_token(&self, host: &str) -> Result<Credential> {
        let output = self.run_auth("token", host, self.token_timeout).await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::authentication(format!(
                "databricks auth token exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let credential = parse_token_output(&stdout)?;
        info!(
            "Retrieved access token for profile {} (expires {})",
            self.profile,
            credential.expiry()
        );
        Ok(credential)
    }
}

#[derive(Debug, Deserialize)]
struct TokenOutput {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    expiry: Option<String>,
}

/// Parses the JSON printed by `databricks auth token`.
///
/// The expiry must carry a UTC offset; timestamps without one are rejected
/// rather than guessed.
pub fn parse_token_output(raw: &str) -> Result<Credential> {
    let output: TokenOutput = serde_json::from_str(raw.trim()).map_err(|e| {
        Error::authentication_with_source("invalid JSON from databricks auth token", e)
    })?;

    let access_token = output
        .access_token
        .filter(|t| !t.is_empty())
        .ok_or_else(|| Error::authentication("token response has no access_token"))?;
    let expiry = output
        .expiry
        .ok_or_else(|| Error::authentication("token response has no expiry"))?;

    Ok(Credential::new(access_token, parse_expiry(&expiry)?))
}

fn parse_expiry(value: &str) -> Result<DateTime<Utc>> {
    match DateTime::parse_from_rfc3339(value) {
        Ok(parsed) => Ok(parsed.with_timezone(&Utc)),
        Err(e) => {
            if NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f").is_ok() {
                Err(Error::authentication(format!(
                    "token expiry '{}' has no UTC offset",
                    value
                )))
            } else {
                Err(Error::authentication_with_source(
                    format!("invalid token expiry '{}'", value),
                    e,
                ))
            }
        }
    }
}
