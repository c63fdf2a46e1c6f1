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

//! Lifecycle of the authenticated workspace connection.
//!
//! ```text
//!                 ensure_ready() ok
//!  Uninitialized ───────────────────▶ Ready
//!       ▲  │ failure                  │  ▲
//!       └──┘                  expired │  │ rebind ok
//!                                     ▼  │
//!                                     Stale ──┐ rebind failure
//!                                       ▲─────┘
//! ```
//!
//! The full path validates configuration, logs in and binds a gateway. The
//! partial path (from `Stale`) only refreshes the token and rebinds.

use crate::auth::{CliCredentialStore, Credential, CredentialStore, TokenManager};
use crate::client::{GatewayFactory, RestGatewayFactory};
use crate::config::WorkspaceConfig;
use crate::connection::GatewayConnection;
use crate::error::Result;
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info};

/// Observable state of a [`ClientManager`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientStatus {
    /// No connection has been bound yet, or the last full initialization failed.
    Uninitialized,
    /// A connection with a non-expired credential is available.
    Ready,
    /// The token expired; the next `ensure_ready` refreshes and rebinds.
    Stale,
}

impl fmt::Display for ClientStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Uninitialized => "uninitialized",
            Self::Ready => "ready",
            Self::Stale => "stale",
        };
        f.write_str(name)
    }
}

#[derive(Debug)]
enum ClientState {
    Uninitialized,
    Ready(Arc<GatewayConnection>),
    Stale,
}

#[derive(Debug)]
struct ManagerState {
    state: ClientState,
    tokens: TokenManager,
}

/// Hands out authenticated [`GatewayConnection`]s.
///
/// One instance is shared (via `Arc`) by every tool invocation. All state
/// sits behind one async mutex, so concurrent callers serialize on the
/// initialization and refresh paths and at most one login runs at a time.
pub struct ClientManager {
    config: WorkspaceConfig,
    factory: Arc<dyn GatewayFactory>,
    inner: Mutex<ManagerState>,
}

impl fmt::Debug for ClientManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientManager")
            .field("host", &self.config.host())
            .field("warehouse_id", &self.config.warehouse_id)
            .field("factory", &self.factory)
            .finish()
    }
}

impl ClientManager {
    pub fn new(
        config: WorkspaceConfig,
        store: Arc<dyn CredentialStore>,
        factory: Arc<dyn GatewayFactory>,
    ) -> Self {
        Self {
            config,
            factory,
            inner: Mutex::new(ManagerState {
                state: ClientState::Uninitialized,
                tokens: TokenManager::new(store),
            }),
        }
    }

    /// Production wiring: the `databricks` CLI for credentials and the REST
    /// gateway for remote calls.
    pub fn from_config(config: WorkspaceConfig) -> Self {
        let store = Arc::new(CliCredentialStore::new(config.profile.clone()));
        let factory = Arc::new(RestGatewayFactory::default());
        Self::new(config, store, factory)
    }

    pub fn config(&self) -> &WorkspaceConfig {
        &self.config
    }

    pub async fn status(&self) -> ClientStatus {
        match self.inner.lock().await.state {
            ClientState::Uninitialized => ClientStatus::Uninitialized,
            ClientState::Ready(_) => ClientStatus::Ready,
            ClientState::Stale => ClientStatus::Stale,
        }
    }

    /// Returns a connection bound to a non-expired credential, initializing
    /// or refreshing first as needed.
    ///
    /// Idempotent: while `Ready` with a valid token this performs no remote
    /// or CLI calls.
    pub async fn ensure_ready(&self) -> Result<Arc<GatewayConnection>> {
        let mut guard = self.inner.lock().await;
        let inner = &mut *guard;

        match inner.state {
            ClientState::Ready(ref connection) if !inner.tokens.is_expired() => {
                Ok(connection.clone())
            }
            ClientState::Ready(_) => {
                info!("Access token expired, refreshing authentication");
                inner.state = ClientState::Stale;
                self.rebind(inner).await
            }
            ClientState::Stale => self.rebind(inner).await,
            ClientState::Uninitialized => self.initialize(inner).await,
        }
    }

    /// Full path: validate, authenticate, bind. Leaves `Uninitialized` on failure.
    async fn initialize(&self, inner: &mut ManagerState) -> Result<Arc<GatewayConnection>> {
        info!("Initializing Databricks client for {}", self.config.host());

        let result = match self.config.validate() {
            Ok(()) => self.authenticate(&mut inner.tokens).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(connection) => {
                info!("Databricks client initialized");
                inner.state = ClientState::Ready(connection.clone());
                Ok(connection)
            }
            Err(e) => {
                error!("Failed to initialize Databricks client: {}", e);
                inner.tokens.clear();
                inner.state = ClientState::Uninitialized;
                Err(e)
            }
        }
    }

    /// Partial path: refresh the token and rebind. Stays `Stale` on failure.
    async fn rebind(&self, inner: &mut ManagerState) -> Result<Arc<GatewayConnection>> {
        let result = self.authenticate(&mut inner.tokens).await;

        match result {
            Ok(connection) => {
                info!("Rebound Databricks client with refreshed token");
                inner.state = ClientState::Ready(connection.clone());
                Ok(connection)
            }
            Err(e) => {
                error!("Failed to refresh Databricks client: {}", e);
                inner.state = ClientState::Stale;
                Err(e)
            }
        }
    }

    async fn authenticate(&self, tokens: &mut TokenManager) -> Result<Arc<GatewayConnection>> {
        let credential = tokens.valid_credential(self.config.host()).await?;
        self.bind(credential).await
    }

    async fn bind(&self, credential: Credential) -> Result<Arc<GatewayConnection>> {
        let host = self.config.host();
        let gateway = self.factory.connect(host, &credential).await?;
        debug!("Bound gateway for {} (token expires {})", host, credential.expiry());
        Ok(Arc::new(GatewayConnection::new(
            host,
            self.config.warehouse_id.clone(),
            credential,
            gateway,
        )))
    }
}
