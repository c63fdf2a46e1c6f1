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

//! Authenticated connection to a Databricks workspace.

use crate::auth::Credential;
use crate::client::WorkspaceGateway;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// A workspace gateway bound to one host and one credential.
///
/// Connections are only handed out by
/// [`ClientManager::ensure_ready`](crate::ClientManager::ensure_ready) and
/// are replaced, never updated, when the credential is refreshed. A caller
/// holding an older `Arc<GatewayConnection>` keeps using the old token until
/// it drops it.
#[derive(Debug)]
pub struct GatewayConnection {
    // Configuration
    host: String,
    warehouse_id: String,

    credential: Credential,

    // Remote calls (trait object for backend flexibility)
    gateway: Arc<dyn WorkspaceGateway>,
}

impl GatewayConnection {
    pub(crate) fn new(
        host: impl Into<String>,
        warehouse_id: impl Into<String>,
        credential: Credential,
        gateway: Arc<dyn WorkspaceGateway>,
    ) -> Self {
        Self {
            host: host.into(),
            warehouse_id: warehouse_id.into(),
            credential,
            gateway,
        }
    }

    /// Returns the Databricks host URL.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns the warehouse ID used for SQL statements.
    pub fn warehouse_id(&self) -> &str {
        &self.warehouse_id
    }

    pub fn gateway(&self) -> &dyn WorkspaceGateway {
        self.gateway.as_ref()
    }

    /// Expiry of the credential this connection was bound with.
    pub fn expiry(&self) -> DateTime<Utc> {
        self.credential.expiry()
    }

    pub fn is_expired(&self) -> bool {
        self.credential.is_expired()
    }
}
