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

//! Client implementations for communicating with a Databricks workspace.
//!
//! This module provides:
//! - `WorkspaceGateway` trait: abstract interface for the remote calls the
//!   tools need (SQL statements, Unity Catalog, Jobs)
//! - `GatewayFactory` trait: binds a gateway to a host and credential
//! - `DatabricksHttpClient`: low-level HTTP client with retry logic
//! - `RestGateway`: implementation over the workspace REST API

pub mod http;
#[cfg(test)]
pub(crate) mod mock;
pub mod rest;

use crate::auth::{BearerToken, Credential};
use crate::error::Result;
use crate::types::catalog::{SchemaInfo, TableInfo};
use crate::types::jobs::{Job, ListRunsResponse, Run, RunOutput};
use crate::types::sea::{ExecuteStatementRequest, ResultData, StatementExecutionResponse};
use async_trait::async_trait;
use std::sync::Arc;

pub use http::{DatabricksHttpClient, HttpClientConfig, RetryPolicy};
pub use rest::RestGateway;

/// Remote operations against one workspace with one credential.
///
/// Errors follow the crate convention: a missing remote object is
/// [`Error::NotFound`](crate::Error::NotFound), other remote or transport
/// failures are [`Error::Api`](crate::Error::Api).
#[async_trait]
pub trait WorkspaceGateway: Send + Sync + std::fmt::Debug {
    // --- Statement Execution ---

    /// Submit a SQL statement.
    async fn execute_statement(
        &self,
        request: &ExecuteStatementRequest,
    ) -> Result<StatementExecutionResponse>;

    /// Poll statement status (and inline result once finished).
    async fn get_statement(&self, statement_id: &str) -> Result<StatementExecutionResponse>;

    /// Fetch a follow-up result chunk of a finished statement.
    async fn get_statement_result_chunk(
        &self,
        statement_id: &str,
        chunk_index: i64,
    ) -> Result<ResultData>;

    /// Cancel a running statement.
    async fn cancel_statement(&self, statement_id: &str) -> Result<()>;

    // --- Unity Catalog ---

    async fn get_table(&self, full_name: &str) -> Result<TableInfo>;

    async fn get_schema(&self, full_name: &str) -> Result<SchemaInfo>;

    /// All schemas of a catalog, following pagination.
    async fn list_schemas(&self, catalog: &str) -> Result<Vec<SchemaInfo>>;

    /// All tables of a schema, following pagination.
    async fn list_tables(&self, catalog: &str, schema: &str) -> Result<Vec<TableInfo>>;

    // --- Jobs ---

    /// Jobs whose name matches `name`, in listing order.
    async fn list_jobs(&self, name: &str) -> Result<Vec<Job>>;

    /// One page of a job's completed runs, most recent first. `page_token`
    /// comes from the previous page.
    async fn list_runs(&self, job_id: i64, page_token: Option<&str>) -> Result<ListRunsResponse>;

    /// A run including its task runs.
    async fn get_run(&self, run_id: i64) -> Result<Run>;

    async fn get_run_output(&self, run_id: i64) -> Result<RunOutput>;
}

/// Builds a [`WorkspaceGateway`] bound to a host and credential.
#[async_trait]
pub trait GatewayFactory: Send + Sync + std::fmt::Debug {
    async fn connect(
        &self,
        host: &str,
        credential: &Credential,
    ) -> Result<Arc<dyn WorkspaceGateway>>;
}

/// [`GatewayFactory`] producing [`RestGateway`]s.
#[derive(Debug, Clone, Default)]
pub struct RestGatewayFactory {
    http_config: HttpClientConfig,
}

impl RestGatewayFactory {
    pub fn new(http_config: HttpClientConfig) -> Self {
        Self { http_config }
    }
}

#[async_trait]
impl GatewayFactory for RestGatewayFactory {
    async fn connect(
        &self,
        host: &str,
        credential: &Credential,
    ) -> Result<Arc<dyn WorkspaceGateway>> {
        let auth = Arc::new(BearerToken::from(credential));
        let http_client = Arc::new(DatabricksHttpClient::new(self.http_config.clone(), auth)?);
        Ok(Arc::new(RestGateway::new(http_client, host)))
    }
}
