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

//! In-memory gateway used by the unit tests.

use crate::auth::Credential;
use crate::client::{GatewayFactory, WorkspaceGateway};
use crate::connection::GatewayConnection;
use crate::error::{Error, Result};
use crate::types::catalog::{SchemaInfo, TableInfo};
use crate::types::jobs::{Job, ListRunsResponse, Run, RunOutput};
use crate::types::sea::{
    ColumnInfo, ExecuteStatementRequest, ResultData, ResultManifest, ResultSchema, ServiceError,
    StatementExecutionResponse, StatementState, StatementStatus,
};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Scripted [`WorkspaceGateway`].
///
/// Statement responses are consumed in order: the first answers
/// `execute_statement`, the rest answer successive `get_statement` polls.
#[derive(Debug, Default)]
pub(crate) struct MockGateway {
    statements: Mutex<Vec<Result<StatementExecutionResponse>>>,
    chunks: Mutex<HashMap<i64, ResultData>>,
    tables: HashMap<String, TableInfo>,
    schemas: HashMap<String, SchemaInfo>,
    schema_list: Vec<SchemaInfo>,
    table_list: Vec<TableInfo>,
    jobs: Vec<Job>,
    runs: Vec<Run>,
    run_page_size: Option<usize>,
    run_details: HashMap<i64, Run>,
    outputs: HashMap<i64, RunOutput>,
    pub(crate) submitted: Mutex<Vec<ExecuteStatementRequest>>,
    pub(crate) calls: Mutex<Vec<String>>,
}

impl MockGateway {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_statements(self, responses: Vec<Result<StatementExecutionResponse>>) -> Self {
        *self.statements.lock().unwrap() = responses;
        self
    }

    pub(crate) fn with_chunk(self, index: i64, data: ResultData) -> Self {
        self.chunks.lock().unwrap().insert(index, data);
        self
    }

    pub(crate) fn with_table(mut self, table: TableInfo) -> Self {
        let full_name = format!(
            "{}.{}.{}",
            table.catalog_name.as_deref().unwrap_or_default(),
            table.schema_name.as_deref().unwrap_or_default(),
            table.name
        );
        self.tables.insert(full_name, table.clone());
        self.table_list.push(table);
        self
    }

    pub(crate) fn with_schema(mut self, schema: SchemaInfo) -> Self {
        let full_name = schema
            .full_name
            .clone()
            .unwrap_or_else(|| schema.name.clone());
        self.schemas.insert(full_name, schema.clone());
        self.schema_list.push(schema);
        self
    }

    pub(crate) fn with_job(mut self, job: Job) -> Self {
        self.jobs.push(job);
        self
    }

    /// Adds a completed run to the listing and its details to `runs/get`.
    pub(crate) fn with_run(mut self, run: Run) -> Self {
        self.run_details.insert(run.run_id, run.clone());
        self.runs.push(run);
        self
    }

    /// Splits the run listing into pages of `size`.
    pub(crate) fn with_run_page_size(mut self, size: usize) -> Self {
        self.run_page_size = Some(size);
        self
    }

    pub(crate) fn with_output(mut self, run_id: i64, output: RunOutput) -> Self {
        self.outputs.insert(run_id, output);
        self
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn count(&self, name: &str) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.split(' ').next() == Some(name))
            .count()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn next_statement(&self) -> Result<StatementExecutionResponse> {
        let mut statements = self.statements.lock().unwrap();
        if statements.is_empty() {
            Err(Error::api(None, "no scripted statement response"))
        } else {
            statements.remove(0)
        }
    }
}

#[async_trait]
impl WorkspaceGateway for MockGateway {
    async fn execute_statement(
        &self,
        request: &ExecuteStatementRequest,
    ) -> Result<StatementExecutionResponse> {
        self.record(format!("execute_statement {}", request.statement));
        self.submitted.lock().unwrap().push(request.clone());
        self.next_statement()
    }

    async fn get_statement(&self, statement_id: &str) -> Result<StatementExecutionResponse> {
        self.record(format!("get_statement {}", statement_id));
        self.next_statement()
    }

    async fn get_statement_result_chunk(
        &self,
        statement_id: &str,
        chunk_index: i64,
    ) -> Result<ResultData> {
        self.record(format!("get_statement_result_chunk {} {}", statement_id, chunk_index));
        self.chunks
            .lock()
            .unwrap()
            .remove(&chunk_index)
            .ok_or_else(|| Error::not_found(format!("chunk {}", chunk_index)))
    }

    async fn cancel_statement(&self, statement_id: &str) -> Result<()> {
        self.record(format!("cancel_statement {}", statement_id));
        Ok(())
    }

    async fn get_table(&self, full_name: &str) -> Result<TableInfo> {
        self.record(format!("get_table {}", full_name));
        self.tables.get(full_name).cloned().ok_or_else(|| {
            Error::not_found(format!("TABLE_DOES_NOT_EXIST: Table '{}' does not exist.", full_name))
        })
    }

    async fn get_schema(&self, full_name: &str) -> Result<SchemaInfo> {
        self.record(format!("get_schema {}", full_name));
        self.schemas.get(full_name).cloned().ok_or_else(|| {
            Error::not_found(format!("SCHEMA_DOES_NOT_EXIST: Schema '{}' does not exist.", full_name))
        })
    }

    async fn list_schemas(&self, catalog: &str) -> Result<Vec<SchemaInfo>> {
        self.record(format!("list_schemas {}", catalog));
        Ok(self
            .schema_list
            .iter()
            .filter(|s| s.catalog_name.as_deref() == Some(catalog))
            .cloned()
            .collect())
    }

    async fn list_tables(&self, catalog: &str, schema: &str) -> Result<Vec<TableInfo>> {
        self.record(format!("list_tables {}.{}", catalog, schema));
        Ok(self
            .table_list
            .iter()
            .filter(|t| {
                t.catalog_name.as_deref() == Some(catalog) && t.schema_name.as_deref() == Some(schema)
            })
            .cloned()
            .collect())
    }

    async fn list_jobs(&self, name: &str) -> Result<Vec<Job>> {
        self.record(format!("list_jobs {}", name));
        // The service filters case-insensitively.
        Ok(self
            .jobs
            .iter()
            .filter(|j| j.name().is_some_and(|n| n.eq_ignore_ascii_case(name)))
            .cloned()
            .collect())
    }

    async fn list_runs(&self, job_id: i64, page_token: Option<&str>) -> Result<ListRunsResponse> {
        self.record(format!("list_runs {}", job_id));
        let runs: Vec<Run> = self
            .runs
            .iter()
            .filter(|r| r.job_id == Some(job_id))
            .cloned()
            .collect();

        // Page tokens are offsets into the filtered listing.
        let start = page_token.map_or(0, |t| t.parse().unwrap());
        let end = self
            .run_page_size
            .map_or(runs.len(), |size| (start + size).min(runs.len()));
        let has_more = end < runs.len();
        Ok(ListRunsResponse {
            runs: runs[start..end].to_vec(),
            has_more,
            next_page_token: has_more.then(|| end.to_string()),
        })
    }

    async fn get_run(&self, run_id: i64) -> Result<Run> {
        self.record(format!("get_run {}", run_id));
        self.run_details
            .get(&run_id)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("run {}", run_id)))
    }

    async fn get_run_output(&self, run_id: i64) -> Result<RunOutput> {
        self.record(format!("get_run_output {}", run_id));
        self.outputs
            .get(&run_id)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("run output {}", run_id)))
    }
}

/// Status-only response (no manifest, no rows).
pub(crate) fn status(id: &str, state: StatementState) -> StatementExecutionResponse {
    StatementExecutionResponse {
        statement_id: id.to_string(),
        status: StatementStatus { state, error: None },
        manifest: None,
        result: None,
    }
}

/// Terminal failure carrying a service error message.
pub(crate) fn failed(id: &str, state: StatementState, message: &str) -> StatementExecutionResponse {
    StatementExecutionResponse {
        statement_id: id.to_string(),
        status: StatementStatus {
            state,
            error: Some(ServiceError {
                error_code: Some("BAD_REQUEST".to_string()),
                message: Some(message.to_string()),
            }),
        },
        manifest: None,
        result: None,
    }
}

/// `SUCCEEDED` response with an inline result.
pub(crate) fn succeeded(id: &str, columns: &[&str], rows: Vec<Vec<Value>>) -> StatementExecutionResponse {
    StatementExecutionResponse {
        statement_id: id.to_string(),
        status: StatementStatus {
            state: StatementState::Succeeded,
            error: None,
        },
        manifest: Some(ResultManifest {
            format: Some("JSON_ARRAY".to_string()),
            schema: Some(ResultSchema {
                column_count: Some(columns.len() as i32),
                columns: columns
                    .iter()
                    .enumerate()
                    .map(|(i, name)| ColumnInfo {
                        name: name.to_string(),
                        type_name: Some("STRING".to_string()),
                        type_text: Some("STRING".to_string()),
                        position: Some(i as i32),
                    })
                    .collect(),
            }),
            total_chunk_count: Some(1),
            total_row_count: Some(rows.len() as i64),
            truncated: false,
        }),
        result: Some(ResultData {
            chunk_index: Some(0),
            row_offset: Some(0),
            row_count: Some(rows.len() as i64),
            next_chunk_index: None,
            data_array: Some(rows),
        }),
    }
}

pub(crate) fn credential_valid_for(lifetime: Duration) -> Credential {
    Credential::new("mock-token", Utc::now() + lifetime)
}

/// Connection around a mock gateway with an hour-long credential.
pub(crate) fn connection(gateway: Arc<MockGateway>) -> GatewayConnection {
    GatewayConnection::new(
        "https://example.cloud.databricks.com",
        "wh-123",
        credential_valid_for(Duration::hours(1)),
        gateway,
    )
}

/// [`GatewayFactory`] handing out the same mock gateway and counting binds.
#[derive(Debug, Default)]
pub(crate) struct MockFactory {
    pub(crate) gateway: Arc<MockGateway>,
    pub(crate) connects: AtomicUsize,
    pub(crate) fail: bool,
}

impl MockFactory {
    pub(crate) fn new(gateway: Arc<MockGateway>) -> Self {
        Self {
            gateway,
            ..Default::default()
        }
    }

    pub(crate) fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GatewayFactory for MockFactory {
    async fn connect(
        &self,
        _host: &str,
        _credential: &Credential,
    ) -> Result<Arc<dyn WorkspaceGateway>> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(Error::api(None, "Failed to create HTTP client"));
        }
        let gateway: Arc<dyn WorkspaceGateway> = self.gateway.clone();
        Ok(gateway)
    }
}
