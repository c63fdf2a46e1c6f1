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

//! SQL statement execution: submit, poll, classify, shape rows.

use crate::client::WorkspaceGateway;
use crate::config::WorkspaceConfig;
use crate::connection::GatewayConnection;
use crate::error::{Error, Result};
use crate::types::sea::{ExecuteStatementRequest, StatementExecutionResponse, StatementState};
use serde_json::{Map, Value};
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, error, info, warn};

/// One result row: column name to value, in result column order.
pub type Row = Map<String, Value>;

/// Interval between status polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// How the executor waits for a statement to finish.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Interval between status polls.
    pub interval: Duration,
    /// Overall ceiling on polling. `None` polls until the statement finishes.
    pub max_duration: Option<Duration>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            max_duration: None,
        }
    }
}

impl PollPolicy {
    pub fn from_config(config: &WorkspaceConfig) -> Self {
        Self {
            max_duration: config.max_poll_seconds.map(Duration::from_secs),
            ..Self::default()
        }
    }
}

/// Client-side view of a submitted statement.
///
/// The state only moves forward: `PENDING` → `RUNNING` → terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatementHandle {
    statement_id: String,
    state: StatementState,
}

impl StatementHandle {
    pub fn new(statement_id: impl Into<String>, state: StatementState) -> Self {
        Self {
            statement_id: statement_id.into(),
            state,
        }
    }

    pub fn statement_id(&self) -> &str {
        &self.statement_id
    }

    pub fn state(&self) -> StatementState {
        self.state
    }

    /// Records a newly observed state.
    pub fn advance(&mut self, next: StatementState) -> Result<()> {
        if next == self.state {
            return Ok(());
        }
        if self.state.is_terminal() {
            return Err(Error::query(format!(
                "statement {} changed from {} to {} after finishing",
                self.statement_id, self.state, next
            )));
        }
        if next.rank() < self.state.rank() {
            return Err(Error::query(format!(
                "statement {} moved backwards from {} to {}",
                self.statement_id, self.state, next
            )));
        }
        debug!("Statement {}: {} -> {}", self.statement_id, self.state, next);
        self.state = next;
        Ok(())
    }
}

/// Builds the sampling statement. Identifiers are used as given.
pub fn sample_query(catalog: &str, schema: &str, table: &str, limit: u32) -> String {
    format!(
        "SELECT * FROM {}.{}.{} LIMIT {}",
        catalog, schema, table, limit
    )
}

/// Runs SQL statements through a [`GatewayConnection`] and returns rows.
#[derive(Debug, Clone, Default)]
pub struct StatementExecutor {
    poll: PollPolicy,
}

impl StatementExecutor {
    pub fn new(poll: PollPolicy) -> Self {
        Self { poll }
    }

    pub fn poll_policy(&self) -> &PollPolicy {
        &self.poll
    }

    /// `SELECT * FROM catalog.schema.table LIMIT limit`.
    pub async fn run_sample_query(
        &self,
        connection: &GatewayConnection,
        catalog: &str,
        schema: &str,
        table: &str,
        limit: u32,
        wait_timeout: &str,
    ) -> Result<Vec<Row>> {
        let statement = sample_query(catalog, schema, table, limit);
        info!("Executing query: {}", statement);
        self.execute(connection, &statement, wait_timeout).await
    }

    /// Submits `statement` against the connection's warehouse and waits for
    /// its rows. Only a `SUCCEEDED` statement yields rows; there are no
    /// partial results.
    pub async fn execute(
        &self,
        connection: &GatewayConnection,
        statement: &str,
        wait_timeout: &str,
    ) -> Result<Vec<Row>> {
        let gateway = connection.gateway();
        let request =
            ExecuteStatementRequest::inline_json(connection.warehouse_id(), statement, wait_timeout);

        let response = gateway
            .execute_statement(&request)
            .await
            .map_err(transport_error)?;
        info!("Statement ID: {}", response.statement_id);

        let response = self.wait_for_completion(gateway, response).await?;
        collect_rows(gateway, response).await
    }

    /// Wait for statement to complete, polling status.
    async fn wait_for_completion(
        &self,
        gateway: &dyn WorkspaceGateway,
        response: StatementExecutionResponse,
    ) -> Result<StatementExecutionResponse> {
        let start = Instant::now();
        let mut handle = StatementHandle::new(&response.statement_id, response.status.state);
        let mut current_response = response;

        loop {
            match current_response.status.state {
                StatementState::Succeeded => return Ok(current_response),
                StatementState::Pending | StatementState::Running => {
                    if let Some(limit) = self.poll.max_duration {
                        if start.elapsed() >= limit {
                            return Err(self.give_up(gateway, &handle, limit).await);
                        }
                    }

                    debug!(
                        "Statement {} state: {}",
                        handle.statement_id(),
                        handle.state()
                    );
                    sleep(self.poll.interval).await;

                    current_response = gateway
                        .get_statement(handle.statement_id())
                        .await
                        .map_err(transport_error)?;
                    handle.advance(current_response.status.state)?;
                }
                state => {
                    let mut message = format!("Statement execution failed with state: {}", state);
                    if let Some(remote) = current_response
                        .status
                        .error
                        .as_ref()
                        .and_then(|e| e.message.as_deref())
                    {
                        message.push_str(", Error: ");
                        message.push_str(remote);
                    }
                    error!("Failed to execute query: {}", message);
                    return Err(Error::query(message));
                }
            }
        }
    }

    /// Ends polling at the ceiling with a best-effort remote cancel.
    async fn give_up(
        &self,
        gateway: &dyn WorkspaceGateway,
        handle: &StatementHandle,
        limit: Duration,
    ) -> Error {
        warn!(
            "Statement {} still {} after {}s, canceling",
            handle.statement_id(),
            handle.state(),
            limit.as_secs()
        );
        if let Err(e) = gateway.cancel_statement(handle.statement_id()).await {
            warn!("Failed to cancel statement {}: {}", handle.statement_id(), e);
        }
        Error::query(format!(
            "statement {} did not finish within {}s (last state: {})",
            handle.statement_id(),
            limit.as_secs(),
            handle.state()
        ))
    }
}

fn transport_error(e: Error) -> Error {
    error!("Failed to execute query: {}", e);
    Error::query(e.to_string())
}

/// Zips the manifest column names with every row, following result chunks.
async fn collect_rows(
    gateway: &dyn WorkspaceGateway,
    response: StatementExecutionResponse,
) -> Result<Vec<Row>> {
    let columns: Vec<String> = response
        .manifest
        .as_ref()
        .map(|m| m.column_names().into_iter().map(String::from).collect())
        .unwrap_or_default();

    let mut rows = Vec::new();
    let mut next = response.result;
    while let Some(data) = next {
        if let Some(data_array) = data.data_array {
            if columns.is_empty() && !data_array.is_empty() {
                return Err(Error::query(format!(
                    "statement {} returned rows without a result schema",
                    response.statement_id
                )));
            }
            rows.extend(data_array.into_iter().map(|values| {
                columns
                    .iter()
                    .cloned()
                    .zip(values)
                    .collect::<Row>()
            }));
        }

        next = match data.next_chunk_index {
            Some(index) => {
                debug!(
                    "Fetching result chunk {} of statement {}",
                    index, response.statement_id
                );
                Some(
                    gateway
                        .get_statement_result_chunk(&response.statement_id, index)
                        .await
                        .map_err(transport_error)?,
                )
            }
            None => None,
        };
    }

    debug!(
        "Statement {} returned {} rows",
        response.statement_id,
        rows.len()
    );
    Ok(rows)
}
