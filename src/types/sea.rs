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

//! SEA (Statement Execution API) request/response types.
//!
//! These types map directly to the JSON structures used by the Databricks
//! SQL Statement Execution API. Only the `INLINE` + `JSON_ARRAY` shape is
//! modelled: rows arrive as arrays of JSON values inside the response.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Response from statement execution or status polling.
#[derive(Debug, Clone, Deserialize)]
pub struct StatementExecutionResponse {
    pub statement_id: String,
    pub status: StatementStatus,
    #[serde(default)]
    pub manifest: Option<ResultManifest>,
    #[serde(default)]
    pub result: Option<ResultData>,
}

/// Status of a statement execution.
#[derive(Debug, Clone, Deserialize)]
pub struct StatementStatus {
    pub state: StatementState,
    #[serde(default)]
    pub error: Option<ServiceError>,
}

/// Possible states of a statement during execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatementState {
    Pending,
    Running,
    Succeeded,
    Failed,
    Canceled,
    Closed,
}

impl StatementState {
    /// True once the server will no longer change the state.
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending | Self::Running)
    }

    /// Position in the forward-only lifecycle. All terminal states share
    /// the last rank.
    pub(crate) fn rank(self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Running => 1,
            _ => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Running => "RUNNING",
            Self::Succeeded => "SUCCEEDED",
            Self::Failed => "FAILED",
            Self::Canceled => "CANCELED",
            Self::Closed => "CLOSED",
        }
    }
}

impl fmt::Display for StatementState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error information from the service.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceError {
    #[serde(default)]
    pub error_code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Manifest describing the result set structure.
#[derive(Debug, Clone, Deserialize)]
pub struct ResultManifest {
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub schema: Option<ResultSchema>,
    #[serde(default)]
    pub total_chunk_count: Option<i64>,
    #[serde(default)]
    pub total_row_count: Option<i64>,
    #[serde(default)]
    pub truncated: bool,
}

impl ResultManifest {
    /// Column names in result order.
    pub fn column_names(&self) -> Vec<&str> {
        self.schema
            .as_ref()
            .map(|schema| schema.columns.iter().map(|c| c.name.as_str()).collect())
            .unwrap_or_default()
    }
}

/// Schema of the result set.
#[derive(Debug, Clone, Deserialize)]
pub struct ResultSchema {
    #[serde(default)]
    pub column_count: Option<i32>,
    #[serde(default)]
    pub columns: Vec<ColumnInfo>,
}

/// Information about a single column in the result.
#[derive(Debug, Clone, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    #[serde(default)]
    pub type_name: Option<String>,
    #[serde(default)]
    pub type_text: Option<String>,
    #[serde(default)]
    pub position: Option<i32>,
}

/// Result data from a chunk fetch or the execution response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResultData {
    #[serde(default)]
    pub chunk_index: Option<i64>,
    #[serde(default)]
    pub row_offset: Option<i64>,
    #[serde(default)]
    pub row_count: Option<i64>,
    #[serde(default)]
    pub next_chunk_index: Option<i64>,
    /// Inline rows, one JSON array per row. Values are strings or null.
    #[serde(default)]
    pub data_array: Option<Vec<Vec<Value>>>,
}

/// How results are delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Disposition {
    Inline,
    ExternalLinks,
}

/// Encoding of the result rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResultFormat {
    JsonArray,
    ArrowStream,
    Csv,
}

/// What the server does when `wait_timeout` elapses before completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OnWaitTimeout {
    Continue,
    Cancel,
}

/// Request body for statement execution.
#[derive(Debug, Clone, Serialize)]
pub struct ExecuteStatementRequest {
    pub warehouse_id: String,
    pub statement: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub catalog: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    pub disposition: Disposition,
    pub format: ResultFormat,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wait_timeout: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub on_wait_timeout: Option<OnWaitTimeout>,
}

impl ExecuteStatementRequest {
    /// Inline JSON request that keeps running server-side past `wait_timeout`.
    pub fn inline_json(
        warehouse_id: impl Into<String>,
        statement: impl Into<String>,
        wait_timeout: impl Into<String>,
    ) -> Self {
        Self {
            warehouse_id: warehouse_id.into(),
            statement: statement.into(),
            catalog: None,
            schema: None,
            disposition: Disposition::Inline,
            format: ResultFormat::JsonArray,
            wait_timeout: Some(wait_timeout.into()),
            on_wait_timeout: Some(OnWaitTimeout::Continue),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statement_state_deserialization() {
        let state: StatementState = serde_json::from_str(r#""SUCCEEDED""#).unwrap();
        assert_eq!(state, StatementState::Succeeded);

        let state: StatementState = serde_json::from_str(r#""PENDING""#).unwrap();
        assert_eq!(state, StatementState::Pending);
        assert_eq!(state.to_string(), "PENDING");
    }

    #[test]
    fn test_terminal_states() {
        assert!(!StatementState::Pending.is_terminal());
        assert!(!StatementState::Running.is_terminal());
        assert!(StatementState::Succeeded.is_terminal());
        assert!(StatementState::Failed.is_terminal());
        assert!(StatementState::Canceled.is_terminal());
        assert!(StatementState::Closed.is_terminal());
    }

    #[test]
    fn test_execute_statement_request_serialization() {
        let req = ExecuteStatementRequest::inline_json("abc123", "SELECT 1", "30s");

        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["warehouse_id"], "abc123");
        assert_eq!(json["disposition"], "INLINE");
        assert_eq!(json["format"], "JSON_ARRAY");
        assert_eq!(json["on_wait_timeout"], "CONTINUE");
        assert_eq!(json["wait_timeout"], "30s");
        assert!(json.get("catalog").is_none());
    }

    #[test]
    fn test_statement_execution_response_deserialization() {
        let json = r#"{
            "statement_id": "stmt-123",
            "status": {"state": "SUCCEEDED"},
            "manifest": {
                "format": "JSON_ARRAY",
                "schema": {
                    "column_count": 2,
                    "columns": [
                        {"name": "id", "type_name": "INT", "type_text": "INT", "position": 0},
                        {"name": "name", "type_name": "STRING", "type_text": "STRING", "position": 1}
                    ]
                },
                "total_chunk_count": 1,
                "total_row_count": 2
            },
            "result": {
                "chunk_index": 0,
                "row_count": 2,
                "data_array": [["1", "a"], ["2", null]]
            }
        }"#;

        let response: StatementExecutionResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.statement_id, "stmt-123");
        assert_eq!(response.status.state, StatementState::Succeeded);

        let manifest = response.manifest.unwrap();
        assert_eq!(manifest.column_names(), vec!["id", "name"]);

        let rows = response.result.unwrap().data_array.unwrap();
        assert_eq!(rows[1][1], Value::Null);
    }

    #[test]
    fn test_failed_status_carries_error() {
        let json = r#"{
            "statement_id": "stmt-9",
            "status": {
                "state": "FAILED",
                "error": {"error_code": "BAD_REQUEST", "message": "TABLE_OR_VIEW_NOT_FOUND"}
            }
        }"#;
        let response: StatementExecutionResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.status.state, StatementState::Failed);
        assert_eq!(
            response.status.error.unwrap().message.as_deref(),
            Some("TABLE_OR_VIEW_NOT_FOUND")
        );
        assert!(response.manifest.is_none());
    }
}
