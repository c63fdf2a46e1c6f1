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

//! Tool surface exposed to a protocol host.
//!
//! [`DatabricksTools`] offers the four workspace tools as typed async
//! methods, plus name-based discovery ([`DatabricksTools::list_tools`]) and
//! dispatch ([`DatabricksTools::call_tool`]) over JSON arguments.
//!
//! Every failure is reported as a [`ToolError`] carrying an HTTP-like status:
//! 404 when the named catalog object or job does not exist, 500 otherwise.

use crate::config::WorkspaceConfig;
use crate::error::{Error, Result};
use crate::manager::ClientManager;
use crate::metadata::{MetadataFetcher, SampleOptions, SchemaMetadata, TableMetadata};
use crate::types::catalog::SchemaInfo;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error};

pub const GET_SCHEMAS: &str = "get_schemas";
pub const GET_TABLE_SAMPLE: &str = "get_table_sample";
pub const GET_SCHEMA_METADATA: &str = "get_schema_metadata";
pub const GET_JOB_RUN_RESULT: &str = "get_job_run_result";

/// Failure returned to the tool caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolError {
    pub status_code: u16,
    pub message: String,
}

impl fmt::Display for ToolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.status_code)
    }
}

impl std::error::Error for ToolError {}

impl From<Error> for ToolError {
    /// The message carries the whole cause chain, outermost first.
    fn from(e: Error) -> Self {
        let mut message = e.to_string();
        let mut cause = std::error::Error::source(&e);
        while let Some(inner) = cause {
            message.push_str(": ");
            message.push_str(&inner.to_string());
            cause = inner.source();
        }

        Self {
            status_code: e.status_code(),
            message,
        }
    }
}

/// Tool definition for discovery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

/// The workspace tools, sharing one [`ClientManager`].
#[derive(Debug)]
pub struct DatabricksTools {
    manager: Arc<ClientManager>,
    fetcher: MetadataFetcher,
}

impl DatabricksTools {
    pub fn new(manager: Arc<ClientManager>, fetcher: MetadataFetcher) -> Self {
        Self { manager, fetcher }
    }

    /// Production wiring for a workspace configuration.
    pub fn from_config(config: WorkspaceConfig) -> Self {
        let fetcher = MetadataFetcher::from_config(&config);
        Self::new(Arc::new(ClientManager::from_config(config)), fetcher)
    }

    pub fn manager(&self) -> &Arc<ClientManager> {
        &self.manager
    }

    fn config(&self) -> &WorkspaceConfig {
        self.manager.config()
    }

    /// Schemas of `catalog`, or of the configured default catalog.
    pub async fn get_schemas(
        &self,
        catalog: Option<&str>,
    ) -> std::result::Result<Vec<SchemaInfo>, ToolError> {
        report(GET_SCHEMAS, self.schemas(catalog).await)
    }

    /// Metadata of one table with sampled values for each column.
    pub async fn get_table_sample(
        &self,
        catalog: &str,
        schema: &str,
        table: &str,
    ) -> std::result::Result<TableMetadata, ToolError> {
        report(GET_TABLE_SAMPLE, self.table_sample(catalog, schema, table).await)
    }

    /// Schema comment and a summary of its tables.
    pub async fn get_schema_metadata(
        &self,
        catalog: &str,
        schema: &str,
    ) -> std::result::Result<SchemaMetadata, ToolError> {
        report(GET_SCHEMA_METADATA, self.schema_metadata(catalog, schema).await)
    }

    /// Error output of the latest (optionally latest failed) run of a job.
    pub async fn get_job_run_result(
        &self,
        job_name: &str,
        filter_for_failed_runs: bool,
    ) -> std::result::Result<String, ToolError> {
        report(
            GET_JOB_RUN_RESULT,
            self.job_run_result(job_name, filter_for_failed_runs).await,
        )
    }

    async fn schemas(&self, catalog: Option<&str>) -> Result<Vec<SchemaInfo>> {
        let catalog = catalog
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .or_else(|| self.config().default_catalog())
            .ok_or_else(|| {
                Error::invalid_argument("no catalog given and workspace.catalog is not configured")
            })?;
        let connection = self.manager.ensure_ready().await?;
        self.fetcher.list_schemas(&connection, catalog).await
    }

    async fn table_sample(&self, catalog: &str, schema: &str, table: &str) -> Result<TableMetadata> {
        let connection = self.manager.ensure_ready().await?;
        let options = SampleOptions::from_config(self.config());
        self.fetcher
            .get_table_sample(&connection, catalog, schema, table, &options)
            .await
    }

    async fn schema_metadata(&self, catalog: &str, schema: &str) -> Result<SchemaMetadata> {
        let connection = self.manager.ensure_ready().await?;
        self.fetcher
            .get_schema_metadata(&connection, catalog, schema)
            .await
    }

    async fn job_run_result(&self, job_name: &str, filter_failed: bool) -> Result<String> {
        let connection = self.manager.ensure_ready().await?;
        self.fetcher
            .get_run_result(&connection, job_name, filter_failed)
            .await
    }

    /// Definitions of every tool, in a stable order.
    pub fn list_tools(&self) -> Vec<ToolDefinition> {
        vec![
            definition(
                GET_SCHEMAS,
                "List the schemas of a Unity Catalog catalog. Uses the configured default catalog when none is given.",
                json!({
                    "type": "object",
                    "properties": {
                        "catalog": {"type": "string", "description": "Catalog name"}
                    }
                }),
            ),
            definition(
                GET_TABLE_SAMPLE,
                "Get detailed metadata for a table, including sample values for each column.",
                json!({
                    "type": "object",
                    "properties": {
                        "catalog": {"type": "string", "description": "Catalog name"},
                        "schema": {"type": "string", "description": "Schema name"},
                        "table": {"type": "string", "description": "Table name"}
                    },
                    "required": ["catalog", "schema", "table"]
                }),
            ),
            definition(
                GET_SCHEMA_METADATA,
                "Get the comment of a schema and a summary of every table in it.",
                json!({
                    "type": "object",
                    "properties": {
                        "catalog": {"type": "string", "description": "Catalog name"},
                        "schema": {"type": "string", "description": "Schema name"}
                    },
                    "required": ["catalog", "schema"]
                }),
            ),
            definition(
                GET_JOB_RUN_RESULT,
                "Get the error output of the latest run of a job, optionally only considering failed runs.",
                json!({
                    "type": "object",
                    "properties": {
                        "job_name": {"type": "string", "description": "Job name"},
                        "filter_for_failed_runs": {
                            "type": "boolean",
                            "description": "Only consider failed runs",
                            "default": false
                        }
                    },
                    "required": ["job_name"]
                }),
            ),
        ]
    }

    pub fn has_tool(&self, name: &str) -> bool {
        matches!(
            name,
            GET_SCHEMAS | GET_TABLE_SAMPLE | GET_SCHEMA_METADATA | GET_JOB_RUN_RESULT
        )
    }

    /// Calls a tool by name with JSON arguments and returns its JSON result.
    pub async fn call_tool(&self, name: &str, args: Value) -> std::result::Result<Value, ToolError> {
        debug!("Calling tool {}", name);
        let args = Args {
            tool: name,
            value: &args,
        };
        match name {
            GET_SCHEMAS => {
                let catalog = args.optional_str("catalog")?;
                to_value(name, self.get_schemas(catalog).await?)
            }
            GET_TABLE_SAMPLE => {
                let catalog = args.required_str("catalog")?;
                let schema = args.required_str("schema")?;
                let table = args.required_str("table")?;
                to_value(name, self.get_table_sample(catalog, schema, table).await?)
            }
            GET_SCHEMA_METADATA => {
                let catalog = args.required_str("catalog")?;
                let schema = args.required_str("schema")?;
                to_value(name, self.get_schema_metadata(catalog, schema).await?)
            }
            GET_JOB_RUN_RESULT => {
                let job_name = args.required_str("job_name")?;
                let filter = args.optional_bool("filter_for_failed_runs")?.unwrap_or(false);
                Ok(Value::String(
                    self.get_job_run_result(job_name, filter).await?,
                ))
            }
            _ => Err(ToolError {
                status_code: 404,
                message: format!("Unknown tool: {}", name),
            }),
        }
    }
}

/// JSON arguments of one tool call.
struct Args<'a> {
    tool: &'a str,
    value: &'a Value,
}

impl<'a> Args<'a> {
    fn required_str(&self, key: &str) -> std::result::Result<&'a str, ToolError> {
        self.optional_str(key)?.ok_or_else(|| {
            report_err(
                self.tool,
                Error::invalid_argument(format!("missing required argument '{}'", key)),
            )
        })
    }

    fn optional_str(&self, key: &str) -> std::result::Result<Option<&'a str>, ToolError> {
        match self.value.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.as_str())),
            Some(_) => Err(self.invalid(key, "a string")),
        }
    }

    fn optional_bool(&self, key: &str) -> std::result::Result<Option<bool>, ToolError> {
        match self.value.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Bool(b)) => Ok(Some(*b)),
            Some(_) => Err(self.invalid(key, "a boolean")),
        }
    }

    fn invalid(&self, key: &str, expected: &str) -> ToolError {
        report_err(
            self.tool,
            Error::invalid_argument(format!("argument '{}' must be {}", key, expected)),
        )
    }
}

fn definition(name: &str, description: &str, input_schema: Value) -> ToolDefinition {
    ToolDefinition {
        name: name.to_string(),
        description: description.to_string(),
        input_schema,
    }
}

fn report<T>(tool: &str, result: Result<T>) -> std::result::Result<T, ToolError> {
    result.map_err(|e| report_err(tool, e))
}

fn report_err(tool: &str, e: Error) -> ToolError {
    error!("Tool {} failed: {:?}", tool, e);
    ToolError::from(e)
}

fn to_value<T: Serialize>(tool: &str, value: T) -> std::result::Result<Value, ToolError> {
    serde_json::to_value(value).map_err(|e| {
        error!("Tool {} returned unserializable output: {}", tool, e);
        ToolError {
            status_code: 500,
            message: e.to_string(),
        }
    })
}
