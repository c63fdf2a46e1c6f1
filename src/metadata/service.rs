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

//! Catalog metadata and table sampling.
//!
//! [`MetadataFetcher`] combines Unity Catalog lookups with sampling
//! statements run through the [`StatementExecutor`].
//!
//! ## Example
//!
//! ```ignore
//! use databricks_mcp::metadata::{MetadataFetcher, SampleOptions};
//!
//! let fetcher = MetadataFetcher::from_config(&config);
//! let connection = manager.ensure_ready().await?;
//! let table = fetcher
//!     .get_table_sample(&connection, "main", "sales", "orders", &SampleOptions::from_config(&config))
//!     .await?;
//! ```

use crate::config::WorkspaceConfig;
use crate::connection::GatewayConnection;
use crate::error::{Error, Result};
use crate::metadata::persist::SampleStore;
use crate::metadata::types::{SchemaMetadata, TableMetadata, TableSummary};
use crate::statement::{PollPolicy, StatementExecutor};
use crate::types::catalog::SchemaInfo;
use tracing::{debug, info, warn};

/// Per-call settings for [`MetadataFetcher::get_table_sample`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleOptions {
    /// Row limit of the sampling statement.
    pub sample_size: u32,
    pub wait_timeout: String,
    /// Write the sample and merged metadata to the [`SampleStore`].
    pub persist: bool,
}

impl SampleOptions {
    pub fn from_config(config: &WorkspaceConfig) -> Self {
        Self {
            sample_size: config.sample_size,
            wait_timeout: config.wait_timeout.clone(),
            persist: config.save_table_metadata,
        }
    }
}

/// Fetches table, schema and job information from a workspace.
///
/// The fetcher holds no connection state; every call takes the
/// [`GatewayConnection`] handed out by the client manager.
#[derive(Debug, Clone, Default)]
pub struct MetadataFetcher {
    executor: StatementExecutor,
    store: SampleStore,
}

impl MetadataFetcher {
    pub fn new(executor: StatementExecutor, store: SampleStore) -> Self {
        Self { executor, store }
    }

    /// Fetcher using the configured poll ceiling and the default store.
    pub fn from_config(config: &WorkspaceConfig) -> Self {
        Self::new(
            StatementExecutor::new(PollPolicy::from_config(config)),
            SampleStore::default(),
        )
    }

    pub fn executor(&self) -> &StatementExecutor {
        &self.executor
    }

    pub fn store(&self) -> &SampleStore {
        &self.store
    }

    /// Unity Catalog metadata for one table.
    ///
    /// A table the workspace does not know yields [`Error::NotFound`].
    pub async fn get_table_metadata(
        &self,
        connection: &GatewayConnection,
        catalog: &str,
        schema: &str,
        table: &str,
    ) -> Result<TableMetadata> {
        require_names(&[("catalog", catalog), ("schema", schema), ("table", table)])?;
        let full_name = format!("{}.{}.{}", catalog, schema, table);
        debug!("Fetching table metadata for {}", full_name);

        let info = connection.gateway().get_table(&full_name).await?;
        Ok(TableMetadata::from(info))
    }

    /// Samples a table and returns its metadata with `sample_values` filled in.
    ///
    /// When `options.persist` is set, the raw rows and the merged metadata
    /// are written to the [`SampleStore`]. A failed write is logged and does
    /// not fail the call.
    pub async fn get_table_sample(
        &self,
        connection: &GatewayConnection,
        catalog: &str,
        schema: &str,
        table: &str,
        options: &SampleOptions,
    ) -> Result<TableMetadata> {
        require_names(&[("catalog", catalog), ("schema", schema), ("table", table)])?;

        let rows = self
            .executor
            .run_sample_query(
                connection,
                catalog,
                schema,
                table,
                options.sample_size,
                &options.wait_timeout,
            )
            .await?;
        info!(
            "Sampled {} rows from {}.{}.{}",
            rows.len(),
            catalog,
            schema,
            table
        );

        let mut metadata = self
            .get_table_metadata(connection, catalog, schema, table)
            .await?;
        metadata.merge_samples(&rows);

        if options.persist {
            if let Err(e) = self
                .store
                .save(catalog, schema, table, &rows, &metadata)
                .await
            {
                warn!("Error saving table data: {}", e);
            }
        }

        Ok(metadata)
    }

    /// Schema comment plus a summary of every table in the schema.
    pub async fn get_schema_metadata(
        &self,
        connection: &GatewayConnection,
        catalog: &str,
        schema: &str,
    ) -> Result<SchemaMetadata> {
        require_names(&[("catalog", catalog), ("schema", schema)])?;
        let gateway = connection.gateway();

        let info = gateway
            .get_schema(&format!("{}.{}", catalog, schema))
            .await?;
        let tables = gateway.list_tables(catalog, schema).await?;
        debug!("Schema {}.{} has {} tables", catalog, schema, tables.len());

        Ok(SchemaMetadata {
            schema_comment: info.comment,
            tables: tables
                .iter()
                .map(|t| (t.name.clone(), TableSummary::from(t)))
                .collect(),
        })
    }

    /// Every schema in `catalog`, in listing order.
    pub async fn list_schemas(
        &self,
        connection: &GatewayConnection,
        catalog: &str,
    ) -> Result<Vec<SchemaInfo>> {
        require_names(&[("catalog", catalog)])?;
        let schemas = connection.gateway().list_schemas(catalog).await?;
        debug!("Catalog {} has {} schemas", catalog, schemas.len());
        Ok(schemas)
    }
}

fn require_names(names: &[(&str, &str)]) -> Result<()> {
    for (what, value) in names {
        if value.trim().is_empty() {
            return Err(Error::invalid_argument(format!("{} name must not be empty", what)));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::mock::{connection, failed, succeeded, MockGateway};
    use crate::metadata::persist::{SAMPLE_DATA_FILE, TABLE_METADATA_FILE};
    use crate::types::catalog::{CatalogColumn, TableInfo};
    use crate::types::sea::StatementState;
    use serde_json::json;
    use std::sync::Arc;

    fn orders_table() -> TableInfo {
        TableInfo {
            name: "orders".to_string(),
            catalog_name: Some("main".to_string()),
            schema_name: Some("sales".to_string()),
            full_name: Some("main.sales.orders".to_string()),
            table_type: Some("MANAGED".to_string()),
            comment: Some("All orders".to_string()),
            created_at: Some(1_700_000_000_000),
            owner: Some("data-eng".to_string()),
            columns: vec![
                CatalogColumn {
                    name: "id".to_string(),
                    type_name: Some("LONG".to_string()),
                    ..Default::default()
                },
                CatalogColumn {
                    name: "status".to_string(),
                    type_name: Some("STRING".to_string()),
                    ..Default::default()
                },
            ],
            ..Default::default()
        }
    }

    fn options(persist: bool) -> SampleOptions {
        SampleOptions {
            sample_size: 2,
            wait_timeout: "30s".to_string(),
            persist,
        }
    }

    fn fetcher_in(dir: &std::path::Path) -> MetadataFetcher {
        MetadataFetcher::new(
            StatementExecutor::default(),
            SampleStore::new(dir.join(".input_data")),
        )
    }

    #[tokio::test]
    async fn test_get_table_metadata() {
        let gateway = Arc::new(MockGateway::new().with_table(orders_table()));
        let conn = connection(gateway.clone());

        let table = MetadataFetcher::default()
            .get_table_metadata(&conn, "main", "sales", "orders")
            .await
            .unwrap();

        assert_eq!(table.name, "orders");
        assert_eq!(table.columns.len(), 2);
        assert!(table.columns.iter().all(|c| c.sample_values.is_none()));
        assert_eq!(gateway.calls(), vec!["get_table main.sales.orders"]);
    }

    #[tokio::test]
    async fn test_missing_table_is_not_found() {
        let conn = connection(Arc::new(MockGateway::new()));
        let err = MetadataFetcher::default()
            .get_table_metadata(&conn, "main", "sales", "nope")
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.status_code(), 404);
    }

    #[tokio::test]
    async fn test_empty_name_rejected_before_remote_call() {
        let gateway = Arc::new(MockGateway::new());
        let conn = connection(gateway.clone());
        let err = MetadataFetcher::default()
            .get_table_metadata(&conn, "main", " ", "orders")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
        assert!(gateway.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_get_table_sample_merges_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let gateway = Arc::new(
            MockGateway::new()
                .with_table(orders_table())
                .with_statements(vec![Ok(succeeded(
                    "stmt-1",
                    &["id", "status"],
                    vec![
                        vec![json!("1"), json!("open")],
                        vec![json!("2"), json!(null)],
                    ],
                ))]),
        );
        let conn = connection(gateway.clone());
        let fetcher = fetcher_in(dir.path());

        let table = fetcher
            .get_table_sample(&conn, "main", "sales", "orders", &options(true))
            .await
            .unwrap();

        assert_eq!(
            table.column("status").unwrap().sample_values,
            Some(vec![json!("open"), json!(null)])
        );
        assert_eq!(
            gateway.submitted.lock().unwrap()[0].statement,
            "SELECT * FROM main.sales.orders LIMIT 2"
        );

        let table_dir = dir.path().join(".input_data/main/sales/orders");
        assert!(table_dir.join(SAMPLE_DATA_FILE).exists());
        let persisted = fetcher
            .store()
            .load_table_metadata("main", "sales", "orders")
            .await
            .unwrap();
        assert_eq!(persisted, table);
        let rows = fetcher
            .store()
            .load_sample_data("main", "sales", "orders")
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["id"], json!("1"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_get_table_sample_without_persist_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let gateway = Arc::new(
            MockGateway::new()
                .with_table(orders_table())
                .with_statements(vec![Ok(succeeded("stmt-1", &["id"], vec![vec![json!("1")]]))]),
        );
        let conn = connection(gateway);

        fetcher_in(dir.path())
            .get_table_sample(&conn, "main", "sales", "orders", &options(false))
            .await
            .unwrap();

        assert!(!dir.path().join(".input_data").exists());
        assert!(!dir.path().join(".gitignore").exists());
    }

    #[tokio::test(start_paused = true)]
    async fn test_persist_failure_is_swallowed() {
        let dir = tempfile::tempdir().unwrap();
        // A file where the root directory should go makes every write fail.
        let root = dir.path().join("blocked");
        std::fs::write(&root, "not a directory").unwrap();
        let gateway = Arc::new(
            MockGateway::new()
                .with_table(orders_table())
                .with_statements(vec![Ok(succeeded("stmt-1", &["id"], vec![vec![json!("1")]]))]),
        );
        let conn = connection(gateway);
        let fetcher = MetadataFetcher::new(StatementExecutor::default(), SampleStore::new(&root));

        let table = fetcher
            .get_table_sample(&conn, "main", "sales", "orders", &options(true))
            .await
            .unwrap();
        assert_eq!(table.column("id").unwrap().sample_values, Some(vec![json!("1")]));
        assert!(!root.join("main/sales/orders").join(TABLE_METADATA_FILE).exists());
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_sample_keeps_columns_bare() {
        let gateway = Arc::new(
            MockGateway::new()
                .with_table(orders_table())
                .with_statements(vec![Ok(succeeded("stmt-1", &["id", "status"], vec![]))]),
        );
        let conn = connection(gateway);

        let table = MetadataFetcher::default()
            .get_table_sample(&conn, "main", "sales", "orders", &options(false))
            .await
            .unwrap();
        assert!(table.columns.iter().all(|c| c.sample_values.is_none()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_sample_skips_metadata_lookup() {
        let gateway = Arc::new(
            MockGateway::new()
                .with_table(orders_table())
                .with_statements(vec![Ok(failed(
                    "stmt-1",
                    StatementState::Failed,
                    "TABLE_OR_VIEW_NOT_FOUND",
                ))]),
        );
        let conn = connection(gateway.clone());

        let err = MetadataFetcher::default()
            .get_table_sample(&conn, "main", "sales", "orders", &options(false))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::QueryExecution(_)));
        assert_eq!(err.status_code(), 500);
        assert_eq!(gateway.count("get_table"), 0);
    }

    #[tokio::test]
    async fn test_get_schema_metadata() {
        let mut customers = orders_table();
        customers.name = "customers".to_string();
        customers.comment = None;
        customers.table_type = Some("EXTERNAL".to_string());
        let gateway = Arc::new(
            MockGateway::new()
                .with_schema(SchemaInfo {
                    name: "sales".to_string(),
                    catalog_name: Some("main".to_string()),
                    full_name: Some("main.sales".to_string()),
                    comment: Some("Sales data".to_string()),
                    ..Default::default()
                })
                .with_table(orders_table())
                .with_table(customers),
        );
        let conn = connection(gateway.clone());

        let schema = MetadataFetcher::default()
            .get_schema_metadata(&conn, "main", "sales")
            .await
            .unwrap();

        assert_eq!(schema.schema_comment.as_deref(), Some("Sales data"));
        let names: Vec<&str> = schema.tables.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["customers", "orders"]);
        assert_eq!(schema.tables["orders"].owner.as_deref(), Some("data-eng"));
        assert_eq!(schema.tables["customers"].table_type.as_deref(), Some("EXTERNAL"));
        assert_eq!(
            gateway.calls(),
            vec!["get_schema main.sales", "list_tables main.sales"]
        );
    }

    #[tokio::test]
    async fn test_missing_schema_is_not_found() {
        let gateway = Arc::new(MockGateway::new());
        let conn = connection(gateway.clone());
        let err = MetadataFetcher::default()
            .get_schema_metadata(&conn, "main", "ghost")
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(gateway.count("list_tables"), 0);
    }

    #[tokio::test]
    async fn test_list_schemas() {
        let gateway = Arc::new(
            MockGateway::new()
                .with_schema(SchemaInfo {
                    name: "sales".to_string(),
                    catalog_name: Some("main".to_string()),
                    full_name: Some("main.sales".to_string()),
                    ..Default::default()
                })
                .with_schema(SchemaInfo {
                    name: "raw".to_string(),
                    catalog_name: Some("bronze".to_string()),
                    full_name: Some("bronze.raw".to_string()),
                    ..Default::default()
                }),
        );
        let conn = connection(gateway);

        let schemas = MetadataFetcher::default()
            .list_schemas(&conn, "main")
            .await
            .unwrap();
        assert_eq!(schemas.len(), 1);
        assert_eq!(schemas[0].name, "sales");
    }
}
