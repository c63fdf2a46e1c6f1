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

//! REST implementation of [`WorkspaceGateway`].
//!
//! Endpoints used:
//!
//! | Area       | Endpoint                                                   |
//! |------------|------------------------------------------------------------|
//! | SQL        | `POST /api/2.0/sql/statements`                             |
//! | SQL        | `GET  /api/2.0/sql/statements/{id}`                        |
//! | SQL        | `GET  /api/2.0/sql/statements/{id}/result/chunks/{index}`  |
//! | SQL        | `POST /api/2.0/sql/statements/{id}/cancel`                 |
//! | Catalog    | `GET  /api/2.1/unity-catalog/tables[/{full_name}]`         |
//! | Catalog    | `GET  /api/2.1/unity-catalog/schemas[/{full_name}]`        |
//! | Jobs       | `GET  /api/2.1/jobs/list`, `runs/list`, `runs/get`, `runs/get-output` |

use crate::client::{DatabricksHttpClient, WorkspaceGateway};
use crate::error::{Error, Result};
use crate::types::catalog::{next_token, ListSchemasResponse, ListTablesResponse, SchemaInfo, TableInfo};
use crate::types::jobs::{Job, ListJobsResponse, ListRunsResponse, Run, RunOutput};
use crate::types::sea::{ExecuteStatementRequest, ResultData, StatementExecutionResponse};
use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::debug;

const SQL_API: [&str; 3] = ["api", "2.0", "sql"];
const CATALOG_API: [&str; 3] = ["api", "2.1", "unity-catalog"];
const JOBS_API: [&str; 3] = ["api", "2.1", "jobs"];

/// Gateway over the workspace REST API.
pub struct RestGateway {
    http_client: Arc<DatabricksHttpClient>,
    host: String,
}

impl std::fmt::Debug for RestGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestGateway")
            .field("host", &self.host)
            .finish()
    }
}

impl RestGateway {
    pub fn new(http_client: Arc<DatabricksHttpClient>, host: impl Into<String>) -> Self {
        Self {
            http_client,
            host: host.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Builds `{host}/{prefix}/{segments}`, percent-encoding each segment.
    fn endpoint(&self, prefix: &[&str], segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.host)
            .map_err(|e| Error::api(None, format!("Invalid workspace URL '{}': {}", self.host, e)))?;
        url.path_segments_mut()
            .map_err(|_| Error::api(None, format!("Invalid workspace URL '{}'", self.host)))?
            .pop_if_empty()
            .extend(prefix)
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        debug!("{} {}", method, url.path());
        self.http_client.request(method, url)
    }

    async fn fetch_json<T: DeserializeOwned>(&self, builder: RequestBuilder, what: &str) -> Result<T> {
        let request = build(builder)?;
        self.http_client.execute_json(request, what).await
    }

    /// GETs every page of a listing, following `next_page_token`.
    async fn fetch_all<P>(&self, url: Url, query: &[(&str, &str)], what: &str) -> Result<Vec<P::Item>>
    where
        P: Page + DeserializeOwned,
    {
        let mut items = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut builder = self.request(Method::GET, url.clone()).query(query);
            if let Some(ref token) = page_token {
                builder = builder.query(&[("page_token", token)]);
            }

            let (page_items, next) = self.fetch_json::<P>(builder, what).await?.into_parts();
            items.extend(page_items);
            page_token = next_token(next);
            match page_token {
                Some(ref token) => debug!("Fetching next {} page ({})", what, token),
                None => return Ok(items),
            }
        }
    }
}

fn build(builder: RequestBuilder) -> Result<reqwest::Request> {
    builder
        .build()
        .map_err(|e| Error::api(None, format!("Failed to build request: {}", e)))
}

/// One page of a paginated listing.
trait Page {
    type Item;

    fn into_parts(self) -> (Vec<Self::Item>, Option<String>);
}

impl Page for ListSchemasResponse {
    type Item = SchemaInfo;

    fn into_parts(self) -> (Vec<SchemaInfo>, Option<String>) {
        (self.schemas, self.next_page_token)
    }
}

impl Page for ListTablesResponse {
    type Item = TableInfo;

    fn into_parts(self) -> (Vec<TableInfo>, Option<String>) {
        (self.tables, self.next_page_token)
    }
}

impl Page for ListJobsResponse {
    type Item = Job;

    fn into_parts(self) -> (Vec<Job>, Option<String>) {
        (self.jobs, self.next_page_token)
    }
}

#[async_trait]
impl WorkspaceGateway for RestGateway {
    async fn execute_statement(
        &self,
        request: &ExecuteStatementRequest,
    ) -> Result<StatementExecutionResponse> {
        let url = self.endpoint(&SQL_API, &["statements"])?;
        debug!(
            "Submitting statement to warehouse {}: {}",
            request.warehouse_id, request.statement
        );
        let response: StatementExecutionResponse = self
            .fetch_json(self.request(Method::POST, url).json(request), "execute")
            .await?;
        debug!(
            "Execute response: statement_id={}, status={}",
            response.statement_id, response.status.state
        );
        Ok(response)
    }

    async fn get_statement(&self, statement_id: &str) -> Result<StatementExecutionResponse> {
        let url = self.endpoint(&SQL_API, &["statements", statement_id])?;
        self.fetch_json(self.request(Method::GET, url), "statement status")
            .await
    }

    async fn get_statement_result_chunk(
        &self,
        statement_id: &str,
        chunk_index: i64,
    ) -> Result<ResultData> {
        let index = chunk_index.to_string();
        let url = self.endpoint(
            &SQL_API,
            &["statements", statement_id, "result", "chunks", &index],
        )?;
        self.fetch_json(self.request(Method::GET, url), "result chunk")
            .await
    }

    async fn cancel_statement(&self, statement_id: &str) -> Result<()> {
        let url = self.endpoint(&SQL_API, &["statements", statement_id, "cancel"])?;
        self.http_client
            .execute(build(self.request(Method::POST, url))?)
            .await?;
        debug!("Canceled statement {}", statement_id);
        Ok(())
    }

    async fn get_table(&self, full_name: &str) -> Result<TableInfo> {
        let url = self.endpoint(&CATALOG_API, &["tables", full_name])?;
        self.fetch_json(self.request(Method::GET, url), "table").await
    }

    async fn get_schema(&self, full_name: &str) -> Result<SchemaInfo> {
        let url = self.endpoint(&CATALOG_API, &["schemas", full_name])?;
        self.fetch_json(self.request(Method::GET, url), "schema").await
    }

    async fn list_schemas(&self, catalog: &str) -> Result<Vec<SchemaInfo>> {
        let url = self.endpoint(&CATALOG_API, &["schemas"])?;
        self.fetch_all::<ListSchemasResponse>(url, &[("catalog_name", catalog)], "schema list")
            .await
    }

    async fn list_tables(&self, catalog: &str, schema: &str) -> Result<Vec<TableInfo>> {
        let url = self.endpoint(&CATALOG_API, &["tables"])?;
        self.fetch_all::<ListTablesResponse>(
            url,
            &[("catalog_name", catalog), ("schema_name", schema)],
            "table list",
        )
        .await
    }

    async fn list_jobs(&self, name: &str) -> Result<Vec<Job>> {
        let url = self.endpoint(&JOBS_API, &["list"])?;
        self.fetch_all::<ListJobsResponse>(url, &[("name", name)], "job list")
            .await
    }

    async fn list_runs(&self, job_id: i64, page_token: Option<&str>) -> Result<ListRunsResponse> {
        let url = self.endpoint(&JOBS_API, &["runs", "list"])?;
        let mut builder = self
            .request(Method::GET, url)
            .query(&[("job_id", job_id.to_string())])
            .query(&[("completed_only", "true")]);
        if let Some(token) = page_token {
            builder = builder.query(&[("page_token", token)]);
        }
        self.fetch_json(builder, "run list").await
    }

    async fn get_run(&self, run_id: i64) -> Result<Run> {
        let url = self.endpoint(&JOBS_API, &["runs", "get"])?;
        let builder = self
            .request(Method::GET, url)
            .query(&[("run_id", run_id.to_string())]);
        self.fetch_json(builder, "run").await
    }

    async fn get_run_output(&self, run_id: i64) -> Result<RunOutput> {
        let url = self.endpoint(&JOBS_API, &["runs", "get-output"])?;
        let builder = self
            .request(Method::GET, url)
            .query(&[("run_id", run_id.to_string())]);
        self.fetch_json(builder, "run output").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::BearerToken;
    use crate::client::HttpClientConfig;

    fn create_test_gateway(host: &str) -> RestGateway {
        let auth = Arc::new(BearerToken::new("test-token"));
        let http_client =
            Arc::new(DatabricksHttpClient::new(HttpClientConfig::default(), auth).unwrap());
        RestGateway::new(http_client, host)
    }

    #[test]
    fn test_statement_endpoint() {
        let gateway = create_test_gateway("https://test.databricks.com");
        let url = gateway.endpoint(&SQL_API, &["statements", "01ef-abc"]).unwrap();
        assert_eq!(
            url.as_str(),
            "https://test.databricks.com/api/2.0/sql/statements/01ef-abc"
        );
    }

    #[test]
    fn test_endpoint_strips_trailing_slash() {
        let gateway = create_test_gateway("https://test.databricks.com/");
        assert_eq!(gateway.host(), "https://test.databricks.com");
        let url = gateway
            .endpoint(&CATALOG_API, &["tables", "main.sales.orders"])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://test.databricks.com/api/2.1/unity-catalog/tables/main.sales.orders"
        );
    }

    #[test]
    fn test_endpoint_encodes_segments() {
        let gateway = create_test_gateway("https://test.databricks.com");
        let url = gateway
            .endpoint(&CATALOG_API, &["schemas", "main.my schema"])
            .unwrap();
        assert_eq!(url.path(), "/api/2.1/unity-catalog/schemas/main.my%20schema");
    }

    #[test]
    fn test_page_parts() {
        let page: ListJobsResponse = serde_json::from_str(
            r#"{"jobs": [{"job_id": 1}, {"job_id": 2}], "has_more": true, "next_page_token": "abc"}"#,
        )
        .unwrap();
        let (jobs, next) = page.into_parts();
        assert_eq!(jobs.len(), 2);
        assert_eq!(next_token(next).as_deref(), Some("abc"));

        let last: ListTablesResponse =
            serde_json::from_str(r#"{"tables": [], "next_page_token": ""}"#).unwrap();
        assert_eq!(next_token(last.into_parts().1), None);
    }

    #[test]
    fn test_invalid_host() {
        let gateway = create_test_gateway("not a url");
        assert!(matches!(
            gateway.endpoint(&JOBS_API, &["list"]),
            Err(Error::Api { .. })
        ));
    }
}
