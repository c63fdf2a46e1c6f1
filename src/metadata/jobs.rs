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

//! Job run lookup.

use crate::connection::GatewayConnection;
use crate::error::{Error, Result};
use crate::metadata::service::MetadataFetcher;
use crate::client::WorkspaceGateway;
use crate::types::catalog::next_token;
use crate::types::jobs::{Completed, Job, Run, RunOutput};
use serde_json::Value;
use tracing::{debug, info};

const MISSING: &str = "<none>";

impl MetadataFetcher {
    /// Output of the latest task in the latest completed run of `job_name`.
    ///
    /// With `filter_failed`, only `FAILED` runs and tasks are considered.
    /// The result reads:
    ///
    /// ```text
    /// Error message: <error>
    /// Error traceback: <error_trace>
    /// Metadata: <metadata as JSON>
    /// ```
    pub async fn get_run_result(
        &self,
        connection: &GatewayConnection,
        job_name: &str,
        filter_failed: bool,
    ) -> Result<String> {
        if job_name.trim().is_empty() {
            return Err(Error::invalid_argument("job name must not be empty"));
        }
        let gateway = connection.gateway();

        let jobs = gateway.list_jobs(job_name).await?;
        let job = resolve_job(&jobs, job_name)
            .ok_or_else(|| Error::not_found(format!("No job found with name: {}", job_name)))?;
        debug!("Resolved job '{}' to id {}", job_name, job.job_id);

        let run = latest_run(gateway, job, job_name, filter_failed).await?;
        info!("Selected run {} of job '{}'", run.run_id, job_name);

        let details = gateway.get_run(run.run_id).await?;
        let task = latest(&details.tasks, filter_failed).ok_or_else(|| {
            let kind = if filter_failed { "failed tasks" } else { "tasks" };
            Error::not_found(format!("No {} found in run {} of job: {}", kind, run.run_id, job_name))
        })?;
        debug!(
            "Selected task {} ({})",
            task.run_id,
            task.task_key.as_deref().unwrap_or(MISSING)
        );

        let output = gateway.get_run_output(task.run_id).await?;
        Ok(format_output(&output))
    }
}

/// Exact name match first, then the first case-insensitive match.
fn resolve_job<'a>(jobs: &'a [Job], name: &str) -> Option<&'a Job> {
    jobs.iter()
        .find(|j| j.name() == Some(name))
        .or_else(|| {
            jobs.iter()
                .find(|j| j.name().is_some_and(|n| n.eq_ignore_ascii_case(name)))
        })
}

/// Latest completed run of `job`, reading only as many pages as needed.
///
/// Runs are listed most recent first, so the first page holding a candidate
/// holds the latest one.
async fn latest_run(
    gateway: &dyn WorkspaceGateway,
    job: &Job,
    job_name: &str,
    filter_failed: bool,
) -> Result<Run> {
    let mut page_token: Option<String> = None;
    let mut seen_any = false;

    loop {
        let page = gateway.list_runs(job.job_id, page_token.as_deref()).await?;
        seen_any |= !page.runs.is_empty();
        if let Some(run) = latest(&page.runs, filter_failed) {
            return Ok(run.clone());
        }

        page_token = next_token(page.next_page_token);
        match page_token {
            Some(ref token) => debug!("Fetching next run page of job {} ({})", job.job_id, token),
            None if seen_any => {
                return Err(Error::not_found(format!(
                    "No failed runs found for job: {}",
                    job_name
                )))
            }
            None => {
                return Err(Error::not_found(format!("No runs found for job: {}", job_name)))
            }
        }
    }
}

/// Latest by end time; the earlier entry wins a tie.
fn latest<T: Completed>(items: &[T], filter_failed: bool) -> Option<&T> {
    items
        .iter()
        .filter(|item| !filter_failed || item.is_failed())
        .fold(None, |best: Option<&T>, item| match best {
            Some(b) if item.end_time() <= b.end_time() => Some(b),
            _ => Some(item),
        })
}

fn format_output(output: &RunOutput) -> String {
    let metadata = match &output.metadata {
        None | Some(Value::Null) => MISSING.to_string(),
        Some(value) => value.to_string(),
    };
    format!(
        "Error message: {}\nError traceback: {}\nMetadata: {}",
        output.error.as_deref().unwrap_or(MISSING),
        output.error_trace.as_deref().unwrap_or(MISSING),
        metadata
    )
}
