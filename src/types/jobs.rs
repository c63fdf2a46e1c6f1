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

//! Jobs API 2.1 types (`/api/2.1/jobs/...`).

use serde::Deserialize;
use serde_json::Value;

/// Entry of `GET jobs/list`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Job {
    pub job_id: i64,
    #[serde(default)]
    pub settings: Option<JobSettings>,
}

impl Job {
    pub fn name(&self) -> Option<&str> {
        self.settings.as_ref().and_then(|s| s.name.as_deref())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct JobSettings {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListJobsResponse {
    #[serde(default)]
    pub jobs: Vec<Job>,
    #[serde(default)]
    pub has_more: bool,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

/// A job run, either from `runs/list` or `runs/get`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Run {
    pub run_id: i64,
    #[serde(default)]
    pub job_id: Option<i64>,
    #[serde(default)]
    pub state: Option<RunState>,
    #[serde(default)]
    pub start_time: Option<i64>,
    /// Milliseconds since the epoch; 0 or absent while running.
    #[serde(default)]
    pub end_time: Option<i64>,
    #[serde(default)]
    pub tasks: Vec<RunTask>,
}

/// A task run inside a [`Run`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RunTask {
    pub run_id: i64,
    #[serde(default)]
    pub task_key: Option<String>,
    #[serde(default)]
    pub state: Option<RunState>,
    #[serde(default)]
    pub end_time: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RunState {
    #[serde(default)]
    pub life_cycle_state: Option<String>,
    #[serde(default)]
    pub result_state: Option<RunResultState>,
    #[serde(default)]
    pub state_message: Option<String>,
}

/// Outcome of a completed run or task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunResultState {
    Success,
    Failed,
    Timedout,
    Canceled,
    Excluded,
    SuccessWithFailures,
    UpstreamFailed,
    UpstreamCanceled,
    #[serde(other)]
    Other,
}

/// Common accessors for anything that carries a [`RunState`] and an end time.
pub trait Completed {
    fn result_state(&self) -> Option<RunResultState>;
    fn end_time(&self) -> i64;

    fn is_failed(&self) -> bool {
        self.result_state() == Some(RunResultState::Failed)
    }
}

impl Completed for Run {
    fn result_state(&self) -> Option<RunResultState> {
        self.state.as_ref().and_then(|s| s.result_state)
    }

    fn end_time(&self) -> i64 {
        self.end_time.unwrap_or(0)
    }
}

impl Completed for RunTask {
    fn result_state(&self) -> Option<RunResultState> {
        self.state.as_ref().and_then(|s| s.result_state)
    }

    fn end_time(&self) -> i64 {
        self.end_time.unwrap_or(0)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListRunsResponse {
    #[serde(default)]
    pub runs: Vec<Run>,
    #[serde(default)]
    pub has_more: bool,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

/// Response of `GET runs/get-output`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RunOutput {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_trace: Option<String>,
    #[serde(default)]
    pub metadata: Option<Value>,
}
