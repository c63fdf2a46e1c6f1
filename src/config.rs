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

//! Workspace configuration loaded from `config.yaml`.
//!
//! The file is checked against a field schema (required/optional fields and
//! their YAML types) before it is deserialized, so a bad file fails as a
//! whole and nothing is partially applied.
//!
//! ```yaml
//! workspace:
//!   url: https://dbc-a1b2345c-d6e7.cloud.databricks.com
//!   warehouse_id: abc123
//!   warehouse_name: Starter Warehouse
//!   sample_size: 5            # optional
//!   catalog: main             # optional
//!   profile: mcp_server_for_databricks   # optional
//!   wait_timeout: 30s         # optional
//!   save_table_metadata: false           # optional
//!   max_poll_seconds: 600     # optional
//! logging:                    # optional
//!   level: info
//! ```

use crate::error::{Error, Result};
use crate::logging::LogConfig;
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const CONFIG_FILE_NAME: &str = "config.yaml";
pub const DEFAULT_PROFILE: &str = "mcp_server_for_databricks";
pub const DEFAULT_SAMPLE_SIZE: u32 = 5;
pub const DEFAULT_WAIT_TIMEOUT: &str = "30s";

/// Statement Execution API bounds for `wait_timeout` (0 or 5..=50 seconds).
const MIN_WAIT_TIMEOUT_SECS: u64 = 5;
const MAX_WAIT_TIMEOUT_SECS: u64 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldKind {
    String,
    Integer,
    Bool,
}

impl FieldKind {
    fn matches(self, value: &Value) -> bool {
        match self {
            FieldKind::String => value.is_string(),
            FieldKind::Integer => value.as_i64().is_some() || value.as_u64().is_some(),
            FieldKind::Bool => value.is_bool(),
        }
    }

    fn name(self) -> &'static str {
        match self {
            FieldKind::String => "string",
            FieldKind::Integer => "integer",
            FieldKind::Bool => "boolean",
        }
    }
}

const REQUIRED_FIELDS: &[(&str, FieldKind)] = &[
    ("url", FieldKind::String),
    ("warehouse_id", FieldKind::String),
    ("warehouse_name", FieldKind::String),
];

const OPTIONAL_FIELDS: &[(&str, FieldKind)] = &[
    ("sample_size", FieldKind::Integer),
    ("catalog", FieldKind::String),
    ("profile", FieldKind::String),
    ("wait_timeout", FieldKind::String),
    ("save_table_metadata", FieldKind::Bool),
    ("max_poll_seconds", FieldKind::Integer),
];

/// Top-level configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    pub workspace: WorkspaceConfig,
    #[serde(default)]
    pub logging: LogConfig,
}

/// Databricks workspace settings shared by every tool invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    /// Workspace URL, e.g. `https://dbc-a1b2345c-d6e7.cloud.databricks.com`.
    pub url: String,
    /// SQL warehouse used for sampling statements.
    pub warehouse_id: String,
    pub warehouse_name: String,
    /// Rows fetched per table sample.
    #[serde(default = "default_sample_size")]
    pub sample_size: u32,
    /// Catalog used by `get_schemas` when the caller does not name one.
    #[serde(default)]
    pub catalog: Option<String>,
    /// CLI profile scoping the OAuth login.
    #[serde(default = "default_profile")]
    pub profile: String,
    /// Server-side `wait_timeout` hint for statement submission.
    #[serde(default = "default_wait_timeout")]
    pub wait_timeout: String,
    /// Persist sampled rows and merged metadata under `.input_data/`.
    #[serde(default)]
    pub save_table_metadata: bool,
    /// Client-side ceiling on statement polling. Unbounded when absent.
    #[serde(default)]
    pub max_poll_seconds: Option<u64>,
}

fn default_sample_size() -> u32 {
    DEFAULT_SAMPLE_SIZE
}

fn default_profile() -> String {
    DEFAULT_PROFILE.to_string()
}

fn default_wait_timeout() -> String {
    DEFAULT_WAIT_TIMEOUT.to_string()
}

impl WorkspaceConfig {
    /// Creates a configuration with defaults for every optional field.
    pub fn new(
        url: impl Into<String>,
        warehouse_id: impl Into<String>,
        warehouse_name: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            warehouse_id: warehouse_id.into(),
            warehouse_name: warehouse_name.into(),
            sample_size: DEFAULT_SAMPLE_SIZE,
            catalog: None,
            profile: default_profile(),
            wait_timeout: default_wait_timeout(),
            save_table_metadata: false,
            max_poll_seconds: None,
        }
    }

    /// Workspace URL without a trailing slash.
    pub fn host(&self) -> &str {
        self.url.trim().trim_end_matches('/')
    }

    /// Default catalog, treating an empty string as unset.
    pub fn default_catalog(&self) -> Option<&str> {
        self.catalog.as_deref().map(str::trim).filter(|c| !c.is_empty())
    }

    /// Checks the semantic invariants that the field schema cannot express.
    pub fn validate(&self) -> Result<()> {
        let host = self.host();
        if host.is_empty() {
            return Err(Error::configuration("workspace.url must not be empty"));
        }
        if !(host.starts_with("https://") || host.starts_with("http://")) {
            return Err(Error::configuration(format!(
                "workspace.url must start with https:// (got '{}')",
                host
            )));
        }
        if self.warehouse_id.trim().is_empty() {
            return Err(Error::configuration(
                "workspace.warehouse_id must not be empty",
            ));
        }
        if self.sample_size == 0 {
            return Err(Error::configuration(
                "workspace.sample_size must be greater than 0",
            ));
        }
        if self.profile.trim().is_empty() {
            return Err(Error::configuration("workspace.profile must not be empty"));
        }
        parse_wait_timeout(&self.wait_timeout)?;
        Ok(())
    }
}

/// Parses a `wait_timeout` such as `"30s"` into whole seconds.
pub fn parse_wait_timeout(value: &str) -> Result<u64> {
    let secs = value
        .trim()
        .strip_suffix('s')
        .and_then(|digits| digits.parse::<u64>().ok())
        .ok_or_else(|| {
            Error::configuration(format!(
                "workspace.wait_timeout must look like '30s' (got '{}')",
                value
            ))
        })?;

    if secs != 0 && !(MIN_WAIT_TIMEOUT_SECS..=MAX_WAIT_TIMEOUT_SECS).contains(&secs) {
        return Err(Error::configuration(format!(
            "workspace.wait_timeout must be 0s or between {}s and {}s (got '{}')",
            MIN_WAIT_TIMEOUT_SECS, MAX_WAIT_TIMEOUT_SECS, value
        )));
    }
    Ok(secs)
}

impl AppConfig {
    /// Parses and validates a YAML document.
    pub fn from_yaml_str(contents: &str) -> Result<Self> {
        let document: Value = serde_yaml::from_str(contents)
            .map_err(|e| Error::configuration(format!("invalid YAML: {}", e)))?;
        Self::from_value(document)
    }

    /// Validates the field schema of an already-parsed document, then
    /// deserializes it.
    pub fn from_value(mut document: Value) -> Result<Self> {
        let root = document
            .as_mapping_mut()
            .ok_or_else(|| Error::configuration("configuration must be a YAML mapping"))?;
        let workspace = root
            .get_mut("workspace")
            .and_then(Value::as_mapping_mut)
            .ok_or_else(|| Error::configuration("missing 'workspace' section"))?;

        validate_workspace_fields(workspace)?;

        let config: AppConfig = serde_yaml::from_value(document)
            .map_err(|e| Error::configuration(format!("invalid configuration: {}", e)))?;
        config.workspace.validate()?;
        Ok(config)
    }

    /// Loads the configuration from an explicit path.
    pub fn load(path: &Path) -> Result<Self> {
        info!("Loading configuration from {}", path.display());
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::configuration(format!("failed to read {}: {}", path.display(), e))
        })?;
        let config = Self::from_yaml_str(&contents)?;
        info!("Configuration loaded successfully");
        Ok(config)
    }

    /// Finds `config.yaml` starting from the current directory and loads it.
    pub fn load_default() -> Result<Self> {
        let cwd = std::env::current_dir().map_err(|e| {
            Error::configuration(format!("cannot determine current directory: {}", e))
        })?;
        let path = find_config_file(&cwd)?;
        Self::load(&path)
    }
}

/// Looks for `config.yaml` in `start`, then in its parent directory.
pub fn find_config_file(start: &Path) -> Result<PathBuf> {
    let candidates = std::iter::once(start).chain(start.parent());
    for dir in candidates {
        let candidate = dir.join(CONFIG_FILE_NAME);
        debug!("Looking for configuration at {}", candidate.display());
        if candidate.is_file() {
            return Ok(candidate);
        }
    }
    Err(Error::configuration(format!(
        "{} not found in {} or its parent directory",
        CONFIG_FILE_NAME,
        start.display()
    )))
}

fn validate_workspace_fields(workspace: &mut Mapping) -> Result<()> {
    for (field, kind) in REQUIRED_FIELDS {
        let value = workspace.get(*field).ok_or_else(|| {
            Error::configuration(format!(
                "missing required field '{}' in workspace config",
                field
            ))
        })?;
        check_kind(field, *kind, value)?;
    }

    for (field, kind) in OPTIONAL_FIELDS {
        // An empty YAML key (`catalog:`) means "use the default".
        if workspace.get(*field).is_some_and(Value::is_null) {
            workspace.remove(*field);
            continue;
        }
        if let Some(value) = workspace.get(*field) {
            check_kind(field, *kind, value)?;
        }
    }
    Ok(())
}

fn check_kind(field: &str, kind: FieldKind, value: &Value) -> Result<()> {
    if kind.matches(value) {
        Ok(())
    } else {
        Err(Error::configuration(format!(
            "field '{}' has incorrect type: expected {}",
            field,
            kind.name()
        )))
    }
}
