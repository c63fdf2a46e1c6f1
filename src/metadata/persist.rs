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

//! On-disk copies of sampled tables.
//!
//! ```text
//! .input_data/
//!   <catalog>/<schema>/<table>/
//!     sample_data.json      raw sampled rows
//!     table_metadata.json   metadata with merged sample values
//! ```

use crate::error::{Error, Result};
use crate::metadata::types::TableMetadata;
use crate::statement::Row;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Component, Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

pub const DEFAULT_SAMPLE_ROOT: &str = ".input_data";
pub const SAMPLE_DATA_FILE: &str = "sample_data.json";
pub const TABLE_METADATA_FILE: &str = "table_metadata.json";

/// Writes and reads sampled table data under a root directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleStore {
    root: PathBuf,
    /// Ignore file updated when the root is created. `None` disables it.
    gitignore: Option<PathBuf>,
}

impl Default for SampleStore {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLE_ROOT)
    }
}

impl SampleStore {
    /// Store rooted at `root`, registering it in the `.gitignore` next to it.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let gitignore = match root.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.join(".gitignore"),
            _ => PathBuf::from(".gitignore"),
        };
        Self {
            root,
            gitignore: Some(gitignore),
        }
    }

    pub fn without_gitignore(mut self) -> Self {
        self.gitignore = None;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `<root>/<catalog>/<schema>/<table>`.
    pub fn table_dir(&self, catalog: &str, schema: &str, table: &str) -> Result<PathBuf> {
        let mut dir = self.root.clone();
        for part in [catalog, schema, table] {
            check_component(part)?;
            dir.push(part);
        }
        Ok(dir)
    }

    /// Writes `sample_data.json` and `table_metadata.json` for one table and
    /// returns the table directory.
    pub async fn save(
        &self,
        catalog: &str,
        schema: &str,
        table: &str,
        rows: &[Row],
        metadata: &TableMetadata,
    ) -> Result<PathBuf> {
        let dir = self.table_dir(catalog, schema, table)?;

        if tokio::fs::metadata(&self.root).await.is_err() {
            create_dir(&self.root).await?;
            self.register_ignore().await?;
        }
        create_dir(&dir).await?;

        write_json(&dir.join(SAMPLE_DATA_FILE), &rows).await?;
        write_json(&dir.join(TABLE_METADATA_FILE), metadata).await?;

        info!("Saved table data to {}", dir.display());
        Ok(dir)
    }

    /// Reads back a persisted `table_metadata.json`.
    pub async fn load_table_metadata(
        &self,
        catalog: &str,
        schema: &str,
        table: &str,
    ) -> Result<TableMetadata> {
        let dir = self.table_dir(catalog, schema, table)?;
        read_json(&dir.join(TABLE_METADATA_FILE)).await
    }

    /// Reads back a persisted `sample_data.json`.
    pub async fn load_sample_data(
        &self,
        catalog: &str,
        schema: &str,
        table: &str,
    ) -> Result<Vec<Row>> {
        let dir = self.table_dir(catalog, schema, table)?;
        read_json(&dir.join(SAMPLE_DATA_FILE)).await
    }

    /// Appends the root directory name to the ignore file, creating it if needed.
    async fn register_ignore(&self) -> Result<()> {
        let Some(ref gitignore) = self.gitignore else {
            return Ok(());
        };
        let entry = self
            .root
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| DEFAULT_SAMPLE_ROOT.to_string());

        let existing = tokio::fs::read_to_string(gitignore).await.unwrap_or_default();
        if existing.lines().any(|line| line.trim() == entry) {
            return Ok(());
        }

        let mut line = String::new();
        if !existing.is_empty() && !existing.ends_with('\n') {
            line.push('\n');
        }
        line.push_str(&entry);
        line.push('\n');

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(gitignore)
            .await
            .map_err(|e| io_error("open", gitignore, e))?;
        file.write_all(line.as_bytes())
            .await
            .map_err(|e| io_error("write", gitignore, e))?;
        debug!("Added {} to {}", entry, gitignore.display());
        Ok(())
    }
}

/// Table path parts must be single, normal path components.
fn check_component(part: &str) -> Result<()> {
    let mut components = Path::new(part).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(()),
        _ => Err(Error::persistence(format!(
            "'{}' cannot be used as a directory name",
            part
        ))),
    }
}

async fn create_dir(dir: &Path) -> Result<()> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| io_error("create", dir, e))
}

/// Pretty-printed JSON with four-space indentation.
async fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut serializer).map_err(|e| {
        Error::persistence(format!("failed to serialize {}: {}", path.display(), e))
    })?;
    tokio::fs::write(path, buf)
        .await
        .map_err(|e| io_error("write", path, e))
}

async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| io_error("read", path, e))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| Error::persistence(format!("failed to parse {}: {}", path.display(), e)))
}

fn io_error(action: &str, path: &Path, e: std::io::Error) -> Error {
    Error::persistence(format!("failed to {} {}: {}", action, path.display(), e))
}
