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

//! Logging configuration for the Databricks tools.
//!
//! Initializes a `tracing-subscriber` with file or stderr output. Stdout is
//! never used: it belongs to the tool protocol host.
//!
//! ## Configuration priority
//!
//! 1. `logging.level` / `logging.file` in `config.yaml` (highest)
//! 2. `RUST_LOG` environment variable
//! 3. Default: `warn`
//!
//! ```yaml
//! logging:
//!   level: info
//!   file: .logs/databricks_mcp.log
//! ```

use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::Path;
use std::sync::OnceLock;
use tracing_subscriber::fmt::{time::SystemTime, writer::BoxMakeWriter};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static LOGGING_INITIALIZED: OnceLock<()> = OnceLock::new();

const LOG_TARGET: &str = "databricks_mcp";

/// Logging configuration from the optional `logging` section of the config file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Log level: "OFF", "ERROR", "WARN", "INFO", "DEBUG", "TRACE".
    pub level: Option<String>,
    /// Log file path. If unset, logs go to stderr.
    pub file: Option<String>,
}

impl LogConfig {
    fn is_off(&self) -> bool {
        self.level
            .as_deref()
            .is_some_and(|level| level.eq_ignore_ascii_case("off"))
    }

    fn filter(&self) -> EnvFilter {
        match self.level {
            Some(ref level) => EnvFilter::new(format!("{}={}", LOG_TARGET, level.to_lowercase())),
            None => EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(format!("{}=warn", LOG_TARGET))),
        }
    }

    /// Where events go: the configured file, else stderr.
    fn writer(&self) -> io::Result<BoxMakeWriter> {
        match self.file {
            Some(ref path) => Ok(BoxMakeWriter::new(open_log_file(Path::new(path))?)),
            None => Ok(BoxMakeWriter::new(io::stderr)),
        }
    }
}

/// Opens `path` for appending, creating missing parent directories.
fn open_log_file(path: &Path) -> io::Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}

/// Installs the global subscriber once per process. Later calls are no-ops,
/// as is a level of `OFF`.
pub fn init_logging(config: &LogConfig) {
    LOGGING_INITIALIZED.get_or_init(|| {
        if config.is_off() {
            return;
        }

        let writer = match config.writer() {
            Ok(writer) => writer,
            Err(e) => {
                eprintln!("databricks-mcp: cannot open log file: {}", e);
                return;
            }
        };

        let layer = fmt::layer()
            .with_writer(writer)
            .with_ansi(config.file.is_none())
            .with_timer(SystemTime);

        tracing_subscriber::registry()
            .with(config.filter())
            .with(layer)
            .try_init()
            .ok();
    });
}
