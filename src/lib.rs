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

//! Databricks workspace tools for Rust
//!
//! This crate lets an AI-agent host inspect a Databricks workspace: list
//! schemas, sample tables, summarize schemas and diagnose job runs.
//!
//! ## Overview
//!
//! - [`DatabricksTools`] - The four tools, typed or dispatched by name
//! - [`ClientManager`] - Lazily authenticated, refreshable workspace connection
//! - [`MetadataFetcher`](metadata::MetadataFetcher) - Catalog lookups, sampling and job runs
//! - [`StatementExecutor`](statement::StatementExecutor) - SQL statement submission and polling
//!
//! ## Features
//!
//! - **OAuth via the Databricks CLI**: tokens are fetched per profile and
//!   refreshed when they expire
//! - **SEA (Statement Execution API)**: inline JSON results, polled once a second
//! - **Unity Catalog and Jobs APIs**: paginated REST listings
//! - **Local sample copies**: optional `.input_data/` snapshots of sampled tables
//!
//! ## Example
//!
//! ```ignore
//! use databricks_mcp::{init_logging, AppConfig, DatabricksTools};
//!
//! let config = AppConfig::load_default()?;
//! init_logging(&config.logging);
//!
//! let tools = DatabricksTools::from_config(config.workspace);
//! let schemas = tools.get_schemas(None).await?;
//! let orders = tools.get_table_sample("main", "sales", "orders").await?;
//! ```
//!
//! ## Configuration
//!
//! `config.yaml`, found in the current directory or its parent:
//!
//! | Key | Default | Description |
//! |-----|---------|-------------|
//! | `workspace.url` | required | Workspace URL |
//! | `workspace.warehouse_id` | required | SQL warehouse for sampling |
//! | `workspace.warehouse_name` | required | Display name of the warehouse |
//! | `workspace.sample_size` | 5 | Rows per table sample |
//! | `workspace.catalog` | none | Default catalog for `get_schemas` |
//! | `workspace.profile` | `mcp_server_for_databricks` | CLI auth profile |
//! | `workspace.wait_timeout` | `30s` | Server-side statement wait |
//! | `workspace.save_table_metadata` | false | Write samples to `.input_data/` |
//! | `workspace.max_poll_seconds` | none | Client-side polling ceiling |
//! | `logging.level` | `RUST_LOG`, else `warn` | Log filter |
//! | `logging.file` | stderr | Log file path |

pub mod auth;
pub mod client;
pub mod config;
pub mod connection;
pub mod error;
pub mod logging;
pub mod manager;
pub mod metadata;
pub mod statement;
pub mod tools;
pub mod types;

// Re-export main types
pub use config::{AppConfig, WorkspaceConfig};
pub use error::{Error, Result};
pub use logging::{init_logging, LogConfig};
pub use manager::{ClientManager, ClientStatus};
pub use tools::{DatabricksTools, ToolDefinition, ToolError};

// Re-export client types for advanced users
pub use client::{DatabricksHttpClient, HttpClientConfig, WorkspaceGateway};
