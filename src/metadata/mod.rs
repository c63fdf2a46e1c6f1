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

//! Workspace metadata behind the tool surface.
//!
//! This module fetches table, schema and job information from a workspace
//! through an established [`GatewayConnection`](crate::connection::GatewayConnection).
//!
//! ## Module Structure
//!
//! - `types`: Data structures returned to tool callers
//! - `service`: Table sampling and catalog lookups
//! - `jobs`: Job run selection and output formatting
//! - `persist`: On-disk copies of sampled tables

mod jobs;
pub mod persist;
pub mod service;
pub mod types;

pub use persist::SampleStore;
pub use service::{MetadataFetcher, SampleOptions};
pub use types::{ColumnMetadata, SchemaMetadata, TableMetadata, TableSummary};
