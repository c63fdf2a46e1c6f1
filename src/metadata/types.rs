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

//! Data structures returned by the metadata tools.
//!
//! These are the shapes handed back to tool callers and written to
//! `table_metadata.json`. Fields the workspace did not report are `null`.

use crate::statement::Row;
use crate::types::catalog::{CatalogColumn, TableInfo};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Detailed table metadata, optionally enriched with sampled column values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableMetadata {
    pub name: String,
    pub catalog_name: Option<String>,
    pub schema_name: Option<String>,
    /// e.g. "MANAGED", "EXTERNAL", "VIEW".
    pub table_type: Option<String>,
    /// e.g. "DELTA", "PARQUET".
    pub data_source_format: Option<String>,
    #[serde(default)]
    pub columns: Vec<ColumnMetadata>,
    pub comment: Option<String>,
    pub properties: Option<BTreeMap<String, String>>,
    pub storage_location: Option<String>,
    pub view_definition: Option<String>,
    pub table_id: Option<String>,
    /// Milliseconds since the epoch.
    pub created_at: Option<i64>,
    pub updated_at: Option<i64>,
    pub deleted_at: Option<i64>,
    pub row_filter: Option<Value>,
    pub owner: Option<String>,
}

/// One column of a [`TableMetadata`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnMetadata {
    pub name: String,
    pub type_name: Option<String>,
    pub comment: Option<String>,
    pub nullable: Option<bool>,
    pub partition_index: Option<i32>,
    pub mask: Option<Value>,
    /// Values of this column across the sampled rows, in row order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_values: Option<Vec<Value>>,
}

impl From<CatalogColumn> for ColumnMetadata {
    fn from(column: CatalogColumn) -> Self {
        Self {
            name: column.name,
            type_name: column.type_name,
            comment: column.comment,
            nullable: column.nullable,
            partition_index: column.partition_index,
            mask: column.mask,
            sample_values: None,
        }
    }
}

impl From<TableInfo> for TableMetadata {
    fn from(table: TableInfo) -> Self {
        Self {
            name: table.name,
            catalog_name: table.catalog_name,
            schema_name: table.schema_name,
            table_type: table.table_type,
            data_source_format: table.data_source_format,
            columns: table.columns.into_iter().map(ColumnMetadata::from).collect(),
            comment: table.comment,
            properties: table.properties,
            storage_location: table.storage_location,
            view_definition: table.view_definition,
            table_id: table.table_id,
            created_at: table.created_at,
            updated_at: table.updated_at,
            deleted_at: table.deleted_at,
            row_filter: table.row_filter,
            owner: table.owner,
        }
    }
}

impl TableMetadata {
    /// Attaches sampled values to each column.
    ///
    /// For every column, `sample_values` holds the value from each row that
    /// has that column, in row order; rows missing the key are skipped. A
    /// column with no sampled values keeps `sample_values` unset, as do all
    /// columns when `rows` is empty.
    pub fn merge_samples(&mut self, rows: &[Row]) {
        if rows.is_empty() {
            return;
        }
        for column in &mut self.columns {
            let values: Vec<Value> = rows
                .iter()
                .filter_map(|row| row.get(&column.name).cloned())
                .collect();
            column.sample_values = if values.is_empty() {
                None
            } else {
                Some(values)
            };
        }
    }

    pub fn column(&self, name: &str) -> Option<&ColumnMetadata> {
        self.columns.iter().find(|c| c.name == name)
    }
}

/// Summary of a schema and the tables in it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaMetadata {
    pub schema_comment: Option<String>,
    /// Table name to summary, ordered by name.
    pub tables: BTreeMap<String, TableSummary>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableSummary {
    pub comment: Option<String>,
    pub created_at: Option<i64>,
    pub table_type: Option<String>,
    pub owner: Option<String>,
}

impl From<&TableInfo> for TableSummary {
    fn from(table: &TableInfo) -> Self {
        Self {
            comment: table.comment.clone(),
            created_at: table.created_at,
            table_type: table.table_type.clone(),
            owner: table.owner.clone(),
        }
    }
}
