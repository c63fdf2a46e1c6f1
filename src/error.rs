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

//! Error types for the Databricks tools.
//!
//! Every fallible operation in the crate returns [`Result`]. The variants
//! follow how far a failure is allowed to travel:
//!
//! - [`Error::Configuration`] and [`Error::Authentication`] abort the client
//!   initialization path and leave no partial state behind.
//! - [`Error::QueryExecution`], [`Error::NotFound`], [`Error::Api`] and
//!   [`Error::InvalidArgument`] are scoped to a single tool invocation.
//! - [`Error::Persistence`] is only ever logged.

use thiserror::Error;

/// Boxed error used as the underlying cause of an authentication failure.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Missing or malformed configuration. Fatal for the process.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Login or token retrieval through the CLI credential helper failed.
    #[error("authentication failed: {message}")]
    Authentication {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    /// A statement reached a non-success terminal state, or the transport
    /// failed while submitting or polling it.
    #[error("query execution failed: {0}")]
    QueryExecution(String),

    /// The requested job, run, task, table or schema does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A caller supplied an empty or malformed argument.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A workspace REST call failed with a non-404 status or a transport error.
    #[error("workspace API error: {message}")]
    Api {
        status: Option<u16>,
        message: String,
    },

    /// Writing the optional sample output failed.
    #[error("failed to persist table data: {0}")]
    Persistence(String),
}

impl Error {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::Authentication {
            message: message.into(),
            source: None,
        }
    }

    pub fn authentication_with_source(
        message: impl Into<String>,
        source: impl Into<BoxError>,
    ) -> Self {
        Self::Authentication {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    pub fn query(message: impl Into<String>) -> Self {
        Self::QueryExecution(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    pub fn api(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    pub fn persistence(message: impl Into<String>) -> Self {
        Self::Persistence(message.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// HTTP-like status classification reported to tool callers.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::NotFound(_) => 404,
            _ => 500,
        }
    }
}
