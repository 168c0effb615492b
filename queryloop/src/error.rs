// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Error types for query loop execution
//!
//! None of these escape a render pass: the session converts every failure
//! into an empty result and keeps rendering the rest of the tree.

use crate::types::{InstanceId, ObjectType};
use thiserror::Error;

/// Result type alias for query loop operations
pub type Result<T> = std::result::Result<T, QueryError>;

/// Main error type for query loop operations
#[derive(Error, Debug)]
pub enum QueryError {
    /// Malformed or disallowed query specification
    #[error("Invalid query specification: {0}")]
    Spec(String),

    /// Provider execution failure
    #[error("Backend '{provider}' failed: {message}")]
    Backend { provider: String, message: String },

    /// Query script evaluation failure
    #[error("Query script error: {0}")]
    Script(String),

    /// Capability gate refused an operation
    #[error("Capability denied: {0}")]
    CapabilityDenied(String),

    /// Instance was never created or has been destroyed
    #[error("Unknown query instance: {0}")]
    UnknownInstance(InstanceId),

    /// Loop entered twice without leaving
    #[error("Query instance {0} is already looping")]
    AlreadyLooping(InstanceId),

    /// No provider registered for the object type
    #[error("No data provider registered for object type '{0}'")]
    ProviderMissing(ObjectType),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl QueryError {
    pub fn spec(message: impl Into<String>) -> Self {
        QueryError::Spec(message.into())
    }

    pub fn backend(provider: impl Into<String>, message: impl Into<String>) -> Self {
        QueryError::Backend {
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn script(message: impl Into<String>) -> Self {
        QueryError::Script(message.into())
    }
}
