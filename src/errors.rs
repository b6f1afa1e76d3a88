//! Copyright © 2025-2026 Wenze Wei. All Rights Reserved.
//!
//! This file is part of Halo.
//! The Halo project belongs to the Dunimd Team.
//!
//! Licensed under the Apache License, Version 2.0 (the "License");
//! You may not use this file except in compliance with the License.
//! You may obtain a copy of the License at
//!
//!     http://www.apache.org/licenses/LICENSE-2.0
//!
//! Unless required by applicable law or agreed to in writing, software
//! distributed under the License is distributed on an "AS IS" BASIS,
//! WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//! See the License for the specific language governing permissions and
//! limitations under the License.

//! # Halo Error Module
//!
//! This module defines the error types and utilities used throughout the
//! Halo runtime for consistent error handling and reporting.
//!
//! ## Error Handling Philosophy
//!
//! Halo uses a structured error approach with the following principles:
//!
//! - **Explicit Error Types**: Each error variant represents a specific
//!   category of failure, so callers can distinguish "wrong call" (a
//!   nonexistent action, invalid arguments) from "call failed" (the plugin
//!   behavior raised)
//! - **Context-Rich**: Errors carry the plugin id and, where applicable,
//!   the action name, to aid debugging without a stack trace
//! - **Recoverable**: Manifest problems are recovered during discovery;
//!   everything else is surfaced to the immediate caller
//! - **Serde Support**: Errors can be serialized for logging and
//!   persistence
//!
//! ## Error Categories
//!
//! - **Manifest**: malformed or duplicate plugin manifests (non-fatal to a
//!   discovery scan)
//! - **DependencyUnmet**: a declared plugin or library dependency is
//!   absent or version-incompatible
//! - **Lifecycle**: an operation requested from an illegal state, or a
//!   behavior raised during a transition
//! - **Unavailable**: the plugin id is unknown or not in a usable state
//! - **ArgumentValidation**: action arguments violate the declared schema
//! - **ActionNotImplemented**: the requested action does not exist on the
//!   resolved plugin
//! - **ActionExecution**: the behavior itself raised, including mid-stream
//! - **StatePersistence**: the backing key/value store failed
//! - **Io / Serde / Internal**: infrastructure failures

use std::io;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Convenience result type used throughout Halo.
pub type Result<T> = std::result::Result<T, HaloError>;

/// Canonical error enumeration for the Halo runtime.
#[derive(Debug, Error, Serialize, Deserialize)]
pub enum HaloError {
    /// Malformed, incomplete, or duplicate plugin manifest.
    #[error("manifest error for '{plugin}': {message}")]
    Manifest { plugin: String, message: String },

    /// A declared plugin or host-library dependency is missing or
    /// version-incompatible.
    #[error("unmet dependency for plugin '{plugin}': {message}")]
    DependencyUnmet { plugin: String, message: String },

    /// An operation was requested from an illegal lifecycle state, or a
    /// lifecycle behavior raised during a transition.
    #[error("lifecycle error for plugin '{plugin}': {message}")]
    Lifecycle { plugin: String, message: String },

    /// The plugin id is unknown or the plugin is not in a usable state.
    #[error("plugin '{plugin}' is unavailable: {message}")]
    Unavailable { plugin: String, message: String },

    /// Action arguments failed validation against the declared schema.
    #[error("invalid arguments for action '{action}' on plugin '{plugin}': {message}")]
    ArgumentValidation {
        plugin: String,
        action: String,
        message: String,
    },

    /// The requested action name does not exist on the resolved plugin.
    #[error("action '{action}' is not implemented by plugin '{plugin}'")]
    ActionNotImplemented { plugin: String, action: String },

    /// The action behavior raised during execution, including mid-stream.
    #[error("action '{action}' on plugin '{plugin}' failed: {message}")]
    ActionExecution {
        plugin: String,
        action: String,
        message: String,
    },

    /// The backing state store failed to read, write, or delete a key.
    #[error("state persistence error for plugin '{plugin}': {message}")]
    StatePersistence { plugin: String, message: String },

    /// Errors originating from filesystem IO.
    #[error("io error: {0}")]
    Io(String),

    /// Wrapper for serde-style serialization issues.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Catch-all variant for unexpected situations.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<io::Error> for HaloError {
    fn from(err: io::Error) -> Self {
        HaloError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for HaloError {
    fn from(err: serde_json::Error) -> Self {
        HaloError::Serde(err.to_string())
    }
}

impl From<serde_yaml::Error> for HaloError {
    fn from(err: serde_yaml::Error) -> Self {
        HaloError::Serde(err.to_string())
    }
}

impl HaloError {
    /// Helper to construct manifest errors.
    pub fn manifest(plugin: impl Into<String>, message: impl Into<String>) -> Self {
        HaloError::Manifest {
            plugin: plugin.into(),
            message: message.into(),
        }
    }

    /// Helper to construct unmet-dependency errors.
    pub fn dependency_unmet(plugin: impl Into<String>, message: impl Into<String>) -> Self {
        HaloError::DependencyUnmet {
            plugin: plugin.into(),
            message: message.into(),
        }
    }

    /// Helper to construct lifecycle errors.
    pub fn lifecycle(plugin: impl Into<String>, message: impl Into<String>) -> Self {
        HaloError::Lifecycle {
            plugin: plugin.into(),
            message: message.into(),
        }
    }

    /// Helper to construct unavailable errors.
    pub fn unavailable(plugin: impl Into<String>, message: impl Into<String>) -> Self {
        HaloError::Unavailable {
            plugin: plugin.into(),
            message: message.into(),
        }
    }

    /// Helper to construct argument-validation errors.
    pub fn arguments(
        plugin: impl Into<String>,
        action: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        HaloError::ArgumentValidation {
            plugin: plugin.into(),
            action: action.into(),
            message: message.into(),
        }
    }

    /// Helper to construct not-implemented errors.
    pub fn not_implemented(plugin: impl Into<String>, action: impl Into<String>) -> Self {
        HaloError::ActionNotImplemented {
            plugin: plugin.into(),
            action: action.into(),
        }
    }

    /// Helper to construct action-execution errors.
    pub fn action(
        plugin: impl Into<String>,
        action: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        HaloError::ActionExecution {
            plugin: plugin.into(),
            action: action.into(),
            message: message.into(),
        }
    }

    /// Helper to construct state-persistence errors.
    pub fn state(plugin: impl Into<String>, message: impl Into<String>) -> Self {
        HaloError::StatePersistence {
            plugin: plugin.into(),
            message: message.into(),
        }
    }

    /// Helper to construct internal errors.
    pub fn internal(message: impl Into<String>) -> Self {
        HaloError::Internal(message.into())
    }
}
