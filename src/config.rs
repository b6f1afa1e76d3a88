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

//! # Halo Runtime Configuration
//!
//! Declarative runtime settings, loadable from a YAML document. Every
//! field has a default, so an embedder can start from
//! `HaloRuntimeConfig::default()` and override selectively.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use crate::errors::Result;
use crate::resolver::HaloLibraryVersionPolicy;
use crate::state::{HaloFileStateBackend, HaloMemoryStateBackend, HaloStateBackend};

/// Which state backend the runtime persists plugin state through.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum HaloStateBackendConfig {
    #[default]
    Memory,
    File {
        root: PathBuf,
    },
}

impl HaloStateBackendConfig {
    pub(crate) fn build(&self) -> Arc<dyn HaloStateBackend> {
        match self {
            HaloStateBackendConfig::Memory => Arc::new(HaloMemoryStateBackend::new()),
            HaloStateBackendConfig::File { root } => {
                Arc::new(HaloFileStateBackend::new(root.clone()))
            }
        }
    }
}

/// Top-level runtime settings.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct HaloRuntimeConfig {
    /// Directories scanned for plugin packages, one package per
    /// subdirectory.
    pub plugin_roots: Vec<PathBuf>,
    pub state: HaloStateBackendConfig,
    /// Upper bound on each lifecycle hook, in milliseconds. Unset means
    /// hooks may run unbounded.
    pub hook_timeout_ms: Option<u64>,
    pub library_version_policy: HaloLibraryVersionPolicy,
}

impl Default for HaloRuntimeConfig {
    fn default() -> Self {
        HaloRuntimeConfig {
            plugin_roots: Vec::new(),
            state: HaloStateBackendConfig::default(),
            hook_timeout_ms: Some(5_000),
            library_version_policy: HaloLibraryVersionPolicy::default(),
        }
    }
}

impl HaloRuntimeConfig {
    /// Load settings from a YAML file.
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: HaloRuntimeConfig = serde_yaml::from_str(&text)?;
        log::info!(
            "config.loaded: runtime configuration read - path={}, roots={}",
            path.display(),
            config.plugin_roots.len()
        );
        Ok(config)
    }

    pub fn hook_timeout(&self) -> Option<Duration> {
        self.hook_timeout_ms.map(Duration::from_millis)
    }
}
