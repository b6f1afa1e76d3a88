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

//! # Halo Manifest Module
//!
//! Plugin manifest documents and their validation.
//!
//! Every plugin package carries one manifest file (`halo_plugin.yaml`,
//! `halo_plugin.yml`, or `halo_plugin.json`) describing its identity,
//! version, entry point, declared actions, dependencies, and default
//! configuration. Manifests are parsed into raw file structs first and
//! converted into validated runtime types; a manifest is immutable once
//! accepted; edits require a fresh discovery pass.
//!
//! Required keys: `id`, `name`, `version`, `entry_point`. Everything else
//! is optional.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;

use crate::errors::{HaloError, Result};
use crate::version::{HaloVersion, HaloVersionReq};

/// Manifest file names probed inside each plugin directory, in order.
pub const MANIFEST_FILE_NAMES: &[&str] =
    &["halo_plugin.yaml", "halo_plugin.yml", "halo_plugin.json"];

/// Type tag for a declared action parameter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HaloParamKind {
    String,
    Integer,
    Number,
    Boolean,
    Object,
    Array,
    Any,
}

impl HaloParamKind {
    fn parse(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "string" | "str" => Ok(HaloParamKind::String),
            "integer" | "int" => Ok(HaloParamKind::Integer),
            "number" | "float" => Ok(HaloParamKind::Number),
            "boolean" | "bool" => Ok(HaloParamKind::Boolean),
            "object" | "map" => Ok(HaloParamKind::Object),
            "array" | "list" => Ok(HaloParamKind::Array),
            "any" => Ok(HaloParamKind::Any),
            other => Err(HaloError::internal(format!(
                "unknown parameter type: {}",
                other
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HaloParamKind::String => "string",
            HaloParamKind::Integer => "integer",
            HaloParamKind::Number => "number",
            HaloParamKind::Boolean => "boolean",
            HaloParamKind::Object => "object",
            HaloParamKind::Array => "array",
            HaloParamKind::Any => "any",
        }
    }

    /// Whether a JSON value carries this type tag. Integers are accepted
    /// where a number is expected, not the other way around.
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            HaloParamKind::String => value.is_string(),
            HaloParamKind::Integer => value.is_i64() || value.is_u64(),
            HaloParamKind::Number => value.is_number(),
            HaloParamKind::Boolean => value.is_boolean(),
            HaloParamKind::Object => value.is_object(),
            HaloParamKind::Array => value.is_array(),
            HaloParamKind::Any => true,
        }
    }
}

/// One declared parameter of an action.
#[derive(Clone, Debug)]
pub struct HaloParamSpec {
    pub name: String,
    pub kind: HaloParamKind,
    pub required: bool,
    pub default: Option<Value>,
}

/// One declared action of a plugin.
#[derive(Clone, Debug)]
pub struct HaloActionSpec {
    pub name: String,
    pub description: Option<String>,
    /// Whether the action produces an incremental result stream instead of
    /// a single terminal value.
    pub streams_output: bool,
    pub params: Vec<HaloParamSpec>,
}

/// A declared dependency on another plugin.
#[derive(Clone, Debug)]
pub struct HaloPluginDependency {
    pub id: String,
    pub constraint: Option<HaloVersionReq>,
}

/// A declared dependency on a host-provided library, checked through the
/// runtime's library probe.
#[derive(Clone, Debug)]
pub struct HaloLibraryDependency {
    pub name: String,
    pub constraint: Option<HaloVersionReq>,
    /// Name handed to the probe; defaults to `name`.
    pub probe: String,
}

/// A validated, immutable plugin manifest.
#[derive(Clone, Debug)]
pub struct HaloManifest {
    pub id: String,
    pub name: String,
    pub version: HaloVersion,
    pub description: Option<String>,
    pub author: Option<String>,
    pub entry_point: String,
    pub enabled: bool,
    pub actions: Vec<HaloActionSpec>,
    pub plugin_dependencies: Vec<HaloPluginDependency>,
    pub library_dependencies: Vec<HaloLibraryDependency>,
    /// Free-form default configuration block injected into the plugin.
    pub configuration: Value,
}

impl HaloManifest {
    /// Look up a declared action by name.
    pub fn action(&self, name: &str) -> Option<&HaloActionSpec> {
        self.actions.iter().find(|a| a.name == name)
    }
}

#[derive(Debug, Deserialize)]
struct HaloParamSpecFile {
    name: String,
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    required: bool,
    #[serde(default)]
    default: Option<Value>,
}

impl HaloParamSpecFile {
    fn into_runtime(self) -> Result<HaloParamSpec> {
        let kind = match self.kind.as_deref() {
            Some(k) => HaloParamKind::parse(k)?,
            None => HaloParamKind::Any,
        };
        if self.name.trim().is_empty() {
            return Err(HaloError::internal("parameter name must not be empty"));
        }
        Ok(HaloParamSpec {
            name: self.name,
            kind,
            required: self.required,
            default: self.default,
        })
    }
}

#[derive(Debug, Deserialize)]
struct HaloActionSpecFile {
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    streams_output: bool,
    #[serde(default)]
    params: Vec<HaloParamSpecFile>,
}

impl HaloActionSpecFile {
    fn into_runtime(self) -> Result<HaloActionSpec> {
        if self.name.trim().is_empty() {
            return Err(HaloError::internal("action name must not be empty"));
        }
        let params = self
            .params
            .into_iter()
            .map(|p| p.into_runtime())
            .collect::<Result<Vec<_>>>()?;
        Ok(HaloActionSpec {
            name: self.name,
            description: self.description,
            streams_output: self.streams_output,
            params,
        })
    }
}

#[derive(Debug, Deserialize)]
struct HaloLibraryDependencyFile {
    name: String,
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    probe: Option<String>,
}

impl HaloLibraryDependencyFile {
    fn into_runtime(self) -> Result<HaloLibraryDependency> {
        let constraint = match self.version.as_deref() {
            Some(expr) => Some(HaloVersionReq::parse(expr)?),
            None => None,
        };
        let probe = self.probe.unwrap_or_else(|| self.name.clone());
        Ok(HaloLibraryDependency {
            name: self.name,
            constraint,
            probe,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct HaloDependenciesFile {
    /// Plugin id to version constraint expression; an empty expression
    /// means any version.
    plugins: BTreeMap<String, String>,
    libraries: Vec<HaloLibraryDependencyFile>,
}

fn default_enabled() -> bool {
    true
}

#[derive(Debug, Deserialize)]
struct HaloManifestFile {
    id: String,
    name: String,
    version: String,
    entry_point: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    author: Option<String>,
    #[serde(default = "default_enabled")]
    enabled: bool,
    #[serde(default)]
    actions: Vec<HaloActionSpecFile>,
    #[serde(default)]
    dependencies: HaloDependenciesFile,
    #[serde(default)]
    configuration: Value,
}

impl HaloManifestFile {
    fn into_runtime(self) -> Result<HaloManifest> {
        if self.id.trim().is_empty() {
            return Err(HaloError::internal("manifest id must not be empty"));
        }
        if self.name.trim().is_empty() {
            return Err(HaloError::internal("manifest name must not be empty"));
        }
        if self.entry_point.trim().is_empty() {
            return Err(HaloError::internal("manifest entry_point must not be empty"));
        }

        let version = HaloVersion::parse(&self.version)?;

        let mut actions = Vec::with_capacity(self.actions.len());
        for action in self.actions {
            let action = action.into_runtime()?;
            if actions.iter().any(|a: &HaloActionSpec| a.name == action.name) {
                return Err(HaloError::internal(format!(
                    "duplicate action declaration: {}",
                    action.name
                )));
            }
            actions.push(action);
        }

        let plugin_dependencies = self
            .dependencies
            .plugins
            .into_iter()
            .map(|(id, expr)| {
                let constraint = if expr.trim().is_empty() {
                    None
                } else {
                    Some(HaloVersionReq::parse(&expr)?)
                };
                Ok(HaloPluginDependency { id, constraint })
            })
            .collect::<Result<Vec<_>>>()?;

        let library_dependencies = self
            .dependencies
            .libraries
            .into_iter()
            .map(|l| l.into_runtime())
            .collect::<Result<Vec<_>>>()?;

        let configuration = match self.configuration {
            Value::Null => Value::Object(serde_json::Map::new()),
            other => other,
        };

        Ok(HaloManifest {
            id: self.id,
            name: self.name,
            version,
            description: self.description,
            author: self.author,
            entry_point: self.entry_point,
            enabled: self.enabled,
            actions,
            plugin_dependencies,
            library_dependencies,
            configuration,
        })
    }
}

/// Load and validate a manifest from a file. The format is chosen by
/// extension; anything that is not `.json` is parsed as YAML.
pub fn load_manifest_from_file(path: &Path) -> Result<HaloManifest> {
    let text = fs::read_to_string(path)?;
    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let file: HaloManifestFile = if is_json {
        serde_json::from_str(&text)?
    } else {
        serde_yaml::from_str(&text)?
    };
    file.into_runtime()
}
