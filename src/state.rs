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

//! # Halo State Store Module
//!
//! Per-plugin durable key/value persistence behind a pluggable backend.
//!
//! Values are structured JSON; entries are namespaced by plugin id. A
//! plugin never sees the store itself; it receives a [`HaloStateHandle`]
//! pre-bound to its own identifier, so cross-plugin state access is
//! structurally impossible rather than policy-enforced. Missing-key reads
//! return the caller-supplied default instead of failing.

use std::collections::BTreeMap;
use std::fmt;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use serde_json::Value;

use crate::errors::{HaloError, Result};

/// Three-operation persistence contract every backend implements.
pub trait HaloStateBackend: Send + Sync + fmt::Debug {
    fn save(&self, plugin_id: &str, key: &str, value: &Value) -> Result<()>;
    fn load(&self, plugin_id: &str, key: &str) -> Result<Option<Value>>;
    /// Returns whether the key existed.
    fn delete(&self, plugin_id: &str, key: &str) -> Result<bool>;
}

/// Volatile in-process backend.
#[derive(Debug, Default)]
pub struct HaloMemoryStateBackend {
    entries: Mutex<BTreeMap<(String, String), Value>>,
}

impl HaloMemoryStateBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, BTreeMap<(String, String), Value>> {
        match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl HaloStateBackend for HaloMemoryStateBackend {
    fn save(&self, plugin_id: &str, key: &str, value: &Value) -> Result<()> {
        self.entries()
            .insert((plugin_id.to_string(), key.to_string()), value.clone());
        Ok(())
    }

    fn load(&self, plugin_id: &str, key: &str) -> Result<Option<Value>> {
        Ok(self
            .entries()
            .get(&(plugin_id.to_string(), key.to_string()))
            .cloned())
    }

    fn delete(&self, plugin_id: &str, key: &str) -> Result<bool> {
        Ok(self
            .entries()
            .remove(&(plugin_id.to_string(), key.to_string()))
            .is_some())
    }
}

/// Encode a plugin id or key as one safe path component. Alphanumerics,
/// dots, and dashes pass through; every other character is escaped as
/// `_xx` per UTF-8 byte. Underscore introduces an escape and is escaped
/// itself, so distinct inputs never collide on disk. Dot-only components
/// (`"."`, `".."`) are escaped entirely, keeping every entry strictly
/// inside the backend root.
fn sanitize(component: &str) -> String {
    if component.is_empty() {
        return "_".to_string();
    }
    let escape_all = component.chars().all(|c| c == '.');
    let mut sanitized = String::with_capacity(component.len());
    for c in component.chars() {
        if !escape_all && (c.is_ascii_alphanumeric() || c == '.' || c == '-') {
            sanitized.push(c);
        } else {
            let mut buf = [0u8; 4];
            for byte in c.encode_utf8(&mut buf).as_bytes() {
                sanitized.push_str(&format!("_{:02x}", byte));
            }
        }
    }
    sanitized
}

/// File backend: one directory per plugin, one pretty-printed JSON file
/// per key, written atomically (temp file + rename).
#[derive(Debug)]
pub struct HaloFileStateBackend {
    root: PathBuf,
}

impl HaloFileStateBackend {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        HaloFileStateBackend { root: root.into() }
    }

    fn entry_path(&self, plugin_id: &str, key: &str) -> PathBuf {
        self.root
            .join(sanitize(plugin_id))
            .join(format!("{}.json", sanitize(key)))
    }
}

impl HaloStateBackend for HaloFileStateBackend {
    fn save(&self, plugin_id: &str, key: &str, value: &Value) -> Result<()> {
        let path = self.entry_path(plugin_id, key);
        let dir = path
            .parent()
            .ok_or_else(|| HaloError::state(plugin_id, "state path has no parent directory"))?;
        fs::create_dir_all(dir)
            .map_err(|e| HaloError::state(plugin_id, format!("create {}: {}", dir.display(), e)))?;

        let tmp = path.with_extension("json.tmp");
        let file = File::create(&tmp)
            .map_err(|e| HaloError::state(plugin_id, format!("create {}: {}", tmp.display(), e)))?;
        serde_json::to_writer_pretty(BufWriter::new(file), value)
            .map_err(|e| HaloError::state(plugin_id, format!("serialize '{}': {}", key, e)))?;
        fs::rename(&tmp, &path)
            .map_err(|e| HaloError::state(plugin_id, format!("commit '{}': {}", key, e)))?;
        Ok(())
    }

    fn load(&self, plugin_id: &str, key: &str) -> Result<Option<Value>> {
        let path = self.entry_path(plugin_id, key);
        if !path.is_file() {
            return Ok(None);
        }
        let file = File::open(&path)
            .map_err(|e| HaloError::state(plugin_id, format!("open {}: {}", path.display(), e)))?;
        let value = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| HaloError::state(plugin_id, format!("parse '{}': {}", key, e)))?;
        Ok(Some(value))
    }

    fn delete(&self, plugin_id: &str, key: &str) -> Result<bool> {
        let path = self.entry_path(plugin_id, key);
        if !path.is_file() {
            return Ok(false);
        }
        fs::remove_file(&path)
            .map_err(|e| HaloError::state(plugin_id, format!("delete '{}': {}", key, e)))?;
        Ok(true)
    }
}

/// Namespaced store over one backend.
#[derive(Clone, Debug)]
pub struct HaloStateStore {
    backend: Arc<dyn HaloStateBackend>,
}

impl HaloStateStore {
    pub fn new(backend: Arc<dyn HaloStateBackend>) -> Self {
        HaloStateStore { backend }
    }

    pub fn save(&self, plugin_id: &str, key: &str, value: &Value) -> Result<()> {
        log::debug!(
            "state.save: persisting entry - plugin={}, key={}",
            plugin_id,
            key
        );
        self.backend.save(plugin_id, key, value)
    }

    /// Load a key, falling back to `default` when it is absent.
    pub fn load(&self, plugin_id: &str, key: &str, default: Value) -> Result<Value> {
        Ok(self.backend.load(plugin_id, key)?.unwrap_or(default))
    }

    pub fn delete(&self, plugin_id: &str, key: &str) -> Result<bool> {
        log::debug!(
            "state.delete: removing entry - plugin={}, key={}",
            plugin_id,
            key
        );
        self.backend.delete(plugin_id, key)
    }

    /// Create the per-plugin handle injected into plugin instances.
    pub fn handle_for(&self, plugin_id: impl Into<String>) -> HaloStateHandle {
        HaloStateHandle {
            store: self.clone(),
            plugin_id: plugin_id.into(),
        }
    }
}

/// State operations pre-bound to one plugin id. This is the only
/// persistence interface a plugin instance ever receives.
#[derive(Clone, Debug)]
pub struct HaloStateHandle {
    store: HaloStateStore,
    plugin_id: String,
}

impl HaloStateHandle {
    pub fn plugin_id(&self) -> &str {
        &self.plugin_id
    }

    pub fn save(&self, key: &str, value: &Value) -> Result<()> {
        self.store.save(&self.plugin_id, key, value)
    }

    pub fn load(&self, key: &str, default: Value) -> Result<Value> {
        self.store.load(&self.plugin_id, key, default)
    }

    pub fn delete(&self, key: &str) -> Result<bool> {
        self.store.delete(&self.plugin_id, key)
    }
}
