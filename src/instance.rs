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

//! # Halo Instance Module
//!
//! The plugin implementation contract and the instance manager that
//! resolves manifest entry points to constructed instances.
//!
//! ## Plugin Contract
//!
//! A plugin is any type implementing [`HaloPlugin`]: an explicit list of
//! action names it can execute, a `call` dispatcher returning one of the
//! three action shapes, and optional `start`/`stop`/`reload` lifecycle
//! methods (absence means no-op for that phase).
//!
//! ## Action Shapes
//!
//! [`HaloActionOutput`] is the tagged union over the three execution
//! shapes a behavior may take:
//!
//! - `Value`: an immediate, already-computed result
//! - `Pending`: a deferred single result the invoker will await
//! - `Stream`: an open-ended incremental result sequence the caller
//!   pulls lazily
//!
//! ## Entry Points
//!
//! A manifest's `entry_point` is a locator string resolved through the
//! [`HaloEntryPointRegistry`] to a factory closure. The factory receives
//! the injected [`HaloPluginContext`] (identity, configuration, progress
//! sink, pre-bound state handle) and constructs the instance. Instances
//! are cached: at most one exists per plugin id, even under concurrent
//! first access.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::stream::BoxStream;
use futures::{FutureExt, Stream, StreamExt};
use serde_json::Value;
use tokio::sync::Mutex;

use crate::errors::{HaloError, Result};
use crate::manifest::HaloManifest;
use crate::progress::{HaloProgressEvent, HaloProgressSink};
use crate::state::{HaloStateHandle, HaloStateStore};
use crate::version::HaloVersion;

/// The three execution shapes an action behavior may produce.
pub enum HaloActionOutput {
    /// An immediate terminal value.
    Value(Value),
    /// A deferred single result.
    Pending(BoxFuture<'static, Result<Value>>),
    /// An incremental result sequence, pulled by the consumer.
    Stream(BoxStream<'static, Result<Value>>),
}

impl HaloActionOutput {
    pub fn value(value: Value) -> Self {
        HaloActionOutput::Value(value)
    }

    pub fn pending<F>(future: F) -> Self
    where
        F: Future<Output = Result<Value>> + Send + 'static,
    {
        HaloActionOutput::Pending(future.boxed())
    }

    pub fn stream<S>(stream: S) -> Self
    where
        S: Stream<Item = Result<Value>> + Send + 'static,
    {
        HaloActionOutput::Stream(stream.boxed())
    }
}

impl fmt::Debug for HaloActionOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HaloActionOutput::Value(v) => f.debug_tuple("Value").field(v).finish(),
            HaloActionOutput::Pending(_) => f.write_str("Pending(..)"),
            HaloActionOutput::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

/// Collaborators injected into a plugin instance at construction time.
#[derive(Clone)]
pub struct HaloPluginContext {
    pub plugin_id: String,
    pub version: HaloVersion,
    /// The manifest's default configuration block.
    pub configuration: Value,
    pub progress: Arc<dyn HaloProgressSink>,
    /// State persistence pre-bound to this plugin's identifier.
    pub state: HaloStateHandle,
}

impl HaloPluginContext {
    /// Convenience wrapper for emitting a progress report.
    pub fn report_progress(
        &self,
        action: &str,
        current: u64,
        total: Option<u64>,
        message: impl Into<String>,
        extra: Value,
    ) {
        self.progress.report(HaloProgressEvent {
            plugin_id: self.plugin_id.clone(),
            action: action.to_string(),
            current,
            total,
            message: message.into(),
            extra,
        });
    }
}

impl fmt::Debug for HaloPluginContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HaloPluginContext")
            .field("plugin_id", &self.plugin_id)
            .field("version", &self.version)
            .finish()
    }
}

/// Contract every plugin implementation fulfills.
#[async_trait]
pub trait HaloPlugin: Send + Sync {
    /// Names of the actions this instance can execute. The invoker
    /// consults this capability list before dispatching.
    fn actions(&self) -> Vec<String> {
        Vec::new()
    }

    /// Execute a named action. Only called for names returned by
    /// [`actions`](Self::actions).
    fn call(&self, action: &str, _args: &Value) -> Result<HaloActionOutput> {
        Err(HaloError::internal(format!(
            "action '{}' dispatched to a plugin without a call handler",
            action
        )))
    }

    /// Optional start behavior, run while the plugin transitions to
    /// Active. May suspend on IO.
    async fn start(&self) -> Result<()> {
        Ok(())
    }

    /// Optional stop behavior.
    async fn stop(&self) -> Result<()> {
        Ok(())
    }

    /// Optional reload behavior, run on the old instance before it is
    /// discarded.
    async fn reload(&self) -> Result<()> {
        Ok(())
    }
}

/// Factory closure resolving an entry-point locator to an instance.
pub type HaloPluginFactory =
    Arc<dyn Fn(HaloPluginContext) -> Result<Arc<dyn HaloPlugin>> + Send + Sync>;

/// Registry mapping entry-point locator strings to factories.
#[derive(Default)]
pub struct HaloEntryPointRegistry {
    inner: RwLock<HashMap<String, HaloPluginFactory>>,
}

impl HaloEntryPointRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, locator: &str, factory: HaloPluginFactory) {
        let mut inner = match self.inner.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        inner.insert(locator.to_string(), factory);
    }

    fn get(&self, locator: &str) -> Option<HaloPluginFactory> {
        let inner = match self.inner.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        inner.get(locator).cloned()
    }
}

impl fmt::Debug for HaloEntryPointRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("HaloEntryPointRegistry")
    }
}

/// Resolves entry points and caches one instance per plugin id.
pub struct HaloInstanceManager {
    entry_points: HaloEntryPointRegistry,
    instances: Mutex<HashMap<String, Arc<dyn HaloPlugin>>>,
    state: HaloStateStore,
    progress: Arc<dyn HaloProgressSink>,
}

impl HaloInstanceManager {
    pub fn new(state: HaloStateStore, progress: Arc<dyn HaloProgressSink>) -> Self {
        HaloInstanceManager {
            entry_points: HaloEntryPointRegistry::new(),
            instances: Mutex::new(HashMap::new()),
            state,
            progress,
        }
    }

    /// Register the factory backing an entry-point locator. Must happen
    /// before any plugin using that locator is started.
    pub fn register_entry_point(&self, locator: &str, factory: HaloPluginFactory) {
        self.entry_points.register(locator, factory);
    }

    /// The cached instance, if one has been constructed.
    pub async fn get(&self, plugin_id: &str) -> Option<Arc<dyn HaloPlugin>> {
        self.instances.lock().await.get(plugin_id).cloned()
    }

    /// Return the cached instance or construct it. The cache lock is held
    /// across instantiation, so concurrent first access still constructs
    /// exactly once.
    pub async fn get_or_create(&self, manifest: &HaloManifest) -> Result<Arc<dyn HaloPlugin>> {
        let mut instances = self.instances.lock().await;
        if let Some(instance) = instances.get(&manifest.id) {
            return Ok(instance.clone());
        }

        let factory = self.entry_points.get(&manifest.entry_point).ok_or_else(|| {
            HaloError::lifecycle(
                &manifest.id,
                format!(
                    "no factory registered for entry point '{}'",
                    manifest.entry_point
                ),
            )
        })?;

        let context = HaloPluginContext {
            plugin_id: manifest.id.clone(),
            version: manifest.version.clone(),
            configuration: manifest.configuration.clone(),
            progress: self.progress.clone(),
            state: self.state.handle_for(&manifest.id),
        };

        let instance = factory(context).map_err(|e| {
            HaloError::lifecycle(&manifest.id, format!("instantiation failed: {}", e))
        })?;

        log::info!(
            "instance.created: plugin instantiated - plugin={}, version={}, entry_point={}",
            manifest.id,
            manifest.version,
            manifest.entry_point
        );
        instances.insert(manifest.id.clone(), instance.clone());
        Ok(instance)
    }

    /// Drop the cached instance so the next start constructs a fresh one.
    pub async fn evict(&self, plugin_id: &str) {
        if self.instances.lock().await.remove(plugin_id).is_some() {
            log::debug!(
                "instance.evicted: cached instance dropped - plugin={}",
                plugin_id
            );
        }
    }
}

impl fmt::Debug for HaloInstanceManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("HaloInstanceManager")
    }
}
