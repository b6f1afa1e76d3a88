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

//! # Halo Runtime
//!
//! The embedder-facing facade over the whole plugin machinery: manifest
//! store, dependency resolver, lifecycle registry, instance manager, and
//! action invoker, wired together behind one handle.
//!
//! Typical flow:
//!
//! ```no_run
//! use std::sync::Arc;
//! use halox::{HaloRuntime, HaloRuntimeConfig};
//!
//! # async fn demo() -> halox::Result<()> {
//! let mut config = HaloRuntimeConfig::default();
//! config.plugin_roots.push("/opt/halo/plugins".into());
//!
//! let runtime = HaloRuntime::new(config);
//! // runtime.register_entry_point("my.locator", factory);
//! runtime.discover().await;
//! runtime.start_all(false, false).await;
//! let outcome = runtime
//!     .invoke("some.plugin", "some_action", serde_json::json!({}))
//!     .await?;
//! # let _ = outcome;
//! # Ok(())
//! # }
//! ```
//!
//! After any change to the accepted manifest set (discovery, manual
//! registration, unload) the resolver is rebuilt and every lifecycle
//! record's dependency verdict refreshed.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::RwLock;

use crate::config::HaloRuntimeConfig;
use crate::errors::Result;
use crate::instance::{HaloInstanceManager, HaloPluginFactory};
use crate::invoker::{HaloActionInvoker, HaloInvokeOutcome};
use crate::lifecycle::{
    HaloHookFn, HaloHookPoint, HaloLifecycleManager, HaloPluginRecord, HaloPluginState,
};
use crate::manifest::HaloManifest;
use crate::progress::{HaloLogProgressSink, HaloProgressSink};
use crate::resolver::{HaloDependencyResolver, HaloHostLibraries, HaloLibraryProbe};
use crate::state::HaloStateStore;
use crate::store::HaloManifestStore;

/// One in-process plugin runtime.
pub struct HaloRuntime {
    config: HaloRuntimeConfig,
    store: RwLock<HaloManifestStore>,
    resolver: RwLock<HaloDependencyResolver>,
    probe: std::sync::RwLock<Arc<dyn HaloLibraryProbe>>,
    instances: Arc<HaloInstanceManager>,
    lifecycle: Arc<HaloLifecycleManager>,
    invoker: HaloActionInvoker,
    state_store: HaloStateStore,
}

impl HaloRuntime {
    /// Build a runtime with the default logging progress sink.
    pub fn new(config: HaloRuntimeConfig) -> Self {
        Self::with_progress(config, Arc::new(HaloLogProgressSink))
    }

    /// Build a runtime with a caller-supplied progress sink.
    pub fn with_progress(config: HaloRuntimeConfig, progress: Arc<dyn HaloProgressSink>) -> Self {
        let state_store = HaloStateStore::new(config.state.build());
        let instances = Arc::new(HaloInstanceManager::new(state_store.clone(), progress));
        let lifecycle = Arc::new(HaloLifecycleManager::new(
            instances.clone(),
            config.hook_timeout(),
        ));
        let invoker = HaloActionInvoker::new(lifecycle.clone(), instances.clone());

        HaloRuntime {
            config,
            store: RwLock::new(HaloManifestStore::new()),
            resolver: RwLock::new(HaloDependencyResolver::default()),
            probe: std::sync::RwLock::new(Arc::new(HaloHostLibraries::new())),
            instances,
            lifecycle,
            invoker,
            state_store,
        }
    }

    /// Register the factory backing an entry-point locator.
    pub fn register_entry_point(&self, locator: &str, factory: HaloPluginFactory) {
        self.instances.register_entry_point(locator, factory);
    }

    /// Attach a named lifecycle hook.
    pub fn register_hook(&self, point: HaloHookPoint, name: &str, hook: HaloHookFn) {
        self.lifecycle.register_hook(point, name, hook);
    }

    /// Replace the library probe consulted during resolution. Takes
    /// effect at the next refresh.
    pub fn set_library_probe(&self, probe: Arc<dyn HaloLibraryProbe>) {
        let mut slot = match self.probe.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *slot = probe;
    }

    /// Scan the configured plugin roots for manifests, then refresh
    /// dependency verdicts. Returns the number of newly accepted
    /// manifests.
    pub async fn discover(&self) -> usize {
        let accepted = self
            .store
            .write()
            .await
            .discover(&self.config.plugin_roots);
        self.refresh().await;
        accepted
    }

    /// Register a manifest directly, bypassing directory discovery.
    pub async fn register_manifest(&self, manifest: HaloManifest) -> Result<()> {
        self.store.write().await.insert(manifest)?;
        self.refresh().await;
        Ok(())
    }

    /// Rebuild the dependency graph over the enabled manifest set and
    /// refresh every lifecycle record's verdict.
    pub async fn refresh(&self) {
        let manifests = self.store.read().await.all(false);
        let probe = match self.probe.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        };
        let resolver = HaloDependencyResolver::build(
            &manifests,
            probe.as_ref(),
            self.config.library_version_policy,
        );
        self.lifecycle.seed(&manifests, &resolver).await;
        *self.resolver.write().await = resolver;
    }

    /// All accepted manifests, ordered by id. Disabled manifests are
    /// included only on request; they never get a lifecycle record.
    pub async fn plugins(&self, include_disabled: bool) -> Vec<Arc<HaloManifest>> {
        self.store.read().await.all(include_disabled)
    }

    /// One accepted manifest by plugin id.
    pub async fn manifest(&self, id: &str) -> Option<Arc<HaloManifest>> {
        self.store.read().await.get(id)
    }

    /// Current lifecycle state of a plugin.
    pub async fn state(&self, id: &str) -> Option<HaloPluginState> {
        self.lifecycle.state(id).await
    }

    /// Full lifecycle record snapshot of a plugin.
    pub async fn record(&self, id: &str) -> Option<HaloPluginRecord> {
        self.lifecycle.record(id).await
    }

    /// Snapshots of every lifecycle record, ordered by plugin id.
    pub async fn records(&self) -> Vec<HaloPluginRecord> {
        self.lifecycle.records().await
    }

    pub async fn start(&self, id: &str, force: bool) -> Result<()> {
        self.lifecycle.start(id, force).await
    }

    pub async fn stop(&self, id: &str, force: bool) -> Result<()> {
        self.lifecycle.stop(id, force).await
    }

    pub async fn reload(&self, id: &str) -> Result<()> {
        self.lifecycle.reload(id).await
    }

    /// Unload a plugin and drop its manifest from the accepted set.
    pub async fn unload(&self, id: &str, force: bool) -> Result<()> {
        self.lifecycle.unload(id, force).await?;
        self.store.write().await.remove(id);
        self.refresh().await;
        Ok(())
    }

    /// Start every registered plugin in dependency order.
    pub async fn start_all(
        &self,
        force: bool,
        ignore_failures: bool,
    ) -> BTreeMap<String, Result<()>> {
        let order = self.resolver.read().await.activation_order();
        self.lifecycle.start_all(&order, force, ignore_failures).await
    }

    /// Stop every Active plugin in reverse dependency order.
    pub async fn stop_all(
        &self,
        force: bool,
        ignore_failures: bool,
    ) -> BTreeMap<String, Result<()>> {
        let order = self.resolver.read().await.deactivation_order();
        self.lifecycle.stop_all(&order, force, ignore_failures).await
    }

    /// Execute an action on an Active plugin.
    pub async fn invoke(
        &self,
        plugin_id: &str,
        action: &str,
        args: Value,
    ) -> Result<HaloInvokeOutcome> {
        self.invoker.invoke(plugin_id, action, args).await
    }

    /// Direct access to the namespaced state store, for embedders that
    /// inspect or migrate plugin state.
    pub fn state_store(&self) -> &HaloStateStore {
        &self.state_store
    }

    pub fn config(&self) -> &HaloRuntimeConfig {
        &self.config
    }
}

impl std::fmt::Debug for HaloRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HaloRuntime")
            .field("config", &self.config)
            .finish()
    }
}
