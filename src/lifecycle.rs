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

//! # Halo Lifecycle Module
//!
//! The authoritative state machine for every registered plugin.
//!
//! ## States
//!
//! `Registered → Initialized → Active ⇄ Inactive`, with
//! `Failed(reason)` reachable from any operation and `Unloaded` as the
//! terminal sink. `Registered` means known but not dependency-checked;
//! `Initialized` means dependency-checked but not started.
//!
//! ## Guarantees
//!
//! - Starting an already-Active plugin is a no-op.
//! - A plugin whose dependencies are unmet cannot start unless `force`
//!   bypasses the gate (a diagnostics affordance, not normal operation).
//! - A plugin cannot stop while another Active plugin depends on it,
//!   unless forced.
//! - Transitions on one plugin are not reentrant: a second concurrent
//!   transition is rejected with a lifecycle error. Transitions on
//!   independent plugins are unordered.
//! - Hooks are best-effort: a hook error or timeout is logged and never
//!   aborts the transition.
//! - Any behavior failure during start/stop/reload marks the record
//!   `Failed(InstantiationError)` and raises a typed lifecycle error.
//!
//! Bulk operations walk a dependency-respecting order and accumulate a
//! per-plugin success/failure map instead of raising.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future::BoxFuture;
use tokio::sync::RwLock;

use crate::errors::{HaloError, Result};
use crate::instance::HaloInstanceManager;
use crate::manifest::HaloManifest;
use crate::resolver::HaloDependencyResolver;

/// Why a plugin record is in the `Failed` state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HaloFailureKind {
    /// A declared plugin or library dependency is absent or incompatible.
    DependencyUnmet,
    /// Instantiation or a lifecycle behavior raised.
    InstantiationError,
}

/// Lifecycle state of one plugin.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HaloPluginState {
    /// Known but not yet dependency-checked.
    Registered,
    /// Dependency-checked, not started.
    Initialized,
    Active,
    Inactive,
    Failed(HaloFailureKind),
    /// Terminal; the record is removed right after entering this state.
    Unloaded,
}

impl fmt::Display for HaloPluginState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HaloPluginState::Registered => write!(f, "registered"),
            HaloPluginState::Initialized => write!(f, "initialized"),
            HaloPluginState::Active => write!(f, "active"),
            HaloPluginState::Inactive => write!(f, "inactive"),
            HaloPluginState::Failed(HaloFailureKind::DependencyUnmet) => {
                write!(f, "failed(dependency-unmet)")
            }
            HaloPluginState::Failed(HaloFailureKind::InstantiationError) => {
                write!(f, "failed(instantiation-error)")
            }
            HaloPluginState::Unloaded => write!(f, "unloaded"),
        }
    }
}

/// Runtime record wrapping one accepted manifest.
#[derive(Clone, Debug)]
pub struct HaloPluginRecord {
    pub manifest: Arc<HaloManifest>,
    pub state: HaloPluginState,
    pub deps_satisfied: bool,
    /// Problems reported by the last resolution pass.
    pub problems: Vec<String>,
    pub last_error: Option<String>,
}

/// Transition points hooks can attach to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HaloHookPoint {
    PreStart,
    PostStart,
    PreStop,
    PostStop,
    PreReload,
    PostReload,
}

impl HaloHookPoint {
    pub fn as_str(&self) -> &'static str {
        match self {
            HaloHookPoint::PreStart => "pre_start",
            HaloHookPoint::PostStart => "post_start",
            HaloHookPoint::PreStop => "pre_stop",
            HaloHookPoint::PostStop => "post_stop",
            HaloHookPoint::PreReload => "pre_reload",
            HaloHookPoint::PostReload => "post_reload",
        }
    }
}

/// Hook callback: receives the plugin id of the transitioning plugin.
pub type HaloHookFn = Arc<dyn Fn(String) -> BoxFuture<'static, Result<()>> + Send + Sync>;

#[derive(Default)]
struct HaloHookRegistry {
    inner: Mutex<HashMap<HaloHookPoint, Vec<(String, HaloHookFn)>>>,
}

impl HaloHookRegistry {
    fn register(&self, point: HaloHookPoint, name: &str, hook: HaloHookFn) {
        let mut inner = match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        inner
            .entry(point)
            .or_default()
            .push((name.to_string(), hook));
    }

    fn hooks(&self, point: HaloHookPoint) -> Vec<(String, HaloHookFn)> {
        let inner = match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        inner.get(&point).cloned().unwrap_or_default()
    }
}

/// Removes the plugin id from the in-transition set when the transition
/// ends, whichever way it ends.
struct HaloTransitionGuard<'a> {
    set: &'a Mutex<HashSet<String>>,
    id: String,
}

impl Drop for HaloTransitionGuard<'_> {
    fn drop(&mut self) {
        let mut set = match self.set.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        set.remove(&self.id);
    }
}

/// Owner of all plugin records and the only mutator of their states.
pub struct HaloLifecycleManager {
    records: RwLock<HashMap<String, HaloPluginRecord>>,
    in_transition: Mutex<HashSet<String>>,
    hooks: HaloHookRegistry,
    hook_timeout: Option<Duration>,
    instances: Arc<HaloInstanceManager>,
}

impl HaloLifecycleManager {
    pub fn new(instances: Arc<HaloInstanceManager>, hook_timeout: Option<Duration>) -> Self {
        HaloLifecycleManager {
            records: RwLock::new(HashMap::new()),
            in_transition: Mutex::new(HashSet::new()),
            hooks: HaloHookRegistry::default(),
            hook_timeout,
            instances,
        }
    }

    /// Attach a named hook to a transition point.
    pub fn register_hook(&self, point: HaloHookPoint, name: &str, hook: HaloHookFn) {
        self.hooks.register(point, name, hook);
    }

    /// Seed or refresh records from a resolution pass. New plugins become
    /// `Initialized` or `Failed(DependencyUnmet)`; plugins already past
    /// that point keep their state but refresh their dependency verdict.
    pub async fn seed(&self, manifests: &[Arc<HaloManifest>], resolver: &HaloDependencyResolver) {
        let mut records = self.records.write().await;
        for manifest in manifests {
            let (satisfied, problems) = match resolver.check(&manifest.id) {
                Some(verdict) => (verdict.satisfied, verdict.problems.clone()),
                None => (false, vec!["not covered by the resolution pass".to_string()]),
            };

            match records.get_mut(&manifest.id) {
                Some(record) => {
                    record.deps_satisfied = satisfied;
                    record.problems = problems.clone();
                    match record.state {
                        HaloPluginState::Registered
                        | HaloPluginState::Initialized
                        | HaloPluginState::Failed(HaloFailureKind::DependencyUnmet) => {
                            record.state = if satisfied {
                                HaloPluginState::Initialized
                            } else {
                                HaloPluginState::Failed(HaloFailureKind::DependencyUnmet)
                            };
                            record.last_error = if satisfied {
                                None
                            } else {
                                Some(problems.join("; "))
                            };
                        }
                        _ => {}
                    }
                }
                None => {
                    let state = if satisfied {
                        HaloPluginState::Initialized
                    } else {
                        HaloPluginState::Failed(HaloFailureKind::DependencyUnmet)
                    };
                    log::info!(
                        "lifecycle.seed: plugin record created - plugin={}, state={}",
                        manifest.id,
                        state
                    );
                    records.insert(
                        manifest.id.clone(),
                        HaloPluginRecord {
                            manifest: manifest.clone(),
                            state,
                            deps_satisfied: satisfied,
                            last_error: if satisfied {
                                None
                            } else {
                                Some(problems.join("; "))
                            },
                            problems,
                        },
                    );
                }
            }
        }
    }

    /// Current state of a plugin, if it is registered.
    pub async fn state(&self, id: &str) -> Option<HaloPluginState> {
        self.records.read().await.get(id).map(|r| r.state)
    }

    /// Snapshot of a plugin record.
    pub async fn record(&self, id: &str) -> Option<HaloPluginRecord> {
        self.records.read().await.get(id).cloned()
    }

    /// Snapshots of all records, ordered by plugin id.
    pub async fn records(&self) -> Vec<HaloPluginRecord> {
        let records = self.records.read().await;
        let mut all: Vec<_> = records.values().cloned().collect();
        all.sort_by(|a, b| a.manifest.id.cmp(&b.manifest.id));
        all
    }

    fn begin_transition(&self, id: &str) -> Result<HaloTransitionGuard<'_>> {
        let mut set = match self.in_transition.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if !set.insert(id.to_string()) {
            return Err(HaloError::lifecycle(
                id,
                "another transition is already in progress",
            ));
        }
        Ok(HaloTransitionGuard {
            set: &self.in_transition,
            id: id.to_string(),
        })
    }

    /// Start a plugin. No-op when already Active. Refuses while the
    /// dependency verdict is unmet unless `force` is set.
    pub async fn start(&self, id: &str, force: bool) -> Result<()> {
        let _guard = self.begin_transition(id)?;
        self.start_locked(id, force).await
    }

    /// Stop a plugin. Refuses while another Active plugin depends on it
    /// unless `force` is set.
    pub async fn stop(&self, id: &str, force: bool) -> Result<()> {
        let _guard = self.begin_transition(id)?;
        self.stop_locked(id, force).await
    }

    /// Reload: stop if Active, run the optional reload behavior, discard
    /// the cached instance, return to Initialized, and restart if it was
    /// Active before.
    pub async fn reload(&self, id: &str) -> Result<()> {
        let _guard = self.begin_transition(id)?;

        let was_active = {
            let records = self.records.read().await;
            let record = records
                .get(id)
                .ok_or_else(|| HaloError::unavailable(id, "not registered"))?;
            match record.state {
                HaloPluginState::Active => true,
                HaloPluginState::Inactive | HaloPluginState::Initialized => false,
                other => {
                    return Err(HaloError::lifecycle(
                        id,
                        format!("cannot reload from state {}", other),
                    ))
                }
            }
        };

        self.run_hooks(HaloHookPoint::PreReload, id).await;

        if was_active {
            // The plugin comes back after the reload, so dependents do
            // not gate this internal stop.
            self.stop_locked(id, true).await?;
        }

        if let Some(instance) = self.instances.get(id).await {
            if let Err(err) = instance.reload().await {
                self.mark_failed(id, HaloFailureKind::InstantiationError, &err.to_string())
                    .await;
                return Err(HaloError::lifecycle(
                    id,
                    format!("reload behavior failed: {}", err),
                ));
            }
        }

        self.instances.evict(id).await;
        self.set_state(id, HaloPluginState::Initialized).await;
        log::info!("lifecycle.reload: plugin reloaded - plugin={}", id);

        if was_active {
            self.start_locked(id, false).await?;
        }

        self.run_hooks(HaloHookPoint::PostReload, id).await;
        Ok(())
    }

    /// Unload: remove the record and cached instance. Refuses while the
    /// plugin is Active or another registered plugin depends on it,
    /// unless `force` is set.
    pub async fn unload(&self, id: &str, force: bool) -> Result<()> {
        let _guard = self.begin_transition(id)?;

        {
            let records = self.records.read().await;
            let record = records
                .get(id)
                .ok_or_else(|| HaloError::unavailable(id, "not registered"))?;
            if record.state == HaloPluginState::Active {
                return Err(HaloError::lifecycle(id, "stop the plugin before unloading"));
            }
            if !force {
                let dependents = declared_dependents(&records, id, false);
                if !dependents.is_empty() {
                    return Err(HaloError::lifecycle(
                        id,
                        format!("still required by: {}", dependents.join(", ")),
                    ));
                }
            }
        }

        self.set_state(id, HaloPluginState::Unloaded).await;
        self.records.write().await.remove(id);
        self.instances.evict(id).await;
        log::info!("lifecycle.unload: plugin unloaded - plugin={}", id);
        Ok(())
    }

    /// Start every plugin in `order`, accumulating per-plugin results.
    /// Stops at the first failure unless `ignore_failures` is set;
    /// partial results are preserved either way.
    pub async fn start_all(
        &self,
        order: &[String],
        force: bool,
        ignore_failures: bool,
    ) -> BTreeMap<String, Result<()>> {
        let mut results = BTreeMap::new();
        for id in order {
            let result = self.start(id, force).await;
            let failed = result.is_err();
            results.insert(id.clone(), result);
            if failed && !ignore_failures {
                log::warn!(
                    "lifecycle.start_all: halting at first failure - plugin={}, started={}",
                    id,
                    results.len() - 1
                );
                break;
            }
        }
        results
    }

    /// Stop every plugin in `order` (the deactivation order), with the
    /// same accumulation semantics as [`start_all`](Self::start_all).
    /// Plugins that are not Active are skipped.
    pub async fn stop_all(
        &self,
        order: &[String],
        force: bool,
        ignore_failures: bool,
    ) -> BTreeMap<String, Result<()>> {
        let mut results = BTreeMap::new();
        for id in order {
            if self.state(id).await != Some(HaloPluginState::Active) {
                continue;
            }
            let result = self.stop(id, force).await;
            let failed = result.is_err();
            results.insert(id.clone(), result);
            if failed && !ignore_failures {
                log::warn!(
                    "lifecycle.stop_all: halting at first failure - plugin={}, stopped={}",
                    id,
                    results.len() - 1
                );
                break;
            }
        }
        results
    }

    async fn start_locked(&self, id: &str, force: bool) -> Result<()> {
        let manifest = {
            let records = self.records.read().await;
            let record = records
                .get(id)
                .ok_or_else(|| HaloError::unavailable(id, "not registered"))?;

            match record.state {
                HaloPluginState::Active => {
                    log::debug!(
                        "lifecycle.start: already active, no-op - plugin={}",
                        id
                    );
                    return Ok(());
                }
                HaloPluginState::Initialized
                | HaloPluginState::Inactive
                | HaloPluginState::Registered => {}
                HaloPluginState::Failed(HaloFailureKind::DependencyUnmet) if force => {
                    log::warn!(
                        "lifecycle.start: dependency gate bypassed - plugin={}, problems={:?}",
                        id,
                        record.problems
                    );
                }
                HaloPluginState::Failed(HaloFailureKind::DependencyUnmet) => {
                    return Err(HaloError::dependency_unmet(
                        id,
                        record.problems.join("; "),
                    ));
                }
                HaloPluginState::Failed(HaloFailureKind::InstantiationError) if force => {}
                HaloPluginState::Failed(HaloFailureKind::InstantiationError) => {
                    return Err(HaloError::lifecycle(
                        id,
                        format!(
                            "previously failed: {}",
                            record.last_error.as_deref().unwrap_or("unknown error")
                        ),
                    ));
                }
                HaloPluginState::Unloaded => {
                    return Err(HaloError::unavailable(id, "unloaded"));
                }
            }

            if !record.deps_satisfied && !force {
                return Err(HaloError::dependency_unmet(id, record.problems.join("; ")));
            }
            record.manifest.clone()
        };

        self.run_hooks(HaloHookPoint::PreStart, id).await;

        let instance = match self.instances.get_or_create(&manifest).await {
            Ok(instance) => instance,
            Err(err) => {
                self.mark_failed(id, HaloFailureKind::InstantiationError, &err.to_string())
                    .await;
                return Err(err);
            }
        };

        if let Err(err) = instance.start().await {
            self.mark_failed(id, HaloFailureKind::InstantiationError, &err.to_string())
                .await;
            return Err(HaloError::lifecycle(
                id,
                format!("start behavior failed: {}", err),
            ));
        }

        self.set_state(id, HaloPluginState::Active).await;
        log::info!(
            "lifecycle.start: plugin active - plugin={}, version={}, forced={}",
            id,
            manifest.version,
            force
        );

        self.run_hooks(HaloHookPoint::PostStart, id).await;
        Ok(())
    }

    async fn stop_locked(&self, id: &str, force: bool) -> Result<()> {
        {
            let records = self.records.read().await;
            let record = records
                .get(id)
                .ok_or_else(|| HaloError::unavailable(id, "not registered"))?;
            if record.state != HaloPluginState::Active {
                return Err(HaloError::lifecycle(
                    id,
                    format!("cannot stop from state {}", record.state),
                ));
            }
            if !force {
                let dependents = declared_dependents(&records, id, true);
                if !dependents.is_empty() {
                    return Err(HaloError::lifecycle(
                        id,
                        format!("in use by active plugins: {}", dependents.join(", ")),
                    ));
                }
            }
        }

        self.run_hooks(HaloHookPoint::PreStop, id).await;

        if let Some(instance) = self.instances.get(id).await {
            if let Err(err) = instance.stop().await {
                self.mark_failed(id, HaloFailureKind::InstantiationError, &err.to_string())
                    .await;
                return Err(HaloError::lifecycle(
                    id,
                    format!("stop behavior failed: {}", err),
                ));
            }
        }

        self.set_state(id, HaloPluginState::Inactive).await;
        log::info!(
            "lifecycle.stop: plugin inactive - plugin={}, forced={}",
            id,
            force
        );

        self.run_hooks(HaloHookPoint::PostStop, id).await;
        Ok(())
    }

    async fn set_state(&self, id: &str, state: HaloPluginState) {
        if let Some(record) = self.records.write().await.get_mut(id) {
            log::debug!(
                "lifecycle.transition: state changed - plugin={}, from={}, to={}",
                id,
                record.state,
                state
            );
            record.state = state;
            if !matches!(state, HaloPluginState::Failed(_)) {
                record.last_error = None;
            }
        }
    }

    async fn mark_failed(&self, id: &str, kind: HaloFailureKind, error: &str) {
        if let Some(record) = self.records.write().await.get_mut(id) {
            record.state = HaloPluginState::Failed(kind);
            record.last_error = Some(error.to_string());
        }
        log::error!(
            "lifecycle.failed: plugin marked failed - plugin={}, kind={:?}, error={}",
            id,
            kind,
            error
        );
    }

    /// Run every hook attached to a point. Errors and timeouts are
    /// logged; the transition proceeds regardless.
    async fn run_hooks(&self, point: HaloHookPoint, id: &str) {
        for (name, hook) in self.hooks.hooks(point) {
            let future = hook(id.to_string());
            let outcome = match self.hook_timeout {
                Some(timeout) => match tokio::time::timeout(timeout, future).await {
                    Ok(result) => result,
                    Err(_) => Err(HaloError::internal(format!(
                        "hook timed out after {:?}",
                        timeout
                    ))),
                },
                None => future.await,
            };
            if let Err(err) = outcome {
                log::warn!(
                    "lifecycle.hook.failed: hook error swallowed - plugin={}, point={}, hook={}, error={}",
                    id,
                    point.as_str(),
                    name,
                    err
                );
            }
        }
    }
}

impl fmt::Debug for HaloLifecycleManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("HaloLifecycleManager")
    }
}

/// Ids of registered plugins declaring a dependency on `id`. With
/// `active_only`, restricts to plugins currently Active.
fn declared_dependents(
    records: &HashMap<String, HaloPluginRecord>,
    id: &str,
    active_only: bool,
) -> Vec<String> {
    let mut dependents: Vec<String> = records
        .values()
        .filter(|r| !active_only || r.state == HaloPluginState::Active)
        .filter(|r| r.manifest.plugin_dependencies.iter().any(|d| d.id == id))
        .map(|r| r.manifest.id.clone())
        .collect();
    dependents.sort();
    dependents
}
