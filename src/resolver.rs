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

//! # Halo Dependency Resolver Module
//!
//! Builds a directed graph over plugin identifiers from declared
//! dependencies, evaluates a per-plugin "dependencies satisfied" verdict,
//! and produces activation and deactivation orderings.
//!
//! ## Semantics
//!
//! - A plugin dependency is met when the target id is among the accepted
//!   manifests and its version satisfies the declared constraint.
//! - A library dependency is met when the runtime's library probe reports
//!   the library present and, if a constraint is given, a satisfying
//!   version. A probe hit without a known version is governed by
//!   [`HaloLibraryVersionPolicy`].
//! - An unmet dependency records a verdict problem; the manifest stays
//!   registered and visible for introspection.
//! - Ordering is a depth-first topological sort. A back-edge found while
//!   a node is still on the visiting stack indicates a cycle; the edge is
//!   skipped with a logged warning and resolution completes with a
//!   best-effort total order. Deactivation order is the exact reverse.
//!
//! The resolver is rebuilt from the accepted manifest set whenever that
//! set changes; its graphs are never mutated in place.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use crate::manifest::HaloManifest;
use crate::version::HaloVersion;

/// Availability of one host library as seen by the probe.
#[derive(Clone, Debug)]
pub enum HaloLibraryStatus {
    Missing,
    Present { version: Option<HaloVersion> },
}

/// Probe for host-provided libraries referenced by manifests.
///
/// The default implementation is a host-supplied table
/// ([`HaloHostLibraries`]); embedders can inject anything that answers
/// "is this library available, and at which version".
pub trait HaloLibraryProbe: Send + Sync {
    fn probe(&self, name: &str) -> HaloLibraryStatus;
}

/// Table-backed library probe populated by the host.
#[derive(Debug, Default)]
pub struct HaloHostLibraries {
    libraries: BTreeMap<String, Option<HaloVersion>>,
}

impl HaloHostLibraries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a library with a known version.
    pub fn insert(&mut self, name: impl Into<String>, version: HaloVersion) {
        self.libraries.insert(name.into(), Some(version));
    }

    /// Register a library whose version cannot be determined.
    pub fn insert_unversioned(&mut self, name: impl Into<String>) {
        self.libraries.insert(name.into(), None);
    }
}

impl HaloLibraryProbe for HaloHostLibraries {
    fn probe(&self, name: &str) -> HaloLibraryStatus {
        match self.libraries.get(name) {
            Some(version) => HaloLibraryStatus::Present {
                version: version.clone(),
            },
            None => HaloLibraryStatus::Missing,
        }
    }
}

/// Policy for a constrained library whose probe succeeds but yields no
/// version. `Strict` treats it as unmet (the historical behavior);
/// `Lenient` logs a warning and counts the dependency as satisfied.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HaloLibraryVersionPolicy {
    #[default]
    Strict,
    Lenient,
}

/// The per-plugin dependency-check result.
#[derive(Clone, Debug, Default)]
pub struct HaloDependencyVerdict {
    pub satisfied: bool,
    pub problems: Vec<String>,
}

/// Immutable dependency graph and verdicts over one accepted manifest set.
#[derive(Debug, Default)]
pub struct HaloDependencyResolver {
    /// plugin id -> declared dependency ids present in the accepted set.
    edges: BTreeMap<String, Vec<String>>,
    verdicts: BTreeMap<String, HaloDependencyVerdict>,
}

impl HaloDependencyResolver {
    /// Run one resolution pass over the accepted manifest set.
    pub fn build(
        manifests: &[Arc<HaloManifest>],
        probe: &dyn HaloLibraryProbe,
        policy: HaloLibraryVersionPolicy,
    ) -> Self {
        let by_id: BTreeMap<&str, &Arc<HaloManifest>> =
            manifests.iter().map(|m| (m.id.as_str(), m)).collect();

        let mut resolver = HaloDependencyResolver::default();

        for manifest in manifests {
            let mut problems = Vec::new();
            let mut deps = Vec::new();

            for dep in &manifest.plugin_dependencies {
                match by_id.get(dep.id.as_str()) {
                    None => {
                        problems.push(format!("plugin dependency '{}' is not registered", dep.id));
                    }
                    Some(target) => {
                        deps.push(dep.id.clone());
                        if let Some(constraint) = &dep.constraint {
                            if !constraint.matches(&target.version) {
                                problems.push(format!(
                                    "plugin dependency '{}' version {} does not satisfy '{}'",
                                    dep.id, target.version, constraint
                                ));
                            }
                        }
                    }
                }
            }

            for lib in &manifest.library_dependencies {
                match probe.probe(&lib.probe) {
                    HaloLibraryStatus::Missing => {
                        problems.push(format!("library '{}' is not available", lib.name));
                    }
                    HaloLibraryStatus::Present { version } => match (&lib.constraint, version) {
                        (Some(constraint), Some(installed)) => {
                            if !constraint.matches(&installed) {
                                problems.push(format!(
                                    "library '{}' version {} does not satisfy '{}'",
                                    lib.name, installed, constraint
                                ));
                            }
                        }
                        (Some(constraint), None) => match policy {
                            HaloLibraryVersionPolicy::Strict => {
                                problems.push(format!(
                                    "library '{}' has no known version to check against '{}'",
                                    lib.name, constraint
                                ));
                            }
                            HaloLibraryVersionPolicy::Lenient => {
                                log::warn!(
                                    "resolver.library.unversioned: constraint not verifiable, accepting under lenient policy - plugin={}, library={}, constraint={}",
                                    manifest.id,
                                    lib.name,
                                    constraint
                                );
                            }
                        },
                        (None, _) => {}
                    },
                }
            }

            let satisfied = problems.is_empty();
            if !satisfied {
                log::debug!(
                    "resolver.verdict.unmet: dependencies not satisfied - plugin={}, problems={:?}",
                    manifest.id,
                    problems
                );
            }
            resolver.edges.insert(manifest.id.clone(), deps);
            resolver.verdicts.insert(
                manifest.id.clone(),
                HaloDependencyVerdict {
                    satisfied,
                    problems,
                },
            );
        }

        resolver
    }

    /// The dependency verdict for one plugin, if it is known to the graph.
    pub fn check(&self, id: &str) -> Option<&HaloDependencyVerdict> {
        self.verdicts.get(id)
    }

    /// Dependency-respecting start order: every dependency appears
    /// strictly before each of its dependents. Cycles are broken at the
    /// offending back-edge with a logged warning, so the order is always
    /// total over the known plugin set.
    pub fn activation_order(&self) -> Vec<String> {
        let mut visited: HashSet<&str> = HashSet::new();
        let mut visiting: HashSet<&str> = HashSet::new();
        let mut order: Vec<String> = Vec::with_capacity(self.edges.len());

        for id in self.edges.keys() {
            self.visit(id, &mut visiting, &mut visited, &mut order);
        }
        order
    }

    /// The exact reverse of [`activation_order`], guaranteeing no plugin
    /// is stopped before its dependents.
    ///
    /// [`activation_order`]: Self::activation_order
    pub fn deactivation_order(&self) -> Vec<String> {
        let mut order = self.activation_order();
        order.reverse();
        order
    }

    fn visit<'a>(
        &'a self,
        id: &'a str,
        visiting: &mut HashSet<&'a str>,
        visited: &mut HashSet<&'a str>,
        order: &mut Vec<String>,
    ) {
        if visited.contains(id) {
            return;
        }
        visiting.insert(id);
        if let Some(deps) = self.edges.get(id) {
            for dep in deps {
                if visited.contains(dep.as_str()) {
                    continue;
                }
                if visiting.contains(dep.as_str()) {
                    log::warn!(
                        "resolver.cycle: dependency cycle detected, breaking back-edge - from={}, to={}",
                        id,
                        dep
                    );
                    continue;
                }
                self.visit(dep, visiting, visited, order);
            }
        }
        visiting.remove(id);
        visited.insert(id);
        order.push(id.to_string());
    }
}
