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

//! # Halo Manifest Store Module
//!
//! Discovery and registry of accepted plugin manifests.
//!
//! Discovery walks each configured root one directory level deep; every
//! subdirectory containing a manifest file is a candidate plugin. Invalid
//! or duplicate-id manifests are rejected with a logged reason and the
//! scan continues; a broken plugin package never aborts discovery.
//! The first accepted manifest for an id wins; later duplicates are
//! dropped.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::errors::{HaloError, Result};
use crate::manifest::{load_manifest_from_file, HaloManifest, MANIFEST_FILE_NAMES};

/// Registry of accepted, immutable plugin manifests.
#[derive(Debug, Default)]
pub struct HaloManifestStore {
    manifests: BTreeMap<String, Arc<HaloManifest>>,
}

impl HaloManifestStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Walk each root one level deep and accept every valid manifest.
    /// Returns the number of manifests accepted by this pass.
    pub fn discover(&mut self, roots: &[PathBuf]) -> usize {
        let mut accepted = 0usize;
        let mut rejected = 0usize;

        for root in roots {
            let entries = match std::fs::read_dir(root) {
                Ok(entries) => entries,
                Err(err) => {
                    log::warn!(
                        "store.root.unreadable: skipping plugin root - root={}, error={}",
                        root.display(),
                        err
                    );
                    continue;
                }
            };

            for entry in entries.flatten() {
                let dir = entry.path();
                if !dir.is_dir() {
                    continue;
                }
                match self.load_plugin_dir(&dir) {
                    Ok(true) => accepted += 1,
                    Ok(false) => {}
                    Err(err) => {
                        rejected += 1;
                        log::warn!(
                            "store.manifest.rejected: manifest excluded, scan continues - dir={}, error={}",
                            dir.display(),
                            err
                        );
                    }
                }
            }
        }

        log::info!(
            "store.discover: discovery pass finished - roots={}, accepted={}, rejected={}, total={}",
            roots.len(),
            accepted,
            rejected,
            self.manifests.len()
        );
        accepted
    }

    /// Load the manifest inside one plugin directory. `Ok(false)` means
    /// the directory carries no manifest file or lost a duplicate-id race.
    fn load_plugin_dir(&mut self, dir: &Path) -> Result<bool> {
        let manifest_path = MANIFEST_FILE_NAMES
            .iter()
            .map(|name| dir.join(name))
            .find(|p| p.is_file());

        let manifest_path = match manifest_path {
            Some(p) => p,
            None => {
                log::debug!(
                    "store.manifest.absent: directory has no manifest file - dir={}",
                    dir.display()
                );
                return Ok(false);
            }
        };

        let manifest = load_manifest_from_file(&manifest_path)?;
        let id = manifest.id.clone();
        let version = manifest.version.to_string();

        if let Some(existing) = self.manifests.get(&id) {
            log::warn!(
                "store.manifest.duplicate: first-discovered manifest wins, later one dropped - plugin={}, kept_version={}, dropped_version={}, dir={}",
                id,
                existing.version,
                version,
                dir.display()
            );
            return Ok(false);
        }

        log::info!(
            "store.manifest.accepted: manifest registered - plugin={}, version={}, entry_point={}, actions={}, dir={}",
            id,
            version,
            manifest.entry_point,
            manifest.actions.len(),
            dir.display()
        );
        self.manifests.insert(id, Arc::new(manifest));
        Ok(true)
    }

    /// Manually register a manifest, bypassing the filesystem walk.
    ///
    /// This is primarily intended for tests and for embedding the runtime
    /// inside applications that construct manifests programmatically. The
    /// duplicate rule is the same as for discovery.
    pub fn insert(&mut self, manifest: HaloManifest) -> Result<()> {
        if self.manifests.contains_key(&manifest.id) {
            return Err(HaloError::manifest(
                manifest.id,
                "a manifest with this id is already registered",
            ));
        }
        self.manifests
            .insert(manifest.id.clone(), Arc::new(manifest));
        Ok(())
    }

    /// Remove a manifest, used by explicit unload.
    pub fn remove(&mut self, id: &str) -> Option<Arc<HaloManifest>> {
        self.manifests.remove(id)
    }

    /// Look up an accepted manifest by id. Disabled manifests remain
    /// visible here for introspection.
    pub fn get(&self, id: &str) -> Option<Arc<HaloManifest>> {
        self.manifests.get(id).cloned()
    }

    /// All accepted manifests, optionally including disabled ones.
    pub fn all(&self, include_disabled: bool) -> Vec<Arc<HaloManifest>> {
        self.manifests
            .values()
            .filter(|m| include_disabled || m.enabled)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.manifests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.manifests.is_empty()
    }
}
