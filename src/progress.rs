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

//! # Halo Progress Module
//!
//! The fire-and-forget progress sink injected into every plugin instance.
//! Plugins report incremental step information through it and must not
//! depend on any return value.

use std::sync::Mutex;

use serde_json::Value;

/// One progress report emitted by a plugin while executing an action.
#[derive(Clone, Debug)]
pub struct HaloProgressEvent {
    pub plugin_id: String,
    pub action: String,
    pub current: u64,
    /// Total step count when known up front.
    pub total: Option<u64>,
    pub message: String,
    pub extra: Value,
}

/// Sink for plugin progress reports. Implementations must tolerate being
/// called from any task and must never fail the caller.
pub trait HaloProgressSink: Send + Sync {
    fn report(&self, event: HaloProgressEvent);
}

/// Default sink: forwards every report to the log.
#[derive(Debug, Default)]
pub struct HaloLogProgressSink;

impl HaloProgressSink for HaloLogProgressSink {
    fn report(&self, event: HaloProgressEvent) {
        match event.total {
            Some(total) => log::info!(
                "progress.report: plugin progress - plugin={}, action={}, step={}/{}, message={}",
                event.plugin_id,
                event.action,
                event.current,
                total,
                event.message
            ),
            None => log::info!(
                "progress.report: plugin progress - plugin={}, action={}, step={}, message={}",
                event.plugin_id,
                event.action,
                event.current,
                event.message
            ),
        }
    }
}

/// Collecting sink for tests and embedders that want to inspect reports.
#[derive(Debug, Default)]
pub struct HaloMemoryProgressSink {
    events: Mutex<Vec<HaloProgressEvent>>,
}

impl HaloMemoryProgressSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<HaloProgressEvent> {
        match self.events.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl HaloProgressSink for HaloMemoryProgressSink {
    fn report(&self, event: HaloProgressEvent) {
        match self.events.lock() {
            Ok(mut guard) => guard.push(event),
            Err(poisoned) => poisoned.into_inner().push(event),
        }
    }
}
