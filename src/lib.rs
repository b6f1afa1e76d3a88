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

//! # Halo Core Library
//!
//! Halo is an in-process plugin runtime: it discovers plugin manifests,
//! resolves their declared dependencies, drives each plugin through an
//! explicit lifecycle, and executes plugin actions through one uniform
//! invocation surface.
//!
//! ## Module Overview
//!
//! - **manifest**: Manifest documents, validation, and action/parameter
//!   declarations
//! - **store**: Filesystem discovery and the accepted-manifest registry
//! - **version**: Version values and version constraint expressions
//! - **resolver**: Dependency graph, per-plugin verdicts, activation and
//!   deactivation orderings
//! - **lifecycle**: The plugin state machine, transition hooks, and bulk
//!   start/stop
//! - **instance**: The `HaloPlugin` contract, entry-point factories, and
//!   the one-instance-per-plugin cache
//! - **invoker**: Uniform action dispatch over immediate, deferred, and
//!   streaming result shapes
//! - **state**: Per-plugin namespaced key/value persistence with
//!   pluggable backends
//! - **progress**: Fire-and-forget progress reporting from running
//!   actions
//! - **config**: Declarative runtime settings
//! - **runtime**: The embedder-facing facade wiring it all together
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use halox::{HaloRuntime, HaloRuntimeConfig};
//!
//! # async fn demo() -> halox::Result<()> {
//! let runtime = HaloRuntime::new(HaloRuntimeConfig::default());
//! runtime.discover().await;
//! runtime.start_all(false, false).await;
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! All operations return `Result<T, HaloError>`. Each variant carries the
//! plugin (and, where relevant, action) it concerns, so callers can react
//! per failure class: manifest problems, unmet dependencies, lifecycle
//! conflicts, unavailable plugins, argument validation, unimplemented
//! actions, execution failures, and state persistence failures.

pub mod config;
pub mod errors;
pub mod instance;
pub mod invoker;
pub mod lifecycle;
pub mod manifest;
pub mod progress;
pub mod resolver;
pub mod runtime;
pub mod state;
pub mod store;
pub mod version;

pub use config::{HaloRuntimeConfig, HaloStateBackendConfig};
pub use errors::{HaloError, Result};
pub use instance::{
    HaloActionOutput, HaloEntryPointRegistry, HaloInstanceManager, HaloPlugin, HaloPluginContext,
    HaloPluginFactory,
};
pub use invoker::{HaloActionInvoker, HaloInvokeOutcome};
pub use lifecycle::{
    HaloFailureKind, HaloHookFn, HaloHookPoint, HaloLifecycleManager, HaloPluginRecord,
    HaloPluginState,
};
pub use manifest::{
    load_manifest_from_file, HaloActionSpec, HaloLibraryDependency, HaloManifest, HaloParamKind,
    HaloParamSpec, HaloPluginDependency, MANIFEST_FILE_NAMES,
};
pub use progress::{
    HaloLogProgressSink, HaloMemoryProgressSink, HaloProgressEvent, HaloProgressSink,
};
pub use resolver::{
    HaloDependencyResolver, HaloDependencyVerdict, HaloHostLibraries, HaloLibraryProbe,
    HaloLibraryStatus, HaloLibraryVersionPolicy,
};
pub use runtime::HaloRuntime;
pub use state::{
    HaloFileStateBackend, HaloMemoryStateBackend, HaloStateBackend, HaloStateHandle,
    HaloStateStore,
};
pub use store::HaloManifestStore;
pub use version::{HaloVersion, HaloVersionReq};
