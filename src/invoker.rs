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

//! # Halo Invoker Module
//!
//! The single uniform entry point for executing plugin actions.
//!
//! Every invocation runs the same pipeline: availability check (the
//! plugin must be registered and Active), capability check (the instance
//! must list the action), argument validation against the manifest's
//! declared parameters (with default injection), then dispatch. Deferred
//! results are awaited here so the caller always receives either a
//! terminal value or a lazy stream, never a bare future.
//!
//! Streams are forwarded unbuffered. Items already produced are not
//! retracted when a later item fails; the failure arrives in-band as the
//! stream's next element.

use std::fmt;
use std::sync::Arc;

use futures::stream::BoxStream;
use futures::StreamExt;
use serde_json::Value;

use crate::errors::{HaloError, Result};
use crate::instance::{HaloActionOutput, HaloInstanceManager};
use crate::lifecycle::{HaloLifecycleManager, HaloPluginState};
use crate::manifest::HaloActionSpec;

/// What an invocation hands back to the caller.
pub enum HaloInvokeOutcome {
    /// A terminal value (immediate, or a deferred result already awaited).
    Value(Value),
    /// A lazy result sequence; each item may individually fail.
    Stream(BoxStream<'static, Result<Value>>),
}

impl HaloInvokeOutcome {
    /// The terminal value, if this outcome is not a stream.
    pub fn into_value(self) -> Option<Value> {
        match self {
            HaloInvokeOutcome::Value(value) => Some(value),
            HaloInvokeOutcome::Stream(_) => None,
        }
    }

    pub fn is_stream(&self) -> bool {
        matches!(self, HaloInvokeOutcome::Stream(_))
    }
}

impl fmt::Debug for HaloInvokeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HaloInvokeOutcome::Value(v) => f.debug_tuple("Value").field(v).finish(),
            HaloInvokeOutcome::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

/// Uniform action dispatcher over the lifecycle registry and the
/// instance cache.
#[derive(Debug)]
pub struct HaloActionInvoker {
    lifecycle: Arc<HaloLifecycleManager>,
    instances: Arc<HaloInstanceManager>,
}

impl HaloActionInvoker {
    pub fn new(lifecycle: Arc<HaloLifecycleManager>, instances: Arc<HaloInstanceManager>) -> Self {
        HaloActionInvoker {
            lifecycle,
            instances,
        }
    }

    /// Execute an action on an Active plugin.
    ///
    /// `args` is a JSON object of named arguments (or `null` for none).
    /// Declared defaults are injected before dispatch, so behaviors see a
    /// fully-populated argument object.
    pub async fn invoke(
        &self,
        plugin_id: &str,
        action: &str,
        args: Value,
    ) -> Result<HaloInvokeOutcome> {
        let record = self
            .lifecycle
            .record(plugin_id)
            .await
            .ok_or_else(|| HaloError::unavailable(plugin_id, "not registered"))?;

        if record.state != HaloPluginState::Active {
            return Err(HaloError::unavailable(
                plugin_id,
                format!("plugin is {}", record.state),
            ));
        }

        let instance = self
            .instances
            .get(plugin_id)
            .await
            .ok_or_else(|| HaloError::unavailable(plugin_id, "no live instance"))?;

        if !instance.actions().iter().any(|a| a == action) {
            return Err(HaloError::not_implemented(plugin_id, action));
        }

        let args = validate_args(plugin_id, action, record.manifest.action(action), args)?;

        log::debug!(
            "invoker.dispatch: invoking action - plugin={}, action={}",
            plugin_id,
            action
        );

        let output = instance.call(action, &args).map_err(|err| match err {
            HaloError::ArgumentValidation { .. } | HaloError::ActionNotImplemented { .. } => err,
            other => HaloError::action(plugin_id, action, other.to_string()),
        })?;

        match output {
            HaloActionOutput::Value(value) => Ok(HaloInvokeOutcome::Value(value)),
            HaloActionOutput::Pending(future) => {
                let value = future.await.map_err(|err| {
                    HaloError::action(plugin_id, action, err.to_string())
                })?;
                Ok(HaloInvokeOutcome::Value(value))
            }
            HaloActionOutput::Stream(stream) => {
                let plugin_id = plugin_id.to_string();
                let action = action.to_string();
                let stream = stream
                    .map(move |item| {
                        item.map_err(|err| {
                            HaloError::action(&plugin_id, &action, err.to_string())
                        })
                    })
                    .boxed();
                Ok(HaloInvokeOutcome::Stream(stream))
            }
        }
    }
}

/// Check `args` against the declared parameter list and inject defaults.
/// Actions the manifest does not declare pass their arguments through
/// untouched.
fn validate_args(
    plugin_id: &str,
    action: &str,
    spec: Option<&HaloActionSpec>,
    args: Value,
) -> Result<Value> {
    let spec = match spec {
        Some(spec) => spec,
        None => return Ok(args),
    };

    let mut map = match args {
        Value::Null => serde_json::Map::new(),
        Value::Object(map) => map,
        other => {
            return Err(HaloError::arguments(
                plugin_id,
                action,
                format!("arguments must be an object, got {}", json_type_name(&other)),
            ));
        }
    };

    for param in &spec.params {
        match map.get(&param.name) {
            Some(value) => {
                if !param.kind.accepts(value) {
                    return Err(HaloError::arguments(
                        plugin_id,
                        action,
                        format!(
                            "argument '{}' must be of type {}, got {}",
                            param.name,
                            param.kind.as_str(),
                            json_type_name(value)
                        ),
                    ));
                }
            }
            None => {
                if let Some(default) = &param.default {
                    map.insert(param.name.clone(), default.clone());
                } else if param.required {
                    return Err(HaloError::arguments(
                        plugin_id,
                        action,
                        format!("missing required argument '{}'", param.name),
                    ));
                }
            }
        }
    }

    Ok(Value::Object(map))
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
