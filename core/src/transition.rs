//! Transition resolution: the rule determining a state's successor.

use crate::context::FlowContext;
use crate::error::FlowError;
use crate::flow::Flow;
use crate::forms::prefixed;
use crate::state::State;
use serde_json::Value;
use std::sync::Arc;

/// Computed switch lookup over the current state.
pub type SwitchFn =
    Arc<dyn Fn(&State, &FlowContext<'_>) -> Result<Value, FlowError> + Send + Sync>;

/// Static successor.
pub struct Next(String);

impl Next {
    pub fn to(state: impl Into<String>) -> Self {
        Next(state.into())
    }
}

enum SwitchKey {
    /// Look up the state's own session key.
    OwnLookup,
    /// Look up an explicit (optionally prefixed) key.
    Key(String),
    /// Compute the value from the state and context.
    Computed(SwitchFn),
}

/// Successor chosen by matching a resolved value against registered cases,
/// with an optional default.
pub struct Switch {
    key: SwitchKey,
    cases: Vec<(Value, String)>,
    default: Option<String>,
}

impl Switch {
    /// Switch on the current state's own session key.
    pub fn own() -> Self {
        Self {
            key: SwitchKey::OwnLookup,
            cases: Vec::new(),
            default: None,
        }
    }

    /// Switch on an explicit lookup key.
    pub fn on(key: impl Into<String>) -> Self {
        Self {
            key: SwitchKey::Key(key.into()),
            cases: Vec::new(),
            default: None,
        }
    }

    /// Switch on a computed value.
    pub fn by<F>(f: F) -> Self
    where
        F: Fn(&State, &FlowContext<'_>) -> Result<Value, FlowError> + Send + Sync + 'static,
    {
        Self {
            key: SwitchKey::Computed(Arc::new(f)),
            cases: Vec::new(),
            default: None,
        }
    }

    pub fn case(mut self, value: impl Into<Value>, state: impl Into<String>) -> Self {
        self.cases.push((value.into(), state.into()));
        self
    }

    pub fn default(mut self, state: impl Into<String>) -> Self {
        self.default = Some(state.into());
        self
    }
}

/// Polymorphic decision object attached to a state.
pub enum Transition {
    Next(String),
    Switch(Switch),
}

impl From<Next> for Transition {
    fn from(next: Next) -> Self {
        Transition::Next(next.0)
    }
}

impl From<Switch> for Transition {
    fn from(switch: Switch) -> Self {
        Transition::Switch(switch)
    }
}

impl Transition {
    /// All statically-known successor names, for build-time validation.
    pub(crate) fn successors(&self) -> Vec<&str> {
        match self {
            Transition::Next(name) => vec![name.as_str()],
            Transition::Switch(switch) => {
                let mut names: Vec<&str> =
                    switch.cases.iter().map(|(_, name)| name.as_str()).collect();
                if let Some(default) = &switch.default {
                    names.push(default.as_str());
                }
                names
            }
        }
    }

    /// Resolve the successor of `state` for the current request.
    pub(crate) fn follow(
        &self,
        state: &State,
        flow: &Flow,
        ctx: &FlowContext<'_>,
    ) -> Result<String, FlowError> {
        match self {
            Transition::Next(name) => Ok(name.clone()),
            Transition::Switch(switch) => {
                let value = match &switch.key {
                    SwitchKey::Computed(f) => f(state, ctx)?,
                    SwitchKey::OwnLookup | SwitchKey::Key(_) => {
                        let key = match &switch.key {
                            SwitchKey::Key(key) => key.as_str(),
                            _ => state.lookup_key(),
                        };
                        let key = prefixed(flow.prefix(), key);
                        // Session wins over freshly submitted data.
                        if let Some(stored) = ctx.session_value(&key) {
                            stored.clone()
                        } else if let Some(submitted) = ctx.request.value(&key) {
                            Value::String(submitted.to_string())
                        } else {
                            return Err(FlowError::MissingLookup(key));
                        }
                    }
                };
                if let Some((_, name)) = switch.cases.iter().find(|(case, _)| case == &value) {
                    return Ok(name.clone());
                }
                if let Some(default) = &switch.default {
                    return Ok(default.clone());
                }
                Err(FlowError::NoSwitchCase {
                    state: state.name().to_string(),
                    value,
                })
            }
        }
    }
}
