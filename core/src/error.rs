use thiserror::Error;

/// Fatal flow failures.
///
/// A `FlowError` is never caught inside the core; it propagates to the
/// protocol boundary. Recoverable form-validation failures are *not*
/// errors - they surface as [`crate::StateStatus::Error`] and produce the
/// form's annotated re-render.
#[derive(Debug, Error)]
pub enum FlowError {
    /// A transition names a state that does not exist in the flow.
    #[error("no state named '{0}' in flow")]
    UnknownState(String),

    /// A state has no transition and the flow has no designated end state.
    #[error("no next state or end state defined for state '{0}'")]
    NoNextState(String),

    /// A switch lookup key was present in neither session nor request.
    #[error("could not find lookup key '{0}' in request or session")]
    MissingLookup(String),

    /// A switch resolved a value with no matching case and no default.
    #[error("no case for value '{value}' in switch of state '{state}', no default given")]
    NoSwitchCase { state: String, value: serde_json::Value },

    /// Session-backed form data no longer validates.
    #[error("invalid data in flow state '{state}': {errors}")]
    InvalidData { state: String, errors: String },

    /// The transition graph contains a cycle.
    #[error("transition cycle detected at state '{0}'")]
    Cycle(String),

    /// A full-page render was requested but the flow carries no template.
    #[error("flow '{0}' has no page template")]
    MissingTemplate(String),

    /// The renderer does not know the requested template.
    #[error("template '{0}' is not registered")]
    UnknownTemplate(String),
}
