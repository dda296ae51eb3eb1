//! # Stepflow Core
//!
//! A session-driven, multi-step wizard engine. A [`Flow`] is a directed,
//! acyclic graph of [`State`]s connected by [`Transition`]s; one HTTP
//! interaction enters the flow, each state classifies itself against the
//! submitted data and the session, and the walk produces a map of
//! renderable fragments (or a redirect).
//!
//! This crate is protocol-agnostic: no HTTP types, no IO, no async. The
//! HTTP wiring lives in `stepflow-http`.

pub mod context;
pub mod error;
pub mod flow;
pub mod forms;
pub mod render;
pub mod request;
pub mod response;
pub mod rules;
pub mod session;
pub mod state;
pub mod status;
pub mod transition;

pub use context::FlowContext;
pub use error::FlowError;
pub use flow::{Flow, FlowBuilder, FlowResponse};
pub use forms::{FieldKind, FieldSpec, FormErrors, FormSpec};
pub use render::{Renderer, TemplateContext, TemplateRegistry};
pub use request::{FlowRequest, Method};
pub use response::{Fragments, StateResponse};
pub use rules::RuleDoc;
pub use session::{MemorySession, SessionData, SessionStore, FLOW_NAMESPACE};
pub use state::State;
pub use status::StateStatus;
pub use transition::{Next, Switch, Transition};

pub mod prelude {
    pub use crate::context::FlowContext;
    pub use crate::error::FlowError;
    pub use crate::flow::{Flow, FlowBuilder, FlowResponse};
    pub use crate::forms::{FieldKind, FieldSpec, FormSpec};
    pub use crate::render::{Renderer, TemplateContext, TemplateRegistry};
    pub use crate::request::{FlowRequest, Method};
    pub use crate::response::{Fragments, StateResponse};
    pub use crate::rules::RuleDoc;
    pub use crate::session::{MemorySession, SessionStore};
    pub use crate::state::State;
    pub use crate::status::StateStatus;
    pub use crate::transition::{Next, Switch, Transition};
}
