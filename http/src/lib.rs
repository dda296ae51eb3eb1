//! # Stepflow HTTP
//!
//! HTTP wiring for stepflow wizards. The core engine is protocol-agnostic;
//! this crate translates hyper requests into [`stepflow_core::FlowRequest`]s,
//! dispatches them into flows and maps the outcome back onto HTTP:
//! partial interactions ride the `HX-Request` / `HX-Retarget` /
//! `HX-Redirect` header conventions, sessions ride an `sfid` cookie.

pub mod ingress;
pub mod routes;
pub mod session;

pub use ingress::{FlowIngress, IngressError, RawFlowService};
pub use routes::RouteTable;
pub use session::{SessionBackend, SessionHandle, SESSION_COOKIE};
