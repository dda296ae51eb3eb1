//! Cookie-backed in-memory session storage.
//!
//! The backend keeps every session's namespaces behind one shared lock;
//! the per-request [`SessionHandle`] binds a session id and implements the
//! core store contract against it.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use stepflow_core::{SessionData, SessionStore};
use uuid::Uuid;

/// Name of the session-id cookie.
pub const SESSION_COOKIE: &str = "sfid";

type Namespaces = HashMap<String, SessionData>;

/// Shared in-memory session backend: session id -> namespace -> data.
#[derive(Clone, Default)]
pub struct SessionBackend {
    inner: Arc<RwLock<HashMap<String, Namespaces>>>,
}

impl SessionBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a fresh session id.
    pub fn issue(&self) -> String {
        let id = Uuid::new_v4().to_string();
        self.inner.write().insert(id.clone(), Namespaces::new());
        id
    }

    pub fn contains(&self, id: &str) -> bool {
        self.inner.read().contains_key(id)
    }

    /// A store handle bound to one session id.
    pub fn handle(&self, id: &str) -> SessionHandle {
        SessionHandle {
            backend: self.clone(),
            id: id.to_string(),
        }
    }
}

/// One session's view of the backend, per request.
pub struct SessionHandle {
    backend: SessionBackend,
    id: String,
}

impl SessionHandle {
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl SessionStore for SessionHandle {
    fn get(&self, namespace: &str) -> SessionData {
        self.backend
            .inner
            .read()
            .get(&self.id)
            .and_then(|namespaces| namespaces.get(namespace))
            .cloned()
            .unwrap_or_default()
    }

    fn set(&mut self, namespace: &str, data: SessionData) {
        self.backend
            .inner
            .write()
            .entry(self.id.clone())
            .or_default()
            .insert(namespace.to_string(), data);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use stepflow_core::FLOW_NAMESPACE;

    #[test]
    fn test_issued_ids_are_distinct() {
        let backend = SessionBackend::new();
        let a = backend.issue();
        let b = backend.issue();
        assert_ne!(a, b);
        assert!(backend.contains(&a));
        assert!(backend.contains(&b));
    }

    #[test]
    fn test_handles_share_the_backend() {
        let backend = SessionBackend::new();
        let id = backend.issue();

        let mut writer = backend.handle(&id);
        let mut data = SessionData::new();
        data.insert("roof_type".into(), json!("flachdach"));
        writer.set(FLOW_NAMESPACE, data);

        let reader = backend.handle(&id);
        assert_eq!(
            reader.get(FLOW_NAMESPACE).get("roof_type"),
            Some(&json!("flachdach"))
        );
    }

    #[test]
    fn test_sessions_are_isolated() {
        let backend = SessionBackend::new();
        let first = backend.issue();
        let second = backend.issue();

        let mut writer = backend.handle(&first);
        let mut data = SessionData::new();
        data.insert("building_type".into(), json!("single_family"));
        writer.set(FLOW_NAMESPACE, data);

        assert!(backend.handle(&second).get(FLOW_NAMESPACE).is_empty());
    }
}
