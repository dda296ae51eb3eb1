use indexmap::IndexMap;
use serde_json::Value;

/// Top-level session namespace holding all flow state.
pub const FLOW_NAMESPACE: &str = "flow_session";

/// Flat string-keyed mapping stored under one namespace. Values must
/// round-trip through the host's session serialization, so they are plain
/// JSON values (strings, numbers, booleans, lists of strings).
pub type SessionData = IndexMap<String, Value>;

/// Per-user persistent key-value store surviving across requests.
///
/// The engine reads a namespace as a whole, mutates its in-memory copy
/// and writes the whole namespace back. Backends only need these two
/// operations.
pub trait SessionStore {
    /// Load the mapping stored under `namespace`, empty if absent.
    fn get(&self, namespace: &str) -> SessionData;

    /// Replace the mapping stored under `namespace`.
    fn set(&mut self, namespace: &str, data: SessionData);
}

/// In-memory session store, used in tests and demos.
#[derive(Debug, Default, Clone)]
pub struct MemorySession {
    namespaces: IndexMap<String, SessionData>,
}

impl MemorySession {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySession {
    fn get(&self, namespace: &str) -> SessionData {
        self.namespaces.get(namespace).cloned().unwrap_or_default()
    }

    fn set(&mut self, namespace: &str, data: SessionData) {
        self.namespaces.insert(namespace.to_string(), data);
    }
}
