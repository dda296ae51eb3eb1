use crate::render::Renderer;
use crate::request::FlowRequest;
use crate::session::{SessionData, SessionStore, FLOW_NAMESPACE};
use serde_json::Value;

/// Per-request evaluation context threaded through every flow operation.
///
/// Session access is explicit: the namespace is loaded once on
/// construction, every mutation updates the in-memory copy and writes the
/// whole namespace back through the store. No ambient/global state.
pub struct FlowContext<'a> {
    pub request: FlowRequest,
    store: &'a mut dyn SessionStore,
    session: SessionData,
    renderer: &'a dyn Renderer,
}

impl<'a> FlowContext<'a> {
    pub fn new(
        request: FlowRequest,
        store: &'a mut dyn SessionStore,
        renderer: &'a dyn Renderer,
    ) -> Self {
        let session = store.get(FLOW_NAMESPACE);
        Self {
            request,
            store,
            session,
            renderer,
        }
    }

    pub fn renderer(&self) -> &dyn Renderer {
        self.renderer
    }

    /// Snapshot of the session namespace as currently seen by this request.
    pub fn session(&self) -> &SessionData {
        &self.session
    }

    pub fn session_contains(&self, key: &str) -> bool {
        self.session.contains_key(key)
    }

    pub fn session_value(&self, key: &str) -> Option<&Value> {
        self.session.get(key)
    }

    pub(crate) fn session_insert(&mut self, key: String, value: Value) {
        self.session.insert(key, value);
        self.store.set(FLOW_NAMESPACE, self.session.clone());
    }

    pub(crate) fn session_remove(&mut self, key: &str) {
        if self.session.shift_remove(key).is_some() {
            self.store.set(FLOW_NAMESPACE, self.session.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::TemplateRegistry;
    use crate::session::MemorySession;
    use serde_json::json;

    #[test]
    fn test_mutations_write_through() {
        let mut store = MemorySession::new();
        let renderer = TemplateRegistry::new();
        {
            let mut ctx = FlowContext::new(FlowRequest::get(), &mut store, &renderer);
            ctx.session_insert("roof_type".into(), json!("flachdach"));
            assert!(ctx.session_contains("roof_type"));
        }
        assert_eq!(
            store.get(FLOW_NAMESPACE).get("roof_type"),
            Some(&json!("flachdach"))
        );

        {
            let mut ctx = FlowContext::new(FlowRequest::get(), &mut store, &renderer);
            ctx.session_remove("roof_type");
        }
        assert!(store.get(FLOW_NAMESPACE).is_empty());
    }
}
