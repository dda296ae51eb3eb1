//! Symbolic redirect targets.
//!
//! Flows name their redirect targets symbolically (`"intro_hotwater"`);
//! the route table resolves those names to URLs at the HTTP boundary.

use indexmap::IndexMap;

/// Resolver from symbolic target names to URLs.
#[derive(Clone, Default)]
pub struct RouteTable {
    routes: IndexMap<String, String>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a symbolic name with its URL.
    pub fn route(mut self, name: impl Into<String>, url: impl Into<String>) -> Self {
        self.routes.insert(name.into(), url.into());
        self
    }

    /// Resolve a symbolic name. Unregistered names pass through unchanged,
    /// so literal paths keep working.
    pub fn resolve(&self, name: &str) -> String {
        self.routes
            .get(name)
            .cloned()
            .unwrap_or_else(|| name.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registered_names_resolve() {
        let table = RouteTable::new()
            .route("intro_hotwater", "/heat/hotwater")
            .route("home", "/");
        assert_eq!(table.resolve("intro_hotwater"), "/heat/hotwater");
        assert_eq!(table.resolve("home"), "/");
    }

    #[test]
    fn test_unregistered_names_pass_through() {
        let table = RouteTable::new();
        assert_eq!(table.resolve("/already/a/path"), "/already/a/path");
    }
}
