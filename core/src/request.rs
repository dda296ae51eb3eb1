use indexmap::IndexMap;

/// HTTP method of the inbound interaction, reduced to what the engine
/// distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// Protocol-agnostic view of one inbound request.
///
/// `data` holds the submitted form payload; it is only populated for POST
/// requests (a GET renders, it never submits). `partial` marks an
/// AJAX-style interaction expecting a fragment merge instead of a full
/// page.
#[derive(Debug, Clone)]
pub struct FlowRequest {
    pub method: Method,
    pub partial: bool,
    data: IndexMap<String, Vec<String>>,
}

impl FlowRequest {
    /// A plain GET navigation carrying no form data.
    pub fn get() -> Self {
        Self {
            method: Method::Get,
            partial: false,
            data: IndexMap::new(),
        }
    }

    /// A POST submission with the given form payload.
    pub fn post<K, V, I>(pairs: I) -> Self
    where
        K: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        let mut data: IndexMap<String, Vec<String>> = IndexMap::new();
        for (k, v) in pairs {
            data.entry(k.into()).or_default().push(v.into());
        }
        Self {
            method: Method::Post,
            partial: false,
            data,
        }
    }

    /// Mark this request as a partial (AJAX-style) interaction.
    pub fn partial(mut self) -> Self {
        self.partial = true;
        self
    }

    pub fn is_post(&self) -> bool {
        self.method == Method::Post
    }

    pub fn contains(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    /// Last submitted value for a key, if any.
    pub fn value(&self, key: &str) -> Option<&str> {
        self.data
            .get(key)
            .and_then(|vs| vs.last())
            .map(String::as_str)
    }

    /// All submitted values for a key.
    pub fn values(&self, key: &str) -> &[String] {
        self.data.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Submitted field names.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.data.keys().map(String::as_str)
    }
}
