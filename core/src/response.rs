use indexmap::IndexMap;

/// The rendering output of a single state.
///
/// A closed sum type: the "is this a redirect / is this a swap fragment"
/// checks throughout the core are pattern matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateResponse {
    /// Plain HTML replacing the state's own target element.
    Html(String),
    /// HTML swapped out-of-band into another target (used for clearing
    /// fragments during resets).
    SwapHtml(String),
    /// A symbolic redirect target, resolved to a URL outside the core.
    Redirect(String),
}

impl StateResponse {
    pub fn is_swap(&self) -> bool {
        matches!(self, StateResponse::SwapHtml(_))
    }

    pub fn is_redirect(&self) -> bool {
        matches!(self, StateResponse::Redirect(_))
    }

    /// The carried payload, HTML or redirect target.
    pub fn content(&self) -> &str {
        match self {
            StateResponse::Html(s) | StateResponse::SwapHtml(s) | StateResponse::Redirect(s) => s,
        }
    }
}

/// Fragment map produced by a flow walk: target id -> response.
///
/// Insertion order is preserved; merging later results overwrites earlier
/// entries for the same target.
pub type Fragments = IndexMap<String, StateResponse>;
