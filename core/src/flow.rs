//! Flow orchestration: the whole-wizard operations.
//!
//! A `Flow` owns its states by name (insertion order preserved, first
//! added is `start`), resolves successors through each state's
//! transition, and exposes dispatch / finished / reset / data. The flow
//! itself is transient per request - session data is the only persisted
//! state.

use crate::context::FlowContext;
use crate::error::FlowError;
use crate::forms::CleanedData;
use crate::render::TemplateContext;
use crate::response::{Fragments, StateResponse};
use crate::rules::RuleDoc;
use crate::state::{State, StateKind};
use crate::status::StateStatus;
use indexmap::IndexMap;
use serde_json::Value;
use std::collections::HashMap;

/// Outcome of one dispatched request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowResponse {
    /// Client-side redirect to a symbolic target (partial requests only).
    Redirect(String),
    /// Concatenated fragment bodies; `retarget` names the element the
    /// primary content should land on.
    Partial { html: String, retarget: Option<String> },
    /// Fully rendered page.
    Page { html: String },
}

pub struct Flow {
    name: String,
    prefix: Option<String>,
    template: Option<String>,
    extra_context: TemplateContext,
    states: IndexMap<String, State>,
    start: String,
    end: Option<String>,
}

impl Flow {
    pub fn build(name: impl Into<String>) -> FlowBuilder {
        FlowBuilder {
            name: name.into(),
            prefix: None,
            template: None,
            extra_context: TemplateContext::new(),
            states: IndexMap::new(),
            start: None,
            end: None,
            rules: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    pub fn states(&self) -> impl Iterator<Item = &State> {
        self.states.values()
    }

    fn state(&self, name: &str) -> Result<&State, FlowError> {
        self.states
            .get(name)
            .ok_or_else(|| FlowError::UnknownState(name.to_string()))
    }

    /// Resolve a state's successor, falling back to the designated end
    /// state when it has no transition.
    fn next_name(&self, state: &State, ctx: &FlowContext<'_>) -> Result<String, FlowError> {
        match state.outgoing() {
            Some(transition) => transition.follow(state, self, ctx),
            None => self
                .end
                .clone()
                .ok_or_else(|| FlowError::NoNextState(state.name().to_string())),
        }
    }

    /// Recursive propagation: classify this state, update the session and
    /// collect the fragments of everything downstream that must re-render.
    fn set_state(
        &self,
        name: &str,
        previous: StateStatus,
        ctx: &mut FlowContext<'_>,
    ) -> Result<Fragments, FlowError> {
        let state = self.state(name)?;
        if state.is_end() {
            return state.response(self, ctx, StateStatus::Unchanged);
        }

        // Once an ancestor just received fresh input, every descendant
        // renders as pristine regardless of stale session values.
        let status = if previous == StateStatus::Set {
            StateStatus::New
        } else {
            state.check(self, ctx)
        };
        tracing::debug!(flow = %self.name, state = name, ?status, "state classified");

        let mut fragments = match status {
            // The wizard stops advancing here; nothing downstream is
            // touched.
            StateStatus::New => return state.response(self, ctx, StateStatus::New),
            // Halt so the user sees the faulty step. No session writes.
            StateStatus::Error => return state.error_response(self, ctx),
            StateStatus::Set => {
                state.store(self, ctx);
                let next = self.next_name(state, ctx)?;
                self.set_state(&next, StateStatus::Set, ctx)?
            }
            StateStatus::Unchanged => {
                let next = self.next_name(state, ctx)?;
                self.set_state(&next, StateStatus::Unchanged, ctx)?
            }
            StateStatus::Changed => {
                // Branch invalidation: tear down everything reachable from
                // the old value's successor, then store and walk the new
                // branch.
                let old_next = self.next_name(state, ctx)?;
                let mut fragments = self.reset_state(&old_next, ctx)?;
                state.store(self, ctx);
                let new_next = self.next_name(state, ctx)?;
                fragments.extend(self.set_state(&new_next, StateStatus::Changed, ctx)?);
                fragments
            }
        };

        // Full-page renders carry every visited state.
        if !ctx.request.partial {
            fragments.extend(state.response(self, ctx, status)?);
        }
        Ok(fragments)
    }

    /// Recursive teardown: remove stored values downstream and emit
    /// clearing fragments. A broken transition mid-reset means "no further
    /// downstream node", never an error.
    fn reset_state(
        &self,
        name: &str,
        ctx: &mut FlowContext<'_>,
    ) -> Result<Fragments, FlowError> {
        let state = self.state(name)?;
        if state.is_end() {
            return Ok(Fragments::new());
        }
        let following = self.next_name(state, ctx).ok();
        state.remove(self, ctx);
        let mut fragments = match following {
            Some(next) if self.state(&next).map(|s| !s.is_end()).unwrap_or(false) => {
                self.reset_state(&next, ctx)?
            }
            _ => Fragments::new(),
        };
        fragments.extend(state.reset_response(ctx)?);
        Ok(fragments)
    }

    /// Handle one request: walk from `start`, then assemble a redirect, a
    /// partial fragment response or a full page.
    pub fn dispatch(&self, ctx: &mut FlowContext<'_>) -> Result<FlowResponse, FlowError> {
        let partials = self.set_state(&self.start, StateStatus::Unchanged, ctx)?;

        if ctx.request.partial {
            // A redirect wins over everything else.
            if let Some(url) = partials.values().find_map(|r| match r {
                StateResponse::Redirect(url) => Some(url.clone()),
                _ => None,
            }) {
                return Ok(FlowResponse::Redirect(url));
            }
            // Plain replacement targets land before swap fragments so the
            // client retargets onto the right element.
            let mut entries: Vec<(String, StateResponse)> = partials.into_iter().collect();
            entries.sort_by_key(|(_, response)| response.is_swap());
            let mut retarget = None;
            let mut html = String::new();
            for (name, response) in &entries {
                match response {
                    StateResponse::Html(fragment) => {
                        html.push_str(fragment);
                        retarget = Some(name.clone());
                    }
                    StateResponse::SwapHtml(fragment) => html.push_str(fragment),
                    StateResponse::Redirect(_) => {}
                }
            }
            return Ok(FlowResponse::Partial { html, retarget });
        }

        // Traditional navigation: drop swap and redirect fragments, merge
        // the rest into the page context.
        let template = self
            .template
            .as_ref()
            .ok_or_else(|| FlowError::MissingTemplate(self.name.clone()))?;
        let mut context = self.extra_context.clone();
        for (name, response) in partials {
            if let StateResponse::Html(html) = response {
                context.insert(name, Value::String(html));
            }
        }
        let html = ctx.renderer().render(template, &context)?;
        Ok(FlowResponse::Page { html })
    }

    /// True iff every non-end state from `start` to the end state
    /// classifies as `Unchanged`.
    pub fn finished(&self, ctx: &FlowContext<'_>) -> Result<bool, FlowError> {
        let mut node = self.state(&self.start)?;
        loop {
            if node.is_end() {
                return Ok(true);
            }
            if node.check(self, ctx) != StateStatus::Unchanged {
                return Ok(false);
            }
            let next = self.next_name(node, ctx)?;
            node = self.state(&next)?;
        }
    }

    /// Remove every stored value along the current path, stopping at the
    /// first end state.
    pub fn reset(&self, ctx: &mut FlowContext<'_>) -> Result<(), FlowError> {
        let mut node = self.state(&self.start)?;
        while !node.is_end() {
            // Resolve the successor before removing: a switch may depend
            // on the value being removed.
            let next = self.next_name(node, ctx)?;
            node.remove(self, ctx);
            node = self.state(&next)?;
        }
        Ok(())
    }

    /// Collect every visited state's resolved value into one flat mapping,
    /// stopping at the first end state. Session-backed form data must
    /// currently validate.
    pub fn data(&self, ctx: &FlowContext<'_>) -> Result<CleanedData, FlowError> {
        let mut data = CleanedData::new();
        let mut node = self.state(&self.start)?;
        while !node.is_end() {
            data.extend(node.data(self, ctx)?);
            let next = self.next_name(node, ctx)?;
            node = self.state(&next)?;
        }
        Ok(data)
    }

    /// Build-time graph validation: successors must exist, non-end states
    /// must reach a successor, and the graph must be acyclic (nothing else
    /// bounds the recursive walks).
    fn validate(&self) -> Result<(), FlowError> {
        if !self.states.contains_key(&self.start) {
            return Err(FlowError::UnknownState(self.start.clone()));
        }
        for (name, state) in &self.states {
            match state.outgoing() {
                Some(transition) => {
                    for successor in transition.successors() {
                        if !self.states.contains_key(successor) {
                            return Err(FlowError::UnknownState(successor.to_string()));
                        }
                    }
                }
                None => {
                    if !state.is_end() && self.end.is_none() {
                        return Err(FlowError::NoNextState(name.clone()));
                    }
                }
            }
        }

        let mut colors: HashMap<&str, u8> = HashMap::new();
        for name in self.states.keys() {
            self.visit(name, &mut colors)?;
        }
        Ok(())
    }

    fn visit<'a>(&'a self, name: &'a str, colors: &mut HashMap<&'a str, u8>) -> Result<(), FlowError> {
        match colors.get(name) {
            Some(1) => return Err(FlowError::Cycle(name.to_string())),
            Some(2) => return Ok(()),
            _ => {}
        }
        colors.insert(name, 1);
        let state = self.state(name)?;
        let successors: Vec<&str> = match state.outgoing() {
            Some(transition) => transition.successors(),
            None if !state.is_end() => self.end.iter().map(String::as_str).collect(),
            None => Vec::new(),
        };
        for successor in successors {
            self.visit(successor, colors)?;
        }
        colors.insert(name, 2);
        Ok(())
    }
}

/// Builder assembling and validating a flow graph.
pub struct FlowBuilder {
    name: String,
    prefix: Option<String>,
    template: Option<String>,
    extra_context: TemplateContext,
    states: IndexMap<String, State>,
    start: Option<String>,
    end: Option<String>,
    rules: Option<RuleDoc>,
}

impl FlowBuilder {
    /// Namespace this instance's session keys (repeatable sections).
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Page template for full-page renders.
    pub fn template(mut self, template: impl Into<String>) -> Self {
        self.template = Some(template.into());
        self
    }

    /// Static page-context entry (back links, button flags and the like).
    pub fn context(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra_context.insert(key.into(), value.into());
        self
    }

    /// Dynamic validation-rules document applied to every form state at
    /// `finish()` time.
    pub fn rules(mut self, doc: &RuleDoc) -> Self {
        self.rules = Some(doc.clone());
        self
    }

    /// Add a state. The first state added becomes `start`.
    pub fn state(mut self, state: State) -> Self {
        if self.start.is_none() {
            self.start = Some(state.name().to_string());
        }
        self.states.insert(state.name().to_string(), state);
        self
    }

    /// Designate the default end state with its redirect target.
    pub fn end(mut self, url: impl Into<String>) -> Self {
        let state = State::end("end", url);
        self.end = Some("end".to_string());
        self.states.insert("end".to_string(), state);
        self
    }

    pub fn finish(mut self) -> Result<Flow, FlowError> {
        if let Some(doc) = &self.rules {
            for state in self.states.values_mut() {
                if let StateKind::Form(form) = &mut state.kind {
                    doc.apply(&mut form.spec);
                }
            }
        }
        let start = self
            .start
            .ok_or_else(|| FlowError::UnknownState("start".to_string()))?;
        let flow = Flow {
            name: self.name,
            prefix: self.prefix,
            template: self.template,
            extra_context: self.extra_context,
            states: self.states,
            start,
            end: self.end,
        };
        flow.validate()?;
        Ok(flow)
    }
}
