//! States: the steps of a wizard.
//!
//! A state owns a name (its session key), a target element id (defaulting
//! to the name), an optional outgoing transition and a kind: a template
//! section, a structured form, or a terminal redirect. States are pure graph nodes - the walk logic
//! lives in [`crate::flow`], and only the state's *value* is ever
//! persisted, in the session, under its (optionally prefixed) key(s).

use crate::context::FlowContext;
use crate::error::FlowError;
use crate::flow::Flow;
use crate::forms::{prefixed, CleanedData, FormSource, FormSpec};
use crate::render::TemplateContext;
use crate::response::{Fragments, StateResponse};
use crate::status::StateStatus;
use crate::transition::Transition;
use serde_json::Value;

pub struct State {
    name: String,
    target: String,
    label: Option<String>,
    lookup: String,
    transition: Option<Transition>,
    pub(crate) kind: StateKind,
}

pub(crate) enum StateKind {
    Template(TemplateState),
    Form(FormState),
    End(EndState),
}

pub(crate) struct TemplateState {
    template: String,
    context: TemplateContext,
    reset_template: Option<String>,
    reset_context: TemplateContext,
}

pub(crate) struct FormState {
    pub(crate) spec: FormSpec,
    template: Option<String>,
    info_template: Option<String>,
}

pub(crate) struct EndState {
    url: String,
}

impl State {
    /// A plain template section keyed by a single session value.
    pub fn template(name: impl Into<String>, template: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            lookup: name.clone(),
            target: name.clone(),
            name,
            label: None,
            transition: None,
            kind: StateKind::Template(TemplateState {
                template: template.into(),
                context: TemplateContext::new(),
                reset_template: None,
                reset_context: TemplateContext::new(),
            }),
        }
    }

    /// The "save and continue" gate between sections: renders the next
    /// button, resets to its disabled variant. All stops of a flow share
    /// the `next_button` target element.
    pub fn stop(
        name: impl Into<String>,
        lookup: impl Into<String>,
        button_text: impl Into<String>,
    ) -> Self {
        let lookup = lookup.into();
        let text = button_text.into();
        let mut context = TemplateContext::new();
        context.insert(
            "hx_vals".into(),
            Value::String(format!(r#"{{"{lookup}": "True"}}"#)),
        );
        context.insert("next_btn_text".into(), Value::String(text.clone()));
        let mut reset_context = TemplateContext::new();
        reset_context.insert("next_disabled".into(), Value::Bool(true));
        reset_context.insert("next_btn_text".into(), Value::String(text));
        Self {
            name: name.into(),
            target: "next_button".into(),
            label: None,
            lookup,
            transition: None,
            kind: StateKind::Template(TemplateState {
                template: "partials/next_button.html".into(),
                context,
                reset_template: Some("partials/next_button.html".into()),
                reset_context,
            }),
        }
    }

    /// A structured multi-field form step.
    pub fn form(name: impl Into<String>, spec: FormSpec) -> Self {
        let name = name.into();
        Self {
            lookup: name.clone(),
            target: name.clone(),
            name,
            label: None,
            transition: None,
            kind: StateKind::Form(FormState {
                spec,
                template: None,
                info_template: None,
            }),
        }
    }

    /// A terminal state carrying a symbolic redirect target.
    pub fn end(name: impl Into<String>, url: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            lookup: name.clone(),
            target: name.clone(),
            name,
            label: Some("end".into()),
            transition: None,
            kind: StateKind::End(EndState { url: url.into() }),
        }
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Override the session key (defaults to the state name).
    pub fn lookup(mut self, lookup: impl Into<String>) -> Self {
        self.lookup = lookup.into();
        self
    }

    /// Override the HTML target element id (defaults to the state name).
    pub fn target(mut self, target: impl Into<String>) -> Self {
        self.target = target.into();
        self
    }

    /// Static context entry for a template state.
    pub fn context(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        if let StateKind::Template(t) = &mut self.kind {
            t.context.insert(key.into(), value.into());
        }
        self
    }

    /// Template rendered instead of an empty clearing fragment on reset.
    pub fn reset_template(mut self, template: impl Into<String>) -> Self {
        if let StateKind::Template(t) = &mut self.kind {
            t.reset_template = Some(template.into());
        }
        self
    }

    /// Template wrapping a form state's rendered form (receives `form` in
    /// its context).
    pub fn template_name(mut self, template: impl Into<String>) -> Self {
        if let StateKind::Form(f) = &mut self.kind {
            f.template = Some(template.into());
        }
        self
    }

    /// Auxiliary informational fragment rendered alongside a form,
    /// swapped out-of-band into the `{name}_info` target.
    pub fn info_template(mut self, template: impl Into<String>) -> Self {
        if let StateKind::Form(f) = &mut self.kind {
            f.info_template = Some(template.into());
        }
        self
    }

    /// Attach the outgoing transition.
    pub fn transition(mut self, transition: impl Into<Transition>) -> Self {
        self.transition = Some(transition.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The HTML target id this state's fragments land on.
    pub fn target_id(&self) -> &str {
        &self.target
    }

    pub fn label_text(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub(crate) fn lookup_key(&self) -> &str {
        &self.lookup
    }

    pub fn is_end(&self) -> bool {
        matches!(self.kind, StateKind::End(_))
    }

    pub(crate) fn outgoing(&self) -> Option<&Transition> {
        self.transition.as_ref()
    }
}

impl State {
    /// Classify this state against request and session (spec of the
    /// wizard's change detection).
    pub(crate) fn check(&self, flow: &Flow, ctx: &FlowContext<'_>) -> StateStatus {
        match &self.kind {
            StateKind::End(_) => StateStatus::Unchanged,
            StateKind::Template(_) => {
                let key = &self.lookup;
                let in_request = ctx.request.contains(key);
                let in_session = ctx.session_contains(key);
                match (in_request, in_session) {
                    (false, false) => StateStatus::New,
                    (true, false) => StateStatus::Set,
                    (true, true) => {
                        let submitted = Value::String(
                            ctx.request.value(key).unwrap_or_default().to_string(),
                        );
                        if ctx.session_value(key) == Some(&submitted) {
                            StateStatus::Unchanged
                        } else {
                            StateStatus::Changed
                        }
                    }
                    (false, true) => StateStatus::Unchanged,
                }
            }
            StateKind::Form(form) => form_status(form, flow, ctx),
        }
    }

    /// Persist the submitted value(s) to the session. Never writes on
    /// validation failure.
    pub(crate) fn store(&self, flow: &Flow, ctx: &mut FlowContext<'_>) {
        if !ctx.request.is_post() {
            return;
        }
        match &self.kind {
            StateKind::End(_) => {}
            StateKind::Template(_) => {
                if let Some(value) = ctx.request.value(&self.lookup) {
                    ctx.session_insert(self.lookup.clone(), Value::String(value.to_string()));
                }
            }
            StateKind::Form(form) => {
                if let Ok(cleaned) = form.spec.clean(&ctx.request, flow.prefix()) {
                    for (field, value) in cleaned {
                        ctx.session_insert(prefixed(flow.prefix(), &field), value);
                    }
                }
            }
        }
    }

    /// Remove this state's stored value(s) from the session.
    pub(crate) fn remove(&self, flow: &Flow, ctx: &mut FlowContext<'_>) {
        match &self.kind {
            StateKind::End(_) => {}
            StateKind::Template(_) => ctx.session_remove(&self.lookup),
            StateKind::Form(form) => {
                for key in form.spec.session_keys(flow.prefix()) {
                    ctx.session_remove(&key);
                }
            }
        }
    }

    /// This state's current rendering output. `status` is the effective
    /// status from the walk: a state downgraded to `New` by a freshly set
    /// ancestor renders pristine even when stale session values exist.
    pub(crate) fn response(
        &self,
        flow: &Flow,
        ctx: &FlowContext<'_>,
        status: StateStatus,
    ) -> Result<Fragments, FlowError> {
        let mut fragments = Fragments::new();
        match &self.kind {
            StateKind::End(end) => {
                fragments.insert(self.target.clone(), StateResponse::Redirect(end.url.clone()));
            }
            StateKind::Template(t) => {
                let html = ctx.renderer().render(&t.template, &t.context)?;
                fragments.insert(self.target.clone(), StateResponse::Html(html));
            }
            StateKind::Form(form) => {
                let bound: Option<&dyn FormSource> = if status == StateStatus::New {
                    None
                } else {
                    Some(ctx.session())
                };
                let form_html = form.spec.render(bound, flow.prefix(), None);
                let content = match &form.template {
                    Some(template) => {
                        let mut context = TemplateContext::new();
                        context.insert("form".into(), Value::String(form_html));
                        ctx.renderer().render(template, &context)?
                    }
                    None => form_html,
                };
                fragments.insert(self.target.clone(), StateResponse::Html(content));
                if let Some(info) = &form.info_template {
                    fragments.insert(
                        format!("{}_info", self.target),
                        self.info_fragment(form, info, flow, ctx)?,
                    );
                }
            }
        }
        Ok(fragments)
    }

    fn info_fragment(
        &self,
        form: &FormState,
        template: &str,
        flow: &Flow,
        ctx: &FlowContext<'_>,
    ) -> Result<StateResponse, FlowError> {
        let mut context = TemplateContext::new();
        if let Ok(data) = form.spec.clean(ctx.session(), flow.prefix()) {
            for (field, value) in data {
                context.insert(field, value);
            }
        }
        let html = ctx.renderer().render(template, &context)?;
        Ok(StateResponse::SwapHtml(format!(
            "<div id=\"{}_info\" hx-swap-oob=\"innerHTML\">{html}</div>",
            self.target
        )))
    }

    /// Out-of-band clearing fragment(s) emitted while tearing down.
    pub(crate) fn reset_response(
        &self,
        ctx: &FlowContext<'_>,
    ) -> Result<Fragments, FlowError> {
        let mut fragments = Fragments::new();
        match &self.kind {
            // Redirects are never replayed during resets.
            StateKind::End(_) => {}
            StateKind::Template(t) => {
                let inner = match &t.reset_template {
                    Some(template) => ctx.renderer().render(template, &t.reset_context)?,
                    None => String::new(),
                };
                fragments.insert(
                    self.target.clone(),
                    StateResponse::SwapHtml(format!(
                        "<div id=\"{}\" hx-swap-oob=\"innerHTML\">{inner}</div>",
                        self.target
                    )),
                );
            }
            StateKind::Form(form) => {
                fragments.insert(
                    self.target.clone(),
                    StateResponse::SwapHtml(format!(
                        "<div id=\"{}\" hx-swap-oob=\"innerHTML\"></div>",
                        self.target
                    )),
                );
                if form.info_template.is_some() {
                    fragments.insert(
                        format!("{}_info", self.target),
                        StateResponse::SwapHtml(format!(
                            "<div id=\"{}_info\" hx-swap-oob=\"innerHTML\"></div>",
                            self.target
                        )),
                    );
                }
            }
        }
        Ok(fragments)
    }

    /// The form's error-annotated re-render after a validation failure.
    pub(crate) fn error_response(
        &self,
        flow: &Flow,
        ctx: &FlowContext<'_>,
    ) -> Result<Fragments, FlowError> {
        let mut fragments = Fragments::new();
        match &self.kind {
            StateKind::Form(form) => {
                let errors = form.spec.clean(&ctx.request, flow.prefix()).err();
                let form_html =
                    form.spec
                        .render(Some(&ctx.request), flow.prefix(), errors.as_ref());
                let content = match &form.template {
                    Some(template) => {
                        let mut context = TemplateContext::new();
                        context.insert("form".into(), Value::String(form_html));
                        ctx.renderer().render(template, &context)?
                    }
                    None => form_html,
                };
                fragments.insert(self.target.clone(), StateResponse::Html(content));
            }
            _ => {
                fragments.insert(
                    self.target.clone(),
                    StateResponse::Html("Something went wrong.".into()),
                );
            }
        }
        Ok(fragments)
    }

    /// This state's resolved value(s) for data extraction.
    pub(crate) fn data(
        &self,
        flow: &Flow,
        ctx: &FlowContext<'_>,
    ) -> Result<CleanedData, FlowError> {
        match &self.kind {
            StateKind::End(_) => Ok(CleanedData::new()),
            StateKind::Template(_) => {
                let mut data = CleanedData::new();
                if let Some(value) = ctx.session_value(&self.lookup) {
                    data.insert(self.lookup.clone(), value.clone());
                }
                Ok(data)
            }
            StateKind::Form(form) => form
                .spec
                .clean(ctx.session(), flow.prefix())
                .map_err(|errors| FlowError::InvalidData {
                    state: self.name.clone(),
                    errors: errors.to_string(),
                }),
        }
    }
}

/// Status classification generalized over all of a form's fields.
fn form_status(form: &FormState, flow: &Flow, ctx: &FlowContext<'_>) -> StateStatus {
    let prefix = flow.prefix();
    let keys = form.spec.session_keys(prefix);

    match form.spec.clean(&ctx.request, prefix) {
        Err(_) => {
            // Invalid submitted data with at least one of our fields
            // present is a user-visible validation failure.
            if keys.iter().any(|k| ctx.request.contains(k)) {
                StateStatus::Error
            } else if keys.iter().all(|k| ctx.session_contains(k)) {
                // Revisit without resubmission.
                StateStatus::Unchanged
            } else {
                StateStatus::New
            }
        }
        Ok(cleaned) => {
            if keys.iter().all(|k| !ctx.session_contains(k)) {
                return StateStatus::Set;
            }
            if keys.iter().all(|k| !ctx.request.contains(k)) {
                // Pure navigation: no field of this form was submitted.
                return StateStatus::Unchanged;
            }
            let all_match = form.spec.fields().iter().all(|field| {
                let stored = ctx.session_value(&prefixed(prefix, &field.name));
                let fresh = cleaned.get(&field.name);
                stored.unwrap_or(&Value::Null) == fresh.unwrap_or(&Value::Null)
            });
            if all_match {
                StateStatus::Unchanged
            } else {
                StateStatus::Changed
            }
        }
    }
}
