use crate::error::FlowError;
use std::collections::HashMap;

/// Context mapping handed to the template collaborator.
pub type TemplateContext = serde_json::Map<String, serde_json::Value>;

/// The template-rendering collaborator: markup in, markup out.
///
/// Rendering fidelity is outside the engine; the core only ever asks for
/// a named template filled with a context mapping.
pub trait Renderer {
    fn render(&self, template: &str, context: &TemplateContext) -> Result<String, FlowError>;
}

type TemplateFn = Box<dyn Fn(&TemplateContext) -> String + Send + Sync>;

/// Renderer backed by a registry of template closures.
///
/// Sufficient for tests and demos; a real deployment plugs in its own
/// [`Renderer`] implementation.
#[derive(Default)]
pub struct TemplateRegistry {
    templates: HashMap<String, TemplateFn>,
}

impl TemplateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, name: impl Into<String>, template: F)
    where
        F: Fn(&TemplateContext) -> String + Send + Sync + 'static,
    {
        self.templates.insert(name.into(), Box::new(template));
    }
}

impl Renderer for TemplateRegistry {
    fn render(&self, template: &str, context: &TemplateContext) -> Result<String, FlowError> {
        let f = self
            .templates
            .get(template)
            .ok_or_else(|| FlowError::UnknownTemplate(template.to_string()))?;
        Ok(f(context))
    }
}

/// Pull a string value out of a template context, empty if absent.
pub fn context_str<'a>(context: &'a TemplateContext, key: &str) -> &'a str {
    context.get(key).and_then(|v| v.as_str()).unwrap_or("")
}
