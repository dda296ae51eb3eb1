//! Typed form model.
//!
//! A [`FormSpec`] is the engine's analog of a form class: field names,
//! types and validators. Cleaning runs against any [`FormSource`] - the
//! submitted request payload or the session mapping - so change detection
//! and data extraction share one validation path.

use crate::request::FlowRequest;
use crate::session::SessionData;
use indexmap::IndexMap;
use serde_json::Value;
use std::fmt;

/// One selectable option of a choice field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Choice {
    pub value: String,
    pub label: String,
}

/// Field type with its built-in validators.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    Text { max_length: Option<usize> },
    Integer { min: Option<i64>, max: Option<i64> },
    Float { min: Option<f64>, max: Option<f64> },
    /// Checkbox semantics: absent means `false`, never a missing-required
    /// error.
    Boolean,
    Choice { choices: Vec<Choice> },
    MultiChoice { choices: Vec<Choice> },
}

/// A single typed form field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    pub name: String,
    pub label: Option<String>,
    pub kind: FieldKind,
    pub required: bool,
    pub initial: Option<Value>,
    pub disabled: bool,
    pub help_text: Option<String>,
    /// Generic UI-hint overrides, emitted as attributes on the rendered
    /// control. Unrecognized dynamic rules land here.
    pub attrs: IndexMap<String, Value>,
}

impl FieldSpec {
    fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            label: None,
            kind,
            required: true,
            initial: None,
            disabled: false,
            help_text: None,
            attrs: IndexMap::new(),
        }
    }

    pub fn text(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Text { max_length: None })
    }

    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Integer { min: None, max: None })
    }

    pub fn float(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Float { min: None, max: None })
    }

    /// Checkboxes are optional by construction.
    pub fn boolean(name: impl Into<String>) -> Self {
        let mut field = Self::new(name, FieldKind::Boolean);
        field.required = false;
        field
    }

    pub fn choice<'a>(
        name: impl Into<String>,
        choices: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Self {
        Self::new(
            name,
            FieldKind::Choice {
                choices: collect_choices(choices),
            },
        )
    }

    pub fn multi_choice<'a>(
        name: impl Into<String>,
        choices: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Self {
        Self::new(
            name,
            FieldKind::MultiChoice {
                choices: collect_choices(choices),
            },
        )
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn initial(mut self, value: impl Into<Value>) -> Self {
        self.initial = Some(value.into());
        self
    }

    pub fn help(mut self, text: impl Into<String>) -> Self {
        self.help_text = Some(text.into());
        self
    }

    pub fn min(mut self, value: f64) -> Self {
        match &mut self.kind {
            FieldKind::Integer { min, .. } => *min = Some(value as i64),
            FieldKind::Float { min, .. } => *min = Some(value),
            _ => {}
        }
        self
    }

    pub fn max(mut self, value: f64) -> Self {
        match &mut self.kind {
            FieldKind::Integer { max, .. } => *max = Some(value as i64),
            FieldKind::Float { max, .. } => *max = Some(value),
            _ => {}
        }
        self
    }
}

fn collect_choices<'a>(choices: impl IntoIterator<Item = (&'a str, &'a str)>) -> Vec<Choice> {
    choices
        .into_iter()
        .map(|(value, label)| Choice {
            value: value.to_string(),
            label: label.to_string(),
        })
        .collect()
}

/// Cleaned form values, keyed by *unprefixed* field name.
pub type CleanedData = IndexMap<String, Value>;

/// Field-keyed validation failures.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FormErrors(IndexMap<String, Vec<String>>);

impl FormErrors {
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn field(&self, name: &str) -> &[String] {
        self.0.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }
}

impl fmt::Display for FormErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, messages) in &self.0 {
            if !first {
                write!(f, "; ")?;
            }
            write!(f, "{}: {}", field, messages.join(", "))?;
            first = false;
        }
        Ok(())
    }
}

/// Raw value of one field as seen by a [`FormSource`].
#[derive(Debug, Clone, Copy)]
pub enum FieldInput<'a> {
    Missing,
    Text(&'a str),
    Many(&'a [String]),
    Json(&'a Value),
}

/// Anything a form can be bound to: the request payload or the session.
pub trait FormSource {
    fn field(&self, key: &str) -> FieldInput<'_>;
}

impl FormSource for FlowRequest {
    fn field(&self, key: &str) -> FieldInput<'_> {
        let values = self.values(key);
        match values {
            [] => FieldInput::Missing,
            [single] => FieldInput::Text(single),
            many => FieldInput::Many(many),
        }
    }
}

impl FormSource for SessionData {
    fn field(&self, key: &str) -> FieldInput<'_> {
        match self.get(key) {
            Some(value) => FieldInput::Json(value),
            None => FieldInput::Missing,
        }
    }
}

/// Prefix a session/form key for a repeatable flow instance.
pub(crate) fn prefixed(prefix: Option<&str>, key: &str) -> String {
    match prefix {
        Some(p) => format!("{p}-{key}"),
        None => key.to_string(),
    }
}

/// A structured multi-field form: the engine's form class.
#[derive(Debug, Clone, PartialEq)]
pub struct FormSpec {
    name: String,
    fields: Vec<FieldSpec>,
}

impl FormSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    /// Name keying this form in the dynamic validation-rules document.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn field(mut self, field: FieldSpec) -> Self {
        self.fields.push(field);
        self
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub(crate) fn field_mut(&mut self, name: &str) -> Option<&mut FieldSpec> {
        self.fields.iter_mut().find(|f| f.name == name)
    }

    /// Session keys owned by this form, prefixed for the flow instance.
    pub fn session_keys(&self, prefix: Option<&str>) -> Vec<String> {
        self.fields
            .iter()
            .map(|f| prefixed(prefix, &f.name))
            .collect()
    }

    /// Validate and convert bound data into cleaned per-field values.
    pub fn clean(
        &self,
        source: &dyn FormSource,
        prefix: Option<&str>,
    ) -> Result<CleanedData, FormErrors> {
        let mut cleaned = CleanedData::new();
        let mut errors = FormErrors::default();
        for field in &self.fields {
            let key = prefixed(prefix, &field.name);
            match clean_field(field, source.field(&key)) {
                Ok(value) => {
                    cleaned.insert(field.name.clone(), value);
                }
                Err(message) => errors.add(field.name.clone(), message),
            }
        }
        if errors.is_empty() {
            Ok(cleaned)
        } else {
            Err(errors)
        }
    }

    pub fn is_valid(&self, source: &dyn FormSource, prefix: Option<&str>) -> bool {
        self.clean(source, prefix).is_ok()
    }

    /// Render the form as HTML, optionally bound to a data source and
    /// annotated with validation errors. The fallback markup used when a
    /// form state carries no template.
    pub fn render(
        &self,
        source: Option<&dyn FormSource>,
        prefix: Option<&str>,
        errors: Option<&FormErrors>,
    ) -> String {
        let mut html = String::new();
        for field in &self.fields {
            let key = prefixed(prefix, &field.name);
            let values = match source {
                Some(s) => display_values(s.field(&key)),
                None => initial_values(field),
            };
            let field_errors = errors.map(|e| e.field(&field.name)).unwrap_or(&[]);
            render_field(&mut html, field, &key, &values, field_errors);
        }
        html
    }
}

fn clean_field(field: &FieldSpec, input: FieldInput<'_>) -> Result<Value, String> {
    // Disabled fields ignore submitted data entirely.
    if field.disabled {
        return Ok(field.initial.clone().unwrap_or(Value::Null));
    }

    if matches!(field.kind, FieldKind::Boolean) {
        return clean_boolean(input);
    }

    let missing = match input {
        FieldInput::Missing => true,
        FieldInput::Text(s) => s.is_empty(),
        FieldInput::Many(values) => values.iter().all(|v| v.is_empty()),
        FieldInput::Json(value) => value.is_null(),
    };
    if missing {
        if field.required {
            return Err("This field is required.".to_string());
        }
        return Ok(field.initial.clone().unwrap_or(Value::Null));
    }

    match &field.kind {
        FieldKind::Boolean => unreachable!("handled above"),
        FieldKind::Text { max_length } => {
            let s = single_str(input)?;
            if let Some(max) = max_length {
                if s.chars().count() > *max {
                    return Err(format!("Ensure this value has at most {max} characters."));
                }
            }
            Ok(Value::String(s.to_string()))
        }
        FieldKind::Integer { min, max } => {
            let n = match input {
                FieldInput::Json(v) => v
                    .as_i64()
                    .ok_or_else(|| "Enter a whole number.".to_string())?,
                _ => single_str(input)?
                    .trim()
                    .parse::<i64>()
                    .map_err(|_| "Enter a whole number.".to_string())?,
            };
            if let Some(min) = min {
                if n < *min {
                    return Err(format!(
                        "Ensure this value is greater than or equal to {min}."
                    ));
                }
            }
            if let Some(max) = max {
                if n > *max {
                    return Err(format!("Ensure this value is less than or equal to {max}."));
                }
            }
            Ok(Value::from(n))
        }
        FieldKind::Float { min, max } => {
            let x = match input {
                FieldInput::Json(v) => v.as_f64().ok_or_else(|| "Enter a number.".to_string())?,
                _ => single_str(input)?
                    .trim()
                    .parse::<f64>()
                    .map_err(|_| "Enter a number.".to_string())?,
            };
            if let Some(min) = min {
                if x < *min {
                    return Err(format!(
                        "Ensure this value is greater than or equal to {min}."
                    ));
                }
            }
            if let Some(max) = max {
                if x > *max {
                    return Err(format!("Ensure this value is less than or equal to {max}."));
                }
            }
            if !x.is_finite() {
                return Err("Enter a number.".to_string());
            }
            Ok(Value::from(x))
        }
        FieldKind::Choice { choices } => {
            let s = single_str(input)?;
            if choices.iter().any(|c| c.value == s) {
                Ok(Value::String(s.to_string()))
            } else {
                Err(format!(
                    "Select a valid choice. '{s}' is not one of the available choices."
                ))
            }
        }
        FieldKind::MultiChoice { choices } => {
            let selected: Vec<String> = match input {
                FieldInput::Text(s) => vec![s.to_string()],
                FieldInput::Many(values) => values
                    .iter()
                    .filter(|v| !v.is_empty())
                    .cloned()
                    .collect(),
                FieldInput::Json(v) => v
                    .as_array()
                    .ok_or_else(|| "Enter a list of values.".to_string())?
                    .iter()
                    .map(|item| {
                        item.as_str()
                            .map(str::to_string)
                            .ok_or_else(|| "Enter a list of values.".to_string())
                    })
                    .collect::<Result<_, _>>()?,
                FieldInput::Missing => Vec::new(),
            };
            for value in &selected {
                if !choices.iter().any(|c| &c.value == value) {
                    return Err(format!(
                        "Select a valid choice. '{value}' is not one of the available choices."
                    ));
                }
            }
            Ok(Value::Array(selected.into_iter().map(Value::String).collect()))
        }
    }
}

fn clean_boolean(input: FieldInput<'_>) -> Result<Value, String> {
    let truthy = match input {
        FieldInput::Missing => false,
        FieldInput::Text(s) => matches!(s, "true" | "True" | "on" | "1" | "yes"),
        FieldInput::Many(values) => values
            .last()
            .is_some_and(|s| matches!(s.as_str(), "true" | "True" | "on" | "1" | "yes")),
        FieldInput::Json(v) => v.as_bool().unwrap_or(false),
    };
    Ok(Value::Bool(truthy))
}

fn single_str(input: FieldInput<'_>) -> Result<&str, String> {
    match input {
        FieldInput::Text(s) => Ok(s),
        FieldInput::Many(values) => values
            .last()
            .map(String::as_str)
            .ok_or_else(|| "This field is required.".to_string()),
        FieldInput::Json(v) => match v {
            Value::String(s) => Ok(s.as_str()),
            _ => Err("Invalid stored value.".to_string()),
        },
        FieldInput::Missing => Err("This field is required.".to_string()),
    }
}

fn display_values(input: FieldInput<'_>) -> Vec<String> {
    match input {
        FieldInput::Missing => Vec::new(),
        FieldInput::Text(s) => vec![s.to_string()],
        FieldInput::Many(values) => values.to_vec(),
        FieldInput::Json(v) => match v {
            Value::String(s) => vec![s.clone()],
            Value::Number(n) => vec![n.to_string()],
            Value::Bool(true) => vec!["true".to_string()],
            Value::Array(items) => items
                .iter()
                .filter_map(|i| i.as_str().map(str::to_string))
                .collect(),
            _ => Vec::new(),
        },
    }
}

fn initial_values(field: &FieldSpec) -> Vec<String> {
    match &field.initial {
        Some(value) => display_values(FieldInput::Json(value)),
        None => Vec::new(),
    }
}

fn render_field(
    html: &mut String,
    field: &FieldSpec,
    key: &str,
    values: &[String],
    errors: &[String],
) {
    let id = format!("id_{key}");
    let label = field.label.as_deref().unwrap_or(&field.name);
    html.push_str("<div class=\"field\">");
    html.push_str(&format!(
        "<label for=\"{id}\">{}</label>",
        escape(label)
    ));

    let mut attrs = String::new();
    if field.required && !field.disabled {
        attrs.push_str(" required");
    }
    if field.disabled {
        attrs.push_str(" disabled");
    }
    match &field.kind {
        FieldKind::Integer { min, max } => {
            if let Some(min) = min {
                attrs.push_str(&format!(" min=\"{min}\""));
            }
            if let Some(max) = max {
                attrs.push_str(&format!(" max=\"{max}\""));
            }
        }
        FieldKind::Float { min, max } => {
            if let Some(min) = min {
                attrs.push_str(&format!(" min=\"{min}\""));
            }
            if let Some(max) = max {
                attrs.push_str(&format!(" max=\"{max}\""));
            }
        }
        _ => {}
    }
    for (name, value) in &field.attrs {
        match value {
            Value::Bool(true) => attrs.push_str(&format!(" {name}")),
            Value::Bool(false) | Value::Null => {}
            Value::String(s) => attrs.push_str(&format!(" {name}=\"{}\"", escape(s))),
            other => attrs.push_str(&format!(" {name}=\"{other}\"")),
        }
    }

    let current = values.first().map(String::as_str).unwrap_or("");
    match &field.kind {
        FieldKind::Text { .. } => html.push_str(&format!(
            "<input type=\"text\" name=\"{key}\" id=\"{id}\" value=\"{}\"{attrs}>",
            escape(current)
        )),
        FieldKind::Integer { .. } | FieldKind::Float { .. } => html.push_str(&format!(
            "<input type=\"number\" name=\"{key}\" id=\"{id}\" value=\"{}\"{attrs}>",
            escape(current)
        )),
        FieldKind::Boolean => {
            let checked = if current == "true" { " checked" } else { "" };
            html.push_str(&format!(
                "<input type=\"checkbox\" name=\"{key}\" id=\"{id}\" value=\"true\"{checked}{attrs}>"
            ));
        }
        FieldKind::Choice { choices } => {
            html.push_str(&format!("<select name=\"{key}\" id=\"{id}\"{attrs}>"));
            html.push_str("<option value=\"\">---------</option>");
            for choice in choices {
                let selected = if choice.value == current { " selected" } else { "" };
                html.push_str(&format!(
                    "<option value=\"{}\"{selected}>{}</option>",
                    escape(&choice.value),
                    escape(&choice.label)
                ));
            }
            html.push_str("</select>");
        }
        FieldKind::MultiChoice { choices } => {
            for choice in choices {
                let checked = if values.iter().any(|v| v == &choice.value) {
                    " checked"
                } else {
                    ""
                };
                html.push_str(&format!(
                    "<label><input type=\"checkbox\" name=\"{key}\" value=\"{}\"{checked}{attrs}> {}</label>",
                    escape(&choice.value),
                    escape(&choice.label)
                ));
            }
        }
    }

    if !errors.is_empty() {
        html.push_str("<ul class=\"errorlist\">");
        for error in errors {
            html.push_str(&format!("<li>{}</li>", escape(error)));
        }
        html.push_str("</ul>");
    }
    if let Some(help) = &field.help_text {
        html.push_str(&format!("<small>{}</small>", escape(help)));
    }
    html.push_str("</div>");
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn heating_year_form() -> FormSpec {
        FormSpec::new("HeatingYearForm").field(
            FieldSpec::integer("heating_year")
                .label("Year of installation")
                .min(1950.0)
                .max(2026.0),
        )
    }

    #[test]
    fn test_clean_valid_submission() {
        let form = heating_year_form();
        let req = FlowRequest::post([("heating_year", "1999")]);
        let cleaned = form.clean(&req, None).unwrap();
        assert_eq!(cleaned.get("heating_year"), Some(&json!(1999)));
    }

    #[test]
    fn test_clean_missing_required() {
        let form = heating_year_form();
        let req = FlowRequest::post([("other", "x")]);
        let errors = form.clean(&req, None).unwrap_err();
        assert_eq!(
            errors.field("heating_year"),
            &["This field is required.".to_string()]
        );
    }

    #[test]
    fn test_clean_out_of_bounds() {
        let form = heating_year_form();
        let req = FlowRequest::post([("heating_year", "1900")]);
        assert!(form.clean(&req, None).is_err());
    }

    #[test]
    fn test_clean_prefixed_keys() {
        let form = heating_year_form();
        let req = FlowRequest::post([("scenario1-heating_year", "1999")]);
        let cleaned = form.clean(&req, Some("scenario1")).unwrap();
        // Cleaned data is keyed by unprefixed field name.
        assert_eq!(cleaned.get("heating_year"), Some(&json!(1999)));
        assert!(form.clean(&req, Some("scenario2")).is_err());
    }

    #[test]
    fn test_clean_optional_uses_initial() {
        let form = FormSpec::new("F").field(
            FieldSpec::choice("mode", [("a", "A"), ("b", "B")])
                .optional()
                .initial("a"),
        );
        let req = FlowRequest::post([("unrelated", "1")]);
        let cleaned = form.clean(&req, None).unwrap();
        assert_eq!(cleaned.get("mode"), Some(&json!("a")));
    }

    #[test]
    fn test_clean_choice_rejects_unknown() {
        let form = FormSpec::new("F").field(FieldSpec::choice("mode", [("a", "A")]));
        let req = FlowRequest::post([("mode", "z")]);
        assert!(form.clean(&req, None).is_err());
    }

    #[test]
    fn test_clean_multi_choice() {
        let form = FormSpec::new("F").field(FieldSpec::multi_choice(
            "renovations",
            [("roof", "Roof"), ("facade", "Facade"), ("windows", "Windows")],
        ));
        let req = FlowRequest::post([("renovations", "roof"), ("renovations", "windows")]);
        let cleaned = form.clean(&req, None).unwrap();
        assert_eq!(cleaned.get("renovations"), Some(&json!(["roof", "windows"])));
    }

    #[test]
    fn test_clean_boolean_absent_is_false() {
        let form = FormSpec::new("F").field(FieldSpec::boolean("flat_roof"));
        let req = FlowRequest::post([("other", "1")]);
        let cleaned = form.clean(&req, None).unwrap();
        assert_eq!(cleaned.get("flat_roof"), Some(&json!(false)));
    }

    #[test]
    fn test_clean_from_session() {
        let form = heating_year_form();
        let mut session = SessionData::new();
        session.insert("heating_year".into(), json!(2001));
        let cleaned = form.clean(&session, None).unwrap();
        assert_eq!(cleaned.get("heating_year"), Some(&json!(2001)));
    }

    #[test]
    fn test_clean_disabled_ignores_submission() {
        let form = FormSpec::new("F").field({
            let mut f = FieldSpec::integer("locked").initial(5);
            f.disabled = true;
            f
        });
        let req = FlowRequest::post([("locked", "99")]);
        let cleaned = form.clean(&req, None).unwrap();
        assert_eq!(cleaned.get("locked"), Some(&json!(5)));
    }

    #[test]
    fn test_render_bound_with_errors() {
        let form = heating_year_form();
        let req = FlowRequest::post([("heating_year", "1900")]);
        let errors = form.clean(&req, None).unwrap_err();
        let html = form.render(Some(&req), None, Some(&errors));
        assert!(html.contains("value=\"1900\""));
        assert!(html.contains("errorlist"));
        assert!(html.contains("min=\"1950\""));
    }
}
