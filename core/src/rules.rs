//! Dynamic field-rule overlay.
//!
//! An externally-loaded JSON document keyed by form name can tighten or
//! override per-field configuration before validation runs:
//!
//! ```json
//! { "HeatingYearForm": { "heating_year": { "min": 1950, "max": 2026 } } }
//! ```
//!
//! Recognized rule names apply as typed field configuration; anything
//! else falls through as a generic attribute override on the rendered
//! control (the permissive fallback is deliberate).

use crate::forms::{FieldKind, FieldSpec, FormSpec};
use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;

type FieldRules = IndexMap<String, Value>;

/// Parsed validation-rules document: form name -> field name -> rules.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RuleDoc(IndexMap<String, IndexMap<String, FieldRules>>);

impl RuleDoc {
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    pub fn rules_for(&self, form_name: &str) -> Option<&IndexMap<String, FieldRules>> {
        self.0.get(form_name)
    }

    /// Overlay the rules registered for this form onto its fields.
    pub fn apply(&self, spec: &mut FormSpec) {
        let Some(form_rules) = self.rules_for(spec.name()) else {
            return;
        };
        let form_name = spec.name().to_string();
        for (field_name, rules) in form_rules {
            match spec.field_mut(field_name) {
                Some(field) => {
                    for (rule, value) in rules {
                        apply_rule(field, rule, value);
                    }
                }
                None => {
                    tracing::warn!(form = %form_name, field = %field_name, "rule for unknown field");
                }
            }
        }
    }
}

fn apply_rule(field: &mut FieldSpec, rule: &str, value: &Value) {
    match rule {
        "min" => match &mut field.kind {
            FieldKind::Integer { min, .. } => *min = value.as_i64(),
            FieldKind::Float { min, .. } => *min = value.as_f64(),
            _ => generic(field, rule, value),
        },
        "max" => match &mut field.kind {
            FieldKind::Integer { max, .. } => *max = value.as_i64(),
            FieldKind::Float { max, .. } => *max = value.as_f64(),
            _ => generic(field, rule, value),
        },
        "initial" => field.initial = Some(value.clone()),
        "disabled" => field.disabled = value.as_bool().unwrap_or(false),
        "required" => field.required = value.as_bool().unwrap_or(field.required),
        _ => generic(field, rule, value),
    }
}

fn generic(field: &mut FieldSpec, rule: &str, value: &Value) {
    field.attrs.insert(rule.to_string(), value.clone());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::FlowRequest;
    use serde_json::json;

    fn spec() -> FormSpec {
        FormSpec::new("HeatingStorageCapacityForm")
            .field(FieldSpec::integer("heating_storage_capacity"))
    }

    #[test]
    fn test_numeric_bounds_tighten_validation() {
        let doc = RuleDoc::from_json(
            r#"{"HeatingStorageCapacityForm": {"heating_storage_capacity": {"min": 10, "max": 2000}}}"#,
        )
        .unwrap();
        let mut form = spec();
        doc.apply(&mut form);

        let ok = FlowRequest::post([("heating_storage_capacity", "500")]);
        assert!(form.clean(&ok, None).is_ok());
        let too_small = FlowRequest::post([("heating_storage_capacity", "5")]);
        assert!(form.clean(&too_small, None).is_err());
    }

    #[test]
    fn test_unrecognized_rule_becomes_attribute() {
        let doc = RuleDoc::from_json(
            r#"{"HeatingStorageCapacityForm": {"heating_storage_capacity": {"step": 10, "data-unit": "l"}}}"#,
        )
        .unwrap();
        let mut form = spec();
        doc.apply(&mut form);

        let field = &form.fields()[0];
        assert_eq!(field.attrs.get("step"), Some(&json!(10)));
        let html = form.render(None, None, None);
        assert!(html.contains("data-unit=\"l\""));
    }

    #[test]
    fn test_initial_and_disabled() {
        let doc = RuleDoc::from_json(
            r#"{"HeatingStorageCapacityForm": {"heating_storage_capacity": {"initial": 300, "disabled": true}}}"#,
        )
        .unwrap();
        let mut form = spec();
        doc.apply(&mut form);
        let field = &form.fields()[0];
        assert_eq!(field.initial, Some(json!(300)));
        assert!(field.disabled);
    }

    #[test]
    fn test_unknown_form_untouched() {
        let doc = RuleDoc::from_json(r#"{"OtherForm": {"x": {"min": 1}}}"#).unwrap();
        let mut form = spec();
        let before = form.clone();
        doc.apply(&mut form);
        assert_eq!(form, before);
    }
}
