//! # Stepflow Kit
//!
//! The building-renovation questionnaire, expressed on top of the
//! stepflow engine: the typed form specs, the wizard graphs for every
//! section of the dialogue, the sidebar progress index and the bundled
//! validation-rules document.

pub mod flows;
pub mod forms;
pub mod navigation;

pub use navigation::{index, IndexEntry, Step, StepState};

use stepflow_core::RuleDoc;

/// Maximum number of renovation scenario instances.
pub const SCENARIO_MAX: usize = 3;

/// The bundled validation-rules document for the numeric forms.
pub fn default_rules() -> Result<RuleDoc, serde_json::Error> {
    RuleDoc::from_json(include_str!("../rules.json"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bundled_rules_parse() {
        let rules = default_rules().expect("bundled rules must parse");
        assert!(rules.rules_for("HeatingYearForm").is_some());
    }
}
