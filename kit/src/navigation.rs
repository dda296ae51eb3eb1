//! Sidebar progress index.
//!
//! The dialogue renders a fixed sidebar of steps. Everything before the
//! active step counts as visited; numbered entries are category headers,
//! and flow-backed steps additionally expose whether their wizard is
//! complete so the caller can render a checkmark.

use crate::flows;
use stepflow_core::{Flow, FlowContext, FlowError, RuleDoc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepState {
    Active,
    Visited,
    Upcoming,
}

/// One sidebar step: a plain view or a flow-backed wizard section.
pub struct Step {
    name: String,
    url: String,
    flow: Option<Flow>,
}

impl Step {
    pub fn view(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            flow: None,
        }
    }

    pub fn flow(name: impl Into<String>, url: impl Into<String>, flow: Flow) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            flow: Some(flow),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    pub name: String,
    pub url: String,
    pub state: StepState,
    pub is_category: bool,
    pub finished: bool,
}

/// Assemble the sidebar index for the step whose URL is `active_url`.
pub fn index(
    steps: &[Step],
    active_url: &str,
    ctx: &FlowContext<'_>,
) -> Result<Vec<IndexEntry>, FlowError> {
    let mut entries = Vec::with_capacity(steps.len());
    let mut active_seen = false;
    for step in steps {
        let state = if step.url == active_url {
            active_seen = true;
            StepState::Active
        } else if !active_seen {
            StepState::Visited
        } else {
            StepState::Upcoming
        };
        let finished = match &step.flow {
            Some(flow) => flow.finished(ctx)?,
            None => false,
        };
        entries.push(IndexEntry {
            name: step.name.clone(),
            url: step.url.clone(),
            state,
            is_category: step.name.chars().next().is_some_and(|c| c.is_ascii_digit()),
            finished,
        });
    }
    Ok(entries)
}

/// The standard step order of the building dialogue.
pub fn steps(rules: &RuleDoc) -> Result<Vec<Step>, FlowError> {
    Ok(vec![
        Step::view("1. Bestandsaufnahme", "/intro_inventory"),
        Step::flow("Gebäudeart", "/building_type", flows::building_type(rules)?),
        Step::flow("Dämmung", "/insulation", flows::insulation(rules)?),
        Step::flow("Heizung", "/heating", flows::heating(rules)?),
        Step::flow("Warmwasser", "/hotwater", flows::hotwater(rules)?),
        Step::flow("Dach", "/roof", flows::roof(rules)?),
        Step::flow("PV-Anlage", "/pv_system", flows::pv_system(rules)?),
        Step::view("2. Sanierung", "/intro_renovation"),
        Step::flow(
            "Sanierungswunsch",
            "/renovation/scenario1",
            flows::renovation_request("scenario1", rules)?,
        ),
        Step::flow(
            "Förderung",
            "/financial_support",
            flows::financial_support(rules)?,
        ),
    ])
}
