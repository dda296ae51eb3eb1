//! The wizard graphs of the building dialogue.
//!
//! One constructor per section. Every constructor takes the dynamic
//! validation-rules document so deployments can tighten the numeric
//! forms without touching the graphs.

use crate::forms;
use stepflow_core::{Flow, FlowError, Next, RuleDoc, State, Switch};

pub fn building_type(rules: &RuleDoc) -> Result<Flow, FlowError> {
    Flow::build("building_type")
        .template("pages/building_type.html")
        .context("back_url", "intro_inventory")
        .context("next_disabled", true)
        .rules(rules)
        .state(
            State::form("building_type", forms::building_type())
                .info_template("partials/building_type_help.html")
                .transition(Next::to("building_details")),
        )
        .state(
            State::form("building_details", forms::building_details())
                .transition(Next::to("monument_protection")),
        )
        .state(
            State::form("monument_protection", forms::monument_protection())
                .info_template("partials/building_type_protection_help.html")
                .transition(Switch::own().case("yes", "dead_end_stop").default("stop")),
        )
        // A protected building ends the dialogue on a dedicated page.
        .state(
            State::stop("dead_end_stop", "building_type_done", "Speichern")
                .transition(Next::to("dead_end_monument_protection")),
        )
        .state(State::end(
            "dead_end_monument_protection",
            "dead_end_monument_protection",
        ))
        .state(State::stop("stop", "building_type_done", "Speichern").transition(Next::to("end")))
        .end("insulation")
        .finish()
}

pub fn insulation(rules: &RuleDoc) -> Result<Flow, FlowError> {
    Flow::build("insulation")
        .template("pages/insulation.html")
        .context("back_url", "building_type")
        .context("next_disabled", true)
        .rules(rules)
        .state(State::form("insulation", forms::insulation()).transition(Next::to("stop")))
        .state(State::stop("stop", "insulation_done", "Speichern").transition(Next::to("end")))
        .end("heating")
        .finish()
}

pub fn heating(rules: &RuleDoc) -> Result<Flow, FlowError> {
    Flow::build("heating")
        .template("pages/heating.html")
        .context("back_url", "insulation")
        .context("next_disabled", true)
        .rules(rules)
        .state(
            State::form("heating_source", forms::heating_source())
                .transition(Next::to("heating_year")),
        )
        .state(
            State::form("heating_year", forms::heating_year())
                .transition(Next::to("solar_thermal_exists")),
        )
        .state(
            State::form("solar_thermal_exists", forms::solar_thermal_exists())
                .info_template("partials/heating_solar_help.html")
                .transition(
                    Switch::own()
                        .case("doesnt_exist", "stop")
                        .default("solar_thermal_area"),
                ),
        )
        .state(
            State::form("solar_thermal_area", forms::solar_thermal_area())
                .transition(Next::to("stop")),
        )
        .state(State::stop("stop", "heating_done", "Speichern").transition(Next::to("end")))
        .end("hotwater")
        .finish()
}

pub fn hotwater(rules: &RuleDoc) -> Result<Flow, FlowError> {
    Flow::build("hotwater")
        .template("pages/hotwater.html")
        .context("back_url", "heating")
        .context("next_disabled", true)
        .rules(rules)
        .state(
            State::form("hotwater_supply", forms::hotwater_supply())
                .transition(Next::to("heating_storage_exists")),
        )
        .state(
            State::form("heating_storage_exists", forms::heating_storage_exists()).transition(
                Switch::own()
                    .case("exists", "heating_storage_capacity")
                    .default("stop"),
            ),
        )
        .state(
            State::form("heating_storage_capacity", forms::heating_storage_capacity())
                .info_template("partials/heating_storage_help.html")
                .transition(Next::to("stop")),
        )
        .state(State::stop("stop", "hotwater_done", "Speichern").transition(Next::to("end")))
        .end("roof")
        .finish()
}

pub fn roof(rules: &RuleDoc) -> Result<Flow, FlowError> {
    Flow::build("roof")
        .template("pages/roof.html")
        .context("back_url", "hotwater")
        .context("next_disabled", true)
        .rules(rules)
        .state(
            State::form("flat_roof", forms::roof_type())
                .info_template("partials/roof_help.html")
                .transition(Switch::own().case("exists", "stop").default("roof_orientation")),
        )
        .state(
            State::form("roof_orientation", forms::roof_orientation())
                .info_template("partials/roof_orientation_help.html")
                .transition(Next::to("roof_inclination_known")),
        )
        .state(
            State::form("roof_inclination_known", forms::roof_inclination_known()).transition(
                Switch::own().case("known", "roof_inclination").default("stop"),
            ),
        )
        .state(
            State::form("roof_inclination", forms::roof_inclination())
                .info_template("partials/roof_inclination_help.html")
                .transition(Next::to("stop")),
        )
        .state(State::stop("stop", "roof_done", "Speichern").transition(Next::to("end")))
        .end("pv_system")
        .finish()
}

pub fn pv_system(rules: &RuleDoc) -> Result<Flow, FlowError> {
    Flow::build("pv_system")
        .template("pages/pv_system.html")
        .context("back_url", "roof")
        .context("next_disabled", true)
        .rules(rules)
        .state(
            State::form("pv_system", forms::pv_system()).transition(
                Switch::on("pv_exists")
                    .case("doesnt_exist", "stop")
                    .default("pv_capacity"),
            ),
        )
        .state(
            State::form("pv_capacity", forms::pv_capacity())
                .info_template("partials/pv_system_capacity_help.html")
                .transition(Next::to("pv_system_battery_exists")),
        )
        .state(
            State::form("pv_system_battery_exists", forms::battery_exists()).transition(
                Switch::on("battery_exists")
                    .case("doesnt_exist", "stop")
                    .default("pv_battery_capacity_known"),
            ),
        )
        .state(
            State::form("pv_battery_capacity_known", forms::battery_capacity_known()).transition(
                Switch::on("battery_capacity_known")
                    .case("known", "pv_system_battery")
                    .default("stop"),
            ),
        )
        .state(
            State::form("pv_system_battery", forms::battery_capacity())
                .info_template("partials/pv_system_battery_help.html")
                .transition(Next::to("stop")),
        )
        .state(State::stop("stop", "pv_system_done", "Speichern").transition(Next::to("end")))
        .end("intro_renovation")
        .finish()
}

/// The renovation wish, instantiated once per scenario: every session key
/// of this flow is namespaced by the scenario prefix.
pub fn renovation_request(prefix: &str, rules: &RuleDoc) -> Result<Flow, FlowError> {
    Flow::build("renovation_request")
        .prefix(prefix)
        .template("pages/renovation_request.html")
        .context("back_url", "renovation_overview")
        .context("next_disabled", true)
        .rules(rules)
        .state(
            State::form("primary_heating", forms::renovation_technology()).transition(
                Switch::own()
                    .case("bio_mass", "renovation_biomass")
                    .case("heat_pump", "renovation_heatpump")
                    .case("heating_rod", "renovation_pvsolar")
                    .default("renovation_solar"),
            ),
        )
        .state(
            State::form("renovation_biomass", forms::renovation_biomass())
                .transition(Next::to("renovation_details")),
        )
        .state(
            State::form("renovation_heatpump", forms::renovation_heatpump())
                .transition(Next::to("renovation_details")),
        )
        .state(
            State::form("renovation_pvsolar", forms::renovation_pvsolar())
                .transition(Next::to("renovation_details")),
        )
        .state(
            State::form("renovation_solar", forms::renovation_solar())
                .transition(Next::to("renovation_details")),
        )
        .state(
            State::form("renovation_details", forms::renovation_details())
                .transition(Next::to("stop")),
        )
        .state(
            State::stop(
                "stop",
                format!("{prefix}-renovation_request_done"),
                "Speichern",
            )
            .transition(Next::to("end")),
        )
        .end("renovation_overview")
        .finish()
}

pub fn financial_support(rules: &RuleDoc) -> Result<Flow, FlowError> {
    Flow::build("financial_support")
        .template("pages/financial_support.html")
        .context("back_url", "renovation_overview")
        .context("next_disabled", false)
        .rules(rules)
        .state(
            State::form("financial_support", forms::financial_support())
                .info_template("partials/financial_support_help.html")
                .transition(Next::to("stop")),
        )
        .state(State::stop("stop", "financial_support_done", "Speichern").transition(Next::to("end")))
        .end("optimization_start")
        .finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::default_rules;
    use serde_json::json;
    use stepflow_core::prelude::*;
    use stepflow_core::session::{SessionData, SessionStore, FLOW_NAMESPACE};

    fn renderer() -> TemplateRegistry {
        let mut registry = TemplateRegistry::new();
        registry.register("partials/next_button.html", |ctx| {
            if ctx.get("next_disabled").and_then(|v| v.as_bool()) == Some(true) {
                "<button disabled>Speichern</button>".to_string()
            } else {
                "<button>Speichern</button>".to_string()
            }
        });
        registry.register("partials/pv_system_capacity_help.html", |_| {
            "<p>Hinweis zur installierten Leistung</p>".to_string()
        });
        registry
    }

    #[test]
    fn test_every_flow_builds() {
        let rules = default_rules().expect("rules parse");
        for flow in [
            building_type(&rules),
            insulation(&rules),
            heating(&rules),
            hotwater(&rules),
            roof(&rules),
            pv_system(&rules),
            renovation_request("scenario1", &rules),
            financial_support(&rules),
        ] {
            flow.expect("flow graph must validate");
        }
    }

    #[test]
    fn test_monument_protection_dead_ends() {
        let rules = default_rules().expect("rules parse");
        let flow = building_type(&rules).expect("flow builds");
        let renderer = renderer();
        let mut store = MemorySession::new();
        let mut session = SessionData::new();
        session.insert("building_type".into(), json!("single_family"));
        session.insert("construction_year".into(), json!(1960));
        session.insert("living_space".into(), json!(140));
        session.insert("number_persons".into(), json!(3));
        session.insert("monument_protection".into(), json!("yes"));
        store.set(FLOW_NAMESPACE, session);

        let mut ctx = FlowContext::new(
            FlowRequest::post([("building_type_done", "True")]).partial(),
            &mut store,
            &renderer,
        );
        let response = flow.dispatch(&mut ctx).expect("dispatch");
        assert_eq!(
            response,
            FlowResponse::Redirect("dead_end_monument_protection".to_string())
        );
    }

    #[test]
    fn test_pv_switches_on_the_form_field() {
        let rules = default_rules().expect("rules parse");
        let flow = pv_system(&rules).expect("flow builds");
        let renderer = renderer();
        let mut store = MemorySession::new();

        let mut ctx = FlowContext::new(
            FlowRequest::post([("pv_exists", "exists")]).partial(),
            &mut store,
            &renderer,
        );
        let response = flow.dispatch(&mut ctx).expect("dispatch");
        drop(ctx);
        match response {
            FlowResponse::Partial { retarget, .. } => {
                assert_eq!(retarget.as_deref(), Some("pv_capacity"));
            }
            other => panic!("expected partial, got {other:?}"),
        }
        assert_eq!(
            store.get(FLOW_NAMESPACE).get("pv_exists"),
            Some(&json!("exists"))
        );
    }

    #[test]
    fn test_renovation_request_prefixes_session_keys() {
        let rules = default_rules().expect("rules parse");
        let flow = renovation_request("scenario1", &rules).expect("flow builds");
        let renderer = renderer();
        let mut store = MemorySession::new();

        let mut ctx = FlowContext::new(
            FlowRequest::post([("scenario1-primary_heating", "heat_pump")]).partial(),
            &mut store,
            &renderer,
        );
        let response = flow.dispatch(&mut ctx).expect("dispatch");
        drop(ctx);
        match response {
            FlowResponse::Partial { retarget, .. } => {
                assert_eq!(retarget.as_deref(), Some("renovation_heatpump"));
            }
            other => panic!("expected partial, got {other:?}"),
        }
        let session = store.get(FLOW_NAMESPACE);
        assert_eq!(
            session.get("scenario1-primary_heating"),
            Some(&json!("heat_pump"))
        );
        assert!(!session.contains_key("primary_heating"));
    }
}
