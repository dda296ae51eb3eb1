//! End-to-end walks through small wizard graphs, driven the way the HTTP
//! layer drives them: one request, one fresh context, one dispatch.

use serde_json::json;
use stepflow_core::prelude::*;
use stepflow_core::session::{SessionStore, FLOW_NAMESPACE};

fn renderer() -> TemplateRegistry {
    let mut registry = TemplateRegistry::new();
    registry.register("partials/next_button.html", |ctx| {
        let text = ctx
            .get("next_btn_text")
            .and_then(|v| v.as_str())
            .unwrap_or("Next");
        if ctx.get("next_disabled").and_then(|v| v.as_bool()) == Some(true) {
            format!("<button disabled>{text}</button>")
        } else {
            let vals = ctx.get("hx_vals").and_then(|v| v.as_str()).unwrap_or("");
            format!("<button hx-vals='{vals}'>{text}</button>")
        }
    });
    registry.register("partials/intro.html", |ctx| {
        let headline = ctx.get("headline").and_then(|v| v.as_str()).unwrap_or("");
        format!("<h2>{headline}</h2>")
    });
    registry.register("partials/form_card.html", |ctx| {
        let form = ctx.get("form").and_then(|v| v.as_str()).unwrap_or("");
        format!("<fieldset>{form}</fieldset>")
    });
    registry.register("pages/heating.html", |ctx| {
        let mut html = String::from("<main>");
        for (key, value) in ctx {
            if let Some(fragment) = value.as_str() {
                html.push_str(&format!("<section id=\"{key}\">{fragment}</section>"));
            }
        }
        html.push_str("</main>");
        html
    });
    registry
}

fn source_form() -> FormSpec {
    FormSpec::new("HeatingSource").field(FieldSpec::choice(
        "heating_source",
        [("gas", "Gas"), ("heatpump", "Heat pump")],
    ))
}

fn year_form() -> FormSpec {
    FormSpec::new("GasYear").field(FieldSpec::integer("gas_year").min(1900.0).max(2030.0))
}

fn power_form() -> FormSpec {
    FormSpec::new("HeatpumpPower").field(FieldSpec::float("heatpump_power").min(0.0))
}

/// gas -> year of installation, heatpump -> electrical power, both
/// funnelled through a save gate into the next section.
fn heating_flow() -> Flow {
    Flow::build("heating")
        .template("pages/heating.html")
        .state(
            State::form("heating_source", source_form())
                .transition(Switch::own().case("gas", "gas_year").default("heatpump_power")),
        )
        .state(State::form("gas_year", year_form()).transition(Next::to("save")))
        .state(State::form("heatpump_power", power_form()).transition(Next::to("save")))
        .state(State::stop("save", "heating_done", "Save"))
        .end("intro_hotwater")
        .finish()
        .expect("valid graph")
}

fn prefixed_flow(prefix: &str) -> Flow {
    Flow::build("renovation")
        .prefix(prefix)
        .template("pages/heating.html")
        .state(
            State::form("heating_source", source_form())
                .transition(Switch::own().case("gas", "gas_year").default("heatpump_power")),
        )
        .state(State::form("gas_year", year_form()))
        .state(State::form("heatpump_power", power_form()))
        .end("done")
        .finish()
        .expect("valid graph")
}

fn run(
    flow: &Flow,
    store: &mut MemorySession,
    renderer: &TemplateRegistry,
    request: FlowRequest,
) -> FlowResponse {
    let mut ctx = FlowContext::new(request, store, renderer);
    flow.dispatch(&mut ctx).expect("dispatch")
}

fn partial_html(response: &FlowResponse) -> &str {
    match response {
        FlowResponse::Partial { html, .. } => html,
        other => panic!("expected partial, got {other:?}"),
    }
}

fn retarget(response: &FlowResponse) -> Option<&str> {
    match response {
        FlowResponse::Partial { retarget, .. } => retarget.as_deref(),
        other => panic!("expected partial, got {other:?}"),
    }
}

#[test]
fn test_resubmitting_unchanged_data_is_idempotent() {
    let flow = heating_flow();
    let renderer = renderer();
    let mut store = MemorySession::new();

    let first = run(
        &flow,
        &mut store,
        &renderer,
        FlowRequest::post([("heating_source", "gas")]).partial(),
    );
    let snapshot = store.get(FLOW_NAMESPACE);
    assert_eq!(snapshot.get("heating_source"), Some(&json!("gas")));
    assert_eq!(retarget(&first), Some("gas_year"));

    // The identical submission classifies as unchanged and must neither
    // touch the session nor produce a different response.
    let second = run(
        &flow,
        &mut store,
        &renderer,
        FlowRequest::post([("heating_source", "gas")]).partial(),
    );
    assert_eq!(store.get(FLOW_NAMESPACE), snapshot);
    assert_eq!(first, second);
}

#[test]
fn test_changed_answer_invalidates_the_old_branch() {
    let flow = heating_flow();
    let renderer = renderer();
    let mut store = MemorySession::new();

    run(
        &flow,
        &mut store,
        &renderer,
        FlowRequest::post([("heating_source", "gas")]).partial(),
    );
    run(
        &flow,
        &mut store,
        &renderer,
        FlowRequest::post([("gas_year", "1995")]).partial(),
    );
    assert_eq!(store.get(FLOW_NAMESPACE).get("gas_year"), Some(&json!(1995)));

    // Flipping the source must tear down everything that hung off "gas"
    // before the heat-pump branch renders.
    let response = run(
        &flow,
        &mut store,
        &renderer,
        FlowRequest::post([("heating_source", "heatpump")]).partial(),
    );
    let session = store.get(FLOW_NAMESPACE);
    assert_eq!(session.get("heating_source"), Some(&json!("heatpump")));
    assert!(!session.contains_key("gas_year"));

    let html = partial_html(&response);
    assert!(html.contains(r#"<div id="gas_year" hx-swap-oob="innerHTML">"#));
    assert!(html.contains(r#"<div id="next_button" hx-swap-oob="innerHTML">"#));
    assert!(html.contains("heatpump_power"));
    assert_eq!(retarget(&response), Some("heatpump_power"));
}

#[test]
fn test_descendants_render_pristine_after_ancestor_set() {
    let flow = heating_flow();
    let renderer = renderer();
    let mut store = MemorySession::new();
    let mut stale = stepflow_core::SessionData::new();
    stale.insert("gas_year".into(), json!(1995));
    store.set(FLOW_NAMESPACE, stale);

    let response = run(
        &flow,
        &mut store,
        &renderer,
        FlowRequest::post([("heating_source", "gas")]).partial(),
    );
    let html = partial_html(&response);
    assert!(html.contains(r#"name="gas_year""#));
    assert!(!html.contains("1995"));
}

#[test]
fn test_completed_walk_redirects() {
    let flow = heating_flow();
    let renderer = renderer();
    let mut store = MemorySession::new();
    let mut session = stepflow_core::SessionData::new();
    session.insert("heating_source".into(), json!("gas"));
    session.insert("gas_year".into(), json!(1995));
    session.insert("heating_done".into(), json!("True"));
    store.set(FLOW_NAMESPACE, session);

    let response = run(&flow, &mut store, &renderer, FlowRequest::get().partial());
    assert_eq!(
        response,
        FlowResponse::Redirect("intro_hotwater".to_string())
    );
}

#[test]
fn test_save_gate_submission_redirects() {
    let flow = heating_flow();
    let renderer = renderer();
    let mut store = MemorySession::new();
    let mut session = stepflow_core::SessionData::new();
    session.insert("heating_source".into(), json!("gas"));
    session.insert("gas_year".into(), json!(1995));
    store.set(FLOW_NAMESPACE, session);

    let response = run(
        &flow,
        &mut store,
        &renderer,
        FlowRequest::post([("heating_done", "True")]).partial(),
    );
    assert_eq!(
        response,
        FlowResponse::Redirect("intro_hotwater".to_string())
    );
    assert_eq!(
        store.get(FLOW_NAMESPACE).get("heating_done"),
        Some(&json!("True"))
    );
}

#[test]
fn test_invalid_submission_halts_without_session_writes() {
    let flow = heating_flow();
    let renderer = renderer();
    let mut store = MemorySession::new();
    run(
        &flow,
        &mut store,
        &renderer,
        FlowRequest::post([("heating_source", "gas")]).partial(),
    );
    let snapshot = store.get(FLOW_NAMESPACE);

    let response = run(
        &flow,
        &mut store,
        &renderer,
        FlowRequest::post([("gas_year", "eighteen-ninety")]).partial(),
    );
    assert_eq!(store.get(FLOW_NAMESPACE), snapshot);
    let html = partial_html(&response);
    assert!(html.contains("Enter a whole number."));
    assert_eq!(retarget(&response), Some("gas_year"));
}

#[test]
fn test_finished_requires_every_step_unchanged() {
    let flow = heating_flow();
    let renderer = renderer();
    let mut store = MemorySession::new();
    {
        let ctx = FlowContext::new(FlowRequest::get(), &mut store, &renderer);
        assert!(!flow.finished(&ctx).expect("finished"));
    }

    let mut session = stepflow_core::SessionData::new();
    session.insert("heating_source".into(), json!("gas"));
    session.insert("heating_done".into(), json!("True"));
    store.set(FLOW_NAMESPACE, session.clone());
    {
        // The gas branch still misses its year.
        let ctx = FlowContext::new(FlowRequest::get(), &mut store, &renderer);
        assert!(!flow.finished(&ctx).expect("finished"));
    }

    session.insert("gas_year".into(), json!(1995));
    store.set(FLOW_NAMESPACE, session);
    let ctx = FlowContext::new(FlowRequest::get(), &mut store, &renderer);
    assert!(flow.finished(&ctx).expect("finished"));
}

#[test]
fn test_switch_falls_back_to_default() {
    let flow = heating_flow();
    let renderer = renderer();
    let mut store = MemorySession::new();
    let response = run(
        &flow,
        &mut store,
        &renderer,
        FlowRequest::post([("heating_source", "heatpump")]).partial(),
    );
    assert_eq!(retarget(&response), Some("heatpump_power"));
}

#[test]
fn test_switch_without_matching_case_errors() {
    let flow = Flow::build("heating")
        .state(
            State::form("heating_source", source_form())
                .transition(Switch::own().case("gas", "gas_year")),
        )
        .state(State::form("gas_year", year_form()))
        .end("done")
        .finish()
        .expect("valid graph");
    let renderer = renderer();
    let mut store = MemorySession::new();
    let mut ctx = FlowContext::new(
        FlowRequest::post([("heating_source", "heatpump")]).partial(),
        &mut store,
        &renderer,
    );
    let result = flow.dispatch(&mut ctx);
    assert!(matches!(
        result,
        Err(FlowError::NoSwitchCase { ref state, .. }) if state == "heating_source"
    ));
}

#[test]
fn test_reset_clears_the_active_path_and_stops_at_the_end() {
    let flow = heating_flow();
    let renderer = renderer();
    let mut store = MemorySession::new();
    let mut session = stepflow_core::SessionData::new();
    session.insert("heating_source".into(), json!("heatpump"));
    session.insert("heatpump_power".into(), json!(9.5));
    session.insert("heating_done".into(), json!("True"));
    session.insert("hotwater_supply".into(), json!("boiler"));
    store.set(FLOW_NAMESPACE, session);

    let mut ctx = FlowContext::new(FlowRequest::get(), &mut store, &renderer);
    flow.reset(&mut ctx).expect("reset");
    drop(ctx);

    let session = store.get(FLOW_NAMESPACE);
    assert!(!session.contains_key("heating_source"));
    assert!(!session.contains_key("heatpump_power"));
    assert!(!session.contains_key("heating_done"));
    // Keys belonging to other wizards survive a reset untouched.
    assert_eq!(session.get("hotwater_supply"), Some(&json!("boiler")));
}

#[test]
fn test_prefixed_instances_are_isolated() {
    let first = prefixed_flow("scenario1");
    let second = prefixed_flow("scenario2");
    let renderer = renderer();
    let mut store = MemorySession::new();

    run(
        &first,
        &mut store,
        &renderer,
        FlowRequest::post([("scenario1-heating_source", "gas"), ("scenario1-gas_year", "2001")])
            .partial(),
    );
    run(
        &first,
        &mut store,
        &renderer,
        FlowRequest::post([("scenario1-gas_year", "2001")]).partial(),
    );
    run(
        &second,
        &mut store,
        &renderer,
        FlowRequest::post([("scenario2-heating_source", "heatpump")]).partial(),
    );

    let session = store.get(FLOW_NAMESPACE);
    assert_eq!(session.get("scenario1-heating_source"), Some(&json!("gas")));
    assert_eq!(session.get("scenario1-gas_year"), Some(&json!(2001)));
    assert_eq!(
        session.get("scenario2-heating_source"),
        Some(&json!("heatpump"))
    );
    assert!(!session.contains_key("heating_source"));

    // Resetting one scenario leaves the other's answers in place.
    let mut ctx = FlowContext::new(FlowRequest::get(), &mut store, &renderer);
    first.reset(&mut ctx).expect("reset");
    drop(ctx);
    let session = store.get(FLOW_NAMESPACE);
    assert!(!session.contains_key("scenario1-heating_source"));
    assert_eq!(
        session.get("scenario2-heating_source"),
        Some(&json!("heatpump"))
    );
}

#[test]
fn test_full_page_render_carries_every_visited_step() {
    let flow = heating_flow();
    let renderer = renderer();
    let mut store = MemorySession::new();
    let mut session = stepflow_core::SessionData::new();
    session.insert("heating_source".into(), json!("gas"));
    store.set(FLOW_NAMESPACE, session);

    let response = run(&flow, &mut store, &renderer, FlowRequest::get());
    let FlowResponse::Page { html } = response else {
        panic!("expected a page");
    };
    assert!(html.contains(r#"<section id="heating_source">"#));
    assert!(html.contains(r#"<section id="gas_year">"#));
    assert!(!html.contains("heatpump_power"));
}

#[test]
fn test_data_collects_the_active_path() {
    let flow = heating_flow();
    let renderer = renderer();
    let mut store = MemorySession::new();
    let mut session = stepflow_core::SessionData::new();
    session.insert("heating_source".into(), json!("gas"));
    session.insert("gas_year".into(), json!(1995));
    session.insert("heating_done".into(), json!("True"));
    store.set(FLOW_NAMESPACE, session);

    let ctx = FlowContext::new(FlowRequest::get(), &mut store, &renderer);
    let data = flow.data(&ctx).expect("data");
    assert_eq!(data.get("heating_source"), Some(&json!("gas")));
    assert_eq!(data.get("gas_year"), Some(&json!(1995)));
    assert_eq!(data.get("heating_done"), Some(&json!("True")));
    assert!(!data.contains_key("heatpump_power"));
}

#[test]
fn test_switch_resolves_a_computed_value() {
    let flow = Flow::build("heating")
        .template("pages/heating.html")
        .state(
            State::form("gas_year", year_form()).transition(
                Switch::by(|state: &State, ctx: &FlowContext<'_>| {
                    let vintage = ctx
                        .session_value(state.name())
                        .and_then(|v| v.as_i64())
                        .map(|year| year < 2000)
                        .ok_or_else(|| FlowError::MissingLookup(state.name().to_string()))?;
                    Ok(json!(vintage))
                })
                .case(true, "save")
                .default("heatpump_power"),
            ),
        )
        .state(State::form("heatpump_power", power_form()).transition(Next::to("save")))
        .state(State::stop("save", "heating_done", "Save"))
        .end("done")
        .finish()
        .expect("valid graph");
    let renderer = renderer();
    let mut store = MemorySession::new();

    // A pre-2000 installation goes straight to the save gate.
    let old = run(
        &flow,
        &mut store,
        &renderer,
        FlowRequest::post([("gas_year", "1995")]).partial(),
    );
    assert_eq!(retarget(&old), Some("next_button"));

    // Correcting the year recomputes the branch against the new value.
    let recent = run(
        &flow,
        &mut store,
        &renderer,
        FlowRequest::post([("gas_year", "2010")]).partial(),
    );
    assert_eq!(retarget(&recent), Some("heatpump_power"));
    assert!(partial_html(&recent).contains("name=\"heatpump_power\""));
}

#[test]
fn test_template_section_leads_into_a_wrapped_form() {
    let flow = Flow::build("heating")
        .template("pages/heating.html")
        .state(
            State::template("intro", "partials/intro.html")
                .context("headline", "Heizung")
                .transition(Next::to("heating_source")),
        )
        .state(
            State::form("heating_source", source_form())
                .template_name("partials/form_card.html")
                .transition(Next::to("save")),
        )
        .state(State::stop("save", "heating_done", "Save"))
        .end("done")
        .finish()
        .expect("valid graph");
    let renderer = renderer();
    let mut store = MemorySession::new();

    let first = run(&flow, &mut store, &renderer, FlowRequest::get().partial());
    assert_eq!(retarget(&first), Some("intro"));
    assert!(partial_html(&first).contains("<h2>Heizung</h2>"));

    let second = run(
        &flow,
        &mut store,
        &renderer,
        FlowRequest::post([("intro", "seen")]).partial(),
    );
    assert_eq!(store.get(FLOW_NAMESPACE).get("intro"), Some(&json!("seen")));
    assert_eq!(retarget(&second), Some("heating_source"));
    let html = partial_html(&second);
    assert!(html.contains("<fieldset>"));
    assert!(html.contains("name=\"heating_source\""));
}
