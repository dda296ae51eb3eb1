//! Runnable building-renovation dialogue.
//!
//! Wires the kit's flows into the HTTP ingress with a minimal in-process
//! renderer. The markup is demo-grade on purpose; a real deployment
//! plugs its own [`stepflow_core::Renderer`] into the ingress.

use anyhow::Result;
use stepflow_core::render::{context_str, TemplateContext, TemplateRegistry};
use stepflow_http::{FlowIngress, RouteTable};
use stepflow_kit::{default_rules, flows};

fn page(title: &'static str) -> impl Fn(&TemplateContext) -> String + Send + Sync {
    move |ctx: &TemplateContext| {
        let back = context_str(ctx, "back_url");
        let mut html = format!("<!doctype html><html><body><h1>{title}</h1><main>");
        for (key, value) in ctx {
            if key == "back_url" || key == "next_disabled" {
                continue;
            }
            if let Some(fragment) = value.as_str() {
                html.push_str(&format!("<div id=\"{key}\">{fragment}</div>"));
            }
        }
        html.push_str(&format!(
            "</main><nav><a href=\"{back}\">Zurück</a></nav></body></html>"
        ));
        html
    }
}

fn renderer() -> TemplateRegistry {
    let mut registry = TemplateRegistry::new();

    registry.register("pages/building_type.html", page("Gebäudeart"));
    registry.register("pages/insulation.html", page("Dämmung"));
    registry.register("pages/heating.html", page("Heizung"));
    registry.register("pages/hotwater.html", page("Warmwasser"));
    registry.register("pages/roof.html", page("Dach"));
    registry.register("pages/pv_system.html", page("PV-Anlage"));
    registry.register("pages/renovation_request.html", page("Sanierungswunsch"));
    registry.register("pages/financial_support.html", page("Förderung"));
    registry.register("pages/home.html", page("Gebäudedialog"));
    registry.register("pages/intro_inventory.html", page("Bestandsaufnahme"));
    registry.register("pages/intro_renovation.html", page("Sanierung"));
    registry.register("pages/dead_end.html", page("Denkmalschutz"));

    registry.register("partials/next_button.html", |ctx| {
        let disabled = ctx.get("next_disabled").and_then(|v| v.as_bool()) == Some(true);
        let text = context_str(ctx, "next_btn_text");
        if disabled {
            format!("<button disabled>{text}</button>")
        } else {
            let vals = context_str(ctx, "hx_vals");
            format!("<button hx-post=\"\" hx-vals='{vals}'>{text}</button>")
        }
    });

    for help in [
        "partials/building_type_help.html",
        "partials/building_type_protection_help.html",
        "partials/heating_solar_help.html",
        "partials/heating_storage_help.html",
        "partials/roof_help.html",
        "partials/roof_orientation_help.html",
        "partials/roof_inclination_help.html",
        "partials/pv_system_capacity_help.html",
        "partials/pv_system_battery_help.html",
        "partials/financial_support_help.html",
    ] {
        registry.register(help, |_| "<p>Hinweis</p>".to_string());
    }

    registry
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let rules = default_rules()?;

    let routes = RouteTable::new()
        .route("intro_inventory", "/intro_inventory")
        .route("insulation", "/insulation")
        .route("heating", "/heating")
        .route("hotwater", "/hotwater")
        .route("roof", "/roof")
        .route("pv_system", "/pv_system")
        .route("intro_renovation", "/intro_renovation")
        .route("renovation_overview", "/intro_renovation")
        .route(
            "dead_end_monument_protection",
            "/dead_end_monument_protection",
        )
        .route("optimization_start", "/");

    let scoped_rules = rules.clone();
    tracing::info!("building dialogue listening on http://127.0.0.1:3000");
    FlowIngress::new(renderer())
        .bind("127.0.0.1:3000")
        .routes(routes)
        .page("/", "pages/home.html")
        .page("/intro_inventory", "pages/intro_inventory.html")
        .page("/intro_renovation", "pages/intro_renovation.html")
        .page(
            "/dead_end_monument_protection",
            "pages/dead_end.html",
        )
        .flow("/building_type", flows::building_type(&rules)?)
        .flow("/insulation", flows::insulation(&rules)?)
        .flow("/heating", flows::heating(&rules)?)
        .flow("/hotwater", flows::hotwater(&rules)?)
        .flow("/roof", flows::roof(&rules)?)
        .flow("/pv_system", flows::pv_system(&rules)?)
        .flow("/financial_support", flows::financial_support(&rules)?)
        .scoped_flow("/renovation", move |prefix| {
            flows::renovation_request(prefix, &scoped_rules)
        })
        .run()
        .await?;

    Ok(())
}
