use dialplan::config::Config;
use dialplan::domain::call::{Call, CallHandle};
use dialplan::domain::dial_plan::{DialPlan, DispatchManager};
use dialplan::domain::dialing::{NumericalString, ProviderDefinition, RouteRule, RoutingTable};
use dialplan::infrastructure::events::EventBus;
use dialplan::infrastructure::metrics::describe_metrics;
use dialplan::infrastructure::telephony::LoopbackCall;
use regex::Regex;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = Config::load(config_path.as_deref())?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.level.as_str()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Starting dial plan dispatcher");
    info!("Configuration loaded:\n{}", config.to_toml()?);
    describe_metrics();

    // Start the event bus and register lifecycle handlers
    let bus = Arc::new(EventBus::start(&config.events)?);
    bus.draw(|d| {
        d.before_call(|event| {
            if let Some(call) = event.payload::<CallHandle>() {
                info!("before_call: {} ({})", call.id(), call.context());
            }
            Ok(())
        })
        .after_call(|event| {
            if let Some(call) = event.payload::<CallHandle>() {
                info!("after_call: {}", call.id());
            }
            Ok(())
        })
        .exception(|event| {
            if let Some(e) = event.payload::<anyhow::Error>() {
                error!("exception: {:#}", e);
            }
            Ok(())
        });
    });

    let routes = Arc::new(routing_table(&config)?);
    let dial_plan = Arc::new(demo_dial_plan(Arc::clone(&routes))?);
    info!("Dial plan loaded with {} entry point(s)", dial_plan.len());

    let manager = Arc::new(
        DispatchManager::new(dial_plan, bus.clone())
            .with_request_override(config.dial_plan.request_override),
    );

    // Each call is handled on its own blocking thread
    let calls = vec![
        LoopbackCall::new("internal"),
        LoopbackCall::new("internal").with_request("/outbound"),
        LoopbackCall::new("internal").with_request("/unknown"),
        LoopbackCall::new("broken"),
        LoopbackCall::new("missing"),
    ];

    let mut handles = Vec::new();
    for call in calls {
        let manager = Arc::clone(&manager);
        let call = Arc::new(call);
        handles.push(tokio::task::spawn_blocking(move || {
            let handle: CallHandle = call.clone();
            if let Err(e) = manager.handle(handle) {
                warn!("{}", e);
            }
            call
        }));
    }

    for handle in handles {
        let call = handle.await?;
        info!(
            "Call {} finished (hung up: {}, transcript: {:?})",
            call.id(),
            call.is_hung_up(),
            call.transcript()
        );
    }

    bus.shutdown().await;
    info!("Dial plan dispatcher stopped");

    Ok(())
}

/// Routing table from configuration, or a demo table when none is configured
fn routing_table(config: &Config) -> anyhow::Result<RoutingTable> {
    if !config.routes.is_empty() {
        return Ok(RoutingTable::from_config(config.routes.clone())?);
    }

    let trunk = ProviderDefinition::new("voip_ms")
        .with_host("chicago.voip.ms", Some(5060))
        .stripping("9")
        .prepending("1");
    let backup = ProviderDefinition::new("backup").with_host("sip.backup.example.com", None);

    let mut table = RoutingTable::new();
    table
        .add((RouteRule::new() | Regex::new("^911$")?) >> ProviderDefinition::new("emergency"))
        .add((RouteRule::new() | Regex::new(r"^9\d{7,10}$")?) >> trunk >> backup);
    Ok(table)
}

fn demo_dial_plan(routes: Arc<RoutingTable>) -> anyhow::Result<DialPlan> {
    let mut plan = DialPlan::new();

    plan.register("internal", |env| {
        env.call().log("Welcome to the internal context");
        env.set_variable("dialed", "95551234");
        env.jump_to("outbound")
    })?;

    plan.register("outbound", move |env| {
        let dialed = NumericalString::new(env.variable("dialed").unwrap_or("911"));
        match routes.providers_for(&dialed).first() {
            Some(provider) => env
                .call()
                .log(&format!("Dialing {}", provider.dial_string(dialed.text()))),
            None => env.call().log(&format!("No route for {}", dialed)),
        }
        Err(env.hangup())
    })?;

    plan.register("broken", |_| anyhow::bail!("voicemail storage unavailable"))?;

    Ok(plan)
}
