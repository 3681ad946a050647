//! Dispatcher routing, payload delivery and the response grace period.
mod common;

use common::RecordingResponder;
use serde_json::json;
use slashkit::ConfigError;
use slashkit::constants::{NOTICE_EXPIRED, NOTICE_FAILED, NOTICE_UNAVAILABLE};
use slashkit::interactions::dispatch::lookup_key;
use slashkit::interactions::{
    ComponentCodec, ComponentDef, ComponentKind, ComponentRegistry, DispatchOutcome, Dispatcher,
    InteractionHandler, InteractionRoute, Invocation, handler_fn,
};
use slashkit::routes::{CommandMeta, Route, RouteTable};
use slashkit::services::cache::{MemoryBackend, PayloadStore};
use slashkit::util::ManualClock;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::RwLock;

const GRACE: Duration = Duration::from_millis(2000);

fn replying(path: &str, text: &'static str) -> Route {
    Route::parse(
        path,
        CommandMeta::builder("test").build(),
        handler_fn(move |inv| async move {
            inv.reply(text).await?;
            Ok(())
        }),
    )
    .unwrap()
}

struct Harness {
    clock: Arc<ManualClock>,
    codec: Arc<ComponentCodec>,
    dispatcher: Dispatcher,
}

fn harness(routes: Vec<Route>, components: Vec<ComponentDef>) -> Harness {
    let clock = Arc::new(ManualClock::default());
    let store = PayloadStore::new(Arc::new(MemoryBackend::new())).with_clock(clock.clone());
    let codec = Arc::new(ComponentCodec::new(Arc::new(store)));
    let mut registry = ComponentRegistry::new(codec.clone());
    registry.register_all(components).unwrap();
    let table = RouteTable::from_routes(routes).unwrap();
    let dispatcher = Dispatcher::new(Arc::new(RwLock::new(table)), Arc::new(registry))
        .with_grace_period(GRACE);
    Harness {
        clock,
        codec,
        dispatcher,
    }
}

async fn run(h: &Harness, route: InteractionRoute) -> (DispatchOutcome, Arc<RecordingResponder>) {
    let responder = Arc::new(RecordingResponder::default());
    let outcome = h.dispatcher.dispatch(route, responder.clone(), None).await;
    (outcome, responder)
}

fn component(custom_id: &str) -> InteractionRoute {
    InteractionRoute::Component {
        custom_id: custom_id.to_string(),
    }
}

#[test]
fn lookup_key_joins_present_parts() {
    assert_eq!(lookup_key("ping", None, None), "ping");
    assert_eq!(lookup_key("shop", None, Some("buy")), "shop.buy");
    assert_eq!(lookup_key("admin", Some("cache"), Some("stats")), "admin.cache.stats");
}

#[tokio::test(start_paused = true)]
async fn commands_route_by_root_sub_and_group() {
    let h = harness(
        vec![
            replying("ping", "pong"),
            replying("shop.buy", "bought"),
            replying("admin.cache.stats", "stats"),
        ],
        vec![],
    );

    let (outcome, r) = run(&h, InteractionRoute::command("ping", None, None)).await;
    assert_eq!(outcome, DispatchOutcome::Handled);
    assert_eq!(r.log(), vec!["reply:pong"]);

    let (outcome, r) = run(&h, InteractionRoute::command("shop", None, Some("buy"))).await;
    assert_eq!(outcome, DispatchOutcome::Handled);
    assert_eq!(r.log(), vec!["reply:bought"]);

    let (outcome, r) = run(
        &h,
        InteractionRoute::command("admin", Some("cache"), Some("stats")),
    )
    .await;
    assert_eq!(outcome, DispatchOutcome::Handled);
    assert_eq!(r.log(), vec!["reply:stats"]);
}

#[tokio::test(start_paused = true)]
async fn unknown_command_gets_unavailable_notice() {
    let h = harness(vec![replying("ping", "pong")], vec![]);
    let (outcome, r) = run(&h, InteractionRoute::command("shop", None, Some("buy"))).await;
    assert_eq!(outcome, DispatchOutcome::Unknown);
    assert_eq!(r.log(), vec![format!("reply:{NOTICE_UNAVAILABLE}")]);
}

#[tokio::test(start_paused = true)]
async fn hanging_handler_is_deferred_after_grace_period() {
    let hang = Route::parse(
        "slow",
        CommandMeta::builder("never answers").build(),
        handler_fn(|_inv| async {
            std::future::pending::<()>().await;
            Ok(())
        }),
    )
    .unwrap();
    let h = harness(vec![hang], vec![]);

    let started = tokio::time::Instant::now();
    let (outcome, r) = run(&h, InteractionRoute::command("slow", None, None)).await;
    assert_eq!(outcome, DispatchOutcome::Deferred);
    assert!(started.elapsed() >= GRACE);
    assert_eq!(r.log(), vec!["defer"]);
}

#[tokio::test(start_paused = true)]
async fn handler_that_never_responds_is_deferred() {
    let quiet = Route::parse(
        "quiet",
        CommandMeta::builder("returns without replying").build(),
        handler_fn(|_inv| async { Ok(()) }),
    )
    .unwrap();
    let h = harness(vec![quiet], vec![]);
    let (outcome, r) = run(&h, InteractionRoute::command("quiet", None, None)).await;
    assert_eq!(outcome, DispatchOutcome::Deferred);
    assert_eq!(r.log(), vec!["defer"]);
}

#[tokio::test(start_paused = true)]
async fn late_reply_becomes_follow_up() {
    let late = Route::parse(
        "late",
        CommandMeta::builder("answers after the grace period").build(),
        handler_fn(|inv| async move {
            tokio::time::sleep(Duration::from_secs(3)).await;
            inv.reply("done").await?;
            Ok(())
        }),
    )
    .unwrap();
    let h = harness(vec![late], vec![]);
    let (outcome, r) = run(&h, InteractionRoute::command("late", None, None)).await;
    assert_eq!(outcome, DispatchOutcome::Deferred);

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(r.log(), vec!["defer", "follow_up:done"]);
}

#[tokio::test(start_paused = true)]
async fn acknowledged_handler_still_running_is_handled() {
    let slow = Route::parse(
        "slow",
        CommandMeta::builder("defers then works").build(),
        handler_fn(|inv| async move {
            inv.defer().await?;
            tokio::time::sleep(Duration::from_secs(10)).await;
            inv.reply("finished").await?;
            Ok(())
        }),
    )
    .unwrap();
    let h = harness(vec![slow], vec![]);
    let (outcome, r) = run(&h, InteractionRoute::command("slow", None, None)).await;
    assert_eq!(outcome, DispatchOutcome::Handled);
    assert_eq!(r.log(), vec!["defer"]);
}

#[tokio::test(start_paused = true)]
async fn handler_error_sends_failure_notice() {
    let broken = Route::parse(
        "broken",
        CommandMeta::builder("always fails").build(),
        handler_fn(|_inv| async { Err(anyhow::anyhow!("database unavailable")) }),
    )
    .unwrap();
    let h = harness(vec![broken], vec![]);
    let (outcome, r) = run(&h, InteractionRoute::command("broken", None, None)).await;
    assert_eq!(outcome, DispatchOutcome::Failed);
    assert_eq!(r.log(), vec![format!("reply:{NOTICE_FAILED}")]);
}

#[tokio::test(start_paused = true)]
async fn failure_after_defer_is_sent_as_follow_up() {
    let broken = Route::parse(
        "broken",
        CommandMeta::builder("defers then fails").build(),
        handler_fn(|inv| async move {
            inv.defer().await?;
            Err(anyhow::anyhow!("database unavailable"))
        }),
    )
    .unwrap();
    let h = harness(vec![broken], vec![]);
    let (outcome, r) = run(&h, InteractionRoute::command("broken", None, None)).await;
    assert_eq!(outcome, DispatchOutcome::Failed);
    assert_eq!(
        r.log(),
        vec!["defer".to_string(), format!("follow_up:{NOTICE_FAILED}")]
    );
}

#[tokio::test(start_paused = true)]
async fn component_receives_its_payload() {
    let seen: Arc<Mutex<Option<serde_json::Value>>> = Arc::default();
    let sink = seen.clone();
    let confirm = ComponentDef::button(
        "confirm",
        handler_fn(move |inv: Invocation| {
            let sink = sink.clone();
            async move {
                *sink.lock().unwrap() = inv.payload.clone();
                inv.responder
                    .update(slashkit::interactions::Reply::new("confirmed"))
                    .await?;
                Ok(())
            }
        }),
    );
    let h = harness(vec![], vec![confirm]);
    let wire = h
        .codec
        .attach("confirm", &json!({"sku": "potion", "price": 25}), None)
        .await
        .unwrap();

    let (outcome, r) = run(&h, component(&wire)).await;
    assert_eq!(outcome, DispatchOutcome::Handled);
    assert_eq!(r.log(), vec!["update:confirmed"]);
    assert_eq!(
        seen.lock().unwrap().clone(),
        Some(json!({"sku": "potion", "price": 25}))
    );
}

#[tokio::test(start_paused = true)]
async fn expired_payload_skips_the_handler() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let confirm = ComponentDef::button(
        "confirm",
        handler_fn(move |_inv| {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Ok(()) }
        }),
    );
    let h = harness(vec![], vec![confirm]);
    let wire = h.codec.attach("confirm", &1, Some(1)).await.unwrap();
    h.clock.advance(chrono::Duration::minutes(2));

    let (outcome, r) = run(&h, component(&wire)).await;
    assert_eq!(outcome, DispatchOutcome::Expired);
    assert_eq!(r.log(), vec![format!("reply:{NOTICE_EXPIRED}")]);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn expiry_is_reported_before_unknown_base_id() {
    let h = harness(vec![], vec![]);
    let (outcome, _) = run(&h, component("retired:deadtoken")).await;
    assert_eq!(outcome, DispatchOutcome::Expired);

    let (outcome, r) = run(&h, component("retired")).await;
    assert_eq!(outcome, DispatchOutcome::Unknown);
    assert_eq!(r.log(), vec![format!("reply:{NOTICE_UNAVAILABLE}")]);
}

#[tokio::test(start_paused = true)]
async fn plain_component_gets_no_payload() {
    let had_payload = Arc::new(AtomicBool::new(true));
    let flag = had_payload.clone();
    let cancel = ComponentDef::button(
        "cancel",
        handler_fn(move |inv: Invocation| {
            flag.store(inv.payload.is_some(), Ordering::SeqCst);
            async move {
                inv.reply("cancelled").await?;
                Ok(())
            }
        }),
    );
    let h = harness(vec![], vec![cancel]);
    let (outcome, _) = run(&h, component("cancel")).await;
    assert_eq!(outcome, DispatchOutcome::Handled);
    assert!(!had_payload.load(Ordering::SeqCst));
}

#[tokio::test(start_paused = true)]
async fn modals_and_buttons_use_separate_namespaces() {
    let button = ComponentDef::button(
        "feedback",
        handler_fn(|inv| async move {
            inv.reply("button").await?;
            Ok(())
        }),
    );
    let modal = ComponentDef::modal(
        "feedback",
        handler_fn(|inv| async move {
            inv.reply("modal").await?;
            Ok(())
        }),
    );
    let h = harness(vec![], vec![button, modal]);

    let (_, r) = run(&h, component("feedback")).await;
    assert_eq!(r.log(), vec!["reply:button"]);
    let (_, r) = run(
        &h,
        InteractionRoute::Modal {
            custom_id: "feedback".to_string(),
        },
    )
    .await;
    assert_eq!(r.log(), vec!["reply:modal"]);
}

#[test]
fn duplicate_base_id_in_one_family_is_rejected() {
    let codec = Arc::new(ComponentCodec::new(Arc::new(PayloadStore::in_memory())));
    let mut registry = ComponentRegistry::new(codec);
    let noop = || handler_fn(|_inv| async { Ok(()) });
    registry
        .register(ComponentDef::button("pick", noop()))
        .unwrap();
    let err = registry
        .register(ComponentDef::new(ComponentKind::StringSelect, "pick", noop()))
        .unwrap_err();
    assert!(matches!(err, ConfigError::DuplicateComponent(_)));
    registry.register(ComponentDef::modal("pick", noop())).unwrap();
    assert_eq!(registry.len(), 2);

    assert!(matches!(
        registry.plain_id(ComponentKind::Button, "missing"),
        Err(ConfigError::UnknownComponent(_))
    ));
    assert_eq!(registry.plain_id(ComponentKind::Button, "pick").unwrap(), "pick");
}

#[tokio::test]
async fn ids_are_only_minted_for_the_registered_kind() {
    let codec = Arc::new(ComponentCodec::new(Arc::new(PayloadStore::in_memory())));
    let mut registry = ComponentRegistry::new(codec);
    registry
        .register(ComponentDef::button("pick", handler_fn(|_inv| async { Ok(()) })))
        .unwrap();

    assert!(matches!(
        registry.plain_id(ComponentKind::StringSelect, "pick"),
        Err(ConfigError::UnknownComponent(_))
    ));
    let err = registry
        .wire_id(ComponentKind::StringSelect, "pick", &1, None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        slashkit::BotError::Config(ConfigError::UnknownComponent(_))
    ));
    assert!(
        registry
            .wire_id(ComponentKind::Button, "pick", &1, None)
            .await
            .unwrap()
            .starts_with("pick:")
    );
}

struct Suggest {
    runs: AtomicUsize,
    suggestions: AtomicUsize,
}

#[async_trait::async_trait]
impl InteractionHandler for Suggest {
    async fn run(&self, inv: Invocation) -> anyhow::Result<()> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        inv.reply("ran").await?;
        Ok(())
    }

    async fn autocomplete(&self, _inv: Invocation) -> anyhow::Result<()> {
        self.suggestions.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[tokio::test(start_paused = true)]
async fn autocomplete_goes_to_the_autocomplete_hook() {
    let handler = Arc::new(Suggest {
        runs: AtomicUsize::new(0),
        suggestions: AtomicUsize::new(0),
    });
    let route = Route::parse("shop.buy", CommandMeta::builder("Buy").build(), handler.clone())
        .unwrap();
    let h = harness(vec![route], vec![]);

    let (outcome, r) = run(
        &h,
        InteractionRoute::Autocomplete {
            name: "shop".to_string(),
            group: None,
            subcommand: Some("buy".to_string()),
        },
    )
    .await;
    assert_eq!(outcome, DispatchOutcome::Handled);
    assert!(r.log().is_empty());
    assert_eq!(handler.suggestions.load(Ordering::SeqCst), 1);
    assert_eq!(handler.runs.load(Ordering::SeqCst), 0);
}
