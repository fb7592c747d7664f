//! Dispatch Integration Tests
//!
//! Drives the dispatch manager through the real event bus with loopback calls.

use dialplan::config::EventsConfig;
use dialplan::domain::call::{Call, CallHandle};
use dialplan::domain::dial_plan::{DialPlan, DispatchManager};
use dialplan::domain::shared::events::EventType;
use dialplan::infrastructure::events::{EventBus, Guard};
use dialplan::infrastructure::telephony::LoopbackCall;
use dialplan::DialPlanError;
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn dial_plan() -> Arc<DialPlan> {
    let mut plan = DialPlan::new();
    plan.register("default", |env| {
        env.call().log("default context");
        Ok(())
    })
    .unwrap()
    .register("sales", |env| {
        env.call().log("sales context");
        env.jump_to("goodbye")
    })
    .unwrap()
    .register("goodbye", |env| {
        env.call().log("goodbye");
        Err(env.hangup())
    })
    .unwrap()
    .register("broken", |_| anyhow::bail!("voicemail storage unavailable"))
    .unwrap();
    Arc::new(plan)
}

fn start_bus() -> Arc<EventBus> {
    Arc::new(EventBus::start(&EventsConfig { workers: 2 }).unwrap())
}

#[tokio::test(flavor = "multi_thread")]
async fn test_lifecycle_events_wrap_the_routine() {
    let bus = start_bus();
    let seen = Arc::new(Mutex::new(Vec::new()));

    for event_type in [EventType::BEFORE_CALL, EventType::AFTER_CALL] {
        let seen = Arc::clone(&seen);
        bus.register_handler(event_type, Some(Guard::of::<CallHandle>()), move |event| {
            let call = event.payload::<CallHandle>().unwrap();
            seen.lock()
                .unwrap()
                .push(format!("{}:{}", event.event_type, call.context()));
            Ok(())
        });
    }

    let manager = DispatchManager::new(dial_plan(), bus.clone());
    let call = Arc::new(LoopbackCall::new("default"));
    manager.handle(call.clone()).unwrap();

    assert_eq!(
        *seen.lock().unwrap(),
        vec!["before_call:default".to_string(), "after_call:default".to_string()]
    );
    assert_eq!(call.hangup_requests(), 1);
    assert_eq!(call.transcript().first().map(String::as_str), Some("default context"));

    bus.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_request_override_and_jump() {
    let bus = start_bus();
    let manager = DispatchManager::new(dial_plan(), bus.clone());

    let call = Arc::new(LoopbackCall::new("default").with_request("/sales"));
    manager.handle(call.clone()).unwrap();

    let transcript = call.transcript();
    assert_eq!(transcript[0], "sales context");
    assert_eq!(transcript[1], "goodbye");
    assert!(call.is_hung_up());
    assert_eq!(call.hangup_requests(), 1);

    bus.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_missing_entry_point_is_reported_and_hung_up() {
    let bus = start_bus();
    let manager = DispatchManager::new(dial_plan(), bus.clone());

    let call = Arc::new(LoopbackCall::new("nowhere").with_request("/elsewhere"));
    let err = manager.handle(call.clone()).unwrap_err();

    assert!(matches!(err, DialPlanError::MissingEntryPoint { .. }));
    assert_eq!(call.hangup_requests(), 1);
    assert!(call.transcript()[0].contains("'nowhere'"));

    bus.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_routine_defect_reaches_exception_handlers() {
    let bus = start_bus();
    let (tx, rx) = mpsc::channel::<String>();
    let tx = Mutex::new(tx);
    bus.register_handler(EventType::EXCEPTION, Some(Guard::of::<anyhow::Error>()), move |event| {
        let error = event.payload::<anyhow::Error>().unwrap();
        tx.lock().unwrap().send(error.to_string())?;
        Ok(())
    });

    let manager = DispatchManager::new(dial_plan(), bus.clone());
    let call = Arc::new(LoopbackCall::new("broken"));
    manager.handle(call.clone()).unwrap();
    assert_eq!(call.hangup_requests(), 1);

    let message = tokio::task::spawn_blocking(move || rx.recv_timeout(Duration::from_secs(10)))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(message, "voicemail storage unavailable");

    bus.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_concurrent_calls_are_independent() {
    let bus = start_bus();
    let manager = Arc::new(DispatchManager::new(dial_plan(), bus.clone()));

    let mut handles = Vec::new();
    for i in 0..16 {
        let manager = Arc::clone(&manager);
        handles.push(tokio::task::spawn_blocking(move || {
            let context = if i % 2 == 0 { "default" } else { "sales" };
            let call = Arc::new(LoopbackCall::new(context));
            manager.handle(call.clone()).unwrap();
            call
        }));
    }

    for handle in handles {
        let call = handle.await.unwrap();
        assert_eq!(call.hangup_requests(), 1);
        let expected = if call.context() == "default" { 1 } else { 2 };
        assert_eq!(call.transcript().len(), expected + 1);
    }

    bus.shutdown().await;
}
