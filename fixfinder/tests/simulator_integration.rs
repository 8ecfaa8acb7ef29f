//! End-to-end tests against the scripted host in `fixfinder::sim`.
//!
//! Unlike `acquisition_integration`, every host-side answer here arrives
//! asynchronously from a spawned task, the way a real permission dialog or
//! settings screen reports back.
//!
//! Run with: `cargo test --test simulator_integration`

use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::mpsc;

use fixfinder::availability::PromptDebounce;
use fixfinder::clock::ManualClock;
use fixfinder::engine::{AcquisitionEngine, EngineConfig};
use fixfinder::error::AcquisitionError;
use fixfinder::fix::{FixSource, FixTime};
use fixfinder::listener::{AcquisitionEvent, ChannelListener};
use fixfinder::platform::{EnabledSources, PromptResponse};
use fixfinder::sim::{CachedFix, LiveFix, PermissionScript, Scenario, SimulatedPlatform};

// ============================================================================
// Helper Functions
// ============================================================================

fn run(
    scenario: Scenario,
) -> (
    AcquisitionEngine,
    Arc<SimulatedPlatform>,
    mpsc::UnboundedReceiver<AcquisitionEvent>,
) {
    let clock = Arc::new(ManualClock::new(FixTime::from_millis(1_700_000_000_000)));
    let sim = SimulatedPlatform::new(scenario, clock.clone(), Handle::current());
    let (listener, events) = ChannelListener::new();

    let engine = AcquisitionEngine::builder(sim.clone(), sim.clone(), sim.clone())
        .listener(Arc::new(listener))
        .clock(clock)
        .debounce(Arc::new(PromptDebounce::new(Duration::from_secs(60))))
        .config(EngineConfig::default())
        .build()
        .expect("engine should build inside a runtime");
    sim.attach(engine.handle());

    (engine, sim, events)
}

async fn terminal(events: &mut mpsc::UnboundedReceiver<AcquisitionEvent>) -> AcquisitionEvent {
    loop {
        let event = tokio::time::timeout(Duration::from_secs(2), events.recv())
            .await
            .expect("timed out waiting for outcome")
            .expect("listener channel closed");
        if event.is_terminal() {
            return event;
        }
    }
}

fn live(source: FixSource, delay_ms: u64, accuracy: f64) -> LiveFix {
    LiveFix {
        source,
        delay: Duration::from_millis(delay_ms),
        latitude: 40.4168,
        longitude: -3.7038,
        accuracy,
    }
}

// ============================================================================
// Scenarios
// ============================================================================

#[tokio::test]
async fn test_earliest_live_source_wins() {
    let scenario = Scenario::default()
        .with_live(live(FixSource::Precise, 200, 5.0))
        .with_live(live(FixSource::Network, 10, 30.0));
    let (engine, sim, mut events) = run(scenario);

    engine.start(Some(Duration::from_secs(1)));

    match terminal(&mut events).await {
        AcquisitionEvent::Success(_, fix) => assert_eq!(fix.source(), FixSource::Network),
        other => panic!("expected success, got {:?}", other),
    }
    let stats = sim.stats();
    assert_eq!(stats.subscriptions, 2);
    assert_eq!(stats.unsubscriptions, 2);
    assert_eq!(sim.active_subscriptions(), 0);
}

#[tokio::test]
async fn test_cached_fix_used_when_fresh() {
    let scenario = Scenario::default().with_cached(CachedFix {
        source: FixSource::Precise,
        age: Duration::from_secs(20),
        latitude: 1.0,
        longitude: 2.0,
        accuracy: 12.0,
    });
    let (engine, sim, mut events) = run(scenario);

    engine.start(None);

    assert!(matches!(terminal(&mut events).await, AcquisitionEvent::Success(_, _)));
    assert_eq!(sim.stats().subscriptions, 0);
}

#[tokio::test]
async fn test_permission_denied_once_then_granted() {
    let scenario = Scenario::default()
        .with_permission(PermissionScript::DenyOnce)
        .with_live(live(FixSource::Precise, 5, 8.0));
    let (engine, sim, mut events) = run(scenario);

    engine.start(Some(Duration::from_secs(1)));

    assert!(matches!(terminal(&mut events).await, AcquisitionEvent::Success(_, _)));
    assert_eq!(sim.stats().permission_requests, 2);
}

#[tokio::test]
async fn test_permission_denied_forever() {
    let scenario = Scenario::default().with_permission(PermissionScript::DenyForever);
    let (engine, sim, mut events) = run(scenario);

    let id = engine.start(None).request_id();

    assert_eq!(
        terminal(&mut events).await,
        AcquisitionEvent::Error(id, AcquisitionError::PermissionDenied)
    );
    let stats = sim.stats();
    assert_eq!(stats.permission_requests, 1);
    assert_eq!(stats.app_settings_opened, 1);
}

#[tokio::test]
async fn test_user_enables_providers_in_settings() {
    let scenario = Scenario::default()
        .with_enabled(EnabledSources::NONE)
        .with_enabled_after_settings(EnabledSources::ALL)
        .with_live(live(FixSource::Network, 5, 25.0));
    let (engine, sim, mut events) = run(scenario);

    engine.start(Some(Duration::from_secs(1)));

    assert!(matches!(terminal(&mut events).await, AcquisitionEvent::Success(_, _)));
    assert_eq!(sim.stats().settings_opened, 1);
}

#[tokio::test]
async fn test_providers_left_disabled() {
    let scenario = Scenario::default().with_enabled(EnabledSources::NONE);
    let (engine, _sim, mut events) = run(scenario);

    let id = engine.start(Some(Duration::from_secs(1))).request_id();

    assert_eq!(
        terminal(&mut events).await,
        AcquisitionEvent::Error(id, AcquisitionError::NoProviderAvailable)
    );
}

#[tokio::test]
async fn test_high_accuracy_prompt_accepted() {
    let scenario = Scenario::default()
        .with_enabled(EnabledSources {
            precise: true,
            network: false,
            passive: false,
        })
        .with_prompt(PromptResponse::Accepted)
        .with_enabled_after_settings(EnabledSources::ALL)
        .with_live(live(FixSource::Network, 5, 40.0));
    let (engine, sim, mut events) = run(scenario);

    engine.start(Some(Duration::from_secs(1)));

    match terminal(&mut events).await {
        AcquisitionEvent::Success(_, fix) => assert_eq!(fix.source(), FixSource::Network),
        other => panic!("expected success, got {:?}", other),
    }
    let stats = sim.stats();
    assert_eq!(stats.prompts, 1);
    assert_eq!(stats.settings_opened, 1);
}

#[tokio::test]
async fn test_deadline_without_live_fixes() {
    let (engine, sim, mut events) = run(Scenario::default());

    let id = engine.start(Some(Duration::from_millis(50))).request_id();

    assert_eq!(terminal(&mut events).await, AcquisitionEvent::Timeout(id));
    assert_eq!(sim.active_subscriptions(), 0);
}

#[tokio::test]
async fn test_slow_host_answers_still_correlate() {
    let scenario = Scenario::default()
        .with_permission(PermissionScript::GrantOnRequest)
        .with_response_delay(Duration::from_millis(30))
        .with_live(live(FixSource::Precise, 5, 6.0));
    let (engine, _sim, mut events) = run(scenario);

    let id = engine.start(Some(Duration::from_secs(1))).request_id();

    assert!(matches!(
        terminal(&mut events).await,
        AcquisitionEvent::Success(got, _) if got == id
    ));
}
