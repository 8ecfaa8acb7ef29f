//! Process-wide prompt debounce across engines.
//!
//! Kept in its own test binary: it relies on the process-wide last-prompt
//! record being untouched when the test starts.
//!
//! Run with: `cargo test --test shared_debounce_integration`

use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;

use fixfinder::clock::ManualClock;
use fixfinder::engine::{AcquisitionEngine, EngineConfig, Phase};
use fixfinder::fix::FixTime;
use fixfinder::platform::EnabledSources;
use fixfinder::sim::{Scenario, SimulatedPlatform};

// ============================================================================
// Helper Functions
// ============================================================================

const PRECISE_ONLY: EnabledSources = EnabledSources {
    precise: true,
    network: false,
    passive: false,
};

/// Engine over its own simulated host, built without an explicit debounce.
fn engine_without_debounce(
    clock: Arc<ManualClock>,
    window: Duration,
) -> (AcquisitionEngine, Arc<SimulatedPlatform>) {
    let scenario = Scenario::default().with_enabled(PRECISE_ONLY);
    let sim = SimulatedPlatform::new(scenario, clock.clone(), Handle::current());

    let engine = AcquisitionEngine::builder(sim.clone(), sim.clone(), sim.clone())
        .clock(clock)
        .config(EngineConfig::default().with_prompt_debounce_window(window))
        .build()
        .expect("engine should build inside a runtime");
    sim.attach(engine.handle());

    (engine, sim)
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_custom_window_debounce_is_shared_between_engines() {
    let clock = Arc::new(ManualClock::new(FixTime::from_millis(1_700_000_000_000)));
    let window = Duration::from_secs(30);

    let (first, first_sim) = engine_without_debounce(clock.clone(), window);
    let (second, second_sim) = engine_without_debounce(clock.clone(), window);

    first.start(None);
    second.start(None);

    assert_eq!(first_sim.stats().prompts, 1);
    assert_eq!(second_sim.stats().prompts, 0);
    assert_eq!(second.phase(), Phase::AwaitingLiveFix);

    // Once the window has passed, another engine may prompt again.
    second.cancel();
    clock.advance(window);
    let (third, third_sim) = engine_without_debounce(clock.clone(), window);
    third.start(None);
    assert_eq!(third_sim.stats().prompts, 1);
}
