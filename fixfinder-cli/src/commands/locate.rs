//! `locate` command: run one acquisition against the simulated host.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, ValueEnum};
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;

use fixfinder::clock::{Clock, SystemClock};
use fixfinder::platform::{EnabledSources, PromptResponse};
use fixfinder::sim::{CachedFix, LiveFix, PermissionScript, Scenario, SimulatedPlatform};
use fixfinder::{AcquisitionEngine, AcquisitionEvent, ChannelListener, EngineConfig, FixSource};

use super::common::{load_config, print_fix, CacheModeArg, SourceArg};
use crate::error::CliError;

/// Deadline used when neither the command line nor the config sets one.
const FALLBACK_DEADLINE: Duration = Duration::from_secs(10);

/// How the simulated user answers the permission dialog.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum DenyArg {
    /// Deny the first dialog, grant the second
    Once,
    /// Deny every dialog permanently
    Forever,
}

/// Arguments for `fixfinder locate`.
#[derive(Debug, Args)]
pub struct LocateArgs {
    /// Overall deadline in milliseconds (default: config, then 10000)
    #[arg(long)]
    pub deadline_ms: Option<u64>,

    /// Disable the precise source
    #[arg(long)]
    pub no_precise: bool,

    /// Disable the network source
    #[arg(long)]
    pub no_network: bool,

    /// Disable the passive source
    #[arg(long)]
    pub no_passive: bool,

    /// Provide a cached fix of this age (seconds)
    #[arg(long)]
    pub cached_age_secs: Option<u64>,

    /// Source of the cached fix
    #[arg(long, value_enum, default_value = "precise")]
    pub cached_source: SourceArg,

    /// Delay before each enabled source yields a live fix (milliseconds)
    #[arg(long, default_value = "300")]
    pub live_delay_ms: u64,

    /// Produce no live fixes at all
    #[arg(long)]
    pub no_live: bool,

    /// Simulate a denied location permission
    #[arg(long, value_enum)]
    pub deny_permission: Option<DenyArg>,

    /// Accept the "enable high accuracy" prompt
    #[arg(long)]
    pub accept_prompt: bool,

    /// Enable every source when the location settings screen is opened
    #[arg(long)]
    pub enable_in_settings: bool,

    /// Cache policy (overrides the config file)
    #[arg(long, value_enum)]
    pub cache_mode: Option<CacheModeArg>,

    /// Simulated latitude
    #[arg(long, default_value = "48.8584", allow_hyphen_values = true)]
    pub lat: f64,

    /// Simulated longitude
    #[arg(long, default_value = "2.2945", allow_hyphen_values = true)]
    pub lon: f64,

    /// Print the fix as JSON
    #[arg(long)]
    pub json: bool,

    /// Configuration file (default: ~/.fixfinder/config.ini)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl LocateArgs {
    fn enabled(&self) -> EnabledSources {
        EnabledSources {
            precise: !self.no_precise,
            network: !self.no_network,
            passive: !self.no_passive,
        }
    }

    /// Build the simulated host from the flags.
    pub fn scenario(&self) -> Scenario {
        let enabled = self.enabled();
        let mut scenario = Scenario::default()
            .with_enabled(enabled)
            .with_prompt(if self.accept_prompt {
                PromptResponse::Accepted
            } else {
                PromptResponse::Declined
            });

        scenario = match self.deny_permission {
            None => scenario,
            Some(DenyArg::Once) => scenario.with_permission(PermissionScript::DenyOnce),
            Some(DenyArg::Forever) => scenario.with_permission(PermissionScript::DenyForever),
        };

        if self.enable_in_settings {
            scenario = scenario.with_enabled_after_settings(EnabledSources::ALL);
        }

        if let Some(age) = self.cached_age_secs {
            scenario = scenario.with_cached(CachedFix {
                source: self.cached_source.into(),
                age: Duration::from_secs(age),
                latitude: self.lat,
                longitude: self.lon,
                accuracy: 20.0,
            });
        }

        if !self.no_live {
            let delay = Duration::from_millis(self.live_delay_ms);
            // Network answers sooner but coarser; passive is slowest.
            for (source, delay, accuracy) in [
                (FixSource::Precise, delay, 5.0),
                (FixSource::Network, delay / 2, 35.0),
                (FixSource::Passive, delay * 2, 60.0),
            ] {
                scenario = scenario.with_live(LiveFix {
                    source,
                    delay,
                    latitude: self.lat,
                    longitude: self.lon,
                    accuracy,
                });
            }
        }

        scenario
    }
}

/// Run the locate command.
pub fn run(args: LocateArgs) -> Result<(), CliError> {
    let config = load_config(args.config.as_deref())?;
    let mut engine_config = config.engine_config();
    if let Some(mode) = args.cache_mode {
        engine_config.cache_mode = mode.into();
    }

    let deadline = match args.deadline_ms {
        Some(0) => {
            return Err(CliError::InvalidArgument(
                "--deadline-ms must be greater than zero".to_string(),
            ))
        }
        Some(ms) => Duration::from_millis(ms),
        None => engine_config.default_deadline.unwrap_or(FALLBACK_DEADLINE),
    };

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| CliError::Runtime(e.to_string()))?;

    runtime.block_on(locate(args, engine_config, deadline))
}

async fn locate(
    args: LocateArgs,
    engine_config: EngineConfig,
    deadline: Duration,
) -> Result<(), CliError> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let sim = SimulatedPlatform::new(args.scenario(), Arc::clone(&clock), Handle::current());
    let (listener, mut events) = ChannelListener::new();

    let engine = AcquisitionEngine::builder(sim.clone(), sim.clone(), sim.clone())
        .listener(Arc::new(listener))
        .clock(clock)
        .config(engine_config)
        .build()?;
    sim.attach(engine.handle());

    let interrupted = CancellationToken::new();
    let on_interrupt = interrupted.clone();
    if let Err(e) = ctrlc::set_handler(move || on_interrupt.cancel()) {
        tracing::warn!(error = %e, "Could not install Ctrl-C handler");
    }

    let outcome = engine.start(Some(deadline));
    tracing::info!(
        request_id = %outcome.request_id(),
        deadline_ms = deadline.as_millis() as u64,
        "Locating"
    );

    let result = loop {
        let event = tokio::select! {
            _ = interrupted.cancelled() => {
                engine.cancel();
                break Err(CliError::Interrupted);
            }
            event = events.recv() => event,
        };

        match event {
            Some(AcquisitionEvent::Started(_)) => continue,
            Some(AcquisitionEvent::Success(_, fix)) => {
                if args.json {
                    let json = serde_json::to_string_pretty(&fix)
                        .map_err(|e| CliError::InvalidArgument(e.to_string()))?;
                    println!("{}", json);
                } else {
                    print_fix(&fix);
                }
                break Ok(());
            }
            Some(AcquisitionEvent::Error(_, error)) => break Err(CliError::Acquisition(error)),
            Some(AcquisitionEvent::Timeout(_)) => break Err(CliError::TimedOut(deadline)),
            None => break Err(CliError::Runtime("engine stopped unexpectedly".to_string())),
        }
    };

    let stats = sim.stats();
    tracing::info!(
        permission_requests = stats.permission_requests,
        prompts = stats.prompts,
        settings_opened = stats.settings_opened,
        subscriptions = stats.subscriptions,
        "Simulated host activity"
    );

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        args: LocateArgs,
    }

    fn parse(argv: &[&str]) -> LocateArgs {
        let mut full = vec!["locate"];
        full.extend_from_slice(argv);
        Harness::parse_from(full).args
    }

    #[test]
    fn test_defaults_enable_everything() {
        let args = parse(&[]);
        let scenario = args.scenario();

        assert_eq!(scenario.enabled, EnabledSources::ALL);
        assert_eq!(scenario.live.len(), 3);
        assert!(scenario.cached.is_empty());
        assert_eq!(scenario.permission, PermissionScript::Granted);
    }

    #[test]
    fn test_source_flags() {
        let args = parse(&["--no-network", "--no-passive", "--no-live"]);
        let scenario = args.scenario();

        assert!(scenario.enabled.precise);
        assert!(!scenario.enabled.network);
        assert!(scenario.live.is_empty());
    }

    #[test]
    fn test_cached_fix_flag() {
        let args = parse(&["--cached-age-secs", "90", "--cached-source", "network"]);
        let cached = args.scenario().cached;

        assert_eq!(cached.len(), 1);
        assert_eq!(cached[0].source, FixSource::Network);
        assert_eq!(cached[0].age, Duration::from_secs(90));
    }

    #[test]
    fn test_permission_and_prompt_flags() {
        let args = parse(&["--deny-permission", "once", "--accept-prompt", "--enable-in-settings"]);
        let scenario = args.scenario();

        assert_eq!(scenario.permission, PermissionScript::DenyOnce);
        assert_eq!(scenario.prompt, PromptResponse::Accepted);
        assert_eq!(scenario.enabled_after_settings, Some(EnabledSources::ALL));
    }

    #[test]
    fn test_zero_deadline_rejected() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("config.ini");
        std::fs::write(&path, "[acquisition]\n").unwrap();

        let args = parse(&["--deadline-ms", "0", "--config", path.to_str().unwrap()]);
        assert!(matches!(run(args), Err(CliError::InvalidArgument(_))));
    }
}
