//! # Protocol Bootstrap
//!
//! Builds the protocol at startup and, optionally, populates it with a demo
//! deployment so the oracle simulator has something to answer.
//!
//! ## Bootstrap Sequence
//!
//! 1. **Load Parameters** — YAML file from `SURETY_CONFIG`, else defaults.
//! 2. **Load Seed Key** — hex key from `SURETY_SEED_KEY`, else random.
//! 3. **Deploy** — the owner (`SURETY_OWNER`) becomes the first airline.
//! 4. **Demo Setup** (`SURETY_BOOTSTRAP=1`) — fund the owner, admit and fund
//!    three more airlines, register `SURETY_ORACLES` oracles.
//!
//! The demo setup never aborts: a failed step is logged and the sequence
//! moves on to the next candidate.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use rand::seq::SliceRandom;
use rand::Rng;

use surety_core::{AccountId, FlightKey, FlightStatus, IdentityError, ParamsError, ProtocolParams};
use surety_state::{FlightSurety, KeyedSeedSource, RecordingTransfer};

use crate::simulator::StatusPolicy;
use crate::state::{AppConfig, AppState};

/// Owner identity used when `SURETY_OWNER` is unset.
pub const DEFAULT_OWNER: &str = "airline-0";

/// Oracles registered by the demo setup when `SURETY_ORACLES` is unset.
pub const DEFAULT_ORACLE_COUNT: usize = 20;

/// Airlines admitted by the demo setup, besides the owner.
pub const DEMO_AIRLINES: usize = 3;

/// Flight designators seeded by the demo.
pub const DEMO_FLIGHTS: [&str; 6] = ["NY9200", "CA8300", "SF7100", "BA0900", "SA1200", "TN2300"];

/// Demo flights depart between these many seconds from now.
const DEMO_DEPARTURE_WINDOW: std::ops::RangeInclusive<u64> = 10..=800;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors during bootstrap.
#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    /// Parameter file not found at the given path.
    #[error("protocol config not found: {path}")]
    ConfigNotFound { path: String },

    /// Parameter file is not valid YAML for `ProtocolParams`.
    #[error("invalid protocol config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Parameters parsed but are inconsistent.
    #[error("invalid protocol parameters: {0}")]
    Params(#[from] ParamsError),

    /// Seed key could not be parsed.
    #[error("seed key error: {0}")]
    SeedKey(String),

    /// Owner identity is malformed.
    #[error("invalid owner: {0}")]
    Identity(#[from] IdentityError),

    /// IO error during bootstrap.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Startup options, normally read from the environment.
#[derive(Clone)]
pub struct BootstrapOptions {
    pub config_path: Option<PathBuf>,
    pub seed_key: Option<String>,
    pub owner: String,
    /// Run the demo setup after deployment.
    pub demo: bool,
    pub oracle_count: usize,
    /// Status every simulated oracle reports. `None` picks at random.
    pub oracle_status: Option<FlightStatus>,
}

impl std::fmt::Debug for BootstrapOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BootstrapOptions")
            .field("config_path", &self.config_path)
            .field("seed_key", &self.seed_key.as_ref().map(|_| "[REDACTED]"))
            .field("owner", &self.owner)
            .field("demo", &self.demo)
            .field("oracle_count", &self.oracle_count)
            .field("oracle_status", &self.oracle_status)
            .finish()
    }
}

impl Default for BootstrapOptions {
    fn default() -> Self {
        Self {
            config_path: None,
            seed_key: None,
            owner: DEFAULT_OWNER.to_string(),
            demo: false,
            oracle_count: DEFAULT_ORACLE_COUNT,
            oracle_status: None,
        }
    }
}

impl BootstrapOptions {
    /// Read `SURETY_CONFIG`, `SURETY_SEED_KEY`, `SURETY_OWNER`,
    /// `SURETY_BOOTSTRAP`, `SURETY_ORACLES` and `SURETY_ORACLE_STATUS`.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let demo = std::env::var("SURETY_BOOTSTRAP")
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
            .unwrap_or(defaults.demo);
        let oracle_status = std::env::var("SURETY_ORACLE_STATUS")
            .ok()
            .and_then(|v| match v.parse::<FlightStatus>() {
                Ok(status) => Some(status),
                Err(e) => {
                    tracing::warn!("ignoring SURETY_ORACLE_STATUS: {e}");
                    None
                }
            });
        Self {
            config_path: std::env::var("SURETY_CONFIG").ok().map(PathBuf::from),
            seed_key: std::env::var("SURETY_SEED_KEY").ok(),
            owner: std::env::var("SURETY_OWNER").unwrap_or(defaults.owner),
            demo,
            oracle_count: std::env::var("SURETY_ORACLES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.oracle_count),
            oracle_status,
        }
    }

    /// How simulated oracles pick the status they report.
    pub fn status_policy(&self) -> StatusPolicy {
        match self.oracle_status {
            Some(status) => StatusPolicy::Fixed(status),
            None => StatusPolicy::Random,
        }
    }
}

/// Result of the demo setup.
#[derive(Debug, Clone, Default)]
pub struct DemoSetup {
    /// Operational airlines after the setup, owner included.
    pub airlines: Vec<AccountId>,
    /// Oracles that registered successfully.
    pub oracles: Vec<AccountId>,
    /// Steps that were rejected and skipped.
    pub failures: usize,
}

// ---------------------------------------------------------------------------
// Public entry points
// ---------------------------------------------------------------------------

/// Load and validate protocol parameters from a YAML file.
pub fn load_params(path: &Path) -> Result<ProtocolParams, BootstrapError> {
    if !path.exists() {
        return Err(BootstrapError::ConfigNotFound {
            path: path.display().to_string(),
        });
    }
    let content = std::fs::read_to_string(path)?;
    let params: ProtocolParams = serde_yaml::from_str(&content)?;
    params.validate()?;
    Ok(params)
}

/// Deploy the protocol described by `options`.
pub fn deploy(options: &BootstrapOptions) -> Result<FlightSurety, BootstrapError> {
    let params = match &options.config_path {
        Some(path) => {
            let params = load_params(path)?;
            tracing::info!(path = %path.display(), "loaded protocol parameters");
            params
        }
        None => ProtocolParams::default(),
    };
    let seeds = match &options.seed_key {
        Some(hex) => KeyedSeedSource::from_hex(hex).map_err(BootstrapError::SeedKey)?,
        None => {
            tracing::warn!("SURETY_SEED_KEY not set, using an ephemeral seed key");
            KeyedSeedSource::random()
        }
    };
    let owner = AccountId::new(options.owner.as_str())?;
    Ok(FlightSurety::new(
        owner,
        params,
        Arc::new(seeds),
        Arc::new(RecordingTransfer::new()),
    )?)
}

/// Build the application state, running the demo setup when enabled.
pub fn bootstrap(
    config: AppConfig,
    options: &BootstrapOptions,
) -> Result<(AppState, Option<DemoSetup>), BootstrapError> {
    let protocol = deploy(options)?;
    let demo = if options.demo {
        let owner = AccountId::new(options.owner.as_str())?;
        Some(run_demo_setup(&protocol, &owner, options.oracle_count))
    } else {
        None
    };

    let summary = protocol.summary();
    tracing::info!(
        owner = %summary.owner,
        airlines = summary.airlines_registered,
        oracles = summary.oracles,
        demo = options.demo,
        "flight surety bootstrap complete"
    );

    Ok((AppState::with_protocol(config, protocol), demo))
}

// ---------------------------------------------------------------------------
// Demo deployment
// ---------------------------------------------------------------------------

/// Fund the owner, admit and fund [`DEMO_AIRLINES`] airlines, and register
/// `oracle_count` oracles with the registration fee.
pub fn run_demo_setup(protocol: &FlightSurety, owner: &AccountId, oracle_count: usize) -> DemoSetup {
    let mut setup = DemoSetup::default();
    let funding = protocol.params().min_airline_funding;
    let fee = protocol.params().oracle_registration_fee;

    if let Err(e) = protocol.fund(owner, funding) {
        tracing::warn!(airline = %owner, error = %e, "demo: owner funding failed");
        setup.failures += 1;
    }

    for i in 1..=DEMO_AIRLINES {
        let airline = match AccountId::new(format!("airline-{i}")) {
            Ok(id) => id,
            Err(e) => {
                tracing::warn!(error = %e, "demo: invalid airline id");
                setup.failures += 1;
                continue;
            }
        };
        if let Err(e) = protocol.register_airline(owner, &airline) {
            tracing::warn!(%airline, error = %e, "demo: airline registration failed");
            setup.failures += 1;
            continue;
        }
        if let Err(e) = protocol.fund(&airline, funding) {
            tracing::warn!(%airline, error = %e, "demo: airline funding failed");
            setup.failures += 1;
        }
    }

    for i in 1..=oracle_count {
        let oracle = match AccountId::new(format!("oracle-{i:02}")) {
            Ok(id) => id,
            Err(e) => {
                tracing::warn!(error = %e, "demo: invalid oracle id");
                setup.failures += 1;
                continue;
            }
        };
        match protocol.register_oracle(&oracle, fee) {
            Ok(_) => setup.oracles.push(oracle),
            Err(e) => {
                tracing::warn!(%oracle, error = %e, "demo: oracle registration failed");
                setup.failures += 1;
            }
        }
    }

    setup.airlines = protocol
        .airlines()
        .into_iter()
        .filter(|a| a.is_operational())
        .map(|a| a.id)
        .collect();
    tracing::info!(
        airlines = setup.airlines.len(),
        oracles = setup.oracles.len(),
        failures = setup.failures,
        "demo setup complete"
    );
    setup
}

/// Register the [`DEMO_FLIGHTS`] on randomly chosen operational airlines,
/// departing 10 to 800 seconds from now. Returns the registered keys.
pub fn seed_demo_flights(protocol: &FlightSurety) -> Vec<FlightKey> {
    let airlines: Vec<AccountId> = protocol
        .airlines()
        .into_iter()
        .filter(|a| a.is_operational())
        .map(|a| a.id)
        .collect();
    if airlines.is_empty() {
        tracing::warn!("demo: no operational airline to register flights for");
        return Vec::new();
    }

    let now = u64::try_from(chrono::Utc::now().timestamp()).unwrap_or(0);
    let mut rng = rand::thread_rng();
    let mut keys = Vec::with_capacity(DEMO_FLIGHTS.len());
    for designator in DEMO_FLIGHTS {
        let Some(airline) = airlines.choose(&mut rng) else {
            continue;
        };
        let scheduled_at = now + rng.gen_range(DEMO_DEPARTURE_WINDOW);
        match protocol.register_flight(airline, designator, scheduled_at) {
            Ok(key) => keys.push(key),
            Err(e) => {
                tracing::warn!(%airline, designator, error = %e, "demo: flight registration failed");
            }
        }
    }
    keys
}

#[cfg(test)]
mod tests {
    use super::*;

    fn protocol() -> FlightSurety {
        deploy(&BootstrapOptions {
            seed_key: Some("11".repeat(32)),
            ..BootstrapOptions::default()
        })
        .unwrap()
    }

    #[test]
    fn demo_setup_admits_and_funds_airlines() {
        let protocol = protocol();
        let owner = AccountId::new(DEFAULT_OWNER).unwrap();
        let setup = run_demo_setup(&protocol, &owner, 5);
        assert_eq!(setup.airlines.len(), 1 + DEMO_AIRLINES);
        assert_eq!(setup.oracles.len(), 5);
        assert_eq!(setup.failures, 0);
        assert!(protocol.is_airline_operational(&AccountId::new("airline-3").unwrap()));
    }

    #[test]
    fn demo_setup_continues_past_failures() {
        let protocol = protocol();
        let owner = AccountId::new(DEFAULT_OWNER).unwrap();
        // Already registered: the second run rejects every step but finishes.
        run_demo_setup(&protocol, &owner, 3);
        let setup = run_demo_setup(&protocol, &owner, 4);
        assert_eq!(setup.failures, DEMO_AIRLINES + 3);
        assert_eq!(setup.oracles, vec![AccountId::new("oracle-04").unwrap()]);
        assert_eq!(protocol.oracles().len(), 4);
    }

    #[test]
    fn demo_flights_land_on_operational_airlines() {
        let protocol = protocol();
        let owner = AccountId::new(DEFAULT_OWNER).unwrap();
        run_demo_setup(&protocol, &owner, 0);
        let keys = seed_demo_flights(&protocol);
        assert_eq!(keys.len(), DEMO_FLIGHTS.len());
        for key in &keys {
            assert!(protocol.is_airline_operational(key.airline()));
            assert_eq!(protocol.flight_status(key).unwrap(), FlightStatus::Unknown);
        }
    }

    #[test]
    fn no_flights_without_operational_airline() {
        assert!(seed_demo_flights(&protocol()).is_empty());
    }

    #[test]
    fn params_load_from_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("params.yaml");
        std::fs::write(&path, "agreement_threshold: 5\nindex_range: 12\n").unwrap();
        let params = load_params(&path).unwrap();
        assert_eq!(params.agreement_threshold, 5);
        assert_eq!(params.index_range, 12);
        assert_eq!(params.multiparty_threshold, 4);
    }

    #[test]
    fn invalid_params_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("params.yaml");
        std::fs::write(&path, "index_range: 2\n").unwrap();
        assert!(matches!(load_params(&path), Err(BootstrapError::Params(_))));

        std::fs::write(&path, "no_such_field: 1\n").unwrap();
        assert!(matches!(load_params(&path), Err(BootstrapError::Yaml(_))));

        let missing = dir.path().join("missing.yaml");
        assert!(matches!(
            load_params(&missing),
            Err(BootstrapError::ConfigNotFound { .. })
        ));
    }

    #[test]
    fn malformed_seed_key_fails() {
        let options = BootstrapOptions {
            seed_key: Some("zz".into()),
            ..BootstrapOptions::default()
        };
        assert!(matches!(deploy(&options), Err(BootstrapError::SeedKey(_))));
    }

    #[test]
    fn debug_redacts_seed_key() {
        let options = BootstrapOptions {
            seed_key: Some("11".repeat(32)),
            ..BootstrapOptions::default()
        };
        assert!(!format!("{options:?}").contains("1111"));
    }
}
