//! exedao configuration file handling
//!
//! Provides default configuration generation and loading for the exedao CLI.
//! Configuration files are TOML format and stored in the user data directory
//! next to the state snapshot.
//!
//! ## Operator vs Governed Settings
//!
//! The `[genesis]` section is read exactly once, by `exedao init`. After
//! that, thresholds live in the state snapshot and change only through
//! `exedao set-requirement` reaching its own threshold. Editing `[genesis]`
//! on an initialized deployment has no effect.

use exedao::governance::{ActionKind, Genesis, MemberId};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Default log level
const DEFAULT_LOG_LEVEL: &str = "info";

/// Default approval threshold for both governed actions
const DEFAULT_REQUIREMENT: u8 = 51;

/// exedao configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExedaoConfig {
    /// State snapshot location
    pub store: StoreConfig,

    /// Genesis parameters (used by `init` only)
    pub genesis: GenesisConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// State snapshot configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Path to the CBOR state snapshot
    pub state_path: PathBuf,
}

/// Genesis configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenesisConfig {
    /// Founding member: 64 hex characters or a label
    pub founder: String,

    /// Shares minted to the founder
    pub initial_shares: u64,

    /// Proposal lifetime, e.g. "48h", "7 days"; "0" or "never" never expires
    #[serde(default = "default_proposal_duration")]
    pub proposal_duration: String,

    /// Approval thresholds in percent
    #[serde(default)]
    pub requirements: RequirementsConfig,
}

/// Per-action approval thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequirementsConfig {
    #[serde(default = "default_requirement")]
    pub mint_shares: u8,

    #[serde(default = "default_requirement")]
    pub set_approval_requirement: u8,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    pub file: Option<PathBuf>,
}

fn default_proposal_duration() -> String {
    "0".to_string()
}

fn default_requirement() -> u8 {
    DEFAULT_REQUIREMENT
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

impl Default for RequirementsConfig {
    fn default() -> Self {
        Self {
            mint_shares: DEFAULT_REQUIREMENT,
            set_approval_requirement: DEFAULT_REQUIREMENT,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
            file: None,
        }
    }
}

/// Parse a human-readable duration to seconds.
///
/// Supports:
/// - "0", "off" or "never" → 0 (proposals never expire)
/// - Human-readable formats via humantime (e.g., "5s", "48h", "7 days")
pub fn parse_duration_to_secs(input: &str) -> Result<u64, String> {
    let input = input.trim();
    if matches!(input, "0" | "off" | "never") {
        return Ok(0);
    }

    let duration = humantime::parse_duration(input)
        .map_err(|e| format!("Invalid duration '{}': {}", input, e))?;

    // 0 means "never expires"; a sub-second lifetime must not read as that.
    match duration.as_secs() {
        0 if !duration.is_zero() => Err(format!(
            "Invalid duration '{}': proposal lifetimes are whole seconds (at least 1s)",
            input
        )),
        secs => Ok(secs),
    }
}

impl GenesisConfig {
    /// Proposal lifetime in seconds.
    pub fn proposal_duration_secs(&self) -> Result<u64, String> {
        parse_duration_to_secs(&self.proposal_duration)
    }

    /// Build engine genesis parameters.
    pub fn to_genesis(&self) -> Result<Genesis, Box<dyn std::error::Error>> {
        let duration = self.proposal_duration_secs()?;
        Ok(Genesis::new(
            MemberId::parse_or_label(&self.founder),
            self.initial_shares,
            duration,
        )
        .with_requirement(ActionKind::MintShares, self.requirements.mint_shares)
        .with_requirement(
            ActionKind::SetApprovalRequirement,
            self.requirements.set_approval_requirement,
        ))
    }
}

impl ExedaoConfig {
    /// Create a new configuration with the given state path and founder
    #[cfg(test)]
    pub fn new(state_path: PathBuf, founder: String, initial_shares: u64) -> Self {
        Self {
            store: StoreConfig { state_path },
            genesis: GenesisConfig {
                founder,
                initial_shares,
                proposal_duration: default_proposal_duration(),
                requirements: RequirementsConfig::default(),
            },
            logging: LoggingConfig::default(),
        }
    }

    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file '{}': {}", path.display(), e))?;

        let config: ExedaoConfig = toml::from_str(&contents)
            .map_err(|e| format!("Failed to parse config file '{}': {}", path.display(), e))?;

        Ok(config)
    }

    /// Save configuration to a TOML file
    #[cfg(test)]
    pub fn save(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| format!("Failed to serialize config: {}", e))?;

        // Create parent directory if needed
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create config directory: {}", e))?;
        }

        fs::write(path, contents)
            .map_err(|e| format!("Failed to write config file '{}': {}", path.display(), e))?;

        Ok(())
    }

    /// Generate default configuration content as a string with comments
    pub fn generate_default_toml(state_path: &Path) -> String {
        format!(
            r#"# exedao Configuration
#
# [genesis] is read ONCE by `exedao init`. After that, thresholds live in the
# state snapshot and change only through governed `set-requirement`
# submissions. Editing [genesis] later has no effect on a running deployment.

[store]
# Path to the CBOR state snapshot
state_path = "{state_path}"

[genesis]
# Founding member: 64 hex characters, or a label hashed into an id
founder = "founder"

# Shares minted to the founder at genesis (must be > 0)
initial_shares = 100

# Proposal lifetime: "48h", "7 days", ... ("0" or "never" = never expires)
proposal_duration = "0"

[genesis.requirements]
# Percent of total shares that must endorse each action (0-100)
mint_shares = 51
set_approval_requirement = 51

[logging]
# Log level: trace, debug, info, warn, error (RUST_LOG overrides)
level = "info"

# Log file path (optional, logs to stderr if not specified)
# file = "/var/log/exedao/exedao.log"
"#,
            state_path = state_path.display()
        )
    }

    /// Create and save a default configuration file
    pub fn create_default(
        config_path: &Path,
        state_path: &Path,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let contents = Self::generate_default_toml(state_path);

        // Create parent directory if needed
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create config directory: {}", e))?;
        }

        fs::write(config_path, contents).map_err(|e| {
            format!(
                "Failed to write config file '{}': {}",
                config_path.display(),
                e
            )
        })?;

        Ok(())
    }
}

/// Get the default data directory
///
/// - Linux: ~/.local/share/exedao/
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("exedao")
}

/// Get the default config file path
pub fn default_config_path() -> PathBuf {
    default_data_dir().join("config.toml")
}

/// Get the default state snapshot path, adjacent to the config file
///
/// - Config: ~/.local/share/exedao/config.toml
/// - State: ~/.local/share/exedao/state.cbor
pub fn default_state_path(config_path: &Path) -> PathBuf {
    config_path
        .parent()
        .unwrap_or(Path::new("."))
        .join("state.cbor")
}
