use crate::reconcile_core::normalizer::{DEFAULT_UNASSIGNED_COUNTRY, DEFAULT_UNASSIGNED_FACILITY};
use crate::reconcile_core::tiers::{TierPolicy, TierPolicyError};
use crate::reconcile_core::UnassignedSentinel;
use std::env;
use std::path::PathBuf;

pub const DEFAULT_INPUT_PATH: &str = "data/rows.jsonl";
pub const DEFAULT_JSONL_OUTPUT_PATH: &str = "output/country_tagged.jsonl";
pub const DEFAULT_SQLITE_OUTPUT_PATH: &str = "data/billflow.db";

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BackendType {
    Jsonl,
    Sqlite,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidValue(String),
    TierPolicy(TierPolicyError),
}

impl From<TierPolicyError> for ConfigError {
    fn from(err: TierPolicyError) -> Self {
        ConfigError::TierPolicy(err)
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::InvalidValue(msg) => write!(f, "Invalid configuration value: {}", msg),
            ConfigError::TierPolicy(e) => write!(f, "Invalid tier policy: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub backend: BackendType,
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub tier_policy: TierPolicy,
    pub sentinel: UnassignedSentinel,
    /// Default log filter, applied by the binary when the logger starts
    pub rust_log: String,
}

impl RuntimeConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let backend = parse_backend_from_args();
        Self::from_lookup(backend, |name| env::var(name).ok())
    }

    /// Build from any variable source; empty values count as unset.
    pub fn from_lookup<F>(backend: BackendType, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let input_path: PathBuf = var("RECONCILE_INPUT_PATH")
            .unwrap_or_else(|| DEFAULT_INPUT_PATH.to_string())
            .into();

        let output_path: PathBuf = var("RECONCILE_OUTPUT_PATH")
            .unwrap_or_else(|| match backend {
                BackendType::Sqlite => DEFAULT_SQLITE_OUTPUT_PATH.to_string(),
                BackendType::Jsonl => DEFAULT_JSONL_OUTPUT_PATH.to_string(),
            })
            .into();

        // The output file is truncated on open
        if input_path == output_path {
            return Err(ConfigError::InvalidValue(format!(
                "RECONCILE_OUTPUT_PATH must differ from RECONCILE_INPUT_PATH ({})",
                input_path.display()
            )));
        }

        // A policy file wins over the inline form
        let tier_policy = if let Some(path) = var("ALLOCATION_TIERS_PATH") {
            TierPolicy::from_json_file(&path)?
        } else if let Some(inline) = var("ALLOCATION_TIERS") {
            TierPolicy::parse_inline(&inline)?
        } else {
            TierPolicy::default()
        };

        let sentinel = UnassignedSentinel {
            country: var("UNASSIGNED_COUNTRY")
                .map(|s| s.trim().to_string())
                .unwrap_or_else(|| DEFAULT_UNASSIGNED_COUNTRY.to_string()),
            facility: var("UNASSIGNED_FACILITY")
                .map(|s| s.trim().to_string())
                .unwrap_or_else(|| DEFAULT_UNASSIGNED_FACILITY.to_string()),
        };

        let rust_log = var("RUST_LOG").unwrap_or_else(|| "info".to_string());

        Ok(Self {
            backend,
            input_path,
            output_path,
            tier_policy,
            sentinel,
            rust_log,
        })
    }
}

pub fn parse_backend_from_args() -> BackendType {
    let args: Vec<String> = env::args().collect();
    parse_backend(&args)
}

pub fn parse_backend(args: &[String]) -> BackendType {
    if let Some(idx) = args.iter().position(|x| x == "--backend") {
        match args.get(idx + 1).map(|s| s.as_str()) {
            Some("sqlite") => return BackendType::Sqlite,
            Some("jsonl") => return BackendType::Jsonl,
            Some(other) => {
                log::warn!("Unknown backend '{}', defaulting to jsonl", other);
            }
            None => {}
        }
    }

    BackendType::Jsonl // Default to JSONL
}
