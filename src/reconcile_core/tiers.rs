//! Tier policy: ordered priority groups of countries
//!
//! A tier is saturated before any later tier receives a unit. Policies are
//! configuration data, loaded from an inline string or a JSON file.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tier {
    pub name: String,
    pub countries: Vec<String>,
}

impl Tier {
    pub fn new(name: impl Into<String>, countries: &[&str]) -> Self {
        Self {
            name: name.into(),
            countries: countries.iter().map(|c| c.to_string()).collect(),
        }
    }

    pub fn contains(&self, country: &str) -> bool {
        self.countries.iter().any(|c| c == country)
    }
}

#[derive(Debug)]
pub enum TierPolicyError {
    Empty,
    EmptyTier(String),
    DuplicateCountry(String),
    Io(std::io::Error),
    Parse(serde_json::Error),
}

impl From<std::io::Error> for TierPolicyError {
    fn from(err: std::io::Error) -> Self {
        TierPolicyError::Io(err)
    }
}

impl From<serde_json::Error> for TierPolicyError {
    fn from(err: serde_json::Error) -> Self {
        TierPolicyError::Parse(err)
    }
}

impl std::fmt::Display for TierPolicyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TierPolicyError::Empty => write!(f, "tier policy has no tiers"),
            TierPolicyError::EmptyTier(name) => write!(f, "tier '{}' has no countries", name),
            TierPolicyError::DuplicateCountry(c) => {
                write!(f, "country '{}' appears in more than one tier", c)
            }
            TierPolicyError::Io(e) => write!(f, "IO error: {}", e),
            TierPolicyError::Parse(e) => write!(f, "Parse error: {}", e),
        }
    }
}

impl std::error::Error for TierPolicyError {}

/// Ordered list of tiers, highest priority first
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TierPolicy {
    tiers: Vec<Tier>,
}

impl Default for TierPolicy {
    /// Philippines and India first, then United States, Canada and Israel.
    fn default() -> Self {
        Self {
            tiers: vec![
                Tier::new("primary", &["Philippines", "India"]),
                Tier::new("fallback", &["United States", "Canada", "Israel"]),
            ],
        }
    }
}

impl TierPolicy {
    pub fn new(tiers: Vec<Tier>) -> Result<Self, TierPolicyError> {
        let policy = Self { tiers };
        policy.validate()?;
        Ok(policy)
    }

    /// Parse the inline form: `primary:Philippines,India;fallback:United States,Canada,Israel`
    ///
    /// Tier names are optional; unnamed tiers are called `tier1`, `tier2`, ...
    pub fn parse_inline(s: &str) -> Result<Self, TierPolicyError> {
        let tiers = s
            .split(';')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .enumerate()
            .map(|(idx, entry)| {
                let (name, members) = match entry.split_once(':') {
                    Some((name, members)) => (name.trim().to_string(), members),
                    None => (format!("tier{}", idx + 1), entry),
                };
                let countries = members
                    .split(',')
                    .map(|c| c.trim().to_string())
                    .filter(|c| !c.is_empty())
                    .collect();
                Tier { name, countries }
            })
            .collect();

        Self::new(tiers)
    }

    /// Load a policy from a JSON array of `{"name": ..., "countries": [...]}`
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, TierPolicyError> {
        let json = std::fs::read_to_string(path.as_ref())?;
        let tiers: Vec<Tier> = serde_json::from_str(&json)?;
        Self::new(tiers)
    }

    pub fn tiers(&self) -> &[Tier] {
        &self.tiers
    }

    /// Index of the tier a country belongs to, if any
    pub fn tier_of(&self, country: &str) -> Option<usize> {
        self.tiers.iter().position(|t| t.contains(country))
    }

    fn validate(&self) -> Result<(), TierPolicyError> {
        if self.tiers.is_empty() {
            return Err(TierPolicyError::Empty);
        }

        let mut seen = HashSet::new();
        for tier in &self.tiers {
            if tier.countries.is_empty() {
                return Err(TierPolicyError::EmptyTier(tier.name.clone()));
            }
            for country in &tier.countries {
                if !seen.insert(country.as_str()) {
                    return Err(TierPolicyError::DuplicateCountry(country.clone()));
                }
            }
        }

        Ok(())
    }
}
