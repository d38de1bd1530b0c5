//! Named execution profiles.
//!
//! # Responsibilities
//! - Map a profile name to its timeout and retry policy
//! - Provide the four built-in profiles
//! - Apply configured overrides once, at startup
//!
//! # Choosing a profile
//! - `quick`: single-row lookups
//! - `normal`: joined or aggregated reads
//! - `complex`: multi-statement writes
//! - `background`: best-effort jobs such as cache warming
//!
//! A single timeout is wrong for the whole workload mix: short timeouts on
//! heavy joins fail spuriously, long timeouts on lookups delay detection.

use std::collections::HashMap;
use std::time::Duration;

use serde::Serialize;

use crate::config::ProfileConfig;
use crate::resilience::error::UnknownProfile;

pub const QUICK: &str = "quick";
pub const NORMAL: &str = "normal";
pub const COMPLEX: &str = "complex";
pub const BACKGROUND: &str = "background";

/// Immutable timeout and retry policy for one class of query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimeoutProfile {
    pub name: String,
    pub timeout_ms: u64,
    pub retry_enabled: bool,
    /// Total attempts including the first one.
    pub max_attempts: u32,
    pub backoff_ms: u64,
}

impl TimeoutProfile {
    pub fn new(name: impl Into<String>, timeout_ms: u64) -> Self {
        Self {
            name: name.into(),
            timeout_ms,
            retry_enabled: false,
            max_attempts: 1,
            backoff_ms: 0,
        }
    }

    pub fn with_retry(mut self, max_attempts: u32, backoff_ms: u64) -> Self {
        self.retry_enabled = true;
        self.max_attempts = max_attempts.max(1);
        self.backoff_ms = backoff_ms;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Attempts actually allowed: a profile without retry gets exactly one.
    pub fn effective_attempts(&self) -> u32 {
        if self.retry_enabled {
            self.max_attempts.max(1)
        } else {
            1
        }
    }
}

/// Lookup table of profiles, fixed after construction.
#[derive(Debug, Clone)]
pub struct ProfileRegistry {
    profiles: HashMap<String, TimeoutProfile>,
}

impl ProfileRegistry {
    /// Registry holding only the built-in profiles.
    pub fn builtin() -> Self {
        let profiles = [
            TimeoutProfile::new(QUICK, 2_000),
            TimeoutProfile::new(NORMAL, 5_000).with_retry(2, 100),
            TimeoutProfile::new(COMPLEX, 10_000).with_retry(2, 100),
            TimeoutProfile::new(BACKGROUND, 15_000).with_retry(3, 250),
        ];

        Self {
            profiles: profiles
                .into_iter()
                .map(|p| (p.name.clone(), p))
                .collect(),
        }
    }

    /// Built-ins, with configured entries replacing or extending them.
    pub fn from_config(overrides: &[ProfileConfig]) -> Self {
        let mut registry = Self::builtin();
        for entry in overrides {
            let mut profile = TimeoutProfile::new(entry.name.clone(), entry.timeout_ms);
            if entry.retry_enabled {
                profile = profile.with_retry(entry.max_attempts, entry.backoff_ms);
            }
            if registry.profiles.insert(profile.name.clone(), profile).is_some() {
                tracing::info!(profile = %entry.name, "Built-in timeout profile overridden");
            }
        }
        registry
    }

    pub fn resolve(&self, name: &str) -> Result<&TimeoutProfile, UnknownProfile> {
        self.profiles
            .get(name)
            .ok_or_else(|| UnknownProfile(name.to_string()))
    }

    /// All profiles, sorted by name.
    pub fn all(&self) -> Vec<&TimeoutProfile> {
        let mut all: Vec<_> = self.profiles.values().collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        all
    }
}

impl Default for ProfileRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
