//! Per-resource breaker registry.
//!
//! One breaker per logical resource name for the life of the process. The
//! registry is created at startup and passed to whoever needs a breaker;
//! tests build their own for fresh state.

use std::sync::Arc;

use dashmap::DashMap;

use crate::resilience::circuit_breaker::{BreakerSettings, BreakerSnapshot, CircuitBreaker};

/// Name of the main database resource.
pub const PRIMARY_DATABASE: &str = "primary_database";

#[derive(Debug, Default)]
pub struct BreakerRegistry {
    settings: BreakerSettings,
    breakers: DashMap<String, Arc<CircuitBreaker>>,
}

impl BreakerRegistry {
    pub fn new(settings: BreakerSettings) -> Self {
        Self {
            settings,
            breakers: DashMap::new(),
        }
    }

    /// The breaker for `resource`, created on first use.
    pub fn get_or_create(&self, resource: &str) -> Arc<CircuitBreaker> {
        if let Some(existing) = self.breakers.get(resource) {
            return Arc::clone(existing.value());
        }
        self.breakers
            .entry(resource.to_string())
            .or_insert_with(|| {
                tracing::debug!(resource = %resource, "Circuit breaker registered");
                Arc::new(CircuitBreaker::new(resource, self.settings.clone()))
            })
            .value()
            .clone()
    }

    pub fn get(&self, resource: &str) -> Option<Arc<CircuitBreaker>> {
        self.breakers.get(resource).map(|b| Arc::clone(b.value()))
    }

    /// Snapshots of every registered breaker, sorted by resource.
    pub fn snapshots(&self) -> Vec<BreakerSnapshot> {
        let mut all: Vec<_> = self.breakers.iter().map(|b| b.snapshot()).collect();
        all.sort_by(|a, b| a.resource.cmp(&b.resource));
        all
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_singleton_per_resource() {
        let registry = BreakerRegistry::default();
        let a = registry.get_or_create(PRIMARY_DATABASE);
        let b = registry.get_or_create(PRIMARY_DATABASE);
        assert!(Arc::ptr_eq(&a, &b));

        let other = registry.get_or_create("replica");
        assert!(!Arc::ptr_eq(&a, &other));

        let names: Vec<_> = registry.snapshots().into_iter().map(|s| s.resource).collect();
        assert_eq!(names, vec!["primary_database", "replica"]);
    }

    #[test]
    fn test_get_missing() {
        let registry = BreakerRegistry::default();
        assert!(registry.get("nope").is_none());
    }
}
