//! # Rate limiter (C2)
//!
//! A family of named sliding-window counters. Each named bucket has a fixed
//! `(rate, window)` policy; admission keys are arbitrary strings (API key,
//! client IP, principal id), covering the full named-bucket table this
//! service needs rather than a single hardcoded pair of buckets.
//!
//! The limiter is in-process, thread-safe, and unbounded in principal count
//! (bounded only by live keys); idle entries are not proactively evicted,
//! but each deque self-trims on every admission check.

use std::collections::{HashMap, VecDeque};
use std::time::{SystemTime, UNIX_EPOCH};

use dashmap::DashMap;
use parking_lot::Mutex;

/// A sliding-window policy: admit at most `rate` calls per `window_secs`.
#[derive(Debug, Clone, Copy)]
pub struct Policy {
    /// Maximum admissions within the window.
    pub rate: u32,
    /// Window length in seconds.
    pub window_secs: f64,
}

/// Named bucket identifiers for the policy table below.
pub mod buckets {
    /// Per-API-key global quota.
    pub const API_KEY: &str = "api-key";
    /// Default per-IP quota.
    pub const IP_DEFAULT: &str = "ip-default";
    /// Per-IP quota for the render-one endpoint.
    pub const IP_RENDER_ONE: &str = "ip-render-one";
    /// Per-IP quota for the check-key endpoint.
    pub const IP_CHECK_KEY: &str = "ip-check-key";
    /// Per-IP quota shared by mint/iterate/renew endpoints.
    pub const IP_MINT_ITER_RENEW: &str = "ip-mint-iter-renew";
    /// Quota for destructive edit operations.
    pub const EDIT: &str = "edit";
    /// Quota for chat-platform token issuance.
    pub const CHAT_TOKEN_ISSUANCE: &str = "chat-token-issuance";
}

fn default_policies() -> HashMap<&'static str, Policy> {
    use buckets::*;
    HashMap::from([
        (API_KEY, Policy { rate: 50, window_secs: 60.0 }),
        (IP_DEFAULT, Policy { rate: 25, window_secs: 30.0 }),
        (IP_RENDER_ONE, Policy { rate: 15, window_secs: 30.0 }),
        (IP_CHECK_KEY, Policy { rate: 10, window_secs: 40.0 }),
        (IP_MINT_ITER_RENEW, Policy { rate: 10, window_secs: 60.0 }),
        (EDIT, Policy { rate: 5, window_secs: 25.0 }),
        (CHAT_TOKEN_ISSUANCE, Policy { rate: 3, window_secs: 120.0 }),
    ])
}

fn now_secs() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before UNIX epoch")
        .as_secs_f64()
}

/// Multi-bucket sliding-window rate limiter.
pub struct RateLimiter {
    policies: HashMap<&'static str, Policy>,
    counters: DashMap<(String, String), Mutex<VecDeque<f64>>>,
}

impl RateLimiter {
    /// Build a limiter with this service's default policy table.
    pub fn with_default_policies() -> Self {
        Self {
            policies: default_policies(),
            counters: DashMap::new(),
        }
    }

    /// Build a limiter with a caller-supplied policy table (used in tests
    /// to exercise short windows deterministically).
    pub fn with_policies(policies: HashMap<&'static str, Policy>) -> Self {
        Self {
            policies,
            counters: DashMap::new(),
        }
    }

    /// Attempt to admit one call against `bucket` for `key`. Returns
    /// `false` if no policy is registered for `bucket` (fail closed).
    pub fn admit(&self, bucket: &str, key: &str) -> bool {
        self.admit_at(bucket, key, now_secs())
    }

    fn admit_at(&self, bucket: &str, key: &str, now: f64) -> bool {
        let Some(policy) = self.policies.get(bucket) else {
            return false;
        };

        let entry = self
            .counters
            .entry((bucket.to_string(), key.to_string()))
            .or_insert_with(|| Mutex::new(VecDeque::new()));
        let mut deque = entry.lock();

        let cutoff = now - policy.window_secs;
        while matches!(deque.front(), Some(ts) if *ts <= cutoff) {
            deque.pop_front();
        }

        if deque.len() as u32 >= policy.rate {
            return false;
        }

        deque.push_back(now);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admits_up_to_rate_then_denies() {
        let mut policies = HashMap::new();
        policies.insert("test", Policy { rate: 3, window_secs: 60.0 });
        let limiter = RateLimiter::with_policies(policies);

        for _ in 0..3 {
            assert!(limiter.admit_at("test", "alice", 1000.0));
        }
        assert!(!limiter.admit_at("test", "alice", 1000.0));
    }

    #[test]
    fn window_elapses_and_resets() {
        let mut policies = HashMap::new();
        policies.insert("test", Policy { rate: 2, window_secs: 10.0 });
        let limiter = RateLimiter::with_policies(policies);

        assert!(limiter.admit_at("test", "alice", 0.0));
        assert!(limiter.admit_at("test", "alice", 1.0));
        assert!(!limiter.admit_at("test", "alice", 2.0));
        // Past the window: both earlier timestamps should be trimmed.
        assert!(limiter.admit_at("test", "alice", 11.0));
    }

    #[test]
    fn unknown_bucket_fails_closed() {
        let limiter = RateLimiter::with_default_policies();
        assert!(!limiter.admit("does-not-exist", "alice"));
    }

    #[test]
    fn keys_are_independent() {
        let mut policies = HashMap::new();
        policies.insert("test", Policy { rate: 1, window_secs: 60.0 });
        let limiter = RateLimiter::with_policies(policies);

        assert!(limiter.admit_at("test", "alice", 0.0));
        assert!(!limiter.admit_at("test", "alice", 0.0));
        assert!(limiter.admit_at("test", "bob", 0.0));
    }

    #[test]
    fn default_policy_table_has_expected_rates() {
        let limiter = RateLimiter::with_default_policies();
        assert_eq!(limiter.policies[buckets::API_KEY].rate, 50);
        assert_eq!(limiter.policies[buckets::EDIT].window_secs, 25.0);
        assert_eq!(limiter.policies[buckets::CHAT_TOKEN_ISSUANCE].rate, 3);
    }
}
