//! Per-domain pacing and retry policy for outbound page fetches.
//!
//! [`DomainPacer`] serializes request starts per domain with a minimum gap;
//! different domains never wait on each other. [`RetryPolicy`] decides
//! whether a response (or transport failure) is worth another attempt and
//! how long to back off before it.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::time::Instant;

/// Body substrings (lower-case) that mark an error page served with a 2xx status.
pub const ERROR_PATTERNS: [&str; 4] = [
    "too many requests",
    "service unavailable",
    "internal server error",
    "gateway timeout",
];

const MAX_BACKOFF_MS: u64 = 60_000;

type Gate = Arc<tokio::sync::Mutex<Option<Instant>>>;

/// Tracks the last request start per domain and enforces a minimum gap.
#[derive(Debug)]
pub struct DomainPacer {
    default_delay: Duration,
    delays: HashMap<String, Duration>,
    gates: Mutex<HashMap<String, Gate>>,
}

impl DomainPacer {
    #[must_use]
    pub fn new(default_delay: Duration) -> Self {
        Self {
            default_delay,
            delays: HashMap::new(),
            gates: Mutex::new(HashMap::new()),
        }
    }

    /// Sets the gap for `domain` and its subdomains (`bark.com` also covers
    /// `www.bark.com`).
    #[must_use]
    pub fn with_delay(mut self, domain: &str, delay: Duration) -> Self {
        self.delays.insert(domain.to_ascii_lowercase(), delay);
        self
    }

    /// Configured gap for `domain`, falling back to the default.
    #[must_use]
    pub fn delay_for(&self, domain: &str) -> Duration {
        let domain = domain.to_ascii_lowercase();
        if let Some(delay) = self.delays.get(&domain) {
            return *delay;
        }
        self.delays
            .iter()
            .filter(|(key, _)| domain.ends_with(&format!(".{key}")))
            .max_by_key(|(key, _)| key.len())
            .map_or(self.default_delay, |(_, delay)| *delay)
    }

    fn gate(&self, domain: &str) -> Gate {
        let mut gates = self.gates.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(gates.entry(domain.to_ascii_lowercase()).or_default())
    }

    /// Blocks until `domain`'s gap has elapsed, then stamps the slot.
    ///
    /// Callers for the same domain are released one at a time, each at least
    /// `delay_for(domain)` after the previous one.
    pub async fn wait(&self, domain: &str) {
        let gate = self.gate(domain);
        let min_gap = self.delay_for(domain);
        let mut last = gate.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < min_gap {
                let pause = min_gap.saturating_sub(elapsed);
                tracing::debug!(domain, pause_ms = pause.as_millis(), "pacing request");
                tokio::time::sleep(pause).await;
            }
        }
        *last = Some(Instant::now());
    }
}

/// Why a fetch attempt is being retried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryReason {
    Status(u16),
    BodyPattern(&'static str),
    Transport(String),
}

impl std::fmt::Display for RetryReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RetryReason::Status(code) => write!(f, "HTTP {code}"),
            RetryReason::BodyPattern(p) => write!(f, "error pattern \"{p}\" in body"),
            RetryReason::Transport(e) => write!(f, "transport error: {e}"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Attempts after the first. `0` disables retries.
    pub max_retries: u32,
    pub backoff_base_ms: u64,
    pub retry_statuses: HashSet<u16>,
}

impl RetryPolicy {
    #[must_use]
    pub fn new(max_retries: u32, backoff_base_ms: u64, retry_statuses: &[u16]) -> Self {
        Self {
            max_retries,
            backoff_base_ms,
            retry_statuses: retry_statuses.iter().copied().collect(),
        }
    }

    /// Classifies a completed response. `None` means accept it as is.
    #[must_use]
    pub fn retry_reason(&self, status: u16, body: &str) -> Option<RetryReason> {
        if self.retry_statuses.contains(&status) {
            return Some(RetryReason::Status(status));
        }
        let lowered = body.to_lowercase();
        ERROR_PATTERNS
            .iter()
            .copied()
            .find(|p| lowered.contains(*p))
            .map(RetryReason::BodyPattern)
    }

    /// Sleep before retry number `attempt` (1-based): `base * 2^(attempt-1)`,
    /// capped at 60 s, with ±25 % jitter.
    #[must_use]
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        if self.backoff_base_ms == 0 {
            return Duration::ZERO;
        }
        let exponent = attempt.saturating_sub(1).min(10);
        let capped = self
            .backoff_base_ms
            .saturating_mul(1u64 << exponent)
            .min(MAX_BACKOFF_MS);
        #[allow(
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss,
            clippy::cast_precision_loss
        )]
        let jittered = (capped as f64 * (rand::random::<f64>() * 0.5 + 0.75)) as u64;
        Duration::from_millis(jittered)
    }
}
