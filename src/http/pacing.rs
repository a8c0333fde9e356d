//! Request pacing and browser identity selection.
//!
//! The pacing policy is injected into [`HttpClient`](super::HttpClient) so the
//! randomized delay and identity rotation can be switched off for tests.

use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;

use crate::config::PacingConfig;
use crate::user_agent::{self, BrowserIdentity, DEFAULT_IDENTITY};

/// What a request is for; pacing applies to page fetches only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    /// Share page or other markup fetch.
    Page,
    /// File body transfer.
    Transfer,
}

/// Controls pre-request delay and per-attempt browser identity.
pub trait PacingPolicy: Send + Sync + Debug {
    /// Delay to sleep before issuing a request of `kind`.
    fn pre_request_delay(&self, kind: RequestKind) -> Duration;

    /// Identity for the given 1-indexed attempt; `previous` is the identity
    /// used by the prior attempt, if any.
    fn identity(&self, attempt: u32, previous: Option<&BrowserIdentity>) -> BrowserIdentity;
}

/// Zero delay and a fixed identity.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPacing;

impl PacingPolicy for NoPacing {
    fn pre_request_delay(&self, _kind: RequestKind) -> Duration {
        Duration::ZERO
    }

    fn identity(&self, _attempt: u32, _previous: Option<&BrowserIdentity>) -> BrowserIdentity {
        DEFAULT_IDENTITY
    }
}

/// Random delay before page fetches, optional identity rotation between attempts.
#[derive(Debug, Clone)]
pub struct RandomizedPacing {
    min_delay: Duration,
    max_delay: Duration,
    rotate_identity: bool,
}

impl RandomizedPacing {
    /// Creates a randomized policy. Bounds are swapped if given in reverse.
    #[must_use]
    pub fn new(min_delay: Duration, max_delay: Duration, rotate_identity: bool) -> Self {
        let (min_delay, max_delay) = if min_delay <= max_delay {
            (min_delay, max_delay)
        } else {
            (max_delay, min_delay)
        };
        Self {
            min_delay,
            max_delay,
            rotate_identity,
        }
    }
}

impl PacingPolicy for RandomizedPacing {
    #[allow(clippy::cast_possible_truncation)]
    fn pre_request_delay(&self, kind: RequestKind) -> Duration {
        if kind == RequestKind::Transfer {
            return Duration::ZERO;
        }
        let min = self.min_delay.as_millis() as u64;
        let max = self.max_delay.as_millis() as u64;
        Duration::from_millis(rand::thread_rng().gen_range(min..=max))
    }

    fn identity(&self, attempt: u32, previous: Option<&BrowserIdentity>) -> BrowserIdentity {
        if !self.rotate_identity {
            return DEFAULT_IDENTITY;
        }
        match previous {
            Some(previous) if attempt > 1 => user_agent::rotate_identity(previous),
            _ => user_agent::random_identity(),
        }
    }
}

/// Builds the policy described by `config`.
#[must_use]
pub fn pacing_from_config(config: &PacingConfig) -> Arc<dyn PacingPolicy> {
    match config {
        PacingConfig::Disabled => Arc::new(NoPacing),
        PacingConfig::Randomized {
            min_delay,
            max_delay,
            rotate_identity,
        } => Arc::new(RandomizedPacing::new(
            *min_delay,
            *max_delay,
            *rotate_identity,
        )),
    }
}
