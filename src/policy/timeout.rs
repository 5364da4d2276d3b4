//! Wall-clock budget policy.
//!
//! The budget starts when the context is opened. The timeout is advisory: it only changes what
//! `can_retry` reports and never interrupts an attempt in flight.

use super::{gate, RetryPolicy};
use crate::clock::{Clock, SystemClock};
use crate::context::{ContextState, RetryContext};
use crate::error::{BuildError, RetryError};
use crate::throwable::Throwable;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Default budget in milliseconds.
pub const DEFAULT_TIMEOUT_MILLIS: u64 = 1000;

fn system_clock() -> Arc<dyn Clock> {
    Arc::new(SystemClock)
}

/// Retries while less than `timeout` has elapsed since the context was opened.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutRetryPolicy {
    timeout_millis: u64,
    #[serde(skip, default = "system_clock")]
    clock: Arc<dyn Clock>,
}

impl TimeoutRetryPolicy {
    /// Create a timeout policy. Fails if `timeout` is below one millisecond.
    pub fn new(timeout: Duration) -> Result<Self, BuildError> {
        let millis = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        if millis == 0 {
            return Err(BuildError::InvalidTimeout(timeout));
        }
        Ok(Self { timeout_millis: millis, clock: system_clock() })
    }

    /// Create a timeout policy from a millisecond budget.
    pub fn from_millis(millis: u64) -> Result<Self, BuildError> {
        Self::new(Duration::from_millis(millis))
    }

    /// Provide a custom clock implementation.
    pub fn with_clock<C>(mut self, clock: C) -> Self
    where
        C: Clock + 'static,
    {
        self.clock = Arc::new(clock);
        self
    }

    /// Inspect the configured budget.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_millis)
    }

    pub(crate) fn validate(&self) -> Result<(), BuildError> {
        if self.timeout_millis == 0 {
            return Err(BuildError::InvalidTimeout(Duration::ZERO));
        }
        Ok(())
    }

    fn start_of(context: &RetryContext) -> Result<u64, RetryError> {
        context.started_at_millis().ok_or(RetryError::ForeignContext {
            expected: "timeout",
            found: context.state().shape(),
        })
    }
}

impl Default for TimeoutRetryPolicy {
    fn default() -> Self {
        Self { timeout_millis: DEFAULT_TIMEOUT_MILLIS, clock: system_clock() }
    }
}

// The clock is a runtime collaborator, not configuration.
impl PartialEq for TimeoutRetryPolicy {
    fn eq(&self, other: &Self) -> bool {
        self.timeout_millis == other.timeout_millis
    }
}

impl RetryPolicy for TimeoutRetryPolicy {
    fn open(&self, parent: Option<RetryContext>) -> RetryContext {
        RetryContext::with_state(
            parent,
            ContextState::Timeout { start_millis: self.clock.now_millis() },
        )
    }

    fn can_retry(&self, context: &RetryContext) -> Result<bool, RetryError> {
        if !gate(context)? {
            return Ok(false);
        }
        let start = Self::start_of(context)?;
        let elapsed = self.clock.now_millis().saturating_sub(start);
        Ok(elapsed < self.timeout_millis)
    }

    fn register_throwable(
        &self,
        context: &mut RetryContext,
        throwable: Throwable,
    ) -> Result<(), RetryError> {
        context.ensure_open()?;
        Self::start_of(context)?;
        tracing::trace!(retry_count = context.retry_count() + 1, throwable = %throwable, "registered failure");
        context.register_throwable(throwable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    #[test]
    fn retries_until_budget_spent() {
        let clock = ManualClock::new(1_000);
        let policy = TimeoutRetryPolicy::from_millis(100).unwrap().with_clock(clock.clone());
        let mut ctx = policy.open(None);
        assert_eq!(ctx.started_at_millis(), Some(1_000));

        policy.register_throwable(&mut ctx, Throwable::io("slow")).unwrap();
        clock.advance(99);
        assert!(policy.can_retry(&ctx).unwrap());
        clock.advance(1);
        assert!(!policy.can_retry(&ctx).unwrap());
        assert_eq!(ctx.retry_count(), 1);
    }

    #[test]
    fn rejects_sub_millisecond_budget() {
        let err = TimeoutRetryPolicy::new(Duration::from_micros(10)).unwrap_err();
        assert_eq!(err, BuildError::InvalidTimeout(Duration::from_micros(10)));
        assert!(TimeoutRetryPolicy::from_millis(0).is_err());
    }

    #[test]
    fn requires_timeout_context() {
        let policy = TimeoutRetryPolicy::default();
        let ctx = RetryContext::new(None);
        assert_eq!(
            policy.can_retry(&ctx),
            Err(RetryError::ForeignContext { expected: "timeout", found: "basic" })
        );
    }

    #[test]
    fn clock_is_not_part_of_equality() {
        let a = TimeoutRetryPolicy::default();
        let b = TimeoutRetryPolicy::default().with_clock(ManualClock::new(0));
        assert_eq!(a, b);
        assert_eq!(a.timeout(), Duration::from_secs(1));
    }
}
