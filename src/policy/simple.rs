//! Attempt-ceiling policies.
//!
//! Semantics:
//! - `max_attempts` counts total attempts (initial try + retries), so a fresh context with no
//!   registered failure can always run once.
//! - [`SimpleRetryPolicy`] additionally consults a retryable classifier: a failure classified as
//!   not retryable stops the loop immediately.
//! - [`MaxAttemptsRetryPolicy`] only looks at the count.
//!
//! Invariants:
//! - `can_retry` is false once `retry_count >= max_attempts`.
//!
//! Example
//! ```rust
//! use relapse::{RetryPolicy, SimpleRetryPolicy, Throwable};
//!
//! let policy = SimpleRetryPolicy::builder()
//!     .max_attempts(5) // total attempts
//!     .abort_on("invalid_argument")
//!     .build()
//!     .unwrap();
//! let mut ctx = policy.open(None);
//! policy.register_throwable(&mut ctx, Throwable::io("reset")).unwrap();
//! assert!(policy.can_retry(&ctx).unwrap());
//! let bad_input = Throwable::new(relapse::ErrorClass::invalid_argument());
//! policy.register_throwable(&mut ctx, bad_input).unwrap();
//! assert!(!policy.can_retry(&ctx).unwrap());
//! ```

use super::{gate, record, RetryPolicy};
use crate::classifier::Classifier;
use crate::context::RetryContext;
use crate::error::{BuildError, RetryError};
use crate::throwable::Throwable;
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;

/// Default attempt ceiling.
pub const DEFAULT_MAX_ATTEMPTS: usize = 3;

fn retry_everything() -> Classifier<bool> {
    Classifier::new(true)
}

/// Fixed attempt ceiling plus a retryable-failure classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimpleRetryPolicy {
    max_attempts: usize,
    #[serde(default = "retry_everything")]
    retryable: Classifier<bool>,
}

impl SimpleRetryPolicy {
    /// Retry any failure until `max_attempts` attempts were made. `max_attempts` must be > 0.
    pub fn new(max_attempts: usize) -> Result<Self, BuildError> {
        Self::with_classifier(max_attempts, retry_everything())
    }

    /// Retry failures that `retryable` maps to true.
    pub fn with_classifier(
        max_attempts: usize,
        retryable: Classifier<bool>,
    ) -> Result<Self, BuildError> {
        let policy = Self { max_attempts, retryable };
        policy.validate()?;
        Ok(policy)
    }

    /// Construct a new builder with defaults.
    pub fn builder() -> SimpleRetryPolicyBuilder {
        SimpleRetryPolicyBuilder::new()
    }

    /// Classifier deciding which failures are retryable.
    pub fn retryable(&self) -> &Classifier<bool> {
        &self.retryable
    }

    pub(crate) fn validate(&self) -> Result<(), BuildError> {
        if self.max_attempts == 0 {
            return Err(BuildError::InvalidMaxAttempts(0));
        }
        Ok(())
    }

    fn retryable_failure(&self, context: &RetryContext) -> bool {
        context.last_throwable().map_or(true, |t| *self.retryable.classify(t))
    }
}

impl Default for SimpleRetryPolicy {
    fn default() -> Self {
        Self { max_attempts: DEFAULT_MAX_ATTEMPTS, retryable: retry_everything() }
    }
}

impl RetryPolicy for SimpleRetryPolicy {
    fn open(&self, parent: Option<RetryContext>) -> RetryContext {
        RetryContext::new(parent)
    }

    fn can_retry(&self, context: &RetryContext) -> Result<bool, RetryError> {
        Ok(gate(context)?
            && self.retryable_failure(context)
            && context.retry_count() < self.max_attempts)
    }

    fn register_throwable(
        &self,
        context: &mut RetryContext,
        throwable: Throwable,
    ) -> Result<(), RetryError> {
        record(context, throwable)
    }

    fn max_attempts(&self) -> Option<usize> {
        Some(self.max_attempts)
    }
}

/// Builder for `SimpleRetryPolicy`.
#[derive(Debug, Clone)]
pub struct SimpleRetryPolicyBuilder {
    max_attempts: usize,
    rules: Vec<(String, bool)>,
    retry_unlisted: bool,
    traverse_causes: bool,
}

impl SimpleRetryPolicyBuilder {
    /// Create a builder with sane defaults.
    pub fn new() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            rules: Vec::new(),
            retry_unlisted: true,
            traverse_causes: false,
        }
    }

    /// Set total attempts (initial + retries). Must be > 0.
    pub fn max_attempts(mut self, attempts: usize) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Treat failures of `class` (and its subclasses) as retryable.
    pub fn retry_on(mut self, class: impl Into<String>) -> Self {
        self.rules.push((class.into(), true));
        self
    }

    /// Stop retrying on failures of `class` (and its subclasses).
    pub fn abort_on(mut self, class: impl Into<String>) -> Self {
        self.rules.push((class.into(), false));
        self
    }

    /// Whether failures matching no rule are retryable. Defaults to true.
    pub fn retry_unlisted(mut self, retry: bool) -> Self {
        self.retry_unlisted = retry;
        self
    }

    /// Match rules against the cause chain when the failure itself matches none.
    pub fn traverse_causes(mut self, traverse: bool) -> Self {
        self.traverse_causes = traverse;
        self
    }

    /// Build the retry policy, validating inputs.
    pub fn build(self) -> Result<SimpleRetryPolicy, BuildError> {
        let retryable = self
            .rules
            .into_iter()
            .fold(Classifier::new(self.retry_unlisted), |c, (class, retry)| c.with(class, retry))
            .traverse_causes(self.traverse_causes);
        SimpleRetryPolicy::with_classifier(self.max_attempts, retryable)
    }
}

impl Default for SimpleRetryPolicyBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Attempt ceiling only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaxAttemptsRetryPolicy {
    max_attempts: usize,
}

impl MaxAttemptsRetryPolicy {
    /// `max_attempts` must be > 0.
    pub fn new(max_attempts: usize) -> Result<Self, BuildError> {
        let policy = Self { max_attempts };
        policy.validate()?;
        Ok(policy)
    }

    /// Infallible constructor for ceilings known to be non-zero.
    pub const fn from_nonzero(max_attempts: NonZeroUsize) -> Self {
        Self { max_attempts: max_attempts.get() }
    }

    pub(crate) fn validate(&self) -> Result<(), BuildError> {
        if self.max_attempts == 0 {
            return Err(BuildError::InvalidMaxAttempts(0));
        }
        Ok(())
    }
}

impl Default for MaxAttemptsRetryPolicy {
    fn default() -> Self {
        Self { max_attempts: DEFAULT_MAX_ATTEMPTS }
    }
}

impl RetryPolicy for MaxAttemptsRetryPolicy {
    fn open(&self, parent: Option<RetryContext>) -> RetryContext {
        RetryContext::new(parent)
    }

    fn can_retry(&self, context: &RetryContext) -> Result<bool, RetryError> {
        Ok(gate(context)? && context.retry_count() < self.max_attempts)
    }

    fn register_throwable(
        &self,
        context: &mut RetryContext,
        throwable: Throwable,
    ) -> Result<(), RetryError> {
        record(context, throwable)
    }

    fn max_attempts(&self) -> Option<usize> {
        Some(self.max_attempts)
    }
}
