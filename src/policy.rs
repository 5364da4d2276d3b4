//! Retry policies.
//!
//! A policy decides, failure by failure, whether a retry loop should go round again. It is
//! configured once and then shared read-only; everything that changes during a loop lives in the
//! [`RetryContext`] the policy opened for that loop.
//!
//! Lifecycle of a context: `open` -> (`register_throwable`, `can_retry`)* -> `close`. Any
//! operation on a closed context fails with [`RetryError::ContextClosed`].
//!
//! Example
//! ```rust
//! use relapse::{RetryPolicy, SimpleRetryPolicy, Throwable};
//!
//! let policy = SimpleRetryPolicy::new(3).unwrap();
//! let mut ctx = policy.open(None);
//! let mut failures = 0;
//! while policy.can_retry(&ctx).unwrap() {
//!     // the operation failed again
//!     failures += 1;
//!     policy.register_throwable(&mut ctx, Throwable::io("unreachable")).unwrap();
//! }
//! policy.close(&mut ctx).unwrap();
//! assert_eq!(failures, 3);
//! assert_eq!(ctx.retry_count(), 3);
//! ```

mod always;
mod classifier;
mod composite;
mod never;
mod simple;
mod timeout;

pub use always::AlwaysRetryPolicy;
pub use classifier::{BinaryExceptionClassifierRetryPolicy, ExceptionClassifierRetryPolicy};
pub use composite::CompositeRetryPolicy;
pub use never::NeverRetryPolicy;
pub use simple::{MaxAttemptsRetryPolicy, SimpleRetryPolicy, SimpleRetryPolicyBuilder};
pub use timeout::TimeoutRetryPolicy;

use crate::context::RetryContext;
use crate::error::{BuildError, RetryError};
use crate::throwable::Throwable;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Capability set shared by every retry policy.
pub trait RetryPolicy: Send + Sync + fmt::Debug {
    /// Start a retry loop, optionally nested inside `parent`.
    fn open(&self, parent: Option<RetryContext>) -> RetryContext;

    /// Whether another attempt is allowed. Never mutates the context.
    fn can_retry(&self, context: &RetryContext) -> Result<bool, RetryError>;

    /// Record a failed attempt.
    fn register_throwable(
        &self,
        context: &mut RetryContext,
        throwable: Throwable,
    ) -> Result<(), RetryError>;

    /// Finish the loop. The context rejects all further operations.
    fn close(&self, context: &mut RetryContext) -> Result<(), RetryError> {
        context.ensure_open()?;
        context.mark_closed();
        Ok(())
    }

    /// Upper bound on attempts, if the policy has one.
    fn max_attempts(&self) -> Option<usize> {
        None
    }
}

/// `Ok(false)` when the context was marked exhausted, error when closed.
pub(crate) fn gate(context: &RetryContext) -> Result<bool, RetryError> {
    context.ensure_open()?;
    Ok(!context.is_exhausted_only())
}

/// Count a failure on a context owned by a count-only policy.
pub(crate) fn record(context: &mut RetryContext, throwable: Throwable) -> Result<(), RetryError> {
    context.ensure_open()?;
    tracing::trace!(retry_count = context.retry_count() + 1, throwable = %throwable, "registered failure");
    context.register_throwable(throwable)
}

/// Every built-in policy, as one closed type.
///
/// This is the unit of nesting (composite children, classifier delegates) and of persistence:
/// its serde form is internally tagged by `kind`, so a policy tree can also be written by hand as
/// JSON configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
#[non_exhaustive]
pub enum PolicyKind {
    Always(AlwaysRetryPolicy),
    Never(NeverRetryPolicy),
    Simple(SimpleRetryPolicy),
    MaxAttempts(MaxAttemptsRetryPolicy),
    Timeout(TimeoutRetryPolicy),
    Composite(CompositeRetryPolicy),
    ExceptionClassifier(Box<ExceptionClassifierRetryPolicy>),
    BinaryExceptionClassifier(BinaryExceptionClassifierRetryPolicy),
}

impl PolicyKind {
    /// Short name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            PolicyKind::Always(_) => "always",
            PolicyKind::Never(_) => "never",
            PolicyKind::Simple(_) => "simple",
            PolicyKind::MaxAttempts(_) => "max_attempts",
            PolicyKind::Timeout(_) => "timeout",
            PolicyKind::Composite(_) => "composite",
            PolicyKind::ExceptionClassifier(_) => "exception_classifier",
            PolicyKind::BinaryExceptionClassifier(_) => "binary_exception_classifier",
        }
    }

    /// Re-check construction invariants, recursing into nested policies.
    pub fn validate(&self) -> Result<(), BuildError> {
        match self {
            PolicyKind::Always(_)
            | PolicyKind::Never(_)
            | PolicyKind::BinaryExceptionClassifier(_) => Ok(()),
            PolicyKind::Simple(p) => p.validate(),
            PolicyKind::MaxAttempts(p) => p.validate(),
            PolicyKind::Timeout(p) => p.validate(),
            PolicyKind::Composite(p) => p.validate(),
            PolicyKind::ExceptionClassifier(p) => p.validate(),
        }
    }

    fn as_policy(&self) -> &dyn RetryPolicy {
        match self {
            PolicyKind::Always(p) => p,
            PolicyKind::Never(p) => p,
            PolicyKind::Simple(p) => p,
            PolicyKind::MaxAttempts(p) => p,
            PolicyKind::Timeout(p) => p,
            PolicyKind::Composite(p) => p,
            PolicyKind::ExceptionClassifier(p) => p.as_ref(),
            PolicyKind::BinaryExceptionClassifier(p) => p,
        }
    }
}

impl RetryPolicy for PolicyKind {
    fn open(&self, parent: Option<RetryContext>) -> RetryContext {
        self.as_policy().open(parent)
    }

    fn can_retry(&self, context: &RetryContext) -> Result<bool, RetryError> {
        self.as_policy().can_retry(context)
    }

    fn register_throwable(
        &self,
        context: &mut RetryContext,
        throwable: Throwable,
    ) -> Result<(), RetryError> {
        self.as_policy().register_throwable(context, throwable)
    }

    fn close(&self, context: &mut RetryContext) -> Result<(), RetryError> {
        self.as_policy().close(context)
    }

    fn max_attempts(&self) -> Option<usize> {
        self.as_policy().max_attempts()
    }
}

impl From<AlwaysRetryPolicy> for PolicyKind {
    fn from(p: AlwaysRetryPolicy) -> Self {
        PolicyKind::Always(p)
    }
}

impl From<NeverRetryPolicy> for PolicyKind {
    fn from(p: NeverRetryPolicy) -> Self {
        PolicyKind::Never(p)
    }
}

impl From<SimpleRetryPolicy> for PolicyKind {
    fn from(p: SimpleRetryPolicy) -> Self {
        PolicyKind::Simple(p)
    }
}

impl From<MaxAttemptsRetryPolicy> for PolicyKind {
    fn from(p: MaxAttemptsRetryPolicy) -> Self {
        PolicyKind::MaxAttempts(p)
    }
}

impl From<TimeoutRetryPolicy> for PolicyKind {
    fn from(p: TimeoutRetryPolicy) -> Self {
        PolicyKind::Timeout(p)
    }
}

impl From<CompositeRetryPolicy> for PolicyKind {
    fn from(p: CompositeRetryPolicy) -> Self {
        PolicyKind::Composite(p)
    }
}

impl From<ExceptionClassifierRetryPolicy> for PolicyKind {
    fn from(p: ExceptionClassifierRetryPolicy) -> Self {
        PolicyKind::ExceptionClassifier(Box::new(p))
    }
}

impl From<BinaryExceptionClassifierRetryPolicy> for PolicyKind {
    fn from(p: BinaryExceptionClassifierRetryPolicy) -> Self {
        PolicyKind::BinaryExceptionClassifier(p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatch_reaches_the_wrapped_policy() {
        let policy = PolicyKind::from(NeverRetryPolicy);
        let mut ctx = policy.open(None);
        assert!(policy.can_retry(&ctx).unwrap());
        policy.register_throwable(&mut ctx, Throwable::io("x")).unwrap();
        assert!(!policy.can_retry(&ctx).unwrap());
        assert_eq!(policy.max_attempts(), Some(1));
        assert_eq!(policy.name(), "never");
    }

    #[test]
    fn exhausted_only_overrides_every_policy() {
        let policies: Vec<PolicyKind> = vec![
            AlwaysRetryPolicy.into(),
            SimpleRetryPolicy::default().into(),
            CompositeRetryPolicy::default().into(),
            ExceptionClassifierRetryPolicy::default().into(),
        ];
        for policy in policies {
            let mut ctx = policy.open(None);
            ctx.set_exhausted_only();
            assert!(!policy.can_retry(&ctx).unwrap(), "{} ignored exhaustion", policy.name());
        }
    }

    #[test]
    fn serde_form_is_tagged_by_kind() {
        let policy = PolicyKind::from(MaxAttemptsRetryPolicy::new(4).unwrap());
        let json = serde_json::to_value(&policy).unwrap();
        assert_eq!(json["kind"], "max_attempts");
        assert_eq!(json["max_attempts"], 4);

        let parsed: PolicyKind = serde_json::from_str(r#"{"kind":"always"}"#).unwrap();
        assert_eq!(parsed, PolicyKind::Always(AlwaysRetryPolicy));
    }

    #[test]
    fn validate_recurses_into_children() {
        let raw = r#"{"kind":"composite","policies":[{"kind":"simple","max_attempts":0}]}"#;
        let parsed: PolicyKind = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.validate(), Err(BuildError::InvalidMaxAttempts(0)));
    }
}
