//! Policies that decide by classifying the failure.
//!
//! [`ExceptionClassifierRetryPolicy`] routes each failure to a delegate policy chosen by its
//! classifier. Every route gets its own delegate context, opened the first time the route is hit
//! and reused afterwards, so an I/O delegate keeps counting I/O failures even when other failures
//! are interleaved. The outer context still counts every failure.
//!
//! [`BinaryExceptionClassifierRetryPolicy`] is the yes/no variant: the latest failure's class
//! alone decides.

use super::{gate, record, NeverRetryPolicy, PolicyKind, RetryPolicy};
use crate::classifier::{Classifier, Route};
use crate::context::{ContextState, DelegateContext, RetryContext};
use crate::error::{BuildError, RetryError};
use crate::throwable::Throwable;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Delegates to the policy its classifier picks for the latest failure.
///
/// ```rust
/// use relapse::{
///     AlwaysRetryPolicy, Classifier, ExceptionClassifierRetryPolicy, NeverRetryPolicy,
///     PolicyKind, RetryPolicy, Throwable,
/// };
///
/// let classifier = Classifier::new(PolicyKind::from(AlwaysRetryPolicy))
///     .with("io", NeverRetryPolicy.into());
/// let policy = ExceptionClassifierRetryPolicy::new(classifier);
///
/// let mut ctx = policy.open(None);
/// policy.register_throwable(&mut ctx, Throwable::runtime("bug")).unwrap();
/// assert!(policy.can_retry(&ctx).unwrap());
/// policy.register_throwable(&mut ctx, Throwable::io("reset")).unwrap();
/// assert!(!policy.can_retry(&ctx).unwrap());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExceptionClassifierRetryPolicy {
    classifier: Classifier<PolicyKind>,
}

impl ExceptionClassifierRetryPolicy {
    pub fn new(classifier: Classifier<PolicyKind>) -> Self {
        Self { classifier }
    }

    pub fn classifier(&self) -> &Classifier<PolicyKind> {
        &self.classifier
    }

    pub(crate) fn validate(&self) -> Result<(), BuildError> {
        self.classifier.values().try_for_each(PolicyKind::validate)
    }

    fn delegate_policy(&self, route: Route) -> Result<&PolicyKind, RetryError> {
        self.classifier.value(route).ok_or(RetryError::MissingDelegate { route })
    }

    fn state<'a>(
        context: &'a RetryContext,
    ) -> Result<(&'a [DelegateContext], Option<Route>), RetryError> {
        match context.state() {
            ContextState::Classifier { delegates, current } => Ok((delegates.as_slice(), *current)),
            other => Err(RetryError::ForeignContext { expected: "classifier", found: other.shape() }),
        }
    }

    fn delegates_mut<'a>(
        context: &'a mut RetryContext,
    ) -> Result<(&'a mut Vec<DelegateContext>, &'a mut Option<Route>), RetryError> {
        let found = context.state().shape();
        match context.state_mut() {
            ContextState::Classifier { delegates, current } => Ok((delegates, current)),
            _ => Err(RetryError::ForeignContext { expected: "classifier", found }),
        }
    }
}

impl Default for ExceptionClassifierRetryPolicy {
    fn default() -> Self {
        Self::new(Classifier::new(NeverRetryPolicy.into()))
    }
}

impl RetryPolicy for ExceptionClassifierRetryPolicy {
    fn open(&self, parent: Option<RetryContext>) -> RetryContext {
        RetryContext::with_state(
            parent,
            ContextState::Classifier { delegates: Vec::new(), current: None },
        )
    }

    fn can_retry(&self, context: &RetryContext) -> Result<bool, RetryError> {
        if !gate(context)? {
            return Ok(false);
        }
        let (delegates, current) = Self::state(context)?;
        let Some(route) = current else {
            return Ok(true);
        };
        let policy = self.delegate_policy(route)?;
        let delegate = delegates
            .iter()
            .find(|d| d.route == route)
            .ok_or(RetryError::MissingDelegate { route })?;
        policy.can_retry(&delegate.context)
    }

    fn register_throwable(
        &self,
        context: &mut RetryContext,
        throwable: Throwable,
    ) -> Result<(), RetryError> {
        context.ensure_open()?;
        let route = self.classifier.route(&throwable);
        let policy = self.delegate_policy(route)?;
        {
            let (delegates, current) = Self::delegates_mut(context)?;
            let idx = match delegates.iter().position(|d| d.route == route) {
                Some(idx) => idx,
                None => {
                    debug!(?route, policy = policy.name(), "opening delegate context");
                    delegates.push(DelegateContext { route, context: policy.open(None) });
                    delegates.len() - 1
                }
            };
            debug!(?route, policy = policy.name(), class = %throwable.class(), "classified failure");
            policy.register_throwable(&mut delegates[idx].context, throwable.clone())?;
            *current = Some(route);
        }
        context.register_throwable(throwable)
    }

    fn close(&self, context: &mut RetryContext) -> Result<(), RetryError> {
        context.ensure_open()?;
        let (delegates, _) = Self::delegates_mut(context)?;
        let mut first_err = None;
        for delegate in delegates.iter_mut() {
            let closed = self
                .delegate_policy(delegate.route)
                .and_then(|policy| policy.close(&mut delegate.context));
            if let Err(e) = closed {
                tracing::warn!(route = ?delegate.route, error = %e, "failed to close delegate context");
                first_err.get_or_insert(e);
            }
        }
        context.mark_closed();
        first_err.map_or(Ok(()), Err)
    }
}

fn retry_everything() -> Classifier<bool> {
    Classifier::new(true)
}

/// Retries while the latest failure classifies as retryable. No attempt ceiling of its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinaryExceptionClassifierRetryPolicy {
    #[serde(default = "retry_everything")]
    classifier: Classifier<bool>,
}

impl BinaryExceptionClassifierRetryPolicy {
    pub fn new(classifier: Classifier<bool>) -> Self {
        Self { classifier }
    }

    pub fn classifier(&self) -> &Classifier<bool> {
        &self.classifier
    }
}

impl Default for BinaryExceptionClassifierRetryPolicy {
    fn default() -> Self {
        Self::new(retry_everything())
    }
}

impl RetryPolicy for BinaryExceptionClassifierRetryPolicy {
    fn open(&self, parent: Option<RetryContext>) -> RetryContext {
        RetryContext::new(parent)
    }

    fn can_retry(&self, context: &RetryContext) -> Result<bool, RetryError> {
        Ok(gate(context)?
            && context.last_throwable().map_or(true, |t| *self.classifier.classify(t)))
    }

    fn register_throwable(
        &self,
        context: &mut RetryContext,
        throwable: Throwable,
    ) -> Result<(), RetryError> {
        record(context, throwable)
    }
}
