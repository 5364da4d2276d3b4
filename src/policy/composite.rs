//! Composite policy combining several sub-policies.
//!
//! Each sub-policy gets its own child context, opened together with the composite context and
//! kept in the same order as the sub-policies. Failures are forwarded to every child.
//!
//! - pessimistic (default): retry only while every sub-policy agrees.
//! - optimistic: retry while any sub-policy agrees.

use super::{gate, PolicyKind, RetryPolicy};
use crate::context::{ContextState, RetryContext};
use crate::error::{BuildError, RetryError};
use crate::throwable::Throwable;
use serde::{Deserialize, Serialize};

/// Ordered combination of sub-policies.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompositeRetryPolicy {
    #[serde(default)]
    policies: Vec<PolicyKind>,
    #[serde(default)]
    optimistic: bool,
}

impl CompositeRetryPolicy {
    /// Pessimistic composite over `policies`.
    pub fn new<I, P>(policies: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PolicyKind>,
    {
        Self { policies: policies.into_iter().map(Into::into).collect(), optimistic: false }
    }

    /// Switch between any-agrees (`true`) and all-agree (`false`).
    pub fn optimistic(mut self, optimistic: bool) -> Self {
        self.optimistic = optimistic;
        self
    }

    /// Whether any single sub-policy can keep the loop going.
    pub fn is_optimistic(&self) -> bool {
        self.optimistic
    }

    /// Sub-policies in order.
    pub fn policies(&self) -> &[PolicyKind] {
        &self.policies
    }

    pub(crate) fn validate(&self) -> Result<(), BuildError> {
        self.policies.iter().try_for_each(PolicyKind::validate)
    }

    fn foreign(context: &RetryContext) -> RetryError {
        RetryError::ForeignContext { expected: "composite", found: context.state().shape() }
    }

    fn children<'a>(&self, context: &'a RetryContext) -> Result<&'a [RetryContext], RetryError> {
        match context.state() {
            ContextState::Composite { children } if children.len() == self.policies.len() => {
                Ok(children.as_slice())
            }
            _ => Err(Self::foreign(context)),
        }
    }

    fn children_mut<'a>(
        &self,
        context: &'a mut RetryContext,
    ) -> Result<&'a mut Vec<RetryContext>, RetryError> {
        let err = Self::foreign(context);
        match context.state_mut() {
            ContextState::Composite { children } if children.len() == self.policies.len() => {
                Ok(children)
            }
            _ => Err(err),
        }
    }
}

impl RetryPolicy for CompositeRetryPolicy {
    fn open(&self, parent: Option<RetryContext>) -> RetryContext {
        let children = self.policies.iter().map(|p| p.open(None)).collect();
        RetryContext::with_state(parent, ContextState::Composite { children })
    }

    fn can_retry(&self, context: &RetryContext) -> Result<bool, RetryError> {
        if !gate(context)? {
            return Ok(false);
        }
        let mut any = false;
        let mut all = true;
        for (policy, child) in self.policies.iter().zip(self.children(context)?) {
            if policy.can_retry(child)? {
                any = true;
            } else {
                all = false;
            }
        }
        Ok(if self.optimistic { any } else { all })
    }

    fn register_throwable(
        &self,
        context: &mut RetryContext,
        throwable: Throwable,
    ) -> Result<(), RetryError> {
        context.ensure_open()?;
        // staged on copies so a failing child leaves every context as it was
        let mut staged = self.children(context)?.to_vec();
        for (policy, child) in self.policies.iter().zip(staged.iter_mut()) {
            policy.register_throwable(child, throwable.clone())?;
        }
        *self.children_mut(context)? = staged;
        context.register_throwable(throwable)
    }

    fn close(&self, context: &mut RetryContext) -> Result<(), RetryError> {
        context.ensure_open()?;
        let children = self.children_mut(context)?;
        let mut first_err = None;
        for (idx, (policy, child)) in self.policies.iter().zip(children.iter_mut()).enumerate() {
            if let Err(e) = policy.close(child) {
                tracing::warn!(child = idx, policy = policy.name(), error = %e, "failed to close composite child");
                first_err.get_or_insert(e);
            }
        }
        context.mark_closed();
        first_err.map_or(Ok(()), Err)
    }

    fn max_attempts(&self) -> Option<usize> {
        let limits = self.policies.iter().map(RetryPolicy::max_attempts);
        if self.optimistic {
            // one unbounded member keeps the whole composite unbounded
            limits.collect::<Option<Vec<usize>>>()?.into_iter().max()
        } else {
            limits.flatten().min()
        }
    }
}
