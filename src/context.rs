//! Per-attempt-sequence state.
//!
//! A [`RetryContext`] is produced by [`RetryPolicy::open`](crate::RetryPolicy::open) and updated
//! by the same policy on every registered failure. It is a plain owned value: one context per
//! logical retry loop, mutated through `&mut`, never shared between loops.
//!
//! Nested retry scopes chain contexts through `parent`. The enclosing context is handed to the
//! nested scope when it opens and handed back with [`RetryContext::take_parent`] once the nested
//! scope is done, so the outer loop cannot mutate it while the inner loop runs.
//!
//! Invariants:
//! - `retry_count` never decreases.
//! - Once closed, every policy operation on the context fails with
//!   [`RetryError::ContextClosed`].

use crate::classifier::Route;
use crate::error::RetryError;
use crate::throwable::Throwable;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Mutable state of one retry loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryContext {
    retry_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    last_throwable: Option<Throwable>,
    #[serde(default)]
    exhausted_only: bool,
    #[serde(default)]
    closed: bool,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    attributes: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    parent: Option<Box<RetryContext>>,
    #[serde(default)]
    state: ContextState,
}

/// Policy-specific part of a context.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub(crate) enum ContextState {
    /// Count-only policies.
    #[default]
    Basic,
    /// Start of the timeout budget, epoch milliseconds.
    Timeout { start_millis: u64 },
    /// One child context per composite sub-policy, same order.
    Composite { children: Vec<RetryContext> },
    /// Delegate contexts opened so far, and the route chosen for the latest failure.
    Classifier {
        #[serde(default)]
        delegates: Vec<DelegateContext>,
        #[serde(default)]
        current: Option<Route>,
    },
}

impl ContextState {
    pub(crate) fn shape(&self) -> &'static str {
        match self {
            ContextState::Basic => "basic",
            ContextState::Timeout { .. } => "timeout",
            ContextState::Composite { .. } => "composite",
            ContextState::Classifier { .. } => "classifier",
        }
    }
}

/// Context of a classifier delegate, keyed by the route that selected it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct DelegateContext {
    pub(crate) route: Route,
    pub(crate) context: RetryContext,
}

impl RetryContext {
    /// Fresh count-only context. Custom policies use this from their `open`.
    pub fn new(parent: Option<RetryContext>) -> Self {
        Self::with_state(parent, ContextState::Basic)
    }

    pub(crate) fn with_state(parent: Option<RetryContext>, state: ContextState) -> Self {
        Self {
            retry_count: 0,
            last_throwable: None,
            exhausted_only: false,
            closed: false,
            attributes: BTreeMap::new(),
            parent: parent.map(Box::new),
            state,
        }
    }

    /// Failures registered so far.
    pub fn retry_count(&self) -> usize {
        self.retry_count
    }

    /// Most recently registered failure.
    pub fn last_throwable(&self) -> Option<&Throwable> {
        self.last_throwable.as_ref()
    }

    /// Record a failure. Policies call this from `register_throwable`.
    ///
    /// Fails with [`RetryError::ContextClosed`] once the context is closed; nothing is recorded.
    pub fn register_throwable(&mut self, throwable: Throwable) -> Result<(), RetryError> {
        self.ensure_open()?;
        self.retry_count = self.retry_count.saturating_add(1);
        self.last_throwable = Some(throwable);
        Ok(())
    }

    /// Whether retries were cut short regardless of the count.
    pub fn is_exhausted_only(&self) -> bool {
        self.exhausted_only
    }

    /// Force every subsequent `can_retry` on this context to report false.
    pub fn set_exhausted_only(&mut self) {
        self.exhausted_only = true;
    }

    /// Whether the owning policy closed this context.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Fail with [`RetryError::ContextClosed`] if closed.
    pub fn ensure_open(&self) -> Result<(), RetryError> {
        if self.closed {
            return Err(RetryError::ContextClosed);
        }
        Ok(())
    }

    pub(crate) fn mark_closed(&mut self) {
        self.closed = true;
    }

    /// Enclosing scope's context.
    pub fn parent(&self) -> Option<&RetryContext> {
        self.parent.as_deref()
    }

    /// Hand the enclosing context back to the outer loop.
    ///
    /// The parent is fixed when the context is opened and only leaves it here. Taking it ends the
    /// nested scope: the context is finished and should be closed, not driven further.
    pub fn take_parent(&mut self) -> Option<RetryContext> {
        self.parent.take().map(|p| *p)
    }

    /// Diagnostic attribute.
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    /// Set a diagnostic attribute, returning the previous value.
    pub fn set_attribute(
        &mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Option<String> {
        self.attributes.insert(key.into(), value.into())
    }

    /// Remove a diagnostic attribute.
    pub fn remove_attribute(&mut self, key: &str) -> Option<String> {
        self.attributes.remove(key)
    }

    /// All diagnostic attributes, sorted by key.
    pub fn attributes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Start of the timeout budget, for contexts opened by a timeout policy.
    pub fn started_at_millis(&self) -> Option<u64> {
        match self.state {
            ContextState::Timeout { start_millis } => Some(start_millis),
            _ => None,
        }
    }

    /// Contexts opened for sub-policies: composite children in order, or classifier delegates in
    /// the order they were first used.
    pub fn sub_contexts(&self) -> Vec<&RetryContext> {
        match &self.state {
            ContextState::Composite { children } => children.iter().collect(),
            ContextState::Classifier { delegates, .. } => {
                delegates.iter().map(|d| &d.context).collect()
            }
            _ => Vec::new(),
        }
    }

    pub(crate) fn state(&self) -> &ContextState {
        &self.state
    }

    pub(crate) fn state_mut(&mut self) -> &mut ContextState {
        &mut self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_context_is_empty() {
        let ctx = RetryContext::new(None);
        assert_eq!(ctx.retry_count(), 0);
        assert!(ctx.last_throwable().is_none());
        assert!(!ctx.is_exhausted_only());
        assert!(!ctx.is_closed());
        assert!(ctx.parent().is_none());
        assert!(ctx.sub_contexts().is_empty());
    }

    #[test]
    fn register_counts_and_keeps_latest() {
        let mut ctx = RetryContext::new(None);
        ctx.register_throwable(Throwable::io("first")).unwrap();
        ctx.register_throwable(Throwable::runtime("second")).unwrap();
        assert_eq!(ctx.retry_count(), 2);
        assert_eq!(ctx.last_throwable(), Some(&Throwable::runtime("second")));
    }

    #[test]
    fn parent_is_handed_back() {
        let mut outer = RetryContext::new(None);
        outer.register_throwable(Throwable::io("outer")).unwrap();
        let mut inner = RetryContext::new(Some(outer));
        assert_eq!(inner.parent().map(RetryContext::retry_count), Some(1));
        let outer = inner.take_parent().expect("parent present");
        assert_eq!(outer.retry_count(), 1);
        assert!(inner.parent().is_none());
    }

    #[test]
    fn closed_context_rejects_use() {
        let mut ctx = RetryContext::new(None);
        assert!(ctx.ensure_open().is_ok());
        ctx.register_throwable(Throwable::io("before close")).unwrap();
        ctx.mark_closed();
        assert_eq!(ctx.ensure_open(), Err(RetryError::ContextClosed));

        assert_eq!(
            ctx.register_throwable(Throwable::runtime("after close")),
            Err(RetryError::ContextClosed)
        );
        assert_eq!(ctx.retry_count(), 1);
        assert_eq!(ctx.last_throwable(), Some(&Throwable::io("before close")));
    }

    #[test]
    fn attributes_round_trip() {
        let mut ctx = RetryContext::new(None);
        assert_eq!(ctx.set_attribute("name", "fetch"), None);
        assert_eq!(ctx.set_attribute("name", "upload"), Some("fetch".to_string()));
        assert_eq!(ctx.attribute("name"), Some("upload"));
        assert_eq!(ctx.attributes().count(), 1);
        assert_eq!(ctx.remove_attribute("name"), Some("upload".to_string()));
        assert!(ctx.attribute("name").is_none());
    }
}
