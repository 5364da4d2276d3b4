//! Policy allowing a single attempt.

use super::{gate, record, RetryPolicy};
use crate::context::RetryContext;
use crate::error::RetryError;
use crate::throwable::Throwable;
use serde::{Deserialize, Serialize};

/// Allows the initial attempt and nothing after the first failure.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NeverRetryPolicy;

impl RetryPolicy for NeverRetryPolicy {
    fn open(&self, parent: Option<RetryContext>) -> RetryContext {
        RetryContext::new(parent)
    }

    fn can_retry(&self, context: &RetryContext) -> Result<bool, RetryError> {
        Ok(gate(context)? && context.retry_count() == 0)
    }

    fn register_throwable(
        &self,
        context: &mut RetryContext,
        throwable: Throwable,
    ) -> Result<(), RetryError> {
        record(context, throwable)
    }

    fn max_attempts(&self) -> Option<usize> {
        Some(1)
    }
}
