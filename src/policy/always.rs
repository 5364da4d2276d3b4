//! Policy that never gives up.

use super::{gate, record, RetryPolicy};
use crate::context::RetryContext;
use crate::error::RetryError;
use crate::throwable::Throwable;
use serde::{Deserialize, Serialize};

/// Retries forever. Mostly useful as a classifier default or a composite member bounded by
/// another policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlwaysRetryPolicy;

impl RetryPolicy for AlwaysRetryPolicy {
    fn open(&self, parent: Option<RetryContext>) -> RetryContext {
        RetryContext::new(parent)
    }

    fn can_retry(&self, context: &RetryContext) -> Result<bool, RetryError> {
        gate(context)
    }

    fn register_throwable(
        &self,
        context: &mut RetryContext,
        throwable: Throwable,
    ) -> Result<(), RetryError> {
        record(context, throwable)
    }
}
