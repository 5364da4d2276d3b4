//! Convenient re-exports for common relapse types.
pub use crate::{
    classifier::{Classifier, ClassifierBuilder, Route},
    codec::Persist,
    context::RetryContext,
    error::{BuildError, DecodeError, RetryError},
    policy::{
        AlwaysRetryPolicy, BinaryExceptionClassifierRetryPolicy, CompositeRetryPolicy,
        ExceptionClassifierRetryPolicy, MaxAttemptsRetryPolicy, NeverRetryPolicy, PolicyKind,
        RetryPolicy, SimpleRetryPolicy, TimeoutRetryPolicy,
    },
    throwable::{ErrorClass, Throwable},
};
