//! Ready-made policies and the catalog of every built-in variant.
//!
//! ## Available Presets
//!
//! - [`transient_io`]: retry I/O failures a few more times than other failures, never retry
//!   invalid input
//! - [`bounded`]: attempt ceiling and wall-clock budget, whichever runs out first
//! - [`catalog`]: one representative configuration of every policy variant
//!
//! The catalog is maintained by hand. Adding a variant to [`PolicyKind`] means adding it here,
//! which puts it under the crate's round-trip and lifecycle test suites.
//!
//! ```rust
//! use relapse::{presets, RetryPolicy, Throwable};
//!
//! let policy = presets::transient_io();
//! let mut ctx = policy.open(None);
//! policy.register_throwable(&mut ctx, Throwable::io("reset")).unwrap();
//! assert!(policy.can_retry(&ctx).unwrap());
//! ```

use crate::classifier::Classifier;
use crate::error::BuildError;
use crate::policy::{
    AlwaysRetryPolicy, BinaryExceptionClassifierRetryPolicy, CompositeRetryPolicy,
    ExceptionClassifierRetryPolicy, MaxAttemptsRetryPolicy, NeverRetryPolicy, PolicyKind,
    SimpleRetryPolicy, TimeoutRetryPolicy,
};
use crate::throwable::ErrorClass;
use std::num::NonZeroUsize;
use std::time::Duration;

const TRANSIENT_IO_ATTEMPTS: NonZeroUsize = match NonZeroUsize::new(5) {
    Some(n) => n,
    None => unreachable!(),
};
const TRANSIENT_OTHER_ATTEMPTS: NonZeroUsize = match NonZeroUsize::new(2) {
    Some(n) => n,
    None => unreachable!(),
};

/// I/O failures get five attempts, invalid input one, anything else two. Causes are consulted,
/// so an I/O failure wrapped by application code still counts as I/O.
pub fn transient_io() -> PolicyKind {
    let other = MaxAttemptsRetryPolicy::from_nonzero(TRANSIENT_OTHER_ATTEMPTS);
    let io = MaxAttemptsRetryPolicy::from_nonzero(TRANSIENT_IO_ATTEMPTS);
    let classifier = Classifier::new(PolicyKind::from(other))
        .with(ErrorClass::io().name(), io.into())
        .with(ErrorClass::invalid_argument().name(), NeverRetryPolicy.into())
        .traverse_causes(true);
    ExceptionClassifierRetryPolicy::new(classifier).into()
}

/// Stop after `max_attempts` attempts or once `budget` has elapsed.
pub fn bounded(max_attempts: usize, budget: Duration) -> Result<PolicyKind, BuildError> {
    Ok(CompositeRetryPolicy::new([
        PolicyKind::from(MaxAttemptsRetryPolicy::new(max_attempts)?),
        TimeoutRetryPolicy::new(budget)?.into(),
    ])
    .into())
}

/// Every policy variant, named, in a representative configuration.
pub fn catalog() -> Vec<(&'static str, PolicyKind)> {
    let io_never_else_always = ExceptionClassifierRetryPolicy::new(
        Classifier::new(AlwaysRetryPolicy.into())
            .with(ErrorClass::io().name(), NeverRetryPolicy.into()),
    );
    vec![
        ("always", AlwaysRetryPolicy.into()),
        ("never", NeverRetryPolicy.into()),
        ("simple", SimpleRetryPolicy::default().into()),
        ("max_attempts", MaxAttemptsRetryPolicy::default().into()),
        ("timeout", TimeoutRetryPolicy::default().into()),
        ("composite", CompositeRetryPolicy::default().into()),
        (
            "composite_optimistic",
            CompositeRetryPolicy::new([
                PolicyKind::from(NeverRetryPolicy),
                SimpleRetryPolicy::default().into(),
            ])
            .optimistic(true)
            .into(),
        ),
        ("exception_classifier", ExceptionClassifierRetryPolicy::default().into()),
        (
            "exception_classifier_always",
            ExceptionClassifierRetryPolicy::new(Classifier::new(AlwaysRetryPolicy.into())).into(),
        ),
        ("exception_classifier_io_never", io_never_else_always.into()),
        ("binary_exception_classifier", BinaryExceptionClassifierRetryPolicy::default().into()),
        ("transient_io", transient_io()),
    ]
}
