#![forbid(unsafe_code)]
#![deny(warnings)]
#![cfg_attr(not(test), deny(clippy::all))]

//! # relapse
//!
//! Retry-policy engine: decides, failure by failure, whether an operation should be attempted
//! again, and keeps the per-loop state that decision needs.
//!
//! ## Features
//!
//! - **Policies**: always, never, attempt ceilings, wall-clock budgets, composites, and
//!   classifier-driven delegation
//! - **Contexts** carrying attempt count, last failure, exhaustion flag and nested scopes
//! - **Classifiers** mapping failure classes to values, most specific class first
//! - **Persistence**: every policy and context round-trips through a self-describing encoding
//!
//! The crate does not run operations or sleep; an executor drives the loop:
//!
//! ```rust
//! use relapse::{Classifier, ExceptionClassifierRetryPolicy, NeverRetryPolicy, PolicyKind};
//! use relapse::{RetryPolicy, SimpleRetryPolicy, Throwable};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let policy = ExceptionClassifierRetryPolicy::new(
//!     Classifier::new(PolicyKind::from(SimpleRetryPolicy::new(4)?))
//!         .with("invalid_argument", NeverRetryPolicy.into()),
//! );
//!
//! let mut ctx = policy.open(None);
//! let mut attempts = 0;
//! while policy.can_retry(&ctx)? {
//!     attempts += 1;
//!     // Your fallible operation here
//!     let failure = Throwable::io("connection reset");
//!     policy.register_throwable(&mut ctx, failure)?;
//! }
//! policy.close(&mut ctx)?;
//! assert_eq!(attempts, 4);
//! # Ok(())
//! # }
//! ```

pub mod classifier;
pub mod clock;
pub mod codec;
pub mod context;
pub mod error;
pub mod policy;
pub mod prelude;
pub mod presets;
pub mod throwable;

// Re-exports
pub use classifier::{Classifier, ClassifierBuilder, Route};
pub use clock::{Clock, ManualClock, SystemClock};
pub use codec::Persist;
pub use context::RetryContext;
pub use error::{BuildError, DecodeError, EncodeError, RetryError};
pub use policy::{
    AlwaysRetryPolicy, BinaryExceptionClassifierRetryPolicy, CompositeRetryPolicy,
    ExceptionClassifierRetryPolicy, MaxAttemptsRetryPolicy, NeverRetryPolicy, PolicyKind,
    RetryPolicy, SimpleRetryPolicy, SimpleRetryPolicyBuilder, TimeoutRetryPolicy,
};
pub use throwable::{ErrorClass, Throwable};
