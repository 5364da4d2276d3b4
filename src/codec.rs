//! Encoding contexts and policies to bytes and back.
//!
//! Every encoded value is wrapped in a self-describing JSON envelope:
//!
//! ```text
//! {"format":"relapse","version":1,"kind":"retry_context","body":{...}}
//! ```
//!
//! Decoding checks the envelope before touching the body, so foreign or corrupt input is
//! rejected with a specific [`DecodeError`] and never produces a defaulted value. Decoded policy
//! configuration is re-validated exactly like a freshly constructed policy. Runtime
//! collaborators (the timeout policy's clock) are not encoded and come back as their defaults.
//!
//! Example
//! ```rust
//! use relapse::{Persist, RetryContext, RetryPolicy, SimpleRetryPolicy, Throwable};
//!
//! let policy = SimpleRetryPolicy::new(3).unwrap();
//! let mut ctx = policy.open(None);
//! policy.register_throwable(&mut ctx, Throwable::io("reset")).unwrap();
//!
//! let bytes = ctx.encode().unwrap();
//! let restored = RetryContext::decode(&bytes).unwrap();
//! assert_eq!(restored.retry_count(), 1);
//! assert!(RetryContext::decode(b"garbage").is_err());
//! ```

use crate::context::RetryContext;
use crate::error::{BuildError, DecodeError, EncodeError};
use crate::policy::{
    AlwaysRetryPolicy, BinaryExceptionClassifierRetryPolicy, CompositeRetryPolicy,
    ExceptionClassifierRetryPolicy, MaxAttemptsRetryPolicy, NeverRetryPolicy, PolicyKind,
    SimpleRetryPolicy, TimeoutRetryPolicy,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Format tag written into every envelope.
pub const FORMAT: &str = "relapse";
/// Envelope version written by this build.
pub const VERSION: u32 = 1;

#[derive(Serialize)]
struct EnvelopeRef<'a, T> {
    format: &'a str,
    version: u32,
    kind: &'a str,
    body: &'a T,
}

#[derive(Deserialize)]
struct Envelope {
    format: String,
    version: u32,
    kind: String,
    body: serde_json::Value,
}

/// Values that survive an encode/decode round trip.
pub trait Persist: Serialize + DeserializeOwned {
    /// Type tag stored in the envelope.
    const KIND: &'static str;

    /// Invariants a decoded value must satisfy.
    fn check(&self) -> Result<(), BuildError> {
        Ok(())
    }

    fn encode(&self) -> Result<Vec<u8>, EncodeError> {
        encode(self)
    }

    fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        decode(bytes)
    }

    /// Encoded bytes as standard base64, for text transports.
    fn encode_to_string(&self) -> Result<String, EncodeError> {
        encode(self).map(|bytes| STANDARD.encode(bytes))
    }

    fn decode_from_str(text: &str) -> Result<Self, DecodeError> {
        let bytes = STANDARD.decode(text.trim())?;
        decode(&bytes)
    }
}

/// Encode `value` in its envelope.
pub fn encode<T: Persist>(value: &T) -> Result<Vec<u8>, EncodeError> {
    let envelope = EnvelopeRef { format: FORMAT, version: VERSION, kind: T::KIND, body: value };
    serde_json::to_vec(&envelope).map_err(|source| EncodeError { kind: T::KIND, source })
}

/// Decode a value of type `T`, rejecting anything that is not a valid `T` envelope.
pub fn decode<T: Persist>(bytes: &[u8]) -> Result<T, DecodeError> {
    decode_envelope(bytes).map_err(|err| {
        debug!(kind = T::KIND, error = %err, "rejected encoded payload");
        err
    })
}

fn decode_envelope<T: Persist>(bytes: &[u8]) -> Result<T, DecodeError> {
    let envelope: Envelope = serde_json::from_slice(bytes).map_err(DecodeError::Malformed)?;
    if envelope.format != FORMAT {
        return Err(DecodeError::ForeignFormat { found: envelope.format });
    }
    if envelope.version != VERSION {
        return Err(DecodeError::UnsupportedVersion { found: envelope.version, supported: VERSION });
    }
    if envelope.kind != T::KIND {
        return Err(DecodeError::KindMismatch { expected: T::KIND, found: envelope.kind });
    }
    let value: T = serde_json::from_value(envelope.body)
        .map_err(|source| DecodeError::InvalidBody { kind: T::KIND, source })?;
    value.check()?;
    Ok(value)
}

impl Persist for RetryContext {
    const KIND: &'static str = "retry_context";
}

impl Persist for PolicyKind {
    const KIND: &'static str = "retry_policy";

    fn check(&self) -> Result<(), BuildError> {
        self.validate()
    }
}

impl Persist for AlwaysRetryPolicy {
    const KIND: &'static str = "always_retry_policy";
}

impl Persist for NeverRetryPolicy {
    const KIND: &'static str = "never_retry_policy";
}

impl Persist for SimpleRetryPolicy {
    const KIND: &'static str = "simple_retry_policy";

    fn check(&self) -> Result<(), BuildError> {
        self.validate()
    }
}

impl Persist for MaxAttemptsRetryPolicy {
    const KIND: &'static str = "max_attempts_retry_policy";

    fn check(&self) -> Result<(), BuildError> {
        self.validate()
    }
}

impl Persist for TimeoutRetryPolicy {
    const KIND: &'static str = "timeout_retry_policy";

    fn check(&self) -> Result<(), BuildError> {
        self.validate()
    }
}

impl Persist for CompositeRetryPolicy {
    const KIND: &'static str = "composite_retry_policy";

    fn check(&self) -> Result<(), BuildError> {
        self.validate()
    }
}

impl Persist for ExceptionClassifierRetryPolicy {
    const KIND: &'static str = "exception_classifier_retry_policy";

    fn check(&self) -> Result<(), BuildError> {
        self.validate()
    }
}

impl Persist for BinaryExceptionClassifierRetryPolicy {
    const KIND: &'static str = "binary_exception_classifier_retry_policy";
}
