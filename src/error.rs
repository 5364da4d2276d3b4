//! Error types for retry policies, contexts and the codec.
use crate::classifier::Route;
use std::time::Duration;

/// Errors raised by policy operations on a context.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum RetryError {
    /// The context was already closed; no further operations are allowed.
    #[error("retry context is closed")]
    ContextClosed,
    /// The context carries state for a different policy shape.
    #[error("context was opened by a {found} policy, expected {expected}")]
    ForeignContext {
        /// State shape this policy requires.
        expected: &'static str,
        /// State shape found on the context.
        found: &'static str,
    },
    /// A classifier context refers to a route its policy does not have.
    #[error("context has no delegate for route {route:?}")]
    MissingDelegate {
        /// Route recorded on the context.
        route: Route,
    },
}

/// Errors produced while building a policy or classifier.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum BuildError {
    /// `max_attempts` must be > 0.
    #[error("max_attempts must be > 0 (got {0})")]
    InvalidMaxAttempts(usize),
    /// Timeout budget must be > 0.
    #[error("timeout must be > 0 (got {0:?})")]
    InvalidTimeout(Duration),
    /// A classifier needs a default value so every throwable resolves.
    #[error("classifier has no default value")]
    MissingDefault,
    /// Class lineage is empty or does not end with the root class.
    #[error("class lineage must end with \"error\" (got {0:?})")]
    InvalidLineage(Vec<String>),
}

/// Errors produced while encoding a value.
#[derive(thiserror::Error, Debug)]
#[error("failed to encode {kind}: {source}")]
pub struct EncodeError {
    /// Type tag of the value being encoded.
    pub kind: &'static str,
    /// Underlying serializer error.
    #[source]
    pub source: serde_json::Error,
}

/// Errors produced while decoding bytes back into a context or policy.
///
/// A decode failure never yields a partially populated value.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum DecodeError {
    /// Bytes are not a well-formed envelope.
    #[error("malformed payload: {0}")]
    Malformed(#[source] serde_json::Error),
    /// Envelope comes from another producer.
    #[error("foreign payload format {found:?}")]
    ForeignFormat {
        /// Format tag found in the envelope.
        found: String,
    },
    /// Envelope version is not understood by this build.
    #[error("unsupported payload version {found} (supported: {supported})")]
    UnsupportedVersion {
        /// Version found in the envelope.
        found: u32,
        /// Version this build writes.
        supported: u32,
    },
    /// Envelope holds a different kind of value than requested.
    #[error("expected a {expected} payload, found {found}")]
    KindMismatch {
        /// Requested kind.
        expected: &'static str,
        /// Kind found in the envelope.
        found: String,
    },
    /// Envelope body does not describe a valid value of the requested kind.
    #[error("invalid {kind} body: {source}")]
    InvalidBody {
        /// Requested kind.
        kind: &'static str,
        /// Underlying deserializer error.
        #[source]
        source: serde_json::Error,
    },
    /// Body decoded but its configuration is invalid.
    #[error("decoded configuration rejected: {0}")]
    Invalid(#[from] BuildError),
    /// Text form is not valid base64.
    #[error("invalid base64 text: {0}")]
    Base64(#[from] base64::DecodeError),
}
