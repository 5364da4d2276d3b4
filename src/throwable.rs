//! Failure values recorded by retry contexts.
//!
//! A [`Throwable`] is plain data: an [`ErrorClass`] naming what kind of failure it is, an optional
//! message and an optional cause. Classes carry their full lineage (most specific first), which
//! is what classifiers match against. Keeping failures as data lets contexts round-trip through
//! the codec with their last failure intact.

use crate::error::BuildError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Name of the root class every lineage ends with.
pub const ROOT_CLASS: &str = "error";

/// Kind of a failure together with every class it specializes.
///
/// ```rust
/// use relapse::ErrorClass;
///
/// let refused = ErrorClass::io().subclass("io::connection_refused");
/// assert_eq!(refused.name(), "io::connection_refused");
/// assert!(refused.is_a("io"));
/// assert_eq!(refused.depth_of("error"), Some(2));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct ErrorClass {
    lineage: Vec<String>,
}

impl TryFrom<Vec<String>> for ErrorClass {
    type Error = BuildError;

    /// Accepts a lineage listed most specific first and ending with [`ROOT_CLASS`].
    fn try_from(lineage: Vec<String>) -> Result<Self, Self::Error> {
        if lineage.last().map(String::as_str) != Some(ROOT_CLASS) {
            return Err(BuildError::InvalidLineage(lineage));
        }
        Ok(Self { lineage })
    }
}

impl From<ErrorClass> for Vec<String> {
    fn from(class: ErrorClass) -> Self {
        class.lineage
    }
}

impl ErrorClass {
    /// The root class.
    pub fn root() -> Self {
        Self { lineage: vec![ROOT_CLASS.to_string()] }
    }

    /// I/O failures.
    pub fn io() -> Self {
        Self::root().subclass("io")
    }

    /// Failures raised by application logic at runtime.
    pub fn runtime() -> Self {
        Self::root().subclass("runtime")
    }

    /// Invalid input supplied by a caller; a runtime failure.
    pub fn invalid_argument() -> Self {
        Self::runtime().subclass("invalid_argument")
    }

    /// Derive a more specific class from `self`.
    pub fn subclass(&self, name: impl Into<String>) -> Self {
        let mut lineage = Vec::with_capacity(self.lineage.len() + 1);
        lineage.push(name.into());
        lineage.extend(self.lineage.iter().cloned());
        Self { lineage }
    }

    /// Most specific class name.
    pub fn name(&self) -> &str {
        self.lineage.first().map(String::as_str).unwrap_or(ROOT_CLASS)
    }

    /// Class names from most to least specific.
    pub fn lineage(&self) -> impl Iterator<Item = &str> {
        self.lineage.iter().map(String::as_str)
    }

    /// Whether this class is `name` or specializes it.
    pub fn is_a(&self, name: &str) -> bool {
        self.depth_of(name).is_some()
    }

    /// Distance from this class to `name` in the lineage (0 = same class).
    pub fn depth_of(&self, name: &str) -> Option<usize> {
        self.lineage.iter().position(|c| c == name)
    }
}

impl Default for ErrorClass {
    fn default() -> Self {
        Self::root()
    }
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A recorded failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Throwable {
    class: ErrorClass,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    cause: Option<Box<Throwable>>,
}

impl Throwable {
    /// Failure of the given class without a message.
    pub fn new(class: ErrorClass) -> Self {
        Self { class, message: None, cause: None }
    }

    /// Shorthand for an I/O failure.
    pub fn io(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::io()).with_message(message)
    }

    /// Shorthand for a runtime failure.
    pub fn runtime(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::runtime()).with_message(message)
    }

    /// Attach a message.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Attach the failure that caused this one.
    pub fn caused_by(mut self, cause: Throwable) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    /// Class of this failure.
    pub fn class(&self) -> &ErrorClass {
        &self.class
    }

    /// Message, if any.
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Direct cause, if any.
    pub fn cause(&self) -> Option<&Throwable> {
        self.cause.as_deref()
    }

    /// This failure followed by its cause chain.
    pub fn chain(&self) -> impl Iterator<Item = &Throwable> {
        std::iter::successors(Some(self), |t| t.cause())
    }
}

impl fmt::Display for Throwable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.message {
            Some(message) => write!(f, "{}: {}", self.class, message),
            None => write!(f, "{}", self.class),
        }
    }
}

impl std::error::Error for Throwable {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause.as_deref().map(|c| c as &dyn std::error::Error)
    }
}

/// Class for an I/O error kind, e.g. `io::TimedOut` under `io`.
pub fn io_kind_class(kind: std::io::ErrorKind) -> ErrorClass {
    ErrorClass::io().subclass(format!("io::{:?}", kind))
}

impl From<&std::io::Error> for Throwable {
    fn from(err: &std::io::Error) -> Self {
        Throwable::new(io_kind_class(err.kind())).with_message(err.to_string())
    }
}

impl From<std::io::Error> for Throwable {
    fn from(err: std::io::Error) -> Self {
        Throwable::from(&err)
    }
}
