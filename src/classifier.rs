//! Classification of failures by class.
//!
//! A [`Classifier`] is an ordered table of `(class name, value)` entries plus a mandatory
//! default, so every throwable resolves to some value. Lookup walks the throwable's lineage from
//! the most specific class outward and returns the first entry registered for that class:
//! subclass matches beat superclass matches, and among entries for the same class the first one
//! registered wins.
//!
//! Example
//! ```rust
//! use relapse::{Classifier, ErrorClass, Throwable};
//!
//! let classifier = Classifier::new("default")
//!     .with("io", "io")
//!     .with("runtime", "runtime");
//!
//! assert_eq!(*classifier.classify(&Throwable::io("disk")), "io");
//! let refused = Throwable::new(ErrorClass::io().subclass("refused"));
//! assert_eq!(*classifier.classify(&refused), "io");
//! assert_eq!(*classifier.classify(&Throwable::new(ErrorClass::root())), "default");
//! ```

use crate::error::BuildError;
use crate::throwable::{ErrorClass, Throwable};
use serde::{Deserialize, Serialize};

/// Which table slot a classification resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    /// Entry at this registration index.
    Entry(usize),
    /// No entry matched.
    Default,
}

/// A registered class mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierEntry<T> {
    /// Class name matched against a throwable's lineage.
    pub class: String,
    /// Value returned on match.
    pub value: T,
}

/// Total mapping from failure class to a value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classifier<T> {
    #[serde(default = "Vec::new")]
    entries: Vec<ClassifierEntry<T>>,
    default: T,
    #[serde(default)]
    traverse_causes: bool,
}

impl<T> Classifier<T> {
    /// Classifier that maps everything to `default`.
    pub fn new(default: T) -> Self {
        Self { entries: Vec::new(), default, traverse_causes: false }
    }

    /// Builder for tables assembled before the default is known.
    pub fn builder() -> ClassifierBuilder<T> {
        ClassifierBuilder::new()
    }

    /// Register `value` for `class` and everything derived from it.
    pub fn with(mut self, class: impl Into<String>, value: T) -> Self {
        self.entries.push(ClassifierEntry { class: class.into(), value });
        self
    }

    /// When a throwable matches no entry, try its causes before falling back to the default.
    pub fn traverse_causes(mut self, traverse: bool) -> Self {
        self.traverse_causes = traverse;
        self
    }

    /// Whether cause traversal is enabled.
    pub fn traverses_causes(&self) -> bool {
        self.traverse_causes
    }

    /// Registered entries, in registration order.
    pub fn entries(&self) -> &[ClassifierEntry<T>] {
        &self.entries
    }

    /// Fallback value.
    pub fn default_value(&self) -> &T {
        &self.default
    }

    /// Route for a class, ignoring causes.
    pub fn route_class(&self, class: &ErrorClass) -> Route {
        class
            .lineage()
            .find_map(|name| self.entries.iter().position(|e| e.class == name))
            .map(Route::Entry)
            .unwrap_or(Route::Default)
    }

    /// Route for a throwable, honouring cause traversal.
    pub fn route(&self, throwable: &Throwable) -> Route {
        if !self.traverse_causes {
            return self.route_class(throwable.class());
        }
        throwable
            .chain()
            .map(|t| self.route_class(t.class()))
            .find(|route| *route != Route::Default)
            .unwrap_or(Route::Default)
    }

    /// Value stored at `route`, or `None` if the route points past the table.
    pub fn value(&self, route: Route) -> Option<&T> {
        match route {
            Route::Entry(idx) => self.entries.get(idx).map(|e| &e.value),
            Route::Default => Some(&self.default),
        }
    }

    /// Value for a throwable. Always resolves.
    pub fn classify(&self, throwable: &Throwable) -> &T {
        self.value(self.route(throwable)).unwrap_or(&self.default)
    }

    /// Value for a class. Always resolves.
    pub fn classify_class(&self, class: &ErrorClass) -> &T {
        self.value(self.route_class(class)).unwrap_or(&self.default)
    }

    /// Every value in the table, entries first and the default last.
    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.entries.iter().map(|e| &e.value).chain(std::iter::once(&self.default))
    }
}

impl<T: Default> Default for Classifier<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

/// Builder for [`Classifier`]; `build` fails unless a default was supplied.
#[derive(Debug, Clone)]
pub struct ClassifierBuilder<T> {
    entries: Vec<ClassifierEntry<T>>,
    default: Option<T>,
    traverse_causes: bool,
}

impl<T> ClassifierBuilder<T> {
    /// Empty builder.
    pub fn new() -> Self {
        Self { entries: Vec::new(), default: None, traverse_causes: false }
    }

    /// Register `value` for `class`.
    pub fn on(mut self, class: impl Into<String>, value: T) -> Self {
        self.entries.push(ClassifierEntry { class: class.into(), value });
        self
    }

    /// Fallback for unmatched throwables.
    pub fn default_value(mut self, value: T) -> Self {
        self.default = Some(value);
        self
    }

    /// Enable cause traversal.
    pub fn traverse_causes(mut self, traverse: bool) -> Self {
        self.traverse_causes = traverse;
        self
    }

    /// Build the classifier.
    pub fn build(self) -> Result<Classifier<T>, BuildError> {
        let default = self.default.ok_or(BuildError::MissingDefault)?;
        Ok(Classifier { entries: self.entries, default, traverse_causes: self.traverse_causes })
    }
}

impl<T> Default for ClassifierBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}
