//! Private API values: what modules publish and what readers get back.

use std::any::Any;
use std::collections::BTreeMap;
use std::sync::Arc;

use thiserror::Error;

/// Typed lookup failure on a [`PrivateApi`] snapshot.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LookupError {
    /// The module never published this name.
    #[error("module {module} has no private API named '{name}'")]
    Missing {
        /// Module the snapshot was read from.
        module: String,
        /// Requested API name.
        name: String,
    },
    /// The name exists but holds a value of a different type.
    #[error("private API '{name}' of module {module} is a {actual}, not a {expected}")]
    TypeMismatch {
        /// Module the snapshot was read from.
        module: String,
        /// Requested API name.
        name: String,
        /// Type the caller asked for.
        expected: &'static str,
        /// Type the module published.
        actual: &'static str,
    },
}

/// A published value of any shareable type.
///
/// Functions are published like any other value: as a fn pointer or an
/// `Arc<dyn Fn(..) + Send + Sync>`. Readers must downcast to the exact type
/// that was published.
#[derive(Clone)]
pub struct ApiValue {
    inner: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
}

impl ApiValue {
    /// Wrap a value for publication.
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            inner: Arc::new(value),
            type_name: std::any::type_name::<T>(),
        }
    }

    /// Borrow the value as `T`, if that is what was published.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.downcast_ref::<T>()
    }

    /// Rust type name of the published value.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl std::fmt::Debug for ApiValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ApiValue<{}>", self.type_name)
    }
}

/// A batch of named values handed to `publish`.
#[derive(Debug, Clone, Default)]
pub struct ApiFragment {
    values: BTreeMap<String, ApiValue>,
}

impl ApiFragment {
    /// Empty fragment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with<T: Any + Send + Sync>(mut self, name: impl Into<String>, value: T) -> Self {
        self.insert(name, value);
        self
    }

    /// Add a value; a repeated name replaces the earlier value.
    pub fn insert<T: Any + Send + Sync>(&mut self, name: impl Into<String>, value: T) {
        self.values.insert(name.into(), ApiValue::new(value));
    }

    /// Add an already wrapped value.
    pub fn insert_value(&mut self, name: impl Into<String>, value: ApiValue) {
        self.values.insert(name.into(), value);
    }

    /// Names in this fragment, sorted.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Number of values.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the fragment carries nothing.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub(crate) fn into_values(self) -> BTreeMap<String, ApiValue> {
        self.values
    }
}

impl<S: Into<String>> FromIterator<(S, ApiValue)> for ApiFragment {
    fn from_iter<I: IntoIterator<Item = (S, ApiValue)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

/// Snapshot of one module's private API at the time of a read.
///
/// The map is copied on read; later publishes by the owning module are
/// only visible through a new read.
#[derive(Debug, Clone)]
pub struct PrivateApi {
    module: String,
    values: BTreeMap<String, ApiValue>,
}

impl PrivateApi {
    pub(crate) fn new(module: impl Into<String>, values: BTreeMap<String, ApiValue>) -> Self {
        Self {
            module: module.into(),
            values,
        }
    }

    /// Module this snapshot was read from.
    pub fn module(&self) -> &str {
        &self.module
    }

    /// Borrow a value as `T`. `None` when missing or of another type.
    pub fn get<T: Any>(&self, name: &str) -> Option<&T> {
        self.values.get(name).and_then(ApiValue::downcast_ref::<T>)
    }

    /// Borrow a value as `T`, reporting why it is unavailable.
    pub fn require<T: Any>(&self, name: &str) -> Result<&T, LookupError> {
        let value = self.values.get(name).ok_or_else(|| LookupError::Missing {
            module: self.module.clone(),
            name: name.to_owned(),
        })?;
        value
            .downcast_ref::<T>()
            .ok_or_else(|| LookupError::TypeMismatch {
                module: self.module.clone(),
                name: name.to_owned(),
                expected: std::any::type_name::<T>(),
                actual: value.type_name(),
            })
    }

    /// The type-erased value under `name`.
    pub fn value(&self, name: &str) -> Option<&ApiValue> {
        self.values.get(name)
    }

    /// Whether `name` was published.
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Published names, sorted.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Number of published names.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether nothing has been published yet.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
