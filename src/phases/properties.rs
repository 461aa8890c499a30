//! # Cross-phase property bag.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

/// Shared, typed key/value bag scoped to one executor.
///
/// Every phase of an executor sees the same bag, so a value inserted while
/// producing a collection is visible while processing its items and in the
/// completion phase. Cloning is cheap (`Arc`).
///
/// ## Example
/// ```rust
/// use taskfire::Properties;
///
/// let props = Properties::default();
/// props.insert("batch", 42u32);
/// assert_eq!(props.get::<u32>("batch").as_deref(), Some(&42));
/// assert!(props.get::<String>("batch").is_none());
/// ```
#[derive(Clone, Default)]
pub struct Properties {
    inner: Arc<Mutex<HashMap<String, Arc<dyn Any + Send + Sync>>>>,
}

impl Properties {
    /// Inserts (or replaces) a value.
    pub fn insert<T: Any + Send + Sync>(&self, key: impl Into<String>, value: T) {
        self.lock().insert(key.into(), Arc::new(value));
    }

    /// Returns the value under `key` if it exists and has type `T`.
    pub fn get<T: Any + Send + Sync>(&self, key: &str) -> Option<Arc<T>> {
        let value = self.lock().get(key).cloned()?;
        value.downcast::<T>().ok()
    }

    /// Removes a value, returning `true` if it was present.
    pub fn remove(&self, key: &str) -> bool {
        self.lock().remove(key).is_some()
    }

    /// Returns `true` if a value is stored under `key`.
    pub fn contains(&self, key: &str) -> bool {
        self.lock().contains_key(key)
    }

    /// Returns the stored keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.lock().keys().cloned().collect();
        keys.sort_unstable();
        keys
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Arc<dyn Any + Send + Sync>>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for Properties {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Properties")
            .field("keys", &self.keys())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_same_bag() {
        let a = Properties::default();
        let b = a.clone();
        a.insert("k", String::from("v"));
        assert_eq!(b.get::<String>("k").as_deref().map(String::as_str), Some("v"));
        assert!(b.remove("k"));
        assert!(!a.contains("k"));
    }

    #[test]
    fn keys_are_sorted() {
        let p = Properties::default();
        p.insert("b", 1u8);
        p.insert("a", 2u8);
        assert_eq!(p.keys(), vec!["a".to_string(), "b".to_string()]);
    }
}
