//! The operation contract every store implements.

use crate::error::StoreError;

/// Insert-or-update, point lookup and deletion over owned key-value pairs.
///
/// Each store also has inherent methods with the same names; they accept
/// borrowed query forms and, where a store cannot fail, return the value
/// without a `Result`. This trait is the uniform view used by generic
/// callers.
pub trait Store<K, V> {
    /// Insert or update `key`, returning the value it replaced.
    ///
    /// Fixed-capacity stores fail with [`StoreError::CapacityExhausted`] and
    /// leave their contents untouched.
    fn put(&mut self, key: K, value: V) -> Result<Option<V>, StoreError>;

    /// Look `key` up. Takes `&mut self` because a recency cache reorders on
    /// every hit.
    fn get(&mut self, key: &K) -> Option<&V>;

    /// Delete `key`, returning its value. Absent keys yield `None`.
    fn remove(&mut self, key: &K) -> Option<V>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
