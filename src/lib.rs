//! hash-stores: four single-threaded key-value engines sharing one contract
//! (insert-or-update, lookup, delete) but differing in how they resolve
//! collisions and manage capacity.
//!
//! Internal Design:
//!
//! Summary
//! - Stores:
//!   - LinearProbingStore<K, V, S>: fixed slot array, linear probing,
//!     tombstones on delete.
//!   - RobinHoodStore<K, V, S>: fixed slot array, probe-distance-aware
//!     displacement on insert, backward-shift on delete.
//!   - LinearHashStore<K, V, S>: chained buckets that grow one split at a
//!     time under a level / expansion-pointer scheme.
//!   - RecencyCache<K, V, S>: fixed-capacity LRU built from a hash index of
//!     handles plus an arena-backed doubly linked recency list.
//! - Shared pieces: `SlotTable` (tagged slots and probe arithmetic for both
//!   open-addressing stores), the `Store` trait, configuration validation and
//!   the error types.
//!
//! Constraints
//! - Single-threaded: every store is `!Send`/`!Sync`. Callers that need
//!   sharing wrap a store in their own lock.
//! - Each store owns its slots, buckets or nodes outright; nothing is shared
//!   between instances.
//! - Fixed-capacity stores report `StoreError::CapacityExhausted` instead of
//!   growing. LinearHashStore grows; RecencyCache evicts.
//! - A failing operation leaves the store exactly as it was.
//! - Absent keys are `None`, never an error.
//!
//! Hashing
//! - Hashing is configured through a `BuildHasher` (default `RandomState`).
//!   A key's home slot is `hash mod slot_count`. `BuildIdentityHasher` makes
//!   integer keys hash to themselves for reproducible layouts.
//! - LinearHashStore and RecencyCache keep each entry's `u64` hash, so splits
//!   and index maintenance never call `K: Hash` after insertion.
//!
//! Reentrancy policy
//! - Public methods hold a debug-only reentrancy guard while `K: Hash` or
//!   `K: Eq` may run. User code that reaches back into the same store from
//!   there panics in debug builds instead of seeing a half-moved entry.
//!
//! Notes and non-goals
//! - Linear probing never compacts tombstones; delete-heavy workloads slowly
//!   lengthen probes until `clear()`.
//! - LinearHashStore never merges buckets on removal.
//! - No persistence, serialization or concurrent access.

pub mod config;
pub mod error;
pub mod identity_hasher;
pub mod linear_hash;
pub mod linear_probing;
pub mod recency_cache;
mod reentrancy;
pub mod robin_hood;
pub mod slot_table;
pub mod store;
mod store_proptest;

// Public surface
pub use config::LinearHashConfig;
pub use error::{ConfigError, StoreError};
pub use identity_hasher::BuildIdentityHasher;
pub use linear_hash::LinearHashStore;
pub use linear_probing::LinearProbingStore;
pub use recency_cache::{CacheStats, RecencyCache};
pub use robin_hood::RobinHoodStore;
pub use store::Store;
