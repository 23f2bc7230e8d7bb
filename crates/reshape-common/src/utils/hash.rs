//! Hash map and set aliases backed by `ahash`.
//!
//! Grouping keys and distinct sets are hashed on every input row, so the
//! execution layer uses these instead of the SipHash-based std collections.

/// A `hashbrown` map using `ahash`.
pub type FastHashMap<K, V> = hashbrown::HashMap<K, V, ahash::RandomState>;

/// A `hashbrown` set using `ahash`.
pub type FastHashSet<T> = hashbrown::HashSet<T, ahash::RandomState>;

/// An insertion-ordered map using `ahash`.
pub type FastIndexMap<K, V> = indexmap::IndexMap<K, V, ahash::RandomState>;

/// An insertion-ordered set using `ahash`.
pub type FastIndexSet<T> = indexmap::IndexSet<T, ahash::RandomState>;
