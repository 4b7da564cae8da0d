//! Hashing a row restricted to a join key.

use std::hash::{Hash, Hasher};

use bindjoin_types::Binding;
use xxhash_rust::xxh3::Xxh3;

use crate::join_key::JoinKey;

/// Hash of a row over the key variables it binds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyHash {
    /// The row binds none of the key variables; it must match every probe.
    NoKey,
    Value(u64),
}

/// Hash the `(var, term)` pairs of `row` for the variables of `key` it binds,
/// in key order. Returns [`KeyHash::NoKey`] when it binds none of them.
///
/// Collisions are possible; callers still merge to reject false positives.
#[must_use]
pub fn row_hash(key: &JoinKey, row: &Binding) -> KeyHash {
    let mut hasher = Xxh3::new();
    let mut bound_any = false;
    for var in key {
        if let Some(term) = row.get(var) {
            bound_any = true;
            var.hash(&mut hasher);
            term.hash(&mut hasher);
        }
    }
    if bound_any {
        KeyHash::Value(hasher.finish())
    } else {
        KeyHash::NoKey
    }
}
