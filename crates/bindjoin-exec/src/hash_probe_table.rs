//! Single-level hash multimap from key hash to row ids.
//!
//! Rows whose key hash is [`KeyHash::NoKey`] go to a separate bucket that is
//! appended to every lookup, since such rows are compatible with any probe on
//! the key. Every row lives in exactly one place: its hash bucket or the
//! no-key bucket.
//!
//! The table stores [`RowId`]s; the rows themselves are owned by whoever
//! assigned the ids (see [`MultiHashProbeTable`](crate::MultiHashProbeTable)).

use bindjoin_types::Binding;
use hashbrown::HashMap;
use smallvec::SmallVec;

use crate::join_key::JoinKey;
use crate::row_hash::{KeyHash, row_hash};

/// Identifier of a materialized row.
pub type RowId = usize;

type Bucket = SmallVec<[RowId; 2]>;

/// Hash multimap over one [`JoinKey`].
#[derive(Debug)]
pub struct HashProbeTable {
    key: JoinKey,
    /// hash -> position in `buckets`
    slots: HashMap<u64, usize>,
    /// Buckets in creation order so full scans are deterministic.
    buckets: Vec<Bucket>,
    no_key: Vec<RowId>,
    len: usize,
}

impl HashProbeTable {
    #[must_use]
    pub fn new(key: JoinKey) -> Self {
        Self {
            key,
            slots: HashMap::new(),
            buckets: Vec::new(),
            no_key: Vec::new(),
            len: 0,
        }
    }

    #[must_use]
    pub fn key(&self) -> &JoinKey {
        &self.key
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of rows in the no-key bucket.
    #[must_use]
    pub fn no_key_len(&self) -> usize {
        self.no_key.len()
    }

    /// Store `id` under the key hash of `row`. Duplicates are kept.
    pub fn put(&mut self, id: RowId, row: &Binding) {
        match row_hash(&self.key, row) {
            KeyHash::NoKey => self.no_key.push(id),
            KeyHash::Value(hash) => {
                let slot = *self.slots.entry(hash).or_insert_with(|| {
                    self.buckets.push(Bucket::new());
                    self.buckets.len() - 1
                });
                self.buckets[slot].push(id);
            }
        }
        self.len += 1;
    }

    /// Candidate rows for `row`, see [`extend_candidates`](Self::extend_candidates).
    #[must_use]
    pub fn candidates(&self, row: &Binding) -> Vec<RowId> {
        let mut out = Vec::new();
        self.extend_candidates(row, true, &mut out);
        out
    }

    /// Append the candidates for probe `row` to `out`.
    ///
    /// A probe with no key variables gets every row. Otherwise it gets the
    /// bucket with its hash (possibly none) followed, when `include_no_key`
    /// is set, by the no-key bucket. Each part is in insertion order.
    /// Same-hash rows with different values are not filtered out.
    pub fn extend_candidates(&self, row: &Binding, include_no_key: bool, out: &mut Vec<RowId>) {
        match row_hash(&self.key, row) {
            KeyHash::NoKey => {
                for bucket in &self.buckets {
                    out.extend_from_slice(bucket);
                }
                if include_no_key {
                    out.extend_from_slice(&self.no_key);
                }
            }
            KeyHash::Value(hash) => {
                if let Some(&slot) = self.slots.get(&hash) {
                    out.extend_from_slice(&self.buckets[slot]);
                }
                if include_no_key {
                    out.extend_from_slice(&self.no_key);
                }
            }
        }
    }

    /// Append every stored row: hash buckets in creation order, then no-key rows.
    pub fn extend_all(&self, out: &mut Vec<RowId>) {
        for bucket in &self.buckets {
            out.extend_from_slice(bucket);
        }
        out.extend_from_slice(&self.no_key);
    }

    pub fn clear(&mut self) {
        self.slots = HashMap::new();
        self.buckets = Vec::new();
        self.no_key = Vec::new();
        self.len = 0;
    }
}
