//! Probe table that adapts its index to each probe's binding pattern.
//!
//! Rows are inserted once into an initial [`JoinIndex`]. The first lookup
//! finalizes the table: the variables seen across all inserted rows are
//! frozen, in first-seen order, into a key. Each probe is then classified by
//! which of those variables it binds, and served by a [`JoinIndex`] whose
//! main key is exactly that pattern. Indexes for new patterns are built on
//! demand by replaying every stored row, so the cost of a pattern is paid
//! once and shared by all probes with that pattern.

use bindjoin_error::{JoinError, Result};
use bindjoin_types::Binding;
use hashbrown::HashMap;

use crate::bitset::{VarBitSet, key_bits, to_bitset};
use crate::hash_probe_table::RowId;
use crate::join_index::JoinIndex;
use crate::join_key::{JoinKey, JoinKeyBuilder};

/// State frozen by the first lookup.
#[derive(Debug)]
struct PatternIndexes {
    seen_key: JoinKey,
    /// Pattern the initial index answers for. `None` when part of the
    /// initial key was never tracked as seen: a probe cannot be shown to
    /// bind the whole main key then, so every pattern gets its own index.
    initial_bits: Option<VarBitSet>,
    by_pattern: HashMap<VarBitSet, JoinIndex>,
    builds: usize,
}

impl PatternIndexes {
    fn freeze(seen_vars: &JoinKeyBuilder, initial: &JoinIndex, row_count: usize) -> Self {
        let seen_key = seen_vars.build();
        let initial_key = initial.main_table().key();
        let initial_bits = initial_key
            .iter()
            .all(|var| seen_key.contains(var))
            .then(|| key_bits(&seen_key, initial_key));
        tracing::debug!(
            seen_vars = %seen_key,
            initial_key = %initial.main_table().key(),
            rows = row_count,
            "probe table finalized"
        );
        Self {
            seen_key,
            initial_bits,
            by_pattern: HashMap::new(),
            builds: 0,
        }
    }
}

/// Materialized probe side of a hash join.
#[derive(Debug)]
pub struct MultiHashProbeTable {
    rows: Vec<Binding>,
    max_join_key: Option<JoinKey>,
    seen_vars: JoinKeyBuilder,
    initial: JoinIndex,
    /// `None` while rows are being added; set by the first lookup.
    finalized: Option<PatternIndexes>,
}

impl MultiHashProbeTable {
    /// `initial_join_key` shapes the index rows are first inserted into.
    /// When `max_join_key` is given, only its variables are tracked as seen,
    /// bounding the patterns probes can be classified into.
    #[must_use]
    pub fn new(max_join_key: Option<JoinKey>, initial_join_key: JoinKey) -> Self {
        Self {
            rows: Vec::new(),
            max_join_key,
            seen_vars: JoinKeyBuilder::new(),
            initial: JoinIndex::over_key(initial_join_key),
            finalized: None,
        }
    }

    /// Store `row` and return its id.
    ///
    /// # Errors
    ///
    /// [`JoinError::TableFinalized`] once any lookup has happened.
    pub fn put(&mut self, row: Binding) -> Result<RowId> {
        if self.finalized.is_some() {
            return Err(JoinError::TableFinalized);
        }
        match &self.max_join_key {
            Some(max_key) => {
                for var in row.vars() {
                    if max_key.contains(var) {
                        self.seen_vars.add(var.clone());
                    }
                }
            }
            None => {
                self.seen_vars.add_all(row.vars());
            }
        }
        let id = self.rows.len();
        self.initial.put(id, &row);
        self.rows.push(row);
        Ok(id)
    }

    /// Append the candidate rows for `row` to `out`, finalizing on first use.
    ///
    /// A probe binding none of the seen variables gets every row.
    pub fn extend_candidates(&mut self, row: &Binding, out: &mut Vec<RowId>) {
        let Self {
            rows,
            seen_vars,
            initial,
            finalized,
            ..
        } = self;
        let patterns =
            finalized.get_or_insert_with(|| PatternIndexes::freeze(seen_vars, initial, rows.len()));

        let pattern = to_bitset(&patterns.seen_key, row);
        if pattern.is_empty() {
            initial.extend_all(out);
            return;
        }
        if patterns.initial_bits.as_ref() == Some(&pattern) {
            initial.extend_candidates(row, out);
            return;
        }
        if !patterns.by_pattern.contains_key(&pattern) {
            let index = replay(&patterns.seen_key, pattern.clone(), rows);
            patterns.builds += 1;
            tracing::debug!(
                pattern = ?pattern,
                main_key = %index.main_table().key(),
                rows = rows.len(),
                "built join index for probe pattern"
            );
            patterns.by_pattern.insert(pattern.clone(), index);
        }
        if let Some(index) = patterns.by_pattern.get(&pattern) {
            index.extend_candidates(row, out);
        }
    }

    #[must_use]
    pub fn candidates(&mut self, row: &Binding) -> Vec<RowId> {
        let mut out = Vec::new();
        self.extend_candidates(row, &mut out);
        out
    }

    #[must_use]
    pub fn row(&self, id: RowId) -> Option<&Binding> {
        self.rows.get(id)
    }

    /// Stored rows in insertion order; a row's id is its position.
    #[must_use]
    pub fn rows(&self) -> &[Binding] {
        &self.rows
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[must_use]
    pub fn is_finalized(&self) -> bool {
        self.finalized.is_some()
    }

    /// The frozen seen-variable key, once finalized.
    #[must_use]
    pub fn seen_vars_key(&self) -> Option<&JoinKey> {
        self.finalized.as_ref().map(|patterns| &patterns.seen_key)
    }

    /// Number of per-pattern indexes built so far.
    #[must_use]
    pub fn index_builds(&self) -> usize {
        self.finalized.as_ref().map_or(0, |patterns| patterns.builds)
    }

    /// Release every stored row and index. The table stays finalized.
    pub fn clear(&mut self) {
        let Self {
            rows,
            seen_vars,
            initial,
            finalized,
            ..
        } = self;
        let patterns =
            finalized.get_or_insert_with(|| PatternIndexes::freeze(seen_vars, initial, rows.len()));
        patterns.by_pattern = HashMap::new();
        *rows = Vec::new();
        initial.clear();
    }
}

fn replay(seen_key: &JoinKey, pattern: VarBitSet, rows: &[Binding]) -> JoinIndex {
    let mut index = JoinIndex::new(seen_key.clone(), pattern);
    for (id, row) in rows.iter().enumerate() {
        index.put(id, row);
    }
    index
}
