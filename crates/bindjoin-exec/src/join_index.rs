//! Main table plus skew tables.
//!
//! A [`JoinIndex`] hashes rows on a main key, a subset of a wider "super"
//! key. Each inserted row lands in exactly one place:
//!
//! - binds none of the main key: the main table's no-key bucket;
//! - binds all of it: the main table, hashed on the main key;
//! - binds a strict non-empty subset: the skew table for that subset,
//!   hashed on just those variables.
//!
//! Skew tables are created on first use and kept in creation order.

use bindjoin_types::Binding;
use hashbrown::HashMap;

use crate::bitset::{VarBitSet, key_bits, to_bitset, to_key};
use crate::hash_probe_table::{HashProbeTable, RowId};
use crate::join_key::JoinKey;

#[derive(Debug)]
pub struct JoinIndex {
    super_key: JoinKey,
    main_bits: VarBitSet,
    main: HashProbeTable,
    /// bitset -> position in `skews`
    skew_slots: HashMap<VarBitSet, usize>,
    skews: Vec<(VarBitSet, HashProbeTable)>,
}

impl JoinIndex {
    /// Index over `main_bits`, interpreted relative to `super_key`.
    #[must_use]
    pub fn new(super_key: JoinKey, main_bits: VarBitSet) -> Self {
        debug_assert_eq!(main_bits.width(), super_key.len());
        let main_key = to_key(&super_key, &main_bits);
        Self {
            super_key,
            main_bits,
            main: HashProbeTable::new(main_key),
            skew_slots: HashMap::new(),
            skews: Vec::new(),
        }
    }

    /// Index whose main key is the whole of `key`.
    #[must_use]
    pub fn over_key(key: JoinKey) -> Self {
        let bits = key_bits(&key, &key);
        Self::new(key, bits)
    }

    #[must_use]
    pub fn super_key(&self) -> &JoinKey {
        &self.super_key
    }

    #[must_use]
    pub fn main_bits(&self) -> &VarBitSet {
        &self.main_bits
    }

    #[must_use]
    pub fn main_table(&self) -> &HashProbeTable {
        &self.main
    }

    #[must_use]
    pub fn skew_table(&self, bits: &VarBitSet) -> Option<&HashProbeTable> {
        self.skew_slots.get(bits).map(|&slot| &self.skews[slot].1)
    }

    /// Skew tables in creation order.
    pub fn skew_tables(&self) -> impl Iterator<Item = (&VarBitSet, &HashProbeTable)> + '_ {
        self.skews.iter().map(|(bits, table)| (bits, table))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.main.len() + self.skews.iter().map(|(_, t)| t.len()).sum::<usize>()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn put(&mut self, id: RowId, row: &Binding) {
        let effective = to_bitset(&self.super_key, row).intersection(&self.main_bits);
        if effective.is_empty() || effective == self.main_bits {
            self.main.put(id, row);
        } else {
            self.skew_table_mut(effective).put(id, row);
        }
    }

    /// Candidates from the main table (including its no-key bucket), then
    /// from each skew table in creation order.
    pub fn extend_candidates(&self, row: &Binding, out: &mut Vec<RowId>) {
        self.main.extend_candidates(row, true, out);
        for (_, skew) in &self.skews {
            // Rows sharing nothing with the main key never reach a skew table.
            skew.extend_candidates(row, false, out);
        }
    }

    #[must_use]
    pub fn candidates(&self, row: &Binding) -> Vec<RowId> {
        let mut out = Vec::new();
        self.extend_candidates(row, &mut out);
        out
    }

    /// Every row: main table, then skew tables in creation order.
    pub fn extend_all(&self, out: &mut Vec<RowId>) {
        self.main.extend_all(out);
        for (_, skew) in &self.skews {
            skew.extend_all(out);
        }
    }

    pub fn clear(&mut self) {
        self.main.clear();
        self.skew_slots = HashMap::new();
        self.skews = Vec::new();
    }

    fn skew_table_mut(&mut self, bits: VarBitSet) -> &mut HashProbeTable {
        let slot = match self.skew_slots.get(&bits) {
            Some(&slot) => slot,
            None => {
                let key = to_key(&self.super_key, &bits);
                tracing::trace!(skew_key = %key, "creating skew table");
                self.skews.push((bits.clone(), HashProbeTable::new(key)));
                let slot = self.skews.len() - 1;
                self.skew_slots.insert(bits, slot);
                slot
            }
        };
        &mut self.skews[slot].1
    }
}

#[cfg(test)]
mod tests {
    use bindjoin_types::{Var, binding};

    use super::*;

    fn key(names: &[&str]) -> JoinKey {
        JoinKey::from_vars(names.iter().map(|n| Var::new(*n)))
    }

    fn bits(reference: &JoinKey, names: &[&str]) -> VarBitSet {
        key_bits(reference, &key(names))
    }

    #[test]
    fn rows_route_to_main_skew_or_no_key() {
        let super_key = key(&["x", "y", "z"]);
        let mut index = JoinIndex::new(super_key.clone(), bits(&super_key, &["x", "y"]));
        let rows = [
            binding! { "x" => 1, "y" => 2 },
            binding! { "x" => 1, "y" => 2, "z" => 3 },
            binding! { "x" => 1 },
            binding! { "y" => 2 },
            binding! { "z" => 3 },
            binding! { "w" => 4 },
        ];
        for (id, row) in rows.iter().enumerate() {
            index.put(id, row);
        }

        assert_eq!(index.main_table().len(), 4);
        assert_eq!(index.main_table().no_key_len(), 2);
        let x_only = index.skew_table(&bits(&super_key, &["x"])).unwrap();
        let y_only = index.skew_table(&bits(&super_key, &["y"])).unwrap();
        assert_eq!(x_only.len(), 1);
        assert_eq!(y_only.len(), 1);
        assert_eq!(index.len(), rows.len());

        let order: Vec<String> = index
            .skew_tables()
            .map(|(b, _)| format!("{b:?}"))
            .collect();
        assert_eq!(order, vec!["100", "010"]);
    }

    #[test]
    fn probe_reaches_main_no_key_and_skew_rows() {
        let super_key = key(&["x", "y"]);
        let mut index = JoinIndex::over_key(super_key);
        let rows = [
            binding! { "x" => 1, "y" => 2 },
            binding! { "x" => 1, "y" => 3 },
            binding! { "x" => 1 },
            binding! { "y" => 2 },
            binding! { "y" => 9 },
            binding! { "q" => 0 },
        ];
        for (id, row) in rows.iter().enumerate() {
            index.put(id, row);
        }
        // main hit, no-key row, then skew {x} and skew {y} hits.
        assert_eq!(
            index.candidates(&binding! { "x" => 1, "y" => 2 }),
            vec![0, 5, 2, 3]
        );
    }

    #[test]
    fn skew_lookup_does_not_repeat_no_key_rows() {
        let super_key = key(&["x", "y"]);
        let mut index = JoinIndex::over_key(super_key);
        index.put(0, &binding! { "x" => 1 });
        index.put(1, &binding! { "other" => 1 });
        let found = index.candidates(&binding! { "x" => 1, "y" => 1 });
        assert_eq!(found, vec![1, 0]);
    }

    #[test]
    fn full_scan_and_clear() {
        let mut index = JoinIndex::over_key(key(&["x", "y"]));
        index.put(0, &binding! { "x" => 1 });
        index.put(1, &binding! { "x" => 1, "y" => 1 });
        index.put(2, &binding! { "n" => 1 });
        let mut all = Vec::new();
        index.extend_all(&mut all);
        assert_eq!(all, vec![1, 2, 0]);
        index.clear();
        assert!(index.is_empty());
    }
}
