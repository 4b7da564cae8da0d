//! Join evaluation over streams of variable bindings.
//!
//! The building blocks, bottom up:
//!
//! - [`JoinKey`]: ordered, de-duplicated join variables.
//! - [`VarBitSet`]: which variables of a reference key a row binds.
//! - [`row_hash`]: order-sensitive hash of a row's key values.
//! - [`HashProbeTable`]: hash multimap with a no-key bucket.
//! - [`JoinIndex`]: main table plus skew tables for partially bound rows.
//! - [`MultiHashProbeTable`]: per-probe-pattern indexes built on demand.
//!
//! On top sit the operators: [`HashInnerJoin`], [`HashLeftJoinBuildLeft`],
//! [`HashLeftJoinBuildRight`] and [`NestedLoopJoinIter`]. Each is itself a
//! [`BindingIter`](bindjoin_types::BindingIter).

pub mod bitset;
pub mod hash_join;
pub mod hash_probe_table;
pub mod join_index;
pub mod join_key;
pub mod multi_hash_probe_table;
pub mod nested_loop;
pub mod peek;
pub mod row_hash;

pub use bitset::{VarBitSet, key_bits, to_bitset, to_key};
pub use hash_join::{
    HashInnerJoin, HashJoinIter, HashJoinSettings, HashLeftJoinBuildLeft, HashLeftJoinBuildRight,
    InnerJoin, JoinHooks, JoinInputs, JoinStats, LeftJoinBuildLeft, LeftJoinBuildRight,
    inner_join_inputs, left_join_inputs,
};
pub use hash_probe_table::{HashProbeTable, RowId};
pub use join_index::JoinIndex;
pub use join_key::{JoinKey, JoinKeyBuilder};
pub use multi_hash_probe_table::MultiHashProbeTable;
pub use nested_loop::NestedLoopJoinIter;
pub use peek::PeekIter;
pub use row_hash::{KeyHash, row_hash};
