//! Joins over streams of variable bindings.
//!
//! ```
//! use bindjoin::{ExecContext, JoinConfig, VecBindingIter, binding, collect_bindings, join};
//!
//! let left = VecBindingIter::boxed(vec![binding! { "x" => 1 }, binding! { "x" => 2 }]);
//! let right = VecBindingIter::boxed(vec![binding! { "x" => 1, "y" => "a" }]);
//! let mut joined = join(left, right, None, &JoinConfig::default(), &ExecContext::default())?;
//! assert_eq!(collect_bindings(&mut joined)?, vec![binding! { "x" => 1, "y" => "a" }]);
//! # Ok::<(), bindjoin::JoinError>(())
//! ```

pub mod config;
pub mod join;

pub use bindjoin_error::{JoinError, Result};
pub use bindjoin_exec::{HashJoinSettings, JoinKey, JoinKeyBuilder, JoinStats, NestedLoopJoinIter};
pub use bindjoin_types::{
    Binding, BindingIter, BoxedBindingIter, EmptyBindingIter, ExecContext, ExprList, FnPredicate,
    Predicate, Term, Var, VecBindingIter, binding, collect_bindings,
};
pub use config::{BuildSide, JoinAlgorithm, JoinConfig};
pub use join::{join, left_join};
