//! Algorithm selection.

use bindjoin_error::Result;
use bindjoin_exec::{
    HashInnerJoin, HashLeftJoinBuildLeft, HashLeftJoinBuildRight, JoinKey, NestedLoopJoinIter,
};
use bindjoin_types::{BoxedBindingIter, ExecContext, ExprList};

use crate::config::{BuildSide, JoinAlgorithm, JoinConfig};

/// Inner join of `left` and `right`.
///
/// `key` is only used by the hash algorithm; `None` lets it infer one.
pub fn join(
    left: BoxedBindingIter,
    right: BoxedBindingIter,
    key: Option<JoinKey>,
    config: &JoinConfig,
    cx: &ExecContext,
) -> Result<BoxedBindingIter> {
    tracing::debug!(algorithm = ?config.algorithm, exec = cx.label(), "inner join");
    match config.algorithm {
        JoinAlgorithm::Hash => {
            HashInnerJoin::create(key, left, right, config.hash_settings(), cx)
        }
        JoinAlgorithm::NestedLoop => Ok(Box::new(NestedLoopJoinIter::inner(left, right, cx)?)),
    }
}

/// Left outer join preserving every row of `left`.
///
/// A merged row is kept only if it satisfies `filter`; a left row with no
/// kept merge is emitted unchanged.
pub fn left_join(
    left: BoxedBindingIter,
    right: BoxedBindingIter,
    key: Option<JoinKey>,
    filter: ExprList,
    config: &JoinConfig,
    cx: &ExecContext,
) -> Result<BoxedBindingIter> {
    tracing::debug!(
        algorithm = ?config.algorithm,
        build_side = ?config.left_join_build_side,
        filters = filter.len(),
        exec = cx.label(),
        "left join"
    );
    let settings = config.hash_settings();
    match (config.algorithm, config.left_join_build_side) {
        (JoinAlgorithm::Hash, BuildSide::Left) => {
            HashLeftJoinBuildLeft::create(key, left, right, filter, settings, cx)
        }
        (JoinAlgorithm::Hash, BuildSide::Right) => {
            HashLeftJoinBuildRight::create(key, left, right, filter, settings, cx)
        }
        (JoinAlgorithm::NestedLoop, _) => Ok(Box::new(NestedLoopJoinIter::left_outer(
            left, right, filter, cx,
        )?)),
    }
}
