//! Nested-loop joins.
//!
//! One side is materialized into a plain vector and every streamed row is
//! compared against all of it. No hashing, no key: this is the reference
//! the hash joins are checked against and the fallback for tiny inputs.

use bindjoin_error::{JoinError, Result};
use bindjoin_types::{Binding, BindingIter, BoxedBindingIter, ExecContext, ExprList};

use crate::hash_join::JoinStats;

// ── Join Mode ──────────────────────────────────────────────────────────────

/// Which side is materialized and whether unmatched stream rows survive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// Left materialized, right streamed; unmatched rows are dropped.
    Inner,
    /// Right materialized, left streamed; unmatched left rows are emitted.
    LeftOuter,
}

impl Mode {
    const fn name(self) -> &'static str {
        match self {
            Self::Inner => "nested_loop_join",
            Self::LeftOuter => "nested_loop_left_join",
        }
    }
}

// ── Join Iterator ──────────────────────────────────────────────────────────

/// Nested-loop join over a materialized side and a streamed side.
pub struct NestedLoopJoinIter {
    mode: Mode,
    /// Condition on merged rows; always empty for inner joins.
    filter: ExprList,
    /// Evaluation context shared with the filter; carries the cancel signal.
    cx: ExecContext,
    /// Materialized side, scanned in full for every stream row.
    table: Vec<Binding>,
    /// Stream input; `None` once closed.
    stream: Option<BoxedBindingIter>,
    /// Stream row being compared against `table`.
    current: Option<Binding>,
    /// Next position in `table` to compare with `current`.
    cursor: usize,
    /// Whether `current` has produced any output.
    current_matched: bool,
    /// Result computed by `has_next` and not yet handed out.
    slot: Option<Binding>,
    stats: JoinStats,
    /// Set by `cancel`; the next step reports [`JoinError::Cancelled`].
    cancelled: bool,
    /// Set once `close` has released the stream and the table.
    closed: bool,
}

impl NestedLoopJoinIter {
    /// Inner join: `left` is materialized and closed, `right` streams.
    ///
    /// # Errors
    ///
    /// Whatever draining `left` raises; both inputs are closed first.
    pub fn inner(
        left: BoxedBindingIter,
        right: BoxedBindingIter,
        cx: &ExecContext,
    ) -> Result<Self> {
        Self::build(Mode::Inner, ExprList::new(), left, right, cx)
    }

    /// Left outer join: `right` is materialized and closed, `left` streams
    /// and every left row appears at least once.
    ///
    /// # Errors
    ///
    /// Whatever draining `right` raises; both inputs are closed first.
    pub fn left_outer(
        left: BoxedBindingIter,
        right: BoxedBindingIter,
        filter: ExprList,
        cx: &ExecContext,
    ) -> Result<Self> {
        Self::build(Mode::LeftOuter, filter, right, left, cx)
    }

    fn build(
        mode: Mode,
        filter: ExprList,
        mut table_side: BoxedBindingIter,
        mut stream: BoxedBindingIter,
        cx: &ExecContext,
    ) -> Result<Self> {
        let drained = drain(table_side.as_mut(), cx);
        table_side.close();
        let table = match drained {
            Ok(rows) => rows,
            Err(err) => {
                stream.close();
                return Err(err);
            }
        };
        tracing::debug!(join = mode.name(), rows = table.len(), "nested loop table built");
        Ok(Self {
            mode,
            filter,
            cx: cx.clone(),
            stats: JoinStats {
                probe_rows: table.len(),
                ..JoinStats::default()
            },
            table,
            stream: Some(stream),
            current: None,
            cursor: 0,
            current_matched: false,
            slot: None,
            cancelled: false,
            closed: false,
        })
    }

    #[must_use]
    pub fn stats(&self) -> JoinStats {
        self.stats
    }

    fn advance(&mut self) -> Result<Option<Binding>> {
        loop {
            let Some(current) = &self.current else {
                let Some(stream) = self.stream.as_mut() else {
                    return Ok(None);
                };
                if !stream.has_next()? {
                    return Ok(None);
                }
                self.current = Some(stream.next_binding()?);
                self.stats.stream_rows += 1;
                self.cursor = 0;
                self.current_matched = false;
                continue;
            };

            while let Some(candidate) = self.table.get(self.cursor) {
                self.cursor += 1;
                self.stats.candidates_checked += 1;
                let Some(merged) = Binding::merge(candidate, current) else {
                    continue;
                };
                if self.filter.is_satisfied(&merged, &self.cx)? {
                    self.current_matched = true;
                    return Ok(Some(merged));
                }
            }

            let finished = self.current.take();
            if self.mode == Mode::LeftOuter && !self.current_matched {
                return Ok(finished);
            }
        }
    }
}

impl BindingIter for NestedLoopJoinIter {
    fn has_next(&mut self) -> Result<bool> {
        if self.closed {
            return Ok(false);
        }
        if self.cancelled || self.cx.is_cancelled() {
            self.close();
            return Err(JoinError::Cancelled);
        }
        if self.slot.is_some() {
            return Ok(true);
        }
        match self.advance() {
            Ok(Some(row)) => {
                self.slot = Some(row);
                Ok(true)
            }
            Ok(None) => {
                self.close();
                Ok(false)
            }
            Err(err) => {
                self.close();
                Err(err)
            }
        }
    }

    fn next_binding(&mut self) -> Result<Binding> {
        if !self.has_next()? {
            return Err(JoinError::Exhausted);
        }
        let row = self.slot.take().ok_or(JoinError::Exhausted)?;
        self.stats.results += 1;
        Ok(row)
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Some(mut stream) = self.stream.take() {
            stream.close();
        }
        self.table = Vec::new();
        self.current = None;
        self.slot = None;
        tracing::debug!(
            join = self.mode.name(),
            stream_rows = self.stats.stream_rows,
            candidates_checked = self.stats.candidates_checked,
            results = self.stats.results,
            "nested loop join closed"
        );
    }

    fn cancel(&mut self) {
        self.cancelled = true;
        if let Some(stream) = self.stream.as_mut() {
            stream.cancel();
        }
    }
}

// ── Helpers ────────────────────────────────────────────────────────────────

fn drain(iter: &mut dyn BindingIter, cx: &ExecContext) -> Result<Vec<Binding>> {
    let mut rows = Vec::new();
    while iter.has_next()? {
        if cx.is_cancelled() {
            return Err(JoinError::Cancelled);
        }
        rows.push(iter.next_binding()?);
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use bindjoin_types::{FnPredicate, Term, Var, VecBindingIter, binding, collect_bindings};

    use super::*;

    fn src(rows: Vec<Binding>) -> BoxedBindingIter {
        VecBindingIter::boxed(rows)
    }

    // ── Inner join tests ─────────────────────────────────────────────────

    #[test]
    fn inner_join_streams_right_against_left() {
        let cx = ExecContext::default();
        let left = vec![binding! { "x" => 1 }, binding! { "x" => 2 }];
        let right = vec![
            binding! { "x" => 2, "y" => "b" },
            binding! { "x" => 1, "y" => "a" },
        ];
        let mut join = NestedLoopJoinIter::inner(src(left), src(right), &cx).unwrap();
        assert_eq!(
            collect_bindings(&mut join).unwrap(),
            vec![
                binding! { "x" => 2, "y" => "b" },
                binding! { "x" => 1, "y" => "a" },
            ]
        );
        assert_eq!(join.stats().candidates_checked, 4);
    }

    #[test]
    fn disjoint_rows_form_a_cross_product() {
        let cx = ExecContext::default();
        let left = vec![binding! { "a" => 1 }, binding! { "a" => 2 }];
        let right = vec![binding! { "b" => 1 }];
        let mut join = NestedLoopJoinIter::inner(src(left), src(right), &cx).unwrap();
        assert_eq!(collect_bindings(&mut join).unwrap().len(), 2);
    }

    // ── Left outer join tests ────────────────────────────────────────────

    #[test]
    fn left_outer_keeps_unmatched_left_rows_in_place() {
        let cx = ExecContext::default();
        let left = vec![binding! { "x" => 1 }, binding! { "x" => 2 }, binding! { "x" => 3 }];
        let right = vec![binding! { "x" => 2, "y" => "b" }];
        let mut join =
            NestedLoopJoinIter::left_outer(src(left), src(right), ExprList::new(), &cx).unwrap();
        assert_eq!(
            collect_bindings(&mut join).unwrap(),
            vec![
                binding! { "x" => 1 },
                binding! { "x" => 2, "y" => "b" },
                binding! { "x" => 3 },
            ]
        );
    }

    #[test]
    fn left_outer_filter_applies_to_merged_rows() {
        let cx = ExecContext::default();
        let only_b = ExprList::new().with(FnPredicate::new("?y = \"b\"", |row: &Binding| {
            Ok(row.get(&Var::new("y")) == Some(&Term::string("b")))
        }));
        let left = vec![binding! { "x" => 1 }];
        let right = vec![
            binding! { "x" => 1, "y" => "a" },
            binding! { "x" => 1, "y" => "b" },
        ];
        let mut join = NestedLoopJoinIter::left_outer(src(left), src(right), only_b, &cx).unwrap();
        assert_eq!(
            collect_bindings(&mut join).unwrap(),
            vec![binding! { "x" => 1, "y" => "b" }]
        );
    }

    // ── Cancellation ─────────────────────────────────────────────────────

    #[test]
    fn cancel_reports_cancelled_then_stops() {
        let cx = ExecContext::default();
        let mut join = NestedLoopJoinIter::inner(
            src(vec![binding! { "x" => 1 }]),
            src(vec![binding! { "x" => 1 }]),
            &cx,
        )
        .unwrap();
        join.cancel();
        assert_eq!(join.has_next(), Err(JoinError::Cancelled));
        assert!(!join.has_next().unwrap());
    }
}
