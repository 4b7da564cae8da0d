//! Hash joins over binding streams.
//!
//! One side (the probe side) is drained into a [`MultiHashProbeTable`]; the
//! other (the stream side) is pulled one row at a time and looked up. All
//! three variants run the same state machine:
//!
//! ```text
//! INIT -> HASH -> STREAM -> TRAILER -> DONE
//! ```
//!
//! INIT and HASH happen in the constructor: the join key is inferred if
//! needed, the probe side is materialized and closed. STREAM merges each
//! stream row with its candidates. TRAILER emits whatever the variant held
//! back until the stream ended. The variants differ only in the three
//! callbacks of [`JoinHooks`].

use bindjoin_error::{JoinError, Result};
use bindjoin_types::{
    Binding, BindingIter, BoxedBindingIter, EmptyBindingIter, ExecContext, ExprList, Var,
};

use crate::hash_probe_table::RowId;
use crate::join_key::JoinKey;
use crate::multi_hash_probe_table::MultiHashProbeTable;
use crate::peek::PeekIter;

// ── Join Hooks ─────────────────────────────────────────────────────────────

/// The points where join variants differ.
pub trait JoinHooks {
    /// Operator name used in tracing output.
    const NAME: &'static str;

    /// A probe row merged with the current stream row. Returns the row to
    /// emit, or `None` to treat the pair as a non-match.
    fn on_merge(
        &mut self,
        probe_id: RowId,
        merged: Binding,
        cx: &ExecContext,
    ) -> Result<Option<Binding>>;

    /// No candidate of `stream_row` produced output. May substitute a row.
    fn on_no_match(&mut self, stream_row: &Binding) -> Option<Binding>;

    /// The stream side is exhausted. Returns rows to emit afterwards.
    fn on_stream_end(&mut self, table: &MultiHashProbeTable) -> Vec<Binding>;
}

/// Inner join: every merge is emitted, unmatched rows are dropped.
#[derive(Debug, Default, Clone, Copy)]
pub struct InnerJoin;

impl JoinHooks for InnerJoin {
    const NAME: &'static str = "hash_join";

    fn on_merge(
        &mut self,
        _probe_id: RowId,
        merged: Binding,
        _cx: &ExecContext,
    ) -> Result<Option<Binding>> {
        Ok(Some(merged))
    }

    fn on_no_match(&mut self, _stream_row: &Binding) -> Option<Binding> {
        None
    }

    fn on_stream_end(&mut self, _table: &MultiHashProbeTable) -> Vec<Binding> {
        Vec::new()
    }
}

/// Left outer join with the probe table built from the preserved side.
///
/// Matched probe rows are recorded; once the stream ends, every probe row
/// never matched is emitted unchanged.
#[derive(Debug, Default)]
pub struct LeftJoinBuildLeft {
    /// Condition a merged row must pass to count as a match.
    filter: ExprList,
    /// Matched flags indexed by probe row id; grows on demand.
    hits: Vec<bool>,
}

impl LeftJoinBuildLeft {
    #[must_use]
    pub fn new(filter: ExprList) -> Self {
        Self {
            filter,
            hits: Vec::new(),
        }
    }

    fn mark(&mut self, id: RowId) {
        if self.hits.len() <= id {
            self.hits.resize(id + 1, false);
        }
        self.hits[id] = true;
    }

    fn was_hit(&self, id: RowId) -> bool {
        self.hits.get(id).copied().unwrap_or(false)
    }
}

impl JoinHooks for LeftJoinBuildLeft {
    const NAME: &'static str = "hash_left_join_build_left";

    fn on_merge(
        &mut self,
        probe_id: RowId,
        merged: Binding,
        cx: &ExecContext,
    ) -> Result<Option<Binding>> {
        if !self.filter.is_satisfied(&merged, cx)? {
            return Ok(None);
        }
        self.mark(probe_id);
        Ok(Some(merged))
    }

    fn on_no_match(&mut self, _stream_row: &Binding) -> Option<Binding> {
        None
    }

    fn on_stream_end(&mut self, table: &MultiHashProbeTable) -> Vec<Binding> {
        table
            .rows()
            .iter()
            .enumerate()
            .filter(|(id, _)| !self.was_hit(*id))
            .map(|(_, row)| row.clone())
            .collect()
    }
}

/// Left outer join with the probe table built from the optional side.
///
/// The preserved side streams; a stream row without a passing match is
/// emitted unchanged in place of its matches.
#[derive(Debug, Default)]
pub struct LeftJoinBuildRight {
    /// Condition a merged row must pass to count as a match.
    filter: ExprList,
}

impl LeftJoinBuildRight {
    #[must_use]
    pub fn new(filter: ExprList) -> Self {
        Self { filter }
    }
}

impl JoinHooks for LeftJoinBuildRight {
    const NAME: &'static str = "hash_left_join_build_right";

    fn on_merge(
        &mut self,
        _probe_id: RowId,
        merged: Binding,
        cx: &ExecContext,
    ) -> Result<Option<Binding>> {
        if self.filter.is_satisfied(&merged, cx)? {
            Ok(Some(merged))
        } else {
            Ok(None)
        }
    }

    fn on_no_match(&mut self, stream_row: &Binding) -> Option<Binding> {
        Some(stream_row.clone())
    }

    fn on_stream_end(&mut self, _table: &MultiHashProbeTable) -> Vec<Binding> {
        Vec::new()
    }
}

// ── Settings and Stats ─────────────────────────────────────────────────────

/// Knobs for hash join construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashJoinSettings {
    /// Track only join-key variables as "seen" in the probe table.
    pub bound_seen_vars_by_key: bool,
    /// Infer a key from the first row of each side when none is given.
    pub infer_join_key: bool,
}

impl Default for HashJoinSettings {
    fn default() -> Self {
        Self {
            bound_seen_vars_by_key: true,
            infer_join_key: true,
        }
    }
}

/// Counters collected while a hash join runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JoinStats {
    /// Rows materialized into the probe table.
    pub probe_rows: usize,
    /// Rows pulled from the stream side.
    pub stream_rows: usize,
    /// Candidate rows checked by merging.
    pub candidates_checked: usize,
    /// Rows handed to the consumer.
    pub results: usize,
    /// Per-pattern indexes the probe table built.
    pub index_builds: usize,
}

// ── State Machine ──────────────────────────────────────────────────────────

/// Where a running join is after construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// Pulling stream rows and merging them with their candidates.
    Stream,
    /// Stream exhausted; handing out rows the hooks held back.
    Trailer,
    /// Nothing left to emit.
    Done,
}

/// The shared hash-join state machine, parameterized by [`JoinHooks`].
pub struct HashJoinIter<H: JoinHooks> {
    /// Variant-specific match handling.
    hooks: H,
    /// Key the probe table hashes on; empty means every lookup is unkeyed.
    join_key: JoinKey,
    /// Evaluation context shared with filters; carries the cancel signal.
    cx: ExecContext,
    /// Stream input; `None` once it has been exhausted or closed.
    stream: Option<BoxedBindingIter>,
    /// Materialized probe side.
    table: MultiHashProbeTable,
    phase: Phase,
    /// Stream row whose candidates are being merged.
    current: Option<Binding>,
    /// Candidate row ids for `current`, in lookup order.
    candidates: Vec<RowId>,
    /// Next position in `candidates` to merge.
    cursor: usize,
    /// Whether any candidate of `current` produced output.
    current_matched: bool,
    /// Rows returned by [`JoinHooks::on_stream_end`], drained in the trailer.
    trailer: std::vec::IntoIter<Binding>,
    /// Result computed by `has_next` and not yet handed out.
    slot: Option<Binding>,
    stats: JoinStats,
    /// Set by `cancel`; the next step reports [`JoinError::Cancelled`].
    cancelled: bool,
    /// Set once `close` has released the inputs and the table.
    closed: bool,
}

/// Inner hash join; the probe table is built from the left input.
pub type HashInnerJoin = HashJoinIter<InnerJoin>;
/// Left outer hash join; the probe table is built from the preserved left input.
pub type HashLeftJoinBuildLeft = HashJoinIter<LeftJoinBuildLeft>;
/// Left outer hash join; the probe table is built from the right input.
pub type HashLeftJoinBuildRight = HashJoinIter<LeftJoinBuildRight>;

impl<H: JoinHooks> HashJoinIter<H> {
    /// Run INIT and HASH: settle the key, materialize `probe` and close it.
    ///
    /// Both inputs are closed if this fails.
    pub fn build(
        hooks: H,
        join_key: Option<JoinKey>,
        probe: BoxedBindingIter,
        stream: BoxedBindingIter,
        settings: HashJoinSettings,
        cx: &ExecContext,
    ) -> Result<Self> {
        let (join_key, mut probe, mut stream) = match join_key {
            Some(key) => (key, probe, stream),
            None if settings.infer_join_key => infer_join_key(probe, stream)?,
            None => (JoinKey::empty(), probe, stream),
        };
        if join_key.len() > 1 {
            tracing::warn!(join = H::NAME, key = %join_key, "multi-variable join key");
        }

        let max_join_key = settings
            .bound_seen_vars_by_key
            .then(|| join_key.clone());
        let mut table = MultiHashProbeTable::new(max_join_key, join_key.clone());

        let built = {
            let _span = tracing::debug_span!(
                "hash_join_build",
                join = H::NAME,
                key = %join_key,
                exec = cx.label(),
            )
            .entered();
            materialize(probe.as_mut(), &mut table, cx)
        };
        probe.close();
        let probe_rows = match built {
            Ok(rows) => rows,
            Err(err) => {
                stream.close();
                return Err(err);
            }
        };
        tracing::debug!(join = H::NAME, probe_rows, "probe table built");

        Ok(Self {
            hooks,
            join_key,
            cx: cx.clone(),
            stream: Some(stream),
            table,
            phase: Phase::Stream,
            current: None,
            candidates: Vec::new(),
            cursor: 0,
            current_matched: false,
            trailer: Vec::new().into_iter(),
            slot: None,
            stats: JoinStats {
                probe_rows,
                ..JoinStats::default()
            },
            cancelled: false,
            closed: false,
        })
    }

    #[must_use]
    pub fn join_key(&self) -> &JoinKey {
        &self.join_key
    }

    #[must_use]
    pub fn hooks(&self) -> &H {
        &self.hooks
    }

    #[must_use]
    pub fn stats(&self) -> JoinStats {
        let mut stats = self.stats;
        if !self.closed {
            stats.index_builds = self.table.index_builds();
        }
        stats
    }

    fn advance(&mut self) -> Result<Option<Binding>> {
        loop {
            match self.phase {
                Phase::Stream => {
                    if let Some(row) = self.next_from_stream()? {
                        return Ok(Some(row));
                    }
                    let trailer = self.hooks.on_stream_end(&self.table);
                    if let Some(mut stream) = self.stream.take() {
                        stream.close();
                    }
                    self.trailer = trailer.into_iter();
                    self.phase = Phase::Trailer;
                }
                Phase::Trailer => {
                    if let Some(row) = self.trailer.next() {
                        return Ok(Some(row));
                    }
                    self.phase = Phase::Done;
                }
                Phase::Done => return Ok(None),
            }
        }
    }

    fn next_from_stream(&mut self) -> Result<Option<Binding>> {
        loop {
            let Some(current) = &self.current else {
                let Some(stream) = self.stream.as_mut() else {
                    return Ok(None);
                };
                if !stream.has_next()? {
                    return Ok(None);
                }
                let row = stream.next_binding()?;
                self.stats.stream_rows += 1;
                self.candidates.clear();
                self.table.extend_candidates(&row, &mut self.candidates);
                self.cursor = 0;
                self.current_matched = false;
                self.current = Some(row);
                continue;
            };

            while self.cursor < self.candidates.len() {
                let id = self.candidates[self.cursor];
                self.cursor += 1;
                self.stats.candidates_checked += 1;
                let probe_row = self.table.row(id).ok_or_else(|| {
                    JoinError::internal(format!("probe table returned unknown row id {id}"))
                })?;
                let Some(merged) = Binding::merge(probe_row, current) else {
                    continue;
                };
                if let Some(out) = self.hooks.on_merge(id, merged, &self.cx)? {
                    self.current_matched = true;
                    return Ok(Some(out));
                }
            }

            let finished = self.current.take();
            if self.current_matched {
                continue;
            }
            if let Some(substitute) = finished.and_then(|row| self.hooks.on_no_match(&row)) {
                return Ok(Some(substitute));
            }
        }
    }
}

impl<H: JoinHooks> BindingIter for HashJoinIter<H> {
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
        self.stats.index_builds = self.table.index_builds();
        self.table.clear();
        self.candidates = Vec::new();
        self.current = None;
        self.slot = None;
        self.trailer = Vec::new().into_iter();
        self.phase = Phase::Done;
        tracing::debug!(
            join = H::NAME,
            key = %self.join_key,
            probe_rows = self.stats.probe_rows,
            stream_rows = self.stats.stream_rows,
            candidates_checked = self.stats.candidates_checked,
            results = self.stats.results,
            index_builds = self.stats.index_builds,
            "hash join closed"
        );
    }

    fn cancel(&mut self) {
        self.cancelled = true;
        if let Some(stream) = self.stream.as_mut() {
            stream.cancel();
        }
    }
}

// ── Constructors ───────────────────────────────────────────────────────────

impl HashInnerJoin {
    /// Inner join of `left` (materialized) and `right` (streamed).
    pub fn new(
        join_key: Option<JoinKey>,
        left: BoxedBindingIter,
        right: BoxedBindingIter,
        settings: HashJoinSettings,
        cx: &ExecContext,
    ) -> Result<Self> {
        Self::build(InnerJoin, join_key, left, right, settings, cx)
    }

    /// Like [`new`](Self::new), but an empty input closes both sides and
    /// yields an empty iterator without building anything.
    pub fn create(
        join_key: Option<JoinKey>,
        left: BoxedBindingIter,
        right: BoxedBindingIter,
        settings: HashJoinSettings,
        cx: &ExecContext,
    ) -> Result<BoxedBindingIter> {
        match inner_join_inputs(left, right)? {
            JoinInputs::Empty => Ok(EmptyBindingIter::boxed()),
            JoinInputs::LeftOnly(left) => Ok(left),
            JoinInputs::Both(left, right) => Ok(Box::new(Self::new(
                join_key, left, right, settings, cx,
            )?)),
        }
    }
}

impl HashLeftJoinBuildLeft {
    /// Left outer join; `left` is materialized and preserved, `right` streams.
    pub fn new(
        join_key: Option<JoinKey>,
        left: BoxedBindingIter,
        right: BoxedBindingIter,
        filter: ExprList,
        settings: HashJoinSettings,
        cx: &ExecContext,
    ) -> Result<Self> {
        Self::build(
            LeftJoinBuildLeft::new(filter),
            join_key,
            left,
            right,
            settings,
            cx,
        )
    }

    /// Like [`new`](Self::new) with the empty-input short circuits: an empty
    /// left yields nothing, an empty right passes the left through.
    pub fn create(
        join_key: Option<JoinKey>,
        left: BoxedBindingIter,
        right: BoxedBindingIter,
        filter: ExprList,
        settings: HashJoinSettings,
        cx: &ExecContext,
    ) -> Result<BoxedBindingIter> {
        match left_join_inputs(left, right)? {
            JoinInputs::Empty => Ok(EmptyBindingIter::boxed()),
            JoinInputs::LeftOnly(left) => Ok(left),
            JoinInputs::Both(left, right) => Ok(Box::new(Self::new(
                join_key, left, right, filter, settings, cx,
            )?)),
        }
    }
}

impl HashLeftJoinBuildRight {
    /// Left outer join; `right` is materialized, `left` streams and is preserved.
    pub fn new(
        join_key: Option<JoinKey>,
        left: BoxedBindingIter,
        right: BoxedBindingIter,
        filter: ExprList,
        settings: HashJoinSettings,
        cx: &ExecContext,
    ) -> Result<Self> {
        Self::build(
            LeftJoinBuildRight::new(filter),
            join_key,
            right,
            left,
            settings,
            cx,
        )
    }

    /// Like [`new`](Self::new) with the same short circuits as
    /// [`HashLeftJoinBuildLeft::create`].
    pub fn create(
        join_key: Option<JoinKey>,
        left: BoxedBindingIter,
        right: BoxedBindingIter,
        filter: ExprList,
        settings: HashJoinSettings,
        cx: &ExecContext,
    ) -> Result<BoxedBindingIter> {
        match left_join_inputs(left, right)? {
            JoinInputs::Empty => Ok(EmptyBindingIter::boxed()),
            JoinInputs::LeftOnly(left) => Ok(left),
            JoinInputs::Both(left, right) => Ok(Box::new(Self::new(
                join_key, left, right, filter, settings, cx,
            )?)),
        }
    }
}

// ── Empty-Input Short Circuits ─────────────────────────────────────────────

/// Outcome of the empty-input checks done before building a join.
pub enum JoinInputs {
    /// The join produces nothing; both inputs are closed.
    Empty,
    /// The join is the left input unchanged; the right input is closed.
    LeftOnly(BoxedBindingIter),
    /// Both inputs have rows; `(left, right)`, still open.
    Both(BoxedBindingIter, BoxedBindingIter),
}

/// Empty-input check for inner joins: either side empty means no output.
pub fn inner_join_inputs(
    mut left: BoxedBindingIter,
    mut right: BoxedBindingIter,
) -> Result<JoinInputs> {
    let both = left
        .has_next()
        .and_then(|has_left| Ok(has_left && right.has_next()?));
    match both {
        Ok(true) => Ok(JoinInputs::Both(left, right)),
        Ok(false) => {
            left.close();
            right.close();
            Ok(JoinInputs::Empty)
        }
        Err(err) => {
            left.close();
            right.close();
            Err(err)
        }
    }
}

/// Empty-input check for left joins: an empty left means no output, an
/// empty right means the left passes through untouched.
pub fn left_join_inputs(
    mut left: BoxedBindingIter,
    mut right: BoxedBindingIter,
) -> Result<JoinInputs> {
    let sides = left
        .has_next()
        .and_then(|has_left| Ok((has_left, has_left && right.has_next()?)));
    match sides {
        Ok((false, _)) => {
            left.close();
            right.close();
            Ok(JoinInputs::Empty)
        }
        Ok((true, false)) => {
            right.close();
            Ok(JoinInputs::LeftOnly(left))
        }
        Ok((true, true)) => Ok(JoinInputs::Both(left, right)),
        Err(err) => {
            left.close();
            right.close();
            Err(err)
        }
    }
}

// ── Key Inference and Build ────────────────────────────────────────────────

/// Peek at the first row of each side and key on the variables they share.
///
/// Only the first rows are consulted; if later rows share more, the key
/// misses them and lookups fall back to the no-key path.
fn infer_join_key(
    probe: BoxedBindingIter,
    stream: BoxedBindingIter,
) -> Result<(JoinKey, BoxedBindingIter, BoxedBindingIter)> {
    let mut probe = PeekIter::new(probe);
    let mut stream = PeekIter::new(stream);
    match peek_shared_vars(&mut probe, &mut stream) {
        Ok(key) => {
            tracing::debug!(key = %key, "inferred join key from first rows");
            let probe: BoxedBindingIter = Box::new(probe);
            let stream: BoxedBindingIter = Box::new(stream);
            Ok((key, probe, stream))
        }
        Err(err) => {
            probe.close();
            stream.close();
            Err(err)
        }
    }
}

fn peek_shared_vars(
    probe: &mut PeekIter<BoxedBindingIter>,
    stream: &mut PeekIter<BoxedBindingIter>,
) -> Result<JoinKey> {
    let probe_vars: Vec<Var> = probe
        .peek()?
        .map(|row| row.vars().cloned().collect())
        .unwrap_or_default();
    Ok(match stream.peek()? {
        Some(row) => JoinKey::create(&probe_vars, row.vars()),
        None => JoinKey::empty(),
    })
}

fn materialize(
    probe: &mut dyn BindingIter,
    table: &mut MultiHashProbeTable,
    cx: &ExecContext,
) -> Result<usize> {
    let mut rows = 0;
    while probe.has_next()? {
        if cx.is_cancelled() {
            return Err(JoinError::Cancelled);
        }
        table.put(probe.next_binding()?)?;
        rows += 1;
    }
    Ok(rows)
}
