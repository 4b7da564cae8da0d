//! Single-slot lookahead over a [`BindingIter`].

use bindjoin_error::{JoinError, Result};
use bindjoin_types::{Binding, BindingIter};

/// Wraps an iterator so its next binding can be inspected without being
/// consumed; the peeked binding is replayed as the next element.
#[derive(Debug)]
pub struct PeekIter<I> {
    inner: I,
    slot: Option<Binding>,
}

impl<I: BindingIter> PeekIter<I> {
    pub fn new(inner: I) -> Self {
        Self { inner, slot: None }
    }

    /// The upcoming binding, or `None` when the input is exhausted.
    pub fn peek(&mut self) -> Result<Option<&Binding>> {
        if self.slot.is_none() && self.inner.has_next()? {
            self.slot = Some(self.inner.next_binding()?);
        }
        Ok(self.slot.as_ref())
    }

    pub fn into_inner(self) -> (I, Option<Binding>) {
        (self.inner, self.slot)
    }
}

impl<I: BindingIter> BindingIter for PeekIter<I> {
    fn has_next(&mut self) -> Result<bool> {
        if self.slot.is_some() {
            return Ok(true);
        }
        self.inner.has_next()
    }

    fn next_binding(&mut self) -> Result<Binding> {
        if let Some(row) = self.slot.take() {
            return Ok(row);
        }
        if !self.inner.has_next()? {
            return Err(JoinError::Exhausted);
        }
        self.inner.next_binding()
    }

    fn close(&mut self) {
        self.slot = None;
        self.inner.close();
    }

    fn cancel(&mut self) {
        self.inner.cancel();
    }
}
