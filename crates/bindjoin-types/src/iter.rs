//! The pull protocol shared by every operator.
//!
//! Joins consume two [`BindingIter`]s and are themselves a [`BindingIter`],
//! so they compose: the output of one join can feed either side of another.

use bindjoin_error::{JoinError, Result};

use crate::binding::Binding;

/// A closeable, cancellable stream of bindings.
pub trait BindingIter {
    /// Whether another binding is available. May pull from upstream.
    fn has_next(&mut self) -> Result<bool>;

    /// Next binding.
    ///
    /// # Errors
    ///
    /// [`JoinError::Exhausted`] when nothing is left, or whatever error
    /// producing the binding raised.
    fn next_binding(&mut self) -> Result<Binding>;

    /// Release resources. Calling this more than once is a no-op.
    fn close(&mut self);

    /// Request cancellation. The next step returns [`JoinError::Cancelled`].
    fn cancel(&mut self);
}

/// Type-erased iterator used at every composition seam.
pub type BoxedBindingIter = Box<dyn BindingIter>;

impl<I: BindingIter + ?Sized> BindingIter for Box<I> {
    fn has_next(&mut self) -> Result<bool> {
        (**self).has_next()
    }

    fn next_binding(&mut self) -> Result<Binding> {
        (**self).next_binding()
    }

    fn close(&mut self) {
        (**self).close();
    }

    fn cancel(&mut self) {
        (**self).cancel();
    }
}

/// Drain `iter` into a vector and close it, also on error.
pub fn collect_bindings<I: BindingIter + ?Sized>(iter: &mut I) -> Result<Vec<Binding>> {
    let mut rows = Vec::new();
    let outcome = loop {
        match iter.has_next() {
            Ok(true) => match iter.next_binding() {
                Ok(row) => rows.push(row),
                Err(err) => break Err(err),
            },
            Ok(false) => break Ok(()),
            Err(err) => break Err(err),
        }
    };
    iter.close();
    outcome.map(|()| rows)
}

/// In-memory source over a vector of bindings.
#[derive(Debug)]
pub struct VecBindingIter {
    rows: std::vec::IntoIter<Binding>,
    closed: bool,
    cancelled: bool,
}

impl VecBindingIter {
    #[must_use]
    pub fn new(rows: Vec<Binding>) -> Self {
        Self {
            rows: rows.into_iter(),
            closed: false,
            cancelled: false,
        }
    }

    #[must_use]
    pub fn boxed(rows: Vec<Binding>) -> BoxedBindingIter {
        Box::new(Self::new(rows))
    }
}

impl BindingIter for VecBindingIter {
    fn has_next(&mut self) -> Result<bool> {
        if self.cancelled {
            return Err(JoinError::Cancelled);
        }
        Ok(!self.closed && !self.rows.as_slice().is_empty())
    }

    fn next_binding(&mut self) -> Result<Binding> {
        if !self.has_next()? {
            return Err(JoinError::Exhausted);
        }
        self.rows.next().ok_or(JoinError::Exhausted)
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.rows = Vec::new().into_iter();
        }
    }

    fn cancel(&mut self) {
        self.cancelled = true;
    }
}

/// A source with no rows.
#[derive(Debug, Default)]
pub struct EmptyBindingIter {
    cancelled: bool,
}

impl EmptyBindingIter {
    #[must_use]
    pub fn boxed() -> BoxedBindingIter {
        Box::new(Self::default())
    }
}

impl BindingIter for EmptyBindingIter {
    fn has_next(&mut self) -> Result<bool> {
        if self.cancelled {
            return Err(JoinError::Cancelled);
        }
        Ok(false)
    }

    fn next_binding(&mut self) -> Result<Binding> {
        self.has_next()?;
        Err(JoinError::Exhausted)
    }

    fn close(&mut self) {}

    fn cancel(&mut self) {
        self.cancelled = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding;

    #[test]
    fn vec_iter_yields_in_order_then_exhausts() {
        let mut iter = VecBindingIter::new(vec![binding! { "x" => 1 }, binding! { "x" => 2 }]);
        assert!(iter.has_next().unwrap());
        assert_eq!(iter.next_binding().unwrap(), binding! { "x" => 1 });
        assert_eq!(iter.next_binding().unwrap(), binding! { "x" => 2 });
        assert!(!iter.has_next().unwrap());
        assert_eq!(iter.next_binding(), Err(JoinError::Exhausted));
    }

    #[test]
    fn close_is_idempotent_and_ends_the_stream() {
        let mut iter = VecBindingIter::new(vec![binding! { "x" => 1 }]);
        iter.close();
        iter.close();
        assert!(!iter.has_next().unwrap());
    }

    #[test]
    fn cancel_surfaces_on_next_step() {
        let mut iter = VecBindingIter::new(vec![binding! { "x" => 1 }]);
        iter.cancel();
        assert_eq!(iter.has_next(), Err(JoinError::Cancelled));
    }

    #[test]
    fn collect_closes_source() {
        let mut iter = VecBindingIter::new(vec![binding! { "x" => 1 }]);
        let rows = collect_bindings(&mut iter).unwrap();
        assert_eq!(rows.len(), 1);
        assert!(!iter.has_next().unwrap());

        let mut empty = EmptyBindingIter::default();
        assert!(collect_bindings(&mut empty).unwrap().is_empty());
    }
}
