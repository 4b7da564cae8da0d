//! Filter predicates.
//!
//! Expression evaluation lives outside the join core; joins only ask whether
//! a merged row satisfies an [`ExprList`]. Evaluation failures propagate as
//! [`JoinError::Eval`](bindjoin_error::JoinError::Eval) and are never swallowed.

use std::fmt;
use std::sync::Arc;

use bindjoin_error::Result;

use crate::binding::Binding;
use crate::context::ExecContext;

/// A boolean test over a binding that may fail to evaluate.
pub trait Predicate: fmt::Debug {
    fn evaluate(&self, binding: &Binding, cx: &ExecContext) -> Result<bool>;
}

/// Conjunction of predicates; the empty list is always satisfied.
#[derive(Debug, Clone, Default)]
pub struct ExprList {
    exprs: Vec<Arc<dyn Predicate>>,
}

impl ExprList {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, expr: impl Predicate + 'static) -> Self {
        self.exprs.push(Arc::new(expr));
        self
    }

    pub fn push(&mut self, expr: Arc<dyn Predicate>) {
        self.exprs.push(expr);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.exprs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.exprs.is_empty()
    }

    /// Evaluate left to right, stopping at the first `false` or error.
    pub fn is_satisfied(&self, binding: &Binding, cx: &ExecContext) -> Result<bool> {
        for expr in &self.exprs {
            if !expr.evaluate(binding, cx)? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

/// Closure-backed [`Predicate`].
pub struct FnPredicate<F> {
    label: String,
    func: F,
}

impl<F> FnPredicate<F>
where
    F: Fn(&Binding) -> Result<bool>,
{
    pub fn new(label: impl Into<String>, func: F) -> Self {
        Self {
            label: label.into(),
            func,
        }
    }
}

impl<F> fmt::Debug for FnPredicate<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnPredicate")
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

impl<F> Predicate for FnPredicate<F>
where
    F: Fn(&Binding) -> Result<bool>,
{
    fn evaluate(&self, binding: &Binding, _cx: &ExecContext) -> Result<bool> {
        (self.func)(binding)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use bindjoin_error::JoinError;

    use super::*;
    use crate::{Term, Var, binding};

    fn x_greater_than(limit: i64) -> FnPredicate<impl Fn(&Binding) -> Result<bool>> {
        FnPredicate::new(format!("?x > {limit}"), move |row: &Binding| {
            match row.get(&Var::new("x")) {
                Some(Term::Integer(x)) => Ok(*x > limit),
                Some(other) => Err(JoinError::eval(format!("not a number: {other}"))),
                None => Ok(false),
            }
        })
    }

    #[test]
    fn empty_list_is_satisfied() {
        let cx = ExecContext::default();
        assert!(ExprList::new().is_satisfied(&binding! {}, &cx).unwrap());
    }

    #[test]
    fn conjunction_of_predicates() {
        let cx = ExecContext::default();
        let exprs = ExprList::new().with(x_greater_than(1)).with(x_greater_than(5));
        assert_eq!(exprs.len(), 2);
        assert!(exprs.is_satisfied(&binding! { "x" => 7 }, &cx).unwrap());
        assert!(!exprs.is_satisfied(&binding! { "x" => 3 }, &cx).unwrap());
    }

    #[test]
    fn evaluation_errors_propagate() {
        let cx = ExecContext::default();
        let exprs = ExprList::new().with(x_greater_than(1));
        let err = exprs
            .is_satisfied(&binding! { "x" => "text" }, &cx)
            .unwrap_err();
        assert!(matches!(err, JoinError::Eval { .. }));
    }

    #[test]
    fn evaluation_stops_at_first_false() {
        let cx = ExecContext::default();
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        let exprs = ExprList::new()
            .with(x_greater_than(10))
            .with(FnPredicate::new("count", move |_row: &Binding| {
                counter.set(counter.get() + 1);
                Ok(true)
            }));
        assert!(!exprs.is_satisfied(&binding! { "x" => 1 }, &cx).unwrap());
        assert_eq!(calls.get(), 0);
    }
}
