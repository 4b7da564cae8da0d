//! Collaborator types consumed by the join core.
//!
//! - [`Var`] and [`Term`]: variable names and the opaque values bound to them.
//! - [`Binding`]: an immutable solution row with merge/compatibility rules.
//! - [`BindingIter`]: the pull protocol every operator speaks.
//! - [`ExprList`]: conjunctive filter predicates for left joins.
//! - [`ExecContext`]: per-execution state shared by the operators of one query.

pub mod binding;
pub mod context;
pub mod expr;
pub mod iter;
pub mod term;
pub mod var;

pub use binding::{Binding, BindingBuilder};
pub use context::{CancelSignal, ExecContext};
pub use expr::{ExprList, FnPredicate, Predicate};
pub use iter::{BindingIter, BoxedBindingIter, EmptyBindingIter, VecBindingIter, collect_bindings};
pub use term::Term;
pub use var::Var;

/// Build a [`Binding`] from `var => value` pairs.
///
/// ```
/// use bindjoin_types::binding;
///
/// let row = binding! { "x" => 1, "y" => "a" };
/// assert_eq!(row.len(), 2);
/// ```
#[macro_export]
macro_rules! binding {
    () => {
        $crate::Binding::empty()
    };
    ($($var:expr => $value:expr),+ $(,)?) => {
        $crate::Binding::builder()
            $(.bind($crate::Var::new($var), $crate::Term::from($value)))+
            .build()
    };
}
