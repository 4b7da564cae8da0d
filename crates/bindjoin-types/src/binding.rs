//! Solution rows.
//!
//! A [`Binding`] maps variables to terms. Entries are kept sorted by variable
//! so lookups are a binary search and two bindings merge in one linear pass.
//! Equality is mapping equality: two bindings are equal when they bind the
//! same variables to the same terms.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use smallvec::SmallVec;

use crate::term::Term;
use crate::var::Var;

/// An immutable mapping from variables to terms. Cheap to clone.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Binding {
    entries: Arc<[(Var, Term)]>,
}

impl Binding {
    /// The binding with no variables.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            entries: Arc::from(Vec::new()),
        }
    }

    #[must_use]
    pub fn builder() -> BindingBuilder {
        BindingBuilder::default()
    }

    /// Value bound to `var`, if any.
    #[must_use]
    pub fn get(&self, var: &Var) -> Option<&Term> {
        self.entries
            .binary_search_by(|(v, _)| v.cmp(var))
            .ok()
            .map(|idx| &self.entries[idx].1)
    }

    #[must_use]
    pub fn contains(&self, var: &Var) -> bool {
        self.entries.binary_search_by(|(v, _)| v.cmp(var)).is_ok()
    }

    /// Bound variables in ascending name order.
    pub fn vars(&self) -> impl ExactSizeIterator<Item = &Var> + '_ {
        self.entries.iter().map(|(var, _)| var)
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = (&Var, &Term)> + '_ {
        self.entries.iter().map(|(var, term)| (var, term))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether every variable bound in both rows has the same value.
    #[must_use]
    pub fn compatible(left: &Self, right: &Self) -> bool {
        let (mut i, mut j) = (0, 0);
        let (a, b) = (&left.entries, &right.entries);
        while i < a.len() && j < b.len() {
            match a[i].0.cmp(&b[j].0) {
                Ordering::Less => i += 1,
                Ordering::Greater => j += 1,
                Ordering::Equal => {
                    if a[i].1 != b[j].1 {
                        return false;
                    }
                    i += 1;
                    j += 1;
                }
            }
        }
        true
    }

    /// Union of two compatible rows, or `None` when some shared variable
    /// carries different values.
    #[must_use]
    pub fn merge(left: &Self, right: &Self) -> Option<Self> {
        if right.is_empty() {
            return Some(left.clone());
        }
        if left.is_empty() {
            return Some(right.clone());
        }

        let (a, b) = (&left.entries, &right.entries);
        let mut merged = Vec::with_capacity(a.len() + b.len());
        let (mut i, mut j) = (0, 0);
        while i < a.len() && j < b.len() {
            match a[i].0.cmp(&b[j].0) {
                Ordering::Less => {
                    merged.push(a[i].clone());
                    i += 1;
                }
                Ordering::Greater => {
                    merged.push(b[j].clone());
                    j += 1;
                }
                Ordering::Equal => {
                    if a[i].1 != b[j].1 {
                        return None;
                    }
                    merged.push(a[i].clone());
                    i += 1;
                    j += 1;
                }
            }
        }
        merged.extend_from_slice(&a[i..]);
        merged.extend_from_slice(&b[j..]);
        Some(Self {
            entries: Arc::from(merged),
        })
    }
}

impl fmt::Display for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (idx, (var, term)) in self.entries.iter().enumerate() {
            if idx > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{var}: {term}")?;
        }
        f.write_str("}")
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// Accumulates `(var, term)` pairs; a later value for the same variable
/// replaces an earlier one.
#[derive(Debug, Default, Clone)]
pub struct BindingBuilder {
    entries: SmallVec<[(Var, Term); 8]>,
}

impl BindingBuilder {
    #[must_use]
    pub fn bind(mut self, var: Var, term: Term) -> Self {
        self.add(var, term);
        self
    }

    pub fn add(&mut self, var: Var, term: Term) -> &mut Self {
        if let Some(slot) = self.entries.iter_mut().find(|(v, _)| *v == var) {
            slot.1 = term;
        } else {
            self.entries.push((var, term));
        }
        self
    }

    /// Copy every entry of `parent` into the builder.
    pub fn add_all(&mut self, parent: &Binding) -> &mut Self {
        for (var, term) in parent.iter() {
            self.add(var.clone(), term.clone());
        }
        self
    }

    #[must_use]
    pub fn build(mut self) -> Binding {
        self.entries.sort_by(|(a, _), (b, _)| a.cmp(b));
        Binding {
            entries: Arc::from(self.entries.into_vec()),
        }
    }
}
