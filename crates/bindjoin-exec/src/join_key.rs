//! Join keys.
//!
//! A [`JoinKey`] is the ordered, duplicate-free list of variables a hash
//! table hashes on. It is immutable once built and cheap to clone. Order is
//! insertion order and equality is positional.

use std::fmt;
use std::sync::{Arc, LazyLock, OnceLock};

use bindjoin_types::Var;
use hashbrown::{HashMap, HashSet};
use smallvec::SmallVec;

/// Keys longer than this get a lazily built position index; shorter keys
/// are scanned linearly.
const POSITION_INDEX_THRESHOLD: usize = 5;

static EMPTY_KEY: LazyLock<JoinKey> = LazyLock::new(|| JoinKey::from_unique(SmallVec::new()));

/// Ordered, duplicate-free list of join variables.
#[derive(Clone)]
pub struct JoinKey(Arc<JoinKeyInner>);

struct JoinKeyInner {
    vars: SmallVec<[Var; 4]>,
    positions: OnceLock<HashMap<Var, usize>>,
}

impl JoinKey {
    /// The shared key with no variables.
    #[must_use]
    pub fn empty() -> Self {
        EMPTY_KEY.clone()
    }

    #[must_use]
    pub fn single(var: Var) -> Self {
        Self::from_unique(smallvec::smallvec![var])
    }

    /// Key over `vars`, dropping repeats and keeping first-occurrence order.
    pub fn from_vars<I>(vars: I) -> Self
    where
        I: IntoIterator<Item = Var>,
    {
        let mut builder = JoinKeyBuilder::new();
        for var in vars {
            builder.add(var);
        }
        builder.build()
    }

    /// Variables of `vars_a` that also occur in `vars_b`, in `vars_a` order.
    pub fn create<'a, A, B>(vars_a: A, vars_b: B) -> Self
    where
        A: IntoIterator<Item = &'a Var>,
        B: IntoIterator<Item = &'a Var>,
    {
        let other: HashSet<&Var> = vars_b.into_iter().collect();
        Self::from_vars(
            vars_a
                .into_iter()
                .filter(|var| other.contains(var))
                .cloned(),
        )
    }

    fn from_unique(vars: SmallVec<[Var; 4]>) -> Self {
        Self(Arc::new(JoinKeyInner {
            vars,
            positions: OnceLock::new(),
        }))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.vars.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.vars.is_empty()
    }

    #[must_use]
    pub fn vars(&self) -> &[Var] {
        &self.0.vars
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Var> {
        self.0.vars.iter()
    }

    #[must_use]
    pub fn get(&self, idx: usize) -> Option<&Var> {
        self.0.vars.get(idx)
    }

    #[must_use]
    pub fn contains(&self, var: &Var) -> bool {
        self.position(var).is_some()
    }

    /// Index of `var` within the key.
    #[must_use]
    pub fn position(&self, var: &Var) -> Option<usize> {
        let vars = &self.0.vars;
        if vars.len() <= POSITION_INDEX_THRESHOLD {
            return vars.iter().position(|v| v == var);
        }
        self.0
            .positions
            .get_or_init(|| {
                vars.iter()
                    .enumerate()
                    .map(|(idx, v)| (v.clone(), idx))
                    .collect()
            })
            .get(var)
            .copied()
    }
}

impl PartialEq for JoinKey {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || self.0.vars == other.0.vars
    }
}

impl Eq for JoinKey {}

impl std::hash::Hash for JoinKey {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.vars.hash(state);
    }
}

impl fmt::Display for JoinKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (idx, var) in self.iter().enumerate() {
            if idx > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{var}")?;
        }
        f.write_str("]")
    }
}

impl fmt::Debug for JoinKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "JoinKey{self}")
    }
}

impl<'a> IntoIterator for &'a JoinKey {
    type Item = &'a Var;
    type IntoIter = std::slice::Iter<'a, Var>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Incrementally assembles a [`JoinKey`]; adding a variable twice is a no-op.
///
/// [`build`](Self::build) takes a snapshot, so the builder stays usable.
#[derive(Debug, Default, Clone)]
pub struct JoinKeyBuilder {
    vars: SmallVec<[Var; 4]>,
    members: HashSet<Var>,
}

impl JoinKeyBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if `var` was not present yet.
    pub fn add(&mut self, var: Var) -> bool {
        if self.members.contains(&var) {
            return false;
        }
        self.members.insert(var.clone());
        self.vars.push(var);
        true
    }

    pub fn add_all<'a, I>(&mut self, vars: I) -> &mut Self
    where
        I: IntoIterator<Item = &'a Var>,
    {
        for var in vars {
            self.add(var.clone());
        }
        self
    }

    pub fn remove(&mut self, var: &Var) -> bool {
        if !self.members.remove(var) {
            return false;
        }
        self.vars.retain(|v| v != var);
        true
    }

    pub fn clear(&mut self) {
        self.vars.clear();
        self.members.clear();
    }

    #[must_use]
    pub fn contains(&self, var: &Var) -> bool {
        self.members.contains(var)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.vars.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    #[must_use]
    pub fn build(&self) -> JoinKey {
        if self.vars.is_empty() {
            return JoinKey::empty();
        }
        JoinKey::from_unique(self.vars.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(names: &[&str]) -> Vec<Var> {
        names.iter().map(|n| Var::new(*n)).collect()
    }

    #[test]
    fn create_keeps_first_side_order() {
        let a = vars(&["z", "x", "y", "w"]);
        let b = vars(&["y", "x", "q", "z"]);
        let key = JoinKey::create(&a, &b);
        assert_eq!(key.vars(), vars(&["z", "x", "y"]).as_slice());
    }

    #[test]
    fn create_with_nothing_shared_is_empty() {
        let key = JoinKey::create(&vars(&["a"]), &vars(&["b"]));
        assert!(key.is_empty());
        assert_eq!(key, JoinKey::empty());
    }

    #[test]
    fn builder_deduplicates_and_snapshots() {
        let mut builder = JoinKeyBuilder::new();
        assert!(builder.add(Var::new("x")));
        assert!(!builder.add(Var::new("x")));
        builder.add_all(&vars(&["y", "x", "z"]));
        let first = builder.build();
        assert_eq!(first.vars(), vars(&["x", "y", "z"]).as_slice());

        builder.remove(&Var::new("y"));
        let second = builder.build();
        assert_eq!(second.vars(), vars(&["x", "z"]).as_slice());
        assert_eq!(first.len(), 3, "earlier snapshot is unaffected");

        builder.clear();
        assert!(builder.build().is_empty());
    }

    #[test]
    fn equality_is_positional() {
        let xy = JoinKey::from_vars(vars(&["x", "y"]));
        let yx = JoinKey::from_vars(vars(&["y", "x"]));
        assert_ne!(xy, yx);
        assert_eq!(xy, JoinKey::from_vars(vars(&["x", "y", "x"])));
    }

    #[test]
    fn position_lookup_small_and_large() {
        let small = JoinKey::from_vars(vars(&["a", "b", "c"]));
        assert_eq!(small.position(&Var::new("c")), Some(2));
        assert!(!small.contains(&Var::new("d")));

        let names: Vec<String> = (0..40).map(|i| format!("v{i}")).collect();
        let large = JoinKey::from_vars(names.iter().map(Var::new));
        assert_eq!(large.position(&Var::new("v17")), Some(17));
        assert_eq!(large.position(&Var::new("v39")), Some(39));
        assert!(!large.contains(&Var::new("v40")));
    }

    #[test]
    fn display_lists_vars() {
        let key = JoinKey::from_vars(vars(&["x", "y"]));
        assert_eq!(key.to_string(), "[?x ?y]");
        assert_eq!(JoinKey::single(Var::new("s")).to_string(), "[?s]");
    }
}
