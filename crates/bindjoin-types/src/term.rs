use std::fmt;
use std::sync::Arc;

/// An opaque value bound to a variable.
///
/// The join core only hashes terms and compares them for equality; the
/// variants exist so callers can build realistic rows.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Term {
    /// An IRI reference.
    Iri(Arc<str>),
    /// A blank node label.
    Blank(Arc<str>),
    /// A plain string literal.
    Str(Arc<str>),
    /// An integer literal.
    Integer(i64),
    /// A boolean literal.
    Boolean(bool),
}

impl Term {
    pub fn iri(iri: impl AsRef<str>) -> Self {
        Self::Iri(Arc::from(iri.as_ref()))
    }

    pub fn blank(label: impl AsRef<str>) -> Self {
        Self::Blank(Arc::from(label.as_ref()))
    }

    pub fn string(lexical: impl AsRef<str>) -> Self {
        Self::Str(Arc::from(lexical.as_ref()))
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Iri(iri) => write!(f, "<{iri}>"),
            Self::Blank(label) => write!(f, "_:{label}"),
            Self::Str(s) => write!(f, "{s:?}"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Boolean(b) => write!(f, "{b}"),
        }
    }
}

impl From<i64> for Term {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<bool> for Term {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<&str> for Term {
    fn from(value: &str) -> Self {
        Self::string(value)
    }
}

impl From<String> for Term {
    fn from(value: String) -> Self {
        Self::Str(Arc::from(value))
    }
}
