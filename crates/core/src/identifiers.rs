//! Feature identifiers used to pair points across the two input sets.
//!
//! Identifiers compare by value on their canonical text form, so an integer
//! id field in one layer joins with a text id field in the other as long as
//! the rendered values agree (`7` joins `"7"`, but not `"07"`).

use std::borrow::Cow;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

#[derive(Clone, Debug)]
pub enum FeatureId {
    Integer(i64),
    Text(Arc<str>),
}

impl FeatureId {
    pub fn text(s: impl AsRef<str>) -> Self {
        Self::Text(s.as_ref().into())
    }

    /// Canonical text form used for joining and hashing.
    pub fn key(&self) -> Cow<'_, str> {
        match self {
            Self::Integer(v) => Cow::Owned(v.to_string()),
            Self::Text(s) => Cow::Borrowed(s),
        }
    }
}

impl PartialEq for FeatureId {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Integer(a), Self::Integer(b)) => a == b,
            (Self::Text(a), Self::Text(b)) => Arc::ptr_eq(a, b) || a == b,
            _ => self.key() == other.key(),
        }
    }
}

impl Eq for FeatureId {}

impl Hash for FeatureId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl fmt::Display for FeatureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

impl From<i64> for FeatureId {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<String> for FeatureId {
    fn from(s: String) -> Self {
        Self::text(s)
    }
}

impl From<&str> for FeatureId {
    fn from(s: &str) -> Self {
        Self::text(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier_equality() {
        let id1 = FeatureId::text("p1");
        let id2 = FeatureId::text("p1");
        let id3 = id1.clone();

        assert_eq!(id1, id2);
        assert_eq!(id1, id3);
        assert_ne!(id1, FeatureId::text("p2"));
    }

    #[test]
    fn test_identifier_joins_across_types() {
        assert_eq!(FeatureId::Integer(7), FeatureId::text("7"));
        assert_ne!(FeatureId::Integer(7), FeatureId::text("07"));
        assert_ne!(FeatureId::Integer(7), FeatureId::Integer(8));
    }

    #[test]
    fn test_identifier_hash() {
        use std::collections::HashMap;

        let mut map = HashMap::new();
        map.insert(FeatureId::Integer(42), "answer");

        assert_eq!(map.get(&FeatureId::text("42")), Some(&"answer"));
        assert_eq!(map.get(&FeatureId::Integer(42)), Some(&"answer"));
    }

    #[test]
    fn test_identifier_display() {
        assert_eq!(format!("{}", FeatureId::Integer(-3)), "-3");
        assert_eq!(format!("{}", FeatureId::text("reach_1")), "reach_1");
    }
}
