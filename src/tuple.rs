use std::fmt;

use crate::bits::{bit_is_set, set_bit, Bits};
use crate::chvec::ChoiceVector;
use crate::consts::*;
use crate::error::MalhError;
use crate::hash::hash_bytes;

/// A tuple in its textual form, attribute values joined by `,`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tuple(String);

impl Tuple {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.0.split(ATTR_SEPARATOR)
    }

    pub fn attr_count(&self) -> usize {
        self.values().count()
    }

    /// Length in a page, including the terminator
    pub fn stored_len(&self) -> usize {
        self.0.len() + 1
    }

    /// Rejects tuples that cannot be stored in a relation with `attr_count` attributes
    pub fn validate(&self, attr_count: u32) -> Result<(), MalhError> {
        if self.0.contains('\0') {
            return Err(MalhError::Config("tuple contains a NUL byte".into()));
        }
        let found = self.attr_count();
        if found != attr_count as usize {
            return Err(MalhError::Config(format!(
                "tuple {:?} has {} attributes, relation has {}",
                self.0, found, attr_count
            )));
        }
        Ok(())
    }

    /// Composite hash: bit `i` is bit `bit` of the hash of attribute `attr`,
    /// where `(attr, bit)` is entry `i` of the choice vector
    pub fn composite_hash(&self, chvec: &ChoiceVector) -> Bits {
        let hashes: Vec<Bits> = self.values().map(|v| hash_bytes(v.as_bytes())).collect();
        let mut hash = 0;
        for i in 0..MAX_CHVEC {
            let (attr, bit) = chvec.resolve(i);
            if hashes.get(attr).is_some_and(|h| bit_is_set(*h, bit)) {
                hash = set_bit(hash, i);
            }
        }
        hash
    }

    /// Literal attributes must be equal, wildcards match anything
    pub fn matches(&self, pattern: &Pattern) -> bool {
        let values: Vec<&str> = self.values().collect();
        if values.len() != pattern.attrs.len() {
            return false;
        }
        values
            .iter()
            .zip(&pattern.attrs)
            .all(|(value, attr)| match attr {
                PatternAttr::Wildcard => true,
                PatternAttr::Literal(literal) => literal == value,
            })
    }
}

impl fmt::Display for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Tuple {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternAttr {
    Literal(String),
    Wildcard,
}

/// A partial-match query such as `a,?,x`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    text: String,
    attrs: Vec<PatternAttr>,
}

impl Pattern {
    pub fn parse(text: &str) -> Self {
        let attrs = text
            .split(ATTR_SEPARATOR)
            .map(|v| {
                if v == WILDCARD {
                    PatternAttr::Wildcard
                } else {
                    PatternAttr::Literal(v.to_string())
                }
            })
            .collect();
        Self {
            text: text.to_string(),
            attrs,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn attrs(&self) -> &[PatternAttr] {
        &self.attrs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_counts_attributes() {
        let t = Tuple::from("a,1,x");
        assert!(t.validate(3).is_ok());
        assert!(matches!(t.validate(2), Err(MalhError::Config(_))));
        assert!(Tuple::from("a\0,1,x").validate(3).is_err());
    }

    #[test]
    fn pattern_matching() {
        let t = Tuple::from("a,1,x");
        assert!(t.matches(&Pattern::parse("a,?,?")));
        assert!(t.matches(&Pattern::parse("?,?,?")));
        assert!(t.matches(&Pattern::parse("a,1,x")));
        assert!(!t.matches(&Pattern::parse("a,2,?")));
        assert!(!t.matches(&Pattern::parse("a,?")));
        assert!(!t.matches(&Pattern::parse("ab,?,?")));
    }

    #[test]
    fn pattern_parse() {
        let p = Pattern::parse("a,?,?");
        assert_eq!(p.attrs()[1], PatternAttr::Wildcard);
        assert_eq!(p.attrs()[0], PatternAttr::Literal("a".into()));
        assert_eq!(p.as_str(), "a,?,?");
    }

    #[test]
    fn composite_hash_follows_choice_vector() {
        let cv = ChoiceVector::round_robin(2);
        let t = Tuple::from("hello,world");
        let h0 = hash_bytes(b"hello");
        let h1 = hash_bytes(b"world");
        let hash = t.composite_hash(&cv);
        for i in 0..MAX_CHVEC {
            let (attr, bit) = cv.resolve(i);
            let source = if attr == 0 { h0 } else { h1 };
            assert_eq!(bit_is_set(hash, i), bit_is_set(source, bit));
        }
    }
}
