//! Addressing of nodes in a MIME tree by a dotted, 1-based path, the
//! same scheme the IMAP FETCH section specifier uses (RFC 3501
//! §6.4.5). `1.2` names the second child of the first child of the
//! root.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentIndex {
    index: Vec<u32>,
}

impl ContentIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// An index with no components addresses nothing.
    pub fn is_valid(&self) -> bool {
        !self.index.is_empty()
    }

    /// Prepend a component at the head of the path.
    pub fn push(&mut self, index: u32) {
        self.index.insert(0, index);
    }

    /// Remove and return the head component.
    pub fn pop(&mut self) -> Option<u32> {
        if self.index.is_empty() {
            None
        } else {
            Some(self.index.remove(0))
        }
    }

    /// Remove and return the tail component, moving the path one level
    /// up the tree.
    pub fn up(&mut self) -> Option<u32> {
        self.index.pop()
    }

    pub fn components(&self) -> &[u32] {
        &self.index
    }
}

impl FromStr for ContentIndex {
    type Err = crate::MimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut index = vec![];
        for part in s.split('.') {
            match part.parse::<u32>() {
                Ok(i) if i > 0 => index.push(i),
                _ => {
                    return Err(crate::MimeError::InvalidContentIndex(s.to_string()));
                }
            }
        }
        Ok(Self { index })
    }
}

impl std::fmt::Display for ContentIndex {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
        let mut first = true;
        for i in &self.index {
            if !first {
                fmt.write_str(".")?;
            }
            write!(fmt, "{i}")?;
            first = false;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn dotted_roundtrip() {
        let idx: ContentIndex = "1.2.3".parse().unwrap();
        k9::assert_equal!(idx.components(), &[1, 2, 3]);
        k9::assert_equal!(idx.to_string(), "1.2.3");
        assert!(idx.is_valid());
    }

    #[test]
    fn invalid_forms() {
        assert!("".parse::<ContentIndex>().is_err());
        assert!("1..2".parse::<ContentIndex>().is_err());
        assert!("0.1".parse::<ContentIndex>().is_err());
        assert!("a.b".parse::<ContentIndex>().is_err());
        assert!(!ContentIndex::new().is_valid());
    }

    #[test]
    fn push_pop_up() {
        let mut idx: ContentIndex = "2.3".parse().unwrap();
        idx.push(1);
        k9::assert_equal!(idx.to_string(), "1.2.3");
        k9::assert_equal!(idx.pop(), Some(1));
        k9::assert_equal!(idx.up(), Some(3));
        k9::assert_equal!(idx.to_string(), "2");
        k9::assert_equal!(idx.up(), Some(2));
        k9::assert_equal!(idx.up(), None);
    }
}
