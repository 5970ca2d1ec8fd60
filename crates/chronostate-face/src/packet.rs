//! Interest and Data packets.

use std::time::Duration;

use bytes::Bytes;
use chronostate_core::{Component, Name};

/// A named request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interest {
    pub name: Name,
    /// Loop-detection nonce set by the forwarder; unrelated to the
    /// `<nonce>` name component of state queries.
    pub nonce: u32,
}

impl Interest {
    pub fn new(name: Name) -> Self {
        Self { name, nonce: 0 }
    }

    pub fn with_nonce(mut self, nonce: u32) -> Self {
        self.nonce = nonce;
        self
    }
}

/// An immutable named response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Data {
    pub name: Name,
    pub content: Bytes,
    /// How long caches may treat the packet as fresh.
    pub freshness: Option<Duration>,
    /// Last component of the final segment's name.
    pub final_block_id: Option<Component>,
}

impl Data {
    pub fn new(name: Name, content: impl Into<Bytes>) -> Self {
        Self {
            name,
            content: content.into(),
            freshness: None,
            final_block_id: None,
        }
    }

    pub fn with_freshness(mut self, freshness: Option<Duration>) -> Self {
        self.freshness = freshness;
        self
    }

    /// Mark the index of the final segment.
    pub fn with_final_segment(mut self, last_index: u64) -> Self {
        self.final_block_id = Some(Component::from_number(last_index));
        self
    }

    /// The final segment index, if the packet carries one.
    pub fn final_segment(&self) -> Option<u64> {
        self.final_block_id.as_ref().and_then(Component::to_number)
    }

    /// True if `interest` would be satisfied by this packet.
    pub fn satisfies(&self, interest: &Interest) -> bool {
        self.name.starts_with(&interest.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_final_segment_roundtrip() {
        let data = Data::new(Name::parse("/a/0").unwrap(), "x").with_final_segment(2);
        assert_eq!(data.final_segment(), Some(2));
        assert_eq!(Data::new(Name::new(), "").final_segment(), None);
    }

    #[test]
    fn test_prefix_satisfies() {
        let data = Data::new(Name::parse("/a/b/c").unwrap(), "x");
        assert!(data.satisfies(&Interest::new(Name::parse("/a/b").unwrap())));
        assert!(data.satisfies(&Interest::new(Name::parse("/a/b/c").unwrap())));
        assert!(!data.satisfies(&Interest::new(Name::parse("/a/c").unwrap())));
    }
}
