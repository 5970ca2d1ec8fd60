//! Hierarchical names.
//!
//! A [`Name`] is an ordered sequence of opaque [`Component`]s. The URI form
//! separates components with `/` and percent-encodes every byte outside the
//! unreserved set, so `/a/b%2Fc` is a two-component name whose second
//! component contains a slash.

use std::fmt;
use std::str::FromStr;

use bytes::Bytes;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{CoreError, Result};

/// One opaque path component of a [`Name`].
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Component(Bytes);

impl Component {
    /// Create from raw bytes.
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self(bytes.into())
    }

    /// Create from a UTF-8 string, taken verbatim.
    pub fn from_text(s: &str) -> Self {
        Self(Bytes::copy_from_slice(s.as_bytes()))
    }

    /// Create a decimal number component.
    pub fn from_number(n: u64) -> Self {
        Self(Bytes::from(n.to_string()))
    }

    /// Parse the component as a decimal number.
    ///
    /// Returns `None` for empty components, leading `+`, whitespace, or
    /// anything else `u64::from_str` would reject.
    pub fn to_number(&self) -> Option<u64> {
        let s = std::str::from_utf8(&self.0).ok()?;
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        s.parse().ok()
    }

    /// View the component as UTF-8, if it is valid UTF-8.
    pub fn to_utf8(&self) -> Option<&str> {
        std::str::from_utf8(&self.0).ok()
    }

    /// Raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True if the component is zero-length.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Decode a single percent-encoded URI segment.
    fn from_uri(segment: &str) -> Result<Self> {
        let raw = segment.as_bytes();
        let mut out = Vec::with_capacity(raw.len());
        let mut i = 0;
        while i < raw.len() {
            if raw[i] == b'%' {
                let hi = raw.get(i + 1).and_then(|b| hex_value(*b));
                let lo = raw.get(i + 2).and_then(|b| hex_value(*b));
                match (hi, lo) {
                    (Some(hi), Some(lo)) => out.push((hi << 4) | lo),
                    _ => {
                        return Err(CoreError::InvalidComponent(format!(
                            "bad percent escape in {segment:?}"
                        )))
                    }
                }
                i += 3;
            } else {
                out.push(raw[i]);
                i += 1;
            }
        }
        Ok(Self(Bytes::from(out)))
    }
}

fn hex_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

fn is_unreserved(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'-' | b'.' | b'_' | b'~')
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &b in self.0.iter() {
            if is_unreserved(b) {
                write!(f, "{}", b as char)?;
            } else {
                write!(f, "%{b:02X}")?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Component({self})")
    }
}

impl From<&str> for Component {
    fn from(s: &str) -> Self {
        Self::from_text(s)
    }
}

impl From<String> for Component {
    fn from(s: String) -> Self {
        Self(Bytes::from(s))
    }
}

/// An ordered sequence of components.
#[derive(Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Name {
    components: Vec<Component>,
}

impl Name {
    /// The empty name `/`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the URI form, e.g. `/localhost/alice/info`.
    ///
    /// A leading slash is optional; empty segments from doubled or trailing
    /// slashes are skipped.
    pub fn parse(uri: &str) -> Result<Self> {
        let trimmed = uri.strip_prefix("ndn:").unwrap_or(uri);
        if trimmed.contains(char::is_whitespace) {
            return Err(CoreError::InvalidName(format!("whitespace in {uri:?}")));
        }
        let components = trimmed
            .split('/')
            .filter(|s| !s.is_empty())
            .map(Component::from_uri)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { components })
    }

    /// Build a name from components.
    pub fn from_components(components: impl IntoIterator<Item = Component>) -> Self {
        Self {
            components: components.into_iter().collect(),
        }
    }

    /// Append a component, builder style.
    pub fn append(mut self, component: impl Into<Component>) -> Self {
        self.components.push(component.into());
        self
    }

    /// Append a decimal number component, builder style.
    pub fn append_number(self, n: u64) -> Self {
        self.append(Component::from_number(n))
    }

    /// Append every component of `other`, builder style.
    pub fn append_name(mut self, other: &Name) -> Self {
        self.components.extend(other.components.iter().cloned());
        self
    }

    /// Push a component in place.
    pub fn push(&mut self, component: impl Into<Component>) {
        self.components.push(component.into());
    }

    /// Component at `index`.
    pub fn get(&self, index: usize) -> Option<&Component> {
        self.components.get(index)
    }

    /// Number of components.
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// True for the empty name.
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// All components in order.
    pub fn components(&self) -> &[Component] {
        &self.components
    }

    /// True if `prefix` is a component-wise prefix of `self`.
    pub fn starts_with(&self, prefix: &Name) -> bool {
        self.components.starts_with(&prefix.components)
    }

    /// The components after `prefix`, or `None` if `prefix` does not match.
    pub fn strip_prefix(&self, prefix: &Name) -> Option<&[Component]> {
        self.components.strip_prefix(prefix.components.as_slice())
    }

    /// The last component.
    pub fn last(&self) -> Option<&Component> {
        self.components.last()
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.components.is_empty() {
            return write!(f, "/");
        }
        for c in &self.components {
            write!(f, "/{c}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Name({self})")
    }
}

impl FromStr for Name {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for Name {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Name {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Name::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        let name = Name::parse("/localhost/alice/info").unwrap();
        assert_eq!(name.len(), 3);
        assert_eq!(name.get(1).unwrap().to_utf8(), Some("alice"));
        assert_eq!(name.to_string(), "/localhost/alice/info");
    }

    #[test]
    fn test_percent_encoding() {
        let name = Name::new().append("a b").append("x/y");
        assert_eq!(name.to_string(), "/a%20b/x%2Fy");

        let parsed = Name::parse("/a%20b/x%2Fy").unwrap();
        assert_eq!(parsed, name);
        assert_eq!(parsed.get(1).unwrap().to_utf8(), Some("x/y"));
    }

    #[test]
    fn test_bad_escape_rejected() {
        assert!(Name::parse("/a%2").is_err());
        assert!(Name::parse("/a%zz").is_err());
        assert!(Name::parse("/a b").is_err());
    }

    #[test]
    fn test_empty_segments_skipped() {
        let name = Name::parse("//a///b/").unwrap();
        assert_eq!(name.to_string(), "/a/b");
        assert_eq!(Name::parse("/").unwrap().to_string(), "/");
    }

    #[test]
    fn test_strip_prefix() {
        let prefix = Name::parse("/localhost/alice/info").unwrap();
        let name = prefix.clone().append("state").append("42");

        let rest = name.strip_prefix(&prefix).unwrap();
        assert_eq!(rest.len(), 2);
        assert_eq!(rest[0].to_utf8(), Some("state"));

        let other = Name::parse("/localhost/bob/info").unwrap();
        assert!(name.strip_prefix(&other).is_none());
        assert!(!name.starts_with(&other));
    }

    #[test]
    fn test_number_components() {
        assert_eq!(Component::from_number(17).to_number(), Some(17));
        assert_eq!(Component::from_text("007").to_number(), Some(7));
        assert_eq!(Component::from_text("").to_number(), None);
        assert_eq!(Component::from_text("+1").to_number(), None);
        assert_eq!(Component::from_text("1a").to_number(), None);
        assert_eq!(Component::from_text("99999999999999999999999").to_number(), None);
    }

    #[test]
    fn test_serde_as_uri() {
        let name = Name::parse("/alice/laptop").unwrap();
        let json = serde_json::to_string(&name).unwrap();
        assert_eq!(json, "\"/alice/laptop\"");
        let back: Name = serde_json::from_str(&json).unwrap();
        assert_eq!(back, name);
    }
}
