//! Golden test vectors.
//!
//! Fixed inputs with known outputs, so every consumer pages listings and
//! spells names the same way.

use chronostate_core::segment::encode;
use chronostate_core::{Fingerprint, Name};

/// A segmentation case.
#[derive(Debug, Clone)]
pub struct SegmentVector {
    pub name: &'static str,
    pub records: usize,
    pub page_limit: usize,
    /// Expected record count of each segment, in order.
    pub expected_sizes: &'static [usize],
}

/// A name spelling case.
#[derive(Debug, Clone)]
pub struct NameVector {
    pub uri: &'static str,
    /// Expected raw components.
    pub components: &'static [&'static [u8]],
    /// Expected canonical URI.
    pub canonical: &'static str,
}

/// BLAKE3 of the empty input.
pub const EMPTY_FINGERPRINT: &str =
    "af1349b9f5f9a1a6a0404dea36dcc9499bcb25c9adc112b7cc9a93cae41f3262";

pub fn segment_vectors() -> Vec<SegmentVector> {
    vec![
        SegmentVector {
            name: "empty listing",
            records: 0,
            page_limit: 100,
            expected_sizes: &[0],
        },
        SegmentVector {
            name: "single record",
            records: 1,
            page_limit: 100,
            expected_sizes: &[1],
        },
        SegmentVector {
            name: "exactly one page",
            records: 100,
            page_limit: 100,
            expected_sizes: &[100],
        },
        SegmentVector {
            name: "one past a page",
            records: 101,
            page_limit: 100,
            expected_sizes: &[100, 1],
        },
        SegmentVector {
            name: "250 actions",
            records: 250,
            page_limit: 100,
            expected_sizes: &[100, 100, 50],
        },
        SegmentVector {
            name: "small pages",
            records: 7,
            page_limit: 3,
            expected_sizes: &[3, 3, 1],
        },
    ]
}

pub fn name_vectors() -> Vec<NameVector> {
    vec![
        NameVector {
            uri: "/localhost/alice/chronoshare/docs/info",
            components: &[b"localhost", b"alice", b"chronoshare", b"docs", b"info"],
            canonical: "/localhost/alice/chronoshare/docs/info",
        },
        NameVector {
            uri: "ndn:/a//b/",
            components: &[b"a", b"b"],
            canonical: "/a/b",
        },
        NameVector {
            uri: "/my%20file.txt/%2F",
            components: &[b"my file.txt", b"/"],
            canonical: "/my%20file.txt/%2F",
        },
        NameVector {
            uri: "/",
            components: &[],
            canonical: "/",
        },
    ]
}

/// Check every vector, describing the first failure.
pub fn verify_all_vectors() -> Result<(), String> {
    for vector in segment_vectors() {
        let segments = encode((0..vector.records).collect::<Vec<_>>(), vector.page_limit);
        let sizes: Vec<usize> = segments.iter().map(|s| s.records.len()).collect();
        if sizes != vector.expected_sizes {
            return Err(format!(
                "{}: expected sizes {:?}, got {:?}",
                vector.name, vector.expected_sizes, sizes
            ));
        }
        let last = segments.len() as u64 - 1;
        if segments.iter().any(|s| s.last_index != last) {
            return Err(format!("{}: inconsistent final segment index", vector.name));
        }
    }

    for vector in name_vectors() {
        let name = Name::parse(vector.uri).map_err(|e| format!("{}: {e}", vector.uri))?;
        let components: Vec<&[u8]> = name.components().iter().map(|c| c.as_bytes()).collect();
        if components != vector.components {
            return Err(format!("{}: unexpected components {name:?}", vector.uri));
        }
        if name.to_string() != vector.canonical {
            return Err(format!("{}: canonical form {name}", vector.uri));
        }
    }

    let empty = Fingerprint::of(b"");
    if hex::encode(empty.as_bytes()) != EMPTY_FINGERPRINT {
        return Err(format!("empty fingerprint {}", empty.to_hex()));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_vectors() {
        verify_all_vectors().unwrap();
    }
}
