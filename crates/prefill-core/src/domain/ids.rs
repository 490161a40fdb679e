//! Identifier newtypes.
//!
//! Apps, depots and manifests are numeric on the wire; chunks are identified
//! by the lowercase hex form of their content hash.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Application id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AppId(pub u32);

/// Depot id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DepotId(pub u32);

/// Manifest id: an opaque version token for one depot.
///
/// Only equality is meaningful. Newer manifests are not guaranteed to have
/// larger ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ManifestId(pub u64);

impl fmt::Display for AppId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for DepotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ManifestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for AppId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}

/// Content hash of a chunk, in lowercase hex.
///
/// The chunk id is both the cache key and the file name under the depot's
/// cache directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChunkId(String);

impl ChunkId {
    /// Create a chunk id, normalising to lowercase.
    pub fn new(hex: impl Into<String>) -> Self {
        let mut hex = hex.into();
        hex.make_ascii_lowercase();
        Self(hex)
    }

    /// The hex string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChunkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_id_is_lowercased() {
        let id = ChunkId::new("ABCDEF0123");
        assert_eq!(id.as_str(), "abcdef0123");
        assert_eq!(id, ChunkId::new("abcdef0123"));
    }

    #[test]
    fn app_id_parses_with_whitespace() {
        assert_eq!(" 730 ".parse::<AppId>().unwrap(), AppId(730));
        assert!("abc".parse::<AppId>().is_err());
    }

    #[test]
    fn ids_serialize_as_bare_numbers() {
        assert_eq!(serde_json::to_string(&DepotId(731)).unwrap(), "731");
        assert_eq!(
            serde_json::to_string(&ManifestId(7_617_088_375_292_372_759)).unwrap(),
            "7617088375292372759"
        );
    }
}
