//! Depot manifests: the versioned file/chunk index of one depot.

use serde::{Deserialize, Serialize};

use super::ids::{ChunkId, DepotId, ManifestId};

/// One content-addressed chunk of a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkData {
    pub id: ChunkId,
    /// Length of the chunk as served by the CDN.
    pub compressed_length: u64,
    pub uncompressed_length: u64,
    /// Offset of the chunk within its file.
    pub offset: u64,
}

/// A file in a manifest, decomposed into chunks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    pub name: String,
    #[serde(default)]
    pub chunks: Vec<ChunkData>,
}

/// The file/chunk index of one depot at one version.
///
/// Immutable once fetched and identified by `(depot_id, manifest_id)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub depot_id: DepotId,
    pub manifest_id: ManifestId,
    #[serde(default)]
    pub files: Vec<FileEntry>,
}

impl Manifest {
    /// All chunks of all files, in file order.
    pub fn chunks(&self) -> impl Iterator<Item = &ChunkData> {
        self.files.iter().flat_map(|f| f.chunks.iter())
    }

    /// Sum of compressed chunk lengths (duplicates counted every time).
    pub fn compressed_size(&self) -> u64 {
        self.chunks().map(|c| c.compressed_length).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(id: &str, len: u64) -> ChunkData {
        ChunkData {
            id: ChunkId::new(id),
            compressed_length: len,
            uncompressed_length: len * 2,
            offset: 0,
        }
    }

    #[test]
    fn chunks_flattens_files_in_order() {
        let manifest = Manifest {
            depot_id: DepotId(731),
            manifest_id: ManifestId(1),
            files: vec![
                FileEntry {
                    name: "a.vpk".to_string(),
                    chunks: vec![chunk("aa", 10), chunk("bb", 20)],
                },
                FileEntry {
                    name: "b.vpk".to_string(),
                    chunks: vec![chunk("cc", 5)],
                },
            ],
        };

        let ids: Vec<_> = manifest.chunks().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, ["aa", "bb", "cc"]);
        assert_eq!(manifest.compressed_size(), 35);
    }
}
