//! Record of which depot versions are already in the cache.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::ids::{DepotId, ManifestId};

/// Depot id → manifest id of the last fully downloaded version.
///
/// Only advanced after every chunk of an app's plan is on disk, so a depot
/// listed here is known to be complete in the cache.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionRecord {
    depots: BTreeMap<DepotId, ManifestId>,
}

impl VersionRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last downloaded manifest for a depot.
    pub fn get(&self, depot: DepotId) -> Option<ManifestId> {
        self.depots.get(&depot).copied()
    }

    /// Whether the depot's recorded manifest equals `manifest`.
    pub fn is_current(&self, depot: DepotId, manifest: ManifestId) -> bool {
        self.get(depot) == Some(manifest)
    }

    /// Record a batch of depot versions together.
    pub fn advance(&mut self, entries: impl IntoIterator<Item = (DepotId, ManifestId)>) {
        self.depots.extend(entries);
    }

    pub fn len(&self) -> usize {
        self.depots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.depots.is_empty()
    }
}

impl FromIterator<(DepotId, ManifestId)> for VersionRecord {
    fn from_iter<I: IntoIterator<Item = (DepotId, ManifestId)>>(iter: I) -> Self {
        Self {
            depots: iter.into_iter().collect(),
        }
    }
}
