//! Shared builders for unit tests.

use std::sync::Arc;

use prefill_core::{
    AppId, AppMetadata, AppType, CdnServer, ChunkData, ChunkId, Depot, DepotId, FileEntry,
    Manifest, ManifestId,
};
use prefill_steam::testing::{FakeCdn, ScriptedTransport, logged_on_session};
use prefill_steam::{CatalogResolver, ServerPool};

pub fn chunk(id: &str, len: u64) -> ChunkData {
    ChunkData {
        id: ChunkId::new(id),
        compressed_length: len,
        uncompressed_length: len,
        offset: 0,
    }
}

/// A manifest with one file holding `chunks`.
pub fn manifest(depot: u32, id: u64, chunks: &[ChunkData]) -> Manifest {
    Manifest {
        depot_id: DepotId(depot),
        manifest_id: ManifestId(id),
        files: vec![FileEntry {
            name: format!("depot_{depot}.bin"),
            chunks: chunks.to_vec(),
        }],
    }
}

pub fn app(id: u32, depots: &[(u32, u64)]) -> AppMetadata {
    AppMetadata {
        id: AppId(id),
        name: format!("App {id}"),
        app_type: AppType::Game,
        is_available: true,
        depots: depots
            .iter()
            .map(|&(depot, manifest)| Depot::new(DepotId(depot), AppId(id), ManifestId(manifest)))
            .collect(),
    }
}

/// A logged-on transport owning `owned`, with two content servers.
pub fn transport(owned: &[AppId]) -> ScriptedTransport {
    ScriptedTransport::logged_on_owning(owned).with_servers(vec![
        CdnServer::new("cdn-a.steamcontent.com", 1),
        CdnServer::new("cdn-b.steamcontent.com", 2),
    ])
}

/// A catalog over a logged-on session and a pool with the default cool-down.
pub async fn catalog_with(
    transport: ScriptedTransport,
    cdn: FakeCdn,
) -> (Arc<CatalogResolver>, Arc<FakeCdn>) {
    let session = logged_on_session(Arc::new(transport))
        .await
        .expect("scripted logon");
    let cdn = Arc::new(cdn);
    let catalog = CatalogResolver::new(
        Arc::new(session),
        cdn.clone(),
        Arc::new(ServerPool::new()),
    );
    (Arc::new(catalog), cdn)
}
