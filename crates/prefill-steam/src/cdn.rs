//! CDN client that routes content requests through the LAN cache.
//!
//! Requests are sent to the cache's IP address with the CDN hostname in the
//! `Host` header, exactly as the official client's traffic arrives at a
//! DNS-intercepting lancache. Manifest bodies are handed to a
//! [`ManifestDecoder`].

use std::net::IpAddr;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{HOST, RANGE};
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use tracing::debug;

use prefill_core::{
    CdnServer, CdnTransport, ChunkFetchError, ChunkId, DepotId, FileEntry, Manifest, ManifestId,
    QueuedRequest, TransportError,
};

use crate::config::SteamClientConfig;
use crate::http::{build_client, ensure_success, network_error};

/// Turns a downloaded manifest body into a [`Manifest`].
pub trait ManifestDecoder: Send + Sync {
    fn decode(
        &self,
        depot_id: DepotId,
        manifest_id: ManifestId,
        body: &[u8],
    ) -> Result<Manifest, TransportError>;
}

#[derive(Deserialize)]
struct ManifestDocument {
    #[serde(default)]
    files: Vec<FileEntry>,
}

/// Reads manifests rendered as `{"files": [{"name", "chunks": [...]}]}`.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonManifestDecoder;

impl ManifestDecoder for JsonManifestDecoder {
    fn decode(
        &self,
        depot_id: DepotId,
        manifest_id: ManifestId,
        body: &[u8],
    ) -> Result<Manifest, TransportError> {
        let mut document: ManifestDocument = serde_json::from_slice(body)
            .map_err(|e| TransportError::Decode(format!("manifest {manifest_id}: {e}")))?;

        for chunk in document.files.iter_mut().flat_map(|f| f.chunks.iter_mut()) {
            chunk.id = ChunkId::new(chunk.id.as_str());
        }

        Ok(Manifest {
            depot_id,
            manifest_id,
            files: document.files,
        })
    }
}

fn manifest_path(depot_id: DepotId, manifest_id: ManifestId) -> String {
    format!("/depot/{depot_id}/manifest/{manifest_id}/5")
}

fn chunk_path(depot_id: DepotId, chunk_id: &ChunkId) -> String {
    format!("/depot/{depot_id}/chunk/{chunk_id}")
}

/// Inclusive byte range covering a whole chunk. Empty chunks have none.
fn chunk_range(compressed_length: u64) -> Option<String> {
    compressed_length
        .checked_sub(1)
        .map(|last| format!("bytes=0-{last}"))
}

/// [`CdnTransport`] over reqwest.
pub struct ReqwestCdnClient {
    client: Client,
    lancache: Option<IpAddr>,
    decoder: Arc<dyn ManifestDecoder>,
}

impl ReqwestCdnClient {
    /// Route requests to `lancache`, or straight to the CDN host when `None`.
    pub fn new(
        config: &SteamClientConfig,
        lancache: Option<IpAddr>,
    ) -> Result<Self, TransportError> {
        Ok(Self {
            client: build_client(config)?,
            lancache,
            decoder: Arc::new(JsonManifestDecoder),
        })
    }

    #[must_use]
    pub fn with_decoder(mut self, decoder: Arc<dyn ManifestDecoder>) -> Self {
        self.decoder = decoder;
        self
    }

    fn url(&self, server: &CdnServer, path: &str) -> String {
        match self.lancache {
            Some(IpAddr::V4(ip)) => format!("http://{ip}{path}"),
            Some(IpAddr::V6(ip)) => format!("http://[{ip}]{path}"),
            None => format!("http://{}{path}", server.host),
        }
    }

    fn request(&self, server: &CdnServer, path: &str) -> RequestBuilder {
        let request = self.client.get(self.url(server, path));
        if self.lancache.is_some() {
            request.header(HOST, server.host.as_str())
        } else {
            request
        }
    }

    fn chunk_request(&self, server: &CdnServer, request: &QueuedRequest) -> RequestBuilder {
        let builder = self.request(server, &chunk_path(request.depot_id, &request.chunk_id));
        match chunk_range(request.compressed_length) {
            Some(range) => builder.header(RANGE, range),
            None => builder,
        }
    }

    fn chunk_error(&self, err: &reqwest::Error) -> ChunkFetchError {
        if err.is_timeout() {
            ChunkFetchError::Timeout
        } else if err.is_connect() && self.lancache.is_some() {
            ChunkFetchError::CacheUnreachable(err.to_string())
        } else {
            ChunkFetchError::Connection(err.to_string())
        }
    }
}

#[async_trait]
impl CdnTransport for ReqwestCdnClient {
    async fn fetch_manifest(
        &self,
        server: &CdnServer,
        depot_id: DepotId,
        manifest_id: ManifestId,
    ) -> Result<Manifest, TransportError> {
        let response = self
            .request(server, &manifest_path(depot_id, manifest_id))
            .send()
            .await
            .map_err(|e| network_error(&e))?;
        let body = ensure_success(response)?
            .bytes()
            .await
            .map_err(|e| network_error(&e))?;

        debug!(
            target: "prefill.cdn",
            depot_id = %depot_id,
            manifest_id = %manifest_id,
            bytes = body.len(),
            "Manifest downloaded"
        );
        self.decoder.decode(depot_id, manifest_id, &body)
    }

    async fn fetch_chunk(
        &self,
        server: &CdnServer,
        request: &QueuedRequest,
    ) -> Result<Bytes, ChunkFetchError> {
        let response = self
            .chunk_request(server, request)
            .send()
            .await
            .map_err(|e| self.chunk_error(&e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ChunkFetchError::Status(status.as_u16()));
        }

        response.bytes().await.map_err(|e| self.chunk_error(&e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prefill_core::{AppId, ChunkData};
    use std::net::Ipv4Addr;

    #[test]
    fn json_manifest_is_decoded_with_lowercase_ids() {
        let body = br#"{
            "files": [
                {
                    "name": "csgo/pak01_000.vpk",
                    "chunks": [
                        {"id": "ABCDEF01", "compressed_length": 1024, "uncompressed_length": 2048, "offset": 0}
                    ]
                }
            ]
        }"#;

        let manifest = JsonManifestDecoder
            .decode(DepotId(731), ManifestId(9), body)
            .unwrap();

        assert_eq!(manifest.depot_id, DepotId(731));
        assert_eq!(manifest.manifest_id, ManifestId(9));
        let chunk = manifest.chunks().next().unwrap();
        assert_eq!(chunk.id.as_str(), "abcdef01");
        assert_eq!(manifest.compressed_size(), 1024);
    }

    #[test]
    fn garbage_manifest_is_a_decode_error() {
        assert!(matches!(
            JsonManifestDecoder.decode(DepotId(1), ManifestId(1), b"\x00\x01"),
            Err(TransportError::Decode(_))
        ));
    }

    #[test]
    fn requests_target_lancache_ip() {
        let lancache = IpAddr::V4(Ipv4Addr::new(192, 168, 1, 20));
        let client = ReqwestCdnClient::new(&SteamClientConfig::default(), Some(lancache)).unwrap();
        let server = CdnServer::new("cache1-fra.steamcontent.com", 1);

        assert_eq!(
            client.url(&server, &chunk_path(DepotId(731), &ChunkId::new("ab"))),
            "http://192.168.1.20/depot/731/chunk/ab"
        );
    }

    #[test]
    fn direct_requests_use_server_host() {
        let client = ReqwestCdnClient::new(&SteamClientConfig::default(), None).unwrap();
        let server = CdnServer::new("cache1-fra.steamcontent.com", 1);

        assert_eq!(
            client.url(&server, &manifest_path(DepotId(731), ManifestId(42))),
            "http://cache1-fra.steamcontent.com/depot/731/manifest/42/5"
        );
    }

    #[test]
    fn chunk_requests_ask_for_the_whole_compressed_range() {
        let lancache = IpAddr::V4(Ipv4Addr::new(192, 168, 1, 20));
        let client = ReqwestCdnClient::new(&SteamClientConfig::default(), Some(lancache)).unwrap();
        let server = CdnServer::new("cache1-fra.steamcontent.com", 1);
        let chunk = ChunkData {
            id: ChunkId::new("ab"),
            compressed_length: 1024,
            uncompressed_length: 4096,
            offset: 0,
        };
        let queued = QueuedRequest::new(AppId(730), DepotId(731), ManifestId(2), &chunk);

        let built = client.chunk_request(&server, &queued).build().unwrap();

        assert_eq!(built.headers()[RANGE], "bytes=0-1023");
        assert_eq!(built.headers()[HOST], "cache1-fra.steamcontent.com");
        assert_eq!(chunk_range(0), None);
    }
}
