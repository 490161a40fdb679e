//! Session transport speaking JSON over HTTP to a session gateway.
//!
//! The gateway holds the native connection to the network and exposes it as
//! a small REST surface:
//!
//! | method | path                     | body / query          |
//! |--------|--------------------------|-----------------------|
//! | POST   | `connect`                |                       |
//! | POST   | `disconnect`             |                       |
//! | POST   | `logon`                  | `LogonDetails`        |
//! | POST   | `machine-auth`           | `MachineAuthAck`      |
//! | GET    | `events?timeout_ms=N`    | 200 event, 204 none   |
//! | POST   | `apps/info`              | `{"app_ids": [...]}`  |
//! | GET    | `cdn/servers?cell_id=N`  |                       |
//! | GET    | `apps/recent`            |                       |

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use prefill_core::{
    AppId, AppMetadata, CdnServer, LogonDetails, MachineAuthAck, SessionEvent, SessionTransport,
    TransportError,
};

use crate::config::SteamClientConfig;
use crate::http::{build_client, ensure_success, network_error};

#[derive(Serialize)]
struct AppInfoRequest<'a> {
    app_ids: &'a [AppId],
}

/// [`SessionTransport`] backed by the session gateway.
pub struct GatewayTransport {
    client: Client,
    base: Url,
    timeout: Duration,
}

impl GatewayTransport {
    pub fn new(config: &SteamClientConfig) -> Result<Self, TransportError> {
        Ok(Self {
            client: build_client(config)?,
            base: parse_base(&config.gateway_url)?,
            timeout: config.timeout,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, TransportError> {
        self.base
            .join(path)
            .map_err(|e| TransportError::Network(format!("invalid gateway path '{path}': {e}")))
    }

    async fn post<B: Serialize + Sync + ?Sized>(
        &self,
        path: &str,
        body: Option<&B>,
    ) -> Result<reqwest::Response, TransportError> {
        let url = self.endpoint(path)?;
        let mut request = self.client.post(url);
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request.send().await.map_err(|e| network_error(&e))?;
        ensure_success(response)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, TransportError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| network_error(&e))?;
        ensure_success(response)?
            .json()
            .await
            .map_err(|e| TransportError::Decode(e.to_string()))
    }
}

/// Parse the gateway URL so that relative joins append to its path.
fn parse_base(raw: &str) -> Result<Url, TransportError> {
    let mut base = Url::parse(raw)
        .map_err(|e| TransportError::Network(format!("invalid gateway URL '{raw}': {e}")))?;
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    Ok(base)
}

#[async_trait]
impl SessionTransport for GatewayTransport {
    async fn connect(&self) -> Result<(), TransportError> {
        self.post::<()>("connect", None).await.map(drop)
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        self.post::<()>("disconnect", None).await.map(drop)
    }

    async fn send_logon(&self, details: &LogonDetails) -> Result<(), TransportError> {
        self.post("logon", Some(details)).await.map(drop)
    }

    async fn acknowledge_machine_auth(&self, ack: &MachineAuthAck) -> Result<(), TransportError> {
        self.post("machine-auth", Some(ack)).await.map(drop)
    }

    async fn pump_events(&self, timeout: Duration) -> Option<SessionEvent> {
        let mut url = self.endpoint("events").ok()?;
        url.query_pairs_mut()
            .append_pair("timeout_ms", &timeout.as_millis().to_string());

        let result = self
            .client
            .get(url)
            .timeout(timeout + self.timeout)
            .send()
            .await;

        let response = match result {
            Ok(response) if response.status() == StatusCode::NO_CONTENT => return None,
            Ok(response) => response,
            Err(e) => {
                debug!(target: "prefill.gateway", error = %e, "Event poll failed");
                tokio::time::sleep(timeout).await;
                return None;
            }
        };

        match ensure_success(response) {
            Ok(response) => match response.json::<SessionEvent>().await {
                Ok(event) => Some(event),
                Err(e) => {
                    debug!(target: "prefill.gateway", error = %e, "Unreadable event");
                    None
                }
            },
            Err(e) => {
                debug!(target: "prefill.gateway", error = %e, "Event poll rejected");
                tokio::time::sleep(timeout).await;
                None
            }
        }
    }

    async fn app_info(&self, app_ids: &[AppId]) -> Result<Vec<AppMetadata>, TransportError> {
        let response = self
            .post("apps/info", Some(&AppInfoRequest { app_ids }))
            .await?;
        response
            .json()
            .await
            .map_err(|e| TransportError::Decode(e.to_string()))
    }

    async fn cdn_servers(&self, cell_id: u32) -> Result<Vec<CdnServer>, TransportError> {
        let mut url = self.endpoint("cdn/servers")?;
        url.query_pairs_mut()
            .append_pair("cell_id", &cell_id.to_string());
        self.get_json(url).await
    }

    async fn recently_played(&self) -> Result<Vec<AppId>, TransportError> {
        let url = self.endpoint("apps/recent")?;
        self.get_json(url).await
    }
}
