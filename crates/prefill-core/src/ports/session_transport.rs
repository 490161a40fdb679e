//! Session transport port.

use std::time::Duration;

use async_trait::async_trait;

use crate::domain::{AppId, AppMetadata};
use crate::error::TransportError;
use crate::session::{CdnServer, LogonDetails, MachineAuthAck, SessionEvent};

/// Connection to the distribution network.
///
/// Requests are fire-and-forget; their outcomes arrive later as
/// [`SessionEvent`]s drained with [`pump_events`](Self::pump_events).
/// Catalog queries are plain request/response.
#[async_trait]
pub trait SessionTransport: Send + Sync {
    /// Start opening the connection. Success is signalled by `SessionEvent::Connected`.
    async fn connect(&self) -> Result<(), TransportError>;

    /// Start closing the connection. Completion is signalled by `SessionEvent::Disconnected`.
    async fn disconnect(&self) -> Result<(), TransportError>;

    /// Send a logon request. The outcome arrives as `SessionEvent::LoggedOn`.
    async fn send_logon(&self, details: &LogonDetails) -> Result<(), TransportError>;

    /// Acknowledge a machine-auth push.
    async fn acknowledge_machine_auth(&self, ack: &MachineAuthAck) -> Result<(), TransportError>;

    /// Wait at most `timeout` for the next pushed event.
    ///
    /// Returns `None` when nothing arrived in time.
    async fn pump_events(&self, timeout: Duration) -> Option<SessionEvent>;

    /// Fetch metadata for a batch of apps. Unknown ids are omitted.
    async fn app_info(&self, app_ids: &[AppId]) -> Result<Vec<AppMetadata>, TransportError>;

    /// List content servers for a cell.
    async fn cdn_servers(&self, cell_id: u32) -> Result<Vec<CdnServer>, TransportError>;

    /// Apps the account played recently.
    async fn recently_played(&self) -> Result<Vec<AppId>, TransportError>;
}
