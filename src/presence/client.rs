//! Session client capability consumed by the coordinator

use async_trait::async_trait;

use crate::error::ClientError;
use crate::models::Host;

/// Authenticated access to the router.
///
/// Implementations own the router's wire protocol. The coordinator only
/// sequences the calls: `login`, the two queries, then `logout`.
#[async_trait]
pub trait SessionClient: Send + Sync {
    /// Open a session
    async fn login(&self) -> Result<(), ClientError>;

    /// Close the session. Best-effort; called after every cycle.
    async fn logout(&self) -> Result<(), ClientError>;

    /// Connected hosts as the router's host table reports them
    async fn get_hosts(&self) -> Result<Vec<Host>, ClientError>;

    /// Raw value stored under a data model path
    async fn get_value_by_xpath(&self, xpath: &str) -> Result<serde_json::Value, ClientError>;
}
