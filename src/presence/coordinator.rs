//! PresenceCoordinator: one session-scoped fetch, reconcile and commit cycle
//!
//! A cycle logs in, reads the router host list and the mesh device list under
//! a single time budget, logs out, and only then merges the results into a new
//! host table. The committed snapshot is published on a `watch` channel so
//! readers never wait on a cycle in flight.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::time;
use tracing::Instrument;

use crate::config::{SyncConfig, MESH_DEVICES_XPATH};
use crate::error::{ClientError, RefreshError, Stage};
use crate::models::{Host, HostTable, MeshDevice};
use crate::presence::client::SessionClient;
use crate::presence::reconcile::reconcile;

/// Per-cycle limits
#[derive(Debug, Clone)]
pub struct CoordinatorSettings {
    /// Budget for login plus both fetches
    pub timeout: Duration,
    /// Separate bound on logout so a hung teardown cannot wedge the gate
    pub logout_timeout: Duration,
    pub mesh_xpath: String,
}

impl Default for CoordinatorSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            logout_timeout: Duration::from_secs(5),
            mesh_xpath: MESH_DEVICES_XPATH.to_string(),
        }
    }
}

impl From<&SyncConfig> for CoordinatorSettings {
    fn from(sync: &SyncConfig) -> Self {
        Self {
            timeout: sync.timeout(),
            logout_timeout: sync.logout_timeout(),
            mesh_xpath: sync.mesh_xpath.clone(),
        }
    }
}

/// Last committed state, as seen by readers
#[derive(Debug, Clone, Default)]
pub struct PresenceSnapshot {
    pub hosts: Arc<HostTable>,
    /// When the table was last committed
    pub last_refreshed_at: Option<DateTime<Utc>>,
    /// When the last cycle finished, successful or not
    pub last_attempt_at: Option<DateTime<Utc>>,
    pub last_update_success: bool,
    pub last_error: Option<String>,
    pub cycles: u64,
}

/// In-progress flag. Holding a [`FlightGuard`] is the only way to run a cycle.
#[derive(Debug, Default)]
struct SingleFlight {
    busy: Arc<AtomicBool>,
}

/// Owned so it can move into the spawned cycle task
struct FlightGuard {
    busy: Arc<AtomicBool>,
}

impl SingleFlight {
    fn try_enter(&self) -> Option<FlightGuard> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| FlightGuard {
                busy: Arc::clone(&self.busy),
            })
    }

    fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

impl Drop for FlightGuard {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}

/// Owns the host table and runs refresh cycles against one router
pub struct PresenceCoordinator {
    client: Arc<dyn SessionClient>,
    settings: CoordinatorSettings,
    state: watch::Sender<PresenceSnapshot>,
    gate: SingleFlight,
    cycles: AtomicU64,
}

impl PresenceCoordinator {
    pub fn new(client: Arc<dyn SessionClient>, settings: CoordinatorSettings) -> Self {
        let (state, _) = watch::channel(PresenceSnapshot::default());
        Self {
            client,
            settings,
            state,
            gate: SingleFlight::default(),
            cycles: AtomicU64::new(0),
        }
    }

    pub fn settings(&self) -> &CoordinatorSettings {
        &self.settings
    }

    /// Committed host table
    pub fn hosts(&self) -> Arc<HostTable> {
        self.state.borrow().hosts.clone()
    }

    pub fn snapshot(&self) -> PresenceSnapshot {
        self.state.borrow().clone()
    }

    /// Receiver notified after every finished cycle
    pub fn subscribe(&self) -> watch::Receiver<PresenceSnapshot> {
        self.state.subscribe()
    }

    pub fn is_refreshing(&self) -> bool {
        self.gate.is_busy()
    }

    /// Run one cycle and commit its result.
    ///
    /// Returns [`RefreshError::InProgress`] without touching any state when
    /// another cycle holds the gate. On any other failure the host table is
    /// left exactly as it was; only the error bookkeeping changes.
    ///
    /// The cycle runs on its own task. Dropping the returned future does not
    /// cancel it, so logout and commit still happen.
    pub async fn refresh(self: &Arc<Self>) -> Result<Arc<HostTable>, RefreshError> {
        let Some(flight) = self.gate.try_enter() else {
            tracing::debug!("[PresenceCoordinator] Refresh rejected: cycle already in flight");
            return Err(RefreshError::InProgress);
        };

        let cycle = self.cycles.fetch_add(1, Ordering::Relaxed) + 1;
        let this = Arc::clone(self);
        let task = tokio::spawn(async move {
            let _flight = flight;
            let result = this
                .run_cycle()
                .instrument(tracing::info_span!("refresh", cycle))
                .await;

            this.commit(cycle, &result);
            result
        });

        match task.await {
            Ok(result) => result,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(_) => Err(RefreshError::Aborted),
        }
    }

    async fn run_cycle(&self) -> Result<Arc<HostTable>, RefreshError> {
        let fetched = match time::timeout(self.settings.timeout, self.fetch()).await {
            Ok(result) => result,
            Err(_) => Err(RefreshError::Timeout(self.settings.timeout)),
        };

        // Logout runs on every path, outside the fetch budget
        let teardown = self.teardown().await;

        let (hosts, mesh) = match (fetched, teardown) {
            (Ok(data), Ok(())) => data,
            (Ok(_), Err(e)) => return Err(e),
            (Err(e), Ok(())) => return Err(e),
            (Err(e), Err(secondary)) => {
                tracing::warn!(
                    "[PresenceCoordinator] Ignoring teardown failure after {}: {}",
                    e,
                    secondary
                );
                return Err(e);
            }
        };

        let previous = self.hosts();
        Ok(Arc::new(reconcile(&previous, hosts, &mesh)))
    }

    async fn fetch(&self) -> Result<(Vec<Host>, Vec<MeshDevice>), RefreshError> {
        self.client
            .login()
            .await
            .map_err(|e| RefreshError::communication(Stage::Login, e))?;

        let hosts = self
            .client
            .get_hosts()
            .await
            .map_err(|e| RefreshError::communication(Stage::Hosts, e))?;

        let raw = self
            .client
            .get_value_by_xpath(&self.settings.mesh_xpath)
            .await
            .map_err(|e| RefreshError::communication(Stage::Mesh, e))?;

        let mesh: Vec<MeshDevice> = serde_json::from_value(raw)
            .map_err(|e| RefreshError::communication(Stage::Mesh, e.into()))?;

        tracing::trace!(
            "[PresenceCoordinator] Fetched {} hosts, {} mesh devices",
            hosts.len(),
            mesh.len()
        );

        Ok((hosts, mesh))
    }

    async fn teardown(&self) -> Result<(), RefreshError> {
        match time::timeout(self.settings.logout_timeout, self.client.logout()).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(RefreshError::communication(Stage::Logout, e)),
            Err(_) => Err(RefreshError::communication(
                Stage::Logout,
                ClientError::Transport(format!(
                    "logout timed out after {:?}",
                    self.settings.logout_timeout
                )),
            )),
        }
    }

    fn commit(&self, cycle: u64, result: &Result<Arc<HostTable>, RefreshError>) {
        let now = Utc::now();

        match result {
            Ok(table) => {
                tracing::debug!(
                    "[PresenceCoordinator] Cycle {} committed: {} hosts, {} active",
                    cycle,
                    table.len(),
                    table.active_count()
                );
                self.state.send_modify(|snapshot| {
                    snapshot.hosts = Arc::clone(table);
                    snapshot.last_refreshed_at = Some(now);
                    snapshot.last_attempt_at = Some(now);
                    snapshot.last_update_success = true;
                    snapshot.last_error = None;
                    snapshot.cycles = cycle;
                });
            }
            Err(e) => {
                tracing::warn!("[PresenceCoordinator] Cycle {} failed: {}", cycle, e);
                self.state.send_modify(|snapshot| {
                    snapshot.last_attempt_at = Some(now);
                    snapshot.last_update_success = false;
                    snapshot.last_error = Some(e.to_string());
                    snapshot.cycles = cycle;
                });
            }
        }
    }
}
