//! Scriptable `SessionClient` for tests

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{ClientError, Stage};
use crate::models::{Host, MeshDevice};
use crate::presence::SessionClient;

/// Records every call, returns canned data, and can fail or hang any stage
pub struct MockClient {
    hosts: Mutex<Vec<Host>>,
    mesh: Mutex<Value>,
    failures: Mutex<HashMap<Stage, ClientError>>,
    hangs: Mutex<HashSet<Stage>>,
    xpaths: Mutex<Vec<String>>,
    login_calls: AtomicUsize,
    logout_calls: AtomicUsize,
    host_calls: AtomicUsize,
}

impl MockClient {
    pub fn new() -> Self {
        Self {
            hosts: Mutex::new(Vec::new()),
            mesh: Mutex::new(Value::Array(Vec::new())),
            failures: Mutex::new(HashMap::new()),
            hangs: Mutex::new(HashSet::new()),
            xpaths: Mutex::new(Vec::new()),
            login_calls: AtomicUsize::new(0),
            logout_calls: AtomicUsize::new(0),
            host_calls: AtomicUsize::new(0),
        }
    }

    pub fn set_hosts(&self, hosts: Vec<Host>) {
        *self.hosts.lock().unwrap() = hosts;
    }

    pub fn set_mesh(&self, devices: Vec<MeshDevice>) {
        self.set_mesh_raw(serde_json::to_value(devices).unwrap());
    }

    pub fn set_mesh_raw(&self, value: Value) {
        *self.mesh.lock().unwrap() = value;
    }

    pub fn fail(&self, stage: Stage, error: ClientError) {
        self.failures.lock().unwrap().insert(stage, error);
    }

    pub fn clear_failures(&self) {
        self.failures.lock().unwrap().clear();
    }

    /// Make the call for `stage` never resolve
    pub fn hang(&self, stage: Stage) {
        self.hangs.lock().unwrap().insert(stage);
    }

    pub fn clear_hangs(&self) {
        self.hangs.lock().unwrap().clear();
    }

    pub fn logins(&self) -> usize {
        self.login_calls.load(Ordering::SeqCst)
    }

    pub fn logouts(&self) -> usize {
        self.logout_calls.load(Ordering::SeqCst)
    }

    pub fn host_calls(&self) -> usize {
        self.host_calls.load(Ordering::SeqCst)
    }

    pub fn xpath_calls(&self) -> usize {
        self.xpaths.lock().unwrap().len()
    }

    pub fn xpaths(&self) -> Vec<String> {
        self.xpaths.lock().unwrap().clone()
    }

    async fn enter(&self, stage: Stage) -> Result<(), ClientError> {
        let hang = self.hangs.lock().unwrap().contains(&stage);
        if hang {
            std::future::pending::<()>().await;
        }

        let failure = self.failures.lock().unwrap().get(&stage).cloned();
        match failure {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl SessionClient for MockClient {
    async fn login(&self) -> Result<(), ClientError> {
        self.login_calls.fetch_add(1, Ordering::SeqCst);
        self.enter(Stage::Login).await
    }

    async fn logout(&self) -> Result<(), ClientError> {
        self.logout_calls.fetch_add(1, Ordering::SeqCst);
        self.enter(Stage::Logout).await
    }

    async fn get_hosts(&self) -> Result<Vec<Host>, ClientError> {
        self.host_calls.fetch_add(1, Ordering::SeqCst);
        self.enter(Stage::Hosts).await?;
        Ok(self.hosts.lock().unwrap().clone())
    }

    async fn get_value_by_xpath(&self, xpath: &str) -> Result<Value, ClientError> {
        self.xpaths.lock().unwrap().push(xpath.to_string());
        self.enter(Stage::Mesh).await?;
        Ok(self.mesh.lock().unwrap().clone())
    }
}
