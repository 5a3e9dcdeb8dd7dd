//! Data models for the presence coordinator

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ============================================================================
// MAC addresses
// ============================================================================

/// Canonical MAC form: uppercase hex pairs joined by colons.
///
/// Accepts `:`, `-` or `.` separated input as well as bare 12-digit hex.
/// Anything that is not 12 hex digits is only trimmed and uppercased.
pub fn normalize_mac(mac: &str) -> String {
    let trimmed = mac.trim();
    let hex: String = trimmed
        .chars()
        .filter(|c| !matches!(c, ':' | '-' | '.'))
        .collect();

    if hex.len() == 12 && hex.chars().all(|c| c.is_ascii_hexdigit()) {
        hex.to_ascii_uppercase()
            .as_bytes()
            .chunks(2)
            .map(|pair| String::from_utf8_lossy(pair).into_owned())
            .collect::<Vec<_>>()
            .join(":")
    } else {
        trimmed.to_uppercase()
    }
}

// ============================================================================
// Host Models
// ============================================================================

/// A connected device as reported by the router's host list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Host {
    /// MAC address, canonical once stored in a [`HostTable`]
    pub id: String,
    #[serde(default)]
    pub active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interface_type: Option<String>,
    /// Remaining client attributes, passed through untouched
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Host {
    pub fn new(id: impl Into<String>, active: bool) -> Self {
        Self {
            id: id.into(),
            active,
            name: None,
            ip_address: None,
            interface_type: None,
            extra: Map::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_ip(mut self, ip: impl Into<String>) -> Self {
        self.ip_address = Some(ip.into());
        self
    }

    pub fn with_interface(mut self, interface_type: impl Into<String>) -> Self {
        self.interface_type = Some(interface_type.into());
        self
    }
}

/// Mesh presence record from the WSHD device management path.
/// Only lives for one refresh cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeshDevice {
    pub mac_address: String,
    #[serde(default)]
    pub active: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl MeshDevice {
    pub fn new(mac_address: impl Into<String>, active: bool) -> Self {
        Self {
            mac_address: mac_address.into(),
            active,
            extra: Map::new(),
        }
    }
}

// ============================================================================
// Host Table
// ============================================================================

/// Cumulative device inventory keyed by canonical MAC.
///
/// Keys are never removed; hosts that disappear are only marked inactive.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct HostTable {
    hosts: BTreeMap<String, Host>,
}

impl HostTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a host, matching the MAC case-insensitively
    pub fn get(&self, mac: &str) -> Option<&Host> {
        self.hosts.get(&normalize_mac(mac))
    }

    pub fn contains(&self, mac: &str) -> bool {
        self.get(mac).is_some()
    }

    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }

    pub fn active_count(&self) -> usize {
        self.hosts.values().filter(|h| h.active).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Host)> {
        self.hosts.iter()
    }

    pub fn hosts(&self) -> impl Iterator<Item = &Host> {
        self.hosts.values()
    }

    /// Reset every entry to inactive, keeping the keys
    pub fn mark_all_inactive(&mut self) {
        for host in self.hosts.values_mut() {
            host.active = false;
        }
    }

    /// Insert or replace a host under its canonical MAC
    pub fn upsert(&mut self, mut host: Host) {
        host.id = normalize_mac(&host.id);
        self.hosts.insert(host.id.clone(), host);
    }
}

impl FromIterator<Host> for HostTable {
    fn from_iter<I: IntoIterator<Item = Host>>(iter: I) -> Self {
        let mut table = HostTable::new();
        for host in iter {
            table.upsert(host);
        }
        table
    }
}
