//! Merges the router host list with mesh presence into the host table

use std::collections::HashMap;

use crate::models::{normalize_mac, Host, HostTable, MeshDevice};

/// Build the next host table from the previous one and a cycle's fetch results.
///
/// Every known host starts the cycle inactive. A fetched host is present when
/// the router says so or its mesh record is active; present hosts are written
/// back whole. Absent hosts are never inserted, and mesh-only MACs never are.
pub fn reconcile(previous: &HostTable, fetched: Vec<Host>, mesh: &[MeshDevice]) -> HostTable {
    let mut table = previous.clone();
    table.mark_all_inactive();

    let mesh_by_mac: HashMap<String, &MeshDevice> = mesh
        .iter()
        .map(|dev| (normalize_mac(&dev.mac_address), dev))
        .collect();

    for mut host in fetched {
        host.id = normalize_mac(&host.id);

        let mesh_active = mesh_by_mac.get(&host.id).is_some_and(|dev| dev.active);
        if host.active || mesh_active {
            host.active = true;
            table.upsert(host);
        }
    }

    table
}
