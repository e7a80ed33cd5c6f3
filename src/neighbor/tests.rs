use std::sync::Arc;
use std::time::Duration;

use super::*;
use crate::geometry::{place, Layout};
use crate::types::constants::{DEFAULT_NETWORK_BASE, DEFAULT_NETWORK_PREFIX};
use crate::types::Position;

fn addressed_topology(stations: usize) -> Topology {
    let mut topology = Topology::new();
    topology.add_anchor().unwrap();
    for index in 0..stations {
        topology.add_station(place(index, stations, Layout::Circle, 5.0)).unwrap();
    }
    topology.install_internet_stack_all();
    topology.assign_addresses(DEFAULT_NETWORK_BASE, DEFAULT_NETWORK_PREFIX).unwrap();
    topology
}

/// Tests table completeness and symmetry:
/// - every node resolves every other node's address to that node's MAC
/// - entries never expire within any realistic run
/// - loopback is never present
#[test]
fn test_table_is_complete_and_symmetric() {
    let mut topology = addressed_topology(4);
    let table = build_and_install(&mut topology).unwrap();
    assert_eq!(table.len(), 5);

    let nodes = topology.nodes();
    for a in nodes {
        let a_table = a.ipv4().unwrap().device_interface().neighbor_table().unwrap();
        for b in nodes.iter().filter(|b| b.id() != a.id()) {
            let b_table = b.ipv4().unwrap().device_interface().neighbor_table().unwrap();

            let entry = a_table.lookup(&b.primary_address().unwrap()).unwrap();
            assert_eq!(entry.link_address(), b.mac());
            assert!(entry.is_alive(Duration::from_secs(3600 * 24 * 364)));

            let reverse = b_table.lookup(&a.primary_address().unwrap()).unwrap();
            assert_eq!(reverse.link_address(), a.mac());
        }
    }

    assert!(table.lookup(&std::net::Ipv4Addr::LOCALHOST).is_none());
    assert!(table.iter().all(|entry| !entry.address().is_loopback()));
    assert!(table.iter().all(|entry| entry.alive_timeout() == NEIGHBOR_ALIVE_TIMEOUT));
}

/// The same table instance is visible on every interface, loopback included
#[test]
fn test_single_shared_instance() {
    let mut topology = addressed_topology(2);
    let table = build_and_install(&mut topology).unwrap();
    for node in topology.nodes() {
        for interface in node.ipv4().unwrap().interfaces() {
            assert!(Arc::ptr_eq(interface.neighbor_table().unwrap(), &table));
        }
    }
}

/// Rebuilding yields the same entries, with no duplicates or stale bindings left behind
#[test]
fn test_rebuild_is_idempotent() {
    let mut topology = addressed_topology(3);
    let first = build_and_install(&mut topology).unwrap();
    let second = build_and_install(&mut topology).unwrap();

    assert_eq!(first.len(), second.len());
    assert_eq!(*first, *second);
    let anchor_interface = topology.nodes()[0].ipv4().unwrap().device_interface();
    assert!(Arc::ptr_eq(anchor_interface.neighbor_table().unwrap(), &second));
}

#[test]
fn test_missing_network_layer_is_rejected() {
    let mut topology = Topology::new();
    topology.add_anchor().unwrap();
    let station = topology.add_station(Position::new(1.0, 0.0)).unwrap();
    topology.install_internet_stack(NodeId(0)).unwrap();

    let result = build_and_install(&mut topology);
    assert_eq!(result, Err(NeighborError::MissingNetworkLayer(station)));
    // Nothing was attached because the table never finished
    let anchor_interface = topology.nodes()[0].ipv4().unwrap().device_interface();
    assert!(anchor_interface.neighbor_table().is_none());
}
