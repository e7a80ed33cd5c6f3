//! Static address resolution.
//!
//! Every non-loopback address in the topology is bound to the link-layer address
//! of its interface before any ranging traffic is sent, so no node ever waits on
//! a resolution request. The table is filled completely before it is attached to
//! any interface, then shared read-only by all of them.

use std::collections::BTreeMap;
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::topology::Topology;
use crate::types::constants::NEIGHBOR_ALIVE_TIMEOUT;
use crate::types::{MacAddress, NodeId};

#[cfg(test)]
mod tests;

#[derive(Debug, Error, PartialEq)]
pub enum NeighborError {
    #[error("Node {0} has no network layer")]
    MissingNetworkLayer(NodeId),
    #[error("Address {address} on node {node} has no link-layer address to resolve to")]
    NoLinkAddress { node: NodeId, address: Ipv4Addr },
}

/// A resolved binding from a network address to the link-layer address that owns it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NeighborEntry {
    address: Ipv4Addr,
    link_address: MacAddress,
    alive_timeout: Duration,
}

impl NeighborEntry {
    fn resolved(address: Ipv4Addr, link_address: MacAddress) -> Self {
        Self {
            address,
            link_address,
            alive_timeout: NEIGHBOR_ALIVE_TIMEOUT,
        }
    }

    pub fn address(&self) -> Ipv4Addr {
        self.address
    }

    pub fn link_address(&self) -> MacAddress {
        self.link_address
    }

    pub fn alive_timeout(&self) -> Duration {
        self.alive_timeout
    }

    /// Whether the entry is still alive after `elapsed` of simulated time
    pub fn is_alive(&self, elapsed: Duration) -> bool {
        elapsed < self.alive_timeout
    }
}

/// Address-resolution table shared by every interface of an experiment
#[derive(Debug, Default, PartialEq)]
pub struct NeighborTable {
    entries: BTreeMap<Ipv4Addr, NeighborEntry>,
}

impl NeighborTable {
    pub fn lookup(&self, address: &Ipv4Addr) -> Option<&NeighborEntry> {
        self.entries.get(address)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in address order
    pub fn iter(&self) -> impl Iterator<Item = &NeighborEntry> {
        self.entries.values()
    }

    fn insert_resolved(&mut self, address: Ipv4Addr, link_address: MacAddress) {
        self.entries.insert(address, NeighborEntry::resolved(address, link_address));
    }
}

/// Builds one table covering every node and attaches it to every interface.
///
/// The first pass only reads the topology and fills the table; the second pass
/// attaches the finished table, so no interface ever observes a partial table.
/// Running it again on the same topology yields an identical table and replaces
/// the previous one everywhere.
pub fn build_and_install(topology: &mut Topology) -> Result<Arc<NeighborTable>, NeighborError> {
    let mut table = NeighborTable::default();

    for node in topology.nodes() {
        let stack = node.ipv4().ok_or(NeighborError::MissingNetworkLayer(node.id()))?;
        for interface in stack.interfaces() {
            for address in interface.addresses() {
                if address.is_loopback() {
                    continue;
                }
                let link_address = interface
                    .link_address()
                    .ok_or(NeighborError::NoLinkAddress { node: node.id(), address: *address })?;
                table.insert_resolved(*address, link_address);
            }
        }
    }

    let table = Arc::new(table);

    let mut attached = 0usize;
    for node in topology.nodes_mut() {
        let id = node.id();
        let stack = node.ipv4_mut().ok_or(NeighborError::MissingNetworkLayer(id))?;
        for interface in stack.interfaces_mut() {
            interface.set_neighbor_table(Arc::clone(&table));
            attached += 1;
        }
    }

    tracing::info!(
        "Installed neighbor table with {} entries on {} interfaces",
        table.len(),
        attached
    );
    Ok(table)
}
