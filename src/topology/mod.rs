//! Nodes, devices and addressing for a ranging experiment.
//!
//! The anchor is always created first (node 0); stations follow in index order.
//! Each node carries one Wi-Fi device and, once the internet stack is installed,
//! a network-layer object whose interface 0 is the loopback.

use std::net::Ipv4Addr;
use thiserror::Error;

use crate::types::{MacAddress, NodeId, NodeRole, Position};

pub mod node;
pub use node::{Ipv4Interface, Ipv4Stack, Node, WifiDevice};


#[derive(Debug, Error, PartialEq)]
pub enum TopologyError {
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),
    #[error("An anchor already exists: {0}")]
    AnchorAlreadyExists(NodeId),
    #[error("Stations must be created after the anchor")]
    MissingAnchor,
    #[error("Node {0} has no network layer")]
    MissingNetworkLayer(NodeId),
    #[error("Address pool {0}/{1} is exhausted")]
    AddressPoolExhausted(Ipv4Addr, u8),
}

/// Every node of one experiment, in creation order
#[derive(Debug, Default)]
pub struct Topology {
    nodes: Vec<Node>,
}

impl Topology {
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    /// Creates the anchor at the origin. There is exactly one, and it comes first.
    pub fn add_anchor(&mut self) -> Result<NodeId, TopologyError> {
        if let Some(anchor) = self.nodes.first() {
            return Err(TopologyError::AnchorAlreadyExists(anchor.id()));
        }
        Ok(self.push_node(NodeRole::Anchor, Position::ORIGIN))
    }

    /// Creates the next station at `position`
    pub fn add_station(&mut self, position: Position) -> Result<NodeId, TopologyError> {
        if self.nodes.is_empty() {
            return Err(TopologyError::MissingAnchor);
        }
        let index = self.nodes.len() - 1;
        Ok(self.push_node(NodeRole::Station { index }, position))
    }

    fn push_node(&mut self, role: NodeRole, position: Position) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        // MAC addresses count from 1 in creation order
        let device = WifiDevice::new(MacAddress::from_index(self.nodes.len() as u64 + 1));
        self.nodes.push(Node::new(id, role, position, device));
        id
    }

    /// Gives a node its network layer: a loopback interface plus one interface on its Wi-Fi device
    pub fn install_internet_stack(&mut self, id: NodeId) -> Result<(), TopologyError> {
        let node = self.node_mut(id)?;
        let mac = node.device().mac();
        node.set_ipv4(Ipv4Stack::new(mac));
        Ok(())
    }

    pub fn install_internet_stack_all(&mut self) {
        for node in self.nodes.iter_mut() {
            let mac = node.device().mac();
            node.set_ipv4(Ipv4Stack::new(mac));
        }
    }

    /// Numbers every device interface sequentially from `base + 1`, in node order.
    ///
    /// Returns the address given to each node.
    pub fn assign_addresses(&mut self, base: Ipv4Addr, prefix: u8) -> Result<Vec<Ipv4Addr>, TopologyError> {
        let host_bits = 32 - u32::from(prefix.min(32));
        let capacity = if host_bits >= 32 { u32::MAX } else { (1u32 << host_bits).saturating_sub(2) };
        if self.nodes.len() as u64 > capacity as u64 {
            return Err(TopologyError::AddressPoolExhausted(base, prefix));
        }

        let network = u32::from(base);
        let mut assigned = Vec::with_capacity(self.nodes.len());
        for (offset, node) in self.nodes.iter_mut().enumerate() {
            let id = node.id();
            let address = Ipv4Addr::from(network + offset as u32 + 1);
            let stack = node.ipv4_mut().ok_or(TopologyError::MissingNetworkLayer(id))?;
            stack.device_interface_mut().add_address(address);
            assigned.push(address);
        }
        Ok(assigned)
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn nodes_mut(&mut self) -> &mut [Node] {
        &mut self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> Result<&Node, TopologyError> {
        self.nodes.get(id.0 as usize).ok_or(TopologyError::NodeNotFound(id))
    }

    pub fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, TopologyError> {
        self.nodes.get_mut(id.0 as usize).ok_or(TopologyError::NodeNotFound(id))
    }

    pub fn anchor(&self) -> Result<&Node, TopologyError> {
        self.nodes.first().ok_or(TopologyError::MissingAnchor)
    }

    /// Stations in index order
    pub fn stations(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter().skip(1)
    }
}
