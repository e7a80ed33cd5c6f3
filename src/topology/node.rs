use std::net::Ipv4Addr;
use std::sync::Arc;

use crate::ftm::FtmSession;
use crate::neighbor::NeighborTable;
use crate::types::{MacAddress, NodeId, NodeRole, Position};

/// A Wi-Fi device and its MAC, the part of a node that owns ranging sessions
#[derive(Debug, Clone)]
pub struct WifiDevice {
    mac: MacAddress,
    ftm_enabled: bool,
}

impl WifiDevice {
    /// Creates a device with FTM enabled, as every device in an experiment is by default
    pub fn new(mac: MacAddress) -> Self {
        Self { mac, ftm_enabled: true }
    }

    pub fn mac(&self) -> MacAddress {
        self.mac
    }

    pub fn ftm_enabled(&self) -> bool {
        self.ftm_enabled
    }

    pub fn set_ftm_enabled(&mut self, enabled: bool) {
        self.ftm_enabled = enabled;
    }

    /// Opens a ranging session towards `responder`, or `None` when FTM is disabled on this MAC
    pub fn new_ftm_session(&self, owner: NodeId, responder: MacAddress) -> Option<FtmSession> {
        if !self.ftm_enabled {
            return None;
        }
        Some(FtmSession::new(owner, self.mac, responder))
    }
}

/// One interface of a node's network layer
#[derive(Debug, Clone)]
pub struct Ipv4Interface {
    link_address: Option<MacAddress>,
    addresses: Vec<Ipv4Addr>,
    neighbor_table: Option<Arc<NeighborTable>>,
}

impl Ipv4Interface {
    fn loopback() -> Self {
        Self {
            link_address: None,
            addresses: vec![Ipv4Addr::LOCALHOST],
            neighbor_table: None,
        }
    }

    fn on_device(mac: MacAddress) -> Self {
        Self {
            link_address: Some(mac),
            addresses: Vec::new(),
            neighbor_table: None,
        }
    }

    /// Link-layer address of the device under this interface; `None` for loopback
    pub fn link_address(&self) -> Option<MacAddress> {
        self.link_address
    }

    pub fn addresses(&self) -> &[Ipv4Addr] {
        &self.addresses
    }

    pub fn add_address(&mut self, address: Ipv4Addr) {
        if !self.addresses.contains(&address) {
            self.addresses.push(address);
        }
    }

    pub fn neighbor_table(&self) -> Option<&Arc<NeighborTable>> {
        self.neighbor_table.as_ref()
    }

    pub fn set_neighbor_table(&mut self, table: Arc<NeighborTable>) {
        self.neighbor_table = Some(table);
    }
}

/// Network-layer object of a node
#[derive(Debug, Clone)]
pub struct Ipv4Stack {
    interfaces: Vec<Ipv4Interface>,
}

impl Ipv4Stack {
    pub(crate) fn new(device_mac: MacAddress) -> Self {
        Self {
            interfaces: vec![Ipv4Interface::loopback(), Ipv4Interface::on_device(device_mac)],
        }
    }

    pub fn interfaces(&self) -> &[Ipv4Interface] {
        &self.interfaces
    }

    pub fn interfaces_mut(&mut self) -> &mut [Ipv4Interface] {
        &mut self.interfaces
    }

    /// The interface bound to the node's Wi-Fi device
    pub fn device_interface(&self) -> &Ipv4Interface {
        &self.interfaces[1]
    }

    pub fn device_interface_mut(&mut self) -> &mut Ipv4Interface {
        &mut self.interfaces[1]
    }
}

/// A node of the experiment: the anchor or one station
#[derive(Debug, Clone)]
pub struct Node {
    id: NodeId,
    role: NodeRole,
    position: Position,
    device: WifiDevice,
    ipv4: Option<Ipv4Stack>,
}

impl Node {
    pub(crate) fn new(id: NodeId, role: NodeRole, position: Position, device: WifiDevice) -> Self {
        Self { id, role, position, device, ipv4: None }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn role(&self) -> NodeRole {
        self.role
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn device(&self) -> &WifiDevice {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut WifiDevice {
        &mut self.device
    }

    pub fn mac(&self) -> MacAddress {
        self.device.mac()
    }

    pub fn ipv4(&self) -> Option<&Ipv4Stack> {
        self.ipv4.as_ref()
    }

    pub fn ipv4_mut(&mut self) -> Option<&mut Ipv4Stack> {
        self.ipv4.as_mut()
    }

    pub(crate) fn set_ipv4(&mut self, stack: Ipv4Stack) {
        self.ipv4 = Some(stack);
    }

    /// First address on the device interface, if one has been assigned
    pub fn primary_address(&self) -> Option<Ipv4Addr> {
        self.ipv4.as_ref().and_then(|stack| stack.device_interface().addresses().first().copied())
    }
}
