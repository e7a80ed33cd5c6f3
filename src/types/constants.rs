use std::net::Ipv4Addr;
use std::time::Duration;

/// Propagation speed used for ideal round-trip times
pub const SPEED_OF_LIGHT_M_PER_S: f64 = 299_792_458.0;

/// Default transmit power of every Wi-Fi device
pub const DEFAULT_TX_POWER_DBM: f64 = 16.0206;

/// Lifetime given to pre-resolved neighbor entries: one simulated year
pub const NEIGHBOR_ALIVE_TIMEOUT: Duration = Duration::from_secs(3600 * 24 * 365);

/// Network the anchor and stations are numbered from
pub const DEFAULT_NETWORK_BASE: Ipv4Addr = Ipv4Addr::new(10, 1, 0, 0);

/// Prefix length of [`DEFAULT_NETWORK_BASE`]
pub const DEFAULT_NETWORK_PREFIX: u8 = 24;

/// Stop time used when the operator does not choose one, counted from the last session start
pub const DEFAULT_STOP_SECS: u64 = 100;

/// Gap between staggered session starts in the reference scenario
pub const DEFAULT_INTER_SESSION_GAP_SECS: u64 = 200;

/// Resource name of the default spatial error map; covers `[-25, 25]` metres on both axes
pub const DEFAULT_ERROR_MAP: &str = "50x50.map";
