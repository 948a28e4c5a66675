//! Access to the AMT management engine.
//!
//! The maintenance commands only need one read from the engine: the settings of
//! its LAN adapter, used to find the matching OS interface. [`EngineClient`]
//! abstracts that read so the resolver can be tested without hardware;
//! [`MeiEngineClient`] talks to the engine through the Linux MEI driver.

mod mei;

pub use mei::MeiEngineClient;

use std::fmt;
use std::net::Ipv4Addr;
use std::time::Duration;

use anyhow::Result;
use mac_address::MacAddress;
use serde::Serialize;

/// DHCP mode reported by the engine for an adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DhcpMode {
    Passive,
    Active,
    Unknown,
}

impl From<u8> for DhcpMode {
    fn from(raw: u8) -> Self {
        match raw {
            1 => DhcpMode::Passive,
            2 => DhcpMode::Active,
            _ => DhcpMode::Unknown,
        }
    }
}

impl fmt::Display for DhcpMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DhcpMode::Passive => write!(f, "passive"),
            DhcpMode::Active => write!(f, "active"),
            DhcpMode::Unknown => write!(f, "unknown"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkStatus {
    Up,
    Down,
}

/// The engine's view of one of its network adapters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InterfaceSettings {
    pub enabled: bool,
    pub link_status: LinkStatus,
    pub dhcp_enabled: bool,
    pub dhcp_mode: DhcpMode,
    pub ip_address: Ipv4Addr,
    pub mac_address: MacAddress,
}

/// Queries the management engine.
pub trait EngineClient {
    /// Settings of the wired (`wireless == false`) or wireless LAN adapter.
    ///
    /// `timeout` bounds the wait for the engine's answer.
    fn lan_interface_settings(&self, wireless: bool, timeout: Duration)
    -> Result<InterfaceSettings>;
}
