//! IP configuration for `syncip`.
//!
//! User-supplied values are validated when they are assigned, so a populated
//! field is always a well-formed IPv4 address. When no static address is given,
//! [`resolve`] finds the OS interface whose hardware address matches the
//! engine's wired LAN adapter and takes its first non-loopback IPv4 address.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, warn};

use crate::engine::EngineClient;
use crate::error::{MaintenanceError, ReturnCode};
use crate::netif::NetworkEnumerator;

/// One of the five user-settable fields of an [`IpConfiguration`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IpField {
    StaticIp,
    Netmask,
    Gateway,
    PrimaryDns,
    SecondaryDns,
}

impl IpField {
    pub const ALL: [IpField; 5] = [
        IpField::StaticIp,
        IpField::Netmask,
        IpField::Gateway,
        IpField::PrimaryDns,
        IpField::SecondaryDns,
    ];

    /// Command-line flag name, without dashes.
    pub fn flag(self) -> &'static str {
        match self {
            IpField::StaticIp => "staticip",
            IpField::Netmask => "netmask",
            IpField::Gateway => "gateway",
            IpField::PrimaryDns => "primarydns",
            IpField::SecondaryDns => "secondarydns",
        }
    }

    /// Code reported when the value supplied for this field is malformed.
    pub fn return_code(self) -> ReturnCode {
        match self {
            IpField::StaticIp => ReturnCode::MissingOrIncorrectStaticIP,
            IpField::Netmask => ReturnCode::MissingOrIncorrectNetworkMask,
            IpField::Gateway => ReturnCode::MissingOrIncorrectGateway,
            IpField::PrimaryDns => ReturnCode::MissingOrIncorrectPrimaryDNS,
            IpField::SecondaryDns => ReturnCode::MissingOrIncorrectSecondaryDNS,
        }
    }

    /// Parse a value supplied for this field.
    pub fn parse(self, raw: &str) -> Result<Ipv4Addr, MaintenanceError> {
        raw.parse().map_err(|_| MaintenanceError::InvalidAddress {
            field: self,
            value: raw.to_string(),
        })
    }
}

impl fmt::Display for IpField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.flag())
    }
}

/// IPv4 settings to push to the engine. `None` means "not set".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IpConfiguration {
    pub ip_address: Option<Ipv4Addr>,
    pub netmask: Option<Ipv4Addr>,
    pub gateway: Option<Ipv4Addr>,
    pub primary_dns: Option<Ipv4Addr>,
    pub secondary_dns: Option<Ipv4Addr>,
}

impl IpConfiguration {
    pub fn get(&self, field: IpField) -> Option<Ipv4Addr> {
        *self.slot(field)
    }

    /// Parse `raw` and store it in `field`.
    ///
    /// On failure the configuration is left untouched.
    pub fn assign(&mut self, field: IpField, raw: &str) -> Result<(), MaintenanceError> {
        *self.slot_mut(field) = Some(field.parse(raw)?);
        Ok(())
    }

    fn slot(&self, field: IpField) -> &Option<Ipv4Addr> {
        match field {
            IpField::StaticIp => &self.ip_address,
            IpField::Netmask => &self.netmask,
            IpField::Gateway => &self.gateway,
            IpField::PrimaryDns => &self.primary_dns,
            IpField::SecondaryDns => &self.secondary_dns,
        }
    }

    fn slot_mut(&mut self, field: IpField) -> &mut Option<Ipv4Addr> {
        match field {
            IpField::StaticIp => &mut self.ip_address,
            IpField::Netmask => &mut self.netmask,
            IpField::Gateway => &mut self.gateway,
            IpField::PrimaryDns => &mut self.primary_dns,
            IpField::SecondaryDns => &mut self.secondary_dns,
        }
    }
}

/// Complete a user-supplied configuration.
///
/// A user-supplied static address is returned as is and the engine is never
/// queried. Otherwise the address and netmask come from the first OS interface
/// whose hardware address equals the engine's wired adapter. Gateway and DNS
/// fields are never derived. `amt_timeout` is handed to the engine client.
pub fn resolve(
    mut config: IpConfiguration,
    engine: &dyn EngineClient,
    network: &dyn NetworkEnumerator,
    amt_timeout: Duration,
) -> Result<IpConfiguration, MaintenanceError> {
    if config.ip_address.is_some() {
        return Ok(config);
    }

    let settings = engine
        .lan_interface_settings(false, amt_timeout)
        .map_err(MaintenanceError::EngineConnection)?;
    let engine_mac = settings.mac_address;
    debug!(mac = %engine_mac, "AMT wired adapter");

    let interfaces = network
        .interfaces()
        .map_err(MaintenanceError::InterfaceLookup)?;

    // First match wins: later interfaces with the same hardware address, and
    // later addresses on the matching interface, are not considered.
    for iface in interfaces
        .iter()
        .filter(|i| i.hardware_addr == Some(engine_mac))
    {
        let addrs = match network.interface_addrs(iface) {
            Ok(addrs) => addrs,
            Err(e) => {
                warn!(interface = %iface.name, "Failed to read interface addresses: {e:#}");
                continue;
            }
        };

        let found = addrs.iter().find_map(|addr| match (addr.ip, addr.netmask) {
            (IpAddr::V4(ip), IpAddr::V4(mask)) if !ip.is_loopback() => Some((ip, mask)),
            _ => None,
        });

        if let Some((ip, mask)) = found {
            debug!(interface = %iface.name, %ip, netmask = %mask, "Matched OS interface");
            config.ip_address = Some(ip);
            config.netmask = Some(mask);
            return Ok(config);
        }
    }

    Err(MaintenanceError::NoMatchingAddress {
        mac: engine_mac.to_string(),
    })
}
