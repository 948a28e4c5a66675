//! Host network interface enumeration.
//!
//! [`NetworkEnumerator`] is the seam between the IP resolver and the operating
//! system. [`SystemNetworkEnumerator`] reads the kernel's interface table with
//! `getifaddrs(3)`; tests substitute a canned implementation.

use std::cell::RefCell;
use std::net::{IpAddr, Ipv4Addr};

use anyhow::{Context, Result};
use mac_address::MacAddress;
use nix::ifaddrs::getifaddrs;
use nix::sys::socket::SockaddrStorage;

/// A host network interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interface {
    pub name: String,
    /// Link-layer address. `None` for interfaces without one (loopback, tunnels).
    pub hardware_addr: Option<MacAddress>,
}

/// An address bound to an interface, with its network mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterfaceAddr {
    pub ip: IpAddr,
    pub netmask: IpAddr,
}

impl InterfaceAddr {
    pub fn v4(ip: Ipv4Addr, netmask: Ipv4Addr) -> Self {
        Self {
            ip: IpAddr::V4(ip),
            netmask: IpAddr::V4(netmask),
        }
    }
}

/// Lists host network interfaces and the addresses bound to them.
pub trait NetworkEnumerator {
    /// All interfaces, in the order the operating system reports them.
    fn interfaces(&self) -> Result<Vec<Interface>>;

    /// Addresses bound to `iface`, in the order the operating system reports them.
    fn interface_addrs(&self, iface: &Interface) -> Result<Vec<InterfaceAddr>>;
}

/// Production enumerator backed by `getifaddrs(3)`.
///
/// [`interfaces`](NetworkEnumerator::interfaces) takes one snapshot of the
/// kernel table; [`interface_addrs`](NetworkEnumerator::interface_addrs)
/// answers from that same snapshot, so both views agree.
#[derive(Debug, Default)]
pub struct SystemNetworkEnumerator {
    snapshot: RefCell<Option<Vec<(String, InterfaceAddr)>>>,
}

impl NetworkEnumerator for SystemNetworkEnumerator {
    fn interfaces(&self) -> Result<Vec<Interface>> {
        let mut interfaces: Vec<Interface> = Vec::new();
        let mut addrs = Vec::new();

        // getifaddrs yields one entry per (interface, address), so fold by name.
        for entry in getifaddrs().context("getifaddrs failed")? {
            let mac = entry.address.as_ref().and_then(link_address);

            match interfaces.iter_mut().find(|i| i.name == entry.interface_name) {
                Some(existing) => {
                    if existing.hardware_addr.is_none() {
                        existing.hardware_addr = mac;
                    }
                }
                None => interfaces.push(Interface {
                    name: entry.interface_name.clone(),
                    hardware_addr: mac,
                }),
            }

            let ip = entry.address.as_ref().and_then(ip_address);
            let netmask = entry.netmask.as_ref().and_then(ip_address);
            if let (Some(ip), Some(netmask)) = (ip, netmask) {
                addrs.push((entry.interface_name, InterfaceAddr { ip, netmask }));
            }
        }

        *self.snapshot.borrow_mut() = Some(addrs);
        Ok(interfaces)
    }

    fn interface_addrs(&self, iface: &Interface) -> Result<Vec<InterfaceAddr>> {
        if self.snapshot.borrow().is_none() {
            self.interfaces()?;
        }
        let snapshot = self.snapshot.borrow();
        Ok(snapshot
            .iter()
            .flatten()
            .filter(|(name, _)| *name == iface.name)
            .map(|(_, addr)| *addr)
            .collect())
    }
}

fn ip_address(addr: &SockaddrStorage) -> Option<IpAddr> {
    if let Some(v4) = addr.as_sockaddr_in() {
        return Some(IpAddr::V4(v4.ip()));
    }
    addr.as_sockaddr_in6().map(|v6| IpAddr::V6(v6.ip()))
}

fn link_address(addr: &SockaddrStorage) -> Option<MacAddress> {
    let bytes = addr.as_link_addr()?.addr()?;
    // An all-zero address means "none" (loopback reports one).
    if bytes == [0u8; 6] {
        return None;
    }
    Some(MacAddress::new(bytes))
}
