//! AMT host interface over the Linux MEI character device.
//!
//! The engine exposes a command/response protocol on `/dev/mei0` once a
//! connection to the AMT host interface client has been made with the
//! `IOCTL_MEI_CONNECT_CLIENT` ioctl. Every message starts with a 12-byte
//! header: major/minor version, reserved word, command code and body length.

use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::net::Ipv4Addr;
use std::os::fd::{AsFd, AsRawFd, BorrowedFd};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail, ensure};
use mac_address::MacAddress;
use nix::errno::Errno;
use nix::poll::{PollFd, PollFlags, PollTimeout, poll};
use tracing::debug;

use super::{DhcpMode, EngineClient, InterfaceSettings, LinkStatus};

const DEFAULT_DEVICE: &str = "/dev/mei0";

/// AMT host interface client GUID 12F80028-B4B7-4B2D-ACA8-46E0FF65814C,
/// in the little-endian layout the kernel expects.
const AMTHI_CLIENT_UUID: [u8; 16] = [
    0x28, 0x00, 0xf8, 0x12, 0xb7, 0xb4, 0x2d, 0x4b, 0xac, 0xa8, 0x46, 0xe0, 0xff, 0x65, 0x81,
    0x4c,
];

const HEADER_LEN: usize = 12;
const GET_LAN_INTERFACE_SETTINGS_REQUEST: u32 = 0x0400_0048;
const GET_LAN_INTERFACE_SETTINGS_RESPONSE: u32 = 0x0480_0048;
const LAN_SETTINGS_BODY_LEN: usize = 24;
const DEFAULT_MAX_MESSAGE: usize = 4096;

#[repr(C)]
struct MeiConnectClientData {
    /// `in_client_uuid` on the way in, `{max_msg_length, protocol_version}` on the way out.
    data: [u8; 16],
}

nix::ioctl_readwrite!(mei_connect_client, b'H', 0x01, MeiConnectClientData);

/// Engine client speaking the AMT host interface protocol over MEI.
pub struct MeiEngineClient {
    device: PathBuf,
}

impl MeiEngineClient {
    pub fn new() -> Self {
        Self::with_device(DEFAULT_DEVICE)
    }

    pub fn with_device(device: impl Into<PathBuf>) -> Self {
        Self {
            device: device.into(),
        }
    }
}

impl Default for MeiEngineClient {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineClient for MeiEngineClient {
    fn lan_interface_settings(
        &self,
        wireless: bool,
        timeout: Duration,
    ) -> Result<InterfaceSettings> {
        let mut conn = Connection::open(&self.device, timeout)?;
        let request = lan_settings_request(u32::from(wireless));
        let response = conn.call(&request)?;
        parse_lan_settings(&response)
    }
}

struct Connection {
    file: File,
    max_message: usize,
    timeout: Duration,
}

impl Connection {
    fn open(device: &Path, timeout: Duration) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(device)
            .with_context(|| format!("Failed to open {}", device.display()))?;

        let mut connect = MeiConnectClientData {
            data: AMTHI_CLIENT_UUID,
        };
        // SAFETY: the fd is open for the lifetime of `file` and `connect` is a
        // correctly sized mei_connect_client_data.
        unsafe { mei_connect_client(file.as_raw_fd(), &mut connect) }
            .context("Failed to connect to the AMT host interface client")?;

        let max_message = u32::from_le_bytes([
            connect.data[0],
            connect.data[1],
            connect.data[2],
            connect.data[3],
        ]) as usize;
        let max_message = if max_message == 0 {
            DEFAULT_MAX_MESSAGE
        } else {
            max_message
        };
        debug!(device = %device.display(), max_message, "Connected to AMT host interface");

        Ok(Self {
            file,
            max_message,
            timeout,
        })
    }

    fn call(&mut self, request: &[u8]) -> Result<Vec<u8>> {
        self.file
            .write_all(request)
            .context("Failed to send request to the management engine")?;

        wait_readable(self.file.as_fd(), self.timeout)?;

        let mut buf = vec![0u8; self.max_message];
        let n = self
            .file
            .read(&mut buf)
            .context("Failed to read response from the management engine")?;
        buf.truncate(n);
        Ok(buf)
    }
}

/// Block until `fd` is readable or `timeout` has passed.
///
/// The descriptor is polled at least once, so a zero timeout still picks up a
/// response that is already queued. Interrupted polls are retried until the
/// deadline.
fn wait_readable(fd: BorrowedFd<'_>, timeout: Duration) -> Result<()> {
    let deadline = Instant::now() + timeout;
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        // poll(2) takes at most u16::MAX milliseconds per call here.
        let millis = u16::try_from(remaining.as_millis()).unwrap_or(u16::MAX);
        let mut fds = [PollFd::new(fd, PollFlags::POLLIN)];
        match poll(&mut fds, PollTimeout::from(millis)) {
            Ok(0) => {}
            Ok(_) => return Ok(()),
            Err(Errno::EINTR) => debug!("poll interrupted, retrying"),
            Err(e) => return Err(e).context("Failed to wait for the management engine"),
        }
        if Instant::now() >= deadline {
            bail!("Timed out after {timeout:?} waiting for the management engine");
        }
    }
}

fn header(command: u32, length: u32) -> [u8; HEADER_LEN] {
    let mut out = [0u8; HEADER_LEN];
    out[0] = 1; // major
    out[1] = 1; // minor
    out[4..8].copy_from_slice(&command.to_le_bytes());
    out[8..12].copy_from_slice(&length.to_le_bytes());
    out
}

fn lan_settings_request(interface_index: u32) -> Vec<u8> {
    let mut request = header(GET_LAN_INTERFACE_SETTINGS_REQUEST, 4).to_vec();
    request.extend_from_slice(&interface_index.to_le_bytes());
    request
}

fn read_u32(buf: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        buf[offset],
        buf[offset + 1],
        buf[offset + 2],
        buf[offset + 3],
    ])
}

fn parse_lan_settings(response: &[u8]) -> Result<InterfaceSettings> {
    ensure!(
        response.len() >= HEADER_LEN + LAN_SETTINGS_BODY_LEN,
        "Short response from the management engine ({} bytes)",
        response.len()
    );

    let command = read_u32(response, 4);
    ensure!(
        command == GET_LAN_INTERFACE_SETTINGS_RESPONSE,
        "Unexpected response command {command:#010x}"
    );

    let body = &response[HEADER_LEN..];
    let status = read_u32(body, 0);
    if status != 0 {
        bail!("Management engine returned status {status}");
    }

    let mut mac = [0u8; 6];
    mac.copy_from_slice(&body[18..24]);

    Ok(InterfaceSettings {
        enabled: read_u32(body, 4) != 0,
        ip_address: Ipv4Addr::from(read_u32(body, 8)),
        dhcp_enabled: read_u32(body, 12) != 0,
        dhcp_mode: DhcpMode::from(body[16]),
        link_status: if body[17] == 1 {
            LinkStatus::Up
        } else {
            LinkStatus::Down
        },
        mac_address: MacAddress::new(mac),
    })
}
