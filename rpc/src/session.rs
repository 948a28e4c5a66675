//! State of one maintenance invocation.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::Serialize;

use crate::error::MaintenanceError;
use crate::ipconfig::IpConfiguration;

/// The fixed set of maintenance sub-commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SubCommand {
    SyncClock,
    SyncHostname,
    SyncIp,
    ChangePassword,
    SyncDeviceInfo,
}

impl SubCommand {
    pub const ALL: [SubCommand; 5] = [
        SubCommand::SyncClock,
        SubCommand::SyncHostname,
        SubCommand::SyncIp,
        SubCommand::ChangePassword,
        SubCommand::SyncDeviceInfo,
    ];

    pub fn name(self) -> &'static str {
        match self {
            SubCommand::SyncClock => "syncclock",
            SubCommand::SyncHostname => "synchostname",
            SubCommand::SyncIp => "syncip",
            SubCommand::ChangePassword => "changepassword",
            SubCommand::SyncDeviceInfo => "syncdeviceinfo",
        }
    }
}

impl fmt::Display for SubCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SubCommand {
    type Err = MaintenanceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SubCommand::ALL
            .into_iter()
            .find(|c| c.name() == s)
            .ok_or_else(|| MaintenanceError::UnknownSubCommand(s.to_string()))
    }
}

/// OS hostname and DNS suffix, read once per invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HostnameInfo {
    pub hostname: String,
    pub dns_suffix_os: String,
}

/// Per-command data gathered while preparing the request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Payload {
    None,
    Hostname(HostnameInfo),
    Ip(IpConfiguration),
    Password {
        /// Replacement credential; `None` asks for a generated one.
        #[serde(skip)]
        static_password: Option<String>,
        generate: bool,
    },
}

/// Local configuration handed to the executor once preparation succeeds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalConfig {
    pub password: String,
}

/// Everything one maintenance invocation owns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaintenanceSession {
    pub command: SubCommand,
    /// Engine credential, from `-password`, `AMT_PASSWORD` or the prompt.
    pub password: Option<String>,
    pub url: Option<String>,
    pub local: bool,
    pub json: bool,
    /// Engine call timeout, passed through untouched.
    pub amt_timeout: Duration,
    pub payload: Payload,
    pub local_config: LocalConfig,
}

impl MaintenanceSession {
    pub fn new(command: SubCommand) -> Self {
        Self {
            command,
            password: None,
            url: None,
            local: false,
            json: false,
            amt_timeout: Duration::from_secs(120),
            payload: Payload::None,
            local_config: LocalConfig::default(),
        }
    }

    pub fn ip_configuration(&self) -> Option<&IpConfiguration> {
        match &self.payload {
            Payload::Ip(config) => Some(config),
            _ => None,
        }
    }

    pub fn hostname_info(&self) -> Option<&HostnameInfo> {
        match &self.payload {
            Payload::Hostname(info) => Some(info),
            _ => None,
        }
    }

    /// A credential-free view of the prepared request.
    pub fn summary(&self) -> Summary<'_> {
        Summary {
            command: self.command,
            url: self.url.as_deref(),
            local: self.local,
            payload: &self.payload,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Summary<'a> {
    pub command: SubCommand,
    pub url: Option<&'a str>,
    pub local: bool,
    pub payload: &'a Payload,
}
