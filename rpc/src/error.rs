//! Return codes and typed failures for rpc.
//!
//! Every failure the maintenance dispatcher can report is a [`MaintenanceError`],
//! and every `MaintenanceError` maps to exactly one [`ReturnCode`]. The process
//! exit status is the numeric value of that code.

use std::fmt;
use std::process::ExitCode;

use thiserror::Error;

use crate::ipconfig::IpField;

/// Process return codes shared with the remote provisioning service.
///
/// The numeric values are part of the tool's public contract and must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ReturnCode {
    Success = 0,
    IncorrectCommandLineParameters = 1,
    MissingOrIncorrectURL = 20,
    MissingOrIncorrectPassword = 23,
    MissingOrIncorrectStaticIP = 27,
    MissingOrIncorrectNetworkMask = 28,
    MissingOrIncorrectGateway = 29,
    MissingOrIncorrectPrimaryDNS = 30,
    MissingOrIncorrectSecondaryDNS = 31,
    AMTConnectionFailed = 71,
    OSNetworkInterfacesLookupFailed = 72,
}

impl ReturnCode {
    pub fn code(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for ReturnCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} ({})", self, self.code())
    }
}

impl From<ReturnCode> for ExitCode {
    fn from(rc: ReturnCode) -> Self {
        ExitCode::from(rc.code())
    }
}

/// A failure raised while preparing a maintenance request.
#[derive(Error, Debug)]
pub enum MaintenanceError {
    #[error("no maintenance command specified")]
    MissingSubCommand,

    #[error("unknown maintenance command '{0}'")]
    UnknownSubCommand(String),

    #[error("invalid arguments for '{command}': {message}")]
    InvalidArguments { command: String, message: String },

    #[error("-{}: '{value}' is not a valid IPv4 address", field.flag())]
    InvalidAddress { field: IpField, value: String },

    #[error("AMT password is required")]
    MissingPassword,

    #[error("-u flag is required and cannot be empty")]
    MissingUrl,

    #[error("failed to query AMT LAN interface settings: {0:#}")]
    EngineConnection(#[source] anyhow::Error),

    #[error("failed to enumerate OS network interfaces: {0:#}")]
    InterfaceLookup(#[source] anyhow::Error),

    #[error("no IPv4 address found on the OS interface matching AMT adapter {mac}")]
    NoMatchingAddress { mac: String },

    #[error("failed to read OS hostname: {0:#}")]
    HostnameLookup(#[source] anyhow::Error),

    #[error("OS hostname is not available")]
    EmptyHostname,
}

impl MaintenanceError {
    /// The return code reported to the caller for this failure.
    pub fn return_code(&self) -> ReturnCode {
        match self {
            MaintenanceError::MissingSubCommand
            | MaintenanceError::UnknownSubCommand(_)
            | MaintenanceError::InvalidArguments { .. } => {
                ReturnCode::IncorrectCommandLineParameters
            }
            MaintenanceError::InvalidAddress { field, .. } => field.return_code(),
            MaintenanceError::MissingPassword => ReturnCode::MissingOrIncorrectPassword,
            MaintenanceError::MissingUrl => ReturnCode::MissingOrIncorrectURL,
            MaintenanceError::EngineConnection(_) => ReturnCode::AMTConnectionFailed,
            MaintenanceError::InterfaceLookup(_)
            | MaintenanceError::NoMatchingAddress { .. }
            | MaintenanceError::HostnameLookup(_)
            | MaintenanceError::EmptyHostname => ReturnCode::OSNetworkInterfacesLookupFailed,
        }
    }
}
