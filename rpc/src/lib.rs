//! rpc - Remote Provisioning Client maintenance commands
//!
//! Keeps an activated Intel AMT device in step with its host OS. The
//! `maintenance` command dispatches to one of five sub-commands:
//!
//! - `syncclock`: sync the host OS clock to AMT
//! - `synchostname`: sync the OS hostname and DNS suffix to AMT
//! - `syncip`: sync a static or OS-derived IPv4 configuration to AMT
//! - `changepassword`: change the AMT password, generated or static
//! - `syncdeviceinfo`: sync device information
//!
//! Every outcome is reported as a [`ReturnCode`], whose numeric value is the
//! process exit status.
//!
//! ## Seams
//!
//! OS and engine access go through traits ([`EngineClient`], [`NetworkEnumerator`],
//! [`HostInfo`], [`PasswordPrompt`]) so the dispatcher runs against mocks in tests.

pub mod cli;
pub mod commands;
pub mod engine;
pub mod error;
pub mod host;
pub mod ipconfig;
pub mod netif;
pub mod output;
pub mod pipeline;
pub mod prompt;
pub mod session;

pub use cli::{Cli, Commands};
pub use commands::maintenance::{MaintenanceDispatcher, Services};
pub use engine::EngineClient;
pub use error::{MaintenanceError, ReturnCode};
pub use host::HostInfo;
pub use ipconfig::{IpConfiguration, IpField};
pub use netif::NetworkEnumerator;
pub use prompt::PasswordPrompt;
pub use session::{MaintenanceSession, SubCommand};
