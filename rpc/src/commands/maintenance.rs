//! Maintenance command dispatcher.
//!
//! `rpc maintenance <COMMAND> [FLAGS]` selects one of the fixed maintenance
//! sub-commands, runs its handler (flag parsing plus any OS or engine reads it
//! needs) and then the shared preconditions: a credential must be available,
//! and a remote endpoint is required unless the invocation is local-only.
//! All of it runs as one fail-fast [`Pipeline`].

use std::error::Error as _;
use std::net::Ipv4Addr;
use std::time::Duration;

use clap::error::ErrorKind;
use clap::{Args, CommandFactory, FromArgMatches, Parser};
use tracing::{debug, error, warn};

use crate::cli::normalize_flags;
use crate::engine::EngineClient;
use crate::error::{MaintenanceError, ReturnCode};
use crate::host::HostInfo;
use crate::ipconfig::{self, IpConfiguration, IpField};
use crate::netif::NetworkEnumerator;
use crate::output::Output;
use crate::pipeline::Pipeline;
use crate::prompt::PasswordPrompt;
use crate::session::{HostnameInfo, MaintenanceSession, Payload, SubCommand};

#[derive(Debug, Args)]
pub struct MaintenanceArgs {
    /// Maintenance command followed by its flags
    #[arg(
        value_name = "COMMAND",
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    pub args: Vec<String>,
}

/// Flags shared by every maintenance sub-command.
#[derive(Debug, Clone, Args)]
pub struct CommonArgs {
    /// Websocket address of the remote provisioning server
    #[arg(short = 'u', value_name = "URL")]
    pub url: Option<String>,

    /// AMT password
    #[arg(long, env = "AMT_PASSWORD", hide_env_values = true, allow_hyphen_values = true)]
    pub password: Option<String>,

    /// Execute the command locally, without the remote provisioning server
    #[arg(long)]
    pub local: bool,

    /// Print the prepared request as JSON
    #[arg(long)]
    pub json: bool,

    /// Timeout for management engine calls, in seconds
    #[arg(short = 't', long = "timeout", value_name = "SECONDS", default_value_t = 120)]
    pub timeout: u64,
}

/// syncclock, synchostname and syncdeviceinfo take only the common flags.
#[derive(Debug, Parser)]
#[command(args_override_self = true)]
pub struct PlainArgs {
    #[command(flatten)]
    pub common: CommonArgs,
}

/// IPv4 flags are validated as clap reads them, so the first bad value on the
/// command line is reported even when later tokens are malformed too. A
/// repeated flag keeps its last value.
#[derive(Debug, Parser)]
#[command(args_override_self = true)]
pub struct SyncIpArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// IP address to assign to AMT; defaults to the address of the matching OS interface
    #[arg(long, value_name = "IPV4", allow_hyphen_values = true, value_parser = static_ip)]
    pub staticip: Option<Ipv4Addr>,

    /// Network mask to assign to AMT; defaults to the mask of the matching OS interface
    #[arg(long, value_name = "IPV4", allow_hyphen_values = true, value_parser = netmask)]
    pub netmask: Option<Ipv4Addr>,

    /// Gateway address to assign to AMT
    #[arg(long, value_name = "IPV4", allow_hyphen_values = true, value_parser = gateway)]
    pub gateway: Option<Ipv4Addr>,

    /// Primary DNS to assign to AMT
    #[arg(long, value_name = "IPV4", allow_hyphen_values = true, value_parser = primary_dns)]
    pub primarydns: Option<Ipv4Addr>,

    /// Secondary DNS to assign to AMT
    #[arg(long, value_name = "IPV4", allow_hyphen_values = true, value_parser = secondary_dns)]
    pub secondarydns: Option<Ipv4Addr>,
}

fn static_ip(raw: &str) -> Result<Ipv4Addr, MaintenanceError> {
    IpField::StaticIp.parse(raw)
}

fn netmask(raw: &str) -> Result<Ipv4Addr, MaintenanceError> {
    IpField::Netmask.parse(raw)
}

fn gateway(raw: &str) -> Result<Ipv4Addr, MaintenanceError> {
    IpField::Gateway.parse(raw)
}

fn primary_dns(raw: &str) -> Result<Ipv4Addr, MaintenanceError> {
    IpField::PrimaryDns.parse(raw)
}

fn secondary_dns(raw: &str) -> Result<Ipv4Addr, MaintenanceError> {
    IpField::SecondaryDns.parse(raw)
}

impl SyncIpArgs {
    fn ip_configuration(&self) -> IpConfiguration {
        IpConfiguration {
            ip_address: self.staticip,
            netmask: self.netmask,
            gateway: self.gateway,
            primary_dns: self.primarydns,
            secondary_dns: self.secondarydns,
        }
    }
}

#[derive(Debug, Parser)]
#[command(args_override_self = true)]
pub struct ChangePasswordArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// New AMT password; a random one is generated when omitted
    #[arg(long = "static", value_name = "PASSWORD", allow_hyphen_values = true)]
    pub static_password: Option<String>,
}

/// External capabilities the maintenance commands consume.
#[derive(Clone, Copy)]
pub struct Services<'a> {
    pub engine: &'a dyn EngineClient,
    pub network: &'a dyn NetworkEnumerator,
    pub host: &'a dyn HostInfo,
    pub prompt: &'a dyn PasswordPrompt,
}

/// Selects and runs a maintenance sub-command.
pub struct MaintenanceDispatcher<'a> {
    services: Services<'a>,
}

impl<'a> MaintenanceDispatcher<'a> {
    pub fn new(services: Services<'a>) -> Self {
        Self { services }
    }

    /// Run `args` (sub-command name first) and report the outcome as a return code.
    pub fn dispatch(&self, args: &[String]) -> ReturnCode {
        match self.prepare(args) {
            Ok(_) => ReturnCode::Success,
            Err(e) => e.return_code(),
        }
    }

    /// Run `args` and hand back the prepared session.
    pub fn prepare(&self, args: &[String]) -> Result<MaintenanceSession, MaintenanceError> {
        let Some((name, rest)) = args.split_first() else {
            print_usage();
            let err = MaintenanceError::MissingSubCommand;
            error!(code = %err.return_code(), "{err}");
            return Err(err);
        };

        let command = name.parse::<SubCommand>().inspect_err(|err| {
            print_usage();
            error!(code = %err.return_code(), "{err}");
        })?;
        debug!(%command, "Dispatching maintenance command");

        let mut session = MaintenanceSession::new(command);
        let services = self.services;

        let pipeline = match command {
            SubCommand::SyncClock | SubCommand::SyncDeviceInfo => {
                Pipeline::<MaintenanceSession>::new().step("parse flags", |s| parse_plain(s, rest))
            }
            SubCommand::SyncHostname => Pipeline::<MaintenanceSession>::new()
                .step("parse flags", |s| parse_plain(s, rest))
                .step("read OS hostname", move |s| read_hostname(s, services.host)),
            SubCommand::SyncIp => Pipeline::<MaintenanceSession>::new()
                .step("parse flags", |s| parse_sync_ip(s, rest))
                .step("resolve IP configuration", move |s| {
                    resolve_ip(s, services.engine, services.network)
                }),
            SubCommand::ChangePassword => {
                Pipeline::<MaintenanceSession>::new().step("parse flags", |s| parse_change_password(s, rest))
            }
        };

        pipeline
            .step("obtain credential", move |s| {
                ensure_password(s, services.prompt)
            })
            .step("check endpoint", ensure_url)
            .run(&mut session)?;

        Ok(session)
    }
}

/// Parse `args` against the clap definition `T`, named after `command`.
fn parse_flags<T>(command: SubCommand, args: &[String]) -> Result<T, MaintenanceError>
where
    T: CommandFactory + FromArgMatches,
{
    let cmd = T::command()
        .name(command.name())
        .bin_name(format!("rpc maintenance {}", command.name()));
    let argv = std::iter::once(command.name().to_string()).chain(normalize_flags(&cmd, args));

    let invalid = |e: clap::Error| {
        // Help requests land here too and are answered with the help text.
        if let Err(err) = e.print() {
            debug!("Failed to print argument error: {err}");
        }
        if let Some(typed) = invalid_address(&e) {
            return typed;
        }
        let message = e
            .to_string()
            .lines()
            .next()
            .unwrap_or_default()
            .trim_start_matches("error: ")
            .to_string();
        MaintenanceError::InvalidArguments {
            command: command.name().to_string(),
            message,
        }
    };

    let matches = cmd.try_get_matches_from(argv).map_err(invalid)?;
    T::from_arg_matches(&matches).map_err(invalid)
}

/// Recover the typed failure of an IPv4 value parser from a clap error.
fn invalid_address(e: &clap::Error) -> Option<MaintenanceError> {
    if e.kind() != ErrorKind::ValueValidation {
        return None;
    }
    match e.source()?.downcast_ref::<MaintenanceError>()? {
        MaintenanceError::InvalidAddress { field, value } => Some(MaintenanceError::InvalidAddress {
            field: *field,
            value: value.clone(),
        }),
        _ => None,
    }
}

fn apply_common(session: &mut MaintenanceSession, common: CommonArgs) {
    session.url = common.url;
    session.password = common.password.filter(|p| !p.is_empty());
    session.local = common.local;
    session.json = common.json;
    session.amt_timeout = Duration::from_secs(common.timeout);
}

fn parse_plain(session: &mut MaintenanceSession, args: &[String]) -> Result<(), MaintenanceError> {
    let parsed = parse_flags::<PlainArgs>(session.command, args)?;
    apply_common(session, parsed.common);
    Ok(())
}

fn parse_sync_ip(session: &mut MaintenanceSession, args: &[String]) -> Result<(), MaintenanceError> {
    let parsed = parse_flags::<SyncIpArgs>(session.command, args)?;
    let config = parsed.ip_configuration();
    apply_common(session, parsed.common);
    session.payload = Payload::Ip(config);
    Ok(())
}

fn parse_change_password(
    session: &mut MaintenanceSession,
    args: &[String],
) -> Result<(), MaintenanceError> {
    let parsed = parse_flags::<ChangePasswordArgs>(session.command, args)?;
    let static_password = parsed.static_password.filter(|p| !p.is_empty());
    apply_common(session, parsed.common);
    session.payload = Payload::Password {
        generate: static_password.is_none(),
        static_password,
    };
    Ok(())
}

fn read_hostname(session: &mut MaintenanceSession, host: &dyn HostInfo) -> Result<(), MaintenanceError> {
    let mut info = HostnameInfo::default();

    match host.dns_suffix() {
        Ok(suffix) => info.dns_suffix_os = suffix,
        Err(e) => warn!("Failed to read OS DNS suffix: {e:#}"),
    }

    let hostname = host.hostname().map_err(MaintenanceError::HostnameLookup)?;
    if hostname.is_empty() {
        return Err(MaintenanceError::EmptyHostname);
    }
    info.hostname = hostname;

    session.payload = Payload::Hostname(info);
    Ok(())
}

fn resolve_ip(
    session: &mut MaintenanceSession,
    engine: &dyn EngineClient,
    network: &dyn NetworkEnumerator,
) -> Result<(), MaintenanceError> {
    let supplied = session.ip_configuration().cloned().unwrap_or_default();
    let resolved = ipconfig::resolve(supplied, engine, network, session.amt_timeout)?;
    session.payload = Payload::Ip(resolved);
    Ok(())
}

fn ensure_password(
    session: &mut MaintenanceSession,
    prompt: &dyn PasswordPrompt,
) -> Result<(), MaintenanceError> {
    if session.password.is_none() {
        let password = prompt.read_password().unwrap_or_else(|e| {
            debug!("Password prompt failed: {e:#}");
            String::new()
        });
        if password.is_empty() {
            return Err(MaintenanceError::MissingPassword);
        }
        session.password = Some(password);
    }

    session.local_config.password = session.password.clone().unwrap_or_default();
    Ok(())
}

fn ensure_url(session: &mut MaintenanceSession) -> Result<(), MaintenanceError> {
    if session.local || session.url.as_deref().is_some_and(|u| !u.is_empty()) {
        return Ok(());
    }
    Output::error(MaintenanceError::MissingUrl.to_string());
    print_usage();
    Err(MaintenanceError::MissingUrl)
}

/// Usage text for `rpc maintenance`.
pub fn usage() -> String {
    let mut usage = String::from(
        "\nRemote Provisioning Client (RPC) - used for activation, deactivation, maintenance and status of AMT\n\n\
         Usage: rpc maintenance COMMAND [OPTIONS]\n\n\
         Supported Maintenance Commands:\n",
    );

    let commands: [(SubCommand, &str, &str); 5] = [
        (
            SubCommand::ChangePassword,
            "Change the AMT password. A random password is generated by default. Specify -static to set manually. AMT password is required",
            "rpc maintenance changepassword -u wss://server/activate",
        ),
        (
            SubCommand::SyncDeviceInfo,
            "Sync device information. AMT password is required",
            "rpc maintenance syncdeviceinfo -u wss://server/activate",
        ),
        (
            SubCommand::SyncClock,
            "Sync the host OS clock to AMT. AMT password is required",
            "rpc maintenance syncclock -u wss://server/activate",
        ),
        (
            SubCommand::SyncHostname,
            "Sync the hostname of the client to AMT. AMT password is required",
            "rpc maintenance synchostname -u wss://server/activate",
        ),
        (
            SubCommand::SyncIp,
            "Sync the IP configuration of the host OS to AMT Network Settings. AMT password is required\n                 \
             If a static ip is not specified, the ip address and netmask of the host OS is used",
            "rpc maintenance syncip -staticip 192.168.1.7 -netmask 255.255.255.0 -gateway 192.168.1.1 -primarydns 8.8.8.8 -secondarydns 4.4.4.4 -u wss://server/activate",
        ),
    ];

    for (command, description, example) in commands {
        usage.push_str(&format!("  {:<14} {description}\n", command.name()));
        usage.push_str(&format!("                 Example: {example}\n"));
    }
    usage.push_str("\nRun 'rpc maintenance COMMAND -h' for more information on a command.\n");
    usage
}

fn print_usage() {
    Output::plain(usage());
}

/// Print the prepared request, as JSON when `-json` was given.
pub fn report(session: &MaintenanceSession) -> anyhow::Result<()> {
    if session.json {
        println!("{}", serde_json::to_string_pretty(&session.summary())?);
        return Ok(());
    }

    Output::success(format!("Maintenance request prepared: {}", session.command));
    Output::kv(
        "Target",
        if session.local {
            "local"
        } else {
            session.url.as_deref().unwrap_or_default()
        },
    );

    match &session.payload {
        Payload::None => {}
        Payload::Hostname(info) => {
            Output::kv("Hostname", &info.hostname);
            if !info.dns_suffix_os.is_empty() {
                Output::kv("DNS suffix", &info.dns_suffix_os);
            }
        }
        Payload::Ip(config) => {
            for field in IpField::ALL {
                if let Some(addr) = config.get(field) {
                    Output::kv(field.flag(), addr.to_string());
                }
            }
        }
        Payload::Password { generate, .. } => {
            Output::kv(
                "New password",
                if *generate { "generated" } else { "static" },
            );
        }
    }
    Ok(())
}

/// Entry point for `rpc maintenance`.
pub fn run(args: MaintenanceArgs, services: Services<'_>) -> ReturnCode {
    let session = match MaintenanceDispatcher::new(services).prepare(&args.args) {
        Ok(session) => session,
        Err(e) => return e.return_code(),
    };

    if let Err(e) = report(&session) {
        // The request itself was prepared; only printing it failed.
        error!("Failed to print maintenance request: {e:#}");
    }
    ReturnCode::Success
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ipconfig::tests::{ENGINE_MAC, MockEngine, MockNetwork, v4};
    use anyhow::{Result, anyhow};
    use std::cell::Cell;

    struct MockHost {
        hostname: Result<String, String>,
        dns_suffix: Result<String, String>,
    }

    impl MockHost {
        fn named(name: &str) -> Self {
            Self {
                hostname: Ok(name.to_string()),
                dns_suffix: Ok("corp.example.com".to_string()),
            }
        }
    }

    impl HostInfo for MockHost {
        fn hostname(&self) -> Result<String> {
            self.hostname.clone().map_err(|e| anyhow!(e))
        }

        fn dns_suffix(&self) -> Result<String> {
            self.dns_suffix.clone().map_err(|e| anyhow!(e))
        }
    }

    struct MockPrompt {
        answer: Option<String>,
        calls: Cell<usize>,
    }

    impl MockPrompt {
        fn answering(answer: &str) -> Self {
            Self {
                answer: Some(answer.to_string()),
                calls: Cell::new(0),
            }
        }

        fn failing() -> Self {
            Self {
                answer: None,
                calls: Cell::new(0),
            }
        }
    }

    impl PasswordPrompt for MockPrompt {
        fn read_password(&self) -> Result<String> {
            self.calls.set(self.calls.get() + 1);
            self.answer.clone().ok_or_else(|| anyhow!("not a terminal"))
        }
    }

    struct Fixture {
        engine: MockEngine,
        network: MockNetwork,
        host: MockHost,
        prompt: MockPrompt,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                engine: MockEngine::with_mac(ENGINE_MAC),
                network: MockNetwork::default().with(
                    "eth0",
                    Some(ENGINE_MAC),
                    vec![v4("192.168.1.20", "255.255.255.0")],
                ),
                host: MockHost::named("workstation-17"),
                prompt: MockPrompt::answering("Pr0mpted!"),
            }
        }

        fn dispatcher(&self) -> MaintenanceDispatcher<'_> {
            MaintenanceDispatcher::new(Services {
                engine: &self.engine,
                network: &self.network,
                host: &self.host,
                prompt: &self.prompt,
            })
        }

        fn prepare(&self, args: &[&str]) -> Result<MaintenanceSession, MaintenanceError> {
            let args: Vec<String> = args.iter().map(|s| s.to_string()).collect();
            self.dispatcher().prepare(&args)
        }

        fn dispatch(&self, args: &[&str]) -> ReturnCode {
            let args: Vec<String> = args.iter().map(|s| s.to_string()).collect();
            self.dispatcher().dispatch(&args)
        }
    }

    const REMOTE: [&str; 4] = ["-u", "wss://server/activate", "-password", "P@ssw0rd"];

    fn with_remote<'a>(args: &[&'a str]) -> Vec<&'a str> {
        let mut out = args.to_vec();
        out.extend(REMOTE);
        out
    }

    #[test]
    fn test_missing_sub_command() {
        let fx = Fixture::new();
        assert_eq!(fx.dispatch(&[]), ReturnCode::IncorrectCommandLineParameters);
        assert_eq!(fx.prompt.calls.get(), 0);
    }

    #[test]
    fn test_unknown_sub_commands_run_nothing() {
        let fx = Fixture::new();
        for name in ["activate", "SyncClock", "syncip2", "-h", ""] {
            assert_eq!(
                fx.dispatch(&[name, "-staticip", "10.0.0.5"]),
                ReturnCode::IncorrectCommandLineParameters,
                "{name}"
            );
        }
        assert_eq!(fx.engine.calls.get(), 0);
        assert_eq!(fx.prompt.calls.get(), 0);
    }

    #[test]
    fn test_sync_clock_remote() {
        let fx = Fixture::new();
        let session = fx.prepare(&with_remote(&["syncclock"])).unwrap();
        assert_eq!(session.command, SubCommand::SyncClock);
        assert_eq!(session.url.as_deref(), Some("wss://server/activate"));
        assert_eq!(session.local_config.password, "P@ssw0rd");
        assert_eq!(session.payload, Payload::None);
        assert_eq!(fx.prompt.calls.get(), 0);
    }

    #[test]
    fn test_sync_device_info_rejects_unknown_flag() {
        let fx = Fixture::new();
        assert_eq!(
            fx.dispatch(&with_remote(&["syncdeviceinfo", "-bogus"])),
            ReturnCode::IncorrectCommandLineParameters
        );
        assert_eq!(fx.prompt.calls.get(), 0);
    }

    #[test]
    fn test_sub_command_help_is_a_parameter_error() {
        let fx = Fixture::new();
        assert_eq!(
            fx.dispatch(&["syncip", "-h"]),
            ReturnCode::IncorrectCommandLineParameters
        );
    }

    #[test]
    fn test_prompts_when_no_password() {
        let fx = Fixture::new();
        let session = fx
            .prepare(&["syncclock", "-u", "wss://server/activate"])
            .unwrap();
        assert_eq!(fx.prompt.calls.get(), 1);
        assert_eq!(session.password.as_deref(), Some("Pr0mpted!"));
        assert_eq!(session.local_config.password, "Pr0mpted!");
    }

    #[test]
    fn test_empty_password_flag_prompts() {
        let fx = Fixture::new();
        fx.prepare(&["syncclock", "-local", "-password", ""]).unwrap();
        assert_eq!(fx.prompt.calls.get(), 1);
    }

    #[test]
    fn test_missing_password() {
        let mut fx = Fixture::new();
        fx.prompt = MockPrompt::failing();
        assert_eq!(
            fx.dispatch(&["syncclock", "-u", "wss://server/activate"]),
            ReturnCode::MissingOrIncorrectPassword
        );

        fx.prompt = MockPrompt::answering("");
        assert_eq!(
            fx.dispatch(&["syncclock", "-u", "wss://server/activate"]),
            ReturnCode::MissingOrIncorrectPassword
        );
    }

    #[test]
    fn test_missing_url() {
        let fx = Fixture::new();
        assert_eq!(
            fx.dispatch(&["syncclock", "-password", "P@ssw0rd"]),
            ReturnCode::MissingOrIncorrectURL
        );
        assert_eq!(
            fx.dispatch(&["syncclock", "-password", "P@ssw0rd", "-u", ""]),
            ReturnCode::MissingOrIncorrectURL
        );
    }

    #[test]
    fn test_local_does_not_need_url() {
        let fx = Fixture::new();
        let session = fx
            .prepare(&["syncdeviceinfo", "-local", "-password", "P@ssw0rd"])
            .unwrap();
        assert!(session.local);
        assert!(session.url.is_none());
    }

    #[test]
    fn test_common_flags() {
        let fx = Fixture::new();
        let session = fx
            .prepare(&with_remote(&["syncclock", "-json", "-t", "30"]))
            .unwrap();
        assert!(session.json);
        assert_eq!(session.amt_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_sync_hostname() {
        let fx = Fixture::new();
        let session = fx.prepare(&with_remote(&["synchostname"])).unwrap();
        let info = session.hostname_info().unwrap();
        assert_eq!(info.hostname, "workstation-17");
        assert_eq!(info.dns_suffix_os, "corp.example.com");
    }

    #[test]
    fn test_sync_hostname_dns_suffix_failure_is_not_fatal() {
        let mut fx = Fixture::new();
        fx.host.dns_suffix = Err("no resolv.conf".to_string());
        let session = fx.prepare(&with_remote(&["synchostname"])).unwrap();
        let info = session.hostname_info().unwrap();
        assert_eq!(info.hostname, "workstation-17");
        assert_eq!(info.dns_suffix_os, "");
    }

    #[test]
    fn test_sync_hostname_empty_hostname() {
        let mut fx = Fixture::new();
        fx.host.hostname = Ok(String::new());
        assert_eq!(
            fx.dispatch(&["synchostname", "-u", "wss://server/activate"]),
            ReturnCode::OSNetworkInterfacesLookupFailed
        );
        assert_eq!(fx.prompt.calls.get(), 0);
    }

    #[test]
    fn test_sync_hostname_lookup_failure() {
        let mut fx = Fixture::new();
        fx.host.hostname = Err("uname failed".to_string());
        assert_eq!(
            fx.dispatch(&["synchostname", "-u", "wss://server/activate"]),
            ReturnCode::OSNetworkInterfacesLookupFailed
        );
        assert_eq!(fx.prompt.calls.get(), 0);
    }

    #[test]
    fn test_sync_ip_static_only() {
        let mut fx = Fixture::new();
        fx.engine = MockEngine::failing();
        let session = fx
            .prepare(&with_remote(&["syncip", "-staticip=10.0.0.5"]))
            .unwrap();
        assert_eq!(
            session.ip_configuration(),
            Some(&IpConfiguration {
                ip_address: Some(Ipv4Addr::new(10, 0, 0, 5)),
                ..Default::default()
            })
        );
        assert_eq!(fx.engine.calls.get(), 0);
    }

    #[test]
    fn test_sync_ip_all_flags() {
        let fx = Fixture::new();
        let session = fx
            .prepare(&with_remote(&[
                "syncip",
                "-staticip",
                "192.168.1.7",
                "-netmask",
                "255.255.255.0",
                "-gateway",
                "192.168.1.1",
                "-primarydns",
                "8.8.8.8",
                "-secondarydns",
                "4.4.4.4",
            ]))
            .unwrap();
        let config = session.ip_configuration().unwrap();
        assert_eq!(config.ip_address, Some(Ipv4Addr::new(192, 168, 1, 7)));
        assert_eq!(config.netmask, Some(Ipv4Addr::new(255, 255, 255, 0)));
        assert_eq!(config.gateway, Some(Ipv4Addr::new(192, 168, 1, 1)));
        assert_eq!(config.primary_dns, Some(Ipv4Addr::new(8, 8, 8, 8)));
        assert_eq!(config.secondary_dns, Some(Ipv4Addr::new(4, 4, 4, 4)));
    }

    #[test]
    fn test_sync_ip_bad_value_per_field() {
        for field in IpField::ALL {
            let fx = Fixture::new();
            let flag = format!("-{}", field.flag());
            let rc = fx.dispatch(&with_remote(&["syncip", &flag, "not-an-ip"]));
            assert_eq!(rc, field.return_code(), "{flag}");
            assert_eq!(fx.engine.calls.get(), 0);
            assert_eq!(fx.prompt.calls.get(), 0);
        }
    }

    #[test]
    fn test_sync_ip_first_bad_flag_wins() {
        let fx = Fixture::new();
        let rc = fx.dispatch(&with_remote(&[
            "syncip",
            "-gateway",
            "bad",
            "-netmask",
            "also-bad",
        ]));
        assert_eq!(rc, ReturnCode::MissingOrIncorrectGateway);
    }

    #[test]
    fn test_sync_ip_hyphen_leading_values_map_to_field_code() {
        for (flag, value, code) in [
            ("-gateway", "-5", ReturnCode::MissingOrIncorrectGateway),
            ("-netmask", "-bad", ReturnCode::MissingOrIncorrectNetworkMask),
            ("-staticip", "-1.2.3.4", ReturnCode::MissingOrIncorrectStaticIP),
            ("-primarydns", "--", ReturnCode::MissingOrIncorrectPrimaryDNS),
            ("-secondarydns", "-u", ReturnCode::MissingOrIncorrectSecondaryDNS),
        ] {
            let fx = Fixture::new();
            let rc = fx.dispatch(&["syncip", flag, value, "-local", "-password", "p"]);
            assert_eq!(rc, code, "{flag} {value}");
            assert_eq!(fx.engine.calls.get(), 0);
        }
    }

    #[test]
    fn test_sync_ip_forgotten_value_swallows_next_flag() {
        let fx = Fixture::new();
        assert_eq!(
            fx.dispatch(&["syncip", "-gateway", "-u", "wss://server/activate"]),
            ReturnCode::MissingOrIncorrectGateway
        );
    }

    #[test]
    fn test_sync_ip_repeated_flag_keeps_last_value() {
        let fx = Fixture::new();
        let session = fx
            .prepare(&with_remote(&["syncip", "-staticip", "2.2.2.2", "-staticip", "1.1.1.1"]))
            .unwrap();
        assert_eq!(
            session.ip_configuration().unwrap().ip_address,
            Some(Ipv4Addr::new(1, 1, 1, 1))
        );
    }

    #[test]
    fn test_sync_ip_bad_value_before_repeat_wins() {
        let fx = Fixture::new();
        assert_eq!(
            fx.dispatch(&with_remote(&["syncip", "-staticip", "bad", "-staticip", "1.1.1.1"])),
            ReturnCode::MissingOrIncorrectStaticIP
        );
    }

    #[test]
    fn test_sync_ip_bad_value_before_unknown_flag_wins() {
        let fx = Fixture::new();
        assert_eq!(
            fx.dispatch(&with_remote(&["syncip", "-gateway", "bad", "-bogus"])),
            ReturnCode::MissingOrIncorrectGateway
        );
    }

    #[test]
    fn test_sync_ip_empty_inline_value() {
        let fx = Fixture::new();
        assert_eq!(
            fx.dispatch(&with_remote(&["syncip", "-gateway="])),
            ReturnCode::MissingOrIncorrectGateway
        );
    }

    #[test]
    fn test_repeated_common_flags_are_accepted() {
        let fx = Fixture::new();
        let session = fx
            .prepare(&with_remote(&["syncclock", "-local", "-local", "-t", "5", "-t", "9"]))
            .unwrap();
        assert!(session.local);
        assert_eq!(session.amt_timeout, Duration::from_secs(9));
    }

    #[test]
    fn test_sync_ip_missing_value() {
        let fx = Fixture::new();
        assert_eq!(
            fx.dispatch(&["syncip", "-staticip"]),
            ReturnCode::IncorrectCommandLineParameters
        );
    }

    #[test]
    fn test_sync_ip_resolves_from_os() {
        let fx = Fixture::new();
        let session = fx
            .prepare(&with_remote(&["syncip", "-gateway", "192.168.1.1"]))
            .unwrap();
        let config = session.ip_configuration().unwrap();
        assert_eq!(config.ip_address, Some(Ipv4Addr::new(192, 168, 1, 20)));
        assert_eq!(config.netmask, Some(Ipv4Addr::new(255, 255, 255, 0)));
        assert_eq!(config.gateway, Some(Ipv4Addr::new(192, 168, 1, 1)));
        assert_eq!(fx.engine.calls.get(), 1);
    }

    #[test]
    fn test_sync_ip_no_matching_interface_skips_preconditions() {
        let mut fx = Fixture::new();
        fx.network = MockNetwork::default().with(
            "eth0",
            Some([0x02, 0, 0, 0, 0, 1]),
            vec![v4("10.0.0.9", "255.0.0.0")],
        );
        assert_eq!(
            fx.dispatch(&["syncip", "-u", "wss://server/activate"]),
            ReturnCode::OSNetworkInterfacesLookupFailed
        );
        assert_eq!(fx.prompt.calls.get(), 0);
    }

    #[test]
    fn test_sync_ip_engine_failure() {
        let mut fx = Fixture::new();
        fx.engine = MockEngine::failing();
        assert_eq!(
            fx.dispatch(&with_remote(&["syncip"])),
            ReturnCode::AMTConnectionFailed
        );
    }

    #[test]
    fn test_change_password_generated() {
        let fx = Fixture::new();
        let session = fx.prepare(&with_remote(&["changepassword"])).unwrap();
        assert_eq!(
            session.payload,
            Payload::Password {
                static_password: None,
                generate: true
            }
        );
    }

    #[test]
    fn test_change_password_static() {
        let fx = Fixture::new();
        let session = fx
            .prepare(&with_remote(&["changepassword", "-static", "-N3wPassw0rd"]))
            .unwrap();
        assert_eq!(
            session.payload,
            Payload::Password {
                static_password: Some("-N3wPassw0rd".to_string()),
                generate: false
            }
        );
    }

    #[test]
    fn test_usage_lists_every_sub_command() {
        let text = usage();
        for command in SubCommand::ALL {
            assert!(text.contains(command.name()), "{command}");
        }
        assert!(text.contains("Usage: rpc maintenance COMMAND [OPTIONS]"));
    }
}
