//! CLI argument definitions for rpc.
//!
//! This module contains the clap-derived `Cli` and `Commands` types, plus the
//! flag normalisation that lets the maintenance sub-commands keep their
//! single-dash spelling (`-staticip 10.0.0.5`).

use clap::{Args, Parser, Subcommand};

use crate::commands;

#[derive(Debug, Parser)]
#[command(name = "rpc")]
#[command(about = "Remote Provisioning Client - used for activation, deactivation, maintenance and status of AMT")]
#[command(version)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Log level (error, warn, info, debug, trace); RUST_LOG takes precedence
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Maintain the AMT state of an activated device
    ///
    /// Keeps the engine's clock, hostname, IP configuration and password in
    /// step with the host OS. Run `rpc maintenance` for the list of commands.
    #[command(disable_help_flag = true)]
    Maintenance(commands::maintenance::MaintenanceArgs),
}

/// Rewrite single-dash long flags (`-staticip`, `-password=x`) to the
/// double-dash form clap expects.
///
/// Flags are looked up on `cmd` so a token is never rewritten when it is the
/// value of a preceding value-taking flag (`-static -Secret1`). Single-letter
/// flags and everything after `--` are passed through untouched.
pub fn normalize_flags(cmd: &clap::Command, args: &[String]) -> Vec<String> {
    let mut out = Vec::with_capacity(args.len());
    let mut iter = args.iter();
    let mut expect_value = false;

    while let Some(arg) = iter.next() {
        if expect_value {
            expect_value = false;
            out.push(arg.clone());
            continue;
        }
        if arg == "--" {
            out.push(arg.clone());
            out.extend(iter.cloned());
            break;
        }

        let Some(body) = arg.strip_prefix('-') else {
            out.push(arg.clone());
            continue;
        };
        let body = body.strip_prefix('-').unwrap_or(body);
        let (name, inline_value) = match body.split_once('=') {
            Some((name, _)) => (name, true),
            None => (body, false),
        };

        expect_value = !inline_value && takes_value(cmd, name);
        if name.chars().count() > 1 && !arg.starts_with("--") {
            out.push(format!("-{arg}"));
        } else {
            out.push(arg.clone());
        }
    }

    out
}

fn takes_value(cmd: &clap::Command, name: &str) -> bool {
    let mut chars = name.chars();
    let short = match (chars.next(), chars.next()) {
        (Some(c), None) => Some(c),
        _ => None,
    };

    cmd.get_arguments()
        .find(|a| a.get_long() == Some(name) || (short.is_some() && a.get_short() == short))
        .is_some_and(|a| a.get_action().takes_values())
}
