//! Operating system identity: hostname and DNS suffix.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};

const RESOLV_CONF: &str = "/etc/resolv.conf";

/// Reads the host's name and DNS suffix.
pub trait HostInfo {
    fn hostname(&self) -> Result<String>;
    fn dns_suffix(&self) -> Result<String>;
}

/// Production implementation reading from the running system.
pub struct SystemHostInfo {
    resolv_conf: PathBuf,
}

impl SystemHostInfo {
    pub fn new() -> Self {
        Self::with_resolv_conf(RESOLV_CONF)
    }

    pub fn with_resolv_conf(path: impl Into<PathBuf>) -> Self {
        Self {
            resolv_conf: path.into(),
        }
    }
}

impl Default for SystemHostInfo {
    fn default() -> Self {
        Self::new()
    }
}

impl HostInfo for SystemHostInfo {
    fn hostname(&self) -> Result<String> {
        whoami::fallible::hostname().context("Failed to read OS hostname")
    }

    fn dns_suffix(&self) -> Result<String> {
        let hostname = self.hostname()?;
        if let Some(suffix) = suffix_of_fqdn(&hostname) {
            return Ok(suffix.to_string());
        }
        resolv_conf_domain(&self.resolv_conf)
    }
}

/// The part of a fully qualified name after the first label.
fn suffix_of_fqdn(name: &str) -> Option<&str> {
    let (_, suffix) = name.trim_end_matches('.').split_once('.')?;
    (!suffix.is_empty()).then_some(suffix)
}

/// First `domain` or `search` entry of a resolv.conf file.
fn resolv_conf_domain(path: &Path) -> Result<String> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    for line in content.lines() {
        let mut words = line.split_whitespace();
        match words.next() {
            Some("domain") | Some("search") => {
                if let Some(domain) = words.next() {
                    return Ok(domain.trim_end_matches('.').to_string());
                }
            }
            _ => {}
        }
    }

    bail!("No DNS suffix configured in {}", path.display())
}
