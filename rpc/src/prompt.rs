//! Interactive credential prompt.

use anyhow::{Context, Result};

/// Asks the user for the AMT password.
pub trait PasswordPrompt {
    fn read_password(&self) -> Result<String>;
}

/// Terminal prompt with masked input.
pub struct TerminalPrompt;

impl PasswordPrompt for TerminalPrompt {
    fn read_password(&self) -> Result<String> {
        cliclack::password("Please enter AMT Password")
            .mask('▪')
            .interact()
            .context("Failed to read password")
    }
}
