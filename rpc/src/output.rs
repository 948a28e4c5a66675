//! Output helpers for consistent CLI output.
//!
//! Status lines use colored prefixes in the cargo style:
//!
//! ```rust,ignore
//! use rpc::output::Output;
//!
//! Output::success("Maintenance request prepared");
//! Output::error("-u flag is required and cannot be empty");
//! Output::kv("Command", "syncip");
//! ```

use owo_colors::OwoColorize;

/// Standard output helper for consistent CLI formatting.
pub struct Output;

impl Output {
    /// Print a success message with a green checkmark.
    ///
    /// Example: `✓ Maintenance request prepared`
    pub fn success(msg: impl AsRef<str>) {
        println!("{} {}", "✓".green().bold(), msg.as_ref());
    }

    /// Print an error message with a red X to stderr.
    pub fn error(msg: impl AsRef<str>) {
        eprintln!("{} {}", "✗".red().bold(), msg.as_ref().red());
    }

    /// Print a key-value pair with alignment.
    ///
    /// Example: `  Command:       syncip`
    pub fn kv(key: impl AsRef<str>, value: impl AsRef<str>) {
        println!("  {:<14} {}", format!("{}:", key.as_ref()).cyan(), value.as_ref());
    }

    /// Print a block of plain text, such as a usage message.
    pub fn plain(msg: impl AsRef<str>) {
        println!("{}", msg.as_ref());
    }
}
