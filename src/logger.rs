/// Tag-based console logging.
///
/// Every log line carries a module tag and a short action keyword so the
/// output stays grep-able during long swap cycles:
///
/// ```text
/// 12:03:41 POOL   SCAN     Searching pools for mint 5wVtfsFh...
/// 12:03:44 SWAP   BUY      Wallet 3nQdyNs1: 0.002741 SOL
/// ```
///
/// DEBUG lines are only printed when `--debug` is present on the command
/// line.
use crate::arguments::is_debug_enabled;
use chrono::Local;
use colored::*;
use std::io::{self, Write};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogTag {
    System,
    Config,
    Rpc,
    Pool,
    Wallet,
    Lut,
    Batch,
    Swap,
    Bundle,
    Funding,
}

impl LogTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogTag::System => "SYSTEM",
            LogTag::Config => "CONFIG",
            LogTag::Rpc => "RPC",
            LogTag::Pool => "POOL",
            LogTag::Wallet => "WALLET",
            LogTag::Lut => "LUT",
            LogTag::Batch => "BATCH",
            LogTag::Swap => "SWAP",
            LogTag::Bundle => "BUNDLE",
            LogTag::Funding => "FUND",
        }
    }

    fn colored(&self) -> ColoredString {
        match self {
            LogTag::System => self.as_str().green().bold(),
            LogTag::Config => self.as_str().white().bold(),
            LogTag::Rpc => self.as_str().bright_green().bold(),
            LogTag::Pool => self.as_str().cyan().bold(),
            LogTag::Wallet => self.as_str().blue().bold(),
            LogTag::Lut => self.as_str().magenta().bold(),
            LogTag::Batch => self.as_str().bright_blue().bold(),
            LogTag::Swap => self.as_str().bright_yellow().bold(),
            LogTag::Bundle => self.as_str().purple().bold(),
            LogTag::Funding => self.as_str().yellow().bold(),
        }
    }
}

fn write_line(tag: LogTag, action: &str, message: &str, action_color: ColoredString) {
    let timestamp = Local::now().format("%H:%M:%S").to_string();
    println!(
        "{} {:<6} {:<8} {}",
        timestamp.dimmed(),
        tag.colored(),
        action_color,
        message
    );
    io::stdout().flush().ok();
}

/// Log an operational event.
pub fn log(tag: LogTag, action: &str, message: &str) {
    write_line(tag, action, message, action.normal());
}

/// Log a warning. Always shown.
pub fn warn(tag: LogTag, message: &str) {
    write_line(tag, "WARN", &message.yellow().to_string(), "WARN".yellow().bold());
}

/// Log an error. Always shown.
pub fn error(tag: LogTag, message: &str) {
    write_line(tag, "ERROR", &message.red().to_string(), "ERROR".red().bold());
}

/// Log a debug detail. Only shown with `--debug`.
pub fn debug(tag: LogTag, message: &str) {
    if is_debug_enabled() {
        write_line(tag, "DEBUG", &message.dimmed().to_string(), "DEBUG".purple().bold());
    }
}
