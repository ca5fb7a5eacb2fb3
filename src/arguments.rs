/// Centralized argument handling.
///
/// Consolidates command-line parsing and flag checking behind a thread-safe
/// store so binaries and tests can override the default `env::args()`
/// collection.
use once_cell::sync::Lazy;
use std::env;
use std::sync::Mutex;

/// Global command-line arguments storage.
pub static CMD_ARGS: Lazy<Mutex<Vec<String>>> = Lazy::new(|| Mutex::new(env::args().collect()));

/// Sets the global command-line arguments (used by tests).
pub fn set_cmd_args(args: Vec<String>) {
    if let Ok(mut cmd_args) = CMD_ARGS.lock() {
        *cmd_args = args;
    }
}

/// Gets a copy of the current command-line arguments.
pub fn get_cmd_args() -> Vec<String> {
    match CMD_ARGS.lock() {
        Ok(args) => args.clone(),
        Err(_) => env::args().collect(),
    }
}

/// Checks if a specific argument is present in the command line.
pub fn has_arg(arg: &str) -> bool {
    get_cmd_args().iter().any(|a| a == arg)
}

/// Gets the value following a flag, or None if the flag is absent.
pub fn get_arg_value(flag: &str) -> Option<String> {
    let args = get_cmd_args();
    for (i, arg) in args.iter().enumerate() {
        if arg == flag && i + 1 < args.len() {
            return Some(args[i + 1].clone());
        }
    }
    None
}

/// The first positional (non-flag) argument after the binary name.
pub fn get_command() -> Option<String> {
    let args = get_cmd_args();
    args.iter()
        .skip(1)
        .find(|a| !a.starts_with("--"))
        .cloned()
}

pub fn is_debug_enabled() -> bool {
    has_arg("--debug")
}

pub fn is_help_requested() -> bool {
    has_arg("--help") || has_arg("-h")
}

pub fn print_help() {
    println!("volumebot - synthetic volume generation for Pump.fun AMM pools");
    println!();
    println!("USAGE:");
    println!("  volumebot <COMMAND> [OPTIONS]");
    println!();
    println!("COMMANDS:");
    println!("  generate-wallets   Generate trading wallets and persist them");
    println!("  create-lut         Create the shared address lookup table");
    println!("  extend-lut         Extend the lookup table with wallet accounts");
    println!("  distribute         Distribute SOL from the master wallet");
    println!("  swap               Run one buy/sell cycle over all wallets");
    println!("  collect            Collect residual SOL back to the master wallet");
    println!("  sell-all           Sell all token holdings from every wallet");
    println!("  probe              Check candidate mints for compatible pools");
    println!("  balances           Report master and wallet balances");
    println!("  pools              List candidate pools with live prices");
    println!("  run                Full sequence: discover, fund, swap, collect");
    println!();
    println!("OPTIONS:");
    println!("  --configs <path>   Path to configs.json (default ./configs.json)");
    println!("  --mint <address>   Token mint, overrides configs.json");
    println!("  --wallets <n>      Number of wallets to use");
    println!("  --mints <list>     Comma-separated mints for the probe command");
    println!("  --debug            Print debug-level logs");
    println!("  --help, -h         Show this help");
}

#[cfg(test)]
mod tests {
    use super::*;

    // Single test because the argument store is a process-wide static.
    #[test]
    fn argument_store_round_trip() {
        set_cmd_args(vec![
            "volumebot".to_string(),
            "--debug".to_string(),
            "swap".to_string(),
        ]);
        assert_eq!(get_command().as_deref(), Some("swap"));
        assert!(is_debug_enabled());

        set_cmd_args(vec![
            "volumebot".to_string(),
            "distribute".to_string(),
            "--wallets".to_string(),
            "12".to_string(),
        ]);
        assert_eq!(get_arg_value("--wallets").as_deref(), Some("12"));
        assert_eq!(get_arg_value("--mint"), None);

        set_cmd_args(vec!["volumebot".to_string()]);
        assert_eq!(get_command(), None);
    }
}
