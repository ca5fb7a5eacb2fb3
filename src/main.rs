use solana_sdk::pubkey::Pubkey;
use solana_sdk::signer::Signer;
use std::path::Path;
use std::str::FromStr;
use volumebot::{
    arguments,
    bot::VolumeBot,
    config::{self, Configs},
    constants::CONFIGS_FILE,
    errors::VolumeBotError,
    helpers::short_pubkey,
    logger::{self, LogTag},
    rpc::SolanaRpc,
};

/// Main entry point for the volume bot.
///
/// Setup steps are sequenced explicitly per command; an operation invoked
/// before its prerequisites reports a typed not-ready error instead of
/// loading state behind the operator's back.
#[tokio::main]
async fn main() {
    if arguments::is_help_requested() {
        arguments::print_help();
        std::process::exit(0);
    }

    let Some(command) = arguments::get_command() else {
        arguments::print_help();
        std::process::exit(2);
    };

    let configs_path = arguments::get_arg_value("--configs")
        .unwrap_or_else(|| CONFIGS_FILE.to_string());

    // Configuration problems are fatal to the whole process.
    let configs = match config::read_configs(Path::new(&configs_path)) {
        Ok(configs) => configs,
        Err(e) => {
            logger::error(LogTag::Config, &format!("FATAL: {}", e));
            std::process::exit(1);
        }
    };
    let master = match config::load_wallet_from_config(&configs) {
        Ok(keypair) => keypair,
        Err(e) => {
            logger::error(LogTag::Config, &format!("FATAL: {}", e));
            std::process::exit(1);
        }
    };

    logger::log(LogTag::System, "START", &format!("volumebot starting ({})", command));
    logger::log(
        LogTag::System,
        "START",
        &format!("Master wallet: {}", short_pubkey(&master.pubkey())),
    );

    let rpc = SolanaRpc::new(&configs.rpc_url);

    if let Err(e) = dispatch(&command, &rpc, configs, master).await {
        logger::error(LogTag::System, &format!("{} failed: {}", command, e));
        std::process::exit(1);
    }
}

fn resolve_mint(configs: &Configs) -> Result<Pubkey, VolumeBotError> {
    let raw = arguments::get_arg_value("--mint")
        .or_else(|| configs.token_mint.clone())
        .ok_or_else(|| {
            VolumeBotError::Config("No token mint: set token_mint or pass --mint".to_string())
        })?;
    Pubkey::from_str(&raw)
        .map_err(|e| VolumeBotError::Config(format!("Invalid mint address '{}': {}", raw, e)))
}

fn resolve_wallet_count(configs: &Configs) -> usize {
    arguments::get_arg_value("--wallets")
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(configs.wallet_count)
}

async fn dispatch(
    command: &str,
    rpc: &SolanaRpc,
    configs: Configs,
    master: solana_sdk::signature::Keypair,
) -> Result<(), VolumeBotError> {
    let wallet_count = resolve_wallet_count(&configs);

    match command {
        "generate-wallets" => {
            let mut bot = VolumeBot::new(rpc, configs, master, Pubkey::default());
            bot.generate_wallets(wallet_count)?;
            Ok(())
        }
        "create-lut" => {
            let mint = resolve_mint(&configs)?;
            let mut bot = VolumeBot::new(rpc, configs, master, mint);
            bot.create_lut().await
        }
        "extend-lut" => {
            let mint = resolve_mint(&configs)?;
            let mut bot = VolumeBot::new(rpc, configs, master, mint);
            bot.discover_pool().await?;
            bot.load_wallets(wallet_count)?;
            bot.load_lut().await?;
            bot.extend_lut().await
        }
        "distribute" => {
            let mint = resolve_mint(&configs)?;
            let mut bot = VolumeBot::new(rpc, configs, master, mint);
            bot.load_wallets(wallet_count)?;
            bot.load_lut().await?;
            bot.distribute().await?;
            Ok(())
        }
        "swap" => {
            let mint = resolve_mint(&configs)?;
            let mut bot = VolumeBot::new(rpc, configs, master, mint);
            bot.refresh_tip_accounts().await;
            bot.discover_pool().await?;
            bot.load_wallets(wallet_count)?;
            bot.swap_cycle().await
        }
        "collect" => {
            let mint = resolve_mint(&configs)?;
            let mut bot = VolumeBot::new(rpc, configs, master, mint);
            bot.load_wallets(wallet_count)?;
            bot.load_lut().await?;
            bot.collect().await?;
            Ok(())
        }
        "sell-all" => {
            let mint = resolve_mint(&configs)?;
            let mut bot = VolumeBot::new(rpc, configs, master, mint);
            bot.refresh_tip_accounts().await;
            bot.discover_pool().await?;
            bot.load_wallets(wallet_count)?;
            bot.sell_all().await
        }
        "probe" => {
            let raw = arguments::get_arg_value("--mints").ok_or_else(|| {
                VolumeBotError::Config("probe requires --mints <comma-separated list>".to_string())
            })?;
            let mints = raw
                .split(',')
                .map(|s| {
                    Pubkey::from_str(s.trim()).map_err(|e| {
                        VolumeBotError::Config(format!("Invalid mint '{}': {}", s, e))
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            let bot = VolumeBot::new(rpc, configs, master, Pubkey::default());
            let results = bot.probe(&mints).await?;
            let compatible = results.iter().filter(|r| r.has_wsol_pool).count();
            logger::log(
                LogTag::Pool,
                "PROBE",
                &format!("{}/{} mints have a WSOL pool", compatible, results.len()),
            );
            Ok(())
        }
        "balances" => {
            let mint = resolve_mint(&configs)?;
            let mut bot = VolumeBot::new(rpc, configs, master, mint);
            bot.load_wallets(wallet_count)?;
            bot.report_balances().await
        }
        "pools" => {
            let mint = resolve_mint(&configs)?;
            let bot = VolumeBot::new(rpc, configs, master, mint);
            bot.report_pools().await
        }
        "run" => {
            let mint = resolve_mint(&configs)?;
            let mut bot = VolumeBot::new(rpc, configs, master, mint);
            bot.run(wallet_count).await
        }
        other => {
            logger::error(LogTag::System, &format!("Unknown command: {}", other));
            arguments::print_help();
            std::process::exit(2);
        }
    }
}
