/// Runtime configuration loaded from configs.json.
///
/// All fields required for operation are validated once at startup; a missing
/// or unparseable value is fatal to the whole process, never to an individual
/// operation.
use crate::constants::{
    BUY_SLIPPAGE_BPS, DEFAULT_DISTRIBUTE_LAMPORTS, DEFAULT_TIP_LAMPORTS, DEFAULT_WALLET_COUNT,
};
use crate::errors::VolumeBotError;
use serde::{Deserialize, Serialize};
use solana_sdk::signature::Keypair;
use std::fs;
use std::path::Path;

fn default_tip_lamports() -> u64 {
    DEFAULT_TIP_LAMPORTS
}

fn default_distribute_lamports() -> u64 {
    DEFAULT_DISTRIBUTE_LAMPORTS
}

fn default_slippage_bps() -> u64 {
    BUY_SLIPPAGE_BPS
}

fn default_wallet_count() -> usize {
    DEFAULT_WALLET_COUNT
}

/// Represents the runtime configuration loaded from configs.json
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Configs {
    pub main_wallet_private: String,
    pub rpc_url: String,
    pub block_engine_url: String,
    /// Token mint to trade; may be overridden with --mint.
    #[serde(default)]
    pub token_mint: Option<String>,
    #[serde(default = "default_tip_lamports")]
    pub jito_tip_lamports: u64,
    #[serde(default = "default_distribute_lamports")]
    pub distribute_amount_lamports: u64,
    #[serde(default = "default_slippage_bps")]
    pub slippage_bps: u64,
    /// Minimum quote lamports accepted on sells. Kept at zero by default:
    /// exits are forced through at any price.
    #[serde(default)]
    pub sell_min_quote_out: u64,
    #[serde(default = "default_wallet_count")]
    pub wallet_count: usize,
}

/// Reads the configs.json file and returns a Configs object.
pub fn read_configs<P: AsRef<Path>>(path: P) -> Result<Configs, VolumeBotError> {
    let path = path.as_ref();
    let data = fs::read_to_string(path).map_err(|e| {
        VolumeBotError::Config(format!("Cannot read {}: {}", path.display(), e))
    })?;
    let configs: Configs = serde_json::from_str(&data)
        .map_err(|e| VolumeBotError::Config(format!("Invalid {}: {}", path.display(), e)))?;
    validate_configs(&configs)?;
    Ok(configs)
}

fn validate_configs(configs: &Configs) -> Result<(), VolumeBotError> {
    if configs.rpc_url.is_empty() {
        return Err(VolumeBotError::Config("rpc_url is not set".to_string()));
    }
    if configs.block_engine_url.is_empty() {
        return Err(VolumeBotError::Config("block_engine_url is not set".to_string()));
    }
    if configs.main_wallet_private.is_empty() {
        return Err(VolumeBotError::Config("main_wallet_private is not set".to_string()));
    }
    if configs.slippage_bps > 5_000 {
        crate::logger::warn(
            crate::logger::LogTag::Config,
            &format!(
                "Slippage is set to {}%. Recommended range is 0.1% to 50%.",
                configs.slippage_bps as f64 / 100.0
            ),
        );
    }
    Ok(())
}

/// Load the master wallet keypair from the configs.
///
/// Accepts both the base58 string form and the `[1,2,3,...]` 64-byte array
/// form of the secret key.
pub fn load_wallet_from_config(configs: &Configs) -> Result<Keypair, VolumeBotError> {
    let raw = configs.main_wallet_private.trim();

    let bytes: Vec<u8> = if raw.starts_with('[') && raw.ends_with(']') {
        raw.trim_start_matches('[')
            .trim_end_matches(']')
            .split(',')
            .map(|s| s.trim().parse::<u8>())
            .collect::<Result<Vec<u8>, _>>()
            .map_err(|e| {
                VolumeBotError::Config(format!("Failed to parse private key array: {}", e))
            })?
    } else {
        bs58::decode(raw)
            .into_vec()
            .map_err(|e| VolumeBotError::Config(format!("Invalid base58 private key: {}", e)))?
    };

    if bytes.len() != 64 {
        return Err(VolumeBotError::Config(format!(
            "Invalid private key length: expected 64 bytes, got {}",
            bytes.len()
        )));
    }

    Keypair::try_from(&bytes[..])
        .map_err(|e| VolumeBotError::Config(format!("Failed to create keypair: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_sdk::signer::Signer;

    fn base_configs(private: &str) -> Configs {
        Configs {
            main_wallet_private: private.to_string(),
            rpc_url: "http://localhost:8899".to_string(),
            block_engine_url: "https://mainnet.block-engine.jito.wtf".to_string(),
            token_mint: None,
            jito_tip_lamports: DEFAULT_TIP_LAMPORTS,
            distribute_amount_lamports: DEFAULT_DISTRIBUTE_LAMPORTS,
            slippage_bps: BUY_SLIPPAGE_BPS,
            sell_min_quote_out: 0,
            wallet_count: DEFAULT_WALLET_COUNT,
        }
    }

    #[test]
    fn wallet_loads_from_base58_and_array_forms() {
        let keypair = Keypair::new();
        let base58 = bs58::encode(keypair.to_bytes()).into_string();
        let loaded = load_wallet_from_config(&base_configs(&base58)).unwrap();
        assert_eq!(loaded.pubkey(), keypair.pubkey());

        let array = format!(
            "[{}]",
            keypair
                .to_bytes()
                .iter()
                .map(|b| b.to_string())
                .collect::<Vec<_>>()
                .join(",")
        );
        let loaded = load_wallet_from_config(&base_configs(&array)).unwrap();
        assert_eq!(loaded.pubkey(), keypair.pubkey());
    }

    #[test]
    fn short_keys_are_rejected() {
        let err = load_wallet_from_config(&base_configs("[1,2,3]")).unwrap_err();
        assert!(err.to_string().contains("64 bytes"));
    }

    #[test]
    fn missing_fields_fail_validation() {
        let mut configs = base_configs("x");
        configs.rpc_url = String::new();
        assert!(validate_configs(&configs).is_err());
    }

    #[test]
    fn defaults_apply_when_fields_are_absent() {
        let json = r#"{
            "main_wallet_private": "key",
            "rpc_url": "http://localhost:8899",
            "block_engine_url": "https://mainnet.block-engine.jito.wtf"
        }"#;
        let configs: Configs = serde_json::from_str(json).unwrap();
        assert_eq!(configs.jito_tip_lamports, DEFAULT_TIP_LAMPORTS);
        assert_eq!(configs.distribute_amount_lamports, DEFAULT_DISTRIBUTE_LAMPORTS);
        assert_eq!(configs.sell_min_quote_out, 0);
        assert_eq!(configs.wallet_count, DEFAULT_WALLET_COUNT);
    }
}
