/// Disposable trading wallet pool.
///
/// Wallets are generated once, persisted to wallets.json as a JSON array of
/// base58-encoded 64-byte secret keys, and loaded by truncation to the
/// requested count. Wallets are never deleted here; drained wallets stay in
/// the file for future reuse.
use crate::errors::VolumeBotError;
use crate::helpers::short_pubkey;
use crate::logger::{self, LogTag};
use solana_sdk::signature::Keypair;
use solana_sdk::signer::Signer;
use std::fs;
use std::path::Path;

/// Generates `total` fresh keypairs and persists their secret keys.
///
/// The file is set to owner-read-only where the platform supports it; a
/// permission failure is a warning, not fatal.
pub fn generate_wallets<P: AsRef<Path>>(path: P, total: usize) -> Result<Vec<Keypair>, VolumeBotError> {
    let path = path.as_ref();
    logger::log(LogTag::Wallet, "CREATE", &format!("Creating {} new wallets...", total));

    let keypairs: Vec<Keypair> = (0..total).map(|_| Keypair::new()).collect();
    let encoded: Vec<String> = keypairs
        .iter()
        .map(|kp| bs58::encode(kp.to_bytes()).into_string())
        .collect();

    let json = serde_json::to_string_pretty(&encoded)?;
    fs::write(path, json)?;
    set_owner_read_only(path);

    logger::log(
        LogTag::Wallet,
        "CREATE",
        &format!("Created {} and saved {} wallets", path.display(), keypairs.len()),
    );
    Ok(keypairs)
}

/// Loads up to `total` wallets from the persisted file.
///
/// Entries that fail to decode are skipped with a warning; zero decodable
/// entries (or a missing file) is `NoWalletsAvailable`.
pub fn load_wallets<P: AsRef<Path>>(path: P, total: usize) -> Result<Vec<Keypair>, VolumeBotError> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(VolumeBotError::NoWalletsAvailable);
    }

    let data = fs::read_to_string(path)?;
    let encoded: Vec<String> = serde_json::from_str(&data)?;

    let mut keypairs = Vec::new();
    for secret in &encoded {
        match decode_keypair(secret) {
            Ok(keypair) => {
                keypairs.push(keypair);
                if keypairs.len() >= total {
                    break;
                }
            }
            Err(e) => {
                logger::warn(LogTag::Wallet, &format!("Skipping undecodable wallet entry: {}", e));
            }
        }
    }

    if keypairs.is_empty() {
        return Err(VolumeBotError::NoWalletsAvailable);
    }

    logger::log(LogTag::Wallet, "LOAD", &format!("{} wallets are loaded", keypairs.len()));
    Ok(keypairs)
}

/// Loads wallets, generating the file first when it does not exist.
pub fn load_or_create_wallets<P: AsRef<Path>>(
    path: P,
    total: usize,
) -> Result<Vec<Keypair>, VolumeBotError> {
    let path = path.as_ref();
    if !path.exists() {
        logger::log(
            LogTag::Wallet,
            "CREATE",
            &format!("{} not found. Creating new wallets.", path.display()),
        );
        generate_wallets(path, total)?;
    }
    load_wallets(path, total)
}

fn decode_keypair(secret: &str) -> Result<Keypair, VolumeBotError> {
    let bytes = bs58::decode(secret)
        .into_vec()
        .map_err(|e| VolumeBotError::Wallet(format!("bad base58: {}", e)))?;
    if bytes.len() != 64 {
        return Err(VolumeBotError::Wallet(format!(
            "expected 64 secret bytes, got {}",
            bytes.len()
        )));
    }
    Keypair::try_from(&bytes[..]).map_err(|e| VolumeBotError::Wallet(e.to_string()))
}

#[cfg(unix)]
fn set_owner_read_only(path: &Path) {
    use std::os::unix::fs::PermissionsExt;
    match fs::set_permissions(path, fs::Permissions::from_mode(0o400)) {
        Ok(_) => logger::log(
            LogTag::Wallet,
            "CHMOD",
            &format!("Set {} permissions to read-only for owner", path.display()),
        ),
        Err(e) => logger::warn(
            LogTag::Wallet,
            &format!("Could not set permissions for {}: {}", path.display(), e),
        ),
    }
}

#[cfg(not(unix))]
fn set_owner_read_only(path: &Path) {
    logger::warn(
        LogTag::Wallet,
        &format!("Restrictive permissions not supported for {} on this platform", path.display()),
    );
}

/// Log a one-line balance summary for a wallet.
pub fn log_wallet_balance(keypair: &Keypair, lamports: u64) {
    logger::log(
        LogTag::Wallet,
        "BALANCE",
        &format!(
            "Wallet {}: {:.6} SOL",
            short_pubkey(&keypair.pubkey()),
            crate::helpers::lamports_to_sol(lamports)
        ),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn generate_then_load_round_trips_in_order() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("wallets.json");

        let generated = generate_wallets(&path, 5).unwrap();
        let loaded = load_wallets(&path, 5).unwrap();
        let generated_keys: Vec<_> = generated.iter().map(|k| k.pubkey()).collect();
        let loaded_keys: Vec<_> = loaded.iter().map(|k| k.pubkey()).collect();
        assert_eq!(generated_keys, loaded_keys);

        // Loading twice yields identical keys in the same order.
        let reloaded = load_wallets(&path, 5).unwrap();
        let reloaded_keys: Vec<_> = reloaded.iter().map(|k| k.pubkey()).collect();
        assert_eq!(loaded_keys, reloaded_keys);
    }

    #[test]
    fn load_truncates_to_requested_count() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("wallets.json");

        generate_wallets(&path, 10).unwrap();
        let loaded = load_wallets(&path, 3).unwrap();
        assert_eq!(loaded.len(), 3);
    }

    #[test]
    fn missing_file_is_no_wallets_available() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("absent.json");
        assert!(matches!(
            load_wallets(&path, 5),
            Err(VolumeBotError::NoWalletsAvailable)
        ));
    }

    #[test]
    fn corrupt_entries_are_skipped_not_fatal() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("wallets.json");

        let keypair = Keypair::new();
        let entries = vec![
            "not-a-valid-secret".to_string(),
            bs58::encode(keypair.to_bytes()).into_string(),
        ];
        fs::write(&path, serde_json::to_string(&entries).unwrap()).unwrap();

        let loaded = load_wallets(&path, 5).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].pubkey(), keypair.pubkey());
    }

    #[test]
    fn all_corrupt_entries_is_no_wallets_available() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("wallets.json");
        fs::write(&path, r#"["bad", "worse"]"#).unwrap();
        assert!(matches!(
            load_wallets(&path, 5),
            Err(VolumeBotError::NoWalletsAvailable)
        ));
    }

    #[test]
    fn load_or_create_generates_on_miss() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("wallets.json");
        let wallets = load_or_create_wallets(&path, 4).unwrap();
        assert_eq!(wallets.len(), 4);
        assert!(path.exists());
    }
}
