/// Shared address lookup table management.
///
/// One table is shared by all batch flows so repeated account references
/// compress to one-byte indexes. The table only ever grows; extension
/// requests are deduplicated against the on-chain state and clipped to the
/// remaining capacity.
use crate::constants::{
    LUT_CREATION_COST_LAMPORTS, LUT_EXTEND_CHUNK, LUT_MAX_ADDRESSES, LUT_PROPAGATION_DELAY_MS,
    LUT_SLOT_OFFSET,
};
use crate::errors::VolumeBotError;
use crate::helpers::{chunk_array, lamports_to_sol, sleep_ms};
use crate::logger::{self, LogTag};
use crate::rpc::{LedgerRpc, LoadedLookupTable};
use crate::transactions::{check_transaction_size, compile_transaction};
use solana_sdk::address_lookup_table::instruction::{create_lookup_table, extend_lookup_table};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Keypair;
use solana_sdk::signer::Signer;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::str::FromStr;

/// Plans which addresses an extension should append.
///
/// Already-present addresses are dropped, the remainder is clipped to the
/// table's free capacity, preserving request order.
pub fn plan_extension(existing: &[Pubkey], wanted: &[Pubkey]) -> Vec<Pubkey> {
    let present: HashSet<Pubkey> = existing.iter().copied().collect();
    let remaining = LUT_MAX_ADDRESSES.saturating_sub(existing.len());

    let mut seen = HashSet::new();
    wanted
        .iter()
        .filter(|address| !present.contains(address))
        .filter(|address| seen.insert(**address))
        .take(remaining)
        .copied()
        .collect()
}

/// Persist the table address next to the wallet file.
fn save_table_reference(path: &Path, address: &Pubkey) -> Result<(), VolumeBotError> {
    fs::write(path, serde_json::to_string(&address.to_string())?)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Err(e) = fs::set_permissions(path, fs::Permissions::from_mode(0o600)) {
            logger::warn(
                LogTag::Lut,
                &format!("Could not set permissions for {}: {}", path.display(), e),
            );
        }
    }
    Ok(())
}

/// Read the persisted table address.
fn read_table_reference(path: &Path) -> Result<Pubkey, VolumeBotError> {
    if !path.exists() {
        return Err(VolumeBotError::TableNotFound);
    }
    let data = fs::read_to_string(path)?;
    let address: String =
        serde_json::from_str(&data).map_err(|_| VolumeBotError::TableNotFound)?;
    Pubkey::from_str(&address).map_err(|_| VolumeBotError::TableNotFound)
}

/// Creates a new lookup table owned and paid by the master wallet.
///
/// Uses a finalized slot a fixed offset behind the tip so the creation
/// instruction's slot check survives propagation delay. After the creation
/// transaction confirms, the account is not immediately queryable; the call
/// waits a fixed delay before verifying and treats continued absence as
/// `TableCreationFailed`.
pub async fn create_table(
    rpc: &dyn LedgerRpc,
    master: &Keypair,
    tip_lamports: u64,
    reference_path: &Path,
) -> Result<LoadedLookupTable, VolumeBotError> {
    logger::log(LogTag::Lut, "CREATE", "Creating new lookup table...");

    let balance = rpc.get_balance(&master.pubkey()).await.map_err(VolumeBotError::Rpc)?;
    let required = LUT_CREATION_COST_LAMPORTS + tip_lamports;
    if balance < required {
        return Err(VolumeBotError::InsufficientFunds {
            operation: "lookup table creation".to_string(),
            required,
            available: balance,
        });
    }

    let slot = rpc.get_finalized_slot().await.map_err(VolumeBotError::Rpc)?;
    let recent_slot = slot.saturating_sub(LUT_SLOT_OFFSET);
    logger::log(LogTag::Lut, "CREATE", &format!("Using slot {} for table creation", recent_slot));

    let (create_ix, table_address) =
        create_lookup_table(master.pubkey(), master.pubkey(), recent_slot);

    let blockhash = rpc.get_latest_blockhash().await.map_err(VolumeBotError::Rpc)?;
    let tx = compile_transaction(&master.pubkey(), &[create_ix], &[], blockhash, &[master])?;
    check_transaction_size(&tx)?;

    let signature = rpc.send_transaction(&tx).await.map_err(VolumeBotError::Rpc)?;
    logger::log(LogTag::Lut, "CREATE", &format!("Sent table creation tx: {}", signature));

    let confirmed = rpc.confirm_signature(&signature).await.map_err(VolumeBotError::Rpc)?;
    if !confirmed {
        return Err(VolumeBotError::TableCreationFailed(format!(
            "creation transaction {} did not confirm",
            signature
        )));
    }

    save_table_reference(reference_path, &table_address)?;
    logger::log(
        LogTag::Lut,
        "CREATE",
        &format!("Saved table reference {} to {}", table_address, reference_path.display()),
    );

    logger::log(LogTag::Lut, "CREATE", "Waiting for table to become retrievable...");
    sleep_ms(LUT_PROPAGATION_DELAY_MS).await;

    match rpc.get_lookup_table(&table_address).await.map_err(VolumeBotError::Rpc)? {
        Some(table) => {
            logger::log(LogTag::Lut, "CREATE", &format!("Lookup table created: {}", table_address));
            Ok(table)
        }
        None => Err(VolumeBotError::TableCreationFailed(format!(
            "table {} not found after creation delay",
            table_address
        ))),
    }
}

/// Extends the table with any of `accounts` it does not yet contain.
///
/// The addition is clipped to the remaining capacity and split into chunks
/// small enough to keep each extension transaction under the size ceiling.
/// An oversized chunk is skipped with an error, not retried at a smaller
/// granularity; the operator re-invokes.
pub async fn extend_table(
    rpc: &dyn LedgerRpc,
    master: &Keypair,
    table: &LoadedLookupTable,
    accounts: &[Pubkey],
) -> Result<usize, VolumeBotError> {
    let planned = plan_extension(&table.account.addresses, accounts);
    if planned.is_empty() {
        logger::log(LogTag::Lut, "EXTEND", "No new unique accounts to add to the table");
        return Ok(0);
    }

    let remaining = LUT_MAX_ADDRESSES - table.account.addresses.len();
    let dropped = accounts.len().saturating_sub(planned.len());
    logger::log(
        LogTag::Lut,
        "EXTEND",
        &format!(
            "Adding {} new accounts ({} slots remaining, {} dropped)",
            planned.len(),
            remaining,
            dropped
        ),
    );

    let blockhash = rpc.get_latest_blockhash().await.map_err(VolumeBotError::Rpc)?;
    let mut added = 0usize;

    for (index, chunk) in chunk_array(&planned, LUT_EXTEND_CHUNK).into_iter().enumerate() {
        let extend_ix = extend_lookup_table(
            table.account.key,
            master.pubkey(),
            Some(master.pubkey()),
            chunk.clone(),
        );

        let tx = compile_transaction(&master.pubkey(), &[extend_ix], &[], blockhash, &[master])?;
        if let Err(e) = check_transaction_size(&tx) {
            logger::error(LogTag::Lut, &format!("Extend chunk {} too large, skipping: {}", index, e));
            continue;
        }

        match rpc.send_transaction(&tx).await {
            Ok(signature) => {
                logger::log(LogTag::Lut, "EXTEND", &format!("Sent extend tx: {}", signature));
                added += chunk.len();
            }
            Err(e) => {
                logger::error(LogTag::Lut, &format!("Error extending table (chunk {}): {}", index, e));
                continue;
            }
        }
    }

    Ok(added)
}

/// Loads the shared table from the persisted reference.
///
/// `TableNotFound` is recoverable: the caller may fall back to `create`.
pub async fn load_table(
    rpc: &dyn LedgerRpc,
    reference_path: &Path,
) -> Result<LoadedLookupTable, VolumeBotError> {
    logger::log(LogTag::Lut, "LOAD", "Loading lookup table...");
    let address = read_table_reference(reference_path)?;
    logger::log(LogTag::Lut, "LOAD", &format!("Table address from file: {}", address));

    match rpc.get_lookup_table(&address).await.map_err(VolumeBotError::Rpc)? {
        Some(table) => {
            logger::log(
                LogTag::Lut,
                "LOAD",
                &format!(
                    "Loaded table with {} addresses, last extended slot {}",
                    table.account.addresses.len(),
                    table.last_extended_slot
                ),
            );
            Ok(table)
        }
        None => {
            logger::error(LogTag::Lut, &format!("Lookup table {} not found on-chain", address));
            Err(VolumeBotError::TableNotFound)
        }
    }
}

/// Log the estimated creation cost for operator visibility.
pub fn log_creation_cost(tip_lamports: u64) {
    logger::debug(
        LogTag::Lut,
        &format!(
            "Table creation requires about {:.5} SOL plus {:.5} SOL tip",
            lamports_to_sol(LUT_CREATION_COST_LAMPORTS),
            lamports_to_sol(tip_lamports)
        ),
    );
}
