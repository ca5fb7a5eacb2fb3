/// SOL distribution and collection between the master wallet and the pool
/// of trading wallets.
///
/// Both flows compile through the batch builder against the shared lookup
/// table and go straight to the RPC; the bundle relay is not involved.
use crate::constants::{FEE_RESERVE_LAMPORTS, TRANSFER_BATCH_SIZE};
use crate::errors::VolumeBotError;
use crate::helpers::{lamports_to_sol, short_pubkey};
use crate::logger::{self, LogTag};
use crate::rpc::{LedgerRpc, LoadedLookupTable};
use crate::transactions::{chunk_and_build, InstructionSet};
use solana_sdk::{
    pubkey::Pubkey, signature::Keypair, signer::Signer, system_instruction,
};

/// Distributes a fixed amount of SOL from the master to every wallet.
///
/// Preconditions are fatal to the operation: the per-wallet amount must
/// exceed the fee reserve, and the master must hold the full total plus the
/// relay tip.
pub async fn distribute_sol(
    rpc: &dyn LedgerRpc,
    master: &Keypair,
    wallets: &[Keypair],
    table: &LoadedLookupTable,
    amount_lamports: u64,
    tip_lamports: u64,
) -> Result<usize, VolumeBotError> {
    logger::log(LogTag::Funding, "DIST", "Distributing SOL to trading wallets...");

    if amount_lamports <= FEE_RESERVE_LAMPORTS {
        logger::error(
            LogTag::Funding,
            &format!(
                "Distribute amount per wallet should be larger than {:.5} SOL to cover fees",
                lamports_to_sol(FEE_RESERVE_LAMPORTS)
            ),
        );
        return Err(VolumeBotError::InsufficientFunds {
            operation: "distribution amount".to_string(),
            required: FEE_RESERVE_LAMPORTS + 1,
            available: amount_lamports,
        });
    }
    if wallets.is_empty() {
        return Err(VolumeBotError::NoWalletsAvailable);
    }

    let recipients: Vec<&Keypair> =
        wallets.iter().filter(|w| w.pubkey() != master.pubkey()).collect();
    if recipients.is_empty() {
        logger::log(LogTag::Funding, "DIST", "No sub-wallets to distribute to");
        return Ok(0);
    }

    let total_required = amount_lamports * recipients.len() as u64 + tip_lamports;
    let master_balance =
        rpc.get_balance(&master.pubkey()).await.map_err(VolumeBotError::Rpc)?;
    if master_balance < total_required {
        logger::error(
            LogTag::Funding,
            &format!(
                "Insufficient SOL in master wallet: need {:.5} SOL, have {:.5} SOL",
                lamports_to_sol(total_required),
                lamports_to_sol(master_balance)
            ),
        );
        return Err(VolumeBotError::InsufficientFunds {
            operation: "distribution".to_string(),
            required: total_required,
            available: master_balance,
        });
    }

    // Master pays and signs everything; wallets only receive.
    let sets: Vec<InstructionSet> = recipients
        .iter()
        .map(|&wallet| InstructionSet {
            wallet,
            instructions: vec![system_instruction::transfer(
                &master.pubkey(),
                &wallet.pubkey(),
                amount_lamports,
            )],
        })
        .collect();

    let blockhash = rpc.get_latest_blockhash().await.map_err(VolumeBotError::Rpc)?;
    let transactions = chunk_and_build(
        master,
        sets,
        TRANSFER_BATCH_SIZE,
        std::slice::from_ref(&table.account),
        blockhash,
    );

    let mut sent = 0usize;
    for tx in &transactions {
        match rpc.send_transaction(tx).await {
            Ok(signature) => {
                logger::log(LogTag::Funding, "DIST", &format!("Sent distribution tx: {}", signature));
                let confirmed =
                    rpc.confirm_signature(&signature).await.map_err(VolumeBotError::Rpc)?;
                if confirmed {
                    sent += 1;
                } else {
                    logger::error(
                        LogTag::Funding,
                        &format!("Distribution tx {} did not confirm", signature),
                    );
                }
            }
            Err(e) => {
                logger::error(LogTag::Funding, &format!("Error distributing SOL: {}", e));
            }
        }
    }

    logger::log(
        LogTag::Funding,
        "DIST",
        &format!(
            "Distributed {:.5} SOL per wallet across {} transactions",
            lamports_to_sol(amount_lamports),
            sent
        ),
    );
    Ok(sent)
}

/// Collects every wallet's full balance back into the master wallet.
///
/// The master pays the fees so drained wallets can be emptied completely.
/// Per-chunk failures are logged and skipped; the sweep continues.
pub async fn collect_sol(
    rpc: &dyn LedgerRpc,
    master: &Keypair,
    wallets: &[Keypair],
    table: &LoadedLookupTable,
) -> Result<usize, VolumeBotError> {
    logger::log(LogTag::Funding, "COLLECT", "Collecting SOL from trading wallets...");

    if wallets.is_empty() {
        return Err(VolumeBotError::NoWalletsAvailable);
    }

    // Snapshot balances first so empty wallets do not bloat the batches.
    let mut funded: Vec<(&Keypair, u64)> = Vec::new();
    for wallet in wallets {
        if wallet.pubkey() == master.pubkey() {
            continue;
        }
        let balance =
            rpc.get_balance(&wallet.pubkey()).await.map_err(VolumeBotError::Rpc)?;
        if balance > 0 {
            funded.push((wallet, balance));
        }
    }

    if funded.is_empty() {
        logger::log(LogTag::Funding, "COLLECT", "No funded wallets to collect from");
        return Ok(0);
    }
    logger::log(
        LogTag::Funding,
        "COLLECT",
        &format!("{} wallets hold residual SOL", funded.len()),
    );

    let sets: Vec<InstructionSet> = funded
        .iter()
        .map(|&(wallet, balance)| InstructionSet {
            wallet,
            instructions: vec![system_instruction::transfer(
                &wallet.pubkey(),
                &master.pubkey(),
                balance,
            )],
        })
        .collect();

    let blockhash = rpc.get_latest_blockhash().await.map_err(VolumeBotError::Rpc)?;
    let transactions = chunk_and_build(
        master,
        sets,
        TRANSFER_BATCH_SIZE,
        std::slice::from_ref(&table.account),
        blockhash,
    );

    let mut sent = 0usize;
    for tx in &transactions {
        match rpc.send_transaction(tx).await {
            Ok(signature) => {
                logger::log(LogTag::Funding, "COLLECT", &format!("Sent collection tx: {}", signature));
                sent += 1;
            }
            Err(e) => {
                logger::error(LogTag::Funding, &format!("Error during collection: {}", e));
            }
        }
    }

    Ok(sent)
}

/// Logs each wallet's balance, for operator inspection before a cycle.
pub async fn report_balances(
    rpc: &dyn LedgerRpc,
    master: &Keypair,
    wallets: &[Keypair],
) -> Result<u64, VolumeBotError> {
    let master_balance =
        rpc.get_balance(&master.pubkey()).await.map_err(VolumeBotError::Rpc)?;
    logger::log(
        LogTag::Funding,
        "BALANCE",
        &format!(
            "Master {}: {:.6} SOL",
            short_pubkey(&master.pubkey()),
            lamports_to_sol(master_balance)
        ),
    );

    let mut total = master_balance;
    for wallet in wallets {
        let balance =
            rpc.get_balance(&wallet.pubkey()).await.map_err(VolumeBotError::Rpc)?;
        crate::wallets::log_wallet_balance(wallet, balance);
        total += balance;
    }
    Ok(total)
}
