/// Per-wallet buy/sell cycle orchestration.
///
/// Each wallet is classified from its live balance (skip / skim / trade) and
/// processed sequentially; a failed buy or sell aborts only that wallet's
/// cycle. Swap transactions go out through the bundle relay, skim transfers
/// go straight to the RPC.
use super::instructions::{build_buy_instruction, build_sell_instruction};
use crate::constants::{
    CU_LIMIT_SWAP, CU_PRICE_MICROLAMPORTS, DUST_FLOOR_LAMPORTS, FEE_RESERVE_LAMPORTS,
    SKIM_KEEP_LAMPORTS, SKIM_THRESHOLD_LAMPORTS, SWAP_BATCH_SIZE, SWAP_JITTER_MAX,
    SWAP_JITTER_MIN, SWAP_WAIT_MAX_MS, SWAP_WAIT_MIN_MS,
};
use crate::errors::VolumeBotError;
use crate::helpers::{chunk_count, lamports_to_sol, short_pubkey, sleep_ms};
use crate::jito::BundleSubmitter;
use crate::logger::{self, LogTag};
use crate::pool::types::Pool;
use crate::pool::{calculate_with_slippage_buy, get_buy_token_amount, get_price_and_reserves};
use crate::pool::price::reserves_in_raw_units;
use crate::rpc::LedgerRpc;
use crate::transactions::{check_transaction_size, compile_transaction};
use rand::Rng;
use solana_sdk::{
    compute_budget::ComputeBudgetInstruction,
    instruction::Instruction,
    pubkey::Pubkey,
    signature::Keypair,
    signer::Signer,
    system_instruction,
};
use spl_associated_token_account::{
    get_associated_token_address, instruction::create_associated_token_account_idempotent,
};

/// What the cycle does with a wallet at its current balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalletAction {
    /// Not enough balance to cover fees; issue nothing.
    Skip,
    /// Balance above the skim threshold; transfer the excess to the master.
    Skim { lamports: u64 },
    /// Trade with this much available after the fee reserve.
    Trade { available: u64 },
}

/// Balance-based branching, independent of any randomness.
pub fn classify_wallet(balance: u64) -> WalletAction {
    if balance <= FEE_RESERVE_LAMPORTS {
        WalletAction::Skip
    } else if balance >= SKIM_THRESHOLD_LAMPORTS {
        WalletAction::Skim { lamports: balance - SKIM_KEEP_LAMPORTS }
    } else {
        WalletAction::Trade { available: balance - FEE_RESERVE_LAMPORTS }
    }
}

/// Draws the jittered swap amount for an available balance.
/// Returns None when the draw lands below the dust floor.
pub fn draw_swap_amount<R: Rng>(available: u64, rng: &mut R) -> Option<u64> {
    let fraction = rng.gen_range(SWAP_JITTER_MIN..SWAP_JITTER_MAX);
    let amount = (available as f64 * fraction).floor() as u64;
    if amount <= DUST_FLOOR_LAMPORTS {
        None
    } else {
        Some(amount)
    }
}

/// Tunables carried by the orchestrator.
#[derive(Debug, Clone)]
pub struct SwapSettings {
    pub slippage_bps: u64,
    /// Minimum quote lamports accepted on sells. Zero forces the exit
    /// through at any price.
    pub sell_min_quote_out: u64,
}

pub struct SwapOrchestrator<'a> {
    rpc: &'a dyn LedgerRpc,
    submitter: &'a BundleSubmitter,
    pool: &'a Pool,
    mint: Pubkey,
    master: &'a Keypair,
    settings: SwapSettings,
}

impl<'a> SwapOrchestrator<'a> {
    pub fn new(
        rpc: &'a dyn LedgerRpc,
        submitter: &'a BundleSubmitter,
        pool: &'a Pool,
        mint: Pubkey,
        master: &'a Keypair,
        settings: SwapSettings,
    ) -> Self {
        Self { rpc, submitter, pool, mint, master, settings }
    }

    /// Runs one buy/sell cycle over all wallets, sequentially.
    ///
    /// Per-wallet failures are caught and logged; the cycle always visits
    /// every wallet.
    pub async fn run_cycle(&self, wallets: &[Keypair]) -> Result<(), VolumeBotError> {
        if wallets.is_empty() {
            return Err(VolumeBotError::NoWalletsAvailable);
        }

        let total_chunks = chunk_count(wallets.len(), SWAP_BATCH_SIZE);
        logger::log(
            LogTag::Swap,
            "CYCLE",
            &format!("Processing {} wallets in {} chunks", wallets.len(), total_chunks),
        );

        for (chunk_index, chunk) in wallets.chunks(SWAP_BATCH_SIZE).enumerate() {
            logger::log(
                LogTag::Swap,
                "CHUNK",
                &format!("Chunk {}/{} ({} wallets)", chunk_index + 1, total_chunks, chunk.len()),
            );

            for wallet in chunk {
                if let Err(e) = self.process_wallet(wallet).await {
                    logger::error(
                        LogTag::Swap,
                        &format!("Wallet {} cycle aborted: {}", short_pubkey(&wallet.pubkey()), e),
                    );
                }
            }
        }

        logger::log(LogTag::Swap, "CYCLE", "Swap cycle completed");
        Ok(())
    }

    async fn process_wallet(&self, wallet: &Keypair) -> Result<(), VolumeBotError> {
        let balance = self
            .rpc
            .get_balance(&wallet.pubkey())
            .await
            .map_err(VolumeBotError::Rpc)?;

        logger::log(
            LogTag::Swap,
            "WALLET",
            &format!("{}: {:.6} SOL", short_pubkey(&wallet.pubkey()), lamports_to_sol(balance)),
        );

        match classify_wallet(balance) {
            WalletAction::Skip => {
                logger::log(
                    LogTag::Swap,
                    "SKIP",
                    &format!(
                        "{}: insufficient balance for a swap",
                        short_pubkey(&wallet.pubkey())
                    ),
                );
                Ok(())
            }
            WalletAction::Skim { lamports } => self.skim_excess(wallet, lamports).await,
            WalletAction::Trade { available } => {
                let Some(swap_lamports) = draw_swap_amount(available, &mut rand::thread_rng())
                else {
                    logger::log(
                        LogTag::Swap,
                        "SKIP",
                        &format!("{}: amount too low for a swap", short_pubkey(&wallet.pubkey())),
                    );
                    return Ok(());
                };

                logger::log(
                    LogTag::Swap,
                    "TRADE",
                    &format!(
                        "{}: swapping {:.6} SOL",
                        short_pubkey(&wallet.pubkey()),
                        lamports_to_sol(swap_lamports)
                    ),
                );

                self.buy(wallet, swap_lamports).await.map_err(|e| {
                    VolumeBotError::SwapStepFailure {
                        wallet: short_pubkey(&wallet.pubkey()),
                        step: "buy".to_string(),
                        reason: e.to_string(),
                    }
                })?;

                let wait_ms =
                    rand::thread_rng().gen_range(SWAP_WAIT_MIN_MS..=SWAP_WAIT_MAX_MS);
                logger::log(
                    LogTag::Swap,
                    "WAIT",
                    &format!("Waiting {}ms before selling...", wait_ms),
                );
                sleep_ms(wait_ms).await;

                self.sell_percentage(wallet, 1.0).await.map_err(|e| {
                    VolumeBotError::SwapStepFailure {
                        wallet: short_pubkey(&wallet.pubkey()),
                        step: "sell".to_string(),
                        reason: e.to_string(),
                    }
                })?;

                logger::log(
                    LogTag::Swap,
                    "DONE",
                    &format!("Completed buy/sell cycle for {}", short_pubkey(&wallet.pubkey())),
                );
                Ok(())
            }
        }
    }

    /// Transfers a wallet's excess balance back to the master. Plain
    /// transfer, no swap, submitted directly without the relay.
    async fn skim_excess(&self, wallet: &Keypair, lamports: u64) -> Result<(), VolumeBotError> {
        logger::log(
            LogTag::Swap,
            "SKIM",
            &format!(
                "{}: transferring {:.6} SOL excess to master",
                short_pubkey(&wallet.pubkey()),
                lamports_to_sol(lamports)
            ),
        );

        let transfer_ix =
            system_instruction::transfer(&wallet.pubkey(), &self.master.pubkey(), lamports);
        let blockhash = self.rpc.get_latest_blockhash().await.map_err(VolumeBotError::Rpc)?;
        let tx =
            compile_transaction(&wallet.pubkey(), &[transfer_ix], &[], blockhash, &[wallet])?;
        check_transaction_size(&tx)?;

        match self.rpc.send_transaction(&tx).await {
            Ok(signature) => {
                logger::log(LogTag::Swap, "SKIM", &format!("Excess transfer tx: {}", signature));
                Ok(())
            }
            Err(e) => {
                logger::error(LogTag::Swap, &format!("Error transferring excess: {}", e));
                Ok(())
            }
        }
    }

    fn swap_prelude(&self, wallet: &Pubkey) -> Vec<Instruction> {
        vec![
            ComputeBudgetInstruction::set_compute_unit_limit(CU_LIMIT_SWAP),
            ComputeBudgetInstruction::set_compute_unit_price(CU_PRICE_MICROLAMPORTS),
            create_associated_token_account_idempotent(
                wallet,
                wallet,
                &self.mint,
                &spl_token::ID,
            ),
        ]
    }

    /// Buys `lamports_in` worth of the token for `wallet`.
    ///
    /// The expected output is estimated from live reserves, reduced by the
    /// configured slippage, and relayed as an atomic bundle.
    pub async fn buy(&self, wallet: &Keypair, lamports_in: u64) -> Result<(), VolumeBotError> {
        let priced = get_price_and_reserves(self.rpc, self.pool).await?;
        let (native_reserve, token_reserve) = reserves_in_raw_units(&priced.reserves);

        let estimated_out = get_buy_token_amount(native_reserve, token_reserve, lamports_in);
        let min_out = calculate_with_slippage_buy(estimated_out, self.settings.slippage_bps);

        logger::log(
            LogTag::Swap,
            "BUY",
            &format!(
                "{}: {:.6} SOL for ~{} tokens (min {} after {} bps)",
                short_pubkey(&wallet.pubkey()),
                lamports_to_sol(lamports_in),
                estimated_out,
                min_out,
                self.settings.slippage_bps
            ),
        );

        let mut instructions = self.swap_prelude(&wallet.pubkey());
        instructions.push(build_buy_instruction(
            &self.pool.address,
            &wallet.pubkey(),
            &self.mint,
            min_out,
            lamports_in,
        ));

        let blockhash = self.rpc.get_latest_blockhash().await.map_err(VolumeBotError::Rpc)?;
        let tx =
            compile_transaction(&wallet.pubkey(), &instructions, &[], blockhash, &[wallet])?;
        check_transaction_size(&tx)?;

        let receipt = self
            .submitter
            .submit(&tx, false, wallet, &self.pool.address, blockhash)
            .await;
        receipt.log();
        Ok(())
    }

    /// Sells a fraction of the wallet's live token holdings.
    ///
    /// The balance is read immediately before building the instruction, not
    /// taken from a cached estimate.
    pub async fn sell_percentage(
        &self,
        wallet: &Keypair,
        fraction: f64,
    ) -> Result<(), VolumeBotError> {
        let ata = get_associated_token_address(&wallet.pubkey(), &self.mint);
        let holding = match self.rpc.get_token_balance(&ata).await {
            Ok(balance) => balance.amount,
            // No token account yet means nothing to sell.
            Err(_) => 0,
        };

        let sell_amount = (holding as f64 * fraction).floor() as u64;
        if sell_amount == 0 {
            logger::log(
                LogTag::Swap,
                "SELL",
                &format!("{}: no tokens to sell, skipping", short_pubkey(&wallet.pubkey())),
            );
            return Ok(());
        }

        self.sell_exact_amount(wallet, sell_amount).await
    }

    /// Sells an exact raw token amount.
    pub async fn sell_exact_amount(
        &self,
        wallet: &Keypair,
        token_amount: u64,
    ) -> Result<(), VolumeBotError> {
        logger::log(
            LogTag::Swap,
            "SELL",
            &format!(
                "{}: selling {} tokens (min quote out {})",
                short_pubkey(&wallet.pubkey()),
                token_amount,
                self.settings.sell_min_quote_out
            ),
        );

        let mut instructions = self.swap_prelude(&wallet.pubkey());
        instructions.push(build_sell_instruction(
            &self.pool.address,
            &wallet.pubkey(),
            &self.mint,
            token_amount,
            self.settings.sell_min_quote_out,
        ));

        let blockhash = self.rpc.get_latest_blockhash().await.map_err(VolumeBotError::Rpc)?;
        let tx =
            compile_transaction(&wallet.pubkey(), &instructions, &[], blockhash, &[wallet])?;
        check_transaction_size(&tx)?;

        let receipt = self
            .submitter
            .submit(&tx, true, wallet, &self.pool.address, blockhash)
            .await;
        receipt.log();
        Ok(())
    }

    /// Sells every wallet's full holdings. Failures are per-wallet.
    pub async fn sell_all(&self, wallets: &[Keypair]) -> Result<(), VolumeBotError> {
        if wallets.is_empty() {
            return Err(VolumeBotError::NoWalletsAvailable);
        }

        logger::log(LogTag::Swap, "SELLALL", "Selling all tokens from wallets...");
        for wallet in wallets {
            match self.sell_percentage(wallet, 1.0).await {
                Ok(()) => logger::log(
                    LogTag::Swap,
                    "SELLALL",
                    &format!("Sold holdings for {}", short_pubkey(&wallet.pubkey())),
                ),
                Err(e) => logger::error(
                    LogTag::Swap,
                    &format!(
                        "Error selling for {}: {}",
                        short_pubkey(&wallet.pubkey()),
                        e
                    ),
                ),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::LAMPORTS_PER_SOL;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn balance_equal_to_fee_reserve_is_a_skip() {
        assert_eq!(classify_wallet(FEE_RESERVE_LAMPORTS), WalletAction::Skip);
        assert_eq!(classify_wallet(0), WalletAction::Skip);
        assert_eq!(classify_wallet(FEE_RESERVE_LAMPORTS - 1), WalletAction::Skip);
    }

    #[test]
    fn one_lamport_over_the_reserve_trades() {
        assert_eq!(
            classify_wallet(FEE_RESERVE_LAMPORTS + 1),
            WalletAction::Trade { available: 1 }
        );
    }

    #[test]
    fn balance_above_half_sol_is_skimmed() {
        // 0.6 SOL skims balance minus the 0.005 SOL keep-back.
        let balance = 600_000_000;
        assert_eq!(
            classify_wallet(balance),
            WalletAction::Skim { lamports: balance - 5_000_000 }
        );

        // Exactly at the threshold also skims.
        assert_eq!(
            classify_wallet(SKIM_THRESHOLD_LAMPORTS),
            WalletAction::Skim { lamports: SKIM_THRESHOLD_LAMPORTS - SKIM_KEEP_LAMPORTS }
        );

        // Just below it trades.
        assert!(matches!(
            classify_wallet(SKIM_THRESHOLD_LAMPORTS - 1),
            WalletAction::Trade { .. }
        ));
    }

    #[test]
    fn swap_amount_stays_inside_the_jitter_band() {
        let mut rng = StdRng::seed_from_u64(7);
        let available = LAMPORTS_PER_SOL / 100; // 0.01 SOL

        for _ in 0..200 {
            let amount = draw_swap_amount(available, &mut rng).unwrap();
            assert!(amount >= (available as f64 * SWAP_JITTER_MIN).floor() as u64 - 1);
            assert!(amount <= (available as f64 * SWAP_JITTER_MAX) as u64);
        }
    }

    #[test]
    fn dust_draws_are_rejected() {
        let mut rng = StdRng::seed_from_u64(7);
        // 0.8 * 1000 = 800 <= dust floor, every draw lands below it.
        for _ in 0..50 {
            assert_eq!(draw_swap_amount(1_000, &mut rng), None);
        }
    }
}
