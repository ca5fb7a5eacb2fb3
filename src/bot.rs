/// Top-level bot state machine.
///
/// Setup steps (pool discovery, wallet loading, lookup table loading) are
/// explicit: operations check their preconditions and return a typed
/// `NotReady` error instead of silently loading missing state. `main`
/// sequences the steps; nothing is lazily re-entered mid-operation.
use crate::config::Configs;
use crate::constants::{LUT_FILE, WALLETS_FILE};
use crate::errors::VolumeBotError;
use crate::funding;
use crate::helpers::lamports_to_sol;
use crate::jito::BundleSubmitter;
use crate::logger::{self, LogTag};
use crate::lut;
use crate::pool::types::{Pool, ProbeResult};
use crate::pool::{self, get_pools_with_prices};
use crate::rpc::{LedgerRpc, LoadedLookupTable};
use crate::swap::{SwapOrchestrator, SwapSettings};
use crate::wallets;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Keypair;
use solana_sdk::signer::Signer;
use spl_associated_token_account::get_associated_token_address;
use spl_token::native_mint;
use std::path::PathBuf;

pub struct VolumeBot<'a> {
    rpc: &'a dyn LedgerRpc,
    configs: Configs,
    master: Keypair,
    mint: Pubkey,
    submitter: BundleSubmitter,
    wallets_path: PathBuf,
    lut_path: PathBuf,

    // Setup state, populated by the explicit setup steps below.
    pool: Option<Pool>,
    wallets: Vec<Keypair>,
    table: Option<LoadedLookupTable>,
}

impl<'a> VolumeBot<'a> {
    pub fn new(
        rpc: &'a dyn LedgerRpc,
        configs: Configs,
        master: Keypair,
        mint: Pubkey,
    ) -> Self {
        let submitter = BundleSubmitter::new(
            &configs.block_engine_url,
            configs.jito_tip_lamports,
            Vec::new(),
        );
        Self {
            rpc,
            configs,
            master,
            mint,
            submitter,
            wallets_path: PathBuf::from(WALLETS_FILE),
            lut_path: PathBuf::from(LUT_FILE),
            pool: None,
            wallets: Vec::new(),
            table: None,
        }
    }

    fn pool(&self) -> Result<&Pool, VolumeBotError> {
        self.pool
            .as_ref()
            .ok_or_else(|| VolumeBotError::NotReady { what: "Pool".to_string() })
    }

    fn table(&self) -> Result<&LoadedLookupTable, VolumeBotError> {
        self.table
            .as_ref()
            .ok_or_else(|| VolumeBotError::NotReady { what: "Lookup table".to_string() })
    }

    fn loaded_wallets(&self) -> Result<&[Keypair], VolumeBotError> {
        if self.wallets.is_empty() {
            return Err(VolumeBotError::NotReady { what: "Wallets".to_string() });
        }
        Ok(&self.wallets)
    }

    // =========================================================================
    // Setup steps
    // =========================================================================

    /// Fetches the tip account list from the relay; keeps the fallback on
    /// failure.
    pub async fn refresh_tip_accounts(&mut self) {
        if let Err(e) = self.submitter.refresh_tip_accounts().await {
            logger::warn(LogTag::Bundle, &format!("Failed to load tip accounts: {}", e));
        }
    }

    /// Locates the pool for the configured mint and reports its pricing.
    pub async fn discover_pool(&mut self) -> Result<(), VolumeBotError> {
        logger::log(LogTag::Pool, "SETUP", &format!("Getting pool data for {}", self.mint));

        let found = pool::find_pool(self.rpc, &self.mint).await?;
        let priced = pool::get_price_and_reserves(self.rpc, &found).await?;
        logger::log(
            LogTag::Pool,
            "SETUP",
            &format!(
                "Pool {}: price {:.9} SOL, reserves {:.4} SOL / {:.2} tokens",
                found.address, priced.price, priced.reserves.native, priced.reserves.token
            ),
        );

        self.pool = Some(found);
        Ok(())
    }

    pub fn generate_wallets(&mut self, count: usize) -> Result<(), VolumeBotError> {
        self.wallets = wallets::generate_wallets(&self.wallets_path, count)?;
        Ok(())
    }

    pub fn load_wallets(&mut self, count: usize) -> Result<(), VolumeBotError> {
        self.wallets = wallets::load_wallets(&self.wallets_path, count)?;
        Ok(())
    }

    pub fn load_or_create_wallets(&mut self, count: usize) -> Result<(), VolumeBotError> {
        self.wallets = wallets::load_or_create_wallets(&self.wallets_path, count)?;
        Ok(())
    }

    pub async fn create_lut(&mut self) -> Result<(), VolumeBotError> {
        lut::log_creation_cost(self.configs.jito_tip_lamports);
        let table = lut::create_table(
            self.rpc,
            &self.master,
            self.configs.jito_tip_lamports,
            &self.lut_path,
        )
        .await?;
        self.table = Some(table);
        Ok(())
    }

    pub async fn load_lut(&mut self) -> Result<(), VolumeBotError> {
        self.table = Some(lut::load_table(self.rpc, &self.lut_path).await?);
        Ok(())
    }

    /// Loads the table, creating it when the reference is missing.
    pub async fn load_or_create_lut(&mut self) -> Result<(), VolumeBotError> {
        match lut::load_table(self.rpc, &self.lut_path).await {
            Ok(table) => {
                self.table = Some(table);
                Ok(())
            }
            Err(VolumeBotError::TableNotFound) => {
                logger::log(LogTag::Lut, "SETUP", "No usable table reference, creating one");
                self.create_lut().await
            }
            Err(e) => Err(e),
        }
    }

    /// Extends the table with every account the batch flows will reference.
    pub async fn extend_lut(&mut self) -> Result<(), VolumeBotError> {
        let pool = self.pool()?.clone();
        let table = self.table()?.clone();
        let wallets = self.loaded_wallets()?;

        logger::log(
            LogTag::Lut,
            "EXTEND",
            &format!("Preparing accounts for {} wallets", wallets.len()),
        );

        let mut accounts: Vec<Pubkey> = vec![
            self.master.pubkey(),
            get_associated_token_address(&self.master.pubkey(), &self.mint),
            get_associated_token_address(&self.master.pubkey(), &native_mint::ID),
            self.mint,
            pool.address,
            native_mint::ID,
            solana_sdk::system_program::ID,
            spl_token::ID,
            spl_associated_token_account::ID,
        ];
        for wallet in wallets {
            accounts.push(wallet.pubkey());
            accounts.push(get_associated_token_address(&wallet.pubkey(), &self.mint));
            accounts.push(get_associated_token_address(&wallet.pubkey(), &native_mint::ID));
        }

        let added = lut::extend_table(self.rpc, &self.master, &table, &accounts).await?;
        if added > 0 {
            // Pick up the new entries so later compilations can use them.
            self.load_lut().await?;
        }
        Ok(())
    }

    // =========================================================================
    // Operations
    // =========================================================================

    pub async fn distribute(&self) -> Result<usize, VolumeBotError> {
        let table = self.table()?;
        let wallets = self.loaded_wallets()?;
        funding::distribute_sol(
            self.rpc,
            &self.master,
            wallets,
            table,
            self.configs.distribute_amount_lamports,
            self.configs.jito_tip_lamports,
        )
        .await
    }

    pub async fn collect(&self) -> Result<usize, VolumeBotError> {
        let table = self.table()?;
        let wallets = self.loaded_wallets()?;
        funding::collect_sol(self.rpc, &self.master, wallets, table).await
    }

    fn orchestrator<'b>(&'b self, pool: &'b Pool) -> SwapOrchestrator<'b> {
        SwapOrchestrator::new(
            self.rpc,
            &self.submitter,
            pool,
            self.mint,
            &self.master,
            SwapSettings {
                slippage_bps: self.configs.slippage_bps,
                sell_min_quote_out: self.configs.sell_min_quote_out,
            },
        )
    }

    /// One buy/sell cycle over all wallets.
    pub async fn swap_cycle(&self) -> Result<(), VolumeBotError> {
        let pool = self.pool()?;
        let wallets = self.loaded_wallets()?;
        self.orchestrator(pool).run_cycle(wallets).await
    }

    /// Sells all token holdings from every wallet.
    pub async fn sell_all(&self) -> Result<(), VolumeBotError> {
        let pool = self.pool()?;
        let wallets = self.loaded_wallets()?;
        self.orchestrator(pool).sell_all(wallets).await
    }

    /// Checks candidate mints for compatible pools.
    pub async fn probe(&self, mints: &[Pubkey]) -> Result<Vec<ProbeResult>, VolumeBotError> {
        pool::probe_mints(self.rpc, mints).await
    }

    /// Prints pool candidates with prices, for operator inspection.
    pub async fn report_pools(&self) -> Result<(), VolumeBotError> {
        let priced = get_pools_with_prices(self.rpc, &self.mint).await?;
        for entry in &priced {
            logger::log(
                LogTag::Pool,
                "REPORT",
                &format!(
                    "{} price {:.9} reserves {:.4}/{:.2}",
                    entry.pool.address, entry.price, entry.reserves.native, entry.reserves.token
                ),
            );
        }
        Ok(())
    }

    pub async fn report_balances(&self) -> Result<(), VolumeBotError> {
        let total = funding::report_balances(self.rpc, &self.master, &self.wallets).await?;
        logger::log(
            LogTag::Funding,
            "BALANCE",
            &format!("Total across master and wallets: {:.6} SOL", lamports_to_sol(total)),
        );
        Ok(())
    }

    /// Full sequence: discover, fund, trade, collect.
    pub async fn run(&mut self, wallet_count: usize) -> Result<(), VolumeBotError> {
        self.refresh_tip_accounts().await;
        self.discover_pool().await?;
        self.load_or_create_wallets(wallet_count)?;
        self.load_or_create_lut().await?;
        self.extend_lut().await?;
        self.distribute().await?;
        self.swap_cycle().await?;
        self.collect().await?;
        Ok(())
    }
}
