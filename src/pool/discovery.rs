/// On-chain pool discovery.
///
/// Locates the AMM pool for a mint by scanning program-owned accounts with
/// partial binary-layout matching. Search order:
///
/// 1. Combined server-side predicate: base_mint == target, quote_mint == WSOL.
/// 2. On a rate-limit/pagination refusal: single predicate (base_mint only),
///    WSOL filtering done locally on the decoded records.
/// 3. Still empty: widen with the mint on the quote side.
///
/// One undecodable account never aborts a scan; it is dropped with a warning.
use super::decoder::decode_pool;
use super::price::get_price_and_reserves;
use super::types::{Pool, PoolWithPrice, ProbeResult};
use crate::constants::{
    POOL_ACCOUNT_SIZE, POOL_BASE_MINT_OFFSET, POOL_QUOTE_MINT_OFFSET, PUMP_AMM_PROGRAM_ID,
};
use crate::errors::{is_rate_limit_error, VolumeBotError};
use crate::helpers::short_pubkey;
use crate::logger::{self, LogTag};
use crate::rpc::{AccountFilter, LedgerRpc};
use solana_sdk::pubkey::Pubkey;
use spl_token::native_mint;

fn memcmp(offset: usize, pubkey: &Pubkey) -> AccountFilter {
    AccountFilter::Memcmp { offset, bytes: pubkey.to_bytes().to_vec() }
}

/// Scan with the given filters and decode every hit, skipping bad records.
async fn scan_and_decode(
    rpc: &dyn LedgerRpc,
    filters: Vec<AccountFilter>,
    is_native_base: bool,
) -> Result<Vec<Pool>, String> {
    let accounts = rpc
        .get_program_accounts_filtered(&PUMP_AMM_PROGRAM_ID, filters)
        .await?;

    let mut pools = Vec::new();
    for (address, data) in accounts {
        match decode_pool(&address, &data, is_native_base) {
            Ok(pool) => pools.push(pool),
            Err(e) => {
                let failure = VolumeBotError::DecodeFailure {
                    account: short_pubkey(&address),
                    reason: e.to_string(),
                };
                logger::warn(LogTag::Pool, &failure.to_string());
            }
        }
    }
    Ok(pools)
}

/// Pools with the target mint on the base side, any quote asset.
async fn get_pools_with_base_mint(
    rpc: &dyn LedgerRpc,
    mint: &Pubkey,
) -> Result<Vec<Pool>, String> {
    let filters = vec![
        AccountFilter::DataSize(POOL_ACCOUNT_SIZE),
        memcmp(POOL_BASE_MINT_OFFSET, mint),
    ];
    match scan_and_decode(rpc, filters, false).await {
        Ok(pools) => Ok(pools),
        Err(e) if is_rate_limit_error(&e) => {
            logger::warn(LogTag::Pool, "Base-mint scan rate limited, returning no candidates");
            Ok(Vec::new())
        }
        Err(e) => Err(e),
    }
}

/// Pools with the target mint on the quote side, any base asset.
async fn get_pools_with_quote_mint(
    rpc: &dyn LedgerRpc,
    mint: &Pubkey,
) -> Result<Vec<Pool>, String> {
    let filters = vec![
        AccountFilter::DataSize(POOL_ACCOUNT_SIZE),
        memcmp(POOL_QUOTE_MINT_OFFSET, mint),
    ];
    match scan_and_decode(rpc, filters, true).await {
        Ok(pools) => Ok(pools),
        Err(e) if is_rate_limit_error(&e) => {
            logger::warn(LogTag::Pool, "Quote-mint scan rate limited, returning no candidates");
            Ok(Vec::new())
        }
        Err(e) => Err(e),
    }
}

/// Pools pairing the target mint (base side) against WSOL (quote side).
///
/// The combined two-predicate query is tried first; on a rate-limit refusal
/// the narrower single-predicate query runs and WSOL filtering happens
/// locally, since the combined query plan is deprioritized upstream.
async fn get_pools_with_base_mint_quote_wsol(
    rpc: &dyn LedgerRpc,
    mint: &Pubkey,
) -> Result<Vec<Pool>, String> {
    logger::log(
        LogTag::Pool,
        "SCAN",
        &format!("Searching pools with base mint {} and WSOL quote", mint),
    );

    let combined = vec![
        AccountFilter::DataSize(POOL_ACCOUNT_SIZE),
        memcmp(POOL_BASE_MINT_OFFSET, mint),
        memcmp(POOL_QUOTE_MINT_OFFSET, &native_mint::ID),
    ];

    let pools = match scan_and_decode(rpc, combined, true).await {
        Ok(pools) => pools,
        Err(e) if is_rate_limit_error(&e) => {
            logger::warn(LogTag::Pool, &VolumeBotError::RateLimited(e).to_string());
            logger::log(LogTag::Pool, "SCAN", "Falling back to local quote filtering");
            let candidates = get_pools_with_base_mint(rpc, mint).await?;
            logger::log(
                LogTag::Pool,
                "SCAN",
                &format!("Fallback scan found {} candidate pools", candidates.len()),
            );
            candidates
                .into_iter()
                .filter(|pool| pool.quote_mint == native_mint::ID)
                .map(|pool| Pool { is_native_base: true, ..pool })
                .collect()
        }
        Err(e) => return Err(e),
    };

    if !pools.is_empty() {
        logger::log(LogTag::Pool, "SCAN", &format!("Found {} WSOL pools", pools.len()));
        return Ok(pools);
    }

    // Widen: the mint may sit on the quote side of its pool.
    logger::log(LogTag::Pool, "SCAN", "No pools with mint as base, trying as quote...");
    let reversed = vec![
        AccountFilter::DataSize(POOL_ACCOUNT_SIZE),
        memcmp(POOL_QUOTE_MINT_OFFSET, mint),
        memcmp(POOL_BASE_MINT_OFFSET, &native_mint::ID),
    ];
    match scan_and_decode(rpc, reversed, false).await {
        Ok(pools) => Ok(pools),
        Err(e) => {
            logger::error(LogTag::Pool, &format!("Reversed scan failed: {}", e));
            Ok(Vec::new())
        }
    }
}

/// All pools referencing the mint on either side, each with live pricing.
pub async fn get_pools_with_prices(
    rpc: &dyn LedgerRpc,
    mint: &Pubkey,
) -> Result<Vec<PoolWithPrice>, VolumeBotError> {
    let base_pools = get_pools_with_base_mint(rpc, mint).await.unwrap_or_else(|e| {
        logger::warn(LogTag::Pool, &format!("Base-mint candidate scan failed: {}", e));
        Vec::new()
    });
    let quote_pools = get_pools_with_quote_mint(rpc, mint).await.unwrap_or_else(|e| {
        logger::warn(LogTag::Pool, &format!("Quote-mint candidate scan failed: {}", e));
        Vec::new()
    });

    let candidates: Vec<Pool> = base_pools.into_iter().chain(quote_pools).collect();
    logger::log(
        LogTag::Pool,
        "SCAN",
        &format!("Total candidate pools: {}", candidates.len()),
    );

    let mut priced = Vec::new();
    for pool in &candidates {
        match get_price_and_reserves(rpc, pool).await {
            Ok(with_price) => priced.push(with_price),
            Err(e) => {
                logger::warn(
                    LogTag::Pool,
                    &format!("Skipping pool {} without readable reserves: {}", short_pubkey(&pool.address), e),
                );
            }
        }
    }
    Ok(priced)
}

/// Locates the WSOL-quoted pool for a mint.
///
/// Tie-break when multiple pools match: the first result in scan order is
/// selected, with no liquidity ranking.
pub async fn find_pool(rpc: &dyn LedgerRpc, mint: &Pubkey) -> Result<Pool, VolumeBotError> {
    logger::log(LogTag::Pool, "SCAN", &format!("Starting pool discovery for mint {}", mint));

    let pools = get_pools_with_base_mint_quote_wsol(rpc, mint)
        .await
        .map_err(VolumeBotError::Rpc)?;

    if let Some(selected) = pools.first() {
        logger::log(
            LogTag::Pool,
            "FOUND",
            &format!(
                "Pool {} (base {}, quote {}) selected from {} candidates",
                selected.address,
                short_pubkey(&selected.base_mint),
                short_pubkey(&selected.quote_mint),
                pools.len()
            ),
        );
        return Ok(selected.clone());
    }

    // Nothing WSOL-quoted. Distinguish a dead mint from an incompatible one.
    let mint_account = rpc.get_account_data(mint).await.map_err(VolumeBotError::Rpc)?;
    if mint_account.is_none() {
        return Err(VolumeBotError::TokenNotFound { mint: mint.to_string() });
    }

    let other_pools = get_pools_with_prices(rpc, mint).await?;
    if !other_pools.is_empty() {
        logger::warn(
            LogTag::Pool,
            &format!(
                "Found {} pools for this mint, but none with WSOL as quote token",
                other_pools.len()
            ),
        );
    }
    Err(VolumeBotError::NoPoolFound { mint: mint.to_string() })
}

/// Checks a list of candidate mints for tradability.
pub async fn probe_mints(
    rpc: &dyn LedgerRpc,
    mints: &[Pubkey],
) -> Result<Vec<ProbeResult>, VolumeBotError> {
    let mut results = Vec::with_capacity(mints.len());
    for mint in mints {
        logger::log(LogTag::Pool, "PROBE", &format!("Testing mint {}", mint));

        let exists = rpc
            .get_account_data(mint)
            .await
            .map_err(VolumeBotError::Rpc)?
            .is_some();
        if !exists {
            logger::warn(LogTag::Pool, &format!("Mint {} does not exist", short_pubkey(mint)));
            results.push(ProbeResult { mint: *mint, exists, pool_count: 0, has_wsol_pool: false });
            continue;
        }

        let pools = get_pools_with_prices(rpc, mint).await?;
        let has_wsol_pool = pools.iter().any(|p| p.pool.quote_mint == native_mint::ID);
        logger::log(
            LogTag::Pool,
            "PROBE",
            &format!(
                "Mint {}: {} pools, WSOL pool: {}",
                short_pubkey(mint),
                pools.len(),
                if has_wsol_pool { "yes" } else { "no" }
            ),
        );
        results.push(ProbeResult {
            mint: *mint,
            exists,
            pool_count: pools.len(),
            has_wsol_pool,
        });
    }
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::super::decoder::encode_pool_account;
    use super::*;
    use crate::rpc::{LoadedLookupTable, TokenBalance};
    use async_trait::async_trait;
    use solana_sdk::hash::Hash;
    use solana_sdk::signature::Signature;
    use solana_sdk::transaction::VersionedTransaction;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Scripted ledger stub: serves canned scan responses and counts calls.
    struct ScriptedRpc {
        /// Responses keyed by the number of memcmp filters and first offset.
        scans: Mutex<Vec<ScanScript>>,
        accounts: HashMap<Pubkey, Vec<u8>>,
        balances: HashMap<Pubkey, TokenBalance>,
    }

    struct ScanScript {
        matches: fn(&[AccountFilter]) -> bool,
        response: Result<Vec<(Pubkey, Vec<u8>)>, String>,
    }

    impl ScriptedRpc {
        fn new() -> Self {
            Self {
                scans: Mutex::new(Vec::new()),
                accounts: HashMap::new(),
                balances: HashMap::new(),
            }
        }

        fn script(
            &mut self,
            matches: fn(&[AccountFilter]) -> bool,
            response: Result<Vec<(Pubkey, Vec<u8>)>, String>,
        ) {
            self.scans.get_mut().unwrap().push(ScanScript { matches, response });
        }
    }

    #[async_trait]
    impl LedgerRpc for ScriptedRpc {
        async fn get_account_data(&self, address: &Pubkey) -> Result<Option<Vec<u8>>, String> {
            Ok(self.accounts.get(address).cloned())
        }

        async fn get_balance(&self, _address: &Pubkey) -> Result<u64, String> {
            Ok(0)
        }

        async fn get_token_balance(&self, token_account: &Pubkey) -> Result<TokenBalance, String> {
            self.balances
                .get(token_account)
                .copied()
                .ok_or_else(|| "no balance".to_string())
        }

        async fn get_latest_blockhash(&self) -> Result<Hash, String> {
            Ok(Hash::default())
        }

        async fn get_finalized_slot(&self) -> Result<u64, String> {
            Ok(0)
        }

        async fn get_program_accounts_filtered(
            &self,
            _program: &Pubkey,
            filters: Vec<AccountFilter>,
        ) -> Result<Vec<(Pubkey, Vec<u8>)>, String> {
            let mut scans = self.scans.lock().unwrap();
            if let Some(position) = scans.iter().position(|s| (s.matches)(&filters)) {
                let script = scans.remove(position);
                return script.response;
            }
            Ok(Vec::new())
        }

        async fn send_transaction(
            &self,
            _tx: &VersionedTransaction,
        ) -> Result<Signature, String> {
            Err("not supported in scripted rpc".to_string())
        }

        async fn confirm_signature(&self, _signature: &Signature) -> Result<bool, String> {
            Ok(true)
        }

        async fn get_lookup_table(
            &self,
            _address: &Pubkey,
        ) -> Result<Option<LoadedLookupTable>, String> {
            Ok(None)
        }
    }

    fn memcmp_count(filters: &[AccountFilter]) -> usize {
        filters
            .iter()
            .filter(|f| matches!(f, AccountFilter::Memcmp { .. }))
            .count()
    }

    #[tokio::test]
    async fn combined_scan_finds_pool_first_in_scan_order() {
        let mint = Pubkey::new_unique();
        let first = Pubkey::new_unique();
        let second = Pubkey::new_unique();
        let data_a =
            encode_pool_account(&mint, &native_mint::ID, &Pubkey::new_unique(), &Pubkey::new_unique(), 1);
        let data_b =
            encode_pool_account(&mint, &native_mint::ID, &Pubkey::new_unique(), &Pubkey::new_unique(), 2);

        let mut rpc = ScriptedRpc::new();
        rpc.script(
            |f| memcmp_count(f) == 2,
            Ok(vec![(first, data_a), (second, data_b)]),
        );

        let pool = find_pool(&rpc, &mint).await.unwrap();
        assert_eq!(pool.address, first);
        assert!(pool.is_native_base);
    }

    #[tokio::test]
    async fn rate_limited_scan_falls_back_to_local_filtering() {
        let mint = Pubkey::new_unique();
        let wsol_pool = Pubkey::new_unique();
        let usdc_pool = Pubkey::new_unique();
        let usdc = Pubkey::new_unique();

        let wsol_data =
            encode_pool_account(&mint, &native_mint::ID, &Pubkey::new_unique(), &Pubkey::new_unique(), 1);
        let usdc_data =
            encode_pool_account(&mint, &usdc, &Pubkey::new_unique(), &Pubkey::new_unique(), 1);

        let mut rpc = ScriptedRpc::new();
        // Combined query is refused the way the upstream phrases it.
        rpc.script(
            |f| memcmp_count(f) == 2,
            Err("Query is deprioritized, please use pagination".to_string()),
        );
        // Single-predicate query returns both pools; WSOL filter is local.
        rpc.script(
            |f| memcmp_count(f) == 1,
            Ok(vec![(usdc_pool, usdc_data), (wsol_pool, wsol_data)]),
        );

        let pool = find_pool(&rpc, &mint).await.unwrap();
        assert_eq!(pool.address, wsol_pool);
        assert_eq!(pool.quote_mint, native_mint::ID);
    }

    #[tokio::test]
    async fn undecodable_accounts_are_skipped_not_fatal() {
        let mint = Pubkey::new_unique();
        let good_pool = Pubkey::new_unique();
        let good_data =
            encode_pool_account(&mint, &native_mint::ID, &Pubkey::new_unique(), &Pubkey::new_unique(), 1);

        let mut rpc = ScriptedRpc::new();
        rpc.script(
            |f| memcmp_count(f) == 2,
            Ok(vec![(Pubkey::new_unique(), vec![0u8; 50]), (good_pool, good_data)]),
        );

        let pool = find_pool(&rpc, &mint).await.unwrap();
        assert_eq!(pool.address, good_pool);
    }

    #[tokio::test]
    async fn missing_mint_is_token_not_found() {
        let mint = Pubkey::new_unique();
        let rpc = ScriptedRpc::new();

        let err = find_pool(&rpc, &mint).await.unwrap_err();
        assert!(matches!(err, VolumeBotError::TokenNotFound { .. }));
    }

    #[tokio::test]
    async fn existing_mint_without_wsol_pool_is_no_pool_found() {
        let mint = Pubkey::new_unique();
        let mut rpc = ScriptedRpc::new();
        rpc.accounts.insert(mint, vec![1u8; 82]);

        let err = find_pool(&rpc, &mint).await.unwrap_err();
        assert!(matches!(err, VolumeBotError::NoPoolFound { .. }));
    }
}
