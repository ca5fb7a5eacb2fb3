use solana_sdk::pubkey::Pubkey;

/// A decoded AMM pool account.
///
/// The address is authoritative once located; the remaining fields come from
/// the fixed-offset binary layout described in `constants.rs`.
#[derive(Debug, Clone, PartialEq)]
pub struct Pool {
    pub address: Pubkey,
    pub base_mint: Pubkey,
    pub quote_mint: Pubkey,
    /// Token account holding the base-side reserve.
    pub base_vault: Pubkey,
    /// Token account holding the quote-side reserve.
    pub quote_vault: Pubkey,
    pub lp_supply: u64,
    /// Search-orientation flag: true when the pool was found with the target
    /// mint on the base side and WSOL on the quote side.
    pub is_native_base: bool,
}

/// Live reserve balances, UI units. Ephemeral: re-fetched on demand and
/// never cached beyond a single call chain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoolReserves {
    pub native: f64,
    pub token: f64,
}

/// A pool together with its spot price and reserves at fetch time.
#[derive(Debug, Clone)]
pub struct PoolWithPrice {
    pub pool: Pool,
    pub price: f64,
    pub reserves: PoolReserves,
}

/// Result row of a mint probe.
#[derive(Debug, Clone)]
pub struct ProbeResult {
    pub mint: Pubkey,
    pub exists: bool,
    pub pool_count: usize,
    pub has_wsol_pool: bool,
}
