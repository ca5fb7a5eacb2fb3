/// Program addresses, binary layout offsets and operational constants for the
/// Pump.fun AMM venue.
///
/// Pool account layout (211 bytes, Anchor-style):
/// discriminator(8) | pool_bump(1) | index(2) | creator(32) | base_mint(32)
/// | quote_mint(32) | lp_mint(32) | base_vault(32) | quote_vault(32)
/// | lp_supply(8)
use solana_sdk::{pubkey, pubkey::Pubkey};

pub const PUMP_AMM_PROGRAM_ID: Pubkey = pubkey!("pAMMBay6oceH9fJKBRHGP5D4bD4sWpmSwMn52FMfXEA");
pub const GLOBAL_CONFIG: Pubkey = pubkey!("ADyA8hdefvWN2dbGGWFotbzWxrAvLW83WG6QCVXvJKqw");
pub const EVENT_AUTHORITY: Pubkey = pubkey!("GS4CU59F31iL7aR2Q8zVS8DRrcRnXX1yjQ66TqNVQnaR");
pub const FEE_RECIPIENT: Pubkey = pubkey!("62qc2CNXwrYqQScmEdiZFFAnJR262PxWEuNQtxfafNgV");
pub const FEE_RECIPIENT_ATA: Pubkey = pubkey!("94qWNrtmfn42h3ZjUZwWvK1MEo9uVmmrBPd2hpNjYDjb");

/// Anchor instruction discriminators for the AMM program.
pub const BUY_DISCRIMINATOR: [u8; 8] = [102, 6, 61, 18, 1, 218, 235, 234];
pub const SELL_DISCRIMINATOR: [u8; 8] = [51, 230, 133, 164, 1, 127, 131, 173];

/// Fixed byte length of an AMM pool account.
pub const POOL_ACCOUNT_SIZE: u64 = 211;
/// Offset of the base mint pubkey inside the pool account.
pub const POOL_BASE_MINT_OFFSET: usize = 43;
/// Offset of the quote mint pubkey inside the pool account.
pub const POOL_QUOTE_MINT_OFFSET: usize = 75;

/// Hard wire-size ceiling for a serialized transaction.
pub const MAX_TX_SIZE: usize = 1232;

pub const LAMPORTS_PER_SOL: u64 = 1_000_000_000;
/// Assumed decimals for AMM base tokens.
pub const TOKEN_DECIMALS: u32 = 6;

/// Lamports a wallet must keep to cover one associated-account creation.
pub const FEE_RESERVE_LAMPORTS: u64 = 2_039_280;
/// Balance at which a wallet is drained back to the master instead of traded.
pub const SKIM_THRESHOLD_LAMPORTS: u64 = 500_000_000;
/// Lamports left behind when skimming excess balance.
pub const SKIM_KEEP_LAMPORTS: u64 = 5_000_000;
/// Swap amounts below this are not worth submitting.
pub const DUST_FLOOR_LAMPORTS: u64 = 1_000;

/// Uniform jitter bounds applied to the per-wallet swap amount.
pub const SWAP_JITTER_MIN: f64 = 0.6;
pub const SWAP_JITTER_MAX: f64 = 0.8;
/// Randomized delay between buy and sell, in milliseconds.
pub const SWAP_WAIT_MIN_MS: u64 = 1_000;
pub const SWAP_WAIT_MAX_MS: u64 = 3_000;

/// Slippage deducted from the buy estimate, in basis points.
pub const BUY_SLIPPAGE_BPS: u64 = 500;

/// Wallet instruction-sets per chunk for plain transfer batches.
pub const TRANSFER_BATCH_SIZE: usize = 8;
/// Wallets per chunk for swap cycles (swap instructions are heavier).
pub const SWAP_BATCH_SIZE: usize = 3;

/// Lookup table capacity and extension granularity.
pub const LUT_MAX_ADDRESSES: usize = 256;
pub const LUT_EXTEND_CHUNK: usize = 10;
/// Slots subtracted from the finalized tip to avoid "slot not found".
pub const LUT_SLOT_OFFSET: u64 = 20;
/// Wait after the creation transaction confirms before the table is queryable.
pub const LUT_PROPAGATION_DELAY_MS: u64 = 25_000;
/// Minimum master balance for table creation, excluding the relay tip.
pub const LUT_CREATION_COST_LAMPORTS: u64 = 2_500_000;

/// Compute budget directives used on swap and tip transactions.
pub const CU_LIMIT_SWAP: u32 = 200_000;
pub const CU_LIMIT_TIP: u32 = 100_000;
pub const CU_PRICE_MICROLAMPORTS: u64 = 1_000_000;

pub const DEFAULT_TIP_LAMPORTS: u64 = 1_000_000;
pub const DEFAULT_DISTRIBUTE_LAMPORTS: u64 = 4_000_000;
pub const DEFAULT_WALLET_COUNT: usize = 10;

/// Relay tip accounts used when the dynamic list cannot be fetched.
pub const FALLBACK_TIP_ACCOUNTS: [&str; 3] = [
    "96gYZGLnJYVFmbjzopPSU6QiEV5fGqZNyN9nmNhvrZU5",
    "HFqU5x63VTqvQss8hp11i4wVV8bD44PvwucfZ2bU7gRe",
    "Cw8CFyM9FkoMi7K7Crf6HNQqf4uEMzpKw6QNghXLvLkY",
];

pub const WALLETS_FILE: &str = "wallets.json";
pub const LUT_FILE: &str = "lut.json";
pub const CONFIGS_FILE: &str = "configs.json";
