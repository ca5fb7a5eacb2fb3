/// On-chain pool discovery and pricing for the Pump.fun AMM.
pub mod decoder;
pub mod discovery;
pub mod price;
pub mod types;

pub use decoder::decode_pool;
pub use discovery::{find_pool, get_pools_with_prices, probe_mints};
pub use price::{calculate_with_slippage_buy, get_buy_token_amount, get_price_and_reserves};
pub use types::{Pool, PoolReserves, PoolWithPrice};
