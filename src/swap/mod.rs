/// Buy/sell cycle execution against the AMM.
pub mod instructions;
pub mod orchestrator;

pub use instructions::{build_buy_instruction, build_sell_instruction};
pub use orchestrator::{classify_wallet, SwapOrchestrator, SwapSettings, WalletAction};
