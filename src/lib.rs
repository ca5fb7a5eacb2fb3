pub mod arguments;
pub mod bot;
pub mod config;
pub mod constants;
pub mod errors; // Structured error handling
pub mod funding;
pub mod helpers;
pub mod jito;
pub mod logger;
pub mod lut;
pub mod pool;
pub mod rpc;
pub mod swap;
pub mod transactions;
pub mod wallets;
