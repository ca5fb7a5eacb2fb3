/// Structured error types for the volume bot.
///
/// Per-item failures inside a loop (a single undecodable pool account, one
/// wallet's failed swap step, one oversized chunk) are isolated and logged at
/// the call site; only whole-operation preconditions surface through these
/// variants to the caller.
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VolumeBotError {
    #[error("Token {mint} does not exist on chain")] TokenNotFound {
        mint: String,
    },

    #[error("No pool with the WSOL quote side found for {mint}")] NoPoolFound {
        mint: String,
    },

    #[error("Failed to decode pool account {account}: {reason}")] DecodeFailure {
        account: String,
        reason: String,
    },

    #[error("RPC query was rate limited: {0}")] RateLimited(String),

    #[error("Insufficient funds for {operation}: need {required} lamports, have {available}")]
    InsufficientFunds {
        operation: String,
        required: u64,
        available: u64,
    },

    #[error("Transaction too large: {size} bytes > {limit}")] TransactionTooLarge {
        size: usize,
        limit: usize,
    },

    #[error("Lookup table not found")] TableNotFound,

    #[error("Lookup table creation failed: {0}")] TableCreationFailed(String),

    #[error("No wallets available - generate wallets first")] NoWalletsAvailable,

    #[error("Swap {step} failed for wallet {wallet}: {reason}")] SwapStepFailure {
        wallet: String,
        step: String,
        reason: String,
    },

    #[error("Bundle submission failed: {0}")] BundleSubmitFailure(String),

    #[error("{what} not ready - run the corresponding setup step first")] NotReady {
        what: String,
    },

    #[error("Configuration error: {0}")] Config(String),

    #[error("RPC error: {0}")] Rpc(String),

    #[error("Wallet error: {0}")] Wallet(String),

    #[error("IO error: {0}")] Io(#[from] std::io::Error),

    #[error("Parse error: {0}")] Parse(String),
}

impl From<serde_json::Error> for VolumeBotError {
    fn from(err: serde_json::Error) -> Self {
        VolumeBotError::Parse(format!("JSON: {}", err))
    }
}

impl From<String> for VolumeBotError {
    fn from(err: String) -> Self {
        VolumeBotError::Rpc(err)
    }
}

/// Checks whether an RPC error message indicates the query plan was refused
/// or throttled upstream rather than genuinely failing.
pub fn is_rate_limit_error(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("deprioritized") ||
        lower.contains("pagination") ||
        lower.contains("429") ||
        lower.contains("too many requests") ||
        lower.contains("rate limit")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limit_detection_matches_upstream_phrases() {
        assert!(is_rate_limit_error("Query is deprioritized, use pagination"));
        assert!(is_rate_limit_error("HTTP 429 Too Many Requests"));
        assert!(!is_rate_limit_error("Account not found"));
    }

    #[test]
    fn errors_render_operator_friendly_messages() {
        let err = VolumeBotError::InsufficientFunds {
            operation: "distribution".to_string(),
            required: 100,
            available: 7,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient funds for distribution: need 100 lamports, have 7"
        );

        let err = VolumeBotError::TransactionTooLarge { size: 1300, limit: 1232 };
        assert!(err.to_string().contains("1300"));
    }
}
