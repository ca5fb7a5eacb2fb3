/// Atomic bundle submission through a Jito-style block engine.
///
/// A bundle pairs the trade transaction with a tip payment so the relay
/// lands both in order or neither. Submission is best-effort inside the
/// orchestration loop: every failure is caught and surfaced as an empty
/// bundle id, never as an error.
use crate::constants::{
    CU_LIMIT_TIP, CU_PRICE_MICROLAMPORTS, FALLBACK_TIP_ACCOUNTS,
};
use crate::errors::VolumeBotError;
use crate::helpers::{lamports_to_sol, short_pubkey};
use crate::logger::{self, LogTag};
use crate::transactions::compile_transaction;
use rand::Rng;
use serde::{Deserialize, Serialize};
use solana_sdk::{
    compute_budget::ComputeBudgetInstruction,
    hash::Hash,
    pubkey::Pubkey,
    signature::Keypair,
    signer::Signer,
    system_instruction,
    transaction::VersionedTransaction,
};
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Serialize)]
struct JsonRpcRequest {
    jsonrpc: &'static str,
    id: u64,
    method: &'static str,
    params: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    result: Option<serde_json::Value>,
    error: Option<JsonRpcError>,
}

/// Opaque relay-assigned bundle identifier, used only for log correlation.
/// Empty when submission failed.
#[derive(Debug, Clone, Default)]
pub struct BundleId(pub String);

impl BundleId {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Submission outcome the caller may log explicitly once the bundle is on
/// its way. Not emitted from a detached task.
#[derive(Debug, Clone)]
pub struct BundleReceipt {
    pub bundle_id: BundleId,
    pub explorer_url: String,
}

impl BundleReceipt {
    pub fn log(&self) {
        if self.bundle_id.is_empty() {
            return;
        }
        logger::log(LogTag::Bundle, "SENT", &format!("Bundle id: {}", self.bundle_id.0));
        logger::log(LogTag::Bundle, "TRACK", &self.explorer_url);
    }
}

/// Relay client with an explicitly-owned tip account list.
///
/// The list is injected at construction and only changes through
/// `refresh_tip_accounts`; when empty, the hardcoded fallback list is used.
pub struct BundleSubmitter {
    block_engine_url: String,
    tip_lamports: u64,
    tip_accounts: Vec<Pubkey>,
    http: reqwest::Client,
}

impl BundleSubmitter {
    pub fn new(block_engine_url: &str, tip_lamports: u64, tip_accounts: Vec<Pubkey>) -> Self {
        Self {
            block_engine_url: block_engine_url.trim_end_matches('/').to_string(),
            tip_lamports,
            tip_accounts,
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(15))
                .build()
                .unwrap_or_default(),
        }
    }

    fn bundles_endpoint(&self) -> String {
        format!("{}/api/v1/bundles", self.block_engine_url)
    }

    /// Re-fetches the relay's tip account list. Failures keep the current
    /// list; the fallback covers a list that stays empty.
    pub async fn refresh_tip_accounts(&mut self) -> Result<usize, VolumeBotError> {
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            id: 1,
            method: "getTipAccounts",
            params: serde_json::json!([]),
        };

        let response: JsonRpcResponse = self
            .http
            .post(self.bundles_endpoint())
            .json(&request)
            .send()
            .await
            .map_err(|e| VolumeBotError::Rpc(format!("getTipAccounts failed: {}", e)))?
            .json()
            .await
            .map_err(|e| VolumeBotError::Rpc(format!("getTipAccounts response: {}", e)))?;

        if let Some(error) = response.error {
            return Err(VolumeBotError::Rpc(format!(
                "getTipAccounts error {}: {}",
                error.code, error.message
            )));
        }

        let accounts: Vec<String> = response
            .result
            .map(|v| serde_json::from_value(v).unwrap_or_default())
            .unwrap_or_default();
        let parsed: Vec<Pubkey> = accounts
            .iter()
            .filter_map(|s| Pubkey::from_str(s).ok())
            .collect();

        if !parsed.is_empty() {
            logger::log(
                LogTag::Bundle,
                "TIPS",
                &format!("Loaded {} tip accounts from relay", parsed.len()),
            );
            self.tip_accounts = parsed;
        }
        Ok(self.tip_accounts.len())
    }

    /// Picks a tip account uniformly at random, falling back to the
    /// hardcoded list when none were injected or fetched.
    pub fn select_tip_account(&self) -> Pubkey {
        let fallback: Vec<Pubkey>;
        let candidates: &[Pubkey] = if self.tip_accounts.is_empty() {
            logger::warn(LogTag::Bundle, "No tip accounts available, using fallback list");
            fallback = FALLBACK_TIP_ACCOUNTS
                .iter()
                .map(|s| Pubkey::from_str(s).expect("fallback tip account is valid"))
                .collect();
            &fallback
        } else {
            &self.tip_accounts
        };
        candidates[rand::thread_rng().gen_range(0..candidates.len())]
    }

    fn build_tip_transaction(
        &self,
        payer: &Keypair,
        tip_account: &Pubkey,
        blockhash: Hash,
    ) -> Result<VersionedTransaction, VolumeBotError> {
        let instructions = vec![
            ComputeBudgetInstruction::set_compute_unit_limit(CU_LIMIT_TIP),
            ComputeBudgetInstruction::set_compute_unit_price(CU_PRICE_MICROLAMPORTS),
            system_instruction::transfer(&payer.pubkey(), tip_account, self.tip_lamports),
        ];
        compile_transaction(&payer.pubkey(), &instructions, &[], blockhash, &[payer])
    }

    async fn post_bundle(
        &self,
        transactions: &[&VersionedTransaction],
    ) -> Result<String, VolumeBotError> {
        let encoded: Vec<String> = transactions
            .iter()
            .map(|tx| {
                bincode::serialize(tx)
                    .map(|raw| bs58::encode(raw).into_string())
                    .map_err(|e| VolumeBotError::Parse(format!("Bundle serialization: {}", e)))
            })
            .collect::<Result<_, _>>()?;

        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            id: 1,
            method: "sendBundle",
            params: serde_json::json!([encoded]),
        };

        let response = self
            .http
            .post(self.bundles_endpoint())
            .json(&request)
            .send()
            .await
            .map_err(|e| VolumeBotError::BundleSubmitFailure(e.to_string()))?;

        if !response.status().is_success() {
            return Err(VolumeBotError::BundleSubmitFailure(format!(
                "relay returned HTTP {}",
                response.status()
            )));
        }

        let body: JsonRpcResponse = response
            .json()
            .await
            .map_err(|e| VolumeBotError::BundleSubmitFailure(e.to_string()))?;

        if let Some(error) = body.error {
            return Err(VolumeBotError::BundleSubmitFailure(format!(
                "relay error {}: {}",
                error.code, error.message
            )));
        }

        body.result
            .and_then(|v| v.as_str().map(str::to_string))
            .ok_or_else(|| {
                VolumeBotError::BundleSubmitFailure("no bundle id in relay response".to_string())
            })
    }

    /// Submits `[tip, trade]` as one atomic bundle.
    ///
    /// Never fails: any error is logged and reported as an empty bundle id,
    /// since submission is best-effort within the orchestration loop.
    pub async fn submit(
        &self,
        trade_tx: &VersionedTransaction,
        is_sell: bool,
        payer: &Keypair,
        pool: &Pubkey,
        blockhash: Hash,
    ) -> BundleReceipt {
        let side = if is_sell { "SELL" } else { "BUY" };
        logger::log(
            LogTag::Bundle,
            "SUBMIT",
            &format!(
                "Sending {} bundle for wallet {} (tip {:.6} SOL)",
                side,
                short_pubkey(&payer.pubkey()),
                lamports_to_sol(self.tip_lamports)
            ),
        );

        let tip_account = self.select_tip_account();
        logger::debug(LogTag::Bundle, &format!("Selected tip account {}", tip_account));

        let receipt_url = format!(
            "https://dexscreener.com/solana/{}?maker={}",
            pool,
            payer.pubkey()
        );

        let result = async {
            let tip_tx = self.build_tip_transaction(payer, &tip_account, blockhash)?;
            self.post_bundle(&[&tip_tx, trade_tx]).await
        }
        .await;

        match result {
            Ok(bundle_id) => BundleReceipt {
                bundle_id: BundleId(bundle_id),
                explorer_url: receipt_url,
            },
            Err(e) => {
                logger::error(LogTag::Bundle, &format!("Error sending bundle: {}", e));
                BundleReceipt { bundle_id: BundleId::default(), explorer_url: receipt_url }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_tip_accounts_parse_and_get_selected() {
        let submitter = BundleSubmitter::new("https://relay.example", 1_000_000, Vec::new());
        let fallback: Vec<Pubkey> = FALLBACK_TIP_ACCOUNTS
            .iter()
            .map(|s| Pubkey::from_str(s).unwrap())
            .collect();

        for _ in 0..16 {
            let selected = submitter.select_tip_account();
            assert!(fallback.contains(&selected));
        }
    }

    #[test]
    fn injected_tip_accounts_take_precedence() {
        let injected = vec![Pubkey::new_unique(), Pubkey::new_unique()];
        let submitter =
            BundleSubmitter::new("https://relay.example/", 1_000_000, injected.clone());

        for _ in 0..16 {
            assert!(injected.contains(&submitter.select_tip_account()));
        }
        assert_eq!(submitter.bundles_endpoint(), "https://relay.example/api/v1/bundles");
    }

    #[test]
    fn tip_transaction_carries_budget_directives_and_transfer() {
        let submitter = BundleSubmitter::new("https://relay.example", 777, Vec::new());
        let payer = Keypair::new();
        let tip_account = Pubkey::new_unique();

        let tx = submitter
            .build_tip_transaction(&payer, &tip_account, Hash::default())
            .unwrap();

        let message = tx.message.clone();
        assert_eq!(message.instructions().len(), 3);
        assert_eq!(tx.signatures.len(), 1);
        crate::transactions::check_transaction_size(&tx).unwrap();
    }
}
