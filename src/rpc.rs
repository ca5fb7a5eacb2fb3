/// Ledger access boundary.
///
/// Every on-chain read/write the bot performs goes through the [`LedgerRpc`]
/// trait so the core logic stays independent of the concrete client.
/// [`SolanaRpc`] is the production implementation backed by the nonblocking
/// `solana-client`. Retry policy on throttling is the client's own; the bot
/// only inspects error text to pick its fallback search path.
use async_trait::async_trait;
use solana_account_decoder::{UiAccountEncoding, UiDataSliceConfig};
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_config::{
    RpcAccountInfoConfig, RpcProgramAccountsConfig, RpcSendTransactionConfig,
};
use solana_client::rpc_filter::{Memcmp, RpcFilterType};
use solana_sdk::{
    address_lookup_table::state::AddressLookupTable,
    address_lookup_table::AddressLookupTableAccount,
    commitment_config::{CommitmentConfig, CommitmentLevel},
    hash::Hash,
    pubkey::Pubkey,
    signature::Signature,
    transaction::VersionedTransaction,
};
use std::time::Duration;

/// Binary filter for program-account scans.
#[derive(Debug, Clone)]
pub enum AccountFilter {
    /// Match accounts of exactly this byte length.
    DataSize(u64),
    /// Match accounts whose bytes at `offset` equal `bytes`.
    Memcmp { offset: usize, bytes: Vec<u8> },
}

/// Raw token account balance.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenBalance {
    pub amount: u64,
    pub ui_amount: f64,
    pub decimals: u8,
}

/// On-chain lookup table together with its last-extension slot.
#[derive(Debug, Clone)]
pub struct LoadedLookupTable {
    pub account: AddressLookupTableAccount,
    pub last_extended_slot: u64,
}

/// Operations the bot requires from the ledger access service.
#[async_trait]
pub trait LedgerRpc: Send + Sync {
    /// Raw account data, or None if the account does not exist.
    async fn get_account_data(&self, address: &Pubkey) -> Result<Option<Vec<u8>>, String>;

    /// Lamport balance of an account (0 if absent).
    async fn get_balance(&self, address: &Pubkey) -> Result<u64, String>;

    /// SPL token balance of a token account. Errors if the account is absent.
    async fn get_token_balance(&self, token_account: &Pubkey) -> Result<TokenBalance, String>;

    async fn get_latest_blockhash(&self) -> Result<Hash, String>;

    /// A recent finalized slot.
    async fn get_finalized_slot(&self) -> Result<u64, String>;

    /// Program-account scan with server-side binary filters.
    async fn get_program_accounts_filtered(
        &self,
        program: &Pubkey,
        filters: Vec<AccountFilter>,
    ) -> Result<Vec<(Pubkey, Vec<u8>)>, String>;

    async fn send_transaction(&self, tx: &VersionedTransaction) -> Result<Signature, String>;

    /// Waits for the signature to reach confirmed commitment.
    /// Ok(true) = landed without error, Ok(false) = failed or timed out.
    async fn confirm_signature(&self, signature: &Signature) -> Result<bool, String>;

    /// Fetch and deserialize an address lookup table account.
    async fn get_lookup_table(
        &self,
        address: &Pubkey,
    ) -> Result<Option<LoadedLookupTable>, String>;
}

/// Production ledger access backed by `solana-client`.
pub struct SolanaRpc {
    client: RpcClient,
}

impl SolanaRpc {
    pub fn new(rpc_url: &str) -> Self {
        Self {
            client: RpcClient::new_with_commitment(
                rpc_url.to_string(),
                CommitmentConfig::confirmed(),
            ),
        }
    }
}

const CONFIRM_POLL_ATTEMPTS: u32 = 30;
const CONFIRM_POLL_INTERVAL_MS: u64 = 2_000;

#[async_trait]
impl LedgerRpc for SolanaRpc {
    async fn get_account_data(&self, address: &Pubkey) -> Result<Option<Vec<u8>>, String> {
        let response = self
            .client
            .get_account_with_commitment(address, CommitmentConfig::confirmed())
            .await
            .map_err(|e| format!("getAccountInfo failed: {}", e))?;
        Ok(response.value.map(|account| account.data))
    }

    async fn get_balance(&self, address: &Pubkey) -> Result<u64, String> {
        self.client
            .get_balance(address)
            .await
            .map_err(|e| format!("getBalance failed: {}", e))
    }

    async fn get_token_balance(&self, token_account: &Pubkey) -> Result<TokenBalance, String> {
        let balance = self
            .client
            .get_token_account_balance(token_account)
            .await
            .map_err(|e| format!("getTokenAccountBalance failed: {}", e))?;
        let amount = balance
            .amount
            .parse::<u64>()
            .map_err(|e| format!("Unparseable token amount '{}': {}", balance.amount, e))?;
        Ok(TokenBalance {
            amount,
            ui_amount: balance.ui_amount.unwrap_or(0.0),
            decimals: balance.decimals,
        })
    }

    async fn get_latest_blockhash(&self) -> Result<Hash, String> {
        self.client
            .get_latest_blockhash()
            .await
            .map_err(|e| format!("getLatestBlockhash failed: {}", e))
    }

    async fn get_finalized_slot(&self) -> Result<u64, String> {
        self.client
            .get_slot_with_commitment(CommitmentConfig::finalized())
            .await
            .map_err(|e| format!("getSlot failed: {}", e))
    }

    async fn get_program_accounts_filtered(
        &self,
        program: &Pubkey,
        filters: Vec<AccountFilter>,
    ) -> Result<Vec<(Pubkey, Vec<u8>)>, String> {
        let rpc_filters: Vec<RpcFilterType> = filters
            .into_iter()
            .map(|filter| match filter {
                AccountFilter::DataSize(size) => RpcFilterType::DataSize(size),
                AccountFilter::Memcmp { offset, bytes } => {
                    RpcFilterType::Memcmp(Memcmp::new_base58_encoded(offset, &bytes))
                }
            })
            .collect();

        let config = RpcProgramAccountsConfig {
            filters: Some(rpc_filters),
            account_config: RpcAccountInfoConfig {
                encoding: Some(UiAccountEncoding::Base64),
                data_slice: Some(UiDataSliceConfig {
                    offset: 0,
                    length: crate::constants::POOL_ACCOUNT_SIZE as usize,
                }),
                commitment: Some(CommitmentConfig::confirmed()),
                min_context_slot: None,
            },
            ..Default::default()
        };

        let accounts = self
            .client
            .get_program_accounts_with_config(program, config)
            .await
            .map_err(|e| format!("getProgramAccounts failed: {}", e))?;

        Ok(accounts
            .into_iter()
            .map(|(pubkey, account)| (pubkey, account.data))
            .collect())
    }

    async fn send_transaction(&self, tx: &VersionedTransaction) -> Result<Signature, String> {
        self.client
            .send_transaction_with_config(tx, RpcSendTransactionConfig {
                skip_preflight: true,
                preflight_commitment: Some(CommitmentLevel::Confirmed),
                max_retries: Some(3),
                ..Default::default()
            })
            .await
            .map_err(|e| format!("sendTransaction failed: {}", e))
    }

    async fn confirm_signature(&self, signature: &Signature) -> Result<bool, String> {
        for _ in 0..CONFIRM_POLL_ATTEMPTS {
            let statuses = self
                .client
                .get_signature_statuses(&[*signature])
                .await
                .map_err(|e| format!("getSignatureStatuses failed: {}", e))?;

            if let Some(Some(status)) = statuses.value.first() {
                if status.satisfies_commitment(CommitmentConfig::confirmed()) {
                    return Ok(status.err.is_none());
                }
            }
            tokio::time::sleep(Duration::from_millis(CONFIRM_POLL_INTERVAL_MS)).await;
        }
        Ok(false)
    }

    async fn get_lookup_table(
        &self,
        address: &Pubkey,
    ) -> Result<Option<LoadedLookupTable>, String> {
        let response = self
            .client
            .get_account_with_commitment(address, CommitmentConfig::confirmed())
            .await
            .map_err(|e| format!("getAccountInfo failed: {}", e))?;

        let Some(account) = response.value else {
            return Ok(None);
        };

        let table = AddressLookupTable::deserialize(&account.data)
            .map_err(|e| format!("Failed to deserialize lookup table {}: {}", address, e))?;

        Ok(Some(LoadedLookupTable {
            account: AddressLookupTableAccount {
                key: *address,
                addresses: table.addresses.to_vec(),
            },
            last_extended_slot: table.meta.last_extended_slot,
        }))
    }
}
