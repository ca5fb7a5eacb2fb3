/// Batched versioned-transaction construction.
///
/// Groups independent per-wallet instruction sets into chunks, compiles each
/// chunk into one v0 message referencing the shared lookup table, signs with
/// the minimal signer set and enforces the wire-size ceiling. A chunk that
/// exceeds the ceiling is dropped with an error; no automatic re-chunking is
/// attempted mid-flight.
use crate::constants::MAX_TX_SIZE;
use crate::errors::VolumeBotError;
use crate::helpers::chunk_array;
use solana_sdk::{
    address_lookup_table::AddressLookupTableAccount,
    hash::Hash,
    instruction::Instruction,
    message::{v0, VersionedMessage},
    pubkey::Pubkey,
    signature::Keypair,
    signer::Signer,
    transaction::VersionedTransaction,
};

/// One wallet's contribution to a batch: its instructions plus the keypair
/// in case any of them requires its signature.
pub struct InstructionSet<'a> {
    pub wallet: &'a Keypair,
    pub instructions: Vec<Instruction>,
}

/// Groups instruction sets into batches of at most `batch_size` wallets.
pub fn chunk_instruction_sets<'a>(
    sets: Vec<InstructionSet<'a>>,
    batch_size: usize,
) -> Vec<Vec<InstructionSet<'a>>> {
    assert!(batch_size > 0, "batch size must be greater than 0");
    let mut chunks = Vec::new();
    let mut current = Vec::new();
    for set in sets {
        current.push(set);
        if current.len() == batch_size {
            chunks.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

/// Signer set for a chunk: the payer plus every wallet whose key appears as
/// a required signer in any instruction of the chunk.
pub fn select_signers<'a>(
    payer: &'a Keypair,
    candidates: &[&'a Keypair],
    instructions: &[Instruction],
) -> Vec<&'a Keypair> {
    let mut signers: Vec<&Keypair> = vec![payer];
    for candidate in candidates {
        if candidate.pubkey() == payer.pubkey() {
            continue;
        }
        let required = instructions.iter().any(|ix| {
            ix.accounts
                .iter()
                .any(|meta| meta.is_signer && meta.pubkey == candidate.pubkey())
        });
        if required {
            signers.push(candidate);
        }
    }
    signers
}

/// Compiles and signs one v0 transaction.
///
/// Deterministic given the same blockhash and table state. Every account
/// referenced through `tables` must already be present in them, otherwise
/// compilation fails.
pub fn compile_transaction(
    payer: &Pubkey,
    instructions: &[Instruction],
    tables: &[AddressLookupTableAccount],
    blockhash: Hash,
    signers: &[&Keypair],
) -> Result<VersionedTransaction, VolumeBotError> {
    let message = v0::Message::try_compile(payer, instructions, tables, blockhash)
        .map_err(|e| VolumeBotError::Parse(format!("Message compilation failed: {}", e)))?;

    VersionedTransaction::try_new(VersionedMessage::V0(message), &signers.to_vec())
        .map_err(|e| VolumeBotError::Wallet(format!("Signing failed: {}", e)))
}

/// Serialized wire size of a signed transaction.
pub fn transaction_size(tx: &VersionedTransaction) -> Result<usize, VolumeBotError> {
    let raw = bincode::serialize(tx)
        .map_err(|e| VolumeBotError::Parse(format!("Transaction serialization failed: {}", e)))?;
    Ok(raw.len())
}

/// Enforces the hard wire-size ceiling. A transaction failing this check
/// must never be submitted.
pub fn check_transaction_size(tx: &VersionedTransaction) -> Result<(), VolumeBotError> {
    let size = transaction_size(tx)?;
    if size > MAX_TX_SIZE {
        return Err(VolumeBotError::TransactionTooLarge { size, limit: MAX_TX_SIZE });
    }
    Ok(())
}

/// Compiles, signs and size-checks a whole batch, one transaction per chunk.
///
/// Returns the surviving transactions; oversized chunks are dropped with an
/// error log so the remaining chunks still go out.
pub fn build_batch_transactions(
    payer: &Keypair,
    chunks: Vec<Vec<InstructionSet<'_>>>,
    tables: &[AddressLookupTableAccount],
    blockhash: Hash,
) -> Vec<VersionedTransaction> {
    let mut transactions = Vec::new();

    for (index, chunk) in chunks.into_iter().enumerate() {
        let instructions: Vec<Instruction> = chunk
            .iter()
            .flat_map(|set| set.instructions.iter().cloned())
            .collect();
        if instructions.is_empty() {
            continue;
        }

        let wallets: Vec<&Keypair> = chunk.iter().map(|set| set.wallet).collect();
        let signers = select_signers(payer, &wallets, &instructions);

        let tx = match compile_transaction(
            &payer.pubkey(),
            &instructions,
            tables,
            blockhash,
            &signers,
        ) {
            Ok(tx) => tx,
            Err(e) => {
                crate::logger::error(
                    crate::logger::LogTag::Batch,
                    &format!("Chunk {} failed to compile: {}", index, e),
                );
                continue;
            }
        };

        match check_transaction_size(&tx) {
            Ok(()) => {
                crate::logger::debug(
                    crate::logger::LogTag::Batch,
                    &format!(
                        "Chunk {} compiled: {} bytes",
                        index,
                        transaction_size(&tx).unwrap_or(0)
                    ),
                );
                transactions.push(tx);
            }
            Err(e) => {
                crate::logger::error(
                    crate::logger::LogTag::Batch,
                    &format!("Chunk {} dropped: {}", index, e),
                );
            }
        }
    }

    transactions
}

/// Convenience: split flat wallet/instruction pairs and build everything.
pub fn chunk_and_build(
    payer: &Keypair,
    sets: Vec<InstructionSet<'_>>,
    batch_size: usize,
    tables: &[AddressLookupTableAccount],
    blockhash: Hash,
) -> Vec<VersionedTransaction> {
    build_batch_transactions(payer, chunk_instruction_sets(sets, batch_size), tables, blockhash)
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_sdk::system_instruction;

    fn transfer_set<'a>(wallet: &'a Keypair, to: &Pubkey, lamports: u64) -> InstructionSet<'a> {
        InstructionSet {
            wallet,
            instructions: vec![system_instruction::transfer(&wallet.pubkey(), to, lamports)],
        }
    }

    #[test]
    fn sets_chunk_at_batch_size() {
        let wallets: Vec<Keypair> = (0..20).map(|_| Keypair::new()).collect();
        let master = Pubkey::new_unique();
        let sets: Vec<InstructionSet> =
            wallets.iter().map(|w| transfer_set(w, &master, 1)).collect();

        let chunks = chunk_instruction_sets(sets, 8);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].len(), 8);
        assert_eq!(chunks[2].len(), 4);
    }

    #[test]
    fn signer_set_is_payer_plus_required_wallets() {
        let payer = Keypair::new();
        let signing_wallet = Keypair::new();
        let passive_wallet = Keypair::new();
        let destination = Pubkey::new_unique();

        // Only signing_wallet appears as a required signer.
        let instructions = vec![
            system_instruction::transfer(&signing_wallet.pubkey(), &destination, 10),
            system_instruction::transfer(&payer.pubkey(), &passive_wallet.pubkey(), 10),
        ];

        let candidates = [&signing_wallet, &passive_wallet];
        let signers = select_signers(&payer, &candidates, &instructions);
        let signer_keys: Vec<Pubkey> = signers.iter().map(|k| k.pubkey()).collect();
        assert_eq!(signer_keys, vec![payer.pubkey(), signing_wallet.pubkey()]);
    }

    #[test]
    fn payer_is_not_duplicated_in_signer_set() {
        let payer = Keypair::new();
        let destination = Pubkey::new_unique();
        let instructions = vec![system_instruction::transfer(&payer.pubkey(), &destination, 10)];

        let candidates = [&payer];
        let signers = select_signers(&payer, &candidates, &instructions);
        assert_eq!(signers.len(), 1);
    }

    #[test]
    fn compiled_collect_chunk_stays_under_the_ceiling() {
        let payer = Keypair::new();
        let wallets: Vec<Keypair> = (0..8).map(|_| Keypair::new()).collect();

        // Table carries the shared destination so it compresses out of the
        // message body.
        let table = AddressLookupTableAccount {
            key: Pubkey::new_unique(),
            addresses: vec![payer.pubkey()],
        };

        let sets: Vec<InstructionSet> =
            wallets.iter().map(|w| transfer_set(w, &payer.pubkey(), 1_000)).collect();
        let txs = chunk_and_build(&payer, sets, 8, &[table.clone()], Hash::default());

        assert_eq!(txs.len(), 1);
        assert!(transaction_size(&txs[0]).unwrap() <= MAX_TX_SIZE);
        // Payer plus the eight wallet signers.
        assert_eq!(txs[0].signatures.len(), 9);
    }

    #[test]
    fn oversized_chunk_is_dropped_and_the_rest_survive() {
        let payer = Keypair::new();
        // 20 signing wallets in one chunk blows the 1232-byte ceiling on
        // signatures alone; a follow-up chunk of 4 fits.
        let wallets: Vec<Keypair> = (0..24).map(|_| Keypair::new()).collect();

        let sets: Vec<InstructionSet> =
            wallets.iter().map(|w| transfer_set(w, &payer.pubkey(), 1_000)).collect();
        let txs = chunk_and_build(&payer, sets, 20, &[], Hash::default());

        assert_eq!(txs.len(), 1);
        assert_eq!(txs[0].signatures.len(), 5);
    }

    #[test]
    fn size_check_rejects_only_above_the_ceiling() {
        let payer = Keypair::new();
        let destination = Pubkey::new_unique();
        let instructions =
            vec![system_instruction::transfer(&payer.pubkey(), &destination, 1_000)];
        let tx = compile_transaction(
            &payer.pubkey(),
            &instructions,
            &[],
            Hash::default(),
            &[&payer],
        )
        .unwrap();

        assert!(check_transaction_size(&tx).is_ok());
        assert!(transaction_size(&tx).unwrap() < MAX_TX_SIZE);
    }

    #[test]
    fn compilation_is_deterministic_for_fixed_inputs() {
        let payer = Keypair::new();
        let destination = Pubkey::new_unique();
        let instructions =
            vec![system_instruction::transfer(&payer.pubkey(), &destination, 42)];

        let a = compile_transaction(&payer.pubkey(), &instructions, &[], Hash::default(), &[&payer])
            .unwrap();
        let b = compile_transaction(&payer.pubkey(), &instructions, &[], Hash::default(), &[&payer])
            .unwrap();
        assert_eq!(bincode::serialize(&a).unwrap(), bincode::serialize(&b).unwrap());
    }
}
