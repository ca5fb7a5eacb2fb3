/// AMM buy/sell instruction builders.
///
/// Instruction data is 24 bytes: the 8-byte Anchor discriminator followed by
/// two little-endian u64 amounts. The account list mirrors the program's
/// expected ordering, including the duplicated token program slot.
use crate::constants::{
    BUY_DISCRIMINATOR, EVENT_AUTHORITY, FEE_RECIPIENT, FEE_RECIPIENT_ATA, GLOBAL_CONFIG,
    PUMP_AMM_PROGRAM_ID, SELL_DISCRIMINATOR,
};
use solana_sdk::{
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
    system_program,
};
use spl_associated_token_account::get_associated_token_address;
use spl_token::native_mint;

fn swap_account_metas(pool: &Pubkey, user: &Pubkey, mint: &Pubkey) -> Vec<AccountMeta> {
    let user_base_token_account = get_associated_token_address(user, mint);
    let user_quote_token_account = get_associated_token_address(user, &native_mint::ID);
    let pool_base_token_account = get_associated_token_address(pool, mint);
    let pool_quote_token_account = get_associated_token_address(pool, &native_mint::ID);

    vec![
        AccountMeta::new_readonly(*pool, false),
        AccountMeta::new(*user, true),
        AccountMeta::new_readonly(GLOBAL_CONFIG, false),
        AccountMeta::new_readonly(*mint, false),
        AccountMeta::new_readonly(native_mint::ID, false),
        AccountMeta::new(user_base_token_account, false),
        AccountMeta::new(user_quote_token_account, false),
        AccountMeta::new(pool_base_token_account, false),
        AccountMeta::new(pool_quote_token_account, false),
        AccountMeta::new_readonly(FEE_RECIPIENT, false),
        AccountMeta::new(FEE_RECIPIENT_ATA, false),
        AccountMeta::new_readonly(spl_token::ID, false),
        // The program expects the token program twice (base and quote side).
        AccountMeta::new_readonly(spl_token::ID, false),
        AccountMeta::new_readonly(system_program::ID, false),
        AccountMeta::new_readonly(spl_associated_token_account::ID, false),
        AccountMeta::new_readonly(EVENT_AUTHORITY, false),
        AccountMeta::new_readonly(PUMP_AMM_PROGRAM_ID, false),
    ]
}

fn swap_instruction_data(discriminator: &[u8; 8], first: u64, second: u64) -> Vec<u8> {
    let mut data = Vec::with_capacity(24);
    data.extend_from_slice(discriminator);
    data.extend_from_slice(&first.to_le_bytes());
    data.extend_from_slice(&second.to_le_bytes());
    data
}

/// Buy `base_amount_out` base tokens for at most `max_quote_amount_in`
/// quote lamports.
pub fn build_buy_instruction(
    pool: &Pubkey,
    user: &Pubkey,
    mint: &Pubkey,
    base_amount_out: u64,
    max_quote_amount_in: u64,
) -> Instruction {
    Instruction {
        program_id: PUMP_AMM_PROGRAM_ID,
        accounts: swap_account_metas(pool, user, mint),
        data: swap_instruction_data(&BUY_DISCRIMINATOR, base_amount_out, max_quote_amount_in),
    }
}

/// Sell `base_amount_in` base tokens for at least `min_quote_amount_out`
/// quote lamports.
pub fn build_sell_instruction(
    pool: &Pubkey,
    user: &Pubkey,
    mint: &Pubkey,
    base_amount_in: u64,
    min_quote_amount_out: u64,
) -> Instruction {
    Instruction {
        program_id: PUMP_AMM_PROGRAM_ID,
        accounts: swap_account_metas(pool, user, mint),
        data: swap_instruction_data(&SELL_DISCRIMINATOR, base_amount_in, min_quote_amount_out),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buy_data_is_discriminator_plus_two_le_u64() {
        let pool = Pubkey::new_unique();
        let user = Pubkey::new_unique();
        let mint = Pubkey::new_unique();

        let ix = build_buy_instruction(&pool, &user, &mint, 12_345, 67_890);
        assert_eq!(ix.program_id, PUMP_AMM_PROGRAM_ID);
        assert_eq!(ix.data.len(), 24);
        assert_eq!(&ix.data[0..8], &BUY_DISCRIMINATOR);
        assert_eq!(u64::from_le_bytes(ix.data[8..16].try_into().unwrap()), 12_345);
        assert_eq!(u64::from_le_bytes(ix.data[16..24].try_into().unwrap()), 67_890);
    }

    #[test]
    fn sell_data_uses_the_sell_discriminator() {
        let pool = Pubkey::new_unique();
        let user = Pubkey::new_unique();
        let mint = Pubkey::new_unique();

        let ix = build_sell_instruction(&pool, &user, &mint, 1_000_000, 0);
        assert_eq!(&ix.data[0..8], &SELL_DISCRIMINATOR);
        assert_eq!(u64::from_le_bytes(ix.data[16..24].try_into().unwrap()), 0);
    }

    #[test]
    fn user_is_the_only_signer_in_the_account_list() {
        let pool = Pubkey::new_unique();
        let user = Pubkey::new_unique();
        let mint = Pubkey::new_unique();

        let ix = build_buy_instruction(&pool, &user, &mint, 1, 1);
        assert_eq!(ix.accounts.len(), 17);

        let signers: Vec<&AccountMeta> =
            ix.accounts.iter().filter(|meta| meta.is_signer).collect();
        assert_eq!(signers.len(), 1);
        assert_eq!(signers[0].pubkey, user);

        // User token accounts derive per-owner, per-mint.
        assert_eq!(ix.accounts[5].pubkey, get_associated_token_address(&user, &mint));
        assert_eq!(
            ix.accounts[6].pubkey,
            get_associated_token_address(&user, &native_mint::ID)
        );
    }
}
