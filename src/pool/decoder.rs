/// Fixed-offset decoding of AMM pool accounts.
use super::types::Pool;
use crate::constants::POOL_ACCOUNT_SIZE;
use anyhow::{bail, Result};
use solana_sdk::pubkey::Pubkey;

fn read_pubkey(data: &[u8], offset: usize) -> Result<Pubkey> {
    Ok(Pubkey::new_from_array(data[offset..offset + 32].try_into()?))
}

/// Parse a pool record from raw account bytes.
///
/// Layout: discriminator(8) | pool_bump(1) | index(2) | creator(32)
/// | base_mint(32) | quote_mint(32) | lp_mint(32) | base_vault(32)
/// | quote_vault(32) | lp_supply(8)
pub fn decode_pool(address: &Pubkey, data: &[u8], is_native_base: bool) -> Result<Pool> {
    if data.len() < POOL_ACCOUNT_SIZE as usize {
        bail!("pool account too short: {} bytes, expected {}", data.len(), POOL_ACCOUNT_SIZE);
    }

    let mut offset = 8; // Skip discriminator
    offset += 1; // pool_bump
    offset += 2; // index
    offset += 32; // creator

    let base_mint = read_pubkey(data, offset)?;
    offset += 32;

    let quote_mint = read_pubkey(data, offset)?;
    offset += 32;

    offset += 32; // lp_mint

    let base_vault = read_pubkey(data, offset)?;
    offset += 32;

    let quote_vault = read_pubkey(data, offset)?;
    offset += 32;

    let lp_supply = u64::from_le_bytes(data[offset..offset + 8].try_into()?);

    Ok(Pool {
        address: *address,
        base_mint,
        quote_mint,
        base_vault,
        quote_vault,
        lp_supply,
        is_native_base,
    })
}

#[cfg(test)]
pub(crate) fn encode_pool_account(
    base_mint: &Pubkey,
    quote_mint: &Pubkey,
    base_vault: &Pubkey,
    quote_vault: &Pubkey,
    lp_supply: u64,
) -> Vec<u8> {
    let mut data = vec![0u8; POOL_ACCOUNT_SIZE as usize];
    data[0..8].copy_from_slice(&[241, 154, 109, 4, 17, 177, 109, 188]); // discriminator
    data[8] = 255; // pool_bump
    data[9..11].copy_from_slice(&0u16.to_le_bytes()); // index
    data[11..43].copy_from_slice(Pubkey::new_unique().as_ref()); // creator
    data[43..75].copy_from_slice(base_mint.as_ref());
    data[75..107].copy_from_slice(quote_mint.as_ref());
    data[107..139].copy_from_slice(Pubkey::new_unique().as_ref()); // lp_mint
    data[139..171].copy_from_slice(base_vault.as_ref());
    data[171..203].copy_from_slice(quote_vault.as_ref());
    data[203..211].copy_from_slice(&lp_supply.to_le_bytes());
    data
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{POOL_BASE_MINT_OFFSET, POOL_QUOTE_MINT_OFFSET};

    #[test]
    fn decodes_fields_at_documented_offsets() {
        let base_mint = Pubkey::new_unique();
        let quote_mint = Pubkey::new_unique();
        let base_vault = Pubkey::new_unique();
        let quote_vault = Pubkey::new_unique();
        let data = encode_pool_account(&base_mint, &quote_mint, &base_vault, &quote_vault, 777);

        // The scan filters rely on these offsets matching the layout.
        assert_eq!(&data[POOL_BASE_MINT_OFFSET..POOL_BASE_MINT_OFFSET + 32], base_mint.as_ref());
        assert_eq!(
            &data[POOL_QUOTE_MINT_OFFSET..POOL_QUOTE_MINT_OFFSET + 32],
            quote_mint.as_ref()
        );

        let address = Pubkey::new_unique();
        let pool = decode_pool(&address, &data, true).unwrap();
        assert_eq!(pool.address, address);
        assert_eq!(pool.base_mint, base_mint);
        assert_eq!(pool.quote_mint, quote_mint);
        assert_eq!(pool.base_vault, base_vault);
        assert_eq!(pool.quote_vault, quote_vault);
        assert_eq!(pool.lp_supply, 777);
        assert!(pool.is_native_base);
    }

    #[test]
    fn short_account_errors_instead_of_panicking() {
        let address = Pubkey::new_unique();
        let result = decode_pool(&address, &[0u8; 100], false);
        assert!(result.is_err());
    }
}
