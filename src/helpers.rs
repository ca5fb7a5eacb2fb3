/// Small shared utilities used across the bot.
use crate::constants::LAMPORTS_PER_SOL;
use solana_sdk::pubkey::Pubkey;
use std::time::Duration;

/// Splits a slice into consecutive chunks of at most `size` items.
pub fn chunk_array<T: Clone>(items: &[T], size: usize) -> Vec<Vec<T>> {
    assert!(size > 0, "chunk size must be greater than 0");
    items.chunks(size).map(|c| c.to_vec()).collect()
}

/// Number of chunks a slice of `len` items splits into at `size` per chunk.
pub fn chunk_count(len: usize, size: usize) -> usize {
    len.div_ceil(size)
}

pub fn lamports_to_sol(lamports: u64) -> f64 {
    lamports as f64 / LAMPORTS_PER_SOL as f64
}

pub fn sol_to_lamports(sol: f64) -> u64 {
    (sol * LAMPORTS_PER_SOL as f64) as u64
}

/// Shortened address for log output.
pub fn short_pubkey(pubkey: &Pubkey) -> String {
    let full = pubkey.to_string();
    full.chars().take(8).collect()
}

pub async fn sleep_ms(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunking_covers_all_items_without_overlap() {
        let items: Vec<u32> = (0..20).collect();
        let chunks = chunk_array(&items, 8);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].len(), 8);
        assert_eq!(chunks[1].len(), 8);
        assert_eq!(chunks[2].len(), 4);
        let flat: Vec<u32> = chunks.into_iter().flatten().collect();
        assert_eq!(flat, items);

        assert_eq!(chunk_count(20, 8), 3);
        assert_eq!(chunk_count(0, 8), 0);
        assert_eq!(chunk_count(8, 8), 1);
    }

    #[test]
    fn lamport_conversions() {
        assert_eq!(sol_to_lamports(0.004), 4_000_000);
        assert_eq!(sol_to_lamports(0.5), 500_000_000);
        assert!((lamports_to_sol(2_039_280) - 0.00203928).abs() < 1e-12);
    }

    #[test]
    fn short_pubkey_is_eight_chars() {
        let key = Pubkey::new_unique();
        assert_eq!(short_pubkey(&key).len(), 8);
    }
}
