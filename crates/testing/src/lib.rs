use clearing_core::{Keypair, Lamports, NetworkError, Pubkey, Signer};

pub mod faults;
pub mod program;
pub mod toy_cluster;

pub use faults::TestFault;
pub use toy_cluster::ToyCluster;

const ACCOUNT_STORAGE_OVERHEAD: u64 = 128;

const LAMPORTS_PER_BYTE_YEAR: u64 = 3480;

const EXEMPTION_THRESHOLD_YEARS: u64 = 2;

/// Lamports an account of `space` bytes must hold to be exempt from rent.
pub fn rent_exempt_minimum(space: usize) -> Lamports {
    (ACCOUNT_STORAGE_OVERHEAD + space as u64) * LAMPORTS_PER_BYTE_YEAR * EXEMPTION_THRESHOLD_YEARS
}

/// A keypair whose account already holds `lamports`, bypassing the faucet.
pub fn funded_keypair(
    cluster: &ToyCluster,
    lamports: Lamports,
) -> Result<Keypair, NetworkError> {
    let keypair = Keypair::new();
    cluster.credit(&keypair.pubkey(), lamports)?;
    Ok(keypair)
}

/// Deterministic address for fixtures that need a stable, distinct key.
pub fn test_pubkey(seed: &str) -> Pubkey {
    let hash = solana_sdk::hash::hash(seed.as_bytes());
    Pubkey::new_from_array(hash.to_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rent_grows_with_space() {
        assert_eq!(rent_exempt_minimum(0), 890_880);
        assert!(rent_exempt_minimum(165) > rent_exempt_minimum(82));
    }

    #[test]
    fn test_pubkeys_are_stable() {
        assert_eq!(test_pubkey("alice"), test_pubkey("alice"));
        assert_ne!(test_pubkey("alice"), test_pubkey("bob"));
    }
}
