//! Program-derived addresses of the clearing house.
//!
//! A derived address is found by hashing the seeds together with the program
//! id and a bump byte, starting from 255 and counting down until the result
//! falls off the ed25519 curve. The outcome only depends on its inputs, so
//! every party computing it agrees on the same address and bump.

use clearing_core::{Pubkey, COLLATERAL_VAULT_SEED, INSURANCE_VAULT_SEED};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DerivedAddress {
    pub address: Pubkey,
    pub bump: u8,
}

/// A vault token account and the address allowed to move its funds.
///
/// The vault is derived from its seed; the authority is derived from the
/// vault's own address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VaultAddresses {
    pub vault: DerivedAddress,
    pub authority: DerivedAddress,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressDeriver {
    program_id: Pubkey,
}

impl AddressDeriver {
    pub fn new(program_id: Pubkey) -> Self {
        Self { program_id }
    }

    pub fn program_id(&self) -> &Pubkey {
        &self.program_id
    }

    pub fn derive(&self, seeds: &[&[u8]]) -> DerivedAddress {
        let (address, bump) = Pubkey::find_program_address(seeds, &self.program_id);
        DerivedAddress { address, bump }
    }

    /// Successive derivations where each level is seeded with the address of
    /// the level before it. The first level uses `seeds`.
    pub fn chain(&self, seeds: &[&[u8]]) -> DerivationChain {
        DerivationChain {
            deriver: *self,
            seeds: seeds.iter().map(|x| x.to_vec()).collect(),
        }
    }

    pub fn vault(&self, seed: &[u8]) -> VaultAddresses {
        let mut chain = self.chain(&[seed]);

        VaultAddresses {
            vault: chain.next_level(),
            authority: chain.next_level(),
        }
    }

    pub fn collateral_vault(&self) -> VaultAddresses {
        self.vault(COLLATERAL_VAULT_SEED)
    }

    pub fn insurance_vault(&self) -> VaultAddresses {
        self.vault(INSURANCE_VAULT_SEED)
    }
}

/// Unbounded iterator over the levels of a derivation chain.
#[derive(Debug, Clone)]
pub struct DerivationChain {
    deriver: AddressDeriver,
    seeds: Vec<Vec<u8>>,
}

impl DerivationChain {
    pub fn next_level(&mut self) -> DerivedAddress {
        let seeds: Vec<&[u8]> = self.seeds.iter().map(Vec::as_slice).collect();
        let derived = self.deriver.derive(&seeds);

        self.seeds = vec![derived.address.to_bytes().to_vec()];

        derived
    }
}

impl Iterator for DerivationChain {
    type Item = DerivedAddress;

    fn next(&mut self) -> Option<Self::Item> {
        Some(self.next_level())
    }
}
