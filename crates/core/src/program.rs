//! Identifiers and seeds of the clearing house program.

use solana_sdk::{hash::hashv, pubkey::Pubkey};

use crate::DecodeError;

pub const CLEARING_HOUSE_PROGRAM_ID: Pubkey =
    solana_sdk::pubkey!("HPx7dWgMDvEKRf5S8uLVG2VxEqdKRhQ5Q8meCqEsecZz");

pub const TOKEN_PROGRAM_ID: Pubkey =
    solana_sdk::pubkey!("TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA");

pub const SYSTEM_PROGRAM_ID: Pubkey = solana_sdk::system_program::ID;

pub const COLLATERAL_VAULT_SEED: &[u8] = b"collateral_vault";

pub const INSURANCE_VAULT_SEED: &[u8] = b"insurance_vault";

pub const DISCRIMINATOR_LEN: usize = 8;

pub type Discriminator = [u8; DISCRIMINATOR_LEN];

/// First 8 bytes of `sha256("account:<name>")`, prefixed to every account the
/// program owns.
pub fn account_discriminator(name: &str) -> Discriminator {
    let hash = hashv(&[b"account:", name.as_bytes()]).to_bytes();

    let mut out = [0u8; DISCRIMINATOR_LEN];
    out.copy_from_slice(&hash[..DISCRIMINATOR_LEN]);
    out
}

/// Returns true if the account has not been claimed by any account type yet.
pub fn is_discriminator_unset(data: &[u8]) -> bool {
    data.iter().take(DISCRIMINATOR_LEN).all(|x| *x == 0)
}

pub fn check_discriminator(data: &[u8], expected: &Discriminator) -> Result<(), DecodeError> {
    if data.len() < DISCRIMINATOR_LEN {
        return Err(DecodeError::TooShort {
            expected: DISCRIMINATOR_LEN,
            found: data.len(),
        });
    }

    let found = &data[..DISCRIMINATOR_LEN];

    if found != expected {
        return Err(DecodeError::Discriminator {
            expected: hex::encode(expected),
            found: hex::encode(found),
        });
    }

    Ok(())
}
