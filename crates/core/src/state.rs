//! Global state account of the clearing house.
//!
//! The account is laid out as an 8-byte discriminator followed by the fields
//! below, little endian and without implicit padding.

use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;

use crate::{account_discriminator, check_discriminator, DecodeError, DISCRIMINATOR_LEN};

pub const STATE_ACCOUNT_SIZE: usize = DISCRIMINATOR_LEN + State::LEN;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscountTokenTier {
    pub minimum_balance: u64,
    pub discount_numerator: u128,
    pub discount_denominator: u128,
}

impl DiscountTokenTier {
    pub const LEN: usize = 8 + 16 * 2;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscountTokenTiers {
    pub first_tier: DiscountTokenTier,
    pub second_tier: DiscountTokenTier,
    pub third_tier: DiscountTokenTier,
    pub fourth_tier: DiscountTokenTier,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferralDiscount {
    pub referrer_reward_numerator: u128,
    pub referrer_reward_denominator: u128,
    pub referee_discount_numerator: u128,
    pub referee_discount_denominator: u128,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeStructure {
    pub fee_numerator: u128,
    pub fee_denominator: u128,
    pub discount_token_tiers: DiscountTokenTiers,
    pub referral_discount: ReferralDiscount,
}

impl FeeStructure {
    pub const LEN: usize = 16 * 2 + DiscountTokenTier::LEN * 4 + 16 * 4;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceDivergenceGuardRails {
    pub mark_oracle_divergence_numerator: u128,
    pub mark_oracle_divergence_denominator: u128,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidityGuardRails {
    pub slots_before_stable: i64,
    pub confidence_interval_max_size: u128,
    pub too_volatile_ratio: i128,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleGuardRails {
    pub price_divergence: PriceDivergenceGuardRails,
    pub validity: ValidityGuardRails,
    pub use_for_liquidations: bool,
}

impl OracleGuardRails {
    pub const LEN: usize = 16 * 2 + (8 + 16 * 2) + 1;
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct State {
    pub admin: Pubkey,
    pub exchange_paused: bool,
    pub funding_paused: bool,
    pub admin_controls_prices: bool,
    pub collateral_mint: Pubkey,
    pub collateral_vault: Pubkey,
    pub collateral_vault_authority: Pubkey,
    pub collateral_vault_authority_nonce: u8,
    pub deposit_history: Pubkey,
    pub trade_history: Pubkey,
    pub funding_payment_history: Pubkey,
    pub funding_rate_history: Pubkey,
    pub liquidation_history: Pubkey,
    pub curve_history: Pubkey,
    pub insurance_vault: Pubkey,
    pub insurance_vault_authority: Pubkey,
    pub insurance_vault_authority_nonce: u8,
    pub markets: Pubkey,

    // margin ratios, in basis points
    pub margin_ratio_initial: u128,
    pub margin_ratio_maintenance: u128,
    pub margin_ratio_partial: u128,

    pub partial_liquidation_close_percentage_numerator: u128,
    pub partial_liquidation_close_percentage_denominator: u128,
    pub partial_liquidation_penalty_percentage_numerator: u128,
    pub partial_liquidation_penalty_percentage_denominator: u128,
    pub full_liquidation_penalty_percentage_numerator: u128,
    pub full_liquidation_penalty_percentage_denominator: u128,
    pub partial_liquidation_liquidator_share_denominator: u64,
    pub full_liquidation_liquidator_share_denominator: u64,

    pub fee_structure: FeeStructure,
    pub whitelist_mint: Pubkey,
    pub discount_mint: Pubkey,
    pub oracle_guard_rails: OracleGuardRails,
    pub max_deposit: u128,
    pub extended_curve_history: Pubkey,
    pub order_state: Pubkey,

    pub padding: [u128; 4],
}

impl State {
    pub const LEN: usize = 32
        + 3
        + 32 * 3
        + 1
        + 32 * 6
        + 32 * 2
        + 1
        + 32
        + 16 * 3
        + 16 * 6
        + 8 * 2
        + FeeStructure::LEN
        + 32 * 2
        + OracleGuardRails::LEN
        + 16
        + 32 * 2
        + 16 * 4;

    pub fn discriminator() -> [u8; DISCRIMINATOR_LEN] {
        account_discriminator("State")
    }

    pub fn try_from_account_data(data: &[u8]) -> Result<Self, DecodeError> {
        check_discriminator(data, &Self::discriminator())?;

        let body = &data[DISCRIMINATOR_LEN..];

        if body.len() < Self::LEN {
            return Err(DecodeError::TooShort {
                expected: STATE_ACCOUNT_SIZE,
                found: data.len(),
            });
        }

        Ok(bincode::deserialize(&body[..Self::LEN])?)
    }

    /// Write the discriminator and the encoded state at the start of `data`.
    pub fn write_account_data(&self, data: &mut [u8]) -> Result<(), DecodeError> {
        if data.len() < STATE_ACCOUNT_SIZE {
            return Err(DecodeError::TooShort {
                expected: STATE_ACCOUNT_SIZE,
                found: data.len(),
            });
        }

        let body = bincode::serialize(self)?;

        data[..DISCRIMINATOR_LEN].copy_from_slice(&Self::discriminator());
        data[DISCRIMINATOR_LEN..DISCRIMINATOR_LEN + body.len()].copy_from_slice(&body);

        Ok(())
    }
}
