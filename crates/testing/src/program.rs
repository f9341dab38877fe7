//! In-process emulation of the clearing house `initialize` instruction.
//!
//! Accounts are validated in declaration order before anything is written, so
//! a rejected instruction leaves the ledger untouched.

use std::collections::HashMap;

use clearing_core::{
    is_discriminator_unset,
    state::{
        DiscountTokenTier, DiscountTokenTiers, FeeStructure, OracleGuardRails,
        PriceDivergenceGuardRails, ReferralDiscount, ValidityGuardRails,
    },
    Account, InitializeAccounts, Markets, Mint, ProgramError, Pubkey, State, TokenAccount,
    COLLATERAL_VAULT_SEED, DISCRIMINATOR_LEN, INSURANCE_VAULT_SEED, MARKETS_ACCOUNT_SIZE,
    STATE_ACCOUNT_SIZE, TOKEN_PROGRAM_ID,
};
use tracing::debug;

use crate::rent_exempt_minimum;

pub const DEFAULT_FEE_NUMERATOR: u128 = 10;
pub const DEFAULT_FEE_DENOMINATOR: u128 = 10_000;

pub const DEFAULT_DISCOUNT_TOKEN_FIRST_TIER_MINIMUM_BALANCE: u64 = 1_000_000_000_000;
pub const DEFAULT_DISCOUNT_TOKEN_FIRST_TIER_DISCOUNT_NUMERATOR: u128 = 20;
pub const DEFAULT_DISCOUNT_TOKEN_FIRST_TIER_DISCOUNT_DENOMINATOR: u128 = 100;

pub const DEFAULT_DISCOUNT_TOKEN_SECOND_TIER_MINIMUM_BALANCE: u64 = 100_000_000_000;
pub const DEFAULT_DISCOUNT_TOKEN_SECOND_TIER_DISCOUNT_NUMERATOR: u128 = 15;
pub const DEFAULT_DISCOUNT_TOKEN_SECOND_TIER_DISCOUNT_DENOMINATOR: u128 = 100;

pub const DEFAULT_DISCOUNT_TOKEN_THIRD_TIER_MINIMUM_BALANCE: u64 = 10_000_000_000;
pub const DEFAULT_DISCOUNT_TOKEN_THIRD_TIER_DISCOUNT_NUMERATOR: u128 = 10;
pub const DEFAULT_DISCOUNT_TOKEN_THIRD_TIER_DISCOUNT_DENOMINATOR: u128 = 100;

pub const DEFAULT_DISCOUNT_TOKEN_FOURTH_TIER_MINIMUM_BALANCE: u64 = 1_000_000_000;
pub const DEFAULT_DISCOUNT_TOKEN_FOURTH_TIER_DISCOUNT_NUMERATOR: u128 = 5;
pub const DEFAULT_DISCOUNT_TOKEN_FOURTH_TIER_DISCOUNT_DENOMINATOR: u128 = 100;

pub const DEFAULT_REFERRER_REWARD_NUMERATOR: u128 = 5;
pub const DEFAULT_REFERRER_REWARD_DENOMINATOR: u128 = 100;
pub const DEFAULT_REFEREE_DISCOUNT_NUMERATOR: u128 = 5;
pub const DEFAULT_REFEREE_DISCOUNT_DENOMINATOR: u128 = 100;

pub const DEFAULT_MARGIN_RATIO_INITIAL: u128 = 2000;
pub const DEFAULT_MARGIN_RATIO_MAINTENANCE: u128 = 625;
pub const DEFAULT_MARGIN_RATIO_PARTIAL: u128 = 500;

fn default_fee_structure() -> FeeStructure {
    FeeStructure {
        fee_numerator: DEFAULT_FEE_NUMERATOR,
        fee_denominator: DEFAULT_FEE_DENOMINATOR,
        discount_token_tiers: DiscountTokenTiers {
            first_tier: DiscountTokenTier {
                minimum_balance: DEFAULT_DISCOUNT_TOKEN_FIRST_TIER_MINIMUM_BALANCE,
                discount_numerator: DEFAULT_DISCOUNT_TOKEN_FIRST_TIER_DISCOUNT_NUMERATOR,
                discount_denominator: DEFAULT_DISCOUNT_TOKEN_FIRST_TIER_DISCOUNT_DENOMINATOR,
            },
            second_tier: DiscountTokenTier {
                minimum_balance: DEFAULT_DISCOUNT_TOKEN_SECOND_TIER_MINIMUM_BALANCE,
                discount_numerator: DEFAULT_DISCOUNT_TOKEN_SECOND_TIER_DISCOUNT_NUMERATOR,
                discount_denominator: DEFAULT_DISCOUNT_TOKEN_SECOND_TIER_DISCOUNT_DENOMINATOR,
            },
            third_tier: DiscountTokenTier {
                minimum_balance: DEFAULT_DISCOUNT_TOKEN_THIRD_TIER_MINIMUM_BALANCE,
                discount_numerator: DEFAULT_DISCOUNT_TOKEN_THIRD_TIER_DISCOUNT_NUMERATOR,
                discount_denominator: DEFAULT_DISCOUNT_TOKEN_THIRD_TIER_DISCOUNT_DENOMINATOR,
            },
            fourth_tier: DiscountTokenTier {
                minimum_balance: DEFAULT_DISCOUNT_TOKEN_FOURTH_TIER_MINIMUM_BALANCE,
                discount_numerator: DEFAULT_DISCOUNT_TOKEN_FOURTH_TIER_DISCOUNT_NUMERATOR,
                discount_denominator: DEFAULT_DISCOUNT_TOKEN_FOURTH_TIER_DISCOUNT_DENOMINATOR,
            },
        },
        referral_discount: ReferralDiscount {
            referrer_reward_numerator: DEFAULT_REFERRER_REWARD_NUMERATOR,
            referrer_reward_denominator: DEFAULT_REFERRER_REWARD_DENOMINATOR,
            referee_discount_numerator: DEFAULT_REFEREE_DISCOUNT_NUMERATOR,
            referee_discount_denominator: DEFAULT_REFEREE_DISCOUNT_DENOMINATOR,
        },
    }
}

fn default_oracle_guard_rails() -> OracleGuardRails {
    OracleGuardRails {
        price_divergence: PriceDivergenceGuardRails {
            mark_oracle_divergence_numerator: 1,
            mark_oracle_divergence_denominator: 10,
        },
        validity: ValidityGuardRails {
            slots_before_stable: 1000,
            confidence_interval_max_size: 4,
            too_volatile_ratio: 5,
        },
        use_for_liquidations: true,
    }
}

/// Check that an account was pre-allocated for the program and is still zeroed
fn check_zeroed(
    accounts: &HashMap<Pubkey, Account>,
    key: &Pubkey,
    program_id: &Pubkey,
    space: usize,
) -> Result<(), ProgramError> {
    let account = accounts
        .get(key)
        .ok_or(ProgramError::AccountNotInitialized(*key))?;

    if account.owner != *program_id {
        return Err(ProgramError::AccountOwnedByWrongProgram(*key));
    }

    if account.data.len() < space {
        return Err(ProgramError::AccountDidNotDeserialize(*key));
    }

    if !is_discriminator_unset(&account.data) {
        return Err(ProgramError::AccountDiscriminatorAlreadySet(*key));
    }

    Ok(())
}

fn check_mint(accounts: &HashMap<Pubkey, Account>, key: &Pubkey) -> Result<(), ProgramError> {
    let account = accounts
        .get(key)
        .ok_or(ProgramError::AccountNotInitialized(*key))?;

    if account.owner != TOKEN_PROGRAM_ID {
        return Err(ProgramError::AccountOwnedByWrongProgram(*key));
    }

    match Mint::unpack(&account.data) {
        Ok(mint) if mint.is_initialized => Ok(()),
        _ => Err(ProgramError::AccountDidNotDeserialize(*key)),
    }
}

/// Check that a vault sits at its seeded address and has not been created yet
fn check_vault_slot(
    accounts: &HashMap<Pubkey, Account>,
    key: &Pubkey,
    seed: &[u8],
    program_id: &Pubkey,
) -> Result<(), ProgramError> {
    let (expected, _) = Pubkey::find_program_address(&[seed], program_id);

    if *key != expected {
        return Err(ProgramError::ConstraintSeeds(*key));
    }

    if accounts.contains_key(key) {
        return Err(ProgramError::AccountAlreadyInUse(*key));
    }

    Ok(())
}

fn token_account(mint: &Pubkey, owner: &Pubkey) -> Account {
    Account {
        lamports: rent_exempt_minimum(TokenAccount::LEN),
        data: TokenAccount::new(*mint, *owner).pack(),
        owner: TOKEN_PROGRAM_ID,
        executable: false,
        rent_epoch: 0,
    }
}

pub fn initialize(
    accounts: &mut HashMap<Pubkey, Account>,
    program_id: &Pubkey,
    admin: &Pubkey,
    admin_controls_prices: bool,
    bindings: &InitializeAccounts,
) -> Result<(), ProgramError> {
    check_zeroed(accounts, &bindings.state, program_id, STATE_ACCOUNT_SIZE)?;
    check_mint(accounts, &bindings.collateral_mint)?;
    check_vault_slot(
        accounts,
        &bindings.collateral_vault,
        COLLATERAL_VAULT_SEED,
        program_id,
    )?;
    check_vault_slot(
        accounts,
        &bindings.insurance_vault,
        INSURANCE_VAULT_SEED,
        program_id,
    )?;
    check_zeroed(accounts, &bindings.markets, program_id, MARKETS_ACCOUNT_SIZE)?;

    let vault_rent = rent_exempt_minimum(TokenAccount::LEN) * 2;
    let available = accounts.get(admin).map(|x| x.lamports).unwrap_or_default();

    if available < vault_rent {
        return Err(ProgramError::InsufficientLamports {
            available,
            required: vault_rent,
        });
    }

    let (collateral_vault_authority, collateral_vault_authority_nonce) =
        Pubkey::find_program_address(&[bindings.collateral_vault.as_ref()], program_id);

    if bindings.collateral_vault_authority != collateral_vault_authority {
        return Err(ProgramError::InvalidCollateralVaultAuthority);
    }

    let (insurance_vault_authority, insurance_vault_authority_nonce) =
        Pubkey::find_program_address(&[bindings.insurance_vault.as_ref()], program_id);

    if bindings.insurance_vault_authority != insurance_vault_authority {
        return Err(ProgramError::InvalidInsuranceVaultAuthority);
    }

    let state = State {
        admin: *admin,
        exchange_paused: false,
        funding_paused: false,
        admin_controls_prices,
        collateral_mint: bindings.collateral_mint,
        collateral_vault: bindings.collateral_vault,
        collateral_vault_authority,
        collateral_vault_authority_nonce,
        insurance_vault: bindings.insurance_vault,
        insurance_vault_authority,
        insurance_vault_authority_nonce,
        markets: bindings.markets,
        margin_ratio_initial: DEFAULT_MARGIN_RATIO_INITIAL,
        margin_ratio_maintenance: DEFAULT_MARGIN_RATIO_MAINTENANCE,
        margin_ratio_partial: DEFAULT_MARGIN_RATIO_PARTIAL,
        partial_liquidation_close_percentage_numerator: 25,
        partial_liquidation_close_percentage_denominator: 100,
        partial_liquidation_penalty_percentage_numerator: 25,
        partial_liquidation_penalty_percentage_denominator: 1000,
        full_liquidation_penalty_percentage_numerator: 1,
        full_liquidation_penalty_percentage_denominator: 1,
        partial_liquidation_liquidator_share_denominator: 2,
        full_liquidation_liquidator_share_denominator: 20,
        fee_structure: default_fee_structure(),
        oracle_guard_rails: default_oracle_guard_rails(),
        // history accounts are wired up by a later instruction
        ..Default::default()
    };

    let mut state_data = accounts
        .get(&bindings.state)
        .map(|x| x.data.clone())
        .unwrap_or_default();

    state
        .write_account_data(&mut state_data)
        .map_err(|_| ProgramError::AccountDidNotDeserialize(bindings.state))?;

    // validation passed, from here on nothing can fail
    if let Some(account) = accounts.get_mut(admin) {
        account.lamports -= vault_rent;
    }

    accounts.insert(
        bindings.collateral_vault,
        token_account(&bindings.collateral_mint, &collateral_vault_authority),
    );

    accounts.insert(
        bindings.insurance_vault,
        token_account(&bindings.collateral_mint, &insurance_vault_authority),
    );

    if let Some(markets) = accounts.get_mut(&bindings.markets) {
        markets.data[..DISCRIMINATOR_LEN].copy_from_slice(&Markets::discriminator());
    }

    if let Some(account) = accounts.get_mut(&bindings.state) {
        account.data = state_data;
    }

    debug!(admin = %admin, admin_controls_prices, "clearing house initialized");

    Ok(())
}
