//! Zero-copy markets registry of the clearing house.
//!
//! The registry holds a fixed number of [`Market`] records. Records use a
//! C layout whose fields are naturally aligned, so they decode field by field
//! with no gaps.

use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;

use crate::{account_discriminator, check_discriminator, DecodeError, DISCRIMINATOR_LEN};

pub const MAX_MARKETS: usize = 64;

pub const MARKETS_ACCOUNT_SIZE: usize = DISCRIMINATOR_LEN + Markets::LEN;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OracleSource {
    Pyth = 0,
    Switchboard = 1,
}

impl TryFrom<u8> for OracleSource {
    type Error = DecodeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(OracleSource::Pyth),
            1 => Ok(OracleSource::Switchboard),
            x => Err(DecodeError::Malformed(format!("unknown oracle source {x}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Amm {
    pub base_asset_reserve: u128,
    pub quote_asset_reserve: u128,
    pub sqrt_k: u128,

    pub cumulative_repeg_rebate_long: u128,
    pub cumulative_repeg_rebate_short: u128,
    pub cumulative_funding_rate_long: u128,
    pub cumulative_funding_rate_short: u128,
    pub last_funding_rate: i128,
    pub last_funding_rate_ts: i64,
    pub funding_period: i64,
    pub peg_multiplier: u128,

    pub total_fee: u128,
    pub total_fee_minus_distributions: u128,
    pub total_fee_withdrawn: u128,

    pub minimum_base_asset_trade_size: u128,
    pub minimum_quote_asset_trade_size: u128,

    pub last_mark_price_twap: u128,
    pub last_mark_price_twap_ts: i64,

    pub last_oracle_price_twap_ts: i64,
    pub last_oracle_price_twap: i128,
    pub oracle: Pubkey,
    pub last_oracle_price: i128,
    pub base_spread: u16,
    pub oracle_source: u8,

    pub padding: [u8; 13],
}

impl Amm {
    pub const LEN: usize = 352;

    pub fn oracle_source(&self) -> Result<OracleSource, DecodeError> {
        OracleSource::try_from(self.oracle_source)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Market {
    pub base_asset_amount_long: i128,
    pub base_asset_amount_short: i128,
    pub base_asset_amount: i128,
    pub open_interest: u128,
    pub amm: Amm,
    pub margin_ratio_initial: u32,
    pub margin_ratio_partial: u32,
    pub margin_ratio_maintenance: u32,
    pub initialized: u8,

    pub padding0: [u8; 3],
    pub padding1: u128,
    pub padding2: u128,
    pub padding3: u128,
    pub padding4: u128,
}

impl Market {
    pub const LEN: usize = 16 * 4 + Amm::LEN + 4 * 3 + 1 + 3 + 16 * 4;

    pub fn is_initialized(&self) -> bool {
        self.initialized != 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Markets {
    pub markets: Vec<Market>,
}

impl Markets {
    pub const LEN: usize = Market::LEN * MAX_MARKETS;

    pub fn discriminator() -> [u8; DISCRIMINATOR_LEN] {
        account_discriminator("Markets")
    }

    pub fn try_from_account_data(data: &[u8]) -> Result<Self, DecodeError> {
        check_discriminator(data, &Self::discriminator())?;

        if data.len() < MARKETS_ACCOUNT_SIZE {
            return Err(DecodeError::TooShort {
                expected: MARKETS_ACCOUNT_SIZE,
                found: data.len(),
            });
        }

        let markets = data[DISCRIMINATOR_LEN..MARKETS_ACCOUNT_SIZE]
            .chunks_exact(Market::LEN)
            .map(bincode::deserialize::<Market>)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { markets })
    }

    pub fn get(&self, index: usize) -> Option<&Market> {
        self.markets.get(index)
    }

    pub fn initialized(&self) -> impl Iterator<Item = (usize, &Market)> {
        self.markets
            .iter()
            .enumerate()
            .filter(|(_, market)| market.is_initialized())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encoded_len_matches_layout() {
        let amm = bincode::serialized_size(&Amm::default()).unwrap() as usize;
        assert_eq!(amm, Amm::LEN);

        let market = bincode::serialized_size(&Market::default()).unwrap() as usize;
        assert_eq!(market, Market::LEN);
        assert_eq!(Markets::LEN, 31744);
    }

    #[test]
    fn decode_zeroed_registry() {
        let mut data = vec![0u8; MARKETS_ACCOUNT_SIZE];
        data[..DISCRIMINATOR_LEN].copy_from_slice(&Markets::discriminator());

        let markets = Markets::try_from_account_data(&data).unwrap();

        assert_eq!(markets.markets.len(), MAX_MARKETS);
        assert_eq!(markets.initialized().count(), 0);
        assert_eq!(
            markets.get(0).unwrap().amm.oracle_source().unwrap(),
            OracleSource::Pyth
        );
    }

    #[test]
    fn decode_picks_up_market_fields() {
        let market = Market {
            base_asset_amount_long: 42,
            base_asset_amount_short: -42,
            margin_ratio_initial: 2000,
            initialized: 1,
            amm: Amm {
                sqrt_k: 1_000_000,
                oracle: Pubkey::new_unique(),
                oracle_source: 1,
                ..Default::default()
            },
            ..Default::default()
        };

        let mut data = vec![0u8; MARKETS_ACCOUNT_SIZE];
        data[..DISCRIMINATOR_LEN].copy_from_slice(&Markets::discriminator());

        let offset = DISCRIMINATOR_LEN + Market::LEN * 3;
        let encoded = bincode::serialize(&market).unwrap();
        data[offset..offset + Market::LEN].copy_from_slice(&encoded);

        let markets = Markets::try_from_account_data(&data).unwrap();
        let initialized: Vec<_> = markets.initialized().collect();

        assert_eq!(initialized.len(), 1);
        assert_eq!(initialized[0].0, 3);
        assert_eq!(initialized[0].1, &market);
        assert_eq!(
            initialized[0].1.amm.oracle_source().unwrap(),
            OracleSource::Switchboard
        );
    }

    #[test]
    fn truncated_registry_is_rejected() {
        let mut data = vec![0u8; 1024];
        data[..DISCRIMINATOR_LEN].copy_from_slice(&Markets::discriminator());

        assert!(matches!(
            Markets::try_from_account_data(&data),
            Err(DecodeError::TooShort { .. })
        ));
    }
}
