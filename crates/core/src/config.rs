use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr};
use solana_sdk::pubkey::Pubkey;

use crate::{Lamports, CLEARING_HOUSE_PROGRAM_ID, LAMPORTS_PER_SOL};

fn default_signers() -> usize {
    1
}

fn default_airdrop_lamports() -> Lamports {
    100 * LAMPORTS_PER_SOL
}

fn default_mint_decimals() -> u8 {
    6
}

fn default_admin_controls_prices() -> bool {
    true
}

fn default_program_id() -> Pubkey {
    CLEARING_HOUSE_PROGRAM_ID
}

fn default_max_pending_airdrops() -> usize {
    1
}

fn default_max_level() -> tracing::Level {
    tracing::Level::INFO
}

#[serde_as]
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct HarnessConfig {
    /// Number of funded credentials in the pool
    #[serde(default = "default_signers")]
    pub signers: usize,

    /// Amount airdropped to each credential
    #[serde(default = "default_airdrop_lamports")]
    pub airdrop_lamports: Lamports,

    #[serde(default = "default_mint_decimals")]
    pub mint_decimals: u8,

    #[serde(default = "default_admin_controls_prices")]
    pub admin_controls_prices: bool,

    /// Emit every resolved control address once accounts are allocated
    #[serde(default)]
    pub log_addresses: bool,

    #[serde_as(as = "DisplayFromStr")]
    #[serde(default = "default_program_id")]
    pub program_id: Pubkey,

    #[serde(default)]
    pub emulator: EmulatorConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            signers: default_signers(),
            airdrop_lamports: default_airdrop_lamports(),
            mint_decimals: default_mint_decimals(),
            admin_controls_prices: default_admin_controls_prices(),
            log_addresses: false,
            program_id: default_program_id(),
            emulator: EmulatorConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct EmulatorConfig {
    /// How many airdrops may be awaiting confirmation at once before the
    /// emulated faucet starts rejecting requests.
    #[serde(default = "default_max_pending_airdrops")]
    pub max_pending_airdrops: usize,
}

impl Default for EmulatorConfig {
    fn default() -> Self {
        Self {
            max_pending_airdrops: default_max_pending_airdrops(),
        }
    }
}

#[serde_as]
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct LoggingConfig {
    #[serde_as(as = "DisplayFromStr")]
    #[serde(default = "default_max_level")]
    pub max_level: tracing::Level,

    #[serde(default)]
    pub include_emulator: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            max_level: default_max_level(),
            include_emulator: false,
        }
    }
}
