use thiserror::Error;

pub use solana_sdk::{
    account::Account,
    pubkey::Pubkey,
    signature::{Keypair, Signature, Signer},
};

pub mod config;
pub mod market;
pub mod program;
pub mod state;
pub mod token;

pub use market::{Amm, Market, Markets, OracleSource, MARKETS_ACCOUNT_SIZE, MAX_MARKETS};
pub use program::*;
pub use state::{State, STATE_ACCOUNT_SIZE};
pub use token::{Mint, TokenAccount};

/// Signature of a submitted transaction, used to poll for its confirmation
pub type TxHandle = Signature;

/// Amount in the network's base unit
pub type Lamports = u64;

pub const LAMPORTS_PER_SOL: Lamports = solana_sdk::native_token::LAMPORTS_PER_SOL;

/// Result of a combined account allocation.
///
/// Addresses are returned in the same order as the requested sizes. The
/// allocation transaction still has to be confirmed by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Allocation {
    pub tx: TxHandle,
    pub addresses: Vec<Pubkey>,
}

/// Accounts bound to the clearing house `initialize` instruction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitializeAccounts {
    pub state: Pubkey,
    pub collateral_mint: Pubkey,
    pub collateral_vault: Pubkey,
    pub collateral_vault_authority: Pubkey,
    pub insurance_vault: Pubkey,
    pub insurance_vault_authority: Pubkey,
    pub markets: Pubkey,
}

/// Rejection raised by an on-chain program while executing an instruction.
///
/// Codes follow the program framework numbering: system errors are small
/// integers, framework constraint errors live in the 2000/3000 ranges and the
/// clearing house's own errors start at 6000.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProgramError {
    #[error("account {0} already in use")]
    AccountAlreadyInUse(Pubkey),

    #[error("insufficient lamports: {available} available, {required} required")]
    InsufficientLamports { available: Lamports, required: Lamports },

    #[error("a seeds constraint was violated by {0}")]
    ConstraintSeeds(Pubkey),

    #[error("account discriminator already set on {0}")]
    AccountDiscriminatorAlreadySet(Pubkey),

    #[error("failed to deserialize account {0}")]
    AccountDidNotDeserialize(Pubkey),

    #[error("account {0} is owned by a different program")]
    AccountOwnedByWrongProgram(Pubkey),

    #[error("account {0} is not initialized")]
    AccountNotInitialized(Pubkey),

    #[error("clearing house not collateral vault owner")]
    InvalidCollateralVaultAuthority,

    #[error("clearing house not insurance vault owner")]
    InvalidInsuranceVaultAuthority,
}

impl ProgramError {
    pub fn code(&self) -> u32 {
        match self {
            Self::AccountAlreadyInUse(_) => 0,
            Self::InsufficientLamports { .. } => 1,
            Self::ConstraintSeeds(_) => 2006,
            Self::AccountDiscriminatorAlreadySet(_) => 3000,
            Self::AccountDidNotDeserialize(_) => 3003,
            Self::AccountOwnedByWrongProgram(_) => 3007,
            Self::AccountNotInitialized(_) => 3012,
            Self::InvalidCollateralVaultAuthority => 6000,
            Self::InvalidInsuranceVaultAuthority => 6001,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::AccountAlreadyInUse(_) => "AccountAlreadyInUse",
            Self::InsufficientLamports { .. } => "InsufficientLamports",
            Self::ConstraintSeeds(_) => "ConstraintSeeds",
            Self::AccountDiscriminatorAlreadySet(_) => "AccountDiscriminatorAlreadySet",
            Self::AccountDidNotDeserialize(_) => "AccountDidNotDeserialize",
            Self::AccountOwnedByWrongProgram(_) => "AccountOwnedByWrongProgram",
            Self::AccountNotInitialized(_) => "AccountNotInitialized",
            Self::InvalidCollateralVaultAuthority => "InvalidCollateralVaultAuthority",
            Self::InvalidInsuranceVaultAuthority => "InvalidInsuranceVaultAuthority",
        }
    }
}

#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("transaction {0} failed: {1}")]
    TransactionFailed(TxHandle, String),

    #[error("transaction {0} is unknown to the cluster")]
    UnknownTransaction(TxHandle),

    #[error("airdrop rate limit reached")]
    RateLimited,

    #[error("insufficient funds in {address}: {available} available, {required} required")]
    InsufficientFunds {
        address: Pubkey,
        available: Lamports,
        required: Lamports,
    },

    #[error("account {0} already in use")]
    AccountInUse(Pubkey),

    #[error("program rejected the instruction: {0}")]
    Program(#[from] ProgramError),

    #[error("internal error: {0}")]
    Internal(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl NetworkError {
    pub fn internal<T>(value: T) -> Self
    where
        T: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        NetworkError::Internal(value.into())
    }

    /// The application-level rejection carried by this error, if any
    pub fn program_error(&self) -> Option<&ProgramError> {
        match self {
            NetworkError::Program(x) => Some(x),
            _ => None,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("account data too short: expected at least {expected} bytes, found {found}")]
    TooShort { expected: usize, found: usize },

    #[error("discriminator mismatch: expected {expected}, found {found}")]
    Discriminator { expected: String, found: String },

    #[error("invalid option tag {1} in {0}")]
    InvalidOptionTag(&'static str, u32),

    #[error("malformed account data: {0}")]
    Malformed(String),
}

impl From<bincode::Error> for DecodeError {
    fn from(value: bincode::Error) -> Self {
        DecodeError::Malformed(value.to_string())
    }
}

/// Ledger-level operations of a cluster node.
#[trait_variant::make(Send)]
pub trait LedgerClient: Clone + Send + Sync + 'static {
    async fn request_airdrop(&self, to: &Pubkey, lamports: Lamports)
        -> Result<TxHandle, NetworkError>;

    /// Wait until the transaction is confirmed by the cluster.
    ///
    /// Fails with [`NetworkError::TransactionFailed`] when the cluster reports
    /// the transaction as failed.
    async fn confirm_transaction(&self, tx: &TxHandle) -> Result<(), NetworkError>;

    async fn get_balance(&self, address: &Pubkey) -> Result<Lamports, NetworkError>;

    async fn get_account(&self, address: &Pubkey) -> Result<Option<Account>, NetworkError>;

    async fn minimum_balance_for_rent_exemption(
        &self,
        space: usize,
    ) -> Result<Lamports, NetworkError>;

    /// Create one zeroed account per requested size, owned by `owner` and paid
    /// for by `payer`, in a single transaction. Either every account is
    /// created or none is.
    async fn allocate_accounts(
        &self,
        payer: &Keypair,
        spaces: &[usize],
        owner: &Pubkey,
    ) -> Result<Allocation, NetworkError>;
}

/// The token program's mint management.
#[trait_variant::make(Send)]
pub trait TokenMints: Clone + Send + Sync + 'static {
    async fn create_mint(
        &self,
        payer: &Keypair,
        mint_authority: &Pubkey,
        freeze_authority: Option<&Pubkey>,
        decimals: u8,
    ) -> Result<Pubkey, NetworkError>;
}

/// Typed client of the clearing house program.
#[trait_variant::make(Send)]
pub trait ClearingHouseClient: Clone + Send + Sync + 'static {
    fn program_id(&self) -> Pubkey;

    async fn initialize(
        &self,
        admin: &Keypair,
        admin_controls_prices: bool,
        accounts: &InitializeAccounts,
    ) -> Result<TxHandle, NetworkError>;
}

/// The set of collaborators the harness drives.
pub trait Cluster: Clone + Send + Sync + 'static {
    type Ledger: LedgerClient;
    type Tokens: TokenMints;
    type Program: ClearingHouseClient;

    fn ledger(&self) -> &Self::Ledger;

    fn tokens(&self) -> &Self::Tokens;

    fn program(&self) -> &Self::Program;
}
