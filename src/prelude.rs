pub use clearing_core::{
    DecodeError, Keypair, Lamports, NetworkError, ProgramError, Pubkey, Signer, TxHandle,
};

use miette::Diagnostic;
use std::fmt::Display;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    #[error("funding signer {index} failed: {source}")]
    #[diagnostic(help("check the faucet is reachable and not rate limiting this client"))]
    Funding {
        index: usize,
        #[source]
        source: NetworkError,
    },

    #[error("collateral mint creation failed: {0}")]
    Mint(#[source] NetworkError),

    #[error("account allocation failed: {0}")]
    Allocation(#[source] NetworkError),

    #[error("clearing house rejected the call: {0}")]
    Application(#[source] ProgramError),

    #[error("network error: {0}")]
    Network(#[source] NetworkError),

    #[error("account {0} does not exist")]
    AccountNotFound(Pubkey),

    #[error("account {address} could not be decoded: {source}")]
    Decode {
        address: Pubkey,
        #[source]
        source: DecodeError,
    },

    #[error("the credential pool is empty")]
    NoSigner,

    #[error("signer index {index} is out of range for a pool of {len}")]
    SignerOutOfRange { index: usize, len: usize },

    #[error("configuration error: {0}")]
    ConfigError(String),

    #[error("{0}")]
    Message(String),
}

impl Error {
    pub fn config(text: impl Display) -> Error {
        Error::ConfigError(text.to_string())
    }

    pub fn message(text: impl Into<String>) -> Error {
        Error::Message(text.into())
    }

    pub fn decode(address: Pubkey, source: DecodeError) -> Error {
        Error::Decode { address, source }
    }

    /// The application-level rejection carried by this error, if any
    pub fn program_error(&self) -> Option<&ProgramError> {
        match self {
            Error::Application(x) => Some(x),
            _ => None,
        }
    }
}

impl From<ProgramError> for Error {
    fn from(value: ProgramError) -> Self {
        Error::Application(value)
    }
}

impl From<NetworkError> for Error {
    fn from(value: NetworkError) -> Self {
        match value {
            NetworkError::Program(x) => Error::Application(x),
            x => Error::Network(x),
        }
    }
}
