use clearing_core::NetworkError;

/// Failure the emulated cluster injects into an otherwise healthy run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TestFault {
    #[default]
    None,
    /// Every airdrop request is refused by the faucet
    FundingRequest,
    /// The airdrop with the given ordinal (0-based, in submission order)
    /// is reported as failed when confirmed
    FundingConfirmationAt(usize),
    /// The token program refuses to create mints
    MintCreation,
    /// Account allocation transactions are refused
    Allocation,
}

impl TestFault {
    pub(crate) fn fault_err(&self) -> NetworkError {
        let component = match self {
            TestFault::None => "none",
            TestFault::FundingRequest => "faucet",
            TestFault::FundingConfirmationAt(_) => "airdrop confirmation",
            TestFault::MintCreation => "token program",
            TestFault::Allocation => "account allocation",
        };

        NetworkError::internal(format!("fault injection: {component}"))
    }
}
