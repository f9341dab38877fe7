use clearing_core::{
    Account, LedgerClient, Markets, Mint, State, TokenAccount, TOKEN_PROGRAM_ID,
};

use crate::{bootstrap::ControlAccounts, prelude::*};

/// Typed reads of the clearing house accounts a harness set up.
#[derive(Debug, Clone)]
pub struct StateAccessor<L> {
    ledger: L,
    program_id: Pubkey,
    accounts: ControlAccounts,
}

impl<L> StateAccessor<L>
where
    L: LedgerClient,
{
    pub fn new(ledger: L, program_id: Pubkey, accounts: ControlAccounts) -> Self {
        Self {
            ledger,
            program_id,
            accounts,
        }
    }

    async fn fetch(&self, address: &Pubkey, owner: &Pubkey) -> Result<Account, Error> {
        let account = self
            .ledger
            .get_account(address)
            .await?
            .ok_or(Error::AccountNotFound(*address))?;

        if account.owner != *owner {
            let source = DecodeError::Malformed(format!(
                "owned by {}, expected {}",
                account.owner, owner
            ));

            return Err(Error::decode(*address, source));
        }

        Ok(account)
    }

    /// Current contents of the state account.
    ///
    /// Fails with [`Error::Decode`] until `initialize` has written it.
    pub async fn get_state(&self) -> Result<State, Error> {
        let address = self.accounts.state;
        let account = self.fetch(&address, &self.program_id).await?;

        State::try_from_account_data(&account.data).map_err(|x| Error::decode(address, x))
    }

    pub async fn get_markets(&self) -> Result<Markets, Error> {
        let address = self.accounts.markets;
        let account = self.fetch(&address, &self.program_id).await?;

        Markets::try_from_account_data(&account.data).map_err(|x| Error::decode(address, x))
    }

    pub async fn get_collateral_mint(&self) -> Result<Mint, Error> {
        let address = self.accounts.collateral_mint;
        let account = self.fetch(&address, &TOKEN_PROGRAM_ID).await?;

        Mint::unpack(&account.data).map_err(|x| Error::decode(address, x))
    }

    async fn get_token_account(&self, address: Pubkey) -> Result<TokenAccount, Error> {
        let account = self.fetch(&address, &TOKEN_PROGRAM_ID).await?;

        TokenAccount::unpack(&account.data).map_err(|x| Error::decode(address, x))
    }

    pub async fn get_collateral_vault(&self) -> Result<TokenAccount, Error> {
        self.get_token_account(self.accounts.collateral_vault.vault.address)
            .await
    }

    pub async fn get_insurance_vault(&self) -> Result<TokenAccount, Error> {
        self.get_token_account(self.accounts.insurance_vault.vault.address)
            .await
    }
}
