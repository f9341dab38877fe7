use clearing_core::LedgerClient;
use tracing::{debug, info, instrument};

use crate::prelude::*;

/// Ordered set of funded keypairs available to sign on behalf of a test.
///
/// Credentials are funded strictly one after the other: each airdrop is
/// confirmed before the next one is requested. Faucets that throttle the
/// number of unconfirmed airdrops per client never see more than one in
/// flight.
#[derive(Debug, Default)]
pub struct CredentialPool {
    signers: Vec<Keypair>,
}

impl CredentialPool {
    #[instrument(skip(ledger))]
    pub async fn create<L>(ledger: &L, signers_num: usize, lamports: Lamports) -> Result<Self, Error>
    where
        L: LedgerClient,
    {
        let mut signers = Vec::with_capacity(signers_num);

        for index in 0..signers_num {
            let keypair = Keypair::new();
            let address = keypair.pubkey();

            let tx = ledger
                .request_airdrop(&address, lamports)
                .await
                .map_err(|source| Error::Funding { index, source })?;

            debug!(index, %address, %tx, "airdrop requested");

            ledger
                .confirm_transaction(&tx)
                .await
                .map_err(|source| Error::Funding { index, source })?;

            let balance = ledger
                .get_balance(&address)
                .await
                .map_err(|source| Error::Funding { index, source })?;

            info!(index, %address, balance, "signer funded");

            signers.push(keypair);
        }

        Ok(Self { signers })
    }

    pub fn len(&self) -> usize {
        self.signers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signers.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Keypair> {
        self.signers.get(index)
    }

    /// Signer at `index`, distinguishing an empty pool from a bad index
    pub fn signer(&self, index: usize) -> Result<&Keypair, Error> {
        if self.signers.is_empty() {
            return Err(Error::NoSigner);
        }

        self.signers.get(index).ok_or(Error::SignerOutOfRange {
            index,
            len: self.signers.len(),
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = &Keypair> {
        self.signers.iter()
    }

    pub fn pubkeys(&self) -> Vec<Pubkey> {
        self.signers.iter().map(|x| x.pubkey()).collect()
    }
}
