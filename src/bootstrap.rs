//! Staged bring-up of a clearing house deployment.
//!
//! Every transition borrows the current stage and returns a harness at the
//! next one. When a transition fails the caller still owns the previous
//! stage and can retry or inspect it.

use std::sync::Arc;

use clearing_core::{
    config::HarnessConfig, ClearingHouseClient, Cluster, InitializeAccounts, LedgerClient,
    TokenMints, MARKETS_ACCOUNT_SIZE, STATE_ACCOUNT_SIZE,
};
use tracing::{debug, info, instrument, warn};

use crate::{
    accessor::StateAccessor,
    derive::{AddressDeriver, VaultAddresses},
    pool::CredentialPool,
    prelude::*,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapStage {
    Created,
    CredentialsFunded,
    MintReady,
    AccountsAllocated,
    Initialized,
}

pub trait Stage {
    const STAGE: BootstrapStage;
}

/// A stage that holds a funded credential pool
pub trait FundedStage: Stage {
    fn pool(&self) -> &CredentialPool;
}

/// A stage whose control accounts have been allocated
pub trait AllocatedStage: FundedStage {
    fn accounts(&self) -> &ControlAccounts;
}

/// An account allocated for the program ahead of `initialize`, at an address
/// chosen by the allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BootstrapAccountSpec {
    pub role: &'static str,
    pub space: usize,
}

/// Allocated in this order, in a single transaction
pub const BOOTSTRAP_ACCOUNTS: [BootstrapAccountSpec; 2] = [
    BootstrapAccountSpec {
        role: "state",
        space: STATE_ACCOUNT_SIZE,
    },
    BootstrapAccountSpec {
        role: "markets",
        space: MARKETS_ACCOUNT_SIZE,
    },
];

/// Addresses of every account the clearing house is initialized with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlAccounts {
    /// Credential that paid for the allocation
    pub payer: Pubkey,
    pub collateral_mint: Pubkey,
    pub state: Pubkey,
    pub markets: Pubkey,
    pub collateral_vault: VaultAddresses,
    pub insurance_vault: VaultAddresses,
}

impl ControlAccounts {
    pub fn initialize_accounts(&self) -> InitializeAccounts {
        InitializeAccounts {
            state: self.state,
            collateral_mint: self.collateral_mint,
            collateral_vault: self.collateral_vault.vault.address,
            collateral_vault_authority: self.collateral_vault.authority.address,
            insurance_vault: self.insurance_vault.vault.address,
            insurance_vault_authority: self.insurance_vault.authority.address,
            markets: self.markets,
        }
    }

    pub fn addresses(&self) -> [(&'static str, Pubkey); 7] {
        [
            ("state", self.state),
            ("collateral mint", self.collateral_mint),
            ("collateral vault", self.collateral_vault.vault.address),
            (
                "collateral vault authority",
                self.collateral_vault.authority.address,
            ),
            ("insurance vault", self.insurance_vault.vault.address),
            (
                "insurance vault authority",
                self.insurance_vault.authority.address,
            ),
            ("markets", self.markets),
        ]
    }

    pub fn log(&self) {
        for (name, address) in self.addresses() {
            info!(%address, "{name}");
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Created;

#[derive(Debug, Clone)]
pub struct CredentialsFunded {
    pool: Arc<CredentialPool>,
}

#[derive(Debug, Clone)]
pub struct MintReady {
    pool: Arc<CredentialPool>,
    collateral_mint: Pubkey,
}

#[derive(Debug, Clone)]
pub struct AccountsAllocated {
    pool: Arc<CredentialPool>,
    accounts: ControlAccounts,
}

#[derive(Debug, Clone)]
pub struct Initialized {
    pool: Arc<CredentialPool>,
    accounts: ControlAccounts,
    tx: TxHandle,
}

impl Stage for Created {
    const STAGE: BootstrapStage = BootstrapStage::Created;
}

impl Stage for CredentialsFunded {
    const STAGE: BootstrapStage = BootstrapStage::CredentialsFunded;
}

impl Stage for MintReady {
    const STAGE: BootstrapStage = BootstrapStage::MintReady;
}

impl Stage for AccountsAllocated {
    const STAGE: BootstrapStage = BootstrapStage::AccountsAllocated;
}

impl Stage for Initialized {
    const STAGE: BootstrapStage = BootstrapStage::Initialized;
}

impl FundedStage for CredentialsFunded {
    fn pool(&self) -> &CredentialPool {
        &self.pool
    }
}

impl FundedStage for MintReady {
    fn pool(&self) -> &CredentialPool {
        &self.pool
    }
}

impl FundedStage for AccountsAllocated {
    fn pool(&self) -> &CredentialPool {
        &self.pool
    }
}

impl FundedStage for Initialized {
    fn pool(&self) -> &CredentialPool {
        &self.pool
    }
}

impl AllocatedStage for AccountsAllocated {
    fn accounts(&self) -> &ControlAccounts {
        &self.accounts
    }
}

impl AllocatedStage for Initialized {
    fn accounts(&self) -> &ControlAccounts {
        &self.accounts
    }
}

#[derive(Debug, Clone)]
pub struct Harness<C, S> {
    cluster: C,
    config: HarnessConfig,
    deriver: AddressDeriver,
    active: usize,
    stage: S,
}

impl<C, S> Harness<C, S>
where
    C: Cluster,
    S: Stage,
{
    pub fn stage(&self) -> BootstrapStage {
        S::STAGE
    }

    pub fn cluster(&self) -> &C {
        &self.cluster
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    pub fn deriver(&self) -> &AddressDeriver {
        &self.deriver
    }

    fn advance<N: Stage>(&self, stage: N) -> Harness<C, N> {
        let (from, to) = (S::STAGE, N::STAGE);
        info!(?from, ?to, "bootstrap stage reached");

        Harness {
            cluster: self.cluster.clone(),
            config: self.config.clone(),
            deriver: self.deriver,
            active: self.active,
            stage,
        }
    }
}

impl<C, S> Harness<C, S>
where
    C: Cluster,
    S: FundedStage,
{
    pub fn pool(&self) -> &CredentialPool {
        self.stage.pool()
    }

    pub fn active_signer_index(&self) -> usize {
        self.active
    }

    /// The credential that signs and pays for the next transition
    pub fn current_signer(&self) -> Result<&Keypair, Error> {
        self.stage.pool().signer(self.active)
    }

    pub fn set_active_signer(&mut self, index: usize) -> Result<(), Error> {
        self.stage.pool().signer(index)?;
        self.active = index;

        Ok(())
    }

    pub fn with_active_signer(mut self, index: usize) -> Result<Self, Error> {
        self.set_active_signer(index)?;
        Ok(self)
    }
}

impl<C, S> Harness<C, S>
where
    C: Cluster,
    S: AllocatedStage,
{
    pub fn accounts(&self) -> &ControlAccounts {
        self.stage.accounts()
    }

    pub fn state_accessor(&self) -> StateAccessor<C::Ledger> {
        StateAccessor::new(
            self.cluster.ledger().clone(),
            *self.deriver.program_id(),
            self.stage.accounts().clone(),
        )
    }
}

impl<C> Harness<C, Created>
where
    C: Cluster,
{
    /// Start a harness over `cluster`.
    ///
    /// Addresses are derived against the program the cluster's client is
    /// bound to. `config.program_id` only selects the program when a cluster
    /// is built from the config; a differing value here is logged and
    /// ignored.
    pub fn new(cluster: C, config: HarnessConfig) -> Self {
        let program_id = cluster.program().program_id();

        if config.program_id != program_id {
            warn!(
                configured = %config.program_id,
                cluster = %program_id,
                "configured program id differs from the cluster's, using the cluster's"
            );
        }

        let deriver = AddressDeriver::new(program_id);

        Self {
            cluster,
            config,
            deriver,
            active: 0,
            stage: Created,
        }
    }

    #[instrument(skip(self))]
    pub async fn fund_credentials(
        &self,
        signers_num: usize,
    ) -> Result<Harness<C, CredentialsFunded>, Error> {
        let pool = CredentialPool::create(
            self.cluster.ledger(),
            signers_num,
            self.config.airdrop_lamports,
        )
        .await?;

        Ok(self.advance(CredentialsFunded {
            pool: Arc::new(pool),
        }))
    }

    /// Run the whole pipeline with the values from the harness config.
    pub async fn bootstrap(
        cluster: C,
        config: HarnessConfig,
    ) -> Result<Harness<C, Initialized>, Error> {
        let created = Self::new(cluster, config.clone());

        created
            .fund_credentials(config.signers)
            .await?
            .initialize_relevant_accounts(config.mint_decimals, config.log_addresses)
            .await?
            .initialize(config.admin_controls_prices)
            .await
    }
}

impl<C> Harness<C, CredentialsFunded>
where
    C: Cluster,
{
    #[instrument(skip(self))]
    pub async fn create_collateral_mint(
        &self,
        decimals: u8,
    ) -> Result<Harness<C, MintReady>, Error> {
        let payer = self.current_signer()?;

        let collateral_mint = self
            .cluster
            .tokens()
            .create_mint(payer, &payer.pubkey(), None, decimals)
            .await
            .map_err(Error::Mint)?;

        info!(%collateral_mint, decimals, "collateral mint created");

        Ok(self.advance(MintReady {
            pool: self.stage.pool.clone(),
            collateral_mint,
        }))
    }

    /// Create the collateral mint and allocate the control accounts.
    pub async fn initialize_relevant_accounts(
        &self,
        mint_decimals: u8,
        log_addresses: bool,
    ) -> Result<Harness<C, AccountsAllocated>, Error> {
        self.create_collateral_mint(mint_decimals)
            .await?
            .allocate_accounts(log_addresses)
            .await
    }
}

impl<C> Harness<C, MintReady>
where
    C: Cluster,
{
    pub fn collateral_mint(&self) -> &Pubkey {
        &self.stage.collateral_mint
    }

    #[instrument(skip(self))]
    pub async fn allocate_accounts(
        &self,
        log_addresses: bool,
    ) -> Result<Harness<C, AccountsAllocated>, Error> {
        let payer = self.current_signer()?;
        let ledger = self.cluster.ledger();

        let collateral_vault = self.deriver.collateral_vault();
        let insurance_vault = self.deriver.insurance_vault();

        let spaces: Vec<_> = BOOTSTRAP_ACCOUNTS.iter().map(|x| x.space).collect();

        let mut rent = 0;

        for space in spaces.iter() {
            rent += ledger
                .minimum_balance_for_rent_exemption(*space)
                .await
                .map_err(Error::Allocation)?;
        }

        let available = ledger
            .get_balance(&payer.pubkey())
            .await
            .map_err(Error::Allocation)?;

        if available < rent {
            warn!(
                payer = %payer.pubkey(),
                available,
                rent,
                "payer cannot cover control account rent"
            );

            return Err(Error::Allocation(NetworkError::InsufficientFunds {
                address: payer.pubkey(),
                available,
                required: rent,
            }));
        }

        debug!(payer = %payer.pubkey(), available, rent, "allocating control accounts");

        let allocation = ledger
            .allocate_accounts(payer, &spaces, self.deriver.program_id())
            .await
            .map_err(Error::Allocation)?;

        ledger
            .confirm_transaction(&allocation.tx)
            .await
            .map_err(Error::Allocation)?;

        let &[state, markets] = allocation.addresses.as_slice() else {
            return Err(Error::Allocation(NetworkError::internal(format!(
                "expected {} allocated accounts, got {}",
                BOOTSTRAP_ACCOUNTS.len(),
                allocation.addresses.len()
            ))));
        };

        let accounts = ControlAccounts {
            payer: payer.pubkey(),
            collateral_mint: self.stage.collateral_mint,
            state,
            markets,
            collateral_vault,
            insurance_vault,
        };

        if log_addresses {
            accounts.log();
        }

        Ok(self.advance(AccountsAllocated {
            pool: self.stage.pool.clone(),
            accounts,
        }))
    }
}

impl<C> Harness<C, AccountsAllocated>
where
    C: Cluster,
{
    /// Invoke the program's `initialize` instruction with the current signer
    /// as admin.
    #[instrument(skip(self))]
    pub async fn initialize(
        &self,
        admin_controls_prices: bool,
    ) -> Result<Harness<C, Initialized>, Error> {
        let admin = self.current_signer()?;
        let bindings = self.stage.accounts.initialize_accounts();

        let tx = self
            .cluster
            .program()
            .initialize(admin, admin_controls_prices, &bindings)
            .await?;

        self.cluster.ledger().confirm_transaction(&tx).await?;

        info!(admin = %admin.pubkey(), %tx, "clearing house initialized");

        Ok(self.advance(Initialized {
            pool: self.stage.pool.clone(),
            accounts: self.stage.accounts.clone(),
            tx,
        }))
    }
}

impl<C> Harness<C, Initialized>
where
    C: Cluster,
{
    /// Signature of the confirmed `initialize` transaction
    pub fn initialize_tx(&self) -> &TxHandle {
        &self.stage.tx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clearing_testing::{TestFault, ToyCluster};

    fn config(signers: usize) -> HarnessConfig {
        HarnessConfig {
            signers,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn stages_are_reported() {
        let harness = Harness::new(ToyCluster::new(), config(1));
        assert_eq!(harness.stage(), BootstrapStage::Created);

        let funded = harness.fund_credentials(1).await.unwrap();
        assert_eq!(funded.stage(), BootstrapStage::CredentialsFunded);

        let minted = funded.create_collateral_mint(6).await.unwrap();
        assert_eq!(minted.stage(), BootstrapStage::MintReady);

        let allocated = minted.allocate_accounts(false).await.unwrap();
        assert_eq!(allocated.stage(), BootstrapStage::AccountsAllocated);

        let initialized = allocated.initialize(true).await.unwrap();
        assert_eq!(initialized.stage(), BootstrapStage::Initialized);
    }

    #[tokio::test]
    async fn failed_transition_keeps_prior_stage() {
        let cluster = ToyCluster::new().with_fault(TestFault::MintCreation);
        let funded = Harness::new(cluster, config(1))
            .fund_credentials(1)
            .await
            .unwrap();

        let err = funded.create_collateral_mint(6).await.unwrap_err();
        assert!(matches!(err, Error::Mint(_)));

        assert_eq!(funded.stage(), BootstrapStage::CredentialsFunded);
        assert!(funded.current_signer().is_ok());
    }

    #[tokio::test]
    async fn allocation_payer_follows_active_signer() {
        let funded = Harness::new(ToyCluster::new(), config(2))
            .fund_credentials(2)
            .await
            .unwrap()
            .with_active_signer(1)
            .unwrap();

        let expected = funded.pool().signer(1).unwrap().pubkey();

        let allocated = funded
            .initialize_relevant_accounts(6, false)
            .await
            .unwrap();

        assert_eq!(allocated.accounts().payer, expected);
        assert_eq!(allocated.active_signer_index(), 1);
    }

    #[test]
    fn cluster_program_id_is_authoritative() {
        let config = HarnessConfig {
            program_id: Pubkey::new_unique(),
            ..Default::default()
        };

        let harness = Harness::new(ToyCluster::new(), config);

        assert_eq!(
            *harness.deriver().program_id(),
            clearing_core::CLEARING_HOUSE_PROGRAM_ID
        );
    }

    #[test]
    fn control_accounts_list_every_address() {
        let deriver = AddressDeriver::new(clearing_core::CLEARING_HOUSE_PROGRAM_ID);

        let accounts = ControlAccounts {
            payer: Pubkey::new_unique(),
            collateral_mint: Pubkey::new_unique(),
            state: Pubkey::new_unique(),
            markets: Pubkey::new_unique(),
            collateral_vault: deriver.collateral_vault(),
            insurance_vault: deriver.insurance_vault(),
        };

        let bindings = accounts.initialize_accounts();
        let listed: Vec<_> = accounts.addresses().iter().map(|(_, x)| *x).collect();

        assert_eq!(
            listed,
            vec![
                bindings.state,
                bindings.collateral_mint,
                bindings.collateral_vault,
                bindings.collateral_vault_authority,
                bindings.insurance_vault,
                bindings.insurance_vault_authority,
                bindings.markets,
            ]
        );
    }
}
