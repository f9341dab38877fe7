use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use clearing_core::{
    config::EmulatorConfig, Account, Allocation, ClearingHouseClient, Cluster, InitializeAccounts,
    Keypair, Lamports, LedgerClient, Mint, NetworkError, Pubkey, Signature, Signer,
    TokenAccount, TokenMints, TxHandle, CLEARING_HOUSE_PROGRAM_ID, SYSTEM_PROGRAM_ID,
    TOKEN_PROGRAM_ID,
};
use tracing::{debug, warn};

use crate::{program, rent_exempt_minimum, TestFault};

#[derive(Clone, Debug, PartialEq, Eq)]
enum TxStatus {
    Processed,
    Confirmed,
    Failed(String),
}

#[derive(Clone, Debug)]
enum TxKind {
    Airdrop {
        ordinal: usize,
        to: Pubkey,
        lamports: Lamports,
    },
    Other,
}

#[derive(Clone, Debug)]
struct TxRecord {
    kind: TxKind,
    status: TxStatus,
}

#[derive(Default, Debug)]
struct Ledger {
    accounts: HashMap<Pubkey, Account>,
    transactions: HashMap<TxHandle, TxRecord>,
    airdrops_submitted: usize,
    confirmed_airdrops: Vec<Pubkey>,
}

impl Ledger {
    fn pending_airdrops(&self) -> usize {
        self.transactions
            .values()
            .filter(|x| matches!(x.kind, TxKind::Airdrop { .. }) && x.status == TxStatus::Processed)
            .count()
    }

    fn lamports(&self, address: &Pubkey) -> Lamports {
        self.accounts
            .get(address)
            .map(|x| x.lamports)
            .unwrap_or_default()
    }

    fn credit(&mut self, address: &Pubkey, lamports: Lamports) {
        self.accounts
            .entry(*address)
            .or_insert_with(|| Account::new(0, 0, &SYSTEM_PROGRAM_ID))
            .lamports += lamports;
    }

    fn debit(&mut self, address: &Pubkey, lamports: Lamports) -> Result<(), NetworkError> {
        let available = self.lamports(address);

        if available < lamports {
            return Err(NetworkError::InsufficientFunds {
                address: *address,
                available,
                required: lamports,
            });
        }

        if let Some(account) = self.accounts.get_mut(address) {
            account.lamports -= lamports;
        }

        Ok(())
    }

    fn record(&mut self, kind: TxKind, status: TxStatus) -> TxHandle {
        let tx = Signature::new_unique();
        self.transactions.insert(tx, TxRecord { kind, status });
        tx
    }
}

/// An in-process cluster holding accounts, mints and transaction statuses in
/// memory, with the clearing house program deployed.
#[derive(Clone, Debug)]
pub struct ToyCluster {
    ledger: Arc<RwLock<Ledger>>,
    program_id: Pubkey,
    max_pending_airdrops: usize,
    fault: TestFault,
}

impl Default for ToyCluster {
    fn default() -> Self {
        Self::new()
    }
}

impl ToyCluster {
    pub fn new() -> Self {
        Self::from_config(&EmulatorConfig::default(), CLEARING_HOUSE_PROGRAM_ID)
    }

    pub fn from_config(config: &EmulatorConfig, program_id: Pubkey) -> Self {
        Self {
            ledger: Arc::new(RwLock::new(Ledger::default())),
            program_id,
            max_pending_airdrops: config.max_pending_airdrops,
            fault: TestFault::None,
        }
    }

    pub fn with_fault(mut self, fault: TestFault) -> Self {
        self.fault = fault;
        self
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Ledger>, NetworkError> {
        self.ledger
            .read()
            .map_err(|_| NetworkError::internal("ledger lock poisoned"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Ledger>, NetworkError> {
        self.ledger
            .write()
            .map_err(|_| NetworkError::internal("ledger lock poisoned"))
    }

    /// Add lamports to an address without going through the faucet.
    pub fn credit(&self, address: &Pubkey, lamports: Lamports) -> Result<(), NetworkError> {
        self.write()?.credit(address, lamports);
        Ok(())
    }

    pub fn account(&self, address: &Pubkey) -> Option<Account> {
        self.read().ok()?.accounts.get(address).cloned()
    }

    pub fn mint(&self, address: &Pubkey) -> Option<Mint> {
        Mint::unpack(&self.account(address)?.data).ok()
    }

    pub fn token_account(&self, address: &Pubkey) -> Option<TokenAccount> {
        TokenAccount::unpack(&self.account(address)?.data).ok()
    }

    /// Recipients of confirmed airdrops, in the order they were confirmed.
    pub fn confirmed_airdrops(&self) -> Vec<Pubkey> {
        self.read()
            .map(|x| x.confirmed_airdrops.clone())
            .unwrap_or_default()
    }

    fn submit_airdrop(&self, to: &Pubkey, lamports: Lamports) -> Result<TxHandle, NetworkError> {
        if self.fault == TestFault::FundingRequest {
            return Err(self.fault.fault_err());
        }

        let mut ledger = self.write()?;

        if ledger.pending_airdrops() >= self.max_pending_airdrops {
            warn!(%to, "airdrop rejected, too many pending requests");
            return Err(NetworkError::RateLimited);
        }

        let ordinal = ledger.airdrops_submitted;
        ledger.airdrops_submitted += 1;

        let kind = TxKind::Airdrop {
            ordinal,
            to: *to,
            lamports,
        };

        Ok(ledger.record(kind, TxStatus::Processed))
    }

    fn confirm(&self, tx: &TxHandle) -> Result<(), NetworkError> {
        let mut ledger = self.write()?;

        let record = ledger
            .transactions
            .get(tx)
            .cloned()
            .ok_or(NetworkError::UnknownTransaction(*tx))?;

        match (record.status, record.kind) {
            (TxStatus::Confirmed, _) => Ok(()),
            (TxStatus::Failed(reason), _) => Err(NetworkError::TransactionFailed(*tx, reason)),
            (TxStatus::Processed, TxKind::Airdrop { ordinal, .. })
                if self.fault == TestFault::FundingConfirmationAt(ordinal) =>
            {
                let reason = self.fault.fault_err().to_string();

                if let Some(x) = ledger.transactions.get_mut(tx) {
                    x.status = TxStatus::Failed(reason.clone());
                }

                Err(NetworkError::TransactionFailed(*tx, reason))
            }
            (TxStatus::Processed, TxKind::Airdrop { to, lamports, .. }) => {
                ledger.credit(&to, lamports);
                ledger.confirmed_airdrops.push(to);

                if let Some(x) = ledger.transactions.get_mut(tx) {
                    x.status = TxStatus::Confirmed;
                }

                debug!(%tx, %to, lamports, "airdrop confirmed");
                Ok(())
            }
            (TxStatus::Processed, TxKind::Other) => {
                if let Some(x) = ledger.transactions.get_mut(tx) {
                    x.status = TxStatus::Confirmed;
                }

                Ok(())
            }
        }
    }

    fn allocate(
        &self,
        payer: &Pubkey,
        spaces: &[usize],
        owner: &Pubkey,
    ) -> Result<Allocation, NetworkError> {
        if self.fault == TestFault::Allocation {
            return Err(self.fault.fault_err());
        }

        let mut ledger = self.write()?;

        let addresses: Vec<_> = spaces.iter().map(|_| Pubkey::new_unique()).collect();

        if let Some(taken) = addresses.iter().find(|x| ledger.accounts.contains_key(*x)) {
            return Err(NetworkError::AccountInUse(*taken));
        }

        let required: Lamports = spaces.iter().map(|x| rent_exempt_minimum(*x)).sum();
        ledger.debit(payer, required)?;

        for (address, space) in addresses.iter().zip(spaces) {
            let account = Account::new(rent_exempt_minimum(*space), *space, owner);
            ledger.accounts.insert(*address, account);
        }

        let tx = ledger.record(TxKind::Other, TxStatus::Processed);

        debug!(%tx, %payer, count = spaces.len(), "accounts allocated");

        Ok(Allocation { tx, addresses })
    }

    fn new_mint(
        &self,
        payer: &Pubkey,
        mint_authority: &Pubkey,
        freeze_authority: Option<&Pubkey>,
        decimals: u8,
    ) -> Result<Pubkey, NetworkError> {
        if self.fault == TestFault::MintCreation {
            return Err(self.fault.fault_err());
        }

        let mut ledger = self.write()?;

        let rent = rent_exempt_minimum(Mint::LEN);
        ledger.debit(payer, rent)?;

        let mint = Mint {
            mint_authority: Some(*mint_authority),
            supply: 0,
            decimals,
            is_initialized: true,
            freeze_authority: freeze_authority.copied(),
        };

        let address = Pubkey::new_unique();

        let account = Account {
            lamports: rent,
            data: mint.pack(),
            owner: TOKEN_PROGRAM_ID,
            executable: false,
            rent_epoch: 0,
        };

        ledger.accounts.insert(address, account);

        // the token client waits for confirmation before handing the mint back
        ledger.record(TxKind::Other, TxStatus::Confirmed);

        debug!(%address, decimals, "mint created");

        Ok(address)
    }

    fn execute_initialize(
        &self,
        admin: &Pubkey,
        admin_controls_prices: bool,
        accounts: &InitializeAccounts,
    ) -> Result<TxHandle, NetworkError> {
        let mut ledger = self.write()?;

        program::initialize(
            &mut ledger.accounts,
            &self.program_id,
            admin,
            admin_controls_prices,
            accounts,
        )?;

        Ok(ledger.record(TxKind::Other, TxStatus::Processed))
    }
}

impl LedgerClient for ToyCluster {
    async fn request_airdrop(
        &self,
        to: &Pubkey,
        lamports: Lamports,
    ) -> Result<TxHandle, NetworkError> {
        self.submit_airdrop(to, lamports)
    }

    async fn confirm_transaction(&self, tx: &TxHandle) -> Result<(), NetworkError> {
        self.confirm(tx)
    }

    async fn get_balance(&self, address: &Pubkey) -> Result<Lamports, NetworkError> {
        Ok(self.read()?.lamports(address))
    }

    async fn get_account(&self, address: &Pubkey) -> Result<Option<Account>, NetworkError> {
        Ok(self.read()?.accounts.get(address).cloned())
    }

    async fn minimum_balance_for_rent_exemption(
        &self,
        space: usize,
    ) -> Result<Lamports, NetworkError> {
        Ok(rent_exempt_minimum(space))
    }

    async fn allocate_accounts(
        &self,
        payer: &Keypair,
        spaces: &[usize],
        owner: &Pubkey,
    ) -> Result<Allocation, NetworkError> {
        self.allocate(&payer.pubkey(), spaces, owner)
    }
}

impl TokenMints for ToyCluster {
    async fn create_mint(
        &self,
        payer: &Keypair,
        mint_authority: &Pubkey,
        freeze_authority: Option<&Pubkey>,
        decimals: u8,
    ) -> Result<Pubkey, NetworkError> {
        self.new_mint(&payer.pubkey(), mint_authority, freeze_authority, decimals)
    }
}

impl ClearingHouseClient for ToyCluster {
    fn program_id(&self) -> Pubkey {
        self.program_id
    }

    async fn initialize(
        &self,
        admin: &Keypair,
        admin_controls_prices: bool,
        accounts: &InitializeAccounts,
    ) -> Result<TxHandle, NetworkError> {
        self.execute_initialize(&admin.pubkey(), admin_controls_prices, accounts)
    }
}

impl Cluster for ToyCluster {
    type Ledger = Self;
    type Tokens = Self;
    type Program = Self;

    fn ledger(&self) -> &Self::Ledger {
        self
    }

    fn tokens(&self) -> &Self::Tokens {
        self
    }

    fn program(&self) -> &Self::Program {
        self
    }
}
