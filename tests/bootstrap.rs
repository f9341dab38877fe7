use clearing_core::{
    ClearingHouseClient, Cluster, LedgerClient, ProgramError, MAX_MARKETS, TOKEN_PROGRAM_ID,
};
use clearing_harness::{
    assertions::{expect_program_error, expect_program_error_code, require_pubkey_eq},
    bootstrap::{BootstrapStage, Harness, BOOTSTRAP_ACCOUNTS},
    config::HarnessConfig,
    prelude::*,
};
use clearing_testing::{TestFault, ToyCluster};

// ---------------------------------------------------------------------------
// Tracing
// ---------------------------------------------------------------------------

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("clearing_harness=debug,clearing_testing=debug")
        .with_writer(std::io::stderr)
        .try_init();
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

fn config(signers: usize) -> HarnessConfig {
    HarnessConfig {
        signers,
        log_addresses: true,
        ..Default::default()
    }
}

// ---------------------------------------------------------------------------
// Happy path
// ---------------------------------------------------------------------------

#[tokio::test]
async fn initialize_records_admin_and_price_control() {
    init_tracing();

    let cluster = ToyCluster::new();

    let allocated = Harness::new(cluster, config(2))
        .fund_credentials(2)
        .await
        .unwrap()
        .initialize_relevant_accounts(6, true)
        .await
        .unwrap();

    let admin = allocated.current_signer().unwrap().pubkey();
    let initialized = allocated.initialize(true).await.unwrap();

    let state = initialized.state_accessor().get_state().await.unwrap();

    assert!(state.admin_controls_prices);
    require_pubkey_eq(&state.admin, &admin);
}

#[tokio::test]
async fn state_binds_every_control_account() {
    init_tracing();

    let harness = Harness::bootstrap(ToyCluster::new(), config(1))
        .await
        .unwrap();

    assert_eq!(harness.stage(), BootstrapStage::Initialized);

    let accounts = harness.accounts();
    let state = harness.state_accessor().get_state().await.unwrap();

    assert_eq!(state.collateral_mint, accounts.collateral_mint);
    assert_eq!(state.markets, accounts.markets);

    assert_eq!(state.collateral_vault, accounts.collateral_vault.vault.address);
    assert_eq!(
        state.collateral_vault_authority,
        accounts.collateral_vault.authority.address
    );
    assert_eq!(
        state.collateral_vault_authority_nonce,
        accounts.collateral_vault.authority.bump
    );

    assert_eq!(state.insurance_vault, accounts.insurance_vault.vault.address);
    assert_eq!(
        state.insurance_vault_authority,
        accounts.insurance_vault.authority.address
    );
    assert_eq!(
        state.insurance_vault_authority_nonce,
        accounts.insurance_vault.authority.bump
    );
}

#[tokio::test]
async fn admin_without_price_control() {
    init_tracing();

    let config = HarnessConfig {
        admin_controls_prices: false,
        ..config(1)
    };

    let harness = Harness::bootstrap(ToyCluster::new(), config).await.unwrap();
    let state = harness.state_accessor().get_state().await.unwrap();

    assert!(!state.admin_controls_prices);
}

#[tokio::test]
async fn vaults_hold_collateral_under_derived_authorities() {
    init_tracing();

    let harness = Harness::bootstrap(ToyCluster::new(), config(1))
        .await
        .unwrap();

    let accessor = harness.state_accessor();
    let accounts = harness.accounts();

    let collateral = accessor.get_collateral_vault().await.unwrap();
    assert_eq!(collateral.mint, accounts.collateral_mint);
    assert_eq!(collateral.owner, accounts.collateral_vault.authority.address);
    assert_eq!(collateral.amount, 0);

    let insurance = accessor.get_insurance_vault().await.unwrap();
    assert_eq!(insurance.mint, accounts.collateral_mint);
    assert_eq!(insurance.owner, accounts.insurance_vault.authority.address);
}

#[tokio::test]
async fn collateral_mint_uses_requested_decimals() {
    init_tracing();

    let funded = Harness::new(ToyCluster::new(), config(1))
        .fund_credentials(1)
        .await
        .unwrap();

    let payer = funded.current_signer().unwrap().pubkey();
    let allocated = funded.initialize_relevant_accounts(9, false).await.unwrap();

    let mint = allocated
        .state_accessor()
        .get_collateral_mint()
        .await
        .unwrap();

    assert_eq!(mint.decimals, 9);
    assert!(mint.is_initialized);
    assert_eq!(mint.mint_authority, Some(payer));
    assert_eq!(mint.freeze_authority, None);
}

#[tokio::test]
async fn control_accounts_are_allocated_for_the_program() {
    init_tracing();

    let cluster = ToyCluster::new();

    let allocated = Harness::new(cluster.clone(), config(1))
        .fund_credentials(1)
        .await
        .unwrap()
        .initialize_relevant_accounts(6, false)
        .await
        .unwrap();

    let accounts = allocated.accounts();
    let program_id = cluster.program().program_id();

    for (spec, address) in BOOTSTRAP_ACCOUNTS
        .iter()
        .zip([accounts.state, accounts.markets])
    {
        let account = cluster.get_account(&address).await.unwrap().unwrap();

        assert_eq!(account.owner, program_id, "{} owner", spec.role);
        assert_eq!(account.data.len(), spec.space, "{} size", spec.role);

        let rent = cluster
            .minimum_balance_for_rent_exemption(spec.space)
            .await
            .unwrap();
        assert_eq!(account.lamports, rent, "{} rent", spec.role);
        assert!(account.data.iter().all(|x| *x == 0));
    }

    let mint = cluster.get_account(&accounts.collateral_mint).await.unwrap();
    assert_eq!(mint.map(|x| x.owner), Some(TOKEN_PROGRAM_ID));
}

#[tokio::test]
async fn markets_start_uninitialized() {
    init_tracing();

    let harness = Harness::bootstrap(ToyCluster::new(), config(1))
        .await
        .unwrap();

    let markets = harness.state_accessor().get_markets().await.unwrap();

    assert_eq!(markets.markets.len(), MAX_MARKETS);
    assert_eq!(markets.initialized().count(), 0);
}

// ---------------------------------------------------------------------------
// Reads before initialize
// ---------------------------------------------------------------------------

#[tokio::test]
async fn state_is_undecodable_before_initialize() {
    init_tracing();

    let allocated = Harness::new(ToyCluster::new(), config(1))
        .fund_credentials(1)
        .await
        .unwrap()
        .initialize_relevant_accounts(6, false)
        .await
        .unwrap();

    let accessor = allocated.state_accessor();

    let err = accessor.get_state().await.unwrap_err();
    assert!(matches!(
        err,
        Error::Decode { source: DecodeError::Discriminator { .. }, .. }
    ));

    let err = accessor.get_markets().await.unwrap_err();
    assert!(matches!(err, Error::Decode { .. }));

    let err = accessor.get_collateral_vault().await.unwrap_err();
    assert!(matches!(err, Error::AccountNotFound(_)));
}

// ---------------------------------------------------------------------------
// Application rejections
// ---------------------------------------------------------------------------

#[tokio::test]
async fn second_initialize_is_rejected() {
    init_tracing();

    let allocated = Harness::new(ToyCluster::new(), config(1))
        .fund_credentials(1)
        .await
        .unwrap()
        .initialize_relevant_accounts(6, false)
        .await
        .unwrap();

    let initialized = allocated.initialize(true).await.unwrap();
    let before = initialized.state_accessor().get_state().await.unwrap();

    let err = expect_program_error(allocated.initialize(false)).await;
    assert!(matches!(err, ProgramError::AccountDiscriminatorAlreadySet(_)));

    // the rejected call left the state untouched
    let after = initialized.state_accessor().get_state().await.unwrap();
    assert_eq!(before, after);
}

#[tokio::test]
async fn swapped_vault_authority_is_rejected() {
    init_tracing();

    let cluster = ToyCluster::new();

    let allocated = Harness::new(cluster.clone(), config(1))
        .fund_credentials(1)
        .await
        .unwrap()
        .initialize_relevant_accounts(6, false)
        .await
        .unwrap();

    let admin = allocated.current_signer().unwrap();

    let mut bindings = allocated.accounts().initialize_accounts();
    bindings.collateral_vault_authority = bindings.insurance_vault_authority;

    let call = cluster.program().initialize(admin, true, &bindings);
    expect_program_error_code(call, 6000).await;

    let mut bindings = allocated.accounts().initialize_accounts();
    bindings.insurance_vault_authority = bindings.collateral_vault_authority;

    let call = cluster.program().initialize(admin, true, &bindings);
    expect_program_error_code(call, 6001).await;
}

#[tokio::test]
async fn vault_outside_its_seed_is_rejected() {
    init_tracing();

    let cluster = ToyCluster::new();

    let allocated = Harness::new(cluster.clone(), config(1))
        .fund_credentials(1)
        .await
        .unwrap()
        .initialize_relevant_accounts(6, false)
        .await
        .unwrap();

    let admin = allocated.current_signer().unwrap();

    let mut bindings = allocated.accounts().initialize_accounts();
    bindings.collateral_vault = bindings.insurance_vault;

    let call = cluster.program().initialize(admin, true, &bindings);
    let err = expect_program_error(call).await;

    assert_eq!(err.name(), "ConstraintSeeds");
}

// ---------------------------------------------------------------------------
// Failures along the pipeline
// ---------------------------------------------------------------------------

#[tokio::test]
async fn funding_failure_stops_bootstrap() {
    init_tracing();

    let cluster = ToyCluster::new().with_fault(TestFault::FundingRequest);
    let err = Harness::bootstrap(cluster, config(2)).await.unwrap_err();

    assert!(matches!(err, Error::Funding { .. }));
}

#[tokio::test]
async fn mint_failure_stops_bootstrap() {
    init_tracing();

    let cluster = ToyCluster::new().with_fault(TestFault::MintCreation);
    let err = Harness::bootstrap(cluster, config(1)).await.unwrap_err();

    assert!(matches!(err, Error::Mint(_)));
}

#[tokio::test]
async fn allocation_failure_keeps_mint_stage() {
    init_tracing();

    let cluster = ToyCluster::new().with_fault(TestFault::Allocation);

    let minted = Harness::new(cluster, config(1))
        .fund_credentials(1)
        .await
        .unwrap()
        .create_collateral_mint(6)
        .await
        .unwrap();

    let err = minted.allocate_accounts(false).await.unwrap_err();

    assert!(matches!(err, Error::Allocation(_)));
    assert_eq!(minted.stage(), BootstrapStage::MintReady);
}

#[tokio::test]
async fn underfunded_payer_cannot_allocate() {
    init_tracing();

    let config = HarnessConfig {
        airdrop_lamports: 1_000_000,
        ..config(1)
    };

    let err = Harness::new(ToyCluster::new(), config)
        .fund_credentials(1)
        .await
        .unwrap()
        .initialize_relevant_accounts(6, false)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        Error::Mint(NetworkError::InsufficientFunds { .. })
            | Error::Allocation(NetworkError::InsufficientFunds { .. })
    ));
}

#[tokio::test]
async fn allocation_checks_payer_covers_rent() {
    init_tracing();

    let cluster = ToyCluster::new();

    // enough for the mint, not for the control accounts
    let config = HarnessConfig {
        airdrop_lamports: 10_000_000,
        ..config(1)
    };

    let minted = Harness::new(cluster.clone(), config)
        .fund_credentials(1)
        .await
        .unwrap()
        .create_collateral_mint(6)
        .await
        .unwrap();

    let payer = minted.current_signer().unwrap().pubkey();
    let before = cluster.get_balance(&payer).await.unwrap();

    let mut rent = 0;
    for spec in BOOTSTRAP_ACCOUNTS.iter() {
        rent += cluster
            .minimum_balance_for_rent_exemption(spec.space)
            .await
            .unwrap();
    }

    let err = minted.allocate_accounts(false).await.unwrap_err();

    match err {
        Error::Allocation(NetworkError::InsufficientFunds {
            address,
            available,
            required,
        }) => {
            assert_eq!(address, payer);
            assert_eq!(available, before);
            assert_eq!(required, rent);
        }
        x => panic!("unexpected error: {x}"),
    }

    assert_eq!(cluster.get_balance(&payer).await.unwrap(), before);
}
