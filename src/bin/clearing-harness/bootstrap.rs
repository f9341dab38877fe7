use clearing_harness::{bootstrap::Harness, config::HarnessConfig, logging::setup_tracing};
use clearing_testing::ToyCluster;
use miette::Context as _;

#[derive(Debug, clap::Args)]
pub struct Args {
    /// Number of credentials to fund, overrides the config
    #[arg(long)]
    signers: Option<usize>,

    /// Decimals of the collateral mint, overrides the config
    #[arg(long)]
    mint_decimals: Option<u8>,

    /// Log every control address once allocated
    #[arg(long)]
    log_addresses: bool,
}

pub async fn run(mut config: HarnessConfig, args: &Args) -> miette::Result<()> {
    setup_tracing(&config.logging)?;

    if let Some(signers) = args.signers {
        config.signers = signers;
    }

    if let Some(decimals) = args.mint_decimals {
        config.mint_decimals = decimals;
    }

    config.log_addresses |= args.log_addresses;

    let cluster = ToyCluster::from_config(&config.emulator, config.program_id);

    let harness = Harness::bootstrap(cluster, config)
        .await
        .context("bootstrapping clearing house")?;

    for (name, address) in harness.accounts().addresses() {
        println!("{name:<28} {address}");
    }

    let state = harness
        .state_accessor()
        .get_state()
        .await
        .context("reading clearing house state")?;

    println!();
    println!("admin                        {}", state.admin);
    println!("admin controls prices        {}", state.admin_controls_prices);
    println!("margin ratio initial         {}", state.margin_ratio_initial);
    println!("margin ratio maintenance     {}", state.margin_ratio_maintenance);
    println!("margin ratio partial         {}", state.margin_ratio_partial);

    Ok(())
}
