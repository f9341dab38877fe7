use clearing_harness::{
    config::HarnessConfig,
    derive::{AddressDeriver, DerivedAddress},
    prelude::*,
};

#[derive(Debug, clap::Args)]
pub struct Args {
    /// Derive against this program instead of the configured one
    #[arg(long)]
    program_id: Option<Pubkey>,
}

fn print_address(name: &str, derived: &DerivedAddress) {
    println!("{name:<28} {} (bump {})", derived.address, derived.bump);
}

pub fn run(config: &HarnessConfig, args: &Args) -> Result<(), Error> {
    let program_id = args.program_id.unwrap_or(config.program_id);
    let deriver = AddressDeriver::new(program_id);

    let collateral = deriver.collateral_vault();
    let insurance = deriver.insurance_vault();

    println!("program {program_id}");
    print_address("collateral vault", &collateral.vault);
    print_address("collateral vault authority", &collateral.authority);
    print_address("insurance vault", &insurance.vault);
    print_address("insurance vault authority", &insurance.authority);

    Ok(())
}
