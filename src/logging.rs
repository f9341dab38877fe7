use clearing_core::config::LoggingConfig;
use tracing_subscriber::{filter::Targets, prelude::*};

use crate::prelude::*;

/// Install the global subscriber for the binary.
///
/// Only events from the harness crates pass the filter; the emulated cluster
/// is included on request.
pub fn setup_tracing(config: &LoggingConfig) -> Result<(), Error> {
    let level = config.max_level;

    let mut filter = Targets::new()
        .with_target("clearing_harness", level)
        .with_target("clearing_core", level);

    if config.include_emulator {
        filter = filter.with_target("clearing_testing", level);
    }

    tracing_subscriber::FmtSubscriber::builder()
        .with_max_level(level)
        .finish()
        .with(filter)
        .try_init()
        .map_err(|x| Error::message(x.to_string()))
}
