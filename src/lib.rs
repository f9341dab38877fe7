//! Test-fixture harness for the clearing house program.
//!
//! The harness funds a pool of credentials through the cluster faucet,
//! creates the collateral mint, allocates the control accounts and invokes
//! the program's `initialize` instruction. Each step is a typed stage of
//! [`bootstrap::Harness`], so an integration test can stop at whatever point
//! it needs and inspect the resulting accounts.

pub mod accessor;
pub mod assertions;
pub mod bootstrap;
pub mod config;
pub mod derive;
pub mod logging;
pub mod pool;
pub mod prelude;

pub use clearing_core;
