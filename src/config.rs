use std::path::Path;

pub use clearing_core::config::*;

use crate::prelude::*;

/// Layered loading of the harness configuration.
pub trait LoadConfig: Sized {
    fn load(explicit_file: Option<&Path>) -> Result<Self, Error>;
}

impl LoadConfig for HarnessConfig {
    fn load(explicit_file: Option<&Path>) -> Result<Self, Error> {
        let mut s = ::config::Config::builder();

        // a file in the working dir acts as the base config
        s = s.add_source(::config::File::with_name("clearing-harness.toml").required(false));

        // if an explicit file was passed, then we load it as mandatory
        if let Some(explicit) = explicit_file {
            s = s.add_source(::config::File::from(explicit).required(true));
        }

        // finally, env vars such as CLEARING_HARNESS_SIGNERS or
        // CLEARING_HARNESS_EMULATOR__MAX_PENDING_AIRDROPS override the rest
        s = s.add_source(
            ::config::Environment::with_prefix("CLEARING_HARNESS")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        s.build()
            .and_then(|x| x.try_deserialize())
            .map_err(Error::config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use clearing_core::{CLEARING_HOUSE_PROGRAM_ID, LAMPORTS_PER_SOL};

    // loading reads the process environment, so tests touching it run one at a time
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn explicit_file_overrides_defaults() {
        let _env = ENV_LOCK.lock().unwrap_or_else(|x| x.into_inner());
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("harness.toml");

        std::fs::write(
            &path,
            r#"
            signers = 4
            mint_decimals = 9
            admin_controls_prices = false

            [emulator]
            max_pending_airdrops = 3

            [logging]
            max_level = "debug"
            "#,
        )
        .unwrap();

        let config = HarnessConfig::load(Some(path.as_path())).unwrap();

        assert_eq!(config.signers, 4);
        assert_eq!(config.mint_decimals, 9);
        assert!(!config.admin_controls_prices);
        assert_eq!(config.emulator.max_pending_airdrops, 3);
        assert_eq!(config.logging.max_level, tracing::Level::DEBUG);

        assert_eq!(config.airdrop_lamports, 100 * LAMPORTS_PER_SOL);
        assert_eq!(config.program_id, CLEARING_HOUSE_PROGRAM_ID);
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let _env = ENV_LOCK.lock().unwrap_or_else(|x| x.into_inner());
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");

        let err = HarnessConfig::load(Some(path.as_path())).unwrap_err();
        assert!(matches!(err, Error::ConfigError(_)));
    }

    #[test]
    fn program_id_is_read_as_base58() {
        let _env = ENV_LOCK.lock().unwrap_or_else(|x| x.into_inner());
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("harness.toml");
        let program_id = Pubkey::new_unique();

        std::fs::write(&path, format!("program_id = \"{program_id}\"\n")).unwrap();

        let config = HarnessConfig::load(Some(path.as_path())).unwrap();
        assert_eq!(config.program_id, program_id);
    }

    #[test]
    fn empty_emulator_table_uses_defaults() {
        let _env = ENV_LOCK.lock().unwrap_or_else(|x| x.into_inner());
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("harness.toml");

        std::fs::write(&path, "signers = 2\n\n[emulator]\n").unwrap();

        let config = HarnessConfig::load(Some(path.as_path())).unwrap();

        assert_eq!(config.signers, 2);
        assert_eq!(config.emulator.max_pending_airdrops, 1);
    }

    #[test]
    fn environment_overrides_file_values() {
        let _env = ENV_LOCK.lock().unwrap_or_else(|x| x.into_inner());
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("harness.toml");

        std::fs::write(
            &path,
            "signers = 4\n\n[emulator]\nmax_pending_airdrops = 3\n",
        )
        .unwrap();

        std::env::set_var("CLEARING_HARNESS_SIGNERS", "7");
        std::env::set_var("CLEARING_HARNESS_EMULATOR__MAX_PENDING_AIRDROPS", "4");

        let loaded = HarnessConfig::load(Some(path.as_path()));

        std::env::remove_var("CLEARING_HARNESS_SIGNERS");
        std::env::remove_var("CLEARING_HARNESS_EMULATOR__MAX_PENDING_AIRDROPS");

        let config = loaded.unwrap();

        assert_eq!(config.signers, 7);
        assert_eq!(config.emulator.max_pending_airdrops, 4);
    }
}
