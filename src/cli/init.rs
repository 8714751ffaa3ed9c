use super::config::{default_state_path, ExedaoConfig};
use super::context::Context;
use super::logging;
use exedao::governance::PolicyEngine;
use std::path::Path;

/// Initialize a deployment from the `[genesis]` config section
///
/// If the config file doesn't exist, a default one is generated next to the
/// default state path first. The state snapshot is then written once; an
/// existing snapshot is only replaced with `--force`.
pub fn execute(config_path: &Path, force: bool) -> Result<(), Box<dyn std::error::Error>> {
    println!("🚀 Initializing exedao...");
    println!();

    if !config_path.exists() {
        println!("📝 No config file found. Creating default configuration...");
        ExedaoConfig::create_default(config_path, &default_state_path(config_path))?;
        println!("   Created: {}", config_path.display());
        println!();
    }

    let ctx = Context::load(config_path)?;
    logging::init(&ctx.config.logging)?;

    let genesis = ctx.config.genesis.to_genesis()?;
    let engine = PolicyEngine::genesis(genesis.clone())?;
    {
        let _lock = ctx.store.lock()?;
        ctx.store.create(engine.state(), force)?;
    }

    println!("Config: {}", ctx.config_path.display());
    println!("State: {}", ctx.store.path().display());
    println!();
    println!("Founder: {}", genesis.founder);
    println!("Shares: {}", genesis.initial_shares);
    match genesis.proposal_duration_secs {
        0 => println!("Proposal duration: never expires"),
        secs => println!(
            "Proposal duration: {}",
            humantime::format_duration(std::time::Duration::from_secs(secs))
        ),
    }
    for (selector, percent) in engine.requirements() {
        let name = engine
            .dispatch()
            .resolve(&selector)
            .map(|kind| kind.name())
            .unwrap_or("?");
        println!("Requirement: {} ({}) = {}%", name, selector, percent);
    }
    println!();
    println!("✅ Initialized");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use exedao::store::StateStore;
    use tempfile::TempDir;

    #[test]
    fn test_init_creates_config_and_state() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");

        execute(&config_path, false).unwrap();

        assert!(config_path.exists());
        let state = StateStore::new(temp_dir.path().join("state.cbor"))
            .load()
            .unwrap();
        assert_eq!(state.ledger.total_shares(), 100);
    }

    #[test]
    fn test_init_twice_requires_force() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");

        execute(&config_path, false).unwrap();
        assert!(execute(&config_path, false).is_err());
        assert!(execute(&config_path, true).is_ok());
    }

    #[test]
    fn test_init_rejects_invalid_genesis() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        let mut config = ExedaoConfig::new(
            temp_dir.path().join("state.cbor"),
            "acct0".to_string(),
            0,
        );
        config.save(&config_path).unwrap();
        assert!(execute(&config_path, false).is_err());

        config.genesis.initial_shares = 10;
        config.genesis.requirements.mint_shares = 120;
        config.save(&config_path).unwrap();
        assert!(execute(&config_path, false).is_err());
        assert!(!temp_dir.path().join("state.cbor").exists());
    }
}
