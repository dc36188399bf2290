use std::path::Path;

use crate::run::config::load_config;

/// Print the configured chains in registry order, with the tokens the
/// manifest tracks on each.
pub fn run(config_path: Option<&Path>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let (registry, manifest) = config.resolve()?;

    println!("Configured chains");
    println!("=================");
    for (i, chain) in registry.all().iter().enumerate() {
        let tokens: Vec<&str> = manifest
            .iter()
            .filter(|t| t.deployment(chain.chain_id).is_some())
            .map(|t| t.symbol.as_str())
            .collect();
        println!(
            "{:>2}. {:<10} id {:<7} native {:<4} {}",
            i + 1,
            chain.name,
            chain.chain_id,
            chain.native_symbol,
            chain.rpc_url
        );
        if tokens.is_empty() {
            println!("    tokens: (none)");
        } else {
            println!("    tokens: {}", tokens.join(", "));
        }
    }
    Ok(())
}
