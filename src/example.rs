use crate::model::ConsolidationConfig;

/// Print the built-in default config as JSON, ready to save and edit.
pub fn run() -> anyhow::Result<()> {
    let config = ConsolidationConfig::default();
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}
