use schemars::schema_for;

use crate::model::ConsolidationConfig;

/// Generate and print the JSON Schema for `ConsolidationConfig`.
pub fn run() -> anyhow::Result<()> {
    let schema = schema_for!(ConsolidationConfig);
    let json = serde_json::to_string_pretty(&schema)?;
    println!("{json}");
    Ok(())
}
