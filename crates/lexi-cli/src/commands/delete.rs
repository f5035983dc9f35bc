use crate::commands::common::{normalize_key, CliContext};
use crate::error::CliError;

pub async fn run_delete(ctx: &CliContext, key: &str) -> Result<(), CliError> {
    let key = normalize_key(key)?;
    let orchestrator = ctx.open().await?;

    if !orchestrator.delete_entry(&ctx.table, &key).await? {
        return Err(CliError::EntryNotFound(key));
    }
    println!("{key}");
    Ok(())
}
