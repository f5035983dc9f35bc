use crate::commands::common::{entry_to_item, format_entry_detail, normalize_key, CliContext};
use crate::error::CliError;

pub async fn run_show(ctx: &CliContext, key: &str, as_json: bool) -> Result<(), CliError> {
    let key = normalize_key(key)?;
    let orchestrator = ctx.open().await?;
    let Some(entry) = orchestrator.get_entry(&ctx.table, &key).await? else {
        return Err(CliError::EntryNotFound(key));
    };

    if as_json {
        println!("{}", serde_json::to_string_pretty(&entry_to_item(&entry))?);
    } else {
        for line in format_entry_detail(&entry) {
            println!("{line}");
        }
    }
    Ok(())
}
