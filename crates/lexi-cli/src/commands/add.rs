use crate::commands::common::{normalize_examples, normalize_key, resolve_description, CliContext};
use crate::error::CliError;

pub async fn run_add(
    ctx: &CliContext,
    key: &str,
    description_parts: &[String],
    examples: &[String],
) -> Result<(), CliError> {
    let key = normalize_key(key)?;
    let description = resolve_description(description_parts)?;

    let orchestrator = ctx.open().await?;
    if orchestrator.get_entry(&ctx.table, &key).await?.is_some() {
        return Err(CliError::EntryExists(key));
    }

    let entry = orchestrator
        .put_entry(&ctx.table, &key, &description, normalize_examples(examples))
        .await?;
    println!("{}", entry.key);
    Ok(())
}
