use crate::commands::common::{normalize_content, normalize_examples, normalize_key, CliContext};
use crate::error::CliError;

pub async fn run_edit(
    ctx: &CliContext,
    key: &str,
    description: Option<&str>,
    examples: &[String],
    clear_examples: bool,
) -> Result<(), CliError> {
    let key = normalize_key(key)?;
    let description = match description {
        Some(text) => Some(normalize_content(text).ok_or(CliError::EmptyDescription)?),
        None => None,
    };
    let examples = normalize_examples(examples);
    if description.is_none() && examples.is_empty() && !clear_examples {
        return Err(CliError::NothingToEdit);
    }

    let orchestrator = ctx.open().await?;
    let Some(existing) = orchestrator.get_entry(&ctx.table, &key).await? else {
        return Err(CliError::EntryNotFound(key));
    };

    let description = description.unwrap_or_else(|| existing.description.clone());
    let examples = if clear_examples {
        Vec::new()
    } else if examples.is_empty() {
        existing.examples.clone()
    } else {
        examples
    };

    if description == existing.description && examples == existing.examples {
        println!("{}", existing.key);
        return Ok(());
    }

    let updated = orchestrator
        .put_entry(&ctx.table, &key, &description, examples)
        .await?;
    println!("{}", updated.key);
    Ok(())
}
