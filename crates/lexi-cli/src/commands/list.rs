use crate::commands::common::{entry_to_item, format_entry_lines, CliContext, EntryItem};
use crate::error::CliError;

pub async fn run_list(ctx: &CliContext, as_json: bool) -> Result<(), CliError> {
    let orchestrator = ctx.open().await?;
    let entries = orchestrator.list_entries(&ctx.table).await?;

    if as_json {
        let json_items = entries.iter().map(entry_to_item).collect::<Vec<EntryItem>>();
        println!("{}", serde_json::to_string_pretty(&json_items)?);
    } else if entries.is_empty() {
        println!("No entries in '{}'.", ctx.table);
    } else {
        for line in format_entry_lines(&entries) {
            println!("{line}");
        }
    }

    Ok(())
}
