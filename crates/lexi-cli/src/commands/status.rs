use lexi_core::sync::TableStatus;
use serde::Serialize;

use crate::commands::common::{format_timestamp, CliContext};
use crate::error::CliError;

#[derive(Debug, Serialize)]
pub struct StatusItem {
    pub table: String,
    pub phase: String,
    pub active: bool,
    pub strategy: String,
    pub entries: usize,
    pub pending_changes: usize,
    pub queued_operations: usize,
    pub tombstones: usize,
    pub last_sync_at: Option<i64>,
    pub last_remote_sync_at: Option<i64>,
    pub last_error: Option<String>,
    pub remote_configured: bool,
}

pub fn status_to_item(table: &str, status: &TableStatus, remote_configured: bool) -> StatusItem {
    StatusItem {
        table: table.to_string(),
        phase: format!("{:?}", status.phase).to_lowercase(),
        active: status.phase.is_active(),
        strategy: status.state.strategy.as_str().to_string(),
        entries: status.entries,
        pending_changes: status.pending_changes,
        queued_operations: status.queued_operations,
        tombstones: status.tombstones,
        last_sync_at: status.state.last_sync_at,
        last_remote_sync_at: status.state.last_remote_sync_at,
        last_error: status.state.last_error.clone(),
        remote_configured,
    }
}

pub fn format_status_lines(item: &StatusItem) -> Vec<String> {
    let never = || "never".to_string();
    let mut lines = vec![
        format!("table:             {}", item.table),
        format!(
            "remote:            {}",
            if item.remote_configured { "configured" } else { "local only" }
        ),
        format!("strategy:          {}", item.strategy),
        format!("entries:           {}", item.entries),
        format!("pending changes:   {}", item.pending_changes),
        format!("queued operations: {}", item.queued_operations),
        format!("tombstones:        {}", item.tombstones),
        format!(
            "last sync:         {}",
            item.last_sync_at.map_or_else(never, format_timestamp)
        ),
        format!(
            "last remote sync:  {}",
            item.last_remote_sync_at.map_or_else(never, format_timestamp)
        ),
    ];
    if let Some(error) = &item.last_error {
        lines.push(format!("last error:        {error}"));
    }
    lines
}

pub async fn run_status(ctx: &CliContext, as_json: bool) -> Result<(), CliError> {
    let orchestrator = ctx.open().await?;
    let status = orchestrator.status(&ctx.table).await?;
    let item = status_to_item(&ctx.table, &status, ctx.config.has_remote());

    if as_json {
        println!("{}", serde_json::to_string_pretty(&item)?);
    } else {
        for line in format_status_lines(&item) {
            println!("{line}");
        }
    }
    Ok(())
}
