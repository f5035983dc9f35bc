use lexi_core::sync::CycleStatus;
use lexi_core::{ConflictStrategy, SyncReport};

use crate::commands::common::CliContext;
use crate::error::CliError;

pub async fn run_sync(
    ctx: &CliContext,
    strategy: Option<ConflictStrategy>,
) -> Result<SyncReport, CliError> {
    let mut sync_config = ctx.config.sync_config();
    if let Some(strategy) = strategy {
        sync_config = sync_config.with_strategy(strategy);
    }

    let orchestrator = ctx.open_with(sync_config).await?;
    let report = orchestrator.request_sync(&ctx.table).await;

    println!("{}", report.summary());
    for failure in &report.permanent_failures {
        println!(
            "  gave up on {} '{}' after {} attempts: {}",
            failure.kind.as_str(),
            failure.key,
            failure.attempts,
            failure.reason
        );
    }

    if report.status == CycleStatus::Failed {
        return Err(CliError::SyncFailed(report.summary()));
    }
    Ok(report)
}
