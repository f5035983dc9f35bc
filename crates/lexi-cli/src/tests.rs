use std::path::PathBuf;

use lexi_core::config::ClientConfig;
use lexi_core::sync::CycleStatus;
use lexi_core::ConflictStrategy;
use pretty_assertions::assert_eq;
use tempfile::{tempdir, TempDir};

use crate::cli::CompletionShell;
use crate::commands::add::run_add;
use crate::commands::common::{
    apply_env_overrides, entry_preview, format_relative_time, normalize_content,
    normalize_examples, normalize_key, resolve_db_path, CliContext, ENV_AUTH_TOKEN,
    ENV_REMOTE_URL, ENV_USER_ID,
};
use crate::commands::completions::render_completions;
use crate::commands::delete::run_delete;
use crate::commands::edit::run_edit;
use crate::commands::status::{format_status_lines, status_to_item};
use crate::commands::sync::run_sync;
use crate::error::CliError;

fn local_context() -> (TempDir, CliContext) {
    let tmp = tempdir().unwrap();
    let ctx = CliContext {
        db_path: tmp.path().join("lexi.db"),
        table: "words".to_string(),
        config: ClientConfig::default(),
    };
    (tmp, ctx)
}

#[test]
fn normalize_content_trims_and_rejects_empty() {
    assert_eq!(normalize_content("  hello  "), Some("hello".to_string()));
    assert_eq!(normalize_content(" \n\t "), None);
}

#[test]
fn normalize_key_rejects_blank() {
    assert_eq!(normalize_key("  lifetime ").unwrap(), "lifetime");
    assert!(matches!(normalize_key("   "), Err(CliError::EmptyKey)));
}

#[test]
fn normalize_examples_drops_blank_values() {
    let examples = vec![" a ".to_string(), String::new(), "b".to_string()];
    assert_eq!(normalize_examples(&examples), vec!["a", "b"]);
}

#[test]
fn format_relative_time_units() {
    let now = 10_000_000;
    assert_eq!(format_relative_time(now - 30_000, now), "just now");
    assert_eq!(format_relative_time(now - 120_000, now), "2m ago");
    assert_eq!(format_relative_time(now - 2 * 60 * 60_000, now), "2h ago");
}

#[test]
fn entry_preview_truncates_with_ellipsis() {
    let preview = entry_preview("This is a very long sentence that should be shortened", 20);
    assert_eq!(preview, "This is a very lo...");
    assert_eq!(entry_preview("first line\nsecond", 20), "first line");
}

#[test]
fn resolve_db_path_prefers_flag_over_env() {
    let flag = PathBuf::from("/tmp/flag.db");
    let env = PathBuf::from("/tmp/env.db");

    assert_eq!(
        resolve_db_path(Some(flag.clone()), Some(env.clone())).unwrap(),
        flag
    );
    assert_eq!(resolve_db_path(None, Some(env.clone())).unwrap(), env);
}

#[test]
fn env_overrides_replace_config_values() {
    let config = ClientConfig {
        remote_url: Some("https://file.example.com".to_string()),
        user_id: Some("from-file".to_string()),
        ..ClientConfig::default()
    };

    let config = apply_env_overrides(config, |name| match name {
        ENV_REMOTE_URL => Some("https://env.example.com/".to_string()),
        ENV_AUTH_TOKEN => Some("token".to_string()),
        _ => None,
    })
    .unwrap();

    assert_eq!(config.remote_url.as_deref(), Some("https://env.example.com"));
    assert_eq!(config.auth_token.as_deref(), Some("token"));
    assert_eq!(config.user_id.as_deref(), Some("from-file"));
}

#[test]
fn env_overrides_are_validated() {
    let result = apply_env_overrides(ClientConfig::default(), |name| {
        (name == ENV_REMOTE_URL).then(|| "sync.example.com".to_string())
    });
    assert!(matches!(result, Err(CliError::Core(_))));

    let config = apply_env_overrides(ClientConfig::default(), |name| {
        (name == ENV_USER_ID).then(|| "  ".to_string())
    })
    .unwrap();
    assert!(config.user_id.is_none());
}

#[test]
fn completions_name_the_binary() {
    let script = String::from_utf8(render_completions(CompletionShell::Bash)).unwrap();
    assert!(script.contains("lexi"));
    assert!(script.contains("status"));
}

#[tokio::test(flavor = "multi_thread")]
async fn add_then_edit_and_delete() {
    let (_tmp, ctx) = local_context();

    run_add(&ctx, "borrow", &["take".into(), "a reference".into()], &["&x".into()])
        .await
        .unwrap();

    let duplicate = run_add(&ctx, "borrow", &["again".into()], &[]).await;
    assert!(matches!(duplicate, Err(CliError::EntryExists(key)) if key == "borrow"));

    run_edit(&ctx, "borrow", Some("take a shared reference"), &[], false)
        .await
        .unwrap();

    let orchestrator = ctx.open().await.unwrap();
    let entry = orchestrator.get_entry("words", "borrow").await.unwrap().unwrap();
    assert_eq!(entry.description, "take a shared reference");
    assert_eq!(entry.examples, vec!["&x"]);
    drop(orchestrator);

    run_edit(&ctx, "borrow", None, &[], true).await.unwrap();
    run_delete(&ctx, "borrow").await.unwrap();

    let missing = run_delete(&ctx, "borrow").await;
    assert!(matches!(missing, Err(CliError::EntryNotFound(_))));
}

#[tokio::test(flavor = "multi_thread")]
async fn edit_requires_a_change() {
    let (_tmp, ctx) = local_context();

    let result = run_edit(&ctx, "missing", None, &[], false).await;
    assert!(matches!(result, Err(CliError::NothingToEdit)));

    let result = run_edit(&ctx, "missing", Some("text"), &[], false).await;
    assert!(matches!(result, Err(CliError::EntryNotFound(_))));
}

#[tokio::test(flavor = "multi_thread")]
async fn sync_without_remote_is_local_only() {
    let (_tmp, ctx) = local_context();
    run_add(&ctx, "trait", &["shared behaviour".into()], &[])
        .await
        .unwrap();

    let report = run_sync(&ctx, Some(ConflictStrategy::PreferLocal)).await.unwrap();

    assert_eq!(report.status, CycleStatus::Skipped);
    assert_eq!(report.local_count, 1);

    let orchestrator = ctx.open().await.unwrap();
    let status = orchestrator.status("words").await.unwrap();
    assert_eq!(status.state.strategy, ConflictStrategy::PreferLocal);
    assert!(status.state.last_sync_at.is_some());
    assert_eq!(status.pending_changes, 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn status_lines_report_bookkeeping() {
    let (_tmp, ctx) = local_context();
    run_add(&ctx, "a", &["first".into()], &[]).await.unwrap();

    let orchestrator = ctx.open().await.unwrap();
    let status = orchestrator.status("words").await.unwrap();
    let item = status_to_item("words", &status, false);
    let lines = format_status_lines(&item);

    assert_eq!(item.entries, 1);
    assert_eq!(item.phase, "idle");
    assert!(!item.active);
    assert!(lines.iter().any(|line| line.contains("local only")));
    assert!(lines.iter().any(|line| line.starts_with("last sync:") && line.ends_with("never")));
}
