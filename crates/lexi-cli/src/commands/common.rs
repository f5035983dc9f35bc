use std::env;
use std::io::{self, IsTerminal, Read};
use std::path::PathBuf;

use chrono::Utc;
use lexi_core::config::{load_client_config, ClientConfig};
use lexi_core::models::Entry;
use lexi_core::store::RemoteStore;
use lexi_core::sync::{ConnectivityFlag, StaticSession, SyncResult};
use lexi_core::{
    DatabaseService, HttpRemoteStore, Snapshot, SyncConfig, SyncError, SyncOrchestrator,
};
use serde::Serialize;

use crate::error::CliError;

pub const ENV_DB_PATH: &str = "LEXI_DB_PATH";
pub const ENV_REMOTE_URL: &str = "LEXI_REMOTE_URL";
pub const ENV_AUTH_TOKEN: &str = "LEXI_AUTH_TOKEN";
pub const ENV_USER_ID: &str = "LEXI_USER_ID";

pub type CliOrchestrator = SyncOrchestrator<DatabaseService, CliRemote>;

/// Resolved global options shared by every command.
#[derive(Debug, Clone)]
pub struct CliContext {
    pub db_path: PathBuf,
    pub table: String,
    pub config: ClientConfig,
}

impl CliContext {
    pub fn resolve(
        db_path: Option<PathBuf>,
        table: &str,
        config_path: Option<PathBuf>,
    ) -> Result<Self, CliError> {
        let db_path = resolve_db_path(db_path, env::var_os(ENV_DB_PATH).map(PathBuf::from))?;
        let config_path = config_path.or_else(default_config_path);
        let config = match config_path {
            Some(path) => load_client_config(path)?,
            None => ClientConfig::default(),
        };
        let config = apply_env_overrides(config, |name| env::var(name).ok())?;

        let table = table.trim();
        if table.is_empty() {
            return Err(CliError::Core(lexi_core::Error::InvalidInput(
                "Table name cannot be empty".to_string(),
            )));
        }

        Ok(Self {
            db_path,
            table: table.to_string(),
            config,
        })
    }

    pub async fn open(&self) -> Result<CliOrchestrator, CliError> {
        self.open_with(self.config.sync_config()).await
    }

    /// Open the local store and wire it to the configured remote.
    ///
    /// Without a remote URL or user id every cycle runs local-only.
    pub async fn open_with(&self, sync_config: SyncConfig) -> Result<CliOrchestrator, CliError> {
        let local = DatabaseService::open_path(&self.db_path).await?;

        let (remote, session) = match (&self.config.remote_url, &self.config.user_id) {
            (Some(url), Some(user_id)) => {
                let remote = HttpRemoteStore::new(url.clone(), self.config.auth_token.clone())?;
                tracing::debug!("Remote sync enabled via {}", remote.base_url());
                (CliRemote::Http(remote), StaticSession::new(user_id.clone()))
            }
            (Some(_), None) => {
                tracing::warn!("Remote URL configured without a user id; syncing locally");
                (CliRemote::Disabled, StaticSession::signed_out())
            }
            _ => (CliRemote::Disabled, StaticSession::signed_out()),
        };

        Ok(SyncOrchestrator::new(
            local,
            remote,
            session,
            ConnectivityFlag::new(true),
            sync_config,
        ))
    }
}

/// Remote store used by the CLI: HTTP when configured, otherwise none.
pub enum CliRemote {
    Http(HttpRemoteStore),
    Disabled,
}

impl CliRemote {
    fn disabled() -> SyncError {
        SyncError::RemoteUnavailable("no remote store configured".to_string())
    }
}

impl RemoteStore for CliRemote {
    async fn fetch_all(&self, table: &str) -> SyncResult<Snapshot> {
        match self {
            Self::Http(remote) => remote.fetch_all(table).await,
            Self::Disabled => Err(Self::disabled()),
        }
    }

    async fn upsert(&self, table: &str, entry: &Entry) -> SyncResult<String> {
        match self {
            Self::Http(remote) => remote.upsert(table, entry).await,
            Self::Disabled => Err(Self::disabled()),
        }
    }

    async fn delete(&self, table: &str, key: &str) -> SyncResult<()> {
        match self {
            Self::Http(remote) => remote.delete(table, key).await,
            Self::Disabled => Err(Self::disabled()),
        }
    }
}

/// Overlay `LEXI_*` environment values on a loaded config.
pub fn apply_env_overrides(
    mut config: ClientConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<ClientConfig, CliError> {
    if let Some(url) = lookup(ENV_REMOTE_URL) {
        config.remote_url = Some(url);
    }
    if let Some(token) = lookup(ENV_AUTH_TOKEN) {
        config.auth_token = Some(token);
    }
    if let Some(user_id) = lookup(ENV_USER_ID) {
        config.user_id = Some(user_id);
    }
    Ok(config.validated()?)
}

#[derive(Debug, Serialize)]
pub struct EntryItem {
    pub key: String,
    pub description: String,
    pub examples: Vec<String>,
    pub created_at: i64,
    pub updated_at: i64,
    pub relative_time: String,
    pub remote_id: Option<String>,
    pub provenance: String,
}

pub fn entry_to_item(entry: &Entry) -> EntryItem {
    let now_ms = Utc::now().timestamp_millis();
    EntryItem {
        key: entry.key.clone(),
        description: entry.description.clone(),
        examples: entry.examples.clone(),
        created_at: entry.created_at,
        updated_at: entry.updated_at,
        relative_time: format_relative_time(entry.updated_at, now_ms),
        remote_id: entry.remote_id.clone(),
        provenance: entry.provenance.as_str().to_string(),
    }
}

pub fn format_entry_lines(entries: &[Entry]) -> Vec<String> {
    let now_ms = Utc::now().timestamp_millis();
    let width = entries
        .iter()
        .map(|entry| entry.key.chars().count())
        .max()
        .unwrap_or(0)
        .min(24);
    entries
        .iter()
        .map(|entry| {
            let preview = entry_preview(&entry.description, 50);
            let relative_time = format_relative_time(entry.updated_at, now_ms);
            let marker = if entry.remote_id.is_some() { ' ' } else { '*' };
            format!("{marker} {:<width$}  {preview:<50}  {relative_time}", entry.key)
        })
        .collect()
}

pub fn format_entry_detail(entry: &Entry) -> Vec<String> {
    let mut lines = vec![
        entry.key.clone(),
        format!("  {}", entry.description),
    ];
    for example in &entry.examples {
        lines.push(format!("  - {example}"));
    }
    lines.push(format!(
        "  updated {} ({})",
        format_timestamp(entry.updated_at),
        entry.remote_id.as_deref().unwrap_or("not synced")
    ));
    lines
}

pub fn entry_preview(description: &str, max_chars: usize) -> String {
    let first_line = description.lines().next().unwrap_or("").trim();
    let collapsed = first_line.split_whitespace().collect::<Vec<_>>().join(" ");

    if collapsed.chars().count() <= max_chars {
        collapsed
    } else {
        let take_len = max_chars.saturating_sub(3);
        let mut truncated = collapsed.chars().take(take_len).collect::<String>();
        truncated.push_str("...");
        truncated
    }
}

pub fn format_timestamp(timestamp_ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(timestamp_ms).map_or_else(
        || timestamp_ms.to_string(),
        |date_time| date_time.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    )
}

pub fn format_relative_time(timestamp_ms: i64, now_ms: i64) -> String {
    let diff = now_ms.saturating_sub(timestamp_ms);
    let minute = 60_000;
    let hour = 60 * minute;
    let day = 24 * hour;
    let week = 7 * day;
    let month = 30 * day;
    let year = 365 * day;

    if diff < minute {
        "just now".to_string()
    } else if diff < hour {
        format!("{}m ago", diff / minute)
    } else if diff < day {
        format!("{}h ago", diff / hour)
    } else if diff < week {
        format!("{}d ago", diff / day)
    } else if diff < month {
        format!("{}w ago", diff / week)
    } else if diff < year {
        format!("{}mo ago", diff / month)
    } else {
        format!("{}y ago", diff / year)
    }
}

/// Description from the arguments, falling back to piped stdin.
pub fn resolve_description(parts: &[String]) -> Result<String, CliError> {
    if let Some(description) = normalize_content(&parts.join(" ")) {
        return Ok(description);
    }

    if let Some(description) = read_piped_stdin()? {
        return Ok(description);
    }

    Err(CliError::EmptyDescription)
}

pub fn normalize_content(content: &str) -> Option<String> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

pub fn normalize_key(key: &str) -> Result<String, CliError> {
    let trimmed = key.trim();
    if trimmed.is_empty() {
        Err(CliError::EmptyKey)
    } else {
        Ok(trimmed.to_string())
    }
}

/// Trimmed, non-empty examples in argument order.
pub fn normalize_examples(examples: &[String]) -> Vec<String> {
    examples
        .iter()
        .filter_map(|example| normalize_content(example))
        .collect()
}

pub fn read_piped_stdin() -> Result<Option<String>, CliError> {
    let stdin = io::stdin();
    if stdin.is_terminal() {
        return Ok(None);
    }

    let mut buffer = String::new();
    stdin.lock().read_to_string(&mut buffer)?;
    Ok(normalize_content(&buffer))
}

pub fn resolve_db_path(
    cli_db_path: Option<PathBuf>,
    env_db_path: Option<PathBuf>,
) -> Result<PathBuf, CliError> {
    if let Some(path) = cli_db_path.or(env_db_path) {
        return Ok(path);
    }
    default_db_path().ok_or(CliError::NoDataDir)
}

pub fn default_db_path() -> Option<PathBuf> {
    dirs::data_dir().map(|dir| dir.join("lexi").join("lexi.db"))
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("lexi").join("config.json"))
}
