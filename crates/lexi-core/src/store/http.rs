//! HTTP remote store client.

use reqwest::{Response, StatusCode};
use serde::Deserialize;

use super::RemoteStore;
use crate::error::{Error, Result};
use crate::models::{validate_key, Entry, Provenance, Snapshot};
use crate::sync::{SyncError, SyncResult};
use crate::util::{error_excerpt, non_blank, remote_base_url};

/// Remote store served over a JSON HTTP API.
///
/// Routes, relative to the base URL:
/// - `GET /v1/tables/{table}/entries` returns `{"entries": [...]}`
/// - `PUT /v1/tables/{table}/entries/{key}` returns `{"remote_id": "..."}`
/// - `DELETE /v1/tables/{table}/entries/{key}` (404 counts as deleted)
#[derive(Clone)]
pub struct HttpRemoteStore {
    base_url: String,
    auth_token: Option<String>,
    client: reqwest::Client,
}

impl std::fmt::Debug for HttpRemoteStore {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("HttpRemoteStore")
            .field("base_url", &self.base_url)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "[REDACTED]"))
            .finish_non_exhaustive()
    }
}

impl HttpRemoteStore {
    pub fn new(base_url: impl Into<String>, auth_token: Option<String>) -> Result<Self> {
        let base_url = remote_base_url(&base_url.into())?;
        let client = reqwest::Client::builder()
            .build()
            .map_err(|error| Error::Config(format!("failed to build HTTP client: {error}")))?;
        Ok(Self {
            base_url,
            auth_token: non_blank(auth_token),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn entries_url(&self, table: &str) -> String {
        format!(
            "{}/v1/tables/{}/entries",
            self.base_url,
            urlencoding::encode(table)
        )
    }

    fn entry_url(&self, table: &str, key: &str) -> String {
        format!("{}/{}", self.entries_url(table), urlencoding::encode(key))
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let request = request.header("Accept", "application/json");
        match self.auth_token.as_deref() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

impl RemoteStore for HttpRemoteStore {
    async fn fetch_all(&self, table: &str) -> SyncResult<Snapshot> {
        let response = self
            .authorize(self.client.get(self.entries_url(table)))
            .send()
            .await
            .map_err(map_transport_error)?;
        let response = ensure_success(response).await?;

        let payload: EntriesResponse = response
            .json()
            .await
            .map_err(|error| invalid_payload(&format!("entry list: {error}")))?;

        let mut snapshot = Snapshot::new();
        for mut entry in payload.entries {
            validate_key(&entry.key).map_err(|error| invalid_payload(&error.to_string()))?;
            entry.provenance = Provenance::Remote;
            snapshot.insert(entry);
        }
        Ok(snapshot)
    }

    async fn upsert(&self, table: &str, entry: &Entry) -> SyncResult<String> {
        let response = self
            .authorize(self.client.put(self.entry_url(table, &entry.key)))
            .json(entry)
            .send()
            .await
            .map_err(map_transport_error)?;
        let response = ensure_success(response).await?;

        let payload: UpsertResponse = response
            .json()
            .await
            .map_err(|error| invalid_payload(&format!("upsert response: {error}")))?;

        non_blank(payload.remote_id).ok_or_else(|| {
            invalid_payload(&format!("upsert of '{}' returned no remote_id", entry.key))
        })
    }

    async fn delete(&self, table: &str, key: &str) -> SyncResult<()> {
        let response = self
            .authorize(self.client.delete(self.entry_url(table, key)))
            .send()
            .await
            .map_err(map_transport_error)?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }
        ensure_success(response).await?;
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct EntriesResponse {
    #[serde(default)]
    entries: Vec<Entry>,
}

#[derive(Debug, Deserialize)]
struct UpsertResponse {
    remote_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: Option<String>,
    message: Option<String>,
}

async fn ensure_success(response: Response) -> SyncResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = parse_api_error(status, &body);
    Err(classify_status(status, message))
}

fn classify_status(status: StatusCode, message: String) -> SyncError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => SyncError::RemoteUnavailable(message),
        _ => SyncError::TransientRemoteFailure(message),
    }
}

fn map_transport_error(error: reqwest::Error) -> SyncError {
    if error.is_connect() {
        SyncError::RemoteUnavailable(error.to_string())
    } else {
        SyncError::TransientRemoteFailure(error.to_string())
    }
}

fn invalid_payload(detail: &str) -> SyncError {
    SyncError::TransientRemoteFailure(format!("invalid remote payload: {detail}"))
}

fn parse_api_error(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<ApiErrorBody>(body) {
        if let Some(message) = payload.message.or(payload.error) {
            return format!("{} ({})", message.trim(), status.as_u16());
        }
    }

    let trimmed = error_excerpt(body);
    if trimmed.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        format!("{trimmed} ({})", status.as_u16())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn entry(key: &str) -> Entry {
        Entry::with_timestamps(key, "meaning", vec!["usage".to_string()], 1, 2)
    }

    fn store(server: &MockServer) -> HttpRemoteStore {
        HttpRemoteStore::new(format!("{}/", server.uri()), Some("token-1".to_string())).unwrap()
    }

    #[test]
    fn test_base_url_validation() {
        assert!(HttpRemoteStore::new("", None).is_err());
        assert!(HttpRemoteStore::new("api.example.com", None).is_err());
        let store = HttpRemoteStore::new(" https://api.example.com/ ", None).unwrap();
        assert_eq!(store.base_url(), "https://api.example.com");
    }

    #[test]
    fn test_debug_redacts_token() {
        let store = HttpRemoteStore::new("https://api.example.com", Some("secret".into())).unwrap();
        let debug = format!("{store:?}");
        assert!(!debug.contains("secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn test_parse_api_error_prefers_message() {
        let message = parse_api_error(
            StatusCode::TOO_MANY_REQUESTS,
            r#"{"error":"rate_limited","message":"slow down"}"#,
        );
        assert_eq!(message, "slow down (429)");
        assert_eq!(parse_api_error(StatusCode::BAD_GATEWAY, ""), "HTTP 502");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_fetch_all_parses_entries() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/tables/words/entries"))
            .and(header("authorization", "Bearer token-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "entries": [{
                    "key": "ownership",
                    "description": "one owner",
                    "examples": ["let s = String::new();"],
                    "created_at": 1,
                    "updated_at": 5,
                    "remote_id": "doc-1"
                }]
            })))
            .mount(&server)
            .await;

        let snapshot = store(&server).fetch_all("words").await.unwrap();

        let fetched = snapshot.get("ownership").unwrap();
        assert_eq!(fetched.updated_at, 5);
        assert_eq!(fetched.remote_id.as_deref(), Some("doc-1"));
        assert_eq!(fetched.provenance, Provenance::Remote);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_upsert_returns_remote_id_and_encodes_key() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/v1/tables/my%20words/entries/a%2Fb"))
            .and(body_partial_json(json!({ "key": "a/b", "description": "meaning" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "remote_id": "doc-9" })))
            .expect(1)
            .mount(&server)
            .await;

        let remote_id = store(&server)
            .upsert("my words", &entry("a/b"))
            .await
            .unwrap();

        assert_eq!(remote_id, "doc-9");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_upsert_without_remote_id_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;

        let error = store(&server).upsert("words", &entry("a")).await.unwrap_err();

        assert!(matches!(error, SyncError::TransientRemoteFailure(_)));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_delete_treats_not_found_as_success() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/v1/tables/words/entries/gone"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        store(&server).delete("words", "gone").await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_status_mapping() {
        let cases = [
            (401, true),
            (403, true),
            (408, false),
            (429, false),
            (500, false),
            (503, false),
            (422, false),
        ];

        for (status, unavailable) in cases {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .respond_with(ResponseTemplate::new(status))
                .mount(&server)
                .await;

            let error = store(&server).fetch_all("words").await.unwrap_err();
            assert_eq!(
                matches!(error, SyncError::RemoteUnavailable(_)),
                unavailable,
                "status {status} mapped to {error:?}"
            );
            assert!(error.is_retryable());
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_malformed_payload_is_transient() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let error = store(&server).fetch_all("words").await.unwrap_err();
        assert!(matches!(error, SyncError::TransientRemoteFailure(_)));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_connection_refused_is_unavailable() {
        let store = HttpRemoteStore::new("http://127.0.0.1:1", None).unwrap();
        let error = store.fetch_all("words").await.unwrap_err();
        assert!(matches!(error, SyncError::RemoteUnavailable(_)));
    }
}
