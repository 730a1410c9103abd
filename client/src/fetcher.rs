//! Remote fetcher - pulls the remote quote set and pushes local records.
//!
//! The remote speaks a generic "posts" schema (`id`, `title`, `body`, ...).
//! Records are mapped into [`QuoteRecord`]s: `text`/`title` become the quote
//! text, `author` or the first line of `body` the attribution, and a fixed
//! tag stands in for a missing category.

use crate::error::{Result, SyncError};
use crate::transport::Transport;
use quotesync_engine::{QuoteRecord, RecordId, UNKNOWN_AUTHOR};
use serde_json::{json, Map, Value};

/// Outcome of a best-effort push.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushOutcome {
    /// The remote accepted the record
    Acknowledged,
    /// The push failed; the record stays pending
    Rejected(String),
}

/// Fetches and pushes quote records over a [`Transport`].
#[derive(Debug)]
pub struct RemoteFetcher<T> {
    transport: T,
    url: String,
    default_category: String,
}

impl<T: Transport> RemoteFetcher<T> {
    /// Create a fetcher for `url`.
    pub fn new(transport: T, url: impl Into<String>, default_category: impl Into<String>) -> Self {
        Self {
            transport,
            url: url.into(),
            default_category: default_category.into(),
        }
    }

    /// The endpoint polled by [`fetch_remote`](Self::fetch_remote).
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Fetch the remote set and map it into records.
    pub async fn fetch_remote(&self) -> Result<Vec<QuoteRecord>> {
        let body = self.transport.http_get(&self.url).await?;
        let records = map_remote(&body, &self.default_category)?;
        tracing::debug!(url = %self.url, count = records.len(), "Fetched remote quotes");
        Ok(records)
    }

    /// Notify the remote of a local record. Never fails the caller.
    pub async fn push_record(&self, record: &QuoteRecord) -> PushOutcome {
        let body = json!({
            "id": record.id,
            "title": record.text,
            "body": record.author,
            "category": record.category,
            "version": record.version,
        });

        match self.transport.http_post(&self.url, &body).await {
            Ok(_) => {
                tracing::debug!(id = %record.id, version = record.version, "Pushed record");
                PushOutcome::Acknowledged
            }
            Err(e) => {
                tracing::warn!(id = %record.id, error = %e, "Push failed, record stays pending");
                PushOutcome::Rejected(e.to_string())
            }
        }
    }
}

/// Map a remote response body into records.
///
/// The body must be an array. Elements without a usable `id` are skipped.
pub fn map_remote(body: &Value, default_category: &str) -> Result<Vec<QuoteRecord>> {
    let items = body.as_array().ok_or_else(|| {
        SyncError::RemoteProtocol(format!("expected a JSON array, got {}", kind(body)))
    })?;

    let mut records = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        match map_item(item, default_category) {
            Some(record) => records.push(record),
            None => tracing::warn!(index, "Skipping remote item without a usable id"),
        }
    }
    Ok(records)
}

fn map_item(item: &Value, default_category: &str) -> Option<QuoteRecord> {
    let fields = item.as_object()?;
    let id = remote_id(fields.get("id")?)?;

    let text = string_field(fields, "text")
        .or_else(|| string_field(fields, "title"))
        .map(str::to_string)
        .unwrap_or_else(|| format!("Post #{id}"));

    let author = string_field(fields, "author")
        .or_else(|| string_field(fields, "body").and_then(first_line))
        .unwrap_or(UNKNOWN_AUTHOR)
        .to_string();

    let category = string_field(fields, "category").unwrap_or(default_category);

    Some(QuoteRecord::remote(id, text, author, category))
}

fn first_line(text: &str) -> Option<&str> {
    text.lines().map(str::trim).find(|l| !l.is_empty())
}

fn remote_id(value: &Value) -> Option<RecordId> {
    match value {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        _ => None,
    }
}

fn string_field<'a>(fields: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    fields
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
