use crate::config::{ConnectionSettings, RetryOptions, SettingsRepository};
use crate::error::{DataError, DataResult};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::future::Future;
use std::time::Duration;
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info, warn};

/// Predicate on a table column, rendered in `column=op.value` query form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryFilter {
    pub column: String,
    pub op: FilterOp,
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
    Like,
    In,
}

impl FilterOp {
    fn as_str(&self) -> &'static str {
        match self {
            FilterOp::Eq => "eq",
            FilterOp::Neq => "neq",
            FilterOp::Gt => "gt",
            FilterOp::Gte => "gte",
            FilterOp::Lt => "lt",
            FilterOp::Lte => "lte",
            FilterOp::Like => "like",
            FilterOp::In => "in",
        }
    }
}

impl QueryFilter {
    pub fn new(column: impl Into<String>, op: FilterOp, value: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            op,
            value: value.into(),
        }
    }

    pub fn eq(column: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(column, FilterOp::Eq, value)
    }

    pub fn to_query_pair(&self) -> (String, String) {
        (
            self.column.clone(),
            format!("{}.{}", self.op.as_str(), self.value),
        )
    }
}

#[derive(Debug, Clone, Default)]
pub struct SelectOptions {
    /// Comma-separated column list; `*` when absent.
    pub columns: Option<String>,
    pub filters: Vec<QueryFilter>,
    /// `column.asc` / `column.desc`.
    pub order: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

/// One step of a heterogeneous batch.
#[derive(Debug, Clone)]
pub enum Operation {
    Select {
        table: String,
        options: SelectOptions,
    },
    Insert {
        table: String,
        rows: Value,
    },
    Update {
        table: String,
        patch: Value,
        filters: Vec<QueryFilter>,
    },
    Delete {
        table: String,
        filters: Vec<QueryFilter>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeEventKind {
    Insert,
    Update,
    Delete,
}

/// Row-change notification delivered by the realtime transport.
#[derive(Debug, Clone)]
pub struct ChangeEvent {
    pub table: String,
    pub kind: ChangeEventKind,
    pub record: Value,
}

/// Equality predicate on a field of the changed record.
#[derive(Debug, Clone)]
pub struct RecordFilter {
    pub column: String,
    pub value: Value,
}

#[derive(Debug, Clone, Default)]
pub struct SubscribeOptions {
    pub kind: Option<ChangeEventKind>,
    pub filter: Option<RecordFilter>,
}

/// Handle for an active change-feed subscription.
pub struct SubscriptionHandle {
    task: tokio::task::JoinHandle<()>,
}

impl SubscriptionHandle {
    pub fn unsubscribe(self) {
        self.task.abort();
    }
}

/// Run `operation` up to `max_retries + 1` times.
///
/// Only errors in the retryable taxonomy are retried; everything else aborts
/// immediately. The sleep between attempts follows the configured backoff.
/// When all attempts are exhausted the last observed error is returned.
pub async fn execute_with_retry<T, F, Fut>(mut operation: F, options: &RetryOptions) -> DataResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = DataResult<T>>,
{
    let mut last_error: Option<DataError> = None;

    for attempt in 0..=options.max_retries {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                let retryable = err.is_retryable();
                warn!(attempt, error = %err, retryable, "data operation failed");
                last_error = Some(err);

                if !retryable || attempt == options.max_retries {
                    break;
                }

                tokio::time::sleep(options.delay_for_attempt(attempt)).await;
            }
        }
    }

    Err(last_error
        .unwrap_or_else(|| DataError::Unknown("operation produced no result".to_string())))
}

/// Client for the hosted Postgres-backed REST endpoint.
///
/// Wraps primitive table operations with uniform retry semantics; connection
/// settings are read once from the settings repository and held for the
/// lifetime of the client.
pub struct DataClient {
    http: Client,
    settings: RwLock<Option<ConnectionSettings>>,
    feed: broadcast::Sender<ChangeEvent>,
}

impl DataClient {
    pub fn new() -> Self {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to build HTTP client");
        let (feed, _) = broadcast::channel(256);

        Self {
            http,
            settings: RwLock::new(None),
            feed,
        }
    }

    /// Read connection settings from the repository.
    ///
    /// Returns `Ok(false)` when settings are absent or malformed — the client
    /// simply stays uninitialized. Idempotent; repeated calls are cheap.
    pub async fn initialize(&self, repo: &SettingsRepository) -> DataResult<bool> {
        if self.settings.read().await.is_some() {
            return Ok(true);
        }

        let Some(settings) = repo.load_settings().await else {
            debug!("no persisted connection settings, data client stays uninitialized");
            return Ok(false);
        };

        if reqwest::Url::parse(&settings.url).is_err() {
            warn!(url = %settings.url, "persisted endpoint URL is malformed");
            return Ok(false);
        }

        info!(url = %settings.url, "data client initialized");
        *self.settings.write().await = Some(settings);
        Ok(true)
    }

    /// Install settings directly, bypassing persistence.
    pub async fn configure(&self, settings: ConnectionSettings) {
        *self.settings.write().await = Some(settings);
    }

    pub async fn is_initialized(&self) -> bool {
        self.settings.read().await.is_some()
    }

    async fn settings(&self) -> DataResult<ConnectionSettings> {
        self.settings
            .read()
            .await
            .clone()
            .ok_or(DataError::NotInitialized)
    }

    /// Minimal read against the endpoint root to verify connectivity.
    pub async fn test_connection(&self) -> DataResult<()> {
        let settings = self.settings().await?;
        let url = format!("{}/rest/v1/", settings.url.trim_end_matches('/'));

        let response = self
            .http
            .get(&url)
            .header("apikey", settings.api_key.as_str())
            .bearer_auth(settings.bearer_key())
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let message = response.text().await.unwrap_or_default();
            Err(DataError::from_status(status.as_u16(), message))
        }
    }

    pub async fn select(&self, table: &str, options: SelectOptions) -> DataResult<Value> {
        let retry = self.settings().await?.retry;
        execute_with_retry(|| self.select_once(table, &options), &retry).await
    }

    pub async fn insert(&self, table: &str, rows: Value) -> DataResult<Value> {
        let retry = self.settings().await?.retry;
        execute_with_retry(|| self.insert_once(table, &rows), &retry).await
    }

    pub async fn update(
        &self,
        table: &str,
        patch: Value,
        filters: &[QueryFilter],
    ) -> DataResult<Value> {
        let retry = self.settings().await?.retry;
        execute_with_retry(|| self.update_once(table, &patch, filters), &retry).await
    }

    pub async fn delete(&self, table: &str, filters: &[QueryFilter]) -> DataResult<Value> {
        let retry = self.settings().await?.retry;
        execute_with_retry(|| self.delete_once(table, filters), &retry).await
    }

    /// Execute a heterogeneous sequence of operations inside one retry
    /// envelope.
    ///
    /// NOT a transaction: operations run sequentially and the first failure
    /// aborts the remainder, leaving earlier operations applied. A transient
    /// failure re-runs the batch from the start.
    pub async fn batch(&self, operations: &[Operation]) -> DataResult<Vec<Value>> {
        let retry = self.settings().await?.retry;
        execute_with_retry(
            || async move {
                let mut results = Vec::with_capacity(operations.len());
                for operation in operations {
                    results.push(self.execute_once(operation).await?);
                }
                Ok(results)
            },
            &retry,
        )
        .await
    }

    /// Dispatch change-feed events for `table` to `callback`.
    ///
    /// Events are filtered by kind and an optional record predicate.
    /// Reconnect-on-drop is the transport's concern; when the feed closes the
    /// subscription task simply ends.
    pub fn subscribe<F>(
        &self,
        table: &str,
        options: SubscribeOptions,
        callback: F,
    ) -> SubscriptionHandle
    where
        F: Fn(ChangeEvent) + Send + 'static,
    {
        let mut receiver = self.feed.subscribe();
        let table = table.to_string();

        let task = tokio::spawn(async move {
            loop {
                match receiver.recv().await {
                    Ok(event) => {
                        if event.table != table {
                            continue;
                        }
                        if let Some(kind) = options.kind {
                            if event.kind != kind {
                                continue;
                            }
                        }
                        if let Some(filter) = &options.filter {
                            if event.record.get(&filter.column) != Some(&filter.value) {
                                continue;
                            }
                        }
                        callback(event);
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "change feed subscriber lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        SubscriptionHandle { task }
    }

    /// Sender side of the change feed, for the realtime transport to publish
    /// into.
    pub fn feed_sender(&self) -> broadcast::Sender<ChangeEvent> {
        self.feed.clone()
    }

    async fn execute_once(&self, operation: &Operation) -> DataResult<Value> {
        match operation {
            Operation::Select { table, options } => self.select_once(table, options).await,
            Operation::Insert { table, rows } => self.insert_once(table, rows).await,
            Operation::Update {
                table,
                patch,
                filters,
            } => self.update_once(table, patch, filters).await,
            Operation::Delete { table, filters } => self.delete_once(table, filters).await,
        }
    }

    async fn select_once(&self, table: &str, options: &SelectOptions) -> DataResult<Value> {
        let settings = self.settings().await?;

        let mut query: Vec<(String, String)> = vec![(
            "select".to_string(),
            options.columns.clone().unwrap_or_else(|| "*".to_string()),
        )];
        query.extend(options.filters.iter().map(QueryFilter::to_query_pair));
        if let Some(order) = &options.order {
            query.push(("order".to_string(), order.clone()));
        }
        if let Some(limit) = options.limit {
            query.push(("limit".to_string(), limit.to_string()));
        }
        if let Some(offset) = options.offset {
            query.push(("offset".to_string(), offset.to_string()));
        }

        let request = self
            .http
            .get(self.table_url(&settings, table))
            .header("apikey", settings.api_key.clone())
            .bearer_auth(settings.bearer_key())
            .query(&query);

        Self::into_json(request.send().await?).await
    }

    async fn insert_once(&self, table: &str, rows: &Value) -> DataResult<Value> {
        let settings = self.settings().await?;

        let request = self
            .http
            .post(self.table_url(&settings, table))
            .header("apikey", settings.api_key.clone())
            .header("Prefer", "return=representation")
            .bearer_auth(settings.bearer_key())
            .json(rows);

        Self::into_json(request.send().await?).await
    }

    async fn update_once(
        &self,
        table: &str,
        patch: &Value,
        filters: &[QueryFilter],
    ) -> DataResult<Value> {
        let settings = self.settings().await?;
        let query: Vec<(String, String)> =
            filters.iter().map(QueryFilter::to_query_pair).collect();

        let request = self
            .http
            .patch(self.table_url(&settings, table))
            .header("apikey", settings.api_key.clone())
            .header("Prefer", "return=representation")
            .bearer_auth(settings.bearer_key())
            .query(&query)
            .json(patch);

        Self::into_json(request.send().await?).await
    }

    async fn delete_once(&self, table: &str, filters: &[QueryFilter]) -> DataResult<Value> {
        let settings = self.settings().await?;
        let query: Vec<(String, String)> =
            filters.iter().map(QueryFilter::to_query_pair).collect();

        let request = self
            .http
            .delete(self.table_url(&settings, table))
            .header("apikey", settings.api_key.clone())
            .header("Prefer", "return=representation")
            .bearer_auth(settings.bearer_key())
            .query(&query);

        Self::into_json(request.send().await?).await
    }

    fn table_url(&self, settings: &ConnectionSettings, table: &str) -> String {
        format!("{}/rest/v1/{}", settings.url.trim_end_matches('/'), table)
    }

    async fn into_json(response: reqwest::Response) -> DataResult<Value> {
        let status = response.status();
        if status.is_success() {
            response
                .json()
                .await
                .map_err(|e| DataError::Unknown(format!("Malformed response body: {}", e)))
        } else {
            let message = response.text().await.unwrap_or_default();
            Err(DataError::from_status(status.as_u16(), message))
        }
    }
}

impl Default for DataClient {
    fn default() -> Self {
        Self::new()
    }
}
