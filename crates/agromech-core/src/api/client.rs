//! API client for the console backend.
//!
//! This module provides the `ApiClient` struct for making authenticated
//! requests against the resource, hub and transaction endpoints.

use std::time::Duration;

use anyhow::{Context, Result};
use futures::stream::{self, StreamExt};
use reqwest::{header, Client, Method};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::models::{
    ConfirmRequest, ListFilters, ListResponse, ProjectTypeRequest, RawHub, Transaction,
    TransactionRequest,
};
use crate::query::{ListRequest, QueryMode};

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// Endpoint listing every active hub with its nested state/LGA info.
const ACTIVE_HUBS_PATH: &str = "hubs/all-active-hubs";

/// Endpoint for transaction creation and status actions.
const TRANSACTIONS_PATH: &str = "transactions";

/// Maximum number of retries for rate-limited (429) requests.
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Initial backoff delay in milliseconds for rate limiting.
const INITIAL_BACKOFF_MS: u64 = 1000;

/// Page size used when pulling a complete list for local pagination.
const FULL_LIST_PAGE_SIZE: u32 = 100;

/// Upper bound on pages pulled for one complete list.
const MAX_FULL_LIST_PAGES: u64 = 200;

/// Concurrent page requests while pulling a complete list.
const MAX_CONCURRENT_REQUESTS: usize = 4;

/// Responses are either bare or wrapped in `{data: ...}` depending on the endpoint.
#[derive(Deserialize)]
#[serde(untagged)]
enum Envelope<T> {
    Wrapped { data: T },
    Bare(T),
}

impl<T> Envelope<T> {
    fn into_inner(self) -> T {
        match self {
            Envelope::Wrapped { data } => data,
            Envelope::Bare(data) => data,
        }
    }
}

/// API client for the console backend.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
        })
    }

    /// Create a client from configuration, picking up the token if one is set.
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut api = Self::new(&config.api_base_url(), config.request_timeout())?;
        if let Some(token) = config.api_token() {
            api.set_token(token);
        }
        Ok(api)
    }

    /// Set the bearer token for authenticated requests
    pub fn set_token(&mut self, token: String) {
        self.token = Some(token);
    }

    /// Create a new ApiClient with the given token, sharing the connection pool.
    pub fn with_token(&self, token: String) -> Self {
        Self {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            token: Some(token),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_matches('/'))
    }

    fn auth_headers(&self) -> Result<header::HeaderMap> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json"),
        );
        if let Some(ref token) = self.token {
            headers.insert(
                header::AUTHORIZATION,
                header::HeaderValue::from_str(&format!("Bearer {}", token))?,
            );
        }
        Ok(headers)
    }

    /// Check if response is successful, returning an error with body if not.
    /// Returns Ok(Some(response)) for success, Ok(None) for rate limit (should retry),
    /// or Err for other errors.
    async fn check_response_for_retry(
        response: reqwest::Response,
    ) -> Result<Option<reqwest::Response>> {
        if response.status().is_success() {
            Ok(Some(response))
        } else if response.status().as_u16() == 429 {
            // Rate limited - signal to retry
            Ok(None)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body).into())
        }
    }

    /// Send a request, retrying on 429 with exponential backoff, and return the body text.
    async fn send(
        &self,
        method: Method,
        url: &str,
        query: &[(String, String)],
        body: Option<&serde_json::Value>,
    ) -> Result<String> {
        let mut retries = 0;
        let mut backoff_ms = INITIAL_BACKOFF_MS;

        loop {
            let mut request = self
                .client
                .request(method.clone(), url)
                .headers(self.auth_headers()?)
                .query(query);
            if let Some(body) = body {
                request = request.json(body);
            }

            let response = request
                .send()
                .await
                .with_context(|| format!("Failed to send {} request to {}", method, url))?;

            match Self::check_response_for_retry(response).await? {
                Some(response) => {
                    return response
                        .text()
                        .await
                        .with_context(|| format!("Failed to read response body from {}", url));
                }
                None => {
                    // Rate limited
                    retries += 1;
                    if retries > MAX_RATE_LIMIT_RETRIES {
                        return Err(ApiError::RateLimited.into());
                    }
                    warn!(url = url, retry = retries, backoff_ms = backoff_ms, "Rate limited, backing off");
                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                    backoff_ms *= 2; // Exponential backoff
                }
            }
        }
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: &[(String, String)],
        body: Option<&serde_json::Value>,
    ) -> Result<T> {
        let url = self.url(path);
        let text = self.send(method, &url, query, body).await?;
        parse_envelope(&text).with_context(|| format!("Failed to parse JSON response from {}", url))
    }

    // ===== Location Directory =====

    /// Fetch every active hub record. Records that do not parse are skipped.
    pub async fn fetch_active_hubs(&self) -> Result<Vec<RawHub>> {
        let records: Vec<serde_json::Value> = self
            .send_json(Method::GET, ACTIVE_HUBS_PATH, &[], None)
            .await?;
        let hubs = decode_hubs(records);
        debug!(count = hubs.len(), "Active hubs fetched");
        Ok(hubs)
    }

    // ===== Resource Lists =====

    /// Fetch one page of `resource`, filtered server-side.
    pub async fn fetch_page<T: DeserializeOwned>(
        &self,
        resource: &str,
        page: u32,
        per_page: u32,
        filters: &ListFilters,
    ) -> Result<ListResponse<T>> {
        let url = self.url(resource);
        let text = self
            .send(Method::GET, &url, &page_query(page, per_page, filters), None)
            .await?;
        serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse list response from {}", url))
    }

    /// Fetch the complete, unfiltered contents of `resource` by walking every page.
    pub async fn fetch_all<T: DeserializeOwned>(&self, resource: &str) -> Result<Vec<T>> {
        let no_filters = ListFilters::default();
        let first: ListResponse<T> = self
            .fetch_page(resource, 1, FULL_LIST_PAGE_SIZE, &no_filters)
            .await?;

        let mut last_page = first.last_page.max(1);
        if last_page > MAX_FULL_LIST_PAGES {
            warn!(resource, last_page, "Complete list too large, truncating");
            last_page = MAX_FULL_LIST_PAGES;
        }

        let mut items = first.data;
        if last_page > 1 {
            // `buffered` keeps page order while fetching concurrently
            let pages: Vec<Result<ListResponse<T>>> = stream::iter(2..=last_page)
                .map(|page| self.fetch_page(resource, page as u32, FULL_LIST_PAGE_SIZE, &no_filters))
                .buffered(MAX_CONCURRENT_REQUESTS)
                .collect()
                .await;
            for page in pages {
                items.extend(page?.data);
            }
        }

        info!(resource, count = items.len(), pages = last_page, "Complete list fetched");
        Ok(items)
    }

    /// Execute a request issued by a `QueryExecutor`.
    pub async fn fetch_list<T: DeserializeOwned>(
        &self,
        request: &ListRequest,
    ) -> Result<ListResponse<T>> {
        match request.mode {
            QueryMode::ServerAuthoritative => {
                self.fetch_page(&request.resource, request.page, request.per_page, &request.filters)
                    .await
            }
            QueryMode::ClientCached => self
                .fetch_all(&request.resource)
                .await
                .map(ListResponse::complete),
        }
    }

    // ===== Generic CRUD =====

    pub async fn create<T: DeserializeOwned, B: Serialize>(
        &self,
        resource: &str,
        body: &B,
    ) -> Result<T> {
        let body = serde_json::to_value(body)?;
        self.send_json(Method::POST, resource, &[], Some(&body)).await
    }

    pub async fn update<T: DeserializeOwned, B: Serialize>(
        &self,
        resource: &str,
        id: &str,
        body: &B,
    ) -> Result<T> {
        let body = serde_json::to_value(body)?;
        let path = format!("{}/{}", resource.trim_matches('/'), id);
        self.send_json(Method::PUT, &path, &[], Some(&body)).await
    }

    pub async fn delete(&self, resource: &str, id: &str) -> Result<()> {
        let url = self.url(&format!("{}/{}", resource.trim_matches('/'), id));
        self.send(Method::DELETE, &url, &[], None).await?;
        Ok(())
    }

    // ===== Transactions =====

    /// Submit a validated transaction draft
    pub async fn create_transaction(&self, request: &TransactionRequest) -> Result<Transaction> {
        self.create(TRANSACTIONS_PATH, request)
            .await
            .context("Failed to create transaction")
    }

    /// Confirm payment for a pending transaction
    pub async fn confirm_transaction(&self, request: &ConfirmRequest) -> Result<Transaction> {
        let body = serde_json::to_value(request)?;
        let path = format!("{}/{}/confirm", TRANSACTIONS_PATH, request.transaction_id);
        self.send_json(Method::PUT, &path, &[], Some(&body))
            .await
            .context("Failed to confirm transaction")
    }

    /// Move a transaction to another project
    pub async fn set_project_type(&self, request: &ProjectTypeRequest) -> Result<Transaction> {
        let body = serde_json::to_value(request)?;
        let path = format!("{}/{}/project-type", TRANSACTIONS_PATH, request.transaction_id);
        self.send_json(Method::PUT, &path, &[], Some(&body))
            .await
            .context("Failed to update transaction project")
    }
}

/// Query parameters for one page of a list endpoint.
fn page_query(page: u32, per_page: u32, filters: &ListFilters) -> Vec<(String, String)> {
    let mut query = vec![
        ("page".to_string(), page.max(1).to_string()),
        ("per_page".to_string(), per_page.max(1).to_string()),
    ];
    query.extend(filters.query_pairs());
    query
}

/// Decode hub records one at a time so a single bad record cannot sink the list.
fn decode_hubs(records: Vec<serde_json::Value>) -> Vec<RawHub> {
    records
        .into_iter()
        .enumerate()
        .filter_map(|(index, record)| match serde_json::from_value::<RawHub>(record) {
            Ok(hub) => Some(hub),
            Err(e) => {
                warn!(index, error = %e, "Skipping unparseable hub record");
                None
            }
        })
        .collect()
}

fn parse_envelope<T: DeserializeOwned>(text: &str) -> Result<T> {
    let envelope: Envelope<T> = serde_json::from_str(text)?;
    Ok(envelope.into_inner())
}
