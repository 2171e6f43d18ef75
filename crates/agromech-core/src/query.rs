//! Hybrid list query executor.
//!
//! A list view is either **unfiltered**, in which case the full list is fetched
//! once, cached and paged locally, or **filtered**, in which case the server is
//! authoritative for both the rows and the counts of every page. The mode is a
//! single flag derived from the effective filters and consulted before any work
//! is done, so a response is never filtered twice.
//!
//! The executor is sans-IO. Each input change either resolves locally (re-slicing
//! the cache) or yields a [`ListRequest`] for the caller to execute, whose result
//! is handed back through [`QueryExecutor::apply`]. Every request carries a
//! sequence number and only the latest one may update the view.

use anyhow::Result;
use serde::de::DeserializeOwned;
use tracing::{debug, error};

use crate::api::{display_message, ApiClient};
use crate::models::{ListFilters, ListResponse, PageResult, DEFAULT_PER_PAGE, HUB_FILTER_KEY};
use crate::scope::RoleScope;
use crate::utils::normalize_id;

/// Who is authoritative for the displayed page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryMode {
    /// Filters active: the server filters and paginates.
    ServerAuthoritative,
    /// No filters: a cached full list is paginated locally.
    ClientCached,
}

/// A remote fetch the caller must perform on behalf of the executor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListRequest {
    pub seq: u64,
    pub resource: String,
    pub mode: QueryMode,
    pub page: u32,
    pub per_page: u32,
    /// Always empty in `ClientCached` mode.
    pub filters: ListFilters,
}

/// What [`QueryExecutor::apply`] did with a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Updated,
    /// A newer request or input change superseded this response; it was dropped.
    Stale,
    Failed,
}

#[derive(Debug, Clone)]
pub struct QueryExecutor<T> {
    resource: String,
    page: u32,
    per_page: u32,
    filters: ListFilters,
    locked: ListFilters,
    server_only: bool,
    cache: Option<Vec<T>>,
    view: PageResult<T>,
    error: Option<String>,
    seq: u64,
    in_flight: Option<(u64, QueryMode)>,
}

impl<T: Clone> QueryExecutor<T> {
    pub fn new(resource: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            page: 1,
            per_page: DEFAULT_PER_PAGE,
            filters: ListFilters::default(),
            locked: ListFilters::default(),
            server_only: false,
            cache: None,
            view: PageResult::empty(1, DEFAULT_PER_PAGE),
            error: None,
            seq: 0,
            in_flight: None,
        }
    }

    pub fn with_per_page(mut self, per_page: u32) -> Self {
        self.per_page = per_page.max(1);
        self.view.per_page = self.per_page;
        self
    }

    /// Pin the filters a role scope locks.
    ///
    /// Locked values are sent with every request and cannot be cleared. Roles
    /// that lock a state are always served by the server, even if their
    /// assignment is missing, so they never cache an unscoped list.
    pub fn scoped(mut self, scope: &RoleScope) -> Self {
        self.locked.state = scope.locked_state_id().map(str::to_string);
        if let Some(community) = scope.locked_community_id() {
            self.locked
                .extra
                .insert(HUB_FILTER_KEY.to_string(), community.to_string());
        }
        if scope.role().locks_state() {
            self.server_only = true;
        }
        self
    }

    /// Always delegate to the server, even with no filters.
    pub fn server_only(mut self) -> Self {
        self.server_only = true;
        self
    }

    // =========================================================================
    // State
    // =========================================================================

    /// Filters that will be sent: user filters with locked values on top.
    pub fn effective_filters(&self) -> ListFilters {
        self.filters.overlaid_with(&self.locked)
    }

    pub fn mode(&self) -> QueryMode {
        if self.server_only || !self.effective_filters().is_empty() {
            QueryMode::ServerAuthoritative
        } else {
            QueryMode::ClientCached
        }
    }

    pub fn is_filtered(&self) -> bool {
        self.mode() == QueryMode::ServerAuthoritative
    }

    pub fn view(&self) -> &PageResult<T> {
        &self.view
    }

    pub fn items(&self) -> &[T] {
        &self.view.items
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn per_page(&self) -> u32 {
        self.per_page
    }

    /// Last failure, if the most recent fetch failed.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// True while a request is outstanding; filter and submit controls should be disabled.
    pub fn is_loading(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn cached_len(&self) -> Option<usize> {
        self.cache.as_ref().map(Vec::len)
    }

    // =========================================================================
    // Inputs
    // =========================================================================

    /// Initial load, or a retry after a failure.
    pub fn start(&mut self) -> Option<ListRequest> {
        self.dispatch()
    }

    /// Replace the user filters. Page resets to 1. No-op if nothing changed.
    pub fn set_filters(&mut self, filters: ListFilters) -> Option<ListRequest> {
        let filters = filters.normalized();
        if filters == self.filters {
            return None;
        }
        self.filters = filters;
        self.page = 1;
        self.dispatch()
    }

    pub fn set_search(&mut self, search: &str) -> Option<ListRequest> {
        let mut filters = self.filters.clone();
        filters.search = normalize_id(Some(search));
        self.set_filters(filters)
    }

    pub fn set_state_filter(&mut self, state: Option<&str>) -> Option<ListRequest> {
        let mut filters = self.filters.clone();
        filters.state = normalize_id(state);
        self.set_filters(filters)
    }

    pub fn set_lga_filter(&mut self, lga: Option<&str>) -> Option<ListRequest> {
        let mut filters = self.filters.clone();
        filters.lga = normalize_id(lga);
        self.set_filters(filters)
    }

    pub fn set_filter(&mut self, key: &str, value: Option<&str>) -> Option<ListRequest> {
        let mut filters = self.filters.clone();
        match normalize_id(value) {
            Some(v) => filters.extra.insert(key.to_string(), v),
            None => filters.extra.remove(key),
        };
        self.set_filters(filters)
    }

    pub fn clear_filters(&mut self) -> Option<ListRequest> {
        self.set_filters(ListFilters::default())
    }

    /// Move to `page`. The page is kept as requested; filters are untouched.
    pub fn set_page(&mut self, page: u32) -> Option<ListRequest> {
        let page = page.max(1);
        if page == self.page {
            return None;
        }
        self.page = page;
        self.dispatch()
    }

    /// Change the page size. The current page is preserved.
    pub fn set_per_page(&mut self, per_page: u32) -> Option<ListRequest> {
        let per_page = per_page.max(1);
        if per_page == self.per_page {
            return None;
        }
        self.per_page = per_page;
        self.dispatch()
    }

    /// Drop the cached list (after a create/update/delete) and reload.
    pub fn invalidate(&mut self) -> Option<ListRequest> {
        self.cache = None;
        self.dispatch()
    }

    fn dispatch(&mut self) -> Option<ListRequest> {
        // Any input change supersedes whatever is in flight
        self.seq += 1;
        self.in_flight = None;

        let mode = self.mode();
        if mode == QueryMode::ClientCached {
            if let Some(ref cache) = self.cache {
                debug!(resource = %self.resource, page = self.page, "Paging cached list");
                self.view = PageResult::slice(cache, self.page, self.per_page);
                self.error = None;
                return None;
            }
        }

        let filters = match mode {
            QueryMode::ServerAuthoritative => self.effective_filters(),
            QueryMode::ClientCached => ListFilters::default(),
        };
        self.in_flight = Some((self.seq, mode));
        debug!(resource = %self.resource, seq = self.seq, ?mode, page = self.page, "Issuing list request");

        Some(ListRequest {
            seq: self.seq,
            resource: self.resource.clone(),
            mode,
            page: self.page,
            per_page: self.per_page,
            filters,
        })
    }

    // =========================================================================
    // Responses
    // =========================================================================

    /// Apply the outcome of request `seq`.
    pub fn apply(&mut self, seq: u64, result: Result<ListResponse<T>>) -> Applied {
        let mode = match self.in_flight {
            Some((pending, mode)) if pending == seq => mode,
            _ => {
                debug!(resource = %self.resource, seq, latest = self.seq, "Discarding stale list response");
                return Applied::Stale;
            }
        };
        self.in_flight = None;

        match result {
            Ok(response) => {
                match mode {
                    QueryMode::ServerAuthoritative => {
                        self.view = PageResult::from_response(response, self.page, self.per_page);
                    }
                    QueryMode::ClientCached => {
                        let all = response.data;
                        self.view = PageResult::slice(&all, self.page, self.per_page);
                        self.cache = Some(all);
                    }
                }
                self.error = None;
                Applied::Updated
            }
            Err(e) => {
                error!(resource = %self.resource, error = %e, "List fetch failed");
                self.cache = None;
                self.view = PageResult::empty(self.page, self.per_page);
                self.error = Some(display_message(&e));
                Applied::Failed
            }
        }
    }

    /// Execute `request` against `api` and apply the result.
    pub async fn run(&mut self, api: &ApiClient, request: Option<ListRequest>) -> Applied
    where
        T: DeserializeOwned,
    {
        match request {
            Some(request) => {
                let result = api.fetch_list(&request).await;
                self.apply(request.seq, result)
            }
            None => Applied::Updated,
        }
    }
}
