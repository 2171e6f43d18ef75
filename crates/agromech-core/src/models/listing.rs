//! Paginated list types shared by every resource screen.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::location::Selection;
use super::wire::{de_count, de_opt_count};
use crate::utils::normalize_id;

/// Page size used when a screen does not choose one.
pub const DEFAULT_PER_PAGE: u32 = 10;

/// Query key under which a selected sub-hub is sent to list endpoints.
pub const HUB_FILTER_KEY: &str = "hub";

/// Filter parameters for a list view. An absent or blank value means "not filtering".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListFilters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lga: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(default, flatten)]
    pub extra: BTreeMap<String, String>,
}

impl ListFilters {
    /// Filters for the location currently chosen in a cascade.
    pub fn from_selection(selection: &Selection) -> Self {
        let mut filters = ListFilters {
            state: selection.state_id.clone(),
            lga: selection.lga_id.clone(),
            ..Default::default()
        };
        if let Some(ref hub) = selection.sub_hub_id {
            filters.extra.insert(HUB_FILTER_KEY.to_string(), hub.clone());
        }
        filters
    }

    /// Drop blank values so emptiness checks and equality are meaningful.
    pub fn normalized(self) -> Self {
        ListFilters {
            state: normalize_id(self.state.as_deref()),
            lga: normalize_id(self.lga.as_deref()),
            search: normalize_id(self.search.as_deref()),
            extra: self
                .extra
                .into_iter()
                .filter_map(|(k, v)| normalize_id(Some(&v)).map(|v| (k, v)))
                .collect(),
        }
    }

    /// True when no filter parameter carries a value.
    pub fn is_empty(&self) -> bool {
        let blank = |v: &Option<String>| v.as_deref().map_or(true, |s| s.trim().is_empty());
        blank(&self.state)
            && blank(&self.lga)
            && blank(&self.search)
            && self.extra.values().all(|v| v.trim().is_empty())
    }

    /// Overlay `locked` on top of these filters; locked values always win.
    pub fn overlaid_with(&self, locked: &ListFilters) -> ListFilters {
        let mut merged = self.clone();
        if locked.state.is_some() {
            merged.state = locked.state.clone();
        }
        if locked.lga.is_some() {
            merged.lga = locked.lga.clone();
        }
        if locked.search.is_some() {
            merged.search = locked.search.clone();
        }
        for (k, v) in &locked.extra {
            merged.extra.insert(k.clone(), v.clone());
        }
        merged
    }

    /// Query string pairs for the non-empty filters.
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        if let Some(ref state) = self.state {
            pairs.push(("state".to_string(), state.clone()));
        }
        if let Some(ref lga) = self.lga {
            pairs.push(("lga".to_string(), lga.clone()));
        }
        if let Some(ref search) = self.search {
            pairs.push(("search".to_string(), search.clone()));
        }
        for (k, v) in &self.extra {
            pairs.push((k.clone(), v.clone()));
        }
        pairs
    }
}

/// Body of `GET /{resource}`: `{data, last_page, total}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
    #[serde(default, deserialize_with = "de_opt_count")]
    pub current_page: Option<u32>,
    #[serde(default, deserialize_with = "de_count")]
    pub last_page: u64,
    #[serde(default, deserialize_with = "de_count")]
    pub total: u64,
    #[serde(default, deserialize_with = "de_opt_count")]
    pub per_page: Option<u32>,
}

impl<T> ListResponse<T> {
    /// A single-page response holding a complete list.
    pub fn complete(data: Vec<T>) -> Self {
        let total = data.len() as u64;
        Self {
            data,
            current_page: Some(1),
            last_page: 1,
            total,
            per_page: None,
        }
    }
}

/// What a list view displays: one page plus the metadata to page through the rest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageResult<T> {
    pub items: Vec<T>,
    pub current_page: u32,
    pub total_pages: u64,
    pub per_page: u32,
    pub total: u64,
}

impl<T> PageResult<T> {
    pub fn empty(current_page: u32, per_page: u32) -> Self {
        Self {
            items: Vec::new(),
            current_page,
            total_pages: 0,
            per_page,
            total: 0,
        }
    }

    /// Take a server response as-is. Items and counts are never recomputed.
    pub fn from_response(response: ListResponse<T>, page: u32, per_page: u32) -> Self {
        Self {
            items: response.data,
            current_page: response.current_page.unwrap_or(page),
            total_pages: response.last_page,
            per_page: response.per_page.unwrap_or(per_page),
            total: response.total,
        }
    }

    pub fn has_next(&self) -> bool {
        u64::from(self.current_page) < self.total_pages
    }

    pub fn has_prev(&self) -> bool {
        self.current_page > 1
    }
}

impl<T: Clone> PageResult<T> {
    /// Compute page `page` (1-based) of `all` locally.
    ///
    /// `total_pages == ceil(len / per_page)`; the slice is
    /// `[(page-1)*per_page, page*per_page)` clamped to the list length.
    pub fn slice(all: &[T], page: u32, per_page: u32) -> Self {
        let per_page = per_page.max(1);
        let page = page.max(1);
        let total = all.len() as u64;
        let total_pages = total.div_ceil(u64::from(per_page));

        let start = (page as usize - 1).saturating_mul(per_page as usize).min(all.len());
        let end = start.saturating_add(per_page as usize).min(all.len());

        Self {
            items: all[start..end].to_vec(),
            current_page: page,
            total_pages,
            per_page,
            total,
        }
    }
}
