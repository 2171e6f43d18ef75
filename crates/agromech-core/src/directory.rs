//! In-memory index over the active hub list.
//!
//! The directory is built once per session and is read-only afterwards; share it
//! behind an `Arc` between every cascade on screen.

use std::collections::HashSet;

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::api::display_message;
use crate::models::{Candidate, Hub, RawHub};

/// Banner shown when the hub list could not be fetched.
const DIRECTORY_UNAVAILABLE: &str = "Locations could not be loaded. Location filters are unavailable until you retry.";

#[derive(Debug, Clone, Default)]
pub struct LocationDirectory {
    hubs: Vec<Hub>,
    states: Vec<Candidate>,
}

/// Outcome of building a directory from a remote fetch.
#[derive(Debug, Clone, Default)]
pub struct DirectoryLoad {
    pub directory: LocationDirectory,
    /// Recoverable, user-visible message when the fetch failed.
    pub banner: Option<String>,
}

impl LocationDirectory {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Index `raw` hub records. Malformed and inactive records are skipped.
    pub fn load(raw: Vec<RawHub>) -> Self {
        let received = raw.len();
        let mut hubs = Vec::with_capacity(received);

        for record in raw {
            if !record.is_active() {
                debug!(hub = ?record.id, status = ?record.status, "Skipping inactive hub");
                continue;
            }
            let id = record.id.clone();
            match Hub::try_from(record) {
                Ok(hub) => hubs.push(hub),
                Err(reason) => warn!(hub = ?id, %reason, "Skipping malformed hub record"),
            }
        }

        // First occurrence wins, in source order
        let mut seen = HashSet::new();
        let states = hubs
            .iter()
            .filter(|h| seen.insert(h.state_id.clone()))
            .map(|h| Candidate::new(h.state_id.clone(), h.state_name.clone()))
            .collect();

        info!(received, indexed = hubs.len(), "Location directory loaded");
        Self { hubs, states }
    }

    /// Build from a fetch result; a failed fetch yields an empty directory and a banner.
    pub fn from_fetch(result: Result<Vec<RawHub>>) -> DirectoryLoad {
        match result {
            Ok(raw) => DirectoryLoad {
                directory: Self::load(raw),
                banner: None,
            },
            Err(e) => {
                warn!(error = %e, "Failed to fetch active hubs");
                let detail = display_message(&e);
                DirectoryLoad {
                    directory: Self::empty(),
                    banner: Some(format!("{} ({})", DIRECTORY_UNAVAILABLE, detail)),
                }
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.hubs.is_empty()
    }

    pub fn hubs(&self) -> &[Hub] {
        &self.hubs
    }

    pub fn hub(&self, hub_id: &str) -> Option<&Hub> {
        self.hubs.iter().find(|h| h.id == hub_id)
    }

    /// Unique states in order of first appearance. Not sorted.
    pub fn states(&self) -> &[Candidate] {
        &self.states
    }

    pub fn state_name(&self, state_id: &str) -> Option<&str> {
        self.states
            .iter()
            .find(|s| s.id == state_id)
            .map(|s| s.name.as_str())
    }

    /// Unique LGAs of `state_id`, first-seen order. Empty for a blank or unknown state.
    pub fn lgas_of(&self, state_id: &str) -> Vec<Candidate> {
        if state_id.is_empty() {
            return Vec::new();
        }
        let mut seen = HashSet::new();
        self.hubs
            .iter()
            .filter(|h| h.state_id == state_id)
            .filter(|h| seen.insert(h.lga_id.as_str()))
            .map(|h| Candidate::new(h.lga_id.clone(), h.lga_name.clone()))
            .collect()
    }

    /// Hub records within `lga_id`, as sub-hub candidates keyed by hub id.
    pub fn sub_hubs_of(&self, lga_id: &str) -> Vec<Candidate> {
        if lga_id.is_empty() {
            return Vec::new();
        }
        self.hubs
            .iter()
            .filter(|h| h.lga_id == lga_id)
            .map(|h| Candidate::new(h.id.clone(), h.display_name()))
            .collect()
    }

    pub fn lga_in_state(&self, lga_id: &str, state_id: &str) -> bool {
        self.hubs
            .iter()
            .any(|h| h.lga_id == lga_id && h.state_id == state_id)
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use crate::models::{NamedRef, RawHub};

    pub fn raw_hub(id: &str, state: (&str, &str), lga: (&str, &str)) -> RawHub {
        RawHub {
            id: Some(id.to_string()),
            name: Some(format!("{} Hub", lga.1)),
            status: Some("active".to_string()),
            state: Some(NamedRef {
                id: state.0.to_string(),
                name: state.1.to_string(),
            }),
            lga: Some(NamedRef {
                id: lga.0.to_string(),
                name: lga.1.to_string(),
            }),
            sub_hub: None,
        }
    }

    /// Hubs `{(Lagos,Ikeja),(Lagos,Epe),(Oyo,Ibadan)}` with a second Ikeja hub.
    pub fn sample_hubs() -> Vec<RawHub> {
        vec![
            raw_hub("H1", ("LA", "Lagos"), ("IKJ", "Ikeja")),
            raw_hub("H2", ("LA", "Lagos"), ("EPE", "Epe")),
            raw_hub("H3", ("OY", "Oyo"), ("IBD", "Ibadan")),
            raw_hub("H4", ("LA", "Lagos"), ("IKJ", "Ikeja")),
        ]
    }
}
