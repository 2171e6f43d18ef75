//! Dependent location selection: state → LGA → sub-hub.
//!
//! Every change re-derives the candidate lists from the directory and clears
//! descendant selections, except where the role scope pins a level, in which
//! case the pinned value is put back. Inputs that a disabled or filtered control
//! could never produce (a locked level, an LGA outside the current state) are
//! ignored rather than reported.

use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use crate::directory::LocationDirectory;
use crate::models::{Candidate, Selection};
use crate::scope::RoleScope;
use crate::utils::normalize_id;

/// The three levels of the location hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    State,
    Lga,
    SubHub,
}

/// Result of a cascade operation: the selection after the change and the
/// recomputed candidates for the next level down.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CascadeStep {
    pub selection: Selection,
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Clone, Default)]
struct Locks {
    state: Option<String>,
    lga: Option<String>,
    sub_hub: Option<String>,
}

/// Cascade state for one screen context.
#[derive(Debug, Clone)]
pub struct Cascade {
    directory: Arc<LocationDirectory>,
    scope: RoleScope,
    locks: Locks,
    selection: Selection,
    states: Vec<Candidate>,
    lgas: Vec<Candidate>,
    sub_hubs: Vec<Candidate>,
}

impl Cascade {
    /// Create a cascade seeded from the scope's locks.
    pub fn new(directory: Arc<LocationDirectory>, scope: RoleScope) -> Self {
        let locks = Locks {
            state: scope.locked_state_id().map(str::to_string),
            lga: scope.locked_lga_id(&directory),
            sub_hub: scope.locked_community_id().map(str::to_string),
        };
        let states = scope.permitted_states(&directory);

        let mut cascade = Self {
            directory,
            scope,
            locks,
            selection: Selection::default(),
            states,
            lgas: Vec::new(),
            sub_hubs: Vec::new(),
        };
        cascade.reassert_locks();
        cascade.recompute_lgas();
        cascade.recompute_sub_hubs();
        cascade
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn state_candidates(&self) -> &[Candidate] {
        &self.states
    }

    pub fn lga_candidates(&self) -> &[Candidate] {
        &self.lgas
    }

    pub fn sub_hub_candidates(&self) -> &[Candidate] {
        &self.sub_hubs
    }

    /// Whether the control for `level` must be rendered disabled.
    pub fn is_locked(&self, level: Level) -> bool {
        match level {
            Level::State => self.locks.state.is_some(),
            Level::Lga => self.locks.lga.is_some(),
            Level::SubHub => self.locks.sub_hub.is_some(),
        }
    }

    pub fn on_state_change(&mut self, state_id: Option<&str>) -> CascadeStep {
        let state_id = normalize_id(state_id);

        if self.is_locked(Level::State) {
            debug!(requested = ?state_id, "Ignoring change to locked state");
            return self.step(Level::Lga);
        }
        if let Some(ref id) = state_id {
            if !self.states.iter().any(|c| c.id == *id) {
                debug!(state = %id, "Ignoring state outside permitted scope");
                return self.step(Level::Lga);
            }
        }
        if state_id == self.selection.state_id {
            return self.step(Level::Lga);
        }

        self.selection.state_id = state_id;
        self.selection.lga_id = None;
        self.selection.sub_hub_id = None;
        self.reassert_locks();
        self.recompute_lgas();
        self.recompute_sub_hubs();
        self.step(Level::Lga)
    }

    pub fn on_lga_change(&mut self, lga_id: Option<&str>) -> CascadeStep {
        let lga_id = normalize_id(lga_id);

        if self.is_locked(Level::Lga) {
            debug!(requested = ?lga_id, "Ignoring change to locked LGA");
            return self.step(Level::SubHub);
        }
        if let Some(ref id) = lga_id {
            // Candidates are always derived from the current state, so this also
            // rejects LGAs of another state
            if !self.lgas.iter().any(|c| c.id == *id) {
                debug!(lga = %id, state = ?self.selection.state_id, "Ignoring LGA outside current state");
                return self.step(Level::SubHub);
            }
        }
        if lga_id == self.selection.lga_id {
            return self.step(Level::SubHub);
        }

        self.selection.lga_id = lga_id;
        self.selection.sub_hub_id = None;
        self.reassert_locks();
        self.recompute_sub_hubs();
        self.step(Level::SubHub)
    }

    pub fn on_sub_hub_change(&mut self, sub_hub_id: Option<&str>) -> Selection {
        let sub_hub_id = normalize_id(sub_hub_id);

        if self.is_locked(Level::SubHub) {
            debug!(requested = ?sub_hub_id, "Ignoring change to locked sub-hub");
        } else if let Some(ref id) = sub_hub_id {
            if self.sub_hubs.iter().any(|c| c.id == *id) {
                self.selection.sub_hub_id = sub_hub_id;
            } else {
                debug!(sub_hub = %id, "Ignoring sub-hub outside current LGA");
            }
        } else {
            self.selection.sub_hub_id = None;
        }
        self.selection.clone()
    }

    /// Clear every unlocked level, as a filter bar "reset" does.
    pub fn reset(&mut self) -> CascadeStep {
        self.selection = Selection::default();
        self.reassert_locks();
        self.recompute_lgas();
        self.recompute_sub_hubs();
        self.step(Level::Lga)
    }

    fn reassert_locks(&mut self) {
        if let Some(ref state) = self.locks.state {
            self.selection.state_id = Some(state.clone());
        }
        if let Some(ref lga) = self.locks.lga {
            self.selection.lga_id = Some(lga.clone());
        }
        if let Some(ref sub_hub) = self.locks.sub_hub {
            self.selection.sub_hub_id = Some(sub_hub.clone());
        }
    }

    fn recompute_lgas(&mut self) {
        self.lgas = match self.selection.state_id {
            Some(ref state) => self.scope.permitted_lgas(&self.directory, state),
            None => Vec::new(),
        };
        if self.selection.state_id.is_none() {
            self.clear_unlocked(Level::Lga);
            self.clear_unlocked(Level::SubHub);
        }
    }

    fn recompute_sub_hubs(&mut self) {
        self.sub_hubs = match (&self.selection.state_id, &self.selection.lga_id) {
            (Some(_), Some(lga)) => self.directory.sub_hubs_of(lga),
            _ => Vec::new(),
        };
    }

    fn clear_unlocked(&mut self, level: Level) {
        if self.is_locked(level) {
            return;
        }
        match level {
            Level::State => self.selection.state_id = None,
            Level::Lga => self.selection.lga_id = None,
            Level::SubHub => self.selection.sub_hub_id = None,
        }
    }

    fn step(&self, next: Level) -> CascadeStep {
        let candidates = match next {
            Level::State => self.states.clone(),
            Level::Lga => self.lgas.clone(),
            Level::SubHub => self.sub_hubs.clone(),
        };
        CascadeStep {
            selection: self.selection.clone(),
            candidates,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::fixtures::sample_hubs;
    use crate::models::{Identity, Role};

    fn directory() -> Arc<LocationDirectory> {
        Arc::new(LocationDirectory::load(sample_hubs()))
    }

    fn cascade_for(identity: Identity) -> Cascade {
        Cascade::new(directory(), RoleScope::resolve(&identity))
    }

    fn ids(candidates: &[Candidate]) -> Vec<&str> {
        candidates.iter().map(|c| c.id.as_str()).collect()
    }

    // -------------------------------------------------------------------------
    // Unrestricted cascades
    // -------------------------------------------------------------------------

    #[test]
    fn test_admin_selects_lagos() {
        let mut cascade = cascade_for(Identity::new(Role::UnrestrictedAdmin));
        assert!(cascade.lga_candidates().is_empty());

        let step = cascade.on_state_change(Some("LA"));
        assert_eq!(step.selection.state_id.as_deref(), Some("LA"));
        let names: Vec<&str> = step.candidates.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Ikeja", "Epe"]);
    }

    #[test]
    fn test_state_change_clears_descendants_and_candidates() {
        let mut cascade = cascade_for(Identity::new(Role::NationalCoordinator));
        cascade.on_state_change(Some("LA"));
        cascade.on_lga_change(Some("IKJ"));
        cascade.on_sub_hub_change(Some("H4"));
        assert_eq!(cascade.selection().sub_hub_id.as_deref(), Some("H4"));

        let step = cascade.on_state_change(Some("OY"));
        assert_eq!(step.selection.lga_id, None);
        assert_eq!(step.selection.sub_hub_id, None);
        assert_eq!(ids(&step.candidates), vec!["IBD"]);
        assert!(cascade.sub_hub_candidates().is_empty());
    }

    #[test]
    fn test_reselecting_same_state_keeps_lga() {
        let mut cascade = cascade_for(Identity::new(Role::UnrestrictedAdmin));
        cascade.on_state_change(Some("LA"));
        cascade.on_lga_change(Some("EPE"));
        let step = cascade.on_state_change(Some("LA"));
        assert_eq!(step.selection.lga_id.as_deref(), Some("EPE"));
    }

    #[test]
    fn test_lga_outside_state_is_ignored() {
        let mut cascade = cascade_for(Identity::new(Role::UnrestrictedAdmin));
        cascade.on_state_change(Some("LA"));
        cascade.on_lga_change(Some("IKJ"));

        let step = cascade.on_lga_change(Some("IBD"));
        assert_eq!(step.selection.lga_id.as_deref(), Some("IKJ"));
        assert_eq!(ids(&step.candidates), vec!["H1", "H4"]);
    }

    #[test]
    fn test_clearing_state_empties_everything() {
        let mut cascade = cascade_for(Identity::new(Role::UnrestrictedAdmin));
        cascade.on_state_change(Some("LA"));
        cascade.on_lga_change(Some("IKJ"));

        let step = cascade.on_state_change(Some(""));
        assert!(step.selection.is_empty());
        assert!(step.candidates.is_empty());
        assert!(cascade.sub_hub_candidates().is_empty());

        // With no state, LGA input has nothing to match
        let step = cascade.on_lga_change(Some("IKJ"));
        assert_eq!(step.selection.lga_id, None);
    }

    #[test]
    fn test_sub_hub_must_belong_to_lga() {
        let mut cascade = cascade_for(Identity::new(Role::UnrestrictedAdmin));
        cascade.on_state_change(Some("LA"));
        cascade.on_lga_change(Some("EPE"));
        assert_eq!(cascade.on_sub_hub_change(Some("H1")).sub_hub_id, None);
        assert_eq!(
            cascade.on_sub_hub_change(Some("H2")).sub_hub_id.as_deref(),
            Some("H2")
        );
        assert_eq!(cascade.on_sub_hub_change(None).sub_hub_id, None);
    }

    #[test]
    fn test_cascade_consistency_across_all_states() {
        let dir = directory();
        let mut cascade = Cascade::new(
            Arc::clone(&dir),
            RoleScope::resolve(&Identity::new(Role::UnrestrictedAdmin)),
        );
        for state in dir.states().to_vec() {
            cascade.on_lga_change(Some("IKJ"));
            let step = cascade.on_state_change(Some(&state.id));
            assert!(step
                .candidates
                .iter()
                .all(|lga| dir.lga_in_state(&lga.id, &state.id)));
            if let Some(ref lga) = step.selection.lga_id {
                assert!(step.candidates.iter().any(|c| c.id == *lga));
            }
        }
    }

    // -------------------------------------------------------------------------
    // Locked cascades
    // -------------------------------------------------------------------------

    #[test]
    fn test_state_coordinator_is_pinned() {
        let mut cascade = cascade_for(Identity::new(Role::StateCoordinator).with_state("LA"));
        assert!(cascade.is_locked(Level::State));
        assert!(!cascade.is_locked(Level::Lga));
        assert_eq!(cascade.selection().state_id.as_deref(), Some("LA"));
        assert_eq!(ids(cascade.state_candidates()), vec!["LA"]);
        assert_eq!(ids(cascade.lga_candidates()), vec!["IKJ", "EPE"]);

        let step = cascade.on_state_change(Some("OY"));
        assert_eq!(step.selection.state_id.as_deref(), Some("LA"));

        cascade.on_lga_change(Some("EPE"));
        let step = cascade.reset();
        assert_eq!(step.selection.state_id.as_deref(), Some("LA"));
        assert_eq!(step.selection.lga_id, None);
    }

    #[test]
    fn test_community_lead_lock_never_changes() {
        let mut cascade = cascade_for(
            Identity::new(Role::CommunityLead)
                .with_state("LA")
                .with_community("H4"),
        );
        let expected = Some("H4".to_string());
        assert_eq!(cascade.selection().sub_hub_id, expected);
        assert_eq!(cascade.selection().lga_id.as_deref(), Some("IKJ"));

        let states = [Some("OY"), None, Some("LA"), Some("")];
        let lgas = [Some("EPE"), None, Some("IBD"), Some("IKJ")];
        let subs = [Some("H1"), None, Some("H2")];
        for state in states {
            assert_eq!(cascade.on_state_change(state).selection.sub_hub_id, expected);
            for lga in lgas {
                assert_eq!(cascade.on_lga_change(lga).selection.sub_hub_id, expected);
                for sub in subs {
                    assert_eq!(cascade.on_sub_hub_change(sub).sub_hub_id, expected);
                }
            }
        }
        assert_eq!(cascade.reset().selection.sub_hub_id, expected);
    }
}
