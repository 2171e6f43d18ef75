//! Role scope resolution.
//!
//! A [`RoleScope`] is computed once per session from the injected [`Identity`]
//! and answers two questions for every location control: which values may the
//! user pick from, and which dimensions are pinned.

use thiserror::Error;
use tracing::debug;

use crate::directory::LocationDirectory;
use crate::models::{Candidate, Identity, Role};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScopeError {
    #[error("{role} profile has no assigned state")]
    MissingState { role: Role },

    #[error("Hub not assigned to profile")]
    MissingCommunity,

    #[error("Assigned community {0} is not an active hub")]
    UnknownCommunity(String),

    #[error("Assigned community {community} belongs to state {actual}, profile says {assigned}")]
    CommunityStateMismatch {
        community: String,
        assigned: String,
        actual: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleScope {
    role: Role,
    locked_state_id: Option<String>,
    locked_community_id: Option<String>,
}

impl RoleScope {
    /// Derive the scope for `identity`. Pure; performs no directory lookups.
    pub fn resolve(identity: &Identity) -> Self {
        let role = identity.role;
        let locked_state_id = if role.locks_state() {
            identity.state_id.clone()
        } else {
            None
        };
        let locked_community_id = if role.locks_community() {
            identity.community_id.clone()
        } else {
            None
        };
        Self {
            role,
            locked_state_id,
            locked_community_id,
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn locked_state_id(&self) -> Option<&str> {
        self.locked_state_id.as_deref()
    }

    pub fn locked_community_id(&self) -> Option<&str> {
        self.locked_community_id.as_deref()
    }

    /// Check the scope against the hub directory.
    ///
    /// A community lead with no assigned state inherits the state of its community
    /// hub. A mismatch between the two is an error, as is a locking role with
    /// nothing to lock to.
    pub fn reconcile(mut self, directory: &LocationDirectory) -> Result<Self, ScopeError> {
        if self.role.locks_community() {
            let community = self
                .locked_community_id
                .clone()
                .ok_or(ScopeError::MissingCommunity)?;
            let hub = directory
                .hub(&community)
                .ok_or_else(|| ScopeError::UnknownCommunity(community.clone()))?;

            match self.locked_state_id {
                Some(ref assigned) if *assigned != hub.state_id => {
                    return Err(ScopeError::CommunityStateMismatch {
                        community,
                        assigned: assigned.clone(),
                        actual: hub.state_id.clone(),
                    });
                }
                Some(_) => {}
                None => {
                    debug!(community = %community, state = %hub.state_id, "Locked state taken from community hub");
                    self.locked_state_id = Some(hub.state_id.clone());
                }
            }
        } else if self.role.locks_state() && self.locked_state_id.is_none() {
            return Err(ScopeError::MissingState { role: self.role });
        }
        Ok(self)
    }

    /// LGA pinned by the locked community's hub, if any.
    pub fn locked_lga_id(&self, directory: &LocationDirectory) -> Option<String> {
        self.locked_community_id
            .as_deref()
            .and_then(|c| directory.hub(c))
            .map(|h| h.lga_id.clone())
    }

    /// Whether `state_id` may be selected under this scope.
    pub fn permits_state(&self, state_id: &str) -> bool {
        match self.role {
            Role::StateCoordinator | Role::CommunityLead => {
                self.locked_state_id.as_deref() == Some(state_id)
            }
            _ => true,
        }
    }

    /// States the user may choose from. Locking roles see only their own state;
    /// a locking role with no assignment sees nothing.
    pub fn permitted_states(&self, directory: &LocationDirectory) -> Vec<Candidate> {
        directory
            .states()
            .iter()
            .filter(|s| self.permits_state(&s.id))
            .cloned()
            .collect()
    }

    /// LGAs of `state_id` the user may choose from.
    pub fn permitted_lgas(&self, directory: &LocationDirectory, state_id: &str) -> Vec<Candidate> {
        if !self.permits_state(state_id) {
            return Vec::new();
        }
        let lgas = directory.lgas_of(state_id);
        match self.locked_lga_id(directory) {
            Some(lga) => lgas.into_iter().filter(|c| c.id == lga).collect(),
            None if self.role.locks_community() => Vec::new(),
            None => lgas,
        }
    }
}
