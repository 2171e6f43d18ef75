//! User roles and the authenticated identity supplied by the auth collaborator.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::wire::de_opt_id;
use crate::utils::normalize_id;

/// Closed set of console roles.
///
/// The backend reports roles either as display names (`"ADMIN"`,
/// `"State Coordinator"`) or as numeric codes, depending on the endpoint.
/// Both decode to this enum; it always encodes as the canonical name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    UnrestrictedAdmin,
    NationalCoordinator,
    StateCoordinator,
    CommunityLead,
    Other,
}

impl Role {
    /// Map a numeric role code.
    pub fn from_code(code: i64) -> Self {
        match code {
            1 => Role::UnrestrictedAdmin,
            2 => Role::NationalCoordinator,
            3 => Role::StateCoordinator,
            4 => Role::CommunityLead,
            _ => Role::Other,
        }
    }

    /// Map a role name. Case, surrounding whitespace and `_`/`-` separators are ignored.
    /// Numeric strings are treated as codes.
    pub fn from_name(name: &str) -> Self {
        let trimmed = name.trim();
        if let Ok(code) = trimmed.parse::<i64>() {
            return Self::from_code(code);
        }

        let normalized: String = trimmed
            .to_lowercase()
            .replace(['_', '-'], " ")
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");

        match normalized.as_str() {
            "admin" | "super admin" | "superadmin" | "unrestricted admin" => {
                Role::UnrestrictedAdmin
            }
            "national coordinator" => Role::NationalCoordinator,
            "state coordinator" => Role::StateCoordinator,
            "community lead" | "community leader" => Role::CommunityLead,
            _ => Role::Other,
        }
    }

    pub fn code(&self) -> Option<i64> {
        match self {
            Role::UnrestrictedAdmin => Some(1),
            Role::NationalCoordinator => Some(2),
            Role::StateCoordinator => Some(3),
            Role::CommunityLead => Some(4),
            Role::Other => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::UnrestrictedAdmin => "ADMIN",
            Role::NationalCoordinator => "National Coordinator",
            Role::StateCoordinator => "State Coordinator",
            Role::CommunityLead => "Community Lead",
            Role::Other => "Other",
        }
    }

    /// Whether this role is pinned to its assigned state.
    pub fn locks_state(&self) -> bool {
        matches!(self, Role::StateCoordinator | Role::CommunityLead)
    }

    /// Whether this role is pinned to its assigned community.
    pub fn locks_community(&self) -> bool {
        matches!(self, Role::CommunityLead)
    }

    /// Roles that pick a hub explicitly when building a transaction.
    pub fn chooses_hub(&self) -> bool {
        matches!(
            self,
            Role::UnrestrictedAdmin | Role::NationalCoordinator | Role::StateCoordinator
        )
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Role {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Role {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Code(i64),
            Name(String),
        }

        Ok(match Repr::deserialize(d)? {
            Repr::Code(code) => Role::from_code(code),
            Repr::Name(name) => Role::from_name(&name),
        })
    }
}

/// The authenticated user, injected once per session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    #[serde(default, alias = "id", deserialize_with = "de_opt_id")]
    pub user_id: Option<String>,
    pub role: Role,
    #[serde(default, alias = "state", deserialize_with = "de_opt_id")]
    pub state_id: Option<String>,
    #[serde(default, alias = "hubId", alias = "community", deserialize_with = "de_opt_id")]
    pub community_id: Option<String>,
}

impl Identity {
    pub fn new(role: Role) -> Self {
        Self {
            user_id: None,
            role,
            state_id: None,
            community_id: None,
        }
    }

    pub fn with_state(mut self, state_id: &str) -> Self {
        self.state_id = normalize_id(Some(state_id));
        self
    }

    pub fn with_community(mut self, community_id: &str) -> Self {
        self.community_id = normalize_id(Some(community_id));
        self
    }
}
