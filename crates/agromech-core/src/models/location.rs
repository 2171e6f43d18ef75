//! Location models: hub records, selectable candidates and selection state.

use serde::{Deserialize, Serialize};

use super::wire::{de_id, de_opt_id};

/// A nested `{id, name}` reference as embedded in hub records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct NamedRef {
    #[serde(deserialize_with = "de_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// Hub record as returned by `GET /hubs/all-active-hubs`.
///
/// Nested state and LGA info is optional on the wire; records missing either
/// are skipped when the directory is built.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawHub {
    #[serde(default, deserialize_with = "de_opt_id")]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub state: Option<NamedRef>,
    #[serde(default, alias = "LGA", alias = "localGovernment")]
    pub lga: Option<NamedRef>,
    #[serde(default, rename = "subHub", alias = "sub_hub", alias = "community")]
    pub sub_hub: Option<NamedRef>,
}

impl RawHub {
    /// Records without a status are treated as active since they come from the
    /// active-hubs endpoint.
    pub fn is_active(&self) -> bool {
        self.status
            .as_deref()
            .map(|s| s.trim().eq_ignore_ascii_case("active"))
            .unwrap_or(true)
    }
}

/// Why a raw hub record could not be indexed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MalformedHub {
    MissingId,
    MissingState,
    MissingLga,
}

impl std::fmt::Display for MalformedHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MalformedHub::MissingId => write!(f, "missing hub id"),
            MalformedHub::MissingState => write!(f, "missing nested state info"),
            MalformedHub::MissingLga => write!(f, "missing nested LGA info"),
        }
    }
}

/// A validated hub record identifying a (state, LGA, sub-hub) triple.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Hub {
    pub id: String,
    pub name: Option<String>,
    pub state_id: String,
    pub state_name: String,
    pub lga_id: String,
    pub lga_name: String,
    pub sub_hub_id: Option<String>,
    pub sub_hub_name: Option<String>,
}

impl Hub {
    /// Label shown in sub-hub pickers: the community name, else the hub name,
    /// else the LGA it sits in.
    pub fn display_name(&self) -> &str {
        self.sub_hub_name
            .as_deref()
            .filter(|s| !s.is_empty())
            .or_else(|| self.name.as_deref().filter(|s| !s.is_empty()))
            .unwrap_or(&self.lga_name)
    }
}

impl TryFrom<RawHub> for Hub {
    type Error = MalformedHub;

    fn try_from(raw: RawHub) -> Result<Self, Self::Error> {
        let id = raw.id.ok_or(MalformedHub::MissingId)?;
        let state = raw
            .state
            .filter(|s| !s.id.is_empty())
            .ok_or(MalformedHub::MissingState)?;
        let lga = raw
            .lga
            .filter(|l| !l.id.is_empty())
            .ok_or(MalformedHub::MissingLga)?;
        let (sub_hub_id, sub_hub_name) = match raw.sub_hub {
            Some(sub) if !sub.id.is_empty() => (Some(sub.id), Some(sub.name)),
            _ => (None, None),
        };

        Ok(Hub {
            id,
            name: raw.name,
            state_id: state.id,
            state_name: state.name,
            lga_id: lga.id,
            lga_name: lga.name,
            sub_hub_id,
            sub_hub_name,
        })
    }
}

/// One entry in a dependent selection list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Candidate {
    pub id: String,
    pub name: String,
}

impl Candidate {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// The currently chosen location for one screen context.
///
/// Filter bars and modals each own their own `Selection`; they never share one.
/// `sub_hub_id` holds the id of the selected hub record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Selection {
    pub state_id: Option<String>,
    pub lga_id: Option<String>,
    pub sub_hub_id: Option<String>,
}

impl Selection {
    pub fn is_empty(&self) -> bool {
        self.state_id.is_none() && self.lga_id.is_none() && self.sub_hub_id.is_none()
    }
}
