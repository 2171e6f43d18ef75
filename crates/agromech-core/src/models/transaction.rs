//! Persisted transactions and the request bodies the transaction endpoints accept.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::wire::{de_amount, de_id, de_opt_id};

/// Lifecycle of a persisted transaction.
///
/// The wire uses several spellings (`"Paid"`, `"Confirmed"`, `"Failed"`, `"Rejected"`);
/// they collapse to three states.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TransactionStatus {
    #[default]
    Pending,
    Confirmed,
    Rejected,
}

/// Explicit actions that move a transaction out of `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusAction {
    Confirm,
    Reject,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("Cannot {action:?} a transaction that is already {from}")]
    NotPending {
        from: TransactionStatus,
        action: StatusAction,
    },

    #[error("Unknown transaction status: {0}")]
    UnknownStatus(String),
}

impl TransactionStatus {
    /// Only pending transactions can be confirmed or rejected.
    pub fn apply(self, action: StatusAction) -> Result<TransactionStatus, TransitionError> {
        match (self, action) {
            (TransactionStatus::Pending, StatusAction::Confirm) => Ok(TransactionStatus::Confirmed),
            (TransactionStatus::Pending, StatusAction::Reject) => Ok(TransactionStatus::Rejected),
            (from, action) => Err(TransitionError::NotPending { from, action }),
        }
    }

    pub fn is_final(&self) -> bool {
        !matches!(self, TransactionStatus::Pending)
    }
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionStatus::Pending => write!(f, "Pending"),
            TransactionStatus::Confirmed => write!(f, "Confirmed"),
            TransactionStatus::Rejected => write!(f, "Rejected"),
        }
    }
}

impl TryFrom<String> for TransactionStatus {
    type Error = TransitionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.trim().to_lowercase().as_str() {
            "pending" => Ok(TransactionStatus::Pending),
            "paid" | "confirmed" => Ok(TransactionStatus::Confirmed),
            "failed" | "rejected" => Ok(TransactionStatus::Rejected),
            _ => Err(TransitionError::UnknownStatus(value)),
        }
    }
}

impl From<TransactionStatus> for String {
    fn from(status: TransactionStatus) -> Self {
        status.to_string()
    }
}

/// A transaction accepted by the backend. Its status changes only through
/// [`Transaction::transition`], never by editing fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    #[serde(deserialize_with = "de_id")]
    pub id: String,
    #[serde(rename = "farmerId", alias = "farmer", default, deserialize_with = "de_opt_id")]
    pub farmer_id: Option<String>,
    #[serde(rename = "projectId", default, deserialize_with = "de_opt_id")]
    pub project_id: Option<String>,
    #[serde(rename = "hubId", alias = "hub", default, deserialize_with = "de_opt_id")]
    pub hub_id: Option<String>,
    #[serde(rename = "totalCost", default, deserialize_with = "de_amount")]
    pub total_cost: f64,
    /// Freshly created records may omit the status; they start out pending.
    #[serde(default)]
    status: TransactionStatus,
    #[serde(rename = "createdAt", alias = "created_at", default)]
    pub created_at: Option<String>,
}

impl Transaction {
    pub fn status(&self) -> TransactionStatus {
        self.status
    }

    /// Return a copy of this transaction with `action` applied to its status.
    pub fn transition(&self, action: StatusAction) -> Result<Transaction, TransitionError> {
        let status = self.status.apply(action)?;
        Ok(Transaction {
            status,
            ..self.clone()
        })
    }
}

/// Body for `POST /transactions`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct TransactionRequest {
    pub farmer: String,
    #[serde(rename = "projectId")]
    pub project_id: String,
    pub hub: String,
    pub transaction_commodity: Vec<String>,
    pub equipment: Vec<String>,
    #[serde(rename = "totalCost")]
    pub total_cost: f64,
    #[serde(rename = "transactionType")]
    pub transaction_type: String,
}

/// Body for `PUT /transactions/{id}/confirm`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct ConfirmRequest {
    #[serde(rename = "paymentMethod")]
    pub payment_method: String,
    pub hub: String,
    #[serde(rename = "transactionId")]
    pub transaction_id: String,
}

/// Body for `PUT /transactions/{id}/project-type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct ProjectTypeRequest {
    #[serde(rename = "projectId")]
    pub project_id: String,
    #[serde(rename = "transactionId")]
    pub transaction_id: String,
}
