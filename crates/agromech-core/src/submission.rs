//! Submission of transaction drafts and follow-up status changes.
//!
//! Each operation runs its local checks first, then makes a single API call.
//! A failed submission leaves the draft as it was so the user can retry.

use thiserror::Error;
use tracing::{info, warn};

use crate::api::{display_message, ApiClient};
use crate::directory::LocationDirectory;
use crate::draft::{DraftError, TransactionDraft, ValidationErrors};
use crate::models::{
    ConfirmRequest, ProjectTypeRequest, StatusAction, Transaction, TransactionRequest,
    TransitionError,
};
use crate::utils::normalize_id;

#[derive(Debug, Error)]
pub enum SubmissionError {
    #[error("{0}")]
    Invalid(#[from] ValidationErrors),

    #[error("{0}")]
    Draft(#[from] DraftError),

    #[error("{0}")]
    Transition(#[from] TransitionError),

    #[error("{0} is required")]
    MissingField(&'static str),

    /// The server refused the request or could not be reached.
    #[error("{message}")]
    Rejected { message: String },
}

impl SubmissionError {
    fn from_api(err: &anyhow::Error) -> Self {
        warn!(error = %err, "Transaction request failed");
        SubmissionError::Rejected {
            message: display_message(err),
        }
    }
}

/// Validate `draft` and build its request body.
pub fn prepare_submission(
    draft: &mut TransactionDraft,
    directory: &LocationDirectory,
) -> Result<TransactionRequest, SubmissionError> {
    draft.validate(directory)?;
    Ok(draft.to_payload()?)
}

/// Validate and submit `draft`. On success the draft is marked submitted.
pub async fn submit_draft(
    api: &ApiClient,
    draft: &mut TransactionDraft,
    directory: &LocationDirectory,
) -> Result<Transaction, SubmissionError> {
    let request = prepare_submission(draft, directory)?;
    match api.create_transaction(&request).await {
        Ok(transaction) => {
            info!(id = %transaction.id, total = request.total_cost, "Transaction submitted");
            draft.mark_submitted()?;
            Ok(transaction)
        }
        Err(e) => Err(SubmissionError::from_api(&e)),
    }
}

/// Check that `transaction` can be confirmed and build the request body.
pub fn prepare_confirmation(
    transaction: &Transaction,
    payment_method: &str,
    hub_id: &str,
) -> Result<ConfirmRequest, SubmissionError> {
    transaction.transition(StatusAction::Confirm)?;
    let payment_method =
        normalize_id(Some(payment_method)).ok_or(SubmissionError::MissingField("Payment method"))?;
    let hub = normalize_id(Some(hub_id)).ok_or(SubmissionError::MissingField("Hub"))?;
    Ok(ConfirmRequest {
        payment_method,
        hub,
        transaction_id: transaction.id.clone(),
    })
}

/// Confirm payment for a pending transaction.
pub async fn confirm_transaction(
    api: &ApiClient,
    transaction: &Transaction,
    payment_method: &str,
    hub_id: &str,
) -> Result<Transaction, SubmissionError> {
    let request = prepare_confirmation(transaction, payment_method, hub_id)?;
    let confirmed = api
        .confirm_transaction(&request)
        .await
        .map_err(|e| SubmissionError::from_api(&e))?;
    info!(id = %confirmed.id, status = %confirmed.status(), "Transaction confirmed");
    Ok(confirmed)
}

/// Build the body for moving `transaction` to another project.
pub fn prepare_project_change(
    transaction: &Transaction,
    project_id: &str,
) -> Result<ProjectTypeRequest, SubmissionError> {
    let project_id =
        normalize_id(Some(project_id)).ok_or(SubmissionError::MissingField("Project"))?;
    Ok(ProjectTypeRequest {
        project_id,
        transaction_id: transaction.id.clone(),
    })
}

/// Reassign a pending transaction to another project.
pub async fn set_transaction_project(
    api: &ApiClient,
    transaction: &Transaction,
    project_id: &str,
) -> Result<Transaction, SubmissionError> {
    let request = prepare_project_change(transaction, project_id)?;
    api.set_project_type(&request)
        .await
        .map_err(|e| SubmissionError::from_api(&e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::fixtures::sample_hubs;
    use crate::draft::{DraftStatus, ValidationIssue};
    use crate::models::{Identity, Role, Service, TransactionStatus};
    use crate::scope::RoleScope;

    fn transaction(status: &str) -> Transaction {
        serde_json::from_value(serde_json::json!({
            "id": 42,
            "farmerId": "F1",
            "hub": "H1",
            "totalCost": "13000",
            "status": status,
        }))
        .unwrap()
    }

    fn plough() -> Service {
        Service {
            id: "A".to_string(),
            name: "Ploughing".to_string(),
            category_id: "plough".to_string(),
            unit_cost: 5000.0,
            measuring_unit: "hectare".to_string(),
        }
    }

    #[test]
    fn test_prepare_submission_rejects_incomplete_draft() {
        let directory = LocationDirectory::load(sample_hubs());
        let mut draft =
            TransactionDraft::new(&RoleScope::resolve(&Identity::new(Role::UnrestrictedAdmin)));
        draft.add_service(&plough()).unwrap();

        let err = prepare_submission(&mut draft, &directory).unwrap_err();
        match err {
            SubmissionError::Invalid(errors) => {
                assert!(errors.contains(&ValidationIssue::MissingFarmer));
                assert!(errors.contains(&ValidationIssue::MissingHub));
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(draft.lines().len(), 1);
        assert_eq!(draft.status(), DraftStatus::RejectedLocally);
    }

    #[test]
    fn test_prepare_submission_builds_payload() {
        let directory = LocationDirectory::load(sample_hubs());
        let mut draft =
            TransactionDraft::new(&RoleScope::resolve(&Identity::new(Role::NationalCoordinator)));
        draft.set_farmer(Some("F1")).unwrap();
        draft.set_project(Some("P1")).unwrap();
        draft.set_hub(Some("H3")).unwrap();
        draft.add_service(&plough()).unwrap();

        let request = prepare_submission(&mut draft, &directory).unwrap();
        assert_eq!(request.hub, "H3");
        assert_eq!(draft.status(), DraftStatus::Valid);
    }

    #[test]
    fn test_prepare_confirmation() {
        let pending = transaction("Pending");
        let request = prepare_confirmation(&pending, "cash", "H1").unwrap();
        assert_eq!(request.transaction_id, "42");
        assert_eq!(request.payment_method, "cash");

        assert!(matches!(
            prepare_confirmation(&pending, " ", "H1"),
            Err(SubmissionError::MissingField("Payment method"))
        ));

        let paid = transaction("Paid");
        assert_eq!(paid.status(), TransactionStatus::Confirmed);
        assert!(matches!(
            prepare_confirmation(&paid, "cash", "H1"),
            Err(SubmissionError::Transition(TransitionError::NotPending { .. }))
        ));
    }

    #[test]
    fn test_prepare_project_change() {
        let request = prepare_project_change(&transaction("Pending"), "P2").unwrap();
        assert_eq!(request.project_id, "P2");
        assert_eq!(request.transaction_id, "42");

        assert!(matches!(
            prepare_project_change(&transaction("Pending"), ""),
            Err(SubmissionError::MissingField("Project"))
        ));
    }

    #[test]
    fn test_api_failure_message() {
        let err = anyhow::Error::new(crate::api::ApiError::Rejected {
            status: 422,
            message: "Farmer already has a pending transaction".to_string(),
        })
        .context("Failed to create transaction");
        let submission = SubmissionError::from_api(&err);
        assert_eq!(submission.to_string(), "Farmer already has a pending transaction");

        let opaque = SubmissionError::from_api(&anyhow::anyhow!("connection reset"));
        assert_eq!(opaque.to_string(), crate::api::GENERIC_FAILURE_MESSAGE);
    }
}
