use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::pipeline::{Error, Outcome};

/// Approval workflow: Draft -> Pending -> Approved | Rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PurchaseRequestStatus {
    Draft,
    Pending,
    Approved,
    Rejected,
}

impl PurchaseRequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PurchaseRequestStatus::Draft => "Draft",
            PurchaseRequestStatus::Pending => "Pending",
            PurchaseRequestStatus::Approved => "Approved",
            PurchaseRequestStatus::Rejected => "Rejected",
        }
    }
}

impl fmt::Display for PurchaseRequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Unknown purchase request status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for PurchaseRequestStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Draft" => Ok(PurchaseRequestStatus::Draft),
            "Pending" => Ok(PurchaseRequestStatus::Pending),
            "Approved" => Ok(PurchaseRequestStatus::Approved),
            "Rejected" => Ok(PurchaseRequestStatus::Rejected),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseRequest {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub amount: Decimal,
    pub status: PurchaseRequestStatus,
    pub requester_id: Uuid,
    pub category_id: Uuid,
    pub department_id: Uuid,
    pub approver_id: Option<Uuid>,
    pub decision_note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Editable fields of a draft
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseRequestDraft {
    pub title: String,
    pub description: Option<String>,
    pub amount: Decimal,
    pub category_id: Uuid,
    pub department_id: Uuid,
}

impl PurchaseRequest {
    pub fn new(requester_id: Uuid, draft: PurchaseRequestDraft) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            title: draft.title,
            description: draft.description,
            amount: draft.amount,
            status: PurchaseRequestStatus::Draft,
            requester_id,
            category_id: draft.category_id,
            department_id: draft.department_id,
            approver_id: None,
            decision_note: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.requester_id == user_id
    }

    /// Only drafts may be edited
    pub fn can_update(&self) -> Outcome {
        if self.status == PurchaseRequestStatus::Draft {
            Ok(())
        } else {
            Err(Error::conflict(
                "PurchaseRequest.NotDraft",
                format!(
                    "Cannot update a purchase request that is not a draft (status: {})",
                    self.status
                ),
            ))
        }
    }

    pub fn update(&mut self, draft: PurchaseRequestDraft) -> Outcome {
        self.can_update()?;
        self.title = draft.title;
        self.description = draft.description;
        self.amount = draft.amount;
        self.category_id = draft.category_id;
        self.department_id = draft.department_id;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn submit(&mut self) -> Outcome {
        self.transition(PurchaseRequestStatus::Draft, PurchaseRequestStatus::Pending)
    }

    pub fn approve(&mut self, approver_id: Uuid, note: Option<String>) -> Outcome {
        self.transition(PurchaseRequestStatus::Pending, PurchaseRequestStatus::Approved)?;
        self.approver_id = Some(approver_id);
        self.decision_note = note;
        Ok(())
    }

    pub fn reject(&mut self, approver_id: Uuid, note: String) -> Outcome {
        self.transition(PurchaseRequestStatus::Pending, PurchaseRequestStatus::Rejected)?;
        self.approver_id = Some(approver_id);
        self.decision_note = Some(note);
        Ok(())
    }

    fn transition(&mut self, from: PurchaseRequestStatus, to: PurchaseRequestStatus) -> Outcome {
        if self.status != from {
            return Err(Error::conflict(
                "PurchaseRequest.InvalidTransition",
                format!("Cannot move a purchase request from {} to {}", self.status, to),
            ));
        }
        self.status = to;
        self.updated_at = Utc::now();
        Ok(())
    }
}
