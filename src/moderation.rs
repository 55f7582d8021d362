//! Approval state machine shared by users and projects.
//!
//! Both registries move through the same three statuses. New rows start as
//! `pending`; only an administrator can move them afterwards, and nothing ever
//! returns to `pending`. A transition into the current status is reported as
//! [`Outcome::NoChange`] instead of silently succeeding.

use std::fmt;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "approval_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
}

impl ApprovalStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ApprovalStatus::Pending => "pending",
            ApprovalStatus::Approved => "approved",
            ApprovalStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModerationAction {
    Approve,
    Reject,
}

impl ModerationAction {
    pub fn target(self) -> ApprovalStatus {
        match self {
            ModerationAction::Approve => ApprovalStatus::Approved,
            ModerationAction::Reject => ApprovalStatus::Rejected,
        }
    }

    /// Reject carries no precondition: approved rows may be rejected and
    /// rejected rows approved.
    pub fn applies_to(self, current: ApprovalStatus) -> bool {
        current != self.target()
    }

    pub fn already(self) -> &'static str {
        match self {
            ModerationAction::Approve => "already approved",
            ModerationAction::Reject => "already rejected",
        }
    }
}

/// Result of a conditional write against a single row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    Changed(T),
    NoChange,
    NotFound,
}

impl<T> Outcome<T> {
    /// `NoChange` answers 409, `NotFound` answers 404 naming `entity`.
    pub fn settle(self, entity: &'static str, action: ModerationAction) -> Result<T, ApiError> {
        match self {
            Outcome::Changed(row) => Ok(row),
            Outcome::NoChange => Err(ApiError::NoChange(action.already())),
            Outcome::NotFound => Err(ApiError::NotFound(entity)),
        }
    }
}

/// Resolves a zero-row conditional update into `NoChange` or `NotFound`.
///
/// The row may be deleted between the update and this lookup; that reads as
/// `NotFound`, which is what a caller arriving a moment later would see too.
pub(crate) async fn settle_unchanged<T>(
    db: &PgPool,
    table: &'static str,
    id: Uuid,
) -> anyhow::Result<Outcome<T>> {
    let sql = format!("SELECT EXISTS (SELECT 1 FROM {table} WHERE id = $1)");
    let exists: bool = sqlx::query_scalar(&sql)
        .bind(id)
        .fetch_one(db)
        .await
        .with_context(|| format!("look up {table} row"))?;
    Ok(if exists {
        Outcome::NoChange
    } else {
        Outcome::NotFound
    })
}
