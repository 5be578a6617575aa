use serde::Serialize;

use crate::error::AppError;
use crate::models::actor::Actor;
use crate::models::job::{Job, JobState, JobStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denial {
    NotFound,
    NotOwner,
    AlreadyDeleted,
    AlreadyAccepted,
}

impl Denial {
    pub fn reason(&self) -> &'static str {
        match self {
            Denial::NotFound => "not found",
            Denial::NotOwner => "not owner",
            Denial::AlreadyDeleted => "already deleted",
            Denial::AlreadyAccepted => "already accepted, contact support to change this job",
        }
    }

    fn into_error(self) -> AppError {
        match self {
            Denial::NotFound => AppError::NotFound("job not found".to_string()),
            Denial::NotOwner => AppError::NotOwner,
            other => AppError::Forbidden(other.reason().to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Permissions {
    pub can_edit: bool,
    pub can_delete: bool,
    pub reason: Option<&'static str>,
    #[serde(skip)]
    denial: Option<Denial>,
}

impl Permissions {
    fn allow(can_edit: bool, can_delete: bool) -> Self {
        Self {
            can_edit,
            can_delete,
            reason: None,
            denial: None,
        }
    }

    fn deny(denial: Denial) -> Self {
        Self {
            can_edit: false,
            can_delete: false,
            reason: Some(denial.reason()),
            denial: Some(denial),
        }
    }

    pub fn denial(&self) -> Option<Denial> {
        self.denial
    }

    pub fn require_edit(&self) -> Result<(), AppError> {
        if self.can_edit {
            return Ok(());
        }
        Err(self.refusal("job can no longer be edited"))
    }

    pub fn require_delete(&self) -> Result<(), AppError> {
        if self.can_delete {
            return Ok(());
        }
        Err(self.refusal("job can no longer be deleted"))
    }

    fn refusal(&self, fallback: &str) -> AppError {
        match self.denial {
            Some(denial) => denial.into_error(),
            None => AppError::Forbidden(fallback.to_string()),
        }
    }
}

/// Who may edit or delete a job. Pure; the engine calls it again against
/// the stored job inside every write.
pub fn permissions(job: Option<&Job>, actor: &Actor) -> Permissions {
    if actor.is_admin {
        return Permissions::allow(true, true);
    }

    let Some(job) = job else {
        return Permissions::deny(Denial::NotFound);
    };

    if actor.id != job.creator_id {
        return Permissions::deny(Denial::NotOwner);
    }

    if job.is_deleted() {
        return Permissions::deny(Denial::AlreadyDeleted);
    }

    if job.agent_id().is_some() && job.status() != JobStatus::AwaitingAgent {
        return Permissions::deny(Denial::AlreadyAccepted);
    }

    let can_edit = matches!(
        job.state(),
        JobState::AwaitingPrepayment | JobState::Prepaid
    );
    let can_delete = job.status() == JobStatus::AwaitingAgent;
    Permissions::allow(can_edit, can_delete)
}
