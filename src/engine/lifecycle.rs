//! The job state machine.
//!
//! `status` and `state` are never stored independently: a job holds a single
//! [`Phase`], and each phase maps to exactly one reachable `(status, state)`
//! pair. Callers move a job only through the named operations on
//! [`Lifecycle`]; there is no setter for the phase.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::job::{JobState, JobStatus, StatusPair};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    AwaitingPayment,
    Open,
    Accepted,
    PickedUp,
    Rescheduled,
    Delivered,
    Failed,
}

impl Phase {
    pub const ALL: [Phase; 7] = [
        Phase::AwaitingPayment,
        Phase::Open,
        Phase::Accepted,
        Phase::PickedUp,
        Phase::Rescheduled,
        Phase::Delivered,
        Phase::Failed,
    ];

    pub fn pair(self) -> StatusPair {
        let (status, state) = match self {
            Phase::AwaitingPayment => (JobStatus::AwaitingAgent, JobState::AwaitingPrepayment),
            Phase::Open => (JobStatus::AwaitingAgent, JobState::Prepaid),
            Phase::Accepted => (JobStatus::AgentAccepted, JobState::Processing),
            Phase::PickedUp => (JobStatus::PickedUp, JobState::Processing),
            Phase::Rescheduled => (JobStatus::Rescheduled, JobState::Processing),
            Phase::Delivered => (JobStatus::Delivered, JobState::Completed),
            Phase::Failed => (JobStatus::Failed, JobState::Cancelled),
        };
        StatusPair { status, state }
    }

    pub fn from_pair(pair: StatusPair) -> Option<Phase> {
        Phase::ALL.into_iter().find(|phase| phase.pair() == pair)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Delivered | Phase::Failed)
    }

    /// The transition table. Anything not listed here is illegal.
    pub fn permits(self, to: Phase) -> bool {
        use Phase::*;

        matches!(
            (self, to),
            (AwaitingPayment, Open)
                | (Open, Accepted)
                | (Accepted, PickedUp)
                | (Accepted | PickedUp | Rescheduled, Rescheduled | Failed)
                | (PickedUp, Delivered)
                | (Rescheduled, Accepted | PickedUp)
        )
    }

    pub fn transition(self, to: Phase) -> Result<Phase, AppError> {
        if self.permits(to) {
            Ok(to)
        } else {
            Err(AppError::IllegalTransition {
                from: self.pair(),
                to: to.pair(),
            })
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeletionRecord {
    pub deleted_at: DateTime<Utc>,
    pub deleted_by: Uuid,
}

/// Phase, assigned agent and soft-deletion marker of one job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "LifecycleDoc", try_from = "LifecycleDoc")]
pub struct Lifecycle {
    phase: Phase,
    agent_id: Option<Uuid>,
    deletion: Option<DeletionRecord>,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl Lifecycle {
    pub fn new() -> Self {
        Self {
            phase: Phase::AwaitingPayment,
            agent_id: None,
            deletion: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn pair(&self) -> StatusPair {
        self.phase.pair()
    }

    pub fn agent_id(&self) -> Option<Uuid> {
        self.agent_id
    }

    pub fn is_deleted(&self) -> bool {
        self.deletion.is_some()
    }

    pub fn deletion(&self) -> Option<&DeletionRecord> {
        self.deletion.as_ref()
    }

    pub fn is_terminal(&self) -> bool {
        self.phase.is_terminal()
    }

    pub fn ensure_mutable(&self) -> Result<(), AppError> {
        if self.is_deleted() || self.is_terminal() {
            return Err(AppError::TerminalJob);
        }
        Ok(())
    }

    fn advance(&mut self, to: Phase) -> Result<(), AppError> {
        self.ensure_mutable()?;
        self.phase = self.phase.transition(to)?;
        Ok(())
    }

    /// `(awaiting_agent, awaiting_prepayment) -> (awaiting_agent, prepaid)`
    pub fn capture_payment(&mut self) -> Result<(), AppError> {
        self.advance(Phase::Open)
    }

    /// `(awaiting_agent, prepaid) -> (agent_accepted, processing)`, binding
    /// the agent. A job that already has an agent reports the lost race.
    pub fn accept(&mut self, agent_id: Uuid) -> Result<(), AppError> {
        self.ensure_mutable()?;
        if self.agent_id.is_some() {
            return Err(AppError::AlreadyAccepted);
        }

        self.advance(Phase::Accepted)?;
        self.agent_id = Some(agent_id);
        Ok(())
    }

    pub fn confirm_pickup(&mut self) -> Result<(), AppError> {
        self.advance(Phase::PickedUp)
    }

    /// Puts a rescheduled job back on the road, at the stage it left.
    pub fn resume(&mut self, already_picked_up: bool) -> Result<(), AppError> {
        let target = if already_picked_up {
            Phase::PickedUp
        } else {
            Phase::Accepted
        };
        self.advance(target)
    }

    /// Only the proof-of-delivery handshake calls this.
    pub(crate) fn deliver(&mut self) -> Result<(), AppError> {
        self.advance(Phase::Delivered)
    }

    /// Only the reschedule policy calls this.
    pub(crate) fn reschedule(&mut self, exhausted: bool) -> Result<(), AppError> {
        let target = if exhausted {
            Phase::Failed
        } else {
            Phase::Rescheduled
        };
        self.advance(target)
    }

    /// Soft deletion; only legal while no agent has been assigned.
    pub fn soft_delete(&mut self, deleted_by: Uuid, at: DateTime<Utc>) -> Result<(), AppError> {
        self.ensure_mutable()?;
        if self.pair().status != JobStatus::AwaitingAgent {
            return Err(AppError::Forbidden(
                "only jobs still awaiting an agent can be deleted".to_string(),
            ));
        }

        self.deletion = Some(DeletionRecord {
            deleted_at: at,
            deleted_by,
        });
        Ok(())
    }
}

#[derive(Serialize, Deserialize)]
struct LifecycleDoc {
    status: JobStatus,
    state: JobState,
    agent_id: Option<Uuid>,
    #[serde(default)]
    deleted: bool,
    #[serde(default)]
    deletion: Option<DeletionRecord>,
}

impl From<Lifecycle> for LifecycleDoc {
    fn from(lifecycle: Lifecycle) -> Self {
        let pair = lifecycle.pair();
        Self {
            status: pair.status,
            state: pair.state,
            agent_id: lifecycle.agent_id,
            deleted: lifecycle.deletion.is_some(),
            deletion: lifecycle.deletion,
        }
    }
}

impl TryFrom<LifecycleDoc> for Lifecycle {
    type Error = String;

    fn try_from(doc: LifecycleDoc) -> Result<Self, Self::Error> {
        let pair = StatusPair {
            status: doc.status,
            state: doc.state,
        };
        let phase = Phase::from_pair(pair).ok_or_else(|| format!("unreachable status pair {pair}"))?;

        let needs_agent = !matches!(phase, Phase::AwaitingPayment | Phase::Open);
        if needs_agent != doc.agent_id.is_some() {
            return Err(format!("agent assignment does not fit status pair {pair}"));
        }
        if doc.deleted != doc.deletion.is_some() {
            return Err("deleted flag and deletion record disagree".to_string());
        }

        Ok(Self {
            phase,
            agent_id: doc.agent_id,
            deletion: doc.deletion,
        })
    }
}
