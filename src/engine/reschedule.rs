use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::job::{Job, JobStatus};

pub const DEFAULT_MAX_RESCHEDULES: u32 = 2;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RescheduleRecord {
    pub timestamp: DateTime<Utc>,
    pub reason: Option<String>,
    pub agent_id: Uuid,
}

/// Reschedule count and history of one job. Only [`reschedule`] writes it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RescheduleLedger {
    #[serde(rename = "reschedule_count")]
    count: u32,
    #[serde(rename = "max_reschedules")]
    max: u32,
    #[serde(rename = "reschedule_history", default)]
    history: Vec<RescheduleRecord>,
}

impl RescheduleLedger {
    pub fn new(max: u32) -> Self {
        Self {
            count: 0,
            max: max.max(1),
            history: Vec::new(),
        }
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn max(&self) -> u32 {
        self.max
    }

    pub fn history(&self) -> &[RescheduleRecord] {
        &self.history
    }
}

/// What a reschedule did to the job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RescheduleOutcome {
    Rescheduled { remaining: u32 },
    Failed,
}

/// Records an agent-initiated postponement. Once the incremented count
/// reaches the job's maximum the job fails instead of being rescheduled.
pub fn reschedule(
    job: &mut Job,
    agent_id: Uuid,
    reason: Option<String>,
    at: DateTime<Utc>,
) -> Result<RescheduleOutcome, AppError> {
    job.lifecycle.ensure_mutable()?;

    if job.agent_id() != Some(agent_id) {
        return Err(AppError::NotAssignedAgent);
    }

    if !matches!(
        job.status(),
        JobStatus::AgentAccepted | JobStatus::PickedUp | JobStatus::Rescheduled
    ) {
        return Err(AppError::Validation(format!(
            "a job in status {} cannot be rescheduled",
            job.status().as_str()
        )));
    }

    let ledger = &job.reschedules;
    let next_count = ledger.count + 1;
    let exhausted = next_count >= ledger.max;

    job.lifecycle.reschedule(exhausted)?;

    let reason = reason
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty());
    let ledger = &mut job.reschedules;
    ledger.count = next_count;
    ledger.history.push(RescheduleRecord {
        timestamp: at,
        reason,
        agent_id,
    });

    if exhausted {
        Ok(RescheduleOutcome::Failed)
    } else {
        Ok(RescheduleOutcome::Rescheduled {
            remaining: ledger.max - next_count,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use super::{RescheduleOutcome, reschedule};
    use crate::engine::lifecycle::Phase;
    use crate::error::AppError;
    use crate::test_support::accepted_job;

    #[test]
    fn second_reschedule_with_default_max_fails_the_job() {
        let agent = Uuid::new_v4();
        let mut job = accepted_job(agent, 2);

        let first = reschedule(&mut job, agent, Some("traffic".to_string()), Utc::now()).unwrap();
        assert_eq!(first, RescheduleOutcome::Rescheduled { remaining: 1 });
        assert_eq!(job.lifecycle.phase(), Phase::Rescheduled);

        let second = reschedule(&mut job, agent, None, Utc::now()).unwrap();
        assert_eq!(second, RescheduleOutcome::Failed);
        assert_eq!(job.lifecycle.phase(), Phase::Failed);
        assert_eq!(job.reschedules.count(), 2);

        assert!(matches!(
            reschedule(&mut job, agent, None, Utc::now()),
            Err(AppError::TerminalJob)
        ));
        assert_eq!(job.reschedules.count(), 2);
        assert_eq!(job.reschedules.history().len(), 2);
    }

    #[test]
    fn count_never_exceeds_max() {
        for max in 1..=5 {
            let agent = Uuid::new_v4();
            let mut job = accepted_job(agent, max);
            let mut last = 0;

            for _ in 0..(max + 3) {
                let _ = reschedule(&mut job, agent, None, Utc::now());
                let count = job.reschedules.count();
                assert!(count >= last);
                assert!(count <= job.reschedules.max());
                last = count;
            }

            assert_eq!(last, max);
            assert_eq!(job.lifecycle.phase(), Phase::Failed);
        }
    }

    #[test]
    fn other_agents_cannot_reschedule() {
        let agent = Uuid::new_v4();
        let mut job = accepted_job(agent, 2);

        assert!(matches!(
            reschedule(&mut job, Uuid::new_v4(), None, Utc::now()),
            Err(AppError::NotAssignedAgent)
        ));
        assert_eq!(job.reschedules.count(), 0);
        assert_eq!(job.lifecycle.phase(), Phase::Accepted);
    }

    #[test]
    fn history_keeps_reason_and_agent() {
        let agent = Uuid::new_v4();
        let mut job = accepted_job(agent, 3);
        reschedule(&mut job, agent, Some("  receiver away ".to_string()), Utc::now()).unwrap();

        let record = &job.reschedules.history()[0];
        assert_eq!(record.agent_id, agent);
        assert_eq!(record.reason.as_deref(), Some("receiver away"));
    }
}
