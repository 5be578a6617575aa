use uuid::Uuid;

use crate::engine::matching::RangeFilter;
use crate::models::job::{Job, JobState, JobStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderBy {
    #[default]
    CreatedDesc,
    ScheduledAsc,
}

/// Filter + order + limit over the `jobs` collection. Deleted jobs are
/// excluded unless `include_deleted` is called.
#[derive(Debug, Clone, Default)]
pub struct JobQuery {
    id: Option<Uuid>,
    creator_id: Option<Uuid>,
    agent_id: Option<Uuid>,
    status: Option<JobStatus>,
    state: Option<JobState>,
    within: Option<RangeFilter>,
    include_deleted: bool,
    order_by: OrderBy,
    limit: Option<usize>,
}

impl JobQuery {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn by_id(id: Uuid) -> Self {
        Self {
            id: Some(id),
            ..Self::default()
        }
    }

    pub fn by_creator(creator_id: Uuid) -> Self {
        Self {
            creator_id: Some(creator_id),
            ..Self::default()
        }
    }

    pub fn by_agent(agent_id: Uuid) -> Self {
        Self {
            agent_id: Some(agent_id),
            ..Self::default()
        }
    }

    /// Paid jobs nobody has accepted yet.
    pub fn open() -> Self {
        Self {
            status: Some(JobStatus::AwaitingAgent),
            state: Some(JobState::Prepaid),
            order_by: OrderBy::ScheduledAsc,
            ..Self::default()
        }
    }

    pub fn status(mut self, status: JobStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn state(mut self, state: JobState) -> Self {
        self.state = Some(state);
        self
    }

    pub fn within(mut self, filter: RangeFilter) -> Self {
        self.within = Some(filter);
        self
    }

    pub fn include_deleted(mut self) -> Self {
        self.include_deleted = true;
        self
    }

    pub fn order_by(mut self, order_by: OrderBy) -> Self {
        self.order_by = order_by;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn matches(&self, job: &Job) -> bool {
        if !self.include_deleted && job.is_deleted() {
            return false;
        }
        if self.id.is_some_and(|id| id != job.id) {
            return false;
        }
        if self.creator_id.is_some_and(|id| id != job.creator_id) {
            return false;
        }
        if self.agent_id.is_some() && self.agent_id != job.agent_id() {
            return false;
        }
        if self.status.is_some_and(|status| status != job.status()) {
            return false;
        }
        if self.state.is_some_and(|state| state != job.state()) {
            return false;
        }
        match &self.within {
            Some(filter) => filter.qualifies(job).unwrap_or(false),
            None => true,
        }
    }

    /// Filters, sorts and truncates `jobs`.
    pub fn apply<I>(&self, jobs: I) -> Vec<Job>
    where
        I: IntoIterator<Item = Job>,
    {
        let mut matched: Vec<Job> = jobs.into_iter().filter(|job| self.matches(job)).collect();

        match self.order_by {
            OrderBy::CreatedDesc => matched.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
            OrderBy::ScheduledAsc => matched.sort_by(|a, b| {
                (a.schedule.date, a.schedule.window_start)
                    .cmp(&(b.schedule.date, b.schedule.window_start))
                    .then(a.created_at.cmp(&b.created_at))
            }),
        }

        if let Some(limit) = self.limit {
            matched.truncate(limit);
        }
        matched
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    use super::JobQuery;
    use crate::models::job::JobStatus;
    use crate::test_support::{accepted_job, new_job};

    #[test]
    fn deleted_jobs_are_hidden_by_default() {
        let owner = Uuid::new_v4();
        let mut job = new_job(owner);
        job.lifecycle.soft_delete(owner, Utc::now()).unwrap();

        assert!(!JobQuery::by_creator(owner).matches(&job));
        assert!(JobQuery::by_creator(owner).include_deleted().matches(&job));
    }

    #[test]
    fn open_pool_needs_payment_and_no_agent() {
        let mut unpaid = new_job(Uuid::new_v4());
        assert!(!JobQuery::open().matches(&unpaid));

        unpaid.lifecycle.capture_payment().unwrap();
        assert!(JobQuery::open().matches(&unpaid));

        let taken = accepted_job(Uuid::new_v4(), 2);
        assert!(!JobQuery::open().matches(&taken));
    }

    #[test]
    fn newest_first_with_limit() {
        let owner = Uuid::new_v4();
        let now = Utc::now();
        let mut jobs = Vec::new();
        for minutes in [5, 1, 3] {
            let mut job = new_job(owner);
            job.created_at = now - Duration::minutes(minutes);
            jobs.push(job);
        }
        let newest = jobs[1].id;
        let middle = jobs[2].id;

        let result = JobQuery::by_creator(owner).limit(2).apply(jobs);
        let ids: Vec<Uuid> = result.iter().map(|job| job.id).collect();
        assert_eq!(ids, vec![newest, middle]);
    }

    #[test]
    fn agent_filter_matches_assigned_jobs_only() {
        let agent = Uuid::new_v4();
        let job = accepted_job(agent, 2);

        assert!(JobQuery::by_agent(agent).matches(&job));
        assert!(!JobQuery::by_agent(Uuid::new_v4()).matches(&job));
        assert!(
            JobQuery::by_agent(agent)
                .status(JobStatus::AgentAccepted)
                .matches(&job)
        );
    }
}
