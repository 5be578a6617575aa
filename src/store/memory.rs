use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::sync::broadcast;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::agent::Agent;
use crate::models::job::Job;
use crate::models::payment::CheckoutSession;
use crate::store::{
    AgentMutation, AgentStore, CheckoutFeed, CheckoutMutation, CheckoutStore, JobFeed, JobMutation,
    JobQuery, JobStore, StoreError,
};

/// Process-local document store. Each document sits behind its `DashMap`
/// shard lock, which makes `update_*` a per-document atomic conditional
/// write; change events are published before that lock is released.
pub struct InMemoryStore {
    jobs: Arc<DashMap<Uuid, Job>>,
    agents: DashMap<Uuid, Agent>,
    checkouts: DashMap<Uuid, CheckoutSession>,
    job_events: broadcast::Sender<Job>,
    checkout_events: broadcast::Sender<CheckoutSession>,
}

impl InMemoryStore {
    pub fn new(event_buffer_size: usize) -> Self {
        let (job_events, _unused_rx) = broadcast::channel(event_buffer_size.max(1));
        let (checkout_events, _unused_rx) = broadcast::channel(event_buffer_size.max(1));

        Self {
            jobs: Arc::new(DashMap::new()),
            agents: DashMap::new(),
            checkouts: DashMap::new(),
            job_events,
            checkout_events,
        }
    }

    pub fn job_count(&self) -> usize {
        self.jobs.len()
    }

    pub fn agent_count(&self) -> usize {
        self.agents.len()
    }

    pub fn checkout_count(&self) -> usize {
        self.checkouts.len()
    }
}

fn snapshot(jobs: &DashMap<Uuid, Job>, query: &JobQuery) -> Vec<Job> {
    query.apply(jobs.iter().map(|entry| entry.value().clone()))
}

fn lagged(err: BroadcastStreamRecvError) -> StoreError {
    match err {
        BroadcastStreamRecvError::Lagged(missed) => StoreError::FeedLagged(missed),
    }
}

#[async_trait]
impl JobStore for InMemoryStore {
    async fn insert_job(&self, job: Job) -> Result<Job, StoreError> {
        match self.jobs.entry(job.id) {
            Entry::Occupied(_) => Err(StoreError::Duplicate(format!("job {}", job.id))),
            Entry::Vacant(slot) => {
                slot.insert(job.clone());
                let _ = self.job_events.send(job.clone());
                Ok(job)
            }
        }
    }

    async fn get_job(&self, id: Uuid) -> Result<Option<Job>, StoreError> {
        Ok(self.jobs.get(&id).map(|entry| entry.value().clone()))
    }

    async fn query_jobs(&self, query: &JobQuery) -> Result<Vec<Job>, StoreError> {
        Ok(snapshot(&self.jobs, query))
    }

    async fn update_job(&self, id: Uuid, mutation: JobMutation) -> Result<Job, AppError> {
        let mut entry = self
            .jobs
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("job {id} not found")))?;

        let mut draft = entry.value().clone();
        mutation(&mut draft)?;
        draft.updated_at = Utc::now();

        *entry.value_mut() = draft.clone();
        let _ = self.job_events.send(draft.clone());
        drop(entry);

        Ok(draft)
    }

    async fn watch_jobs(&self, query: JobQuery) -> Result<JobFeed, StoreError> {
        // subscribe before the first snapshot so no write falls in between
        let rx = self.job_events.subscribe();
        let jobs = Arc::clone(&self.jobs);

        let initial = snapshot(&jobs, &query);
        let mut visible: HashSet<Uuid> = initial.iter().map(|job| job.id).collect();

        let changes = BroadcastStream::new(rx).filter_map(move |event| match event {
            Ok(changed) => {
                if !query.matches(&changed) && !visible.contains(&changed.id) {
                    return None;
                }
                let result = snapshot(&jobs, &query);
                visible = result.iter().map(|job| job.id).collect();
                Some(Ok(result))
            }
            Err(err) => Some(Err(lagged(err))),
        });

        Ok(Box::pin(tokio_stream::once(Ok(initial)).chain(changes)))
    }
}

#[async_trait]
impl AgentStore for InMemoryStore {
    async fn insert_agent(&self, agent: Agent) -> Result<Agent, StoreError> {
        match self.agents.entry(agent.id) {
            Entry::Occupied(_) => Err(StoreError::Duplicate(format!("agent {}", agent.id))),
            Entry::Vacant(slot) => {
                slot.insert(agent.clone());
                Ok(agent)
            }
        }
    }

    async fn get_agent(&self, id: Uuid) -> Result<Option<Agent>, StoreError> {
        Ok(self.agents.get(&id).map(|entry| entry.value().clone()))
    }

    async fn update_agent(&self, id: Uuid, mutation: AgentMutation) -> Result<Agent, AppError> {
        let mut entry = self
            .agents
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("agent {id} not found")))?;

        let mut draft = entry.value().clone();
        mutation(&mut draft)?;
        draft.updated_at = Utc::now();
        *entry.value_mut() = draft.clone();

        Ok(draft)
    }
}

#[async_trait]
impl CheckoutStore for InMemoryStore {
    async fn create_checkout(&self, session: CheckoutSession) -> Result<CheckoutSession, StoreError> {
        match self.checkouts.entry(session.id) {
            Entry::Occupied(_) => Err(StoreError::Duplicate(format!(
                "checkout session {}",
                session.id
            ))),
            Entry::Vacant(slot) => {
                slot.insert(session.clone());
                let _ = self.checkout_events.send(session.clone());
                Ok(session)
            }
        }
    }

    async fn get_checkout(&self, id: Uuid) -> Result<Option<CheckoutSession>, StoreError> {
        Ok(self.checkouts.get(&id).map(|entry| entry.value().clone()))
    }

    async fn update_checkout(
        &self,
        id: Uuid,
        mutation: CheckoutMutation,
    ) -> Result<CheckoutSession, AppError> {
        let mut entry = self
            .checkouts
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("checkout session {id} not found")))?;

        let mut draft = entry.value().clone();
        mutation(&mut draft)?;
        draft.updated_at = Utc::now();

        *entry.value_mut() = draft.clone();
        let _ = self.checkout_events.send(draft.clone());
        drop(entry);

        Ok(draft)
    }

    async fn watch_checkout(&self, id: Uuid) -> Result<CheckoutFeed, StoreError> {
        let rx = self.checkout_events.subscribe();
        let current = self
            .checkouts
            .get(&id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| StoreError::NotFound(format!("checkout session {id}")))?;

        let updates = BroadcastStream::new(rx).filter_map(move |event| match event {
            Ok(session) if session.id == id => Some(Ok(session)),
            Ok(_) => None,
            Err(err) => Some(Err(lagged(err))),
        });

        Ok(Box::pin(tokio_stream::once(Ok(current)).chain(updates)))
    }

    async fn watch_checkouts(&self) -> Result<CheckoutFeed, StoreError> {
        let rx = self.checkout_events.subscribe();
        let feed = BroadcastStream::new(rx).map(|event| event.map_err(lagged));
        Ok(Box::pin(feed))
    }
}
