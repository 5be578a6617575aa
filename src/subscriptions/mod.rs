//! Live job views keyed by what they watch.
//!
//! A [`SubscriptionManager`] holds at most one live feed per
//! [`SubscriptionKey`]. Subscribing again under a key cancels the previous
//! feed before the new one opens. One manager is created per session (a
//! WebSocket connection, a test, ...) and torn down with it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex, MutexGuard};

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio::task::AbortHandle;
use tokio_stream::StreamExt;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::models::job::Job;
use crate::models::view::{Audience, JobView};
use crate::observability::metrics::Metrics;
use crate::store::{DocumentStore, JobFeed, JobQuery, StoreError};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum SubscriptionKey {
    Job(Uuid),
    JobsByUser(Uuid),
    JobsByAgent(Uuid),
    AvailableJobsForAgent(Uuid),
}

/// What a subscription watches and how results are shaped.
#[derive(Debug, Clone)]
pub struct LiveQuery {
    pub query: JobQuery,
    pub audience: Audience,
}

/// Liveness flag shared by a feed task and its handle. The feed holds the
/// lock for the whole callback, so closing waits for a running callback to
/// return and no callback starts afterwards.
#[derive(Debug, Clone)]
struct Gate(Arc<StdMutex<bool>>);

impl Gate {
    fn open() -> Self {
        Self(Arc::new(StdMutex::new(true)))
    }

    fn lock(&self) -> MutexGuard<'_, bool> {
        // a panicking callback poisons the lock; the flag itself stays valid
        self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn close(&self) {
        *self.lock() = false;
    }
}

/// Cancels one feed. Idempotent; once `cancel` returns no callback of this
/// feed is running or starts again.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    key: SubscriptionKey,
    gate: Gate,
    abort: AbortHandle,
}

impl CancelHandle {
    pub fn key(&self) -> &SubscriptionKey {
        &self.key
    }

    pub fn is_live(&self) -> bool {
        *self.gate.lock() && !self.abort.is_finished()
    }

    pub fn cancel(&self) {
        self.gate.close();
        self.abort.abort();
    }
}

pub struct SubscriptionManager {
    store: Arc<dyn DocumentStore>,
    active: Mutex<HashMap<SubscriptionKey, CancelHandle>>,
    metrics: Metrics,
}

impl SubscriptionManager {
    pub fn new(store: Arc<dyn DocumentStore>, metrics: Metrics) -> Self {
        Self {
            store,
            active: Mutex::new(HashMap::new()),
            metrics,
        }
    }

    /// Opens a feed for `key`, replacing any feed already registered under
    /// it. Feed errors go to `on_error` once and end the feed; nothing is
    /// retried here.
    pub async fn subscribe<F, E>(
        &self,
        key: SubscriptionKey,
        live: LiveQuery,
        on_change: F,
        on_error: E,
    ) -> Result<CancelHandle, StoreError>
    where
        F: Fn(Vec<JobView>) + Send + Sync + 'static,
        E: Fn(StoreError) + Send + Sync + 'static,
    {
        let mut active = self.active.lock().await;

        if let Some(previous) = active.remove(&key) {
            previous.cancel();
            self.metrics.active_subscriptions.dec();
            debug!(key = ?key, "replaced existing subscription");
        }

        let feed = self.store.watch_jobs(live.query).await?;
        let gate = Gate::open();
        let task = tokio::spawn(drive_feed(
            Arc::clone(&self.store),
            feed,
            live.audience,
            gate.clone(),
            on_change,
            on_error,
        ));

        let handle = CancelHandle {
            key: key.clone(),
            gate,
            abort: task.abort_handle(),
        };
        active.insert(key.clone(), handle.clone());
        self.metrics.active_subscriptions.inc();
        debug!(key = ?key, "subscription opened");

        Ok(handle)
    }

    /// No-op for unknown or already removed keys.
    pub async fn unsubscribe(&self, key: &SubscriptionKey) {
        let mut active = self.active.lock().await;
        if let Some(handle) = active.remove(key) {
            handle.cancel();
            self.metrics.active_subscriptions.dec();
            debug!(key = ?key, "subscription closed");
        }
    }

    /// Leaves the manager as if freshly constructed.
    pub async fn unsubscribe_all(&self) {
        let mut active = self.active.lock().await;
        let closed = active.len();
        for (_, handle) in active.drain() {
            handle.cancel();
            self.metrics.active_subscriptions.dec();
        }
        if closed > 0 {
            debug!(closed, "all subscriptions closed");
        }
    }

    pub async fn is_active(&self, key: &SubscriptionKey) -> bool {
        self.active
            .lock()
            .await
            .get(key)
            .is_some_and(CancelHandle::is_live)
    }

    /// Keys whose feed is still running.
    pub async fn active_keys(&self) -> Vec<SubscriptionKey> {
        self.active
            .lock()
            .await
            .values()
            .filter(|handle| handle.is_live())
            .map(|handle| handle.key.clone())
            .collect()
    }

    /// Registered keys, live or not.
    pub async fn len(&self) -> usize {
        self.active.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.active.lock().await.is_empty()
    }
}

impl Drop for SubscriptionManager {
    fn drop(&mut self) {
        for (_, handle) in self.active.get_mut().drain() {
            handle.cancel();
            self.metrics.active_subscriptions.dec();
        }
    }
}

async fn drive_feed<F, E>(
    store: Arc<dyn DocumentStore>,
    mut feed: JobFeed,
    audience: Audience,
    gate: Gate,
    on_change: F,
    on_error: E,
) where
    F: Fn(Vec<JobView>) + Send + Sync + 'static,
    E: Fn(StoreError) + Send + Sync + 'static,
{
    while let Some(item) = feed.next().await {
        match item {
            Ok(jobs) => {
                let views = enrich(store.as_ref(), jobs, audience).await;
                let open = gate.lock();
                if !*open {
                    return;
                }
                on_change(views);
            }
            Err(err) => {
                warn!(error = %err, "job feed failed");
                let open = gate.lock();
                if *open {
                    on_error(err);
                }
                return;
            }
        }
    }
}

/// Maps stored jobs to views, filling in the assigned agent's name.
pub async fn enrich(store: &dyn DocumentStore, jobs: Vec<Job>, audience: Audience) -> Vec<JobView> {
    let mut names: HashMap<Uuid, Option<String>> = HashMap::new();
    let mut views = Vec::with_capacity(jobs.len());

    for job in jobs {
        let agent_name = match job.agent_id() {
            Some(agent_id) => {
                if !names.contains_key(&agent_id) {
                    let name = match store.get_agent(agent_id).await {
                        Ok(agent) => agent.map(|agent| agent.name),
                        Err(err) => {
                            warn!(agent_id = %agent_id, error = %err, "agent lookup failed");
                            None
                        }
                    };
                    names.insert(agent_id, name);
                }
                names.get(&agent_id).cloned().flatten()
            }
            None => None,
        };
        views.push(JobView::project(&job, audience, agent_name));
    }

    views
}
