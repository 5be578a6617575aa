use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::engine::authorization::{Permissions, permissions};
use crate::engine::handshake;
use crate::engine::lifecycle::Phase;
use crate::engine::matching::{RangeFilter, rank_by_pickup_distance};
use crate::engine::notify::Notifier;
use crate::engine::reschedule::{self, RescheduleOutcome};
use crate::error::AppError;
use crate::geo::GeoPoint;
use crate::models::actor::Actor;
use crate::models::address::{Contact, EmbeddedAddress};
use crate::models::agent::{ActiveStatus, Agent, AgentStats, ApprovalStatus};
use crate::models::job::{
    Job, JobDefaults, JobState, JobStatus, NewJob, Package, Schedule, job_address, validate_price,
};
use crate::models::payment::{CheckoutSession, CheckoutStatus};
use crate::models::view::{Audience, JobView};
use crate::observability::metrics::Metrics;
use crate::payments::await_client_secret;
use crate::store::{DocumentStore, JobQuery, StoreError};
use crate::subscriptions::{
    CancelHandle, LiveQuery, SubscriptionKey, SubscriptionManager, enrich,
};

#[derive(Debug, Clone)]
pub struct DispatchSettings {
    pub job_defaults: JobDefaults,
    pub default_delivery_range_km: f64,
    pub payment_timeout: Duration,
    pub currency: String,
}

/// Sender-side changes to a job that has no agent yet.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobPatch {
    pub receiver: Option<Contact>,
    pub pickup: Option<EmbeddedAddress>,
    pub delivery: Option<EmbeddedAddress>,
    pub billing: Option<EmbeddedAddress>,
    pub schedule: Option<Schedule>,
    pub package: Option<Package>,
    pub price: Option<f64>,
}

impl JobPatch {
    fn validate(&self) -> Result<(), AppError> {
        if let Some(receiver) = &self.receiver {
            receiver.validate("receiver")?;
        }
        if let Some(pickup) = &self.pickup {
            pickup.validate("pickup")?;
        }
        if let Some(delivery) = &self.delivery {
            delivery.validate("delivery")?;
        }
        if let Some(billing) = &self.billing {
            billing.validate("billing")?;
        }
        if let Some(schedule) = &self.schedule {
            schedule.validate()?;
        }
        if let Some(package) = &self.package {
            package.validate()?;
        }
        if let Some(price) = self.price {
            validate_price(price)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAgent {
    pub name: String,
    pub home_address: EmbeddedAddress,
    pub delivery_range_km: Option<f64>,
}

/// Composition root of the dispatch core. Every mutating call re-checks
/// permissions and lifecycle rules against the stored job inside the
/// store's atomic update, so concurrent callers are linearized per job.
pub struct DispatchEngine {
    store: Arc<dyn DocumentStore>,
    notifier: Notifier,
    metrics: Metrics,
    settings: DispatchSettings,
}

impl DispatchEngine {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        notifier: Notifier,
        metrics: Metrics,
        settings: DispatchSettings,
    ) -> Self {
        Self {
            store,
            notifier,
            metrics,
            settings,
        }
    }

    /// A fresh subscription manager for one session.
    pub fn subscriptions(&self) -> SubscriptionManager {
        SubscriptionManager::new(Arc::clone(&self.store), self.metrics.clone())
    }

    pub async fn create_job(&self, actor: &Actor, input: NewJob) -> Result<Job, AppError> {
        let job = {
            let mut rng = rand::thread_rng();
            Job::create(actor.id, input, self.settings.job_defaults, &mut rng, Utc::now())?
        };

        let job = self.store.insert_job(job).await?;
        info!(job_id = %job.id, creator_id = %job.creator_id, price = job.price, "job created");
        Ok(job)
    }

    pub async fn get_job(&self, actor: &Actor, job_id: Uuid) -> Result<JobView, AppError> {
        let job = self.load_job(job_id).await?;
        let audience = Audience::for_actor(actor, &job);

        if let Audience::Agent(agent_id) = audience {
            let assigned = job.agent_id() == Some(agent_id);
            let open = JobQuery::open().matches(&job);
            if !assigned && !open {
                return Err(AppError::NotFound(format!("job {job_id} not found")));
            }
        }

        Ok(self.view(&job, audience).await)
    }

    pub async fn permissions(&self, actor: &Actor, job_id: Uuid) -> Result<Permissions, AppError> {
        let job = self.store.get_job(job_id).await?;
        Ok(permissions(job.as_ref(), actor))
    }

    pub async fn list_jobs_for_user(
        &self,
        actor: &Actor,
        user_id: Uuid,
    ) -> Result<Vec<JobView>, AppError> {
        require_self_or_admin(actor, user_id)?;
        let jobs = self.store.query_jobs(&JobQuery::by_creator(user_id)).await?;
        Ok(self.views(jobs, Audience::Owner).await)
    }

    pub async fn list_jobs_for_agent(
        &self,
        actor: &Actor,
        agent_id: Uuid,
    ) -> Result<Vec<JobView>, AppError> {
        require_self_or_admin(actor, agent_id)?;
        let jobs = self.store.query_jobs(&JobQuery::by_agent(agent_id)).await?;
        Ok(self.views(jobs, Audience::Agent(agent_id)).await)
    }

    /// Open jobs whose pickup and delivery both lie within the agent's range
    /// of its live location (or home), closest pickup first.
    pub async fn find_available_jobs(&self, agent_id: Uuid) -> Result<Vec<Job>, AppError> {
        let agent = self.approved_agent(agent_id).await?;
        let filter = RangeFilter::for_agent(&agent);
        filter.origin.validate()?;

        let open = self
            .store
            .query_jobs(&JobQuery::open().within(filter))
            .await?;
        Ok(rank_by_pickup_distance(&filter, open))
    }

    pub async fn edit_job(
        &self,
        actor: &Actor,
        job_id: Uuid,
        patch: JobPatch,
    ) -> Result<Job, AppError> {
        patch.validate()?;

        let current = self.store.get_job(job_id).await?;
        permissions(current.as_ref(), actor).require_edit()?;

        let actor = *actor;
        let radius = self.settings.job_defaults.obfuscation_radius_m;
        let job = self
            .store
            .update_job(
                job_id,
                Box::new(move |job: &mut Job| {
                    permissions(Some(job), &actor).require_edit()?;
                    job.lifecycle.ensure_mutable()?;

                    if let Some(price) = patch.price {
                        if job.state() != JobState::AwaitingPrepayment && price != job.price {
                            return Err(AppError::Validation(
                                "price can only change before payment".to_string(),
                            ));
                        }
                        job.price = price;
                    }

                    let mut rng = rand::thread_rng();
                    if let Some(pickup) = patch.pickup {
                        job.pickup = job_address(pickup, radius, &mut rng);
                    }
                    if let Some(delivery) = patch.delivery {
                        job.delivery = job_address(delivery, radius, &mut rng);
                    }
                    if let Some(receiver) = patch.receiver {
                        job.receiver = receiver;
                    }
                    if let Some(billing) = patch.billing {
                        job.billing = billing;
                    }
                    if let Some(schedule) = patch.schedule {
                        job.schedule = schedule;
                    }
                    if let Some(package) = patch.package {
                        job.package = package;
                    }
                    Ok(())
                }),
            )
            .await?;

        info!(job_id = %job.id, actor_id = %actor.id, "job edited");
        Ok(job)
    }

    pub async fn delete_job(&self, actor: &Actor, job_id: Uuid) -> Result<Job, AppError> {
        let current = self.store.get_job(job_id).await?;
        permissions(current.as_ref(), actor).require_delete()?;

        let actor = *actor;
        let job = self
            .store
            .update_job(
                job_id,
                Box::new(move |job: &mut Job| {
                    permissions(Some(job), &actor).require_delete()?;
                    job.lifecycle.soft_delete(actor.id, Utc::now())
                }),
            )
            .await?;

        info!(job_id = %job.id, actor_id = %actor.id, "job deleted");
        Ok(job)
    }

    /// Opens a checkout session for the job's price and waits for the
    /// collaborator's client secret. On timeout the job stays unpaid.
    pub async fn request_payment(
        &self,
        actor: &Actor,
        job_id: Uuid,
    ) -> Result<CheckoutSession, AppError> {
        let job = self.load_job(job_id).await?;
        if !actor.is_admin && actor.id != job.creator_id {
            return Err(AppError::NotOwner);
        }
        job.lifecycle.ensure_mutable()?;
        if job.lifecycle.phase() != Phase::AwaitingPayment {
            return Err(AppError::IllegalTransition {
                from: job.lifecycle.pair(),
                to: Phase::Open.pair(),
            });
        }

        let session = CheckoutSession::request(
            job.id,
            job.amount_minor_units(),
            &self.settings.currency,
            Utc::now(),
        );
        let session = self.store.create_checkout(session).await?;

        let started = Instant::now();
        let result =
            await_client_secret(self.store.as_ref(), session.id, self.settings.payment_timeout)
                .await;
        let outcome = match &result {
            Ok(_) => "ready",
            Err(AppError::PaymentTimeout) => "timeout",
            Err(_) => "error",
        };
        self.metrics
            .payment_wait_seconds
            .with_label_values(&[outcome])
            .observe(started.elapsed().as_secs_f64());

        match &result {
            Ok(_) => info!(job_id = %job.id, session_id = %session.id, "checkout session ready"),
            Err(err) => {
                warn!(job_id = %job.id, session_id = %session.id, error = %err, "checkout session not ready")
            }
        }
        result
    }

    /// The collaborator confirmed capture: `awaiting_prepayment -> prepaid`.
    /// Repeating the confirmation for an already captured session is a no-op.
    pub async fn confirm_payment(&self, session_id: Uuid) -> Result<Job, AppError> {
        let session = self
            .store
            .get_checkout(session_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("checkout session {session_id} not found")))?;
        let job_id = session.metadata.job_id;

        if session.status == CheckoutStatus::Captured {
            return self.load_job(job_id).await;
        }
        if session.status == CheckoutStatus::Failed {
            return Err(AppError::ExternalService(
                "checkout session already failed".to_string(),
            ));
        }

        let amount = session.amount;
        let captured = Arc::new(AtomicBool::new(false));
        let captured_here = Arc::clone(&captured);
        let job = self
            .store
            .update_job(
                job_id,
                Box::new(move |job: &mut Job| {
                    if job.amount_minor_units() != amount {
                        return Err(AppError::ExternalService(
                            "captured amount does not match the job price".to_string(),
                        ));
                    }
                    // a concurrent confirmation for this session got here first
                    if job.lifecycle.phase() == Phase::Open {
                        return Ok(());
                    }
                    job.lifecycle.capture_payment()?;
                    captured_here.store(true, Ordering::SeqCst);
                    Ok(())
                }),
            )
            .await?;

        self.store
            .update_checkout(
                session_id,
                Box::new(|s: &mut CheckoutSession| {
                    s.status = CheckoutStatus::Captured;
                    Ok(())
                }),
            )
            .await?;

        if captured.load(Ordering::SeqCst) {
            info!(job_id = %job.id, session_id = %session_id, "payment captured");
            self.after_transition(&job).await;
        }
        Ok(job)
    }

    pub async fn fail_payment(
        &self,
        session_id: Uuid,
        reason: Option<String>,
    ) -> Result<CheckoutSession, AppError> {
        let session = self
            .store
            .update_checkout(
                session_id,
                Box::new(move |s: &mut CheckoutSession| {
                    if s.status == CheckoutStatus::Captured {
                        return Err(AppError::Validation(
                            "checkout session was already captured".to_string(),
                        ));
                    }
                    s.status = CheckoutStatus::Failed;
                    s.error = Some(reason.unwrap_or_else(|| "payment failed".to_string()));
                    Ok(())
                }),
            )
            .await?;

        warn!(session_id = %session_id, job_id = %session.metadata.job_id, "payment failed");
        Ok(session)
    }

    pub async fn accept_job(&self, job_id: Uuid, agent_id: Uuid) -> Result<Job, AppError> {
        self.approved_agent(agent_id).await?;

        let result = self
            .store
            .update_job(
                job_id,
                Box::new(move |job: &mut Job| job.lifecycle.accept(agent_id)),
            )
            .await;

        match result {
            Ok(job) => {
                info!(job_id = %job.id, agent_id = %agent_id, "job accepted");
                self.after_transition(&job).await;
                Ok(job)
            }
            Err(AppError::AlreadyAccepted) => {
                self.metrics.acceptance_conflicts_total.inc();
                warn!(job_id = %job_id, agent_id = %agent_id, "lost acceptance race");
                Err(AppError::AlreadyAccepted)
            }
            Err(err) => Err(err),
        }
    }

    pub async fn confirm_pickup(&self, job_id: Uuid, agent_id: Uuid) -> Result<Job, AppError> {
        let job = self
            .store
            .update_job(
                job_id,
                Box::new(move |job: &mut Job| {
                    require_assigned(job, agent_id)?;
                    job.lifecycle.confirm_pickup()?;
                    job.picked_up_at = Some(Utc::now());
                    Ok(())
                }),
            )
            .await?;

        info!(job_id = %job.id, agent_id = %agent_id, "package picked up");
        self.after_transition(&job).await;
        Ok(job)
    }

    pub async fn reschedule(
        &self,
        job_id: Uuid,
        agent_id: Uuid,
        reason: Option<String>,
    ) -> Result<Job, AppError> {
        let job = self
            .store
            .update_job(
                job_id,
                Box::new(move |job: &mut Job| {
                    reschedule::reschedule(job, agent_id, reason, Utc::now()).map(|_| ())
                }),
            )
            .await?;

        let outcome = if job.status() == JobStatus::Failed {
            RescheduleOutcome::Failed
        } else {
            RescheduleOutcome::Rescheduled {
                remaining: job
                    .reschedules
                    .max()
                    .saturating_sub(job.reschedules.count()),
            }
        };

        match outcome {
            RescheduleOutcome::Failed => {
                warn!(job_id = %job.id, agent_id = %agent_id, "reschedule limit reached, job failed");
                self.bump_agent_stats(agent_id, |stats| stats.cancelled_count += 1)
                    .await;
            }
            RescheduleOutcome::Rescheduled { remaining } => {
                info!(job_id = %job.id, agent_id = %agent_id, remaining, "job rescheduled");
            }
        }

        self.after_transition(&job).await;
        Ok(job)
    }

    /// The assigned agent picks a rescheduled job back up where it left off.
    pub async fn resume_job(&self, job_id: Uuid, agent_id: Uuid) -> Result<Job, AppError> {
        let job = self
            .store
            .update_job(
                job_id,
                Box::new(move |job: &mut Job| {
                    require_assigned(job, agent_id)?;
                    let picked_up = job.picked_up_at.is_some();
                    job.lifecycle.resume(picked_up)
                }),
            )
            .await?;

        info!(job_id = %job.id, agent_id = %agent_id, "job resumed");
        // the sender was told about this stage before the reschedule
        self.record_transition(&job);
        Ok(job)
    }

    /// Proof of delivery. A wrong code changes nothing and may be retried.
    pub async fn validate_delivery(
        &self,
        job_id: Uuid,
        agent_id: Uuid,
        supplied_code: String,
    ) -> Result<Job, AppError> {
        let result = self
            .store
            .update_job(
                job_id,
                Box::new(move |job: &mut Job| {
                    require_assigned(job, agent_id)?;
                    handshake::validate(job, &supplied_code, Utc::now())
                }),
            )
            .await;

        let job = match result {
            Ok(job) => job,
            Err(AppError::InvalidSecretCode) => {
                self.metrics.secret_code_mismatches_total.inc();
                info!(job_id = %job_id, agent_id = %agent_id, "secret code mismatch");
                return Err(AppError::InvalidSecretCode);
            }
            Err(err) => return Err(err),
        };

        info!(job_id = %job.id, agent_id = %agent_id, "job delivered");
        let earned = job.price;
        self.bump_agent_stats(agent_id, move |stats| {
            stats.completed_count += 1;
            stats.earnings += earned;
        })
        .await;

        self.after_transition(&job).await;
        Ok(job)
    }

    /// The sender rates a delivered job once; the score feeds the agent's
    /// running average.
    pub async fn rate_delivery(&self, actor: &Actor, job_id: Uuid, stars: u8) -> Result<Job, AppError> {
        if !(1..=5).contains(&stars) {
            return Err(AppError::Validation("rating must be between 1 and 5".to_string()));
        }

        let actor = *actor;
        let job = self
            .store
            .update_job(
                job_id,
                Box::new(move |job: &mut Job| {
                    if !actor.is_admin && actor.id != job.creator_id {
                        return Err(AppError::NotOwner);
                    }
                    if job.status() != JobStatus::Delivered {
                        return Err(AppError::Validation(
                            "only delivered jobs can be rated".to_string(),
                        ));
                    }
                    if job.rating.is_some() {
                        return Err(AppError::Validation("job was already rated".to_string()));
                    }
                    job.rating = Some(stars);
                    Ok(())
                }),
            )
            .await?;

        if let Some(agent_id) = job.agent_id() {
            self.bump_agent_stats(agent_id, move |stats| stats.record_rating(stars))
                .await;
        }
        Ok(job)
    }

    pub async fn register_agent(&self, actor: &Actor, input: NewAgent) -> Result<Agent, AppError> {
        if input.name.trim().is_empty() {
            return Err(AppError::Validation("name cannot be empty".to_string()));
        }
        input.home_address.validate("home")?;

        let range = input
            .delivery_range_km
            .unwrap_or(self.settings.default_delivery_range_km);
        if !range.is_finite() || range <= 0.0 {
            return Err(AppError::Validation("delivery range must be > 0".to_string()));
        }

        let now = Utc::now();
        let agent = Agent {
            id: actor.id,
            name: input.name.trim().to_string(),
            active_status: ActiveStatus::PendingApproval,
            approval_status: ApprovalStatus::Pending,
            home_address: input.home_address,
            current_location: None,
            delivery_range_km: range,
            stats: AgentStats::default(),
            created_at: now,
            updated_at: now,
        };

        let agent = self.store.insert_agent(agent).await?;
        info!(agent_id = %agent.id, "agent registered");
        Ok(agent)
    }

    pub async fn get_agent(&self, agent_id: Uuid) -> Result<Agent, AppError> {
        self.store
            .get_agent(agent_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("agent {agent_id} not found")))
    }

    pub async fn set_agent_approval(
        &self,
        actor: &Actor,
        agent_id: Uuid,
        approval: ApprovalStatus,
    ) -> Result<Agent, AppError> {
        if !actor.is_admin {
            return Err(AppError::Forbidden("only admins can review agents".to_string()));
        }

        let agent = self
            .store
            .update_agent(
                agent_id,
                Box::new(move |agent: &mut Agent| {
                    agent.approval_status = approval;
                    agent.active_status = match approval {
                        ApprovalStatus::Approved => ActiveStatus::Offline,
                        ApprovalStatus::Pending | ApprovalStatus::Rejected => {
                            ActiveStatus::PendingApproval
                        }
                    };
                    Ok(())
                }),
            )
            .await?;

        info!(agent_id = %agent.id, approval = ?approval, "agent review recorded");
        Ok(agent)
    }

    pub async fn set_agent_status(
        &self,
        actor: &Actor,
        agent_id: Uuid,
        status: ActiveStatus,
    ) -> Result<Agent, AppError> {
        require_self_or_admin(actor, agent_id)?;

        self.store
            .update_agent(
                agent_id,
                Box::new(move |agent: &mut Agent| {
                    if !agent.is_approved() {
                        return Err(AppError::Forbidden("agent is not approved".to_string()));
                    }
                    if status == ActiveStatus::PendingApproval {
                        return Err(AppError::Validation(
                            "pending_approval is set by review only".to_string(),
                        ));
                    }
                    agent.active_status = status;
                    Ok(())
                }),
            )
            .await
    }

    pub async fn update_agent_location(
        &self,
        actor: &Actor,
        agent_id: Uuid,
        location: GeoPoint,
    ) -> Result<Agent, AppError> {
        require_self_or_admin(actor, agent_id)?;
        location.validate()?;

        self.store
            .update_agent(
                agent_id,
                Box::new(move |agent: &mut Agent| {
                    agent.current_location = Some(location);
                    Ok(())
                }),
            )
            .await
    }

    /// Registers a live view under `key` in the session's manager, after
    /// checking that `actor` may see it.
    pub async fn watch<F, E>(
        &self,
        subscriptions: &SubscriptionManager,
        actor: &Actor,
        key: SubscriptionKey,
        on_change: F,
        on_error: E,
    ) -> Result<CancelHandle, AppError>
    where
        F: Fn(Vec<JobView>) + Send + Sync + 'static,
        E: Fn(StoreError) + Send + Sync + 'static,
    {
        let live = self.live_query(actor, &key).await?;
        let handle = subscriptions.subscribe(key, live, on_change, on_error).await?;
        Ok(handle)
    }

    async fn live_query(&self, actor: &Actor, key: &SubscriptionKey) -> Result<LiveQuery, AppError> {
        match *key {
            SubscriptionKey::Job(job_id) => {
                let job = self.load_job(job_id).await?;
                let audience = Audience::for_actor(actor, &job);
                if let Audience::Agent(agent_id) = audience {
                    if job.agent_id() != Some(agent_id) {
                        return Err(AppError::NotAssignedAgent);
                    }
                }
                Ok(LiveQuery {
                    query: JobQuery::by_id(job_id).include_deleted(),
                    audience,
                })
            }
            SubscriptionKey::JobsByUser(user_id) => {
                require_self_or_admin(actor, user_id)?;
                Ok(LiveQuery {
                    query: JobQuery::by_creator(user_id),
                    audience: Audience::Owner,
                })
            }
            SubscriptionKey::JobsByAgent(agent_id) => {
                require_self_or_admin(actor, agent_id)?;
                Ok(LiveQuery {
                    query: JobQuery::by_agent(agent_id),
                    audience: Audience::Agent(agent_id),
                })
            }
            SubscriptionKey::AvailableJobsForAgent(agent_id) => {
                require_self_or_admin(actor, agent_id)?;
                let agent = self.approved_agent(agent_id).await?;
                let filter = RangeFilter::for_agent(&agent);
                filter.origin.validate()?;
                Ok(LiveQuery {
                    query: JobQuery::open().within(filter),
                    audience: Audience::Agent(agent_id),
                })
            }
        }
    }

    pub async fn views(&self, jobs: Vec<Job>, audience: Audience) -> Vec<JobView> {
        enrich(self.store.as_ref(), jobs, audience).await
    }

    pub async fn view(&self, job: &Job, audience: Audience) -> JobView {
        self.views(vec![job.clone()], audience)
            .await
            .pop()
            .unwrap_or_else(|| JobView::project(job, audience, None))
    }

    async fn load_job(&self, job_id: Uuid) -> Result<Job, AppError> {
        self.store
            .get_job(job_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("job {job_id} not found")))
    }

    async fn approved_agent(&self, agent_id: Uuid) -> Result<Agent, AppError> {
        let agent = self.get_agent(agent_id).await?;
        if !agent.is_approved() {
            return Err(AppError::Forbidden("agent is not approved".to_string()));
        }
        Ok(agent)
    }

    async fn bump_agent_stats<F>(&self, agent_id: Uuid, update: F)
    where
        F: FnOnce(&mut AgentStats) + Send + 'static,
    {
        let result = self
            .store
            .update_agent(
                agent_id,
                Box::new(move |agent: &mut Agent| {
                    update(&mut agent.stats);
                    Ok(())
                }),
            )
            .await;

        if let Err(err) = result {
            warn!(agent_id = %agent_id, error = %err, "failed to update agent stats");
        }
    }

    fn record_transition(&self, job: &Job) {
        self.metrics
            .job_transitions_total
            .with_label_values(&[job.status().as_str()])
            .inc();
    }

    async fn after_transition(&self, job: &Job) {
        self.record_transition(job);

        let agent_name = match job.agent_id() {
            Some(agent_id) => self
                .store
                .get_agent(agent_id)
                .await
                .ok()
                .flatten()
                .map(|agent| agent.name),
            None => None,
        };
        self.notifier.job_changed(job, agent_name.as_deref());
    }
}

fn require_assigned(job: &Job, agent_id: Uuid) -> Result<(), AppError> {
    job.lifecycle.ensure_mutable()?;
    if job.agent_id() != Some(agent_id) {
        return Err(AppError::NotAssignedAgent);
    }
    Ok(())
}

fn require_self_or_admin(actor: &Actor, owner_id: Uuid) -> Result<(), AppError> {
    if actor.is_admin || actor.id == owner_id {
        Ok(())
    } else {
        Err(AppError::NotOwner)
    }
}
