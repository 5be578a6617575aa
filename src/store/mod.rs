//! Document store consumed by the engine: `jobs`, `agents` and
//! `checkout_sessions` collections, each with change feeds.

pub mod memory;
pub mod query;

use std::pin::Pin;

use async_trait::async_trait;
use thiserror::Error;
use tokio_stream::Stream;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::agent::Agent;
use crate::models::job::Job;
use crate::models::payment::CheckoutSession;

pub use memory::InMemoryStore;
pub use query::{JobQuery, OrderBy};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("{0} already exists")]
    Duplicate(String),

    #[error("change feed fell behind by {0} events")]
    FeedLagged(u64),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Live query results: the current result set first, then the full result
/// set again after every relevant change, in write order.
pub type JobFeed = Pin<Box<dyn Stream<Item = Result<Vec<Job>, StoreError>> + Send>>;

pub type CheckoutFeed = Pin<Box<dyn Stream<Item = Result<CheckoutSession, StoreError>> + Send>>;

/// Runs against the current stored document. Returning an error aborts the
/// write and leaves the document untouched.
pub type JobMutation = Box<dyn FnOnce(&mut Job) -> Result<(), AppError> + Send>;
pub type AgentMutation = Box<dyn FnOnce(&mut Agent) -> Result<(), AppError> + Send>;
pub type CheckoutMutation = Box<dyn FnOnce(&mut CheckoutSession) -> Result<(), AppError> + Send>;

#[async_trait]
pub trait JobStore: Send + Sync {
    async fn insert_job(&self, job: Job) -> Result<Job, StoreError>;

    async fn get_job(&self, id: Uuid) -> Result<Option<Job>, StoreError>;

    async fn query_jobs(&self, query: &JobQuery) -> Result<Vec<Job>, StoreError>;

    /// Atomic read-check-write of one job document.
    async fn update_job(&self, id: Uuid, mutation: JobMutation) -> Result<Job, AppError>;

    async fn watch_jobs(&self, query: JobQuery) -> Result<JobFeed, StoreError>;
}

#[async_trait]
pub trait AgentStore: Send + Sync {
    async fn insert_agent(&self, agent: Agent) -> Result<Agent, StoreError>;

    async fn get_agent(&self, id: Uuid) -> Result<Option<Agent>, StoreError>;

    async fn update_agent(&self, id: Uuid, mutation: AgentMutation) -> Result<Agent, AppError>;
}

#[async_trait]
pub trait CheckoutStore: Send + Sync {
    async fn create_checkout(&self, session: CheckoutSession) -> Result<CheckoutSession, StoreError>;

    async fn get_checkout(&self, id: Uuid) -> Result<Option<CheckoutSession>, StoreError>;

    async fn update_checkout(
        &self,
        id: Uuid,
        mutation: CheckoutMutation,
    ) -> Result<CheckoutSession, AppError>;

    /// The session as it is now, then every later version of it.
    async fn watch_checkout(&self, id: Uuid) -> Result<CheckoutFeed, StoreError>;

    /// Every session written from now on.
    async fn watch_checkouts(&self) -> Result<CheckoutFeed, StoreError>;
}

pub trait DocumentStore: JobStore + AgentStore + CheckoutStore {}

impl<T> DocumentStore for T where T: JobStore + AgentStore + CheckoutStore {}
