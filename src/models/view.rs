use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::engine::reschedule::RescheduleRecord;
use crate::geo::GeoPoint;
use crate::models::actor::Actor;
use crate::models::address::{Contact, JobAddress};
use crate::models::job::{Job, JobState, JobStatus, Package, Schedule};

/// Who a job is being shown to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    /// The sender who created the job, or an admin.
    Owner,
    /// An agent; sees full details only for jobs assigned to them.
    Agent(Uuid),
}

impl Audience {
    pub fn for_actor(actor: &Actor, job: &Job) -> Self {
        if actor.is_admin || actor.id == job.creator_id {
            Audience::Owner
        } else {
            Audience::Agent(actor.id)
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AddressView {
    pub place_id: Option<String>,
    pub formatted: Option<String>,
    pub coordinates: GeoPoint,
    pub instructions: Option<String>,
    pub approximate: bool,
}

impl AddressView {
    fn exact(address: &JobAddress) -> Self {
        Self {
            place_id: Some(address.address.place_id.clone()),
            formatted: Some(address.address.formatted.clone()),
            coordinates: address.address.coordinates,
            instructions: Some(address.address.instructions.clone()),
            approximate: false,
        }
    }

    fn approximate(address: &JobAddress) -> Self {
        Self {
            place_id: None,
            formatted: None,
            coordinates: address.obfuscated,
            instructions: None,
            approximate: true,
        }
    }
}

/// The public shape of a job as delivered to clients and subscribers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobView {
    pub id: Uuid,
    pub status: JobStatus,
    pub state: JobState,
    pub creator_id: Uuid,
    pub agent_id: Option<Uuid>,
    pub agent_name: Option<String>,
    pub sender: Option<Contact>,
    pub receiver: Option<Contact>,
    pub pickup: AddressView,
    pub delivery: AddressView,
    pub schedule: Schedule,
    pub package: Package,
    pub price: f64,
    pub secret_code: Option<String>,
    pub reschedule_count: u32,
    pub max_reschedules: u32,
    pub reschedule_history: Vec<RescheduleRecord>,
    pub deleted: bool,
    pub picked_up_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub rating: Option<u8>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl JobView {
    pub fn project(job: &Job, audience: Audience, agent_name: Option<String>) -> Self {
        let (reveal, is_owner) = match audience {
            Audience::Owner => (true, true),
            Audience::Agent(agent_id) => (job.agent_id() == Some(agent_id), false),
        };

        let address = |a: &JobAddress| {
            if reveal {
                AddressView::exact(a)
            } else {
                AddressView::approximate(a)
            }
        };

        Self {
            id: job.id,
            status: job.status(),
            state: job.state(),
            creator_id: job.creator_id,
            agent_id: job.agent_id(),
            agent_name,
            sender: reveal.then(|| job.sender.clone()),
            receiver: reveal.then(|| job.receiver.clone()),
            pickup: address(&job.pickup),
            delivery: address(&job.delivery),
            schedule: job.schedule.clone(),
            package: job.package.clone(),
            price: job.price,
            secret_code: is_owner.then(|| job.secret_code.reveal().to_string()),
            reschedule_count: job.reschedules.count(),
            max_reschedules: job.reschedules.max(),
            reschedule_history: job.reschedules.history().to_vec(),
            deleted: job.is_deleted(),
            picked_up_at: job.picked_up_at,
            delivered_at: job.delivered_at,
            rating: job.rating,
            created_at: job.created_at,
            updated_at: job.updated_at,
        }
    }
}
