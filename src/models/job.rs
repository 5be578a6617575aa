use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::engine::handshake::SecretCode;
use crate::engine::lifecycle::Lifecycle;
use crate::engine::reschedule::RescheduleLedger;
use crate::error::AppError;
use crate::geo::obfuscate;
use crate::models::address::{Contact, EmbeddedAddress, JobAddress};
use crate::models::sender::SenderProfile;

/// Lifecycle stage as seen by the assigned agent.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    AwaitingAgent,
    AgentAccepted,
    PickedUp,
    Delivered,
    Failed,
    Rescheduled,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::AwaitingAgent => "awaiting_agent",
            JobStatus::AgentAccepted => "agent_accepted",
            JobStatus::PickedUp => "picked_up",
            JobStatus::Delivered => "delivered",
            JobStatus::Failed => "failed",
            JobStatus::Rescheduled => "rescheduled",
        }
    }
}

/// Lifecycle stage as seen by payment and billing.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    AwaitingPrepayment,
    Prepaid,
    Processing,
    Completed,
    Cancelled,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::AwaitingPrepayment => "awaiting_prepayment",
            JobState::Prepaid => "prepaid",
            JobState::Processing => "processing",
            JobState::Completed => "completed",
            JobState::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct StatusPair {
    pub status: JobStatus,
    pub state: JobState,
}

impl fmt::Display for StatusPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.status.as_str(), self.state.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Schedule {
    pub date: NaiveDate,
    pub window_start: NaiveTime,
    pub window_end: NaiveTime,
}

impl Schedule {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.window_start >= self.window_end {
            return Err(AppError::Validation(
                "time window must start before it ends".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Dimensions {
    pub length_cm: f64,
    pub width_cm: f64,
    pub height_cm: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Package {
    pub description: String,
    pub weight_kg: f64,
    pub dimensions: Dimensions,
    pub category: String,
    #[serde(default)]
    pub fragile: bool,
    #[serde(default)]
    pub comment: String,
}

impl Package {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.description.trim().is_empty() {
            return Err(AppError::Validation(
                "package description cannot be empty".to_string(),
            ));
        }

        let measures = [
            self.weight_kg,
            self.dimensions.length_cm,
            self.dimensions.width_cm,
            self.dimensions.height_cm,
        ];
        if measures.iter().any(|m| !m.is_finite() || *m <= 0.0) {
            return Err(AppError::Validation(
                "package weight and dimensions must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    #[serde(flatten)]
    pub lifecycle: Lifecycle,
    pub creator_id: Uuid,
    pub sender_profile: SenderProfile,
    pub sender: Contact,
    pub receiver: Contact,
    pub pickup: JobAddress,
    pub delivery: JobAddress,
    pub billing: EmbeddedAddress,
    pub schedule: Schedule,
    pub package: Package,
    pub price: f64,
    pub secret_code: SecretCode,
    #[serde(flatten)]
    pub reschedules: RescheduleLedger,
    pub picked_up_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub rating: Option<u8>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Everything a sender supplies when creating a job. Addresses arrive
/// already resolved by the geocoding collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewJob {
    pub sender_profile: SenderProfile,
    pub sender_phone: String,
    pub sender_address: EmbeddedAddress,
    pub receiver: Contact,
    pub pickup: EmbeddedAddress,
    pub delivery: EmbeddedAddress,
    pub billing: Option<EmbeddedAddress>,
    pub schedule: Schedule,
    pub package: Package,
    pub price: f64,
}

impl NewJob {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.sender_profile.display_name().is_empty() {
            return Err(AppError::Validation("sender name cannot be empty".to_string()));
        }
        if self.sender_phone.trim().is_empty() {
            return Err(AppError::Validation("sender phone cannot be empty".to_string()));
        }
        self.sender_address.validate("sender")?;
        self.receiver.validate("receiver")?;
        self.pickup.validate("pickup")?;
        self.delivery.validate("delivery")?;
        if let Some(billing) = &self.billing {
            billing.validate("billing")?;
        }
        self.schedule.validate()?;
        self.package.validate()?;
        validate_price(self.price)
    }
}

/// Knobs applied when a job is created.
#[derive(Debug, Clone, Copy)]
pub struct JobDefaults {
    pub max_reschedules: u32,
    pub obfuscation_radius_m: f64,
}

impl Job {
    /// Builds a job in its initial state: perturbed display coordinates,
    /// a fresh secret code, `(awaiting_agent, awaiting_prepayment)`.
    pub fn create<R: Rng + ?Sized>(
        creator_id: Uuid,
        input: NewJob,
        defaults: JobDefaults,
        rng: &mut R,
        now: DateTime<Utc>,
    ) -> Result<Job, AppError> {
        input.validate()?;

        let pickup = job_address(input.pickup, defaults.obfuscation_radius_m, rng);
        let delivery = job_address(input.delivery, defaults.obfuscation_radius_m, rng);
        let billing = input
            .billing
            .unwrap_or_else(|| input.sender_address.clone());

        Ok(Job {
            id: Uuid::new_v4(),
            lifecycle: Lifecycle::new(),
            creator_id,
            sender: Contact {
                name: input.sender_profile.display_name(),
                phone: input.sender_phone,
                address: input.sender_address,
            },
            sender_profile: input.sender_profile,
            receiver: input.receiver,
            pickup,
            delivery,
            billing,
            schedule: input.schedule,
            package: input.package,
            price: input.price,
            secret_code: SecretCode::generate(rng),
            reschedules: RescheduleLedger::new(defaults.max_reschedules),
            picked_up_at: None,
            delivered_at: None,
            rating: None,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn status(&self) -> JobStatus {
        self.lifecycle.pair().status
    }

    pub fn state(&self) -> JobState {
        self.lifecycle.pair().state
    }

    pub fn agent_id(&self) -> Option<Uuid> {
        self.lifecycle.agent_id()
    }

    pub fn is_deleted(&self) -> bool {
        self.lifecycle.is_deleted()
    }

    /// Price in integer minor units (cents) for the payment collaborator.
    pub fn amount_minor_units(&self) -> i64 {
        (self.price * 100.0).round() as i64
    }
}

pub fn job_address<R: Rng + ?Sized>(
    address: EmbeddedAddress,
    obfuscation_radius_m: f64,
    rng: &mut R,
) -> JobAddress {
    let obfuscated = obfuscate(&address.coordinates, obfuscation_radius_m, rng);
    JobAddress {
        address,
        obfuscated,
    }
}

pub fn validate_price(price: f64) -> Result<(), AppError> {
    if !price.is_finite() || price <= 0.0 {
        return Err(AppError::Validation("price must be > 0".to_string()));
    }
    Ok(())
}
