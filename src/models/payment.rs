use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutStatus {
    Requested,
    Ready,
    Captured,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CheckoutMetadata {
    pub job_id: Uuid,
}

/// Checkout request document shared with the payment collaborator. The
/// engine writes the amount; the collaborator fills in `client_secret` and
/// later reports the capture.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CheckoutSession {
    pub id: Uuid,
    pub amount: i64,
    pub currency: String,
    pub metadata: CheckoutMetadata,
    pub status: CheckoutStatus,
    pub client_secret: Option<String>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CheckoutSession {
    pub fn request(job_id: Uuid, amount: i64, currency: &str, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            amount,
            currency: currency.to_lowercase(),
            metadata: CheckoutMetadata { job_id },
            status: CheckoutStatus::Requested,
            client_secret: None,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }
}
