use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::routing::post;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::job::{JobState, JobStatus};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/payments/webhook", post(payment_webhook))
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentOutcome {
    Captured,
    Failed,
}

/// Verdict pushed by the payment collaborator for one checkout session.
#[derive(Deserialize)]
pub struct PaymentWebhook {
    pub session_id: Uuid,
    pub outcome: PaymentOutcome,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Serialize)]
pub struct WebhookAck {
    pub session_id: Uuid,
    pub job_id: Uuid,
    pub status: Option<JobStatus>,
    pub state: Option<JobState>,
}

async fn payment_webhook(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<PaymentWebhook>,
) -> Result<Json<WebhookAck>, AppError> {
    match payload.outcome {
        PaymentOutcome::Captured => {
            let job = state.engine.confirm_payment(payload.session_id).await?;
            Ok(Json(WebhookAck {
                session_id: payload.session_id,
                job_id: job.id,
                status: Some(job.status()),
                state: Some(job.state()),
            }))
        }
        PaymentOutcome::Failed => {
            let session = state
                .engine
                .fail_payment(payload.session_id, payload.error)
                .await?;
            Ok(Json(WebhookAck {
                session_id: session.id,
                job_id: session.metadata.job_id,
                status: None,
                state: None,
            }))
        }
    }
}
