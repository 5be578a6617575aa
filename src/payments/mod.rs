//! Boundary with the payment collaborator. The engine writes a checkout
//! session document and waits for the collaborator to fill in the client
//! secret; capture confirmation arrives later through the webhook route.

pub mod simulator;

use std::time::Duration;

use tokio_stream::StreamExt;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::payment::{CheckoutSession, CheckoutStatus};
use crate::store::DocumentStore;

/// Waits, at most `limit`, for the session to carry a client secret.
pub async fn await_client_secret(
    store: &dyn DocumentStore,
    session_id: Uuid,
    limit: Duration,
) -> Result<CheckoutSession, AppError> {
    let mut feed = store.watch_checkout(session_id).await?;

    let wait = async {
        while let Some(item) = feed.next().await {
            let session = item?;
            match session.status {
                CheckoutStatus::Failed => {
                    return Err(AppError::ExternalService(
                        session
                            .error
                            .unwrap_or_else(|| "checkout session failed".to_string()),
                    ));
                }
                _ if session.client_secret.is_some() => return Ok(session),
                _ => {}
            }
        }
        Err::<CheckoutSession, AppError>(AppError::ExternalService(
            "checkout session feed closed".to_string(),
        ))
    };

    match tokio::time::timeout(limit, wait).await {
        Ok(result) => result,
        Err(_) => Err(AppError::PaymentTimeout),
    }
}
