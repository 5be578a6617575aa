use std::sync::Arc;

use rand::Rng;
use rand::distributions::Alphanumeric;
use tokio::task::JoinHandle;
use tokio_stream::StreamExt;
use tracing::{info, warn};

use crate::models::payment::{CheckoutSession, CheckoutStatus};
use crate::store::{CheckoutFeed, DocumentStore, StoreError};

/// Stand-in for the hosted payment collaborator in development and tests:
/// answers every new checkout session with a client secret. Captures are
/// still reported through the webhook.
pub async fn spawn_payment_simulator(
    store: Arc<dyn DocumentStore>,
) -> Result<JoinHandle<()>, StoreError> {
    // subscribe before returning so no session created afterwards is missed
    let feed = store.watch_checkouts().await?;
    Ok(tokio::spawn(run_payment_simulator(store, feed)))
}

async fn run_payment_simulator(store: Arc<dyn DocumentStore>, mut feed: CheckoutFeed) {
    info!("payment simulator started");

    while let Some(item) = feed.next().await {
        let session = match item {
            Ok(session) => session,
            Err(err) => {
                warn!(error = %err, "payment simulator missed checkout events");
                continue;
            }
        };

        if session.status != CheckoutStatus::Requested {
            continue;
        }

        let secret: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(24)
            .map(char::from)
            .collect();

        let result = store
            .update_checkout(
                session.id,
                Box::new(move |s: &mut CheckoutSession| {
                    if s.status == CheckoutStatus::Requested {
                        s.client_secret = Some(format!("{}_secret_{secret}", s.id.simple()));
                        s.status = CheckoutStatus::Ready;
                    }
                    Ok(())
                }),
            )
            .await;

        if let Err(err) = result {
            warn!(session_id = %session.id, error = %err, "payment simulator failed to answer");
        }
    }
}
