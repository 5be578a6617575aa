use std::sync::Arc;

use tokio::sync::mpsc;

use crate::engine::dispatch::{DispatchEngine, DispatchSettings};
use crate::engine::notify::{NotificationRequest, Notifier};
use crate::observability::metrics::Metrics;
use crate::store::{DocumentStore, InMemoryStore};

pub struct AppState {
    pub store: Arc<InMemoryStore>,
    pub engine: DispatchEngine,
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(
        settings: DispatchSettings,
        notification_queue_size: usize,
        event_buffer_size: usize,
    ) -> (Self, mpsc::Receiver<NotificationRequest>) {
        let store = Arc::new(InMemoryStore::new(event_buffer_size));
        let metrics = Metrics::new();
        let (notifier, notification_rx) = Notifier::new(notification_queue_size);

        let engine = DispatchEngine::new(
            Arc::clone(&store) as Arc<dyn DocumentStore>,
            notifier,
            metrics.clone(),
            settings,
        );

        (
            Self {
                store,
                engine,
                metrics,
            },
            notification_rx,
        )
    }
}
