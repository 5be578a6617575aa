use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::job::{Job, JobStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Template {
    AgentAssigned,
    PackagePickedUp,
    DeliveryCompleted,
    DeliveryFailed,
    DeliveryRescheduled,
}

impl Template {
    pub fn name(&self) -> &'static str {
        match self {
            Template::AgentAssigned => "agent_assigned",
            Template::PackagePickedUp => "package_picked_up",
            Template::DeliveryCompleted => "delivery_completed",
            Template::DeliveryFailed => "delivery_failed",
            Template::DeliveryRescheduled => "delivery_rescheduled",
        }
    }
}

pub fn template_for(status: JobStatus) -> Option<Template> {
    match status {
        JobStatus::AwaitingAgent => None,
        JobStatus::AgentAccepted => Some(Template::AgentAssigned),
        JobStatus::PickedUp => Some(Template::PackagePickedUp),
        JobStatus::Delivered => Some(Template::DeliveryCompleted),
        JobStatus::Failed => Some(Template::DeliveryFailed),
        JobStatus::Rescheduled => Some(Template::DeliveryRescheduled),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NotificationRequest {
    pub recipient_id: Uuid,
    pub template_name: String,
    pub template_data: serde_json::Value,
}

/// Requests to send after `job` entered its current status. The sender is
/// always told; the assigned agent also hears about reschedules and failures.
pub fn requests_for(job: &Job, agent_name: Option<&str>) -> Vec<NotificationRequest> {
    let Some(template) = template_for(job.status()) else {
        return Vec::new();
    };

    let data = json!({
        "job_id": job.id,
        "status": job.status(),
        "sender_name": job.sender.name,
        "receiver_name": job.receiver.name,
        "agent_name": agent_name,
        "pickup": job.pickup.address.formatted,
        "delivery": job.delivery.address.formatted,
        "scheduled_date": job.schedule.date,
        "reschedule_count": job.reschedules.count(),
    });

    let mut recipients = vec![job.creator_id];
    if matches!(template, Template::DeliveryRescheduled | Template::DeliveryFailed) {
        recipients.extend(job.agent_id());
    }

    recipients
        .into_iter()
        .map(|recipient_id| NotificationRequest {
            recipient_id,
            template_name: template.name().to_string(),
            template_data: data.clone(),
        })
        .collect()
}

/// Handle to the outbound notify queue.
#[derive(Clone)]
pub struct Notifier {
    tx: mpsc::Sender<NotificationRequest>,
}

impl Notifier {
    pub fn new(queue_size: usize) -> (Self, mpsc::Receiver<NotificationRequest>) {
        let (tx, rx) = mpsc::channel(queue_size.max(1));
        (Self { tx }, rx)
    }

    /// Never waits: a full queue rejects the request.
    pub fn enqueue(&self, request: NotificationRequest) -> Result<(), AppError> {
        self.tx.try_send(request).map_err(|err| match err {
            TrySendError::Full(_) => AppError::Internal("notification queue is full".to_string()),
            TrySendError::Closed(_) => AppError::Internal("notification queue is closed".to_string()),
        })
    }

    /// The transition is already persisted when this runs, so a full or
    /// closed queue drops the request with a warning and is not surfaced to
    /// the caller.
    pub fn job_changed(&self, job: &Job, agent_name: Option<&str>) {
        for request in requests_for(job, agent_name) {
            if let Err(err) = self.enqueue(request) {
                warn!(job_id = %job.id, error = %err, "failed to enqueue notification");
            }
        }
    }
}

/// Drains the notify queue. Rendering and delivery belong to the mail
/// collaborator; this hands requests over and records them.
pub async fn run_notification_dispatcher(mut rx: mpsc::Receiver<NotificationRequest>) {
    info!("notification dispatcher started");

    while let Some(request) = rx.recv().await {
        info!(
            recipient_id = %request.recipient_id,
            template = %request.template_name,
            "notification queued for delivery"
        );
    }

    warn!("notification dispatcher stopped: queue channel closed");
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::{Notifier, requests_for, template_for};
    use crate::models::job::JobStatus;
    use crate::test_support::{accepted_job, new_job};

    #[test]
    fn every_status_but_awaiting_agent_has_a_template() {
        let expected = [
            (JobStatus::AwaitingAgent, None),
            (JobStatus::AgentAccepted, Some("agent_assigned")),
            (JobStatus::PickedUp, Some("package_picked_up")),
            (JobStatus::Delivered, Some("delivery_completed")),
            (JobStatus::Failed, Some("delivery_failed")),
            (JobStatus::Rescheduled, Some("delivery_rescheduled")),
        ];

        for (status, name) in expected {
            assert_eq!(template_for(status).map(|t| t.name()), name);
        }
    }

    #[test]
    fn open_job_produces_no_requests() {
        assert!(requests_for(&new_job(Uuid::new_v4()), None).is_empty());
    }

    #[tokio::test]
    async fn accepted_job_notifies_the_sender() {
        let (notifier, mut rx) = Notifier::new(8);
        let job = accepted_job(Uuid::new_v4(), 2);

        notifier.job_changed(&job, Some("Alex"));

        let request = rx.recv().await.unwrap();
        assert_eq!(request.recipient_id, job.creator_id);
        assert_eq!(request.template_name, "agent_assigned");
        assert_eq!(request.template_data["agent_name"], "Alex");
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn full_queue_drops_requests_without_waiting() {
        let (notifier, mut rx) = Notifier::new(1);
        let mut job = accepted_job(Uuid::new_v4(), 2);
        job.lifecycle.reschedule(false).unwrap();
        assert_eq!(requests_for(&job, None).len(), 2);

        notifier.job_changed(&job, None);

        assert_eq!(rx.try_recv().unwrap().recipient_id, job.creator_id);
        assert!(rx.try_recv().is_err());
    }
}
