use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geo::GeoPoint;
use crate::models::address::EmbeddedAddress;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ActiveStatus {
    Available,
    Busy,
    Offline,
    PendingApproval,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AgentStats {
    pub completed_count: u32,
    pub cancelled_count: u32,
    pub rating: f64,
    pub rating_count: u32,
    pub earnings: f64,
}

impl AgentStats {
    /// Folds one 1..=5 rating into the running average.
    pub fn record_rating(&mut self, stars: u8) {
        let stars = f64::from(stars.clamp(1, 5));
        let total = self.rating * f64::from(self.rating_count) + stars;
        self.rating_count += 1;
        self.rating = total / f64::from(self.rating_count);
    }
}

/// A delivery agent, keyed by the id of the user who owns it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    pub id: Uuid,
    pub name: String,
    pub active_status: ActiveStatus,
    pub approval_status: ApprovalStatus,
    pub home_address: EmbeddedAddress,
    pub current_location: Option<GeoPoint>,
    pub delivery_range_km: f64,
    pub stats: AgentStats,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Agent {
    /// Where matching measures from: live location if reported, else home.
    pub fn origin(&self) -> GeoPoint {
        self.current_location
            .unwrap_or(self.home_address.coordinates)
    }

    pub fn is_approved(&self) -> bool {
        self.approval_status == ApprovalStatus::Approved
    }
}

#[cfg(test)]
mod tests {
    use super::AgentStats;

    #[test]
    fn rating_is_a_running_average() {
        let mut stats = AgentStats::default();
        stats.record_rating(5);
        stats.record_rating(3);
        stats.record_rating(9);

        assert_eq!(stats.rating_count, 3);
        assert!((stats.rating - 13.0 / 3.0).abs() < 1e-9);
    }
}
