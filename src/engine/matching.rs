use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::geo::{GeoPoint, distance_km, within_range};
use crate::models::agent::Agent;
use crate::models::job::Job;

/// "Both ends of the job within `range_km` of `origin`."
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RangeFilter {
    pub origin: GeoPoint,
    pub range_km: f64,
}

impl RangeFilter {
    pub fn for_agent(agent: &Agent) -> Self {
        Self {
            origin: agent.origin(),
            range_km: agent.delivery_range_km,
        }
    }

    /// Measured against the true coordinates, never the obfuscated ones.
    pub fn qualifies(&self, job: &Job) -> Result<bool, AppError> {
        Ok(
            within_range(&self.origin, &job.pickup.address.coordinates, self.range_km)?
                && within_range(&self.origin, &job.delivery.address.coordinates, self.range_km)?,
        )
    }
}

/// Keeps the jobs that qualify, closest pickup first. Jobs whose stored
/// coordinates are unusable are skipped.
pub fn rank_by_pickup_distance(filter: &RangeFilter, jobs: Vec<Job>) -> Vec<Job> {
    let mut candidates: Vec<(f64, Job)> = jobs
        .into_iter()
        .filter_map(|job| {
            if !filter.qualifies(&job).unwrap_or(false) {
                return None;
            }
            let distance = distance_km(&filter.origin, &job.pickup.address.coordinates).ok()?;
            Some((distance, job))
        })
        .collect();

    candidates.sort_by(|a, b| a.0.total_cmp(&b.0));
    candidates.into_iter().map(|(_, job)| job).collect()
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use uuid::Uuid;

    use super::{RangeFilter, rank_by_pickup_distance};
    use crate::geo::GeoPoint;
    use crate::models::job::{Job, JobDefaults};
    use crate::test_support::new_job_input;

    fn job_between(pickup: GeoPoint, delivery: GeoPoint) -> Job {
        let mut rng = StdRng::seed_from_u64(3);
        Job::create(
            Uuid::new_v4(),
            new_job_input(pickup, delivery, 10.0),
            JobDefaults {
                max_reschedules: 2,
                obfuscation_radius_m: 300.0,
            },
            &mut rng,
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn both_ends_must_be_in_range() {
        let job = job_between(GeoPoint::new(48.8566, 2.3522), GeoPoint::new(48.8738, 2.2950));
        let home = GeoPoint::new(48.8600, 2.3400);

        let wide = RangeFilter {
            origin: home,
            range_km: 10.0,
        };
        let narrow = RangeFilter {
            origin: home,
            range_km: 1.0,
        };

        assert!(wide.qualifies(&job).unwrap());
        // the pickup is under 1 km away, the delivery is not
        assert!(!narrow.qualifies(&job).unwrap());
    }

    #[test]
    fn closer_pickup_ranks_first() {
        let home = GeoPoint::new(48.8600, 2.3400);
        let far = job_between(GeoPoint::new(48.8900, 2.3600), GeoPoint::new(48.8600, 2.3400));
        let near = job_between(GeoPoint::new(48.8610, 2.3410), GeoPoint::new(48.8700, 2.3500));
        let out_of_range =
            job_between(GeoPoint::new(45.7640, 4.8357), GeoPoint::new(48.8600, 2.3400));

        let ranked = rank_by_pickup_distance(
            &RangeFilter {
                origin: home,
                range_km: 10.0,
            },
            vec![far.clone(), out_of_range, near.clone()],
        );

        let ids: Vec<Uuid> = ranked.iter().map(|job| job.id).collect();
        assert_eq!(ids, vec![near.id, far.id]);
    }
}
