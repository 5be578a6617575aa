use chrono::{NaiveDate, NaiveTime, Utc};
use rand::SeedableRng;
use rand::rngs::StdRng;
use uuid::Uuid;

use crate::geo::GeoPoint;
use crate::models::address::{Contact, EmbeddedAddress};
use crate::models::job::{Dimensions, Job, JobDefaults, NewJob, Package, Schedule};
use crate::models::sender::SenderProfile;

pub fn address(label: &str, lat: f64, lng: f64) -> EmbeddedAddress {
    EmbeddedAddress {
        place_id: format!("place-{label}"),
        formatted: format!("{label} street 1"),
        coordinates: GeoPoint::new(lat, lng),
        instructions: String::new(),
    }
}

pub fn new_job_input(pickup: GeoPoint, delivery: GeoPoint, price: f64) -> NewJob {
    NewJob {
        sender_profile: SenderProfile::Individual {
            first_name: "Sam".to_string(),
            last_name: "Sender".to_string(),
        },
        sender_phone: "+33100000000".to_string(),
        sender_address: address("sender", pickup.lat, pickup.lng),
        receiver: Contact {
            name: "Rita Receiver".to_string(),
            phone: "+33100000001".to_string(),
            address: address("receiver", delivery.lat, delivery.lng),
        },
        pickup: address("pickup", pickup.lat, pickup.lng),
        delivery: address("delivery", delivery.lat, delivery.lng),
        billing: None,
        schedule: Schedule {
            date: NaiveDate::from_ymd_opt(2026, 11, 2).unwrap(),
            window_start: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            window_end: NaiveTime::from_hms_opt(12, 0, 0).unwrap(),
        },
        package: Package {
            description: "books".to_string(),
            weight_kg: 2.5,
            dimensions: Dimensions {
                length_cm: 30.0,
                width_cm: 20.0,
                height_cm: 10.0,
            },
            category: "parcel".to_string(),
            fragile: false,
            comment: String::new(),
        },
        price,
    }
}

pub fn new_job_with_max(creator: Uuid, max_reschedules: u32) -> Job {
    let mut rng = StdRng::seed_from_u64(1);
    Job::create(
        creator,
        new_job_input(
            GeoPoint::new(48.8566, 2.3522),
            GeoPoint::new(48.8738, 2.2950),
            25.5,
        ),
        JobDefaults {
            max_reschedules,
            obfuscation_radius_m: 300.0,
        },
        &mut rng,
        Utc::now(),
    )
    .unwrap()
}

pub fn new_job(creator: Uuid) -> Job {
    new_job_with_max(creator, 2)
}

pub fn accepted_job(agent: Uuid, max_reschedules: u32) -> Job {
    let mut job = new_job_with_max(Uuid::new_v4(), max_reschedules);
    job.lifecycle.capture_payment().unwrap();
    job.lifecycle.accept(agent).unwrap();
    job
}

pub fn picked_up_job(agent: Uuid) -> Job {
    let mut job = accepted_job(agent, 2);
    job.lifecycle.confirm_pickup().unwrap();
    job.picked_up_at = Some(Utc::now());
    job
}
