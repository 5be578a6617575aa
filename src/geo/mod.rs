use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

const EARTH_RADIUS_KM: f64 = 6_371.0;
const METERS_PER_DEGREE_LAT: f64 = 111_320.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Rejects NaN/infinite components and anything outside
    /// [-90, 90] x [-180, 180].
    pub fn validate(&self) -> Result<(), AppError> {
        let lat_ok = self.lat.is_finite() && (-90.0..=90.0).contains(&self.lat);
        let lng_ok = self.lng.is_finite() && (-180.0..=180.0).contains(&self.lng);

        if lat_ok && lng_ok {
            Ok(())
        } else {
            Err(AppError::InvalidCoordinate {
                lat: self.lat,
                lng: self.lng,
            })
        }
    }
}

/// Great-circle distance in kilometres.
pub fn distance_km(a: &GeoPoint, b: &GeoPoint) -> Result<f64, AppError> {
    a.validate()?;
    b.validate()?;
    Ok(haversine_km(a, b))
}

/// True when `target` lies within `range_km` of `origin`. Symmetric in the
/// two points.
pub fn within_range(origin: &GeoPoint, target: &GeoPoint, range_km: f64) -> Result<bool, AppError> {
    if !range_km.is_finite() || range_km < 0.0 {
        return Err(AppError::Validation(format!(
            "range must be a non-negative number of km, got {range_km}"
        )));
    }

    Ok(distance_km(origin, target)? <= range_km)
}

fn haversine_km(a: &GeoPoint, b: &GeoPoint) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let delta_lat = (b.lat - a.lat).to_radians();
    let delta_lng = (b.lng - a.lng).to_radians();

    let sin_lat = (delta_lat / 2.0).sin();
    let sin_lng = (delta_lng / 2.0).sin();

    let haversine = sin_lat * sin_lat + lat1.cos() * lat2.cos() * sin_lng * sin_lng;
    let central_angle = 2.0 * haversine.clamp(0.0, 1.0).sqrt().asin();

    EARTH_RADIUS_KM * central_angle
}

/// Moves `point` by a random offset of at most `max_offset_m` metres, in a
/// random direction. Used for the coordinates shown before a job has an agent.
pub fn obfuscate<R: Rng + ?Sized>(point: &GeoPoint, max_offset_m: f64, rng: &mut R) -> GeoPoint {
    if max_offset_m <= 0.0 {
        return *point;
    }

    // sqrt keeps the offsets uniform over the disc instead of bunching at the centre
    let offset_m = max_offset_m * rng.gen_range(0.0_f64..1.0).sqrt();
    let bearing = rng.gen_range(0.0..std::f64::consts::TAU);

    let delta_lat = offset_m * bearing.cos() / METERS_PER_DEGREE_LAT;
    let lng_scale = (METERS_PER_DEGREE_LAT * point.lat.to_radians().cos()).max(1.0);
    let delta_lng = offset_m * bearing.sin() / lng_scale;

    GeoPoint {
        lat: (point.lat + delta_lat).clamp(-90.0, 90.0),
        lng: wrap_longitude(point.lng + delta_lng),
    }
}

fn wrap_longitude(lng: f64) -> f64 {
    if lng > 180.0 {
        lng - 360.0
    } else if lng < -180.0 {
        lng + 360.0
    } else {
        lng
    }
}
