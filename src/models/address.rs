use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::geo::GeoPoint;

/// An address as resolved by the geocoding collaborator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbeddedAddress {
    pub place_id: String,
    pub formatted: String,
    pub coordinates: GeoPoint,
    #[serde(default)]
    pub instructions: String,
}

impl EmbeddedAddress {
    pub fn validate(&self, field: &str) -> Result<(), AppError> {
        if self.place_id.trim().is_empty() || self.formatted.trim().is_empty() {
            return Err(AppError::Validation(format!("{field} address is missing")));
        }
        self.coordinates.validate()
    }
}

/// A job address: the resolved address plus the perturbed point shown to
/// agents before one of them commits to the job.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobAddress {
    #[serde(flatten)]
    pub address: EmbeddedAddress,
    pub obfuscated: GeoPoint,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Contact {
    pub name: String,
    pub phone: String,
    pub address: EmbeddedAddress,
}

impl Contact {
    pub fn validate(&self, field: &str) -> Result<(), AppError> {
        if self.name.trim().is_empty() {
            return Err(AppError::Validation(format!("{field} name cannot be empty")));
        }
        if self.phone.trim().is_empty() {
            return Err(AppError::Validation(format!("{field} phone cannot be empty")));
        }
        self.address.validate(field)
    }
}
