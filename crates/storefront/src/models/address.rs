//! Saved delivery addresses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use thiserror::Error;

use ahmed_mart_core::geo::GeoPoint;
use ahmed_mart_core::order::AddressSnapshot;
use ahmed_mart_core::{AddressId, AddressType, Pincode, PincodeError, UserId};

/// A saved address.
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct Address {
    pub id: AddressId,
    pub user_id: UserId,
    pub address_type: AddressType,
    pub address_line1: String,
    pub address_line2: Option<String>,
    pub landmark: Option<String>,
    pub city: String,
    pub state: String,
    pub pincode: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Address {
    /// Frozen copy for embedding in an order.
    #[must_use]
    pub fn snapshot(&self) -> AddressSnapshot {
        AddressSnapshot {
            address_type: self.address_type,
            address_line1: self.address_line1.clone(),
            address_line2: self.address_line2.clone(),
            landmark: self.landmark.clone(),
            city: self.city.clone(),
            state: self.state.clone(),
            pincode: self.pincode.clone(),
            latitude: self.latitude,
            longitude: self.longitude,
        }
    }
}

/// Address validation failures, surfaced before anything is written.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    #[error("{0} is required")]
    MissingField(&'static str),
    #[error(transparent)]
    Pincode(#[from] PincodeError),
    #[error("latitude and longitude must be given together")]
    PartialCoordinates,
    #[error("coordinates are out of range")]
    InvalidCoordinates,
}

/// Create/update payload for an address.
#[derive(Debug, Clone, Deserialize)]
pub struct AddressInput {
    #[serde(default)]
    pub address_type: AddressType,
    pub address_line1: String,
    pub address_line2: Option<String>,
    pub landmark: Option<String>,
    pub city: String,
    pub state: String,
    pub pincode: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    #[serde(default)]
    pub is_default: bool,
}

impl AddressInput {
    /// Check required fields, the pincode and the coordinates.
    ///
    /// Returns the parsed pincode to store.
    ///
    /// # Errors
    ///
    /// Returns the first [`AddressError`] found.
    pub fn validate(&self) -> Result<Pincode, AddressError> {
        for (name, value) in [
            ("address_line1", &self.address_line1),
            ("city", &self.city),
            ("state", &self.state),
        ] {
            if value.trim().is_empty() {
                return Err(AddressError::MissingField(name));
            }
        }

        let pincode = Pincode::parse(&self.pincode)?;

        match (self.latitude, self.longitude) {
            (None, None) => {}
            (Some(lat), Some(lng)) => {
                if !GeoPoint::new(lat, lng).is_valid() {
                    return Err(AddressError::InvalidCoordinates);
                }
            }
            _ => return Err(AddressError::PartialCoordinates),
        }

        Ok(pincode)
    }
}

/// Trim an optional text field, dropping it when blank.
pub(crate) fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
