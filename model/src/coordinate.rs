use serde::{Deserialize, Serialize};
use thiserror::Error;

/// WGS84 latitude/longitude in degrees.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("invalid coordinate (latitude {latitude:?}, longitude {longitude:?})")]
pub struct InvalidCoordinateError {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, InvalidCoordinateError> {
        Self::from_parts(Some(latitude), Some(longitude))
    }

    /// Builds a coordinate from components that may be missing, as they come
    /// back from providers and source tables.
    pub fn from_parts(
        latitude: Option<f64>,
        longitude: Option<f64>,
    ) -> Result<Self, InvalidCoordinateError> {
        match (latitude, longitude) {
            (Some(latitude), Some(longitude)) => {
                let x = Self {
                    latitude,
                    longitude,
                };
                x.validate()?;
                Ok(x)
            }
            _ => Err(InvalidCoordinateError {
                latitude,
                longitude,
            }),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }

    // fields are public, so anything handed to a calculation is checked again
    pub fn validate(&self) -> Result<(), InvalidCoordinateError> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(InvalidCoordinateError {
                latitude: Some(self.latitude).filter(|x| !x.is_nan()),
                longitude: Some(self.longitude).filter(|x| !x.is_nan()),
            })
        }
    }
}
