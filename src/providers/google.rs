use _model::{Coordinate, Provider};
use anyhow::{Context, Result};
use serde::Deserialize;
use ureq::Agent;

use crate::config::KeyConfig;

use super::{GeocodeFailure, Geocoder};

const ENDPOINT: &str = "https://maps.googleapis.com/maps/api/geocode/json";

pub struct Google {
    agent: Agent,
    endpoint: String,
    key: String,
}

impl Google {
    pub fn new(agent: Agent, config: &KeyConfig) -> Result<Self> {
        Ok(Self {
            agent,
            endpoint: config.endpoint.clone().unwrap_or_else(|| ENDPOINT.to_string()),
            key: config
                .resolve("GOOGLE_API_KEY")
                .context("No Google API key: set credentials.google.key or GOOGLE_API_KEY")?,
        })
    }
}

impl Geocoder for Google {
    fn provider(&self) -> Provider {
        Provider::Google
    }

    fn geocode(&self, address: &str) -> Result<Coordinate, GeocodeFailure> {
        let response: Response = self
            .agent
            .get(&self.endpoint)
            .query("address", address)
            .query("key", &self.key)
            .call()?
            .into_json()?;
        response.coordinate()
    }
}

#[derive(Deserialize)]
struct Response {
    status: String,
    error_message: Option<String>,
    #[serde(default)]
    results: Vec<GeocodeResult>,
}

#[derive(Deserialize)]
struct GeocodeResult {
    geometry: Geometry,
}

#[derive(Deserialize)]
struct Geometry {
    location: Location,
}

#[derive(Deserialize)]
struct Location {
    lat: Option<f64>,
    lng: Option<f64>,
}

impl Response {
    fn coordinate(self) -> Result<Coordinate, GeocodeFailure> {
        match self.status.as_str() {
            "OK" => {}
            "ZERO_RESULTS" => return Err(GeocodeFailure::NoCandidate),
            status => {
                return Err(GeocodeFailure::Rejected(match self.error_message {
                    Some(message) => format!("{status}: {message}"),
                    None => status.to_string(),
                }))
            }
        }

        let x = self
            .results
            .into_iter()
            .next()
            .ok_or(GeocodeFailure::NoCandidate)?;
        let location = x.geometry.location;
        Ok(Coordinate::from_parts(location.lat, location.lng)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(json: &str) -> Result<Coordinate, GeocodeFailure> {
        serde_json::from_str::<Response>(json).unwrap().coordinate()
    }

    #[test]
    fn ok() {
        let x = decode(
            r#"{"status":"OK","results":[{"formatted_address":"A",
                "geometry":{"location":{"lat":32.7757,"lng":-117.0719},"location_type":"ROOFTOP"}}]}"#,
        )
        .unwrap();
        assert_eq!(x, Coordinate::new(32.7757, -117.0719).unwrap());
    }

    #[test]
    fn endpoint_and_key() {
        let config = KeyConfig {
            key: Some("abc".to_string()),
            endpoint: None,
        };
        let x = Google::new(ureq::agent(), &config).unwrap();
        assert_eq!(x.endpoint, ENDPOINT);
        assert_eq!(x.key, "abc");

        let config = KeyConfig {
            key: Some("abc".to_string()),
            endpoint: Some("http://localhost:8080/geocode".to_string()),
        };
        let x = Google::new(ureq::agent(), &config).unwrap();
        assert_eq!(x.endpoint, "http://localhost:8080/geocode");
    }

    #[test]
    fn failures() {
        assert!(matches!(
            decode(r#"{"status":"ZERO_RESULTS","results":[]}"#),
            Err(GeocodeFailure::NoCandidate)
        ));
        match decode(r#"{"status":"REQUEST_DENIED","error_message":"bad key"}"#) {
            Err(GeocodeFailure::Rejected(x)) => assert_eq!(x, "REQUEST_DENIED: bad key"),
            _ => panic!("expected rejection"),
        }
        assert!(matches!(
            decode(r#"{"status":"OK","results":[{"geometry":{"location":{"lat":null,"lng":1.0}}}]}"#),
            Err(GeocodeFailure::NullCoordinate(_))
        ));
    }
}
