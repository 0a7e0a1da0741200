use _model::{Coordinate, Provider};
use anyhow::{Context, Result};
use serde::Deserialize;
use ureq::Agent;

use crate::config::KeyConfig;

use super::{GeocodeFailure, Geocoder};

const ENDPOINT: &str = "https://dev.virtualearth.net/REST/v1/Locations";

pub struct Bing {
    agent: Agent,
    endpoint: String,
    key: String,
}

impl Bing {
    pub fn new(agent: Agent, config: &KeyConfig) -> Result<Self> {
        Ok(Self {
            agent,
            endpoint: config.endpoint.clone().unwrap_or_else(|| ENDPOINT.to_string()),
            key: config
                .resolve("BING_API_KEY")
                .context("No Bing key: set credentials.bing.key or BING_API_KEY")?,
        })
    }
}

impl Geocoder for Bing {
    fn provider(&self) -> Provider {
        Provider::Bing
    }

    fn geocode(&self, address: &str) -> Result<Coordinate, GeocodeFailure> {
        let response: Response = self
            .agent
            .get(&self.endpoint)
            .query("q", address)
            .query("maxResults", "1")
            .query("key", &self.key)
            .call()?
            .into_json()?;
        response.coordinate()
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Response {
    #[serde(default)]
    resource_sets: Vec<ResourceSet>,
    #[serde(default)]
    error_details: Vec<String>,
}

#[derive(Deserialize)]
struct ResourceSet {
    #[serde(default)]
    resources: Vec<Resource>,
}

#[derive(Deserialize)]
struct Resource {
    point: Option<Point>,
}

// [latitude, longitude]
#[derive(Deserialize)]
struct Point {
    coordinates: Vec<Option<f64>>,
}

impl Response {
    fn coordinate(self) -> Result<Coordinate, GeocodeFailure> {
        if !self.error_details.is_empty() {
            return Err(GeocodeFailure::Rejected(self.error_details.join("; ")));
        }

        let resource = self
            .resource_sets
            .into_iter()
            .flat_map(|x| x.resources)
            .next()
            .ok_or(GeocodeFailure::NoCandidate)?;
        let coordinates = resource.point.map(|x| x.coordinates).unwrap_or_default();
        Ok(Coordinate::from_parts(
            coordinates.first().copied().flatten(),
            coordinates.get(1).copied().flatten(),
        )?)
    }
}
