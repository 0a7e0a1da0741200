use _model::{Coordinate, Provider};
use anyhow::{Context, Result};
use serde::Deserialize;
use ureq::Agent;

use crate::config::KeyConfig;

use super::{GeocodeFailure, Geocoder};

const ENDPOINT: &str =
    "https://geocode.arcgis.com/arcgis/rest/services/World/GeocodeServer/findAddressCandidates";

pub struct ArcGis {
    agent: Agent,
    endpoint: String,
    token: String,
}

impl ArcGis {
    pub fn new(agent: Agent, config: &KeyConfig) -> Result<Self> {
        Ok(Self {
            agent,
            endpoint: config.endpoint.clone().unwrap_or_else(|| ENDPOINT.to_string()),
            token: config
                .resolve("ARCGIS_TOKEN")
                .context("No ArcGIS token: set credentials.arcgis.key or ARCGIS_TOKEN")?,
        })
    }
}

impl Geocoder for ArcGis {
    fn provider(&self) -> Provider {
        Provider::ArcGis
    }

    fn geocode(&self, address: &str) -> Result<Coordinate, GeocodeFailure> {
        // storing results requires forStorage=true under the ArcGIS terms
        let response: Response = self
            .agent
            .get(&self.endpoint)
            .query("singleLine", address)
            .query("forStorage", "true")
            .query("token", &self.token)
            .query("f", "pjson")
            .call()?
            .into_json()?;
        response.coordinate()
    }
}

#[derive(Deserialize)]
struct Response {
    #[serde(default)]
    candidates: Vec<Candidate>,
    error: Option<ErrorBody>,
}

#[derive(Deserialize)]
struct Candidate {
    location: Location,
}

#[derive(Deserialize)]
struct Location {
    x: Option<f64>,
    y: Option<f64>,
}

#[derive(Deserialize)]
struct ErrorBody {
    code: Option<i64>,
    message: Option<String>,
}

impl Response {
    fn coordinate(self) -> Result<Coordinate, GeocodeFailure> {
        if let Some(e) = self.error {
            return Err(GeocodeFailure::Rejected(format!(
                "{} {}",
                e.code.unwrap_or_default(),
                e.message.unwrap_or_default()
            )));
        }

        let x = self
            .candidates
            .into_iter()
            .next()
            .ok_or(GeocodeFailure::NoCandidate)?;
        Ok(Coordinate::from_parts(x.location.y, x.location.x)?)
    }
}
