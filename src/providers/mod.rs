//! Geocoding providers. Each one turns an address string into a coordinate
//! or a [`GeocodeFailure`]; the rest of the pipeline only sees [`Geocoder`].

use _model::{Coordinate, InvalidCoordinateError, Provider};
use anyhow::Result;
use thiserror::Error;

use crate::{config::Config, utils::{agent, USER_AGENT}};

mod arcgis;
mod bing;
mod google;
mod nominatim;

pub use arcgis::ArcGis;
pub use bing::Bing;
pub use google::Google;
pub use nominatim::Nominatim;

pub trait Geocoder: Send + Sync {
    fn provider(&self) -> Provider;

    fn geocode(&self, address: &str) -> Result<Coordinate, GeocodeFailure>;
}

#[derive(Debug, Error)]
pub enum GeocodeFailure {
    #[error("request failed: {0}")]
    Request(Box<ureq::Error>),
    #[error("unreadable response: {0}")]
    Decode(#[from] std::io::Error),
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("no candidates returned")]
    NoCandidate,
    #[error("null coordinate returned: {0}")]
    NullCoordinate(#[from] InvalidCoordinateError),
    #[error("rejected by provider: {0}")]
    Rejected(String),
}

impl From<ureq::Error> for GeocodeFailure {
    fn from(e: ureq::Error) -> Self {
        Self::Request(Box::new(e))
    }
}

/// Builds the configured implementation for `provider`. Fails if the
/// provider needs credentials that are neither in the config nor the
/// environment.
pub fn build(provider: Provider, config: &Config) -> Result<Box<dyn Geocoder>> {
    let credentials = &config.credentials;
    let user_agent = credentials
        .nominatim
        .user_agent
        .as_deref()
        .unwrap_or(USER_AGENT);
    let agent = agent(user_agent, config.timeout());

    Ok(match provider {
        Provider::Nominatim => Box::new(Nominatim::new(agent, &credentials.nominatim)),
        Provider::Google => Box::new(Google::new(agent, &credentials.google)?),
        Provider::ArcGis => Box::new(ArcGis::new(agent, &credentials.arcgis)?),
        Provider::Bing => Box::new(Bing::new(agent, &credentials.bing)?),
    })
}

pub fn build_all(config: &Config) -> Result<Vec<Box<dyn Geocoder>>> {
    config.providers.iter().map(|x| build(*x, config)).collect()
}
