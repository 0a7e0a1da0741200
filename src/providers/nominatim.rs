use _model::{Coordinate, Provider};
use serde::Deserialize;
use ureq::Agent;

use crate::config::NominatimConfig;

use super::{GeocodeFailure, Geocoder};

const ENDPOINT: &str = "https://nominatim.openstreetmap.org/search";

pub struct Nominatim {
    agent: Agent,
    endpoint: String,
    email: Option<String>,
}

impl Nominatim {
    pub fn new(agent: Agent, config: &NominatimConfig) -> Self {
        Self {
            agent,
            endpoint: config.endpoint.clone().unwrap_or_else(|| ENDPOINT.to_string()),
            email: config.email.clone(),
        }
    }
}

impl Geocoder for Nominatim {
    fn provider(&self) -> Provider {
        Provider::Nominatim
    }

    fn geocode(&self, address: &str) -> Result<Coordinate, GeocodeFailure> {
        let mut request = self
            .agent
            .get(&self.endpoint)
            .query("q", address)
            .query("format", "json")
            .query("limit", "1");
        if let Some(email) = &self.email {
            request = request.query("email", email);
        }

        let places: Vec<Place> = request.call()?.into_json()?;
        coordinate(places)
    }
}

// nominatim sends coordinates as strings
#[derive(Deserialize)]
struct Place {
    lat: Option<String>,
    lon: Option<String>,
}

fn coordinate(places: Vec<Place>) -> Result<Coordinate, GeocodeFailure> {
    let place = places.into_iter().next().ok_or(GeocodeFailure::NoCandidate)?;
    Ok(Coordinate::from_parts(
        parse(place.lat.as_deref())?,
        parse(place.lon.as_deref())?,
    )?)
}

fn parse(x: Option<&str>) -> Result<Option<f64>, GeocodeFailure> {
    x.map(|x| {
        x.parse::<f64>()
            .map_err(|_| GeocodeFailure::Malformed(format!("not a number: {x:?}")))
    })
    .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(json: &str) -> Result<Coordinate, GeocodeFailure> {
        coordinate(serde_json::from_str(json).unwrap())
    }

    #[test]
    fn first_place() {
        let x = decode(
            r#"[{"place_id":1,"lat":"32.7757","lon":"-117.0719","display_name":"A"},
                {"place_id":2,"lat":"1","lon":"1"}]"#,
        )
        .unwrap();
        assert_eq!(x, Coordinate::new(32.7757, -117.0719).unwrap());
    }

    #[test]
    fn endpoint_override() {
        let default = Nominatim::new(ureq::agent(), &NominatimConfig::default());
        assert_eq!(default.endpoint, ENDPOINT);

        let config = NominatimConfig {
            endpoint: Some("http://localhost:8080/search".to_string()),
            ..NominatimConfig::default()
        };
        let local = Nominatim::new(ureq::agent(), &config);
        assert_eq!(local.endpoint, "http://localhost:8080/search");
    }

    #[test]
    fn failures() {
        assert!(matches!(decode("[]"), Err(GeocodeFailure::NoCandidate)));
        assert!(matches!(
            decode(r#"[{"lat":"32.7"}]"#),
            Err(GeocodeFailure::NullCoordinate(_))
        ));
        assert!(matches!(
            decode(r#"[{"lat":"north","lon":"1"}]"#),
            Err(GeocodeFailure::Malformed(_))
        ));
    }
}
