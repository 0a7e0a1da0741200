use core::fmt;
use std::str::FromStr;

use anyhow::bail;
use clap::ValueEnum;
use serde_with::{DeserializeFromStr, SerializeDisplay};

mod coordinate;
mod record;

pub use coordinate::{Coordinate, InvalidCoordinateError};
pub use record::{AddressRecord, GeocodeResult};

#[derive(
    Copy,
    Clone,
    Debug,
    Hash,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    SerializeDisplay,
    DeserializeFromStr,
    ValueEnum,
)]
pub enum Provider {
    Nominatim,
    Google,
    #[value(name = "arcgis")]
    ArcGis,
    Bing,
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Provider {
    type Err = anyhow::Error;

    // accepts both the display name and the slug
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "nominatim" => Self::Nominatim,
            "google" => Self::Google,
            "arcgis" => Self::ArcGis,
            "bing" => Self::Bing,
            _ => bail!("Unknown provider: {s}"),
        })
    }
}

impl Provider {
    pub fn all() -> Vec<Self> {
        vec![
            Provider::Nominatim,
            Provider::Google,
            Provider::ArcGis,
            Provider::Bing,
        ]
    }

    /// Column name used in the comparison and summary tables.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Nominatim => "Nominatim",
            Self::Google => "Google",
            Self::ArcGis => "ArcGIS",
            Self::Bing => "Bing",
        }
    }

    /// Lowercase tag used in file names and the `gc_service` column.
    pub fn slug(&self) -> &'static str {
        match self {
            Self::Nominatim => "nominatim",
            Self::Google => "google",
            Self::ArcGis => "arcgis",
            Self::Bing => "bing",
        }
    }
}
