use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use _model::Provider;
use anyhow::{bail, Context, Result};
use itertools::Itertools;
use serde::Deserialize;

use crate::ids::IdRange;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Source address table.
    pub input: PathBuf,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default)]
    pub columns: Columns,
    #[serde(default = "Provider::all")]
    pub providers: Vec<Provider>,
    /// Pause between two calls to the same provider.
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub ids: IdRange,
    #[serde(default)]
    pub parallel_providers: bool,
    #[serde(default)]
    pub credentials: Credentials,
    #[serde(default)]
    pub map: MapConfig,
    #[serde(default)]
    pub boxplot_y_max: Option<f64>,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

fn default_delay_ms() -> u64 {
    1000
}

fn default_timeout_secs() -> u64 {
    30
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: Config = serde_yaml::from_str(&raw)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.providers.is_empty() {
            bail!("No providers configured");
        }
        if let Some(x) = self.providers.iter().duplicates().next() {
            bail!("Provider {x} is listed more than once");
        }
        if self.ids.min >= self.ids.max {
            bail!("Empty id range [{}, {})", self.ids.min, self.ids.max);
        }
        Ok(())
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Column names of the source table. Latitude and longitude are only needed
/// when the table carries ground truth.
#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Columns {
    pub name: String,
    pub address: String,
    pub latitude: Option<String>,
    pub longitude: Option<String>,
}

impl Default for Columns {
    fn default() -> Self {
        Self {
            name: "name".to_string(),
            address: "address".to_string(),
            latitude: Some("latitude".to_string()),
            longitude: Some("longitude".to_string()),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Credentials {
    pub nominatim: NominatimConfig,
    pub google: KeyConfig,
    pub arcgis: KeyConfig,
    pub bing: KeyConfig,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NominatimConfig {
    pub user_agent: Option<String>,
    pub email: Option<String>,
    pub endpoint: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct KeyConfig {
    pub key: Option<String>,
    pub endpoint: Option<String>,
}

impl KeyConfig {
    /// Key from the config file, falling back to `env_var`.
    pub fn resolve(&self, env_var: &str) -> Option<String> {
        self.key
            .clone()
            .or_else(|| std::env::var(env_var).ok())
            .filter(|x| !x.trim().is_empty())
    }
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MapConfig {
    /// `[latitude, longitude]`; the mean of the plotted points when unset.
    pub center: Option<[f64; 2]>,
    pub zoom: u8,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            center: None,
            zoom: 13,
        }
    }
}

/// Where every artifact of a run is written. Directories are created by
/// [`OutputPaths::create`], nothing touches the filesystem before that.
#[derive(Debug, Clone)]
pub struct OutputPaths {
    root: PathBuf,
}

impl OutputPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn create(root: impl Into<PathBuf>) -> Result<Self> {
        let paths = Self::new(root);
        let points = paths.root.join("points");
        fs::create_dir_all(&points)
            .with_context(|| format!("Failed to create {}", points.display()))?;
        Ok(paths)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn addresses(&self) -> PathBuf {
        self.root.join("addresses.csv")
    }

    pub fn results(&self, slug: &str) -> PathBuf {
        self.root.join(format!("{slug}_results.csv"))
    }

    pub fn fails(&self, slug: &str) -> PathBuf {
        self.root.join(format!("{slug}_fails.csv"))
    }

    pub fn points(&self, slug: &str) -> PathBuf {
        self.root.join("points").join(format!("{slug}_points.geojson"))
    }

    pub fn distance_table(&self) -> PathBuf {
        self.root.join("distance_table.csv")
    }

    pub fn statistics(&self) -> PathBuf {
        self.root.join("distance_statistics.csv")
    }

    pub fn boxplot(&self) -> PathBuf {
        self.root.join("boxplot.svg")
    }

    pub fn map(&self, slug: &str) -> PathBuf {
        self.root.join(format!("{slug}_map.html"))
    }

    pub fn bubble_map(&self, slug: &str) -> PathBuf {
        self.root.join(format!("{slug}_bubble_map.html"))
    }
}
