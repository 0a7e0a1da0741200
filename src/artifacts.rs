//! Per-provider result tables and point datasets.

use std::{collections::HashMap, fs, path::Path};

use _model::{AddressRecord, Coordinate, GeocodeResult, Provider};
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::json;

pub const KNOWN: &str = "known";

/// A named location ready to be drawn or exported.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledPoint {
    pub id: u32,
    pub name: String,
    pub address: String,
    pub coordinate: Coordinate,
}

#[derive(Debug, Serialize, Deserialize)]
struct ResultRow {
    id_num: u32,
    name: String,
    address: String,
    gc_service: String,
    latitude: Option<f64>,
    longitude: Option<f64>,
}

pub fn known_points(records: &[AddressRecord]) -> Vec<LabeledPoint> {
    records
        .iter()
        .filter_map(|x| {
            Some(LabeledPoint {
                id: x.id,
                name: x.name.clone(),
                address: x.address.clone(),
                coordinate: x.known_coordinate?,
            })
        })
        .collect()
}

/// Successful results joined back to their records.
pub fn result_points(
    records: &[AddressRecord],
    results: &[GeocodeResult],
) -> Result<Vec<LabeledPoint>> {
    let by_id = index(records);
    let mut output = Vec::new();
    for result in results {
        let Some(coordinate) = result.coordinate else {
            continue;
        };
        let record = lookup(&by_id, result)?;
        output.push(LabeledPoint {
            id: record.id,
            name: record.name.clone(),
            address: record.address.clone(),
            coordinate,
        });
    }
    Ok(output)
}

fn index(records: &[AddressRecord]) -> HashMap<u32, &AddressRecord> {
    records.iter().map(|x| (x.id, x)).collect()
}

fn lookup<'a>(
    by_id: &HashMap<u32, &'a AddressRecord>,
    result: &GeocodeResult,
) -> Result<&'a AddressRecord> {
    by_id.get(&result.record_id).copied().with_context(|| {
        format!(
            "{} result for id {} matches no address record",
            result.provider, result.record_id
        )
    })
}

/// One row per attempted geocode; failed rows have empty coordinates.
pub fn write_results(
    path: &Path,
    records: &[AddressRecord],
    results: &[GeocodeResult],
) -> Result<()> {
    let by_id = index(records);
    let mut writer = csv::Writer::from_path(path)?;
    for result in results {
        let record = lookup(&by_id, result)?;
        writer.serialize(ResultRow {
            id_num: record.id,
            name: record.name.clone(),
            address: record.address.clone(),
            gc_service: result.provider.slug().to_string(),
            latitude: result.coordinate.map(|x| x.latitude),
            longitude: result.coordinate.map(|x| x.longitude),
        })?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_known(path: &Path, points: &[LabeledPoint]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    for x in points {
        writer.serialize(ResultRow {
            id_num: x.id,
            name: x.name.clone(),
            address: x.address.clone(),
            gc_service: KNOWN.to_string(),
            latitude: Some(x.coordinate.latitude),
            longitude: Some(x.coordinate.longitude),
        })?;
    }
    writer.flush()?;
    Ok(())
}

fn read_rows(path: &Path) -> Result<Vec<ResultRow>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    let mut output = Vec::new();
    for row in reader.deserialize::<ResultRow>() {
        output.push(row.with_context(|| format!("Bad row in {}", path.display()))?);
    }
    Ok(output)
}

/// Reads back the successful results written by [`write_results`].
pub fn read_results(path: &Path, provider: Provider) -> Result<Vec<GeocodeResult>> {
    let mut output = Vec::new();
    for row in read_rows(path)? {
        if row.gc_service.parse::<Provider>()? != provider {
            bail!(
                "{} holds {} results, expected {provider}",
                path.display(),
                row.gc_service
            );
        }
        let coordinate = match (row.latitude, row.longitude) {
            (None, None) => None,
            (latitude, longitude) => Some(
                Coordinate::from_parts(latitude, longitude)
                    .with_context(|| format!("Bad coordinate for id {}", row.id_num))?,
            ),
        };
        output.push(GeocodeResult {
            record_id: row.id_num,
            provider,
            coordinate,
        });
    }
    Ok(output)
}

/// Located rows of any results table, including the known one.
pub fn read_points(path: &Path) -> Result<Vec<LabeledPoint>> {
    let mut output = Vec::new();
    for row in read_rows(path)? {
        if let (Some(latitude), Some(longitude)) = (row.latitude, row.longitude) {
            output.push(LabeledPoint {
                id: row.id_num,
                name: row.name,
                address: row.address,
                coordinate: Coordinate::new(latitude, longitude)
                    .with_context(|| format!("Bad coordinate for id {}", row.id_num))?,
            });
        }
    }
    Ok(output)
}

/// GeoJSON point layer in WGS84.
pub fn write_points(path: &Path, layer: &str, points: &[LabeledPoint]) -> Result<()> {
    let features: Vec<_> = points
        .iter()
        .map(|x| {
            json!({
                "type": "Feature",
                "geometry": {
                    "type": "Point",
                    "coordinates": [x.coordinate.longitude, x.coordinate.latitude],
                },
                "properties": {
                    "id_num": x.id,
                    "name": x.name,
                    "address": x.address,
                    "latitude": x.coordinate.latitude,
                    "longitude": x.coordinate.longitude,
                },
            })
        })
        .collect();

    let collection = json!({
        "type": "FeatureCollection",
        "name": layer,
        "crs": {
            "type": "name",
            "properties": { "name": "urn:ogc:def:crs:EPSG::4326" },
        },
        "features": features,
    });
    let mut output = serde_json::to_string_pretty(&collection)?;
    output.push('\n');
    fs::write(path, output)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::Value;

    use super::*;
    use crate::batch::tests::record;

    fn records() -> Vec<AddressRecord> {
        vec![
            record(41234, "1 A St, San Diego", Some((32.80, -117.05))),
            record(52345, "2 B St", None),
        ]
    }

    fn results() -> Vec<GeocodeResult> {
        vec![
            GeocodeResult {
                record_id: 41234,
                provider: Provider::ArcGis,
                coordinate: Some(Coordinate::new(32.81, -117.04).unwrap()),
            },
            GeocodeResult {
                record_id: 52345,
                provider: Provider::ArcGis,
                coordinate: None,
            },
        ]
    }

    #[test]
    fn results_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("arcgis_results.csv");
        write_results(&path, &records(), &results()).unwrap();
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "id_num,name,address,gc_service,latitude,longitude\n\
             41234,Place 41234,\"1 A St, San Diego\",arcgis,32.81,-117.04\n\
             52345,Place 52345,2 B St,arcgis,,\n"
        );

        assert_eq!(read_results(&path, Provider::ArcGis).unwrap(), results());
        assert!(read_results(&path, Provider::Bing).is_err());
        assert_eq!(read_points(&path).unwrap().len(), 1);
    }

    #[test]
    fn unknown_record() {
        let orphan = [GeocodeResult {
            record_id: 1,
            provider: Provider::Google,
            coordinate: Some(Coordinate::new(1.0, 1.0).unwrap()),
        }];
        assert!(result_points(&records(), &orphan).is_err());
    }

    #[test]
    fn known_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("known_results.csv");
        let points = known_points(&records());
        assert_eq!(points.len(), 1);
        write_known(&path, &points).unwrap();
        assert_eq!(read_points(&path).unwrap(), points);
    }

    #[test]
    fn geojson() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("arcgis_points.geojson");
        let points = result_points(&records(), &results()).unwrap();
        write_points(&path, "arcgis_points", &points).unwrap();

        let x: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(x["type"], "FeatureCollection");
        assert_eq!(x["crs"]["properties"]["name"], "urn:ogc:def:crs:EPSG::4326");
        let features = x["features"].as_array().unwrap();
        assert_eq!(features.len(), 1);
        assert_eq!(
            features[0]["geometry"]["coordinates"],
            json!([-117.04, 32.81])
        );
        assert_eq!(features[0]["properties"]["id_num"], 41234);
        assert_eq!(features[0]["properties"]["address"], "1 A St, San Diego");
    }
}
