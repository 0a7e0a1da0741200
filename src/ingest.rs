use std::{fs::File, io, path::Path};

use _model::{AddressRecord, Coordinate};
use anyhow::{bail, Context, Result};
use csv::StringRecord;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{
    config::Columns,
    ids::{assign_ids, IdRange, InsufficientRangeError},
};

/// A source row before it has been given an id.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceRow {
    pub name: String,
    pub address: String,
    pub known_coordinate: Option<Coordinate>,
}

pub fn load<R: Rng + ?Sized>(
    path: &Path,
    columns: &Columns,
    range: IdRange,
    rng: &mut R,
) -> Result<Vec<AddressRecord>> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let rows = read_source(file, columns)
        .with_context(|| format!("Failed to read address table {}", path.display()))?;
    let records = assign(rows, range, rng)?;

    let known = records
        .iter()
        .filter(|x| x.known_coordinate.is_some())
        .count();
    info!(
        "Loaded {} addresses ({known} with known coordinates) from {}",
        records.len(),
        path.display()
    );
    Ok(records)
}

pub fn assign<R: Rng + ?Sized>(
    rows: Vec<SourceRow>,
    range: IdRange,
    rng: &mut R,
) -> Result<Vec<AddressRecord>, InsufficientRangeError> {
    let ids = assign_ids(rows.len(), range, rng)?;
    Ok(rows
        .into_iter()
        .zip(ids)
        .map(|(row, id)| AddressRecord {
            id,
            name: row.name,
            address: row.address,
            known_coordinate: row.known_coordinate,
        })
        .collect())
}

pub fn read_source(reader: impl io::Read, columns: &Columns) -> Result<Vec<SourceRow>> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers = reader.headers()?.clone();

    let name = column(&headers, &columns.name)?;
    let address = column(&headers, &columns.address)?;
    let coords = match (&columns.latitude, &columns.longitude) {
        (Some(lat), Some(lon)) => Some((column(&headers, lat)?, column(&headers, lon)?)),
        (None, None) => None,
        _ => bail!("Latitude and longitude columns must be configured together"),
    };

    let mut output = Vec::new();
    for (i, row) in reader.records().enumerate() {
        let row = row?;
        // header is line 1
        let line = i + 2;

        let known_coordinate = match coords {
            Some((lat, lon)) => {
                let latitude = number(&row, lat)
                    .with_context(|| format!("Bad latitude on line {line}"))?;
                let longitude = number(&row, lon)
                    .with_context(|| format!("Bad longitude on line {line}"))?;
                match (latitude, longitude) {
                    (None, None) => None,
                    (latitude, longitude) => match Coordinate::from_parts(latitude, longitude) {
                        Ok(x) => Some(x),
                        Err(e) => {
                            warn!("Ignoring known coordinate on line {line}: {e}");
                            None
                        }
                    },
                }
            }
            None => None,
        };

        output.push(SourceRow {
            name: row.get(name).unwrap_or_default().trim().to_string(),
            address: row.get(address).unwrap_or_default().trim().to_string(),
            known_coordinate,
        });
    }

    Ok(output)
}

fn column(headers: &StringRecord, name: &str) -> Result<usize> {
    headers
        .iter()
        .position(|x| x.trim() == name.trim())
        .with_context(|| format!("Missing column {name:?}"))
}

fn number(row: &StringRecord, i: usize) -> Result<Option<f64>> {
    match row.get(i).map(str::trim) {
        None | Some("") => Ok(None),
        Some(x) => Ok(Some(x.parse()?)),
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct AddressRow {
    id_num: u32,
    name: String,
    address: String,
    latitude: Option<f64>,
    longitude: Option<f64>,
}

/// Persists the ingested records so later stages can rejoin on `id_num`.
pub fn write_addresses(path: &Path, records: &[AddressRecord]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    for x in records {
        writer.serialize(AddressRow {
            id_num: x.id,
            name: x.name.clone(),
            address: x.address.clone(),
            latitude: x.known_coordinate.map(|c| c.latitude),
            longitude: x.known_coordinate.map(|c| c.longitude),
        })?;
    }
    writer.flush()?;
    Ok(())
}

pub fn read_addresses(path: &Path) -> Result<Vec<AddressRecord>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open {}, run ingest first", path.display()))?;
    let mut output = Vec::new();
    for row in reader.deserialize() {
        let row: AddressRow = row?;
        let known_coordinate = match (row.latitude, row.longitude) {
            (None, None) => None,
            (latitude, longitude) => Some(
                Coordinate::from_parts(latitude, longitude)
                    .with_context(|| format!("Bad coordinate for id {}", row.id_num))?,
            ),
        };
        output.push(AddressRecord {
            id: row.id_num,
            name: row.name,
            address: row.address,
            known_coordinate,
        });
    }
    Ok(output)
}
