use std::{
    collections::{hash_map::Entry, HashMap, HashSet},
    path::Path,
};

use _model::{AddressRecord, Coordinate, GeocodeResult, Provider};
use anyhow::{bail, Context, Result};
use itertools::Itertools;
use tracing::{error, warn};
use typed_floats::tf64::NonNaN;

use crate::distance::distance_feet;

const FIXED_COLUMNS: [&str; 5] = ["id_num", "name", "address", "latitude", "longitude"];

/// One record with ground truth and its distance to each provider's result.
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonRow {
    pub record_id: u32,
    pub name: String,
    pub address: String,
    pub known_coordinate: Coordinate,
    /// Feet, aligned with [`ComparisonTable::providers`]. `None` means the
    /// provider had no result for this record, which is not the same as 0.
    pub distances: Vec<Option<NonNaN>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonTable {
    pub providers: Vec<Provider>,
    pub rows: Vec<ComparisonRow>,
}

/// Joins each provider's successful results to the records by id.
///
/// Records without a known coordinate cannot be compared and are left out of
/// the table without complaint. Rows keep the order of `records`, columns the
/// order of `runs`.
pub fn build(
    records: &[AddressRecord],
    runs: &[(Provider, &[GeocodeResult])],
) -> Result<ComparisonTable> {
    if let Some(x) = runs.iter().map(|(x, _)| x).duplicates().next() {
        bail!("Results for {x} were given twice");
    }

    let ids: HashSet<u32> = records.iter().map(|x| x.id).collect();
    let mut lookups = Vec::new();
    for (provider, results) in runs {
        let mut lookup = HashMap::new();
        for result in results.iter() {
            if result.provider != *provider {
                bail!(
                    "{} result for id {} passed as {provider}",
                    result.provider,
                    result.record_id
                );
            }
            let Some(coordinate) = &result.coordinate else {
                continue;
            };
            if !ids.contains(&result.record_id) {
                warn!(
                    "{provider} result for id {} matches no address record",
                    result.record_id
                );
                continue;
            }
            match lookup.entry(result.record_id) {
                Entry::Occupied(_) => {
                    bail!("{provider} has two results for id {}", result.record_id)
                }
                Entry::Vacant(x) => {
                    x.insert(coordinate);
                }
            }
        }
        lookups.push(lookup);
    }

    let mut rows = Vec::new();
    for record in records {
        let Some(known) = record.known_coordinate else {
            continue;
        };

        let mut distances = Vec::with_capacity(runs.len());
        for ((provider, _), lookup) in runs.iter().zip(&lookups) {
            distances.push(match lookup.get(&record.id) {
                Some(coordinate) => distance(record, *provider, &known, coordinate),
                None => None,
            });
        }

        rows.push(ComparisonRow {
            record_id: record.id,
            name: record.name.clone(),
            address: record.address.clone(),
            known_coordinate: known,
            distances,
        });
    }

    Ok(ComparisonTable {
        providers: runs.iter().map(|(x, _)| *x).collect(),
        rows,
    })
}

// a failure here means bad data slipped past ingestion or a provider
fn distance(
    record: &AddressRecord,
    provider: Provider,
    known: &Coordinate,
    found: &Coordinate,
) -> Option<NonNaN> {
    let d = match distance_feet(known, found) {
        Ok(x) => x,
        Err(e) => {
            error!("Cannot compare {provider} result for id {}: {e}", record.id);
            return None;
        }
    };
    match NonNaN::new(d) {
        Ok(x) => Some(x),
        Err(_) => {
            error!("{provider} distance for id {} is not a number", record.id);
            None
        }
    }
}

impl ComparisonTable {
    pub fn column(&self, provider: Provider) -> Option<usize> {
        self.providers.iter().position(|x| *x == provider)
    }

    /// Distances of one provider, one entry per row.
    pub fn distances(&self, provider: Provider) -> Option<Vec<Option<f64>>> {
        let i = self.column(provider)?;
        Some(
            self.rows
                .iter()
                .map(|x| x.distances[i].map(|d| d.get()))
                .collect(),
        )
    }

    /// Long form `(record_id, provider, feet)` with absent cells dropped.
    pub fn triples(&self) -> Vec<(u32, Provider, f64)> {
        let mut output = Vec::new();
        for (i, provider) in self.providers.iter().enumerate() {
            for row in &self.rows {
                if let Some(d) = row.distances[i] {
                    output.push((row.record_id, *provider, d.get()));
                }
            }
        }
        output
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record(
            FIXED_COLUMNS
                .iter()
                .copied()
                .chain(self.providers.iter().map(|x| x.name())),
        )?;
        for row in &self.rows {
            let mut fields = vec![
                row.record_id.to_string(),
                row.name.clone(),
                row.address.clone(),
                row.known_coordinate.latitude.to_string(),
                row.known_coordinate.longitude.to_string(),
            ];
            fields.extend(
                row.distances
                    .iter()
                    .map(|x| x.map(|d| d.get().to_string()).unwrap_or_default()),
            );
            writer.write_record(&fields)?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn read(path: &Path) -> Result<Self> {
        let mut reader = csv::Reader::from_path(path)
            .with_context(|| format!("Failed to open {}", path.display()))?;
        let headers = reader.headers()?.clone();
        for (i, name) in FIXED_COLUMNS.iter().enumerate() {
            if headers.get(i) != Some(*name) {
                bail!("Expected column {} to be {name}", i + 1);
            }
        }
        let providers: Vec<Provider> = headers
            .iter()
            .skip(FIXED_COLUMNS.len())
            .map(|x| x.parse())
            .try_collect()?;
        if let Some(x) = providers.iter().duplicates().next() {
            bail!("Column {x} appears twice");
        }

        let mut rows = Vec::new();
        for row in reader.records() {
            let row = row?;
            let field = |i: usize| row.get(i).unwrap_or_default();
            let record_id: u32 = field(0).parse().context("Bad id_num")?;
            let known_coordinate = Coordinate::new(field(3).parse()?, field(4).parse()?)
                .with_context(|| format!("Bad known coordinate for id {record_id}"))?;

            let mut distances = Vec::with_capacity(providers.len());
            for i in 0..providers.len() {
                distances.push(match field(FIXED_COLUMNS.len() + i) {
                    "" => None,
                    x => Some(
                        NonNaN::new(x.parse()?)
                            .map_err(|_| anyhow::anyhow!("NaN distance for id {record_id}"))?,
                    ),
                });
            }

            rows.push(ComparisonRow {
                record_id,
                name: field(1).to_string(),
                address: field(2).to_string(),
                known_coordinate,
                distances,
            });
        }

        Ok(Self { providers, rows })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::tests::record;

    fn result(id: u32, provider: Provider, at: Option<(f64, f64)>) -> GeocodeResult {
        GeocodeResult {
            record_id: id,
            provider,
            coordinate: at.map(|(lat, lon)| Coordinate::new(lat, lon).unwrap()),
        }
    }

    fn records() -> Vec<AddressRecord> {
        vec![
            record(1, "1 A St", Some((32.80, -117.05))),
            record(2, "2 B St", None),
            record(3, "3 C St", Some((32.82, -117.06))),
        ]
    }

    #[test]
    fn excludes_records_without_ground_truth() {
        let google = [result(2, Provider::Google, Some((32.0, -117.0)))];
        let table = build(&records(), &[(Provider::Google, &google[..])]).unwrap();
        assert_eq!(
            table.rows.iter().map(|x| x.record_id).collect::<Vec<_>>(),
            vec![1, 3]
        );
        assert_eq!(table.distances(Provider::Google), Some(vec![None, None]));
    }

    #[test]
    fn absent_is_not_zero() {
        let google = [result(1, Provider::Google, Some((32.80, -117.05)))];
        let bing = [result(3, Provider::Bing, Some((32.83, -117.06)))];
        let table = build(
            &records(),
            &[(Provider::Google, &google[..]), (Provider::Bing, &bing[..])],
        )
        .unwrap();

        assert_eq!(table.providers, vec![Provider::Google, Provider::Bing]);
        assert_eq!(table.distances(Provider::Google), Some(vec![Some(0.0), None]));
        let bing = table.distances(Provider::Bing).unwrap();
        assert_eq!(bing[0], None);
        // 0.01 degrees of latitude is a little over 3600 ft
        assert!((3600.0..3700.0).contains(&bing[1].unwrap()));
        assert_eq!(table.distances(Provider::ArcGis), None);
    }

    #[test]
    fn failed_results_leave_cells_absent() {
        let arcgis = [result(1, Provider::ArcGis, None)];
        let table = build(&records(), &[(Provider::ArcGis, &arcgis[..])]).unwrap();
        assert_eq!(table.distances(Provider::ArcGis), Some(vec![None, None]));
    }

    #[test]
    fn rejects_inconsistent_results() {
        let twice = [
            result(1, Provider::Google, Some((32.0, -117.0))),
            result(1, Provider::Google, Some((32.1, -117.0))),
        ];
        assert!(build(&records(), &[(Provider::Google, &twice[..])]).is_err());

        let wrong = [result(1, Provider::Bing, Some((32.0, -117.0)))];
        assert!(build(&records(), &[(Provider::Google, &wrong[..])]).is_err());

        let empty: [GeocodeResult; 0] = [];
        assert!(build(&records(), &[(Provider::Google, &empty[..]), (Provider::Google, &empty[..])]).is_err());
    }

    #[test]
    fn invalid_result_coordinate_leaves_cell_absent() {
        let google = [GeocodeResult {
            record_id: 1,
            provider: Provider::Google,
            coordinate: Some(Coordinate {
                latitude: f64::NAN,
                longitude: 1.0,
            }),
        }];
        let records = vec![record(1, "1 A St", Some((32.80, -117.05)))];
        let table = build(&records, &[(Provider::Google, &google[..])]).unwrap();
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.distances(Provider::Google), Some(vec![None]));
    }

    #[test]
    fn unknown_ids_are_ignored() {
        let google = [result(99, Provider::Google, Some((32.0, -117.0)))];
        let table = build(&records(), &[(Provider::Google, &google[..])]).unwrap();
        assert!(table.triples().is_empty());
    }

    #[test]
    fn triples_drop_absent_cells() {
        let google = [
            result(1, Provider::Google, Some((32.80, -117.05))),
            result(3, Provider::Google, Some((32.82, -117.06))),
        ];
        let bing = [result(3, Provider::Bing, Some((32.82, -117.06)))];
        let table = build(
            &records(),
            &[(Provider::Google, &google[..]), (Provider::Bing, &bing[..])],
        )
        .unwrap();
        assert_eq!(
            table.triples(),
            vec![
                (1, Provider::Google, 0.0),
                (3, Provider::Google, 0.0),
                (3, Provider::Bing, 0.0)
            ]
        );
    }

    #[test]
    fn reload() {
        let google = [result(1, Provider::Google, Some((32.81, -117.05)))];
        let table = build(&records(), &[(Provider::Google, &google[..]), (Provider::Bing, &[][..])]).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("distance_table.csv");
        table.write(&path).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.starts_with("id_num,name,address,latitude,longitude,Google,Bing\n"));
        assert_eq!(ComparisonTable::read(&path).unwrap(), table);
    }
}
