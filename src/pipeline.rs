use std::{
    fs,
    path::Path,
    sync::atomic::{AtomicUsize, Ordering},
};

use _model::{AddressRecord, Provider};
use anyhow::{bail, Result};
use indicatif::MultiProgress;
use rayon::prelude::*;
use tracing::{error, info, warn};

use crate::{
    artifacts::{self, LabeledPoint, KNOWN},
    batch::{geocode_batch, BatchOutcome},
    compare::{self, ComparisonTable},
    config::{Config, OutputPaths},
    ingest,
    providers::Geocoder,
    report::{self, MapView},
    stats::{self, SummaryRow},
    utils::progress_bar,
};

const BOXPLOT_TITLE: &str = "Distance Between Geocoded Results and Known Locations (Feet)";

/// One run over a configured output directory. Each stage can be driven on
/// its own from what earlier stages left on disk, or chained by [`Pipeline::run`].
pub struct Pipeline<'a> {
    config: &'a Config,
    paths: OutputPaths,
    failures: AtomicUsize,
}

impl<'a> Pipeline<'a> {
    pub fn new(config: &'a Config) -> Result<Self> {
        Ok(Self {
            config,
            paths: OutputPaths::create(&config.output_dir)?,
            failures: AtomicUsize::new(0),
        })
    }

    pub fn paths(&self) -> &OutputPaths {
        &self.paths
    }

    /// Writes one artifact. A failure is logged and counted but does not stop
    /// the artifacts that don't depend on it.
    fn artifact(&self, path: &Path, f: impl FnOnce(&Path) -> Result<()>) {
        match f(path) {
            Ok(()) => info!("Wrote {}", path.display()),
            Err(e) => {
                self.failures.fetch_add(1, Ordering::Relaxed);
                error!("Failed to write {}: {e:#}", path.display());
            }
        }
    }

    /// Fails if any artifact could not be written so far.
    pub fn finish(&self) -> Result<()> {
        match self.failures.swap(0, Ordering::Relaxed) {
            0 => Ok(()),
            1 => bail!("1 artifact could not be written"),
            n => bail!("{n} artifacts could not be written"),
        }
    }

    pub fn run(&self, geocoders: &[Box<dyn Geocoder>]) -> Result<()> {
        let records = self.ingest()?;
        let outcomes = self.geocode(&records, geocoders);
        let (table, _) = self.compare(&records, &outcomes)?;

        let mut results = Vec::new();
        for x in &outcomes {
            results.push((x.provider, artifacts::result_points(&records, &x.succeeded)?));
        }
        self.report(&table, &artifacts::known_points(&records), &results);

        self.finish()
    }

    /// Reads the source table and assigns ids. Nothing remote happens here,
    /// so a too-small id range stops the run before any provider is called.
    pub fn ingest(&self) -> Result<Vec<AddressRecord>> {
        let records = ingest::load(
            &self.config.input,
            &self.config.columns,
            self.config.ids,
            &mut rand::rng(),
        )?;

        self.artifact(&self.paths.addresses(), |path| {
            ingest::write_addresses(path, &records)
        });
        let known = artifacts::known_points(&records);
        self.artifact(&self.paths.results(KNOWN), |path| {
            artifacts::write_known(path, &known)
        });
        self.artifact(&self.paths.points(KNOWN), |path| {
            artifacts::write_points(path, "known_points", &known)
        });

        Ok(records)
    }

    pub fn geocode(
        &self,
        records: &[AddressRecord],
        geocoders: &[Box<dyn Geocoder>],
    ) -> Vec<BatchOutcome> {
        let mp = MultiProgress::new();
        let run = |geocoder: &Box<dyn Geocoder>| {
            let provider = geocoder.provider();
            info!("Geocoding {} addresses with {provider}...", records.len());
            let pb = mp.add(progress_bar(records.len() as u64));
            pb.set_prefix(provider.slug());
            let outcome = geocode_batch(records, &**geocoder, self.config.delay(), &pb);
            pb.finish();
            self.write_outcome(records, &outcome);
            outcome
        };

        if self.config.parallel_providers {
            geocoders.par_iter().map(run).collect()
        } else {
            geocoders.iter().map(run).collect()
        }
    }

    fn write_outcome(&self, records: &[AddressRecord], outcome: &BatchOutcome) {
        let slug = outcome.provider.slug();
        self.artifact(&self.paths.results(slug), |path| {
            artifacts::write_results(path, records, &outcome.succeeded)
        });
        self.artifact(&self.paths.fails(slug), |path| {
            artifacts::write_results(path, records, &outcome.failed)
        });
        self.artifact(&self.paths.points(slug), |path| {
            let points = artifacts::result_points(records, &outcome.succeeded)?;
            artifacts::write_points(path, &format!("{slug}_points"), &points)
        });
    }

    pub fn compare(
        &self,
        records: &[AddressRecord],
        outcomes: &[BatchOutcome],
    ) -> Result<(ComparisonTable, Vec<SummaryRow>)> {
        let runs: Vec<_> = outcomes
            .iter()
            .map(|x| (x.provider, x.succeeded.as_slice()))
            .collect();
        let table = compare::build(records, &runs)?;
        let excluded = records.len() - table.rows.len();
        if excluded > 0 {
            info!("{excluded} addresses have no known coordinate and are not compared");
        }
        self.artifact(&self.paths.distance_table(), |path| table.write(path));

        let summary = stats::summarize(&table);
        for x in &summary {
            info!(
                "{}: {:.1}% matched, mean {} ft, max {} ft",
                x.provider,
                x.match_rate,
                feet(x.mean_distance),
                feet(x.max_distance)
            );
        }
        self.artifact(&self.paths.statistics(), |path| stats::write(path, &summary));

        Ok((table, summary))
    }

    pub fn report(
        &self,
        table: &ComparisonTable,
        known: &[LabeledPoint],
        results: &[(Provider, Vec<LabeledPoint>)],
    ) {
        let triples = table.triples();
        let series: Vec<(&str, &str, Vec<f64>)> = table
            .providers
            .iter()
            .map(|provider| {
                let values = triples
                    .iter()
                    .filter(|(_, x, _)| x == provider)
                    .map(|(_, _, d)| *d)
                    .collect();
                (provider.name(), report::plot_color(*provider), values)
            })
            .collect();
        self.artifact(&self.paths.boxplot(), |path| {
            let svg = report::boxplot(BOXPLOT_TITLE, &series, self.config.boxplot_y_max)?;
            Ok(fs::write(path, svg)?)
        });

        let view = MapView {
            center: self.config.map.center,
            zoom: self.config.map.zoom,
        };
        for (provider, points) in results {
            self.artifact(&self.paths.map(provider.slug()), |path| {
                Ok(fs::write(path, report::point_map(view, *provider, points, known)?)?)
            });
        }
        for provider in &table.providers {
            self.artifact(&self.paths.bubble_map(provider.slug()), |path| {
                Ok(fs::write(path, report::bubble_map(view, table, *provider)?)?)
            });
        }
    }

    /// `compare` from the files earlier stages wrote.
    pub fn compare_saved(&self) -> Result<(ComparisonTable, Vec<SummaryRow>)> {
        let records = ingest::read_addresses(&self.paths.addresses())?;
        let mut outcomes = Vec::new();
        for provider in &self.config.providers {
            let path = self.paths.results(provider.slug());
            if !path.exists() {
                warn!("No {provider} results at {}, skipping", path.display());
                continue;
            }
            outcomes.push(BatchOutcome {
                provider: *provider,
                succeeded: artifacts::read_results(&path, *provider)?,
                failed: Vec::new(),
            });
        }
        self.compare(&records, &outcomes)
    }

    /// `report` from the files earlier stages wrote.
    pub fn report_saved(&self) -> Result<()> {
        let table = ComparisonTable::read(&self.paths.distance_table())?;
        let known = artifacts::read_points(&self.paths.results(KNOWN))?;
        let mut results = Vec::new();
        for provider in &table.providers {
            match artifacts::read_points(&self.paths.results(provider.slug())) {
                Ok(x) => results.push((*provider, x)),
                Err(e) => {
                    self.failures.fetch_add(1, Ordering::Relaxed);
                    error!("No {provider} point map: {e:#}");
                }
            }
        }
        self.report(&table, &known, &results);
        Ok(())
    }
}

fn feet(x: Option<f64>) -> String {
    match x {
        Some(x) => format!("{x:.0}"),
        None => "-".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::batch::tests::StubGeocoder;

    const SOURCE: &str = "\
name,address,latitude,longitude
City Hall,202 C St,32.7157,-117.1611
Library,330 Park Blvd,32.7084,-117.1531
Zoo,2920 Zoo Dr,,
";

    fn config(dir: &Path) -> Config {
        let input = dir.join("source.csv");
        fs::File::create(&input)
            .unwrap()
            .write_all(SOURCE.as_bytes())
            .unwrap();
        serde_yaml::from_str(&format!(
            "input: {}\noutput_dir: {}\ndelay_ms: 0\nproviders: [google]\nmap:\n  center: [32.71, -117.16]\n",
            input.display(),
            dir.join("output").display()
        ))
        .unwrap()
    }

    fn stub(addresses: &[&str]) -> Vec<Box<dyn Geocoder>> {
        let known: Vec<_> = addresses
            .iter()
            .map(|x| (*x, 32.7160, -117.1610))
            .collect();
        vec![Box::new(StubGeocoder::new(Provider::Google, &known))]
    }

    fn lines(path: &Path) -> usize {
        fs::read_to_string(path).unwrap().lines().count()
    }

    #[test]
    fn end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        let pipeline = Pipeline::new(&config).unwrap();
        let paths = pipeline.paths().clone();

        // fails for the zoo, the one record without ground truth
        pipeline
            .run(&stub(&["202 C St", "330 Park Blvd"]))
            .unwrap();

        assert_eq!(lines(&paths.addresses()), 4);
        assert_eq!(lines(&paths.results(KNOWN)), 3);
        assert_eq!(lines(&paths.results("google")), 3);
        assert_eq!(lines(&paths.fails("google")), 2);
        assert!(paths.points("google").exists());
        assert!(paths.boxplot().exists());
        assert!(paths.map("google").exists());
        assert!(paths.bubble_map("google").exists());

        let table = ComparisonTable::read(&paths.distance_table()).unwrap();
        assert_eq!(table.rows.len(), 2);
        let summary = stats::summarize(&table);
        assert_eq!(summary[0].match_rate, 100.0);
        assert_eq!(
            fs::read_to_string(paths.statistics())
                .unwrap()
                .lines()
                .nth(1)
                .unwrap()
                .split(',')
                .take(2)
                .collect::<Vec<_>>(),
            vec!["Google", "100.0"]
        );
    }

    #[test]
    fn failure_reduces_match_rate() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        let pipeline = Pipeline::new(&config).unwrap();

        let records = pipeline.ingest().unwrap();
        let outcomes = pipeline.geocode(&records, &stub(&["202 C St", "2920 Zoo Dr"]));
        assert_eq!(outcomes[0].failed.len(), 1);

        let (table, summary) = pipeline.compare(&records, &outcomes).unwrap();
        assert_eq!(table.rows.len(), 2);
        assert_eq!(summary[0].match_rate, 50.0);
        assert_eq!(summary[0].std_dev, None);
        pipeline.finish().unwrap();
    }

    #[test]
    fn stages_reload_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        let pipeline = Pipeline::new(&config).unwrap();
        pipeline
            .run(&stub(&["202 C St", "330 Park Blvd"]))
            .unwrap();
        let saved = ComparisonTable::read(&pipeline.paths().distance_table()).unwrap();

        fs::remove_file(pipeline.paths().distance_table()).unwrap();
        fs::remove_file(pipeline.paths().map("google")).unwrap();
        let (table, summary) = pipeline.compare_saved().unwrap();
        assert_eq!(table, saved);
        assert_eq!(summary, stats::summarize(&saved));

        pipeline.report_saved().unwrap();
        pipeline.finish().unwrap();
        assert!(pipeline.paths().map("google").exists());
    }

    #[test]
    fn parallel_providers_keep_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config(dir.path());
        config.parallel_providers = true;
        config.providers = vec![Provider::Google, Provider::Bing];
        let pipeline = Pipeline::new(&config).unwrap();

        let at = |x: &'static str| (x, 32.7160, -117.1610);
        let geocoders: Vec<Box<dyn Geocoder>> = vec![
            Box::new(StubGeocoder::new(Provider::Google, &[at("202 C St")])),
            Box::new(StubGeocoder::new(
                Provider::Bing,
                &[at("202 C St"), at("330 Park Blvd")],
            )),
        ];
        let records = pipeline.ingest().unwrap();
        let outcomes = pipeline.geocode(&records, &geocoders);

        assert_eq!(
            outcomes.iter().map(|x| x.provider).collect::<Vec<_>>(),
            vec![Provider::Google, Provider::Bing]
        );
        assert_eq!(outcomes[0].succeeded.len(), 1);
        assert_eq!(outcomes[1].succeeded.len(), 2);
        for slug in ["google", "bing"] {
            assert!(pipeline.paths().results(slug).exists());
            assert!(pipeline.paths().fails(slug).exists());
            assert!(pipeline.paths().points(slug).exists());
        }
        pipeline.finish().unwrap();
    }

    #[test]
    fn failed_artifact_does_not_block_others() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        let pipeline = Pipeline::new(&config).unwrap();
        // a directory where the chart should go
        fs::create_dir_all(pipeline.paths().boxplot()).unwrap();

        let e = pipeline
            .run(&stub(&["202 C St", "330 Park Blvd"]))
            .unwrap_err();
        assert_eq!(e.to_string(), "1 artifact could not be written");
        assert!(pipeline.paths().map("google").exists());
        assert!(pipeline.paths().statistics().exists());
    }

    #[test]
    fn id_range_checked_before_geocoding() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config(dir.path());
        config.ids = crate::ids::IdRange { min: 1, max: 3 };
        let pipeline = Pipeline::new(&config).unwrap();

        let geocoders = stub(&["202 C St"]);
        let e = pipeline.run(&geocoders).unwrap_err();
        assert!(e.downcast_ref::<crate::ids::InsufficientRangeError>().is_some());
        assert!(!pipeline.paths().results("google").exists());
    }
}
