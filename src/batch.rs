use std::{thread, time::Duration};

use _model::{AddressRecord, GeocodeResult, Provider};
use indicatif::ProgressBar;
use tracing::{info, warn};

use crate::providers::Geocoder;

/// Every record of a batch ends up in exactly one of the two lists.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchOutcome {
    pub provider: Provider,
    pub succeeded: Vec<GeocodeResult>,
    pub failed: Vec<GeocodeResult>,
}

/// Geocodes every record in order, waiting `delay` between calls. Failures
/// are recorded and never stop the batch; nothing is retried.
pub fn geocode_batch(
    records: &[AddressRecord],
    geocoder: &dyn Geocoder,
    delay: Duration,
    pb: &ProgressBar,
) -> BatchOutcome {
    let provider = geocoder.provider();
    let mut succeeded = Vec::new();
    let mut failed = Vec::new();

    for (i, record) in records.iter().enumerate() {
        if i > 0 && !delay.is_zero() {
            thread::sleep(delay);
        }

        match geocoder.geocode(&record.address) {
            Ok(coordinate) => succeeded.push(GeocodeResult {
                record_id: record.id,
                provider,
                coordinate: Some(coordinate),
            }),
            Err(e) => {
                pb.suspend(|| {
                    warn!(
                        "{provider} failed for {}, {}, {}: {e}",
                        record.id, record.name, record.address
                    )
                });
                failed.push(GeocodeResult {
                    record_id: record.id,
                    provider,
                    coordinate: None,
                });
            }
        }
        pb.inc(1);
    }

    info!(
        "{provider}: {} succeeded, {} failed",
        succeeded.len(),
        failed.len()
    );
    BatchOutcome {
        provider,
        succeeded,
        failed,
    }
}
