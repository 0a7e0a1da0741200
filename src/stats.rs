use std::path::Path;

use _model::Provider;
use anyhow::Result;
use serde::Serialize;

use crate::compare::ComparisonTable;

/// Summary of one provider column. Distances are in feet and only count the
/// records the provider matched.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRow {
    #[serde(rename = "comparison")]
    pub provider: Provider,
    #[serde(rename = "percent_match")]
    pub match_rate: f64,
    pub mean_distance: Option<f64>,
    pub std_dev: Option<f64>,
    pub max_distance: Option<f64>,
}

pub fn summarize(table: &ComparisonTable) -> Vec<SummaryRow> {
    let total = table.rows.len();
    table
        .providers
        .iter()
        .enumerate()
        .map(|(i, provider)| {
            let values: Vec<f64> = table
                .rows
                .iter()
                .filter_map(|x| x.distances[i])
                .map(|x| x.get())
                .collect();
            summarize_column(*provider, &values, total)
        })
        .collect()
}

fn summarize_column(provider: Provider, values: &[f64], total: usize) -> SummaryRow {
    let match_rate = if total == 0 {
        0.0
    } else {
        values.len() as f64 / total as f64 * 100.0
    };

    let n = values.len() as f64;
    let mean = (!values.is_empty()).then(|| values.iter().sum::<f64>() / n);
    let max = values.iter().copied().reduce(f64::max);
    // sample standard deviation, undefined for a single value
    let std_dev = mean.filter(|_| values.len() > 1).map(|mean| {
        let squares: f64 = values.iter().map(|x| (x - mean).powi(2)).sum();
        (squares / (n - 1.0)).sqrt()
    });

    SummaryRow {
        provider,
        match_rate,
        mean_distance: mean,
        std_dev,
        max_distance: max,
    }
}

pub fn write(path: &Path, rows: &[SummaryRow]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    for x in rows {
        writer.serialize(x)?;
    }
    writer.flush()?;
    Ok(())
}
